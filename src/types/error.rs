use thiserror::Error;

/// 設定関連のエラー型
/// 環境変数、設定ファイル、設定値の検証など設定に関するエラーを定義
#[derive(Error, Debug)]
pub enum ConfigError {
    /// 環境変数が見つからない
    #[error("環境変数が見つかりません: {name}")]
    MissingEnvironmentVariable { name: String },

    /// 設定値が不正
    #[error("設定値が不正です: {reason}")]
    InvalidValue { reason: String },

    /// 設定ファイルが見つからない
    #[error("設定ファイルが見つかりません: {path}")]
    MissingConfigFile { path: String },

    /// 設定ファイルの解析に失敗
    #[error("設定ファイルの解析に失敗しました: {path} - {source}")]
    ParseFailure {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
}

impl ConfigError {
    /// 環境変数不足エラーを作成
    pub fn missing_env_var<N: Into<String>>(name: N) -> Self {
        Self::MissingEnvironmentVariable { name: name.into() }
    }

    /// 不正な設定値エラーを作成
    pub fn invalid_value<R: Into<String>>(reason: R) -> Self {
        Self::InvalidValue {
            reason: reason.into(),
        }
    }

    /// 設定ファイル不足エラーを作成
    pub fn missing_config_file<P: Into<String>>(path: P) -> Self {
        Self::MissingConfigFile { path: path.into() }
    }

    /// 設定ファイル解析エラーを作成
    pub fn parse_failure<P: Into<String>>(path: P, source: serde_yaml::Error) -> Self {
        Self::ParseFailure {
            path: path.into(),
            source,
        }
    }
}

/// 設定エラーのResult型エイリアス
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// ブログコア全体のエラー型
///
/// クライアントに見せてよいエラー（NotFound / InvalidIdentifier）と、
/// サーバー側で処理すべきエラー（ConsistencyViolation / Database）を区別する。
#[derive(Error, Debug)]
pub enum BlogError {
    /// 指定されたキーに対応するエンティティが存在しない
    #[error("{resource}が見つかりません: {key}")]
    NotFound { resource: &'static str, key: String },

    /// ルートパラメータの識別子が不正な形式
    #[error("不正な識別子です: {raw}")]
    InvalidIdentifier { raw: String },

    /// 保存済みのはずのエンティティにIDが割り当てられていない等の整合性違反
    #[error("整合性違反: {message}")]
    ConsistencyViolation { message: String },

    /// データベース操作の失敗
    #[error("データベースエラー: {operation} - {source}")]
    Database {
        operation: String,
        #[source]
        source: sqlx::Error,
    },

    /// ビューコンテキストのシリアライゼーションエラー
    #[error("シリアライゼーションエラー: {context} - {source}")]
    Serialization {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// 設定エラー
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl BlogError {
    /// エンティティ不在エラーを作成
    pub fn not_found<K: Into<String>>(resource: &'static str, key: K) -> Self {
        Self::NotFound {
            resource,
            key: key.into(),
        }
    }

    /// 識別子形式エラーを作成
    pub fn invalid_identifier<R: Into<String>>(raw: R) -> Self {
        Self::InvalidIdentifier { raw: raw.into() }
    }

    /// 整合性違反エラーを作成
    pub fn consistency<M: Into<String>>(message: M) -> Self {
        Self::ConsistencyViolation {
            message: message.into(),
        }
    }

    /// データベースエラーを作成
    pub fn database<O: Into<String>>(operation: O, source: sqlx::Error) -> Self {
        Self::Database {
            operation: operation.into(),
            source,
        }
    }

    /// シリアライゼーションエラーを作成
    pub fn serialization<C: Into<String>>(context: C, source: serde_json::Error) -> Self {
        Self::Serialization {
            context: context.into(),
            source,
        }
    }

    /// クライアントにそのまま提示してよいエラーかどうか
    /// ConsistencyViolationとDatabaseは内部情報を含むため常にfalse
    pub fn is_client_visible(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::InvalidIdentifier { .. })
    }
}

/// ブログコアのResult型エイリアス
pub type BlogResult<T> = std::result::Result<T, BlogError>;
