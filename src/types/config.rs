use crate::types::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// デフォルトの1ページあたりの投稿数
const DEFAULT_POSTS_PER_PAGE: u32 = 10;

/// デフォルトの設定ファイルパス
const CONFIG_FILE_PATH: &str = "blog.yaml";

/// ブログコアのデプロイ単位設定
///
/// ページサイズはデプロイごとに固定で、リクエストごとには変わらない。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlogConfig {
    /// 1ページあたりの投稿数（1以上）
    pub posts_per_page: u32,
}

impl Default for BlogConfig {
    fn default() -> Self {
        Self {
            posts_per_page: DEFAULT_POSTS_PER_PAGE,
        }
    }
}

impl BlogConfig {
    /// ページサイズを指定して設定を作成する
    pub fn new(posts_per_page: u32) -> ConfigResult<Self> {
        if posts_per_page == 0 {
            return Err(ConfigError::invalid_value(
                "posts_per_pageは1以上である必要があります",
            ));
        }
        Ok(Self { posts_per_page })
    }

    /// YAMLファイルから設定を読み込む
    pub fn from_yaml_file(file_path: &str) -> ConfigResult<Self> {
        let file = File::open(file_path)
            .map_err(|_| ConfigError::missing_config_file(file_path))?;
        let config: BlogConfig = serde_yaml::from_reader(BufReader::new(file))
            .map_err(|e| ConfigError::parse_failure(file_path, e))?;
        Self::new(config.posts_per_page)
    }

    /// 環境変数POSTS_PER_PAGEから設定を読み込む
    /// 未設定の場合はデフォルト値を使用する
    pub fn from_env() -> ConfigResult<Self> {
        match env::var("POSTS_PER_PAGE") {
            Ok(raw) => {
                let posts_per_page = raw.parse::<u32>().map_err(|_| {
                    ConfigError::invalid_value(format!(
                        "POSTS_PER_PAGEを数値に変換できません: {}",
                        raw
                    ))
                })?;
                Self::new(posts_per_page)
            }
            Err(_) => Ok(Self::default()),
        }
    }

    /// blog.yamlがあればファイルから、なければ環境変数・デフォルト値から読み込む
    pub fn load() -> ConfigResult<Self> {
        if Path::new(CONFIG_FILE_PATH).exists() {
            Self::from_yaml_file(CONFIG_FILE_PATH)
        } else {
            Self::from_env()
        }
    }
}
