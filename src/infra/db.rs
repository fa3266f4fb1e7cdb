use crate::types::{BlogError, BlogResult, ConfigError};
use sqlx::PgPool;
use std::env;
use tracing::debug;

/// データベース接続プールを作成
/// .envファイルからDATABASE_URLを読み込みます
pub async fn create_pool() -> BlogResult<PgPool> {
    let database_url = env::var("DATABASE_URL")
        .map_err(|_| BlogError::from(ConfigError::missing_env_var("DATABASE_URL")))?;

    let pool = PgPool::connect(&database_url)
        .await
        .map_err(|e| BlogError::database("データベース接続", e))?;

    debug!("データベース接続プールを作成");
    Ok(pool)
}

/// データベースの初期化（マイグレーション実行）
pub async fn initialize_database(pool: &PgPool) -> BlogResult<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| BlogError::database("データベースマイグレーション実行", e.into()))?;

    debug!("マイグレーション適用済み");
    Ok(())
}

/// プールの作成とデータベース初期化を一括で行う便利関数
pub async fn setup_database() -> BlogResult<PgPool> {
    let pool = create_pool().await?;
    initialize_database(&pool).await?;
    Ok(pool)
}
