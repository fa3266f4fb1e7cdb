use anyhow::{Context, Result};
use inkpress::app::presenter::JsonPresenter;
use inkpress::app::views;
use inkpress::domain::post::PgBlogPostRepository;
use inkpress::domain::tag::PgBlogTagRepository;
use inkpress::domain::user::PgBlogUserRepository;
use inkpress::infra::db::setup_database;
use inkpress::types::BlogConfig;

#[tokio::main]
async fn main() {
    // 環境変数を読み込み（.envファイルがあれば使用）
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    println!("=== ブログコンテンツサービス起動 ===");

    if let Err(e) = run().await {
        eprintln!("起動中にエラーが発生しました: {:#}", e);
        std::process::exit(1);
    }
}

/// 設定とデータベースを準備し、インデックスビューを1回描画して
/// 集約の概要を表示する
async fn run() -> Result<()> {
    let config = BlogConfig::load().context("設定の読み込みに失敗")?;
    println!("1ページあたりの投稿数: {}件", config.posts_per_page);

    let pool = setup_database()
        .await
        .context("データベースの準備に失敗")?;

    let post_repo = PgBlogPostRepository::new(pool.clone());
    let tag_repo = PgBlogTagRepository::new(pool.clone());
    let user_repo = PgBlogUserRepository::new(pool);

    let rendered = views::index_view(
        &post_repo,
        &tag_repo,
        &user_repo,
        &JsonPresenter,
        None,
        None,
        &config,
    )
    .await
    .context("インデックスビューの組み立てに失敗")?;

    println!(
        "このページの投稿: {}件、総ページ数: {}、タグ: {}件、著者: {}名",
        rendered["posts"].as_array().map(|p| p.len()).unwrap_or(0),
        rendered["pagination"]["total_pages"],
        rendered["tags"].as_array().map(|t| t.len()).unwrap_or(0),
        rendered["authors"].as_array().map(|a| a.len()).unwrap_or(0),
    );

    println!("=== 完了 ===");
    Ok(())
}
