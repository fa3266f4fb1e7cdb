//! ビュー組み立ての結合テスト
//!
//! インメモリストレージアダプタに対して各ビューを最後まで動かし、
//! ページネーション・下書き除外・ショートサーキットが
//! ビュー境界を越えて一貫していることを確認する。

use chrono::{Duration, Utc};
use inkpress::app::presenter::JsonPresenter;
use inkpress::app::views;
use inkpress::domain::post::model::BlogPost;
use inkpress::domain::post::repository::BlogPostRepository;
use inkpress::domain::tag::lifecycle::add_tag;
use inkpress::domain::user::model::BlogUser;
use inkpress::domain::user::repository::BlogUserRepository;
use inkpress::infra::memory::InMemoryBlogRepository;
use inkpress::types::{BlogConfig, BlogResult};

/// 公開投稿25件（1番が最古、25番が最新）と下書き3件を持つフィクスチャ
async fn seed_25_posts(repo: &InMemoryBlogRepository) -> BlogResult<()> {
    let alice = repo.store_user(&BlogUser::new("alice", "Alice")).await?;
    let alice_id = alice.require_id()?;
    let base = Utc::now() - Duration::days(30);

    for n in 1..=25 {
        let post = repo
            .store_post(&BlogPost::new(
                format!("{}本目の投稿", n),
                "本文",
                format!("post-{}", n),
                true,
                base + Duration::hours(n),
                alice_id,
            ))
            .await?;
        if n % 5 == 0 {
            add_tag("節目", &post, repo).await?;
        }
    }
    for n in 1..=3 {
        repo.store_post(&BlogPost::new(
            format!("下書き{}", n),
            "本文",
            format!("draft-{}", n),
            false,
            base + Duration::days(10) + Duration::hours(n),
            alice_id,
        ))
        .await?;
    }

    repo.clear_call_log();
    Ok(())
}

#[tokio::test]
async fn test_index_page_3_of_25_posts() -> BlogResult<()> {
    let repo = InMemoryBlogRepository::new();
    seed_25_posts(&repo).await?;
    let config = BlogConfig::new(10)?;

    // ページサイズ10、公開25件、3ページ目 → オフセット20、残り5件、全3ページ
    let json = views::index_view(
        &repo,
        &repo,
        &repo,
        &JsonPresenter,
        Some(3),
        Some("page=3"),
        &config,
    )
    .await?;

    let posts = json["posts"].as_array().expect("postsが配列でない");
    assert_eq!(posts.len(), 5, "3ページ目は残り5件のはず");
    assert_eq!(json["pagination"]["current_page"], 3);
    assert_eq!(json["pagination"]["total_pages"], 3);
    assert_eq!(json["pagination"]["offset"], 20);
    assert_eq!(json["pagination"]["current_query"], "page=3");

    // 新着順なので3ページ目は5本目→1本目（投稿21〜25件目に相当）
    assert_eq!(posts[0]["slug_url"], "post-5");
    assert_eq!(posts[4]["slug_url"], "post-1");

    println!("✅ 25件・3ページ目の端から端まで検証成功");
    Ok(())
}

#[tokio::test]
async fn test_drafts_never_leak_into_any_view() -> BlogResult<()> {
    let repo = InMemoryBlogRepository::new();
    seed_25_posts(&repo).await?;
    let config = BlogConfig::new(100)?;

    // インデックス: 公開25件だけ
    let json = views::index_view(&repo, &repo, &repo, &JsonPresenter, None, None, &config).await?;
    assert_eq!(json["posts"].as_array().unwrap().len(), 25);
    assert_eq!(json["pagination"]["total_pages"], 1);

    // 著者ビュー: 下書き3件は件数にも一覧にも現れない
    let json =
        views::author_view(&repo, &repo, &repo, &JsonPresenter, "alice", None, None, &config)
            .await?;
    assert_eq!(json["post_count"], 25);
    assert_eq!(json["posts"].as_array().unwrap().len(), 25);

    // 検索: 「下書き」というタイトルの投稿は公開されていないので0件
    let json = views::search_view(
        &repo,
        &repo,
        &repo,
        &JsonPresenter,
        Some("下書き"),
        None,
        None,
        &config,
    )
    .await?;
    assert_eq!(json["total_results"], 0);

    // 著者一覧の投稿数も公開分だけ
    let json = views::all_authors_view(&repo, &JsonPresenter).await?;
    assert_eq!(json["author_post_counts"]["1"], 25);

    println!("✅ 下書き非漏洩の横断検証成功");
    Ok(())
}

#[tokio::test]
async fn test_tag_listing_paginates_consistently() -> BlogResult<()> {
    let repo = InMemoryBlogRepository::new();
    seed_25_posts(&repo).await?;
    let config = BlogConfig::new(2)?;

    // 「節目」タグは5の倍数の5件に付いている。ページサイズ2なら3ページ
    let json = views::tag_view(
        &repo,
        &repo,
        &repo,
        &JsonPresenter,
        "節目",
        Some(3),
        None,
        &config,
    )
    .await?;

    assert_eq!(json["total_posts"], 5);
    assert_eq!(json["pagination"]["total_pages"], 3);
    assert_eq!(json["posts"].as_array().unwrap().len(), 1, "最終ページは1件");
    assert_eq!(json["tag"]["name"], "節目");
    assert_eq!(json["tag"]["url_encoded_name"], "%E7%AF%80%E7%9B%AE");

    println!("✅ タグ一覧ページング検証成功");
    Ok(())
}

#[tokio::test]
async fn test_out_of_range_page_yields_empty_result() -> BlogResult<()> {
    let repo = InMemoryBlogRepository::new();
    seed_25_posts(&repo).await?;
    let config = BlogConfig::new(10)?;

    // 範囲外ページはエラーにならず、空の投稿列と正しい総ページ数が返る
    let json =
        views::index_view(&repo, &repo, &repo, &JsonPresenter, Some(99), None, &config).await?;
    assert!(json["posts"].as_array().unwrap().is_empty());
    assert_eq!(json["pagination"]["current_page"], 99);
    assert_eq!(json["pagination"]["total_pages"], 3);

    Ok(())
}

#[tokio::test]
async fn test_empty_search_issues_no_queries_end_to_end() -> BlogResult<()> {
    let repo = InMemoryBlogRepository::new();
    seed_25_posts(&repo).await?;
    let config = BlogConfig::new(10)?;

    let json = views::search_view(
        &repo,
        &repo,
        &repo,
        &JsonPresenter,
        Some("   "),
        Some(2),
        Some("term=&page=2"),
        &config,
    )
    .await?;

    assert_eq!(json["total_results"], 0);
    assert_eq!(json["pagination"]["total_pages"], 0);
    assert_eq!(json["pagination"]["current_page"], 2);
    assert_eq!(repo.call_count(), 0, "空検索でリポジトリが呼ばれた");

    println!("✅ 空検索の結合検証成功");
    Ok(())
}
