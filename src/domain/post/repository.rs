use super::model::BlogPost;
use crate::domain::tag::model::BlogTag;
use crate::domain::user::model::BlogUser;
use crate::types::{BlogError, BlogResult};
use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;

/// SELECT句で常に使う投稿テーブルの列並び
const POST_COLUMNS: &str = "id, title, contents, slug_url, published, created, author_id";

/// 投稿リポジトリの抽象化トレイト
///
/// すべての操作は非同期で、呼び出し側がFutureを破棄すれば中断される。
/// リトライはこの層では行わない。"published"系の操作は必ず
/// published = TRUEで絞り込み、下書き込みの操作は公開経路から呼ばない。
#[async_trait]
pub trait BlogPostRepository: Send + Sync {
    /// 作成日時の降順で全投稿を取得する
    async fn get_posts_sorted(&self, include_drafts: bool) -> BlogResult<Vec<BlogPost>>;

    /// 投稿の総件数を取得する
    async fn count_posts(&self, include_drafts: bool) -> BlogResult<i64>;

    /// 作成日時の降順でページ分の投稿を取得する
    async fn get_posts_sorted_paged(
        &self,
        include_drafts: bool,
        count: i64,
        offset: i64,
    ) -> BlogResult<Vec<BlogPost>>;

    /// 指定した著者の投稿をページ単位で取得する
    async fn get_posts_for_author(
        &self,
        author: &BlogUser,
        include_drafts: bool,
        count: i64,
        offset: i64,
    ) -> BlogResult<Vec<BlogPost>>;

    /// 指定した著者の公開投稿数を取得する
    async fn count_posts_for_author(&self, author: &BlogUser) -> BlogResult<i64>;

    /// スラッグで投稿を1件取得する
    async fn get_post_by_slug(&self, slug: &str) -> BlogResult<Option<BlogPost>>;

    /// IDで投稿を1件取得する
    async fn get_post_by_id(&self, id: i32) -> BlogResult<Option<BlogPost>>;

    /// 指定したタグの公開投稿をページ単位で取得する
    async fn get_published_posts_for_tag(
        &self,
        tag: &BlogTag,
        count: i64,
        offset: i64,
    ) -> BlogResult<Vec<BlogPost>>;

    /// 指定したタグの公開投稿数を取得する
    async fn count_published_posts_for_tag(&self, tag: &BlogTag) -> BlogResult<i64>;

    /// 検索語にタイトルが一致する公開投稿を新しい順に取得する
    async fn search_published_posts(
        &self,
        search_term: &str,
        count: i64,
        offset: i64,
    ) -> BlogResult<Vec<BlogPost>>;

    /// 検索語に一致する公開投稿数を取得する
    async fn count_published_posts_for_search(&self, search_term: &str) -> BlogResult<i64>;

    /// 投稿を保存する（IDが未設定なら挿入、設定済みなら更新）
    async fn store_post(&self, post: &BlogPost) -> BlogResult<BlogPost>;

    /// 投稿を削除する
    async fn delete_post(&self, post: &BlogPost) -> BlogResult<()>;
}

/// PostgreSQLを使用した本番用の投稿リポジトリ実装
pub struct PgBlogPostRepository {
    pool: PgPool,
}

impl PgBlogPostRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BlogPostRepository for PgBlogPostRepository {
    async fn get_posts_sorted(&self, include_drafts: bool) -> BlogResult<Vec<BlogPost>> {
        let mut qb = sqlx::QueryBuilder::<sqlx::Postgres>::new(format!(
            "SELECT {} FROM blog_posts",
            POST_COLUMNS
        ));
        if !include_drafts {
            qb.push(" WHERE published = TRUE");
        }
        qb.push(" ORDER BY created DESC");

        qb.build_query_as::<BlogPost>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| BlogError::database("投稿一覧の取得", e))
    }

    async fn count_posts(&self, include_drafts: bool) -> BlogResult<i64> {
        let mut qb =
            sqlx::QueryBuilder::<sqlx::Postgres>::new("SELECT COUNT(*) FROM blog_posts");
        if !include_drafts {
            qb.push(" WHERE published = TRUE");
        }

        qb.build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| BlogError::database("投稿数の取得", e))
    }

    async fn get_posts_sorted_paged(
        &self,
        include_drafts: bool,
        count: i64,
        offset: i64,
    ) -> BlogResult<Vec<BlogPost>> {
        let mut qb = sqlx::QueryBuilder::<sqlx::Postgres>::new(format!(
            "SELECT {} FROM blog_posts",
            POST_COLUMNS
        ));
        if !include_drafts {
            qb.push(" WHERE published = TRUE");
        }
        qb.push(" ORDER BY created DESC LIMIT ")
            .push_bind(count)
            .push(" OFFSET ")
            .push_bind(offset);

        qb.build_query_as::<BlogPost>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| BlogError::database("投稿ページの取得", e))
    }

    async fn get_posts_for_author(
        &self,
        author: &BlogUser,
        include_drafts: bool,
        count: i64,
        offset: i64,
    ) -> BlogResult<Vec<BlogPost>> {
        let author_id = author.require_id()?;

        let mut qb = sqlx::QueryBuilder::<sqlx::Postgres>::new(format!(
            "SELECT {} FROM blog_posts WHERE author_id = ",
            POST_COLUMNS
        ));
        qb.push_bind(author_id);
        if !include_drafts {
            qb.push(" AND published = TRUE");
        }
        qb.push(" ORDER BY created DESC LIMIT ")
            .push_bind(count)
            .push(" OFFSET ")
            .push_bind(offset);

        qb.build_query_as::<BlogPost>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| BlogError::database("著者別投稿の取得", e))
    }

    async fn count_posts_for_author(&self, author: &BlogUser) -> BlogResult<i64> {
        let author_id = author.require_id()?;

        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM blog_posts WHERE author_id = $1 AND published = TRUE",
        )
        .bind(author_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| BlogError::database("著者別投稿数の取得", e))
    }

    async fn get_post_by_slug(&self, slug: &str) -> BlogResult<Option<BlogPost>> {
        sqlx::query_as::<_, BlogPost>(&format!(
            "SELECT {} FROM blog_posts WHERE slug_url = $1",
            POST_COLUMNS
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| BlogError::database("スラッグによる投稿の取得", e))
    }

    async fn get_post_by_id(&self, id: i32) -> BlogResult<Option<BlogPost>> {
        sqlx::query_as::<_, BlogPost>(&format!(
            "SELECT {} FROM blog_posts WHERE id = $1",
            POST_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| BlogError::database("IDによる投稿の取得", e))
    }

    async fn get_published_posts_for_tag(
        &self,
        tag: &BlogTag,
        count: i64,
        offset: i64,
    ) -> BlogResult<Vec<BlogPost>> {
        let tag_id = tag.require_id()?;

        sqlx::query_as::<_, BlogPost>(
            r#"
            SELECT p.id, p.title, p.contents, p.slug_url, p.published, p.created, p.author_id
            FROM blog_posts p
            JOIN blog_post_tags pt ON pt.post_id = p.id
            WHERE pt.tag_id = $1 AND p.published = TRUE
            ORDER BY p.created DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(tag_id)
        .bind(count)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| BlogError::database("タグ別投稿の取得", e))
    }

    async fn count_published_posts_for_tag(&self, tag: &BlogTag) -> BlogResult<i64> {
        let tag_id = tag.require_id()?;

        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM blog_posts p
            JOIN blog_post_tags pt ON pt.post_id = p.id
            WHERE pt.tag_id = $1 AND p.published = TRUE
            "#,
        )
        .bind(tag_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| BlogError::database("タグ別投稿数の取得", e))
    }

    async fn search_published_posts(
        &self,
        search_term: &str,
        count: i64,
        offset: i64,
    ) -> BlogResult<Vec<BlogPost>> {
        sqlx::query_as::<_, BlogPost>(&format!(
            r#"
            SELECT {}
            FROM blog_posts
            WHERE published = TRUE AND title ILIKE '%' || $1 || '%'
            ORDER BY created DESC
            LIMIT $2 OFFSET $3
            "#,
            POST_COLUMNS
        ))
        .bind(search_term)
        .bind(count)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| BlogError::database("投稿の検索", e))
    }

    async fn count_published_posts_for_search(&self, search_term: &str) -> BlogResult<i64> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM blog_posts WHERE published = TRUE AND title ILIKE '%' || $1 || '%'",
        )
        .bind(search_term)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| BlogError::database("検索結果数の取得", e))
    }

    async fn store_post(&self, post: &BlogPost) -> BlogResult<BlogPost> {
        let stored = match post.id {
            None => sqlx::query_as::<_, BlogPost>(&format!(
                r#"
                INSERT INTO blog_posts (title, contents, slug_url, published, created, author_id)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING {}
                "#,
                POST_COLUMNS
            ))
            .bind(&post.title)
            .bind(&post.contents)
            .bind(&post.slug_url)
            .bind(post.published)
            .bind(post.created)
            .bind(post.author_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| BlogError::database("投稿の挿入", e))?,
            Some(id) => sqlx::query_as::<_, BlogPost>(&format!(
                r#"
                UPDATE blog_posts
                SET title = $1, contents = $2, slug_url = $3, published = $4,
                    created = $5, author_id = $6
                WHERE id = $7
                RETURNING {}
                "#,
                POST_COLUMNS
            ))
            .bind(&post.title)
            .bind(&post.contents)
            .bind(&post.slug_url)
            .bind(post.published)
            .bind(post.created)
            .bind(post.author_id)
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| BlogError::database("投稿の更新", e))?,
        };

        debug!(post_id = ?stored.id, slug = %stored.slug_url, "投稿を保存");
        Ok(stored)
    }

    async fn delete_post(&self, post: &BlogPost) -> BlogResult<()> {
        let id = post.require_id()?;

        sqlx::query("DELETE FROM blog_posts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| BlogError::database("投稿の削除", e))?;

        debug!(post_id = id, "投稿を削除");
        Ok(())
    }
}

#[cfg(all(test, feature = "db"))]
mod pg_tests {
    use super::*;
    use crate::domain::user::repository::{BlogUserRepository, PgBlogUserRepository};
    use chrono::Utc;

    // 取得系テスト（fixtureあり: 著者2名、公開投稿3件、下書き2件）
    mod retrieval {
        use super::*;

        #[sqlx::test(fixtures("../../../fixtures/blog_basic.sql"))]
        async fn test_published_listing_excludes_drafts(pool: PgPool) -> BlogResult<()> {
            let repo = PgBlogPostRepository::new(pool);

            let published = repo.get_posts_sorted(false).await?;
            assert_eq!(published.len(), 3, "公開投稿は3件のはず");
            assert!(
                published.iter().all(|p| p.published),
                "下書きが公開一覧に混入している"
            );

            // 下書き込みは内部用で、全5件が見える
            let all = repo.get_posts_sorted(true).await?;
            assert_eq!(all.len(), 5, "下書き込みでは5件のはず");

            println!("✅ 下書き除外検証成功");
            Ok(())
        }

        #[sqlx::test(fixtures("../../../fixtures/blog_basic.sql"))]
        async fn test_listing_sorted_by_created_desc(pool: PgPool) -> BlogResult<()> {
            let repo = PgBlogPostRepository::new(pool);

            let posts = repo.get_posts_sorted(false).await?;
            for pair in posts.windows(2) {
                assert!(
                    pair[0].created >= pair[1].created,
                    "作成日時の降順になっていない"
                );
            }

            println!("✅ 新着順ソート検証成功");
            Ok(())
        }

        #[sqlx::test(fixtures("../../../fixtures/blog_basic.sql"))]
        async fn test_count_posts(pool: PgPool) -> BlogResult<()> {
            let repo = PgBlogPostRepository::new(pool);

            assert_eq!(repo.count_posts(false).await?, 3);
            assert_eq!(repo.count_posts(true).await?, 5);

            println!("✅ 投稿数カウント検証成功");
            Ok(())
        }

        #[sqlx::test(fixtures("../../../fixtures/blog_basic.sql"))]
        async fn test_paged_listing(pool: PgPool) -> BlogResult<()> {
            let repo = PgBlogPostRepository::new(pool);

            let page1 = repo.get_posts_sorted_paged(false, 2, 0).await?;
            assert_eq!(page1.len(), 2);

            let page2 = repo.get_posts_sorted_paged(false, 2, 2).await?;
            assert_eq!(page2.len(), 1, "2ページ目は残り1件のはず");

            // 範囲外オフセットは空の結果になる
            let beyond = repo.get_posts_sorted_paged(false, 2, 100).await?;
            assert!(beyond.is_empty(), "範囲外ページは空のはず");

            println!("✅ ページング検証成功");
            Ok(())
        }

        #[sqlx::test(fixtures("../../../fixtures/blog_basic.sql"))]
        async fn test_get_post_by_slug(pool: PgPool) -> BlogResult<()> {
            let repo = PgBlogPostRepository::new(pool);

            let post = repo.get_post_by_slug("rust-ownership").await?;
            assert!(post.is_some(), "既存スラッグの投稿が見つからない");
            assert_eq!(post.unwrap().title, "Rustの所有権");

            let missing = repo.get_post_by_slug("no-such-slug").await?;
            assert!(missing.is_none(), "存在しないスラッグで投稿が返った");

            println!("✅ スラッグ取得検証成功");
            Ok(())
        }

        #[sqlx::test(fixtures("../../../fixtures/blog_basic.sql"))]
        async fn test_posts_for_author(pool: PgPool) -> BlogResult<()> {
            let post_repo = PgBlogPostRepository::new(pool.clone());
            let user_repo = PgBlogUserRepository::new(pool);

            let alice = user_repo
                .get_user_by_username("alice")
                .await?
                .expect("aliceが存在しない");

            let posts = post_repo.get_posts_for_author(&alice, false, 10, 0).await?;
            assert_eq!(posts.len(), 2, "aliceの公開投稿は2件のはず");
            assert_eq!(post_repo.count_posts_for_author(&alice).await?, 2);

            println!("✅ 著者別投稿検証成功");
            Ok(())
        }

        #[sqlx::test(fixtures("../../../fixtures/blog_basic.sql"))]
        async fn test_search_published_only(pool: PgPool) -> BlogResult<()> {
            let repo = PgBlogPostRepository::new(pool);

            // "Rust"はタイトルに公開2件・下書き1件が一致するが、公開のみ返る
            let hits = repo.search_published_posts("Rust", 10, 0).await?;
            assert_eq!(hits.len(), 2, "検索は公開投稿のみ返すはず");
            assert!(hits.iter().all(|p| p.published));
            assert_eq!(repo.count_published_posts_for_search("Rust").await?, 2);

            // 大文字小文字を無視して一致する
            let hits = repo.search_published_posts("rust", 10, 0).await?;
            assert_eq!(hits.len(), 2);

            println!("✅ 検索の下書き除外検証成功");
            Ok(())
        }
    }

    // 保存・削除系テスト（fixtureなし）
    mod storage {
        use super::*;

        #[sqlx::test]
        async fn test_store_assigns_id(pool: PgPool) -> BlogResult<()> {
            let post_repo = PgBlogPostRepository::new(pool.clone());
            let user_repo = PgBlogUserRepository::new(pool);

            let author = user_repo
                .store_user(&crate::domain::user::model::BlogUser::new("bob", "Bob"))
                .await?;

            let post = BlogPost::new(
                "テスト投稿",
                "本文",
                "test-post",
                true,
                Utc::now(),
                author.id.expect("著者IDが未設定"),
            );
            let stored = post_repo.store_post(&post).await?;
            assert!(stored.id.is_some(), "保存後にIDが割り当てられていない");

            // IDを保ったまま更新される
            let mut updated = stored.clone();
            updated.title = "更新後タイトル".to_string();
            let stored_again = post_repo.store_post(&updated).await?;
            assert_eq!(stored_again.id, stored.id);
            assert_eq!(post_repo.count_posts(true).await?, 1, "更新で件数が増えた");

            println!("✅ 投稿保存・更新検証成功");
            Ok(())
        }

        #[sqlx::test]
        async fn test_delete_post(pool: PgPool) -> BlogResult<()> {
            let post_repo = PgBlogPostRepository::new(pool.clone());
            let user_repo = PgBlogUserRepository::new(pool);

            let author = user_repo
                .store_user(&crate::domain::user::model::BlogUser::new("bob", "Bob"))
                .await?;
            let stored = post_repo
                .store_post(&BlogPost::new(
                    "消える投稿",
                    "本文",
                    "gone",
                    true,
                    Utc::now(),
                    author.id.expect("著者IDが未設定"),
                ))
                .await?;

            post_repo.delete_post(&stored).await?;
            assert_eq!(post_repo.count_posts(true).await?, 0);

            println!("✅ 投稿削除検証成功");
            Ok(())
        }

        #[sqlx::test]
        async fn test_unsaved_entity_rejected(pool: PgPool) -> BlogResult<()> {
            let repo = PgBlogPostRepository::new(pool);

            // ID未設定の投稿を削除しようとするのは整合性違反
            let unsaved = BlogPost::new("未保存", "本文", "unsaved", true, Utc::now(), 1);
            let result = repo.delete_post(&unsaved).await;
            assert!(matches!(
                result,
                Err(BlogError::ConsistencyViolation { .. })
            ));

            println!("✅ 未保存エンティティ拒否検証成功");
            Ok(())
        }
    }
}
