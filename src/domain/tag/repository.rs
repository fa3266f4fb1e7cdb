use super::model::BlogTag;
use crate::domain::post::model::BlogPost;
use crate::types::{BlogError, BlogResult};
use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use std::collections::HashMap;
use tracing::debug;

/// タグリポジトリの抽象化トレイト
///
/// ピボット（blog_post_tags）の作成・削除もこのトレイトが担う。
/// ピボット行はタグと投稿の外部キー2つだけを持ち、独立したライフサイクルはない。
#[async_trait]
pub trait BlogTagRepository: Send + Sync {
    /// 全タグを名前順で取得する
    async fn get_all_tags(&self) -> BlogResult<Vec<BlogTag>>;

    /// 全タグを、それぞれの公開投稿数とあわせて取得する
    async fn get_all_tags_with_post_count(&self) -> BlogResult<Vec<(BlogTag, i64)>>;

    /// 指定した投稿に付いているタグを取得する
    async fn get_tags_for_post(&self, post: &BlogPost) -> BlogResult<Vec<BlogTag>>;

    /// 投稿IDからタグ一覧への対応を一括で取得する
    /// 一覧表示の際に投稿ごとのタグ取得クエリを繰り返さないためのバルク操作
    async fn get_tags_for_all_posts(&self) -> BlogResult<HashMap<i32, Vec<BlogTag>>>;

    /// 名前の完全一致でタグを1件取得する（大文字小文字は区別する）
    async fn get_tag_by_name(&self, name: &str) -> BlogResult<Option<BlogTag>>;

    /// タグを保存する（IDが未設定なら挿入、設定済みなら更新）
    async fn store_tag(&self, tag: &BlogTag) -> BlogResult<BlogTag>;

    /// 指定した投稿のピボットをすべて削除する（タグ行自体は残す）
    async fn delete_tags_for_post(&self, post: &BlogPost) -> BlogResult<()>;

    /// 指定したタグと投稿のピボットを1件削除する
    async fn remove_tag_from_post(&self, tag: &BlogTag, post: &BlogPost) -> BlogResult<()>;

    /// 指定したタグと投稿のピボットを作成する
    /// 既存ピボットの有無はここでは確認しない（一意性はストレージ層の制約に任せる）
    async fn add_tag_to_post(&self, tag: &BlogTag, post: &BlogPost) -> BlogResult<()>;

    /// どの投稿にも紐づいていない孤児タグを削除し、削除件数を返す
    /// ピボット削除時に自動では実行されない。明示的に呼び出してスケジュールする
    async fn delete_orphan_tags(&self) -> BlogResult<u64>;
}

/// get_tags_for_all_posts用のJOIN結果行
#[derive(Debug, FromRow)]
struct PostTagRow {
    post_id: i32,
    id: i32,
    name: String,
}

/// get_all_tags_with_post_count用の集計行
#[derive(Debug, FromRow)]
struct TagPostCountRow {
    id: i32,
    name: String,
    post_count: i64,
}

/// PostgreSQLを使用した本番用のタグリポジトリ実装
pub struct PgBlogTagRepository {
    pool: PgPool,
}

impl PgBlogTagRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BlogTagRepository for PgBlogTagRepository {
    async fn get_all_tags(&self) -> BlogResult<Vec<BlogTag>> {
        sqlx::query_as::<_, BlogTag>("SELECT id, name FROM blog_tags ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| BlogError::database("タグ一覧の取得", e))
    }

    async fn get_all_tags_with_post_count(&self) -> BlogResult<Vec<(BlogTag, i64)>> {
        let rows = sqlx::query_as::<_, TagPostCountRow>(
            r#"
            SELECT t.id, t.name, COUNT(p.id) AS post_count
            FROM blog_tags t
            LEFT JOIN blog_post_tags pt ON pt.tag_id = t.id
            LEFT JOIN blog_posts p ON p.id = pt.post_id AND p.published = TRUE
            GROUP BY t.id, t.name
            ORDER BY t.name
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| BlogError::database("タグ別投稿数の取得", e))?;

        Ok(rows
            .into_iter()
            .map(|row| {
                (
                    BlogTag {
                        id: Some(row.id),
                        name: row.name,
                    },
                    row.post_count,
                )
            })
            .collect())
    }

    async fn get_tags_for_post(&self, post: &BlogPost) -> BlogResult<Vec<BlogTag>> {
        let post_id = post.require_id()?;

        sqlx::query_as::<_, BlogTag>(
            r#"
            SELECT t.id, t.name
            FROM blog_tags t
            JOIN blog_post_tags pt ON pt.tag_id = t.id
            WHERE pt.post_id = $1
            ORDER BY t.name
            "#,
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| BlogError::database("投稿のタグ取得", e))
    }

    async fn get_tags_for_all_posts(&self) -> BlogResult<HashMap<i32, Vec<BlogTag>>> {
        let rows = sqlx::query_as::<_, PostTagRow>(
            r#"
            SELECT pt.post_id, t.id, t.name
            FROM blog_post_tags pt
            JOIN blog_tags t ON t.id = pt.tag_id
            ORDER BY pt.post_id, t.name
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| BlogError::database("全投稿のタグ一括取得", e))?;

        let mut tags_by_post: HashMap<i32, Vec<BlogTag>> = HashMap::new();
        for row in rows {
            tags_by_post.entry(row.post_id).or_default().push(BlogTag {
                id: Some(row.id),
                name: row.name,
            });
        }

        Ok(tags_by_post)
    }

    async fn get_tag_by_name(&self, name: &str) -> BlogResult<Option<BlogTag>> {
        sqlx::query_as::<_, BlogTag>("SELECT id, name FROM blog_tags WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| BlogError::database("名前によるタグの取得", e))
    }

    async fn store_tag(&self, tag: &BlogTag) -> BlogResult<BlogTag> {
        let stored = match tag.id {
            None => sqlx::query_as::<_, BlogTag>(
                "INSERT INTO blog_tags (name) VALUES ($1) RETURNING id, name",
            )
            .bind(&tag.name)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| BlogError::database("タグの挿入", e))?,
            Some(id) => sqlx::query_as::<_, BlogTag>(
                "UPDATE blog_tags SET name = $1 WHERE id = $2 RETURNING id, name",
            )
            .bind(&tag.name)
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| BlogError::database("タグの更新", e))?,
        };

        debug!(tag_id = ?stored.id, name = %stored.name, "タグを保存");
        Ok(stored)
    }

    async fn delete_tags_for_post(&self, post: &BlogPost) -> BlogResult<()> {
        let post_id = post.require_id()?;

        sqlx::query("DELETE FROM blog_post_tags WHERE post_id = $1")
            .bind(post_id)
            .execute(&self.pool)
            .await
            .map_err(|e| BlogError::database("投稿のピボット全削除", e))?;

        debug!(post_id, "投稿のピボットを全削除");
        Ok(())
    }

    async fn remove_tag_from_post(&self, tag: &BlogTag, post: &BlogPost) -> BlogResult<()> {
        let tag_id = tag.require_id()?;
        let post_id = post.require_id()?;

        sqlx::query("DELETE FROM blog_post_tags WHERE tag_id = $1 AND post_id = $2")
            .bind(tag_id)
            .bind(post_id)
            .execute(&self.pool)
            .await
            .map_err(|e| BlogError::database("ピボットの削除", e))?;

        debug!(tag_id, post_id, "ピボットを削除");
        Ok(())
    }

    async fn add_tag_to_post(&self, tag: &BlogTag, post: &BlogPost) -> BlogResult<()> {
        let tag_id = tag.require_id()?;
        let post_id = post.require_id()?;

        sqlx::query("INSERT INTO blog_post_tags (tag_id, post_id) VALUES ($1, $2)")
            .bind(tag_id)
            .bind(post_id)
            .execute(&self.pool)
            .await
            .map_err(|e| BlogError::database("ピボットの作成", e))?;

        debug!(tag_id, post_id, "ピボットを作成");
        Ok(())
    }

    async fn delete_orphan_tags(&self) -> BlogResult<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM blog_tags t
            WHERE NOT EXISTS (
                SELECT 1 FROM blog_post_tags pt WHERE pt.tag_id = t.id
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| BlogError::database("孤児タグの削除", e))?;

        let removed = result.rows_affected();
        debug!(removed, "孤児タグを削除");
        Ok(removed)
    }
}
