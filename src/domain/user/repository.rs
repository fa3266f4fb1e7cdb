use super::model::BlogUser;
use crate::types::{BlogError, BlogResult};
use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use tracing::debug;

/// SELECT句で常に使うユーザーテーブルの列並び
const USER_COLUMNS: &str = "id, username, name, profile_picture, tagline";

/// 著者リポジトリの抽象化トレイト
#[async_trait]
pub trait BlogUserRepository: Send + Sync {
    /// 全ユーザーをユーザー名順で取得する
    async fn get_all_users(&self) -> BlogResult<Vec<BlogUser>>;

    /// 全ユーザーを、それぞれの公開投稿数とあわせて取得する
    async fn get_all_users_with_post_count(&self) -> BlogResult<Vec<(BlogUser, i64)>>;

    /// IDでユーザーを1件取得する
    async fn get_user_by_id(&self, id: i32) -> BlogResult<Option<BlogUser>>;

    /// ユーザー名でユーザーを1件取得する
    async fn get_user_by_username(&self, username: &str) -> BlogResult<Option<BlogUser>>;

    /// ユーザーを保存する（IDが未設定なら挿入、設定済みなら更新）
    async fn store_user(&self, user: &BlogUser) -> BlogResult<BlogUser>;

    /// ユーザーを削除する
    async fn delete_user(&self, user: &BlogUser) -> BlogResult<()>;

    /// ユーザーの総数を取得する
    async fn count_users(&self) -> BlogResult<i64>;
}

/// get_all_users_with_post_count用の集計行
#[derive(Debug, FromRow)]
struct UserPostCountRow {
    id: i32,
    username: String,
    name: String,
    profile_picture: Option<String>,
    tagline: Option<String>,
    post_count: i64,
}

/// PostgreSQLを使用した本番用の著者リポジトリ実装
pub struct PgBlogUserRepository {
    pool: PgPool,
}

impl PgBlogUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BlogUserRepository for PgBlogUserRepository {
    async fn get_all_users(&self) -> BlogResult<Vec<BlogUser>> {
        sqlx::query_as::<_, BlogUser>(&format!(
            "SELECT {} FROM blog_users ORDER BY username",
            USER_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| BlogError::database("ユーザー一覧の取得", e))
    }

    async fn get_all_users_with_post_count(&self) -> BlogResult<Vec<(BlogUser, i64)>> {
        let rows = sqlx::query_as::<_, UserPostCountRow>(
            r#"
            SELECT u.id, u.username, u.name, u.profile_picture, u.tagline,
                   COUNT(p.id) AS post_count
            FROM blog_users u
            LEFT JOIN blog_posts p ON p.author_id = u.id AND p.published = TRUE
            GROUP BY u.id, u.username, u.name, u.profile_picture, u.tagline
            ORDER BY u.username
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| BlogError::database("ユーザー別投稿数の取得", e))?;

        Ok(rows
            .into_iter()
            .map(|row| {
                (
                    BlogUser {
                        id: Some(row.id),
                        username: row.username,
                        name: row.name,
                        profile_picture: row.profile_picture,
                        tagline: row.tagline,
                    },
                    row.post_count,
                )
            })
            .collect())
    }

    async fn get_user_by_id(&self, id: i32) -> BlogResult<Option<BlogUser>> {
        sqlx::query_as::<_, BlogUser>(&format!(
            "SELECT {} FROM blog_users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| BlogError::database("IDによるユーザーの取得", e))
    }

    async fn get_user_by_username(&self, username: &str) -> BlogResult<Option<BlogUser>> {
        sqlx::query_as::<_, BlogUser>(&format!(
            "SELECT {} FROM blog_users WHERE username = $1",
            USER_COLUMNS
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| BlogError::database("ユーザー名によるユーザーの取得", e))
    }

    async fn store_user(&self, user: &BlogUser) -> BlogResult<BlogUser> {
        let stored = match user.id {
            None => sqlx::query_as::<_, BlogUser>(&format!(
                r#"
                INSERT INTO blog_users (username, name, profile_picture, tagline)
                VALUES ($1, $2, $3, $4)
                RETURNING {}
                "#,
                USER_COLUMNS
            ))
            .bind(&user.username)
            .bind(&user.name)
            .bind(&user.profile_picture)
            .bind(&user.tagline)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| BlogError::database("ユーザーの挿入", e))?,
            Some(id) => sqlx::query_as::<_, BlogUser>(&format!(
                r#"
                UPDATE blog_users
                SET username = $1, name = $2, profile_picture = $3, tagline = $4
                WHERE id = $5
                RETURNING {}
                "#,
                USER_COLUMNS
            ))
            .bind(&user.username)
            .bind(&user.name)
            .bind(&user.profile_picture)
            .bind(&user.tagline)
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| BlogError::database("ユーザーの更新", e))?,
        };

        debug!(user_id = ?stored.id, username = %stored.username, "ユーザーを保存");
        Ok(stored)
    }

    async fn delete_user(&self, user: &BlogUser) -> BlogResult<()> {
        let id = user.require_id()?;

        sqlx::query("DELETE FROM blog_users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| BlogError::database("ユーザーの削除", e))?;

        debug!(user_id = id, "ユーザーを削除");
        Ok(())
    }

    async fn count_users(&self) -> BlogResult<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM blog_users")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| BlogError::database("ユーザー数の取得", e))
    }
}
