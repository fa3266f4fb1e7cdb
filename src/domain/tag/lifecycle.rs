use super::model::BlogTag;
use super::repository::BlogTagRepository;
use crate::domain::post::model::BlogPost;
use crate::types::BlogResult;
use tracing::debug;

/// 投稿にタグを付ける
///
/// 名前の完全一致で既存タグを探し、あれば再利用、なければ新規作成して
/// 保存する。その後、再利用・新規にかかわらずピボットを作成する。
/// 同じ名前で何度呼んでもタグ行は1つのままだが、ピボットの重複は
/// ここでは確認しない（(tag, post)の一意性はストレージ層の制約に任せる）。
///
/// 同名の新規タグを同時に作成する競合もこの層では直列化しない。
/// タグ名の一意性制約がストレージ側の最終防壁になる。
pub async fn add_tag<R>(name: &str, post: &BlogPost, repo: &R) -> BlogResult<BlogTag>
where
    R: BlogTagRepository + ?Sized,
{
    let tag = match repo.get_tag_by_name(name).await? {
        Some(existing) => {
            debug!(tag_id = ?existing.id, name = %existing.name, "既存タグを再利用");
            existing
        }
        None => {
            let created = repo.store_tag(&BlogTag::new(name)).await?;
            debug!(tag_id = ?created.id, name = %created.name, "新規タグを作成");
            created
        }
    };

    repo.add_tag_to_post(&tag, post).await?;
    Ok(tag)
}

/// タグと投稿のピボットを1件削除する（タグ行自体は残す）
pub async fn delete_pivot<R>(tag: &BlogTag, post: &BlogPost, repo: &R) -> BlogResult<()>
where
    R: BlogTagRepository + ?Sized,
{
    repo.remove_tag_from_post(tag, post).await
}

/// どの投稿にも紐づかなくなった孤児タグを掃除し、削除件数を返す
///
/// ピボット削除時に自動で呼ばれることはない。運用側が明示的に
/// スケジュールする独立した操作
pub async fn sweep_orphan_tags<R>(repo: &R) -> BlogResult<u64>
where
    R: BlogTagRepository + ?Sized,
{
    let removed = repo.delete_orphan_tags().await?;
    debug!(removed, "孤児タグを掃除");
    Ok(removed)
}

#[cfg(all(test, feature = "db"))]
mod pg_tests {
    use super::*;
    use crate::domain::post::repository::{BlogPostRepository, PgBlogPostRepository};
    use crate::domain::tag::repository::PgBlogTagRepository;
    use crate::domain::user::model::BlogUser;
    use crate::domain::user::repository::{BlogUserRepository, PgBlogUserRepository};
    use chrono::Utc;
    use sqlx::PgPool;

    #[sqlx::test]
    async fn test_add_tag_dedup_on_postgres(pool: PgPool) -> BlogResult<()> {
        let user_repo = PgBlogUserRepository::new(pool.clone());
        let post_repo = PgBlogPostRepository::new(pool.clone());
        let tag_repo = PgBlogTagRepository::new(pool.clone());

        let author = user_repo.store_user(&BlogUser::new("alice", "Alice")).await?;
        let author_id = author.require_id()?;
        let first = post_repo
            .store_post(&BlogPost::new("1本目", "本文", "first", true, Utc::now(), author_id))
            .await?;
        let second = post_repo
            .store_post(&BlogPost::new("2本目", "本文", "second", true, Utc::now(), author_id))
            .await?;

        let tag1 = add_tag("rust", &first, &tag_repo).await?;
        let tag2 = add_tag("rust", &second, &tag_repo).await?;
        assert_eq!(tag1.id, tag2.id, "同名タグが2行作られた");

        let tag_count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM blog_tags")
            .fetch_one(&pool)
            .await
            .map_err(|e| crate::types::BlogError::database("タグ数の取得", e))?;
        assert_eq!(tag_count, 1, "タグ行は1つのはず");

        let pivot_count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM blog_post_tags")
            .fetch_one(&pool)
            .await
            .map_err(|e| crate::types::BlogError::database("ピボット数の取得", e))?;
        assert_eq!(pivot_count, 2, "ピボットは2件のはず");

        println!("✅ Postgres上のタグdedup検証成功");
        Ok(())
    }

    #[sqlx::test]
    async fn test_duplicate_pivot_rejected_by_constraint(pool: PgPool) -> BlogResult<()> {
        // コアはピボットの重複を確認しないので、同じ(tag, post)の
        // 2回目のadd_tagは主キー制約違反としてDatabaseエラーになる
        let user_repo = PgBlogUserRepository::new(pool.clone());
        let post_repo = PgBlogPostRepository::new(pool.clone());
        let tag_repo = PgBlogTagRepository::new(pool);

        let author = user_repo.store_user(&BlogUser::new("alice", "Alice")).await?;
        let post = post_repo
            .store_post(&BlogPost::new(
                "投稿",
                "本文",
                "post",
                true,
                Utc::now(),
                author.require_id()?,
            ))
            .await?;

        add_tag("rust", &post, &tag_repo).await?;
        let result = add_tag("rust", &post, &tag_repo).await;
        assert!(
            matches!(result, Err(crate::types::BlogError::Database { .. })),
            "重複ピボットが制約に弾かれていない"
        );

        println!("✅ ピボット一意性制約検証成功");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::post::repository::BlogPostRepository;
    use crate::domain::user::model::BlogUser;
    use crate::domain::user::repository::BlogUserRepository;
    use crate::infra::memory::InMemoryBlogRepository;
    use chrono::Utc;

    async fn seed_two_posts(repo: &InMemoryBlogRepository) -> BlogResult<(BlogPost, BlogPost)> {
        let author = repo.store_user(&BlogUser::new("alice", "Alice")).await?;
        let author_id = author.require_id()?;

        let first = repo
            .store_post(&BlogPost::new(
                "1本目",
                "本文",
                "first",
                true,
                Utc::now(),
                author_id,
            ))
            .await?;
        let second = repo
            .store_post(&BlogPost::new(
                "2本目",
                "本文",
                "second",
                true,
                Utc::now(),
                author_id,
            ))
            .await?;
        Ok((first, second))
    }

    #[tokio::test]
    async fn test_add_tag_deduplicates_by_name() -> BlogResult<()> {
        let repo = InMemoryBlogRepository::new();
        let (first, second) = seed_two_posts(&repo).await?;

        // 同じ名前で2つの投稿にタグ付けしてもタグ行は1つだけ
        let tag1 = add_tag("rust", &first, &repo).await?;
        let tag2 = add_tag("rust", &second, &repo).await?;
        assert_eq!(tag1.id, tag2.id, "同名タグが2行作られた");

        let all_tags = repo.get_all_tags().await?;
        assert_eq!(all_tags.len(), 1, "タグ行は1つのはず");

        // ピボットは投稿ごとに別々に2件できる
        assert_eq!(repo.count_published_posts_for_tag(&tag1).await?, 2);

        println!("✅ タグ名dedup検証成功");
        Ok(())
    }

    #[tokio::test]
    async fn test_add_tag_is_case_sensitive() -> BlogResult<()> {
        let repo = InMemoryBlogRepository::new();
        let (first, _) = seed_two_posts(&repo).await?;

        // 大文字小文字が違えば別のタグ
        add_tag("Rust", &first, &repo).await?;
        add_tag("rust", &first, &repo).await?;

        assert_eq!(repo.get_all_tags().await?.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_pivot_keeps_tag_row() -> BlogResult<()> {
        let repo = InMemoryBlogRepository::new();
        let (first, second) = seed_two_posts(&repo).await?;

        let tag = add_tag("rust", &first, &repo).await?;
        add_tag("rust", &second, &repo).await?;

        delete_pivot(&tag, &first, &repo).await?;

        // 1本目との関連だけが消え、タグ行と2本目のピボットは残る
        assert_eq!(repo.count_published_posts_for_tag(&tag).await?, 1);
        assert!(repo.get_tag_by_name("rust").await?.is_some());

        Ok(())
    }

    #[tokio::test]
    async fn test_sweep_removes_only_orphans() -> BlogResult<()> {
        let repo = InMemoryBlogRepository::new();
        let (first, _) = seed_two_posts(&repo).await?;

        let used = add_tag("rust", &first, &repo).await?;
        // ピボットなしの孤児タグを直接作る
        repo.store_tag(&BlogTag::new("未使用")).await?;

        // ピボット削除では掃除は起きない
        delete_pivot(&used, &first, &repo).await?;
        assert_eq!(repo.get_all_tags().await?.len(), 2, "掃除が自動で走った");

        // 明示的な掃除で孤児（rustもピボットを失い孤児になっている）が消える
        let removed = sweep_orphan_tags(&repo).await?;
        assert_eq!(removed, 2);
        assert!(repo.get_all_tags().await?.is_empty());

        println!("✅ 孤児タグ掃除検証成功");
        Ok(())
    }
}
