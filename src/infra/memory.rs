use crate::domain::post::model::BlogPost;
use crate::domain::post::repository::BlogPostRepository;
use crate::domain::tag::model::BlogTag;
use crate::domain::tag::repository::BlogTagRepository;
use crate::domain::user::model::BlogUser;
use crate::domain::user::repository::BlogUserRepository;
use crate::types::{BlogError, BlogResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

/// テスト用のインメモリストレージアダプタ
///
/// 3つのリポジトリ契約をすべて1つの構造体で実装し、
/// ストレージエンジン全体の代役としてDIされる。
/// 呼び出した操作名を記録するので、「クエリを発行していないこと」の
/// 検証（空検索のショートサーキット等）にも使える。
///
/// 本物のストレージと異なり、ピボットの(tag, post)一意性制約は
/// 持たない。コア自体は重複ピボットを確認しないという契約を
/// そのまま観察できる。
pub struct InMemoryBlogRepository {
    users: Mutex<Vec<BlogUser>>,
    posts: Mutex<Vec<BlogPost>>,
    tags: Mutex<Vec<BlogTag>>,
    /// (tag_id, post_id)
    pivots: Mutex<Vec<(i32, i32)>>,
    calls: Mutex<Vec<&'static str>>,
    fail_mode: AtomicBool,
}

impl InMemoryBlogRepository {
    /// 空のインメモリストレージを作成する
    pub fn new() -> Self {
        Self {
            users: Mutex::new(Vec::new()),
            posts: Mutex::new(Vec::new()),
            tags: Mutex::new(Vec::new()),
            pivots: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
            fail_mode: AtomicBool::new(false),
        }
    }

    /// 以降のすべての操作をストレージ障害として失敗させるかを切り替える
    pub fn set_fail_mode(&self, fail: bool) {
        self.fail_mode.store(fail, Ordering::SeqCst);
    }

    /// これまでに呼び出されたリポジトリ操作の数
    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    /// 呼び出されたリポジトリ操作名の一覧
    pub fn calls(&self) -> Vec<&'static str> {
        lock(&self.calls).clone()
    }

    /// 呼び出し記録をクリアする
    pub fn clear_call_log(&self) {
        lock(&self.calls).clear();
    }

    /// 操作を記録し、失敗モードならストレージ障害を返す
    fn record(&self, operation: &'static str) -> BlogResult<()> {
        lock(&self.calls).push(operation);
        if self.fail_mode.load(Ordering::SeqCst) {
            return Err(BlogError::database(operation, sqlx::Error::PoolClosed));
        }
        Ok(())
    }

    fn next_post_id(posts: &[BlogPost]) -> i32 {
        posts.iter().filter_map(|p| p.id).max().unwrap_or(0) + 1
    }

    fn next_tag_id(tags: &[BlogTag]) -> i32 {
        tags.iter().filter_map(|t| t.id).max().unwrap_or(0) + 1
    }

    fn next_user_id(users: &[BlogUser]) -> i32 {
        users.iter().filter_map(|u| u.id).max().unwrap_or(0) + 1
    }

    /// 作成日時の降順（同時刻はID降順）に並べる
    fn sort_recent_first(posts: &mut [BlogPost]) {
        posts.sort_by(|a, b| b.created.cmp(&a.created).then(b.id.cmp(&a.id)));
    }

    fn page(posts: Vec<BlogPost>, count: i64, offset: i64) -> Vec<BlogPost> {
        posts
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(count.max(0) as usize)
            .collect()
    }
}

impl Default for InMemoryBlogRepository {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().expect("インメモリストレージのロックに失敗")
}

#[async_trait]
impl BlogPostRepository for InMemoryBlogRepository {
    async fn get_posts_sorted(&self, include_drafts: bool) -> BlogResult<Vec<BlogPost>> {
        self.record("get_posts_sorted")?;
        let mut posts: Vec<BlogPost> = lock(&self.posts)
            .iter()
            .filter(|p| include_drafts || p.published)
            .cloned()
            .collect();
        Self::sort_recent_first(&mut posts);
        Ok(posts)
    }

    async fn count_posts(&self, include_drafts: bool) -> BlogResult<i64> {
        self.record("count_posts")?;
        let count = lock(&self.posts)
            .iter()
            .filter(|p| include_drafts || p.published)
            .count();
        Ok(count as i64)
    }

    async fn get_posts_sorted_paged(
        &self,
        include_drafts: bool,
        count: i64,
        offset: i64,
    ) -> BlogResult<Vec<BlogPost>> {
        self.record("get_posts_sorted_paged")?;
        let mut posts: Vec<BlogPost> = lock(&self.posts)
            .iter()
            .filter(|p| include_drafts || p.published)
            .cloned()
            .collect();
        Self::sort_recent_first(&mut posts);
        Ok(Self::page(posts, count, offset))
    }

    async fn get_posts_for_author(
        &self,
        author: &BlogUser,
        include_drafts: bool,
        count: i64,
        offset: i64,
    ) -> BlogResult<Vec<BlogPost>> {
        self.record("get_posts_for_author")?;
        let author_id = author.require_id()?;
        let mut posts: Vec<BlogPost> = lock(&self.posts)
            .iter()
            .filter(|p| p.author_id == author_id && (include_drafts || p.published))
            .cloned()
            .collect();
        Self::sort_recent_first(&mut posts);
        Ok(Self::page(posts, count, offset))
    }

    async fn count_posts_for_author(&self, author: &BlogUser) -> BlogResult<i64> {
        self.record("count_posts_for_author")?;
        let author_id = author.require_id()?;
        let count = lock(&self.posts)
            .iter()
            .filter(|p| p.author_id == author_id && p.published)
            .count();
        Ok(count as i64)
    }

    async fn get_post_by_slug(&self, slug: &str) -> BlogResult<Option<BlogPost>> {
        self.record("get_post_by_slug")?;
        Ok(lock(&self.posts)
            .iter()
            .find(|p| p.slug_url == slug)
            .cloned())
    }

    async fn get_post_by_id(&self, id: i32) -> BlogResult<Option<BlogPost>> {
        self.record("get_post_by_id")?;
        Ok(lock(&self.posts).iter().find(|p| p.id == Some(id)).cloned())
    }

    async fn get_published_posts_for_tag(
        &self,
        tag: &BlogTag,
        count: i64,
        offset: i64,
    ) -> BlogResult<Vec<BlogPost>> {
        self.record("get_published_posts_for_tag")?;
        let tag_id = tag.require_id()?;
        let post_ids: Vec<i32> = lock(&self.pivots)
            .iter()
            .filter(|(t, _)| *t == tag_id)
            .map(|(_, p)| *p)
            .collect();
        let mut posts: Vec<BlogPost> = lock(&self.posts)
            .iter()
            .filter(|p| p.published && p.id.map(|id| post_ids.contains(&id)).unwrap_or(false))
            .cloned()
            .collect();
        Self::sort_recent_first(&mut posts);
        Ok(Self::page(posts, count, offset))
    }

    async fn count_published_posts_for_tag(&self, tag: &BlogTag) -> BlogResult<i64> {
        self.record("count_published_posts_for_tag")?;
        let tag_id = tag.require_id()?;
        let post_ids: Vec<i32> = lock(&self.pivots)
            .iter()
            .filter(|(t, _)| *t == tag_id)
            .map(|(_, p)| *p)
            .collect();
        let count = lock(&self.posts)
            .iter()
            .filter(|p| p.published && p.id.map(|id| post_ids.contains(&id)).unwrap_or(false))
            .count();
        Ok(count as i64)
    }

    async fn search_published_posts(
        &self,
        search_term: &str,
        count: i64,
        offset: i64,
    ) -> BlogResult<Vec<BlogPost>> {
        self.record("search_published_posts")?;
        let needle = search_term.to_lowercase();
        let mut posts: Vec<BlogPost> = lock(&self.posts)
            .iter()
            .filter(|p| p.published && p.title.to_lowercase().contains(&needle))
            .cloned()
            .collect();
        Self::sort_recent_first(&mut posts);
        Ok(Self::page(posts, count, offset))
    }

    async fn count_published_posts_for_search(&self, search_term: &str) -> BlogResult<i64> {
        self.record("count_published_posts_for_search")?;
        let needle = search_term.to_lowercase();
        let count = lock(&self.posts)
            .iter()
            .filter(|p| p.published && p.title.to_lowercase().contains(&needle))
            .count();
        Ok(count as i64)
    }

    async fn store_post(&self, post: &BlogPost) -> BlogResult<BlogPost> {
        self.record("store_post")?;
        let mut posts = lock(&self.posts);
        let mut stored = post.clone();
        match stored.id {
            None => {
                stored.id = Some(Self::next_post_id(&posts));
                posts.push(stored.clone());
            }
            Some(id) => {
                if let Some(existing) = posts.iter_mut().find(|p| p.id == Some(id)) {
                    *existing = stored.clone();
                } else {
                    posts.push(stored.clone());
                }
            }
        }
        Ok(stored)
    }

    async fn delete_post(&self, post: &BlogPost) -> BlogResult<()> {
        self.record("delete_post")?;
        let id = post.require_id()?;
        lock(&self.posts).retain(|p| p.id != Some(id));
        // 外部キーのカスケードと同じく、投稿のピボットも消える
        lock(&self.pivots).retain(|(_, p)| *p != id);
        Ok(())
    }
}

#[async_trait]
impl BlogTagRepository for InMemoryBlogRepository {
    async fn get_all_tags(&self) -> BlogResult<Vec<BlogTag>> {
        self.record("get_all_tags")?;
        let mut tags = lock(&self.tags).clone();
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tags)
    }

    async fn get_all_tags_with_post_count(&self) -> BlogResult<Vec<(BlogTag, i64)>> {
        self.record("get_all_tags_with_post_count")?;
        let posts = lock(&self.posts);
        let pivots = lock(&self.pivots);
        let mut tags = lock(&self.tags).clone();
        tags.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(tags
            .into_iter()
            .map(|tag| {
                let count = pivots
                    .iter()
                    .filter(|(t, p)| {
                        Some(*t) == tag.id
                            && posts
                                .iter()
                                .any(|post| post.id == Some(*p) && post.published)
                    })
                    .count() as i64;
                (tag, count)
            })
            .collect())
    }

    async fn get_tags_for_post(&self, post: &BlogPost) -> BlogResult<Vec<BlogTag>> {
        self.record("get_tags_for_post")?;
        let post_id = post.require_id()?;
        let pivots = lock(&self.pivots);
        let mut tags: Vec<BlogTag> = lock(&self.tags)
            .iter()
            .filter(|t| {
                pivots
                    .iter()
                    .any(|(tag_id, p)| Some(*tag_id) == t.id && *p == post_id)
            })
            .cloned()
            .collect();
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tags)
    }

    async fn get_tags_for_all_posts(&self) -> BlogResult<HashMap<i32, Vec<BlogTag>>> {
        self.record("get_tags_for_all_posts")?;
        let pivots = lock(&self.pivots);
        let tags = lock(&self.tags);
        let mut tags_by_post: HashMap<i32, Vec<BlogTag>> = HashMap::new();
        for (tag_id, post_id) in pivots.iter() {
            if let Some(tag) = tags.iter().find(|t| t.id == Some(*tag_id)) {
                tags_by_post.entry(*post_id).or_default().push(tag.clone());
            }
        }
        for tags in tags_by_post.values_mut() {
            tags.sort_by(|a, b| a.name.cmp(&b.name));
        }
        Ok(tags_by_post)
    }

    async fn get_tag_by_name(&self, name: &str) -> BlogResult<Option<BlogTag>> {
        self.record("get_tag_by_name")?;
        // 完全一致（大文字小文字の区別あり、正規化なし）
        Ok(lock(&self.tags).iter().find(|t| t.name == name).cloned())
    }

    async fn store_tag(&self, tag: &BlogTag) -> BlogResult<BlogTag> {
        self.record("store_tag")?;
        let mut tags = lock(&self.tags);
        let mut stored = tag.clone();
        match stored.id {
            None => {
                stored.id = Some(Self::next_tag_id(&tags));
                tags.push(stored.clone());
            }
            Some(id) => {
                if let Some(existing) = tags.iter_mut().find(|t| t.id == Some(id)) {
                    *existing = stored.clone();
                } else {
                    tags.push(stored.clone());
                }
            }
        }
        Ok(stored)
    }

    async fn delete_tags_for_post(&self, post: &BlogPost) -> BlogResult<()> {
        self.record("delete_tags_for_post")?;
        let post_id = post.require_id()?;
        lock(&self.pivots).retain(|(_, p)| *p != post_id);
        Ok(())
    }

    async fn remove_tag_from_post(&self, tag: &BlogTag, post: &BlogPost) -> BlogResult<()> {
        self.record("remove_tag_from_post")?;
        let tag_id = tag.require_id()?;
        let post_id = post.require_id()?;
        lock(&self.pivots).retain(|(t, p)| !(*t == tag_id && *p == post_id));
        Ok(())
    }

    async fn add_tag_to_post(&self, tag: &BlogTag, post: &BlogPost) -> BlogResult<()> {
        self.record("add_tag_to_post")?;
        let tag_id = tag.require_id()?;
        let post_id = post.require_id()?;
        lock(&self.pivots).push((tag_id, post_id));
        Ok(())
    }

    async fn delete_orphan_tags(&self) -> BlogResult<u64> {
        self.record("delete_orphan_tags")?;
        let pivots = lock(&self.pivots);
        let mut tags = lock(&self.tags);
        let before = tags.len();
        tags.retain(|t| pivots.iter().any(|(tag_id, _)| Some(*tag_id) == t.id));
        Ok((before - tags.len()) as u64)
    }
}

#[async_trait]
impl BlogUserRepository for InMemoryBlogRepository {
    async fn get_all_users(&self) -> BlogResult<Vec<BlogUser>> {
        self.record("get_all_users")?;
        let mut users = lock(&self.users).clone();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(users)
    }

    async fn get_all_users_with_post_count(&self) -> BlogResult<Vec<(BlogUser, i64)>> {
        self.record("get_all_users_with_post_count")?;
        let posts = lock(&self.posts);
        let mut users = lock(&self.users).clone();
        users.sort_by(|a, b| a.username.cmp(&b.username));

        Ok(users
            .into_iter()
            .map(|user| {
                let count = posts
                    .iter()
                    .filter(|p| Some(p.author_id) == user.id && p.published)
                    .count() as i64;
                (user, count)
            })
            .collect())
    }

    async fn get_user_by_id(&self, id: i32) -> BlogResult<Option<BlogUser>> {
        self.record("get_user_by_id")?;
        Ok(lock(&self.users).iter().find(|u| u.id == Some(id)).cloned())
    }

    async fn get_user_by_username(&self, username: &str) -> BlogResult<Option<BlogUser>> {
        self.record("get_user_by_username")?;
        Ok(lock(&self.users)
            .iter()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn store_user(&self, user: &BlogUser) -> BlogResult<BlogUser> {
        self.record("store_user")?;
        let mut users = lock(&self.users);
        let mut stored = user.clone();
        match stored.id {
            None => {
                stored.id = Some(Self::next_user_id(&users));
                users.push(stored.clone());
            }
            Some(id) => {
                if let Some(existing) = users.iter_mut().find(|u| u.id == Some(id)) {
                    *existing = stored.clone();
                } else {
                    users.push(stored.clone());
                }
            }
        }
        Ok(stored)
    }

    async fn delete_user(&self, user: &BlogUser) -> BlogResult<()> {
        self.record("delete_user")?;
        let id = user.require_id()?;
        lock(&self.users).retain(|u| u.id != Some(id));
        Ok(())
    }

    async fn count_users(&self) -> BlogResult<i64> {
        self.record("count_users")?;
        Ok(lock(&self.users).len() as i64)
    }
}
