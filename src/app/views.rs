use super::presenter::{
    AllAuthorsViewContext, AllTagsViewContext, AuthorViewContext, BlogPresenter,
    IndexViewContext, PostViewContext, SearchViewContext, TagViewContext,
};
use crate::domain::pagination::{offset_for, paginate};
use crate::domain::post::repository::BlogPostRepository;
use crate::domain::tag::repository::BlogTagRepository;
use crate::domain::user::repository::BlogUserRepository;
use crate::types::{BlogConfig, BlogError, BlogResult};
use std::collections::HashMap;
use tracing::debug;

/// リクエストされたページ番号を正規化する（未指定は1ページ目）
fn requested_page(page: Option<u32>) -> u32 {
    page.unwrap_or(1).max(1)
}

/// (エンティティ, 件数)の列をID引きのマップに組み替える
///
/// どれか1つでもIDが未設定ならConsistencyViolationで全体を失敗させる。
/// これは呼び出し側に見せるエラーではなく、保存済みエンティティしか
/// ここに来ないというプログラミング上の不変条件の検査
pub(crate) fn counts_by_id<T>(
    pairs: Vec<(T, i64)>,
    require_id: impl Fn(&T) -> BlogResult<i32>,
) -> BlogResult<(Vec<T>, HashMap<i32, i64>)> {
    let mut entities = Vec::with_capacity(pairs.len());
    let mut counts = HashMap::with_capacity(pairs.len());
    for (entity, count) in pairs {
        counts.insert(require_id(&entity)?, count);
        entities.push(entity);
    }
    Ok((entities, counts))
}

/// インデックスビュー（新着順の公開投稿一覧）
///
/// ページ分の投稿・全タグ・全著者・公開投稿総数・投稿別タグ対応の
/// 5クエリを同時に発行し、すべて揃ってからペイロードを組み立てる。
/// どれか1つでも失敗すれば集約全体が失敗する
pub async fn index_view<PR, TR, UR, P>(
    post_repo: &PR,
    tag_repo: &TR,
    user_repo: &UR,
    presenter: &P,
    page: Option<u32>,
    current_query: Option<&str>,
    config: &BlogConfig,
) -> BlogResult<P::Output>
where
    PR: BlogPostRepository + ?Sized,
    TR: BlogTagRepository + ?Sized,
    UR: BlogUserRepository + ?Sized,
    P: BlogPresenter,
{
    let page = requested_page(page);
    let page_size = config.posts_per_page;
    let offset = offset_for(page, page_size);

    let (posts, tags, authors, total_posts, tags_for_posts) = tokio::try_join!(
        post_repo.get_posts_sorted_paged(false, page_size as i64, offset),
        tag_repo.get_all_tags(),
        user_repo.get_all_users(),
        post_repo.count_posts(false),
        tag_repo.get_tags_for_all_posts(),
    )?;

    debug!(page, total_posts, "インデックスビューを組み立て");
    presenter.index_view(IndexViewContext {
        posts,
        tags,
        authors,
        tags_for_posts,
        pagination: paginate(page, total_posts, page_size, current_query),
    })
}

/// 個別投稿ビュー
///
/// まずスラッグで投稿を解決し（なければNotFound）、その投稿に依存する
/// 著者とタグの2クエリを同時に発行する。著者が解決できないのは
/// データ不整合であり、呼び出し側にはNotFoundとして見せない
pub async fn post_view<PR, TR, UR, P>(
    post_repo: &PR,
    tag_repo: &TR,
    user_repo: &UR,
    presenter: &P,
    slug: &str,
) -> BlogResult<P::Output>
where
    PR: BlogPostRepository + ?Sized,
    TR: BlogTagRepository + ?Sized,
    UR: BlogUserRepository + ?Sized,
    P: BlogPresenter,
{
    let post = post_repo
        .get_post_by_slug(slug)
        .await?
        .ok_or_else(|| BlogError::not_found("投稿", slug))?;

    let (author, tags) = tokio::try_join!(
        user_repo.get_user_by_id(post.author_id),
        tag_repo.get_tags_for_post(&post),
    )?;
    let author = author.ok_or_else(|| {
        BlogError::consistency(format!(
            "投稿{}の著者(ID={})が存在しません",
            slug, post.author_id
        ))
    })?;

    presenter.post_view(PostViewContext { post, author, tags })
}

/// タグ別一覧ビュー
///
/// タグを名前キーで解決してから、タグの公開投稿ページ・その総数・
/// 全著者の3クエリを同時に発行する
pub async fn tag_view<PR, TR, UR, P>(
    post_repo: &PR,
    tag_repo: &TR,
    user_repo: &UR,
    presenter: &P,
    tag_name: &str,
    page: Option<u32>,
    current_query: Option<&str>,
    config: &BlogConfig,
) -> BlogResult<P::Output>
where
    PR: BlogPostRepository + ?Sized,
    TR: BlogTagRepository + ?Sized,
    UR: BlogUserRepository + ?Sized,
    P: BlogPresenter,
{
    let tag = tag_repo
        .get_tag_by_name(tag_name)
        .await?
        .ok_or_else(|| BlogError::not_found("タグ", tag_name))?;

    let page = requested_page(page);
    let page_size = config.posts_per_page;
    let offset = offset_for(page, page_size);

    let (posts, total_posts, authors) = tokio::try_join!(
        post_repo.get_published_posts_for_tag(&tag, page_size as i64, offset),
        post_repo.count_published_posts_for_tag(&tag),
        user_repo.get_all_users(),
    )?;

    presenter.tag_view(TagViewContext {
        tag,
        posts,
        authors,
        total_posts,
        pagination: paginate(page, total_posts, page_size, current_query),
    })
}

/// 著者別一覧ビュー
///
/// 著者をユーザー名で解決してから（なければNotFound）、著者の公開投稿
/// ページ・その総数・投稿別タグ対応の3クエリを同時に発行する
pub async fn author_view<PR, TR, UR, P>(
    post_repo: &PR,
    tag_repo: &TR,
    user_repo: &UR,
    presenter: &P,
    username: &str,
    page: Option<u32>,
    current_query: Option<&str>,
    config: &BlogConfig,
) -> BlogResult<P::Output>
where
    PR: BlogPostRepository + ?Sized,
    TR: BlogTagRepository + ?Sized,
    UR: BlogUserRepository + ?Sized,
    P: BlogPresenter,
{
    let author = user_repo
        .get_user_by_username(username)
        .await?
        .ok_or_else(|| BlogError::not_found("著者", username))?;

    let page = requested_page(page);
    let page_size = config.posts_per_page;
    let offset = offset_for(page, page_size);

    let (posts, post_count, tags_for_posts) = tokio::try_join!(
        post_repo.get_posts_for_author(&author, false, page_size as i64, offset),
        post_repo.count_posts_for_author(&author),
        tag_repo.get_tags_for_all_posts(),
    )?;

    presenter.author_view(AuthorViewContext {
        author,
        posts,
        post_count,
        tags_for_posts,
        pagination: paginate(page, post_count, page_size, current_query),
    })
}

/// タグ一覧ビュー（全タグとそれぞれの公開投稿数）
pub async fn all_tags_view<TR, P>(tag_repo: &TR, presenter: &P) -> BlogResult<P::Output>
where
    TR: BlogTagRepository + ?Sized,
    P: BlogPresenter,
{
    let pairs = tag_repo.get_all_tags_with_post_count().await?;
    let (tags, tag_post_counts) = counts_by_id(pairs, |tag| tag.require_id())?;

    presenter.all_tags_view(AllTagsViewContext {
        tags,
        tag_post_counts,
    })
}

/// 著者一覧ビュー（全著者とそれぞれの公開投稿数）
pub async fn all_authors_view<UR, P>(user_repo: &UR, presenter: &P) -> BlogResult<P::Output>
where
    UR: BlogUserRepository + ?Sized,
    P: BlogPresenter,
{
    let pairs = user_repo.get_all_users_with_post_count().await?;
    let (authors, author_post_counts) = counts_by_id(pairs, |user| user.require_id())?;

    presenter.all_authors_view(AllAuthorsViewContext {
        authors,
        author_post_counts,
    })
}

/// 検索ビュー
///
/// 検索語が未指定・空白のみの場合はリポジトリに一切問い合わせず、
/// 総件数0のペイロードを即座に返す。検索語がある場合は一致投稿の
/// ページ・総件数・全著者・投稿別タグ対応の4クエリを同時に発行する
pub async fn search_view<PR, TR, UR, P>(
    post_repo: &PR,
    tag_repo: &TR,
    user_repo: &UR,
    presenter: &P,
    search_term: Option<&str>,
    page: Option<u32>,
    current_query: Option<&str>,
    config: &BlogConfig,
) -> BlogResult<P::Output>
where
    PR: BlogPostRepository + ?Sized,
    TR: BlogTagRepository + ?Sized,
    UR: BlogUserRepository + ?Sized,
    P: BlogPresenter,
{
    let page = requested_page(page);
    let page_size = config.posts_per_page;

    let term = search_term.map(str::trim).filter(|t| !t.is_empty());
    let Some(term) = term else {
        debug!("検索語が空のためゼロ件ペイロードを返す");
        return presenter.search_view(SearchViewContext {
            search_term: None,
            total_results: 0,
            posts: Vec::new(),
            authors: Vec::new(),
            tags_for_posts: HashMap::new(),
            pagination: paginate(page, 0, page_size, current_query),
        });
    };

    let offset = offset_for(page, page_size);
    let (posts, total_results, authors, tags_for_posts) = tokio::try_join!(
        post_repo.search_published_posts(term, page_size as i64, offset),
        post_repo.count_published_posts_for_search(term),
        user_repo.get_all_users(),
        tag_repo.get_tags_for_all_posts(),
    )?;

    debug!(term, total_results, "検索ビューを組み立て");
    presenter.search_view(SearchViewContext {
        search_term: Some(term.to_string()),
        total_results,
        posts,
        authors,
        tags_for_posts,
        pagination: paginate(page, total_results, page_size, current_query),
    })
}
