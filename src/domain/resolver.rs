use crate::domain::post::model::BlogPost;
use crate::domain::post::repository::BlogPostRepository;
use crate::domain::tag::model::BlogTag;
use crate::domain::tag::repository::BlogTagRepository;
use crate::domain::user::model::BlogUser;
use crate::domain::user::repository::BlogUserRepository;
use crate::types::{BlogError, BlogResult};

/// ルートパラメータを正の整数IDとして解釈する
///
/// 解釈できない文字列（非数値、ゼロ、負数）はInvalidIdentifier。
/// 「形式は正しいが該当行がない」のはNotFoundで、ここでは扱わない。
fn parse_id(raw: &str) -> BlogResult<i32> {
    match raw.parse::<i32>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(BlogError::invalid_identifier(raw)),
    }
}

/// ルートパラメータから投稿を解決する
///
/// ビュー本体が動く前に呼び出し、失敗したらリクエストを
/// その場で打ち切る想定（オーケストレータには到達させない）。
pub async fn resolve_post<R>(raw: &str, repo: &R) -> BlogResult<BlogPost>
where
    R: BlogPostRepository + ?Sized,
{
    let id = parse_id(raw)?;
    repo.get_post_by_id(id)
        .await?
        .ok_or_else(|| BlogError::not_found("投稿", raw))
}

/// ルートパラメータから著者を解決する
pub async fn resolve_user<R>(raw: &str, repo: &R) -> BlogResult<BlogUser>
where
    R: BlogUserRepository + ?Sized,
{
    let id = parse_id(raw)?;
    repo.get_user_by_id(id)
        .await?
        .ok_or_else(|| BlogError::not_found("著者", raw))
}

/// ルートパラメータからタグを解決する
///
/// タグのキーは不透明な文字列としてそのまま名前検索に渡す。
/// 整数への解釈は行わない
pub async fn resolve_tag<R>(raw: &str, repo: &R) -> BlogResult<BlogTag>
where
    R: BlogTagRepository + ?Sized,
{
    repo.get_tag_by_name(raw)
        .await?
        .ok_or_else(|| BlogError::not_found("タグ", raw))
}
