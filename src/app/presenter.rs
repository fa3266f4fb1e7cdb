use crate::domain::pagination::PaginationInformation;
use crate::domain::post::model::BlogPost;
use crate::domain::tag::model::BlogTag;
use crate::domain::user::model::BlogUser;
use crate::types::{BlogError, BlogResult};
use serde::Serialize;
use std::collections::HashMap;

/// インデックスビューに渡す集約ペイロード
#[derive(Debug, Clone, Serialize)]
pub struct IndexViewContext {
    pub posts: Vec<BlogPost>,
    pub tags: Vec<BlogTag>,
    pub authors: Vec<BlogUser>,
    /// 投稿IDからその投稿のタグ一覧への対応（N+1回避のための一括取得結果）
    pub tags_for_posts: HashMap<i32, Vec<BlogTag>>,
    pub pagination: PaginationInformation,
}

/// 個別投稿ビューに渡す集約ペイロード
#[derive(Debug, Clone, Serialize)]
pub struct PostViewContext {
    pub post: BlogPost,
    pub author: BlogUser,
    pub tags: Vec<BlogTag>,
}

/// タグ別一覧ビューに渡す集約ペイロード
#[derive(Debug, Clone, Serialize)]
pub struct TagViewContext {
    pub tag: BlogTag,
    pub posts: Vec<BlogPost>,
    pub authors: Vec<BlogUser>,
    pub total_posts: i64,
    pub pagination: PaginationInformation,
}

/// 著者別一覧ビューに渡す集約ペイロード
#[derive(Debug, Clone, Serialize)]
pub struct AuthorViewContext {
    pub author: BlogUser,
    pub posts: Vec<BlogPost>,
    pub post_count: i64,
    pub tags_for_posts: HashMap<i32, Vec<BlogTag>>,
    pub pagination: PaginationInformation,
}

/// タグ一覧ビューに渡す集約ペイロード
#[derive(Debug, Clone, Serialize)]
pub struct AllTagsViewContext {
    pub tags: Vec<BlogTag>,
    /// タグIDから公開投稿数への対応
    pub tag_post_counts: HashMap<i32, i64>,
}

/// 著者一覧ビューに渡す集約ペイロード
#[derive(Debug, Clone, Serialize)]
pub struct AllAuthorsViewContext {
    pub authors: Vec<BlogUser>,
    /// 著者IDから公開投稿数への対応
    pub author_post_counts: HashMap<i32, i64>,
}

/// 検索ビューに渡す集約ペイロード
#[derive(Debug, Clone, Serialize)]
pub struct SearchViewContext {
    /// 正規化済みの検索語。未指定・空のときはNone
    pub search_term: Option<String>,
    pub total_results: i64,
    pub posts: Vec<BlogPost>,
    pub authors: Vec<BlogUser>,
    pub tags_for_posts: HashMap<i32, Vec<BlogTag>>,
    pub pagination: PaginationInformation,
}

/// プレゼンターの抽象化トレイト
///
/// ビューの描画はこのコアの外側の責務で、コアは組み立て済みの
/// ペイロードを型ごとのメソッドに渡すだけ。描画結果の型は
/// 実装側が関連型で決める（HTML文字列、JSON、テスト用の素通し等）。
pub trait BlogPresenter {
    type Output;

    fn index_view(&self, context: IndexViewContext) -> BlogResult<Self::Output>;
    fn post_view(&self, context: PostViewContext) -> BlogResult<Self::Output>;
    fn tag_view(&self, context: TagViewContext) -> BlogResult<Self::Output>;
    fn author_view(&self, context: AuthorViewContext) -> BlogResult<Self::Output>;
    fn all_tags_view(&self, context: AllTagsViewContext) -> BlogResult<Self::Output>;
    fn all_authors_view(&self, context: AllAuthorsViewContext) -> BlogResult<Self::Output>;
    fn search_view(&self, context: SearchViewContext) -> BlogResult<Self::Output>;
}

/// ペイロードをそのままJSONに描画するプレゼンター実装
///
/// デモバイナリとテストが共用する。タグのurl_encoded_nameは
/// シリアライズ時に導出されてJSONに含まれる。
pub struct JsonPresenter;

impl JsonPresenter {
    fn render<T: Serialize>(&self, view: &'static str, context: &T) -> BlogResult<serde_json::Value> {
        serde_json::to_value(context).map_err(|e| BlogError::serialization(view, e))
    }
}

impl BlogPresenter for JsonPresenter {
    type Output = serde_json::Value;

    fn index_view(&self, context: IndexViewContext) -> BlogResult<Self::Output> {
        self.render("インデックスビュー", &context)
    }

    fn post_view(&self, context: PostViewContext) -> BlogResult<Self::Output> {
        self.render("投稿ビュー", &context)
    }

    fn tag_view(&self, context: TagViewContext) -> BlogResult<Self::Output> {
        self.render("タグビュー", &context)
    }

    fn author_view(&self, context: AuthorViewContext) -> BlogResult<Self::Output> {
        self.render("著者ビュー", &context)
    }

    fn all_tags_view(&self, context: AllTagsViewContext) -> BlogResult<Self::Output> {
        self.render("タグ一覧ビュー", &context)
    }

    fn all_authors_view(&self, context: AllAuthorsViewContext) -> BlogResult<Self::Output> {
        self.render("著者一覧ビュー", &context)
    }

    fn search_view(&self, context: SearchViewContext) -> BlogResult<Self::Output> {
        self.render("検索ビュー", &context)
    }
}
