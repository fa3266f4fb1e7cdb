use crate::types::{BlogError, BlogResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

/// ブログ投稿（blog_postsテーブルと一致）
///
/// idは保存されるまでNone。published = falseの投稿（下書き）は
/// 公開側の一覧・検索・件数に一切現れない。
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct BlogPost {
    pub id: Option<i32>,
    pub title: String,
    pub contents: String,
    pub slug_url: String,
    pub published: bool,
    pub created: DateTime<Utc>,
    pub author_id: i32,
}

impl BlogPost {
    /// 未保存の投稿を作成する
    pub fn new<T, C, S>(
        title: T,
        contents: C,
        slug_url: S,
        published: bool,
        created: DateTime<Utc>,
        author_id: i32,
    ) -> Self
    where
        T: Into<String>,
        C: Into<String>,
        S: Into<String>,
    {
        Self {
            id: None,
            title: title.into(),
            contents: contents.into(),
            slug_url: slug_url.into(),
            published,
            created,
            author_id,
        }
    }

    /// 保存済みのはずのIDを取り出す
    /// 未保存のエンティティを渡すのは呼び出し側のプログラミングエラー
    pub fn require_id(&self) -> BlogResult<i32> {
        self.id
            .ok_or_else(|| BlogError::consistency("投稿にIDが割り当てられていません"))
    }
}

impl fmt::Display for BlogPost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.title, self.slug_url)
    }
}
