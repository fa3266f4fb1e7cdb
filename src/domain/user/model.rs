use crate::types::{BlogError, BlogResult};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

/// ブログの著者（blog_usersテーブルと一致）
///
/// usernameは一意。投稿のauthor_idはこのテーブルのidを参照し、
/// 解決できない場合はサーバー側の整合性エラーとして扱う。
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct BlogUser {
    pub id: Option<i32>,
    pub username: String,
    pub name: String,
    pub profile_picture: Option<String>,
    pub tagline: Option<String>,
}

impl BlogUser {
    /// 未保存のユーザーを作成する
    pub fn new<U, N>(username: U, name: N) -> Self
    where
        U: Into<String>,
        N: Into<String>,
    {
        Self {
            id: None,
            username: username.into(),
            name: name.into(),
            profile_picture: None,
            tagline: None,
        }
    }

    /// 保存済みのはずのIDを取り出す
    pub fn require_id(&self) -> BlogResult<i32> {
        self.id
            .ok_or_else(|| BlogError::consistency("著者にIDが割り当てられていません"))
    }
}

impl fmt::Display for BlogUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (@{})", self.name, self.username)
    }
}
