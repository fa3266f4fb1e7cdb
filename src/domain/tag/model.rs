use crate::types::{BlogError, BlogResult};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use sqlx::FromRow;
use std::fmt;

/// URLパスセグメントとしてそのまま使えない文字の集合
const URL_SEGMENT_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// ブログタグ（blog_tagsテーブルと一致）
///
/// nameは大文字小文字を区別した完全一致で扱う（正規化はしない）。
/// URLエンコード済みの名前は保存せず、シリアライズのたびに導出する。
#[derive(Debug, Clone, Deserialize, FromRow, PartialEq)]
pub struct BlogTag {
    pub id: Option<i32>,
    pub name: String,
}

impl BlogTag {
    /// 未保存のタグを作成する
    pub fn new<N: Into<String>>(name: N) -> Self {
        Self {
            id: None,
            name: name.into(),
        }
    }

    /// タグ名のURL用パーセントエンコード表現を導出する
    pub fn url_encoded_name(&self) -> String {
        utf8_percent_encode(&self.name, URL_SEGMENT_ENCODE_SET).to_string()
    }

    /// 保存済みのはずのIDを取り出す
    pub fn require_id(&self) -> BlogResult<i32> {
        self.id
            .ok_or_else(|| BlogError::consistency("タグにIDが割り当てられていません"))
    }
}

// url_encoded_nameを導出フィールドとして含めてシリアライズする
impl Serialize for BlogTag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("BlogTag", 3)?;
        state.serialize_field("id", &self.id)?;
        state.serialize_field("name", &self.name)?;
        state.serialize_field("url_encoded_name", &self.url_encoded_name())?;
        state.end()
    }
}

impl fmt::Display for BlogTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}
