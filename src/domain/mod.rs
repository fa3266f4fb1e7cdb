//! ドメイン層
//!
//! エンティティモデル、リポジトリ契約、ページネーション計算、
//! タグのライフサイクル、ルートパラメータの解決を持つ。
//! ストレージの実装詳細には依存しない（実装はinfra側）。

pub mod pagination;
pub mod post;
pub mod resolver;
pub mod tag;
pub mod user;
