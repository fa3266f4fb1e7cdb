//! ブログコンテンツサービスのコア
//!
//! 投稿・タグ・著者のリポジトリ契約、一覧共通のページネーション計算、
//! タグと投稿の多対多ライフサイクル、ルートパラメータの解決、
//! ビュー単位のクエリ同時発行と集約を提供する。
//! HTMLの描画・HTTPルーティング・ストレージエンジンの内部は
//! このクレートの外側の責務。

pub mod app;
pub mod domain;
pub mod infra;
pub mod types;
