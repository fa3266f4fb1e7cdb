//! アプリケーション層
//!
//! ビューの種類ごとにリポジトリへのクエリを同時発行し、
//! 集約ペイロードを組み立ててプレゼンターに渡す。

pub mod presenter;
pub mod views;
