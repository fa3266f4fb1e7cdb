//! インフラストラクチャ層
//!
//! ストレージアダプタの置き場。Postgres接続プールの構築と、
//! テスト用のインメモリストレージを持つ。

pub mod db;
pub mod memory;
