//! 募金サイトの寄付履歴スクレイパー
//!
//! ブラウザ経由でAPIのページを順に取得し、チェックポイントに蓄積してCSVへ出力する。

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod checkpoint;
pub mod scrape;
pub mod export;
pub mod runner;
