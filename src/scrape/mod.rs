//! ページ取得と収集ループ
//!
//! - `browser`: 実ブラウザのセッション
//! - `fetcher`: 1ページの取得と再試行
//! - `driver`: 全件取得・差分取得のループ
//! - `dump`: ページごとのJSON保存
//! - `process`: 残存ブラウザの掃除
//! - `stop`: 停止要求

pub mod browser;
pub mod driver;
pub mod dump;
pub mod fetcher;
pub mod process;
pub mod stop;

use crate::error::Result;

pub use browser::{BrowserLauncher, BrowserSession, BrowserSettings};
pub use driver::{scrape_all, scrape_new, DriverOptions, NullProgress, ScrapeProgress, ScrapeReport, StopReason};
pub use fetcher::{ConsoleOperator, FetchFailure, Operator, PageFetch, PageFetcher, RetryPolicy, UnattendedOperator};
pub use stop::StopSignal;

/// ページ内容の取得元
///
/// URLへ移動し、描画後のHTMLを返す。実装はブラウザのほか、テスト用の固定応答など。
#[allow(async_fn_in_trait)]
pub trait PageSource {
    async fn navigate(&mut self, url: &str) -> Result<()>;
    async fn content(&mut self) -> Result<String>;
}

/// 取得元の起動と終了
///
/// 1回の収集につき1度 `launch` し、終了時に `close` へ返す。
#[allow(async_fn_in_trait)]
pub trait SourceLauncher {
    type Source: PageSource;

    async fn launch(&mut self) -> Result<Self::Source>;
    async fn close(&mut self, source: Self::Source);
}
