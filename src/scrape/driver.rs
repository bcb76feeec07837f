//! 収集ループ
//!
//! ## 全件取得 (`scrape_all`)
//! ページ0（または再開ページ）から順に取得し、ページ順に一覧末尾へ追加する。
//! 空ページ・上限到達・停止要求で終了。
//!
//! ## 差分取得 (`scrape_new`)
//! 既知の識別子を除いた新規レコードだけを一覧先頭へまとめて挿入する。
//! 新規0件のページが規定数連続したら終了。

use super::dump::write_page_dump;
use super::fetcher::{FetchFailure, Operator, PageFetch, PageFetcher};
use super::PageSource;
use crate::checkpoint::ScrapeState;
use crate::config::Config;
use crate::error::Result;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// ループ設定
#[derive(Debug, Clone)]
pub struct DriverOptions {
    /// 取得するページ番号の上限（この番号は含まない）
    pub max_pages: u32,
    pub start_page: u32,
    /// このページ番号の倍数ごとにチェックポイントを保存（0で無効）
    pub checkpoint_interval: u32,
    /// 差分取得の早期終了しきい値（0で無効）
    pub known_page_limit: u32,
    pub output_dir: PathBuf,
    pub save_page_dumps: bool,
    pub page_url_prefix: String,
}

impl DriverOptions {
    pub fn full(config: &Config, start_page: u32) -> Self {
        Self {
            max_pages: config.max_pages_initial,
            start_page,
            checkpoint_interval: config.checkpoint_interval,
            known_page_limit: 0,
            output_dir: config.output_dir.clone(),
            save_page_dumps: config.save_page_dumps,
            page_url_prefix: config.page_url_prefix(),
        }
    }

    pub fn update(config: &Config) -> Self {
        Self {
            max_pages: config.max_pages_update,
            start_page: 0,
            checkpoint_interval: 0,
            known_page_limit: config.known_page_limit,
            output_dir: config.output_dir.clone(),
            save_page_dumps: config.save_page_dumps,
            page_url_prefix: config.page_url_prefix(),
        }
    }

    pub fn page_url(&self, page: u32) -> String {
        format!("{}{}", self.page_url_prefix, page)
    }

    fn is_checkpoint_page(&self, page: u32) -> bool {
        self.checkpoint_interval > 0 && page % self.checkpoint_interval == 0
    }
}

/// 終了理由
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// 0件のページに到達（ページ番号）
    EmptyPage(u32),
    PageLimit,
    StopRequested,
    /// 新規0件のページが連続（連続数）
    KnownPages(u32),
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopReason::EmptyPage(page) => write!(f, "ページ {} が空", page),
            StopReason::PageLimit => write!(f, "ページ上限に到達"),
            StopReason::StopRequested => write!(f, "停止要求"),
            StopReason::KnownPages(n) => write!(f, "既知のみのページが {} 連続", n),
        }
    }
}

/// 収集結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeReport {
    pub pages_fetched: u32,
    pub pages_skipped: u32,
    /// 一覧に追加したレコード数
    pub added: usize,
    pub stop_reason: StopReason,
    /// 最後に取得に成功したページ
    pub last_page: Option<u32>,
}

impl ScrapeReport {
    fn new() -> Self {
        Self {
            pages_fetched: 0,
            pages_skipped: 0,
            added: 0,
            stop_reason: StopReason::PageLimit,
            last_page: None,
        }
    }
}

/// 進捗通知
pub trait ScrapeProgress {
    fn begin(&mut self, _start_page: u32, _max_pages: u32) {}

    /// ページ取得完了（取得件数・追加件数）
    fn page_done(&mut self, _page: u32, _fetched: usize, _added: usize) {}

    fn page_skipped(&mut self, _page: u32, _failure: &FetchFailure) {}

    fn finish(&mut self, _report: &ScrapeReport) {}
}

/// 何もしない進捗通知
pub struct NullProgress;
impl ScrapeProgress for NullProgress {}

/// 全件取得
pub async fn scrape_all<S, O, P>(
    fetcher: &mut PageFetcher<S, O>,
    state: &mut ScrapeState,
    options: &DriverOptions,
    progress: &mut P,
) -> Result<ScrapeReport>
where
    S: PageSource,
    O: Operator,
    P: ScrapeProgress,
{
    let mut report = ScrapeReport::new();
    info!(
        "全件取得を開始: ページ {} から (上限 {})",
        options.start_page, options.max_pages
    );
    progress.begin(options.start_page, options.max_pages);

    for page in options.start_page..options.max_pages {
        if fetcher.stop().is_stopped() {
            report.stop_reason = StopReason::StopRequested;
            break;
        }

        let donation_page = match fetcher.fetch(&options.page_url(page), page).await {
            PageFetch::Fetched(donation_page) => donation_page,
            PageFetch::Failed(FetchFailure::Stopped) => {
                report.stop_reason = StopReason::StopRequested;
                break;
            }
            PageFetch::Failed(failure) => {
                debug!(page, %failure, "ページをスキップ");
                report.pages_skipped += 1;
                progress.page_skipped(page, &failure);
                continue;
            }
        };

        if donation_page.donations.is_empty() {
            info!("ページ {} が空のため終了", page);
            report.stop_reason = StopReason::EmptyPage(page);
            break;
        }

        let count = donation_page.donations.len();
        state.donations.extend(donation_page.donations);
        state.last_page = page;
        report.pages_fetched += 1;
        report.added += count;
        report.last_page = Some(page);
        progress.page_done(page, count, count);

        if options.save_page_dumps {
            if let Err(e) = write_page_dump(&options.output_dir, page, &donation_page.raw) {
                warn!("ページ {} のダンプ保存に失敗: {}", page, e);
            }
        }

        if options.is_checkpoint_page(page) {
            state.save(&options.output_dir)?;
            debug!(page, total = state.len(), "チェックポイント保存");
        }
    }

    state.refresh_pointers();
    info!(
        "全件取得を終了 ({}): {} ページ, {} 件追加, {} ページスキップ",
        report.stop_reason, report.pages_fetched, report.added, report.pages_skipped
    );
    progress.finish(&report);
    Ok(report)
}

/// 差分取得
///
/// 新規レコードは取得順のまま一覧先頭へ挿入していくため、
/// 途中で中断しても一覧は新しい順を保つ。
pub async fn scrape_new<S, O, P>(
    fetcher: &mut PageFetcher<S, O>,
    state: &mut ScrapeState,
    options: &DriverOptions,
    progress: &mut P,
) -> Result<ScrapeReport>
where
    S: PageSource,
    O: Operator,
    P: ScrapeProgress,
{
    let mut report = ScrapeReport::new();
    let mut known = state.known_ids();
    let mut insert_at = 0usize;
    let mut consecutive_known = 0u32;

    info!(
        "差分取得を開始: 既知 {} 件 (上限 {} ページ)",
        known.len(),
        options.max_pages
    );
    progress.begin(options.start_page, options.max_pages);

    for page in options.start_page..options.max_pages {
        if fetcher.stop().is_stopped() {
            report.stop_reason = StopReason::StopRequested;
            break;
        }

        let donation_page = match fetcher.fetch(&options.page_url(page), page).await {
            PageFetch::Fetched(donation_page) => donation_page,
            PageFetch::Failed(FetchFailure::Stopped) => {
                report.stop_reason = StopReason::StopRequested;
                break;
            }
            PageFetch::Failed(failure) => {
                debug!(page, %failure, "ページをスキップ");
                report.pages_skipped += 1;
                progress.page_skipped(page, &failure);
                continue;
            }
        };

        if donation_page.donations.is_empty() {
            info!("ページ {} が空のため終了", page);
            report.stop_reason = StopReason::EmptyPage(page);
            break;
        }

        let fetched = donation_page.donations.len();
        let fresh: Vec<_> = donation_page
            .donations
            .into_iter()
            .filter(|d| known.insert(d.key()))
            .collect();
        let added = fresh.len();

        state.donations.splice(insert_at..insert_at, fresh);
        insert_at += added;
        report.pages_fetched += 1;
        report.added += added;
        report.last_page = Some(page);
        progress.page_done(page, fetched, added);

        if options.save_page_dumps && added > 0 {
            if let Err(e) = write_page_dump(&options.output_dir, page, &donation_page.raw) {
                warn!("ページ {} のダンプ保存に失敗: {}", page, e);
            }
        }

        if added == 0 {
            consecutive_known += 1;
            debug!(page, consecutive_known, "新規なし");
            if options.known_page_limit > 0 && consecutive_known >= options.known_page_limit {
                report.stop_reason = StopReason::KnownPages(consecutive_known);
                break;
            }
        } else {
            consecutive_known = 0;
            debug!(page, added, "新規レコード");
        }
    }

    state.refresh_pointers();
    info!(
        "差分取得を終了 ({}): {} ページ, {} 件追加",
        report.stop_reason, report.pages_fetched, report.added
    );
    progress.finish(&report);
    Ok(report)
}
