//! 収集ループテスト
//!
//! 固定応答のページ取得元で全件取得・差分取得の動作を検証

mod support;

use donation_scraper::checkpoint::ScrapeState;
use donation_scraper::scrape::{
    scrape_all, scrape_new, DriverOptions, FetchFailure, NullProgress, PageFetcher, RetryPolicy,
    ScrapeProgress, StopReason, StopSignal, UnattendedOperator,
};
use std::path::Path;
use support::{donation_list, FixtureFeed, PREFIX};
use tempfile::tempdir;

fn options(dir: &Path, max_pages: u32) -> DriverOptions {
    DriverOptions {
        max_pages,
        start_page: 0,
        checkpoint_interval: 10,
        known_page_limit: 3,
        output_dir: dir.to_path_buf(),
        save_page_dumps: false,
        page_url_prefix: PREFIX.to_string(),
    }
}

fn fetcher(feed: FixtureFeed, stop: StopSignal) -> PageFetcher<FixtureFeed, UnattendedOperator> {
    PageFetcher::new(feed, UnattendedOperator, RetryPolicy::immediate(), stop)
}

fn ids(state: &ScrapeState) -> Vec<String> {
    state.donations.iter().filter_map(|d| d.id()).collect()
}

// =============================================
// 全件取得
// =============================================

/// 空ページで終了し、取得順に末尾へ追加
#[tokio::test]
async fn test_full_scrape_stops_on_empty_page() {
    let dir = tempdir().expect("Failed to create temp dir");
    let feed = FixtureFeed::default()
        .page(0, &[9, 8, 7])
        .page(1, &[6, 5, 4])
        .page(2, &[3, 2, 1]);
    let mut fetcher = fetcher(feed, StopSignal::new());
    let mut state = ScrapeState::default();

    let report = scrape_all(&mut fetcher, &mut state, &options(dir.path(), 5000), &mut NullProgress)
        .await
        .expect("収集失敗");

    assert_eq!(report.stop_reason, StopReason::EmptyPage(3));
    assert_eq!(report.pages_fetched, 3);
    assert_eq!(report.added, 9);
    assert_eq!(report.last_page, Some(2));
    assert_eq!(ids(&state), vec!["9", "8", "7", "6", "5", "4", "3", "2", "1"]);
    assert_eq!(state.newest_donation_id.as_deref(), Some("9"));
    assert_eq!(state.last_donation_id.as_deref(), Some("1"));
    assert_eq!(state.last_page, 2);
    assert_eq!(fetcher.into_source().visited_pages(), vec![0, 1, 2, 3]);
}

/// 10の倍数ページでチェックポイントを保存
#[tokio::test]
async fn test_full_scrape_checkpoints_every_ten_pages() {
    let dir = tempdir().expect("Failed to create temp dir");
    let mut feed = FixtureFeed::default();
    for page in 0..12u32 {
        feed = feed.page(page, &[u64::from(1000 - page)]);
    }
    let mut fetcher = fetcher(feed, StopSignal::new());
    let mut state = ScrapeState::default();

    let report = scrape_all(&mut fetcher, &mut state, &options(dir.path(), 5000), &mut NullProgress)
        .await
        .expect("収集失敗");
    assert_eq!(report.pages_fetched, 12);

    // 最後の保存はページ10
    let saved = ScrapeState::load(dir.path()).expect("読込失敗");
    assert_eq!(saved.last_page, 10);
    assert_eq!(saved.len(), 11);
    assert!(!saved.initial_scrape_complete);
}

/// 失敗したページはスキップして続行
#[tokio::test]
async fn test_full_scrape_skips_failed_page() {
    let dir = tempdir().expect("Failed to create temp dir");
    let feed = FixtureFeed::default()
        .page(0, &[5, 4])
        .raw(1, "<html><body><p>no payload</p></body></html>")
        .page(2, &[3]);
    let mut fetcher = fetcher(feed, StopSignal::new());
    let mut state = ScrapeState::default();

    let report = scrape_all(&mut fetcher, &mut state, &options(dir.path(), 5000), &mut NullProgress)
        .await
        .expect("収集失敗");

    assert_eq!(report.pages_skipped, 1);
    assert_eq!(report.pages_fetched, 2);
    assert_eq!(ids(&state), vec!["5", "4", "3"]);
    assert_eq!(report.stop_reason, StopReason::EmptyPage(3));
}

/// 進捗通知を記録
#[derive(Default)]
struct RecordingProgress {
    done: Vec<u32>,
    skipped: Vec<(u32, FetchFailure)>,
    finished: usize,
}

impl ScrapeProgress for RecordingProgress {
    fn page_done(&mut self, page: u32, _fetched: usize, _added: usize) {
        self.done.push(page);
    }

    fn page_skipped(&mut self, page: u32, failure: &FetchFailure) {
        self.skipped.push((page, failure.clone()));
    }

    fn finish(&mut self, _report: &donation_scraper::scrape::ScrapeReport) {
        self.finished += 1;
    }
}

/// スキップはページごとに1回だけ通知
#[tokio::test]
async fn test_skipped_page_reported_once() {
    let dir = tempdir().expect("Failed to create temp dir");
    let feed = FixtureFeed::default()
        .page(0, &[5, 4])
        .raw(1, "<html><body><p>no payload</p></body></html>")
        .page(2, &[3]);
    let mut fetcher = fetcher(feed, StopSignal::new());
    let mut state = ScrapeState::default();
    let mut progress = RecordingProgress::default();

    scrape_all(&mut fetcher, &mut state, &options(dir.path(), 5000), &mut progress)
        .await
        .expect("収集失敗");

    assert_eq!(progress.skipped, vec![(1, FetchFailure::MissingPayload)]);
    assert_eq!(progress.done, vec![0, 2]);
    assert_eq!(progress.finished, 1);
}

/// ページ上限で終了
#[tokio::test]
async fn test_full_scrape_page_limit() {
    let dir = tempdir().expect("Failed to create temp dir");
    let feed = FixtureFeed::default().page(0, &[3]).page(1, &[2]).page(2, &[1]);
    let mut fetcher = fetcher(feed, StopSignal::new());
    let mut state = ScrapeState::default();

    let report = scrape_all(&mut fetcher, &mut state, &options(dir.path(), 2), &mut NullProgress)
        .await
        .expect("収集失敗");

    assert_eq!(report.stop_reason, StopReason::PageLimit);
    assert_eq!(ids(&state), vec!["3", "2"]);
}

/// 停止ファイルがあれば取得しない
#[tokio::test]
async fn test_full_scrape_honors_stop_file() {
    let dir = tempdir().expect("Failed to create temp dir");
    let stop_file = dir.path().join("stop.txt");
    std::fs::write(&stop_file, "").unwrap();

    let feed = FixtureFeed::default().page(0, &[1]);
    let mut fetcher = fetcher(feed, StopSignal::new().with_stop_file(&stop_file));
    let mut state = ScrapeState::default();

    let report = scrape_all(&mut fetcher, &mut state, &options(dir.path(), 5000), &mut NullProgress)
        .await
        .expect("収集失敗");

    assert_eq!(report.stop_reason, StopReason::StopRequested);
    assert!(state.is_empty());
    assert!(fetcher.into_source().visits.is_empty());
}

/// 保存済みページの次から再開
#[tokio::test]
async fn test_full_scrape_resumes_after_last_page() {
    let dir = tempdir().expect("Failed to create temp dir");
    let feed = FixtureFeed::default()
        .page(0, &[99])
        .page(11, &[20, 19])
        .page(12, &[18]);
    let mut fetcher = fetcher(feed, StopSignal::new());
    let mut state = ScrapeState {
        donations: donation_list(&[30, 29, 28]),
        last_page: 10,
        ..Default::default()
    };

    let mut opts = options(dir.path(), 5000);
    opts.start_page = state.resume_page();
    assert_eq!(opts.start_page, 11);

    scrape_all(&mut fetcher, &mut state, &opts, &mut NullProgress)
        .await
        .expect("収集失敗");

    assert_eq!(ids(&state), vec!["30", "29", "28", "20", "19", "18"]);
    assert_eq!(fetcher.into_source().visited_pages(), vec![11, 12, 13]);
}

/// ページダンプを保存
#[tokio::test]
async fn test_full_scrape_writes_page_dumps() {
    let dir = tempdir().expect("Failed to create temp dir");
    let feed = FixtureFeed::default().page(0, &[2]).page(1, &[1]);
    let mut fetcher = fetcher(feed, StopSignal::new());
    let mut state = ScrapeState::default();

    let mut opts = options(dir.path(), 5000);
    opts.save_page_dumps = true;
    scrape_all(&mut fetcher, &mut state, &opts, &mut NullProgress)
        .await
        .expect("収集失敗");

    assert!(dir.path().join("donations_page0.json").exists());
    assert!(dir.path().join("donations_page1.json").exists());
    assert!(!dir.path().join("donations_page2.json").exists());
}

// =============================================
// 差分取得
// =============================================

/// 新規0件のページが3連続したら以降のページを見ない
#[tokio::test]
async fn test_incremental_stops_after_three_known_pages() {
    let dir = tempdir().expect("Failed to create temp dir");
    let feed = FixtureFeed::default()
        .page(0, &[10, 9])
        .page(1, &[8, 7])
        .page(2, &[6, 5])
        .page(3, &[4, 3])
        .page(4, &[2, 1]);
    let mut fetcher = fetcher(feed, StopSignal::new());
    let mut state = ScrapeState {
        donations: donation_list(&[10, 9, 8, 7, 6, 5, 4, 3, 2, 1]),
        initial_scrape_complete: true,
        ..Default::default()
    };

    let report = scrape_new(&mut fetcher, &mut state, &options(dir.path(), 100), &mut NullProgress)
        .await
        .expect("収集失敗");

    assert_eq!(report.added, 0);
    assert_eq!(report.stop_reason, StopReason::KnownPages(3));
    assert_eq!(fetcher.into_source().visited_pages(), vec![0, 1, 2]);
    assert_eq!(state.len(), 10);
}

/// 新規レコードは取得順のまま先頭へ
#[tokio::test]
async fn test_incremental_prepends_new_records_in_order() {
    let dir = tempdir().expect("Failed to create temp dir");
    let feed = FixtureFeed::default()
        .page(0, &[14, 13])
        .page(1, &[12, 11])
        .page(2, &[10, 9])
        .page(3, &[8, 7])
        .page(4, &[6, 5]);
    let mut fetcher = fetcher(feed, StopSignal::new());
    let mut state = ScrapeState {
        donations: donation_list(&[11, 10, 9, 8, 7, 6, 5]),
        initial_scrape_complete: true,
        ..Default::default()
    };

    let report = scrape_new(&mut fetcher, &mut state, &options(dir.path(), 100), &mut NullProgress)
        .await
        .expect("収集失敗");

    assert_eq!(report.added, 3);
    assert_eq!(ids(&state), vec!["14", "13", "12", "11", "10", "9", "8", "7", "6", "5"]);
    assert_eq!(state.newest_donation_id.as_deref(), Some("14"));
    assert_eq!(state.last_donation_id.as_deref(), Some("5"));
    // ページ1で新規あり → 2,3,4 が既知のみで終了
    assert_eq!(report.stop_reason, StopReason::KnownPages(3));
}

/// 同じ取得中に重複したレコードは1回だけ追加
#[tokio::test]
async fn test_incremental_dedupes_within_walk() {
    let dir = tempdir().expect("Failed to create temp dir");
    let feed = FixtureFeed::default()
        .page(0, &[5, 4])
        .page(1, &[4, 3]);
    let mut fetcher = fetcher(feed, StopSignal::new());
    let mut state = ScrapeState {
        donations: donation_list(&[3]),
        initial_scrape_complete: true,
        ..Default::default()
    };

    let report = scrape_new(&mut fetcher, &mut state, &options(dir.path(), 100), &mut NullProgress)
        .await
        .expect("収集失敗");

    assert_eq!(report.added, 2);
    assert_eq!(ids(&state), vec!["5", "4", "3"]);
    assert_eq!(report.stop_reason, StopReason::EmptyPage(2));
}

/// スキップしたページは連続カウントに影響しない
#[tokio::test]
async fn test_incremental_skipped_page_keeps_counter() {
    let dir = tempdir().expect("Failed to create temp dir");
    let feed = FixtureFeed::default()
        .page(0, &[2])
        .raw(1, "<html><body>Just a moment...</body></html>")
        .page(2, &[2])
        .page(3, &[2])
        .page(4, &[2]);
    let mut fetcher = fetcher(feed, StopSignal::new());
    let mut state = ScrapeState {
        donations: donation_list(&[2]),
        initial_scrape_complete: true,
        ..Default::default()
    };

    let report = scrape_new(&mut fetcher, &mut state, &options(dir.path(), 100), &mut NullProgress)
        .await
        .expect("収集失敗");

    assert_eq!(report.pages_skipped, 1);
    assert_eq!(report.stop_reason, StopReason::KnownPages(3));
    assert_eq!(fetcher.into_source().visited_pages(), vec![0, 1, 2, 3]);
}
