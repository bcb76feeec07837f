//! 実行制御
//!
//! チェックポイント読込 → 収集 → 保存 → CSV出力 の一連の流れ。
//! 収集中のエラーや割り込みがあってもCSV出力までは必ず行う。

use crate::checkpoint::ScrapeState;
use crate::cli::ScrapeMode;
use crate::config::Config;
use crate::error::Result;
use crate::export::{export_csv, ExportSummary};
use crate::scrape::{
    scrape_all, scrape_new, BrowserLauncher, ConsoleOperator, DriverOptions, FetchFailure,
    Operator, PageFetcher, PageSource, RetryPolicy, ScrapeProgress, ScrapeReport, SourceLauncher,
    StopReason, StopSignal, UnattendedOperator,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::future::Future;
use tracing::{error, info, warn};

/// 実際に行う取得モード（`Auto` を解決）
pub fn effective_mode(requested: ScrapeMode, state: &ScrapeState) -> ScrapeMode {
    match requested {
        ScrapeMode::Auto if state.initial_scrape_complete => ScrapeMode::Update,
        ScrapeMode::Auto => ScrapeMode::Full,
        other => other,
    }
}

/// ページ取得の進捗バー
struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    fn new() -> Self {
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-");
        let bar = ProgressBar::new(0);
        bar.set_style(style);
        Self { bar }
    }
}

impl ScrapeProgress for BarProgress {
    fn begin(&mut self, start_page: u32, max_pages: u32) {
        self.bar.set_length(u64::from(max_pages.saturating_sub(start_page)));
    }

    fn page_done(&mut self, page: u32, fetched: usize, added: usize) {
        self.bar.set_message(format!("ページ {} ({}件中 {}件追加)", page, fetched, added));
        self.bar.inc(1);
    }

    fn page_skipped(&mut self, page: u32, failure: &FetchFailure) {
        self.bar.println(format!("✗ ページ {} をスキップ: {}", page, failure));
        self.bar.inc(1);
    }

    fn finish(&mut self, report: &ScrapeReport) {
        self.bar.finish_and_clear();
        println!(
            "✔ {}ページ取得, {}件追加 ({})",
            report.pages_fetched, report.added, report.stop_reason
        );
        if report.pages_skipped > 0 {
            println!("  スキップしたページ: {}", report.pages_skipped);
        }
    }
}

async fn drive<S: PageSource, O: Operator>(
    fetcher: &mut PageFetcher<S, O>,
    config: &Config,
    state: &mut ScrapeState,
    mode: ScrapeMode,
) -> Result<ScrapeReport> {
    let mut progress = BarProgress::new();
    match mode {
        ScrapeMode::Update => {
            let options = DriverOptions::update(config);
            scrape_new(fetcher, state, &options, &mut progress).await
        }
        _ => {
            let options = DriverOptions::full(config, state.resume_page());
            scrape_all(fetcher, state, &options, &mut progress).await
        }
    }
}

/// 取得元を起動して収集し、結果に応じてチェックポイントを保存
pub async fn scrape<L, O>(
    config: &Config,
    state: &mut ScrapeState,
    requested: ScrapeMode,
    launcher: &mut L,
    operator: O,
    policy: RetryPolicy,
    stop: &StopSignal,
) -> Result<ScrapeReport>
where
    L: SourceLauncher,
    O: Operator,
{
    let mode = effective_mode(requested, state);
    match mode {
        ScrapeMode::Full if state.initial_scrape_complete => {
            warn!("全件取得が指定されたため、既存の {} 件を破棄して最初から取得します", state.len());
            *state = ScrapeState::default();
        }
        ScrapeMode::Update if !state.initial_scrape_complete => {
            warn!("全件取得が未完了のまま差分取得を行います");
        }
        _ => {}
    }

    match mode {
        ScrapeMode::Update => println!("[1/2] 差分取得: 新しい寄付のみ確認します"),
        _ if state.resume_page() > 0 => {
            println!("[1/2] 全件取得: ページ {} から再開します", state.resume_page())
        }
        _ => println!("[1/2] 全件取得: すべての寄付を取得します"),
    }

    let source = launcher.launch().await?;
    let mut fetcher = PageFetcher::new(source, operator, policy, stop.clone());
    let result = drive(&mut fetcher, config, state, mode).await;
    launcher.close(fetcher.into_source()).await;
    let report = result?;

    match mode {
        ScrapeMode::Update => {
            if report.added > 0 {
                state.save(&config.output_dir)?;
                println!("✔ 新しい寄付 {}件 (合計 {}件)", report.added, state.len());
            } else {
                println!("✔ 新しい寄付はありません");
            }
        }
        _ => match report.stop_reason {
            StopReason::StopRequested => {
                state.save(&config.output_dir)?;
                println!("✔ 中断しました。次回はページ {} から再開します", state.resume_page());
            }
            _ if !state.is_empty() => {
                state.mark_complete();
                state.save(&config.output_dir)?;
                info!(
                    newest = ?state.newest_donation_id,
                    oldest = ?state.last_donation_id,
                    "全件取得完了"
                );
                println!("✔ 全件取得が完了しました (合計 {}件)", state.len());
            }
            _ => println!("✗ 全件取得に失敗したか、寄付が見つかりませんでした"),
        },
    }

    Ok(report)
}

/// `run` サブコマンド本体
///
/// 実ブラウザで収集し、Ctrl+C / SIGTERM を割り込みとして扱う。
pub async fn run(config: &Config, mode: ScrapeMode, unattended: bool) -> Result<ExportSummary> {
    let mut launcher = BrowserLauncher::from_config(config);
    let policy = RetryPolicy::default().with_attempts(config.fetch_attempts);
    if unattended {
        run_with(config, mode, &mut launcher, UnattendedOperator, policy, shutdown_signal()).await
    } else {
        run_with(config, mode, &mut launcher, ConsoleOperator, policy, shutdown_signal()).await
    }
}

/// チェックポイント読込 → 収集 → 保存 → CSV出力
///
/// 戻り値はCSV出力の結果。収集の失敗や `interrupt` の完了はログに残して出力へ進む。
pub async fn run_with<L, O, F>(
    config: &Config,
    mode: ScrapeMode,
    launcher: &mut L,
    operator: O,
    policy: RetryPolicy,
    interrupt: F,
) -> Result<ExportSummary>
where
    L: SourceLauncher,
    O: Operator,
    F: Future<Output = ()>,
{
    std::fs::create_dir_all(&config.output_dir)?;
    let mut state = ScrapeState::load(&config.output_dir)?;
    println!(
        "- チェックポイント: {}件 (全件取得{})",
        state.len(),
        if state.initial_scrape_complete { "完了" } else { "未完了" }
    );

    let stop = StopSignal::new().with_stop_file(config.stop_file_path());
    let needs_save = if stop.is_stopped() {
        warn!(
            "停止ファイルがあるため収集を行いません: {} (`stop --clear` で削除)",
            config.stop_file_path().display()
        );
        false
    } else {
        let outcome = tokio::select! {
            biased;
            _ = interrupt => None,
            result = scrape(config, &mut state, mode, launcher, operator, policy, &stop) => Some(result),
        };

        match outcome {
            Some(Ok(_)) => false,
            Some(Err(e)) => {
                error!("収集中にエラーが発生しました: {}", e);
                println!("✗ 収集を中断しました。取得済みの分でCSVを出力します");
                true
            }
            None => {
                stop.request();
                println!("\n✗ 割り込みを受けました。取得済みの分を保存します");
                true
            }
        }
    };

    if needs_save && !state.is_empty() {
        match state.save(&config.output_dir) {
            Ok(()) => info!("チェックポイントを保存しました ({}件)", state.len()),
            Err(e) => error!("チェックポイントの保存に失敗: {}", e),
        }
    }

    println!("[2/2] CSV出力");
    let summary = export_csv(&state.donations, &config.csv_path(), &config.export_rules())?;
    println!("\n✅ 完了 (合計 {}件)", state.len());
    Ok(summary)
}

/// Ctrl+C または SIGTERM を待つ
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Ctrl+Cハンドラを登録できません: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("SIGTERMハンドラを登録できません: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
