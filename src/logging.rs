//! ログ初期化
//!
//! - 標準エラーへの人間向けログ
//! - 作業ディレクトリの `scrape.log`（指定時のみ）
//!
//! `RUST_LOG` があればそれを優先する。

use crate::config::LOG_FILE_NAME;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

fn env_filter(verbose: bool) -> EnvFilter {
    let default = if verbose {
        "donation_scraper=debug,donation_scraper_common=debug,info"
    } else {
        "info,chromiumoxide=warn"
    };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// ログを初期化
///
/// 戻り値のガードはプロセス終了まで保持すること（ファイルへの書き残しを防ぐ）。
/// 既に初期化済みの場合は何もしない。
pub fn init(verbose: bool, log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(env_filter(verbose));

    let (file_layer, guard) = match log_dir {
        Some(dir) => match std::fs::create_dir_all(dir) {
            Ok(()) => {
                let appender = tracing_appender::rolling::never(dir, LOG_FILE_NAME);
                let (writer, guard) = tracing_appender::non_blocking(appender);
                let layer = tracing_subscriber::fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false)
                    .with_filter(env_filter(verbose));
                (Some(layer), Some(guard))
            }
            Err(e) => {
                eprintln!("ログディレクトリを作成できません ({}): {}", dir.display(), e);
                (None, None)
            }
        },
        None => (None, None),
    };

    let _ = tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .try_init();

    guard
}
