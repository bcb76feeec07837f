//! 残存ブラウザの掃除
//!
//! 同じプロファイルディレクトリを掴んだままのブラウザが残っていると
//! 新しいセッションが起動できないため、起動前に終了させる。

use std::path::Path;
use sysinfo::System;
use tracing::{debug, info, warn};

const BROWSER_NAMES: &[&str] = &["chrome", "chromium", "chromium-browser", "google-chrome", "msedge"];

/// プロファイルを使用中のブラウザプロセスかどうか
pub fn is_stale_browser(name: &str, cmd: &[String], profile: &str) -> bool {
    let name = name.to_lowercase();
    let name = name.trim_end_matches(".exe");
    if !BROWSER_NAMES.iter().any(|b| name.starts_with(b)) {
        return false;
    }
    let flag = format!("--user-data-dir={}", profile);
    cmd.iter().any(|arg| arg == &flag)
}

/// 残存ブラウザを終了
///
/// 戻り値: 終了させたプロセス数
pub fn terminate_stale_browsers(profile_dir: &Path) -> usize {
    let profile = profile_dir.display().to_string();
    let mut system = System::new();
    system.refresh_processes();

    let mut terminated = 0;
    for (pid, process) in system.processes() {
        if !is_stale_browser(process.name(), process.cmd(), &profile) {
            continue;
        }
        if process.kill() {
            info!("残存ブラウザを終了しました (PID {})", pid);
            terminated += 1;
        } else {
            warn!("残存ブラウザを終了できません (PID {})", pid);
        }
    }

    debug!(terminated, profile = %profile, "残存ブラウザの確認完了");
    terminated
}
