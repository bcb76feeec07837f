//! CSV出力
//!
//! 表の構築と書き出し形式は共通ライブラリ側にあり、ここではファイル出力と
//! 結果表示を行う。

use crate::error::Result;
use donation_scraper_common::{build_table, write_csv, Donation, ExportRules};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::info;

/// 出力結果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportSummary {
    /// 書き出したファイル（0件の場合は `None`）
    pub path: Option<PathBuf>,
    pub rows: usize,
    pub duplicates_removed: usize,
    pub names_filled: usize,
    pub dropped_columns: Vec<String>,
    pub columns: Vec<String>,
}

/// 寄付一覧をCSVに出力
///
/// 0件の場合はファイルを作らない。
pub fn export_csv(donations: &[Donation], output: &Path, rules: &ExportRules) -> Result<ExportSummary> {
    if donations.is_empty() {
        println!("✗ 出力する寄付がありません");
        return Ok(ExportSummary::default());
    }

    println!("- CSVを生成中... ({}件)", donations.len());
    let table = build_table(donations, rules);

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let writer = BufWriter::new(File::create(output)?);
    write_csv(writer, &table)?;

    let stats = table.stats;
    info!(
        rows = table.rows.len(),
        duplicates = stats.duplicates_removed,
        names_filled = stats.names_filled,
        "CSV出力"
    );
    if stats.duplicates_removed > 0 {
        println!("  重複を除去: {}件", stats.duplicates_removed);
    }
    if !stats.dropped_columns.is_empty() {
        println!("  除外した列: {}", stats.dropped_columns.join(", "));
    }
    println!("✔ CSV出力: {} ({}件)", output.display(), table.rows.len());

    Ok(ExportSummary {
        path: Some(output.to_path_buf()),
        rows: table.rows.len(),
        duplicates_removed: stats.duplicates_removed,
        names_filled: stats.names_filled,
        dropped_columns: stats.dropped_columns,
        columns: table.headers,
    })
}
