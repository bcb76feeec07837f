//! CSV生成（共通ライブラリ）
//!
//! 寄付レコードを表形式に平坦化して書き出す。
//!
//! ## 変換ルール
//! 1. 列は全レコード（重複含む）のキーの初出順
//! 2. `donation_id` で重複除去（先勝ち）
//! 3. 除外列を削除
//! 4. 空の寄付者名をプレースホルダに置換

use crate::types::{Donation, DonationKey, DONATION_NAME_FIELD};
use serde_json::Value;
use std::collections::HashSet;
use std::io::{self, Write};

/// 匿名寄付者のプレースホルダ
pub const ANONYMOUS_LABEL: &str = "Anonymous";

/// 出力から除外する列
pub const DEFAULT_EXCLUDED_COLUMNS: &[&str] = &[
    "donation_comment_reply",
    "donation_conversion_rate",
    "donation_amount_actual",
    "donation_date",
    "likes",
];

/// UTF-8 BOM（表計算ソフトでの文字化け対策）
pub const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// 出力ルール
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRules {
    pub excluded_columns: Vec<String>,
    pub anonymous_label: String,
}

impl Default for ExportRules {
    fn default() -> Self {
        Self {
            excluded_columns: DEFAULT_EXCLUDED_COLUMNS.iter().map(|c| c.to_string()).collect(),
            anonymous_label: ANONYMOUS_LABEL.to_string(),
        }
    }
}

/// 変換時の統計
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableStats {
    pub input_records: usize,
    pub duplicates_removed: usize,
    pub names_filled: usize,
    /// 実際に存在して削除された列
    pub dropped_columns: Vec<String>,
}

/// 平坦化済みの表
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DonationTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub stats: TableStats,
}

/// `donation_id` で重複除去（先勝ち）
///
/// 戻り値: (残ったレコード, 除去件数)
pub fn dedupe_donations(donations: &[Donation]) -> (Vec<&Donation>, usize) {
    let mut seen: HashSet<DonationKey> = HashSet::with_capacity(donations.len());
    let kept: Vec<&Donation> = donations
        .iter()
        .filter(|d| seen.insert(d.key()))
        .collect();
    let removed = donations.len() - kept.len();
    (kept, removed)
}

/// セル値の文字列化
///
/// 真偽値は `True`/`False`、nullは空文字、配列・オブジェクトはJSON文字列。
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(_) => false,
    }
}

/// レコード一覧から出力用の表を構築
pub fn build_table(donations: &[Donation], rules: &ExportRules) -> DonationTable {
    // 列: 重複除去前の全レコードでのキーの初出順
    let mut seen_columns: HashSet<&str> = HashSet::new();
    let mut all_columns: Vec<&str> = Vec::new();
    for donation in donations {
        for key in donation.fields().keys() {
            if seen_columns.insert(key.as_str()) {
                all_columns.push(key.as_str());
            }
        }
    }

    let (kept, duplicates_removed) = dedupe_donations(donations);

    let excluded: HashSet<&str> = rules.excluded_columns.iter().map(String::as_str).collect();
    let dropped_columns: Vec<String> = all_columns
        .iter()
        .filter(|c| excluded.contains(*c))
        .map(|c| c.to_string())
        .collect();
    let headers: Vec<String> = all_columns
        .iter()
        .filter(|c| !excluded.contains(*c))
        .map(|c| c.to_string())
        .collect();

    let name_col = headers.iter().position(|h| h == DONATION_NAME_FIELD);
    let mut names_filled = 0;

    let rows: Vec<Vec<String>> = kept
        .iter()
        .map(|donation| {
            headers
                .iter()
                .enumerate()
                .map(|(i, header)| {
                    let value = donation.get(header);
                    if Some(i) == name_col && is_blank(value) {
                        names_filled += 1;
                        rules.anonymous_label.clone()
                    } else {
                        value.map(cell_text).unwrap_or_default()
                    }
                })
                .collect()
        })
        .collect();

    DonationTable {
        headers,
        rows,
        stats: TableStats {
            input_records: donations.len(),
            duplicates_removed,
            names_filled,
            dropped_columns,
        },
    }
}

fn needs_quotes(field: &str) -> bool {
    field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r')
}

/// 1行書き出し（必要な場合のみクォート）
pub fn write_row<W: Write>(mut w: W, row: &[String]) -> io::Result<()> {
    let mut first = true;
    for cell in row {
        if !first {
            w.write_all(b",")?;
        } else {
            first = false;
        }
        if needs_quotes(cell) {
            write!(w, "\"{}\"", cell.replace('"', "\"\""))?;
        } else {
            w.write_all(cell.as_bytes())?;
        }
    }
    w.write_all(b"\n")
}

/// 表全体を書き出し（BOM + ヘッダ + 行）
pub fn write_csv<W: Write>(mut w: W, table: &DonationTable) -> io::Result<()> {
    w.write_all(UTF8_BOM)?;
    write_row(&mut w, &table.headers)?;
    for row in &table.rows {
        write_row(&mut w, row)?;
    }
    w.flush()
}
