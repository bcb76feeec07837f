//! ページダンプ
//!
//! 取得したページのJSON全体を `donations_page{N}.json` として保存する。

use crate::error::Result;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const DUMP_PREFIX: &str = "donations_page";
const DUMP_EXTENSION: &str = "json";

pub fn page_dump_path(dir: &Path, page: u32) -> PathBuf {
    dir.join(format!("{}{}.{}", DUMP_PREFIX, page, DUMP_EXTENSION))
}

/// 1ページ分のダンプを書き出し
pub fn write_page_dump(dir: &Path, page: u32, raw: &Value) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = page_dump_path(dir, page);
    fs::write(&path, serde_json::to_string_pretty(raw)?)?;
    Ok(path)
}

/// ファイル名からページ番号を取り出す
fn dump_page_number(file_name: &str) -> Option<u32> {
    file_name
        .strip_prefix(DUMP_PREFIX)?
        .strip_suffix(DUMP_EXTENSION)?
        .strip_suffix('.')?
        .parse()
        .ok()
}

/// 作業ディレクトリ直下のダンプ一覧（ページ番号順）
pub fn page_dumps(dir: &Path) -> Vec<(u32, PathBuf)> {
    if !dir.exists() {
        return Vec::new();
    }

    let mut dumps: Vec<(u32, PathBuf)> = WalkDir::new(dir)
        .max_depth(1) // 直下のみ
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| {
            let page = dump_page_number(&e.file_name().to_string_lossy())?;
            Some((page, e.into_path()))
        })
        .collect();

    dumps.sort_by_key(|(page, _)| *page);
    dumps
}

/// ダンプをすべて削除
///
/// 戻り値: 削除したファイル数
pub fn remove_page_dumps(dir: &Path) -> Result<usize> {
    let dumps = page_dumps(dir);
    for (_, path) in &dumps {
        fs::remove_file(path)?;
    }
    Ok(dumps.len())
}
