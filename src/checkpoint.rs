//! チェックポイントモジュール
//!
//! 収集済みの寄付一覧と進捗ポインタをJSONファイルに保存し、
//! 次回実行時に再開できるようにする。
//!
//! 保存は一時ファイルに書いてから置き換えるため、書き込み途中で
//! 落ちても直前のチェックポイントは残る。

use crate::config::CHECKPOINT_FILE_NAME;
use crate::error::{Result, ScraperError};
use donation_scraper_common::types::id_text;
use donation_scraper_common::{Donation, DonationKey};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// 収集状態（チェックポイントの内容）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScrapeState {
    /// 寄付一覧（新しい順）
    #[serde(default)]
    pub donations: Vec<Donation>,

    /// 全件取得で最後に取得したページ
    #[serde(default)]
    pub last_page: u32,

    /// 一覧末尾（最古）の識別子
    #[serde(default, deserialize_with = "deserialize_donation_id")]
    pub last_donation_id: Option<String>,

    /// 一覧先頭（最新）の識別子
    #[serde(default, deserialize_with = "deserialize_donation_id")]
    pub newest_donation_id: Option<String>,

    #[serde(default)]
    pub initial_scrape_complete: bool,

    /// 最終保存日時（RFC 3339）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// 識別子は文字列・数値のどちらで保存されていても読み込む
fn deserialize_donation_id<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(id_text))
}

impl ScrapeState {
    pub fn checkpoint_path(dir: &Path) -> PathBuf {
        dir.join(CHECKPOINT_FILE_NAME)
    }

    /// チェックポイントを読み込み
    ///
    /// ファイルが無ければ空の状態を返す。壊れている場合はエラー。
    pub fn load(dir: &Path) -> Result<Self> {
        let path = Self::checkpoint_path(dir);
        if !path.exists() {
            return Ok(Self::default());
        }

        let reader = BufReader::new(File::open(&path)?);
        serde_json::from_reader(reader).map_err(|e| ScraperError::CheckpointCorrupt {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }

    /// チェックポイントを保存
    pub fn save(&mut self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir)?;
        self.refresh_pointers();
        self.updated_at = Some(chrono::Utc::now().to_rfc3339());

        let path = Self::checkpoint_path(dir);
        let tmp_path = path.with_extension("json.tmp");
        {
            let mut writer = BufWriter::new(File::create(&tmp_path)?);
            serde_json::to_writer_pretty(&mut writer, self)?;
            writer.flush()?;
        }
        fs::rename(&tmp_path, &path)?;
        Ok(())
    }

    /// チェックポイントを削除
    ///
    /// 戻り値: 削除したかどうか
    pub fn clear(dir: &Path) -> Result<bool> {
        let path = Self::checkpoint_path(dir);
        if path.exists() {
            fs::remove_file(path)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// 先頭・末尾の識別子を一覧に合わせて更新
    pub fn refresh_pointers(&mut self) {
        self.newest_donation_id = self.donations.first().and_then(Donation::id);
        self.last_donation_id = self.donations.last().and_then(Donation::id);
    }

    /// 既知の識別子の集合
    pub fn known_ids(&self) -> HashSet<DonationKey> {
        self.donations.iter().map(Donation::key).collect()
    }

    /// 全件取得の再開ページ
    ///
    /// 未完了かつレコードがあれば、保存済みページの次から。
    pub fn resume_page(&self) -> u32 {
        if !self.initial_scrape_complete && !self.donations.is_empty() {
            self.last_page.saturating_add(1)
        } else {
            0
        }
    }

    /// 全件取得の完了を記録
    pub fn mark_complete(&mut self) {
        self.initial_scrape_complete = true;
        self.last_page = 0;
        self.refresh_pointers();
    }

    pub fn len(&self) -> usize {
        self.donations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.donations.is_empty()
    }
}
