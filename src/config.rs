use crate::error::{Result, ScraperError};
use donation_scraper_common::export::{ExportRules, ANONYMOUS_LABEL, DEFAULT_EXCLUDED_COLUMNS};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const CHECKPOINT_FILE_NAME: &str = "checkpoint.json";
pub const CSV_FILE_NAME: &str = "all_donations.csv";
pub const STOP_FILE_NAME: &str = "stop.txt";
pub const LOG_FILE_NAME: &str = "scrape.log";

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/129.0.0.0 Safari/537.36";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// キャンペーン識別子（URLのスラッグ）
    pub campaign: String,
    pub api_base_url: String,
    /// 作業ディレクトリ（チェックポイント・ページダンプ・CSV）
    pub output_dir: PathBuf,
    pub max_pages_initial: u32,
    pub max_pages_update: u32,
    pub checkpoint_interval: u32,
    /// 差分取得で新規0件のページがこの数だけ連続したら終了
    pub known_page_limit: u32,
    pub fetch_attempts: u32,
    pub headless: bool,
    pub user_agent: String,
    pub chrome_executable: Option<PathBuf>,
    pub save_page_dumps: bool,
    pub anonymous_label: String,
    pub excluded_columns: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default_config())
        }
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| ScraperError::Config("ホームディレクトリが見つかりません".into()))?;
        Ok(home.join(".config").join("donation-scraper").join("config.json"))
    }

    fn default_config() -> Self {
        Self {
            campaign: "luigi-defense-fund".into(),
            api_base_url: "https://www.givesendgo.com/api/v2/campaigns".into(),
            output_dir: PathBuf::from("donations_data"),
            max_pages_initial: 5000,
            max_pages_update: 100,
            checkpoint_interval: 10,
            known_page_limit: 3,
            fetch_attempts: 3,
            headless: false, // チャレンジを手動で解くため既定は表示あり
            user_agent: DEFAULT_USER_AGENT.into(),
            chrome_executable: None,
            save_page_dumps: true,
            anonymous_label: ANONYMOUS_LABEL.into(),
            excluded_columns: DEFAULT_EXCLUDED_COLUMNS.iter().map(|c| c.to_string()).collect(),
        }
    }

    pub fn set_campaign(&mut self, campaign: String) -> Result<()> {
        self.campaign = campaign;
        self.validate()?;
        self.save()
    }

    pub fn validate(&self) -> Result<()> {
        let campaign = self.campaign.trim();
        if campaign.is_empty() {
            return Err(ScraperError::Config("キャンペーンが設定されていません".into()));
        }
        if campaign.contains('/') || campaign.contains('?') {
            return Err(ScraperError::Config(format!("キャンペーン名が不正です: {}", campaign)));
        }
        if self.api_base_url.trim().is_empty() {
            return Err(ScraperError::Config("APIのベースURLが空です".into()));
        }
        Ok(())
    }

    /// ページ番号を除いたURL（末尾に番号を付けて使う）
    pub fn page_url_prefix(&self) -> String {
        format!(
            "{}/{}/get-recent-donations?pageNo=",
            self.api_base_url.trim_end_matches('/'),
            self.campaign.trim()
        )
    }

    pub fn page_url(&self, page: u32) -> String {
        format!("{}{}", self.page_url_prefix(), page)
    }

    pub fn csv_path(&self) -> PathBuf {
        self.output_dir.join(CSV_FILE_NAME)
    }

    pub fn stop_file_path(&self) -> PathBuf {
        self.output_dir.join(STOP_FILE_NAME)
    }

    /// ブラウザのプロファイルディレクトリ（実行をまたいで共有）
    pub fn profile_dir(&self) -> PathBuf {
        std::env::temp_dir().join("chrome_profile_single")
    }

    pub fn export_rules(&self) -> ExportRules {
        ExportRules {
            excluded_columns: self.excluded_columns.clone(),
            anonymous_label: self.anonymous_label.clone(),
        }
    }
}
