use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScraperError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error("ブラウザ起動エラー: {0}")]
    BrowserLaunch(String),

    #[error("ブラウザ操作エラー: {0}")]
    Browser(#[from] chromiumoxide::error::CdpError),

    #[error("チェックポイントが破損しています ({path}): {reason}")]
    CheckpointCorrupt { path: String, reason: String },

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Common(#[from] donation_scraper_common::Error),
}

pub type Result<T> = std::result::Result<T, ScraperError>;
