//! ブラウザセッション
//!
//! chromiumoxide でブラウザを起動し、1タブを使い回してページを取得する。
//! CDPイベントのハンドラはバックグラウンドタスクで回す。

use super::process::terminate_stale_browsers;
use super::{PageSource, SourceLauncher};
use crate::config::Config;
use crate::error::{Result, ScraperError};
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use std::path::PathBuf;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// 起動設定
#[derive(Debug, Clone)]
pub struct BrowserSettings {
    pub headless: bool,
    pub user_agent: String,
    pub profile_dir: PathBuf,
    pub chrome_executable: Option<PathBuf>,
}

impl BrowserSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            headless: config.headless,
            user_agent: config.user_agent.clone(),
            profile_dir: config.profile_dir(),
            chrome_executable: config.chrome_executable.clone(),
        }
    }
}

/// 起動中のブラウザ
///
/// `close` で明示的に終了する。closeせずに破棄した場合もハンドラは止まり、
/// 子プロセスはライブラリ側で終了される。
pub struct BrowserSession {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
}

impl BrowserSession {
    pub async fn launch(settings: &BrowserSettings) -> Result<Self> {
        let terminated = terminate_stale_browsers(&settings.profile_dir);
        if terminated > 0 {
            info!("残存ブラウザ {} 件を終了しました", terminated);
        }
        std::fs::create_dir_all(&settings.profile_dir)?;

        let mut builder = BrowserConfig::builder()
            .user_data_dir(&settings.profile_dir)
            .arg("--disable-blink-features=AutomationControlled")
            .arg(format!("--user-agent={}", settings.user_agent));
        if !settings.headless {
            builder = builder.with_head();
        }
        if let Some(exe) = &settings.chrome_executable {
            builder = builder.chrome_executable(exe);
        }
        let browser_config = builder.build().map_err(ScraperError::BrowserLaunch)?;

        info!("ブラウザを起動中...");
        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| ScraperError::BrowserLaunch(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("CDPイベントエラー: {}", e);
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                handler.abort();
                return Err(e.into());
            }
        };
        info!("ブラウザを起動しました");

        Ok(Self { browser, page, handler })
    }

    /// ブラウザを終了（失敗はログのみ）
    pub async fn close(mut self) {
        if let Err(e) = self.browser.close().await {
            warn!("ブラウザの終了に失敗: {}", e);
        }
        if let Err(e) = self.browser.wait().await {
            debug!("ブラウザプロセスの待機に失敗: {}", e);
        }
        self.handler.abort();
        info!("ブラウザを終了しました");
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

impl PageSource for BrowserSession {
    async fn navigate(&mut self, url: &str) -> Result<()> {
        self.page.goto(url).await?;
        Ok(())
    }

    async fn content(&mut self) -> Result<String> {
        Ok(self.page.content().await?)
    }
}

/// 実ブラウザの起動
#[derive(Debug, Clone)]
pub struct BrowserLauncher {
    settings: BrowserSettings,
}

impl BrowserLauncher {
    pub fn new(settings: BrowserSettings) -> Self {
        Self { settings }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(BrowserSettings::from_config(config))
    }
}

impl SourceLauncher for BrowserLauncher {
    type Source = BrowserSession;

    async fn launch(&mut self) -> Result<BrowserSession> {
        BrowserSession::launch(&self.settings).await
    }

    async fn close(&mut self, session: BrowserSession) {
        session.close().await;
    }
}
