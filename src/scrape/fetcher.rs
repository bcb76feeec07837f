//! 1ページ分の取得
//!
//! ナビゲート → 待機 → HTML取得 → 解析 を最大 `attempts` 回試行する。
//! 最終試行でチャレンジページが残っている場合はオペレーターに手動対応を依頼し、
//! そのページは失敗として呼び出し元に返す（呼び出し元は次のページへ進む）。

use super::{PageSource, StopSignal};
use donation_scraper_common::{parse_page, DonationPage, PageError};
use rand::Rng;
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, warn};

/// 再試行設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    /// 描画待ちの最小時間
    pub settle_min: Duration,
    /// 描画待ちの最大時間
    pub settle_max: Duration,
    /// チャレンジページ後の待機
    pub challenge_backoff: Duration,
    /// その他の失敗後の待機
    pub failure_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            settle_min: Duration::from_millis(400),
            settle_max: Duration::from_millis(800),
            challenge_backoff: Duration::from_secs(3),
            failure_backoff: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// 待機なし（テスト用）
    pub fn immediate() -> Self {
        Self {
            attempts: 3,
            settle_min: Duration::ZERO,
            settle_max: Duration::ZERO,
            challenge_backoff: Duration::ZERO,
            failure_backoff: Duration::ZERO,
        }
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts.max(1);
        self
    }

    /// 描画待ち時間（範囲内でランダム）
    pub fn settle_delay(&self) -> Duration {
        if self.settle_max <= self.settle_min {
            return self.settle_min;
        }
        let min = self.settle_min.as_millis() as u64;
        let max = self.settle_max.as_millis() as u64;
        Duration::from_millis(rand::thread_rng().gen_range(min..=max))
    }
}

/// ページ取得の失敗理由
#[derive(Debug, Clone, PartialEq)]
pub enum FetchFailure {
    Challenge,
    MissingPayload,
    InvalidPayload(String),
    Browser(String),
    /// 停止要求により中断
    Stopped,
}

impl From<PageError> for FetchFailure {
    fn from(e: PageError) -> Self {
        match e {
            PageError::Challenge => FetchFailure::Challenge,
            PageError::MissingPayload => FetchFailure::MissingPayload,
            PageError::InvalidPayload(reason) => FetchFailure::InvalidPayload(reason),
        }
    }
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchFailure::Challenge => write!(f, "チャレンジページ"),
            FetchFailure::MissingPayload => write!(f, "JSONなし"),
            FetchFailure::InvalidPayload(reason) => write!(f, "JSON不正: {}", reason),
            FetchFailure::Browser(reason) => write!(f, "ブラウザエラー: {}", reason),
            FetchFailure::Stopped => write!(f, "停止要求"),
        }
    }
}

/// 取得結果
#[derive(Debug, Clone, PartialEq)]
pub enum PageFetch {
    Fetched(DonationPage),
    Failed(FetchFailure),
}

/// チャレンジページの手動対応
#[allow(async_fn_in_trait)]
pub trait Operator {
    /// 最終試行でもチャレンジが残ったときに呼ばれる
    async fn resolve_challenge(&mut self, page: u32);
}

impl<O: Operator + ?Sized> Operator for &mut O {
    async fn resolve_challenge(&mut self, page: u32) {
        (**self).resolve_challenge(page).await;
    }
}

/// 端末でEnter入力を待つ
///
/// 入力待ちは専用スレッドで行い、待機中も割り込みを受け付ける。
#[derive(Debug, Default)]
pub struct ConsoleOperator;

impl Operator for ConsoleOperator {
    async fn resolve_challenge(&mut self, page: u32) {
        println!("\n⚠ ページ {} でチャレンジが表示されています。", page);
        println!("  ブラウザ画面でチャレンジを解いてください。");

        let (tx, rx) = tokio::sync::oneshot::channel();
        std::thread::spawn(move || {
            let answer = dialoguer::Input::<String>::new()
                .with_prompt("解決したらEnterを押してください")
                .allow_empty(true)
                .interact_text();
            let _ = tx.send(answer);
        });

        match rx.await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => warn!("入力待ちに失敗: {}", e),
            Err(_) => warn!("入力待ちが中断されました"),
        }
    }
}

/// 手動対応せずログのみ
#[derive(Debug, Default)]
pub struct UnattendedOperator;

impl Operator for UnattendedOperator {
    async fn resolve_challenge(&mut self, page: u32) {
        warn!("ページ {} のチャレンジを解決できませんでした（無人モード）", page);
    }
}

/// ページ取得器
pub struct PageFetcher<S, O> {
    source: S,
    operator: O,
    policy: RetryPolicy,
    stop: StopSignal,
}

impl<S: PageSource, O: Operator> PageFetcher<S, O> {
    pub fn new(source: S, operator: O, policy: RetryPolicy, stop: StopSignal) -> Self {
        Self { source, operator, policy, stop }
    }

    pub fn stop(&self) -> &StopSignal {
        &self.stop
    }

    pub fn into_source(self) -> S {
        self.source
    }

    /// 1ページ取得
    pub async fn fetch(&mut self, url: &str, page: u32) -> PageFetch {
        let attempts = self.policy.attempts.max(1);

        for attempt in 1..=attempts {
            if self.stop.is_stopped() {
                return PageFetch::Failed(FetchFailure::Stopped);
            }

            let failure = match self.try_once(url).await {
                Ok(donation_page) => {
                    debug!(page, attempt, records = donation_page.donations.len(), "ページ取得");
                    return PageFetch::Fetched(donation_page);
                }
                Err(failure) => failure,
            };

            if attempt == attempts {
                debug!(page, attempts, %failure, "ページ取得失敗");
                if failure == FetchFailure::Challenge {
                    self.operator.resolve_challenge(page).await;
                }
                return PageFetch::Failed(failure);
            }

            let backoff = if failure == FetchFailure::Challenge {
                info!("ページ {} でチャレンジ検出、待機して再試行 ({}/{})", page, attempt, attempts);
                self.policy.challenge_backoff
            } else {
                info!("ページ {} 取得失敗 ({}/{}): {}", page, attempt, attempts, failure);
                self.policy.failure_backoff
            };
            tokio::time::sleep(backoff).await;
        }

        PageFetch::Failed(FetchFailure::Stopped)
    }

    async fn try_once(&mut self, url: &str) -> Result<DonationPage, FetchFailure> {
        self.source
            .navigate(url)
            .await
            .map_err(|e| FetchFailure::Browser(e.to_string()))?;
        tokio::time::sleep(self.policy.settle_delay()).await;
        let html = self
            .source
            .content()
            .await
            .map_err(|e| FetchFailure::Browser(e.to_string()))?;
        parse_page(&html).map_err(FetchFailure::from)
    }
}
