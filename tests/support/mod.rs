//! テスト用の固定応答ページ取得元

#![allow(dead_code)]

use donation_scraper::error::{Result, ScraperError};
use donation_scraper::scrape::{PageSource, SourceLauncher};
use donation_scraper_common::Donation;
use serde_json::json;
use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use tokio::sync::oneshot;

pub const PREFIX: &str = "https://fixture.test/campaign/get-recent-donations?pageNo=";

/// 固定応答のページ取得元
///
/// URLごとに応答を順に返す。最後の応答は繰り返し返す。未登録のURLは空ページ。
#[derive(Default)]
pub struct FixtureFeed {
    pages: HashMap<String, VecDeque<String>>,
    current: Option<String>,
    pub visits: Vec<String>,
    /// このページを返すときに停止ファイルを作る
    stop_file: Option<(u32, PathBuf)>,
    /// このページを返すときに割り込みを送る
    interrupt: Option<(u32, oneshot::Sender<()>)>,
}

impl FixtureFeed {
    pub fn page(mut self, page: u32, ids: &[u64]) -> Self {
        self.pages
            .entry(page_url(page))
            .or_default()
            .push_back(page_html(ids));
        self
    }

    pub fn raw(mut self, page: u32, html: &str) -> Self {
        self.pages
            .entry(page_url(page))
            .or_default()
            .push_back(html.to_string());
        self
    }

    pub fn stop_file_at(mut self, page: u32, path: impl Into<PathBuf>) -> Self {
        self.stop_file = Some((page, path.into()));
        self
    }

    pub fn interrupt_at(mut self, page: u32, tx: oneshot::Sender<()>) -> Self {
        self.interrupt = Some((page, tx));
        self
    }

    pub fn visited_pages(&self) -> Vec<u32> {
        let mut pages: Vec<u32> = self
            .visits
            .iter()
            .filter_map(|url| url.strip_prefix(PREFIX)?.parse().ok())
            .collect();
        pages.dedup();
        pages
    }
}

impl PageSource for FixtureFeed {
    async fn navigate(&mut self, url: &str) -> Result<()> {
        self.visits.push(url.to_string());
        self.current = Some(url.to_string());
        Ok(())
    }

    async fn content(&mut self) -> Result<String> {
        let url = self
            .current
            .clone()
            .ok_or_else(|| ScraperError::Config("未移動".into()))?;

        if let Some((page, path)) = &self.stop_file {
            if url == page_url(*page) {
                std::fs::write(path, "")?;
            }
        }

        let fire = matches!(&self.interrupt, Some((page, _)) if url == page_url(*page));
        if fire {
            if let Some((_, tx)) = self.interrupt.take() {
                let _ = tx.send(());
            }
            tokio::task::yield_now().await;
        }

        let html = match self.pages.get_mut(&url) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or_default(),
            Some(queue) => queue.front().cloned().unwrap_or_default(),
            None => page_html(&[]),
        };
        Ok(html)
    }
}

/// 1回だけ `FixtureFeed` を渡す起動元
#[derive(Default)]
pub struct FixtureLauncher {
    feed: Option<FixtureFeed>,
    /// `close` で返された取得元
    pub closed: Option<FixtureFeed>,
    pub launches: usize,
}

impl FixtureLauncher {
    pub fn new(feed: FixtureFeed) -> Self {
        Self {
            feed: Some(feed),
            ..Default::default()
        }
    }

    /// 起動に失敗する
    pub fn failing() -> Self {
        Self::default()
    }
}

impl SourceLauncher for FixtureLauncher {
    type Source = FixtureFeed;

    async fn launch(&mut self) -> Result<FixtureFeed> {
        self.launches += 1;
        self.feed
            .take()
            .ok_or_else(|| ScraperError::BrowserLaunch("ブラウザが見つかりません".into()))
    }

    async fn close(&mut self, source: FixtureFeed) {
        self.closed = Some(source);
    }
}

pub fn page_url(page: u32) -> String {
    format!("{}{}", PREFIX, page)
}

pub fn page_html(ids: &[u64]) -> String {
    let donations: Vec<_> = ids
        .iter()
        .map(|id| json!({"donation_id": id, "donation_name": format!("donor {}", id), "donation_amount": 10}))
        .collect();
    let body = json!({"returnData": {"donations": donations}});
    format!("<html><body><pre>{}</pre></body></html>", body)
}

pub fn donation_list(ids: &[u64]) -> Vec<Donation> {
    ids.iter()
        .map(|id| {
            Donation::from_value(
                json!({"donation_id": id, "donation_name": format!("donor {}", id), "donation_amount": 10}),
            )
            .expect("オブジェクトのはず")
        })
        .collect()
}
