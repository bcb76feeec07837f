//! ページ解析
//!
//! ブラウザで描画したAPIレスポンス（HTML）から寄付一覧を取り出す。
//!
//! 判定順序:
//! 1. チャレンジページ（"Just a moment..."）
//! 2. `<pre>` 要素内のJSON
//! 3. `returnData.donations` 配列

use crate::error::{Error, Result};
use crate::types::Donation;
use scraper::{Html, Selector};
use serde_json::Value;

/// ボット対策のチャレンジページに含まれる文言
pub const CHALLENGE_MARKER: &str = "Just a moment...";

/// 1ページ分の取得結果
#[derive(Debug, Clone, PartialEq)]
pub struct DonationPage {
    /// 寄付レコード（ページ内の並び順のまま）
    pub donations: Vec<Donation>,
    /// ページダンプ用のJSON全体
    pub raw: Value,
}

/// ページ単位の失敗理由
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum PageError {
    #[error("チャレンジページが表示されました")]
    Challenge,

    #[error("ページ内にJSONが見つかりません")]
    MissingPayload,

    #[error("JSONの解析に失敗: {0}")]
    InvalidPayload(String),
}

/// チャレンジページかどうか
pub fn is_challenge(html: &str) -> bool {
    html.contains(CHALLENGE_MARKER)
}

/// `<pre>` 要素のテキストを抽出
///
/// 最初の `<pre>` のみを対象にする。空白のみの場合は `None`。
pub fn extract_payload(html: &str) -> Option<String> {
    let selector = Selector::parse("pre").ok()?;
    let document = Html::parse_document(html);
    let pre = document.select(&selector).next()?;
    let text = pre.text().collect::<String>();
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// JSON文字列から寄付一覧をパース
///
/// `returnData` または `donations` が無い（null含む）場合は空ページとして扱う。
pub fn parse_payload(text: &str) -> Result<DonationPage> {
    let raw: Value = serde_json::from_str(text.trim())?;

    let donations = match raw.get("returnData").and_then(|r| r.get("donations")) {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .cloned()
            .map(|item| {
                Donation::from_value(item)
                    .ok_or_else(|| Error::Parse("寄付レコードがオブジェクトではありません".into()))
            })
            .collect::<Result<Vec<_>>>()?,
        Some(_) => return Err(Error::Parse("donationsが配列ではありません".into())),
    };

    Ok(DonationPage { donations, raw })
}

/// 描画済みHTMLを解析
pub fn parse_page(html: &str) -> std::result::Result<DonationPage, PageError> {
    if is_challenge(html) {
        return Err(PageError::Challenge);
    }
    let text = extract_payload(html).ok_or(PageError::MissingPayload)?;
    parse_payload(&text).map_err(|e| PageError::InvalidPayload(e.to_string()))
}
