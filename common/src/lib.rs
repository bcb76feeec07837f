//! Donation Scraper Common Library
//!
//! ブラウザに依存しない共通ロジック（寄付レコード型、ページ解析、CSV生成）

pub mod types;
pub mod error;
pub mod parser;
pub mod export;

pub use types::{Donation, DonationKey, DONATION_ID_FIELD, DONATION_NAME_FIELD};
pub use error::{Error, Result};
pub use parser::{extract_payload, is_challenge, parse_page, parse_payload, DonationPage, PageError, CHALLENGE_MARKER};
pub use export::{build_table, dedupe_donations, write_csv, DonationTable, ExportRules, TableStats};
