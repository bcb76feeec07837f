//! 寄付レコードの型定義
//!
//! APIが返す寄付1件分のJSONオブジェクトをそのまま保持する。
//! 未知のフィールドもチェックポイント経由で失われないよう、
//! 構造体へは展開せずキー順を保ったマップとして扱う。

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 一意識別子のフィールド名
pub const DONATION_ID_FIELD: &str = "donation_id";

/// 寄付者名のフィールド名
pub const DONATION_NAME_FIELD: &str = "donation_name";

/// 重複判定に使うキー
///
/// `donation_id` が無い（またはnullの）レコードはすべて `None` を共有する。
pub type DonationKey = Option<String>;

/// 寄付レコード（1件）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Donation(Map<String, Value>);

impl Donation {
    /// JSON値から生成（オブジェクト以外は `None`）
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self(fields)),
            _ => None,
        }
    }

    /// `donation_id` を文字列化して返す
    pub fn id(&self) -> Option<String> {
        self.0.get(DONATION_ID_FIELD).and_then(id_text)
    }

    /// 重複判定キー
    pub fn key(&self) -> DonationKey {
        self.id()
    }

    /// 寄付者名（文字列の場合のみ）
    pub fn name(&self) -> Option<&str> {
        self.0.get(DONATION_NAME_FIELD).and_then(Value::as_str)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }
}

/// 識別子として使えるJSON値を文字列に変換
///
/// 文字列はそのまま、数値は10進表記。それ以外は識別子とみなさない。
pub fn id_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
