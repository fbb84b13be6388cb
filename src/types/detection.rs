//! Request and response shapes of the detection endpoint
//!
//! Validation happens while deserializing: a payload that parses into
//! [`DetectionRequest`] is already known to carry a positive amount and a
//! known transaction type.

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};

/// Transaction types accepted by the detection endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionKind {
    Debit,
    Credit,
    Transfer,
    Withdrawal,
    Deposit,
}

/// Strictly positive, finite amount
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct PositiveAmount(f64);

impl PositiveAmount {
    pub fn value(&self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for PositiveAmount {
    type Error = String;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if value.is_finite() && value > 0.0 {
            Ok(Self(value))
        } else {
            Err(format!("amount must be greater than 0, got {value}"))
        }
    }
}

impl From<PositiveAmount> for f64 {
    fn from(amount: PositiveAmount) -> Self {
        amount.0
    }
}

/// Transaction part of the detection payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionTransaction {
    pub transaction_id: String,
    pub account_id: String,
    pub amount: PositiveAmount,
    pub transaction_type: TransactionKind,
    #[serde(default)]
    pub merchant_id: Option<String>,
    /// Wall-clock time of the transaction. Offsets are accepted and dropped.
    #[serde(deserialize_with = "wall_clock")]
    pub timestamp: NaiveDateTime,
    #[serde(default)]
    pub description: Option<String>,
}

/// Context about the transaction supplied by the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionMetadata {
    #[serde(default)]
    pub merchant_name: Option<String>,
    pub merchant_category: String,
    /// Billing vs transaction location mismatch
    pub location_mismatch: bool,
    pub foreign_transaction: bool,
    /// Transactions on the account in the last 24 hours
    pub velocity_last_24h: u32,
    pub cardholder_age: i32,
}

/// Body of `POST /detect`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionRequest {
    pub transaction: DetectionTransaction,
    pub metadata: TransactionMetadata,
}

/// Flattened view of a detection request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub transaction_id: String,
    pub amount: f64,
    pub hour_of_day: u32,
    pub merchant_category: String,
    pub location_mismatch: bool,
    pub foreign_transaction: bool,
    /// No trust model exists yet, so this is always `None`.
    pub trust_score: Option<f64>,
    pub velocity_last_24h: u32,
    pub cardholder_age: i32,
}

/// Identifiers a verdict would be stored under
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerdictKey {
    pub transaction_id: String,
    pub account_id: String,
    pub merchant_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictStatus {
    /// Features were extracted but no scoring exists.
    NotImplemented,
}

/// Response of `POST /detect`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionVerdict {
    pub key: VerdictKey,
    pub features: FeatureVector,
    pub status: VerdictStatus,
    pub risk_score: Option<f64>,
    pub message: String,
}

impl DetectionVerdict {
    /// Placeholder verdict carrying the extracted features and no score.
    pub fn unscored(request: &DetectionRequest, features: FeatureVector) -> Self {
        Self {
            key: VerdictKey {
                transaction_id: request.transaction.transaction_id.clone(),
                account_id: request.transaction.account_id.clone(),
                merchant_id: request.transaction.merchant_id.clone(),
            },
            features,
            status: VerdictStatus::NotImplemented,
            risk_score: None,
            message: "fraud scoring is not implemented; features extracted only".to_string(),
        }
    }
}

fn wall_clock<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;

    if let Ok(aware) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(aware.naive_local());
    }

    raw.parse::<NaiveDateTime>()
        .map_err(|e| serde::de::Error::custom(format!("invalid timestamp '{raw}': {e}")))
}
