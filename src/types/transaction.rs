//! Transaction record published to the `transactions` topic

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Direction of money movement on a synthesized record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionType {
    Debit,
    Credit,
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionType::Debit => f.write_str("DEBIT"),
            TransactionType::Credit => f.write_str("CREDIT"),
        }
    }
}

/// A single synthesized card transaction.
///
/// Ground-truth fraud labels are deliberately absent: they stay with the
/// producer (see [`crate::synthesizer::LabelledTransaction`]) and never reach
/// the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Unique transaction identifier
    pub transaction_id: Uuid,

    /// Today's date with a strategy-specific hour, no fractional seconds
    pub timestamp: NaiveDateTime,

    /// Synthetic account identifier, also the publish key
    pub account_number: String,

    /// Last four digits of the card
    pub card_last4: String,

    /// Amount rounded to two decimals, always positive
    pub amount: f64,

    pub currency: String,

    pub transaction_type: TransactionType,

    pub merchant_name: String,

    pub merchant_category: String,

    pub merchant_location: String,

    pub card_present: bool,

    /// Present only for card-not-present transactions
    pub ip_address: Option<String>,

    /// Present only for card-not-present transactions
    pub device_fingerprint: Option<Uuid>,
}

impl TransactionRecord {
    /// Key under which the record is published.
    pub fn key(&self) -> &str {
        &self.account_number
    }

    /// True when the digital fingerprints agree with the card channel:
    /// both present for card-not-present, both absent otherwise.
    pub fn channel_is_consistent(&self) -> bool {
        if self.card_present {
            self.ip_address.is_none() && self.device_fingerprint.is_none()
        } else {
            self.ip_address.is_some() && self.device_fingerprint.is_some()
        }
    }
}
