//! Type definitions for the transaction synthesizer

pub mod detection;
pub mod transaction;

pub use detection::{DetectionRequest, DetectionVerdict, FeatureVector};
pub use transaction::{TransactionRecord, TransactionType};
