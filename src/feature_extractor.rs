//! Feature extraction for the detection boundary.
//!
//! Flattens a validated [`DetectionRequest`] into a [`FeatureVector`]. There
//! is no scoring model behind this yet; the vector is what a future scorer
//! would consume.

use crate::types::detection::{DetectionRequest, FeatureVector};
use chrono::Timelike;

/// Column names of [`FeatureVector::to_model_input`], in order.
pub const MODEL_INPUT_COLUMNS: [&str; 7] = [
    "amount",
    "hour_of_day",
    "location_mismatch",
    "foreign_transaction",
    "trust_score",
    "velocity_last_24h",
    "cardholder_age",
];

/// Value used for the trust score column until a trust model exists.
const UNSCORED_TRUST: f32 = 0.0;

/// Transforms detection requests into feature vectors.
pub struct FeatureExtractor;

impl FeatureExtractor {
    /// Create a new feature extractor.
    pub fn new() -> Self {
        Self
    }

    /// Extract features from a request.
    pub fn extract(&self, request: &DetectionRequest) -> FeatureVector {
        let tx = &request.transaction;
        let meta = &request.metadata;

        FeatureVector {
            transaction_id: tx.transaction_id.clone(),
            amount: tx.amount.value(),
            hour_of_day: tx.timestamp.hour(),
            merchant_category: meta.merchant_category.clone(),
            location_mismatch: meta.location_mismatch,
            foreign_transaction: meta.foreign_transaction,
            trust_score: None,
            velocity_last_24h: meta.velocity_last_24h,
            cardholder_age: meta.cardholder_age,
        }
    }

    /// Number of numeric columns produced by [`FeatureVector::to_model_input`].
    pub fn feature_count(&self) -> usize {
        MODEL_INPUT_COLUMNS.len()
    }

    pub fn feature_names(&self) -> Vec<&'static str> {
        MODEL_INPUT_COLUMNS.to_vec()
    }
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureVector {
    /// Numeric projection: booleans as 0/1, categorical columns left out.
    pub fn to_model_input(&self) -> Vec<f32> {
        let flag = |b: bool| if b { 1.0 } else { 0.0 };

        vec![
            self.amount as f32,
            self.hour_of_day as f32,
            flag(self.location_mismatch),
            flag(self.foreign_transaction),
            self.trust_score.map(|s| s as f32).unwrap_or(UNSCORED_TRUST),
            self.velocity_last_24h as f32,
            self.cardholder_age as f32,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::detection::{
        DetectionTransaction, PositiveAmount, TransactionKind, TransactionMetadata,
    };
    use chrono::NaiveDate;

    fn request() -> DetectionRequest {
        DetectionRequest {
            transaction: DetectionTransaction {
                transaction_id: "test_001".to_string(),
                account_id: "CAPITEC1000000001".to_string(),
                amount: PositiveAmount::try_from(15_000.5).unwrap(),
                transaction_type: TransactionKind::Debit,
                merchant_id: Some("m_42".to_string()),
                timestamp: NaiveDate::from_ymd_opt(2026, 10, 16)
                    .unwrap()
                    .and_hms_opt(3, 12, 0)
                    .unwrap(),
                description: None,
            },
            metadata: TransactionMetadata {
                merchant_name: Some("Bitcoin ATM".to_string()),
                merchant_category: "Cryptocurrency".to_string(),
                location_mismatch: true,
                foreign_transaction: false,
                velocity_last_24h: 12,
                cardholder_age: 35,
            },
        }
    }

    #[test]
    fn test_feature_extraction() {
        let extractor = FeatureExtractor::new();
        let features = extractor.extract(&request());

        assert_eq!(features.transaction_id, "test_001");
        assert_eq!(features.amount, 15_000.5);
        assert_eq!(features.hour_of_day, 3);
        assert_eq!(features.merchant_category, "Cryptocurrency");
        assert!(features.location_mismatch);
        assert!(!features.foreign_transaction);
        assert_eq!(features.trust_score, None);
        assert_eq!(features.velocity_last_24h, 12);
        assert_eq!(features.cardholder_age, 35);
    }

    #[test]
    fn test_model_input() {
        let extractor = FeatureExtractor::new();
        let input = extractor.extract(&request()).to_model_input();

        assert_eq!(input.len(), extractor.feature_count());
        assert_eq!(input, vec![15_000.5, 3.0, 1.0, 0.0, 0.0, 12.0, 35.0]);
    }

    #[test]
    fn test_feature_count() {
        let extractor = FeatureExtractor::new();
        assert_eq!(extractor.feature_count(), 7);
        assert_eq!(extractor.feature_names().len(), 7);
    }
}
