//! Transaction synthesis.
//!
//! Each call decides whether the event is fraudulent, picks the parameter
//! policy for that path and assembles a [`TransactionRecord`] from it. The
//! random source is always passed in, so a seeded generator reproduces a run
//! exactly.

use crate::catalog::{FraudStrategy, Merchant, StrategyCatalog, ACCOUNT_PREFIX, CURRENCY};
use crate::types::transaction::{TransactionRecord, TransactionType};
use chrono::{Local, NaiveDate, NaiveTime};
use rand::Rng;
use thiserror::Error;
use uuid::{Builder, Uuid};

#[derive(Debug, Error, PartialEq)]
pub enum SynthesizerError {
    #[error("fraud rate must be within [0, 1], got {0}")]
    InvalidFraudRate(f64),
}

/// Which merchant catalogue a path draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MerchantPool {
    Normal,
    Fraud,
}

/// Which location list a path draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationPool {
    Domestic,
    Foreign,
    /// Union of the domestic and foreign lists.
    Any,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardPresence {
    Present,
    NotPresent,
    /// Fair coin per record.
    Either,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HourWindow {
    /// Inclusive range of hours.
    Between(u32, u32),
    /// Discrete set of hours, chosen uniformly.
    OneOf(&'static [u32]),
}

impl HourWindow {
    pub fn contains(&self, hour: u32) -> bool {
        match *self {
            HourWindow::Between(lo, hi) => (lo..=hi).contains(&hour),
            HourWindow::OneOf(hours) => hours.contains(&hour),
        }
    }
}

/// Joint distribution of the attributes that depend on the fraud path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterPolicy {
    pub merchants: MerchantPool,
    /// Inclusive amount bounds before rounding.
    pub amount: (f64, f64),
    pub locations: LocationPool,
    pub card: CardPresence,
    pub hours: HourWindow,
}

impl ParameterPolicy {
    pub const ORDINARY: ParameterPolicy = ParameterPolicy {
        merchants: MerchantPool::Normal,
        amount: (5.0, 2_500.0),
        locations: LocationPool::Domestic,
        card: CardPresence::Present,
        hours: HourWindow::Between(7, 21),
    };

    pub const fn for_strategy(strategy: FraudStrategy) -> ParameterPolicy {
        match strategy {
            FraudStrategy::HighAmountForeignMerchant => ParameterPolicy {
                merchants: MerchantPool::Fraud,
                amount: (5_000.0, 50_000.0),
                locations: LocationPool::Foreign,
                card: CardPresence::NotPresent,
                hours: HourWindow::Between(0, 23),
            },
            FraudStrategy::CardNotPresentHighValue => ParameterPolicy {
                merchants: MerchantPool::Fraud,
                amount: (8_000.0, 30_000.0),
                locations: LocationPool::Foreign,
                card: CardPresence::NotPresent,
                hours: HourWindow::Between(1, 4),
            },
            FraudStrategy::OddHoursLargeAmount => ParameterPolicy {
                merchants: MerchantPool::Normal,
                amount: (3_000.0, 20_000.0),
                locations: LocationPool::Domestic,
                card: CardPresence::Present,
                hours: HourWindow::OneOf(&[1, 2, 3, 4]),
            },
            FraudStrategy::UnusualMerchantCategory => ParameterPolicy {
                merchants: MerchantPool::Fraud,
                amount: (500.0, 15_000.0),
                locations: LocationPool::Any,
                card: CardPresence::Either,
                hours: HourWindow::Between(0, 23),
            },
            FraudStrategy::RapidSmallTransactions => ParameterPolicy {
                merchants: MerchantPool::Normal,
                amount: (1.0, 49.0),
                locations: LocationPool::Domestic,
                card: CardPresence::NotPresent,
                hours: HourWindow::Between(0, 23),
            },
        }
    }
}

/// Outcome of the fraud draw for one synthesis call. Never serialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FraudDecision {
    Legitimate,
    Fraudulent(FraudStrategy),
}

impl FraudDecision {
    pub fn is_fraudulent(&self) -> bool {
        matches!(self, FraudDecision::Fraudulent(_))
    }

    pub fn strategy(&self) -> Option<FraudStrategy> {
        match self {
            FraudDecision::Legitimate => None,
            FraudDecision::Fraudulent(strategy) => Some(*strategy),
        }
    }

    pub fn policy(&self) -> ParameterPolicy {
        match self {
            FraudDecision::Legitimate => ParameterPolicy::ORDINARY,
            FraudDecision::Fraudulent(strategy) => ParameterPolicy::for_strategy(*strategy),
        }
    }
}

/// A record together with the ground truth that produced it.
#[derive(Debug, Clone)]
pub struct LabelledTransaction {
    pub record: TransactionRecord,
    pub decision: FraudDecision,
}

/// Produces transaction records from the static catalogue.
#[derive(Debug, Clone)]
pub struct TransactionSynthesizer {
    catalog: StrategyCatalog,
    fraud_rate: f64,
}

impl TransactionSynthesizer {
    pub const DEFAULT_FRAUD_RATE: f64 = 0.20;

    /// Debit weight out of 100; the remainder are credits.
    const DEBIT_WEIGHT: u32 = 75;

    pub fn new(catalog: StrategyCatalog) -> Self {
        Self {
            catalog,
            fraud_rate: Self::DEFAULT_FRAUD_RATE,
        }
    }

    pub fn with_fraud_rate(catalog: StrategyCatalog, fraud_rate: f64) -> Result<Self, SynthesizerError> {
        if !(0.0..=1.0).contains(&fraud_rate) {
            return Err(SynthesizerError::InvalidFraudRate(fraud_rate));
        }
        Ok(Self { catalog, fraud_rate })
    }

    pub fn fraud_rate(&self) -> f64 {
        self.fraud_rate
    }

    pub fn catalog(&self) -> &StrategyCatalog {
        &self.catalog
    }

    /// Bernoulli fraud draw followed by a uniform strategy pick.
    pub fn decide<R: Rng + ?Sized>(&self, rng: &mut R) -> FraudDecision {
        if rng.gen_bool(self.fraud_rate) {
            FraudDecision::Fraudulent(pick(rng, &FraudStrategy::ALL))
        } else {
            FraudDecision::Legitimate
        }
    }

    /// Synthesize one record dated today.
    pub fn synthesize<R: Rng + ?Sized>(&self, rng: &mut R) -> TransactionRecord {
        self.synthesize_on(rng, Local::now().date_naive())
    }

    pub fn synthesize_on<R: Rng + ?Sized>(&self, rng: &mut R, date: NaiveDate) -> TransactionRecord {
        self.synthesize_labelled(rng, date).record
    }

    pub fn synthesize_labelled<R: Rng + ?Sized>(&self, rng: &mut R, date: NaiveDate) -> LabelledTransaction {
        let decision = self.decide(rng);
        LabelledTransaction {
            record: self.synthesize_for(decision, rng, date),
            decision,
        }
    }

    /// Build a record along a fixed fraud path.
    pub fn synthesize_for<R: Rng + ?Sized>(
        &self,
        decision: FraudDecision,
        rng: &mut R,
        date: NaiveDate,
    ) -> TransactionRecord {
        let policy = decision.policy();

        let account_number = format!(
            "{ACCOUNT_PREFIX}{}",
            rng.gen_range(1_000_000_000u64..=9_999_999_999)
        );
        let card_last4 = rng.gen_range(1000u32..=9999).to_string();

        let (merchant_name, merchant_category) = pick(rng, self.merchants(policy.merchants));
        let amount = round_cents(rng.gen_range(policy.amount.0..=policy.amount.1));
        let merchant_location = self.location(rng, policy.locations);
        let card_present = match policy.card {
            CardPresence::Present => true,
            CardPresence::NotPresent => false,
            CardPresence::Either => rng.gen_bool(0.5),
        };

        let hour = match policy.hours {
            HourWindow::Between(lo, hi) => rng.gen_range(lo..=hi),
            HourWindow::OneOf(hours) => pick(rng, hours),
        };
        let time = NaiveTime::from_hms_opt(hour, rng.gen_range(0..=59), rng.gen_range(0..=59))
            .expect("hour, minute and second are drawn from valid ranges");

        let transaction_id = random_uuid(rng);

        // Independent of the fraud path.
        let transaction_type = if rng.gen_ratio(Self::DEBIT_WEIGHT, 100) {
            TransactionType::Debit
        } else {
            TransactionType::Credit
        };

        let (ip_address, device_fingerprint) = if card_present {
            (None, None)
        } else {
            (Some(random_ipv4(rng)), Some(random_uuid(rng)))
        };

        TransactionRecord {
            transaction_id,
            timestamp: date.and_time(time),
            account_number,
            card_last4,
            amount,
            currency: CURRENCY.to_string(),
            transaction_type,
            merchant_name: merchant_name.to_string(),
            merchant_category: merchant_category.to_string(),
            merchant_location: merchant_location.to_string(),
            card_present,
            ip_address,
            device_fingerprint,
        }
    }

    fn merchants(&self, pool: MerchantPool) -> &'static [Merchant] {
        match pool {
            MerchantPool::Normal => self.catalog.normal_merchants(),
            MerchantPool::Fraud => self.catalog.fraud_merchants(),
        }
    }

    fn location<R: Rng + ?Sized>(&self, rng: &mut R, pool: LocationPool) -> &'static str {
        let domestic = self.catalog.domestic_locations();
        let foreign = self.catalog.foreign_locations();

        match pool {
            LocationPool::Domestic => pick(rng, domestic),
            LocationPool::Foreign => pick(rng, foreign),
            LocationPool::Any => {
                let index = rng.gen_range(0..domestic.len() + foreign.len());
                domestic
                    .get(index)
                    .copied()
                    .unwrap_or_else(|| foreign[index - domestic.len()])
            }
        }
    }
}

impl Default for TransactionSynthesizer {
    fn default() -> Self {
        Self::new(StrategyCatalog::new())
    }
}

/// Uniform pick from a non-empty slice.
fn pick<R: Rng + ?Sized, T: Copy>(rng: &mut R, items: &[T]) -> T {
    items[rng.gen_range(0..items.len())]
}

fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// IPv4-shaped address; first and last octet avoid the 0/255 edges.
fn random_ipv4<R: Rng + ?Sized>(rng: &mut R) -> String {
    format!(
        "{}.{}.{}.{}",
        rng.gen_range(1..=255u8),
        rng.gen_range(0..=255u8),
        rng.gen_range(0..=255u8),
        rng.gen_range(1..=254u8)
    )
}

/// Version 4 UUID drawn from the injected generator.
fn random_uuid<R: Rng + ?Sized>(rng: &mut R) -> Uuid {
    let mut bytes = [0u8; 16];
    rng.fill(&mut bytes);
    Builder::from_random_bytes(bytes).into_uuid()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashMap;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
    }

    fn decimals(amount: f64) -> usize {
        amount
            .to_string()
            .split_once('.')
            .map(|(_, fraction)| fraction.len())
            .unwrap_or(0)
    }

    fn synthesizer() -> TransactionSynthesizer {
        TransactionSynthesizer::default()
    }

    #[test]
    fn test_card_channel_invariant_holds_for_all_records() {
        let synth = synthesizer();
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..10_000 {
            let record = synth.synthesize_on(&mut rng, date());
            assert!(record.channel_is_consistent(), "{record:?}");
        }
    }

    #[test]
    fn test_channel_invariant_holds_on_every_path() {
        let synth = synthesizer();
        let mut rng = StdRng::seed_from_u64(8);
        let paths = std::iter::once(FraudDecision::Legitimate)
            .chain(FraudStrategy::ALL.into_iter().map(FraudDecision::Fraudulent));

        for decision in paths {
            for _ in 0..2_000 {
                let record = synth.synthesize_for(decision, &mut rng, date());
                assert!(record.channel_is_consistent(), "{decision:?}: {record:?}");
            }
        }
    }

    #[test]
    fn test_amount_is_positive_with_two_decimals() {
        let synth = synthesizer();
        let mut rng = StdRng::seed_from_u64(11);

        for _ in 0..10_000 {
            let record = synth.synthesize_on(&mut rng, date());
            assert!(record.amount > 0.0);
            assert!(decimals(record.amount) <= 2, "amount {}", record.amount);
        }
    }

    #[test]
    fn test_fraud_and_debit_rates_converge_independently() {
        let synth = synthesizer();
        let mut rng = StdRng::seed_from_u64(2026);
        let draws = 100_000;

        let mut fraud = 0usize;
        let mut debit = 0usize;
        let mut fraud_debit = 0usize;

        for _ in 0..draws {
            let labelled = synth.synthesize_labelled(&mut rng, date());
            let is_debit = labelled.record.transaction_type == TransactionType::Debit;

            if labelled.decision.is_fraudulent() {
                fraud += 1;
                if is_debit {
                    fraud_debit += 1;
                }
            }
            if is_debit {
                debit += 1;
            }
        }

        let fraud_rate = fraud as f64 / draws as f64;
        let debit_rate = debit as f64 / draws as f64;
        let debit_given_fraud = fraud_debit as f64 / fraud as f64;

        assert!((fraud_rate - 0.20).abs() < 0.01, "fraud rate {fraud_rate}");
        assert!((debit_rate - 0.75).abs() < 0.01, "debit rate {debit_rate}");
        assert!(
            (debit_given_fraud - 0.75).abs() < 0.02,
            "debit rate among fraud {debit_given_fraud}"
        );
    }

    #[test]
    fn test_strategies_are_drawn_uniformly() {
        let synth = synthesizer();
        let mut rng = StdRng::seed_from_u64(5);
        let mut counts: HashMap<FraudStrategy, usize> = HashMap::new();

        for _ in 0..100_000 {
            if let Some(strategy) = synth.decide(&mut rng).strategy() {
                *counts.entry(strategy).or_default() += 1;
            }
        }

        let total: usize = counts.values().sum();
        assert_eq!(counts.len(), 5);
        for (strategy, count) in counts {
            let share = count as f64 / total as f64;
            assert!((share - 0.2).abs() < 0.02, "{strategy}: {share}");
        }
    }

    #[test]
    fn test_ordinary_path_matches_policy() {
        let synth = synthesizer();
        let catalog = synth.catalog();
        let mut rng = StdRng::seed_from_u64(1);

        for _ in 0..2_000 {
            let record = synth.synthesize_for(FraudDecision::Legitimate, &mut rng, date());
            assert!(record.card_present);
            assert!(catalog.is_normal_merchant(&record.merchant_name, &record.merchant_category));
            assert!(catalog.is_domestic(&record.merchant_location));
            assert!((5.0..=2_500.0).contains(&record.amount));
            assert!((7..=21).contains(&record.timestamp.hour()));
        }
    }

    #[test]
    fn test_odd_hours_large_amount_stays_in_window() {
        let synth = synthesizer();
        let mut rng = StdRng::seed_from_u64(2);
        let decision = FraudDecision::Fraudulent(FraudStrategy::OddHoursLargeAmount);

        for _ in 0..2_000 {
            let record = synth.synthesize_for(decision, &mut rng, date());
            assert!([1, 2, 3, 4].contains(&record.timestamp.hour()));
            assert!((3_000.0..=20_000.0).contains(&record.amount));
            assert!(record.card_present);
        }
    }

    #[test]
    fn test_card_not_present_high_value_policy() {
        let synth = synthesizer();
        let catalog = synth.catalog();
        let mut rng = StdRng::seed_from_u64(3);
        let decision = FraudDecision::Fraudulent(FraudStrategy::CardNotPresentHighValue);

        for _ in 0..2_000 {
            let record = synth.synthesize_for(decision, &mut rng, date());
            assert!(!record.card_present);
            assert!((1..=4).contains(&record.timestamp.hour()));
            assert!((8_000.0..=30_000.0).contains(&record.amount));
            assert!(catalog.is_fraud_merchant(&record.merchant_name, &record.merchant_category));
            assert!(catalog.is_foreign(&record.merchant_location));
        }
    }

    #[test]
    fn test_rapid_small_transactions_look_ordinary_except_channel() {
        let synth = synthesizer();
        let catalog = synth.catalog();
        let mut rng = StdRng::seed_from_u64(4);
        let decision = FraudDecision::Fraudulent(FraudStrategy::RapidSmallTransactions);

        let ordinary = ParameterPolicy::ORDINARY;
        let policy = ParameterPolicy::for_strategy(FraudStrategy::RapidSmallTransactions);
        assert_eq!(policy.merchants, ordinary.merchants);
        assert_eq!(policy.locations, ordinary.locations);
        assert_ne!(policy.card, ordinary.card);

        let draws = 2_000;
        let mut ordinary_amounts = 0;
        for _ in 0..draws {
            let record = synth.synthesize_for(decision, &mut rng, date());
            assert!((1.0..=49.0).contains(&record.amount));
            assert!(!record.card_present);
            // Not distinguishable by merchant or location alone.
            assert!(catalog.is_normal_merchant(&record.merchant_name, &record.merchant_category));
            assert!(catalog.is_domestic(&record.merchant_location));
            if (ordinary.amount.0..=ordinary.amount.1).contains(&record.amount) {
                ordinary_amounts += 1;
            }
        }

        // Most amounts in [5, 49] also occur on the ordinary path.
        let share = ordinary_amounts as f64 / draws as f64;
        assert!(share > 0.85, "share inside ordinary range {share}");
        assert!(ordinary_amounts < draws);
    }

    #[test]
    fn test_high_amount_foreign_merchant_policy() {
        let synth = synthesizer();
        let catalog = synth.catalog();
        let mut rng = StdRng::seed_from_u64(5);
        let decision = FraudDecision::Fraudulent(FraudStrategy::HighAmountForeignMerchant);

        for _ in 0..2_000 {
            let record = synth.synthesize_for(decision, &mut rng, date());
            assert!(catalog.is_fraud_merchant(&record.merchant_name, &record.merchant_category));
            assert!(catalog.is_foreign(&record.merchant_location));
            assert!((5_000.0..=50_000.0).contains(&record.amount));
            assert!(!record.card_present);
            assert!(record.ip_address.is_some());
            assert!(record.device_fingerprint.is_some());
        }
    }

    #[test]
    fn test_unusual_merchant_category_mixes_channels_and_locations() {
        let synth = synthesizer();
        let catalog = synth.catalog();
        let mut rng = StdRng::seed_from_u64(6);
        let decision = FraudDecision::Fraudulent(FraudStrategy::UnusualMerchantCategory);

        let mut present = 0;
        let mut domestic = 0;
        let draws = 2_000;
        for _ in 0..draws {
            let record = synth.synthesize_for(decision, &mut rng, date());
            assert!(catalog.is_fraud_merchant(&record.merchant_name, &record.merchant_category));
            assert!((500.0..=15_000.0).contains(&record.amount));
            if record.card_present {
                present += 1;
            }
            if catalog.is_domestic(&record.merchant_location) {
                domestic += 1;
            } else {
                assert!(catalog.is_foreign(&record.merchant_location));
            }
        }

        assert!(present > 0 && present < draws);
        assert!(domestic > 0 && domestic < draws);
    }

    #[test]
    fn test_seed_producing_high_amount_foreign_merchant() {
        let synth = synthesizer();
        let catalog = synth.catalog();
        let target = FraudDecision::Fraudulent(FraudStrategy::HighAmountForeignMerchant);

        let seed = (0u64..10_000)
            .find(|&seed| synth.decide(&mut StdRng::seed_from_u64(seed)) == target)
            .expect("some seed selects the strategy");

        let labelled = synth.synthesize_labelled(&mut StdRng::seed_from_u64(seed), date());
        let record = labelled.record;

        assert_eq!(labelled.decision, target);
        assert!(catalog.is_fraud_merchant(&record.merchant_name, &record.merchant_category));
        assert!(catalog.is_foreign(&record.merchant_location));
        assert!((5_000.0..=50_000.0).contains(&record.amount));
        assert!(!record.card_present);
        assert!(record.ip_address.is_some());
        assert!(record.device_fingerprint.is_some());
    }

    #[test]
    fn test_seeded_runs_are_reproducible() {
        let synth = synthesizer();

        let first = synth.synthesize_on(&mut StdRng::seed_from_u64(99), date());
        let second = synth.synthesize_on(&mut StdRng::seed_from_u64(99), date());

        assert_eq!(first, second);
    }

    #[test]
    fn test_record_shape() {
        let synth = synthesizer();
        let mut rng = StdRng::seed_from_u64(12);

        for _ in 0..1_000 {
            let record = synth.synthesize_on(&mut rng, date());
            assert_eq!(record.timestamp.date(), date());
            assert_eq!(record.timestamp.nanosecond(), 0);
            assert_eq!(record.currency, "ZAR");
            assert_eq!(record.card_last4.len(), 4);
            assert!(record.account_number.starts_with("CAPITEC"));
            assert_eq!(record.account_number.len(), "CAPITEC".len() + 10);
            assert_eq!(record.transaction_id.get_version_num(), 4);

            if let Some(ip) = &record.ip_address {
                let octets: Vec<u16> = ip.split('.').map(|o| o.parse().unwrap()).collect();
                assert_eq!(octets.len(), 4);
                assert!(octets[0] >= 1 && octets[0] <= 255);
                assert!(octets[1] <= 255 && octets[2] <= 255);
                assert!(octets[3] >= 1 && octets[3] <= 254);
            }
        }
    }

    #[test]
    fn test_round_trip_through_json() {
        let synth = synthesizer();
        let mut rng = StdRng::seed_from_u64(13);

        for _ in 0..200 {
            let record = synth.synthesize_on(&mut rng, date());
            let json = serde_json::to_vec(&record).unwrap();
            let parsed: TransactionRecord = serde_json::from_slice(&json).unwrap();
            assert_eq!(record, parsed);
        }
    }

    #[test]
    fn test_fraud_rate_validation() {
        let catalog = StrategyCatalog::new();

        assert_eq!(
            TransactionSynthesizer::with_fraud_rate(catalog, 1.5).unwrap_err(),
            SynthesizerError::InvalidFraudRate(1.5)
        );
        assert!(TransactionSynthesizer::with_fraud_rate(catalog, f64::NAN).is_err());

        let never = TransactionSynthesizer::with_fraud_rate(catalog, 0.0).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        assert!((0..1_000).all(|_| !never.decide(&mut rng).is_fraudulent()));
    }

    #[test]
    fn test_hour_window_contains() {
        assert!(HourWindow::Between(7, 21).contains(7));
        assert!(!HourWindow::Between(7, 21).contains(22));
        assert!(HourWindow::OneOf(&[1, 2, 3, 4]).contains(3));
        assert!(!HourWindow::OneOf(&[1, 2, 3, 4]).contains(0));
    }
}
