//! Static reference data for the transaction synthesizer.
//!
//! Merchant catalogues, location lists and the enumerated fraud strategies.
//! Everything here is `'static` and never mutated.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A merchant as a `(name, category)` pair.
pub type Merchant = (&'static str, &'static str);

/// Everyday, low-risk merchants.
pub const NORMAL_MERCHANTS: &[Merchant] = &[
    ("Shoprite", "Grocery"),
    ("Checkers", "Grocery"),
    ("Pick n Pay", "Grocery"),
    ("Woolworths Food", "Grocery"),
    ("SPAR", "Grocery"),
    ("Engen Garage", "Fuel"),
    ("Shell Ultra City", "Fuel"),
    ("BP Express", "Fuel"),
    ("Clicks", "Pharmacy"),
    ("Dischem", "Pharmacy"),
    ("KFC South Africa", "Fast Food"),
    ("Steers", "Fast Food"),
    ("Nando's", "Restaurant"),
    ("McDonald's SA", "Fast Food"),
    ("Debonairs Pizza", "Fast Food"),
    ("Capitec ATM", "ATM Withdrawal"),
    ("Vodacom", "Airtime/Data"),
    ("MTN", "Airtime/Data"),
    ("Netflix", "Streaming"),
    ("DSTV", "Streaming"),
    ("Uber SA", "Transport"),
    ("Mr Price", "Clothing"),
    ("Edgars", "Clothing"),
    ("Game", "Electronics"),
    ("Incredible Connection", "Electronics"),
];

/// High-risk merchants associated with fraud.
pub const FRAUD_MERCHANTS: &[Merchant] = &[
    ("Crypto Exchange XYZ", "Cryptocurrency"),
    ("Online Casino SA", "Gambling"),
    ("Bitcoin ATM", "Cryptocurrency"),
    ("Offshore Gaming Ltd", "Gambling"),
    ("Unknown Vendor 0x9F", "Unknown"),
    ("International Wire Co.", "Wire Transfer"),
    ("Luxury Goods Dubai", "Luxury"),
    ("Foreign Exchange Fast", "Forex"),
    ("Dark Web Market", "Unknown"),
    ("Rapid Transfer Ltd", "Wire Transfer"),
];

pub const DOMESTIC_LOCATIONS: &[&str] = &[
    "Cape Town, ZA",
    "Johannesburg, ZA",
    "Durban, ZA",
    "Pretoria, ZA",
    "Port Elizabeth, ZA",
    "Bloemfontein, ZA",
    "East London, ZA",
    "Polokwane, ZA",
];

pub const FOREIGN_LOCATIONS: &[&str] = &[
    "Lagos, NG",
    "Nairobi, KE",
    "Dubai, AE",
    "London, GB",
    "New York, US",
    "Moscow, RU",
    "Beijing, CN",
    "Amsterdam, NL",
];

/// Currency stamped on every synthesized record.
pub const CURRENCY: &str = "ZAR";

/// Prefix of synthetic account numbers.
pub const ACCOUNT_PREFIX: &str = "CAPITEC";

/// Named fraud patterns. Each one fixes the joint distribution of a
/// fraudulent transaction's attributes (see [`crate::synthesizer::ParameterPolicy`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FraudStrategy {
    /// Large amount at a suspicious merchant in a foreign country.
    HighAmountForeignMerchant,
    /// High-value card-not-present purchase in the early hours.
    CardNotPresentHighValue,
    /// Large debit at an ordinary merchant between 01:00 and 04:00.
    OddHoursLargeAmount,
    /// Crypto, gambling or wire-transfer merchant regardless of amount.
    UnusualMerchantCategory,
    /// Small card-not-present debits probing account validity.
    RapidSmallTransactions,
}

impl FraudStrategy {
    pub const ALL: [FraudStrategy; 5] = [
        FraudStrategy::HighAmountForeignMerchant,
        FraudStrategy::CardNotPresentHighValue,
        FraudStrategy::OddHoursLargeAmount,
        FraudStrategy::UnusualMerchantCategory,
        FraudStrategy::RapidSmallTransactions,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FraudStrategy::HighAmountForeignMerchant => "high_amount_foreign_merchant",
            FraudStrategy::CardNotPresentHighValue => "card_not_present_high_value",
            FraudStrategy::OddHoursLargeAmount => "odd_hours_large_amount",
            FraudStrategy::UnusualMerchantCategory => "unusual_merchant_category",
            FraudStrategy::RapidSmallTransactions => "rapid_small_transactions",
        }
    }
}

impl fmt::Display for FraudStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read-only view over the reference data, handed to the synthesizer.
/// Only built from the non-empty constant lists above.
#[derive(Debug, Clone, Copy)]
pub struct StrategyCatalog {
    normal_merchants: &'static [Merchant],
    fraud_merchants: &'static [Merchant],
    domestic_locations: &'static [&'static str],
    foreign_locations: &'static [&'static str],
}

impl StrategyCatalog {
    pub const fn new() -> Self {
        Self {
            normal_merchants: NORMAL_MERCHANTS,
            fraud_merchants: FRAUD_MERCHANTS,
            domestic_locations: DOMESTIC_LOCATIONS,
            foreign_locations: FOREIGN_LOCATIONS,
        }
    }

    pub fn normal_merchants(&self) -> &'static [Merchant] {
        self.normal_merchants
    }

    pub fn fraud_merchants(&self) -> &'static [Merchant] {
        self.fraud_merchants
    }

    pub fn domestic_locations(&self) -> &'static [&'static str] {
        self.domestic_locations
    }

    pub fn foreign_locations(&self) -> &'static [&'static str] {
        self.foreign_locations
    }

    pub fn is_normal_merchant(&self, name: &str, category: &str) -> bool {
        self.normal_merchants
            .iter()
            .any(|&(n, c)| n == name && c == category)
    }

    pub fn is_fraud_merchant(&self, name: &str, category: &str) -> bool {
        self.fraud_merchants
            .iter()
            .any(|&(n, c)| n == name && c == category)
    }

    pub fn is_domestic(&self, location: &str) -> bool {
        self.domestic_locations.contains(&location)
    }

    pub fn is_foreign(&self, location: &str) -> bool {
        self.foreign_locations.contains(&location)
    }
}

impl Default for StrategyCatalog {
    fn default() -> Self {
        Self::new()
    }
}
