//! Property-Based Test Generators
//!
//! Provides proptest strategies and fake-data helpers for generating
//! random ledger data that maintains domain invariants.

use chrono::{DateTime, TimeZone, Utc};
use fake::faker::lorem::en::Sentence;
use fake::Fake;
use proptest::prelude::*;
use rust_decimal::Decimal;

/// Strategy for positive cent amounts up to one million
pub fn positive_amount_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..100_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy for cent amounts of either sign
pub fn amount_strategy() -> impl Strategy<Value = Decimal> {
    (-100_000_000i64..100_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy for a small set of invoice components (amounts in cents)
pub fn invoice_components_strategy() -> impl Strategy<Value = Vec<Decimal>> {
    prop::collection::vec(positive_amount_strategy(), 1..6)
}

/// Strategy for timestamps within the year 2018
pub fn timestamp_strategy() -> impl Strategy<Value = DateTime<Utc>> {
    (0i64..365 * 24 * 3600).prop_map(|offset| {
        Utc.with_ymd_and_hms(2018, 1, 1, 0, 0, 0).unwrap() + chrono::Duration::seconds(offset)
    })
}

/// A random entry description
pub fn random_description() -> String {
    Sentence(3..8).fake()
}
