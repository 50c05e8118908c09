//! Balance calculation
//!
//! Balances are always derived by summing entry amounts under a filter,
//! never stored. Summation follows SQL `SUM` semantics: null amounts are
//! skipped, and a sum over no non-null amounts yields the caller's default.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use core_kernel::AccountId;

use crate::entry::AccountEntry;
use crate::store::{EntryQuery, EntryStore};

/// Sums entry amounts, returning `default` when no entry carries an amount
pub fn sum_amounts<'a, I>(entries: I, default: Decimal) -> Decimal
where
    I: IntoIterator<Item = &'a AccountEntry>,
{
    let mut total: Option<Decimal> = None;
    for entry in entries {
        if let Some(amount) = entry.amount {
            total = Some(total.unwrap_or(Decimal::ZERO) + amount);
        }
    }
    total.unwrap_or(default)
}

/// Current balance of an account: sum of all its entries
pub fn account_balance<S: EntryStore>(store: &S, account: AccountId) -> Decimal {
    let entries = store.entries(&EntryQuery::new().account(account));
    sum_amounts(&entries, Decimal::ZERO)
}

/// Account balance before `t`, excluding entries exactly at `t`
pub fn account_balance_at<S: EntryStore>(
    store: &S,
    account: AccountId,
    t: DateTime<Utc>,
) -> Decimal {
    let entries = store.entries(&EntryQuery::new().account(account).timestamp_before(t));
    sum_amounts(&entries, Decimal::ZERO)
}

/// Account balance right after `entry`
///
/// Includes every entry with an earlier timestamp, and same-timestamp
/// entries inserted no later than `entry` itself (id tie-break), so that
/// running balances are deterministic even for simultaneous entries.
pub fn entry_running_balance<S: EntryStore>(store: &S, entry: &AccountEntry) -> Decimal {
    let entries = store.entries(
        &EntryQuery::new()
            .account(entry.account_id)
            .timestamp_at_or_before(entry.timestamp),
    );
    let visible = entries
        .iter()
        .filter(|e| !(e.timestamp == entry.timestamp && e.id > entry.id));
    sum_amounts(visible, Decimal::ZERO)
}
