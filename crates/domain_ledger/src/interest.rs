//! Simple interest accrual over an entry timeline
//!
//! Interest accrues on the running balance between consecutive entry
//! dates and never compounds. The daily rate is `rate_pct / 36500`, the
//! banking convention for an annual percentage over a 365-day year.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::entry::AccountEntry;

/// Accrued simple interest of an entry timeline up to `as_of`
///
/// `entries` must be ordered by ascending timestamp; each entry's amount
/// adjusts the balance from its date onward. The timeline is extended by
/// a zero-amount terminator at `as_of` when it ends earlier, so the final
/// balance keeps accruing to the end date. `begin` clips the accrual
/// window from the left. Entries with an undetermined amount advance the
/// clock without changing the balance. Returns `0.00` for an empty
/// timeline.
pub fn simple_interest(
    entries: &[AccountEntry],
    rate_pct: Decimal,
    as_of: NaiveDate,
    begin: Option<NaiveDate>,
) -> Decimal {
    let daily_rate = rate_pct / Decimal::from(36_500);
    let mut accrued = Decimal::new(0, 2);

    let mut timeline: Vec<(NaiveDate, Option<Decimal>)> = entries
        .iter()
        .map(|e| (e.timestamp.date_naive(), e.amount))
        .collect();
    if timeline.is_empty() {
        return accrued;
    }
    if timeline[timeline.len() - 1].0 < as_of {
        timeline.push((as_of, Some(Decimal::ZERO)));
    }
    let (first_date, first_amount) = timeline[0];
    let mut balance = first_amount.unwrap_or(Decimal::ZERO);
    let mut cur_date = first_date;
    if let Some(begin) = begin {
        if begin > cur_date {
            cur_date = begin;
        }
    }

    for &(date, amount) in &timeline[1..] {
        let mut next_date = date;
        if let Some(begin) = begin {
            if begin > next_date {
                next_date = begin;
            }
        }
        let done = next_date > as_of;
        if done {
            next_date = as_of;
        }
        let days = (next_date - cur_date).num_days();
        if days > 0 {
            accrued += balance * daily_rate * Decimal::from(days);
            cur_date = next_date;
        }
        if let Some(amount) = amount {
            balance += amount;
        }
        if done {
            break;
        }
    }
    accrued
}
