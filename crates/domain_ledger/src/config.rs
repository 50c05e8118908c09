//! Ledger configuration

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Tunable invoice-lifecycle settings
///
/// `late_limit_days` is the grace period after the due date before an unpaid
/// invoice transitions from `Due` to `Late`. `default_due_date_days` feeds
/// [`LedgerConfig::default_due_date`] for invoices created without an
/// explicit due date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    #[serde(default = "default_late_limit_days")]
    pub late_limit_days: i64,
    #[serde(default = "default_due_date_days")]
    pub default_due_date_days: i64,
}

fn default_late_limit_days() -> i64 {
    7
}

fn default_due_date_days() -> i64 {
    14
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            late_limit_days: default_late_limit_days(),
            default_due_date_days: default_due_date_days(),
        }
    }
}

impl LedgerConfig {
    /// Default due date for a new invoice issued at `now`
    pub fn default_due_date(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now + Duration::days(self.default_due_date_days)
    }
}
