//! Accounts and account types
//!
//! An account is a ledger bucket that collects entries; its balance is
//! always derived from the entries, never stored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{AccountId, AccountTypeId, Currency, SourceFileId};

use crate::entry::AccountEntry;
use crate::store::{EntryQuery, EntryStore};

/// Classification of an account as asset or liability
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountType {
    /// Unique identifier
    pub id: AccountTypeId,
    /// Short unique code (e.g. "RE")
    pub code: String,
    /// Human-readable name
    pub name: String,
    /// Asset accounts hold what is owed to us; liability, the reverse
    pub is_asset: bool,
    /// Creation timestamp
    pub created: DateTime<Utc>,
}

impl AccountType {
    pub fn is_liability(&self) -> bool {
        !self.is_asset
    }
}

/// A ledger account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// Unique identifier
    pub id: AccountId,
    /// Account type
    pub account_type: AccountTypeId,
    /// Account name (may be empty; the type name then serves as label)
    pub name: String,
    /// Currency of all entries on this account
    pub currency: Currency,
    /// Creation timestamp
    pub created: DateTime<Utc>,
}

impl Account {
    /// Returns true when `entry` is an unprocessed settlement on this
    /// account: settlement-typed, targeting an invoice, and without
    /// generated children yet.
    ///
    /// This is the caller-side guard against allocating the same settlement
    /// twice; the allocator itself does not deduplicate.
    pub fn needs_settling<S: EntryStore>(&self, store: &S, entry: &AccountEntry) -> bool {
        let is_settlement = entry
            .entry_type
            .and_then(|id| store.entry_type(id).ok())
            .map(|t| t.is_settlement)
            .unwrap_or(false);

        is_settlement
            && entry.account_id == self.id
            && entry.settled_invoice.is_some()
            && store.count_entries(&EntryQuery::new().parent(entry.id)) == 0
    }
}

/// Provenance record for entries created from some external event,
/// e.g. a payment file import
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceFile {
    /// Unique identifier
    pub id: SourceFileId,
    /// File or batch name
    pub name: String,
    /// Creation timestamp
    pub created: DateTime<Utc>,
}
