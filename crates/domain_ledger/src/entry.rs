//! Account entries and entry types
//!
//! An account entry is the atomic, append-only unit of the ledger: a single
//! signed monetary movement against an account. Entries are immutable once
//! archived, and balance queries assume no entry is edited after other
//! entries reference it via `parent` or `settled_item`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use core_kernel::{AccountId, EntryId, EntryTypeId, InvoiceId, SourceFileId};

use crate::error::LedgerError;

/// Classification of account entries
///
/// `payback_priority` orders invoice items during settlement allocation:
/// lower values are paid first. `is_settlement` marks types representing
/// incoming money that must be allocated; `is_payment` narrows those to true
/// payments as opposed to other settlement-like entries (e.g. credit note
/// reconciliations).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryType {
    /// Unique identifier
    pub id: EntryTypeId,
    /// Short unique code (e.g. "SE")
    pub code: String,
    /// Human-readable name
    pub name: String,
    /// Lower value is settled first
    pub payback_priority: i16,
    /// Entry represents an incoming settlement
    pub is_settlement: bool,
    /// Entry represents an actual payment
    pub is_payment: bool,
    /// Creation timestamp
    pub created: DateTime<Utc>,
}

/// Specification for registering an entry type
#[derive(Debug, Clone)]
pub struct NewEntryType {
    pub code: String,
    pub name: String,
    pub payback_priority: i16,
    pub is_settlement: bool,
    pub is_payment: bool,
}

impl NewEntryType {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            payback_priority: 0,
            is_settlement: false,
            is_payment: false,
        }
    }

    pub fn payback_priority(mut self, priority: i16) -> Self {
        self.payback_priority = priority;
        self
    }

    pub fn settlement(mut self) -> Self {
        self.is_settlement = true;
        self
    }

    pub fn payment(mut self) -> Self {
        self.is_settlement = true;
        self.is_payment = true;
        self
    }
}

/// Single mutation in account state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountEntry {
    /// Unique identifier, assigned in insertion order
    pub id: EntryId,
    /// Owning account
    pub account_id: AccountId,
    /// When the entry was recorded
    pub created: DateTime<Utc>,
    /// Effective date of the entry (distinct from `created`)
    pub timestamp: DateTime<Utc>,
    /// Entry type; only system/zero-amount entries may omit it
    pub entry_type: Option<EntryTypeId>,
    /// Free-form description
    pub description: String,
    /// Signed amount, two fractional digits. `None` means "not yet
    /// determined" and is never treated as zero.
    pub amount: Option<Decimal>,
    /// Provenance, e.g. a payment file import
    pub source_file: Option<SourceFileId>,
    /// Set when this entry is invoice-item debt
    pub source_invoice: Option<InvoiceId>,
    /// Set when this entry settles debt on some invoice
    pub settled_invoice: Option<InvoiceId>,
    /// The specific invoice-item entry this allocation offsets
    pub settled_item: Option<EntryId>,
    /// Entry this one was generated because of; deleting the parent
    /// cascade-deletes its children
    pub parent: Option<EntryId>,
    /// Once archived the entry is immutable
    pub archived: bool,
}

impl fmt::Display for AccountEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.amount {
            Some(amount) => write!(f, "[{}] {} {}", self.id, self.timestamp.date_naive(), amount),
            None => write!(f, "[{}] {} -", self.id, self.timestamp.date_naive()),
        }
    }
}

/// Specification for creating an account entry
///
/// The entry store assigns the id and `created` timestamp; the effective
/// `timestamp` defaults to creation time when not set.
#[derive(Debug, Clone)]
pub struct NewEntry {
    pub account_id: AccountId,
    pub timestamp: Option<DateTime<Utc>>,
    pub entry_type: Option<EntryTypeId>,
    pub description: String,
    pub amount: Option<Decimal>,
    pub source_file: Option<SourceFileId>,
    pub source_invoice: Option<InvoiceId>,
    pub settled_invoice: Option<InvoiceId>,
    pub settled_item: Option<EntryId>,
    pub parent: Option<EntryId>,
}

impl NewEntry {
    pub fn new(account_id: AccountId) -> Self {
        Self {
            account_id,
            timestamp: None,
            entry_type: None,
            description: String::new(),
            amount: None,
            source_file: None,
            source_invoice: None,
            settled_invoice: None,
            settled_item: None,
            parent: None,
        }
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn entry_type(mut self, entry_type: EntryTypeId) -> Self {
        self.entry_type = Some(entry_type);
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn amount(mut self, amount: Decimal) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn source_file(mut self, source_file: SourceFileId) -> Self {
        self.source_file = Some(source_file);
        self
    }

    pub fn source_invoice(mut self, invoice: InvoiceId) -> Self {
        self.source_invoice = Some(invoice);
        self
    }

    pub fn settled_invoice(mut self, invoice: InvoiceId) -> Self {
        self.settled_invoice = Some(invoice);
        self
    }

    pub fn settled_item(mut self, item: EntryId) -> Self {
        self.settled_item = Some(item);
        self
    }

    pub fn parent(mut self, parent: EntryId) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Checks field-level invariants that do not need store access
    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.source_invoice.is_some() && self.settled_invoice.is_some() {
            return Err(LedgerError::ConflictingInvoiceLinks);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_new_entry_type_builder() {
        let spec = NewEntryType::new("SE", "settlement").settlement();
        assert!(spec.is_settlement);
        assert!(!spec.is_payment);
        assert_eq!(spec.payback_priority, 0);

        let spec = NewEntryType::new("PM", "payment").payment();
        assert!(spec.is_settlement);
        assert!(spec.is_payment);
    }

    #[test]
    fn test_new_entry_invoice_links_are_exclusive() {
        let account = AccountId::new(1);
        let invoice = InvoiceId::new(1);

        let ok = NewEntry::new(account)
            .amount(dec!(10.00))
            .source_invoice(invoice);
        assert!(ok.validate().is_ok());

        let bad = NewEntry::new(account)
            .amount(dec!(10.00))
            .source_invoice(invoice)
            .settled_invoice(invoice);
        assert!(matches!(
            bad.validate(),
            Err(LedgerError::ConflictingInvoiceLinks)
        ));
    }
}
