//! Ledger domain errors

use core_kernel::{AccountId, AccountTypeId, EntryId, InvoiceId, SourceFileId};
use thiserror::Error;

/// Errors that can occur in the ledger domain
///
/// Validation errors are business-rule violations surfaced to the caller
/// before any write happens; the remaining variants are lookup and
/// referential-integrity failures from the entry store.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Business-rule violation
    #[error("Validation error: {0}")]
    Validation(String),

    /// Account not found
    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    /// Account type not found
    #[error("Account type not found: {0}")]
    AccountTypeNotFound(AccountTypeId),

    /// Account entry not found
    #[error("Account entry not found: {0}")]
    EntryNotFound(EntryId),

    /// Entry type not found (by id or code)
    #[error("Entry type not found: {0}")]
    EntryTypeNotFound(String),

    /// Invoice not found
    #[error("Invoice not found: {0}")]
    InvoiceNotFound(InvoiceId),

    /// Source file not found
    #[error("Source file not found: {0}")]
    SourceFileNotFound(SourceFileId),

    /// Archived entries are immutable
    #[error("Account entry {0} is archived and cannot be modified")]
    ArchivedEntry(EntryId),

    /// An entry is either invoice debt or a settlement of one, never both
    #[error("An account entry cannot have both source_invoice and settled_invoice set")]
    ConflictingInvoiceLinks,

    /// Deletion refused because other records still reference the target
    #[error("Cannot delete {entity}: still referenced by {reference}")]
    ProtectedReference { entity: String, reference: String },

    /// Unique code collision on account type or entry type registration
    #[error("Duplicate code: {0}")]
    DuplicateCode(String),
}

impl LedgerError {
    pub fn validation(message: impl Into<String>) -> Self {
        LedgerError::Validation(message.into())
    }

    pub fn protected(entity: impl Into<String>, reference: impl Into<String>) -> Self {
        LedgerError::ProtectedReference {
            entity: entity.into(),
            reference: reference.into(),
        }
    }
}
