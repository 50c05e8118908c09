//! Double-entry style bookkeeping core
//!
//! Accounts hold ordered entries; invoices group entries via source and
//! settlement links; settlements are broken down against invoice items in
//! payback priority order. All derived values (balances, invoice
//! aggregates, accrued interest) are pure functions of the entries, so
//! recomputation is always safe and idempotent.

pub mod account;
pub mod balance;
pub mod config;
pub mod contract;
pub mod entry;
pub mod error;
pub mod interest;
pub mod invoice;
pub mod settle;
pub mod store;

pub use account::{Account, AccountType, SourceFile};
pub use balance::{account_balance, account_balance_at, entry_running_balance, sum_amounts};
pub use config::LedgerConfig;
pub use contract::Contract;
pub use entry::{AccountEntry, EntryType, NewEntry, NewEntryType};
pub use error::LedgerError;
pub use interest::simple_interest;
pub use invoice::{CachedFields, Invoice, InvoiceState, InvoiceType, NewInvoice};
pub use settle::{
    settle_assigned_invoice, settle_credit_note, settle_invoice, validate_settlement_amount,
    ReconcileOptions, SettleOptions,
};
pub use store::{EntryQuery, EntryStore, MemoryLedger};
