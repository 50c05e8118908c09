//! Core Kernel - Foundational types for the ledger system
//!
//! This crate provides the fundamental building blocks used across the
//! ledger domain:
//! - Strongly-typed, ordered identifiers assigned by the entry store
//! - Currency codes and precise decimal rounding helpers
//! - Date/day-count helpers for due dates and late-day calculations

pub mod identifiers;
pub mod money;
pub mod temporal;

pub use identifiers::{
    AccountId, AccountTypeId, ContractId, EntryId, EntryTypeId, InvoiceId, SourceFileId,
};
pub use money::{dec2, Currency};
pub use temporal::{days_between, floor_days_between, start_of_day_utc};
