//! Ledger persistence boundary
//!
//! [`EntryStore`] is the read model the pure computations (balances,
//! invoice aggregates, settlement planning) are written against.
//! [`MemoryLedger`] is the reference implementation: id-ordered arenas with
//! store-assigned sequential ids, plus the mutation surface (creation,
//! archival, deletion with referential protection rules).

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::debug;

use core_kernel::{
    dec2, AccountId, AccountTypeId, ContractId, Currency, EntryId, EntryTypeId, InvoiceId,
    SourceFileId,
};

use crate::account::{Account, AccountType, SourceFile};
use crate::balance::{account_balance, account_balance_at};
use crate::config::LedgerConfig;
use crate::contract::Contract;
use crate::entry::{AccountEntry, EntryType, NewEntry, NewEntryType};
use crate::error::LedgerError;
use crate::invoice::{CachedFields, Invoice, NewInvoice};

/// Criteria for selecting account entries
///
/// All set criteria must match. An unset criterion matches everything, so
/// `EntryQuery::new()` selects every entry in the store.
#[derive(Debug, Clone, Default)]
pub struct EntryQuery {
    pub account: Option<AccountId>,
    pub entry_type: Option<EntryTypeId>,
    pub source_invoice: Option<InvoiceId>,
    pub settled_invoice: Option<InvoiceId>,
    pub settled_item: Option<EntryId>,
    pub parent: Option<EntryId>,
    /// Matches entries strictly before the instant
    pub timestamp_before: Option<DateTime<Utc>>,
    /// Matches entries at or before the instant
    pub timestamp_at_or_before: Option<DateTime<Utc>>,
    pub archived: Option<bool>,
    /// Matches entries whose source or settled invoice is the given one
    pub related_invoice: Option<InvoiceId>,
}

impl EntryQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn account(mut self, account: AccountId) -> Self {
        self.account = Some(account);
        self
    }

    pub fn entry_type(mut self, entry_type: EntryTypeId) -> Self {
        self.entry_type = Some(entry_type);
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

    pub fn timestamp_before(mut self, t: DateTime<Utc>) -> Self {
        self.timestamp_before = Some(t);
        self
    }

    pub fn timestamp_at_or_before(mut self, t: DateTime<Utc>) -> Self {
        self.timestamp_at_or_before = Some(t);
        self
    }

    pub fn archived(mut self, archived: bool) -> Self {
        self.archived = Some(archived);
        self
    }

    pub fn related_invoice(mut self, invoice: InvoiceId) -> Self {
        self.related_invoice = Some(invoice);
        self
    }

    pub fn matches(&self, entry: &AccountEntry) -> bool {
        if let Some(account) = self.account {
            if entry.account_id != account {
                return false;
            }
        }
        if let Some(entry_type) = self.entry_type {
            if entry.entry_type != Some(entry_type) {
                return false;
            }
        }
        if let Some(invoice) = self.source_invoice {
            if entry.source_invoice != Some(invoice) {
                return false;
            }
        }
        if let Some(invoice) = self.settled_invoice {
            if entry.settled_invoice != Some(invoice) {
                return false;
            }
        }
        if let Some(item) = self.settled_item {
            if entry.settled_item != Some(item) {
                return false;
            }
        }
        if let Some(parent) = self.parent {
            if entry.parent != Some(parent) {
                return false;
            }
        }
        if let Some(t) = self.timestamp_before {
            if entry.timestamp >= t {
                return false;
            }
        }
        if let Some(t) = self.timestamp_at_or_before {
            if entry.timestamp > t {
                return false;
            }
        }
        if let Some(archived) = self.archived {
            if entry.archived != archived {
                return false;
            }
        }
        if let Some(invoice) = self.related_invoice {
            if entry.source_invoice != Some(invoice) && entry.settled_invoice != Some(invoice) {
                return false;
            }
        }
        true
    }
}

/// Read and write surface the ledger computations run against
pub trait EntryStore {
    /// Validates and records a new entry, assigning the next id
    fn create_entry(&mut self, new: NewEntry) -> Result<AccountEntry, LedgerError>;

    fn entry(&self, id: EntryId) -> Result<AccountEntry, LedgerError>;

    /// Entries matching the query, in ascending id order
    fn entries(&self, query: &EntryQuery) -> Vec<AccountEntry>;

    fn count_entries(&self, query: &EntryQuery) -> usize;

    fn account(&self, id: AccountId) -> Result<Account, LedgerError>;

    fn entry_type(&self, id: EntryTypeId) -> Result<EntryType, LedgerError>;

    fn entry_type_by_code(&self, code: &str) -> Result<EntryType, LedgerError>;

    fn invoice(&self, id: InvoiceId) -> Result<Invoice, LedgerError>;

    fn config(&self) -> &LedgerConfig;

    /// Recomputes and persists the invoice's cached fields
    fn recompute_invoice(
        &mut self,
        id: InvoiceId,
        now: DateTime<Utc>,
    ) -> Result<CachedFields, LedgerError>;
}

/// In-memory ledger backed by id-ordered arenas
#[derive(Debug, Default)]
pub struct MemoryLedger {
    config: LedgerConfig,
    account_types: BTreeMap<AccountTypeId, AccountType>,
    accounts: BTreeMap<AccountId, Account>,
    entry_types: BTreeMap<EntryTypeId, EntryType>,
    entries: BTreeMap<EntryId, AccountEntry>,
    invoices: BTreeMap<InvoiceId, Invoice>,
    source_files: BTreeMap<SourceFileId, SourceFile>,
    contracts: BTreeMap<ContractId, Contract>,
    next_account_type: u64,
    next_account: u64,
    next_entry_type: u64,
    next_entry: u64,
    next_invoice: u64,
    next_source_file: u64,
    next_contract: u64,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: LedgerConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    pub fn create_account_type(
        &mut self,
        code: impl Into<String>,
        name: impl Into<String>,
        is_asset: bool,
    ) -> Result<AccountType, LedgerError> {
        let code = code.into();
        if self.account_types.values().any(|t| t.code == code) {
            return Err(LedgerError::DuplicateCode(code));
        }
        self.next_account_type += 1;
        let account_type = AccountType {
            id: AccountTypeId::new(self.next_account_type),
            code,
            name: name.into(),
            is_asset,
            created: Self::now(),
        };
        self.account_types
            .insert(account_type.id, account_type.clone());
        Ok(account_type)
    }

    pub fn create_account(
        &mut self,
        account_type: AccountTypeId,
        name: impl Into<String>,
        currency: Currency,
    ) -> Result<Account, LedgerError> {
        if !self.account_types.contains_key(&account_type) {
            return Err(LedgerError::AccountTypeNotFound(account_type));
        }
        self.next_account += 1;
        let account = Account {
            id: AccountId::new(self.next_account),
            account_type,
            name: name.into(),
            currency,
            created: Self::now(),
        };
        self.accounts.insert(account.id, account.clone());
        Ok(account)
    }

    pub fn create_entry_type(&mut self, new: NewEntryType) -> Result<EntryType, LedgerError> {
        if self.entry_types.values().any(|t| t.code == new.code) {
            return Err(LedgerError::DuplicateCode(new.code));
        }
        self.next_entry_type += 1;
        let entry_type = EntryType {
            id: EntryTypeId::new(self.next_entry_type),
            code: new.code,
            name: new.name,
            payback_priority: new.payback_priority,
            is_settlement: new.is_settlement,
            is_payment: new.is_payment,
            created: Self::now(),
        };
        self.entry_types.insert(entry_type.id, entry_type.clone());
        Ok(entry_type)
    }

    pub fn create_invoice(&mut self, new: NewInvoice) -> Invoice {
        self.next_invoice += 1;
        let invoice = Invoice {
            id: InvoiceId::new(self.next_invoice),
            invoice_type: new.invoice_type,
            number: new.number,
            created: Self::now(),
            sent: new.sent,
            due_date: new.due_date,
            notes: new.notes,
            cached: CachedFields::default(),
        };
        self.invoices.insert(invoice.id, invoice.clone());
        invoice
    }

    pub fn create_source_file(&mut self, name: impl Into<String>) -> SourceFile {
        self.next_source_file += 1;
        let file = SourceFile {
            id: SourceFileId::new(self.next_source_file),
            name: name.into(),
            created: Self::now(),
        };
        self.source_files.insert(file.id, file.clone());
        file
    }

    pub fn create_contract(&mut self, name: impl Into<String>) -> Contract {
        self.next_contract += 1;
        let contract = Contract {
            id: ContractId::new(self.next_contract),
            name: name.into(),
            created: Self::now(),
        };
        self.contracts.insert(contract.id, contract.clone());
        contract
    }

    pub fn account_type(&self, id: AccountTypeId) -> Result<AccountType, LedgerError> {
        self.account_types
            .get(&id)
            .cloned()
            .ok_or(LedgerError::AccountTypeNotFound(id))
    }

    pub fn source_file(&self, id: SourceFileId) -> Result<SourceFile, LedgerError> {
        self.source_files
            .get(&id)
            .cloned()
            .ok_or(LedgerError::SourceFileNotFound(id))
    }

    pub fn invoices(&self) -> impl Iterator<Item = &Invoice> {
        self.invoices.values()
    }

    pub fn accounts(&self) -> impl Iterator<Item = &Account> {
        self.accounts.values()
    }

    /// Marks an entry as archived; its amount is immutable from then on
    pub fn archive_entry(&mut self, id: EntryId) -> Result<(), LedgerError> {
        let entry = self
            .entries
            .get_mut(&id)
            .ok_or(LedgerError::EntryNotFound(id))?;
        if entry.archived {
            return Err(LedgerError::ArchivedEntry(id));
        }
        entry.archived = true;
        Ok(())
    }

    /// Sets the amount of a live entry, quantized to cents
    pub fn set_entry_amount(
        &mut self,
        id: EntryId,
        amount: Option<Decimal>,
    ) -> Result<(), LedgerError> {
        let entry = self
            .entries
            .get_mut(&id)
            .ok_or(LedgerError::EntryNotFound(id))?;
        if entry.archived {
            return Err(LedgerError::ArchivedEntry(id));
        }
        entry.amount = amount.map(dec2);
        Ok(())
    }

    /// Deletes an entry and, transitively, every entry whose parent chain
    /// leads to it
    ///
    /// Fails without deleting anything if any entry in the cascade set is
    /// referenced as `settled_item` by an entry outside the set.
    pub fn delete_entry(&mut self, id: EntryId) -> Result<(), LedgerError> {
        if !self.entries.contains_key(&id) {
            return Err(LedgerError::EntryNotFound(id));
        }
        let mut doomed = vec![id];
        let mut frontier = vec![id];
        while let Some(parent) = frontier.pop() {
            for child in self
                .entries
                .values()
                .filter(|e| e.parent == Some(parent))
                .map(|e| e.id)
            {
                if !doomed.contains(&child) {
                    doomed.push(child);
                    frontier.push(child);
                }
            }
        }
        for entry in self.entries.values() {
            if doomed.contains(&entry.id) {
                continue;
            }
            if let Some(item) = entry.settled_item {
                if doomed.contains(&item) {
                    return Err(LedgerError::protected("account entry", entry.id.to_string()));
                }
            }
        }
        for id in doomed {
            self.entries.remove(&id);
        }
        Ok(())
    }

    /// Deletes an invoice and its item entries
    ///
    /// Fails if any entry settles the invoice; settlements must be deleted
    /// first.
    pub fn delete_invoice(&mut self, id: InvoiceId) -> Result<(), LedgerError> {
        if !self.invoices.contains_key(&id) {
            return Err(LedgerError::InvoiceNotFound(id));
        }
        if let Some(settlement) = self
            .entries
            .values()
            .find(|e| e.settled_invoice == Some(id))
        {
            return Err(LedgerError::protected("invoice", settlement.id.to_string()));
        }
        let items: Vec<EntryId> = self
            .entries
            .values()
            .filter(|e| e.source_invoice == Some(id))
            .map(|e| e.id)
            .collect();
        for item in items {
            self.delete_entry(item)?;
        }
        self.invoices.remove(&id);
        Ok(())
    }

    /// Deletes an account; fails while any entry references it
    pub fn delete_account(&mut self, id: AccountId) -> Result<(), LedgerError> {
        if !self.accounts.contains_key(&id) {
            return Err(LedgerError::AccountNotFound(id));
        }
        if let Some(entry) = self.entries.values().find(|e| e.account_id == id) {
            return Err(LedgerError::protected("account", entry.id.to_string()));
        }
        self.accounts.remove(&id);
        Ok(())
    }

    pub fn account_balance(&self, account: AccountId) -> Result<Decimal, LedgerError> {
        let account = self.account(account)?;
        Ok(account_balance(self, account.id))
    }

    pub fn account_balance_at(
        &self,
        account: AccountId,
        t: DateTime<Utc>,
    ) -> Result<Decimal, LedgerError> {
        let account = self.account(account)?;
        Ok(account_balance_at(self, account.id, t))
    }
}

impl EntryStore for MemoryLedger {
    fn create_entry(&mut self, new: NewEntry) -> Result<AccountEntry, LedgerError> {
        new.validate()?;
        if !self.accounts.contains_key(&new.account_id) {
            return Err(LedgerError::AccountNotFound(new.account_id));
        }
        if let Some(entry_type) = new.entry_type {
            if !self.entry_types.contains_key(&entry_type) {
                return Err(LedgerError::EntryTypeNotFound(entry_type.to_string()));
            }
        }
        if let Some(file) = new.source_file {
            if !self.source_files.contains_key(&file) {
                return Err(LedgerError::SourceFileNotFound(file));
            }
        }
        if let Some(invoice) = new.source_invoice.or(new.settled_invoice) {
            if !self.invoices.contains_key(&invoice) {
                return Err(LedgerError::InvoiceNotFound(invoice));
            }
        }
        if let Some(item) = new.settled_item {
            if !self.entries.contains_key(&item) {
                return Err(LedgerError::EntryNotFound(item));
            }
        }
        if let Some(parent) = new.parent {
            if !self.entries.contains_key(&parent) {
                return Err(LedgerError::EntryNotFound(parent));
            }
        }
        self.next_entry += 1;
        let now = Self::now();
        let entry = AccountEntry {
            id: EntryId::new(self.next_entry),
            account_id: new.account_id,
            created: now,
            timestamp: new.timestamp.unwrap_or(now),
            entry_type: new.entry_type,
            description: new.description,
            amount: new.amount.map(dec2),
            source_file: new.source_file,
            source_invoice: new.source_invoice,
            settled_invoice: new.settled_invoice,
            settled_item: new.settled_item,
            parent: new.parent,
            archived: false,
        };
        debug!(entry = %entry, "entry recorded");
        self.entries.insert(entry.id, entry.clone());
        Ok(entry)
    }

    fn entry(&self, id: EntryId) -> Result<AccountEntry, LedgerError> {
        self.entries
            .get(&id)
            .cloned()
            .ok_or(LedgerError::EntryNotFound(id))
    }

    fn entries(&self, query: &EntryQuery) -> Vec<AccountEntry> {
        // BTreeMap iteration yields ascending id order
        self.entries
            .values()
            .filter(|e| query.matches(e))
            .cloned()
            .collect()
    }

    fn count_entries(&self, query: &EntryQuery) -> usize {
        self.entries.values().filter(|e| query.matches(e)).count()
    }

    fn account(&self, id: AccountId) -> Result<Account, LedgerError> {
        self.accounts
            .get(&id)
            .cloned()
            .ok_or(LedgerError::AccountNotFound(id))
    }

    fn entry_type(&self, id: EntryTypeId) -> Result<EntryType, LedgerError> {
        self.entry_types
            .get(&id)
            .cloned()
            .ok_or_else(|| LedgerError::EntryTypeNotFound(id.to_string()))
    }

    fn entry_type_by_code(&self, code: &str) -> Result<EntryType, LedgerError> {
        self.entry_types
            .values()
            .find(|t| t.code == code)
            .cloned()
            .ok_or_else(|| LedgerError::EntryTypeNotFound(code.to_string()))
    }

    fn invoice(&self, id: InvoiceId) -> Result<Invoice, LedgerError> {
        self.invoices
            .get(&id)
            .cloned()
            .ok_or(LedgerError::InvoiceNotFound(id))
    }

    fn config(&self) -> &LedgerConfig {
        &self.config
    }

    fn recompute_invoice(
        &mut self,
        id: InvoiceId,
        now: DateTime<Utc>,
    ) -> Result<CachedFields, LedgerError> {
        let invoice = self.invoice(id)?;
        let cached = invoice.recompute(&*self, &self.config, now);
        if let Some(stored) = self.invoices.get_mut(&id) {
            stored.cached = cached.clone();
        }
        Ok(cached)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn ledger_with_account() -> (MemoryLedger, AccountId, EntryTypeId) {
        let mut ledger = MemoryLedger::new();
        let at = ledger
            .create_account_type("AR", "Receivables", true)
            .unwrap();
        let account = ledger.create_account(at.id, "test", Currency::EUR).unwrap();
        let et = ledger
            .create_entry_type(NewEntryType::new("CA", "Capital"))
            .unwrap();
        (ledger, account.id, et.id)
    }

    #[test]
    fn test_ids_are_sequential() {
        let (mut ledger, account, et) = ledger_with_account();
        let a = ledger
            .create_entry(NewEntry::new(account).entry_type(et).amount(dec!(1)))
            .unwrap();
        let b = ledger
            .create_entry(NewEntry::new(account).entry_type(et).amount(dec!(2)))
            .unwrap();
        assert!(b.id > a.id);
        assert_eq!(b.id.value(), a.id.value() + 1);
    }

    #[test]
    fn test_entry_amount_is_quantized() {
        let (mut ledger, account, et) = ledger_with_account();
        let e = ledger
            .create_entry(NewEntry::new(account).entry_type(et).amount(dec!(1.005)))
            .unwrap();
        assert_eq!(e.amount, Some(dec!(1.00)));
    }

    #[test]
    fn test_archived_entry_is_immutable() {
        let (mut ledger, account, et) = ledger_with_account();
        let e = ledger
            .create_entry(NewEntry::new(account).entry_type(et).amount(dec!(5)))
            .unwrap();
        ledger.archive_entry(e.id).unwrap();
        assert!(matches!(
            ledger.set_entry_amount(e.id, Some(dec!(6))),
            Err(LedgerError::ArchivedEntry(_))
        ));
        assert!(matches!(
            ledger.archive_entry(e.id),
            Err(LedgerError::ArchivedEntry(_))
        ));
    }

    #[test]
    fn test_duplicate_entry_type_code_rejected() {
        let mut ledger = MemoryLedger::new();
        ledger
            .create_entry_type(NewEntryType::new("CA", "Capital"))
            .unwrap();
        assert!(matches!(
            ledger.create_entry_type(NewEntryType::new("CA", "Capital again")),
            Err(LedgerError::DuplicateCode(_))
        ));
    }

    #[test]
    fn test_delete_entry_cascades_to_children() {
        let (mut ledger, account, et) = ledger_with_account();
        let parent = ledger
            .create_entry(NewEntry::new(account).entry_type(et).amount(dec!(10)))
            .unwrap();
        let child = ledger
            .create_entry(
                NewEntry::new(account)
                    .entry_type(et)
                    .amount(dec!(-10))
                    .parent(parent.id),
            )
            .unwrap();
        ledger.delete_entry(parent.id).unwrap();
        assert!(matches!(
            ledger.entry(child.id),
            Err(LedgerError::EntryNotFound(_))
        ));
    }

    #[test]
    fn test_delete_entry_protected_by_settled_item() {
        let (mut ledger, account, et) = ledger_with_account();
        let item = ledger
            .create_entry(NewEntry::new(account).entry_type(et).amount(dec!(10)))
            .unwrap();
        ledger
            .create_entry(
                NewEntry::new(account)
                    .entry_type(et)
                    .amount(dec!(-10))
                    .settled_item(item.id),
            )
            .unwrap();
        assert!(matches!(
            ledger.delete_entry(item.id),
            Err(LedgerError::ProtectedReference { .. })
        ));
        // still there
        assert!(ledger.entry(item.id).is_ok());
    }

    #[test]
    fn test_delete_invoice_rules() {
        let (mut ledger, account, et) = ledger_with_account();
        let due = Utc.with_ymd_and_hms(2018, 1, 1, 0, 0, 0).unwrap();
        let invoice = ledger.create_invoice(crate::invoice::NewInvoice::new(due));
        let item = ledger
            .create_entry(
                NewEntry::new(account)
                    .entry_type(et)
                    .amount(dec!(100))
                    .source_invoice(invoice.id),
            )
            .unwrap();
        let settlement = ledger
            .create_entry(
                NewEntry::new(account)
                    .entry_type(et)
                    .amount(dec!(-100))
                    .settled_invoice(invoice.id),
            )
            .unwrap();

        // settled invoices are protected
        assert!(matches!(
            ledger.delete_invoice(invoice.id),
            Err(LedgerError::ProtectedReference { .. })
        ));

        ledger.delete_entry(settlement.id).unwrap();
        ledger.delete_invoice(invoice.id).unwrap();
        // item entries go with the invoice
        assert!(matches!(
            ledger.entry(item.id),
            Err(LedgerError::EntryNotFound(_))
        ));
    }

    #[test]
    fn test_delete_account_protected_by_entries() {
        let (mut ledger, account, et) = ledger_with_account();
        ledger
            .create_entry(NewEntry::new(account).entry_type(et).amount(dec!(1)))
            .unwrap();
        assert!(matches!(
            ledger.delete_account(account),
            Err(LedgerError::ProtectedReference { .. })
        ));
    }

    #[test]
    fn test_query_builder_filters() {
        let (mut ledger, account, et) = ledger_with_account();
        let t0 = Utc.with_ymd_and_hms(2018, 1, 1, 12, 0, 0).unwrap();
        let t1 = Utc.with_ymd_and_hms(2018, 1, 2, 12, 0, 0).unwrap();
        ledger
            .create_entry(NewEntry::new(account).entry_type(et).amount(dec!(1)).at(t0))
            .unwrap();
        ledger
            .create_entry(NewEntry::new(account).entry_type(et).amount(dec!(2)).at(t1))
            .unwrap();

        let strict = ledger.entries(&EntryQuery::new().timestamp_before(t1));
        assert_eq!(strict.len(), 1);

        let inclusive = ledger.entries(&EntryQuery::new().timestamp_at_or_before(t1));
        assert_eq!(inclusive.len(), 2);
    }
}
