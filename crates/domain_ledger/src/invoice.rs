//! Invoices and the invoice lifecycle
//!
//! An invoice owns no entries: its items are account entries pointing back
//! via `source_invoice`, and settlements point via `settled_invoice`. All
//! aggregate fields (amount, paid/unpaid/overpaid, close date, late days,
//! state) are cached values recomputed from the entries by an explicit,
//! idempotent [`Invoice::recompute`] call; external collaborators trigger it
//! whenever entries attached to the invoice change.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use core_kernel::{floor_days_between, AccountId, InvoiceId};

use crate::balance::sum_amounts;
use crate::config::LedgerConfig;
use crate::entry::AccountEntry;
use crate::store::{EntryQuery, EntryStore};

/// Invoice direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvoiceType {
    /// Normal (debit) invoice: items are positive debt
    Default,
    /// Credit note: items are negative, representing credit owed back
    CreditNote,
}

/// Invoice lifecycle state
///
/// `NotDueYet → Due → Late`, with `Paid` reachable from any of the three
/// and terminal once the invoice is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvoiceState {
    NotDueYet,
    Due,
    Late,
    Paid,
}

impl InvoiceState {
    pub fn name(&self) -> &'static str {
        match self {
            InvoiceState::NotDueYet => "Not due yet",
            InvoiceState::Due => "Due",
            InvoiceState::Late => "Late",
            InvoiceState::Paid => "Paid",
        }
    }
}

impl fmt::Display for InvoiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Aggregate fields derived from an invoice's entries
///
/// Read-only outside recompute: mutate by calling
/// [`crate::store::EntryStore::recompute_invoice`] and persisting the result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedFields {
    /// Total of the invoice-item amounts
    pub amount: Decimal,
    /// amount − unpaid_amount
    pub paid_amount: Decimal,
    /// Sum of all receivables entries of the invoice
    pub unpaid_amount: Decimal,
    /// Amount received beyond the invoice total
    pub overpaid_amount: Decimal,
    /// Timestamp of the receivables entry that closed the invoice
    pub close_date: Option<DateTime<Utc>>,
    /// Whole days between due date and close date (or now); negative while
    /// the invoice is not yet due
    pub late_days: i64,
    /// Lifecycle state
    pub state: InvoiceState,
}

impl Default for CachedFields {
    fn default() -> Self {
        Self {
            amount: Decimal::ZERO,
            paid_amount: Decimal::ZERO,
            unpaid_amount: Decimal::ZERO,
            overpaid_amount: Decimal::ZERO,
            close_date: None,
            late_days: 0,
            state: InvoiceState::NotDueYet,
        }
    }
}

/// An invoice: a group of invoice-item entries with a due date
///
/// Date convention: plain dates carry a `_date` suffix (`due_date`,
/// `close_date`); natural event datetimes are in past tense (`created`,
/// `sent`). Due dates are full UTC datetimes so that processing is
/// independent of server, client and invoice time zones.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    /// Unique identifier
    pub id: InvoiceId,
    /// Invoice direction
    pub invoice_type: InvoiceType,
    /// Human-facing invoice number
    pub number: Option<i64>,
    /// Creation timestamp
    pub created: DateTime<Utc>,
    /// When the invoice was sent to the debtor
    pub sent: Option<DateTime<Utc>>,
    /// Payment due date
    pub due_date: DateTime<Utc>,
    /// Free-form notes
    pub notes: String,
    /// Derived aggregates, set by recompute only
    pub cached: CachedFields,
}

impl fmt::Display for Invoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} {}",
            self.id,
            self.due_date.date_naive(),
            self.cached.amount
        )
    }
}

/// Specification for creating an invoice
#[derive(Debug, Clone)]
pub struct NewInvoice {
    pub invoice_type: InvoiceType,
    pub number: Option<i64>,
    pub due_date: DateTime<Utc>,
    pub sent: Option<DateTime<Utc>>,
    pub notes: String,
}

impl NewInvoice {
    pub fn new(due_date: DateTime<Utc>) -> Self {
        Self {
            invoice_type: InvoiceType::Default,
            number: None,
            due_date,
            sent: None,
            notes: String::new(),
        }
    }

    pub fn credit_note(mut self) -> Self {
        self.invoice_type = InvoiceType::CreditNote;
        self
    }

    pub fn number(mut self, number: i64) -> Self {
        self.number = Some(number);
        self
    }

    pub fn sent(mut self, sent: DateTime<Utc>) -> Self {
        self.sent = Some(sent);
        self
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }
}

impl Invoice {
    /// Human-facing reference: the invoice number when assigned, the id
    /// otherwise
    pub fn reference(&self) -> String {
        match self.number {
            Some(number) => number.to_string(),
            None => self.id.to_string(),
        }
    }

    /// Whether `unpaid` means "settled" for this invoice's debt direction
    fn is_paid_balance(&self, unpaid: Decimal) -> bool {
        match self.invoice_type {
            InvoiceType::Default => unpaid <= Decimal::ZERO,
            InvoiceType::CreditNote => unpaid >= Decimal::ZERO,
        }
    }

    /// The receivables account is the one the invoice items were recorded
    /// on: the account of the first item entry by id. Not stored
    /// redundantly.
    pub fn receivables_account<S: EntryStore>(&self, store: &S) -> Option<AccountId> {
        store
            .entries(&EntryQuery::new().source_invoice(self.id))
            .first()
            .map(|e| e.account_id)
    }

    /// Entries related to this invoice on the given account, in id order
    pub fn entries_on<S: EntryStore>(&self, store: &S, account: AccountId) -> Vec<AccountEntry> {
        store.entries(&EntryQuery::new().account(account).related_invoice(self.id))
    }

    /// Balance of this invoice on the given account
    pub fn balance_on<S: EntryStore>(&self, store: &S, account: AccountId) -> Decimal {
        sum_amounts(&self.entries_on(store, account), Decimal::ZERO)
    }

    /// All entries on the receivables account related to this invoice
    pub fn receivables<S: EntryStore>(&self, store: &S) -> Vec<AccountEntry> {
        match self.receivables_account(store) {
            Some(account) => self.entries_on(store, account),
            None => Vec::new(),
        }
    }

    /// The invoice-item entries, in id order
    pub fn items<S: EntryStore>(&self, store: &S) -> Vec<AccountEntry> {
        store.entries(&EntryQuery::new().source_invoice(self.id))
    }

    /// Balance of each invoice item on the given account, in item id order
    ///
    /// An item's balance is its own amount plus all settlement entries
    /// whose `settled_item` points at it; an item with an undetermined
    /// amount contributes only its settlements.
    pub fn item_balances<S: EntryStore>(
        &self,
        store: &S,
        account: AccountId,
    ) -> Vec<(AccountEntry, Decimal)> {
        let related = self.entries_on(store, account);
        related
            .iter()
            .filter(|e| e.source_invoice == Some(self.id))
            .map(|item| {
                let settlements: Decimal = related
                    .iter()
                    .filter(|e| e.settled_item == Some(item.id))
                    .filter_map(|e| e.amount)
                    .sum();
                let balance = match item.amount {
                    Some(amount) => amount + settlements,
                    None => settlements,
                };
                (item.clone(), balance)
            })
            .collect()
    }

    /// Unpaid items in payback priority order
    ///
    /// An item is unpaid while its balance still points in the invoice's
    /// debt direction (> 0 for default invoices, < 0 for credit notes).
    /// The sort is stable, so equal priorities keep item id order.
    pub fn unpaid_items<S: EntryStore>(
        &self,
        store: &S,
        account: AccountId,
    ) -> Vec<(AccountEntry, Decimal)> {
        let mut unpaid: Vec<(i16, AccountEntry, Decimal)> = self
            .item_balances(store, account)
            .into_iter()
            .filter(|(_, balance)| match self.invoice_type {
                InvoiceType::Default => *balance > Decimal::ZERO,
                InvoiceType::CreditNote => *balance < Decimal::ZERO,
            })
            .map(|(item, balance)| {
                let priority = item
                    .entry_type
                    .and_then(|id| store.entry_type(id).ok())
                    .map(|t| t.payback_priority)
                    .unwrap_or(0);
                (priority, item, balance)
            })
            .collect();
        unpaid.sort_by_key(|(priority, _, _)| *priority);
        unpaid
            .into_iter()
            .map(|(_, item, balance)| (item, balance))
            .collect()
    }

    /// Live total of the invoice-item amounts
    pub fn compute_amount<S: EntryStore>(&self, store: &S) -> Decimal {
        sum_amounts(&self.items(store), Decimal::ZERO)
    }

    /// Live unpaid amount: sum of all receivables entries
    pub fn compute_unpaid_amount<S: EntryStore>(&self, store: &S) -> Decimal {
        sum_amounts(&self.receivables(store), Decimal::ZERO)
    }

    /// Live paid amount
    pub fn compute_paid_amount<S: EntryStore>(&self, store: &S) -> Decimal {
        self.compute_amount(store) - self.compute_unpaid_amount(store)
    }

    /// Live overpaid amount; zero unless settlements exceeded the debt
    pub fn compute_overpaid_amount<S: EntryStore>(&self, store: &S) -> Decimal {
        let unpaid = self.compute_unpaid_amount(store);
        match self.invoice_type {
            InvoiceType::Default => Decimal::ZERO.max(-unpaid),
            InvoiceType::CreditNote => Decimal::ZERO.max(unpaid),
        }
    }

    /// Timestamp at which the invoice closed, if the receivables balance
    /// has reached the paid threshold
    ///
    /// The close date is the timestamp of the most recent receivables entry
    /// (by timestamp, then id) once the total is at or past zero in the
    /// paying direction.
    pub fn compute_close_date<S: EntryStore>(&self, store: &S) -> Option<DateTime<Utc>> {
        let receivables = self.receivables(store);
        let latest = receivables.iter().max_by_key(|e| (e.timestamp, e.id))?;
        let total = sum_amounts(&receivables, Decimal::ZERO);
        if self.is_paid_balance(total) {
            Some(latest.timestamp)
        } else {
            None
        }
    }

    /// Whole days late as of `close_date`, or as of `now` while open.
    /// Negative while the invoice is not yet due.
    pub fn compute_late_days<S: EntryStore>(&self, store: &S, now: DateTime<Utc>) -> i64 {
        let t = self.compute_close_date(store).unwrap_or(now);
        floor_days_between(self.due_date, t)
    }

    /// Lifecycle state as a pure function of the entries, the due date and
    /// the current time
    pub fn compute_state<S: EntryStore>(
        &self,
        store: &S,
        config: &LedgerConfig,
        now: DateTime<Utc>,
    ) -> InvoiceState {
        let unpaid = self.compute_unpaid_amount(store);
        self.state_for(unpaid, config, now)
    }

    fn state_for(&self, unpaid: Decimal, config: &LedgerConfig, now: DateTime<Utc>) -> InvoiceState {
        if self.is_paid_balance(unpaid) {
            return InvoiceState::Paid;
        }
        if now - self.due_date >= Duration::days(config.late_limit_days) {
            return InvoiceState::Late;
        }
        if now >= self.due_date {
            return InvoiceState::Due;
        }
        InvoiceState::NotDueYet
    }

    /// Recomputes all cached fields from the entries
    ///
    /// Pure: the caller applies and persists the result. Idempotent: with
    /// no new entries and the same `now`, two calls yield identical values.
    pub fn recompute<S: EntryStore>(
        &self,
        store: &S,
        config: &LedgerConfig,
        now: DateTime<Utc>,
    ) -> CachedFields {
        let amount = self.compute_amount(store);
        let unpaid_amount = self.compute_unpaid_amount(store);
        let close_date = self.compute_close_date(store);
        CachedFields {
            amount,
            paid_amount: amount - unpaid_amount,
            unpaid_amount,
            overpaid_amount: self.compute_overpaid_amount(store),
            close_date,
            late_days: floor_days_between(self.due_date, close_date.unwrap_or(now)),
            state: self.state_for(unpaid_amount, config, now),
        }
    }

    /// True once the cached unpaid amount is at or past zero in the paying
    /// direction
    pub fn is_paid(&self) -> bool {
        self.is_paid_balance(self.cached.unpaid_amount)
    }

    /// True while unpaid and at or past the due date
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        !self.is_paid() && now >= self.due_date
    }

    /// True while unpaid and past the configured late grace period
    pub fn is_late(&self, config: &LedgerConfig) -> bool {
        !self.is_paid() && self.cached.late_days >= config.late_limit_days
    }

    /// Display name of the cached state
    pub fn state_name(&self) -> &'static str {
        self.cached.state.name()
    }
}
