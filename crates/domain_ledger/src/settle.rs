//! Settlement allocation
//!
//! A settlement entry (an incoming payment, or a reconciliation) is broken
//! down into per-item child entries on the invoice's receivables account.
//! Allocation order follows each item type's payback priority, stable by
//! item id within a priority. The plan is computed in full from a read
//! snapshot before any entry is written, so a failed precondition writes
//! nothing.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{debug, instrument};

use core_kernel::{AccountId, EntryId, InvoiceId, SourceFileId};

use crate::entry::{AccountEntry, NewEntry};
use crate::error::LedgerError;
use crate::invoice::{Invoice, InvoiceType};
use crate::store::EntryStore;

/// Optional overrides for settlement breakdown entries
#[derive(Debug, Clone, Default)]
pub struct SettleOptions {
    /// Timestamp for the breakdown entries; defaults to the settlement's
    pub timestamp: Option<DateTime<Utc>>,
    /// Description for the breakdown entries; defaults to the settlement's
    pub description: Option<String>,
    pub source_file: Option<SourceFileId>,
}

/// Optional overrides for credit note reconciliation
#[derive(Debug, Clone, Default)]
pub struct ReconcileOptions {
    /// Amount to reconcile; defaults to the largest possible
    pub amount: Option<Decimal>,
    /// Timestamp for the reconciliation entries; defaults to the credit
    /// note's creation time
    pub timestamp: Option<DateTime<Utc>>,
    pub description: Option<String>,
}

/// One planned breakdown entry
struct Planned {
    item: EntryId,
    item_type: Option<core_kernel::EntryTypeId>,
    amount: Decimal,
}

fn check_settlement_amount(
    invoice: &Invoice,
    amount: Option<Decimal>,
) -> Result<Decimal, LedgerError> {
    let amount = amount.ok_or_else(|| {
        LedgerError::validation("settlement amount must be set before settling")
    })?;
    if amount == Decimal::ZERO {
        return Err(LedgerError::validation("settlement amount must be non-zero"));
    }
    match invoice.invoice_type {
        InvoiceType::Default if amount < Decimal::ZERO => Err(LedgerError::validation(
            "settlement amount for an invoice must be positive",
        )),
        InvoiceType::CreditNote if amount > Decimal::ZERO => Err(LedgerError::validation(
            "settlement amount for a credit note must be negative",
        )),
        _ => Ok(amount),
    }
}

/// Validates a prospective settlement amount against an invoice
///
/// Checks sign against the invoice direction and that the magnitude does
/// not exceed the cached unpaid amount.
pub fn validate_settlement_amount(
    invoice: &Invoice,
    amount: Option<Decimal>,
) -> Result<Decimal, LedgerError> {
    let amount = check_settlement_amount(invoice, amount)?;
    if amount.abs() > invoice.cached.unpaid_amount.abs() {
        return Err(LedgerError::validation(format!(
            "settlement amount {} exceeds unpaid amount {} of invoice {}",
            amount,
            invoice.cached.unpaid_amount,
            invoice.reference()
        )));
    }
    Ok(amount)
}

/// Breaks a settlement entry down against an invoice's unpaid items
///
/// Writes one child entry per (partially) covered item on the receivables
/// account, each negating item debt: negative amounts for a default
/// invoice, positive for a credit note. Any remainder past the invoice
/// total stays unallocated on the settlement, preserving overpayment.
/// Recomputes the invoice's cached fields before returning.
#[instrument(skip(store, opts))]
pub fn settle_invoice<S: EntryStore>(
    store: &mut S,
    receivables_account: AccountId,
    settlement: EntryId,
    invoice: InvoiceId,
    now: DateTime<Utc>,
    opts: &SettleOptions,
) -> Result<Vec<AccountEntry>, LedgerError> {
    let account = store.account(receivables_account)?;
    let settlement = store.entry(settlement)?;
    let invoice = store.invoice(invoice)?;
    let amount = check_settlement_amount(&invoice, settlement.amount)?;
    if let Some(type_id) = settlement.entry_type {
        let entry_type = store.entry_type(type_id)?;
        if !entry_type.is_settlement {
            return Err(LedgerError::validation(format!(
                "entry type {} cannot settle invoices",
                entry_type.code
            )));
        }
    } else {
        return Err(LedgerError::validation(
            "settlement entry must have an entry type",
        ));
    }

    // plan first from a read snapshot, then write
    let mut plan: Vec<Planned> = Vec::new();
    let mut remaining = amount;
    for (item, balance) in invoice.unpaid_items(&*store, account.id) {
        let done = match invoice.invoice_type {
            InvoiceType::Default => remaining <= Decimal::ZERO,
            InvoiceType::CreditNote => remaining >= Decimal::ZERO,
        };
        if done {
            break;
        }
        let covered = match invoice.invoice_type {
            InvoiceType::Default => remaining.min(balance),
            InvoiceType::CreditNote => remaining.max(balance),
        };
        plan.push(Planned {
            item: item.id,
            item_type: item.entry_type,
            amount: -covered,
        });
        remaining -= covered;
    }
    debug!(
        items = plan.len(),
        unallocated = %remaining,
        "settlement breakdown planned"
    );

    let timestamp = opts.timestamp.unwrap_or(settlement.timestamp);
    let description = opts
        .description
        .clone()
        .unwrap_or_else(|| settlement.description.clone());
    let mut written = Vec::with_capacity(plan.len());
    for planned in plan {
        let mut new = NewEntry::new(account.id)
            .at(timestamp)
            .description(description.clone())
            .amount(planned.amount)
            .settled_invoice(invoice.id)
            .settled_item(planned.item)
            .parent(settlement.id);
        if let Some(entry_type) = planned.item_type {
            new = new.entry_type(entry_type);
        }
        if let Some(file) = opts.source_file.or(settlement.source_file) {
            new = new.source_file(file);
        }
        written.push(store.create_entry(new)?);
    }
    store.recompute_invoice(invoice.id, now)?;
    Ok(written)
}

/// Settles the invoice already assigned on the settlement entry
pub fn settle_assigned_invoice<S: EntryStore>(
    store: &mut S,
    receivables_account: AccountId,
    settlement: EntryId,
    now: DateTime<Utc>,
    opts: &SettleOptions,
) -> Result<Vec<AccountEntry>, LedgerError> {
    let invoice = store
        .entry(settlement)?
        .settled_invoice
        .ok_or_else(|| LedgerError::validation("settlement has no invoice assigned"))?;
    settle_invoice(store, receivables_account, settlement, invoice, now, opts)
}

/// Reconciles a credit note against a debit invoice
///
/// Writes a linked pair of settlement entries on the given account: a
/// positive one settling the debit invoice and a negative child settling
/// the credit note, then recomputes both invoices. The reconciled amount
/// defaults to the largest possible, `min(debit unpaid, -credit unpaid)`;
/// an explicit larger amount is rejected. Returns `None` when nothing is
/// left to reconcile on either side.
#[instrument(skip(store, opts))]
pub fn settle_credit_note<S: EntryStore>(
    store: &mut S,
    credit_note: InvoiceId,
    debit_note: InvoiceId,
    account: AccountId,
    entry_type_code: &str,
    now: DateTime<Utc>,
    opts: &ReconcileOptions,
) -> Result<Option<(AccountEntry, AccountEntry)>, LedgerError> {
    let credit_note = store.invoice(credit_note)?;
    let debit_note = store.invoice(debit_note)?;
    if credit_note.invoice_type != InvoiceType::CreditNote {
        return Err(LedgerError::validation(format!(
            "invoice {} is not a credit note",
            credit_note.reference()
        )));
    }
    if debit_note.invoice_type != InvoiceType::Default {
        return Err(LedgerError::validation(format!(
            "invoice {} is not a debit invoice",
            debit_note.reference()
        )));
    }
    let entry_type = store.entry_type_by_code(entry_type_code)?;
    if !entry_type.is_settlement {
        return Err(LedgerError::validation(format!(
            "entry type {} cannot settle invoices",
            entry_type.code
        )));
    }

    let credit = -credit_note.compute_unpaid_amount(&*store);
    let balance = debit_note.compute_unpaid_amount(&*store);
    let available = credit.min(balance);
    let amount = match opts.amount {
        Some(requested) => {
            if requested > available {
                return Err(LedgerError::validation(format!(
                    "cannot reconcile {}: only {} available",
                    requested, available
                )));
            }
            requested
        }
        None => available,
    };
    if amount <= Decimal::ZERO {
        debug!("nothing to reconcile");
        return Ok(None);
    }

    let timestamp = opts.timestamp.unwrap_or(credit_note.created);
    let base = opts
        .description
        .clone()
        .unwrap_or_else(|| "credit note reconciliation".to_string());
    // each entry names the invoice on the other side of the reconciliation
    let debit_entry = store.create_entry(
        NewEntry::new(account)
            .at(timestamp)
            .entry_type(entry_type.id)
            .description(format!("{} #{}", base, credit_note.reference()))
            .amount(amount)
            .settled_invoice(debit_note.id),
    )?;
    let credit_entry = store.create_entry(
        NewEntry::new(account)
            .at(timestamp)
            .entry_type(entry_type.id)
            .description(format!("{} #{}", base, debit_note.reference()))
            .amount(-amount)
            .settled_invoice(credit_note.id)
            .parent(debit_entry.id),
    )?;
    store.recompute_invoice(debit_note.id, now)?;
    store.recompute_invoice(credit_note.id, now)?;
    debug!(amount = %amount, "credit note reconciled");
    Ok(Some((debit_entry, credit_entry)))
}
