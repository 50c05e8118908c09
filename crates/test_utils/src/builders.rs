//! Builder helpers for test data construction

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use domain_ledger::{
    settle_invoice, AccountEntry, EntryStore, Invoice, NewEntry, NewInvoice, SettleOptions,
};

use crate::fixtures::{LedgerFixture, E_SETTLEMENT};

/// Builds an invoice together with its item entries on the fixture's
/// receivables account
pub struct InvoiceBuilder {
    new: NewInvoice,
    components: Vec<(&'static str, Decimal)>,
}

impl InvoiceBuilder {
    pub fn due(due_date: DateTime<Utc>) -> Self {
        Self {
            new: NewInvoice::new(due_date),
            components: Vec::new(),
        }
    }

    pub fn credit_note(mut self) -> Self {
        self.new = self.new.credit_note();
        self
    }

    pub fn number(mut self, number: i64) -> Self {
        self.new = self.new.number(number);
        self
    }

    /// Adds an invoice item of the given entry type code
    pub fn component(mut self, code: &'static str, amount: Decimal) -> Self {
        self.components.push((code, amount));
        self
    }

    pub fn build(self, fx: &mut LedgerFixture) -> Invoice {
        let invoice = fx.ledger.create_invoice(self.new);
        for (code, amount) in self.components {
            let entry_type = fx.entry_type(code);
            fx.ledger
                .create_entry(
                    NewEntry::new(fx.receivables.id)
                        .entry_type(entry_type.id)
                        .amount(amount)
                        .source_invoice(invoice.id),
                )
                .unwrap();
        }
        fx.ledger
            .recompute_invoice(invoice.id, Utc::now())
            .unwrap();
        fx.ledger.invoice(invoice.id).unwrap()
    }
}

/// Records a payment on the settlements account and breaks it down
/// against the invoice; returns the breakdown entries
pub fn pay_invoice(
    fx: &mut LedgerFixture,
    invoice: &Invoice,
    amount: Decimal,
    now: DateTime<Utc>,
) -> Vec<AccountEntry> {
    let settlement_type = fx.entry_type(E_SETTLEMENT);
    let settlement = fx
        .ledger
        .create_entry(
            NewEntry::new(fx.settlements.id)
                .entry_type(settlement_type.id)
                .amount(amount)
                .description("payment")
                .settled_invoice(invoice.id),
        )
        .unwrap();
    settle_invoice(
        &mut fx.ledger,
        fx.receivables.id,
        settlement.id,
        invoice.id,
        now,
        &SettleOptions::default(),
    )
    .unwrap()
}
