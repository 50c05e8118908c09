//! Tests for accounts, balances and the invoice lifecycle

use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use domain_ledger::{
    sum_amounts, entry_running_balance, EntryQuery, EntryStore, InvoiceState, NewEntry,
};
use test_utils::{pay_invoice, InvoiceBuilder, LedgerFixture, E_RENT, E_SETTLEMENT};

fn make_datetime(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).unwrap()
}

// ============================================================================
// Account Balance Tests
// ============================================================================

mod balance_tests {
    use super::*;

    #[test]
    fn test_running_and_account_balances() {
        let mut fx = LedgerFixture::new();
        let settlement_type = fx.entry_type(E_SETTLEMENT);

        let amounts = [dec!(12), dec!(13.12), dec!(-1.23), dec!(20.00)];
        let balances = [dec!(12.00), dec!(25.12), dec!(23.89), dec!(43.89)];
        let t0 = Utc.with_ymd_and_hms(2016, 6, 13, 1, 0, 0).unwrap();
        let times: Vec<DateTime<Utc>> =
            (0..amounts.len() as i64).map(|i| t0 + Duration::minutes(5 * i)).collect();

        for (i, (&amount, &t)) in amounts.iter().zip(&times).enumerate() {
            let e = fx
                .ledger
                .create_entry(
                    NewEntry::new(fx.settlements.id)
                        .entry_type(settlement_type.id)
                        .amount(amount)
                        .at(t),
                )
                .unwrap();
            assert_eq!(fx.ledger.account_balance(fx.settlements.id).unwrap(), balances[i]);
            assert_eq!(entry_running_balance(&fx.ledger, &e), balances[i]);
        }

        // point-in-time balance just after each entry
        for (i, &t) in times.iter().enumerate() {
            let balance = fx
                .ledger
                .account_balance_at(fx.settlements.id, t + Duration::seconds(1))
                .unwrap();
            assert_eq!(balance, balances[i]);
        }
    }

    #[test]
    fn test_point_in_time_balance_is_strictly_before() {
        let mut fx = LedgerFixture::new();
        let settlement_type = fx.entry_type(E_SETTLEMENT);
        let t = make_datetime(2016, 6, 13);
        fx.ledger
            .create_entry(
                NewEntry::new(fx.settlements.id)
                    .entry_type(settlement_type.id)
                    .amount(dec!(10.00))
                    .at(t),
            )
            .unwrap();

        assert_eq!(fx.ledger.account_balance_at(fx.settlements.id, t).unwrap(), dec!(0));
        assert_eq!(
            fx.ledger
                .account_balance_at(fx.settlements.id, t + Duration::seconds(1))
                .unwrap(),
            dec!(10.00)
        );
    }

    #[test]
    fn test_running_balance_tie_break_at_same_timestamp() {
        let mut fx = LedgerFixture::new();
        let settlement_type = fx.entry_type(E_SETTLEMENT);
        let t = make_datetime(2016, 6, 13);
        let first = fx
            .ledger
            .create_entry(
                NewEntry::new(fx.settlements.id)
                    .entry_type(settlement_type.id)
                    .amount(dec!(10.00))
                    .at(t),
            )
            .unwrap();
        let second = fx
            .ledger
            .create_entry(
                NewEntry::new(fx.settlements.id)
                    .entry_type(settlement_type.id)
                    .amount(dec!(5.00))
                    .at(t),
            )
            .unwrap();

        // a later entry at the same instant is excluded from the earlier
        // entry's running balance
        assert_eq!(entry_running_balance(&fx.ledger, &first), dec!(10.00));
        assert_eq!(entry_running_balance(&fx.ledger, &second), dec!(15.00));
    }

    #[test]
    fn test_undetermined_amounts_are_skipped_in_sums() {
        let mut fx = LedgerFixture::new();
        let settlement_type = fx.entry_type(E_SETTLEMENT);
        fx.ledger
            .create_entry(
                NewEntry::new(fx.settlements.id)
                    .entry_type(settlement_type.id)
                    .amount(dec!(10.00)),
            )
            .unwrap();
        fx.ledger
            .create_entry(NewEntry::new(fx.settlements.id).entry_type(settlement_type.id))
            .unwrap();

        assert_eq!(fx.ledger.account_balance(fx.settlements.id).unwrap(), dec!(10.00));

        // a sum over amountless entries only falls back to the default
        let amountless: Vec<_> = fx
            .ledger
            .entries(&EntryQuery::new().account(fx.settlements.id))
            .into_iter()
            .filter(|e| e.amount.is_none())
            .collect();
        assert_eq!(sum_amounts(&amountless, Decimal::ZERO), dec!(0));
    }
}

// ============================================================================
// Invoice Lifecycle Tests
// ============================================================================

mod invoice_tests {
    use super::*;

    #[test]
    fn test_sequential_settlements_across_invoices() {
        let mut fx = LedgerFixture::new();
        let t = make_datetime(2016, 5, 5);
        let amounts = [dec!(120.00), dec!(100.00), dec!(50.00), dec!(40.00)];
        let mut invoices = Vec::new();
        for (i, &amount) in amounts.iter().enumerate() {
            let invoice = InvoiceBuilder::due(t + Duration::days(30 * i as i64))
                .component(E_RENT, amount)
                .build(&mut fx);
            assert_eq!(invoice.cached.unpaid_amount, amount);
            invoices.push(invoice.id);
        }

        // each payment targets the first unpaid invoice
        let payment_ops: [(Option<Decimal>, [Decimal; 4]); 5] = [
            (None, [dec!(120.00), dec!(100.00), dec!(50.00), dec!(40.00)]),
            (Some(dec!(50.00)), [dec!(70.00), dec!(100.00), dec!(50.00), dec!(40.00)]),
            (Some(dec!(70.50)), [dec!(0.00), dec!(100.00), dec!(50.00), dec!(40.00)]),
            (Some(dec!(100.00)), [dec!(0.00), dec!(0.00), dec!(50.00), dec!(40.00)]),
            (Some(dec!(100.00)), [dec!(0.00), dec!(0.00), dec!(0.00), dec!(40.00)]),
        ];
        let mut unpaid_invoices = invoices.clone();
        for (payment, expected) in payment_ops {
            if let Some(amount) = payment {
                let target = fx.ledger.invoice(unpaid_invoices[0]).unwrap();
                pay_invoice(&mut fx, &target, amount, Utc::now());
                if fx.ledger.invoice(target.id).unwrap().is_paid() {
                    unpaid_invoices.remove(0);
                }
            }
            for (&id, &unpaid) in invoices.iter().zip(&expected) {
                let invoice = fx.ledger.invoice(id).unwrap();
                assert_eq!(invoice.compute_unpaid_amount(&fx.ledger), unpaid);
                assert_eq!(invoice.cached.unpaid_amount, unpaid);
            }
        }
    }

    #[test]
    fn test_overpayment_stays_on_settlement() {
        let mut fx = LedgerFixture::new();
        let invoice = InvoiceBuilder::due(make_datetime(2016, 5, 5))
            .component(E_RENT, dec!(120.00))
            .build(&mut fx);

        pay_invoice(&mut fx, &invoice, dec!(250.00), Utc::now());

        let invoice = fx.ledger.invoice(invoice.id).unwrap();
        assert_eq!(invoice.cached.unpaid_amount, dec!(0.00));
        assert!(invoice.is_paid());

        // the breakdown covers the invoice item exactly and the remainder
        // stays unallocated on the settlement entry
        let receivables = invoice.receivables(&fx.ledger);
        assert_eq!(receivables.len(), 2);
        assert_eq!(receivables[0].amount, Some(dec!(120.00)));
        assert_eq!(receivables[1].amount, Some(dec!(-120.00)));
        let parent_id = receivables[1].parent.unwrap();
        let parent = fx.ledger.entry(parent_id).unwrap();
        assert_eq!(parent.amount, Some(dec!(250.00)));
        let parent_type = fx.ledger.entry_type(parent.entry_type.unwrap()).unwrap();
        assert!(parent_type.is_settlement);
    }

    #[test]
    fn test_overpayment_on_receivables_is_visible() {
        let mut fx = LedgerFixture::new();
        let invoice = InvoiceBuilder::due(make_datetime(2016, 5, 5))
            .component(E_RENT, dec!(120.00))
            .build(&mut fx);

        // a settlement recorded straight on the receivables account drives
        // the invoice balance below zero
        let settlement_type = fx.entry_type(E_SETTLEMENT);
        fx.ledger
            .create_entry(
                NewEntry::new(fx.receivables.id)
                    .entry_type(settlement_type.id)
                    .amount(dec!(-150.00))
                    .settled_invoice(invoice.id),
            )
            .unwrap();
        let cached = fx.ledger.recompute_invoice(invoice.id, Utc::now()).unwrap();

        assert_eq!(cached.unpaid_amount, dec!(-30.00));
        assert_eq!(cached.overpaid_amount, dec!(30.00));
        assert_eq!(cached.state, InvoiceState::Paid);
    }

    #[test]
    fn test_close_date_and_late_days() {
        let mut fx = LedgerFixture::new();
        let due = make_datetime(2016, 5, 5);
        let invoice = InvoiceBuilder::due(due)
            .component(E_RENT, dec!(100.00))
            .build(&mut fx);

        let paid_at = make_datetime(2016, 5, 15);
        let settlement_type = fx.entry_type(E_SETTLEMENT);
        let settlement = fx
            .ledger
            .create_entry(
                NewEntry::new(fx.settlements.id)
                    .entry_type(settlement_type.id)
                    .amount(dec!(100.00))
                    .at(paid_at)
                    .settled_invoice(invoice.id),
            )
            .unwrap();
        domain_ledger::settle_assigned_invoice(
            &mut fx.ledger,
            fx.receivables.id,
            settlement.id,
            paid_at,
            &domain_ledger::SettleOptions::default(),
        )
        .unwrap();

        let invoice = fx.ledger.invoice(invoice.id).unwrap();
        assert_eq!(invoice.cached.close_date, Some(paid_at));
        assert_eq!(invoice.cached.late_days, 10);
        assert_eq!(invoice.cached.state, InvoiceState::Paid);
    }

    #[test]
    fn test_open_invoice_turns_late_after_grace_period() {
        let mut fx = LedgerFixture::new();
        let due = make_datetime(2016, 5, 5);
        let invoice = InvoiceBuilder::due(due)
            .component(E_RENT, dec!(100.00))
            .build(&mut fx);

        let cached = fx.ledger.recompute_invoice(invoice.id, due - Duration::days(3)).unwrap();
        assert_eq!(cached.state, InvoiceState::NotDueYet);
        assert_eq!(cached.late_days, -3);

        let cached = fx.ledger.recompute_invoice(invoice.id, due + Duration::days(2)).unwrap();
        assert_eq!(cached.state, InvoiceState::Due);

        let cached = fx.ledger.recompute_invoice(invoice.id, due + Duration::days(8)).unwrap();
        assert_eq!(cached.state, InvoiceState::Late);
        assert_eq!(cached.late_days, 8);
    }

    #[test]
    fn test_derived_state_accessors() {
        let mut fx = LedgerFixture::new();
        let due = make_datetime(2016, 5, 5);
        let invoice = InvoiceBuilder::due(due)
            .component(E_RENT, dec!(100.00))
            .build(&mut fx);

        let now = due + Duration::days(8);
        fx.ledger.recompute_invoice(invoice.id, now).unwrap();
        let invoice = fx.ledger.invoice(invoice.id).unwrap();

        assert!(!invoice.is_paid());
        assert!(invoice.is_due(now));
        assert!(invoice.is_late(fx.ledger.config()));
        assert_eq!(invoice.state_name(), "Late");
        assert_eq!(invoice.compute_late_days(&fx.ledger, now), 8);
    }

    #[test]
    fn test_recompute_is_idempotent() {
        let mut fx = LedgerFixture::new();
        let invoice = InvoiceBuilder::due(make_datetime(2016, 5, 5))
            .component(E_RENT, dec!(120.00))
            .build(&mut fx);
        pay_invoice(&mut fx, &invoice, dec!(50.00), Utc::now());

        let now = make_datetime(2016, 6, 1);
        let first = fx.ledger.recompute_invoice(invoice.id, now).unwrap();
        let second = fx.ledger.recompute_invoice(invoice.id, now).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.amount, dec!(120.00));
        assert_eq!(first.paid_amount, dec!(50.00));
        assert_eq!(first.unpaid_amount, dec!(70.00));
        assert_eq!(first.overpaid_amount, dec!(0.00));
    }
}
