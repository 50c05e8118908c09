//! Pre-built Test Fixtures
//!
//! Provides a ledger pre-populated with the standard account types and
//! chart of entry types used across the test suite, mirroring a typical
//! consumer lending deployment.

use core_kernel::Currency;
use domain_ledger::{
    Account, AccountType, EntryType, LedgerConfig, MemoryLedger, NewEntryType,
};

/// Account type codes
pub const ACCOUNT_RECEIVABLES: &str = "RE";
pub const ACCOUNT_SETTLEMENTS: &str = "SE";

/// Entry type codes
pub const E_CAPITAL: &str = "CA";
pub const E_FEE: &str = "FE";
pub const E_INTEREST: &str = "IN";
pub const E_OVERPAYMENT: &str = "OP";
pub const E_RENT: &str = "IR";
pub const E_SETTLEMENT: &str = "SE";
pub const E_MANUAL_SETTLEMENT: &str = "MS";
pub const E_CREDIT_NOTE_RECONCILIATION: &str = "33";

/// A ledger with the standard chart plus one receivables and one
/// settlements account
pub struct LedgerFixture {
    pub ledger: MemoryLedger,
    pub receivables: Account,
    pub settlements: Account,
}

impl LedgerFixture {
    pub fn new() -> Self {
        Self::with_config(LedgerConfig::default())
    }

    pub fn with_config(config: LedgerConfig) -> Self {
        let mut ledger = MemoryLedger::with_config(config);

        let at_receivables = ledger
            .create_account_type(ACCOUNT_RECEIVABLES, "Receivables", true)
            .unwrap();
        let at_settlements = ledger
            .create_account_type(ACCOUNT_SETTLEMENTS, "Settlements", true)
            .unwrap();

        // interest is paid back first, then fees, then capital
        let chart = [
            NewEntryType::new(E_CAPITAL, "Capital").payback_priority(3),
            NewEntryType::new(E_OVERPAYMENT, "Overpayment").payback_priority(3),
            NewEntryType::new(E_FEE, "Fee").payback_priority(2),
            NewEntryType::new(E_INTEREST, "Interest").payback_priority(1),
            NewEntryType::new(E_RENT, "Rent"),
            NewEntryType::new(E_SETTLEMENT, "Settlement").settlement().payment(),
            NewEntryType::new(E_MANUAL_SETTLEMENT, "Manual settlement").settlement(),
            NewEntryType::new(E_CREDIT_NOTE_RECONCILIATION, "Credit note reconciliation")
                .settlement(),
        ];
        for new in chart {
            ledger.create_entry_type(new).unwrap();
        }

        let receivables = ledger
            .create_account(at_receivables.id, "receivables", Currency::EUR)
            .unwrap();
        let settlements = ledger
            .create_account(at_settlements.id, "settlements", Currency::EUR)
            .unwrap();

        Self {
            ledger,
            receivables,
            settlements,
        }
    }

    pub fn entry_type(&self, code: &str) -> EntryType {
        use domain_ledger::EntryStore;
        self.ledger.entry_type_by_code(code).unwrap()
    }

    pub fn account_type(&self, account: &Account) -> AccountType {
        self.ledger.account_type(account.account_type).unwrap()
    }

    /// A fresh receivables account in the fixture ledger
    pub fn new_receivables_account(&mut self, name: &str) -> Account {
        let account_type = self.receivables.account_type;
        self.ledger
            .create_account(account_type, name, Currency::EUR)
            .unwrap()
    }
}

impl Default for LedgerFixture {
    fn default() -> Self {
        Self::new()
    }
}
