//! Contracts
//!
//! Base record for app-specific contracts (rent contracts, loans, ...).
//! Allocation logic never touches contracts; they exist so invoices and
//! entries created by outer layers have something to hang off.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::ContractId;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contract {
    /// Unique identifier
    pub id: ContractId,
    /// Contract name
    pub name: String,
    /// Creation timestamp
    pub created: DateTime<Utc>,
}
