//! Strongly-typed identifiers for domain entities
//!
//! Newtype wrappers around store-assigned sequence numbers. Using distinct
//! types prevents accidental mixing of identifier kinds, and the wrapped
//! integer preserves insertion order: entry ids participate in balance
//! tie-breaks and item ordering, so ids must sort in creation order.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! define_id {
    ($name:ident, $prefix:literal) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            /// Creates an identifier from a raw sequence number
            pub fn new(value: u64) -> Self {
                Self(value)
            }

            /// Returns the underlying sequence number
            pub fn value(&self) -> u64 {
                self.0
            }

            /// Returns the identifier prefix for display
            pub fn prefix() -> &'static str {
                $prefix
            }

            /// Returns the next identifier in sequence
            pub fn next(&self) -> Self {
                Self(self.0 + 1)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}-{}", $prefix, self.0)
            }
        }

        impl FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                // Strip prefix if present
                let raw = s.strip_prefix(concat!($prefix, "-")).unwrap_or(s);
                Ok(Self(raw.parse()?))
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }

        impl From<$name> for u64 {
            fn from(id: $name) -> u64 {
                id.0
            }
        }
    };
}

define_id!(AccountId, "ACC");
define_id!(AccountTypeId, "ACT");
define_id!(EntryId, "AE");
define_id!(EntryTypeId, "ET");
define_id!(InvoiceId, "INV");
define_id!(SourceFileId, "SRC");
define_id!(ContractId, "CON");
