//! Typed IDs for type-safe entity references.
//!
//! Using typed IDs prevents accidentally passing a `CashHolderId` where a `BankAccountId` is expected.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Macro to generate typed ID wrappers.
macro_rules! typed_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Creates a new random ID using UUID v7 (time-ordered).
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Creates an ID from an existing UUID.
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the inner UUID.
            #[must_use]
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }
    };
}

typed_id!(BankAccountId, "Unique identifier for a bank account.");
typed_id!(CashHolderId, "Unique identifier for a cash holder (petty cash box).");
typed_id!(ProductId, "Unique identifier for a product or service.");
typed_id!(ContactId, "Unique identifier for a contact (shareholder, customer or vendor).");
typed_id!(CategoryId, "Unique identifier for a transaction category.");
typed_id!(TransactionId, "Unique identifier for a transaction.");
typed_id!(InstallmentId, "Unique identifier for an installment of a transaction.");
typed_id!(AttachmentId, "Unique identifier for a transaction attachment.");
typed_id!(DepositId, "Unique identifier for a deposit.");
