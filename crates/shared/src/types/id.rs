//! Typed IDs for type-safe entity references.
//!
//! Using typed IDs prevents accidentally passing a `BillId` where a `BillRunId` is expected.

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

typed_id!(BillRunId, "Unique identifier for a bill run.");
typed_id!(BillId, "Unique identifier for a bill (invoice).");
typed_id!(BillLicenceId, "Unique identifier for a bill licence.");
typed_id!(TransactionId, "Unique identifier for a billing transaction.");
typed_id!(BillingAccountId, "Unique identifier for a billing account.");
typed_id!(BillingAccountAddressId, "Unique identifier for a billing account address record.");
typed_id!(LicenceId, "Unique identifier for an abstraction licence.");
typed_id!(RegionId, "Unique identifier for a billing region.");
typed_id!(ChargeVersionId, "Unique identifier for a charge version.");
typed_id!(ChargeElementId, "Unique identifier for a charge element (charge reference).");
typed_id!(AddressId, "Unique identifier for an address.");
typed_id!(CompanyId, "Unique identifier for a company.");
typed_id!(ContactId, "Unique identifier for a contact.");
