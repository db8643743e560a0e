//! Row identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Primary key of a row in the append-only checkout ledger (`guests` table).
///
/// Serialized as a bare number. Ids are assigned by the store and have no
/// ordering meaning beyond insertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type), sqlx(transparent))]
#[serde(transparent)]
pub struct CheckoutId(i64);

impl CheckoutId {
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn as_i64(self) -> i64 {
        self.0
    }
}

impl fmt::Display for CheckoutId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<i64> for CheckoutId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<CheckoutId> for i64 {
    fn from(id: CheckoutId) -> Self {
        id.0
    }
}
