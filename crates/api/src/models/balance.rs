//! Bonus balance row.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use loyalty_core::next_tier_label;

/// A guest's bonus balance as maintained by the accounting side.
///
/// Read-only from this service's point of view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct BalanceRecord {
    pub guest_phone: String,
    pub last_name: String,
    pub first_name: String,
    pub loyalty_level: Option<String>,
    pub current_balance: Decimal,
    pub visits_count: i32,
    pub last_visit_date: Option<NaiveDate>,
}

impl BalanceRecord {
    /// Replace the stored tier with the one the guest reaches on this visit.
    #[must_use]
    pub fn with_next_tier(self) -> Self {
        let next = next_tier_label(self.loyalty_level.as_deref());
        Self {
            loyalty_level: Some(next.to_owned()),
            ..self
        }
    }
}
