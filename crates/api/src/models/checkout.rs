//! Checkout ledger row.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use loyalty_core::{CheckoutId, NewCheckout};

/// One recorded checkout from the append-only `guests` ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct CheckoutRecord {
    pub id: CheckoutId,
    /// Canonical 10-digit phone key.
    pub guest_phone: String,
    pub last_name: String,
    pub first_name: String,
    pub checkin_date: NaiveDate,
    pub loyalty_level: Option<String>,
    /// Booking reference in the hotel's property management system.
    pub shelter_booking_id: String,
    pub total_amount: Decimal,
    pub bonus_spent: i32,
    pub created_at: DateTime<Utc>,
}

impl CheckoutRecord {
    /// Build the stored form of a validated checkout.
    #[must_use]
    pub fn from_new(id: CheckoutId, checkout: &NewCheckout, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            guest_phone: checkout.guest_phone.as_str().to_owned(),
            last_name: checkout.last_name.clone(),
            first_name: checkout.first_name.clone(),
            checkin_date: checkout.checkin_date,
            loyalty_level: checkout.loyalty_level.clone(),
            shelter_booking_id: checkout.booking_id.clone(),
            total_amount: checkout.total_amount,
            bonus_spent: checkout.bonus_spent,
            created_at,
        }
    }
}
