//! Core types for the loyalty domain.
//!
//! This module provides type-safe wrappers for the values that cross the
//! HTTP and database boundaries.

pub mod checkin_date;
pub mod checkout;
pub mod id;
pub mod phone;
pub mod tier;

pub use checkin_date::normalize_checkin_date;
pub use checkout::{CheckoutError, CheckoutInput, NewCheckout};
pub use id::CheckoutId;
pub use phone::{CanonicalPhone, PhoneError};
pub use tier::{LoyaltyTier, next_tier_label, normalize_tier_label};
