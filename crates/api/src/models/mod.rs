//! Rows returned by the guest store and serialized to clients.

pub mod balance;
pub mod checkout;

pub use balance::BalanceRecord;
pub use checkout::CheckoutRecord;
