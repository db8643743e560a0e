//! In-process guest store for tests and local demos.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use chrono::Utc;

use loyalty_core::{CanonicalPhone, CheckoutId, NewCheckout};

use super::{GuestStore, RepositoryError};
use crate::models::{BalanceRecord, CheckoutRecord};

/// Guest store holding everything in memory.
///
/// Can be flipped to unavailable to exercise failure paths.
#[derive(Debug)]
pub struct MemoryGuestStore {
    checkouts: Mutex<Vec<CheckoutRecord>>,
    balances: Mutex<Vec<BalanceRecord>>,
    next_id: AtomicI64,
    available: AtomicBool,
}

impl Default for MemoryGuestStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryGuestStore {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            checkouts: Mutex::new(Vec::new()),
            balances: Mutex::new(Vec::new()),
            next_id: AtomicI64::new(1),
            available: AtomicBool::new(true),
        }
    }

    /// Seed the balance table.
    #[must_use]
    pub fn with_balances(self, balances: Vec<BalanceRecord>) -> Self {
        *self.balances.lock().unwrap_or_else(PoisonError::into_inner) = balances;
        self
    }

    /// Make every subsequent call fail (or succeed again).
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Snapshot of recorded checkouts, oldest first.
    #[must_use]
    pub fn checkouts(&self) -> Vec<CheckoutRecord> {
        self.checkouts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn ensure_available(&self) -> Result<(), RepositoryError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(RepositoryError::Unavailable(
                "connection refused".to_string(),
            ))
        }
    }
}

#[async_trait]
impl GuestStore for MemoryGuestStore {
    async fn insert_checkout(
        &self,
        checkout: &NewCheckout,
    ) -> Result<CheckoutRecord, RepositoryError> {
        self.ensure_available()?;
        let id = CheckoutId::new(self.next_id.fetch_add(1, Ordering::SeqCst));
        let record = CheckoutRecord::from_new(id, checkout, Utc::now());
        self.checkouts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record.clone());
        Ok(record)
    }

    async fn find_latest_balance(
        &self,
        phone: &CanonicalPhone,
    ) -> Result<Option<BalanceRecord>, RepositoryError> {
        self.ensure_available()?;
        let balances = self.balances.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(balances
            .iter()
            .filter(|b| b.guest_phone == phone.as_str())
            .max_by_key(|b| b.last_visit_date)
            .cloned())
    }

    async fn recent_checkouts(&self, limit: i64) -> Result<Vec<CheckoutRecord>, RepositoryError> {
        self.ensure_available()?;
        let checkouts = self.checkouts.lock().unwrap_or_else(PoisonError::into_inner);
        let mut rows = checkouts.clone();
        rows.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then(b.id.as_i64().cmp(&a.id.as_i64()))
        });
        rows.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(rows)
    }

    async fn recent_balances(&self, limit: i64) -> Result<Vec<BalanceRecord>, RepositoryError> {
        self.ensure_available()?;
        let balances = self.balances.lock().unwrap_or_else(PoisonError::into_inner);
        let mut rows = balances.clone();
        rows.sort_by(|a, b| b.last_visit_date.cmp(&a.last_visit_date));
        rows.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(rows)
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        self.ensure_available()
    }

    async fn close(&self) {}
}
