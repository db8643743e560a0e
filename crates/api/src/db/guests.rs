//! `PostgreSQL` guest store.
//!
//! Queries are runtime-checked (`query_as` + `FromRow`) and each one is
//! wrapped in a client-side timeout matching the server-side
//! `statement_timeout`, so a stalled connection cannot pin a pool slot.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use loyalty_core::{CanonicalPhone, NewCheckout};

use super::{GuestStore, RepositoryError};
use crate::models::{BalanceRecord, CheckoutRecord};

const CHECKOUT_COLUMNS: &str = "id, guest_phone, last_name, first_name, checkin_date, \
     loyalty_level, shelter_booking_id, total_amount, bonus_spent, created_at";

const BALANCE_COLUMNS: &str = "phone AS guest_phone, last_name, first_name, loyalty_level, \
     bonus_balances AS current_balance, visits_total AS visits_count, \
     last_date_visit AS last_visit_date";

/// Guest store backed by a `PgPool`.
#[derive(Debug, Clone)]
pub struct PgGuestStore {
    pool: PgPool,
    statement_timeout: Duration,
}

impl PgGuestStore {
    /// Create a store over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool, statement_timeout: Duration) -> Self {
        Self {
            pool,
            statement_timeout,
        }
    }

    /// Get a reference to the underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn bounded<T, F>(&self, query: F) -> Result<T, RepositoryError>
    where
        F: Future<Output = Result<T, sqlx::Error>> + Send,
    {
        tokio::time::timeout(self.statement_timeout, query)
            .await
            .map_err(|_| RepositoryError::Timeout(self.statement_timeout))?
            .map_err(RepositoryError::from)
    }
}

#[async_trait]
impl GuestStore for PgGuestStore {
    #[instrument(skip(self, checkout), fields(phone = %checkout.guest_phone))]
    async fn insert_checkout(
        &self,
        checkout: &NewCheckout,
    ) -> Result<CheckoutRecord, RepositoryError> {
        let sql = format!(
            "INSERT INTO guests
                (guest_phone, last_name, first_name, checkin_date, loyalty_level,
                 shelter_booking_id, total_amount, bonus_spent)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {CHECKOUT_COLUMNS}"
        );

        let record = self
            .bounded(
                sqlx::query_as::<_, CheckoutRecord>(&sql)
                    .bind(&checkout.guest_phone)
                    .bind(&checkout.last_name)
                    .bind(&checkout.first_name)
                    .bind(checkout.checkin_date)
                    .bind(checkout.loyalty_level.as_deref())
                    .bind(&checkout.booking_id)
                    .bind(checkout.total_amount)
                    .bind(checkout.bonus_spent)
                    .fetch_one(&self.pool),
            )
            .await?;

        tracing::info!(checkout_id = %record.id, "Checkout recorded");
        Ok(record)
    }

    #[instrument(skip(self), fields(phone = %phone))]
    async fn find_latest_balance(
        &self,
        phone: &CanonicalPhone,
    ) -> Result<Option<BalanceRecord>, RepositoryError> {
        let sql = format!(
            "SELECT {BALANCE_COLUMNS}
             FROM bonuses_balance
             WHERE phone = $1
             ORDER BY last_date_visit DESC NULLS LAST
             LIMIT 1"
        );

        self.bounded(
            sqlx::query_as::<_, BalanceRecord>(&sql)
                .bind(phone)
                .fetch_optional(&self.pool),
        )
        .await
    }

    async fn recent_checkouts(&self, limit: i64) -> Result<Vec<CheckoutRecord>, RepositoryError> {
        let sql = format!(
            "SELECT {CHECKOUT_COLUMNS}
             FROM guests
             ORDER BY created_at DESC
             LIMIT $1"
        );

        self.bounded(
            sqlx::query_as::<_, CheckoutRecord>(&sql)
                .bind(limit)
                .fetch_all(&self.pool),
        )
        .await
    }

    async fn recent_balances(&self, limit: i64) -> Result<Vec<BalanceRecord>, RepositoryError> {
        let sql = format!(
            "SELECT {BALANCE_COLUMNS}
             FROM bonuses_balance
             ORDER BY last_date_visit DESC NULLS LAST
             LIMIT $1"
        );

        self.bounded(
            sqlx::query_as::<_, BalanceRecord>(&sql)
                .bind(limit)
                .fetch_all(&self.pool),
        )
        .await
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        self.bounded(sqlx::query("SELECT 1").execute(&self.pool))
            .await
            .map(|_| ())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
