//! Entity Store boundary.
//!
//! Persists PVZs, receptions, products and user accounts. Mutations that read before they
//! write go through a [`StoreTransaction`]: everything done on one
//! transaction becomes visible together on [`StoreTransaction::commit`], and
//! dropping it uncommitted discards every write.
//!
//! ## Implementations
//!
//! - [`InMemoryEntityStore`]: tests and database-less dev runs.
//! - [`PostgresEntityStore`]: production; row locks plus a partial unique
//!   index keep one in-progress reception per PVZ.

pub mod in_memory;
pub mod postgres;
pub mod schema;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use pvz_auth::{Role, User};
use pvz_core::{PvzId, ReceptionId};
use pvz_directory::{City, Pvz, PvzListQuery, PvzOverview};
use pvz_receptions::{Product, ProductType, Reception, ReceptionStatus};

pub use in_memory::InMemoryEntityStore;
pub use postgres::PostgresEntityStore;

/// Storage failure. Never a domain rejection.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness rule rejected the write (e.g. a second in-progress
    /// reception for one PVZ, or a taken email).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Connectivity, pool or statement failure.
    #[error("backend error: {0}")]
    Backend(String),

    /// A stored row could not be decoded.
    #[error("corrupt row: {0}")]
    Corrupt(String),
}

/// Entry point to the store.
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Start a transaction.
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, StoreError>;

    /// Register a PVZ with a store-assigned id and registration date.
    async fn insert_pvz(&self, city: City) -> Result<Pvz, StoreError>;

    /// One page of PVZs (registration order) with the receptions opened inside
    /// the query window and all of their products, read in one round trip.
    async fn query_pvzs_with_receptions(
        &self,
        query: &PvzListQuery,
    ) -> Result<Vec<PvzOverview>, StoreError>;

    /// Create an account. `email` is already normalized.
    ///
    /// Fails with [`StoreError::Conflict`] if the email is taken.
    async fn insert_user(
        &self,
        email: &str,
        password_hash: &str,
        role: Role,
    ) -> Result<User, StoreError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
}

/// One atomic unit of work.
#[async_trait]
pub trait StoreTransaction: Send {
    /// Take the exclusive per-PVZ lock for the rest of the transaction.
    ///
    /// Returns `false` when the PVZ does not exist.
    async fn lock_pvz(&mut self, pvz_id: PvzId) -> Result<bool, StoreError>;

    async fn find_in_progress_reception(
        &mut self,
        pvz_id: PvzId,
    ) -> Result<Option<Reception>, StoreError>;

    /// Insert an in-progress reception opened now.
    ///
    /// Fails with [`StoreError::Conflict`] if the PVZ already has one.
    async fn insert_reception(&mut self, pvz_id: PvzId) -> Result<Reception, StoreError>;

    /// Insert a product added now. Its `added_at` is never earlier than any
    /// other product of the same reception.
    async fn insert_product(
        &mut self,
        reception_id: ReceptionId,
        product_type: ProductType,
    ) -> Result<Product, StoreError>;

    /// Delete the most recently added product of the reception, selected and
    /// removed as one step. `None` when the reception has no products.
    async fn delete_last_product(
        &mut self,
        reception_id: ReceptionId,
    ) -> Result<Option<Product>, StoreError>;

    /// Move an in-progress reception to `status`. Closing stamps `closed_at`.
    ///
    /// `None` when no in-progress reception with that id exists.
    async fn update_reception_status(
        &mut self,
        reception_id: ReceptionId,
        status: ReceptionStatus,
    ) -> Result<Option<Reception>, StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}

#[async_trait]
impl<S> EntityStore for Arc<S>
where
    S: EntityStore + ?Sized,
{
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, StoreError> {
        (**self).begin().await
    }

    async fn insert_pvz(&self, city: City) -> Result<Pvz, StoreError> {
        (**self).insert_pvz(city).await
    }

    async fn query_pvzs_with_receptions(
        &self,
        query: &PvzListQuery,
    ) -> Result<Vec<PvzOverview>, StoreError> {
        (**self).query_pvzs_with_receptions(query).await
    }

    async fn insert_user(
        &self,
        email: &str,
        password_hash: &str,
        role: Role,
    ) -> Result<User, StoreError> {
        (**self).insert_user(email, password_hash, role).await
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        (**self).find_user_by_email(email).await
    }
}
