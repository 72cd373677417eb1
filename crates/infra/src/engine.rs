//! Reception lifecycle engine.
//!
//! Each operation is one store transaction:
//!
//! ```text
//! begin
//!   ↓
//! lock PVZ (PvzNotFound if missing)
//!   ↓
//! resolve the in-progress reception
//!   ↓
//! apply the domain rule, write
//!   ↓
//! commit
//! ```
//!
//! Any early return drops the transaction, so a rejected or failed operation
//! writes nothing. The engine keeps no reception state between calls; the
//! store is the only source of truth, and several engines may share one.

use tracing::{debug, error, info, instrument, warn};

use pvz_core::{DomainError, PvzId};
use pvz_receptions::{Product, ProductType, Reception, ReceptionStatus, ensure_can_open};

use crate::deadline::Deadline;
use crate::error::{ErrorKind, ServiceError};
use crate::store::{EntityStore, StoreError, StoreTransaction};

/// Enforces one in-progress reception per PVZ, attaches and retracts
/// products, and seals receptions.
#[derive(Debug, Clone)]
pub struct ReceptionEngine<S> {
    store: S,
}

impl<S> ReceptionEngine<S>
where
    S: EntityStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Open a new reception for `pvz_id`.
    ///
    /// Fails with `ReceptionAlreadyOpen` if one is in progress; concurrent
    /// callers for one PVZ see exactly one success.
    #[instrument(skip(self, deadline), fields(pvz_id = %pvz_id))]
    pub async fn open_reception(
        &self,
        pvz_id: PvzId,
        deadline: Deadline,
    ) -> Result<Reception, ServiceError> {
        const OP: &str = "open_reception";

        let result = deadline
            .run(OP, async {
                let mut tx = self.begin_locked(OP, pvz_id).await?;

                let current = tx
                    .find_in_progress_reception(pvz_id)
                    .await
                    .map_err(ServiceError::store(OP))?;
                ensure_can_open(pvz_id, current.as_ref())?;

                let reception = match tx.insert_reception(pvz_id).await {
                    Ok(reception) => reception,
                    // A writer that bypassed the PVZ lock got there first.
                    Err(StoreError::Conflict(_)) => {
                        return Err(DomainError::ReceptionAlreadyOpen { pvz_id }.into());
                    }
                    Err(e) => return Err(ServiceError::store(OP)(e)),
                };

                tx.commit().await.map_err(ServiceError::store(OP))?;
                Ok(reception)
            })
            .await;

        if let Ok(reception) = &result {
            info!(reception_id = %reception.id, "reception opened");
        }
        log_failure(OP, &result);
        result
    }

    /// Attach a product to the PVZ's in-progress reception.
    #[instrument(skip(self, deadline), fields(pvz_id = %pvz_id, product_type = %product_type))]
    pub async fn attach_product(
        &self,
        pvz_id: PvzId,
        product_type: ProductType,
        deadline: Deadline,
    ) -> Result<Product, ServiceError> {
        const OP: &str = "attach_product";

        let result = deadline
            .run(OP, async {
                let mut tx = self.begin_locked(OP, pvz_id).await?;
                let reception = Self::require_in_progress(OP, tx.as_mut(), pvz_id).await?;

                let product = tx
                    .insert_product(reception.id, product_type)
                    .await
                    .map_err(ServiceError::store(OP))?;

                tx.commit().await.map_err(ServiceError::store(OP))?;
                Ok(product)
            })
            .await;

        if let Ok(product) = &result {
            info!(
                reception_id = %product.reception_id,
                product_id = %product.id,
                "product attached"
            );
        }
        log_failure(OP, &result);
        result
    }

    /// Remove the most recently added product of the in-progress reception.
    ///
    /// Returns the removed product; `NoProductsInReception` when there is none.
    #[instrument(skip(self, deadline), fields(pvz_id = %pvz_id))]
    pub async fn retract_last_product(
        &self,
        pvz_id: PvzId,
        deadline: Deadline,
    ) -> Result<Product, ServiceError> {
        const OP: &str = "retract_last_product";

        let result = deadline
            .run(OP, async {
                let mut tx = self.begin_locked(OP, pvz_id).await?;
                let reception = Self::require_in_progress(OP, tx.as_mut(), pvz_id).await?;

                let Some(product) = tx
                    .delete_last_product(reception.id)
                    .await
                    .map_err(ServiceError::store(OP))?
                else {
                    return Err(DomainError::NoProductsInReception {
                        pvz_id,
                        reception_id: reception.id,
                    }
                    .into());
                };

                tx.commit().await.map_err(ServiceError::store(OP))?;
                Ok(product)
            })
            .await;

        if let Ok(product) = &result {
            info!(
                reception_id = %product.reception_id,
                product_id = %product.id,
                "last product retracted"
            );
        }
        log_failure(OP, &result);
        result
    }

    /// Close the PVZ's in-progress reception. A second close fails with
    /// `NoReceptionInProgress`.
    #[instrument(skip(self, deadline), fields(pvz_id = %pvz_id))]
    pub async fn close_reception(
        &self,
        pvz_id: PvzId,
        deadline: Deadline,
    ) -> Result<Reception, ServiceError> {
        const OP: &str = "close_reception";

        let result = deadline
            .run(OP, async {
                let mut tx = self.begin_locked(OP, pvz_id).await?;
                let reception = Self::require_in_progress(OP, tx.as_mut(), pvz_id).await?;

                let closed = tx
                    .update_reception_status(reception.id, ReceptionStatus::Closed)
                    .await
                    .map_err(ServiceError::store(OP))?
                    .ok_or(DomainError::NoReceptionInProgress { pvz_id })?;

                tx.commit().await.map_err(ServiceError::store(OP))?;
                Ok(closed)
            })
            .await;

        if let Ok(reception) = &result {
            info!(reception_id = %reception.id, "reception closed");
        }
        log_failure(OP, &result);
        result
    }

    async fn begin_locked(
        &self,
        operation: &'static str,
        pvz_id: PvzId,
    ) -> Result<Box<dyn StoreTransaction>, ServiceError> {
        let mut tx = self
            .store
            .begin()
            .await
            .map_err(ServiceError::store(operation))?;

        let exists = tx
            .lock_pvz(pvz_id)
            .await
            .map_err(ServiceError::store(operation))?;
        if !exists {
            return Err(DomainError::PvzNotFound { pvz_id }.into());
        }
        Ok(tx)
    }

    async fn require_in_progress(
        operation: &'static str,
        tx: &mut dyn StoreTransaction,
        pvz_id: PvzId,
    ) -> Result<Reception, ServiceError> {
        let reception = tx
            .find_in_progress_reception(pvz_id)
            .await
            .map_err(ServiceError::store(operation))?
            .ok_or(DomainError::NoReceptionInProgress { pvz_id })?;
        reception.ensure_in_progress()?;
        Ok(reception)
    }
}

/// Log a failed outcome at the level its kind calls for.
pub(crate) fn log_failure<T>(operation: &'static str, result: &Result<T, ServiceError>) {
    let Err(err) = result else {
        return;
    };
    match err.kind() {
        ErrorKind::Domain => debug!(operation, error = %err, "request rejected"),
        ErrorKind::Infrastructure => error!(operation, error = %err, "storage failure"),
        ErrorKind::Cancellation => warn!(operation, error = %err, "deadline exceeded"),
    }
}
