use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use pvz_auth::{Role, User};
use pvz_core::{PvzId, ReceptionId, UserId};
use pvz_directory::{City, OverviewRow, Pvz, PvzListQuery, PvzOverview, group_rows};
use pvz_receptions::{Product, ProductType, Reception, ReceptionStatus};

use super::{EntityStore, StoreError, StoreTransaction};

/// Rows in insertion order.
#[derive(Debug, Clone, Default)]
struct Tables {
    pvzs: Vec<Pvz>,
    receptions: Vec<Reception>,
    products: Vec<Product>,
    users: Vec<User>,
}

/// In-memory entity store.
///
/// Intended for tests/dev. Transactions are fully serialised: one holds the
/// table lock from `begin` until commit or drop and writes into a private
/// draft.
#[derive(Debug, Clone, Default)]
pub struct InMemoryEntityStore {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryEntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every product currently stored for a reception, oldest first.
    pub async fn products_of(&self, reception_id: ReceptionId) -> Vec<Product> {
        let tables = self.tables.lock().await;
        tables
            .products
            .iter()
            .filter(|p| p.reception_id == reception_id)
            .cloned()
            .collect()
    }

    /// Every reception stored for a PVZ, in opening order.
    pub async fn receptions_of(&self, pvz_id: PvzId) -> Vec<Reception> {
        let tables = self.tables.lock().await;
        tables
            .receptions
            .iter()
            .filter(|r| r.pvz_id == pvz_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl EntityStore for InMemoryEntityStore {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, StoreError> {
        let guard = self.tables.clone().lock_owned().await;
        let draft = guard.clone();
        Ok(Box::new(InMemoryTransaction { guard, draft }))
    }

    async fn insert_pvz(&self, city: City) -> Result<Pvz, StoreError> {
        let pvz = Pvz::register(city, Utc::now());
        self.tables.lock().await.pvzs.push(pvz.clone());
        Ok(pvz)
    }

    async fn query_pvzs_with_receptions(
        &self,
        query: &PvzListQuery,
    ) -> Result<Vec<PvzOverview>, StoreError> {
        let tables = self.tables.lock().await;

        let mut pvzs: Vec<&Pvz> = tables.pvzs.iter().collect();
        pvzs.sort_by_key(|p| (p.registration_date, p.id));

        let offset = usize::try_from(query.offset())
            .map_err(|_| StoreError::Backend("page offset out of range".to_string()))?;

        let mut rows = Vec::new();
        for pvz in pvzs.into_iter().skip(offset).take(query.limit() as usize) {
            let mut receptions: Vec<&Reception> = tables
                .receptions
                .iter()
                .filter(|r| r.pvz_id == pvz.id && query.includes(r.opened_at))
                .collect();
            receptions.sort_by_key(|r| (r.opened_at, r.id));

            if receptions.is_empty() {
                rows.push(OverviewRow {
                    pvz: pvz.clone(),
                    reception: None,
                    product: None,
                });
            }

            for reception in receptions {
                let mut products = tables
                    .products
                    .iter()
                    .filter(|p| p.reception_id == reception.id)
                    .peekable();

                if products.peek().is_none() {
                    rows.push(OverviewRow {
                        pvz: pvz.clone(),
                        reception: Some(reception.clone()),
                        product: None,
                    });
                }
                for product in products {
                    rows.push(OverviewRow {
                        pvz: pvz.clone(),
                        reception: Some(reception.clone()),
                        product: Some(product.clone()),
                    });
                }
            }
        }

        Ok(group_rows(rows))
    }

    async fn insert_user(
        &self,
        email: &str,
        password_hash: &str,
        role: Role,
    ) -> Result<User, StoreError> {
        let mut tables = self.tables.lock().await;
        if tables.users.iter().any(|u| u.email == email) {
            return Err(StoreError::Conflict(format!("email {email} is taken")));
        }
        let user = User {
            id: UserId::new(),
            email: email.to_string(),
            role,
            password_hash: password_hash.to_string(),
        };
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables.users.iter().find(|u| u.email == email).cloned())
    }
}

struct InMemoryTransaction {
    guard: OwnedMutexGuard<Tables>,
    draft: Tables,
}

#[async_trait]
impl StoreTransaction for InMemoryTransaction {
    async fn lock_pvz(&mut self, pvz_id: PvzId) -> Result<bool, StoreError> {
        // The table lock already covers every PVZ.
        Ok(self.draft.pvzs.iter().any(|p| p.id == pvz_id))
    }

    async fn find_in_progress_reception(
        &mut self,
        pvz_id: PvzId,
    ) -> Result<Option<Reception>, StoreError> {
        Ok(self
            .draft
            .receptions
            .iter()
            .find(|r| r.pvz_id == pvz_id && r.is_in_progress())
            .cloned())
    }

    async fn insert_reception(&mut self, pvz_id: PvzId) -> Result<Reception, StoreError> {
        if !self.draft.pvzs.iter().any(|p| p.id == pvz_id) {
            return Err(StoreError::Backend(format!(
                "reception references missing pvz {pvz_id}"
            )));
        }
        if self
            .draft
            .receptions
            .iter()
            .any(|r| r.pvz_id == pvz_id && r.is_in_progress())
        {
            return Err(StoreError::Conflict(format!(
                "pvz {pvz_id} already has an in-progress reception"
            )));
        }

        let reception = Reception::open(pvz_id, Utc::now());
        self.draft.receptions.push(reception.clone());
        Ok(reception)
    }

    async fn insert_product(
        &mut self,
        reception_id: ReceptionId,
        product_type: ProductType,
    ) -> Result<Product, StoreError> {
        let Some(reception) = self.draft.receptions.iter().find(|r| r.id == reception_id) else {
            return Err(StoreError::Backend(format!(
                "product references missing reception {reception_id}"
            )));
        };

        // Keep added_at monotonic per reception even if the wall clock steps back.
        let newest = self
            .draft
            .products
            .iter()
            .filter(|p| p.reception_id == reception_id)
            .map(|p| p.added_at)
            .max();
        let now = Utc::now();
        let added_at = newest.map_or(now, |n| n.max(now));

        let product = reception
            .register_product(product_type, added_at)
            .map_err(|e| StoreError::Conflict(e.to_string()))?;
        self.draft.products.push(product.clone());
        Ok(product)
    }

    async fn delete_last_product(
        &mut self,
        reception_id: ReceptionId,
    ) -> Result<Option<Product>, StoreError> {
        let last = self
            .draft
            .products
            .iter()
            .rposition(|p| p.reception_id == reception_id);
        Ok(last.map(|idx| self.draft.products.remove(idx)))
    }

    async fn update_reception_status(
        &mut self,
        reception_id: ReceptionId,
        status: ReceptionStatus,
    ) -> Result<Option<Reception>, StoreError> {
        let Some(reception) = self
            .draft
            .receptions
            .iter_mut()
            .find(|r| r.id == reception_id && r.is_in_progress())
        else {
            return Ok(None);
        };

        if status == ReceptionStatus::Closed {
            *reception = reception
                .close(Utc::now())
                .map_err(|e| StoreError::Conflict(e.to_string()))?;
        }
        Ok(Some(reception.clone()))
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let InMemoryTransaction { mut guard, draft } = *self;
        *guard = draft;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn dropped_transaction_leaves_no_trace() {
        let store = InMemoryEntityStore::new();
        let pvz = store.insert_pvz(City::Moscow).await.unwrap();

        {
            let mut tx = store.begin().await.unwrap();
            assert!(tx.lock_pvz(pvz.id).await.unwrap());
            tx.insert_reception(pvz.id).await.unwrap();
        }

        assert!(store.receptions_of(pvz.id).await.is_empty());
    }

    #[tokio::test]
    async fn second_in_progress_reception_conflicts() {
        let store = InMemoryEntityStore::new();
        let pvz = store.insert_pvz(City::Kazan).await.unwrap();

        let mut tx = store.begin().await.unwrap();
        tx.insert_reception(pvz.id).await.unwrap();
        let err = tx.insert_reception(pvz.id).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn delete_last_product_is_lifo() {
        let store = InMemoryEntityStore::new();
        let pvz = store.insert_pvz(City::Kazan).await.unwrap();

        let mut tx = store.begin().await.unwrap();
        let reception = tx.insert_reception(pvz.id).await.unwrap();
        let first = tx.insert_product(reception.id, ProductType::Electronics).await.unwrap();
        let second = tx.insert_product(reception.id, ProductType::Shoes).await.unwrap();
        assert!(second.added_at >= first.added_at);

        assert_eq!(tx.delete_last_product(reception.id).await.unwrap(), Some(second));
        assert_eq!(tx.delete_last_product(reception.id).await.unwrap(), Some(first));
        assert_eq!(tx.delete_last_product(reception.id).await.unwrap(), None);
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn closing_is_conditional_on_in_progress() {
        let store = InMemoryEntityStore::new();
        let pvz = store.insert_pvz(City::Moscow).await.unwrap();

        let mut tx = store.begin().await.unwrap();
        let reception = tx.insert_reception(pvz.id).await.unwrap();
        let closed = tx
            .update_reception_status(reception.id, ReceptionStatus::Closed)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(closed.status, ReceptionStatus::Closed);
        assert!(closed.closed_at.is_some());
        assert!(
            tx.update_reception_status(reception.id, ReceptionStatus::Closed)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn closed_reception_refuses_products() {
        let store = InMemoryEntityStore::new();
        let pvz = store.insert_pvz(City::SaintPetersburg).await.unwrap();

        let mut tx = store.begin().await.unwrap();
        let reception = tx.insert_reception(pvz.id).await.unwrap();
        tx.update_reception_status(reception.id, ReceptionStatus::Closed)
            .await
            .unwrap();

        let err = tx
            .insert_product(reception.id, ProductType::Clothing)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn users_are_unique_by_email() {
        let store = InMemoryEntityStore::new();
        let user = store
            .insert_user("kate@example.com", "$2b$04$hash", Role::Employee)
            .await
            .unwrap();

        let err = store
            .insert_user("kate@example.com", "$2b$04$other", Role::Moderator)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        let found = store.find_user_by_email("kate@example.com").await.unwrap();
        assert_eq!(found, Some(user));
        assert_eq!(store.find_user_by_email("nobody@example.com").await.unwrap(), None);
    }
}
