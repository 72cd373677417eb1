//! PVZ directory service: registration and the paged overview listing.

use chrono::{DateTime, Utc};
use tracing::{info, instrument};

use pvz_directory::{City, PageLimits, Pvz, PvzListQuery, PvzOverview};

use crate::deadline::Deadline;
use crate::engine::log_failure;
use crate::error::ServiceError;
use crate::store::EntityStore;

#[derive(Debug, Clone)]
pub struct PvzDirectory<S> {
    store: S,
    limits: PageLimits,
}

impl<S> PvzDirectory<S>
where
    S: EntityStore,
{
    pub fn new(store: S, limits: PageLimits) -> Self {
        Self { store, limits }
    }

    /// Register a PVZ in `city`. Cities are not unique.
    #[instrument(skip(self, deadline), fields(city = %city))]
    pub async fn create_pvz(&self, city: City, deadline: Deadline) -> Result<Pvz, ServiceError> {
        const OP: &str = "create_pvz";

        let result = deadline
            .run(OP, async {
                self.store
                    .insert_pvz(city)
                    .await
                    .map_err(ServiceError::store(OP))
            })
            .await;

        if let Ok(pvz) = &result {
            info!(pvz_id = %pvz.id, "pvz registered");
        }
        log_failure(OP, &result);
        result
    }

    /// One page of PVZs with the receptions opened within
    /// `[start_date, end_date]` and their products.
    ///
    /// Omitted `page`/`limit` fall back to page 1 and the configured default
    /// size. The window narrows receptions only; PVZs without a matching
    /// reception are listed with an empty reception list.
    #[instrument(skip(self, deadline), fields(pvz_count = tracing::field::Empty))]
    pub async fn list_pvzs(
        &self,
        start_date: Option<DateTime<Utc>>,
        end_date: Option<DateTime<Utc>>,
        page: Option<u32>,
        limit: Option<u32>,
        deadline: Deadline,
    ) -> Result<Vec<PvzOverview>, ServiceError> {
        const OP: &str = "list_pvzs";

        let result = match PvzListQuery::new(start_date, end_date, page, limit, &self.limits) {
            Ok(query) => {
                deadline
                    .run(OP, async {
                        self.store
                            .query_pvzs_with_receptions(&query)
                            .await
                            .map_err(ServiceError::store(OP))
                    })
                    .await
            }
            Err(e) => Err(e.into()),
        };

        if let Ok(overviews) = &result {
            tracing::Span::current().record("pvz_count", overviews.len());
        }
        log_failure(OP, &result);
        result
    }
}
