//! Postgres-backed entity store.
//!
//! ## Concurrency
//!
//! Every lifecycle mutation first takes `SELECT … FOR UPDATE` on its PVZ row,
//! so check-then-write sequences for one PVZ run one at a time. The partial
//! unique index `receptions_one_in_progress` backs this up for writers that
//! skip the lock: a second in-progress insert fails with `23505`, surfaced as
//! [`StoreError::Conflict`].
//!
//! Last-product retraction is a single `DELETE … WHERE id = (SELECT … LIMIT 1
//! FOR UPDATE) RETURNING`, so the row chosen is the row deleted.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Code | StoreError |
//! |------------|-----------------|------------|
//! | Database (unique violation) | `23505` | `Conflict` |
//! | Database (other) | any | `Backend` |
//! | PoolClosed / Io / Tls / timeouts | N/A | `Backend` |
//! | ColumnDecode / ColumnNotFound | N/A | `Corrupt` |

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{FromRow, PgPool, Postgres, Row, Transaction};
use tracing::{Span, instrument};
use uuid::Uuid;

use pvz_auth::{Role, User};
use pvz_core::{ProductId, PvzId, ReceptionId, UserId};
use pvz_directory::{City, OverviewRow, Pvz, PvzListQuery, PvzOverview, group_rows};
use pvz_receptions::{Product, ProductType, Reception, ReceptionStatus};

use super::schema::SCHEMA_V1;
use super::{EntityStore, StoreError, StoreTransaction};

const RECEPTION_COLUMNS: &str = "id, pvz_id, opened_at, status, closed_at";
const PRODUCT_COLUMNS: &str = "id, reception_id, product_type, added_at";
const USER_COLUMNS: &str = "id, email, password_hash, role";

/// Postgres-backed entity store.
///
/// `Send + Sync`; clones share one connection pool.
#[derive(Debug, Clone)]
pub struct PostgresEntityStore {
    pool: Arc<PgPool>,
}

impl PostgresEntityStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Open a pool against `url` and apply the schema.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        let store = Self::new(pool);
        store.ensure_schema().await?;
        Ok(store)
    }

    /// Create missing tables and indexes. Safe to run repeatedly.
    #[instrument(skip(self), err)]
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA_V1)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        Ok(())
    }
}

#[async_trait]
impl EntityStore for PostgresEntityStore {
    #[instrument(skip(self), err)]
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, StoreError> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;
        Ok(Box::new(PostgresTransaction { tx }))
    }

    #[instrument(skip(self), fields(city = %city), err)]
    async fn insert_pvz(&self, city: City) -> Result<Pvz, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO pvz (id, city)
            VALUES ($1, $2)
            RETURNING id, city, registration_date
            "#,
        )
        .bind(PvzId::new().as_uuid())
        .bind(city.as_str())
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_pvz", e))?;

        let pvz = PvzRow::from_row(&row).map_err(|e| map_sqlx_error("insert_pvz", e))?;
        pvz.try_into()
    }

    #[instrument(
        skip(self, query),
        fields(
            page = query.page(),
            limit = query.limit(),
            row_count = tracing::field::Empty
        ),
        err
    )]
    async fn query_pvzs_with_receptions(
        &self,
        query: &PvzListQuery,
    ) -> Result<Vec<PvzOverview>, StoreError> {
        // The date window sits in the join condition: it narrows receptions,
        // never PVZs.
        let rows = sqlx::query(
            r#"
            WITH page AS (
                SELECT id, city, registration_date
                FROM pvz
                ORDER BY registration_date, id
                LIMIT $1 OFFSET $2
            )
            SELECT
                page.id               AS pvz_id,
                page.city             AS city,
                page.registration_date AS registration_date,
                r.id                  AS reception_id,
                r.opened_at           AS opened_at,
                r.status              AS status,
                r.closed_at           AS closed_at,
                p.id                  AS product_id,
                p.product_type        AS product_type,
                p.added_at            AS added_at
            FROM page
            LEFT JOIN receptions r
                ON r.pvz_id = page.id
               AND ($3::timestamptz IS NULL OR r.opened_at >= $3)
               AND ($4::timestamptz IS NULL OR r.opened_at <= $4)
            LEFT JOIN products p
                ON p.reception_id = r.id
            ORDER BY page.registration_date, page.id, r.opened_at, r.id, p.added_at, p.seq
            "#,
        )
        .bind(i64::from(query.limit()))
        .bind(i64::try_from(query.offset()).unwrap_or(i64::MAX))
        .bind(query.start_date())
        .bind(query.end_date())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("query_pvzs_with_receptions", e))?;

        Span::current().record("row_count", rows.len());

        let mut flat: Vec<OverviewRow> = Vec::with_capacity(rows.len());
        for row in rows {
            let record = OverviewRecord::from_row(&row)
                .map_err(|e| map_sqlx_error("query_pvzs_with_receptions", e))?;
            flat.push(record.try_into()?);
        }

        Ok(group_rows(flat))
    }

    #[instrument(skip(self, email, password_hash), fields(role = %role), err)]
    async fn insert_user(
        &self,
        email: &str,
        password_hash: &str,
        role: Role,
    ) -> Result<User, StoreError> {
        let row = sqlx::query(&format!(
            "INSERT INTO users (id, email, password_hash, role) VALUES ($1, $2, $3, $4) RETURNING {USER_COLUMNS}"
        ))
        .bind(UserId::new().as_uuid())
        .bind(email)
        .bind(password_hash)
        .bind(role.as_str())
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_user", e))?;

        let user = UserRow::from_row(&row).map_err(|e| map_sqlx_error("insert_user", e))?;
        user.try_into()
    }

    #[instrument(skip(self, email), err)]
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_user_by_email", e))?;

        match row {
            Some(row) => {
                let user = UserRow::from_row(&row)
                    .map_err(|e| map_sqlx_error("find_user_by_email", e))?;
                Ok(Some(user.try_into()?))
            }
            None => Ok(None),
        }
    }
}

struct PostgresTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTransaction for PostgresTransaction {
    #[instrument(skip(self), fields(pvz_id = %pvz_id), err)]
    async fn lock_pvz(&mut self, pvz_id: PvzId) -> Result<bool, StoreError> {
        let row = sqlx::query("SELECT id FROM pvz WHERE id = $1 FOR UPDATE")
            .bind(pvz_id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("lock_pvz", e))?;
        Ok(row.is_some())
    }

    #[instrument(skip(self), fields(pvz_id = %pvz_id), err)]
    async fn find_in_progress_reception(
        &mut self,
        pvz_id: PvzId,
    ) -> Result<Option<Reception>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {RECEPTION_COLUMNS} FROM receptions WHERE pvz_id = $1 AND status = 'in_progress'"
        ))
        .bind(pvz_id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("find_in_progress_reception", e))?;

        row.map(|r| decode_reception(&r, "find_in_progress_reception"))
            .transpose()
    }

    #[instrument(skip(self), fields(pvz_id = %pvz_id), err)]
    async fn insert_reception(&mut self, pvz_id: PvzId) -> Result<Reception, StoreError> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO receptions (id, pvz_id, status)
            VALUES ($1, $2, 'in_progress')
            RETURNING {RECEPTION_COLUMNS}
            "#
        ))
        .bind(ReceptionId::new().as_uuid())
        .bind(pvz_id.as_uuid())
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_reception", e))?;

        decode_reception(&row, "insert_reception")
    }

    #[instrument(
        skip(self),
        fields(reception_id = %reception_id, product_type = %product_type),
        err
    )]
    async fn insert_product(
        &mut self,
        reception_id: ReceptionId,
        product_type: ProductType,
    ) -> Result<Product, StoreError> {
        // GREATEST ignores the NULL max of an empty reception.
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO products (id, reception_id, product_type, added_at)
            SELECT $1::uuid, $2::uuid, $3::text, GREATEST(clock_timestamp(), MAX(added_at))
            FROM products
            WHERE reception_id = $2
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(ProductId::new().as_uuid())
        .bind(reception_id.as_uuid())
        .bind(product_type.as_str())
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_product", e))?;

        decode_product(&row, "insert_product")
    }

    #[instrument(skip(self), fields(reception_id = %reception_id), err)]
    async fn delete_last_product(
        &mut self,
        reception_id: ReceptionId,
    ) -> Result<Option<Product>, StoreError> {
        let row = sqlx::query(&format!(
            r#"
            DELETE FROM products
            WHERE id = (
                SELECT id
                FROM products
                WHERE reception_id = $1
                ORDER BY added_at DESC, seq DESC
                LIMIT 1
                FOR UPDATE
            )
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(reception_id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("delete_last_product", e))?;

        row.map(|r| decode_product(&r, "delete_last_product"))
            .transpose()
    }

    #[instrument(skip(self), fields(reception_id = %reception_id, status = %status), err)]
    async fn update_reception_status(
        &mut self,
        reception_id: ReceptionId,
        status: ReceptionStatus,
    ) -> Result<Option<Reception>, StoreError> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE receptions
            SET status = $2::text,
                closed_at = CASE WHEN $2::text = 'closed' THEN clock_timestamp() ELSE closed_at END
            WHERE id = $1 AND status = 'in_progress'
            RETURNING {RECEPTION_COLUMNS}
            "#
        ))
        .bind(reception_id.as_uuid())
        .bind(status.as_str())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("update_reception_status", e))?;

        row.map(|r| decode_reception(&r, "update_reception_status"))
            .transpose()
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx
            .commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))
    }
}

/// Map SQLx errors to store errors, tagged with the failing operation.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::Conflict(msg),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Backend(format!("connection pool closed in {}", operation))
        }
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::ColumnNotFound(_) => {
            StoreError::Corrupt(format!("failed to decode row in {}: {}", operation, err))
        }
        _ => StoreError::Backend(format!("sqlx error in {}: {}", operation, err)),
    }
}

fn decode_reception(row: &PgRow, operation: &str) -> Result<Reception, StoreError> {
    ReceptionRow::from_row(row)
        .map_err(|e| map_sqlx_error(operation, e))?
        .try_into()
}

fn decode_product(row: &PgRow, operation: &str) -> Result<Product, StoreError> {
    ProductRow::from_row(row)
        .map_err(|e| map_sqlx_error(operation, e))?
        .try_into()
}

// SQLx row types

#[derive(Debug)]
struct PvzRow {
    id: Uuid,
    city: String,
    registration_date: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for PvzRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(PvzRow {
            id: row.try_get("id")?,
            city: row.try_get("city")?,
            registration_date: row.try_get("registration_date")?,
        })
    }
}

impl TryFrom<PvzRow> for Pvz {
    type Error = StoreError;

    fn try_from(row: PvzRow) -> Result<Self, Self::Error> {
        Ok(Pvz {
            id: PvzId::from_uuid(row.id),
            city: parse_city(&row.city)?,
            registration_date: row.registration_date,
        })
    }
}

#[derive(Debug)]
struct ReceptionRow {
    id: Uuid,
    pvz_id: Uuid,
    opened_at: DateTime<Utc>,
    status: String,
    closed_at: Option<DateTime<Utc>>,
}

impl<'r> FromRow<'r, PgRow> for ReceptionRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(ReceptionRow {
            id: row.try_get("id")?,
            pvz_id: row.try_get("pvz_id")?,
            opened_at: row.try_get("opened_at")?,
            status: row.try_get("status")?,
            closed_at: row.try_get("closed_at")?,
        })
    }
}

impl TryFrom<ReceptionRow> for Reception {
    type Error = StoreError;

    fn try_from(row: ReceptionRow) -> Result<Self, Self::Error> {
        Ok(Reception {
            id: ReceptionId::from_uuid(row.id),
            pvz_id: PvzId::from_uuid(row.pvz_id),
            opened_at: row.opened_at,
            status: parse_status(&row.status)?,
            closed_at: row.closed_at,
        })
    }
}

#[derive(Debug)]
struct ProductRow {
    id: Uuid,
    reception_id: Uuid,
    product_type: String,
    added_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for ProductRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(ProductRow {
            id: row.try_get("id")?,
            reception_id: row.try_get("reception_id")?,
            product_type: row.try_get("product_type")?,
            added_at: row.try_get("added_at")?,
        })
    }
}

impl TryFrom<ProductRow> for Product {
    type Error = StoreError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        Ok(Product {
            id: ProductId::from_uuid(row.id),
            reception_id: ReceptionId::from_uuid(row.reception_id),
            product_type: parse_product_type(&row.product_type)?,
            added_at: row.added_at,
        })
    }
}

#[derive(Debug)]
struct UserRow {
    id: Uuid,
    email: String,
    password_hash: String,
    role: String,
}

impl<'r> FromRow<'r, PgRow> for UserRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(UserRow {
            id: row.try_get("id")?,
            email: row.try_get("email")?,
            password_hash: row.try_get("password_hash")?,
            role: row.try_get("role")?,
        })
    }
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: UserId::from_uuid(row.id),
            email: row.email,
            role: parse_role(&row.role)?,
            password_hash: row.password_hash,
        })
    }
}

/// One row of the listing join; reception and product columns are NULL when
/// the left join found nothing.
#[derive(Debug)]
struct OverviewRecord {
    pvz: PvzRow,
    reception_id: Option<Uuid>,
    opened_at: Option<DateTime<Utc>>,
    status: Option<String>,
    closed_at: Option<DateTime<Utc>>,
    product_id: Option<Uuid>,
    product_type: Option<String>,
    added_at: Option<DateTime<Utc>>,
}

impl<'r> FromRow<'r, PgRow> for OverviewRecord {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(OverviewRecord {
            pvz: PvzRow {
                id: row.try_get("pvz_id")?,
                city: row.try_get("city")?,
                registration_date: row.try_get("registration_date")?,
            },
            reception_id: row.try_get("reception_id")?,
            opened_at: row.try_get("opened_at")?,
            status: row.try_get("status")?,
            closed_at: row.try_get("closed_at")?,
            product_id: row.try_get("product_id")?,
            product_type: row.try_get("product_type")?,
            added_at: row.try_get("added_at")?,
        })
    }
}

impl TryFrom<OverviewRecord> for OverviewRow {
    type Error = StoreError;

    fn try_from(record: OverviewRecord) -> Result<Self, Self::Error> {
        let pvz: Pvz = record.pvz.try_into()?;

        let reception = match (record.reception_id, record.opened_at, record.status) {
            (Some(id), Some(opened_at), Some(status)) => Some(Reception {
                id: ReceptionId::from_uuid(id),
                pvz_id: pvz.id,
                opened_at,
                status: parse_status(&status)?,
                closed_at: record.closed_at,
            }),
            (None, _, _) => None,
            _ => {
                return Err(StoreError::Corrupt(
                    "reception row with missing columns".to_string(),
                ));
            }
        };

        let product = match (&reception, record.product_id, record.product_type, record.added_at) {
            (Some(r), Some(id), Some(product_type), Some(added_at)) => Some(Product {
                id: ProductId::from_uuid(id),
                reception_id: r.id,
                product_type: parse_product_type(&product_type)?,
                added_at,
            }),
            (_, None, _, _) => None,
            _ => {
                return Err(StoreError::Corrupt(
                    "product row with missing columns".to_string(),
                ));
            }
        };

        Ok(OverviewRow {
            pvz,
            reception,
            product,
        })
    }
}

fn parse_city(raw: &str) -> Result<City, StoreError> {
    raw.parse()
        .map_err(|_| StoreError::Corrupt(format!("unknown city '{raw}'")))
}

fn parse_status(raw: &str) -> Result<ReceptionStatus, StoreError> {
    ReceptionStatus::parse(raw)
        .ok_or_else(|| StoreError::Corrupt(format!("unknown reception status '{raw}'")))
}

fn parse_role(raw: &str) -> Result<Role, StoreError> {
    raw.parse()
        .map_err(|_| StoreError::Corrupt(format!("unknown role '{raw}'")))
}

fn parse_product_type(raw: &str) -> Result<ProductType, StoreError> {
    raw.parse()
        .map_err(|_| StoreError::Corrupt(format!("unknown product type '{raw}'")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pvz_row(city: &str) -> PvzRow {
        PvzRow {
            id: Uuid::now_v7(),
            city: city.to_string(),
            registration_date: Utc::now(),
        }
    }

    #[test]
    fn unknown_stored_values_are_corrupt() {
        let err = Pvz::try_from(pvz_row("Атлантида")).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt(_)));
        assert!(matches!(parse_status("reopened"), Err(StoreError::Corrupt(_))));
    }

    #[test]
    fn user_row_with_unknown_role_is_corrupt() {
        let row = UserRow {
            id: Uuid::now_v7(),
            email: "ann@example.com".to_string(),
            password_hash: "$2b$04$hash".to_string(),
            role: "admin".to_string(),
        };
        assert!(matches!(User::try_from(row), Err(StoreError::Corrupt(_))));
    }

    #[test]
    fn pool_closed_is_a_backend_failure() {
        let err = map_sqlx_error("lock_pvz", sqlx::Error::PoolClosed);
        match err {
            StoreError::Backend(msg) => assert!(msg.contains("lock_pvz")),
            other => panic!("expected Backend, got {other:?}"),
        }
    }

    #[test]
    fn pvz_without_receptions_decodes_to_bare_row() {
        let record = OverviewRecord {
            pvz: pvz_row("Москва"),
            reception_id: None,
            opened_at: None,
            status: None,
            closed_at: None,
            product_id: None,
            product_type: None,
            added_at: None,
        };
        let row = OverviewRow::try_from(record).unwrap();
        assert_eq!(row.pvz.city, City::Moscow);
        assert!(row.reception.is_none());
        assert!(row.product.is_none());
    }

    #[test]
    fn half_present_reception_columns_are_corrupt() {
        let record = OverviewRecord {
            pvz: pvz_row("Казань"),
            reception_id: Some(Uuid::now_v7()),
            opened_at: None,
            status: Some("in_progress".to_string()),
            closed_at: None,
            product_id: None,
            product_type: None,
            added_at: None,
        };
        assert!(matches!(OverviewRow::try_from(record), Err(StoreError::Corrupt(_))));
    }
}
