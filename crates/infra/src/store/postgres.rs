//! Postgres-backed stores.
//!
//! All statements are parameterized. Uniqueness invariants are enforced by
//! the schema in `sql/schema.sql`; this module only translates the resulting
//! errors.
//!
//! ## Error Mapping
//!
//! | SQLx error | Constraint | StoreError |
//! |------------|------------|------------|
//! | `23505` unique violation | `granted_seals_open_pair_uidx` | `DuplicateOpenGrant` |
//! | `23505` unique violation | `granted_seals_code_key` | `DuplicateCode` |
//! | `23505` unique violation | `seal_types_*` | `DuplicateSealType` |
//! | `23505` on the primary key | | `Concurrency` |
//! | anything else | | `Backend` |

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::{Span, instrument};
use uuid::Uuid;

use sealforge_core::{AggregateRoot, CompanyId, ExpectedVersion, GrantId, SealTypeId};
use sealforge_seals::{
    Abbreviation, GrantFilter, GrantParts, GrantStatus, GrantedSeal, Page, Pagination, SealCode,
    SealType,
};

use super::{CompanyDirectory, CompanyRecord, GrantStore, SealTypeStore};
use crate::error::StoreError;

const SCHEMA: &str = include_str!("../../sql/schema.sql");

const OPEN_PAIR_INDEX: &str = "granted_seals_open_pair_uidx";
const CODE_CONSTRAINT: &str = "granted_seals_code_key";

const GRANT_COLUMNS: &str = r#"
    id, company_id, seal_type_id, status, issued_on, expires_on, code,
    requested_validity_years, rejection_reason, version, created_at, updated_at
"#;

/// Create tables and indexes if they do not exist yet.
pub async fn apply_schema(pool: &PgPool) -> Result<(), StoreError> {
    sqlx::raw_sql(SCHEMA)
        .execute(pool)
        .await
        .map_err(|e| map_sqlx_error("apply_schema", e))?;
    Ok(())
}

/// Postgres grant store.
#[derive(Debug, Clone)]
pub struct PostgresGrantStore {
    pool: Arc<PgPool>,
}

impl PostgresGrantStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

#[async_trait]
impl GrantStore for PostgresGrantStore {
    #[instrument(
        skip(self, grant),
        fields(grant_id = %grant.id_typed(), company_id = %grant.company_id()),
        err
    )]
    async fn insert(&self, grant: &GrantedSeal) -> Result<(), StoreError> {
        let row = GrantRow::from(grant);

        sqlx::query(
            r#"
            INSERT INTO granted_seals (
                id, company_id, seal_type_id, status, issued_on, expires_on, code,
                requested_validity_years, rejection_reason, version, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(row.id)
        .bind(row.company_id)
        .bind(row.seal_type_id)
        .bind(&row.status)
        .bind(row.issued_on)
        .bind(row.expires_on)
        .bind(&row.code)
        .bind(row.requested_validity_years)
        .bind(&row.rejection_reason)
        .bind(row.version)
        .bind(row.created_at)
        .bind(row.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_grant", e))?;

        Ok(())
    }

    #[instrument(skip(self), fields(grant_id = %id), err)]
    async fn get(&self, id: GrantId) -> Result<Option<GrantedSeal>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {GRANT_COLUMNS} FROM granted_seals WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_grant", e))?;

        row.map(|r| decode_grant(&r)).transpose()
    }

    /// Single-statement compare-and-swap on `version`.
    #[instrument(
        skip(self, grant),
        fields(grant_id = %grant.id_typed(), expected = ?expected, status = %grant.status()),
        err
    )]
    async fn update(&self, grant: &GrantedSeal, expected: ExpectedVersion) -> Result<(), StoreError> {
        let row = GrantRow::from(grant);
        let expected_version: Option<i64> = match expected {
            ExpectedVersion::Any => None,
            ExpectedVersion::Exact(v) => Some(to_i64(v)?),
        };

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let result = sqlx::query(
            r#"
            UPDATE granted_seals
            SET status = $2,
                issued_on = $3,
                expires_on = $4,
                code = $5,
                rejection_reason = $6,
                version = $7,
                updated_at = $8
            WHERE id = $1
              AND ($9::bigint IS NULL OR version = $9)
            "#,
        )
        .bind(row.id)
        .bind(&row.status)
        .bind(row.issued_on)
        .bind(row.expires_on)
        .bind(&row.code)
        .bind(&row.rejection_reason)
        .bind(row.version)
        .bind(row.updated_at)
        .bind(expected_version)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("update_grant", e))?;

        if result.rows_affected() == 0 {
            let current: Option<i64> =
                sqlx::query_scalar("SELECT version FROM granted_seals WHERE id = $1")
                    .bind(row.id)
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(|e| map_sqlx_error("check_grant_version", e))?;

            tx.rollback()
                .await
                .map_err(|e| map_sqlx_error("rollback", e))?;

            return Err(match current {
                None => StoreError::NotFound,
                Some(found) => StoreError::Concurrency(format!(
                    "expected {expected:?}, found {found}"
                )),
            });
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(grant_id = %id), err)]
    async fn delete(&self, id: GrantId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM granted_seals WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_grant", e))?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self), fields(company_id = %company_id, row_count), err)]
    async fn list_for_company(
        &self,
        company_id: CompanyId,
        filter: GrantFilter,
        today: NaiveDate,
        page: Pagination,
    ) -> Result<Page<GrantedSeal>, StoreError> {
        let status_param: Option<&str> = filter.status.map(|s| s.as_str());
        let within_param: Option<i32> = filter
            .expiring_within_days
            .map(|d| i32::try_from(d).unwrap_or(i32::MAX));

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM granted_seals
            WHERE company_id = $1
              AND ($2::text IS NULL OR status = $2)
              AND ($3::int IS NULL OR (expires_on >= $4::date AND expires_on <= $4::date + $3::int))
            "#,
        )
        .bind(company_id.get())
        .bind(status_param)
        .bind(within_param)
        .bind(today)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("count_company_grants", e))?;

        let rows = sqlx::query(&format!(
            r#"
            SELECT {GRANT_COLUMNS}
            FROM granted_seals
            WHERE company_id = $1
              AND ($2::text IS NULL OR status = $2)
              AND ($3::int IS NULL OR (expires_on >= $4::date AND expires_on <= $4::date + $3::int))
            ORDER BY expires_on DESC NULLS LAST, created_at ASC, id ASC
            LIMIT $5 OFFSET $6
            "#
        ))
        .bind(company_id.get())
        .bind(status_param)
        .bind(within_param)
        .bind(today)
        .bind(i64::from(page.limit))
        .bind(i64::from(page.offset))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_company_grants", e))?;

        Span::current().record("row_count", rows.len());

        Ok(Page {
            items: rows.iter().map(decode_grant).collect::<Result<_, _>>()?,
            total: u64::try_from(total).unwrap_or_default(),
            limit: page.limit,
            offset: page.offset,
        })
    }

    #[instrument(skip(self), err)]
    async fn list_awaiting_review(&self) -> Result<Vec<GrantedSeal>, StoreError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {GRANT_COLUMNS}
            FROM granted_seals
            WHERE status IN ('pending', 'in_renewal')
            ORDER BY created_at ASC, id ASC
            "#
        ))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_awaiting_review", e))?;

        rows.iter().map(decode_grant).collect()
    }

    #[instrument(skip(self), fields(today = %today), err)]
    async fn list_overdue(
        &self,
        today: NaiveDate,
        after: Option<GrantId>,
        limit: u32,
    ) -> Result<Vec<GrantedSeal>, StoreError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {GRANT_COLUMNS}
            FROM granted_seals
            WHERE status = 'active'
              AND expires_on < $1
              AND ($2::uuid IS NULL OR id > $2)
            ORDER BY id ASC
            LIMIT $3
            "#
        ))
        .bind(today)
        .bind(after.map(|a| *a.as_uuid()))
        .bind(i64::from(limit))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_overdue", e))?;

        rows.iter().map(decode_grant).collect()
    }
}

/// Postgres seal catalog.
#[derive(Debug, Clone)]
pub struct PostgresSealTypeStore {
    pool: Arc<PgPool>,
}

impl PostgresSealTypeStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

#[async_trait]
impl SealTypeStore for PostgresSealTypeStore {
    #[instrument(skip(self, seal_type), fields(abbreviation = %seal_type.abbreviation()), err)]
    async fn insert(&self, seal_type: &SealType) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO seal_types (id, name, abbreviation, description, active, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(seal_type.id_typed().as_uuid())
        .bind(seal_type.name())
        .bind(seal_type.abbreviation().as_str())
        .bind(seal_type.description())
        .bind(seal_type.is_active())
        .bind(seal_type.created_at())
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_seal_type", e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(seal_type_id = %id), err)]
    async fn get(&self, id: SealTypeId) -> Result<Option<SealType>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, name, abbreviation, description, active, created_at
            FROM seal_types
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_seal_type", e))?;

        row.map(|r| decode_seal_type(&r)).transpose()
    }

    #[instrument(skip(self), err)]
    async fn list(&self) -> Result<Vec<SealType>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, abbreviation, description, active, created_at
            FROM seal_types
            ORDER BY name ASC, id ASC
            "#,
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_seal_types", e))?;

        rows.iter().map(decode_seal_type).collect()
    }

    #[instrument(skip(self), fields(seal_type_id = %id), err)]
    async fn deactivate(&self, id: SealTypeId) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE seal_types SET active = FALSE WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("deactivate_seal_type", e))?;
        Ok(result.rows_affected() > 0)
    }
}

/// Reads the `companies` table kept in sync with the company registry.
#[derive(Debug, Clone)]
pub struct PostgresCompanyDirectory {
    pool: Arc<PgPool>,
}

impl PostgresCompanyDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

#[async_trait]
impl CompanyDirectory for PostgresCompanyDirectory {
    #[instrument(skip(self), fields(company_id = %id), err)]
    async fn find(&self, id: CompanyId) -> Result<Option<CompanyRecord>, StoreError> {
        let row = sqlx::query("SELECT id, name, active FROM companies WHERE id = $1")
            .bind(id.get())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_company", e))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let raw_id: i64 = row.try_get("id").map_err(decode_error)?;
        Ok(Some(CompanyRecord {
            id: CompanyId::new(raw_id).map_err(|e| StoreError::Backend(e.to_string()))?,
            name: row.try_get("name").map_err(decode_error)?,
            active: row.try_get("active").map_err(decode_error)?,
        }))
    }
}

// Row mapping

#[derive(Debug)]
struct GrantRow {
    id: Uuid,
    company_id: i64,
    seal_type_id: Uuid,
    status: String,
    issued_on: Option<NaiveDate>,
    expires_on: Option<NaiveDate>,
    code: Option<String>,
    requested_validity_years: Option<i32>,
    rejection_reason: Option<String>,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<&GrantedSeal> for GrantRow {
    fn from(grant: &GrantedSeal) -> Self {
        Self {
            id: *grant.id_typed().as_uuid(),
            company_id: grant.company_id().get(),
            seal_type_id: *grant.seal_type_id().as_uuid(),
            status: grant.status().as_str().to_string(),
            issued_on: grant.issued_on(),
            expires_on: grant.expires_on(),
            code: grant.code().map(|c| c.as_str().to_string()),
            requested_validity_years: grant
                .requested_validity_years()
                .and_then(|y| i32::try_from(y).ok()),
            rejection_reason: grant.rejection_reason().map(str::to_string),
            version: i64::try_from(grant.version()).unwrap_or(i64::MAX),
            created_at: grant.created_at(),
            updated_at: grant.updated_at(),
        }
    }
}

impl<'r> sqlx::FromRow<'r, PgRow> for GrantRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(GrantRow {
            id: row.try_get("id")?,
            company_id: row.try_get("company_id")?,
            seal_type_id: row.try_get("seal_type_id")?,
            status: row.try_get("status")?,
            issued_on: row.try_get("issued_on")?,
            expires_on: row.try_get("expires_on")?,
            code: row.try_get("code")?,
            requested_validity_years: row.try_get("requested_validity_years")?,
            rejection_reason: row.try_get("rejection_reason")?,
            version: row.try_get("version")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl TryFrom<GrantRow> for GrantedSeal {
    type Error = StoreError;

    fn try_from(row: GrantRow) -> Result<Self, Self::Error> {
        let corrupt = |e: sealforge_core::DomainError| {
            StoreError::Backend(format!("corrupt grant row {}: {e}", row.id))
        };

        let parts = GrantParts {
            id: GrantId::from_uuid(row.id),
            company_id: CompanyId::new(row.company_id).map_err(corrupt)?,
            seal_type_id: SealTypeId::from_uuid(row.seal_type_id),
            status: GrantStatus::parse(&row.status).map_err(corrupt)?,
            issued_on: row.issued_on,
            expires_on: row.expires_on,
            code: row.code.clone().map(SealCode::from_stored).transpose().map_err(corrupt)?,
            requested_validity_years: row
                .requested_validity_years
                .and_then(|y| u32::try_from(y).ok()),
            rejection_reason: row.rejection_reason.clone(),
            version: u64::try_from(row.version).unwrap_or_default(),
            created_at: row.created_at,
            updated_at: row.updated_at,
        };

        GrantedSeal::restore(parts).map_err(corrupt)
    }
}

fn decode_grant(row: &PgRow) -> Result<GrantedSeal, StoreError> {
    let row = <GrantRow as sqlx::FromRow<PgRow>>::from_row(row).map_err(decode_error)?;
    GrantedSeal::try_from(row)
}

fn decode_seal_type(row: &PgRow) -> Result<SealType, StoreError> {
    let id: Uuid = row.try_get("id").map_err(decode_error)?;
    let abbreviation: String = row.try_get("abbreviation").map_err(decode_error)?;
    Ok(SealType::restore(
        SealTypeId::from_uuid(id),
        row.try_get("name").map_err(decode_error)?,
        Abbreviation::parse(&abbreviation)
            .map_err(|e| StoreError::Backend(format!("corrupt seal type row {id}: {e}")))?,
        row.try_get("description").map_err(decode_error)?,
        row.try_get("active").map_err(decode_error)?,
        row.try_get("created_at").map_err(decode_error)?,
    ))
}

fn decode_error(err: sqlx::Error) -> StoreError {
    StoreError::Backend(format!("failed to decode row: {err}"))
}

fn to_i64(v: u64) -> Result<i64, StoreError> {
    i64::try_from(v).map_err(|_| StoreError::Backend(format!("version {v} out of range")))
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {operation}: {}", db_err.message());
            if db_err.code().as_deref() != Some("23505") {
                return StoreError::Backend(msg);
            }

            match db_err.constraint() {
                Some(OPEN_PAIR_INDEX) => StoreError::DuplicateOpenGrant(msg),
                Some(CODE_CONSTRAINT) => StoreError::DuplicateCode(msg),
                Some(c) if c.starts_with("seal_types_") => StoreError::DuplicateSealType(
                    "a seal type with this name or abbreviation already exists".to_string(),
                ),
                _ => StoreError::Concurrency(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Backend(format!("connection pool closed in {operation}"))
        }
        other => StoreError::Backend(format!("sqlx error in {operation}: {other}")),
    }
}

#[cfg(test)]
mod tests {
    //! Run with `DATABASE_URL=postgres://... cargo test -- --ignored`.

    use super::*;
    use chrono::Duration;
    use sealforge_core::Aggregate;
    use sealforge_seals::GrantCommand;

    async fn pool() -> PgPool {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let pool = PgPool::connect(&url).await.expect("connect");
        apply_schema(&pool).await.expect("schema");
        pool
    }

    async fn seed_seal_type(pool: &PgPool) -> SealType {
        let abbr = format!("T{}", &Uuid::now_v7().simple().to_string()[22..31]).to_uppercase();
        let seal_type = SealType::new(&format!("Type {abbr}"), &abbr, "", Utc::now()).unwrap();
        PostgresSealTypeStore::new(pool.clone())
            .insert(&seal_type)
            .await
            .unwrap();
        seal_type
    }

    fn company() -> CompanyId {
        CompanyId::new(7).unwrap()
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL"]
    async fn open_pair_index_rejects_second_request() {
        let pool = pool().await;
        let seal_type = seal_type_id(&pool).await;
        let store = PostgresGrantStore::new(pool);

        let first = GrantedSeal::request(company(), seal_type, 1, Utc::now()).unwrap();
        store.insert(&first).await.unwrap();

        let second = GrantedSeal::request(company(), seal_type, 1, Utc::now()).unwrap();
        match store.insert(&second).await {
            Err(StoreError::DuplicateOpenGrant(_)) => {}
            other => panic!("expected duplicate open grant, got {other:?}"),
        }

        assert!(store.delete(first.id_typed()).await.unwrap());
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL"]
    async fn update_is_a_version_compare_and_swap() {
        let pool = pool().await;
        let seal_type = seal_type_id(&pool).await;
        let store = PostgresGrantStore::new(pool);

        let grant = GrantedSeal::request(company(), seal_type, 1, Utc::now()).unwrap();
        store.insert(&grant).await.unwrap();

        let (rejected, _) = grant
            .execute(&GrantCommand::Reject {
                reason: Some("missing audit".into()),
                at: Utc::now(),
            })
            .unwrap();
        store
            .update(&rejected, ExpectedVersion::Exact(grant.version()))
            .await
            .unwrap();

        match store.update(&rejected, ExpectedVersion::Exact(grant.version())).await {
            Err(StoreError::Concurrency(_)) => {}
            other => panic!("expected concurrency error, got {other:?}"),
        }

        let loaded = store.get(grant.id_typed()).await.unwrap().unwrap();
        assert_eq!(loaded.status(), GrantStatus::Expired);
        assert_eq!(loaded.rejection_reason(), Some("missing audit"));
        assert_eq!(loaded.version(), 2);

        store.delete(grant.id_typed()).await.unwrap();
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL"]
    async fn overdue_listing_and_date_filter() {
        let pool = pool().await;
        let seal_type = seed_seal_type(&pool).await;
        let store = PostgresGrantStore::new(pool);

        let today = Utc::now().date_naive();
        let code = SealCode::compose(
            seal_type.abbreviation(),
            2026,
            company(),
            &sealforge_seals::RandomSuffixGenerator::suffix(),
        );
        let grant =
            GrantedSeal::grant(company(), seal_type.id_typed(), 10, today, code, Utc::now())
                .unwrap();
        store.insert(&grant).await.unwrap();

        let overdue = store
            .list_overdue(today + Duration::days(11), None, 1000)
            .await
            .unwrap();
        assert!(overdue.iter().any(|g| g.id_typed() == grant.id_typed()));

        let expiring = store
            .list_for_company(
                company(),
                GrantFilter {
                    status: Some(GrantStatus::Active),
                    expiring_within_days: Some(10),
                },
                today,
                Pagination::default(),
            )
            .await
            .unwrap();
        assert!(expiring.items.iter().any(|g| g.id_typed() == grant.id_typed()));

        store.delete(grant.id_typed()).await.unwrap();
    }

    async fn seal_type_id(pool: &PgPool) -> SealTypeId {
        seed_seal_type(pool).await.id_typed()
    }
}
