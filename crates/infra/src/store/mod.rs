//! Storage ports and their in-memory / Postgres implementations.
//!
//! Every store is `Send + Sync` and shared behind `Arc<dyn ...>`. The
//! invariants that need atomicity live here, not in services:
//!
//! - `GrantStore::insert` checks the open-pair rule and inserts in one step.
//! - `GrantStore::update` is a compare-and-swap on the grant version.
//! - Seal codes and seal-type names/abbreviations are unique.

pub mod in_memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::NaiveDate;

use sealforge_core::{CompanyId, ExpectedVersion, GrantId, SealTypeId};
use sealforge_seals::{GrantFilter, GrantedSeal, Page, Pagination, SealType};

use crate::error::StoreError;

pub use in_memory::{InMemoryCompanyDirectory, InMemoryGrantStore, InMemorySealTypeStore};
pub use postgres::{
    PostgresCompanyDirectory, PostgresGrantStore, PostgresSealTypeStore, apply_schema,
};

/// Grant persistence.
#[async_trait]
pub trait GrantStore: Send + Sync {
    /// Insert a new grant. Fails with `DuplicateOpenGrant` when the company
    /// already has an open grant for the seal type, `DuplicateCode` when the
    /// code is taken.
    async fn insert(&self, grant: &GrantedSeal) -> Result<(), StoreError>;

    async fn get(&self, id: GrantId) -> Result<Option<GrantedSeal>, StoreError>;

    /// Replace a grant's mutable fields if the stored version matches.
    async fn update(&self, grant: &GrantedSeal, expected: ExpectedVersion) -> Result<(), StoreError>;

    /// Hard delete. Returns whether a row was removed.
    async fn delete(&self, id: GrantId) -> Result<bool, StoreError>;

    /// Grants of one company, `expires_on DESC NULLS LAST` then `created_at`.
    async fn list_for_company(
        &self,
        company_id: CompanyId,
        filter: GrantFilter,
        today: NaiveDate,
        page: Pagination,
    ) -> Result<Page<GrantedSeal>, StoreError>;

    /// Pending and in-renewal grants, oldest first.
    async fn list_awaiting_review(&self) -> Result<Vec<GrantedSeal>, StoreError>;

    /// Active grants with `expires_on < today`, ordered by id, strictly after
    /// `after` (keyset pagination).
    async fn list_overdue(
        &self,
        today: NaiveDate,
        after: Option<GrantId>,
        limit: u32,
    ) -> Result<Vec<GrantedSeal>, StoreError>;
}

/// Seal catalog persistence.
#[async_trait]
pub trait SealTypeStore: Send + Sync {
    /// Fails with `DuplicateSealType` on a name or abbreviation clash.
    async fn insert(&self, seal_type: &SealType) -> Result<(), StoreError>;

    async fn get(&self, id: SealTypeId) -> Result<Option<SealType>, StoreError>;

    /// All seal types ordered by name.
    async fn list(&self) -> Result<Vec<SealType>, StoreError>;

    /// Soft-deactivate. Returns whether the seal type exists.
    async fn deactivate(&self, id: SealTypeId) -> Result<bool, StoreError>;
}

/// Company as seen through the external registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanyRecord {
    pub id: CompanyId,
    pub name: String,
    pub active: bool,
}

/// Read-only view onto the company registry.
#[async_trait]
pub trait CompanyDirectory: Send + Sync {
    async fn find(&self, id: CompanyId) -> Result<Option<CompanyRecord>, StoreError>;
}
