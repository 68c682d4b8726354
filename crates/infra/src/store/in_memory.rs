use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::NaiveDate;

use sealforge_core::{AggregateRoot, CompanyId, ExpectedVersion, GrantId, SealTypeId};
use sealforge_seals::{
    GrantFilter, GrantedSeal, Page, Pagination, SealType, company_listing_order, pending_order,
};

use super::{CompanyDirectory, CompanyRecord, GrantStore, SealTypeStore};
use crate::error::StoreError;

fn read<T>(lock: &RwLock<T>) -> Result<RwLockReadGuard<'_, T>, StoreError> {
    lock.read()
        .map_err(|_| StoreError::Backend("lock poisoned".to_string()))
}

fn write<T>(lock: &RwLock<T>) -> Result<RwLockWriteGuard<'_, T>, StoreError> {
    lock.write()
        .map_err(|_| StoreError::Backend("lock poisoned".to_string()))
}

/// In-memory grant store.
///
/// Intended for tests/dev. A single write lock makes every check-then-write
/// atomic.
#[derive(Debug, Default)]
pub struct InMemoryGrantStore {
    grants: RwLock<HashMap<GrantId, GrantedSeal>>,
}

impl InMemoryGrantStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn check_unique(
        grants: &HashMap<GrantId, GrantedSeal>,
        candidate: &GrantedSeal,
    ) -> Result<(), StoreError> {
        let id = candidate.id_typed();
        for other in grants.values().filter(|g| g.id_typed() != id) {
            if candidate.status().is_open()
                && other.status().is_open()
                && other.company_id() == candidate.company_id()
                && other.seal_type_id() == candidate.seal_type_id()
            {
                return Err(StoreError::DuplicateOpenGrant(format!(
                    "company {} / seal type {}",
                    candidate.company_id(),
                    candidate.seal_type_id()
                )));
            }
            if let (Some(a), Some(b)) = (candidate.code(), other.code()) {
                if a == b {
                    return Err(StoreError::DuplicateCode(a.to_string()));
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl GrantStore for InMemoryGrantStore {
    async fn insert(&self, grant: &GrantedSeal) -> Result<(), StoreError> {
        let mut grants = write(&self.grants)?;
        if grants.contains_key(&grant.id_typed()) {
            return Err(StoreError::Concurrency(format!(
                "grant {} already exists",
                grant.id_typed()
            )));
        }
        Self::check_unique(&grants, grant)?;
        grants.insert(grant.id_typed(), grant.clone());
        Ok(())
    }

    async fn get(&self, id: GrantId) -> Result<Option<GrantedSeal>, StoreError> {
        Ok(read(&self.grants)?.get(&id).cloned())
    }

    async fn update(&self, grant: &GrantedSeal, expected: ExpectedVersion) -> Result<(), StoreError> {
        let mut grants = write(&self.grants)?;
        let current = grants.get(&grant.id_typed()).ok_or(StoreError::NotFound)?;

        if !expected.matches(current.version()) {
            return Err(StoreError::Concurrency(format!(
                "expected {expected:?}, found {}",
                current.version()
            )));
        }

        Self::check_unique(&grants, grant)?;
        grants.insert(grant.id_typed(), grant.clone());
        Ok(())
    }

    async fn delete(&self, id: GrantId) -> Result<bool, StoreError> {
        Ok(write(&self.grants)?.remove(&id).is_some())
    }

    async fn list_for_company(
        &self,
        company_id: CompanyId,
        filter: GrantFilter,
        today: NaiveDate,
        page: Pagination,
    ) -> Result<Page<GrantedSeal>, StoreError> {
        let grants = read(&self.grants)?;
        let mut matching: Vec<GrantedSeal> = grants
            .values()
            .filter(|g| g.company_id() == company_id && filter.matches(g, today))
            .cloned()
            .collect();
        drop(grants);

        matching.sort_by(company_listing_order);
        let total = matching.len() as u64;
        let items = matching
            .into_iter()
            .skip(page.offset as usize)
            .take(page.limit as usize)
            .collect();

        Ok(Page {
            items,
            total,
            limit: page.limit,
            offset: page.offset,
        })
    }

    async fn list_awaiting_review(&self) -> Result<Vec<GrantedSeal>, StoreError> {
        let mut queue: Vec<GrantedSeal> = read(&self.grants)?
            .values()
            .filter(|g| g.status().awaits_review())
            .cloned()
            .collect();
        queue.sort_by(pending_order);
        Ok(queue)
    }

    async fn list_overdue(
        &self,
        today: NaiveDate,
        after: Option<GrantId>,
        limit: u32,
    ) -> Result<Vec<GrantedSeal>, StoreError> {
        let mut overdue: Vec<GrantedSeal> = read(&self.grants)?
            .values()
            .filter(|g| g.is_overdue(today))
            .filter(|g| after.is_none_or(|a| g.id_typed() > a))
            .cloned()
            .collect();
        overdue.sort_by_key(|g| g.id_typed());
        overdue.truncate(limit as usize);
        Ok(overdue)
    }
}

/// In-memory seal catalog.
#[derive(Debug, Default)]
pub struct InMemorySealTypeStore {
    seal_types: RwLock<HashMap<SealTypeId, SealType>>,
}

impl InMemorySealTypeStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SealTypeStore for InMemorySealTypeStore {
    async fn insert(&self, seal_type: &SealType) -> Result<(), StoreError> {
        let mut seal_types = write(&self.seal_types)?;
        if let Some(existing) = seal_types.values().find(|s| s.clashes_with(seal_type)) {
            return Err(StoreError::DuplicateSealType(format!(
                "a seal type named '{}' ({}) already exists",
                existing.name(),
                existing.abbreviation()
            )));
        }
        seal_types.insert(seal_type.id_typed(), seal_type.clone());
        Ok(())
    }

    async fn get(&self, id: SealTypeId) -> Result<Option<SealType>, StoreError> {
        Ok(read(&self.seal_types)?.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<SealType>, StoreError> {
        let mut all: Vec<SealType> = read(&self.seal_types)?.values().cloned().collect();
        all.sort_by(|a, b| a.name().cmp(b.name()).then_with(|| a.id_typed().cmp(&b.id_typed())));
        Ok(all)
    }

    async fn deactivate(&self, id: SealTypeId) -> Result<bool, StoreError> {
        let mut seal_types = write(&self.seal_types)?;
        let Some(seal_type) = seal_types.get_mut(&id) else {
            return Ok(false);
        };
        seal_type.deactivate();
        Ok(true)
    }
}

/// In-memory company registry, seeded by tests and the dev server.
#[derive(Debug, Default)]
pub struct InMemoryCompanyDirectory {
    companies: RwLock<HashMap<CompanyId, CompanyRecord>>,
}

impl InMemoryCompanyDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&self, record: CompanyRecord) -> Result<(), StoreError> {
        write(&self.companies)?.insert(record.id, record);
        Ok(())
    }

    /// Convenience for seeding: an active company with a generated name.
    pub fn with_active(self, ids: impl IntoIterator<Item = CompanyId>) -> Result<Self, StoreError> {
        for id in ids {
            self.upsert(CompanyRecord {
                id,
                name: format!("Company {id}"),
                active: true,
            })?;
        }
        Ok(self)
    }
}

#[async_trait]
impl CompanyDirectory for InMemoryCompanyDirectory {
    async fn find(&self, id: CompanyId) -> Result<Option<CompanyRecord>, StoreError> {
        Ok(read(&self.companies)?.get(&id).cloned())
    }
}
