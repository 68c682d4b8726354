//! Seal catalog administration.

use std::sync::Arc;

use tracing::{info, instrument};

use sealforge_auth::{Caller, require_administrator};
use sealforge_core::{Clock, SealTypeId};
use sealforge_seals::SealType;

use crate::error::{SealError, StoreError};
use crate::grant_service::store_failure;
use crate::store::SealTypeStore;

pub struct SealCatalogService {
    store: Arc<dyn SealTypeStore>,
    clock: Arc<dyn Clock>,
}

impl SealCatalogService {
    pub fn new(store: Arc<dyn SealTypeStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    #[instrument(skip(self, caller, description), fields(principal = %caller.principal_id()), err)]
    pub async fn create(
        &self,
        caller: &Caller,
        name: &str,
        abbreviation: &str,
        description: &str,
    ) -> Result<SealType, SealError> {
        require_administrator(caller)?;
        let seal_type = SealType::new(name, abbreviation, description, self.clock.now())?;

        match self.store.insert(&seal_type).await {
            Ok(()) => {}
            Err(StoreError::DuplicateSealType(detail)) => {
                return Err(SealError::Conflict(format!(
                    "a seal type with this name or abbreviation already exists ({detail})"
                )));
            }
            Err(e) => return Err(store_failure("create_seal_type", None, e)),
        }

        info!(
            seal_type_id = %seal_type.id_typed(),
            abbreviation = %seal_type.abbreviation(),
            "seal type created"
        );
        Ok(seal_type)
    }

    /// Every seal type, active or not, ordered by name.
    pub async fn list(&self) -> Result<Vec<SealType>, SealError> {
        self.store
            .list()
            .await
            .map_err(|e| store_failure("list_seal_types", None, e))
    }

    pub async fn get(&self, id: SealTypeId) -> Result<SealType, SealError> {
        self.store
            .get(id)
            .await
            .map_err(|e| store_failure("get_seal_type", None, e))?
            .ok_or_else(|| SealError::not_found(format!("seal type {id}")))
    }

    /// Withdraw a seal type from offer. Existing grants are untouched.
    #[instrument(skip(self, caller), fields(principal = %caller.principal_id(), seal_type_id = %id), err)]
    pub async fn deactivate(&self, caller: &Caller, id: SealTypeId) -> Result<SealType, SealError> {
        require_administrator(caller)?;
        let found = self
            .store
            .deactivate(id)
            .await
            .map_err(|e| store_failure("deactivate_seal_type", None, e))?;
        if !found {
            return Err(SealError::not_found(format!("seal type {id}")));
        }

        info!(seal_type_id = %id, "seal type deactivated");
        self.get(id).await
    }
}
