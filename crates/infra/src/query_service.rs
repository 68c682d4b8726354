//! Read-side queries over grants.

use std::sync::Arc;

use tracing::instrument;

use sealforge_auth::{Caller, require_administrator, require_company_access};
use sealforge_core::{Clock, CompanyId};
use sealforge_seals::{GrantFilter, GrantedSeal, Page, Pagination};

use crate::error::SealError;
use crate::grant_service::store_failure;
use crate::store::GrantStore;

/// Upper bound for `expiring_within_days`; keeps `today + n` representable.
pub const MAX_EXPIRY_WINDOW_DAYS: u32 = 36_500;

pub struct GrantQueryService {
    grants: Arc<dyn GrantStore>,
    clock: Arc<dyn Clock>,
}

impl GrantQueryService {
    pub fn new(grants: Arc<dyn GrantStore>, clock: Arc<dyn Clock>) -> Self {
        Self { grants, clock }
    }

    /// One company's grants, newest expiry first.
    #[instrument(skip(self, caller), fields(principal = %caller.principal_id(), company_id = %company_id), err)]
    pub async fn list_for_company(
        &self,
        caller: &Caller,
        company_id: CompanyId,
        filter: GrantFilter,
        page: Pagination,
    ) -> Result<Page<GrantedSeal>, SealError> {
        require_company_access(caller, company_id)?;
        if let Some(days) = filter.expiring_within_days {
            if days > MAX_EXPIRY_WINDOW_DAYS {
                return Err(SealError::Validation(format!(
                    "expiring_within_days must be at most {MAX_EXPIRY_WINDOW_DAYS}"
                )));
            }
        }

        self.grants
            .list_for_company(company_id, filter, self.clock.today(), page)
            .await
            .map_err(|e| store_failure("list_for_company", None, e))
    }

    /// Review queue: pending and in-renewal grants, oldest first.
    #[instrument(skip(self, caller), fields(principal = %caller.principal_id()), err)]
    pub async fn list_pending(&self, caller: &Caller) -> Result<Vec<GrantedSeal>, SealError> {
        require_administrator(caller)?;
        self.grants
            .list_awaiting_review()
            .await
            .map_err(|e| store_failure("list_pending", None, e))
    }
}
