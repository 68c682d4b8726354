//! Seal-grant lifecycle orchestration.
//!
//! Every operation follows the same pipeline:
//!
//! ```text
//! authorize caller → load grant / catalog / company → pure transition
//!   → versioned write (compare-and-swap) → best-effort notice
//! ```
//!
//! Authorization runs before any lookup that could reveal whether another
//! company's records exist, except where the owner can only be known after
//! loading the grant.

use std::sync::Arc;

use tracing::{debug, error, info, instrument, warn};

use sealforge_auth::{Caller, require_administrator, require_company_access};
use sealforge_core::{Aggregate, AggregateRoot, Clock, CompanyId, ExpectedVersion, GrantId, SealTypeId};
use sealforge_seals::{
    GrantCommand, GrantedSeal, RandomSuffixGenerator, SealCodeGenerator, SealType,
};

use crate::error::{SealError, StoreError};
use crate::notifier::{GrantNotice, GrantNotifier, TracingNotifier};
use crate::store::{CompanyDirectory, GrantStore, SealTypeStore};

/// Application service for the grant state machine.
pub struct SealGrantService {
    grants: Arc<dyn GrantStore>,
    seal_types: Arc<dyn SealTypeStore>,
    companies: Arc<dyn CompanyDirectory>,
    codes: Arc<dyn SealCodeGenerator>,
    notifier: Arc<dyn GrantNotifier>,
    clock: Arc<dyn Clock>,
}

impl SealGrantService {
    pub fn new(
        grants: Arc<dyn GrantStore>,
        seal_types: Arc<dyn SealTypeStore>,
        companies: Arc<dyn CompanyDirectory>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            grants,
            seal_types,
            companies,
            codes: Arc::new(RandomSuffixGenerator),
            notifier: Arc::new(TracingNotifier),
            clock,
        }
    }

    pub fn with_code_generator(mut self, codes: Arc<dyn SealCodeGenerator>) -> Self {
        self.codes = codes;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn GrantNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// A company (or an administrator on its behalf) asks for a seal.
    #[instrument(
        skip(self, caller),
        fields(principal = %caller.principal_id(), company_id = %company_id, seal_type_id = %seal_type_id),
        err
    )]
    pub async fn request(
        &self,
        caller: &Caller,
        company_id: CompanyId,
        seal_type_id: SealTypeId,
        validity_years: u32,
    ) -> Result<GrantedSeal, SealError> {
        require_company_access(caller, company_id)?;
        self.ensure_company_active(company_id).await?;
        self.load_offered_seal_type(seal_type_id).await?;

        let grant = GrantedSeal::request(company_id, seal_type_id, validity_years, self.clock.now())?;
        self.grants
            .insert(&grant)
            .await
            .map_err(|e| store_failure("request", Some(grant.id_typed()), e))?;

        info!(grant_id = %grant.id_typed(), "seal requested");
        Ok(grant)
    }

    /// Administrator grants a seal directly; active immediately.
    #[instrument(
        skip(self, caller),
        fields(principal = %caller.principal_id(), company_id = %company_id, seal_type_id = %seal_type_id),
        err
    )]
    pub async fn grant(
        &self,
        caller: &Caller,
        company_id: CompanyId,
        seal_type_id: SealTypeId,
        validity_days: u32,
    ) -> Result<GrantedSeal, SealError> {
        require_administrator(caller)?;
        self.ensure_company_active(company_id).await?;
        let seal_type = self.load_offered_seal_type(seal_type_id).await?;

        let mut retried = false;
        loop {
            let code = self
                .codes
                .generate(seal_type.abbreviation(), self.clock.year(), company_id);
            let grant = GrantedSeal::grant(
                company_id,
                seal_type_id,
                validity_days,
                self.clock.today(),
                code,
                self.clock.now(),
            )?;

            match self.grants.insert(&grant).await {
                Ok(()) => {
                    info!(grant_id = %grant.id_typed(), "seal granted directly");
                    self.notify_approved(&grant);
                    return Ok(grant);
                }
                Err(StoreError::DuplicateCode(code)) if !retried => {
                    warn!(grant_id = %grant.id_typed(), code = %code, "seal code collision; retrying");
                    retried = true;
                }
                Err(e) => return Err(store_failure("grant", Some(grant.id_typed()), e)),
            }
        }
    }

    /// Activate a pending or in-renewal grant with fresh dates and code.
    #[instrument(skip(self, caller), fields(principal = %caller.principal_id(), grant_id = %id), err)]
    pub async fn approve(&self, caller: &Caller, id: GrantId) -> Result<GrantedSeal, SealError> {
        require_administrator(caller)?;
        let grant = self.load(id).await?;
        let seal_type = self
            .seal_types
            .get(grant.seal_type_id())
            .await
            .map_err(|e| store_failure("approve", Some(id), e))?
            .ok_or_else(|| SealError::not_found(format!("seal type {}", grant.seal_type_id())))?;

        let mut retried = false;
        loop {
            let code = self
                .codes
                .generate(seal_type.abbreviation(), self.clock.year(), grant.company_id());
            let command = GrantCommand::Approve {
                today: self.clock.today(),
                code,
                at: self.clock.now(),
            };
            let (next, events) = grant.execute(&command)?;

            match self.grants.update(&next, ExpectedVersion::Exact(grant.version())).await {
                Ok(()) => {
                    log_events(id, &events);
                    self.notify_approved(&next);
                    return Ok(next);
                }
                Err(StoreError::DuplicateCode(code)) if !retried => {
                    warn!(grant_id = %id, code = %code, "seal code collision; retrying");
                    retried = true;
                }
                Err(e) => return Err(store_failure("approve", Some(id), e)),
            }
        }
    }

    #[instrument(skip(self, caller, reason), fields(principal = %caller.principal_id(), grant_id = %id), err)]
    pub async fn reject(
        &self,
        caller: &Caller,
        id: GrantId,
        reason: Option<String>,
    ) -> Result<GrantedSeal, SealError> {
        require_administrator(caller)?;
        let grant = self.load(id).await?;
        let next = self
            .transition(&grant, GrantCommand::Reject { reason, at: self.clock.now() }, "reject")
            .await?;

        self.notifier.notify(GrantNotice::Rejected {
            grant_id: id,
            company_id: next.company_id(),
            reason: next.rejection_reason().map(str::to_string),
        });
        Ok(next)
    }

    /// Owner asks to renew an expired grant.
    #[instrument(skip(self, caller), fields(principal = %caller.principal_id(), grant_id = %id), err)]
    pub async fn request_renewal(&self, caller: &Caller, id: GrantId) -> Result<GrantedSeal, SealError> {
        let grant = self.load(id).await?;
        require_company_access(caller, grant.company_id())?;
        self.transition(
            &grant,
            GrantCommand::RequestRenewal { at: self.clock.now() },
            "request_renewal",
        )
        .await
    }

    #[instrument(skip(self, caller, reason), fields(principal = %caller.principal_id(), grant_id = %id), err)]
    pub async fn reject_renewal(
        &self,
        caller: &Caller,
        id: GrantId,
        reason: Option<String>,
    ) -> Result<GrantedSeal, SealError> {
        require_administrator(caller)?;
        let grant = self.load(id).await?;
        let next = self
            .transition(
                &grant,
                GrantCommand::RejectRenewal { reason, at: self.clock.now() },
                "reject_renewal",
            )
            .await?;

        self.notifier.notify(GrantNotice::RenewalRejected {
            grant_id: id,
            company_id: next.company_id(),
            reason: next.rejection_reason().map(str::to_string),
        });
        Ok(next)
    }

    /// Hard delete, regardless of status.
    #[instrument(skip(self, caller), fields(principal = %caller.principal_id(), grant_id = %id), err)]
    pub async fn revoke(&self, caller: &Caller, id: GrantId) -> Result<(), SealError> {
        require_administrator(caller)?;
        let grant = self.load(id).await?;

        let removed = self
            .grants
            .delete(id)
            .await
            .map_err(|e| store_failure("revoke", Some(id), e))?;
        if !removed {
            return Err(SealError::not_found(format!("grant {id}")));
        }

        info!(grant_id = %id, company_id = %grant.company_id(), "grant revoked");
        self.notifier.notify(GrantNotice::Revoked {
            grant_id: id,
            company_id: grant.company_id(),
        });
        Ok(())
    }

    /// Read one grant (owner or administrator).
    #[instrument(skip(self, caller), fields(principal = %caller.principal_id(), grant_id = %id), err)]
    pub async fn get(&self, caller: &Caller, id: GrantId) -> Result<GrantedSeal, SealError> {
        let grant = self.load(id).await?;
        require_company_access(caller, grant.company_id())?;
        Ok(grant)
    }

    /// Active grants past their expiration date, in id order after `after`.
    pub async fn overdue(
        &self,
        today: chrono::NaiveDate,
        after: Option<GrantId>,
        limit: u32,
    ) -> Result<Vec<GrantedSeal>, SealError> {
        self.grants
            .list_overdue(today, after, limit)
            .await
            .map_err(|e| store_failure("list_overdue", None, e))
    }

    /// Time-driven expiry of one overdue grant (system actor).
    #[instrument(skip(self, grant), fields(grant_id = %grant.id_typed(), today = %today), err)]
    pub async fn expire_overdue(
        &self,
        grant: &GrantedSeal,
        today: chrono::NaiveDate,
    ) -> Result<GrantedSeal, SealError> {
        let next = self
            .transition(grant, GrantCommand::Expire { today, at: self.clock.now() }, "expire")
            .await?;

        self.notifier.notify(GrantNotice::Expired {
            grant_id: next.id_typed(),
            company_id: next.company_id(),
        });
        Ok(next)
    }

    async fn load(&self, id: GrantId) -> Result<GrantedSeal, SealError> {
        self.grants
            .get(id)
            .await
            .map_err(|e| store_failure("load_grant", Some(id), e))?
            .ok_or_else(|| SealError::not_found(format!("grant {id}")))
    }

    async fn transition(
        &self,
        grant: &GrantedSeal,
        command: GrantCommand,
        operation: &'static str,
    ) -> Result<GrantedSeal, SealError> {
        let (next, events) = grant.execute(&command)?;
        self.grants
            .update(&next, ExpectedVersion::Exact(grant.version()))
            .await
            .map_err(|e| store_failure(operation, Some(grant.id_typed()), e))?;

        log_events(grant.id_typed(), &events);
        Ok(next)
    }

    async fn ensure_company_active(&self, company_id: CompanyId) -> Result<(), SealError> {
        let company = self
            .companies
            .find(company_id)
            .await
            .map_err(|e| store_failure("find_company", None, e))?
            .ok_or_else(|| SealError::not_found(format!("company {company_id}")))?;

        if !company.active {
            return Err(SealError::Validation(format!("company {company_id} is not active")));
        }
        Ok(())
    }

    async fn load_offered_seal_type(&self, id: SealTypeId) -> Result<SealType, SealError> {
        let seal_type = self
            .seal_types
            .get(id)
            .await
            .map_err(|e| store_failure("load_seal_type", None, e))?
            .ok_or_else(|| SealError::not_found(format!("seal type {id}")))?;
        seal_type.ensure_active()?;
        Ok(seal_type)
    }

    fn notify_approved(&self, grant: &GrantedSeal) {
        if let Some(code) = grant.code() {
            self.notifier.notify(GrantNotice::Approved {
                grant_id: grant.id_typed(),
                company_id: grant.company_id(),
                code: code.clone(),
            });
        }
    }
}

fn log_events(grant_id: GrantId, events: &[sealforge_seals::GrantEvent]) {
    for event in events {
        debug!(grant_id = %grant_id, event = event.event_type(), "grant transition");
    }
}

/// Convert a store error, logging backend detail that clients never see.
pub(crate) fn store_failure(
    operation: &'static str,
    grant_id: Option<GrantId>,
    err: StoreError,
) -> SealError {
    if matches!(err, StoreError::Backend(_) | StoreError::DuplicateCode(_)) {
        match grant_id {
            Some(id) => error!(operation, grant_id = %id, error = %err, "storage failure"),
            None => error!(operation, error = %err, "storage failure"),
        }
    }
    SealError::from(err)
}
