use serde::Serialize;
use thiserror::Error;

use sealforge_core::CompanyId;

use crate::Caller;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: administrator permission required")]
    AdministratorRequired,

    #[error("forbidden: caller may not act on company {0}")]
    CompanyMismatch(CompanyId),
}

/// Whether the caller holds a platform administration permission.
pub fn is_administrator(caller: &Caller) -> bool {
    caller.permissions().iter().any(|p| p.is_administrative())
}

/// Administrators may act on any company; everyone else only on their own.
///
/// - No IO
/// - No panics
pub fn can_act_on_company(caller: &Caller, company_id: CompanyId) -> bool {
    is_administrator(caller) || caller.company_id() == Some(company_id)
}

pub fn require_administrator(caller: &Caller) -> Result<(), AuthzError> {
    if is_administrator(caller) {
        Ok(())
    } else {
        Err(AuthzError::AdministratorRequired)
    }
}

pub fn require_company_access(caller: &Caller, company_id: CompanyId) -> Result<(), AuthzError> {
    if can_act_on_company(caller, company_id) {
        Ok(())
    } else {
        Err(AuthzError::CompanyMismatch(company_id))
    }
}

/// Snapshot of what the caller is allowed to do (served by `/whoami`).
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizationSummary {
    pub principal_id: String,
    pub company_id: Option<CompanyId>,
    pub permissions: Vec<String>,
    pub administrator: bool,
}

impl AuthorizationSummary {
    pub fn of(caller: &Caller) -> Self {
        Self {
            principal_id: caller.principal_id().to_string(),
            company_id: caller.company_id(),
            permissions: caller
                .permissions()
                .iter()
                .map(|p| p.as_str().to_string())
                .collect(),
            administrator: is_administrator(caller),
        }
    }
}
