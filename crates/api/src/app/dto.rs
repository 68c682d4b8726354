use serde::Deserialize;

use sealforge_core::{CompanyId, SealTypeId};
use sealforge_seals::{GrantFilter, GrantStatus, GrantedSeal, Page, Pagination, SealType};

use crate::app::errors;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct RequestSealRequest {
    /// Defaults to the caller's own company.
    pub company_id: Option<CompanyId>,
    pub seal_type_id: SealTypeId,
    pub validity_years: u32,
}

#[derive(Debug, Deserialize)]
pub struct GrantSealRequest {
    pub seal_type_id: SealTypeId,
    pub validity_days: u32,
}

#[derive(Debug, Default, Deserialize)]
pub struct RejectRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateSealTypeRequest {
    pub name: String,
    pub abbreviation: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListSealsQuery {
    pub status: Option<String>,
    pub expiring_within_days: Option<u32>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl ListSealsQuery {
    pub fn filter(&self) -> Result<GrantFilter, axum::response::Response> {
        let status = match self.status.as_deref() {
            None | Some("") => None,
            Some(raw) => Some(GrantStatus::parse(raw).map_err(|_| {
                errors::json_error(
                    axum::http::StatusCode::BAD_REQUEST,
                    "invalid_status",
                    "status must be one of: pending, active, in_renewal, expired",
                )
            })?),
        };
        Ok(GrantFilter {
            status,
            expiring_within_days: self.expiring_within_days,
        })
    }

    pub fn page(&self) -> Pagination {
        Pagination::new(self.limit, self.offset)
    }
}

// -------------------------
// Response mapping
// -------------------------

pub fn grant_to_json(grant: &GrantedSeal) -> serde_json::Value {
    serde_json::json!({
        "id": grant.id_typed().to_string(),
        "company_id": grant.company_id().get(),
        "seal_type_id": grant.seal_type_id().to_string(),
        "status": grant.status().as_str(),
        "issued_on": grant.issued_on(),
        "expires_on": grant.expires_on(),
        "code": grant.code().map(|c| c.as_str()),
        "requested_validity_years": grant.requested_validity_years(),
        "rejection_reason": grant.rejection_reason(),
        "version": sealforge_core::AggregateRoot::version(grant),
        "created_at": grant.created_at(),
        "updated_at": grant.updated_at(),
    })
}

pub fn grant_page_to_json(page: Page<GrantedSeal>) -> serde_json::Value {
    let page = page.map(|g| grant_to_json(&g));
    serde_json::json!({
        "items": page.items,
        "total": page.total,
        "limit": page.limit,
        "offset": page.offset,
    })
}

pub fn seal_type_to_json(seal_type: &SealType) -> serde_json::Value {
    serde_json::json!({
        "id": seal_type.id_typed().to_string(),
        "name": seal_type.name(),
        "abbreviation": seal_type.abbreviation().as_str(),
        "description": seal_type.description(),
        "active": seal_type.is_active(),
        "created_at": seal_type.created_at(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn list_query_parses_status_and_clamps_limit() {
        let query = ListSealsQuery {
            status: Some("in_renewal".to_string()),
            limit: Some(10_000),
            ..Default::default()
        };
        assert_eq!(query.filter().unwrap().status, Some(GrantStatus::InRenewal));
        assert_eq!(query.page().limit, 200);

        let bad = ListSealsQuery {
            status: Some("revoked".to_string()),
            ..Default::default()
        };
        assert!(bad.filter().is_err());
    }

    #[test]
    fn pending_grant_json_has_null_dates_and_code() {
        let grant = GrantedSeal::request(
            CompanyId::new(7).unwrap(),
            SealTypeId::new(),
            2,
            Utc::now(),
        )
        .unwrap();
        let json = grant_to_json(&grant);
        assert_eq!(json["status"], "pending");
        assert_eq!(json["company_id"], 7);
        assert!(json["issued_on"].is_null());
        assert!(json["code"].is_null());
        assert_eq!(json["requested_validity_years"], 2);
        assert_eq!(json["version"], 1);
    }
}
