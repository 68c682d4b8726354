//! Storage and service error taxonomy.

use thiserror::Error;

use sealforge_auth::AuthzError;
use sealforge_core::DomainError;

/// Failure reported by a store implementation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,

    /// A second open grant for the same (company, seal type).
    #[error("duplicate open grant: {0}")]
    DuplicateOpenGrant(String),

    #[error("duplicate seal code: {0}")]
    DuplicateCode(String),

    #[error("duplicate seal type: {0}")]
    DuplicateSealType(String),

    /// Version compare-and-swap lost against a concurrent writer.
    #[error("optimistic concurrency check failed: {0}")]
    Concurrency(String),

    /// Connectivity, decoding or any other backend failure.
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Service-level error, mapped 1:1 onto HTTP statuses by the API.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SealError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    InvalidTransition(String),

    /// Detail stays in logs; clients only see a generic message.
    #[error("storage failure: {0}")]
    Storage(String),
}

impl SealError {
    pub fn not_found(what: impl core::fmt::Display) -> Self {
        Self::NotFound(format!("{what} not found"))
    }
}

impl From<DomainError> for SealError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => SealError::Validation(msg),
            e @ DomainError::InvalidTransition { .. } => SealError::InvalidTransition(e.to_string()),
            DomainError::NotFound => SealError::NotFound("not found".to_string()),
            DomainError::Conflict(msg) => SealError::Conflict(msg),
        }
    }
}

impl From<AuthzError> for SealError {
    fn from(value: AuthzError) -> Self {
        SealError::Forbidden(value.to_string())
    }
}

impl From<StoreError> for SealError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound => SealError::NotFound("not found".to_string()),
            StoreError::DuplicateOpenGrant(_) => SealError::Conflict(
                "company already holds an open grant for this seal type".to_string(),
            ),
            StoreError::DuplicateSealType(msg) => SealError::Conflict(msg),
            StoreError::Concurrency(_) => {
                SealError::Conflict("grant was modified concurrently; retry".to_string())
            }
            e @ (StoreError::DuplicateCode(_) | StoreError::Backend(_)) => {
                SealError::Storage(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sealforge_core::CompanyId;

    #[test]
    fn domain_errors_map_to_service_errors() {
        assert!(matches!(
            SealError::from(DomainError::validation("bad")),
            SealError::Validation(_)
        ));
        match SealError::from(DomainError::invalid_transition("active", "approve")) {
            SealError::InvalidTransition(msg) => {
                assert_eq!(msg, "cannot approve a grant in status 'active'")
            }
            other => panic!("expected invalid transition, got {other:?}"),
        }
        assert!(matches!(
            SealError::from(DomainError::conflict("x")),
            SealError::Conflict(_)
        ));
    }

    #[test]
    fn store_errors_map_to_service_errors() {
        assert!(matches!(
            SealError::from(StoreError::DuplicateOpenGrant("x".into())),
            SealError::Conflict(_)
        ));
        assert!(matches!(
            SealError::from(StoreError::Concurrency("x".into())),
            SealError::Conflict(_)
        ));
        assert!(matches!(
            SealError::from(StoreError::Backend("boom".into())),
            SealError::Storage(_)
        ));
        assert!(matches!(SealError::from(StoreError::NotFound), SealError::NotFound(_)));
    }

    #[test]
    fn authz_errors_are_forbidden() {
        let err = SealError::from(AuthzError::CompanyMismatch(CompanyId::new(7).unwrap()));
        assert!(matches!(err, SealError::Forbidden(_)));
    }
}
