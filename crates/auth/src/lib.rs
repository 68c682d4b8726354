//! `sealforge-auth`: pure authentication/authorization boundary.
//!
//! This crate is intentionally decoupled from HTTP and storage: it turns
//! verified token claims into a [`Caller`] and answers "may this caller act
//! on that company?".

pub mod authorize;
pub mod claims;
pub mod permissions;
pub mod principal;

pub use authorize::{
    AuthorizationSummary, AuthzError, can_act_on_company, is_administrator,
    require_administrator, require_company_access,
};
pub use claims::{Hs256JwtValidator, JwtClaims, JwtValidator, TokenValidationError, validate_claims};
pub use permissions::Permission;
pub use principal::{Caller, PrincipalId};
