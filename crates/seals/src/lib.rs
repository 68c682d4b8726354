//! Seal catalog and seal-grant lifecycle (pure domain logic).
//!
//! No IO, no HTTP, no storage: services in `sealforge-infra` load state, run
//! the transitions defined here and persist the outcome.

pub mod code;
pub mod grant;
pub mod query;
pub mod seal_type;

pub use code::{RandomSuffixGenerator, ScriptedCodeGenerator, SealCode, SealCodeGenerator};
pub use grant::{
    DEFAULT_VALIDITY_DAYS, GrantCommand, GrantEvent, GrantParts, GrantStatus, GrantedSeal,
    MAX_VALIDITY_DAYS, MAX_VALIDITY_YEARS,
};
pub use query::{GrantFilter, Page, Pagination, company_listing_order, pending_order};
pub use seal_type::{Abbreviation, SealType};
