//! API-side resolution of the company a request acts on.
//!
//! The services make the actual allow/deny decision; this only fills in the
//! target company when the body leaves it out.

use sealforge_core::CompanyId;

use crate::context::CallerContext;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetCompanyError {
    /// Administrators without a bound company must name one.
    Unspecified,
}

/// Company named in the body, else the caller's own company.
pub fn target_company(
    caller: &CallerContext,
    requested: Option<CompanyId>,
) -> Result<CompanyId, TargetCompanyError> {
    requested
        .or(caller.company_id())
        .ok_or(TargetCompanyError::Unspecified)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sealforge_auth::Caller;

    #[test]
    fn company_actor_defaults_to_own_company() {
        let seven = CompanyId::new(7).unwrap();
        let ctx = CallerContext::new(Caller::company_actor(seven));
        assert_eq!(target_company(&ctx, None), Ok(seven));

        // An explicit (foreign) company is passed through for the guard to reject.
        let eight = CompanyId::new(8).unwrap();
        assert_eq!(target_company(&ctx, Some(eight)), Ok(eight));
    }

    #[test]
    fn administrator_must_name_a_company() {
        let ctx = CallerContext::new(Caller::administrator());
        assert_eq!(target_company(&ctx, None), Err(TargetCompanyError::Unspecified));
    }
}
