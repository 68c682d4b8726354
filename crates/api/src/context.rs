use sealforge_auth::{Caller, Permission, PrincipalId};
use sealforge_core::CompanyId;

/// Authenticated caller for a request.
///
/// Inserted by the auth middleware; immutable for the lifetime of the request
/// and present on every protected route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerContext {
    caller: Caller,
}

impl CallerContext {
    pub fn new(caller: Caller) -> Self {
        Self { caller }
    }

    pub fn caller(&self) -> &Caller {
        &self.caller
    }

    pub fn principal_id(&self) -> PrincipalId {
        self.caller.principal_id()
    }

    /// Company the token is bound to, if any.
    pub fn company_id(&self) -> Option<CompanyId> {
        self.caller.company_id()
    }

    pub fn permissions(&self) -> &[Permission] {
        self.caller.permissions()
    }
}
