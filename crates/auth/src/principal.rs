use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sealforge_core::CompanyId;

use crate::{JwtClaims, Permission};

/// Identity of an authenticated principal (human user, service account, etc).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrincipalId(Uuid);

impl PrincipalId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for PrincipalId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl From<Uuid> for PrincipalId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl FromStr for PrincipalId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::from_str(s)?))
    }
}

/// An already-authenticated caller, as seen by authorization decisions.
///
/// Only the permission set and the bound company matter to the guard; token
/// validity was settled before a `Caller` exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    principal_id: PrincipalId,
    company_id: Option<CompanyId>,
    permissions: Vec<Permission>,
}

impl Caller {
    pub fn new(
        principal_id: PrincipalId,
        company_id: Option<CompanyId>,
        permissions: Vec<Permission>,
    ) -> Self {
        Self {
            principal_id,
            company_id,
            permissions,
        }
    }

    /// Caller holding the `admin` permission and no company binding.
    pub fn administrator() -> Self {
        Self::new(PrincipalId::new(), None, vec![Permission::ADMIN])
    }

    /// Caller acting for a single company.
    pub fn company_actor(company_id: CompanyId) -> Self {
        Self::new(PrincipalId::new(), Some(company_id), vec![Permission::COMPANY])
    }

    pub fn principal_id(&self) -> PrincipalId {
        self.principal_id
    }

    pub fn company_id(&self) -> Option<CompanyId> {
        self.company_id
    }

    pub fn permissions(&self) -> &[Permission] {
        &self.permissions
    }
}

impl From<&JwtClaims> for Caller {
    fn from(claims: &JwtClaims) -> Self {
        Self::new(claims.sub, claims.company_id, claims.permissions.clone())
    }
}
