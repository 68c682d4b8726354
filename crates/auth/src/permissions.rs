use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Permission identifier.
///
/// Permissions are opaque strings carried in the token (e.g. "empresa",
/// "admin"). Only the administrator capabilities carry meaning in this crate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    /// Platform administrator.
    pub const ADMIN: Permission = Permission(Cow::Borrowed("admin"));
    /// Super administrator (manages other administrators).
    pub const ADMIN_MASTER: Permission = Permission(Cow::Borrowed("admin_master"));
    /// Company-scoped actor.
    pub const COMPANY: Permission = Permission(Cow::Borrowed("empresa"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this permission grants platform-wide administration.
    pub fn is_administrative(&self) -> bool {
        self == &Self::ADMIN || self == &Self::ADMIN_MASTER
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_admin_permissions_are_administrative() {
        assert!(Permission::new("admin").is_administrative());
        assert!(Permission::new("admin_master").is_administrative());
        assert!(!Permission::new("empresa").is_administrative());
        assert!(!Permission::new("Admin").is_administrative());
    }

    #[test]
    fn serializes_as_plain_string() {
        let json = serde_json::to_string(&Permission::ADMIN).unwrap();
        assert_eq!(json, "\"admin\"");
    }
}
