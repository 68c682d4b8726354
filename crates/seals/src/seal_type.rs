use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use sealforge_core::{DomainError, DomainResult, Entity, SealTypeId, ValueObject};

pub const MAX_NAME_LEN: usize = 100;
pub const MAX_ABBREVIATION_LEN: usize = 10;
pub const MAX_DESCRIPTION_LEN: usize = 1000;

/// Seal abbreviation ("sigla"), e.g. `ECO`.
///
/// Stored upper-cased; 1-10 ASCII alphanumerics. It prefixes every grant code
/// issued for the seal type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Abbreviation(String);

impl Abbreviation {
    pub fn parse(raw: &str) -> DomainResult<Self> {
        let value = raw.trim().to_ascii_uppercase();
        if value.is_empty() {
            return Err(DomainError::validation("abbreviation must not be empty"));
        }
        if value.len() > MAX_ABBREVIATION_LEN {
            return Err(DomainError::validation(format!(
                "abbreviation must be at most {MAX_ABBREVIATION_LEN} characters"
            )));
        }
        if !value.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(DomainError::validation(
                "abbreviation may only contain letters and digits",
            ));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl ValueObject for Abbreviation {}

impl core::fmt::Display for Abbreviation {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Abbreviation {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Abbreviation> for String {
    fn from(value: Abbreviation) -> Self {
        value.0
    }
}

/// Catalog entry: a certification category companies can hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealType {
    id: SealTypeId,
    name: String,
    abbreviation: Abbreviation,
    description: String,
    active: bool,
    created_at: DateTime<Utc>,
}

impl SealType {
    /// Validate and build a new, active seal type.
    pub fn new(
        name: &str,
        abbreviation: &str,
        description: &str,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DomainError::validation("name must not be empty"));
        }
        if name.chars().count() > MAX_NAME_LEN {
            return Err(DomainError::validation(format!(
                "name must be at most {MAX_NAME_LEN} characters"
            )));
        }

        let description = description.trim();
        if description.chars().count() > MAX_DESCRIPTION_LEN {
            return Err(DomainError::validation(format!(
                "description must be at most {MAX_DESCRIPTION_LEN} characters"
            )));
        }

        Ok(Self {
            id: SealTypeId::new(),
            name: name.to_string(),
            abbreviation: Abbreviation::parse(abbreviation)?,
            description: description.to_string(),
            active: true,
            created_at: now,
        })
    }

    /// Rebuild a seal type from storage without re-running validation.
    pub fn restore(
        id: SealTypeId,
        name: String,
        abbreviation: Abbreviation,
        description: String,
        active: bool,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name,
            abbreviation,
            description,
            active,
            created_at,
        }
    }

    pub fn id_typed(&self) -> SealTypeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn abbreviation(&self) -> &Abbreviation {
        &self.abbreviation
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Fails when the type may no longer be requested or granted.
    pub fn ensure_active(&self) -> DomainResult<()> {
        if self.active {
            Ok(())
        } else {
            Err(DomainError::validation(format!(
                "seal type '{}' is no longer offered",
                self.abbreviation
            )))
        }
    }

    /// Soft-deactivate. Idempotent; existing grants are unaffected.
    pub fn deactivate(&mut self) {
        self.active = false;
    }

    /// Case-insensitive clash on name or abbreviation.
    pub fn clashes_with(&self, other: &SealType) -> bool {
        self.abbreviation == other.abbreviation || self.name.eq_ignore_ascii_case(&other.name)
    }
}

impl Entity for SealType {
    type Id = SealTypeId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
