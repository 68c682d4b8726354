//! Grant codes: `{abbreviation}-{year}-{companyId}-{suffix}`.

use std::collections::VecDeque;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sealforge_core::{CompanyId, DomainError, DomainResult, ValueObject};

use crate::Abbreviation;

/// Length of the random code suffix, in hex characters.
pub const SUFFIX_LEN: usize = 10;

/// Public identifier printed on an activated seal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SealCode(String);

impl SealCode {
    pub fn compose(
        abbreviation: &Abbreviation,
        year: i32,
        company_id: CompanyId,
        suffix: &str,
    ) -> Self {
        Self(format!("{abbreviation}-{year}-{company_id}-{suffix}"))
    }

    /// Wrap a code loaded from storage.
    pub fn from_stored(raw: impl Into<String>) -> DomainResult<Self> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(DomainError::validation("seal code must not be empty"));
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl ValueObject for SealCode {}

impl core::fmt::Display for SealCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Produces codes for newly activated grants.
pub trait SealCodeGenerator: Send + Sync {
    fn generate(&self, abbreviation: &Abbreviation, year: i32, company_id: CompanyId) -> SealCode;
}

/// Suffix taken from the random tail of a fresh UUIDv7.
///
/// Independent of wall-clock seconds, so activations within the same second
/// do not collide. Storage still enforces code uniqueness.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomSuffixGenerator;

impl RandomSuffixGenerator {
    pub fn suffix() -> String {
        let bytes = Uuid::now_v7().into_bytes();
        bytes[16 - SUFFIX_LEN / 2..]
            .iter()
            .map(|b| format!("{b:02X}"))
            .collect()
    }
}

impl SealCodeGenerator for RandomSuffixGenerator {
    fn generate(&self, abbreviation: &Abbreviation, year: i32, company_id: CompanyId) -> SealCode {
        SealCode::compose(abbreviation, year, company_id, &Self::suffix())
    }
}

/// Hands out pre-set suffixes first, then falls back to random ones.
///
/// Lets tests force code collisions deterministically.
#[derive(Debug, Default)]
pub struct ScriptedCodeGenerator {
    suffixes: Mutex<VecDeque<String>>,
}

impl ScriptedCodeGenerator {
    pub fn new<I, S>(suffixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            suffixes: Mutex::new(suffixes.into_iter().map(Into::into).collect()),
        }
    }

    fn next_suffix(&self) -> String {
        let scripted = match self.suffixes.lock() {
            Ok(mut queue) => queue.pop_front(),
            Err(poisoned) => poisoned.into_inner().pop_front(),
        };
        scripted.unwrap_or_else(RandomSuffixGenerator::suffix)
    }
}

impl SealCodeGenerator for ScriptedCodeGenerator {
    fn generate(&self, abbreviation: &Abbreviation, year: i32, company_id: CompanyId) -> SealCode {
        SealCode::compose(abbreviation, year, company_id, &self.next_suffix())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn eco() -> Abbreviation {
        Abbreviation::parse("ECO").unwrap()
    }

    fn company() -> CompanyId {
        CompanyId::new(7).unwrap()
    }

    #[test]
    fn code_follows_documented_layout() {
        let code = RandomSuffixGenerator.generate(&eco(), 2026, company());
        let parts: Vec<&str> = code.as_str().split('-').collect();
        assert_eq!(parts.len(), 4);
        assert_eq!(parts[0], "ECO");
        assert_eq!(parts[1], "2026");
        assert_eq!(parts[2], "7");
        assert_eq!(parts[3].len(), SUFFIX_LEN);
        assert!(
            parts[3]
                .chars()
                .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase())
        );
    }

    #[test]
    fn rapid_generation_does_not_collide() {
        let codes: HashSet<SealCode> = (0..2_000)
            .map(|_| RandomSuffixGenerator.generate(&eco(), 2026, company()))
            .collect();
        assert_eq!(codes.len(), 2_000);
    }

    #[test]
    fn scripted_generator_replays_then_falls_back() {
        let generator = ScriptedCodeGenerator::new(["AAAAAAAAAA", "AAAAAAAAAA"]);
        let first = generator.generate(&eco(), 2026, company());
        let second = generator.generate(&eco(), 2026, company());
        let third = generator.generate(&eco(), 2026, company());
        assert_eq!(first, second);
        assert_eq!(first.as_str(), "ECO-2026-7-AAAAAAAAAA");
        assert_ne!(third, first);
    }

    #[test]
    fn stored_code_must_not_be_blank() {
        assert!(SealCode::from_stored("  ").is_err());
        assert!(SealCode::from_stored("ECO-2026-7-ABC").is_ok());
    }
}
