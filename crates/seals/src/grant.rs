use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use sealforge_core::{
    Aggregate, AggregateRoot, CompanyId, DomainError, DomainResult, GrantId, SealTypeId,
};

use crate::SealCode;

/// Days per validity year. Leap days are ignored on purpose: one year of
/// validity is always 365 calendar days.
pub const DAYS_PER_YEAR: i64 = 365;
/// Validity used when a grant carries no requested duration.
pub const DEFAULT_VALIDITY_DAYS: i64 = DAYS_PER_YEAR;
pub const MAX_VALIDITY_YEARS: u32 = 10;
pub const MAX_VALIDITY_DAYS: u32 = MAX_VALIDITY_YEARS * DAYS_PER_YEAR as u32;
pub const MAX_REASON_LEN: usize = 500;

/// Grant lifecycle status.
///
/// `Expired` is terminal for the open-grant uniqueness rule but not final:
/// a company may ask for renewal from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantStatus {
    Pending,
    Active,
    InRenewal,
    Expired,
}

impl GrantStatus {
    pub const ALL: [GrantStatus; 4] = [
        GrantStatus::Pending,
        GrantStatus::Active,
        GrantStatus::InRenewal,
        GrantStatus::Expired,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GrantStatus::Pending => "pending",
            GrantStatus::Active => "active",
            GrantStatus::InRenewal => "in_renewal",
            GrantStatus::Expired => "expired",
        }
    }

    pub fn parse(raw: &str) -> DomainResult<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(GrantStatus::Pending),
            "active" => Ok(GrantStatus::Active),
            "in_renewal" => Ok(GrantStatus::InRenewal),
            "expired" => Ok(GrantStatus::Expired),
            other => Err(DomainError::validation(format!("unknown grant status '{other}'"))),
        }
    }

    /// Open grants block a second grant for the same (company, seal type).
    pub fn is_open(&self) -> bool {
        !matches!(self, GrantStatus::Expired)
    }

    /// Statuses an administrator still has to act on.
    pub fn awaits_review(&self) -> bool {
        matches!(self, GrantStatus::Pending | GrantStatus::InRenewal)
    }
}

impl core::fmt::Display for GrantStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Plain field bag used to rebuild a grant from storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrantParts {
    pub id: GrantId,
    pub company_id: CompanyId,
    pub seal_type_id: SealTypeId,
    pub status: GrantStatus,
    pub issued_on: Option<NaiveDate>,
    pub expires_on: Option<NaiveDate>,
    pub code: Option<SealCode>,
    pub requested_validity_years: Option<u32>,
    pub rejection_reason: Option<String>,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Aggregate root: one seal held (or sought) by one company.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrantedSeal {
    id: GrantId,
    company_id: CompanyId,
    seal_type_id: SealTypeId,
    status: GrantStatus,
    issued_on: Option<NaiveDate>,
    expires_on: Option<NaiveDate>,
    code: Option<SealCode>,
    requested_validity_years: Option<u32>,
    rejection_reason: Option<String>,
    version: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl GrantedSeal {
    /// A company asks for a seal; the grant waits for review.
    pub fn request(
        company_id: CompanyId,
        seal_type_id: SealTypeId,
        validity_years: u32,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if validity_years == 0 || validity_years > MAX_VALIDITY_YEARS {
            return Err(DomainError::validation(format!(
                "validity_years must be between 1 and {MAX_VALIDITY_YEARS}"
            )));
        }

        Ok(Self {
            id: GrantId::new(),
            company_id,
            seal_type_id,
            status: GrantStatus::Pending,
            issued_on: None,
            expires_on: None,
            code: None,
            requested_validity_years: Some(validity_years),
            rejection_reason: None,
            version: 1,
            created_at: now,
            updated_at: now,
        })
    }

    /// An administrator grants a seal directly; it is active immediately.
    pub fn grant(
        company_id: CompanyId,
        seal_type_id: SealTypeId,
        validity_days: u32,
        today: NaiveDate,
        code: SealCode,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if validity_days == 0 || validity_days > MAX_VALIDITY_DAYS {
            return Err(DomainError::validation(format!(
                "validity_days must be between 1 and {MAX_VALIDITY_DAYS}"
            )));
        }

        Ok(Self {
            id: GrantId::new(),
            company_id,
            seal_type_id,
            status: GrantStatus::Active,
            issued_on: Some(today),
            expires_on: Some(today + Duration::days(i64::from(validity_days))),
            code: Some(code),
            requested_validity_years: None,
            rejection_reason: None,
            version: 1,
            created_at: now,
            updated_at: now,
        })
    }

    /// Rebuild from storage. Only the date invariant is re-checked.
    pub fn restore(parts: GrantParts) -> DomainResult<Self> {
        if let (Some(issued), Some(expires)) = (parts.issued_on, parts.expires_on) {
            if expires < issued {
                return Err(DomainError::validation(format!(
                    "grant {} expires before it was issued",
                    parts.id
                )));
            }
        }
        if parts.status == GrantStatus::Active
            && (parts.issued_on.is_none() || parts.expires_on.is_none() || parts.code.is_none())
        {
            return Err(DomainError::validation(format!(
                "active grant {} is missing dates or code",
                parts.id
            )));
        }

        Ok(Self {
            id: parts.id,
            company_id: parts.company_id,
            seal_type_id: parts.seal_type_id,
            status: parts.status,
            issued_on: parts.issued_on,
            expires_on: parts.expires_on,
            code: parts.code,
            requested_validity_years: parts.requested_validity_years,
            rejection_reason: parts.rejection_reason,
            version: parts.version,
            created_at: parts.created_at,
            updated_at: parts.updated_at,
        })
    }

    pub fn into_parts(self) -> GrantParts {
        GrantParts {
            id: self.id,
            company_id: self.company_id,
            seal_type_id: self.seal_type_id,
            status: self.status,
            issued_on: self.issued_on,
            expires_on: self.expires_on,
            code: self.code,
            requested_validity_years: self.requested_validity_years,
            rejection_reason: self.rejection_reason,
            version: self.version,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    pub fn id_typed(&self) -> GrantId {
        self.id
    }

    pub fn company_id(&self) -> CompanyId {
        self.company_id
    }

    pub fn seal_type_id(&self) -> SealTypeId {
        self.seal_type_id
    }

    pub fn status(&self) -> GrantStatus {
        self.status
    }

    pub fn issued_on(&self) -> Option<NaiveDate> {
        self.issued_on
    }

    pub fn expires_on(&self) -> Option<NaiveDate> {
        self.expires_on
    }

    pub fn code(&self) -> Option<&SealCode> {
        self.code.as_ref()
    }

    pub fn requested_validity_years(&self) -> Option<u32> {
        self.requested_validity_years
    }

    pub fn rejection_reason(&self) -> Option<&str> {
        self.rejection_reason.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Validity granted on (re)activation.
    pub fn validity_days(&self) -> i64 {
        self.requested_validity_years
            .map(|years| i64::from(years) * DAYS_PER_YEAR)
            .unwrap_or(DEFAULT_VALIDITY_DAYS)
    }

    /// Active and past its expiration date as of `today`.
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.status == GrantStatus::Active && self.expires_on.is_some_and(|d| d < today)
    }

    /// Expiration date falls within `days` (inclusive) from `today`. Status is not
    /// checked, so a grant in renewal still counts.
    pub fn expires_within(&self, today: NaiveDate, days: u32) -> bool {
        let horizon = today + Duration::days(i64::from(days));
        self.expires_on.is_some_and(|d| d >= today && d <= horizon)
    }
}

impl AggregateRoot for GrantedSeal {
    type Id = GrantId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrantCommand {
    /// Activate a pending or in-renewal grant.
    Approve {
        today: NaiveDate,
        code: SealCode,
        at: DateTime<Utc>,
    },
    Reject {
        reason: Option<String>,
        at: DateTime<Utc>,
    },
    RequestRenewal {
        at: DateTime<Utc>,
    },
    RejectRenewal {
        reason: Option<String>,
        at: DateTime<Utc>,
    },
    /// Time-driven expiry of an overdue active grant.
    Expire {
        today: NaiveDate,
        at: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GrantEvent {
    Approved {
        issued_on: NaiveDate,
        expires_on: NaiveDate,
        code: SealCode,
        at: DateTime<Utc>,
    },
    Rejected {
        reason: Option<String>,
        at: DateTime<Utc>,
    },
    RenewalRequested {
        at: DateTime<Utc>,
    },
    RenewalRejected {
        reason: Option<String>,
        at: DateTime<Utc>,
    },
    Expired {
        at: DateTime<Utc>,
    },
}

impl GrantEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            GrantEvent::Approved { .. } => "seals.grant.approved",
            GrantEvent::Rejected { .. } => "seals.grant.rejected",
            GrantEvent::RenewalRequested { .. } => "seals.grant.renewal_requested",
            GrantEvent::RenewalRejected { .. } => "seals.grant.renewal_rejected",
            GrantEvent::Expired { .. } => "seals.grant.expired",
        }
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            GrantEvent::Approved { at, .. }
            | GrantEvent::Rejected { at, .. }
            | GrantEvent::RenewalRequested { at }
            | GrantEvent::RenewalRejected { at, .. }
            | GrantEvent::Expired { at } => *at,
        }
    }
}

impl Aggregate for GrantedSeal {
    type Command = GrantCommand;
    type Event = GrantEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            GrantEvent::Approved {
                issued_on,
                expires_on,
                code,
                ..
            } => {
                self.status = GrantStatus::Active;
                self.issued_on = Some(*issued_on);
                self.expires_on = Some(*expires_on);
                self.code = Some(code.clone());
                self.rejection_reason = None;
            }
            GrantEvent::Rejected { reason, .. } | GrantEvent::RenewalRejected { reason, .. } => {
                self.status = GrantStatus::Expired;
                self.rejection_reason = reason.clone();
            }
            GrantEvent::RenewalRequested { .. } => {
                self.status = GrantStatus::InRenewal;
            }
            GrantEvent::Expired { .. } => {
                self.status = GrantStatus::Expired;
            }
        }

        self.updated_at = event.occurred_at();
        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            GrantCommand::Approve { today, code, at } => self.handle_approve(*today, code, *at),
            GrantCommand::Reject { reason, at } => {
                self.ensure_status(GrantStatus::Pending, "reject")?;
                Ok(vec![GrantEvent::Rejected {
                    reason: normalize_reason(reason.as_deref())?,
                    at: *at,
                }])
            }
            GrantCommand::RequestRenewal { at } => {
                self.ensure_status(GrantStatus::Expired, "request renewal of")?;
                Ok(vec![GrantEvent::RenewalRequested { at: *at }])
            }
            GrantCommand::RejectRenewal { reason, at } => {
                self.ensure_status(GrantStatus::InRenewal, "reject renewal of")?;
                Ok(vec![GrantEvent::RenewalRejected {
                    reason: normalize_reason(reason.as_deref())?,
                    at: *at,
                }])
            }
            GrantCommand::Expire { today, at } => {
                self.ensure_status(GrantStatus::Active, "expire")?;
                if !self.is_overdue(*today) {
                    return Err(DomainError::validation(format!(
                        "grant {} has not reached its expiration date",
                        self.id
                    )));
                }
                Ok(vec![GrantEvent::Expired { at: *at }])
            }
        }
    }
}

impl GrantedSeal {
    fn ensure_status(&self, expected: GrantStatus, action: &'static str) -> DomainResult<()> {
        if self.status == expected {
            Ok(())
        } else {
            Err(DomainError::invalid_transition(self.status, action))
        }
    }

    fn handle_approve(
        &self,
        today: NaiveDate,
        code: &SealCode,
        at: DateTime<Utc>,
    ) -> DomainResult<Vec<GrantEvent>> {
        if !self.status.awaits_review() {
            return Err(DomainError::invalid_transition(self.status, "approve"));
        }

        Ok(vec![GrantEvent::Approved {
            issued_on: today,
            expires_on: today + Duration::days(self.validity_days()),
            code: code.clone(),
            at,
        }])
    }
}

/// Trim a free-text reason; blank means none.
fn normalize_reason(reason: Option<&str>) -> DomainResult<Option<String>> {
    let Some(reason) = reason.map(str::trim).filter(|r| !r.is_empty()) else {
        return Ok(None);
    };
    if reason.chars().count() > MAX_REASON_LEN {
        return Err(DomainError::validation(format!(
            "reason must be at most {MAX_REASON_LEN} characters"
        )));
    }
    Ok(Some(reason.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Abbreviation;

    fn test_company_id() -> CompanyId {
        CompanyId::new(7).unwrap()
    }

    fn test_seal_type_id() -> SealTypeId {
        SealTypeId::new()
    }

    fn test_today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()
    }

    fn test_code(suffix: &str) -> SealCode {
        SealCode::compose(&Abbreviation::parse("ECO").unwrap(), 2026, test_company_id(), suffix)
    }

    fn pending(years: u32) -> GrantedSeal {
        GrantedSeal::request(test_company_id(), test_seal_type_id(), years, Utc::now()).unwrap()
    }

    fn run(grant: &GrantedSeal, cmd: GrantCommand) -> DomainResult<GrantedSeal> {
        grant.execute(&cmd).map(|(next, _)| next)
    }

    fn approve(grant: &GrantedSeal, today: NaiveDate, suffix: &str) -> DomainResult<GrantedSeal> {
        run(
            grant,
            GrantCommand::Approve {
                today,
                code: test_code(suffix),
                at: Utc::now(),
            },
        )
    }

    #[test]
    fn request_creates_pending_grant_without_dates() {
        let grant = pending(1);
        assert_eq!(grant.status(), GrantStatus::Pending);
        assert_eq!(grant.issued_on(), None);
        assert_eq!(grant.expires_on(), None);
        assert_eq!(grant.code(), None);
        assert_eq!(grant.requested_validity_years(), Some(1));
        assert_eq!(grant.version(), 1);
    }

    #[test]
    fn request_rejects_out_of_range_validity() {
        for years in [0, MAX_VALIDITY_YEARS + 1] {
            match GrantedSeal::request(test_company_id(), test_seal_type_id(), years, Utc::now()) {
                Err(DomainError::Validation(_)) => {}
                other => panic!("expected validation error, got {other:?}"),
            }
        }
    }

    #[test]
    fn direct_grant_is_active_with_dates_and_code() {
        let today = test_today();
        let grant = GrantedSeal::grant(
            test_company_id(),
            test_seal_type_id(),
            30,
            today,
            test_code("0000000001"),
            Utc::now(),
        )
        .unwrap();

        assert_eq!(grant.status(), GrantStatus::Active);
        assert_eq!(grant.issued_on(), Some(today));
        assert_eq!(grant.expires_on(), Some(today + Duration::days(30)));
        assert!(grant.code().is_some());
        assert_eq!(grant.requested_validity_years(), None);
    }

    #[test]
    fn direct_grant_rejects_zero_days() {
        let result = GrantedSeal::grant(
            test_company_id(),
            test_seal_type_id(),
            0,
            test_today(),
            test_code("0000000001"),
            Utc::now(),
        );
        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[test]
    fn approve_sets_dates_from_requested_years() {
        let today = test_today();
        let active = approve(&pending(2), today, "AAAAAAAAAA").unwrap();

        assert_eq!(active.status(), GrantStatus::Active);
        assert_eq!(active.issued_on(), Some(today));
        assert_eq!(active.expires_on(), Some(today + Duration::days(730)));
        assert_eq!(active.code().map(|c| c.as_str()), Some("ECO-2026-7-AAAAAAAAAA"));
        assert_eq!(active.version(), 2);
    }

    #[test]
    fn approve_without_requested_years_uses_one_year() {
        let mut parts = pending(3).into_parts();
        parts.requested_validity_years = None;
        let grant = GrantedSeal::restore(parts).unwrap();

        let active = approve(&grant, test_today(), "AAAAAAAAAA").unwrap();
        assert_eq!(active.expires_on(), Some(test_today() + Duration::days(365)));
    }

    #[test]
    fn approve_is_rejected_from_active_and_expired() {
        let active = approve(&pending(1), test_today(), "AAAAAAAAAA").unwrap();
        match approve(&active, test_today(), "BBBBBBBBBB") {
            Err(DomainError::InvalidTransition { from, action }) => {
                assert_eq!(from, "active");
                assert_eq!(action, "approve");
            }
            other => panic!("expected invalid transition, got {other:?}"),
        }

        let rejected = run(
            &pending(1),
            GrantCommand::Reject {
                reason: None,
                at: Utc::now(),
            },
        )
        .unwrap();
        assert!(matches!(
            approve(&rejected, test_today(), "BBBBBBBBBB"),
            Err(DomainError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn reject_records_trimmed_reason() {
        let rejected = run(
            &pending(1),
            GrantCommand::Reject {
                reason: Some("  incomplete documentation ".to_string()),
                at: Utc::now(),
            },
        )
        .unwrap();
        assert_eq!(rejected.status(), GrantStatus::Expired);
        assert_eq!(rejected.rejection_reason(), Some("incomplete documentation"));
        assert_eq!(rejected.issued_on(), None);
    }

    #[test]
    fn reject_with_overlong_reason_fails() {
        let reason = "x".repeat(MAX_REASON_LEN + 1);
        let result = run(
            &pending(1),
            GrantCommand::Reject {
                reason: Some(reason),
                at: Utc::now(),
            },
        );
        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[test]
    fn renewal_only_from_expired() {
        let grant = pending(1);
        assert!(matches!(
            run(&grant, GrantCommand::RequestRenewal { at: Utc::now() }),
            Err(DomainError::InvalidTransition { .. })
        ));

        let active = approve(&grant, test_today(), "AAAAAAAAAA").unwrap();
        assert!(matches!(
            run(&active, GrantCommand::RequestRenewal { at: Utc::now() }),
            Err(DomainError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn full_lifecycle_with_renewal() {
        let today = test_today();
        let active = approve(&pending(1), today, "AAAAAAAAAA").unwrap();

        let later = today + Duration::days(366);
        let expired = run(&active, GrantCommand::Expire { today: later, at: Utc::now() }).unwrap();
        assert_eq!(expired.status(), GrantStatus::Expired);
        assert_eq!(expired.rejection_reason(), None);

        let renewing = run(&expired, GrantCommand::RequestRenewal { at: Utc::now() }).unwrap();
        assert_eq!(renewing.status(), GrantStatus::InRenewal);

        let renewed = approve(&renewing, later, "BBBBBBBBBB").unwrap();
        assert_eq!(renewed.status(), GrantStatus::Active);
        assert_eq!(renewed.issued_on(), Some(later));
        assert_eq!(renewed.expires_on(), Some(later + Duration::days(365)));
        assert_eq!(renewed.code().map(|c| c.as_str()), Some("ECO-2026-7-BBBBBBBBBB"));
        assert_eq!(renewed.version(), 5);
    }

    #[test]
    fn reject_renewal_returns_to_expired_with_reason() {
        let active = approve(&pending(1), test_today(), "AAAAAAAAAA").unwrap();
        let expired = run(
            &active,
            GrantCommand::Expire {
                today: test_today() + Duration::days(400),
                at: Utc::now(),
            },
        )
        .unwrap();
        let renewing = run(&expired, GrantCommand::RequestRenewal { at: Utc::now() }).unwrap();

        let rejected = run(
            &renewing,
            GrantCommand::RejectRenewal {
                reason: Some("audit failed".to_string()),
                at: Utc::now(),
            },
        )
        .unwrap();
        assert_eq!(rejected.status(), GrantStatus::Expired);
        assert_eq!(rejected.rejection_reason(), Some("audit failed"));
        // Dates of the previous activation are kept.
        assert_eq!(rejected.issued_on(), Some(test_today()));
    }

    #[test]
    fn expire_requires_overdue_active_grant() {
        let today = test_today();
        let active = approve(&pending(1), today, "AAAAAAAAAA").unwrap();

        // expires_on itself is still valid.
        let on_expiry = today + Duration::days(365);
        assert!(!active.is_overdue(on_expiry));
        assert!(matches!(
            run(&active, GrantCommand::Expire { today: on_expiry, at: Utc::now() }),
            Err(DomainError::Validation(_))
        ));

        assert!(matches!(
            run(&pending(1), GrantCommand::Expire { today: on_expiry, at: Utc::now() }),
            Err(DomainError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn expires_within_window_is_inclusive() {
        let today = test_today();
        let active = approve(&pending(1), today, "AAAAAAAAAA").unwrap();
        assert!(active.expires_within(today, 365));
        assert!(!active.expires_within(today, 364));
        assert!(!pending(1).expires_within(today, 1000));
    }

    #[test]
    fn restore_rejects_active_grant_without_dates() {
        let mut parts = pending(1).into_parts();
        parts.status = GrantStatus::Active;
        assert!(matches!(
            GrantedSeal::restore(parts),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn status_round_trips_through_text() {
        for status in GrantStatus::ALL {
            assert_eq!(GrantStatus::parse(status.as_str()).unwrap(), status);
        }
        assert!(GrantStatus::parse("revoked").is_err());
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        #[derive(Debug, Clone)]
        enum Step {
            Approve,
            Reject,
            RequestRenewal,
            RejectRenewal,
            Expire(u16),
        }

        fn step() -> impl Strategy<Value = Step> {
            prop_oneof![
                Just(Step::Approve),
                Just(Step::Reject),
                Just(Step::RequestRenewal),
                Just(Step::RejectRenewal),
                (0u16..800).prop_map(Step::Expire),
            ]
        }

        fn command(step: &Step, today: NaiveDate) -> GrantCommand {
            let at = Utc::now();
            match step {
                Step::Approve => GrantCommand::Approve {
                    today,
                    code: test_code("CCCCCCCCCC"),
                    at,
                },
                Step::Reject => GrantCommand::Reject { reason: None, at },
                Step::RequestRenewal => GrantCommand::RequestRenewal { at },
                Step::RejectRenewal => GrantCommand::RejectRenewal { reason: None, at },
                Step::Expire(days) => GrantCommand::Expire {
                    today: today + Duration::days(i64::from(*days)),
                    at,
                },
            }
        }

        proptest! {
            #![proptest_config(ProptestConfig { cases: 256, .. ProptestConfig::default() })]

            /// Whatever sequence of commands is thrown at a grant, failed
            /// commands leave it untouched and successful ones keep the date
            /// invariants intact.
            #[test]
            fn transitions_preserve_invariants(
                years in 1u32..=MAX_VALIDITY_YEARS,
                steps in proptest::collection::vec(step(), 0..24),
            ) {
                let today = test_today();
                let mut grant = pending(years);

                for s in &steps {
                    let before = grant.clone();
                    match grant.execute(&command(s, today)) {
                        Ok((next, events)) => {
                            prop_assert_eq!(events.len(), 1);
                            prop_assert_eq!(next.version(), before.version() + 1);
                            grant = next;
                        }
                        Err(_) => prop_assert_eq!(&grant, &before),
                    }

                    if let (Some(issued), Some(expires)) = (grant.issued_on(), grant.expires_on()) {
                        prop_assert!(expires >= issued);
                    }
                    if grant.status() == GrantStatus::Active {
                        prop_assert!(grant.issued_on().is_some());
                        prop_assert!(grant.expires_on().is_some());
                        prop_assert!(grant.code().is_some());
                        prop_assert_eq!(grant.rejection_reason(), None);
                    }
                    if grant.status() == GrantStatus::Pending {
                        prop_assert!(grant.code().is_none());
                    }
                }
            }

            #[test]
            fn approval_only_succeeds_from_review_states(
                years in 1u32..=MAX_VALIDITY_YEARS,
                steps in proptest::collection::vec(step(), 0..12),
            ) {
                let today = test_today();
                let mut grant = pending(years);
                for s in &steps {
                    if let Ok((next, _)) = grant.execute(&command(s, today)) {
                        grant = next;
                    }
                }

                let result = grant.execute(&command(&Step::Approve, today));
                prop_assert_eq!(result.is_ok(), grant.status().awaits_review());
            }
        }
    }
}
