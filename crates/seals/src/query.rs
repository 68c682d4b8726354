//! Listing filters, pagination and orderings shared by every grant store.

use std::cmp::Ordering;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{GrantStatus, GrantedSeal};

pub const DEFAULT_PAGE_LIMIT: u32 = 50;
pub const MAX_PAGE_LIMIT: u32 = 200;

/// Pagination parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub limit: u32,
    pub offset: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_LIMIT,
            offset: 0,
        }
    }
}

impl Pagination {
    /// Missing values take defaults; the limit is clamped to `1..=MAX_PAGE_LIMIT`.
    pub fn new(limit: Option<u32>, offset: Option<u32>) -> Self {
        Self {
            limit: limit.unwrap_or(DEFAULT_PAGE_LIMIT).clamp(1, MAX_PAGE_LIMIT),
            offset: offset.unwrap_or(0),
        }
    }
}

/// One page of results plus the unpaged total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub limit: u32,
    pub offset: u32,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            limit: self.limit,
            offset: self.offset,
        }
    }
}

/// Company listing filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantFilter {
    pub status: Option<GrantStatus>,
    /// Only grants whose `expires_on` falls in `[today, today + n]`.
    pub expiring_within_days: Option<u32>,
}

impl GrantFilter {
    pub fn matches(&self, grant: &GrantedSeal, today: NaiveDate) -> bool {
        if let Some(status) = self.status {
            if grant.status() != status {
                return false;
            }
        }
        if let Some(days) = self.expiring_within_days {
            if !grant.expires_within(today, days) {
                return false;
            }
        }
        true
    }
}

/// `expires_on DESC NULLS LAST`, then `created_at`, then id.
pub fn company_listing_order(a: &GrantedSeal, b: &GrantedSeal) -> Ordering {
    let by_expiry = match (a.expires_on(), b.expires_on()) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_expiry
        .then_with(|| a.created_at().cmp(&b.created_at()))
        .then_with(|| a.id_typed().cmp(&b.id_typed()))
}

/// Review queue: oldest first.
pub fn pending_order(a: &GrantedSeal, b: &GrantedSeal) -> Ordering {
    a.created_at()
        .cmp(&b.created_at())
        .then_with(|| a.id_typed().cmp(&b.id_typed()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Abbreviation, GrantCommand, SealCode};
    use chrono::{DateTime, Duration, Utc};
    use sealforge_core::{Aggregate, CompanyId, SealTypeId};

    fn company() -> CompanyId {
        CompanyId::new(7).unwrap()
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 10).unwrap()
    }

    fn requested_at(at: DateTime<Utc>) -> GrantedSeal {
        GrantedSeal::request(company(), SealTypeId::new(), 1, at).unwrap()
    }

    fn active_expiring(days: u32, at: DateTime<Utc>) -> GrantedSeal {
        let code = SealCode::compose(&Abbreviation::parse("ECO").unwrap(), 2026, company(), "X");
        GrantedSeal::grant(company(), SealTypeId::new(), days, today(), code, at).unwrap()
    }

    #[test]
    fn pagination_defaults_and_caps() {
        assert_eq!(Pagination::new(None, None), Pagination { limit: 50, offset: 0 });
        assert_eq!(Pagination::new(Some(10_000), Some(5)).limit, MAX_PAGE_LIMIT);
        assert_eq!(Pagination::new(Some(0), None).limit, 1);
    }

    #[test]
    fn filter_by_status_and_expiry_window() {
        let now = Utc::now();
        let soon = active_expiring(10, now);
        let late = active_expiring(300, now);
        let waiting = requested_at(now);

        let active_only = GrantFilter {
            status: Some(GrantStatus::Active),
            expiring_within_days: None,
        };
        assert!(active_only.matches(&soon, today()));
        assert!(!active_only.matches(&waiting, today()));

        let expiring = GrantFilter {
            status: None,
            expiring_within_days: Some(30),
        };
        assert!(expiring.matches(&soon, today()));
        assert!(!expiring.matches(&late, today()));
        assert!(!expiring.matches(&waiting, today()));

        assert!(GrantFilter::default().matches(&waiting, today()));
    }

    #[test]
    fn company_listing_puts_latest_expiry_first_and_undated_last() {
        let now = Utc::now();
        let undated = requested_at(now);
        let soon = active_expiring(10, now + Duration::seconds(1));
        let late = active_expiring(300, now + Duration::seconds(2));

        let mut grants = vec![undated.clone(), soon.clone(), late.clone()];
        grants.sort_by(company_listing_order);
        assert_eq!(grants, vec![late, soon, undated]);
    }

    #[test]
    fn pending_order_is_oldest_first() {
        let now = Utc::now();
        let older = requested_at(now - Duration::hours(2));
        let newer = requested_at(now);
        let renewing = {
            let expired = active_expiring(1, now - Duration::hours(1))
                .execute(&GrantCommand::Expire {
                    today: today() + Duration::days(5),
                    at: now,
                })
                .unwrap()
                .0;
            expired
                .execute(&GrantCommand::RequestRenewal { at: now })
                .unwrap()
                .0
        };

        let mut queue = vec![newer.clone(), renewing.clone(), older.clone()];
        queue.sort_by(pending_order);
        assert_eq!(queue, vec![older, renewing, newer]);
    }
}
