//! Outbound notices about grant outcomes.
//!
//! Notices are best-effort: they are emitted after the state change has been
//! persisted and never fail the operation that produced them.

use std::sync::Mutex;

use serde::Serialize;
use tracing::info;

use sealforge_core::{CompanyId, GrantId};
use sealforge_seals::SealCode;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GrantNotice {
    Approved {
        grant_id: GrantId,
        company_id: CompanyId,
        code: SealCode,
    },
    Rejected {
        grant_id: GrantId,
        company_id: CompanyId,
        reason: Option<String>,
    },
    RenewalRejected {
        grant_id: GrantId,
        company_id: CompanyId,
        reason: Option<String>,
    },
    Expired {
        grant_id: GrantId,
        company_id: CompanyId,
    },
    Revoked {
        grant_id: GrantId,
        company_id: CompanyId,
    },
}

impl GrantNotice {
    pub fn kind(&self) -> &'static str {
        match self {
            GrantNotice::Approved { .. } => "approved",
            GrantNotice::Rejected { .. } => "rejected",
            GrantNotice::RenewalRejected { .. } => "renewal_rejected",
            GrantNotice::Expired { .. } => "expired",
            GrantNotice::Revoked { .. } => "revoked",
        }
    }

    pub fn grant_id(&self) -> GrantId {
        match self {
            GrantNotice::Approved { grant_id, .. }
            | GrantNotice::Rejected { grant_id, .. }
            | GrantNotice::RenewalRejected { grant_id, .. }
            | GrantNotice::Expired { grant_id, .. }
            | GrantNotice::Revoked { grant_id, .. } => *grant_id,
        }
    }

    pub fn company_id(&self) -> CompanyId {
        match self {
            GrantNotice::Approved { company_id, .. }
            | GrantNotice::Rejected { company_id, .. }
            | GrantNotice::RenewalRejected { company_id, .. }
            | GrantNotice::Expired { company_id, .. }
            | GrantNotice::Revoked { company_id, .. } => *company_id,
        }
    }
}

/// Sink for grant notices (mail, notification table, message bus, ...).
pub trait GrantNotifier: Send + Sync + 'static {
    fn notify(&self, notice: GrantNotice);
}

/// Default sink: one structured log line per notice.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl GrantNotifier for TracingNotifier {
    fn notify(&self, notice: GrantNotice) {
        let payload = serde_json::to_string(&notice).unwrap_or_default();
        info!(
            notice = notice.kind(),
            grant_id = %notice.grant_id(),
            company_id = %notice.company_id(),
            payload = %payload,
            "grant notice"
        );
    }
}

/// In-memory sink for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryNotifier {
    inner: Mutex<Vec<GrantNotice>>,
}

impl InMemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> Vec<GrantNotice> {
        match self.inner.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl GrantNotifier for InMemoryNotifier {
    fn notify(&self, notice: GrantNotice) {
        match self.inner.lock() {
            Ok(mut guard) => guard.push(notice),
            Err(poisoned) => poisoned.into_inner().push(notice),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_notifier_records_in_order() {
        let notifier = InMemoryNotifier::new();
        let company_id = CompanyId::new(7).unwrap();
        let first = GrantId::new();
        let second = GrantId::new();

        notifier.notify(GrantNotice::Expired {
            grant_id: first,
            company_id,
        });
        notifier.notify(GrantNotice::Revoked {
            grant_id: second,
            company_id,
        });

        let all = notifier.all();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].kind(), "expired");
        assert_eq!(all[1].grant_id(), second);
    }

    #[test]
    fn notices_serialize_with_kind_tag() {
        let notice = GrantNotice::Rejected {
            grant_id: GrantId::new(),
            company_id: CompanyId::new(7).unwrap(),
            reason: Some("missing audit".to_string()),
        };
        let json = serde_json::to_value(&notice).unwrap();
        assert_eq!(json["kind"], "rejected");
        assert_eq!(json["company_id"], 7);
        assert_eq!(json["reason"], "missing audit");
    }

    #[test]
    fn tracing_notifier_does_not_panic_without_subscriber() {
        TracingNotifier.notify(GrantNotice::Rejected {
            grant_id: GrantId::new(),
            company_id: CompanyId::new(1).unwrap(),
            reason: None,
        });
    }
}
