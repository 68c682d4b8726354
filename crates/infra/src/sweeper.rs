//! Background expiration sweeper.
//!
//! Periodically moves active grants whose `expires_on` is in the past to
//! `expired`. The sweep is idempotent: a grant that is no longer overdue
//! (or no longer active) is simply not selected again.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::NaiveDate;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use sealforge_core::GrantId;

use crate::grant_service::SealGrantService;

/// Sweeper configuration.
#[derive(Debug, Clone)]
pub struct SweeperConfig {
    /// Time between scheduled sweeps.
    pub interval: Duration,
    /// Grants fetched per batch.
    pub batch_size: u32,
    /// Upper bound on one batch (fetch plus transitions).
    pub batch_timeout: Duration,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3600),
            batch_size: 500,
            batch_timeout: Duration::from_secs(30),
        }
    }
}

impl SweeperConfig {
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_batch_size(mut self, batch_size: u32) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_batch_timeout(mut self, batch_timeout: Duration) -> Self {
        self.batch_timeout = batch_timeout;
        self
    }
}

/// Outcome of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub scanned: usize,
    pub expired: usize,
    pub failed: usize,
    /// The sweep stopped early on a fetch error or batch timeout.
    pub aborted: bool,
}

enum BatchOutcome {
    More(GrantId),
    Done,
    FetchFailed,
}

pub struct ExpirationSweeper {
    service: Arc<SealGrantService>,
    config: SweeperConfig,
}

impl ExpirationSweeper {
    pub fn new(service: Arc<SealGrantService>, config: SweeperConfig) -> Self {
        Self { service, config }
    }

    pub fn config(&self) -> &SweeperConfig {
        &self.config
    }

    /// Expire every grant overdue as of `today`.
    ///
    /// Per-grant failures are logged and counted; they never stop the sweep.
    pub async fn run_once(&self, today: NaiveDate) -> SweepReport {
        let mut report = SweepReport::default();
        let mut after: Option<GrantId> = None;

        loop {
            let batch = tokio::time::timeout(
                self.config.batch_timeout,
                self.sweep_batch(today, after, &mut report),
            )
            .await;

            match batch {
                Ok(BatchOutcome::More(last)) => after = Some(last),
                Ok(BatchOutcome::Done) => break,
                Ok(BatchOutcome::FetchFailed) => {
                    report.aborted = true;
                    break;
                }
                Err(_) => {
                    warn!(
                        timeout_secs = self.config.batch_timeout.as_secs(),
                        "expiration batch timed out; remaining grants wait for the next sweep"
                    );
                    report.aborted = true;
                    break;
                }
            }
        }

        if report.expired > 0 || report.failed > 0 {
            info!(
                today = %today,
                scanned = report.scanned,
                expired = report.expired,
                failed = report.failed,
                "expiration sweep finished"
            );
        } else {
            debug!(today = %today, scanned = report.scanned, "expiration sweep found nothing to do");
        }
        report
    }

    /// One keyset page of overdue grants.
    async fn sweep_batch(
        &self,
        today: NaiveDate,
        after: Option<GrantId>,
        report: &mut SweepReport,
    ) -> BatchOutcome {
        let batch = match self.service.overdue(today, after, self.config.batch_size).await {
            Ok(batch) => batch,
            Err(err) => {
                error!(error = %err, "failed to fetch overdue grants");
                return BatchOutcome::FetchFailed;
            }
        };

        let Some(last) = batch.last().map(|g| g.id_typed()) else {
            return BatchOutcome::Done;
        };

        for grant in &batch {
            report.scanned += 1;
            match self.service.expire_overdue(grant, today).await {
                Ok(_) => report.expired += 1,
                Err(err) => {
                    report.failed += 1;
                    warn!(
                        grant_id = %grant.id_typed(),
                        seal_type_id = %grant.seal_type_id(),
                        error = %err,
                        "failed to expire grant"
                    );
                }
            }
        }

        if batch.len() < self.config.batch_size as usize {
            return BatchOutcome::Done;
        }
        BatchOutcome::More(last)
    }

    /// Run on a tokio interval until shut down. The first sweep starts
    /// immediately.
    pub fn spawn(self) -> SweeperHandle {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
        let (trigger_tx, mut trigger_rx) = mpsc::channel::<()>(1);
        let last_report = Arc::new(Mutex::new(None));
        let report_slot = Arc::clone(&last_report);

        let join = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.config.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    _ = ticker.tick() => {}
                    Some(()) = trigger_rx.recv() => {}
                }

                let today = self.service.clock().today();
                let report = self.run_once(today).await;
                if let Ok(mut slot) = report_slot.lock() {
                    *slot = Some(report);
                }
            }
            info!("expiration sweeper stopped");
        });

        SweeperHandle {
            shutdown: Some(shutdown_tx),
            trigger: trigger_tx,
            last_report,
            join: Some(join),
        }
    }
}

/// Handle to a running sweeper. Dropping it stops the sweeper.
#[derive(Debug)]
pub struct SweeperHandle {
    shutdown: Option<oneshot::Sender<()>>,
    trigger: mpsc::Sender<()>,
    last_report: Arc<Mutex<Option<SweepReport>>>,
    join: Option<JoinHandle<()>>,
}

impl SweeperHandle {
    /// Request an immediate sweep. Coalesces with one already queued.
    pub fn trigger(&self) {
        let _ = self.trigger.try_send(());
    }

    pub fn last_report(&self) -> Option<SweepReport> {
        self.last_report.lock().ok().and_then(|slot| *slot)
    }

    /// Stop the loop and wait for an in-flight sweep to finish.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(join) = self.join.take() {
            if let Err(err) = join.await {
                error!(error = %err, "expiration sweeper task failed");
            }
        }
    }
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}
