//! Store and service wiring.
//!
//! `StoreBackend::InMemory` is used for dev/test; `StoreBackend::Postgres`
//! when `USE_PERSISTENT_STORES=true`.

use std::sync::Arc;

use anyhow::Context;
use sqlx::PgPool;
use tracing::info;

use sealforge_core::{Clock, SystemClock};
use sealforge_infra::store::{
    CompanyDirectory, GrantStore, InMemoryCompanyDirectory, InMemoryGrantStore,
    InMemorySealTypeStore, PostgresCompanyDirectory, PostgresGrantStore, PostgresSealTypeStore,
    SealTypeStore, apply_schema,
};
use sealforge_infra::{
    AppConfig, ExpirationSweeper, GrantNotifier, GrantQueryService, SealCatalogService,
    SealGrantService, StoreBackend, TracingNotifier,
};

/// Everything the handlers need, shared behind one `Arc`.
pub struct AppServices {
    pub catalog: SealCatalogService,
    pub grants: Arc<SealGrantService>,
    pub queries: GrantQueryService,
}

impl AppServices {
    /// Wire services over arbitrary stores.
    pub fn new(
        grant_store: Arc<dyn GrantStore>,
        seal_types: Arc<dyn SealTypeStore>,
        companies: Arc<dyn CompanyDirectory>,
        notifier: Arc<dyn GrantNotifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let grants = SealGrantService::new(
            grant_store.clone(),
            seal_types.clone(),
            companies,
            clock.clone(),
        )
        .with_notifier(notifier);

        Self {
            catalog: SealCatalogService::new(seal_types, clock.clone()),
            grants: Arc::new(grants),
            queries: GrantQueryService::new(grant_store, clock),
        }
    }

    /// In-memory stores over the given company registry.
    pub fn in_memory(companies: Arc<InMemoryCompanyDirectory>, clock: Arc<dyn Clock>) -> Self {
        Self::new(
            Arc::new(InMemoryGrantStore::new()),
            Arc::new(InMemorySealTypeStore::new()),
            companies,
            Arc::new(TracingNotifier),
            clock,
        )
    }

    /// Postgres stores sharing one pool.
    pub fn postgres(pool: PgPool, clock: Arc<dyn Clock>) -> Self {
        Self::new(
            Arc::new(PostgresGrantStore::new(pool.clone())),
            Arc::new(PostgresSealTypeStore::new(pool.clone())),
            Arc::new(PostgresCompanyDirectory::new(pool)),
            Arc::new(TracingNotifier),
            clock,
        )
    }

    pub fn sweeper(&self, config: &AppConfig) -> ExpirationSweeper {
        ExpirationSweeper::new(self.grants.clone(), config.sweeper.clone())
    }
}

/// Build the services selected by configuration.
pub async fn build_services(config: &AppConfig) -> anyhow::Result<AppServices> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    match &config.store {
        StoreBackend::InMemory => {
            let companies = InMemoryCompanyDirectory::new()
                .with_active(config.dev_company_ids.iter().copied())
                .context("failed to seed in-memory company directory")?;
            info!(
                companies = config.dev_company_ids.len(),
                "using in-memory stores"
            );
            Ok(AppServices::in_memory(Arc::new(companies), clock))
        }
        StoreBackend::Postgres { database_url } => {
            let pool = PgPool::connect(database_url)
                .await
                .context("failed to connect to Postgres")?;
            apply_schema(&pool)
                .await
                .context("failed to apply database schema")?;
            info!("using Postgres stores");
            Ok(AppServices::postgres(pool, clock))
        }
    }
}
