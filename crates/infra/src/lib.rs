//! Infrastructure layer: stores, application services, background sweeper,
//! configuration.

pub mod catalog_service;
pub mod config;
pub mod error;
pub mod grant_service;
pub mod notifier;
pub mod query_service;
pub mod store;
pub mod sweeper;


pub use catalog_service::SealCatalogService;
pub use config::{AppConfig, ConfigError, StoreBackend};
pub use error::{SealError, StoreError};
pub use grant_service::SealGrantService;
pub use notifier::{GrantNotice, GrantNotifier, InMemoryNotifier, TracingNotifier};
pub use query_service::GrantQueryService;
pub use sweeper::{ExpirationSweeper, SweepReport, SweeperConfig, SweeperHandle};
