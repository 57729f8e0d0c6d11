// Sale Sentry Core Library
// Collection sale detection, enrichment and notification

pub mod classifier;
pub mod error;
pub mod marketplaces;
pub mod metadata;
pub mod metrics;
pub mod models;
pub mod notifier;
pub mod pipeline;
pub mod poller;
pub mod rpc_client;
pub mod settings;
pub mod tx_parser;
pub mod waiter;

#[cfg(feature = "native")]
pub mod native;

// Re-exports
pub use classifier::{SkipReason, TraitFilter};
pub use error::CoreError;
pub use marketplaces::MarketplaceRegistry;
pub use metadata::{HttpClient, MetadataResolver, MetadataSource};
pub use metrics::{MetricsSnapshot, SaleMetrics};
pub use models::*;
pub use notifier::{Dispatcher, LogOnlyPoster, SaleNotifier, SocialPoster};
pub use pipeline::SaleOutcome;
pub use poller::{CycleReport, CycleStatus, PollerConfig, SalePoller};
pub use rpc_client::*;
pub use settings::Settings;
pub use waiter::{StopHandle, Waiter};
