mod analytics;
mod broadcast;
mod pricing;
mod reconcile;
pub mod scheduler;

pub use analytics::{AnalyticsError, AnalyticsSnapshotPublisher};
pub use broadcast::UpdateBroadcastPublisher;
pub use pricing::{PriceOrchestrator, PricingError, RecommendationSummary};
pub use reconcile::{ImportSummary, ReconcileError, ReconciliationEngine};
pub use scheduler::{next_daily_run, spawn_daily, spawn_interval};
