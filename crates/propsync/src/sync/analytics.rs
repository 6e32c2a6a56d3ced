use std::sync::Arc;

use tracing::{debug, info};

use crate::domain::AnalyticsSnapshot;
use crate::messaging::{
    keys, AnalyticsBody, BrokerError, BrokerGateway, Envelope, EnvelopeError, MessageKind,
    MessageTransport,
};
use crate::store::{PropertyFilter, PropertyStore, StoreError};

/// Periodic export of anonymized property snapshots to the analytics data
/// sink. Fire-and-forget: the scheduler job logs failures and waits for the
/// next tick.
pub struct AnalyticsSnapshotPublisher<S, T> {
    store: Arc<S>,
    gateway: Arc<BrokerGateway<T>>,
}

#[derive(Debug, thiserror::Error)]
pub enum AnalyticsError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Broker(#[from] BrokerError),
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),
}

impl<S, T> AnalyticsSnapshotPublisher<S, T>
where
    S: PropertyStore + 'static,
    T: MessageTransport + 'static,
{
    pub fn new(store: Arc<S>, gateway: Arc<BrokerGateway<T>>) -> Self {
        Self { store, gateway }
    }

    /// Publish one batched snapshot of every property. Returns the number of
    /// rows exported; an empty store publishes nothing.
    pub async fn publish_snapshot(&self) -> Result<usize, AnalyticsError> {
        let properties = self.store.find_many(PropertyFilter::all()).await?;
        if properties.is_empty() {
            debug!("no properties to export, skipping analytics snapshot");
            return Ok(0);
        }

        let snapshots: Vec<AnalyticsSnapshot> = properties
            .iter()
            .map(AnalyticsSnapshot::from_property)
            .collect();
        let count = snapshots.len();

        let body = AnalyticsBody { snapshots };
        let envelope = Envelope::new(MessageKind::SendDataToAnalytics, &body)?;
        self.gateway.publish(keys::ANALYTICS_DATA, &envelope).await?;

        info!(rows = count, "published analytics snapshot");
        Ok(count)
    }
}
