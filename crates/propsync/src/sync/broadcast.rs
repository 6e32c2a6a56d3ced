use std::sync::Arc;

use tracing::debug;

use crate::domain::PropertyId;
use crate::messaging::{
    keys, BrokerError, BrokerGateway, ChangedFields, Envelope, MessageKind, MessageTransport,
    PropertyUpdateBody,
};

/// Fan-out publisher for canonical property mutations. Every wrapper hears
/// every change and decides locally whether it cares. Called by the price
/// orchestrator here and by the CRUD surface after owner edits.
pub struct UpdateBroadcastPublisher<T> {
    gateway: Arc<BrokerGateway<T>>,
}

impl<T: MessageTransport> UpdateBroadcastPublisher<T> {
    pub fn new(gateway: Arc<BrokerGateway<T>>) -> Self {
        Self { gateway }
    }

    pub async fn publish_update(
        &self,
        property_id: PropertyId,
        changed_fields: ChangedFields,
    ) -> Result<(), BrokerError> {
        if changed_fields.is_empty() {
            debug!(%property_id, "no changed fields, skipping broadcast");
            return Ok(());
        }

        let body = PropertyUpdateBody {
            property_id,
            changed_fields,
        };
        let envelope = Envelope::new(MessageKind::PropertyUpdate, &body)?;
        self.gateway.publish(keys::BROADCAST_UPDATES, &envelope).await
    }
}
