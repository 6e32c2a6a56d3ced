use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info};

use super::envelope::Envelope;
use super::topology;
use super::transport::{BrokerError, Delivery, MessageTransport};

/// Publishing and subscription handle shared by every component. Built once
/// at startup, after which components hold an `Arc` of it; nothing in the
/// engine reaches for shared global state to publish.
pub struct BrokerGateway<T> {
    transport: Arc<T>,
    exchange: String,
}

impl<T: MessageTransport> BrokerGateway<T> {
    /// Declare the exchange, every queue, and every binding. Any failure
    /// here is fatal to startup; there is no retry or reconnection layer.
    pub async fn connect(
        transport: Arc<T>,
        exchange: impl Into<String>,
    ) -> Result<Self, BrokerError> {
        let exchange = exchange.into();
        transport.declare_exchange(&exchange).await?;
        for binding in topology::bindings() {
            transport.declare_queue(binding.queue).await?;
            transport
                .bind_queue(binding.queue, &exchange, binding.routing_key)
                .await?;
        }
        info!(exchange = %exchange, "broker topology declared");
        Ok(Self {
            transport,
            exchange,
        })
    }

    pub fn exchange(&self) -> &str {
        &self.exchange
    }

    pub async fn publish(&self, routing_key: &str, envelope: &Envelope) -> Result<(), BrokerError> {
        let payload = envelope.to_bytes()?;
        self.transport
            .publish(&self.exchange, routing_key, payload)
            .await?;
        debug!(kind = envelope.kind.as_str(), %routing_key, "published envelope");
        Ok(())
    }

    /// Publish raw bytes unchanged; used to forward undecodable payloads to
    /// the dead-letter queue.
    pub async fn publish_raw(
        &self,
        routing_key: &str,
        payload: Vec<u8>,
    ) -> Result<(), BrokerError> {
        self.transport
            .publish(&self.exchange, routing_key, payload)
            .await
    }

    pub async fn subscribe(
        &self,
        queue: &str,
    ) -> Result<mpsc::UnboundedReceiver<Delivery>, BrokerError> {
        self.transport.consume(queue).await
    }

    pub async fn ack(&self, queue: &str, delivery_tag: u64) -> Result<(), BrokerError> {
        self.transport.ack(queue, delivery_tag).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::envelope::{MessageKind, PriceResponseBody};
    use crate::messaging::memory::InMemoryBroker;
    use std::collections::BTreeMap;
    use uuid::Uuid;

    #[tokio::test]
    async fn connect_declares_the_full_topology() {
        let broker = Arc::new(InMemoryBroker::default());
        let gateway = BrokerGateway::connect(broker.clone(), "propsync")
            .await
            .expect("topology declares");

        let body = PriceResponseBody {
            request_id: Uuid::new_v4(),
            prices: BTreeMap::new(),
        };
        let envelope =
            Envelope::new(MessageKind::RecommendedPriceResponse, &body).expect("envelope builds");
        gateway
            .publish(topology::keys::PRICING_RESPONSE, &envelope)
            .await
            .expect("publish succeeds");

        assert_eq!(broker.backlog_len(topology::PRICING_QUEUE), 1);
    }
}
