use async_trait::async_trait;
use tokio::sync::mpsc;

use super::envelope::EnvelopeError;

/// One message handed to a consumer, tagged for acknowledgment.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub delivery_tag: u64,
    pub routing_key: String,
    pub payload: Vec<u8>,
}

#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    #[error("unknown exchange '{0}'")]
    UnknownExchange(String),
    #[error("unknown queue '{0}'")]
    UnknownQueue(String),
    #[error("broker unavailable: {0}")]
    Unavailable(String),
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),
}

/// Transport seam over a topic broker. Implementations provide durable
/// queues, at-least-once delivery, and in-order delivery per queue; the
/// engine builds nothing else on top.
#[async_trait]
pub trait MessageTransport: Send + Sync {
    async fn declare_exchange(&self, exchange: &str) -> Result<(), BrokerError>;

    async fn declare_queue(&self, queue: &str) -> Result<(), BrokerError>;

    async fn bind_queue(
        &self,
        queue: &str,
        exchange: &str,
        routing_key: &str,
    ) -> Result<(), BrokerError>;

    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        payload: Vec<u8>,
    ) -> Result<(), BrokerError>;

    /// Open the single consumer stream for a queue. Deliveries arrive in
    /// publish order, including any backlog from before the call.
    async fn consume(&self, queue: &str) -> Result<mpsc::UnboundedReceiver<Delivery>, BrokerError>;

    async fn ack(&self, queue: &str, delivery_tag: u64) -> Result<(), BrokerError>;
}
