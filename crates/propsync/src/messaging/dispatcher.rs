use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::store::PropertyStore;
use crate::sync::{PriceOrchestrator, PricingError, ReconcileError, ReconciliationEngine};

use super::envelope::{Envelope, EnvelopeError, MessageKind, PriceResponseBody, PropertyImportBody};
use super::gateway::BrokerGateway;
use super::topology::{self, keys};
use super::transport::{BrokerError, Delivery, MessageTransport};

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),
    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
    #[error(transparent)]
    Pricing(#[from] PricingError),
}

/// Routes inbound deliveries to the engines. One task per queue keeps
/// per-queue order; a delivery is fully handled before the next is taken.
/// Every delivery is acknowledged exactly once; payloads that cannot be
/// decoded or handled are forwarded to the dead-letter queue first, so
/// nothing is silently dropped and nothing poisons the queue head.
pub struct InboundDispatcher<S, T> {
    reconciliation: Arc<ReconciliationEngine<S, T>>,
    pricing: Arc<PriceOrchestrator<S, T>>,
    gateway: Arc<BrokerGateway<T>>,
}

impl<S, T> InboundDispatcher<S, T>
where
    S: PropertyStore + 'static,
    T: MessageTransport + 'static,
{
    pub fn new(
        reconciliation: Arc<ReconciliationEngine<S, T>>,
        pricing: Arc<PriceOrchestrator<S, T>>,
        gateway: Arc<BrokerGateway<T>>,
    ) -> Self {
        Self {
            reconciliation,
            pricing,
            gateway,
        }
    }

    /// Open every inbound queue and spawn its consumer task. Subscription
    /// failures are fatal; they mean the topology was never declared.
    pub async fn start(
        self: &Arc<Self>,
        shutdown: watch::Receiver<bool>,
    ) -> Result<Vec<JoinHandle<()>>, BrokerError> {
        let mut handles = Vec::new();

        for queue in topology::dispatched_queues() {
            let receiver = self.gateway.subscribe(queue).await?;
            handles.push(tokio::spawn(consume_queue(
                Arc::clone(self),
                queue,
                receiver,
                shutdown.clone(),
            )));
        }

        let receiver = self.gateway.subscribe(topology::USER_EVENTS_QUEUE).await?;
        handles.push(tokio::spawn(observe_user_events(
            Arc::clone(&self.gateway),
            receiver,
            shutdown,
        )));

        Ok(handles)
    }

    /// Handle one delivery end to end: decode, dispatch, dead-letter on
    /// failure, acknowledge.
    pub async fn process(&self, queue: &str, delivery: Delivery) {
        match Envelope::from_bytes(&delivery.payload) {
            Ok(envelope) => {
                if let Err(err) = self.handle(&envelope).await {
                    error!(
                        %queue,
                        kind = envelope.kind.as_str(),
                        error = %err,
                        "handler failed, dead-lettering payload"
                    );
                    self.dead_letter(&delivery.payload).await;
                }
            }
            Err(err) => {
                warn!(%queue, error = %err, "undecodable payload, dead-lettering");
                self.dead_letter(&delivery.payload).await;
            }
        }

        if let Err(err) = self.gateway.ack(queue, delivery.delivery_tag).await {
            error!(
                %queue,
                delivery_tag = delivery.delivery_tag,
                error = %err,
                "failed to acknowledge delivery"
            );
        }
    }

    async fn handle(&self, envelope: &Envelope) -> Result<(), DispatchError> {
        match envelope.kind {
            MessageKind::PropertyImportResponse => {
                let body: PropertyImportBody = envelope.body_as()?;
                self.reconciliation
                    .import_batch(body.service, body.properties)
                    .await?;
                Ok(())
            }
            MessageKind::RecommendedPriceResponse => {
                let body: PriceResponseBody = envelope.body_as()?;
                self.pricing.apply_recommendations(body).await?;
                Ok(())
            }
            // Kinds this engine only ever produces. Seeing one inbound is
            // legal on a topic exchange; acknowledge and move on.
            kind @ (MessageKind::ReservationImportInitialRequest
            | MessageKind::DuplicateImportProperty
            | MessageKind::PropertyUpdate
            | MessageKind::GetRecommendedPrice
            | MessageKind::SendDataToAnalytics) => {
                debug!(kind = kind.as_str(), "ignoring outbound-only kind");
                Ok(())
            }
        }
    }

    async fn dead_letter(&self, payload: &[u8]) {
        if let Err(err) = self
            .gateway
            .publish_raw(keys::DEAD_LETTER, payload.to_vec())
            .await
        {
            error!(error = %err, "failed to dead-letter payload");
        }
    }
}

async fn consume_queue<S, T>(
    dispatcher: Arc<InboundDispatcher<S, T>>,
    queue: &'static str,
    mut receiver: mpsc::UnboundedReceiver<Delivery>,
    mut shutdown: watch::Receiver<bool>,
) where
    S: PropertyStore + 'static,
    T: MessageTransport + 'static,
{
    loop {
        tokio::select! {
            maybe = receiver.recv() => {
                match maybe {
                    Some(delivery) => dispatcher.process(queue, delivery).await,
                    None => break,
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }
    debug!(%queue, "consumer stopped");
}

/// The user-events queue is observed, not interpreted: deliveries are logged
/// and acknowledged so account events never pile up, and other services own
/// their meaning.
async fn observe_user_events<T>(
    gateway: Arc<BrokerGateway<T>>,
    mut receiver: mpsc::UnboundedReceiver<Delivery>,
    mut shutdown: watch::Receiver<bool>,
) where
    T: MessageTransport + 'static,
{
    loop {
        tokio::select! {
            maybe = receiver.recv() => {
                match maybe {
                    Some(delivery) => {
                        debug!(
                            routing_key = %delivery.routing_key,
                            bytes = delivery.payload.len(),
                            "observed user event"
                        );
                        if let Err(err) = gateway
                            .ack(topology::USER_EVENTS_QUEUE, delivery.delivery_tag)
                            .await
                        {
                            error!(error = %err, "failed to acknowledge user event");
                        }
                    }
                    None => break,
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }
    debug!(queue = topology::USER_EVENTS_QUEUE, "observer stopped");
}
