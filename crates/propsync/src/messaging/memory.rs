use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::topology::topic_matches;
use super::transport::{BrokerError, Delivery, MessageTransport};

/// In-memory topic broker used by tests, the demo command, and
/// single-process runs. Implements real topic semantics: pattern bindings
/// with `*`/`#`, one delivery per matched queue, per-queue FIFO order, and an
/// acknowledgment ledger tests can inspect.
#[derive(Default, Clone)]
pub struct InMemoryBroker {
    inner: Arc<Mutex<BrokerInner>>,
}

#[derive(Default)]
struct BrokerInner {
    exchanges: BTreeSet<String>,
    queues: BTreeMap<String, QueueState>,
    bindings: Vec<Binding>,
    next_tag: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Binding {
    exchange: String,
    queue: String,
    routing_key: String,
}

#[derive(Default)]
struct QueueState {
    consumer: Option<mpsc::UnboundedSender<Delivery>>,
    backlog: VecDeque<Delivery>,
    acked: Vec<u64>,
}

impl InMemoryBroker {
    /// Delivery tags acknowledged on a queue, in acknowledgment order.
    pub fn acked(&self, queue: &str) -> Vec<u64> {
        let inner = self.inner.lock().expect("broker mutex poisoned");
        inner
            .queues
            .get(queue)
            .map(|state| state.acked.clone())
            .unwrap_or_default()
    }

    /// Number of deliveries sitting in a queue with no consumer attached.
    pub fn backlog_len(&self, queue: &str) -> usize {
        let inner = self.inner.lock().expect("broker mutex poisoned");
        inner
            .queues
            .get(queue)
            .map(|state| state.backlog.len())
            .unwrap_or_default()
    }
}

#[async_trait]
impl MessageTransport for InMemoryBroker {
    async fn declare_exchange(&self, exchange: &str) -> Result<(), BrokerError> {
        let mut inner = self.inner.lock().expect("broker mutex poisoned");
        inner.exchanges.insert(exchange.to_string());
        Ok(())
    }

    async fn declare_queue(&self, queue: &str) -> Result<(), BrokerError> {
        let mut inner = self.inner.lock().expect("broker mutex poisoned");
        inner.queues.entry(queue.to_string()).or_default();
        Ok(())
    }

    async fn bind_queue(
        &self,
        queue: &str,
        exchange: &str,
        routing_key: &str,
    ) -> Result<(), BrokerError> {
        let mut inner = self.inner.lock().expect("broker mutex poisoned");
        if !inner.exchanges.contains(exchange) {
            return Err(BrokerError::UnknownExchange(exchange.to_string()));
        }
        if !inner.queues.contains_key(queue) {
            return Err(BrokerError::UnknownQueue(queue.to_string()));
        }

        let binding = Binding {
            exchange: exchange.to_string(),
            queue: queue.to_string(),
            routing_key: routing_key.to_string(),
        };
        if !inner.bindings.contains(&binding) {
            inner.bindings.push(binding);
        }
        Ok(())
    }

    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        payload: Vec<u8>,
    ) -> Result<(), BrokerError> {
        let mut inner = self.inner.lock().expect("broker mutex poisoned");
        if !inner.exchanges.contains(exchange) {
            return Err(BrokerError::UnknownExchange(exchange.to_string()));
        }

        // One copy per matched queue, even when several bindings match.
        let matched: BTreeSet<String> = inner
            .bindings
            .iter()
            .filter(|binding| {
                binding.exchange == exchange && topic_matches(&binding.routing_key, routing_key)
            })
            .map(|binding| binding.queue.clone())
            .collect();

        for queue in matched {
            inner.next_tag += 1;
            let delivery = Delivery {
                delivery_tag: inner.next_tag,
                routing_key: routing_key.to_string(),
                payload: payload.clone(),
            };

            let Some(state) = inner.queues.get_mut(&queue) else {
                continue;
            };
            match &state.consumer {
                Some(sender) if sender.send(delivery.clone()).is_ok() => {}
                _ => state.backlog.push_back(delivery),
            }
        }
        Ok(())
    }

    async fn consume(&self, queue: &str) -> Result<mpsc::UnboundedReceiver<Delivery>, BrokerError> {
        let mut inner = self.inner.lock().expect("broker mutex poisoned");
        let Some(state) = inner.queues.get_mut(queue) else {
            return Err(BrokerError::UnknownQueue(queue.to_string()));
        };

        let (sender, receiver) = mpsc::unbounded_channel();
        while let Some(delivery) = state.backlog.pop_front() {
            // Receiver is brand new and in scope, the send cannot fail.
            let _ = sender.send(delivery);
        }
        state.consumer = Some(sender);
        Ok(receiver)
    }

    async fn ack(&self, queue: &str, delivery_tag: u64) -> Result<(), BrokerError> {
        let mut inner = self.inner.lock().expect("broker mutex poisoned");
        let Some(state) = inner.queues.get_mut(queue) else {
            return Err(BrokerError::UnknownQueue(queue.to_string()));
        };
        state.acked.push(delivery_tag);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn topology(broker: &InMemoryBroker) {
        broker.declare_exchange("propsync").await.expect("exchange");
        broker.declare_queue("inbox").await.expect("queue");
        broker
            .bind_queue("inbox", "propsync", "wrappers.*.reservations")
            .await
            .expect("binding");
    }

    #[tokio::test]
    async fn backlog_is_delivered_in_publish_order() {
        let broker = InMemoryBroker::default();
        topology(&broker).await;

        for n in 0..3u8 {
            broker
                .publish("propsync", "wrappers.zooking.reservations", vec![n])
                .await
                .expect("publish");
        }
        assert_eq!(broker.backlog_len("inbox"), 3);

        let mut rx = broker.consume("inbox").await.expect("consume");
        for n in 0..3u8 {
            let delivery = rx.recv().await.expect("delivery");
            assert_eq!(delivery.payload, vec![n]);
        }
    }

    #[tokio::test]
    async fn overlapping_bindings_deliver_one_copy() {
        let broker = InMemoryBroker::default();
        topology(&broker).await;
        broker
            .bind_queue("inbox", "propsync", "wrappers.#")
            .await
            .expect("binding");

        broker
            .publish("propsync", "wrappers.zooking.reservations", vec![1])
            .await
            .expect("publish");
        assert_eq!(broker.backlog_len("inbox"), 1);
    }

    #[tokio::test]
    async fn unmatched_keys_vanish_silently() {
        let broker = InMemoryBroker::default();
        topology(&broker).await;

        broker
            .publish("propsync", "analytics.data.snapshots", vec![1])
            .await
            .expect("publish succeeds with no matching binding");
        assert_eq!(broker.backlog_len("inbox"), 0);
    }

    #[tokio::test]
    async fn publishing_to_an_undeclared_exchange_fails() {
        let broker = InMemoryBroker::default();
        let err = broker
            .publish("ghost", "a.b", vec![])
            .await
            .expect_err("unknown exchange rejected");
        assert!(matches!(err, BrokerError::UnknownExchange(_)));
    }

    #[tokio::test]
    async fn acks_are_recorded_per_queue() {
        let broker = InMemoryBroker::default();
        topology(&broker).await;

        broker
            .publish("propsync", "wrappers.zooking.reservations", vec![7])
            .await
            .expect("publish");
        let mut rx = broker.consume("inbox").await.expect("consume");
        let delivery = rx.recv().await.expect("delivery");

        broker
            .ack("inbox", delivery.delivery_tag)
            .await
            .expect("ack");
        assert_eq!(broker.acked("inbox"), vec![delivery.delivery_tag]);
    }
}
