/// Default name of the single durable topic exchange.
pub const EXCHANGE: &str = "propsync";

/// Queue fed by owner/user account events. Observed and acknowledged only.
pub const USER_EVENTS_QUEUE: &str = "propsync.users";
/// Queue fed by wrapper-service import batches.
pub const IMPORT_QUEUE: &str = "propsync.imports";
/// Queue fed by analytics price responses.
pub const PRICING_QUEUE: &str = "propsync.pricing";
/// Queue collecting payloads the engine could not process. Never consumed
/// here; operators drain it out of band.
pub const DEAD_LETTER_QUEUE: &str = "propsync.dead_letter";

/// Routing keys, inbound and outbound.
pub mod keys {
    use crate::domain::ServiceTag;

    pub const USER_EVENTS: &str = "propsync.users.events";
    pub const IMPORT_RESPONSE: &str = "propsync.imports.response";
    pub const PRICING_RESPONSE: &str = "propsync.pricing.response";
    pub const DEAD_LETTER: &str = "propsync.dead_letter";
    pub const BROADCAST_UPDATES: &str = "wrappers.broadcast.updates";
    pub const PRICING_REQUEST: &str = "analytics.pricing.request";
    pub const ANALYTICS_DATA: &str = "analytics.data.snapshots";

    /// Key for the per-wrapper reservation remap message.
    pub fn reservations_for(service: &ServiceTag) -> String {
        format!("wrappers.{service}.reservations")
    }

    /// Key for the per-wrapper duplicate notice.
    pub fn duplicates_for(service: &ServiceTag) -> String {
        format!("wrappers.{service}.duplicates")
    }
}

/// A queue-to-routing-key binding declared at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueBinding {
    pub queue: &'static str,
    pub routing_key: &'static str,
}

/// Every binding the engine declares. The dead-letter queue is bound so
/// failed payloads are retained, but the engine never consumes it.
pub fn bindings() -> Vec<QueueBinding> {
    vec![
        QueueBinding {
            queue: USER_EVENTS_QUEUE,
            routing_key: keys::USER_EVENTS,
        },
        QueueBinding {
            queue: IMPORT_QUEUE,
            routing_key: keys::IMPORT_RESPONSE,
        },
        QueueBinding {
            queue: PRICING_QUEUE,
            routing_key: keys::PRICING_RESPONSE,
        },
        QueueBinding {
            queue: DEAD_LETTER_QUEUE,
            routing_key: keys::DEAD_LETTER,
        },
    ]
}

/// Queues the dispatcher consumes with full envelope handling.
pub fn dispatched_queues() -> [&'static str; 2] {
    [IMPORT_QUEUE, PRICING_QUEUE]
}

/// Topic-pattern match: patterns are `.`-separated words where `*` matches
/// exactly one word and `#` matches zero or more.
pub fn topic_matches(pattern: &str, routing_key: &str) -> bool {
    fn matches(pattern: &[&str], key: &[&str]) -> bool {
        match pattern.split_first() {
            None => key.is_empty(),
            Some((&"#", rest)) => {
                matches(rest, key) || (!key.is_empty() && matches(pattern, &key[1..]))
            }
            Some((&"*", rest)) => match key.split_first() {
                Some((_, key_rest)) => matches(rest, key_rest),
                None => false,
            },
            Some((word, rest)) => match key.split_first() {
                Some((head, key_rest)) => word == head && matches(rest, key_rest),
                None => false,
            },
        }
    }

    let pattern: Vec<&str> = pattern.split('.').collect();
    let key: Vec<&str> = routing_key.split('.').collect();
    matches(&pattern, &key)
}
