mod dispatcher;
mod envelope;
mod gateway;
mod memory;
pub mod topology;
mod transport;

pub use dispatcher::{DispatchError, InboundDispatcher};
pub use envelope::{
    AnalyticsBody, ChangedFields, DuplicateImportBody, Envelope, EnvelopeError, MessageKind,
    PriceRequestBody, PriceResponseBody, PropertyImportBody, PropertyUpdateBody,
    ReservationImportBody,
};
pub use gateway::BrokerGateway;
pub use memory::InMemoryBroker;
pub use topology::keys;
pub use transport::{BrokerError, Delivery, MessageTransport};
