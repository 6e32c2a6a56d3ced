//! Asynchronous property-synchronization and pricing-orchestration engine.
//!
//! The crate folds wrapper-service import batches into a canonical property
//! store without duplicates, runs a correlated price recommendation cycle
//! against an analytics collaborator, and broadcasts property mutations to
//! every wrapper listener over a topic broker. Persistence and the broker
//! transport are collaborator seams ([`store::PropertyStore`],
//! [`messaging::MessageTransport`]); in-memory implementations ship in-crate
//! for tests, the demo command, and single-process runs.

pub mod config;
pub mod domain;
pub mod error;
pub mod messaging;
pub mod store;
pub mod sync;
pub mod telemetry;
