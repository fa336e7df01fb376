//! MUSIC Infrastructure Layer
//!
//! SQLite repositories behind the application ports, the durable-update
//! writer task, the hickory-proto DNS client and signer updaters, the
//! rate-limited operation queues and the peer synchronisation transports.
pub mod database;
pub mod dns;
pub mod queue;
pub mod repositories;
pub mod store;
pub mod sync;
