pub mod durable_writer;

pub use durable_writer::{DurableTx, DurableUpdate, DurableWriter, StopReasonCache};
