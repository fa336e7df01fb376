pub mod mock_ports;

pub use mock_ports::{MockDirectory, MockDnsLookup, MockSignerOps, MockStore};
