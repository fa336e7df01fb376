pub mod mock_repositories;

pub use mock_repositories::{stub_engine, StubZoneRepository};
