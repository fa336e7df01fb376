pub mod group_repository;
pub mod signer_repository;
pub mod zone_repository;

pub use group_repository::SqliteGroupRepository;
pub use signer_repository::SqliteSignerRepository;
pub use zone_repository::SqliteZoneRepository;
