pub mod dns_lookup;
pub mod group_repository;
pub mod peer_directory;
pub mod signer_ops;
pub mod signer_repository;
pub mod zone_repository;

pub use dns_lookup::DnsLookup;
pub use group_repository::GroupRepository;
pub use peer_directory::{PeerDirectory, Wannabe};
pub use signer_ops::{SignerOp, SignerOpKind, SignerOpReply, SignerOps, SignerUpdater};
pub use signer_repository::SignerRepository;
pub use zone_repository::ZoneRepository;
