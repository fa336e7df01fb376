//! MUSIC Domain Layer
pub mod config;
pub mod errors;
pub mod record;
pub mod sidecar;
pub mod signer;
pub mod signer_group;
pub mod validators;
pub mod zone;

pub use config::{CliOverrides, Config, ConfigError};
pub use errors::MusicError;
pub use record::{
    CdsData, CsyncData, DnskeyData, HsyncData, HsyncMethod, KeyData, RecordData, RecordType,
    Rrset, SoaData, SvcbData, TlsaData, UriData, ZoneRecord,
};
pub use sidecar::{Sidecar, SidecarApiDetails, SidecarDnsDetails};
pub use signer::{Signer, SignerAuth, UpdateMethod};
pub use signer_group::SignerGroup;
pub use zone::{FsmMode, FsmStatus, Zone, ZoneType};
