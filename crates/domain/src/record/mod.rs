//! Domain-owned DNS record model.
//!
//! The domain layer never touches wire formats; infrastructure maps these
//! types to and from `hickory-proto` records. RDATA that the coordination
//! logic inspects (DNSKEY, CDS, CSYNC, TLSA, KEY, SVCB, URI, HSYNC) is
//! fully typed, everything else is carried in presentation form.

pub mod data;
pub mod rrset;
pub mod rtype;

pub use data::{
    CdsData, CsyncData, DnskeyData, HsyncData, HsyncMethod, KeyData, RecordData, SoaData,
    SvcbData, TlsaData, UriData,
};
pub use rrset::{Rrset, ZoneRecord};
pub use rtype::RecordType;
