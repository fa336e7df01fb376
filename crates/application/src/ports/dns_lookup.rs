use async_trait::async_trait;
use music_domain::{MusicError, RecordType, Rrset};

/// Recursive and directed DNS lookups.
///
/// `query` goes through the configured recursive resolver; `query_at`
/// targets a specific server (the parent primary from the zone's
/// `parentaddr` metadata, or a signer). NODATA and NXDOMAIN come back as
/// an empty RRset so that wait-state predicates can poll without error
/// plumbing.
#[async_trait]
pub trait DnsLookup: Send + Sync {
    async fn query(&self, name: &str, rtype: RecordType) -> Result<Rrset, MusicError>;

    async fn query_at(
        &self,
        server: &str,
        name: &str,
        rtype: RecordType,
    ) -> Result<Rrset, MusicError>;
}
