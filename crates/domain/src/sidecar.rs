use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::net::IpAddr;

use crate::record::{HsyncMethod, KeyData, TlsaData};

/// Connection details for a peer's API method, resolved from
/// `api.<identity>` SVCB/URI and `_<port>._tcp.api.<identity>` TLSA.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SidecarApiDetails {
    pub addresses: Vec<IpAddr>,
    pub port: u16,
    pub tlsa: Option<TlsaData>,
    /// Base-URI template with `{TARGET}` and `{PORT}` placeholders.
    pub base_uri: String,
    pub last_refresh: DateTime<Utc>,
}

impl SidecarApiDetails {
    /// Expand the base-URI template for this peer.
    pub fn base_url(&self, identity: &str) -> String {
        let target = identity.trim_end_matches('.');
        self.base_uri
            .replace("{TARGET}", target)
            .replace("{PORT}", &self.port.to_string())
    }
}

/// Connection details for a peer's DNS method, resolved from
/// `dns.<identity>` SVCB and KEY.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SidecarDnsDetails {
    pub addresses: Vec<IpAddr>,
    pub port: u16,
    pub key: Option<KeyData>,
    pub last_refresh: DateTime<Utc>,
}

/// A peer sidecar (MSA), created on first discovery through a zone's
/// HSYNC RRset and dropped when that entry disappears.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sidecar {
    pub identity: String,
    pub methods: BTreeSet<HsyncMethod>,
    pub api: Option<SidecarApiDetails>,
    pub dns: Option<SidecarDnsDetails>,
    pub shared_zones: BTreeSet<String>,
    pub last_beat: Option<DateTime<Utc>>,
}

impl Sidecar {
    pub fn new(identity: String) -> Self {
        Self {
            identity,
            methods: BTreeSet::new(),
            api: None,
            dns: None,
            shared_zones: BTreeSet::new(),
            last_beat: None,
        }
    }

    pub fn supports(&self, method: HsyncMethod) -> bool {
        self.methods.contains(&method)
    }

    /// The method used to reach this peer; API wins when both are offered.
    pub fn preferred_method(&self) -> Option<HsyncMethod> {
        if self.supports(HsyncMethod::Api) {
            Some(HsyncMethod::Api)
        } else if self.supports(HsyncMethod::Dns) {
            Some(HsyncMethod::Dns)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_substitutes_placeholders() {
        let details = SidecarApiDetails {
            addresses: vec![],
            port: 8453,
            tlsa: None,
            base_uri: "https://{TARGET}:{PORT}/api/v1".into(),
            last_refresh: Utc::now(),
        };
        assert_eq!(
            details.base_url("msa1.example."),
            "https://msa1.example:8453/api/v1"
        );
    }

    #[test]
    fn api_preferred_over_dns() {
        let mut peer = Sidecar::new("msa1.example.".into());
        peer.methods.insert(HsyncMethod::Dns);
        assert_eq!(peer.preferred_method(), Some(HsyncMethod::Dns));
        peer.methods.insert(HsyncMethod::Api);
        assert_eq!(peer.preferred_method(), Some(HsyncMethod::Api));
    }
}
