use serde::{Deserialize, Serialize};

/// This sidecar's API endpoint as announced to peers.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SidecarApiConfig {
    #[serde(default)]
    pub addresses: Vec<String>,

    #[serde(default = "default_api_port")]
    pub port: u16,

    pub cert_file: String,
    pub key_file: String,

    /// Base-URI template published in the URI record, with `{TARGET}` and
    /// `{PORT}` placeholders.
    #[serde(default = "default_base_uri")]
    pub base_uri: String,
}

fn default_api_port() -> u16 {
    8453
}

fn default_base_uri() -> String {
    "https://{TARGET}:{PORT}/api/v1".to_string()
}

/// This sidecar's DNS endpoint as announced to peers.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SidecarDnsConfig {
    #[serde(default)]
    pub addresses: Vec<String>,

    #[serde(default = "default_dns_port")]
    pub port: u16,

    /// SIG(0) private key file in BIND format.
    pub key_file: String,
}

fn default_dns_port() -> u16 {
    5302
}

/// Identity and transport endpoints of this sidecar.
///
/// At least one of `api` and `dns` must be configured; peers pick the
/// method advertised in the zone's HSYNC RRset.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SidecarConfig {
    /// DNS name identifying this sidecar towards its peers.
    #[serde(default)]
    pub identity: String,

    pub api: Option<SidecarApiConfig>,
    pub dns: Option<SidecarDnsConfig>,
}
