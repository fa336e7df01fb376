use serde::{Deserialize, Serialize};

/// Management API listener settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiServerConfig {
    #[serde(default = "default_address")]
    pub address: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Static API key expected in the `X-API-Key` header.
    pub api_key: Option<String>,

    /// PEM certificate and key for serving the management API over TLS.
    /// Plain HTTP is used when unset.
    pub cert_file: Option<String>,
    pub key_file: Option<String>,
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            port: default_port(),
            api_key: None,
            cert_file: None,
            key_file: None,
        }
    }
}

fn default_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}
