use serde::{Deserialize, Serialize};

/// Recursive resolver used for peer discovery and parent-side checks.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResolverConfig {
    #[serde(default = "default_resolver_address")]
    pub address: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            address: default_resolver_address(),
        }
    }
}

fn default_resolver_address() -> String {
    "127.0.0.1:53".to_string()
}
