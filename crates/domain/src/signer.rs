use serde::{Deserialize, Serialize};

/// How RRsets are fetched from and pushed to one signer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UpdateMethod {
    Ddns,
    DesecApi,
}

impl UpdateMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateMethod::Ddns => "ddns",
            UpdateMethod::DesecApi => "desec-api",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ddns" => Some(UpdateMethod::Ddns),
            "desec-api" => Some(UpdateMethod::DesecApi),
            _ => None,
        }
    }
}

/// Credentials used towards one signer. DDNS signers use TSIG; API
/// signers use a bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SignerAuth {
    None,
    Tsig {
        key_name: String,
        algorithm: String,
        secret: String,
    },
    Token {
        token: String,
    },
}

impl Default for SignerAuth {
    fn default() -> Self {
        SignerAuth::None
    }
}

/// One member of a signer group.
///
/// Rate limits are per signer and per queue: `fetch_limit` and
/// `update_limit` are maximum operations per second.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signer {
    pub name: String,
    pub method: UpdateMethod,
    pub address: String,
    pub port: u16,
    #[serde(default)]
    pub auth: SignerAuth,
    #[serde(default = "default_fetch_limit")]
    pub fetch_limit: u32,
    #[serde(default = "default_update_limit")]
    pub update_limit: u32,
}

fn default_fetch_limit() -> u32 {
    5
}

fn default_update_limit() -> u32 {
    5
}

impl Signer {
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }

    pub fn tsig(&self) -> Option<(&str, &str, &str)> {
        match &self.auth {
            SignerAuth::Tsig {
                key_name,
                algorithm,
                secret,
            } => Some((key_name, algorithm, secret)),
            _ => None,
        }
    }

    pub fn api_token(&self) -> Option<&str> {
        match &self.auth {
            SignerAuth::Token { token } => Some(token),
            _ => None,
        }
    }
}
