use serde::{Deserialize, Serialize};

use super::api_server::ApiServerConfig;
use super::common::CommonConfig;
use super::database::DatabaseConfig;
use super::errors::ConfigError;
use super::fsm_engine::FsmEngineConfig;
use super::resolver::ResolverConfig;
use super::sidecar::SidecarConfig;
use super::sync_engine::SyncEngineConfig;
use crate::signer::Signer;
use crate::validators;

/// Overrides taken from the command line, applied after the file loads.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub api_port: Option<u16>,
    pub db_path: Option<String>,
    pub log_level: Option<String>,
}

/// Top-level sidecar configuration, one struct per YAML section.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub apiserver: ApiServerConfig,

    #[serde(default)]
    pub db: DatabaseConfig,

    #[serde(default)]
    pub common: CommonConfig,

    #[serde(default)]
    pub fsmengine: FsmEngineConfig,

    /// Signers known at startup; more can be added through the API.
    #[serde(default)]
    pub signers: Vec<Signer>,

    #[serde(default)]
    pub sidecar: SidecarConfig,

    #[serde(default)]
    pub resolver: ResolverConfig,

    #[serde(default)]
    pub syncengine: SyncEngineConfig,
}

impl Config {
    /// Load a config file (YAML) and apply CLI overrides. A missing path
    /// yields the built-in defaults.
    pub fn load(path: Option<&str>, overrides: CliOverrides) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: path.to_string(),
                    source,
                })?;
                serde_yaml::from_str(&text).map_err(|source| ConfigError::Parse {
                    path: path.to_string(),
                    source,
                })?
            }
            None => Config::default(),
        };

        if let Some(port) = overrides.api_port {
            config.apiserver.port = port;
        }
        if let Some(db_path) = overrides.db_path {
            config.db.path = db_path;
        }
        if let Some(level) = overrides.log_level {
            config.common.log_level = level;
        }

        config.fsmengine.intervals.clamp();
        config.syncengine.intervals.clamp();

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.sidecar.identity.is_empty()
            && !validators::is_valid_fqdn(&self.sidecar.identity)
        {
            return Err(ConfigError::Invalid(format!(
                "sidecar.identity '{}' is not a fully qualified DNS name",
                self.sidecar.identity
            )));
        }

        if self.sidecar.api.is_none() && self.sidecar.dns.is_none() && !self.sidecar.identity.is_empty() {
            return Err(ConfigError::Invalid(
                "sidecar.identity is set but neither sidecar.api nor sidecar.dns is configured"
                    .to_string(),
            ));
        }

        self.resolver
            .address
            .parse::<std::net::SocketAddr>()
            .map_err(|_| {
                ConfigError::Invalid(format!(
                    "resolver.address '{}' is not address:port",
                    self.resolver.address
                ))
            })?;

        for signer in &self.signers {
            if signer.name.is_empty() {
                return Err(ConfigError::Invalid("signer with empty name".to_string()));
            }
            if signer.fetch_limit == 0 || signer.update_limit == 0 {
                return Err(ConfigError::Invalid(format!(
                    "signer '{}' has a zero rate limit",
                    signer.name
                )));
            }
            if let Some((_, _, secret)) = signer.tsig() {
                validators::validate_tsig_secret(secret)
                    .map_err(|e| ConfigError::Invalid(format!("signer '{}': {}", signer.name, e)))?;
            }
        }

        Ok(())
    }
}
