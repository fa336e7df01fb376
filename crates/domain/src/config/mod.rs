//! Configuration module for the MUSIC sidecar
//!
//! One file per YAML section:
//! - `root`: top-level config, loading and CLI overrides
//! - `api_server`: management API listener
//! - `database`: SQLite tuning
//! - `common`: logging and shared settings
//! - `fsm_engine`: FSM engine evaluation intervals
//! - `sidecar`: this sidecar's identity and transport endpoints
//! - `resolver`: recursive resolver used for discovery and parent checks
//! - `sync_engine`: peer heartbeat and hello-evaluation intervals
//! - `errors`: configuration errors

pub mod api_server;
pub mod common;
pub mod database;
pub mod errors;
pub mod fsm_engine;
pub mod resolver;
pub mod root;
pub mod sidecar;
pub mod sync_engine;

pub use api_server::ApiServerConfig;
pub use common::CommonConfig;
pub use database::DatabaseConfig;
pub use errors::ConfigError;
pub use fsm_engine::{FsmEngineConfig, FsmIntervals};
pub use resolver::ResolverConfig;
pub use root::{CliOverrides, Config};
pub use sidecar::{SidecarApiConfig, SidecarConfig, SidecarDnsConfig};
pub use sync_engine::{SyncEngineConfig, SyncIntervals};
