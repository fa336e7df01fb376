use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Zone classification. Debug zones keep a local RRset cache in the
/// `records` table instead of talking to live signers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoneType {
    Normal,
    Debug,
}

impl ZoneType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ZoneType::Normal => "normal",
            ZoneType::Debug => "debug",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "normal" => Some(ZoneType::Normal),
            "debug" => Some(ZoneType::Debug),
            _ => None,
        }
    }
}

/// Whether the FSM engine may advance the zone on its own tickers or
/// only on explicit `step-fsm` commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FsmMode {
    Auto,
    Manual,
}

impl FsmMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FsmMode::Auto => "auto",
            FsmMode::Manual => "manual",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "auto" => Some(FsmMode::Auto),
            "manual" => Some(FsmMode::Manual),
            _ => None,
        }
    }
}

/// Engine-visible status of a zone inside its process.
///
/// `Blocked` always comes with a stop-reason; `Delayed` means a
/// pre-condition was false and the zone is waiting for its retry window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FsmStatus {
    #[default]
    None,
    Blocked,
    Delayed,
}

impl FsmStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FsmStatus::None => "",
            FsmStatus::Blocked => "blocked",
            FsmStatus::Delayed => "delayed",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "blocked" => FsmStatus::Blocked,
            "delayed" => FsmStatus::Delayed,
            _ => FsmStatus::None,
        }
    }
}

/// A DNS zone coordinated by this sidecar.
///
/// `fsm` is the name of the process the zone is currently attached to
/// (empty when none) and `state` the current state within it. The two are
/// either both set or both empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Zone {
    pub name: String,
    pub zone_type: ZoneType,
    pub fsm_mode: FsmMode,
    pub fsm: String,
    pub state: String,
    pub fsm_status: FsmStatus,
    pub signer_group: Option<String>,
    pub stop_reason: Option<String>,
    pub state_timestamp: DateTime<Utc>,
}

impl Zone {
    pub fn new(name: String, zone_type: ZoneType, fsm_mode: FsmMode) -> Self {
        Self {
            name,
            zone_type,
            fsm_mode,
            fsm: String::new(),
            state: String::new(),
            fsm_status: FsmStatus::None,
            signer_group: None,
            stop_reason: None,
            state_timestamp: Utc::now(),
        }
    }

    pub fn is_in_process(&self) -> bool {
        !self.fsm.is_empty()
    }

    pub fn is_blocked(&self) -> bool {
        self.fsm_status == FsmStatus::Blocked
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fsm_and_state_start_empty() {
        let zone = Zone::new("example.com.".into(), ZoneType::Normal, FsmMode::Auto);
        assert!(!zone.is_in_process());
        assert!(zone.state.is_empty());
        assert!(zone.stop_reason.is_none());
    }

    #[test]
    fn fsm_status_round_trip() {
        assert_eq!(FsmStatus::parse("blocked"), FsmStatus::Blocked);
        assert_eq!(FsmStatus::parse(""), FsmStatus::None);
        assert_eq!(FsmStatus::Delayed.as_str(), "delayed");
    }
}
