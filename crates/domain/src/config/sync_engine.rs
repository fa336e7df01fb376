use serde::{Deserialize, Serialize};

/// Peer synchronisation tickers, all in seconds.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SyncIntervals {
    /// BEAT summary to every known peer. Clamped to 15..=1800.
    #[serde(default = "default_heartbeat")]
    pub heartbeat: u64,

    /// FULLBEAT carrying the complete shared-zone set. Clamped to
    /// 60..=3600.
    #[serde(default = "default_fullbeat")]
    pub fullbeat: u64,

    /// Evaluation of wannabe peers. Clamped to 300..=1800.
    #[serde(default = "default_helloeval")]
    pub helloeval: u64,
}

impl Default for SyncIntervals {
    fn default() -> Self {
        Self {
            heartbeat: default_heartbeat(),
            fullbeat: default_fullbeat(),
            helloeval: default_helloeval(),
        }
    }
}

impl SyncIntervals {
    pub fn clamp(&mut self) {
        self.heartbeat = self.heartbeat.clamp(15, 1800);
        self.fullbeat = self.fullbeat.clamp(60, 3600);
        self.helloeval = self.helloeval.clamp(300, 1800);
    }
}

fn default_heartbeat() -> u64 {
    60
}

fn default_fullbeat() -> u64 {
    300
}

fn default_helloeval() -> u64 {
    600
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SyncEngineConfig {
    #[serde(default)]
    pub intervals: SyncIntervals,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_applies_bounds() {
        let mut intervals = SyncIntervals {
            heartbeat: 1,
            fullbeat: 100_000,
            helloeval: 0,
        };
        intervals.clamp();
        assert_eq!(intervals.heartbeat, 15);
        assert_eq!(intervals.fullbeat, 3600);
        assert_eq!(intervals.helloeval, 300);
    }
}
