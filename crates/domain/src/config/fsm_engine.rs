use serde::{Deserialize, Serialize};

/// FSM engine evaluation intervals, all in seconds.
///
/// `target` drives the periodic per-zone stimulus, `minimum`/`maximum`
/// bound the retry window for delayed zones, and `complete` is the sweep
/// that touches every auto-mode zone to catch lost stimuli.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FsmIntervals {
    #[serde(default = "default_target")]
    pub target: u64,

    #[serde(default = "default_minimum")]
    pub minimum: u64,

    #[serde(default = "default_maximum")]
    pub maximum: u64,

    #[serde(default = "default_complete")]
    pub complete: u64,
}

impl Default for FsmIntervals {
    fn default() -> Self {
        Self {
            target: default_target(),
            minimum: default_minimum(),
            maximum: default_maximum(),
            complete: default_complete(),
        }
    }
}

impl FsmIntervals {
    /// Force `minimum <= target <= maximum` and a sane sweep interval.
    pub fn clamp(&mut self) {
        if self.minimum == 0 {
            self.minimum = 1;
        }
        if self.maximum < self.minimum {
            self.maximum = self.minimum;
        }
        self.target = self.target.clamp(self.minimum, self.maximum);
        if self.complete < self.maximum {
            self.complete = self.maximum;
        }
    }
}

fn default_target() -> u64 {
    60
}

fn default_minimum() -> u64 {
    30
}

fn default_maximum() -> u64 {
    600
}

fn default_complete() -> u64 {
    3600
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FsmEngineConfig {
    #[serde(default)]
    pub intervals: FsmIntervals,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_orders_intervals() {
        let mut intervals = FsmIntervals {
            target: 5,
            minimum: 10,
            maximum: 8,
            complete: 3,
        };
        intervals.clamp();
        assert_eq!(intervals.minimum, 10);
        assert_eq!(intervals.maximum, 10);
        assert_eq!(intervals.target, 10);
        assert!(intervals.complete >= intervals.maximum);
    }
}
