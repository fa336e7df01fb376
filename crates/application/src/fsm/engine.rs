use chrono::{DateTime, Utc};
use dashmap::DashMap;
use music_domain::config::FsmIntervals;
use music_domain::{FsmStatus, MusicError, Zone};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::process::{FsmContext, FsmTransition, Process, ProcessRegistry, TERMINAL_STATE};

/// A stimulus asking the engine to look at one zone. `next_state`
/// disambiguates states with more than one outgoing transition and is
/// only ever set by the explicit `step-fsm` command.
#[derive(Debug, Clone)]
pub struct EngineCheck {
    pub zone: String,
    pub next_state: Option<String>,
}

impl EngineCheck {
    pub fn for_zone(zone: &str) -> Self {
        Self {
            zone: zone.to_string(),
            next_state: None,
        }
    }
}

/// What one evaluation of one zone did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvalOutcome {
    /// The transition committed.
    Advanced { from: String, to: String },
    /// The transition committed into the terminal state and the zone was
    /// detached from the process.
    Completed { process: String },
    /// A stop-reason was recorded; operator attention may be needed.
    Blocked { reason: String },
    /// A pre-condition was false without a stop-reason; the zone will be
    /// retried within the configured window.
    Delayed,
    /// The zone is not attached to any process.
    NoProcess,
    /// Another evaluation of this zone was already in flight.
    InFlight,
    /// The commit lost against a concurrent evaluation; nothing mutated.
    LostRace,
}

struct InFlightGuard<'a> {
    map: &'a DashMap<String, ()>,
    zone: String,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.map.remove(&self.zone);
    }
}

/// The per-zone FSM engine.
///
/// Reacts to `EngineCheck` stimuli; evaluations of distinct zones run in
/// parallel, at most one evaluation per zone at a time.
pub struct FsmEngine {
    ctx: FsmContext,
    processes: Arc<ProcessRegistry>,
    intervals: FsmIntervals,
    in_flight: DashMap<String, ()>,
    delayed: DashMap<String, DateTime<Utc>>,
    last_success: DashMap<String, DateTime<Utc>>,
}

impl FsmEngine {
    pub fn new(ctx: FsmContext, processes: Arc<ProcessRegistry>, intervals: FsmIntervals) -> Self {
        Self {
            ctx,
            processes,
            intervals,
            in_flight: DashMap::new(),
            delayed: DashMap::new(),
            last_success: DashMap::new(),
        }
    }

    pub fn processes(&self) -> &ProcessRegistry {
        &self.processes
    }

    /// Consume stimuli until shutdown. Each check is evaluated on its own
    /// task; the per-zone guard keeps concurrent checks for one zone from
    /// doing double work.
    pub async fn run(
        self: Arc<Self>,
        mut checks: mpsc::Receiver<EngineCheck>,
        shutdown: CancellationToken,
    ) {
        info!("FSM engine started");
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("FSM engine: shutting down");
                    break;
                }
                check = checks.recv() => {
                    let Some(check) = check else { break };
                    let engine = Arc::clone(&self);
                    tokio::spawn(async move {
                        match engine.evaluate(&check.zone, check.next_state.as_deref()).await {
                            Ok(outcome) => {
                                debug!(zone = %check.zone, outcome = ?outcome, "Evaluation finished");
                            }
                            Err(e) => {
                                error!(zone = %check.zone, error = %e, "Evaluation failed");
                            }
                        }
                    });
                }
            }
        }
    }

    /// Evaluate one zone: select a transition, run pre/action/post and
    /// commit the state change when the post-condition holds.
    pub async fn evaluate(
        &self,
        zone_name: &str,
        next_state: Option<&str>,
    ) -> Result<EvalOutcome, MusicError> {
        if self.in_flight.insert(zone_name.to_string(), ()).is_some() {
            return Ok(EvalOutcome::InFlight);
        }
        let _guard = InFlightGuard {
            map: &self.in_flight,
            zone: zone_name.to_string(),
        };

        let Some(zone) = self.ctx.zones.get_zone(zone_name).await? else {
            return Err(MusicError::ZoneNotFound(zone_name.to_string()));
        };

        if !zone.is_in_process() {
            return Ok(EvalOutcome::NoProcess);
        }

        let Some(process) = self.processes.get(&zone.fsm) else {
            let reason = format!("unknown process '{}'", zone.fsm);
            self.block(&zone, &reason).await?;
            return Ok(EvalOutcome::Blocked { reason });
        };

        if zone.state == TERMINAL_STATE {
            // A crash between commit and detach leaves the zone parked in
            // the terminal state; finish the bookkeeping now.
            return self.complete(&zone, &process).await;
        }

        let transition = match self.select_transition(&process, &zone, next_state) {
            Ok(transition) => transition,
            Err(MusicError::NoOutgoingTransitions) => {
                let reason = "no outgoing transitions".to_string();
                self.block(&zone, &reason).await?;
                return Ok(EvalOutcome::Blocked { reason });
            }
            Err(e) => return Err(e),
        };

        debug!(
            zone = %zone.name,
            process = %zone.fsm,
            state = %zone.state,
            next = %transition.next_state,
            "Attempting transition"
        );

        match transition.step.pre_condition(&self.ctx, &zone).await {
            Ok(true) => {}
            Ok(false) => {
                return self.hold(&zone).await;
            }
            Err(e) => {
                let reason = format!("pre-condition error: {}", e);
                self.block(&zone, &reason).await?;
                return Ok(EvalOutcome::Blocked { reason });
            }
        }

        if let Err(e) = transition.step.action(&self.ctx, &zone).await {
            // Action failure is equivalent to a false post-condition: no
            // state change, reason recorded, retried on a later stimulus.
            let reason = format!("{}", e);
            self.block(&zone, &reason).await?;
            return Ok(EvalOutcome::Blocked { reason });
        }

        match transition.step.post_condition(&self.ctx, &zone).await {
            Ok(true) => {}
            Ok(false) => {
                let reason = match self.ctx.zones.get_stop_reason(&zone.name).await? {
                    Some(reason) if !reason.is_empty() => reason,
                    _ => format!(
                        "post-condition false for transition {} -> {}",
                        zone.state, transition.next_state
                    ),
                };
                self.block(&zone, &reason).await?;
                return Ok(EvalOutcome::Blocked { reason });
            }
            Err(e) => {
                let reason = format!("post-condition error: {}", e);
                self.block(&zone, &reason).await?;
                return Ok(EvalOutcome::Blocked { reason });
            }
        }

        match self
            .ctx
            .zones
            .state_transition(&zone.name, &zone.state, &transition.next_state)
            .await
        {
            Ok(()) => {}
            Err(MusicError::StateMismatch { .. }) => {
                warn!(zone = %zone.name, state = %zone.state, "Lost transition race");
                return Ok(EvalOutcome::LostRace);
            }
            Err(e) => return Err(e),
        }

        self.delayed.remove(&zone.name);
        self.last_success.insert(zone.name.clone(), Utc::now());

        info!(
            zone = %zone.name,
            process = %zone.fsm,
            from = %zone.state,
            to = %transition.next_state,
            "Transition committed"
        );

        if transition.next_state == TERMINAL_STATE {
            let mut done = zone.clone();
            done.state = TERMINAL_STATE.to_string();
            return self.complete(&done, &process).await;
        }

        Ok(EvalOutcome::Advanced {
            from: zone.state.clone(),
            to: transition.next_state.clone(),
        })
    }

    fn select_transition<'p>(
        &self,
        process: &'p Process,
        zone: &Zone,
        next_state: Option<&str>,
    ) -> Result<&'p FsmTransition, MusicError> {
        let transitions = process.transitions(&zone.state);
        match transitions.len() {
            0 => Err(MusicError::NoOutgoingTransitions),
            1 => Ok(&transitions[0]),
            _ => {
                let Some(wanted) = next_state else {
                    return Err(MusicError::NextStateRequired);
                };
                transitions
                    .iter()
                    .find(|t| t.next_state == wanted)
                    .ok_or_else(|| {
                        MusicError::StateMismatch {
                            zone: zone.name.clone(),
                            expected: wanted.to_string(),
                            actual: zone.state.clone(),
                        }
                    })
            }
        }
    }

    /// Pre-condition was false. If the predicate recorded a stop-reason
    /// the zone is blocked, otherwise it is merely delayed and will be
    /// retried inside the configured window.
    async fn hold(&self, zone: &Zone) -> Result<EvalOutcome, MusicError> {
        self.delayed.insert(zone.name.clone(), Utc::now());
        match self.ctx.zones.get_stop_reason(&zone.name).await? {
            Some(reason) if !reason.is_empty() => Ok(EvalOutcome::Blocked { reason }),
            _ => {
                self.ctx
                    .zones
                    .set_fsm_status(&zone.name, FsmStatus::Delayed)
                    .await?;
                Ok(EvalOutcome::Delayed)
            }
        }
    }

    async fn block(&self, zone: &Zone, reason: &str) -> Result<(), MusicError> {
        self.delayed.insert(zone.name.clone(), Utc::now());
        self.ctx.zones.set_stop_reason(&zone.name, reason).await
    }

    async fn complete(
        &self,
        zone: &Zone,
        process: &Process,
    ) -> Result<EvalOutcome, MusicError> {
        self.ctx.zones.detach_fsm(&zone.name, &process.name).await?;
        if let Some(group) = &zone.signer_group {
            let unlocked = self.ctx.groups.check_if_process_complete(group).await?;
            if unlocked {
                info!(group = %group, process = %process.name, "Group process complete");
            }
        }
        self.delayed.remove(&zone.name);
        self.last_success.insert(zone.name.clone(), Utc::now());
        Ok(EvalOutcome::Completed {
            process: process.name.clone(),
        })
    }

    /// Delayed zones whose retry window is open: at least `minimum`
    /// seconds since the last attempt. Zones past `maximum` are always
    /// due.
    pub fn due_for_retry(&self) -> Vec<String> {
        let now = Utc::now();
        let minimum = self.intervals.minimum as i64;
        self.delayed
            .iter()
            .filter(|entry| (now - *entry.value()).num_seconds() >= minimum)
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Filter for the `complete` sweep: skip zones that advanced within
    /// the last `minimum` seconds.
    pub fn sweep_worthy(&self, zone: &str) -> bool {
        let minimum = self.intervals.minimum as i64;
        match self.last_success.get(zone) {
            Some(at) => (Utc::now() - *at.value()).num_seconds() >= minimum,
            None => true,
        }
    }

    pub fn intervals(&self) -> &FsmIntervals {
        &self.intervals
    }
}
