use async_trait::async_trait;
use music_domain::{MusicError, Zone};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Arc;

use crate::ports::{DnsLookup, GroupRepository, SignerOps, SignerRepository, ZoneRepository};

/// Name of the terminal state shared by every process.
pub const TERMINAL_STATE: &str = "stop";

/// Everything a transition step may touch. Steps read consistent group
/// membership as observed when they load it and never mutate engine
/// scheduling state.
#[derive(Clone)]
pub struct FsmContext {
    pub zones: Arc<dyn ZoneRepository>,
    pub signers: Arc<dyn SignerRepository>,
    pub groups: Arc<dyn GroupRepository>,
    pub ops: Arc<dyn SignerOps>,
    pub lookup: Arc<dyn DnsLookup>,
}

/// Pre-condition, action and post-condition of one transition.
///
/// Actions must be idempotent or tolerant of partial prior effect: every
/// implementation follows fetch, diff, apply. A pre-condition returning
/// false is responsible for recording the stop-reason itself when the
/// zone should block rather than merely wait.
#[async_trait]
pub trait TransitionStep: Send + Sync {
    async fn pre_condition(&self, ctx: &FsmContext, zone: &Zone) -> Result<bool, MusicError>;

    async fn action(&self, ctx: &FsmContext, zone: &Zone) -> Result<(), MusicError>;

    async fn post_condition(&self, ctx: &FsmContext, zone: &Zone) -> Result<bool, MusicError>;
}

/// One outgoing edge of a state.
pub struct FsmTransition {
    pub next_state: String,
    pub description: String,
    pub step: Arc<dyn TransitionStep>,
}

impl FsmTransition {
    pub fn new(
        next_state: &str,
        description: &str,
        step: Arc<dyn TransitionStep>,
    ) -> Self {
        Self {
            next_state: next_state.to_string(),
            description: description.to_string(),
            step,
        }
    }
}

/// A named multi-step coordination procedure.
pub struct Process {
    pub name: String,
    pub description: String,
    pub initial_state: String,
    pub states: HashMap<String, Vec<FsmTransition>>,
}

impl Process {
    pub fn transitions(&self, state: &str) -> &[FsmTransition] {
        self.states.get(state).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has_state(&self, state: &str) -> bool {
        state == TERMINAL_STATE || self.states.contains_key(state)
    }

    pub fn state_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.states.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Every non-terminal state must have at least one outgoing
    /// transition and every next-state must exist.
    pub fn check(&self) -> Result<(), MusicError> {
        if !self.states.contains_key(&self.initial_state) {
            return Err(MusicError::ProcessNotFound(format!(
                "process {} has unknown initial state {}",
                self.name, self.initial_state
            )));
        }
        for (state, transitions) in &self.states {
            if transitions.is_empty() {
                return Err(MusicError::NoOutgoingTransitions);
            }
            for transition in transitions {
                if !self.has_state(&transition.next_state) {
                    return Err(MusicError::ProcessNotFound(format!(
                        "process {} transition {} -> {} targets unknown state",
                        self.name, state, transition.next_state
                    )));
                }
            }
        }
        Ok(())
    }

    /// Mermaid state diagram for the `process graph` API command.
    pub fn to_mermaid(&self) -> String {
        let mut graph = String::from("stateDiagram-v2\n");
        let _ = writeln!(graph, "    [*] --> {}", self.initial_state);
        let mut states: Vec<_> = self.states.iter().collect();
        states.sort_by_key(|(name, _)| name.as_str());
        for (state, transitions) in states {
            for transition in transitions {
                if transition.next_state == TERMINAL_STATE {
                    let _ = writeln!(graph, "    {} --> [*]: {}", state, transition.description);
                } else {
                    let _ = writeln!(
                        graph,
                        "    {} --> {}: {}",
                        state, transition.next_state, transition.description
                    );
                }
            }
        }
        graph
    }
}

/// All processes this sidecar can drive, registered once at startup.
#[derive(Default)]
pub struct ProcessRegistry {
    processes: HashMap<String, Arc<Process>>,
}

impl ProcessRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, process: Process) -> Result<(), MusicError> {
        process.check()?;
        self.processes
            .insert(process.name.clone(), Arc::new(process));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<Process>> {
        self.processes.get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.processes.keys().cloned().collect();
        names.sort();
        names
    }
}
