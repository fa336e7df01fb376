//! The per-zone coordination FSM.
//!
//! Processes are data: a named map from state to outgoing transitions,
//! each transition carrying a pre-condition, an action and a
//! post-condition. The engine owns scheduling, stop-reason bookkeeping
//! and the atomic state commit; the steps own all signer and DNS I/O.

pub mod engine;
pub mod process;
pub mod processes;

pub use engine::{EngineCheck, EvalOutcome, FsmEngine};
pub use process::{
    FsmContext, FsmTransition, Process, ProcessRegistry, TransitionStep, TERMINAL_STATE,
};

pub use processes::{PROCESS_ADD_SIGNER, PROCESS_REMOVE_SIGNER, PROCESS_VERIFY_ZONE_SYNC};
