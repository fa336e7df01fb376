//! MUSIC Application Layer
//!
//! Ports (trait seams towards storage, signers, DNS and peers), the
//! per-zone FSM engine with its process definitions, admin use cases and
//! the peer synchronisation service.
pub mod fsm;
pub mod ports;
pub mod services;
pub mod use_cases;
