pub mod discovery_scan;
pub mod fsm_ticker;
pub mod full_heartbeat;
pub mod heartbeat;
pub mod hello_eval;
pub mod runner;

pub use discovery_scan::DiscoveryScanJob;
pub use fsm_ticker::FsmTickerJob;
pub use full_heartbeat::FullHeartbeatJob;
pub use heartbeat::HeartbeatJob;
pub use hello_eval::HelloEvalJob;
pub use runner::JobRunner;
