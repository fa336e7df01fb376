pub mod dispatcher;
pub mod rate_limited;

pub use dispatcher::{UpdaterDispatcher, UpdaterRegistry};
pub use rate_limited::{QueueKind, RateLimitedQueue};
