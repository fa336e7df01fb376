pub mod hello_service;
pub mod messages;

pub use hello_service::HelloService;
pub use messages::{BeatMsg, BeatResponse, FullBeatMsg, HelloMsg, HelloResponse};
