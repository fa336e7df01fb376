use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum MusicError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Invalid zone name: {0}")]
    InvalidZoneName(String),

    #[error("Zone not found: {0}")]
    ZoneNotFound(String),

    #[error("Signer not found: {0}")]
    SignerNotFound(String),

    #[error("Signer group not found: {0}")]
    GroupNotFound(String),

    #[error("signer group {0} locked")]
    GroupLocked(String),

    #[error("Zone {zone} is in state '{actual}', expected '{expected}'")]
    StateMismatch {
        zone: String,
        expected: String,
        actual: String,
    },

    #[error("Zone {zone} is already attached to process {process}")]
    AlreadyAttached { zone: String, process: String },

    #[error("Zone {zone} is not attached to process {process}")]
    NotAttached { zone: String, process: String },

    #[error("Unknown process: {0}")]
    ProcessNotFound(String),

    #[error("next state not specified")]
    NextStateRequired,

    #[error("no outgoing transitions")]
    NoOutgoingTransitions,

    #[error("No updater registered for method: {0}")]
    UpdaterNotFound(String),

    #[error("Signer operation failed on {signer}: {detail}")]
    SignerOpFailed { signer: String, detail: String },

    #[error("Rate limited, expected available in {seconds} second")]
    RateLimited { seconds: u64 },

    #[error("Rate limit retries exhausted for signer {0}")]
    RateLimitExhausted(String),

    #[error("DNS protocol error: {0}")]
    DnsProtocol(String),

    #[error("Invalid record data: {0}")]
    InvalidRecord(String),

    #[error("Peer verification failed for {identity}: {detail}")]
    PeerVerification { identity: String, detail: String },

    #[error("Peer not found: {0}")]
    PeerNotFound(String),

    #[error("Operation timed out: {0}")]
    Timeout(String),

    #[error("Shutting down")]
    Shutdown,

    #[error("I/O error: {0}")]
    Io(String),
}
