use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Cannot parse config file {path}: {source}")]
    Parse {
        path: String,
        source: serde_yaml::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
