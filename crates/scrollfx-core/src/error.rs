use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Unknown easing curve: '{0}'")]
    UnknownEasing(String),

    #[error("Target not found: {0}")]
    MissingTarget(String),

    #[error("Environment unsupported: {0}")]
    EnvironmentUnsupported(String),

    #[error("Config file error: {0}")]
    ConfigFile(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for errors that reject a registration or invocation up front
    /// (bad curve names, out-of-range values).
    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::Configuration(_) | Error::UnknownEasing(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
