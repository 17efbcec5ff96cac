use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("\"{0}\" environment variable is required")]
    MissingVariable(&'static str),
}

/// How the invoking process should react to a failed probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureDisposition {
    /// Return the error to the runtime, which records the failed invocation.
    Propagate,
    /// Exit the process with a non-zero status so the next invocation starts cold.
    Terminate,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeError {
    #[error("failed to retrieve secret: {0}")]
    SecretRetrieval(String),
    #[error("failed to decode secret: {0}")]
    SecretDecode(String),
    #[error("failed to connect to database: {0}")]
    Connect(String),
    #[error("health-check query failed: {0}")]
    Query(String),
}

impl ProbeError {
    pub fn disposition(&self) -> FailureDisposition {
        match self {
            Self::SecretRetrieval(_) | Self::SecretDecode(_) => FailureDisposition::Propagate,
            Self::Connect(_) | Self::Query(_) => FailureDisposition::Terminate,
        }
    }
}
