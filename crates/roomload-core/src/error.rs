use thiserror::Error;

/// Configuration problems detected before any participant is spawned.
#[derive(Debug, Error)]
pub enum SetupError {
    /// Target address could not be parsed.
    #[error("invalid url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
    /// Requested load exceeds what the managed hosting domain allows.
    #[error(
        "unable to load test {host}: at most {limit} participants per category are allowed"
    )]
    ManagedHostLimit { host: String, limit: usize },
    /// A run parameter is outside its accepted domain.
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}
