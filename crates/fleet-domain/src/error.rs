/// Shared error type used across all fleet crates.
///
/// Kept transport-agnostic: the HTTP layer maps these to status codes, it
/// does not live in this enum. Parse failures never appear here — a bad
/// transcript line becomes a `malformed` record, not an `Err`.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("subprocess: {0}")]
    Subprocess(String),

    #[error("config: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
