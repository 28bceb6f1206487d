use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// The common error type used by this crate
#[derive(Error, Debug)]
pub enum PcfgError {
    /// Reading or writing a file failed
    #[error("I/O failed: {0}")]
    Io(#[from] io::Error),

    /// A count record carried a count that is not a nonnegative number
    #[error("Invalid count '{value}' on line {line} in {path:?}")]
    InvalidCount {
        path: PathBuf,
        line: usize,
        value: String,
    },

    /// The worker pool for batch parsing could not be started
    #[error("Could not build parser thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// A parse result could not be serialized
    #[error("Could not serialize parse result: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PcfgError>;
