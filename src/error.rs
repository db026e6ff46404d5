use std::error::Error;
use std::fmt;

/// Custom error type for the modeling core.
///
/// Every failure carries enough context to identify the offending row,
/// feature or artifact; nothing in the core swallows errors or substitutes
/// defaults for a failed computation.
#[derive(Debug)]
pub enum ModelError {
    /// Feature construction cannot produce a single valid row.
    InsufficientHistory { required: usize, available: usize },
    /// An operation was called that requires a prior `fit` or `load`.
    ModelNotFitted { operation: &'static str },
    /// A persisted feature-name list disagrees with the current builder.
    SchemaMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },
    /// Requested forecast horizon outside the supported set {1, 3, 7}.
    InvalidHorizon(u32),
    /// Upstream observation data is unavailable or malformed.
    UpstreamData(String),
    /// Reading or writing a model artifact failed.
    Artifact { path: String, reason: String },
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ModelError::InsufficientHistory {
                required,
                available,
            } => write!(
                f,
                "insufficient history: {} observations available, at least {} required",
                available, required
            ),
            ModelError::ModelNotFitted { operation } => {
                write!(f, "`{}` called before the model was fitted", operation)
            }
            ModelError::SchemaMismatch { expected, found } => write!(
                f,
                "artifact feature schema mismatch: expected [{}], found [{}]",
                expected.join(", "),
                found.join(", ")
            ),
            ModelError::InvalidHorizon(h) => {
                write!(f, "invalid forecast horizon {} (must be 1, 3 or 7 days)", h)
            }
            ModelError::UpstreamData(msg) => write!(f, "upstream data error: {}", msg),
            ModelError::Artifact { path, reason } => {
                write!(f, "model artifact error at {}: {}", path, reason)
            }
        }
    }
}

impl Error for ModelError {}
