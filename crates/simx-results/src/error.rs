//! Error types for the results store.

use simx_core::CoreError;

#[derive(Debug, thiserror::Error)]
pub enum ResultsError {
    /// I/O error reading/writing a results file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A results file that is not a header plus time-keyed records.
    #[error("malformed results file: {detail}")]
    Format { detail: String },

    /// A field spec that is not `component.variable[element]`.
    #[error("invalid field '{0}', expected component.variable or component.variable[element]")]
    Field(String),

    /// An element index beyond a recorded vector.
    #[error("element {index} of {field} not recorded at time {time}")]
    Element {
        field: String,
        index: usize,
        time: f64,
    },

    /// Recorded data refers to an unknown case variable.
    #[error(transparent)]
    Core(#[from] CoreError),
}

pub type Result<T> = std::result::Result<T, ResultsError>;
