//! Error types for loading, compiling and running cases.

use std::path::PathBuf;

use simx_assert::AssertError;
use simx_core::CoreError;
use simx_results::ResultsError;
use simx_system::SystemError;

#[derive(Debug, thiserror::Error)]
pub enum CaseError {
    /// I/O error reading the cases document.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Cases document not found.
    #[error("cases file not found: {}", path.display())]
    NotFound { path: PathBuf },

    /// The cases document cannot be turned into a case tree.
    #[error("case initialization: {0}")]
    Init(String),

    /// No case of that name in the tree.
    #[error("case '{0}' not found")]
    CaseNotFound(String),

    /// A spec key whose `@` part is not a time, `step` or a temporal spec.
    #[error("case '{case}': unknown action '{key}': {detail}")]
    UnknownAction {
        case: String,
        key: String,
        detail: String,
    },

    /// The system refuses an action at the requested time.
    #[error("case '{case}', key '{key}': {source}")]
    Legality {
        case: String,
        key: String,
        #[source]
        source: CoreError,
    },

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("assertion: {0}")]
    Assert(#[from] AssertError),

    #[error("results: {0}")]
    Results(#[from] ResultsError),

    #[error("system: {0}")]
    System(#[from] SystemError),
}

pub type Result<T> = std::result::Result<T, CaseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legality_error_carries_interface_message() {
        let err = CaseError::Legality {
            case: "base".into(),
            key: "g@1.0".into(),
            source: CoreError::Illegal("change of g at communication point".into()),
        };
        assert_eq!(
            err.to_string(),
            "case 'base', key 'g@1.0': action not allowed: change of g at communication point"
        );
    }
}
