//! Error types for the core data model.

/// Errors raised while resolving variables, checking legality or converting values.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// No component instance matches a component pattern.
    #[error("no component instance matches '{0}'")]
    NoComponentMatch(String),

    /// A component instance is not part of the system.
    #[error("component '{0}' not found")]
    ComponentNotFound(String),

    /// No variable of a component matches a variable pattern.
    #[error("no variable of component '{component}' matches '{pattern}'")]
    NoVariableMatch { component: String, pattern: String },

    /// Variables matched by one pattern disagree on a shared property.
    #[error("variable {name} matches '{pattern}', but its {property} differs from the first match")]
    InconsistentVariable {
        name: String,
        pattern: String,
        property: &'static str,
    },

    /// A variable referenced by name or reference does not exist.
    #[error("variable '{name}' not found in component '{component}'")]
    VariableNotFound { component: String, name: String },

    /// A case variable alias was not declared.
    #[error("case variable '{0}' is not defined")]
    UnknownAlias(String),

    /// A case variable alias was declared twice.
    #[error("case variable '{0}' is defined more than once")]
    DuplicateAlias(String),

    /// A malformed `variables` entry.
    #[error("variable spec for '{alias}': {reason}")]
    VariableSpec { alias: String, reason: String },

    /// A malformed or out-of-bounds `[range]` on a case variable.
    #[error("range '{range}' of variable '{alias}': {reason}")]
    InvalidRange {
        alias: String,
        range: String,
        reason: String,
    },

    /// An action violates the causality/variability timing rules.
    #[error("action not allowed: {0}")]
    Illegal(String),

    /// A value cannot be converted to the element type of a variable.
    #[error("cannot convert {value} to {target}")]
    Conversion { value: String, target: &'static str },

    /// A reference is not part of the reference tuple it should belong to.
    #[error("reference {0} is not part of the variable")]
    UnknownReference(u32),

    /// Refs and values of an action have different lengths.
    #[error("{refs} references but {values} values")]
    LengthMismatch { refs: usize, values: usize },
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = CoreError::UnknownAlias("h".into());
        assert_eq!(err.to_string(), "case variable 'h' is not defined");

        let err = CoreError::Illegal("Change of e at communication point".into());
        assert!(err.to_string().starts_with("action not allowed"));
    }
}
