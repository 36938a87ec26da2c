//! Domain errors.

use thiserror::Error;

/// Errors raised when constructing or validating domain values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// A field holds a value outside its allowed range.
    #[error("invalid {field}: {message}")]
    InvalidValue {
        /// Field name.
        field: String,
        /// What is wrong with it.
        message: String,
    },

    /// A string could not be parsed into the named type.
    #[error("cannot parse {type_name} from '{value}'")]
    Parse {
        /// Target type.
        type_name: &'static str,
        /// Offending input.
        value: String,
    },
}

impl DomainError {
    /// Shorthand for [`DomainError::InvalidValue`].
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }
}
