use thiserror::Error;

/// Core error type for the trellis framework.
///
/// The construction engine itself never fails fatally (resolution misses
/// resolve to `None`, bad injections are dropped); these errors surface at
/// the collaborator boundaries — configuration parsing and container
/// instantiation.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Instantiation failed for type '{type_tag}': {message}")]
    Instantiation { type_tag: String, message: String },

    #[error("Unknown type tag: {type_tag}")]
    UnknownType { type_tag: String },
}

impl CoreError {
    /// Create a new configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a new instantiation error
    pub fn instantiation(type_tag: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Instantiation {
            type_tag: type_tag.into(),
            message: message.into(),
        }
    }

    /// Create a new unknown-type error
    pub fn unknown_type(type_tag: impl Into<String>) -> Self {
        Self::UnknownType {
            type_tag: type_tag.into(),
        }
    }

    /// Check if the error is a configuration error
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }

    /// Check if the error is an instantiation error
    pub fn is_instantiation(&self) -> bool {
        matches!(self, Self::Instantiation { .. } | Self::UnknownType { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_helper_constructors() {
        let err = CoreError::configuration("bad key");
        assert!(err.is_configuration());
        assert_eq!(err.to_string(), "Configuration error: bad key");

        let err = CoreError::instantiation("widget", "missing field");
        assert!(err.is_instantiation());
        assert_eq!(
            err.to_string(),
            "Instantiation failed for type 'widget': missing field"
        );
    }

    #[test]
    fn test_json_error_conversion() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{nope").unwrap_err();
        let err: CoreError = parse_err.into();
        assert!(matches!(err, CoreError::Json(_)));
    }
}
