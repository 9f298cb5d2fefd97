use thiserror::Error;

/// Top-level error type for Askline.
///
/// Subsystem crates define their own error types for the failures they
/// absorb locally; this type covers what can abort startup or a request at
/// the process boundary.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AsklineError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing credential: {0}")]
    MissingCredential(&'static str),

    #[error("API error: {0}")]
    Api(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<toml::de::Error> for AsklineError {
    fn from(err: toml::de::Error) -> Self {
        AsklineError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for AsklineError {
    fn from(err: toml::ser::Error) -> Self {
        AsklineError::Config(err.to_string())
    }
}

/// A specialized `Result` type for Askline operations.
pub type Result<T> = std::result::Result<T, AsklineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AsklineError::Config("missing field".to_string());
        assert_eq!(err.to_string(), "Configuration error: missing field");
    }

    #[test]
    fn test_missing_credential_display() {
        let err = AsklineError::MissingCredential("GOOGLE_API_KEY");
        assert_eq!(err.to_string(), "Missing credential: GOOGLE_API_KEY");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: AsklineError = io_err.into();
        assert!(matches!(err, AsklineError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_error_from_toml_de() {
        let err: std::result::Result<toml::Value, _> = toml::from_str("invalid = [[[");
        let err: AsklineError = err.unwrap_err().into();
        assert!(matches!(err, AsklineError::Config(_)));
    }

    #[test]
    fn test_result_type_with_question_mark() {
        fn inner() -> Result<String> {
            let io_result: std::result::Result<i32, std::io::Error> = Ok(42);
            let value = io_result?;
            Ok(value.to_string())
        }

        assert_eq!(inner().unwrap(), "42");
    }
}
