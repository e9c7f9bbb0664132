//! Error types for graphload

use thiserror::Error;

/// Result type alias for graphload setup operations
pub type Result<T> = std::result::Result<T, GraphLoadError>;

/// Errors raised before ingestion starts.
///
/// Every variant here is fatal for a run: a bad configuration or an invalid
/// graph schema aborts the program before the first record is read.
#[derive(Error, Debug)]
pub enum GraphLoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid graph schema: {0}")]
    Schema(String),
}

impl GraphLoadError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a schema error
    pub fn schema(msg: impl Into<String>) -> Self {
        Self::Schema(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = GraphLoadError::schema("edge 'Knows' references unknown node 'Pet'");
        assert_eq!(
            err.to_string(),
            "Invalid graph schema: edge 'Knows' references unknown node 'Pet'"
        );

        let err = GraphLoadError::config("max_tasks must be greater than 0");
        assert!(err.to_string().starts_with("Configuration error"));
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "graph.json");
        let err: GraphLoadError = io.into();
        assert!(matches!(err, GraphLoadError::Io(_)));
    }
}
