use thiserror::Error;

/// Errors raised while turning a request payload into a prediction
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PredictionError {
    #[error("Schema mismatch: {message}")]
    SchemaMismatch { message: String },

    #[error("Inference error: {message}")]
    Inference { message: String },
}

impl PredictionError {
    /// Create a schema mismatch error
    pub fn schema_mismatch<S: Into<String>>(message: S) -> Self {
        PredictionError::SchemaMismatch {
            message: message.into(),
        }
    }

    /// Create an inference error
    pub fn inference<S: Into<String>>(message: S) -> Self {
        PredictionError::Inference {
            message: message.into(),
        }
    }

    /// Stable machine-readable name used in error payloads
    pub fn kind(&self) -> &'static str {
        match self {
            PredictionError::SchemaMismatch { .. } => "schema_mismatch",
            PredictionError::Inference { .. } => "inference_error",
        }
    }
}

/// Errors raised while loading or validating a model artifact
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Failed to read model artifact {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed model artifact: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid model artifact: {0}")]
    Invalid(String),
}

impl ModelError {
    pub fn invalid<S: Into<String>>(message: S) -> Self {
        ModelError::Invalid(message.into())
    }
}
