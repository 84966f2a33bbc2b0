use thiserror::Error;
use std::io;

/// Custom result type alias for the application
pub type Result<T> = std::result::Result<T, ServiceError>;

/// Errors that can occur while harvesting a repository or talking to a model
#[derive(Debug, Error)]
pub enum ServiceError {
    /// I/O errors
    #[error("IO error: {0}")]
    IO(#[from] io::Error),

    /// HTTP request/response errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing/serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Settings file parse errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// The repository URL could not be split into owner and name
    #[error("Malformed repository URL: {0}")]
    MalformedUrl(String),

    /// The recursive tree listing returned a non-success status
    #[error("Could not fetch repo tree: {status} {body}")]
    TreeFetch {
        /// HTTP status code returned by the listing endpoint
        status: u16,
        /// Response body text
        body: String,
    },

    /// Required environment variables are absent
    #[error("Missing required environment variables: {}", .0.join(", "))]
    MissingEnv(Vec<String>),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(String),

    /// Input validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Text generation model errors
    #[error("Text generation error: {0}")]
    TextGeneration(String),

    /// Inference endpoint errors
    #[error("Inference endpoint error: {0}")]
    Inference(String),

    /// An error raised by one stage of the analysis pipeline
    #[error("{stage}: {source}")]
    Stage {
        /// Human readable stage description
        stage: &'static str,
        /// Underlying failure
        #[source]
        source: Box<ServiceError>,
    },
}

impl ServiceError {
    /// Wraps an error with the name of the pipeline stage that produced it
    pub fn in_stage(stage: &'static str, source: ServiceError) -> Self {
        Self::Stage {
            stage,
            source: Box::new(source),
        }
    }

    /// Returns the innermost error, looking through stage wrappers
    pub fn root(&self) -> &ServiceError {
        match self {
            Self::Stage { source, .. } => source.root(),
            other => other,
        }
    }

    /// Checks if this error was caused by bad caller input rather than a failing upstream
    pub fn is_client_error(&self) -> bool {
        matches!(
            self.root(),
            Self::MalformedUrl(_) | Self::Validation(_)
        )
    }

    /// HTTP status code to report for this error
    pub fn status_code(&self) -> u16 {
        if self.is_client_error() {
            400
        } else {
            500
        }
    }
}
