use thiserror::Error;

/// Errors that escape the core library.
///
/// Provider failures other than geocoding never show up here: adapters
/// downgrade them to "no data" at their boundary.
#[derive(Debug, Error)]
pub enum TripError {
    #[error("Geocoding failed for '{query}' (status: {status}) - {message}")]
    Geocoding {
        query: String,
        status: String,
        message: String,
    },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl TripError {
    pub fn geocoding(
        query: impl Into<String>,
        status: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Geocoding {
            query: query.into(),
            status: status.into(),
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config { message: message.into() }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput { message: message.into() }
    }

    /// Short explanation suitable for printing next to the raw error.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            TripError::Geocoding { query, .. } => {
                format!("Could not find '{query}'. Check the spelling or try a larger place name.")
            }
            TripError::Config { message } => message.clone(),
            TripError::InvalidInput { message } => format!("Invalid input: {message}"),
            TripError::Http(_) => {
                "Unable to reach an external service. Please check your internet connection."
                    .to_string()
            }
            TripError::Io(_) | TripError::Json(_) | TripError::Csv(_) => {
                "Writing the export file failed. Please check the output path.".to_string()
            }
        }
    }
}
