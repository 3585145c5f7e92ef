use thiserror::Error;

/// Failures while wiring specdoc to its external collaborators at startup.
#[derive(Debug, Error)]
pub enum InfraError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("database error: {message}")]
    Database { message: String },
    #[error("{client} http client could not be built: {message}")]
    HttpClient {
        client: &'static str,
        message: String,
    },
    #[error("telemetry initialization failed: {0}")]
    Telemetry(String),
    #[error("configuration error: {message}")]
    Configuration { message: String },
}

impl InfraError {
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
        }
    }

    /// `client` names the outbound integration, e.g. `genai` or `fetch`.
    pub fn http_client(client: &'static str, err: impl std::fmt::Display) -> Self {
        Self::HttpClient {
            client,
            message: err.to_string(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn telemetry(message: impl Into<String>) -> Self {
        Self::Telemetry(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_client_errors_name_the_integration() {
        let err = InfraError::http_client("genai", "no tls backend");
        assert!(matches!(err, InfraError::HttpClient { client: "genai", .. }));
        assert_eq!(
            err.to_string(),
            "genai http client could not be built: no tls backend"
        );
    }
}
