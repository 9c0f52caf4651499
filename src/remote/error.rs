use thiserror::Error;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Still rate limited on '{path}' after {attempts} attempts")]
    RateLimitExceeded { path: String, attempts: u32 },

    #[error("AEMET rejected the API key: {description}")]
    Authentication { description: String },

    #[error("No AEMET resource at '{path}': {description}")]
    ResourceNotFound { path: String, description: String },

    #[error("AEMET answered '{path}' with status {status}: {description}")]
    Provider {
        path: String,
        status: u16,
        description: String,
    },

    #[error("Malformed AEMET response for '{path}': {description}")]
    MalformedResponse { path: String, description: String },

    #[error("Network request failed for {0}")]
    NetworkRequest(String, #[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("HTTP request failed for {url} with status {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("Failed to parse JSON from {url}")]
    JsonParse {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to build HTTP client")]
    ClientBuild(#[source] reqwest::Error),

    #[error("Request for '{0}' was cancelled")]
    Cancelled(String),
}
