#[derive(thiserror::Error, Debug, serde::Deserialize, serde::Serialize)]
pub enum Error {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Unsupported query: {0}")]
    UnsupportedQuery(String),

    #[error("Malformed upstream response: {0}")]
    MalformedUpstream(String),

    #[error("Network error: {0}")]
    Network(String),
}

impl Error {
    /// Stable discriminator recorded in failure-shaped result metadata.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::NotFound(_) => "not_found",
            Error::AccessDenied(_) => "access_denied",
            Error::UnsupportedQuery(_) => "unsupported_query",
            Error::MalformedUpstream(_) => "malformed_upstream",
            Error::Network(_) => "network",
        }
    }
}
