use crate::error::IoError;

/// An error type for the remote acquisition.
#[derive(thiserror::Error, Debug)]
pub enum RemoteError {
    /// The identity endpoint did not issue an access token.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// The processing endpoint answered with a non-success status.
    #[error("Remote fetch failed with status {status}: {payload}")]
    RemoteFetch {
        /// HTTP status code returned by the provider.
        status: u16,
        /// Error body returned by the provider.
        payload: String,
    },

    /// The tile request is not well formed.
    #[error("Invalid tile request: {0}")]
    InvalidRequest(String),

    /// Transport level failure, including timeouts.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider payload could not be decoded as an image.
    #[error("Failed to decode the remote image. {0}")]
    Decode(#[from] IoError),

    /// A credential is missing from the environment.
    #[error("Missing credentials: {0} is not set")]
    MissingCredentials(String),
}
