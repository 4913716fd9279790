use std::time::Duration;

use satlens_image::Image;

use super::auth::{fetch_access_token, Credentials};
use super::error::RemoteError;
use super::request::TileRequest;
use crate::functional::decode_image_rgb8;

/// Default OAuth2 token endpoint.
pub const DEFAULT_TOKEN_URL: &str = "https://services.sentinel-hub.com/oauth/token";

/// Default processing endpoint.
pub const DEFAULT_PROCESS_URL: &str = "https://services.sentinel-hub.com/api/v1/process";

/// Default timeout for HTTP requests (60 seconds).
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Default connection timeout (10 seconds).
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Endpoints and timeouts of the processing service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// OAuth2 token endpoint.
    pub token_url: String,
    /// Processing endpoint.
    pub process_url: String,
    /// Timeout of a whole request, body included.
    pub timeout: Duration,
    /// Timeout to establish a connection.
    pub connect_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            token_url: DEFAULT_TOKEN_URL.to_string(),
            process_url: DEFAULT_PROCESS_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

impl ClientConfig {
    /// Point both endpoints at another host, keeping the provider's paths.
    ///
    /// Useful for testing against a mock server.
    pub fn with_base_url(base_url: &str) -> Self {
        let base_url = base_url.trim_end_matches('/');
        Self {
            token_url: format!("{base_url}/oauth/token"),
            process_url: format!("{base_url}/api/v1/process"),
            ..Default::default()
        }
    }
}

/// Client fetching rendered tiles from the processing service.
pub struct ProcessClient {
    config: ClientConfig,
    http_client: reqwest::Client,
}

impl ProcessClient {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::Http`] if the HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self, RemoteError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .build()?;

        Ok(Self {
            config,
            http_client,
        })
    }

    /// The configuration of the client.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Fetch and decode a tile.
    ///
    /// A fresh access token is requested first; the tile request is only sent
    /// once a token was issued. The payload is decoded into an RGB image.
    ///
    /// # Errors
    ///
    /// * [`RemoteError::InvalidRequest`] if the request does not validate.
    /// * [`RemoteError::Auth`] if no token is issued.
    /// * [`RemoteError::RemoteFetch`] with the provider's error body on a
    ///   non-success status; the body is never decoded as an image.
    /// * [`RemoteError::Decode`] if the payload is not a raster.
    /// * [`RemoteError::Http`] on transport failures and timeouts.
    pub async fn fetch_image(
        &self,
        request: &TileRequest,
        credentials: &Credentials,
    ) -> Result<Image<u8, 3>, RemoteError> {
        request.validate()?;
        let body = request.to_json()?;

        let token =
            fetch_access_token(&self.http_client, &self.config.token_url, credentials).await?;

        log::info!(
            "requesting {}x{} tile from {}",
            request.width,
            request.height,
            self.config.process_url
        );

        let response = self
            .http_client
            .post(&self.config.process_url)
            .bearer_auth(token.as_str())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let payload = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            log::warn!("processing request failed with status {status}: {payload}");
            return Err(RemoteError::RemoteFetch {
                status: status.as_u16(),
                payload,
            });
        }

        let bytes = response.bytes().await?;
        let image = decode_image_rgb8(&bytes)?;

        log::info!("received {} tile ({} bytes)", image.size(), bytes.len());

        Ok(image)
    }
}
