use serde::Deserialize;

use super::error::RemoteError;

/// The environment variable holding the OAuth2 client id.
pub const CLIENT_ID_ENV: &str = "SATLENS_CLIENT_ID";

/// The environment variable holding the OAuth2 client secret.
pub const CLIENT_SECRET_ENV: &str = "SATLENS_CLIENT_SECRET";

/// OAuth2 client credentials for the imagery provider.
#[derive(Clone)]
pub struct Credentials {
    client_id: String,
    client_secret: String,
}

impl Credentials {
    /// Create credentials from an explicit client id and secret.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Read the credentials from [`CLIENT_ID_ENV`] and [`CLIENT_SECRET_ENV`].
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::MissingCredentials`] if a variable is unset or empty.
    pub fn from_env() -> Result<Self, RemoteError> {
        let read = |name: &str| {
            std::env::var(name)
                .ok()
                .filter(|v| !v.is_empty())
                .ok_or_else(|| RemoteError::MissingCredentials(name.to_string()))
        };

        Ok(Self::new(read(CLIENT_ID_ENV)?, read(CLIENT_SECRET_ENV)?))
    }

    /// The client id.
    pub fn client_id(&self) -> &str {
        &self.client_id
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Bearer token issued by the identity endpoint.
///
/// A token is requested for every acquisition and used for a single request.
pub struct AccessToken(String);

impl AccessToken {
    /// The raw token string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
}

/// Exchange client credentials for an access token.
///
/// Sends a form encoded `client_credentials` grant to `token_url`.
///
/// # Errors
///
/// Returns [`RemoteError::Auth`] when the endpoint answers with a non-success
/// status, a body that is not JSON, or a body without `access_token`, and
/// [`RemoteError::Http`] when the request cannot be sent.
pub async fn fetch_access_token(
    http_client: &reqwest::Client,
    token_url: &str,
    credentials: &Credentials,
) -> Result<AccessToken, RemoteError> {
    let response = http_client
        .post(token_url)
        .form(&[
            ("grant_type", "client_credentials"),
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.as_str()),
        ])
        .send()
        .await?;

    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        return Err(RemoteError::Auth(format!(
            "token endpoint returned status {status}: {body}"
        )));
    }

    let token: TokenResponse = serde_json::from_str(&body)
        .map_err(|e| RemoteError::Auth(format!("malformed token response: {e}")))?;

    match token.access_token {
        Some(token) if !token.is_empty() => {
            log::debug!("access token issued for client {}", credentials.client_id);
            Ok(AccessToken(token))
        }
        _ => Err(RemoteError::Auth(
            "token response has no access_token".to_string(),
        )),
    }
}
