mod auth;
pub use auth::{fetch_access_token, AccessToken, Credentials, CLIENT_ID_ENV, CLIENT_SECRET_ENV};

mod client;
pub use client::{ClientConfig, ProcessClient, DEFAULT_PROCESS_URL, DEFAULT_TOKEN_URL};

mod error;
pub use error::RemoteError;

mod request;
pub use request::{DataCollection, Evalscript, Polygon, TileRequest, TimeRange};
