use std::fmt;

use reqwest::StatusCode;

#[derive(Debug)]
pub enum Error {
    /// Invalid tree navigation or verb usage, detected before any request is sent
    Topology(String),
    /// A request was attempted without a connected session
    NotConnected,
    /// A domain request was attempted before an access token was installed
    NotAuthenticated,
    /// A token refresh was attempted without a refresh token
    MissingRefreshToken,
    Config(String),
    Validation(String),
    /// Non-2xx response from the API
    Api {
        status: StatusCode,
        body: String,
    },
    /// A successful response that lacks an expected field
    Payload(String),
    Http(reqwest::Error),
    Json(serde_json::Error),
}

impl Error {
    /// HTTP status of an API error, if this is one
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True for errors raised client-side because of the session state
    pub fn is_state_error(&self) -> bool {
        matches!(self, Error::NotConnected | Error::NotAuthenticated)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Topology(msg) => write!(f, "Endpoint usage error: {}", msg),
            Error::NotConnected => write!(
                f,
                "Not connected to the API. Call connect() or enter() first."
            ),
            Error::NotAuthenticated => write!(
                f,
                "Not authenticated. Sign in or refresh the access token first."
            ),
            Error::MissingRefreshToken => write!(f, "Authentication error: refresh token not set"),
            Error::Config(msg) => write!(f, "Configuration error: {}", msg),
            Error::Validation(msg) => write!(f, "Invalid value: {}", msg),
            Error::Api { status, body } => write!(f, "API error ({}): {}", status, body),
            Error::Payload(msg) => write!(f, "Unexpected response payload: {}", msg),
            Error::Http(err) => write!(f, "HTTP error: {}", err),
            Error::Json(err) => write!(f, "JSON parsing error: {}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Http(err) => Some(err),
            Error::Json(err) => Some(err),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Http(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
