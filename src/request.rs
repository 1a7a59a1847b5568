//! Request execution with transparent access-token renewal.
//!
//! A 401 whose body carries the `AccessTokenExpired` message triggers one
//! refresh through the session's `AccessTokenRefresher` and one re-send of
//! the same request. Any other 401 (e.g. bad credentials) is returned as a
//! plain API error.

use log::{info, warn};
use reqwest::StatusCode;

use crate::error::Result;
use crate::session::Session;
use crate::transport::{ApiRequest, ApiResponse};
use crate::types::ErrorResponse;

pub const ACCESS_TOKEN_EXPIRED_MESSAGE: &str = "AccessTokenExpired";

/// How a request interacts with authentication
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// Requires an access token and renews it once when it expired
    Refreshing,
    /// Token endpoints: no token required, no renewal
    Anonymous,
}

pub fn is_access_token_expired(response: &ApiResponse) -> bool {
    if response.status != StatusCode::UNAUTHORIZED {
        return false;
    }
    match response.json::<ErrorResponse>() {
        Ok(error) => error.message.as_deref() == Some(ACCESS_TOKEN_EXPIRED_MESSAGE),
        Err(_) => false,
    }
}

/// Send `request` through `session`, renewing the access token at most once.
pub fn execute(session: &Session, request: &ApiRequest, mode: AuthMode) -> Result<ApiResponse> {
    info!("Calling {} on {}...", request.method, request.url);
    let require_auth = mode == AuthMode::Refreshing;
    let mut response = session.dispatch(request, require_auth)?;

    if mode == AuthMode::Refreshing && is_access_token_expired(&response) {
        if let Some(refresher) = session.refresher() {
            info!("Access token expired. Refreshing...");
            refresher.refresh_access_token(session)?;
            info!("Access token refreshed. Retrying request...");
            response = session.dispatch(request, require_auth)?;
            if !response.is_success() {
                warn!(
                    "Retried {} on {} failed with {}",
                    request.method, request.url, response.status
                );
            }
        }
    }

    let response = response.error_for_status()?;
    info!("Request successful.");
    Ok(response)
}
