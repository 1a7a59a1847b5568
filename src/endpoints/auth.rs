use log::debug;
use reqwest::Method;

use crate::endpoint::{Blueprint, Endpoint, Query, Resource};
use crate::error::Result;
use crate::request::AuthMode;
use crate::types::{RefreshTokenRequest, RefreshTokenResponse, SigninRequest, SigninResponse};

#[derive(Debug, Clone)]
pub struct Auth {
    endpoint: Endpoint,
}

impl Auth {
    pub fn signin(&self) -> AuthSignin {
        self.endpoint.child()
    }

    pub fn token(&self) -> AuthToken {
        self.endpoint.child()
    }
}

impl Resource for Auth {
    const BLUEPRINT: Blueprint = Blueprint::new("auth");

    fn from_endpoint(endpoint: Endpoint) -> Self {
        Self { endpoint }
    }

    fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }
}

/// `POST /auth/signin`
#[derive(Debug, Clone)]
pub struct AuthSignin {
    endpoint: Endpoint,
}

impl AuthSignin {
    /// Exchange email and password for an access and a refresh token
    pub fn post(&self, email: &str, password: &str) -> Result<SigninResponse> {
        let body = serde_json::to_value(SigninRequest { email, password })?;
        let response =
            self.endpoint
                .request(Method::POST, Some(body), Query::new(), AuthMode::Anonymous)?;
        let tokens: SigninResponse = response.data()?;
        debug!("Signed in as {}", email);
        Ok(tokens)
    }
}

impl Resource for AuthSignin {
    const BLUEPRINT: Blueprint = Blueprint::new("signin");

    fn from_endpoint(endpoint: Endpoint) -> Self {
        Self { endpoint }
    }

    fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }
}

/// `POST /auth/token`
#[derive(Debug, Clone)]
pub struct AuthToken {
    endpoint: Endpoint,
}

impl AuthToken {
    /// Exchange a refresh token for a new access token
    pub fn post(&self, refresh_token: &str) -> Result<String> {
        let body = serde_json::to_value(RefreshTokenRequest { refresh_token })?;
        let response =
            self.endpoint
                .request(Method::POST, Some(body), Query::new(), AuthMode::Anonymous)?;
        let token: RefreshTokenResponse = response.data()?;
        Ok(token.access_token)
    }
}

impl Resource for AuthToken {
    const BLUEPRINT: Blueprint = Blueprint::new("token");

    fn from_endpoint(endpoint: Endpoint) -> Self {
        Self { endpoint }
    }

    fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use crate::endpoints::Root;
    use crate::error::Error;
    use crate::session::Session;
    use crate::transport::testing::ScriptedTransport;

    fn connected_root() -> (Root, ScriptedTransport) {
        let transport = ScriptedTransport::new();
        let session = Session::new(Arc::new(transport.clone()));
        session.connect().unwrap();
        (Root::new("base", session), transport)
    }

    #[test]
    fn test_signin_posts_credentials_without_access_token() {
        let (root, transport) = connected_root();
        transport.push(
            200,
            r#"{"data":{"accessToken":"access_token","refreshToken":"refresh_token"}}"#,
        );

        let tokens = root.auth().signin().post("email", "password").unwrap();

        assert_eq!(tokens.access_token, "access_token");
        assert_eq!(tokens.refresh_token, "refresh_token");
        let sent = transport.requests();
        assert_eq!(sent[0].url, "base/v1/auth/signin");
        assert_eq!(
            sent[0].body,
            Some(json!({"email": "email", "password": "password"}))
        );
    }

    #[test]
    fn test_token_posts_refresh_token() {
        let (root, transport) = connected_root();
        transport.push(200, r#"{"data":{"accessToken":"access_token"}}"#);

        let token = root.auth().token().post("refresh_token").unwrap();

        assert_eq!(token, "access_token");
        let sent = transport.requests();
        assert_eq!(sent[0].url, "base/v1/auth/token");
        assert_eq!(sent[0].body, Some(json!({"refreshToken": "refresh_token"})));
    }

    #[test]
    fn test_bad_credentials_surface_as_api_error() {
        let (root, transport) = connected_root();
        transport.push(401, r#"{"message":"InvalidCredentials"}"#);

        let result = root.auth().signin().post("email", "wrong");

        assert!(matches!(result, Err(Error::Api { .. })));
        assert_eq!(transport.requests().len(), 1);
    }

    #[test]
    fn test_signin_response_without_tokens_is_rejected() {
        let (root, transport) = connected_root();
        transport.push(200, r#"{"data":{}}"#);

        assert!(root.auth().signin().post("email", "password").is_err());
    }
}
