use log::debug;

use crate::error::{Error, Result};

pub const API_URL_PROD: &str = "https://api.boum.us";
pub const API_URL_DEV: &str = "https://api-dev.boum.us";
pub const API_URL_LOCAL: &str = "http://localhost:3000/dev";

/// Path segment of the API version every endpoint lives under
pub const API_VERSION: &str = "v1";

pub const BASE_URL_ENV: &str = "BOUM_API_BASE_URL";
pub const REFRESH_TOKEN_ENV: &str = "BOUM_API_REFRESH_TOKEN";

/// Credentials used to obtain an access token.
///
/// Either an email/password pair or a refresh token must be present. When
/// both are given the refresh token wins.
#[derive(Clone, Default)]
pub struct Credentials {
    pub email: Option<String>,
    pub password: Option<String>,
    pub refresh_token: Option<String>,
}

impl Credentials {
    pub fn password(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
            password: Some(password.into()),
            refresh_token: None,
        }
    }

    pub fn refresh_token(token: impl Into<String>) -> Self {
        Self {
            email: None,
            password: None,
            refresh_token: Some(token.into()),
        }
    }

    /// Add a refresh token to email/password credentials
    pub fn with_refresh_token(mut self, token: impl Into<String>) -> Self {
        self.refresh_token = Some(token.into());
        self
    }

    pub(crate) fn email_and_password(&self) -> Option<(&str, &str)> {
        match (self.email.as_deref(), self.password.as_deref()) {
            (Some(email), Some(password)) if !email.is_empty() && !password.is_empty() => {
                Some((email, password))
            }
            _ => None,
        }
    }

    pub(crate) fn configured_refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref().filter(|t| !t.is_empty())
    }

    pub fn validate(&self) -> Result<()> {
        if self.configured_refresh_token().is_some() || self.email_and_password().is_some() {
            Ok(())
        } else {
            Err(Error::Config(
                "No credentials provided. Pass an email and password or a refresh token."
                    .to_string(),
            ))
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Everything needed to construct an `ApiClient`
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub credentials: Credentials,
}

impl ClientConfig {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            base_url: API_URL_PROD.to_string(),
            credentials,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Build a configuration from `BOUM_API_BASE_URL` and `BOUM_API_REFRESH_TOKEN`
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like `from_env`, reading variables through `lookup`
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = lookup(BASE_URL_ENV)
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| API_URL_PROD.to_string());

        let refresh_token = lookup(REFRESH_TOKEN_ENV)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| {
                Error::Config(format!(
                    "No credentials provided and {} is not set",
                    REFRESH_TOKEN_ENV
                ))
            })?;

        debug!("Loaded client configuration for {}", base_url);
        Ok(Self {
            base_url,
            credentials: Credentials::refresh_token(refresh_token),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_credentials_without_anything_are_rejected() {
        let result = Credentials::default().validate();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_credentials_with_email_only_are_rejected() {
        let credentials = Credentials {
            email: Some("email".to_string()),
            ..Default::default()
        };
        assert!(credentials.validate().is_err());
    }

    #[test]
    fn test_credentials_accept_password_refresh_token_or_both() {
        assert!(Credentials::password("email", "password").validate().is_ok());
        assert!(Credentials::refresh_token("refresh").validate().is_ok());
        assert!(Credentials::password("email", "password")
            .with_refresh_token("refresh")
            .validate()
            .is_ok());
    }

    #[test]
    fn test_credentials_debug_hides_secrets() {
        let credentials = Credentials::password("me@example.com", "hunter2")
            .with_refresh_token("secret-refresh");
        let debug = format!("{:?}", credentials);
        assert!(debug.contains("me@example.com"));
        assert!(!debug.contains("hunter2"));
        assert!(!debug.contains("secret-refresh"));
    }

    #[test]
    fn test_config_from_lookup_uses_env_values() {
        let config = ClientConfig::from_lookup(lookup_from(&[
            (BASE_URL_ENV, "http://localhost:1234"),
            (REFRESH_TOKEN_ENV, "refresh_token"),
        ]))
        .unwrap();

        assert_eq!(config.base_url, "http://localhost:1234");
        assert_eq!(
            config.credentials.refresh_token,
            Some("refresh_token".to_string())
        );
    }

    #[test]
    fn test_config_from_lookup_defaults_to_production() {
        let config =
            ClientConfig::from_lookup(lookup_from(&[(REFRESH_TOKEN_ENV, "refresh_token")]))
                .unwrap();
        assert_eq!(config.base_url, API_URL_PROD);
    }

    #[test]
    fn test_config_from_lookup_without_token_fails() {
        let result = ClientConfig::from_lookup(lookup_from(&[(BASE_URL_ENV, API_URL_DEV)]));
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
