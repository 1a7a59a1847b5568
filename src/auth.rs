use log::{debug, info};

use crate::config::Credentials;
use crate::endpoints::Root;
use crate::error::{Error, Result};
use crate::session::{AccessTokenRefresher, Session};

/// Obtains and renews access tokens for a session.
///
/// Sign-in stores both tokens in the session; refreshing reads the refresh
/// token back from the session and only replaces the access token.
#[derive(Debug, Clone)]
pub struct Authenticator {
    base_url: String,
    credentials: Credentials,
}

impl Authenticator {
    /// Fails when `credentials` hold neither email/password nor a refresh token
    pub fn new(base_url: impl Into<String>, credentials: Credentials) -> Result<Self> {
        credentials.validate()?;
        Ok(Self {
            base_url: base_url.into(),
            credentials,
        })
    }

    fn root(&self, session: &Session) -> Root {
        Root::new(self.base_url.clone(), session.clone())
    }

    /// Get a first access token: from the configured refresh token when
    /// there is one, by signing in otherwise.
    pub fn authenticate(&self, session: &Session) -> Result<()> {
        match self.credentials.configured_refresh_token() {
            Some(refresh_token) => {
                debug!("Authenticating with refresh token");
                session.set_refresh_token(refresh_token);
                self.refresh_access_token(session)
            }
            None => self.sign_in(session),
        }
    }

    pub fn sign_in(&self, session: &Session) -> Result<()> {
        let (email, password) = self.credentials.email_and_password().ok_or_else(|| {
            Error::Config("signing in requires an email and a password".to_string())
        })?;

        info!("Signing in as {}...", email);
        let tokens = self.root(session).auth().signin().post(email, password)?;
        session.set_refresh_token(tokens.refresh_token);
        session.set_access_token(&tokens.access_token)?;
        Ok(())
    }

    pub fn refresh_access_token(&self, session: &Session) -> Result<()> {
        let refresh_token = session.refresh_token().ok_or(Error::MissingRefreshToken)?;
        let access_token = self.root(session).auth().token().post(&refresh_token)?;
        session.set_access_token(&access_token)?;
        debug!("Access token refreshed");
        Ok(())
    }
}

impl AccessTokenRefresher for Authenticator {
    fn refresh_access_token(&self, session: &Session) -> Result<()> {
        Authenticator::refresh_access_token(self, session)
    }
}
