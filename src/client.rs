use std::ops::Deref;
use std::sync::Arc;

use log::{debug, info};

use crate::auth::Authenticator;
use crate::config::{ClientConfig, Credentials, API_URL_PROD};
use crate::endpoints::Root;
use crate::error::Result;
use crate::session::Session;
use crate::transport::{Connector, HttpConnector};

/// Client for the boum API v1.
///
/// Construction only validates the credentials. A connection is opened and
/// an access token obtained by `connect()` or, scoped, by `enter()`; expired
/// access tokens are renewed transparently while connected.
///
/// ```no_run
/// use boum::{ApiClient, Credentials};
///
/// # fn main() -> boum::Result<()> {
/// let client = ApiClient::new(Credentials::password("me@example.com", "secret"))?;
/// let active = client.enter()?;
/// for id in active.root().devices().list()? {
///     println!("{}", id);
/// }
/// # Ok(())
/// # }
/// ```
pub struct ApiClient {
    base_url: String,
    session: Session,
    authenticator: Arc<Authenticator>,
}

impl ApiClient {
    pub fn new(credentials: Credentials) -> Result<Self> {
        Self::with_base_url(credentials, API_URL_PROD)
    }

    pub fn with_base_url(credentials: Credentials, base_url: impl Into<String>) -> Result<Self> {
        Self::with_connector(credentials, base_url, Arc::new(HttpConnector))
    }

    pub fn from_config(config: ClientConfig) -> Result<Self> {
        Self::with_base_url(config.credentials, config.base_url)
    }

    /// Build from `BOUM_API_BASE_URL` / `BOUM_API_REFRESH_TOKEN`
    pub fn from_env() -> Result<Self> {
        Self::from_config(ClientConfig::from_env()?)
    }

    /// Use a custom transport, e.g. a proxying or recording one
    pub fn with_connector(
        credentials: Credentials,
        base_url: impl Into<String>,
        connector: Arc<dyn Connector>,
    ) -> Result<Self> {
        let base_url = base_url.into();
        let authenticator = Arc::new(Authenticator::new(base_url.clone(), credentials)?);
        let session = Session::new(connector);
        session.set_refresher(authenticator.clone());

        Ok(Self {
            base_url,
            session,
            authenticator,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Entry point of the endpoint tree, `{base_url}/v1`
    pub fn root(&self) -> Root {
        Root::new(self.base_url.clone(), self.session.clone())
    }

    /// Open the session and authenticate. The session is closed again if
    /// authentication fails.
    pub fn connect(&self) -> Result<()> {
        info!("Connecting to {}", self.base_url);
        self.session.connect()?;
        if let Err(err) = self.authenticator.authenticate(&self.session) {
            self.session.disconnect();
            return Err(err);
        }
        debug!("Connected and authenticated");
        Ok(())
    }

    pub fn disconnect(&self) {
        self.session.disconnect();
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_connected()
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    /// Sign in again with the configured email and password
    pub fn signin(&self) -> Result<()> {
        self.authenticator.sign_in(&self.session)
    }

    pub fn refresh_access_token(&self) -> Result<()> {
        self.authenticator.refresh_access_token(&self.session)
    }

    /// Connect and return a guard that disconnects when dropped
    pub fn enter(&self) -> Result<ActiveSession<'_>> {
        self.connect()?;
        Ok(ActiveSession { client: self })
    }

    /// Run `f` inside a connected session; the session is closed afterwards
    /// whether or not `f` succeeds.
    pub fn scoped<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&ApiClient) -> Result<T>,
    {
        let active = self.enter()?;
        f(&*active)
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("session", &self.session)
            .finish()
    }
}

/// A connected, authenticated `ApiClient`; disconnects on drop
#[derive(Debug)]
pub struct ActiveSession<'a> {
    client: &'a ApiClient,
}

impl Deref for ActiveSession<'_> {
    type Target = ApiClient;

    fn deref(&self) -> &ApiClient {
        self.client
    }
}

impl Drop for ActiveSession<'_> {
    fn drop(&mut self) {
        self.client.disconnect();
    }
}
