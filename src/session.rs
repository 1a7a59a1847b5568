//! The session shared by every endpoint node of one client.
//!
//! A `Session` is a cheap handle; clones point at the same transport,
//! tokens and Authorization header, so installing a token through any
//! handle is seen by all nodes on their next request.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use log::debug;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};

use crate::error::{Error, Result};
use crate::transport::{ApiRequest, ApiResponse, Connector, Transport};

/// Renews the access token of a session when the API reports it expired
pub trait AccessTokenRefresher: Send + Sync {
    fn refresh_access_token(&self, session: &Session) -> Result<()>;
}

#[derive(Default)]
struct SessionState {
    transport: Option<Arc<dyn Transport>>,
    access_token: Option<String>,
    refresh_token: Option<String>,
    headers: HeaderMap,
    refresher: Option<Arc<dyn AccessTokenRefresher>>,
}

#[derive(Clone)]
pub struct Session {
    state: Arc<RwLock<SessionState>>,
    connector: Arc<dyn Connector>,
}

impl Session {
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self {
            state: Arc::new(RwLock::new(SessionState::default())),
            connector,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, SessionState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Open a new transport session, replacing any previous one
    pub fn connect(&self) -> Result<()> {
        let transport = self.connector.connect()?;
        self.write().transport = Some(transport);
        debug!("Session connected");
        Ok(())
    }

    /// Release the transport and forget both tokens
    pub fn disconnect(&self) {
        let mut state = self.write();
        state.transport = None;
        state.access_token = None;
        state.refresh_token = None;
        state.headers.remove(AUTHORIZATION);
        debug!("Session disconnected");
    }

    pub fn is_connected(&self) -> bool {
        self.read().transport.is_some()
    }

    pub fn is_authenticated(&self) -> bool {
        self.read().access_token.is_some()
    }

    /// Install an access token and rewrite the shared Authorization header
    pub fn set_access_token(&self, access_token: &str) -> Result<()> {
        let value = HeaderValue::from_str(access_token)
            .map_err(|_| Error::Payload("access token is not a valid header value".to_string()))?;
        let mut state = self.write();
        state.headers.insert(AUTHORIZATION, value);
        state.access_token = Some(access_token.to_string());
        debug!("Access token installed");
        Ok(())
    }

    pub fn access_token(&self) -> Option<String> {
        self.read().access_token.clone()
    }

    pub fn set_refresh_token(&self, refresh_token: impl Into<String>) {
        self.write().refresh_token = Some(refresh_token.into());
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.read().refresh_token.clone()
    }

    pub fn set_refresher(&self, refresher: Arc<dyn AccessTokenRefresher>) {
        self.write().refresher = Some(refresher);
    }

    pub(crate) fn refresher(&self) -> Option<Arc<dyn AccessTokenRefresher>> {
        self.read().refresher.clone()
    }

    /// The header set attached to every request
    pub fn headers(&self) -> HeaderMap {
        self.read().headers.clone()
    }

    /// Send one request with the current headers.
    ///
    /// The state lock is released before any I/O happens.
    pub(crate) fn dispatch(&self, request: &ApiRequest, require_auth: bool) -> Result<ApiResponse> {
        let (transport, headers) = {
            let state = self.read();
            let transport = state.transport.clone().ok_or(Error::NotConnected)?;
            if require_auth && state.access_token.is_none() {
                return Err(Error::NotAuthenticated);
            }
            (transport, state.headers.clone())
        };

        let mut request = request.clone();
        request.headers.extend(headers);
        transport.send(&request)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("connected", &self.is_connected())
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}
