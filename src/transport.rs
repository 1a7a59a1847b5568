//! The blocking HTTP seam used by `Session`.
//!
//! `Connector` creates a fresh `Transport` on every connect, `Transport`
//! sends one fully-built `ApiRequest`. The default pair wraps
//! `reqwest::blocking::Client`.

use std::sync::Arc;

use log::debug;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::types::DataEnvelope;

/// A request as it leaves an endpoint node
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    /// Filled in by the session at dispatch time
    pub headers: HeaderMap,
    pub body: Option<Value>,
    pub query: Vec<(String, String)>,
}

impl ApiRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
            body: None,
            query: Vec::new(),
        }
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_query(mut self, query: Vec<(String, String)>) -> Self {
        self.query = query;
        self
    }
}

#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: String,
}

impl ApiResponse {
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Turn a non-2xx response into `Error::Api`
    pub fn error_for_status(self) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(Error::Api {
                status: self.status,
                body: self.body,
            })
        }
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_str(&self.body)?)
    }

    /// Parse the body and unwrap the `{"data": ...}` envelope
    pub fn data<T: DeserializeOwned>(&self) -> Result<T> {
        let envelope: DataEnvelope<T> = self.json()?;
        envelope
            .data
            .ok_or_else(|| Error::Payload("response has no data field".to_string()))
    }
}

pub trait Transport: Send + Sync {
    fn send(&self, request: &ApiRequest) -> Result<ApiResponse>;
}

/// Opens transport sessions; one call per `Session::connect`
pub trait Connector: Send + Sync {
    fn connect(&self) -> Result<Arc<dyn Transport>>;
}

/// Default header set applied to every transport session
pub fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers
}

/// Opens a pooled `reqwest::blocking::Client` per connect
#[derive(Debug, Default, Clone)]
pub struct HttpConnector;

impl Connector for HttpConnector {
    fn connect(&self) -> Result<Arc<dyn Transport>> {
        let client = reqwest::blocking::Client::builder()
            .default_headers(default_headers())
            .user_agent(concat!("boum/", env!("CARGO_PKG_VERSION")))
            .build()?;
        debug!("Opened HTTP session");
        Ok(Arc::new(HttpTransport { client }))
    }
}

pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl Transport for HttpTransport {
    fn send(&self, request: &ApiRequest) -> Result<ApiResponse> {
        let mut builder = self
            .client
            .request(request.method.clone(), &request.url)
            .headers(request.headers.clone());

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send()?;
        let status = response.status();
        let body = response.text()?;
        Ok(ApiResponse { status, body })
    }
}
