//! Endpoint nodes model the URL topology of the REST API as a tree.
//!
//! Every endpoint type declares a static `Blueprint` (its path segment and
//! whether it may hang below a collection). Parents create their children
//! from those blueprints on access, and `with_resource_id` turns a
//! collection node into a single-resource node. Nodes are values: neither
//! operation touches the receiver.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use reqwest::Method;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::request::{self, AuthMode};
use crate::session::Session;
use crate::transport::{ApiRequest, ApiResponse};

/// Static declaration of an endpoint type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Blueprint {
    pub path_segment: &'static str,
    /// Only reachable below a parent that has a resource id
    pub disabled_for_collection: bool,
}

impl Blueprint {
    pub const fn new(path_segment: &'static str) -> Self {
        Self {
            path_segment,
            disabled_for_collection: false,
        }
    }

    pub const fn resource_only(path_segment: &'static str) -> Self {
        Self {
            path_segment,
            disabled_for_collection: true,
        }
    }
}

pub type Query = Vec<(String, String)>;

#[derive(Clone)]
pub struct Endpoint {
    path_segment: Cow<'static, str>,
    resource_id: Option<String>,
    disabled_for_collection: bool,
    parent: Option<Arc<Endpoint>>,
    session: Session,
}

impl Endpoint {
    /// A parentless node whose URL is `base_url`
    pub fn root(base_url: impl Into<String>, session: Session) -> Self {
        Self {
            path_segment: Cow::Owned(base_url.into()),
            resource_id: None,
            disabled_for_collection: false,
            parent: None,
            session,
        }
    }

    /// Create the child declared by `blueprint` below this node.
    ///
    /// Fails if the child is disabled for collections and this node has no
    /// resource id.
    pub fn attach(&self, blueprint: &Blueprint) -> Result<Endpoint> {
        if blueprint.disabled_for_collection && self.is_collection() {
            return Err(Error::Topology(format!(
                "'{}' is only available for a single resource, not for the collection at {}",
                blueprint.path_segment,
                self.url()
            )));
        }
        Ok(self.nest(blueprint))
    }

    /// Typed child for blueprints that are reachable from collections
    pub(crate) fn child<R: Resource>(&self) -> R {
        debug_assert!(!R::BLUEPRINT.disabled_for_collection);
        R::from_endpoint(self.nest(&R::BLUEPRINT))
    }

    fn nest(&self, blueprint: &Blueprint) -> Endpoint {
        Endpoint {
            path_segment: Cow::Borrowed(blueprint.path_segment),
            resource_id: None,
            disabled_for_collection: blueprint.disabled_for_collection,
            parent: Some(Arc::new(self.clone())),
            session: self.session.clone(),
        }
    }

    /// Same blueprint and parent, addressing the resource `resource_id`
    pub fn with_resource_id(&self, resource_id: impl Into<String>) -> Endpoint {
        Endpoint {
            resource_id: Some(resource_id.into()),
            ..self.clone()
        }
    }

    pub fn url(&self) -> String {
        let parent_url = self.parent.as_ref().map(|parent| parent.url());
        [
            parent_url.as_deref(),
            Some(&*self.path_segment),
            self.resource_id.as_deref(),
        ]
        .into_iter()
        .flatten()
        .map(|segment| segment.trim_matches('/'))
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
    }

    pub fn path_segment(&self) -> &str {
        &self.path_segment
    }

    /// The resource id, if it contributes a URL segment
    pub fn resource_id(&self) -> Option<&str> {
        self.resource_id
            .as_deref()
            .filter(|id| !id.trim_matches('/').is_empty())
    }

    /// True unless a non-empty resource id is set
    pub fn is_collection(&self) -> bool {
        self.resource_id().is_none()
    }

    pub fn is_disabled_for_collection(&self) -> bool {
        self.disabled_for_collection
    }

    pub fn parent(&self) -> Option<&Endpoint> {
        self.parent.as_deref()
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Fail with a topology error unless this node addresses one resource
    pub fn require_resource(&self, action: &str) -> Result<&str> {
        self.resource_id().ok_or_else(|| {
            Error::Topology(format!("cannot {} a collection at {}", action, self.url()))
        })
    }

    /// Fail with a topology error unless this node is a collection
    pub fn require_collection(&self, action: &str) -> Result<()> {
        if self.is_collection() {
            return Ok(());
        }
        Err(Error::Topology(format!(
            "cannot {} a single resource at {}",
            action,
            self.url()
        )))
    }

    pub fn request(
        &self,
        method: Method,
        body: Option<Value>,
        query: Query,
        mode: AuthMode,
    ) -> Result<ApiResponse> {
        let mut request = ApiRequest::new(method, self.url()).with_query(query);
        if let Some(body) = body {
            request = request.with_body(body);
        }
        request::execute(&self.session, &request, mode)
    }

    pub fn get(&self, query: Query) -> Result<ApiResponse> {
        self.request(Method::GET, None, query, AuthMode::Refreshing)
    }

    pub fn post(&self, body: Option<Value>) -> Result<ApiResponse> {
        self.request(Method::POST, body, Query::new(), AuthMode::Refreshing)
    }

    pub fn put(&self, body: Option<Value>) -> Result<ApiResponse> {
        self.request(Method::PUT, body, Query::new(), AuthMode::Refreshing)
    }

    pub fn patch(&self, body: Option<Value>) -> Result<ApiResponse> {
        self.request(Method::PATCH, body, Query::new(), AuthMode::Refreshing)
    }

    pub fn delete(&self) -> Result<ApiResponse> {
        self.request(Method::DELETE, None, Query::new(), AuthMode::Refreshing)
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("url", &self.url())
            .field("disabled_for_collection", &self.disabled_for_collection)
            .finish()
    }
}

/// A typed endpoint built on top of one `Endpoint` node
pub trait Resource: Sized {
    const BLUEPRINT: Blueprint;

    fn from_endpoint(endpoint: Endpoint) -> Self;

    fn endpoint(&self) -> &Endpoint;

    /// Instantiate this endpoint below `parent`
    fn attach_to(parent: &Endpoint) -> Result<Self> {
        parent.attach(&Self::BLUEPRINT).map(Self::from_endpoint)
    }

    /// The same endpoint addressing the single resource `resource_id`
    fn with_id(&self, resource_id: impl Into<String>) -> Self {
        Self::from_endpoint(self.endpoint().with_resource_id(resource_id))
    }

    fn url(&self) -> String {
        self.endpoint().url()
    }

    fn resource_id(&self) -> Option<&str> {
        self.endpoint().resource_id()
    }
}
