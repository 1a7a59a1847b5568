//! Concrete endpoints of the v1 API:
//!
//! ```text
//! v1
//! ├── auth
//! │   ├── signin
//! │   └── token
//! ├── devices[/{id}]
//! │   ├── data          (device only)
//! │   └── claim[/{id}]  (device only)
//! └── users[/{id}]
//! ```

mod auth;
mod devices;
mod users;

pub use auth::{Auth, AuthSignin, AuthToken};
pub use devices::{DataQuery, Devices, DevicesClaim, DevicesData};
pub use users::Users;

use crate::config::API_VERSION;
use crate::endpoint::{Blueprint, Endpoint, Resource};
use crate::session::Session;

/// The versioned API root, `{base_url}/v1`
#[derive(Debug, Clone)]
pub struct Root {
    endpoint: Endpoint,
}

impl Root {
    pub fn new(base_url: impl Into<String>, session: Session) -> Self {
        Endpoint::root(base_url, session).child()
    }

    pub fn auth(&self) -> Auth {
        self.endpoint.child()
    }

    pub fn devices(&self) -> Devices {
        self.endpoint.child()
    }

    pub fn users(&self) -> Users {
        self.endpoint.child()
    }
}

impl Resource for Root {
    const BLUEPRINT: Blueprint = Blueprint::new(API_VERSION);

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

    use super::*;
    use crate::transport::testing::ScriptedTransport;

    fn root() -> Root {
        Root::new("base", Session::new(Arc::new(ScriptedTransport::new())))
    }

    #[test]
    fn test_root_urls() {
        let root = root();
        assert_eq!(root.url(), "base/v1");
        assert_eq!(root.auth().url(), "base/v1/auth");
        assert_eq!(root.auth().signin().url(), "base/v1/auth/signin");
        assert_eq!(root.auth().token().url(), "base/v1/auth/token");
        assert_eq!(root.devices().url(), "base/v1/devices");
        assert_eq!(root.devices().with_id("x").url(), "base/v1/devices/x");
        assert_eq!(root.users().with_id("u").url(), "base/v1/users/u");
    }

    #[test]
    fn test_device_children_require_a_device() {
        let devices = root().devices();
        assert!(devices.data().is_err());
        assert!(devices.claim().is_err());

        let device = devices.with_id("device_id");
        assert_eq!(device.data().unwrap().url(), "base/v1/devices/device_id/data");
        assert_eq!(
            device.claim().unwrap().with_id("user_id").url(),
            "base/v1/devices/device_id/claim/user_id"
        );
    }
}
