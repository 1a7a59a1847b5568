use serde_json::Value;

use crate::endpoint::{Blueprint, Endpoint, Query, Resource};
use crate::error::Result;
use crate::models::UserModel;

/// `/users[/{userId}]`
#[derive(Debug, Clone)]
pub struct Users {
    endpoint: Endpoint,
}

impl Users {
    /// On the collection the backend decides what is listed; on a user
    /// node this returns that user's details.
    pub fn get(&self) -> Result<UserModel> {
        let payload: Value = self.endpoint.get(Query::new())?.data()?;
        Ok(UserModel::from_payload(payload))
    }
}

impl Resource for Users {
    const BLUEPRINT: Blueprint = Blueprint::new("users");

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

    use crate::endpoint::Resource;
    use crate::endpoints::Root;
    use crate::session::Session;
    use crate::transport::testing::ScriptedTransport;

    #[test]
    fn test_get_user_details() {
        let transport = ScriptedTransport::new();
        let session = Session::new(Arc::new(transport.clone()));
        session.connect().unwrap();
        session.set_access_token("access_token").unwrap();
        transport.push(200, r#"{"data":{"email":"me@example.com"}}"#);

        let user = Root::new("base", session)
            .users()
            .with_id("user_id")
            .get()
            .unwrap();

        assert_eq!(user.get("email"), Some(&json!("me@example.com")));
        assert_eq!(transport.requests()[0].url, "base/v1/users/user_id");
    }
}
