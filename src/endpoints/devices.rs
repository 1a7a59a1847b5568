use chrono::{DateTime, Duration, Utc};
use log::debug;
use serde_json::Value;

use crate::endpoint::{Blueprint, Endpoint, Query, Resource};
use crate::error::{Error, Result};
use crate::models::{DeviceDataModel, DeviceModel, TIMESTAMP_FORMAT};
use crate::types::{CreatedDevice, DeviceListItem};

/// `/devices[/{deviceId}]`
#[derive(Debug, Clone)]
pub struct Devices {
    endpoint: Endpoint,
}

impl Devices {
    /// Telemetry of this device; only available for a single device
    pub fn data(&self) -> Result<DevicesData> {
        DevicesData::attach_to(&self.endpoint)
    }

    /// Ownership of this device; only available for a single device
    pub fn claim(&self) -> Result<DevicesClaim> {
        DevicesClaim::attach_to(&self.endpoint)
    }

    /// `GET /devices`: ids of every device visible to the caller
    pub fn list(&self) -> Result<Vec<String>> {
        self.endpoint.require_collection("list devices of")?;
        let items: Vec<DeviceListItem> = self.endpoint.get(Query::new())?.data()?;
        debug!("Found {} devices", items.len());
        Ok(items.into_iter().map(|item| item.id).collect())
    }

    /// `GET /devices/{id}`: desired and reported state of one device
    pub fn get(&self) -> Result<DeviceModel> {
        self.endpoint.require_resource("get the state of")?;
        let response = self.endpoint.get(Query::new())?;
        let data: Option<Value> = response.json::<Value>()?.get("data").cloned();
        DeviceModel::from_payload(data.as_ref())
    }

    /// `POST /devices`: register a new device and return its id
    pub fn post(&self) -> Result<String> {
        self.endpoint.require_collection("create a device under")?;
        let created: CreatedDevice = self.endpoint.post(None)?.data()?;
        debug!("Created device {}", created.device_id);
        Ok(created.device_id)
    }

    /// `PATCH /devices/{id}`: send the desired state of `device`
    pub fn patch(&self, device: &DeviceModel) -> Result<()> {
        self.endpoint.require_resource("patch")?;
        self.endpoint.patch(Some(device.desired_payload()))?;
        Ok(())
    }
}

impl Resource for Devices {
    const BLUEPRINT: Blueprint = Blueprint::new("devices");

    fn from_endpoint(endpoint: Endpoint) -> Self {
        Self { endpoint }
    }

    fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }
}

/// Optional filters for `GET /devices/{id}/data`. Unset values are not sent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataQuery {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub interval: Option<Duration>,
}

impl DataQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(mut self, start: DateTime<Utc>) -> Self {
        self.start = Some(start);
        self
    }

    pub fn end(mut self, end: DateTime<Utc>) -> Self {
        self.end = Some(end);
        self
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }

    /// `timeStart`, `timeEnd` and `interval` query parameters
    pub fn to_query(&self) -> Result<Query> {
        let mut query = Query::new();
        if let Some(start) = self.start {
            query.push(("timeStart".to_string(), start.format(TIMESTAMP_FORMAT).to_string()));
        }
        if let Some(end) = self.end {
            query.push(("timeEnd".to_string(), end.format(TIMESTAMP_FORMAT).to_string()));
        }
        if let Some(interval) = self.interval {
            let minutes = interval.num_minutes();
            if minutes < 1 || interval != Duration::minutes(minutes) {
                return Err(Error::Validation(format!(
                    "interval must be a whole number of minutes, got {}s",
                    interval.num_seconds()
                )));
            }
            query.push(("interval".to_string(), format!("{}m", minutes)));
        }
        Ok(query)
    }
}

/// `/devices/{deviceId}/data`
#[derive(Debug, Clone)]
pub struct DevicesData {
    endpoint: Endpoint,
}

impl DevicesData {
    pub fn get(&self, query: &DataQuery) -> Result<DeviceDataModel> {
        let device_id = self
            .endpoint
            .parent()
            .and_then(Endpoint::resource_id)
            .ok_or_else(|| {
                Error::Topology("device data is only available for a single device".to_string())
            })?
            .to_string();

        let response = self.endpoint.get(query.to_query()?)?;
        let payload: Value = response.data()?;
        DeviceDataModel::from_payload(&device_id, &payload)
    }
}

impl Resource for DevicesData {
    const BLUEPRINT: Blueprint = Blueprint::resource_only("data");

    fn from_endpoint(endpoint: Endpoint) -> Self {
        Self { endpoint }
    }

    fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }
}

/// `/devices/{deviceId}/claim[/{userId}]`
#[derive(Debug, Clone)]
pub struct DevicesClaim {
    endpoint: Endpoint,
}

impl DevicesClaim {
    /// Claim the device for the signed-in user, or for the user this node
    /// was parameterized with
    pub fn put(&self) -> Result<()> {
        self.endpoint.put(None)?;
        Ok(())
    }

    /// Release the caller's claim. Only the unparameterized claim can be
    /// deleted.
    pub fn delete(&self) -> Result<()> {
        if let Some(user_id) = self.endpoint.resource_id() {
            return Err(Error::Topology(format!(
                "cannot delete the claim of another user ({})",
                user_id
            )));
        }
        self.endpoint.delete()?;
        Ok(())
    }
}

impl Resource for DevicesClaim {
    const BLUEPRINT: Blueprint = Blueprint::resource_only("claim");

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

    use chrono::TimeZone;
    use reqwest::Method;
    use serde_json::json;

    use super::*;
    use crate::endpoints::Root;
    use crate::models::{DeviceStateModel, PumpState};
    use crate::session::Session;
    use crate::transport::testing::ScriptedTransport;

    fn authenticated_root() -> (Root, ScriptedTransport) {
        let transport = ScriptedTransport::new();
        let session = Session::new(Arc::new(transport.clone()));
        session.connect().unwrap();
        session.set_access_token("access_token").unwrap();
        (Root::new("base", session), transport)
    }

    fn query_of(pairs: &[(&str, &str)]) -> Query {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_list_returns_device_ids() {
        let (root, transport) = authenticated_root();
        transport.push(200, r#"{"data":[{"id":"device_id"}]}"#);

        let ids = root.devices().list().unwrap();

        assert_eq!(ids, vec!["device_id".to_string()]);
        let sent = transport.requests();
        assert_eq!(sent[0].method, Method::GET);
        assert_eq!(sent[0].url, "base/v1/devices");
        assert!(sent[0].query.is_empty());
        assert!(sent[0].body.is_none());
    }

    #[test]
    fn test_get_returns_device_states() {
        let (root, transport) = authenticated_root();
        transport.push(
            200,
            r#"{"data":{
                "desired":{"pumpState":"on","refillTime":"03:45",
                    "refillInterval":"1days","maxPumpDuration":"2min"},
                "reported":{"pumpState":"off","refillTime":"01:23",
                    "refillInterval":"4days","maxPumpDuration":"5min"}
            }}"#,
        );

        let device = root.devices().with_id("device_id").get().unwrap();

        assert_eq!(transport.requests()[0].url, "base/v1/devices/device_id");
        let desired = device.desired_state.unwrap();
        assert_eq!(desired.pump_state(), Some(PumpState::On));
        assert_eq!(desired.max_pump_duration_minutes(), Some(2));
        let reported = device.reported_state.unwrap();
        assert_eq!(reported.pump_state(), Some(PumpState::Off));
        assert_eq!(reported.refill_interval_days(), Some(4));
    }

    #[test]
    fn test_wrong_node_kind_fails_before_any_request() {
        let (root, transport) = authenticated_root();
        let devices = root.devices();
        let device = devices.with_id("device_id");

        assert!(matches!(device.post(), Err(Error::Topology(_))));
        assert!(matches!(
            devices.patch(&DeviceModel::default()),
            Err(Error::Topology(_))
        ));
        assert!(matches!(devices.get(), Err(Error::Topology(_))));
        assert!(matches!(device.list(), Err(Error::Topology(_))));
        assert!(transport.requests().is_empty());
    }

    #[test]
    fn test_empty_device_id_is_treated_as_collection() {
        let (root, transport) = authenticated_root();
        let device = root.devices().with_id("");

        assert!(matches!(device.data(), Err(Error::Topology(_))));
        assert!(matches!(device.claim(), Err(Error::Topology(_))));
        assert!(matches!(
            device.patch(&DeviceModel::default()),
            Err(Error::Topology(_))
        ));
        assert!(matches!(device.get(), Err(Error::Topology(_))));
        assert!(transport.requests().is_empty());
    }

    #[test]
    fn test_post_returns_new_device_id() {
        let (root, transport) = authenticated_root();
        transport.push(201, r#"{"data":{"deviceId":"new_device"}}"#);

        let id = root.devices().post().unwrap();

        assert_eq!(id, "new_device");
        assert_eq!(transport.requests()[0].method, Method::POST);
    }

    #[test]
    fn test_patch_sends_desired_state_only() {
        let (root, transport) = authenticated_root();
        let state = DeviceStateModel::builder()
            .pump_state(true)
            .refill_time(chrono::NaiveTime::from_hms_opt(3, 45, 0).unwrap())
            .refill_interval_days(1)
            .max_pump_duration_minutes(2)
            .build()
            .unwrap();
        let device = DeviceModel::new(Some(state), Some(DeviceStateModel::default()));

        root.devices().with_id("device_id").patch(&device).unwrap();

        let sent = transport.requests();
        assert_eq!(sent[0].method, Method::PATCH);
        assert_eq!(sent[0].url, "base/v1/devices/device_id");
        assert_eq!(
            sent[0].body,
            Some(json!({
                "state": {
                    "desired": {
                        "pumpState": "on", "refillTime": "03:45",
                        "refillInterval": "1days", "maxPumpDuration": "2min"
                    }
                }
            }))
        );
    }

    #[test]
    fn test_claim_put_without_and_with_user() {
        // Claiming on behalf of another user is not restricted client-side;
        // the backend decides whether the caller may do so.
        let (root, transport) = authenticated_root();
        let claim = root.devices().with_id("device_id").claim().unwrap();

        claim.put().unwrap();
        claim.with_id("user_id").put().unwrap();

        let sent = transport.requests();
        assert_eq!(sent[0].method, Method::PUT);
        assert_eq!(sent[0].url, "base/v1/devices/device_id/claim");
        assert!(sent[0].body.is_none());
        assert_eq!(sent[1].url, "base/v1/devices/device_id/claim/user_id");
    }

    #[test]
    fn test_claim_delete() {
        let (root, transport) = authenticated_root();
        let claim = root.devices().with_id("device_id").claim().unwrap();

        claim.delete().unwrap();

        let sent = transport.requests();
        assert_eq!(sent[0].method, Method::DELETE);
        assert_eq!(sent[0].url, "base/v1/devices/device_id/claim");
    }

    #[test]
    fn test_claim_delete_for_other_user_is_rejected() {
        let (root, transport) = authenticated_root();
        let claim = root.devices().with_id("device_id").claim().unwrap();

        let result = claim.with_id("user_id").delete();

        assert!(matches!(result, Err(Error::Topology(_))));
        assert!(transport.requests().is_empty());
    }

    const DATA_RESPONSE: &str = r#"{"data":{
        "details":{"deviceId":"device_id"},
        "timeSeries":{"someValue":[
            {"x":"2022-01-02T03:04:05Z","y":1},
            {"x":"2023-06-07T08:09:10Z","y":2}
        ]}
    }}"#;

    #[test]
    fn test_data_without_arguments_sends_no_query() {
        let (root, transport) = authenticated_root();
        transport.push(200, DATA_RESPONSE);

        let data = root
            .devices()
            .with_id("device_id")
            .data()
            .unwrap()
            .get(&DataQuery::new())
            .unwrap();

        let sent = transport.requests();
        assert_eq!(sent[0].url, "base/v1/devices/device_id/data");
        assert!(sent[0].query.is_empty());
        assert_eq!(data.device_id, "device_id");
        assert_eq!(data.metric("someValue").unwrap(), &[json!(1), json!(2)]);
    }

    #[test]
    fn test_data_with_time_limits() {
        let (root, transport) = authenticated_root();
        transport.push(200, DATA_RESPONSE);
        let query = DataQuery::new()
            .start(Utc.with_ymd_and_hms(2022, 1, 2, 3, 4, 5).unwrap())
            .end(Utc.with_ymd_and_hms(2023, 6, 7, 8, 9, 10).unwrap());

        root.devices()
            .with_id("device_id")
            .data()
            .unwrap()
            .get(&query)
            .unwrap();

        assert_eq!(
            transport.requests()[0].query,
            query_of(&[
                ("timeStart", "2022-01-02T03:04:05Z"),
                ("timeEnd", "2023-06-07T08:09:10Z")
            ])
        );
    }

    #[test]
    fn test_data_with_interval() {
        let (root, transport) = authenticated_root();
        transport.push(200, DATA_RESPONSE);
        let query = DataQuery::new().interval(Duration::minutes(11));

        root.devices()
            .with_id("device_id")
            .data()
            .unwrap()
            .get(&query)
            .unwrap();

        assert_eq!(
            transport.requests()[0].query,
            query_of(&[("interval", "11m")])
        );
    }

    #[test]
    fn test_sub_minute_interval_is_rejected() {
        let query = DataQuery::new().interval(Duration::seconds(30));
        assert!(matches!(query.to_query(), Err(Error::Validation(_))));
    }

    #[test]
    fn test_partial_minute_interval_is_rejected() {
        for interval in [Duration::seconds(90), Duration::milliseconds(60_500)] {
            let query = DataQuery::new().interval(interval);
            assert!(matches!(query.to_query(), Err(Error::Validation(_))));
        }
        let query = DataQuery::new().interval(Duration::seconds(120));
        assert_eq!(query.to_query().unwrap(), query_of(&[("interval", "2m")]));
    }
}
