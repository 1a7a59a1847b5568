use chrono::NaiveTime;
use log::info;
use serde::Serialize;

use crate::client::ApiClient;
use crate::endpoint::Resource;
use crate::endpoints::{DataQuery, Devices};
use crate::error::Result;
use crate::models::{DeviceDataModel, DeviceModel, DeviceStateModel, PumpState};

/// A single boum device reached through a connected `ApiClient`.
///
/// Getters read the reported state, setters patch the desired state with
/// only the field being changed.
#[derive(Debug, Clone, Serialize)]
pub struct Device<'a> {
    /// Device id
    pub device_id: String,
    #[serde(skip)]
    client: &'a ApiClient,
}

impl<'a> Device<'a> {
    pub fn new(device_id: impl Into<String>, client: &'a ApiClient) -> Self {
        Self {
            device_id: device_id.into(),
            client,
        }
    }

    /// Ids of every device visible to the signed-in user
    pub fn device_ids(client: &ApiClient) -> Result<Vec<String>> {
        client.root().devices().list()
    }

    /// Register a new device and return a handle to it
    pub fn create(client: &'a ApiClient) -> Result<Self> {
        let device_id = client.root().devices().post()?;
        info!("Created device {}", device_id);
        Ok(Self::new(device_id, client))
    }

    fn endpoint(&self) -> Devices {
        self.client.root().devices().with_id(&self.device_id)
    }

    /// `(desired, reported)` state of the device
    pub fn device_states(&self) -> Result<(Option<DeviceStateModel>, Option<DeviceStateModel>)> {
        let device = self.endpoint().get()?;
        Ok((device.desired_state, device.reported_state))
    }

    fn reported_state(&self) -> Result<DeviceStateModel> {
        let (_, reported) = self.device_states()?;
        Ok(reported.unwrap_or_default())
    }

    pub fn set_desired_device_state(&self, state: DeviceStateModel) -> Result<()> {
        self.endpoint().patch(&DeviceModel::desired(state))
    }

    pub fn pump_state(&self) -> Result<Option<PumpState>> {
        Ok(self.reported_state()?.pump_state())
    }

    pub fn set_pump_state(&self, state: impl Into<PumpState>) -> Result<()> {
        let state = DeviceStateModel::builder().pump_state(state).build()?;
        self.set_desired_device_state(state)
    }

    pub fn refill_time(&self) -> Result<Option<NaiveTime>> {
        Ok(self.reported_state()?.refill_time())
    }

    pub fn set_refill_time(&self, time: NaiveTime) -> Result<()> {
        let state = DeviceStateModel::builder().refill_time(time).build()?;
        self.set_desired_device_state(state)
    }

    pub fn refill_interval_days(&self) -> Result<Option<u32>> {
        Ok(self.reported_state()?.refill_interval_days())
    }

    pub fn set_refill_interval_days(&self, days: i64) -> Result<()> {
        let state = DeviceStateModel::builder()
            .refill_interval_days(days)
            .build()?;
        self.set_desired_device_state(state)
    }

    pub fn max_pump_duration_minutes(&self) -> Result<Option<u32>> {
        Ok(self.reported_state()?.max_pump_duration_minutes())
    }

    pub fn set_max_pump_duration_minutes(&self, minutes: i64) -> Result<()> {
        let state = DeviceStateModel::builder()
            .max_pump_duration_minutes(minutes)
            .build()?;
        self.set_desired_device_state(state)
    }

    /// Claim the device for the signed-in user or for `user_id`
    pub fn claim(&self, user_id: Option<&str>) -> Result<()> {
        let claim = self.endpoint().claim()?;
        match user_id {
            Some(user_id) => claim.with_id(user_id).put(),
            None => claim.put(),
        }
    }

    pub fn unclaim(&self) -> Result<()> {
        self.endpoint().claim()?.delete()
    }

    pub fn telemetry_data(&self, query: &DataQuery) -> Result<DeviceDataModel> {
        self.endpoint().data()?.get(query)
    }
}
