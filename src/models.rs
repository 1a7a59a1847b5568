use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{Error, Result};
use crate::types::DeviceDataPayload;

const TIME_FORMAT: &str = "%H:%M";

/// Wire format of timestamps in telemetry data and query parameters
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

pub const MIN_PUMP_DURATION_MINUTES: u32 = 1;
pub const MAX_PUMP_DURATION_MINUTES: u32 = 24 * 60 - 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpState {
    On,
    Off,
}

impl PumpState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PumpState::On => "on",
            PumpState::Off => "off",
        }
    }
}

impl From<bool> for PumpState {
    fn from(on: bool) -> Self {
        if on {
            PumpState::On
        } else {
            PumpState::Off
        }
    }
}

impl FromStr for PumpState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "on" => Ok(PumpState::On),
            "off" => Ok(PumpState::Off),
            other => Err(Error::Validation(format!("unknown pump state '{}'", other))),
        }
    }
}

impl fmt::Display for PumpState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Desired or reported state of a device. Every field is optional.
///
/// Construct through `DeviceStateModel::builder()`; values are validated
/// when the model is built.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceStateModel {
    pump_state: Option<PumpState>,
    refill_time: Option<NaiveTime>,
    refill_interval_days: Option<u32>,
    max_pump_duration_minutes: Option<u32>,
}

/// String-encoded state as it appears on the wire
#[derive(Debug, Default, Serialize, Deserialize)]
struct DeviceStatePayload {
    #[serde(rename = "pumpState", skip_serializing_if = "Option::is_none")]
    pump_state: Option<String>,
    #[serde(rename = "refillTime", skip_serializing_if = "Option::is_none")]
    refill_time: Option<String>,
    #[serde(rename = "refillInterval", skip_serializing_if = "Option::is_none")]
    refill_interval: Option<String>,
    #[serde(rename = "maxPumpDuration", skip_serializing_if = "Option::is_none")]
    max_pump_duration: Option<String>,
}

impl DeviceStateModel {
    pub fn builder() -> DeviceStateBuilder {
        DeviceStateBuilder::default()
    }

    pub fn pump_state(&self) -> Option<PumpState> {
        self.pump_state
    }

    pub fn refill_time(&self) -> Option<NaiveTime> {
        self.refill_time
    }

    pub fn refill_interval_days(&self) -> Option<u32> {
        self.refill_interval_days
    }

    pub fn max_pump_duration_minutes(&self) -> Option<u32> {
        self.max_pump_duration_minutes
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn to_payload(&self) -> Value {
        let payload = DeviceStatePayload {
            pump_state: self.pump_state.map(|state| state.as_str().to_string()),
            refill_time: self
                .refill_time
                .map(|time| time.format(TIME_FORMAT).to_string()),
            refill_interval: self.refill_interval_days.map(|days| format!("{}days", days)),
            max_pump_duration: self
                .max_pump_duration_minutes
                .map(|minutes| format!("{}min", minutes)),
        };
        serde_json::to_value(payload).unwrap_or_else(|_| json!({}))
    }

    pub fn from_payload(payload: &Value) -> Result<Self> {
        let payload: DeviceStatePayload = serde_json::from_value(payload.clone())?;
        let mut builder = Self::builder();

        if let Some(state) = payload.pump_state {
            builder = builder.pump_state(state.parse::<PumpState>()?);
        }
        if let Some(time) = payload.refill_time {
            let time = NaiveTime::parse_from_str(&time, TIME_FORMAT)
                .map_err(|_| Error::Validation(format!("invalid refill time '{}'", time)))?;
            builder = builder.refill_time(time);
        }
        if let Some(interval) = payload.refill_interval {
            builder = builder.refill_interval_days(parse_suffixed(&interval, "days")?);
        }
        if let Some(duration) = payload.max_pump_duration {
            builder = builder.max_pump_duration_minutes(parse_suffixed(&duration, "min")?);
        }

        builder.build()
    }
}

fn parse_suffixed(value: &str, suffix: &str) -> Result<i64> {
    value
        .strip_suffix(suffix)
        .and_then(|number| number.trim().parse::<i64>().ok())
        .ok_or_else(|| Error::Validation(format!("expected '<n>{}', got '{}'", suffix, value)))
}

#[derive(Debug, Clone, Default)]
pub struct DeviceStateBuilder {
    pump_state: Option<PumpState>,
    refill_time: Option<NaiveTime>,
    refill_interval_days: Option<i64>,
    max_pump_duration_minutes: Option<i64>,
}

impl DeviceStateBuilder {
    pub fn pump_state(mut self, state: impl Into<PumpState>) -> Self {
        self.pump_state = Some(state.into());
        self
    }

    pub fn refill_time(mut self, time: NaiveTime) -> Self {
        self.refill_time = Some(time);
        self
    }

    pub fn refill_interval_days(mut self, days: i64) -> Self {
        self.refill_interval_days = Some(days);
        self
    }

    pub fn max_pump_duration_minutes(mut self, minutes: i64) -> Self {
        self.max_pump_duration_minutes = Some(minutes);
        self
    }

    pub fn build(self) -> Result<DeviceStateModel> {
        if let Some(time) = self.refill_time {
            if time.second() != 0 || time.nanosecond() != 0 {
                return Err(Error::Validation(format!(
                    "refill time must be a whole minute, got {}",
                    time
                )));
            }
        }

        let refill_interval_days = self
            .refill_interval_days
            .map(|days| {
                u32::try_from(days).map_err(|_| {
                    Error::Validation(format!(
                        "refill interval must be a non-negative number of days, got {}",
                        days
                    ))
                })
            })
            .transpose()?;

        let max_pump_duration_minutes = self
            .max_pump_duration_minutes
            .map(|minutes| {
                u32::try_from(minutes)
                    .ok()
                    .filter(|m| (MIN_PUMP_DURATION_MINUTES..=MAX_PUMP_DURATION_MINUTES).contains(m))
                    .ok_or_else(|| {
                        Error::Validation(format!(
                            "max pump duration must be between {} and {} minutes, got {}",
                            MIN_PUMP_DURATION_MINUTES, MAX_PUMP_DURATION_MINUTES, minutes
                        ))
                    })
            })
            .transpose()?;

        Ok(DeviceStateModel {
            pump_state: self.pump_state,
            refill_time: self.refill_time,
            refill_interval_days,
            max_pump_duration_minutes,
        })
    }
}

/// A device as returned by `GET /devices/{id}`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceModel {
    pub desired_state: Option<DeviceStateModel>,
    pub reported_state: Option<DeviceStateModel>,
}

impl DeviceModel {
    pub fn new(
        desired_state: Option<DeviceStateModel>,
        reported_state: Option<DeviceStateModel>,
    ) -> Self {
        Self {
            desired_state,
            reported_state,
        }
    }

    pub fn desired(state: DeviceStateModel) -> Self {
        Self::new(Some(state), None)
    }

    /// `{"state": {"desired": .., "reported": ..}}` with absent states left out
    pub fn to_payload(&self) -> Value {
        let mut state = serde_json::Map::new();
        if let Some(desired) = &self.desired_state {
            state.insert("desired".to_string(), desired.to_payload());
        }
        if let Some(reported) = &self.reported_state {
            state.insert("reported".to_string(), reported.to_payload());
        }
        json!({ "state": state })
    }

    /// The PATCH body: only the desired state is ever sent
    pub fn desired_payload(&self) -> Value {
        DeviceModel::new(self.desired_state, None).to_payload()
    }

    /// Parse `{"desired": {..}, "reported": {..}}`. A missing or null
    /// payload yields a model without states.
    pub fn from_payload(payload: Option<&Value>) -> Result<Self> {
        let payload = match payload {
            Some(Value::Object(map)) => map,
            Some(Value::Null) | None => return Ok(Self::default()),
            Some(other) => {
                return Err(Error::Payload(format!(
                    "expected a device object, got {}",
                    other
                )))
            }
        };

        let parse = |key: &str| -> Result<Option<DeviceStateModel>> {
            match payload.get(key) {
                None | Some(Value::Null) => Ok(None),
                Some(state) => DeviceStateModel::from_payload(state).map(Some),
            }
        };

        Ok(Self {
            desired_state: parse("desired")?,
            reported_state: parse("reported")?,
        })
    }
}

const DEVICE_ID_COLUMN: &str = "deviceId";
const TIMESTAMP_COLUMN: &str = "timestamp";
const RESERVED_COLUMNS: [&str; 2] = [DEVICE_ID_COLUMN, TIMESTAMP_COLUMN];

/// Telemetry of one device, reshaped from per-metric `(x, y)` series into
/// columns sharing one timestamp axis.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceDataModel {
    pub device_id: String,
    pub timestamps: Vec<DateTime<Utc>>,
    /// Metric name to values aligned with `timestamps`; gaps are `null`
    pub metrics: BTreeMap<String, Vec<Value>>,
}

impl DeviceDataModel {
    /// Reshape a `{timeSeries: {metric: [{x, y}, ..]}}` payload.
    ///
    /// `device_id` is used when the payload carries no `details.deviceId`.
    pub fn from_payload(device_id: &str, payload: &Value) -> Result<Self> {
        let payload: DeviceDataPayload = serde_json::from_value(payload.clone())?;
        let device_id = payload
            .details
            .and_then(|details| details.device_id)
            .unwrap_or_else(|| device_id.to_string());

        let mut series = BTreeMap::new();
        let mut axis = BTreeSet::new();
        for (metric, points) in payload.time_series {
            if RESERVED_COLUMNS.contains(&metric.as_str()) {
                return Err(Error::Payload(format!(
                    "metric name '{}' collides with a reserved column",
                    metric
                )));
            }
            let mut samples = BTreeMap::new();
            for point in points {
                let timestamp = parse_timestamp(&point.x)?;
                if samples.insert(timestamp, point.y).is_some() {
                    return Err(Error::Payload(format!(
                        "duplicate sample for '{}' at {}",
                        metric, point.x
                    )));
                }
                axis.insert(timestamp);
            }
            series.insert(metric, samples);
        }

        let timestamps: Vec<DateTime<Utc>> = axis.into_iter().collect();
        let metrics = series
            .into_iter()
            .map(|(metric, mut samples)| {
                let column = timestamps
                    .iter()
                    .map(|t| samples.remove(t).unwrap_or(Value::Null))
                    .collect();
                (metric, column)
            })
            .collect();

        Ok(Self {
            device_id,
            timestamps,
            metrics,
        })
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn metric(&self, name: &str) -> Option<&[Value]> {
        self.metrics.get(name).map(Vec::as_slice)
    }

    /// Column view: `{"deviceId": [..], "timestamp": [..], "<metric>": [..]}`
    pub fn columns(&self) -> BTreeMap<String, Vec<Value>> {
        let mut columns = BTreeMap::new();
        columns.insert(
            DEVICE_ID_COLUMN.to_string(),
            vec![Value::String(self.device_id.clone()); self.len()],
        );
        columns.insert(
            TIMESTAMP_COLUMN.to_string(),
            self.timestamps
                .iter()
                .map(|t| Value::String(t.format(TIMESTAMP_FORMAT).to_string()))
                .collect(),
        );
        for (metric, values) in &self.metrics {
            columns.insert(metric.clone(), values.clone());
        }
        columns
    }
}

impl Serialize for DeviceDataModel {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.columns().serialize(serializer)
    }
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| Error::Payload(format!("invalid timestamp '{}'", value)))
}

/// User details; the shape is owned by the backend
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserModel {
    pub data: Value,
}

impl UserModel {
    pub fn from_payload(payload: Value) -> Self {
        Self { data: payload }
    }

    pub fn to_payload(&self) -> Value {
        self.data.clone()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }
}
