use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Every successful API response wraps its payload in `data`
#[derive(Debug, Deserialize)]
pub struct DataEnvelope<T> {
    pub data: Option<T>,
}

/// Body of error responses, e.g. `{"message": "AccessTokenExpired"}`
#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    pub message: Option<String>,
}

#[derive(Serialize)]
pub struct SigninRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SigninResponse {
    #[serde(rename = "accessToken")]
    pub access_token: String,
    #[serde(rename = "refreshToken")]
    pub refresh_token: String,
}

#[derive(Serialize)]
pub struct RefreshTokenRequest<'a> {
    #[serde(rename = "refreshToken")]
    pub refresh_token: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct RefreshTokenResponse {
    #[serde(rename = "accessToken")]
    pub access_token: String,
}

#[derive(Debug, Deserialize)]
pub struct DeviceListItem {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct CreatedDevice {
    #[serde(rename = "deviceId")]
    pub device_id: String,
}

/// One sample of a telemetry series
#[derive(Debug, Clone, Deserialize)]
pub struct TimeSeriesPoint {
    pub x: String,
    pub y: Value,
}

#[derive(Debug, Default, Deserialize)]
pub struct DeviceDetails {
    #[serde(rename = "deviceId")]
    pub device_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DeviceDataPayload {
    #[serde(default)]
    pub details: Option<DeviceDetails>,
    #[serde(rename = "timeSeries", default)]
    pub time_series: std::collections::BTreeMap<String, Vec<TimeSeriesPoint>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signin_response_parsing() {
        let json = r#"{"data":{"accessToken":"access123","refreshToken":"refresh456"}}"#;
        let envelope: DataEnvelope<SigninResponse> = serde_json::from_str(json).unwrap();
        let data = envelope.data.unwrap();
        assert_eq!(data.access_token, "access123");
        assert_eq!(data.refresh_token, "refresh456");
    }

    #[test]
    fn test_signin_request_serialization() {
        let request = SigninRequest {
            email: "test@example.com",
            password: "password123",
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"email": "test@example.com", "password": "password123"})
        );
    }

    #[test]
    fn test_refresh_token_request_uses_camel_case() {
        let request = RefreshTokenRequest {
            refresh_token: "refresh456",
        };
        let json = serde_json::to_string(&request).unwrap();
        assert_eq!(json, r#"{"refreshToken":"refresh456"}"#);
    }

    #[test]
    fn test_error_response_without_message() {
        let parsed: ErrorResponse = serde_json::from_str(r#"{"error":"nope"}"#).unwrap();
        assert!(parsed.message.is_none());
    }

    #[test]
    fn test_device_data_payload_tolerates_missing_details() {
        let json = r#"{"timeSeries":{"temp":[{"x":"2022-01-02T03:04:05Z","y":21.5}]}}"#;
        let payload: DeviceDataPayload = serde_json::from_str(json).unwrap();
        assert!(payload.details.is_none());
        assert_eq!(payload.time_series["temp"].len(), 1);
    }
}
