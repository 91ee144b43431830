//! Wire shapes for the desktop link (spec §6): a full-duplex text-framed
//! request/response envelope shared by discovery, authentication, parameter
//! registration, and frame injection.

use serde::{Deserialize, Serialize};
use serde_json::Value;

const API_NAME: &str = "BridgeCoreAPI";
const API_VERSION: &str = "1.0";

#[derive(Debug, Serialize)]
pub struct ApiRequest<T> {
    #[serde(rename = "apiName")]
    api_name: &'static str,
    #[serde(rename = "apiVersion")]
    api_version: &'static str,
    #[serde(rename = "requestID")]
    request_id: String,
    #[serde(rename = "messageType")]
    message_type: &'static str,
    data: T,
}

impl<T: Serialize> ApiRequest<T> {
    pub fn new(request_id: String, message_type: &'static str, data: T) -> Self {
        Self {
            api_name: API_NAME,
            api_version: API_VERSION,
            request_id,
            message_type,
            data,
        }
    }

    pub fn to_text(&self) -> String {
        serde_json::to_string(self).expect("api request always serializes")
    }
}

#[derive(Debug, Deserialize)]
pub struct ApiResponse {
    #[serde(rename = "apiName")]
    #[allow(dead_code)]
    pub api_name: String,
    #[serde(rename = "requestID")]
    pub request_id: String,
    #[serde(rename = "messageType")]
    pub message_type: String,
    #[serde(default)]
    pub data: Value,
}

/// A discovery beacon broadcast by the avatar application (spec §6). Valid
/// iff `active`, `instance_id` is non-empty, and `window_title` contains
/// the configured marker.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct DiscoveryBeacon {
    pub active: bool,
    #[serde(rename = "instanceId")]
    pub instance_id: String,
    #[serde(rename = "windowTitle")]
    pub window_title: String,
    pub port: u16,
}

#[derive(Debug, Serialize)]
pub struct TokenRequestData<'a> {
    #[serde(rename = "pluginName")]
    pub plugin_name: &'a str,
    #[serde(rename = "pluginDeveloper")]
    pub plugin_developer: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct TokenResponseData {
    #[serde(rename = "authenticationToken")]
    pub authentication_token: String,
}

#[derive(Debug, Serialize)]
pub struct AuthRequestData<'a> {
    #[serde(rename = "pluginName")]
    pub plugin_name: &'a str,
    #[serde(rename = "pluginDeveloper")]
    pub plugin_developer: &'a str,
    #[serde(rename = "authenticationToken")]
    pub authentication_token: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct AuthResponseData {
    pub authenticated: bool,
    #[serde(default)]
    #[allow(dead_code)]
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct ParameterInfo {
    #[serde(rename = "parameterName")]
    pub parameter_name: String,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct ParameterListResponseData {
    #[serde(rename = "defaultParameters")]
    pub default_parameters: Vec<ParameterInfo>,
    #[serde(rename = "customParameters")]
    pub custom_parameters: Vec<ParameterInfo>,
}

#[derive(Debug, Serialize)]
pub struct ParameterCreationData<'a> {
    #[serde(rename = "parameterName")]
    pub parameter_name: &'a str,
    pub explanation: &'a str,
    pub min: f64,
    pub max: f64,
    #[serde(rename = "defaultValue")]
    pub default_value: f64,
}

#[derive(Debug, Serialize)]
pub struct ParameterValue<'a> {
    pub id: &'a str,
    pub value: f64,
    pub weight: f64,
}

#[derive(Debug, Serialize)]
pub struct InjectParameterDataRequest<'a> {
    #[serde(rename = "faceFound")]
    pub face_found: bool,
    pub mode: &'static str,
    #[serde(rename = "parameterValues")]
    pub parameter_values: Vec<ParameterValue<'a>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_request_envelope_shape() {
        let req = ApiRequest::new(
            "req-1".to_string(),
            "AuthenticationRequest",
            AuthRequestData {
                plugin_name: "bridge-daemon",
                plugin_developer: "bridge-daemon",
                authentication_token: "tok",
            },
        );
        let text = req.to_text();
        assert!(text.contains("\"apiName\":\"BridgeCoreAPI\""));
        assert!(text.contains("\"requestID\":\"req-1\""));
        assert!(text.contains("\"messageType\":\"AuthenticationRequest\""));
    }

    #[test]
    fn discovery_beacon_valid_when_all_conditions_met() {
        let json = r#"{"active":true,"instanceId":"abc123","windowTitle":"Desktop Avatar App - Model","port":21412}"#;
        let beacon: DiscoveryBeacon = serde_json::from_str(json).unwrap();
        assert!(beacon.active);
        assert!(!beacon.instance_id.is_empty());
        assert!(beacon.window_title.contains("Desktop Avatar App"));
    }

    #[test]
    fn discovery_beacon_missing_fields_default_to_invalid() {
        let beacon: DiscoveryBeacon = serde_json::from_str("{}").unwrap();
        assert!(!beacon.active);
        assert!(beacon.instance_id.is_empty());
    }
}
