//! Wire shapes for the mobile link (spec §6): a text-encoded UDP heartbeat
//! request outbound, and an inbound frame document decoded into
//! `bridge_core::Frame`. Unknown inbound fields are ignored; all fields
//! are matched case-sensitively.

use serde::{Deserialize, Serialize};

use bridge_core::Frame;

/// `{messageType:"iOSTrackingDataRequest", time, sentBy, ports:[local_port]}`,
/// sent periodically so the mobile source keeps streaming.
#[derive(Debug, Serialize)]
pub struct HeartbeatRequest<'a> {
    #[serde(rename = "messageType")]
    message_type: &'static str,
    time: f64,
    #[serde(rename = "sentBy")]
    sent_by: &'a str,
    ports: [u16; 1],
}

impl<'a> HeartbeatRequest<'a> {
    pub fn new(sent_by: &'a str, local_port: u16, time: f64) -> Self {
        Self {
            message_type: "iOSTrackingDataRequest",
            time,
            sent_by,
            ports: [local_port],
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("heartbeat request always serializes")
    }
}

#[derive(Debug, Deserialize)]
struct BlendShapeEntry {
    k: String,
    v: f64,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct InboundFrameDoc {
    #[serde(rename = "FaceFound")]
    face_found: bool,
    #[serde(rename = "Timestamp")]
    timestamp: f64,
    #[serde(rename = "HeadPosX")]
    head_pos_x: f64,
    #[serde(rename = "HeadPosY")]
    head_pos_y: f64,
    #[serde(rename = "HeadPosZ")]
    head_pos_z: f64,
    #[serde(rename = "HeadRotX")]
    head_rot_x: f64,
    #[serde(rename = "HeadRotY")]
    head_rot_y: f64,
    #[serde(rename = "HeadRotZ")]
    head_rot_z: f64,
    #[serde(rename = "EyeLeftX")]
    eye_left_x: f64,
    #[serde(rename = "EyeLeftY")]
    eye_left_y: f64,
    #[serde(rename = "EyeRightX")]
    eye_right_x: f64,
    #[serde(rename = "EyeRightY")]
    eye_right_y: f64,
    #[serde(rename = "BlendShapes")]
    blend_shapes: Vec<BlendShapeEntry>,
}

/// Mirrors spec §3's data-validation policy: decode failures are reported
/// through a typed error, never a panic, so the receive loop can count and
/// continue.
#[derive(Debug, thiserror::Error)]
#[error("failed to decode mobile frame: {0}")]
pub struct DecodeError(String);

pub fn decode_frame(bytes: &[u8]) -> Result<Frame, DecodeError> {
    let text = std::str::from_utf8(bytes).map_err(|e| DecodeError(e.to_string()))?;
    let doc: InboundFrameDoc =
        serde_json::from_str(text).map_err(|e| DecodeError(e.to_string()))?;

    let mut blend_shapes = std::collections::HashMap::with_capacity(doc.blend_shapes.len());
    for entry in doc.blend_shapes {
        blend_shapes.insert(entry.k, entry.v);
    }

    Ok(Frame {
        timestamp: doc.timestamp,
        face_present: doc.face_found,
        head_position: (doc.head_pos_x, doc.head_pos_y, doc.head_pos_z),
        head_rotation: (doc.head_rot_x, doc.head_rot_y, doc.head_rot_z),
        eye_left: (doc.eye_left_x, doc.eye_left_y),
        eye_right: (doc.eye_right_x, doc.eye_right_y),
        blend_shapes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heartbeat_request_shape() {
        let req = HeartbeatRequest::new("bridge-daemon", 21412, 1234.5);
        let json = req.to_json();
        assert!(json.contains("\"messageType\":\"iOSTrackingDataRequest\""));
        assert!(json.contains("\"sentBy\":\"bridge-daemon\""));
        assert!(json.contains("\"ports\":[21412]"));
    }

    #[test]
    fn decodes_face_found_frame_with_blend_shapes() {
        let json = r#"{
            "FaceFound": true,
            "HeadRotX": 15.2,
            "BlendShapes": [{"k":"JawOpen","v":0.4}]
        }"#;
        let frame = decode_frame(json.as_bytes()).unwrap();
        assert!(frame.face_present);
        assert_eq!(frame.head_rotation.0, 15.2);
        assert_eq!(frame.blend_shapes["JawOpen"], 0.4);
    }

    #[test]
    fn decodes_face_lost_frame() {
        let json = r#"{"FaceFound": false}"#;
        let frame = decode_frame(json.as_bytes()).unwrap();
        assert!(!frame.face_present);
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let json = r#"{"FaceFound": true, "SomeFutureField": 42}"#;
        assert!(decode_frame(json.as_bytes()).is_ok());
    }

    #[test]
    fn malformed_json_is_a_decode_error() {
        assert!(decode_frame(b"not json").is_err());
    }

    #[test]
    fn invalid_utf8_is_a_decode_error() {
        assert!(decode_frame(&[0xff, 0xfe, 0x00]).is_err());
    }
}
