//! Wire protocol frame schema
//!
//! Both protocols open with a 2-byte little-endian version frame that must
//! equal [`crate::PROTOCOL_VERSION`]. Messages failing the version check or
//! carrying the wrong frame count parse to `None` and are dropped silently,
//! never answered with an error frame.
//!
//! Assignment request (after the transport's return-address frame):
//! `[version][request-id][ecumene-key]`
//! Assignment reply: `[request-id][ecumene-key][status][endpoint]`
//! Heartbeat: `[version][action][ecumene-key][endpoint]`

use bytes::Bytes;

use crate::PROTOCOL_VERSION;

/// Status marker for a successful assignment reply
pub const STATUS_OK: &str = "";

/// Status marker when no live endpoint exists for the group
pub const STATUS_UNAVAILABLE: &str = "U";

/// Action marker for register/refresh heartbeats
pub const ACTION_REGISTER: &str = "";

/// Action marker for unregister heartbeats
pub const ACTION_UNREGISTER: &str = "U";

/// Encode the protocol version frame
pub fn version_frame() -> Bytes {
    Bytes::copy_from_slice(&PROTOCOL_VERSION.to_le_bytes())
}

/// Check a received version frame: exactly 2 bytes, exact value
pub fn version_ok(frame: &[u8]) -> bool {
    frame.len() == 2 && frame == PROTOCOL_VERSION.to_le_bytes().as_slice()
}

/// What a heartbeat asks the registry to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatAction {
    /// Add or refresh an endpoint under its group key
    Register,
    /// Remove an endpoint from its group
    Unregister,
}

impl HeartbeatAction {
    /// Parse an action frame; unknown values are discarded as `None`
    pub fn parse(frame: &[u8]) -> Option<Self> {
        match frame {
            b"" => Some(HeartbeatAction::Register),
            b"U" => Some(HeartbeatAction::Unregister),
            _ => None,
        }
    }

    /// Encode as a wire frame
    pub fn as_frame(self) -> Bytes {
        match self {
            HeartbeatAction::Register => Bytes::from_static(b""),
            HeartbeatAction::Unregister => Bytes::from_static(b"U"),
        }
    }
}

/// A parsed assignment lookup request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignmentRequest {
    /// Opaque correlation id, echoed verbatim in the reply
    pub request_id: Bytes,
    /// Group key to draw a live endpoint from
    pub ecumene_key: String,
}

impl AssignmentRequest {
    /// Parse the payload frames that follow the return address.
    ///
    /// Expects exactly `[version, request-id, ecumene-key]`; anything else
    /// is a silent drop.
    pub fn parse(frames: &[Bytes]) -> Option<Self> {
        if frames.len() != 3 || !version_ok(&frames[0]) {
            return None;
        }
        Some(Self {
            request_id: frames[1].clone(),
            ecumene_key: String::from_utf8_lossy(&frames[2]).into_owned(),
        })
    }

    /// Encode for sending (client side)
    pub fn to_frames(&self) -> Vec<Bytes> {
        vec![
            version_frame(),
            self.request_id.clone(),
            Bytes::copy_from_slice(self.ecumene_key.as_bytes()),
        ]
    }
}

/// An assignment reply; `endpoint` is `None` when no live entry exists
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignmentReply {
    /// Correlation id echoed from the request
    pub request_id: Bytes,
    /// Group key echoed from the request
    pub ecumene_key: String,
    /// Selected endpoint, or `None` for status `"U"`
    pub endpoint: Option<String>,
}

impl AssignmentReply {
    /// Parse reply frames `[request-id, ecumene-key, status, endpoint]`.
    /// Only the two defined status markers are accepted; anything else is
    /// a silent drop.
    pub fn parse(frames: &[Bytes]) -> Option<Self> {
        if frames.len() != 4 {
            return None;
        }
        let endpoint = match frames[2].as_ref() {
            b"" => Some(String::from_utf8_lossy(&frames[3]).into_owned()),
            b"U" => None,
            _ => return None,
        };
        Some(Self {
            request_id: frames[0].clone(),
            ecumene_key: String::from_utf8_lossy(&frames[1]).into_owned(),
            endpoint,
        })
    }

    /// Encode for sending (service side, return address excluded)
    pub fn to_frames(&self) -> Vec<Bytes> {
        let status = if self.endpoint.is_some() {
            STATUS_OK
        } else {
            STATUS_UNAVAILABLE
        };
        vec![
            self.request_id.clone(),
            Bytes::copy_from_slice(self.ecumene_key.as_bytes()),
            Bytes::copy_from_slice(status.as_bytes()),
            Bytes::copy_from_slice(self.endpoint.as_deref().unwrap_or("").as_bytes()),
        ]
    }
}

/// A parsed heartbeat message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heartbeat {
    /// Register/refresh or unregister
    pub action: HeartbeatAction,
    /// Group the endpoint belongs to
    pub ecumene_key: String,
    /// Worker endpoint being announced or withdrawn
    pub endpoint: String,
}

impl Heartbeat {
    /// Parse a full heartbeat message.
    ///
    /// Expects exactly `[version, action, ecumene-key, endpoint]`; wrong
    /// version, wrong frame count, and unknown actions all discard to
    /// `None`.
    pub fn parse(frames: &[Bytes]) -> Option<Self> {
        if frames.len() != 4 || !version_ok(&frames[0]) {
            return None;
        }
        let action = HeartbeatAction::parse(&frames[1])?;
        Some(Self {
            action,
            ecumene_key: String::from_utf8_lossy(&frames[2]).into_owned(),
            endpoint: String::from_utf8_lossy(&frames[3]).into_owned(),
        })
    }

    /// Encode for sending (client side)
    pub fn to_frames(&self) -> Vec<Bytes> {
        vec![
            version_frame(),
            self.action.as_frame(),
            Bytes::copy_from_slice(self.ecumene_key.as_bytes()),
            Bytes::copy_from_slice(self.endpoint.as_bytes()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_frame_is_two_zero_bytes() {
        assert_eq!(version_frame().as_ref(), &[0u8, 0u8]);
        assert!(version_ok(&version_frame()));
    }

    #[test]
    fn test_version_rejects_wrong_size() {
        assert!(!version_ok(&[0]));
        assert!(!version_ok(&[0, 0, 0]));
        assert!(!version_ok(&[]));
    }

    #[test]
    fn test_version_rejects_wrong_value() {
        assert!(!version_ok(&[1, 0]));
        assert!(!version_ok(&[0, 1]));
    }

    #[test]
    fn test_action_parse() {
        assert_eq!(HeartbeatAction::parse(b""), Some(HeartbeatAction::Register));
        assert_eq!(HeartbeatAction::parse(b"U"), Some(HeartbeatAction::Unregister));
        assert_eq!(HeartbeatAction::parse(b"X"), None);
        assert_eq!(HeartbeatAction::parse(b"UU"), None);
    }

    #[test]
    fn test_request_round_trip() {
        let req = AssignmentRequest {
            request_id: Bytes::from_static(b"42"),
            ecumene_key: "render".into(),
        };
        let parsed = AssignmentRequest::parse(&req.to_frames()).unwrap();
        assert_eq!(parsed, req);
    }

    #[test]
    fn test_request_drops_bad_version() {
        let mut frames = AssignmentRequest {
            request_id: Bytes::from_static(b"1"),
            ecumene_key: "k".into(),
        }
        .to_frames();
        frames[0] = Bytes::from_static(&[1, 0]);
        assert!(AssignmentRequest::parse(&frames).is_none());
    }

    #[test]
    fn test_request_drops_wrong_frame_count() {
        let frames = vec![version_frame(), Bytes::from_static(b"1")];
        assert!(AssignmentRequest::parse(&frames).is_none());
    }

    #[test]
    fn test_reply_status_markers() {
        let ok = AssignmentReply {
            request_id: Bytes::from_static(b"7"),
            ecumene_key: "g".into(),
            endpoint: Some("tcp://worker:9000".into()),
        };
        assert_eq!(ok.to_frames()[2].as_ref(), b"");

        let unavailable = AssignmentReply {
            request_id: Bytes::from_static(b"7"),
            ecumene_key: "g".into(),
            endpoint: None,
        };
        let frames = unavailable.to_frames();
        assert_eq!(frames[2].as_ref(), b"U");
        assert!(frames[3].is_empty());
        assert_eq!(AssignmentReply::parse(&frames).unwrap().endpoint, None);
    }

    #[test]
    fn test_reply_drops_unknown_status() {
        let mut frames = AssignmentReply {
            request_id: Bytes::from_static(b"7"),
            ecumene_key: "g".into(),
            endpoint: Some("tcp://worker:9000".into()),
        }
        .to_frames();
        frames[2] = Bytes::from_static(b"X");
        assert!(AssignmentReply::parse(&frames).is_none());
    }

    #[test]
    fn test_heartbeat_round_trip() {
        let hb = Heartbeat {
            action: HeartbeatAction::Register,
            ecumene_key: "render".into(),
            endpoint: "tcp://worker:9000".into(),
        };
        assert_eq!(Heartbeat::parse(&hb.to_frames()).unwrap(), hb);
    }

    #[test]
    fn test_heartbeat_drops_unknown_action() {
        let mut frames = Heartbeat {
            action: HeartbeatAction::Register,
            ecumene_key: "k".into(),
            endpoint: "e".into(),
        }
        .to_frames();
        frames[1] = Bytes::from_static(b"Z");
        assert!(Heartbeat::parse(&frames).is_none());
    }
}
