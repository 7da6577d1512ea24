//! Per-link state for one VXI-11 session.
//!
//! Grounded on the field layout of the teacher's
//! `protocol/vxi11/rpc.rs` request/response structs (`lid`,
//! `lock_timeout`, `flags`...); here they back a responder's link
//! table instead of a client's outgoing calls.

/// Device error codes from the VXI-11 Core Channel, as sent in every
/// response's leading `error` field. Named the same as the teacher's
/// `RpcDeviceErrorCode`, restricted to the subset this responder can
/// actually produce.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeviceErrorCode {
    NoError,
    SyntaxError,
    InvalidLinkIdentifier,
    OperationNotSupported,
    IoTimeout,
}
impl DeviceErrorCode {
    pub fn wire_value(self) -> u32 {
        match self {
            Self::NoError => 0,
            Self::SyntaxError => 1,
            Self::InvalidLinkIdentifier => 4,
            Self::OperationNotSupported => 8,
            Self::IoTimeout => 15,
        }
    }
}

/// One CREATE_LINK'd session. This responder accepts only one TCP
/// connection at a time, so only one of these is ever live.
pub struct VxiLink {
    pub id: i32,
    pub client_id: i32,
    pub device: String,
    /// Queued response to the next DEVICE_READ, set by the DEVICE_WRITE
    /// that carried a SCPI query.
    pub pending_response: Option<Vec<u8>>,
}
impl VxiLink {
    pub fn new(id: i32, client_id: i32, device: String) -> Self {
        Self {
            id,
            client_id,
            device,
            pending_response: None,
        }
    }

    /// Takes the queued response, if any, leaving `None` behind so a
    /// second DEVICE_READ without an intervening write sees an empty
    /// buffer rather than replaying stale data.
    pub fn take_pending_response(&mut self) -> Vec<u8> {
        self.pending_response.take().unwrap_or_default()
    }
}
