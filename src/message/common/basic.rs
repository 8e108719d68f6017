use crate::timestamp::INDITimestamp;
use serde::{Deserialize, Serialize};

/// Get properties request — the handshake element a client/remote sends to
/// request `defXXXVector` announcements for some or all devices/vectors.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename = "getProperties")]
pub struct GetProperties {
    /// Protocol version of the requester
    #[serde(rename = "@version")]
    pub version: String,
    /// Device name (absent means all devices)
    #[serde(rename = "@device", skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    /// Property name (absent means all vectors of the device)
    #[serde(rename = "@name", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl GetProperties {
    /// Build a `getProperties` request for the current protocol version.
    pub fn new(device: Option<String>, name: Option<String>) -> Self {
        Self {
            version: crate::PROTOCOL_VERSION.to_string(),
            device,
            name,
        }
    }
}

/// Notification that a previously defined vector (or an entire device) no
/// longer exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename = "delProperty")]
pub struct DelProperty {
    /// Device name
    #[serde(rename = "@device")]
    pub device: String,
    /// Property name (absent means the whole device is gone)
    #[serde(rename = "@name", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Timestamp of deletion
    #[serde(rename = "@timestamp", skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<INDITimestamp>,
    /// Optional commentary
    #[serde(rename = "@message", skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
