use crate::prelude::PropertyState;
use crate::timestamp::INDITimestamp;
use serde::{Deserialize, Serialize};
use super::one::OneBLOB;

/// BLOB vector that follows the INDI protocol DTD specification.
/// Used to report a BLOB's current value.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename = "setBLOBVector")]
pub struct SetBLOBVector {
    /// Device name
    #[serde(rename = "@device")]
    pub device: String,
    /// Name of the property
    #[serde(rename = "@name")]
    pub name: String,
    /// State of the property
    #[serde(rename = "@state")]
    pub state: PropertyState,
    /// Timestamp
    #[serde(rename = "@timestamp", skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<INDITimestamp>,
    /// Message
    #[serde(rename = "@message", skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// BLOB elements
    #[serde(rename = "oneBLOB")]
    pub blobs: Vec<OneBLOB>,
}
