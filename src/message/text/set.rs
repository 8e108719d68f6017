use crate::message::common::PropertyState;
use crate::timestamp::INDITimestamp;
use super::one::OneText;
use serde::{Deserialize, Serialize};

/// Set text vector command
/// 
/// According to the INDI protocol specification, this command sends a new set of values
/// for a Text vector, with optional new timeout, state, timestamp, and message.
/// The state attribute indicates whether the values are being set (Busy), have been
/// set (Ok), or the attempt to set them failed (Alert).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename = "setTextVector")]
pub struct SetTextVector {
    /// Device name
    #[serde(rename = "@device")]
    pub device: String,
    /// Property name
    #[serde(rename = "@name")]
    pub name: String,
    /// Property state, no change if absent
    #[serde(rename = "@state")]
    pub state: Option<PropertyState>,
    /// Worse-case time to affect a change
    #[serde(rename = "@timeout")]
    pub timeout: Option<f64>,
    /// Moment when these data were valid
    #[serde(rename = "@timestamp")]
    pub timestamp: Option<INDITimestamp>,
    /// Commentary
    #[serde(rename = "@message")]
    pub message: Option<String>,
    /// Text elements
    #[serde(rename = "oneText")]
    pub texts: Vec<OneText>,
}
