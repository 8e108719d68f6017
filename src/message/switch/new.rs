use serde::{Deserialize, Serialize};
use crate::timestamp::INDITimestamp;
use super::one::OneSwitch;

/// New switch vector
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename = "newSwitchVector")]
pub struct NewSwitchVector {
    /// Device name
    #[serde(rename = "@device")]
    pub device: String,
    /// Property name
    #[serde(rename = "@name")]
    pub name: String,
    /// Property timestamp
    #[serde(rename = "@timestamp")]
    pub timestamp: Option<INDITimestamp>,
    /// Switch elements
    #[serde(rename = "oneSwitch")]
    pub switches: Vec<OneSwitch>,
}
