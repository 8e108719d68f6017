use super::define::DefLight;
use crate::property::PropertyState;
use crate::timestamp::INDITimestamp;
use serde::{Deserialize, Serialize};

/// One light element used in a `setLightVector`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename = "oneLight")]
pub struct OneLight {
    /// Name of this light element
    #[serde(rename = "@name")]
    pub name: String,
    /// Light state
    #[serde(rename = "$text")]
    pub value: PropertyState,
}

impl From<DefLight> for OneLight {
    fn from(light: DefLight) -> Self {
        Self {
            name: light.name,
            value: light.state,
        }
    }
}

/// Set light vector — reports a light vector's current state. Lights are
/// read-only, so there is no corresponding `newLightVector`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename = "setLightVector")]
pub struct SetLightVector {
    /// Device name
    #[serde(rename = "@device")]
    pub device: String,
    /// Property name
    #[serde(rename = "@name")]
    pub name: String,
    /// Property state
    #[serde(rename = "@state", skip_serializing_if = "Option::is_none")]
    pub state: Option<PropertyState>,
    /// Property timestamp
    #[serde(rename = "@timestamp", skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<INDITimestamp>,
    /// Optional message/commentary
    #[serde(rename = "@message", skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Light elements
    #[serde(rename = "oneLight")]
    pub lights: Vec<OneLight>,
}
