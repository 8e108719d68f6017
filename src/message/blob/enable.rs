use serde::{Deserialize, Serialize};

/// BLOB enable values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum BLOBEnable {
    /// Never send BLOB data
    Never,
    /// Send BLOB data along with other messages
    Also,
    /// Only send BLOB data
    Only,
}

/// Enable BLOB message.
///
/// `name` is absent when the client is setting the policy for an entire
/// device rather than a single vector (see [`crate::blob_policy`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename = "enableBLOB")]
pub struct EnableBlob {
    /// Device name
    #[serde(rename = "@device")]
    pub device: String,
    /// Property name (optional: absent means device-wide)
    #[serde(rename = "@name", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// BLOB enable value
    #[serde(rename = "$text")]
    pub enable: BLOBEnable,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blob_enable_serialization() {
        let enable = EnableBlob {
            device: "test_device".to_string(),
            name: Some("test_name".to_string()),
            enable: BLOBEnable::Also,
        };

        assert_eq!(enable.device, "test_device");
        assert_eq!(enable.name, Some("test_name".to_string()));
        assert_eq!(enable.enable, BLOBEnable::Also);
    }

    #[test]
    fn test_blob_enable_device_wide() {
        let xml = r#"<enableBLOB device="CCD Simulator">Also</enableBLOB>"#;
        let parsed: EnableBlob = quick_xml::de::from_str(xml).unwrap();
        assert_eq!(parsed.device, "CCD Simulator");
        assert!(parsed.name.is_none());
        assert_eq!(parsed.enable, BLOBEnable::Also);
    }
}
