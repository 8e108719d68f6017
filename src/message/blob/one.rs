use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};

/// One BLOB element that can be used in both setBLOBVector and newBLOBVector
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename = "oneBLOB")]
pub struct OneBLOB {
    /// BLOB name
    #[serde(rename = "@name")]
    pub name: String,
    /// BLOB size (decoded byte length)
    #[serde(rename = "@size")]
    pub size: usize,
    /// BLOB format as a file suffix (e.g. ".fits", ".fits.z")
    #[serde(rename = "@format")]
    pub format: String,
    /// BLOB data, base64-encoded
    #[serde(rename = "$text")]
    pub data: String,
}

impl OneBLOB {
    /// Build a `oneBLOB` element from raw bytes, base64-encoding `data`.
    pub fn new(name: String, format: String, data: Vec<u8>) -> Self {
        Self {
            name,
            size: data.len(),
            format,
            data: general_purpose::STANDARD.encode(&data),
        }
    }

    /// Decode the base64 payload, stripping incidental XML-text whitespace first.
    pub fn get_data(&self) -> Result<Vec<u8>, base64::DecodeError> {
        let stripped: String = self.data.chars().filter(|c| !c.is_whitespace()).collect();
        general_purpose::STANDARD.decode(&stripped)
    }
}
