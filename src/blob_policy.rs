//! BLOB admission policy.
//!
//! A connection's BLOB traffic is gated by `enableBLOB`, which a client may
//! send device-wide, vector-wide, or (implicitly, before any `enableBLOB` at
//! all) not at all. [`BlobPolicy`] tracks all three levels for one
//! connection and resolves them with vector-specific overriding device-wide
//! overriding the connection default, exactly as `indiserver` does.

use crate::message::blob::BLOBEnable;
use std::collections::HashMap;

/// Re-exported under a name that doesn't read like a wire DTO.
pub type BlobMode = BLOBEnable;

/// Per-connection BLOB admission state.
///
/// The default policy for a freshly accepted client connection is
/// [`BlobMode::Never`]; subprocess drivers and upstream remote connections
/// default to [`BlobMode::Also`] so snooped BLOBs flow through unless a
/// driver explicitly narrows them.
#[derive(Debug, Clone)]
pub struct BlobPolicy {
    default: BlobMode,
    per_device: HashMap<String, BlobMode>,
    per_vector: HashMap<(String, String), BlobMode>,
}

impl BlobPolicy {
    /// A policy that starts every device/vector unset, falling back to
    /// `default` until overridden.
    pub fn new(default: BlobMode) -> Self {
        Self {
            default,
            per_device: HashMap::new(),
            per_vector: HashMap::new(),
        }
    }

    /// The conventional default for a freshly accepted client socket.
    pub fn for_client() -> Self {
        Self::new(BlobMode::Never)
    }

    /// The conventional default for a subprocess driver or remote upstream,
    /// which snoop traffic flows through by default.
    pub fn for_upstream() -> Self {
        Self::new(BlobMode::Also)
    }

    /// Apply an `enableBLOB` directive. `vector` of `None` sets (or clears
    /// to device scope) the whole device; `Some(name)` narrows to one
    /// vector.
    pub fn update(&mut self, device: &str, vector: Option<&str>, mode: BlobMode) {
        match vector {
            Some(name) => {
                self.per_vector
                    .insert((device.to_string(), name.to_string()), mode);
            }
            None => {
                self.per_device.insert(device.to_string(), mode);
            }
        }
    }

    /// Resolve the effective policy for `(device, vector)`: vector-specific
    /// overrides device-wide overrides the connection default.
    pub fn resolve(&self, device: &str, vector: &str) -> BlobMode {
        if let Some(mode) = self.per_vector.get(&(device.to_string(), vector.to_string())) {
            return *mode;
        }
        if let Some(mode) = self.per_device.get(device) {
            return *mode;
        }
        self.default
    }

    /// `true` if a BLOB-bearing message for `(device, vector)` should be
    /// admitted to this connection.
    pub fn admit(&self, device: &str, vector: &str) -> bool {
        !matches!(self.resolve(device, vector), BlobMode::Never)
    }

    /// `true` if only BLOB traffic should flow to this connection for
    /// `(device, vector)` — non-BLOB `set*Vector`s for it should be
    /// suppressed.
    pub fn blob_only(&self, device: &str, vector: &str) -> bool {
        matches!(self.resolve(device, vector), BlobMode::Only)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_never_for_clients() {
        let policy = BlobPolicy::for_client();
        assert!(!policy.admit("CCD Simulator", "CCD1"));
    }

    #[test]
    fn vector_override_wins_over_device() {
        let mut policy = BlobPolicy::for_client();
        policy.update("CCD Simulator", None, BlobMode::Also);
        policy.update("CCD Simulator", Some("CCD1"), BlobMode::Never);
        assert!(policy.admit("CCD Simulator", "CCD2"));
        assert!(!policy.admit("CCD Simulator", "CCD1"));
    }

    #[test]
    fn only_suppresses_non_blob_traffic() {
        let mut policy = BlobPolicy::for_client();
        policy.update("CCD Simulator", Some("CCD1"), BlobMode::Only);
        assert!(policy.blob_only("CCD Simulator", "CCD1"));
        assert!(!policy.blob_only("CCD Simulator", "CCD2"));
    }
}
