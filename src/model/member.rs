use crate::property::{PropertyState, SwitchState};

/// One element of a vector: a switch, a text field, a number, a light, or a
/// BLOB slot.
#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    /// Element name, unique within its vector
    pub name: String,
    /// GUI label; defaults to `name` when absent on the wire
    pub label: Option<String>,
    /// Current value
    pub value: MemberValue,
}

impl Member {
    /// Construct a member with no label set.
    pub fn new(name: impl Into<String>, value: MemberValue) -> Self {
        Self {
            name: name.into(),
            label: None,
            value,
        }
    }
}

/// The value carried by a [`Member`], tagged by vector kind.
#[derive(Debug, Clone, PartialEq)]
pub enum MemberValue {
    /// `oneText` / `defText` content
    Text(String),
    /// `oneNumber` / `defNumber` content, plus the printf/sexagesimal format
    /// string it was rendered with (`%<w>.<f>m` family included)
    Number {
        /// Parsed numeric value
        value: f64,
        /// Format spec used to render this value on the wire
        format: String,
        /// Minimum (definition-time only; irrelevant on `oneNumber`)
        min: f64,
        /// Maximum (definition-time only)
        max: f64,
        /// Step (definition-time only)
        step: f64,
    },
    /// `oneSwitch` / `defSwitch` content
    Switch(SwitchState),
    /// `oneLight` / `defLight` content — lights have no writable form
    Light(PropertyState),
    /// `oneBLOB` / `defBLOB` content: decoded bytes plus the format suffix
    /// (e.g. `.fits`, `.fits.z`)
    Blob {
        /// File-suffix format descriptor
        format: String,
        /// Decoded payload; empty for a bare `defBLOB` announcement
        data: Vec<u8>,
    },
}

impl MemberValue {
    /// `true` if this is a BLOB-carrying value.
    pub fn is_blob(&self) -> bool {
        matches!(self, MemberValue::Blob { .. })
    }
}
