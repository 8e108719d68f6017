use super::member::{Member, MemberValue};
use crate::error::{Error, Result};
use crate::property::{PropertyPerm, PropertyState, SwitchRule, SwitchState};
use crate::timestamp::INDITimestamp;
use indexmap::IndexMap;

/// Which wire family a vector belongs to. Drives which `def`/`set`/`new`
/// DTOs it can be built from and emitted as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorKind {
    /// `*TextVector`
    Text,
    /// `*NumberVector`
    Number,
    /// `*SwitchVector`
    Switch,
    /// `*LightVector` (read-only, no `new`)
    Light,
    /// `*BLOBVector`
    Blob,
}

/// A single property vector owned by a [`super::Device`].
#[derive(Debug, Clone)]
pub struct Vector {
    /// Vector kind
    pub kind: VectorKind,
    /// Vector name, unique within its device
    pub name: String,
    /// GUI label
    pub label: Option<String>,
    /// GUI group membership
    pub group: Option<String>,
    /// Current state
    pub state: PropertyState,
    /// Client controllability; `None` for `Light` vectors (always read-only)
    pub perm: Option<PropertyPerm>,
    /// Worst-case time to take effect
    pub timeout: Option<f64>,
    /// Last-updated timestamp
    pub timestamp: Option<INDITimestamp>,
    /// `false` once the driver has deleted this vector (`delProperty` sent)
    pub enable: bool,
    /// Switch-only: the selection rule enforced by [`Vector::apply_new`]
    pub rule: Option<SwitchRule>,
    /// Members in declaration order
    pub members: IndexMap<String, Member>,
    /// Snapshot of the values most recently sent in a `set*Vector`, used to
    /// suppress no-op sends when `allvalues=false`
    pub last_sent: IndexMap<String, MemberValue>,
}

impl Vector {
    /// Construct an empty vector of the given kind.
    pub fn new(kind: VectorKind, name: impl Into<String>, perm: Option<PropertyPerm>) -> Self {
        Self {
            kind,
            name: name.into(),
            label: None,
            group: None,
            state: PropertyState::Idle,
            perm,
            timeout: None,
            timestamp: None,
            enable: true,
            rule: None,
            members: IndexMap::new(),
            last_sent: IndexMap::new(),
        }
    }

    /// Validate a proposed full switch selection against this vector's
    /// [`SwitchRule`], without mutating anything.
    pub fn validate_switch_selection(&self, selection: &IndexMap<String, SwitchState>) -> Result<()> {
        let Some(rule) = self.rule else {
            return Ok(());
        };
        let on_count = selection.values().filter(|s| **s == SwitchState::On).count();
        match rule {
            SwitchRule::OneOfMany => {
                if on_count != 1 {
                    return Err(Error::InvalidSwitchState(format!(
                        "OneOfMany vector {} requires exactly one On switch, got {}",
                        self.name, on_count
                    )));
                }
            }
            SwitchRule::AtMostOne => {
                if on_count > 1 {
                    return Err(Error::InvalidSwitchState(format!(
                        "AtMostOne vector {} allows at most one On switch, got {}",
                        self.name, on_count
                    )));
                }
            }
            SwitchRule::AnyOfMany => {}
        }
        Ok(())
    }

    /// Apply a partial `new*Vector` update: only the members present in
    /// `updates` change. Switch vectors are validated as a *whole* vector
    /// against `rule` after the update is projected, since `OneOfMany`
    /// cannot be judged from a single switch in isolation.
    ///
    /// Returns an error (and leaves `self` untouched) if the vector is
    /// disabled, read-only, or the update would violate the switch rule.
    pub fn apply_new(&mut self, updates: IndexMap<String, MemberValue>) -> Result<()> {
        if !self.enable {
            return Err(Error::Protocol(format!("vector {} is deleted", self.name)));
        }
        if self.perm == Some(PropertyPerm::Ro) {
            return Err(Error::Protocol(format!("vector {} is read-only", self.name)));
        }

        if self.kind == VectorKind::Switch {
            let mut projected: IndexMap<String, SwitchState> = self
                .members
                .iter()
                .map(|(k, m)| {
                    let current = match &m.value {
                        MemberValue::Switch(s) => *s,
                        _ => SwitchState::Off,
                    };
                    (k.clone(), current)
                })
                .collect();
            for (name, value) in &updates {
                if let MemberValue::Switch(s) = value {
                    projected.insert(name.clone(), *s);
                }
            }
            self.validate_switch_selection(&projected)?;
        }

        for (name, value) in updates {
            if let Some(member) = self.members.get_mut(&name) {
                member.value = match (value, &member.value) {
                    (MemberValue::Number { value: new_value, .. }, MemberValue::Number { format, min, max, step, .. }) => {
                        MemberValue::Number {
                            value: new_value,
                            format: format.clone(),
                            min: *min,
                            max: *max,
                            step: *step,
                        }
                    }
                    (new_value, _) => new_value,
                };
            }
        }
        Ok(())
    }

    /// `true` if `members` differs from `last_sent` in value, state, or
    /// message-worthy fields — used to implement `send_set_vector`'s
    /// no-op suppression when `allvalues=false`.
    pub fn has_unsent_changes(&self) -> bool {
        if self.members.len() != self.last_sent.len() {
            return true;
        }
        self.members
            .iter()
            .any(|(name, member)| self.last_sent.get(name) != Some(&member.value))
    }

    /// Snapshot current member values into `last_sent`, called right after
    /// a `set*Vector` is successfully enqueued.
    pub fn mark_sent(&mut self) {
        self.last_sent = self
            .members
            .iter()
            .map(|(k, v)| (k.clone(), v.value.clone()))
            .collect();
    }
}
