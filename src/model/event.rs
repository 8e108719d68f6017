use crate::message::blob::{DefBLOBVector, EnableBlob, NewBLOBVector, SetBLOBVector};
use crate::message::common::{DelProperty, GetProperties, Message};
use crate::message::light::{DefLightVector, SetLightVector};
use crate::message::number::{DefNumberVector, NewNumberVector, SetNumberVector};
use crate::message::switch::{DefSwitchVector, NewSwitchVector, SetSwitchVector};
use crate::message::text::{DefTextVector, NewTextVector, SetTextVector};
use crate::message::MessageType;

/// A parsed, typed INDI element ready to hand to driver/server logic.
///
/// Events split into two directions: `Inbound` variants are things a client
/// sends toward a driver (`getProperties`, `enableBLOB`, `new*Vector`);
/// everything else is traffic a driver or upstream server produced, which a
/// snoop subscriber may want to observe.
#[derive(Debug, Clone)]
pub enum Event {
    /// Client requests property definitions
    GetProperties(GetProperties),
    /// Client sets this connection's BLOB policy
    EnableBlob(EnableBlob),
    /// Client requests a text vector change
    NewTextVector(NewTextVector),
    /// Client requests a number vector change
    NewNumberVector(NewNumberVector),
    /// Client requests a switch vector change
    NewSwitchVector(NewSwitchVector),
    /// Client requests a BLOB vector change
    NewBlobVector(NewBLOBVector),
    /// Free-form commentary
    Message(Message),
    /// A vector or device was removed
    DelProperty(DelProperty),
    /// A text vector was (re)defined
    DefTextVector(DefTextVector),
    /// A number vector was (re)defined
    DefNumberVector(DefNumberVector),
    /// A switch vector was (re)defined
    DefSwitchVector(DefSwitchVector),
    /// A BLOB vector was (re)defined
    DefBlobVector(DefBLOBVector),
    /// A light vector was (re)defined
    DefLightVector(DefLightVector),
    /// A text vector's value changed
    SetTextVector(SetTextVector),
    /// A number vector's value changed
    SetNumberVector(SetNumberVector),
    /// A switch vector's value changed
    SetSwitchVector(SetSwitchVector),
    /// A BLOB vector's value changed
    SetBlobVector(SetBLOBVector),
    /// A light vector's value changed
    SetLightVector(SetLightVector),
}

impl Event {
    /// `true` for the four variants a client sends *to* a driver.
    pub fn is_inbound(&self) -> bool {
        matches!(
            self,
            Event::GetProperties(_)
                | Event::EnableBlob(_)
                | Event::NewTextVector(_)
                | Event::NewNumberVector(_)
                | Event::NewSwitchVector(_)
                | Event::NewBlobVector(_)
        )
    }

    /// The device this event is addressed to or originated from, if any.
    /// `GetProperties` can be device-less (a wildcard query).
    pub fn device(&self) -> Option<&str> {
        match self {
            Event::GetProperties(m) => m.device.as_deref(),
            Event::EnableBlob(m) => Some(&m.device),
            Event::NewTextVector(m) => Some(&m.device),
            Event::NewNumberVector(m) => Some(&m.device),
            Event::NewSwitchVector(m) => Some(&m.device),
            Event::NewBlobVector(m) => Some(&m.device),
            Event::Message(m) => m.device.as_deref(),
            Event::DelProperty(m) => Some(&m.device),
            Event::DefTextVector(m) => Some(&m.device),
            Event::DefNumberVector(m) => Some(&m.device),
            Event::DefSwitchVector(m) => Some(&m.device),
            Event::DefBlobVector(m) => Some(&m.device),
            Event::DefLightVector(m) => Some(&m.device),
            Event::SetTextVector(m) => Some(&m.device),
            Event::SetNumberVector(m) => Some(&m.device),
            Event::SetSwitchVector(m) => Some(&m.device),
            Event::SetBlobVector(m) => Some(&m.device),
            Event::SetLightVector(m) => Some(&m.device),
        }
    }

    /// `true` if this event carries (or announces) a BLOB payload and is
    /// therefore subject to [`crate::blob_policy`] admission.
    pub fn is_blob_bearing(&self) -> bool {
        matches!(
            self,
            Event::NewBlobVector(_) | Event::DefBlobVector(_) | Event::SetBlobVector(_)
        )
    }

    /// The vector name this event addresses, for the variants that name one.
    /// `GetProperties`/`Message` may address a whole device, hence `None`.
    pub fn vector_name(&self) -> Option<&str> {
        match self {
            Event::GetProperties(m) => m.name.as_deref(),
            Event::EnableBlob(m) => m.name.as_deref(),
            Event::NewTextVector(m) => Some(&m.name),
            Event::NewNumberVector(m) => Some(&m.name),
            Event::NewSwitchVector(m) => Some(&m.name),
            Event::NewBlobVector(m) => Some(&m.name),
            Event::Message(_) => None,
            Event::DelProperty(m) => m.name.as_deref(),
            Event::DefTextVector(m) => Some(&m.name),
            Event::DefNumberVector(m) => Some(&m.name),
            Event::DefSwitchVector(m) => Some(&m.name),
            Event::DefBlobVector(m) => Some(&m.name),
            Event::DefLightVector(m) => Some(&m.name),
            Event::SetTextVector(m) => Some(&m.name),
            Event::SetNumberVector(m) => Some(&m.name),
            Event::SetSwitchVector(m) => Some(&m.name),
            Event::SetBlobVector(m) => Some(&m.name),
            Event::SetLightVector(m) => Some(&m.name),
        }
    }
}

impl From<MessageType> for Event {
    fn from(message: MessageType) -> Self {
        match message {
            MessageType::GetProperties(m) => Event::GetProperties(m),
            MessageType::EnableBLOB(m) => Event::EnableBlob(m),
            MessageType::NewTextVector(m) => Event::NewTextVector(m),
            MessageType::NewNumberVector(m) => Event::NewNumberVector(m),
            MessageType::NewSwitchVector(m) => Event::NewSwitchVector(m),
            MessageType::NewBLOBVector(m) => Event::NewBlobVector(m),
            MessageType::Message(m) => Event::Message(m),
            MessageType::DelProperty(m) => Event::DelProperty(m),
            MessageType::DefTextVector(m) => Event::DefTextVector(m),
            MessageType::DefNumberVector(m) => Event::DefNumberVector(m),
            MessageType::DefSwitchVector(m) => Event::DefSwitchVector(m),
            MessageType::DefBLOBVector(m) => Event::DefBlobVector(m),
            MessageType::DefLightVector(m) => Event::DefLightVector(m),
            MessageType::SetTextVector(m) => Event::SetTextVector(m),
            MessageType::SetNumberVector(m) => Event::SetNumberVector(m),
            MessageType::SetSwitchVector(m) => Event::SetSwitchVector(m),
            MessageType::SetBLOBVector(m) => Event::SetBlobVector(m),
            MessageType::SetLightVector(m) => Event::SetLightVector(m),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn get_properties_is_inbound_and_deviceless() {
        let msg = MessageType::from_str(r#"<getProperties version="1.7"/>"#).unwrap();
        let event = Event::from(msg);
        assert!(event.is_inbound());
        assert!(event.device().is_none());
    }

    #[test]
    fn def_switch_vector_is_not_inbound() {
        let xml = r#"<defSwitchVector device="D" name="N" state="Idle" perm="rw" rule="OneOfMany"><defSwitch name="S1">On</defSwitch></defSwitchVector>"#;
        let msg = MessageType::from_str(xml).unwrap();
        let event = Event::from(msg);
        assert!(!event.is_inbound());
        assert_eq!(event.device(), Some("D"));
    }
}
