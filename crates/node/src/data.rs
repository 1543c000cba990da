//! Kind-specific element attributes.

use crate::connection::Color;
use crate::element::ElementKind;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

/// Operational state of a device or service.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DeviceStatus {
    #[default]
    Active,
    Maintenance,
    Offline,
    Malfunction,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneData {
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
}

/// Attributes shared by racks and placeholder racks.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RackData {
    pub label: String,
    pub total_u: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_id: Option<String>,
}

impl Default for RackData {
    fn default() -> Self {
        Self {
            label: String::new(),
            total_u: RackData::DEFAULT_TOTAL_U,
            description: None,
            asset_id: None,
        }
    }
}

impl RackData {
    pub const DEFAULT_TOTAL_U: u32 = 42;

    pub fn new(label: impl Into<String>, total_u: u32) -> Self {
        Self {
            label: label.into(),
            total_u,
            ..Default::default()
        }
    }
}

/// Attributes of rack-mountable equipment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceData {
    pub label: String,
    pub u_height: u32,
    #[serde(default)]
    pub status: DeviceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// CPU cores, virtual machines only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu: Option<u32>,
    /// Memory in GB, virtual machines only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<u32>,
}

impl Default for DeviceData {
    fn default() -> Self {
        Self {
            label: String::new(),
            u_height: 1,
            status: DeviceStatus::default(),
            model: None,
            ip: None,
            asset_id: None,
            contact: None,
            description: None,
            cpu: None,
            memory: None,
        }
    }
}

impl DeviceData {
    pub fn new(label: impl Into<String>, u_height: u32) -> Self {
        Self {
            label: label.into(),
            u_height,
            ..Default::default()
        }
    }

    pub fn with_status(mut self, status: DeviceStatus) -> Self {
        self.status = status;
        self
    }
}

/// Attributes of a logical service node.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SoftwareData {
    pub label: String,
    #[serde(default)]
    pub status: DeviceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tech_stack: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Kind-keyed attribute bag of an element.
///
/// The variant *is* the element kind; there is no separate kind field to
/// fall out of sync with it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ElementData {
    Zone(ZoneData),
    Rack(RackData),
    Placeholder(RackData),
    Server(DeviceData),
    Network(DeviceData),
    Storage(DeviceData),
    Firewall(DeviceData),
    VirtualMachine(DeviceData),
    Software(SoftwareData),
}

impl ElementData {
    /// Attributes for a freshly created element of `kind`.
    pub fn for_kind(kind: ElementKind, label: impl Into<String>) -> Self {
        let label = label.into();
        match kind {
            ElementKind::Zone => ElementData::Zone(ZoneData {
                label,
                ..Default::default()
            }),
            ElementKind::Rack => ElementData::Rack(RackData::new(label, RackData::DEFAULT_TOTAL_U)),
            ElementKind::Placeholder => {
                ElementData::Placeholder(RackData::new(label, RackData::DEFAULT_TOTAL_U))
            }
            ElementKind::Software => ElementData::Software(SoftwareData {
                label,
                ..Default::default()
            }),
            device => ElementData::device(device, DeviceData::new(label, 1)),
        }
    }

    /// Wrap device attributes in the variant for `kind`.
    ///
    /// Non-device kinds fall back to [`ElementData::Server`].
    pub fn device(kind: ElementKind, data: DeviceData) -> Self {
        match kind {
            ElementKind::Network => ElementData::Network(data),
            ElementKind::Storage => ElementData::Storage(data),
            ElementKind::Firewall => ElementData::Firewall(data),
            ElementKind::VirtualMachine => ElementData::VirtualMachine(data),
            _ => ElementData::Server(data),
        }
    }

    pub fn kind(&self) -> ElementKind {
        match self {
            ElementData::Zone(_) => ElementKind::Zone,
            ElementData::Rack(_) => ElementKind::Rack,
            ElementData::Placeholder(_) => ElementKind::Placeholder,
            ElementData::Server(_) => ElementKind::Server,
            ElementData::Network(_) => ElementKind::Network,
            ElementData::Storage(_) => ElementKind::Storage,
            ElementData::Firewall(_) => ElementKind::Firewall,
            ElementData::VirtualMachine(_) => ElementKind::VirtualMachine,
            ElementData::Software(_) => ElementKind::Software,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            ElementData::Zone(data) => &data.label,
            ElementData::Rack(data) | ElementData::Placeholder(data) => &data.label,
            ElementData::Server(data)
            | ElementData::Network(data)
            | ElementData::Storage(data)
            | ElementData::Firewall(data)
            | ElementData::VirtualMachine(data) => &data.label,
            ElementData::Software(data) => &data.label,
        }
    }

    pub fn set_label(&mut self, label: impl Into<String>) {
        let label = label.into();
        match self {
            ElementData::Zone(data) => data.label = label,
            ElementData::Rack(data) | ElementData::Placeholder(data) => data.label = label,
            ElementData::Server(data)
            | ElementData::Network(data)
            | ElementData::Storage(data)
            | ElementData::Firewall(data)
            | ElementData::VirtualMachine(data) => data.label = label,
            ElementData::Software(data) => data.label = label,
        }
    }

    pub fn device_data(&self) -> Option<&DeviceData> {
        match self {
            ElementData::Server(data)
            | ElementData::Network(data)
            | ElementData::Storage(data)
            | ElementData::Firewall(data)
            | ElementData::VirtualMachine(data) => Some(data),
            _ => None,
        }
    }

    pub fn rack_data(&self) -> Option<&RackData> {
        match self {
            ElementData::Rack(data) | ElementData::Placeholder(data) => Some(data),
            _ => None,
        }
    }

    /// Declared height in rack units, for rack-mountable devices.
    pub fn u_height(&self) -> Option<u32> {
        self.device_data().map(|data| data.u_height)
    }

    /// Declared capacity in rack units, for racks and placeholders.
    pub fn total_u(&self) -> Option<u32> {
        self.rack_data().map(|data| data.total_u)
    }

    pub fn status(&self) -> Option<DeviceStatus> {
        match self {
            ElementData::Software(data) => Some(data.status),
            other => other.device_data().map(|data| data.status),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_determines_kind() {
        let data = ElementData::for_kind(ElementKind::Storage, "SAN");
        assert_eq!(data.kind(), ElementKind::Storage);
        assert_eq!(data.u_height(), Some(1));
        assert_eq!(data.total_u(), None);

        let rack = ElementData::for_kind(ElementKind::Placeholder, "Reserved");
        assert_eq!(rack.total_u(), Some(42));
        assert_eq!(rack.u_height(), None);
    }

    #[test]
    fn test_tagged_json_shape() {
        let data = ElementData::Rack(RackData::new("R1", 42));
        let json = serde_json::to_value(&data).unwrap();
        assert_eq!(json["kind"], "rack");
        assert_eq!(json["totalU"], 42);

        let parsed: ElementData = serde_json::from_str(
            r#"{ "kind": "virtual_machine", "label": "vm-1", "uHeight": 1, "cpu": 8, "memory": 32 }"#,
        )
        .unwrap();
        let device = parsed.device_data().unwrap();
        assert_eq!(parsed.kind(), ElementKind::VirtualMachine);
        assert_eq!(device.cpu, Some(8));
        assert_eq!(device.status, DeviceStatus::Active);
    }

    #[test]
    fn test_set_label_on_every_variant() {
        use strum::IntoEnumIterator;
        for kind in ElementKind::iter() {
            let mut data = ElementData::for_kind(kind, "old");
            data.set_label("new");
            assert_eq!(data.label(), "new");
        }
    }
}
