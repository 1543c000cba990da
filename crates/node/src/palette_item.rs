//! Items dragged from the component palette onto the canvas.

use crate::coords::CanvasSize;
use crate::data::{DeviceData, ElementData, RackData, SoftwareData, ZoneData};
use crate::element::ElementKind;
use dcim_core::EngineConfig;
use serde::{Deserialize, Serialize};

/// Template for an element created by dropping a palette entry.
///
/// Only the fields relevant to `kind` are read; the rest fall back to the
/// kind's defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaletteItem {
    pub kind: ElementKind,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub u_height: Option<u32>,
    #[serde(default)]
    pub total_u: Option<u32>,
    /// Zone width; other kinds derive their size.
    #[serde(default)]
    pub width: Option<f32>,
    #[serde(default)]
    pub height: Option<f32>,
    #[serde(default)]
    pub cpu: Option<u32>,
    #[serde(default)]
    pub memory: Option<u32>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub tech_stack: Option<String>,
}

impl PaletteItem {
    pub fn new(kind: ElementKind) -> Self {
        Self {
            kind,
            label: None,
            u_height: None,
            total_u: None,
            width: None,
            height: None,
            cpu: None,
            memory: None,
            version: None,
            port: None,
            tech_stack: None,
        }
    }

    pub fn zone(width: f32, height: f32) -> Self {
        Self {
            width: Some(width),
            height: Some(height),
            ..Self::new(ElementKind::Zone)
        }
    }

    pub fn rack(total_u: u32) -> Self {
        Self {
            total_u: Some(total_u),
            ..Self::new(ElementKind::Rack)
        }
    }

    pub fn device(kind: ElementKind, u_height: u32) -> Self {
        Self {
            u_height: Some(u_height),
            ..Self::new(kind)
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// The standard entries of the component palette.
    pub fn catalog() -> Vec<PaletteItem> {
        vec![
            PaletteItem::zone(600.0, 400.0).with_label("Functional zone"),
            PaletteItem::rack(RackData::DEFAULT_TOTAL_U).with_label("Standard rack"),
            PaletteItem {
                total_u: Some(RackData::DEFAULT_TOTAL_U),
                ..PaletteItem::new(ElementKind::Placeholder)
            }
            .with_label("Placeholder rack"),
            PaletteItem::device(ElementKind::Server, 1).with_label("1U server"),
            PaletteItem::device(ElementKind::Server, 2).with_label("2U server"),
            PaletteItem::device(ElementKind::Server, 4).with_label("4U server"),
            PaletteItem::device(ElementKind::Network, 1).with_label("Core switch"),
            PaletteItem::device(ElementKind::Firewall, 2).with_label("Hardware firewall"),
            PaletteItem::device(ElementKind::Storage, 4).with_label("4U SAN storage"),
            PaletteItem {
                cpu: Some(4),
                memory: Some(8),
                ..PaletteItem::device(ElementKind::VirtualMachine, 1)
            }
            .with_label("Virtual machine"),
            PaletteItem::new(ElementKind::Software).with_label("Service"),
        ]
    }

    fn label_or_kind(&self) -> String {
        self.label
            .clone()
            .unwrap_or_else(|| self.kind.to_string())
    }

    /// Attributes of the element this item creates.
    pub fn to_data(&self) -> ElementData {
        let label = self.label_or_kind();
        match self.kind {
            ElementKind::Zone => ElementData::Zone(ZoneData {
                label,
                ..Default::default()
            }),
            ElementKind::Rack | ElementKind::Placeholder => {
                let rack = RackData::new(label, self.total_u.unwrap_or(RackData::DEFAULT_TOTAL_U));
                if self.kind == ElementKind::Rack {
                    ElementData::Rack(rack)
                } else {
                    ElementData::Placeholder(rack)
                }
            }
            ElementKind::Software => ElementData::Software(SoftwareData {
                label,
                version: self.version.clone(),
                port: self.port,
                tech_stack: self.tech_stack.clone(),
                ..Default::default()
            }),
            kind => ElementData::device(
                kind,
                DeviceData {
                    cpu: self.cpu,
                    memory: self.memory,
                    ..DeviceData::new(label, self.u_height.unwrap_or(1).max(1))
                },
            ),
        }
    }

    /// Size of the element this item creates.
    pub fn size(&self, config: &EngineConfig) -> CanvasSize {
        match self.kind {
            ElementKind::Zone => CanvasSize::new(
                self.width.unwrap_or(config.zone.width),
                self.height.unwrap_or(config.zone.height),
            ),
            ElementKind::Rack | ElementKind::Placeholder => CanvasSize(
                config
                    .rack
                    .rack_size(self.total_u.unwrap_or(RackData::DEFAULT_TOTAL_U)),
            ),
            ElementKind::Software => CanvasSize(config.software.size()),
            _ => CanvasSize(config.rack.device_size(self.u_height.unwrap_or(1).max(1))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zone_without_size_uses_defaults() {
        let config = EngineConfig::default();
        let item = PaletteItem::new(ElementKind::Zone);
        assert_eq!(item.size(&config), CanvasSize::new(400.0, 300.0));
        assert_eq!(item.to_data().label(), "zone");
    }

    #[test]
    fn test_device_item_carries_attributes() {
        let config = EngineConfig::default();
        let item = PaletteItem {
            cpu: Some(16),
            ..PaletteItem::device(ElementKind::VirtualMachine, 2)
        };
        let data = item.to_data();
        assert_eq!(data.kind(), ElementKind::VirtualMachine);
        assert_eq!(data.u_height(), Some(2));
        assert_eq!(data.device_data().and_then(|d| d.cpu), Some(16));
        assert_eq!(item.size(&config), CanvasSize::new(360.0, 60.0));
    }

    #[test]
    fn test_catalog_covers_every_kind() {
        use strum::IntoEnumIterator;
        let catalog = PaletteItem::catalog();
        for kind in ElementKind::iter() {
            assert!(catalog.iter().any(|item| item.kind == kind), "{kind} missing");
        }
    }
}
