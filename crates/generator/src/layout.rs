//! Abstract layout descriptions.
//!
//! These are the shapes an external collaborator returns when asked to plan a
//! room. They carry no coordinates: [`crate::materialize`] turns them into
//! positioned elements.

use schemars::schema::RootSchema;
use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Which description the collaborator is asked for.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LayoutMode {
    /// Racks holding devices at declared U positions.
    #[default]
    Rack,
    /// Logical nodes in a row, joined by labeled links.
    Business,
}

/// A layout returned by the collaborator.
///
/// Rack mode fills `racks`; business mode fills `nodes` and `edges`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LayoutDescription {
    /// Zone that groups everything generated in one batch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_zone: Option<ContainerZone>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub racks: Vec<RackLayout>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<FlowNode>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub edges: Vec<FlowEdge>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContainerZone {
    #[serde(default)]
    pub label: Option<String>,
    /// Requested width in pixels. The zone still grows to fit its children.
    #[serde(default)]
    pub width: Option<f32>,
    #[serde(default)]
    pub height: Option<f32>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RackLayout {
    pub label: String,
    /// Capacity in rack units, typically 42, 48 or 24.
    #[serde(default = "default_total_u")]
    pub total_u: u32,
    #[serde(default)]
    pub devices: Vec<DeviceLayout>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeviceLayout {
    pub label: String,
    /// Lowest occupied unit, counted from the bottom of the rack starting at 1.
    #[serde(default = "default_one")]
    pub position_u: u32,
    #[serde(default = "default_one")]
    pub u_height: u32,
    /// One of `server`, `network`, `storage`, `firewall`, `virtual_machine`.
    #[serde(default, rename = "type", alias = "kind")]
    pub kind: Option<String>,
    /// One of `active`, `maintenance`, `offline`, `malfunction`.
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FlowNode {
    /// Reference used by edges. Not kept on the generated element.
    pub id: String,
    pub label: String,
    #[serde(default, rename = "type", alias = "kind")]
    pub kind: Option<String>,
    #[serde(default)]
    pub u_height: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FlowEdge {
    pub source: String,
    pub target: String,
    /// Link medium, such as `10GbE`.
    #[serde(default)]
    pub label: Option<String>,
}

fn default_total_u() -> u32 {
    node::RackData::DEFAULT_TOTAL_U
}

fn default_one() -> u32 {
    1
}

/// JSON schema of the description expected in `mode`.
pub fn layout_schema(mode: LayoutMode) -> RootSchema {
    let mut root = schema_for!(LayoutDescription);
    let (fields, definitions): (&[&str], &[&str]) = match mode {
        LayoutMode::Rack => (&["nodes", "edges"], &["FlowNode", "FlowEdge"]),
        LayoutMode::Business => (&["racks"], &["RackLayout", "DeviceLayout"]),
    };
    if let Some(object) = root.schema.object.as_mut() {
        for field in fields {
            object.properties.remove(*field);
        }
    }
    for definition in definitions {
        root.definitions.remove(*definition);
    }
    root
}

/// Instructions sent to the collaborator for a layout request.
pub fn layout_prompt(request: &str, mode: LayoutMode) -> String {
    let rules = match mode {
        LayoutMode::Rack => {
            "Plan physical racks and the devices mounted in them.\n\
             - `positionU` counts from the bottom of the rack; 1 is the lowest unit.\n\
             - A device occupies `positionU` up to `positionU + uHeight - 1`.\n\
             - Devices in one rack must not share units."
        }
        LayoutMode::Business => {
            "Plan a logical flow of nodes joined by labeled links.\n\
             - Every edge references node ids.\n\
             - Size `containerZone` for the number of nodes."
        }
    };
    let schema = serde_json::to_string_pretty(&layout_schema(mode)).unwrap_or_default();
    format!(
        "Request: \"{request}\"\n\n{rules}\n\nReturn one JSON object matching this schema, \
         without markdown fences:\n{schema}\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_rack_description_with_type_key() {
        let json = r#"{
            "containerZone": { "label": "Hall", "width": 1200, "height": 800 },
            "racks": [{
                "label": "R1",
                "totalU": 42,
                "devices": [
                    { "label": "Web 01", "uHeight": 2, "type": "server", "status": "active", "positionU": 1 },
                    { "label": "Core", "type": "network", "positionU": 42 }
                ]
            }]
        }"#;
        let description: LayoutDescription = serde_json::from_str(json).unwrap();
        let rack = &description.racks[0];
        assert_eq!(rack.total_u, 42);
        assert_eq!(rack.devices[0].kind.as_deref(), Some("server"));
        assert_eq!(rack.devices[1].u_height, 1);
        assert!(description.nodes.is_empty());
    }

    #[test]
    fn test_schema_only_lists_fields_of_the_mode() {
        let rack = serde_json::to_value(layout_schema(LayoutMode::Rack)).unwrap();
        let properties = rack["properties"].as_object().unwrap();
        assert!(properties.contains_key("racks"));
        assert!(properties.contains_key("containerZone"));
        assert!(!properties.contains_key("nodes"));

        let business = serde_json::to_value(layout_schema(LayoutMode::Business)).unwrap();
        let properties = business["properties"].as_object().unwrap();
        assert!(properties.contains_key("edges"));
        assert!(!properties.contains_key("racks"));
    }

    #[test]
    fn test_mode_parses_from_cli_strings() {
        assert_eq!("business".parse::<LayoutMode>().unwrap(), LayoutMode::Business);
        assert!(layout_prompt("two racks", LayoutMode::Rack).contains("positionU"));
    }
}
