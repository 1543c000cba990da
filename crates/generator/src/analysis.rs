//! Snapshot of rack utilization handed to the advisor, and the report it
//! sends back.

use canvas::Canvas;
use dcim_core::SlotRange;
use node::{DeviceStatus, ElementId, ElementKind};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use strum::Display;

/// kW drawn per rack unit, by device kind.
fn power_per_u(kind: ElementKind) -> f32 {
    match kind {
        ElementKind::Server | ElementKind::VirtualMachine => 0.4,
        ElementKind::Network | ElementKind::Firewall => 0.2,
        ElementKind::Storage => 0.5,
        _ => 0.0,
    }
}

const BTU_PER_KW: f32 = 3412.0;

/// Which elements a snapshot covers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AnalysisScope {
    #[default]
    All,
    /// The selected elements and everything inside them.
    Selection,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceSummary {
    pub id: ElementId,
    pub label: String,
    pub kind: ElementKind,
    pub u_height: u32,
    pub status: DeviceStatus,
    pub slots: SlotRange,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RackSummary {
    pub id: ElementId,
    pub name: String,
    pub capacity_u: u32,
    pub occupied_u: u32,
    pub device_count: usize,
    pub devices: Vec<DeviceSummary>,
}

impl RackSummary {
    pub fn utilization(&self) -> f32 {
        if self.capacity_u == 0 {
            return 0.0;
        }
        self.occupied_u as f32 / self.capacity_u as f32
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisSnapshot {
    pub scope: AnalysisScope,
    pub racks: Vec<RackSummary>,
    /// Rack-mountable devices not mounted in any rack.
    pub unmounted_devices: usize,
    pub power_estimate_kw: f32,
}

impl AnalysisSnapshot {
    /// Summarize the canvas. A selection scope with nothing selected covers
    /// the whole canvas.
    pub fn capture(canvas: &Canvas, scope: AnalysisScope) -> Self {
        let graph = canvas.graph();
        let scope = if canvas.selection().is_empty() {
            AnalysisScope::All
        } else {
            scope
        };
        let in_scope: Option<HashSet<&ElementId>> = match scope {
            AnalysisScope::All => None,
            AnalysisScope::Selection => {
                let mut ids = HashSet::new();
                for id in canvas.selection() {
                    ids.insert(id);
                    ids.extend(graph.descendants(id).into_iter().map(|element| &element.id));
                }
                Some(ids)
            }
        };
        let covered = |id: &ElementId| in_scope.as_ref().map_or(true, |ids| ids.contains(id));

        let mut racks = Vec::new();
        let mut unmounted_devices = 0;
        for element in graph.iter().filter(|element| covered(&element.id)) {
            let kind = element.kind();
            if kind.is_rack_mountable() {
                let mounted = element
                    .parent
                    .as_ref()
                    .and_then(|parent| graph.get(parent))
                    .is_some_and(|parent| parent.kind() == ElementKind::Rack);
                if !mounted {
                    unmounted_devices += 1;
                }
            }
            if kind != ElementKind::Rack {
                continue;
            }

            let devices: Vec<DeviceSummary> = canvas
                .occupancy(&element.id)
                .unwrap_or_default()
                .into_iter()
                .filter_map(|(id, slots)| {
                    let device = graph.get(&id)?;
                    Some(DeviceSummary {
                        label: device.label().to_string(),
                        kind: device.kind(),
                        u_height: slots.height,
                        status: device.data.status().unwrap_or_default(),
                        slots,
                        id,
                    })
                })
                .collect();
            racks.push(RackSummary {
                id: element.id.clone(),
                name: element.label().to_string(),
                capacity_u: element.total_u().unwrap_or_default(),
                occupied_u: devices.iter().map(|device| device.u_height).sum(),
                device_count: devices.len(),
                devices,
            });
        }

        let power_estimate_kw = racks
            .iter()
            .flat_map(|rack| rack.devices.iter())
            .map(|device| device.u_height as f32 * power_per_u(device.kind))
            .sum();

        Self {
            scope,
            racks,
            unmounted_devices,
            power_estimate_kw,
        }
    }

    pub fn heat_output_btu(&self) -> u32 {
        (self.power_estimate_kw * BTU_PER_KW).round() as u32
    }

    pub fn occupied_u(&self) -> u32 {
        self.racks.iter().map(|rack| rack.occupied_u).sum()
    }

    pub fn capacity_u(&self) -> u32 {
        self.racks.iter().map(|rack| rack.capacity_u).sum()
    }

    /// Instructions sent to the advisor along with this snapshot.
    pub fn prompt(&self) -> String {
        let data = serde_json::to_string_pretty(self).unwrap_or_default();
        format!(
            "Review this data center layout for rack-level redundancy, single points of \
             failure and balance of space, power and cooling.\n\nConfiguration:\n{data}\n\n\
             Return one JSON object with the fields efficiencyScore (0-100), haScore (0-100), \
             powerEstimateKW, heatOutputBTU, redundancyAnalysis, recommendations (four items: \
             physical layout, redundancy, efficiency and cooling, capacity) and summary. \
             Do not wrap it in markdown fences.\n"
        )
    }
}

/// Assessment returned by the advisor.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalysisReport {
    pub efficiency_score: u8,
    pub ha_score: u8,
    #[serde(rename = "powerEstimateKW")]
    pub power_estimate_kw: f32,
    #[serde(rename = "heatOutputBTU")]
    pub heat_output_btu: u32,
    pub redundancy_analysis: String,
    pub recommendations: Vec<String>,
    pub summary: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use canvas::Batch;
    use dcim_core::{RackMetrics, SlotGrid};
    use node::{CanvasSize, Element, LocalPoint};

    fn canvas() -> Canvas {
        let metrics = RackMetrics::default();
        let grid = SlotGrid::new(metrics, 42);
        let device = |id: &str, kind: ElementKind, u: u32, slot: u32, rack: &str| {
            Element::device(
                id,
                kind,
                id,
                u,
                LocalPoint::new(20.0, grid.offset_for_slot(slot, u)),
                &metrics,
            )
            .with_parent(rack)
        };
        let mut canvas = Canvas::default();
        canvas
            .apply_batch(Batch {
                elements: vec![
                    Element::zone(
                        "z1",
                        "Hall",
                        LocalPoint::new(0.0, 0.0),
                        CanvasSize::new(1200.0, 1500.0),
                    ),
                    Element::rack("r1", "R1", 42, LocalPoint::new(50.0, 60.0), &metrics)
                        .with_parent("z1"),
                    Element::rack("r2", "R2", 42, LocalPoint::new(500.0, 60.0), &metrics),
                    device("web", ElementKind::Server, 2, 0, "r1"),
                    device("sw", ElementKind::Network, 1, 41, "r1"),
                    device("san", ElementKind::Storage, 4, 10, "r2"),
                    Element::device(
                        "spare",
                        ElementKind::Server,
                        "spare",
                        1,
                        LocalPoint::new(2000.0, 0.0),
                        &metrics,
                    ),
                ],
                connections: Vec::new(),
            })
            .unwrap();
        canvas
    }

    #[test]
    fn test_captures_every_rack() {
        let snapshot = AnalysisSnapshot::capture(&canvas(), AnalysisScope::All);
        assert_eq!(snapshot.racks.len(), 2);
        let r1 = &snapshot.racks[0];
        assert_eq!((r1.capacity_u, r1.occupied_u, r1.device_count), (42, 3, 2));
        assert_eq!(r1.devices[0].slots, SlotRange::new(0, 2));
        assert_eq!(snapshot.unmounted_devices, 1);
        // 2U server, 1U switch, 4U storage.
        assert!((snapshot.power_estimate_kw - 3.0).abs() < 1e-4);
        assert_eq!(snapshot.heat_output_btu(), 10236);
    }

    #[test]
    fn test_selection_scope_includes_descendants() {
        let mut canvas = canvas();
        canvas.click(&ElementId::from("z1")).unwrap();
        let snapshot = AnalysisSnapshot::capture(&canvas, AnalysisScope::Selection);
        assert_eq!(snapshot.scope, AnalysisScope::Selection);
        assert_eq!(snapshot.racks.len(), 1);
        assert_eq!(snapshot.racks[0].id, ElementId::from("r1"));
        assert_eq!(snapshot.unmounted_devices, 0);

        canvas.clear_selection();
        let snapshot = AnalysisSnapshot::capture(&canvas, AnalysisScope::Selection);
        assert_eq!(snapshot.scope, AnalysisScope::All);
    }

    #[test]
    fn test_report_reads_advisor_field_names() {
        let json = r#"{
            "efficiencyScore": 72,
            "haScore": 40,
            "powerEstimateKW": 3.2,
            "heatOutputBTU": 10918,
            "recommendations": ["Spread the web tier across racks"],
            "summary": "Healthy"
        }"#;
        let report: AnalysisReport = serde_json::from_str(json).unwrap();
        assert_eq!(report.ha_score, 40);
        assert_eq!(report.heat_output_btu, 10918);
        assert!(report.redundancy_analysis.is_empty());
    }
}
