//! End-to-end placement scenarios, driven through serialized commands.

use api::{execute_command, execute_query, Command, CommandResult, Query, QueryResult, SlotInfo};
use canvas::{Canvas, RevertReason};
use dcim_core::{RackMetrics, SlotGrid, SlotRange};
use glam::Vec2;
use interchange::Document;
use node::{ElementId, ElementKind};
use serde_json::{json, Value};

fn run(canvas: &mut Canvas, command: Value) -> CommandResult {
    let command: Command = serde_json::from_value(command).unwrap();
    execute_command(canvas, command)
}

fn query(canvas: &Canvas, query: Value) -> QueryResult {
    let query: Query = serde_json::from_value(query).unwrap();
    execute_query(canvas, query)
}

fn drop_at(canvas: &mut Canvas, id: &str, x: f32, y: f32) -> CommandResult {
    let started = run(canvas, json!({ "type": "drag_start", "id": id }));
    assert!(!started.is_error(), "{started:?}");
    run(canvas, json!({ "type": "drag_move", "id": id, "position": [x, y] }));
    run(canvas, json!({ "type": "drag_end", "id": id, "position": [x, y] }))
}

fn occupancy(canvas: &Canvas, rack: &str) -> Vec<SlotInfo> {
    match query(canvas, json!({ "type": "get_occupancy", "rack": rack })) {
        QueryResult::Occupancy { slots, .. } => slots,
        other => panic!("Expected occupancy, got {other:?}"),
    }
}

fn parent_of(canvas: &Canvas, id: &str) -> Option<ElementId> {
    canvas.graph().get(&ElementId::from(id)).unwrap().parent.clone()
}

fn violations(canvas: &Canvas) -> Vec<String> {
    match query(canvas, json!({ "type": "validate" })) {
        QueryResult::Violations { violations } => violations,
        other => panic!("Expected violations, got {other:?}"),
    }
}

fn grid() -> SlotGrid {
    SlotGrid::new(RackMetrics::default(), 42)
}

/// A 42U rack at the canvas origin and three loose devices to its right.
fn loose_rack() -> Canvas {
    let mut canvas = Canvas::default();
    let result = run(
        &mut canvas,
        json!({
            "type": "import_document",
            "document": [
                { "id": "r1", "kind": "rack", "label": "R1", "totalU": 42,
                  "position": [0, 0], "size": [400, 1350] },
                { "id": "d1", "kind": "server", "label": "D1", "uHeight": 2,
                  "position": [600, 0], "size": [360, 60] },
                { "id": "d2", "kind": "server", "label": "D2", "uHeight": 1,
                  "position": [600, 200], "size": [360, 30] },
                { "id": "d3", "kind": "storage", "label": "D3", "uHeight": 4,
                  "position": [600, 400], "size": [360, 120] }
            ]
        }),
    );
    assert!(!result.is_error(), "{result:?}");
    canvas
}

/// Zone > rack > devices, listed children first, with one connection.
fn nested_document() -> Value {
    json!({
        "version": "1",
        "elements": [
            { "id": "d1", "parent": "r1", "kind": "server", "label": "Web 01", "uHeight": 2,
              "status": "active", "position": [20, 1120], "size": [360, 60] },
            { "id": "r1", "parent": "z1", "kind": "rack", "label": "R1", "totalU": 42,
              "position": [50, 60], "size": [400, 1350] },
            { "id": "z1", "kind": "zone", "label": "Hall A",
              "position": [50, 50], "size": [1200, 1500] },
            { "id": "d2", "parent": "r1", "kind": "network", "label": "Core", "uHeight": 1,
              "position": [20, 1300], "size": [360, 30] },
            { "id": "d3", "kind": "server", "label": "Spare", "uHeight": 1,
              "position": [1400, 50], "size": [360, 30] }
        ],
        "connections": [
            { "id": "e1", "source": "d1", "target": "d2", "sourcePort": "eth0",
              "targetPort": "Gi1/0/1", "medium": "10GbE", "color": "#3b82f6" }
        ]
    })
}

fn nested_canvas() -> Canvas {
    let mut canvas = Canvas::default();
    let result = run(
        &mut canvas,
        json!({ "type": "import_document", "document": nested_document() }),
    );
    assert!(!result.is_error(), "{result:?}");
    canvas
}

#[test]
fn device_dropped_on_rack_snaps_to_slot() {
    let mut canvas = loose_rack();
    // Top edge of a 2U device whose lowest unit is slot 5; its center is
    // one unit below that.
    let y = grid().offset_for_slot(5, 2);
    assert_eq!(y, 1120.0);

    let result = drop_at(&mut canvas, "d1", 20.0, y);
    assert_eq!(result, CommandResult::modified(vec![ElementId::from("d1")]));
    assert_eq!(parent_of(&canvas, "d1"), Some(ElementId::from("r1")));

    let slots = occupancy(&canvas, "r1");
    assert_eq!(slots.len(), 1);
    assert_eq!((slots[0].start, slots[0].end), (5, 6));
    assert_eq!(slots[0].label, "U5–U6");
}

#[test]
fn drop_onto_occupied_slot_reverts() {
    let mut canvas = loose_rack();
    drop_at(&mut canvas, "d1", 20.0, grid().offset_for_slot(5, 2));
    let before = canvas.graph().get(&ElementId::from("d2")).unwrap().clone();

    let result = drop_at(&mut canvas, "d2", 20.0, grid().offset_for_slot(6, 1));
    assert_eq!(
        result,
        CommandResult::Reverted {
            id: ElementId::from("d2"),
            reason: RevertReason::SlotCollision {
                rack: ElementId::from("r1"),
                slots: SlotRange::new(6, 1),
                occupant: ElementId::from("d1"),
            },
        }
    );

    // Exact pre-drag position, parent and size.
    let after = canvas.graph().get(&ElementId::from("d2")).unwrap();
    assert_eq!(after.position, before.position);
    assert_eq!(after.parent, before.parent);
    assert_eq!(after.size, before.size);
    assert!(!after.annotations.is_drop_target);
    assert_eq!(occupancy(&canvas, "r1").len(), 1);
}

#[test]
fn import_reproduces_elements_and_connections() {
    let canvas = nested_canvas();
    let expected = Document::from_json(&nested_document().to_string()).unwrap();

    let QueryResult::Document { document } = query(&canvas, json!({ "type": "export_document" }))
    else {
        panic!("Expected document");
    };
    assert_eq!(document.elements, expected.elements);
    assert_eq!(document.connections, expected.connections);

    // Exported text loads back into an identical canvas.
    let mut reloaded = Canvas::default();
    let result = run(
        &mut reloaded,
        json!({ "type": "import_document", "document": serde_json::to_value(&document).unwrap() }),
    );
    assert!(!result.is_error(), "{result:?}");
    assert_eq!(reloaded.to_document(), document);
}

#[test]
fn rejected_import_leaves_canvas_untouched() {
    let mut canvas = nested_canvas();
    let before = canvas.to_document();

    let result = run(
        &mut canvas,
        json!({ "type": "import_document", "document": { "racks": [] } }),
    );
    assert!(result.is_error());

    // Parses, but parents a device to another device.
    let result = run(
        &mut canvas,
        json!({
            "type": "import_document",
            "document": [
                { "id": "z9", "kind": "zone", "label": "Z", "position": [0, 0], "size": [500, 500] },
                { "id": "d9", "parent": "z9", "kind": "server", "label": "S", "uHeight": 1,
                  "position": [10, 10], "size": [360, 30] },
                { "id": "d8", "parent": "d9", "kind": "server", "label": "S", "uHeight": 1,
                  "position": [10, 10], "size": [360, 30] }
            ]
        }),
    );
    assert!(result.is_error());
    assert_eq!(canvas.to_document(), before);
}

#[test]
fn rack_layout_batch_builds_one_zone() {
    let mut canvas = Canvas::default();
    let result = run(
        &mut canvas,
        json!({
            "type": "apply_layout",
            "mode": "rack",
            "layout": {
                "containerZone": { "label": "Hall B", "width": 1200, "height": 800 },
                "racks": [
                    { "label": "R1", "totalU": 42, "devices": [
                        { "label": "web", "type": "server", "positionU": 1, "uHeight": 2 },
                        { "label": "db", "type": "storage", "positionU": 3, "uHeight": 2 },
                        { "label": "sw", "type": "network", "positionU": 42, "uHeight": 2 }
                    ]},
                    { "label": "R2", "totalU": 42, "devices": [
                        { "label": "fw", "type": "firewall", "positionU": 1 },
                        { "label": "san", "type": "storage", "positionU": 10, "uHeight": 4 },
                        { "label": "vm", "type": "virtual_machine", "positionU": 20 }
                    ]}
                ]
            }
        }),
    );
    let CommandResult::Success { created, .. } = result else {
        panic!("Expected success, got {result:?}");
    };
    assert_eq!(created.len(), 9);

    let graph = canvas.graph();
    let zones: Vec<_> = graph.iter().filter(|e| e.kind() == ElementKind::Zone).collect();
    assert_eq!(zones.len(), 1);
    let zone = zones[0];
    assert!(zone.parent.is_none());
    assert_eq!(zone.label(), "Hall B");

    let racks: Vec<_> = graph.children(&zone.id);
    assert_eq!(racks.len(), 2);
    let zone_bounds = graph.absolute_bounds_of(zone);
    for rack in &racks {
        assert_eq!(rack.kind(), ElementKind::Rack);
        assert!(zone_bounds.contains_bounds(&graph.absolute_bounds_of(rack)));
        assert_eq!(graph.children(&rack.id).len(), 3);
    }
    // Racks sit one gap apart from the zone padding.
    assert_eq!(racks[0].position.0, Vec2::new(50.0, 60.0));
    assert_eq!(racks[1].position.0, Vec2::new(500.0, 60.0));
    // Tall enough for the racks plus bottom padding.
    assert_eq!(zone.size.0, Vec2::new(1200.0, 1460.0));

    let r1: Vec<_> = occupancy(&canvas, racks[0].id.as_str())
        .into_iter()
        .map(|slot| (slot.start, slot.height))
        .collect();
    // positionU 42 with a 2U device is clamped down to unit 41.
    assert_eq!(r1, vec![(0, 2), (2, 2), (40, 2)]);
    let r2: Vec<_> = occupancy(&canvas, racks[1].id.as_str())
        .into_iter()
        .map(|slot| (slot.start, slot.height))
        .collect();
    assert_eq!(r2, vec![(0, 1), (9, 4), (19, 1)]);
    assert!(violations(&canvas).is_empty());
}

#[test]
fn second_batch_lands_right_of_existing_content() {
    let mut canvas = nested_canvas();
    let result = run(
        &mut canvas,
        json!({
            "type": "apply_layout",
            "mode": "business",
            "layout": {
                "nodes": [
                    { "id": "lb", "label": "Load balancer", "type": "network" },
                    { "id": "app", "label": "App", "type": "software" }
                ],
                "edges": [
                    { "source": "lb", "target": "app", "label": "HTTPS" },
                    { "source": "lb", "target": "ghost" }
                ]
            }
        }),
    );
    let CommandResult::Success { created, .. } = result else {
        panic!("Expected success, got {result:?}");
    };
    let zone = canvas.graph().get(&created[0]).unwrap();
    assert_eq!(zone.kind(), ElementKind::Zone);
    // Loose device d3 ends at 1400 + 360.
    assert_eq!(zone.position.0, Vec2::new(1860.0, 50.0));
    // The edge to an unknown node is dropped.
    assert_eq!(canvas.connections().len(), 2);
}

#[test]
fn absolute_position_sums_the_parent_chain() {
    let canvas = nested_canvas();
    let position = |id: &str| match query(&canvas, json!({ "type": "get_absolute_position", "id": id })) {
        QueryResult::Position { position } => position,
        other => panic!("Expected position, got {other:?}"),
    };
    assert_eq!(position("z1"), Some(Vec2::new(50.0, 50.0)));
    assert_eq!(position("r1"), Some(Vec2::new(100.0, 110.0)));
    assert_eq!(position("d1"), Some(Vec2::new(120.0, 1230.0)));
    assert_eq!(position("missing"), None);
}

#[test]
fn slot_round_trip_is_exact() {
    let grid = grid();
    let y = grid.offset_for_slot(10, 2);
    assert_eq!(grid.slot_from_offset(y, 2), 10);

    let mut canvas = loose_rack();
    drop_at(&mut canvas, "d1", 20.0, y);
    assert_eq!(occupancy(&canvas, "r1")[0].start, 10);

    // Dropping the mounted device where it already is keeps its slot.
    let result = drop_at(&mut canvas, "d1", 20.0, y);
    assert!(!result.is_error());
    assert_eq!(occupancy(&canvas, "r1")[0].start, 10);
    let d1 = canvas.graph().get(&ElementId::from("d1")).unwrap();
    assert_eq!(d1.position.0, Vec2::new(20.0, y));
}

#[test]
fn committed_slots_never_overlap() {
    let mut canvas = loose_rack();
    let grid = grid();
    let drops = [
        ("d1", 5, 2),
        ("d2", 6, 1),
        ("d3", 4, 4),
        ("d3", 7, 4),
        ("d2", 11, 1),
        ("d1", 9, 2),
        ("d1", 40, 2),
        ("d2", 41, 1),
        ("d3", 38, 4),
        ("d2", 0, 1),
    ];
    for (id, slot, u_height) in drops {
        drop_at(&mut canvas, id, 20.0, grid.offset_for_slot(slot, u_height));

        let slots = occupancy(&canvas, "r1");
        for (i, a) in slots.iter().enumerate() {
            for b in &slots[i + 1..] {
                let a_range = SlotRange::new(a.start, a.height);
                let b_range = SlotRange::new(b.start, b.height);
                assert!(
                    !a_range.overlaps(&b_range),
                    "{} {} overlaps {} {} after dropping {id}",
                    a.id,
                    a.label,
                    b.id,
                    b.label
                );
            }
        }
        assert!(violations(&canvas).is_empty());
    }
}

#[test]
fn rack_wins_over_zone_for_devices() {
    let mut canvas = nested_canvas();
    // Rack r1 starts at (100, 110) and lies inside zone z1.
    let y = 110.0 + grid().offset_for_slot(20, 1);
    let result = drop_at(&mut canvas, "d3", 120.0, y);
    assert!(!result.is_error(), "{result:?}");
    assert_eq!(parent_of(&canvas, "d3"), Some(ElementId::from("r1")));

    let slots = occupancy(&canvas, "r1");
    assert!(slots
        .iter()
        .any(|slot| slot.id == ElementId::from("d3") && slot.start == 20));
}

#[test]
fn context_menu_duplicate_and_delete() {
    let mut canvas = nested_canvas();
    run(&mut canvas, json!({ "type": "context_menu", "id": "d1", "position": [300, 200] }));
    let result = run(&mut canvas, json!({ "type": "menu_action", "action": "duplicate" }));
    let CommandResult::Success { created, .. } = result else {
        panic!("Expected success, got {result:?}");
    };
    let copy = canvas.graph().get(&created[0]).unwrap();
    assert_eq!(copy.label(), "Web 01 (Copy)");

    run(&mut canvas, json!({ "type": "context_menu", "id": "r1", "position": [300, 200] }));
    let result = run(&mut canvas, json!({ "type": "menu_action", "action": "delete" }));
    let CommandResult::Success { deleted, .. } = result else {
        panic!("Expected success, got {result:?}");
    };
    assert_eq!(deleted[0], ElementId::from("r1"));
    assert!(deleted.contains(&ElementId::from("d1")));
    assert!(canvas.connections().is_empty());
    assert!(canvas.context_menu().is_none());
    assert!(violations(&canvas).is_empty());
}
