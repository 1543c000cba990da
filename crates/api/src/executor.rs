//! Command and query execution against a Canvas.
//!
//! Connects the serializable Command/Query types to the canvas, executing
//! operations and returning results. A failed command leaves the canvas as
//! it was; a batch stops at the first command that does not succeed.

use crate::{
    Command, CommandResult, ElementInfo, ElementQuery, Query, QueryResult, SlotInfo, Target,
};
use canvas::{Canvas, CanvasError, ConnectionPatch, DropOutcome, MenuAction};
use dcim_core::Bounds;
use generator::{materialize, AnalysisSnapshot, BatchClock, MaterializeError};
use glam::Vec2;
use interchange::{Document, InterchangeError};
use node::{CanvasPoint, CanvasSize, Element, ElementId, ScreenPoint};
use std::sync::Mutex;

/// Issues batch numbers for generated ids across every canvas in the process.
static BATCH_CLOCK: Mutex<BatchClock> = Mutex::new(BatchClock::new());

#[derive(Debug, thiserror::Error)]
enum ExecuteError {
    #[error(transparent)]
    Canvas(#[from] CanvasError),

    #[error(transparent)]
    Materialize(#[from] MaterializeError),

    #[error(transparent)]
    Interchange(#[from] InterchangeError),

    #[error("Element {0} not found")]
    UnknownElement(ElementId),

    #[error("Command {index} ({kind}) failed: {message}")]
    Batch {
        index: usize,
        kind: String,
        message: String,
    },
}

/// Execute a command against a canvas.
pub fn execute_command(canvas: &mut Canvas, command: Command) -> CommandResult {
    match execute_command_inner(canvas, command) {
        Ok(result) => result,
        Err(err) => {
            log::warn!("Command failed: {err}");
            CommandResult::error(err.to_string())
        }
    }
}

fn execute_command_inner(
    canvas: &mut Canvas,
    command: Command,
) -> Result<CommandResult, ExecuteError> {
    let result = match command {
        Command::Place { item, position } => {
            let id = canvas.place_from_palette(&item, CanvasPoint(position))?;
            CommandResult::created(vec![id])
        }

        Command::DragStart { id } => {
            canvas.drag_start(&id)?;
            CommandResult::success()
        }

        Command::DragMove { id, position } => {
            canvas.drag_move(&id, CanvasPoint(position))?;
            CommandResult::success()
        }

        Command::DragEnd { id, position } => match canvas.drag_end(&id, CanvasPoint(position))? {
            DropOutcome::Reverted(reason) => CommandResult::Reverted { id, reason },
            _ => CommandResult::modified(vec![id]),
        },

        Command::Click { id, additive } => {
            if additive {
                canvas.click_additive(&id)?;
            } else {
                canvas.click(&id)?;
            }
            CommandResult::success()
        }

        Command::ClearSelection => {
            canvas.clear_selection();
            CommandResult::success()
        }

        Command::ContextMenu { id, position } => {
            canvas.open_context_menu(&id, ScreenPoint(position))?;
            CommandResult::success()
        }

        Command::MenuAction { action } => {
            let menu = canvas.context_menu().ok_or(CanvasError::NoContextMenu)?;
            let element = menu.element.clone();
            let affected = canvas.menu_action(action)?;
            match action {
                MenuAction::Edit => CommandResult::success(),
                MenuAction::Duplicate => CommandResult::created(affected),
                MenuAction::Delete => {
                    log::debug!("Deleted {element} from its context menu");
                    CommandResult::deleted(affected)
                }
            }
        }

        Command::Duplicate { target } => {
            let ids = resolve_existing(canvas, &target)?;
            let mut created = Vec::with_capacity(ids.len());
            for id in ids {
                created.push(canvas.duplicate(&id)?);
            }
            CommandResult::created(created)
        }

        Command::Delete { target } => {
            let ids = resolve_existing(canvas, &target)?;
            let mut deleted = Vec::new();
            for id in ids {
                // Already removed with an ancestor earlier in the list.
                if !canvas.graph().contains(&id) {
                    continue;
                }
                deleted.extend(canvas.delete(&id)?);
            }
            CommandResult::deleted(deleted)
        }

        Command::UpdateData { id, data } => {
            canvas.update_data(&id, data)?;
            CommandResult::modified(vec![id])
        }

        Command::ResizeZone { id, size } => {
            canvas.resize_zone(&id, CanvasSize(size))?;
            CommandResult::modified(vec![id])
        }

        Command::Connect {
            source,
            target,
            medium,
        } => {
            let connection = canvas.connect(&source, &target)?;
            if medium.is_some() {
                canvas.update_connection(
                    &connection,
                    ConnectionPatch {
                        medium,
                        ..Default::default()
                    },
                )?;
            }
            CommandResult::modified(vec![source, target])
        }

        Command::UpdateConnection { id, patch } => {
            canvas.update_connection(&id, patch)?;
            CommandResult::success()
        }

        Command::RemoveConnection { id } => {
            canvas.remove_connection(&id)?;
            CommandResult::success()
        }

        Command::HighlightKind { kind } => {
            canvas.highlight_kind(kind);
            CommandResult::success()
        }

        Command::SetVisibility { kind, visible } => {
            let changed = match kind {
                Some(kind) => canvas.set_category_visible(kind, visible),
                None => canvas.set_all_visible(visible),
            };
            CommandResult::modified(changed)
        }

        Command::ApplyLayout { mode, layout } => {
            let batch = next_batch();
            let generated = materialize(&layout, mode, canvas.graph(), canvas.config(), batch)?;
            let created = canvas.apply_batch(generated)?;
            log::debug!("Applied {mode} layout batch {batch}: {} elements", created.len());
            CommandResult::created(created)
        }

        Command::ImportDocument { document } => {
            let document = Document::from_json(&document.to_string())?;
            let previous: Vec<ElementId> = canvas.graph().iter().map(|e| e.id.clone()).collect();
            canvas.load_document(document)?;
            let created = canvas.graph().iter().map(|e| e.id.clone()).collect();
            CommandResult::Success {
                created,
                modified: Vec::new(),
                deleted: previous,
            }
        }

        Command::Batch { commands } => {
            let mut created = Vec::new();
            let mut modified = Vec::new();
            let mut deleted = Vec::new();
            for (index, command) in commands.into_iter().enumerate() {
                let kind = command_name(&command);
                match execute_command_inner(canvas, command) {
                    Ok(CommandResult::Success {
                        created: c,
                        modified: m,
                        deleted: d,
                    }) => {
                        created.extend(c);
                        modified.extend(m);
                        deleted.extend(d);
                    }
                    Ok(other) => return Ok(other),
                    Err(err) => {
                        return Err(ExecuteError::Batch {
                            index,
                            kind,
                            message: err.to_string(),
                        })
                    }
                }
            }
            CommandResult::Success {
                created,
                modified,
                deleted,
            }
        }
    };
    Ok(result)
}

/// Execute a query against a canvas.
pub fn execute_query(canvas: &Canvas, query: Query) -> QueryResult {
    let graph = canvas.graph();
    match query {
        Query::GetElements { target } => {
            let elements = match target {
                Some(target) => resolve_target(canvas, &target)
                    .iter()
                    .filter_map(|id| graph.get(id))
                    .map(|element| element_info(canvas, element))
                    .collect(),
                None => graph.iter().map(|element| element_info(canvas, element)).collect(),
            };
            QueryResult::Elements { elements }
        }

        Query::GetElement { id } => QueryResult::Element {
            element: graph.get(&id).map(|element| element_info(canvas, element)),
        },

        Query::GetChildren { id } => {
            if !graph.contains(&id) {
                return QueryResult::error(format!("Element {id} not found"));
            }
            QueryResult::Elements {
                elements: graph
                    .children(&id)
                    .into_iter()
                    .map(|element| element_info(canvas, element))
                    .collect(),
            }
        }

        Query::GetAbsolutePosition { id } => QueryResult::Position {
            position: graph.absolute_position(&id).map(|point| point.0),
        },

        Query::GetOccupancy { rack } => match canvas.occupancy(&rack) {
            Ok(occupancy) => QueryResult::Occupancy {
                slots: occupancy
                    .into_iter()
                    .map(|(id, slots)| SlotInfo::new(id, slots))
                    .collect(),
                rack,
            },
            Err(err) => QueryResult::error(err.to_string()),
        },

        Query::GetSelection => QueryResult::Selection {
            ids: canvas.selection().to_vec(),
        },

        Query::GetCount => QueryResult::Count { count: graph.len() },

        Query::GetBounds => {
            let bounds = graph.content_bounds();
            QueryResult::Bounds {
                min: bounds.map(|b| b.min),
                max: bounds.map(|b| b.max),
            }
        }

        Query::Validate => QueryResult::Violations {
            violations: canvas
                .validate()
                .iter()
                .map(|violation| violation.to_string())
                .collect(),
        },

        Query::Analysis { scope } => QueryResult::Analysis {
            snapshot: AnalysisSnapshot::capture(canvas, scope),
        },

        Query::ExportDocument => QueryResult::Document {
            document: canvas.to_document(),
        },
    }
}

fn next_batch() -> u64 {
    match BATCH_CLOCK.lock() {
        Ok(mut clock) => clock.next(),
        Err(poisoned) => poisoned.into_inner().next(),
    }
}

fn command_name(command: &Command) -> String {
    serde_json::to_value(command)
        .ok()
        .and_then(|value| value.get("type")?.as_str().map(str::to_string))
        .unwrap_or_default()
}

/// Resolve a target, failing if it names an element that does not exist.
fn resolve_existing(canvas: &Canvas, target: &Target) -> Result<Vec<ElementId>, ExecuteError> {
    let ids = resolve_target(canvas, target);
    if let Some(missing) = ids.iter().find(|id| !canvas.graph().contains(id)) {
        return Err(ExecuteError::UnknownElement(missing.clone()));
    }
    Ok(ids)
}

/// Resolve a target to element ids, in canvas order for queries.
fn resolve_target(canvas: &Canvas, target: &Target) -> Vec<ElementId> {
    match target {
        Target::Selection => canvas.selection().to_vec(),
        Target::Element(id) => vec![id.clone()],
        Target::Elements(ids) => ids.clone(),
        Target::All => canvas.graph().iter().map(|e| e.id.clone()).collect(),
        Target::Query(query) => resolve_query(canvas, query),
    }
}

fn resolve_query(canvas: &Canvas, query: &ElementQuery) -> Vec<ElementId> {
    let graph = canvas.graph();
    match query {
        ElementQuery::ByKind(kind) => graph
            .iter()
            .filter(|e| e.kind() == *kind)
            .map(|e| e.id.clone())
            .collect(),
        ElementQuery::InBounds {
            x,
            y,
            width,
            height,
        } => {
            let area = Bounds::from_origin_size(Vec2::new(*x, *y), Vec2::new(*width, *height));
            graph
                .iter()
                .filter(|e| graph.absolute_bounds_of(e).intersects(&area))
                .map(|e| e.id.clone())
                .collect()
        }
        ElementQuery::ChildrenOf(target) => {
            let parent_ids = resolve_target(canvas, target);
            graph
                .iter()
                .filter(|e| e.parent.as_ref().is_some_and(|p| parent_ids.contains(p)))
                .map(|e| e.id.clone())
                .collect()
        }
    }
}

/// Convert an Element to ElementInfo for query results.
fn element_info(canvas: &Canvas, element: &Element) -> ElementInfo {
    let graph = canvas.graph();
    let slots = element.parent.as_ref().and_then(|parent| {
        canvas
            .occupancy(parent)
            .ok()?
            .into_iter()
            .find(|(id, _)| *id == element.id)
            .map(|(_, slots)| slots)
    });
    ElementInfo {
        id: element.id.clone(),
        kind: element.kind(),
        label: element.label().to_string(),
        parent: element.parent.clone(),
        position: element.position.0,
        absolute: graph.absolute_position_of(element).0,
        size: element.size.0,
        z_index: element.layer.z_index(),
        hidden: element.hidden,
        slots,
        data: element.data.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use node::{ElementKind, PaletteItem};

    fn canvas_with_rack() -> (Canvas, ElementId) {
        let mut canvas = Canvas::default();
        let result = execute_command(
            &mut canvas,
            Command::Place {
                item: PaletteItem::rack(42),
                position: Vec2::new(200.0, 675.0),
            },
        );
        let CommandResult::Success { created, .. } = result else {
            panic!("Expected success, got {result:?}");
        };
        (canvas, created[0].clone())
    }

    #[test]
    fn place_reports_created_id() {
        let (canvas, rack) = canvas_with_rack();
        let position = execute_query(&canvas, Query::GetAbsolutePosition { id: rack });
        match position {
            QueryResult::Position { position } => assert_eq!(position, Some(Vec2::ZERO)),
            other => panic!("Expected position, got {other:?}"),
        }
    }

    #[test]
    fn set_visibility_reports_changed_ids() {
        let (mut canvas, rack) = canvas_with_rack();
        let result = execute_command(
            &mut canvas,
            Command::SetVisibility {
                kind: Some(ElementKind::Server),
                visible: false,
            },
        );
        assert_eq!(result, CommandResult::modified(vec![]));

        let result = execute_command(
            &mut canvas,
            Command::SetVisibility {
                kind: Some(ElementKind::Placeholder),
                visible: false,
            },
        );
        assert_eq!(result, CommandResult::modified(vec![rack.clone()]));

        let result = execute_command(
            &mut canvas,
            Command::SetVisibility {
                kind: None,
                visible: true,
            },
        );
        assert_eq!(result, CommandResult::modified(vec![rack]));
    }

    #[test]
    fn delete_of_missing_element_is_an_error() {
        let (mut canvas, _) = canvas_with_rack();
        let result = execute_command(
            &mut canvas,
            Command::Delete {
                target: Target::Element(ElementId::from("ghost")),
            },
        );
        assert!(result.is_error());
        assert_eq!(canvas.graph().len(), 1);
    }

    #[test]
    fn delete_of_parent_and_child_skips_cascaded_ids() {
        let (mut canvas, rack) = canvas_with_rack();
        let device = canvas
            .place_from_palette(
                &PaletteItem::device(ElementKind::Server, 1),
                CanvasPoint::new(1000.0, 1000.0),
            )
            .unwrap();
        canvas.drag_start(&device).unwrap();
        canvas.drag_end(&device, CanvasPoint::new(20.0, 100.0)).unwrap();

        let result = execute_command(
            &mut canvas,
            Command::Delete {
                target: Target::Elements(vec![rack.clone(), device.clone()]),
            },
        );
        assert_eq!(result, CommandResult::deleted(vec![rack, device]));
        assert!(canvas.graph().is_empty());
    }

    #[test]
    fn query_by_kind_and_children() {
        let (mut canvas, rack) = canvas_with_rack();
        let device = canvas
            .place_from_palette(
                &PaletteItem::device(ElementKind::Network, 1),
                CanvasPoint::new(1000.0, 1000.0),
            )
            .unwrap();
        canvas.drag_start(&device).unwrap();
        canvas.drag_end(&device, CanvasPoint::new(20.0, 100.0)).unwrap();

        let by_kind = resolve_target(
            &canvas,
            &Target::Query(ElementQuery::ByKind(ElementKind::Network)),
        );
        assert_eq!(by_kind, vec![device.clone()]);

        let children = resolve_target(
            &canvas,
            &Target::Query(ElementQuery::ChildrenOf(Box::new(Target::Element(rack)))),
        );
        assert_eq!(children, vec![device.clone()]);

        let in_bounds = resolve_target(
            &canvas,
            &Target::Query(ElementQuery::InBounds {
                x: 500.0,
                y: 0.0,
                width: 100.0,
                height: 100.0,
            }),
        );
        assert!(in_bounds.is_empty());

        match execute_query(&canvas, Query::GetElement { id: device }) {
            QueryResult::Element {
                element: Some(info),
            } => {
                // Slot area starts 70px down; a 1U device at y=100 sits one unit below it.
                assert_eq!(info.slots.map(|s| s.start), Some(40));
                assert_eq!(info.absolute, Vec2::new(20.0, 100.0));
            }
            other => panic!("Expected element, got {other:?}"),
        }
    }

    #[test]
    fn batch_stops_at_first_error() {
        let (mut canvas, rack) = canvas_with_rack();
        let result = execute_command(
            &mut canvas,
            Command::Batch {
                commands: vec![
                    Command::Click {
                        id: rack.clone(),
                        additive: false,
                    },
                    Command::Click {
                        id: ElementId::from("ghost"),
                        additive: false,
                    },
                    Command::ClearSelection,
                ],
            },
        );
        match result {
            CommandResult::Error { message } => assert!(message.contains("Command 1 (click)")),
            other => panic!("Expected error, got {other:?}"),
        }
        assert_eq!(canvas.selection(), std::slice::from_ref(&rack));
    }

    #[test]
    fn validate_query_is_empty_on_consistent_canvas() {
        let (canvas, _) = canvas_with_rack();
        match execute_query(&canvas, Query::Validate) {
            QueryResult::Violations { violations } => assert!(violations.is_empty()),
            other => panic!("Expected violations, got {other:?}"),
        }
    }
}
