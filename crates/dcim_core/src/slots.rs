//! Rack-unit discretization.
//!
//! A rack's slot area is a column of `total_u` cells of `px_per_u` pixels,
//! starting below the header and the top rail. Slots are numbered from the
//! bottom: slot 0 is the lowest unit. Pixel positions stored on devices are
//! measured from the top of the rack, so every conversion flips the axis.

use crate::config::RackMetrics;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A contiguous run of rack units, numbered from the bottom of the rack.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "StoredSlotRange")]
pub struct SlotRange {
    /// Lowest occupied unit (0 = bottom of the rack).
    pub start: u32,
    /// Number of units occupied. Always at least 1.
    pub height: u32,
}

impl SlotRange {
    pub fn new(start: u32, height: u32) -> Self {
        Self {
            start,
            height: height.max(1),
        }
    }

    /// Highest occupied unit, inclusive.
    pub fn end(&self) -> u32 {
        self.start.saturating_add(self.height.saturating_sub(1))
    }

    /// True if the two ranges share at least one unit.
    pub fn overlaps(&self, other: &SlotRange) -> bool {
        self.start <= other.end() && self.end() >= other.start
    }

    pub fn contains(&self, slot: u32) -> bool {
        slot >= self.start && slot <= self.end()
    }

    /// Label shown next to the preview band, e.g. `U5–U6`.
    pub fn label(&self) -> String {
        format!("U{}\u{2013}U{}", self.start, self.end())
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SlotRangeError {
    #[error("Slot range must span at least one unit")]
    Empty,
    #[error("Slot range starting at U{start} with {height} units runs past the last unit")]
    Overflow { start: u32, height: u32 },
}

#[derive(Deserialize)]
struct StoredSlotRange {
    start: u32,
    height: u32,
}

impl TryFrom<StoredSlotRange> for SlotRange {
    type Error = SlotRangeError;

    fn try_from(stored: StoredSlotRange) -> Result<Self, Self::Error> {
        let StoredSlotRange { start, height } = stored;
        if height == 0 {
            return Err(SlotRangeError::Empty);
        }
        if start.checked_add(height).is_none() {
            return Err(SlotRangeError::Overflow { start, height });
        }
        Ok(Self { start, height })
    }
}

impl fmt::Display for SlotRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Slot geometry of one rack.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SlotGrid {
    metrics: RackMetrics,
    total_u: u32,
}

impl SlotGrid {
    pub fn new(metrics: RackMetrics, total_u: u32) -> Self {
        Self { metrics, total_u }
    }

    pub fn total_u(&self) -> u32 {
        self.total_u
    }

    /// Whether a device of `u_height` units fits in the rack at all.
    pub fn fits(&self, u_height: u32) -> bool {
        u_height >= 1 && u_height <= self.total_u
    }

    /// Highest bottom slot a device of `u_height` units can start at.
    pub fn max_slot(&self, u_height: u32) -> u32 {
        self.total_u.saturating_sub(u_height)
    }

    /// Bottom slot for a device whose top edge sits `offset_y` pixels below
    /// the top of the rack.
    ///
    /// The device's vertical center is measured against the slot area, then
    /// half the device is subtracted to land on its bottom edge. Rounding that
    /// edge to the nearest unit snaps the device; the result is clamped so the
    /// whole device stays inside the rack.
    pub fn slot_from_offset(&self, offset_y: f32, u_height: u32) -> u32 {
        let px = self.metrics.px_per_u;
        let device_px = self.metrics.device_height(u_height);
        let center = offset_y + device_px / 2.0;
        let center_in_area = center - self.metrics.slot_area_top();
        let usable = self.metrics.slot_area_height(self.total_u);

        let units_below_center = (usable - center_in_area) / px;
        let bottom_edge = units_below_center - u_height as f32 / 2.0;

        let max = self.max_slot(u_height) as f32;
        bottom_edge.round().clamp(0.0, max) as u32
    }

    /// Bottom slot for a device at absolute `device_y` inside a rack at
    /// absolute `rack_y`.
    pub fn slot_at(&self, rack_y: f32, device_y: f32, u_height: u32) -> u32 {
        self.slot_from_offset(device_y - rack_y, u_height)
    }

    /// Occupied range for a device at absolute `device_y`.
    pub fn range_at(&self, rack_y: f32, device_y: f32, u_height: u32) -> SlotRange {
        SlotRange::new(self.slot_at(rack_y, device_y, u_height), u_height)
    }

    /// Occupied range of a device stored at rack-relative `offset_y`.
    pub fn range_from_offset(&self, offset_y: f32, u_height: u32) -> SlotRange {
        SlotRange::new(self.slot_from_offset(offset_y, u_height), u_height)
    }

    /// Rack-relative top offset of a device starting at bottom slot `slot`.
    pub fn offset_for_slot(&self, slot: u32, u_height: u32) -> f32 {
        let index_from_top = self.max_slot(u_height).saturating_sub(slot);
        index_from_top as f32 * self.metrics.px_per_u + self.metrics.slot_area_top()
    }

    /// Convert a declared 1-based position into a bottom slot, clamping it
    /// into `[1, total_u - u_height + 1]` first.
    pub fn slot_from_position_u(&self, position_u: u32, u_height: u32) -> u32 {
        let highest = self.max_slot(u_height) + 1;
        position_u.clamp(1, highest.max(1)) - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(total_u: u32) -> SlotGrid {
        SlotGrid::new(RackMetrics::default(), total_u)
    }

    #[test]
    fn test_slot_range_rejects_empty_payload() {
        let range: SlotRange = serde_json::from_str(r#"{ "start": 5, "height": 2 }"#).unwrap();
        assert_eq!(range, SlotRange::new(5, 2));
        assert_eq!(range.end(), 6);

        let err = serde_json::from_str::<SlotRange>(r#"{ "start": 5, "height": 0 }"#).unwrap_err();
        assert!(err.to_string().contains("at least one unit"));

        let overflow = format!(r#"{{ "start": {}, "height": 2 }}"#, u32::MAX);
        assert!(serde_json::from_str::<SlotRange>(&overflow).is_err());
    }

    #[test]
    fn test_slot_round_trip() {
        let grid = grid(42);
        let y = grid.offset_for_slot(10, 2);
        assert_eq!(grid.slot_from_offset(y, 2), 10);

        for u_height in 1..=4 {
            for slot in 0..=grid.max_slot(u_height) {
                let y = grid.offset_for_slot(slot, u_height);
                assert_eq!(grid.slot_from_offset(y, u_height), slot);
            }
        }
    }

    #[test]
    fn test_offset_for_slot_is_top_down() {
        let grid = grid(42);
        // The top slot of a 1U device sits right under the header and rail.
        assert_eq!(grid.offset_for_slot(41, 1), 70.0);
        // The bottom slot ends on the bottom rail.
        assert_eq!(grid.offset_for_slot(0, 1), 70.0 + 41.0 * 30.0);
    }

    #[test]
    fn test_snaps_to_nearest_unit() {
        let grid = grid(42);
        let exact = grid.offset_for_slot(5, 2);
        assert_eq!(grid.slot_from_offset(exact + 14.0, 2), 5);
        assert_eq!(grid.slot_from_offset(exact - 14.0, 2), 5);
        assert_eq!(grid.slot_from_offset(exact + 16.0, 2), 4);
        assert_eq!(grid.slot_from_offset(exact - 16.0, 2), 6);
    }

    #[test]
    fn test_clamps_into_rack() {
        let grid = grid(42);
        assert_eq!(grid.slot_from_offset(-500.0, 2), 40);
        assert_eq!(grid.slot_from_offset(10_000.0, 2), 0);
        assert_eq!(grid.range_from_offset(-500.0, 2).end(), 41);
    }

    #[test]
    fn test_range_at_uses_absolute_positions() {
        let grid = grid(42);
        let rack_y = 200.0;
        let device_y = rack_y + grid.offset_for_slot(5, 2);
        let range = grid.range_at(rack_y, device_y, 2);
        assert_eq!(range, SlotRange::new(5, 2));
        assert_eq!(range.end(), 6);
    }

    #[test]
    fn test_slot_range_overlap() {
        let a = SlotRange::new(5, 2);
        assert!(a.overlaps(&SlotRange::new(6, 1)));
        assert!(a.overlaps(&SlotRange::new(4, 2)));
        assert!(!a.overlaps(&SlotRange::new(7, 3)));
        assert!(!a.overlaps(&SlotRange::new(3, 2)));
        assert_eq!(a.label(), "U5\u{2013}U6");
    }

    #[test]
    fn test_declared_position_clamped() {
        let grid = grid(42);
        assert_eq!(grid.slot_from_position_u(1, 2), 0);
        assert_eq!(grid.slot_from_position_u(0, 2), 0);
        assert_eq!(grid.slot_from_position_u(41, 2), 40);
        assert_eq!(grid.slot_from_position_u(42, 2), 40);
        assert_eq!(grid.slot_from_position_u(99, 1), 41);
    }

    #[test]
    fn test_fits() {
        let grid = grid(4);
        assert!(grid.fits(4));
        assert!(!grid.fits(5));
        assert!(!grid.fits(0));
    }
}
