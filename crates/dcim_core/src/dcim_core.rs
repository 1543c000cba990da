//! # Core geometry and configuration for the rack layout engine
//!
//! This crate holds the pieces every other crate leans on and that carry no
//! knowledge of elements or hierarchy:
//!
//! - [`bounds::Bounds`]: axis-aligned boxes and the overlap test used for
//!   containment and collision decisions
//! - [`config::EngineConfig`]: pixel metrics of racks, devices and zones, plus
//!   the spacing constants of batch layout
//! - [`slots::SlotGrid`]: the rack-unit discretizer that maps pixel offsets
//!   inside a rack to bottom-up U-slot indices and back

pub mod bounds;
pub mod config;
pub mod slots;

pub use bounds::Bounds;
pub use config::{
    BatchLayoutConfig, ConfigError, EngineConfig, RackMetrics, SoftwareMetrics, ZoneDefaults,
};
pub use slots::{SlotGrid, SlotRange, SlotRangeError};
