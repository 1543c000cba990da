//! Batch layout generation.
//!
//! An external advisor describes a room abstractly ([`LayoutDescription`]);
//! [`materialize`] places it on the canvas as one atomic [`canvas::Batch`].
//! The advisor also reviews an [`AnalysisSnapshot`] of rack utilization.

mod advisor;
mod analysis;
mod clock;
mod layout;
mod materialize;

pub use advisor::{
    parse_analysis_response, parse_layout_response, AdvisorError, AdvisorSession, AdvisorTicket,
    LayoutAdvisor, ReplayAdvisor, SessionMode,
};
pub use analysis::{AnalysisReport, AnalysisScope, AnalysisSnapshot, DeviceSummary, RackSummary};
pub use clock::BatchClock;
pub use layout::{
    layout_prompt, layout_schema, ContainerZone, DeviceLayout, FlowEdge, FlowNode,
    LayoutDescription, LayoutMode, RackLayout,
};
pub use materialize::{materialize, MaterializeError};
