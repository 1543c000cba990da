//! The advisor seam.
//!
//! Layout generation and analysis are delegated to an external collaborator
//! behind [`LayoutAdvisor`]. [`AdvisorSession`] holds the panel state around
//! those requests. Each request is issued a ticket; starting a new request or
//! closing the panel makes older tickets stale, and completions carrying a
//! stale ticket are dropped without touching the canvas.

use crate::analysis::{AnalysisReport, AnalysisSnapshot};
use crate::clock::BatchClock;
use crate::layout::{layout_prompt, LayoutDescription, LayoutMode};
use crate::materialize::{materialize, MaterializeError};
use async_trait::async_trait;
use canvas::{Canvas, CanvasError};
use node::ElementId;
use serde::de::DeserializeOwned;

#[derive(Debug, thiserror::Error)]
pub enum AdvisorError {
    #[error("Advisor request failed: {0}")]
    Request(String),

    #[error("Malformed advisor response: {0}")]
    Malformed(String),

    #[error(transparent)]
    Materialize(#[from] MaterializeError),

    #[error("Generated layout was rejected: {0}")]
    Rejected(#[from] CanvasError),
}

/// External collaborator that plans layouts and reviews them.
///
/// Implementations return the raw response text; parsing happens in the
/// session so every advisor gets the same tolerance for formatting noise.
#[async_trait]
pub trait LayoutAdvisor: Send + Sync {
    async fn generate_layout(&self, prompt: &str, mode: LayoutMode) -> Result<String, AdvisorError>;

    async fn analyze(&self, snapshot: &AnalysisSnapshot) -> Result<String, AdvisorError>;
}

/// Parse a layout response, tolerating a fenced code block around the JSON.
pub fn parse_layout_response(text: &str) -> Result<LayoutDescription, AdvisorError> {
    parse_json(text)
}

pub fn parse_analysis_response(text: &str) -> Result<AnalysisReport, AdvisorError> {
    parse_json(text)
}

fn parse_json<T: DeserializeOwned>(text: &str) -> Result<T, AdvisorError> {
    serde_json::from_str(strip_fences(text)).map_err(|err| AdvisorError::Malformed(err.to_string()))
}

fn strip_fences(text: &str) -> &str {
    let text = text.trim();
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the info string, e.g. "json".
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// What the advisor panel is doing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SessionMode {
    #[default]
    Idle,
    Generating(LayoutMode),
    Analyzing,
}

/// Identifies one advisor request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AdvisorTicket {
    generation: u64,
}

/// Panel state around advisor requests.
#[derive(Debug, Default)]
pub struct AdvisorSession {
    mode: SessionMode,
    loading: bool,
    generation: u64,
    last_error: Option<String>,
    report: Option<AnalysisReport>,
    clock: BatchClock,
}

impl AdvisorSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn report(&self) -> Option<&AnalysisReport> {
        self.report.as_ref()
    }

    pub fn is_current(&self, ticket: AdvisorTicket) -> bool {
        ticket.generation == self.generation
    }

    pub fn begin_generate(&mut self, mode: LayoutMode) -> AdvisorTicket {
        self.begin(SessionMode::Generating(mode))
    }

    pub fn begin_analysis(&mut self) -> AdvisorTicket {
        self.begin(SessionMode::Analyzing)
    }

    fn begin(&mut self, mode: SessionMode) -> AdvisorTicket {
        self.generation += 1;
        self.mode = mode;
        self.loading = true;
        self.last_error = None;
        AdvisorTicket {
            generation: self.generation,
        }
    }

    /// Close the panel. Requests still in flight become stale.
    pub fn close(&mut self) {
        self.generation += 1;
        self.mode = SessionMode::Idle;
        self.loading = false;
    }

    /// Finish a layout request: parse, materialize and insert the result.
    ///
    /// Returns `Ok(None)` when the ticket is stale, and the inserted ids
    /// otherwise.
    pub fn complete_generate(
        &mut self,
        ticket: AdvisorTicket,
        response: Result<String, AdvisorError>,
        canvas: &mut Canvas,
    ) -> Result<Option<Vec<ElementId>>, AdvisorError> {
        if !self.is_current(ticket) {
            log::warn!("Ignoring stale layout response");
            return Ok(None);
        }
        let SessionMode::Generating(mode) = self.mode else {
            log::warn!("Ignoring layout response while {:?}", self.mode);
            return Ok(None);
        };
        self.loading = false;

        let batch = self.clock.next();
        let result = response
            .and_then(|text| parse_layout_response(&text))
            .and_then(|description| {
                Ok(materialize(
                    &description,
                    mode,
                    canvas.graph(),
                    canvas.config(),
                    batch,
                )?)
            })
            .and_then(|batch| Ok(canvas.apply_batch(batch)?));

        match result {
            Ok(ids) => {
                log::info!("Inserted {} generated elements", ids.len());
                self.mode = SessionMode::Idle;
                Ok(Some(ids))
            }
            Err(err) => {
                log::warn!("Layout generation failed: {}", err);
                self.last_error = Some(err.to_string());
                Err(err)
            }
        }
    }

    /// Finish an analysis request and keep the report.
    pub fn complete_analysis(
        &mut self,
        ticket: AdvisorTicket,
        response: Result<String, AdvisorError>,
    ) -> Result<Option<&AnalysisReport>, AdvisorError> {
        if !self.is_current(ticket) || self.mode != SessionMode::Analyzing {
            log::warn!("Ignoring stale analysis response");
            return Ok(None);
        }
        self.loading = false;
        match response.and_then(|text| parse_analysis_response(&text)) {
            Ok(report) => {
                self.report = Some(report);
                Ok(self.report.as_ref())
            }
            Err(err) => {
                log::warn!("Analysis failed: {}", err);
                self.last_error = Some(err.to_string());
                Err(err)
            }
        }
    }

    /// Ask `advisor` for a layout and insert it.
    pub async fn generate(
        &mut self,
        advisor: &dyn LayoutAdvisor,
        canvas: &mut Canvas,
        request: &str,
        mode: LayoutMode,
    ) -> Result<Option<Vec<ElementId>>, AdvisorError> {
        let ticket = self.begin_generate(mode);
        let prompt = layout_prompt(request, mode);
        let response = advisor.generate_layout(&prompt, mode).await;
        self.complete_generate(ticket, response, canvas)
    }

    /// Ask `advisor` to review `snapshot`.
    pub async fn analyze(
        &mut self,
        advisor: &dyn LayoutAdvisor,
        snapshot: &AnalysisSnapshot,
    ) -> Result<Option<&AnalysisReport>, AdvisorError> {
        let ticket = self.begin_analysis();
        let response = advisor.analyze(snapshot).await;
        self.complete_analysis(ticket, response)
    }
}

/// Advisor that answers with canned responses.
#[derive(Clone, Debug, Default)]
pub struct ReplayAdvisor {
    layout: Option<String>,
    report: Option<String>,
}

impl ReplayAdvisor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_layout(mut self, response: impl Into<String>) -> Self {
        self.layout = Some(response.into());
        self
    }

    pub fn with_report(mut self, response: impl Into<String>) -> Self {
        self.report = Some(response.into());
        self
    }
}

#[async_trait]
impl LayoutAdvisor for ReplayAdvisor {
    async fn generate_layout(&self, _prompt: &str, mode: LayoutMode) -> Result<String, AdvisorError> {
        self.layout
            .clone()
            .ok_or_else(|| AdvisorError::Request(format!("no recorded {mode} layout")))
    }

    async fn analyze(&self, _snapshot: &AnalysisSnapshot) -> Result<String, AdvisorError> {
        self.report
            .clone()
            .ok_or_else(|| AdvisorError::Request("no recorded analysis".to_string()))
    }
}
