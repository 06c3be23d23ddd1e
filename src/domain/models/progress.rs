use serde::{Deserialize, Serialize};

/// The six ingestion phases plus supporting services (spec.md §2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Scan,
    Structure,
    ChunkedParse,
    SymbolResolution,
    CommunityDetection,
    ProcessDetection,
}

impl Phase {
    /// Share of total run time this phase is budgeted (spec.md §2 table),
    /// used to translate a phase-local `0..100` percent into the overall
    /// run's monotonic percent.
    pub fn share(&self) -> f64 {
        match self {
            Phase::Scan => 0.05,
            Phase::Structure => 0.05,
            Phase::ChunkedParse => 0.35,
            Phase::SymbolResolution => 0.20,
            Phase::CommunityDetection => 0.15,
            Phase::ProcessDetection => 0.15,
        }
    }

    /// Cumulative share of all phases strictly before this one.
    pub fn offset(&self) -> f64 {
        let phases = [
            Phase::Scan,
            Phase::Structure,
            Phase::ChunkedParse,
            Phase::SymbolResolution,
            Phase::CommunityDetection,
            Phase::ProcessDetection,
        ];
        phases
            .iter()
            .take_while(|p| *p != self)
            .map(|p| p.share())
            .sum()
    }
}

/// A single progress update (spec.md §6 "Produced" / §2 "progress
/// channel"). `percent` is monotonic within a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub phase: Phase,
    pub percent: f64,
    pub message: String,
    pub detail: Option<String>,
}

impl ProgressEvent {
    pub fn new(phase: Phase, local_percent: f64, message: impl Into<String>) -> Self {
        let local_percent = local_percent.clamp(0.0, 100.0);
        let overall = (phase.offset() * 100.0) + (local_percent * phase.share());
        Self {
            phase,
            percent: overall.clamp(0.0, 100.0),
            message: message.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}
