pub mod engine;
pub mod normalize;
pub mod remote;
pub mod similarity;

pub use engine::*;
pub use normalize::*;
pub use remote::{HttpPatientSearch, NoRemoteSearch, RemotePatientSearch};
pub use similarity::*;

use thiserror::Error;

use crate::models::{MatchLevel, MatchSummary, PatientRecord};

#[derive(Error, Debug)]
pub enum MatchError {
    #[error("Remote patient search failed: {0}")]
    Remote(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// One scored directory candidate.
#[derive(Debug, Clone)]
pub struct MatchCandidate {
    pub patient: PatientRecord,
    pub confidence: f32,
}

/// Full identity-resolution outcome for a pipeline run.
///
/// Invariants: `matched == true` implies `patient.is_some()`;
/// `candidates` is sorted descending by confidence.
#[derive(Debug, Clone)]
pub struct PatientMatchResult {
    pub matched: bool,
    pub patient: Option<PatientRecord>,
    pub confidence: f32,
    pub level: MatchLevel,
    pub candidates: Vec<MatchCandidate>,
    /// Provenance tag: which cascade tier produced this result.
    pub method: String,
    pub requires_confirmation: bool,
}

impl PatientMatchResult {
    pub fn no_match() -> Self {
        Self {
            matched: false,
            patient: None,
            confidence: 0.0,
            level: MatchLevel::None,
            candidates: vec![],
            method: "none".into(),
            requires_confirmation: false,
        }
    }

    pub(crate) fn matched(
        patient: PatientRecord,
        confidence: f32,
        level: MatchLevel,
        method: &str,
        requires_confirmation: bool,
    ) -> Self {
        Self {
            matched: true,
            patient: Some(patient),
            confidence,
            level,
            candidates: vec![],
            method: method.into(),
            requires_confirmation,
        }
    }

    /// Flatten into the persisted form.
    pub fn summary(&self) -> MatchSummary {
        MatchSummary {
            matched: self.matched,
            patient_id: self.patient.as_ref().map(|p| p.id),
            patient_name: self.patient.as_ref().map(|p| p.full_name()),
            confidence: self.confidence,
            level: self.level,
            method: self.method.clone(),
            requires_confirmation: self.requires_confirmation,
        }
    }
}
