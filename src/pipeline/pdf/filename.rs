//! Deterministic archive filenames.
//!
//! Operators triage by filename alone, so every name carries the patient,
//! the document kind, the capture timestamp and a confidence suffix:
//! `ayse_yilmaz_battery_prescription_20240312_103000_VERIFY.pdf`.

use chrono::NaiveDateTime;

use crate::models::{DocumentKind, MatchLevel, MatchSummary};
use crate::pipeline::matching::normalize_name;

/// OCR confidence below this adds the `_CHECK` suffix even on a confident
/// match — the text the match was built from is itself shaky.
const CHECK_CONFIDENCE: f32 = 0.30;

/// Build the archive filename for a processed capture.
pub fn archive_filename(
    match_summary: &MatchSummary,
    kind: DocumentKind,
    captured_at: NaiveDateTime,
    ocr_confidence: f32,
) -> String {
    let patient_part = match match_summary.patient_name.as_deref() {
        Some(name) => sanitize_component(name),
        None => "unmatched".to_string(),
    };
    let timestamp = captured_at.format("%Y%m%d_%H%M%S");
    let suffix = confidence_suffix(match_summary, ocr_confidence);

    format!(
        "{}_{}_{}{}.pdf",
        patient_part,
        kind.as_str(),
        timestamp,
        suffix
    )
}

/// Confidence-indicator suffix so triage needs no file opening.
fn confidence_suffix(match_summary: &MatchSummary, ocr_confidence: f32) -> &'static str {
    if !match_summary.matched {
        return "_UNMATCHED";
    }
    match match_summary.level {
        MatchLevel::Keyword => "_MANUAL",
        MatchLevel::Medium => "_VERIFY",
        _ if match_summary.requires_confirmation => "_VERIFY",
        _ if ocr_confidence < CHECK_CONFIDENCE => "_CHECK",
        _ => "",
    }
}

/// Fold a name into a filesystem-safe lowercase component.
fn sanitize_component(value: &str) -> String {
    let normalized = normalize_name(value);
    let cleaned: String = normalized
        .chars()
        .map(|c| if c == ' ' { '_' } else { c })
        .collect();
    if cleaned.is_empty() {
        "unknown".to_string()
    } else {
        cleaned
    }
}
