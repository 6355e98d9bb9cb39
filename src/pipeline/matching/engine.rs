//! Identity resolution cascade.
//!
//! Resolves OCR-extracted identity signals to a patient record through an
//! ordered sequence of tiers, each short-circuiting on a sufficiently
//! confident result:
//!
//! 1. exact national-ID (local directory, then remote)
//! 2. exact normalized name
//! 3. token overlap short-circuit
//! 4. weighted fuzzy scoring over directory + remote candidates
//! 5. surname keyword overrides for recurring known cases
//! 6. lenient auto-promotion of fuzzy candidates present in the directory
//!
//! The directory is an explicitly passed snapshot; the engine performs no
//! ambient lookups. Remote calls are timeout-guarded and best-effort.

use std::collections::HashMap;
use std::time::Duration;

use chrono::NaiveDate;
use uuid::Uuid;

use super::normalize::{digits_only, is_institutional_text, normalize_name};
use super::remote::RemotePatientSearch;
use super::similarity::{composite_score, SignalBonuses};
use super::{MatchCandidate, PatientMatchResult};
use crate::models::{MatchLevel, PatientDirectory, PatientRecord};
use crate::pipeline::extraction::ExtractedText;

/// Exact local national-ID hit.
const CONF_EXACT_ID: f32 = 0.99;
/// National-ID hit via the remote search.
const CONF_REMOTE_ID: f32 = 0.98;
/// Normalized names equal.
const CONF_EXACT_NAME: f32 = 0.97;
/// Any shared name token. Cheaper than full fuzzy scoring and right far more
/// often than not on clinic paperwork, so it short-circuits ahead of it.
const CONF_TOKEN_OVERLAP: f32 = 0.80;
/// Surname keyword override tier.
const CONF_KEYWORD: f32 = 0.50;

/// Composite score at or above this: confident fuzzy match.
const FUZZY_HIGH: f32 = 0.40;
/// Composite score at or above this: candidate promoted when it exists in
/// the authoritative directory. Deliberately lenient — directory presence is
/// treated as corroborating evidence. Risks common-surname collisions; every
/// promotion carries `requires_confirmation`.
const FUZZY_PROMOTION: f32 = 0.15;
/// Composite score at or above this: surfaced as an unmatched hint.
const FUZZY_HINT: f32 = 0.10;

/// Minimum token length considered in the overlap tier. Shorter tokens
/// ("el", "su") collide too often in Turkish names.
const MIN_OVERLAP_TOKEN: usize = 3;

pub struct IdentityResolver {
    remote: Box<dyn RemotePatientSearch>,
    remote_timeout: Duration,
    /// Normalized surname → patient ID, for recurring cases the clinics
    /// asked to pin (tier 5).
    keyword_overrides: HashMap<String, Uuid>,
}

impl IdentityResolver {
    pub fn new(remote: Box<dyn RemotePatientSearch>, remote_timeout: Duration) -> Self {
        Self {
            remote,
            remote_timeout,
            keyword_overrides: HashMap::new(),
        }
    }

    pub fn with_keyword_overrides(mut self, overrides: HashMap<String, Uuid>) -> Self {
        self.keyword_overrides = overrides
            .into_iter()
            .map(|(k, v)| (normalize_name(&k), v))
            .collect();
        self
    }

    /// Resolve extracted identity signals against the given directory
    /// snapshot. Never fails: the worst outcome is an unmatched result.
    pub async fn resolve(
        &self,
        extracted: &ExtractedText,
        directory: &PatientDirectory,
    ) -> PatientMatchResult {
        // Tier 1: exact national ID, local first, then remote.
        if let Some(result) = self.resolve_by_national_id(extracted, directory).await {
            return result;
        }

        let names = usable_name_candidates(extracted);
        if names.is_empty() {
            tracing::debug!("No usable name candidates extracted");
            return PatientMatchResult::no_match();
        }

        // Tier 2: exact normalized name.
        for name in &names {
            if let Some(patient) = directory
                .iter()
                .find(|p| normalize_name(&p.full_name()) == *name)
            {
                tracing::debug!(patient = %patient.full_name(), "Exact name match");
                return PatientMatchResult::matched(
                    patient.clone(),
                    CONF_EXACT_NAME,
                    MatchLevel::High,
                    "exact_name",
                    false,
                );
            }
        }

        // Tier 3: token overlap short-circuit.
        if let Some(result) = resolve_by_token_overlap(&names, directory) {
            return result;
        }

        // Tier 4: fuzzy scoring over directory + remote candidates.
        let pool = self.build_candidate_pool(&names, directory).await;
        let candidates = score_candidates(&names, extracted, &pool);

        if let Some(top) = candidates.first() {
            if top.confidence >= FUZZY_HIGH {
                tracing::debug!(
                    patient = %top.patient.full_name(),
                    confidence = top.confidence,
                    "Fuzzy match above high threshold"
                );
                let mut result = PatientMatchResult::matched(
                    top.patient.clone(),
                    top.confidence,
                    MatchLevel::High,
                    "fuzzy",
                    false,
                );
                result.candidates = candidates;
                return result;
            }
        }

        // Tier 5: surname keyword overrides, once the exact/overlap/fuzzy
        // tiers have all come up empty-handed.
        if let Some(result) = self.resolve_by_keyword(&names, directory) {
            return result;
        }

        // Tier 6: lenient promotion, only for candidates the authoritative
        // directory itself knows.
        if let Some(top) = candidates.first() {
            if top.confidence >= FUZZY_PROMOTION && directory.find_by_id(&top.patient.id).is_some()
            {
                tracing::debug!(
                    patient = %top.patient.full_name(),
                    confidence = top.confidence,
                    "Fuzzy candidate promoted on directory presence"
                );
                let mut result = PatientMatchResult::matched(
                    top.patient.clone(),
                    top.confidence,
                    MatchLevel::Medium,
                    "fuzzy_promoted",
                    true,
                );
                result.candidates = candidates;
                return result;
            }
        }

        // Unmatched, but surface hint-level candidates for manual triage.
        let hints: Vec<MatchCandidate> = candidates
            .into_iter()
            .filter(|c| c.confidence >= FUZZY_HINT)
            .collect();
        if hints.is_empty() {
            return PatientMatchResult::no_match();
        }
        let top_confidence = hints[0].confidence;
        PatientMatchResult {
            matched: false,
            patient: None,
            confidence: top_confidence,
            level: MatchLevel::Low,
            candidates: hints,
            method: "fuzzy_hint".into(),
            requires_confirmation: false,
        }
    }

    async fn resolve_by_national_id(
        &self,
        extracted: &ExtractedText,
        directory: &PatientDirectory,
    ) -> Option<PatientMatchResult> {
        for candidate in &extracted.entities.national_ids {
            let digits = digits_only(&candidate.value);
            if digits.len() != 11 {
                continue;
            }

            if let Some(patient) = directory.find_by_national_id(&digits) {
                tracing::debug!(patient = %patient.full_name(), "Exact national ID match");
                return Some(PatientMatchResult::matched(
                    patient.clone(),
                    CONF_EXACT_ID,
                    MatchLevel::High,
                    "exact_national_id",
                    false,
                ));
            }

            match tokio::time::timeout(
                self.remote_timeout,
                self.remote.search_by_national_id(&digits),
            )
            .await
            {
                Ok(Ok(Some(patient))) => {
                    tracing::debug!(patient = %patient.full_name(), "Remote national ID match");
                    return Some(PatientMatchResult::matched(
                        patient,
                        CONF_REMOTE_ID,
                        MatchLevel::High,
                        "remote_national_id",
                        false,
                    ));
                }
                Ok(Ok(None)) => {}
                Ok(Err(e)) => {
                    tracing::warn!(error = %e, "Remote national ID search failed, continuing local-only");
                }
                Err(_) => {
                    tracing::warn!("Remote national ID search timed out, continuing local-only");
                }
            }
        }
        None
    }

    /// Directory snapshot plus whatever the remote name search returns
    /// within the deadline. Remote failures degrade to local-only.
    async fn build_candidate_pool(
        &self,
        names: &[String],
        directory: &PatientDirectory,
    ) -> Vec<PatientRecord> {
        let mut pool: Vec<PatientRecord> = directory.iter().cloned().collect();

        if let Some(best_name) = names.first() {
            match tokio::time::timeout(
                self.remote_timeout,
                self.remote.search_by_name(best_name),
            )
            .await
            {
                Ok(Ok(remote_patients)) => {
                    for patient in remote_patients {
                        if !pool.iter().any(|p| p.id == patient.id) {
                            pool.push(patient);
                        }
                    }
                }
                Ok(Err(e)) => {
                    tracing::warn!(error = %e, "Remote name search failed, continuing local-only");
                }
                Err(_) => {
                    tracing::warn!("Remote name search timed out, continuing local-only");
                }
            }
        }
        pool
    }

    fn resolve_by_keyword(
        &self,
        names: &[String],
        directory: &PatientDirectory,
    ) -> Option<PatientMatchResult> {
        for name in names {
            for token in name.split_whitespace() {
                if let Some(patient_id) = self.keyword_overrides.get(token) {
                    if let Some(patient) = directory.find_by_id(patient_id) {
                        tracing::debug!(
                            token,
                            patient = %patient.full_name(),
                            "Surname keyword override match"
                        );
                        return Some(PatientMatchResult::matched(
                            patient.clone(),
                            CONF_KEYWORD,
                            MatchLevel::Keyword,
                            "surname_keyword",
                            true,
                        ));
                    }
                }
            }
        }
        None
    }
}

/// Name candidates that survive institutional-text filtering, normalized,
/// ordered by extraction confidence.
fn usable_name_candidates(extracted: &ExtractedText) -> Vec<String> {
    let mut candidates: Vec<(String, f32)> = extracted
        .entities
        .names
        .iter()
        .filter(|c| !is_institutional_text(&c.value))
        .map(|c| (normalize_name(&c.value), c.confidence))
        .filter(|(name, _)| !name.is_empty())
        .collect();
    candidates.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    candidates.dedup_by(|a, b| a.0 == b.0);
    candidates.into_iter().map(|(name, _)| name).collect()
}

fn resolve_by_token_overlap(
    names: &[String],
    directory: &PatientDirectory,
) -> Option<PatientMatchResult> {
    for name in names {
        let tokens: Vec<&str> = name
            .split_whitespace()
            .filter(|t| t.len() >= MIN_OVERLAP_TOKEN)
            .collect();
        if tokens.is_empty() {
            continue;
        }
        for patient in directory.iter() {
            let patient_name = normalize_name(&patient.full_name());
            let shared = patient_name
                .split_whitespace()
                .any(|word| tokens.contains(&word));
            if shared {
                tracing::debug!(patient = %patient.full_name(), "Token overlap match");
                return Some(PatientMatchResult::matched(
                    patient.clone(),
                    CONF_TOKEN_OVERLAP,
                    MatchLevel::High,
                    "token_overlap",
                    false,
                ));
            }
        }
    }
    None
}

/// Score every pooled patient against the best-scoring extracted name,
/// sorted descending.
fn score_candidates(
    names: &[String],
    extracted: &ExtractedText,
    pool: &[PatientRecord],
) -> Vec<MatchCandidate> {
    let mut candidates: Vec<MatchCandidate> = pool
        .iter()
        .map(|patient| {
            let patient_name = normalize_name(&patient.full_name());
            let bonuses = bonuses_for(patient, extracted);
            let confidence = names
                .iter()
                .map(|name| composite_score(name, &patient_name, bonuses))
                .fold(0.0f32, f32::max);
            MatchCandidate {
                patient: patient.clone(),
                confidence,
            }
        })
        .collect();

    candidates.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    candidates
}

fn bonuses_for(patient: &PatientRecord, extracted: &ExtractedText) -> SignalBonuses {
    let national_id = patient.national_id.as_deref().is_some_and(|id| {
        extracted
            .entities
            .national_ids
            .iter()
            .any(|c| digits_only(&c.value) == id)
    });

    let birth_date = patient.birth_date.is_some_and(|birth| {
        extracted
            .entities
            .dates
            .iter()
            .filter_map(|c| parse_candidate_date(&c.value))
            .any(|d| d == birth)
    });

    let phone_suffix = patient.phone.as_deref().is_some_and(|phone| {
        let suffix = last_digits(phone, 4);
        !suffix.is_empty()
            && extracted
                .entities
                .phones
                .iter()
                .any(|c| last_digits(&c.value, 4) == suffix)
    });

    SignalBonuses {
        national_id,
        birth_date,
        phone_suffix,
    }
}

fn parse_candidate_date(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    for format in ["%d.%m.%Y", "%d/%m/%Y", "%d-%m-%Y", "%Y-%m-%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return Some(date);
        }
    }
    None
}

fn last_digits(value: &str, count: usize) -> String {
    let digits = digits_only(value);
    if digits.len() < count {
        return String::new();
    }
    digits[digits.len() - count..].to_string()
}
