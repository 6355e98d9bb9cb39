//! Entity candidate extraction from OCR text.
//!
//! Pulls person-name, national-ID, date and phone candidates out of the raw
//! text so the identity resolution cascade has structured signals to work
//! with. Everything here is best-effort: a wrong candidate costs a fuzzy
//! comparison downstream, a missed one costs a match tier.

use regex::Regex;

use super::types::{EntityCandidate, ExtractedEntities};
use crate::pipeline::matching::is_institutional_text;

/// Labeled national ID ("T.C. Kimlik No: ...") — strongest signal.
const CONF_ID_LABELED: f32 = 0.98;
/// Bare 11-digit token passing the checksum.
const CONF_ID_CHECKSUM: f32 = 0.95;
/// Bare 11-digit token failing the checksum (OCR may have bent a digit).
const CONF_ID_PATTERN: f32 = 0.70;
/// Name following an explicit label ("Hasta Adı: ...").
const CONF_NAME_LABELED: f32 = 0.90;
/// Capitalized-words line heuristic.
const CONF_NAME_HEURISTIC: f32 = 0.60;
const CONF_DATE: f32 = 0.80;
const CONF_PHONE: f32 = 0.70;

/// Extract all entity candidates from OCR text.
pub fn extract_entities(text: &str) -> ExtractedEntities {
    ExtractedEntities {
        names: extract_name_candidates(text),
        national_ids: extract_national_ids(text),
        dates: extract_dates(text),
        phones: extract_phones(text),
    }
}

/// Validate the TC Kimlik checksum digits.
///
/// d10 = ((d1+d3+d5+d7+d9)·7 − (d2+d4+d6+d8)) mod 10,
/// d11 = (d1+…+d10) mod 10. First digit must be non-zero.
pub fn is_valid_national_id(digits: &str) -> bool {
    if digits.len() != 11 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }
    let d: Vec<u32> = digits.chars().filter_map(|c| c.to_digit(10)).collect();
    if d[0] == 0 {
        return false;
    }
    let odd: u32 = d[0] + d[2] + d[4] + d[6] + d[8];
    let even: u32 = d[1] + d[3] + d[5] + d[7];
    let d10 = (odd * 7 + 10 * even - even) % 10;
    let d11 = d.iter().take(10).sum::<u32>() % 10;
    d[9] == d10 && d[10] == d11
}

fn extract_national_ids(text: &str) -> Vec<EntityCandidate> {
    let labeled =
        Regex::new(r"(?i)(?:t\.?\s*c\.?|kimlik)\s*(?:no|numaras[ıi])?\s*[:.]?\s*([1-9][0-9]{10})")
            .unwrap();
    let bare = Regex::new(r"\b([1-9][0-9]{10})\b").unwrap();

    let mut candidates: Vec<EntityCandidate> = Vec::new();
    for cap in labeled.captures_iter(text) {
        push_unique(&mut candidates, &cap[1], CONF_ID_LABELED);
    }
    for cap in bare.captures_iter(text) {
        let digits = &cap[1];
        let confidence = if is_valid_national_id(digits) {
            CONF_ID_CHECKSUM
        } else {
            CONF_ID_PATTERN
        };
        push_unique(&mut candidates, digits, confidence);
    }
    candidates
}

fn extract_name_candidates(text: &str) -> Vec<EntityCandidate> {
    let labeled = Regex::new(
        r"(?i)(?:hasta\s*ad[ıi](?:\s*soyad[ıi])?|ad[ıi]\s*soyad[ıi]|ad[ıi]|soyad[ıi])\s*[:=]\s*([^\n:]{3,48})",
    )
    .unwrap();

    let mut candidates: Vec<EntityCandidate> = Vec::new();
    for cap in labeled.captures_iter(text) {
        let value = cap[1].trim().trim_end_matches(['.', ',']).trim();
        if !value.is_empty() && !is_institutional_text(value) {
            push_unique(&mut candidates, value, CONF_NAME_LABELED);
        }
    }

    // Heuristic: short lines of capitalized words, no digits.
    for line in text.lines() {
        let line = line.trim();
        if looks_like_person_name(line) && !is_institutional_text(line) {
            push_unique(&mut candidates, line, CONF_NAME_HEURISTIC);
        }
    }
    candidates
}

/// 2-4 words, each starting uppercase with alphabetic remainder, no digits.
fn looks_like_person_name(line: &str) -> bool {
    let words: Vec<&str> = line.split_whitespace().collect();
    if !(2..=4).contains(&words.len()) {
        return false;
    }
    if line.len() > 48 {
        return false;
    }
    words.iter().all(|word| {
        let mut chars = word.chars();
        match chars.next() {
            Some(first) if first.is_uppercase() => chars.all(|c| c.is_alphabetic()),
            _ => false,
        }
    })
}

fn extract_dates(text: &str) -> Vec<EntityCandidate> {
    let dotted = Regex::new(r"\b(\d{1,2}[./-]\d{1,2}[./-]\d{4})\b").unwrap();
    let iso = Regex::new(r"\b(\d{4}-\d{2}-\d{2})\b").unwrap();

    let mut candidates = Vec::new();
    for cap in dotted.captures_iter(text) {
        push_unique(&mut candidates, &cap[1], CONF_DATE);
    }
    for cap in iso.captures_iter(text) {
        push_unique(&mut candidates, &cap[1], CONF_DATE);
    }
    candidates
}

fn extract_phones(text: &str) -> Vec<EntityCandidate> {
    // Turkish mobile format: optional leading zero, 5xx then 7 digits.
    let phone = Regex::new(r"\b(0?5\d{2}[\s.-]?\d{3}[\s.-]?\d{2}[\s.-]?\d{2})\b").unwrap();
    let mut candidates = Vec::new();
    for cap in phone.captures_iter(text) {
        push_unique(&mut candidates, &cap[1], CONF_PHONE);
    }
    candidates
}

fn push_unique(candidates: &mut Vec<EntityCandidate>, value: &str, confidence: f32) {
    if candidates.iter().any(|c| c.value == value) {
        return;
    }
    candidates.push(EntityCandidate {
        value: value.to_string(),
        confidence,
    });
}
