//! Name normalization for OCR-extracted identity signals.
//!
//! OCR output of Turkish documents mixes diacritics, case and digit/letter
//! confusions. Everything is folded into a plain `[a-z ]` form before any
//! comparison so that "AYŞE GÜL" and "ayse gul" (and the OCR misread
//! "ay5e gul") land on the same string. Normalization is idempotent.

/// Organizational/clinical vocabulary that disqualifies a string as a person
/// name. A document addressed to the issuing institution must never be
/// matched as a patient with that name. Checked on normalized text.
const INSTITUTIONAL_KEYWORDS: &[&str] = &[
    "sosyal guvenlik",
    "kurumu",
    "kurum",
    "hastane",
    "hastanesi",
    "saglik",
    "bakanligi",
    "mudurlugu",
    "mudurluk",
    "merkezi",
    "merkez",
    "poliklinik",
    "klinik",
    "eczane",
    "eczanesi",
    "universite",
    "universitesi",
    "fakulte",
    "fakultesi",
    "isitme cihazlari",
    "medikal",
    "limited",
    "sirketi",
    "ticaret",
    "anonim",
];

/// Fold Turkish-specific characters to their ASCII base letters.
/// Covers both cases; everything else is lowercased as-is.
pub fn fold_turkish(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            'ç' | 'Ç' => out.push('c'),
            'ğ' | 'Ğ' => out.push('g'),
            'ı' | 'I' => out.push('i'),
            'İ' => out.push('i'),
            'ö' | 'Ö' => out.push('o'),
            'ş' | 'Ş' => out.push('s'),
            'ü' | 'Ü' => out.push('u'),
            _ => out.extend(ch.to_lowercase()),
        }
    }
    out
}

/// Fold digits that OCR commonly substitutes for letters inside words.
/// Applied to name candidates only — national IDs keep their digits.
pub fn fold_ocr_homoglyphs(input: &str) -> String {
    input
        .chars()
        .map(|ch| match ch {
            '0' => 'o',
            '1' => 'i',
            '5' => 's',
            '8' => 'b',
            '6' => 'g',
            other => other,
        })
        .collect()
}

/// Canonical form used by every matching tier: lowercase, Turkish folding,
/// homoglyph folding, then strip everything outside `[a-z ]` and collapse
/// whitespace. Idempotent: `normalize_name(normalize_name(x)) ==
/// normalize_name(x)`.
pub fn normalize_name(input: &str) -> String {
    let folded = fold_ocr_homoglyphs(&fold_turkish(input));
    let mut out = String::with_capacity(folded.len());
    let mut last_was_space = true;
    for ch in folded.chars() {
        if ch.is_ascii_lowercase() {
            out.push(ch);
            last_was_space = false;
        } else if !last_was_space {
            out.push(' ');
            last_was_space = true;
        }
    }
    while out.ends_with(' ') {
        out.pop();
    }
    out
}

/// Whether the string reads as institutional/corporate text rather than a
/// person name. Institutional strings are rejected as name candidates
/// outright, in any casing.
pub fn is_institutional_text(input: &str) -> bool {
    let normalized = normalize_name(input);
    if normalized.is_empty() {
        return false;
    }
    INSTITUTIONAL_KEYWORDS
        .iter()
        .any(|kw| normalized.contains(kw))
}

/// Strip a token down to digits. Used for national-ID comparison.
pub fn digits_only(input: &str) -> String {
    input.chars().filter(|c| c.is_ascii_digit()).collect()
}
