//! Document type classification over OCR text.
//!
//! Ordered keyword matching on case/diacritic-folded Turkish text. More
//! specific phrases are checked first so "pil" + "reçete" lands on the
//! battery prescription category rather than the generic prescription one.
//! A richer classification capability can be injected; its verdict is
//! preferred only when it is more confident than the pattern result.

use crate::models::{DocumentClassification, DocumentKind};
use crate::pipeline::matching::fold_turkish;

/// Exact domain phrase tier.
const CONF_EXACT_PHRASE: f32 = 0.95;
/// Specific keyword combination tier.
const CONF_SPECIFIC: f32 = 0.90;
/// Generic category inference tier.
const CONF_GENERIC: f32 = 0.75;
/// Filename-only fallback tier.
const CONF_FILENAME: f32 = 0.70;
/// Nothing matched.
const CONF_NONE: f32 = 0.10;

/// Optional richer classification capability (e.g. a model-backed service).
pub trait ClassificationEnrichment: Send + Sync {
    fn classify(&self, text: &str) -> Option<DocumentClassification>;
}

/// Default capability: contributes nothing, so pattern classification is
/// authoritative and call sites never branch on presence.
pub struct NoEnrichment;

impl ClassificationEnrichment for NoEnrichment {
    fn classify(&self, _text: &str) -> Option<DocumentClassification> {
        None
    }
}

pub struct DocumentClassifier {
    enrichment: Box<dyn ClassificationEnrichment>,
}

impl Default for DocumentClassifier {
    fn default() -> Self {
        Self {
            enrichment: Box::new(NoEnrichment),
        }
    }
}

impl DocumentClassifier {
    pub fn with_enrichment(enrichment: Box<dyn ClassificationEnrichment>) -> Self {
        Self { enrichment }
    }

    /// Classify from OCR text, falling back to the filename when the body
    /// yields nothing.
    pub fn classify(&self, text: &str, filename: &str) -> DocumentClassification {
        let pattern_result = classify_by_patterns(text, filename);

        if let Some(enriched) = self.enrichment.classify(text) {
            if enriched.confidence > pattern_result.confidence {
                tracing::debug!(
                    kind = enriched.kind.as_str(),
                    confidence = enriched.confidence,
                    "Enrichment classification preferred over patterns"
                );
                return enriched;
            }
        }
        pattern_result
    }
}

fn classify_by_patterns(text: &str, filename: &str) -> DocumentClassification {
    let folded = fold_turkish(text);

    if let Some(result) = match_keywords(&folded, "keyword_pattern") {
        return result;
    }

    // Body text gave nothing — the filename often still carries the kind
    // ("pil_recetesi_mart.jpg").
    let folded_name = fold_turkish(filename);
    if let Some(mut result) = match_keywords(&folded_name, "filename_pattern") {
        result.confidence = result.confidence.min(CONF_FILENAME);
        return result;
    }

    DocumentClassification::unclassified()
}

/// Ordered rules, most specific first. First hit wins.
fn match_keywords(folded: &str, method: &str) -> Option<DocumentClassification> {
    let rules: &[(DocumentKind, &[&str], f32)] = &[
        // Exact domain phrases
        (
            DocumentKind::BatteryPrescription,
            &["pil recetesi", "pil receteleri"],
            CONF_EXACT_PHRASE,
        ),
        (
            DocumentKind::DevicePrescription,
            &["isitme cihazi recetesi", "cihaz recetesi"],
            CONF_EXACT_PHRASE,
        ),
        // Specific keyword combinations
        (DocumentKind::BatteryPrescription, &["pil+recete"], CONF_SPECIFIC),
        (DocumentKind::DevicePrescription, &["cihaz+recete"], CONF_SPECIFIC),
        (
            DocumentKind::Audiogram,
            &["odyogram", "odyometri", "isitme testi", "saf ses ortalamasi"],
            CONF_SPECIFIC,
        ),
        (
            DocumentKind::EligibilityCertificate,
            &["mustahaklik", "provizyon", "hak sahipligi"],
            CONF_SPECIFIC - 0.02,
        ),
        (
            DocumentKind::ExamReport,
            &["muayene raporu", "uzman raporu", "saglik kurulu raporu"],
            CONF_SPECIFIC,
        ),
        // Generic category inference
        (DocumentKind::Prescription, &["recete"], CONF_GENERIC + 0.05),
        (DocumentKind::ExamReport, &["muayene", "rapor"], CONF_GENERIC),
    ];

    for (kind, patterns, confidence) in rules {
        for pattern in *patterns {
            let hit = match pattern.split_once('+') {
                // "a+b": both keywords anywhere in the text
                Some((a, b)) => folded.contains(a) && folded.contains(b),
                None => folded.contains(pattern),
            };
            if hit {
                return Some(DocumentClassification {
                    kind: *kind,
                    confidence: *confidence,
                    method: method.to_string(),
                });
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(text: &str) -> DocumentClassification {
        DocumentClassifier::default().classify(text, "scan.jpg")
    }

    #[test]
    fn battery_tokens_beat_generic_prescription() {
        let result = classify("İşitme cihazı için pil reçete edilmiştir");
        assert_eq!(result.kind, DocumentKind::BatteryPrescription);
        assert!(result.confidence >= 0.85);
    }

    #[test]
    fn exact_battery_phrase_scores_highest() {
        let result = classify("SGK Pil Reçetesi");
        assert_eq!(result.kind, DocumentKind::BatteryPrescription);
        assert!((result.confidence - 0.95).abs() < 0.01);
    }

    #[test]
    fn plain_prescription_is_generic_tier() {
        let result = classify("Reçete no: 12345 ilaç listesi");
        assert_eq!(result.kind, DocumentKind::Prescription);
        assert!(result.confidence >= 0.7 && result.confidence <= 0.8);
    }

    #[test]
    fn audiogram_recognized_case_insensitively() {
        let result = classify("ODYOMETRİ SONUÇLARI");
        assert_eq!(result.kind, DocumentKind::Audiogram);
    }

    #[test]
    fn device_prescription_outranks_prescription() {
        let result = classify("işitme cihazı reçetesi düzenlendi");
        assert_eq!(result.kind, DocumentKind::DevicePrescription);
        assert!(result.confidence >= 0.9);
    }

    #[test]
    fn no_keywords_yields_other_low_confidence() {
        let result = classify("tamamen alakasız bir metin parçası");
        assert_eq!(result.kind, DocumentKind::Other);
        assert!((result.confidence - 0.1).abs() < 0.01);
        assert_eq!(result.method, "no_match");
    }

    #[test]
    fn filename_fallback_when_text_empty() {
        let result = DocumentClassifier::default().classify("", "pil_recetesi_mart.jpg");
        assert_eq!(result.kind, DocumentKind::BatteryPrescription);
        assert!(result.confidence <= 0.7);
        assert_eq!(result.method, "filename_pattern");
    }

    struct ConfidentEnrichment;
    impl ClassificationEnrichment for ConfidentEnrichment {
        fn classify(&self, _text: &str) -> Option<DocumentClassification> {
            Some(DocumentClassification {
                kind: DocumentKind::Audiogram,
                confidence: 0.99,
                method: "enrichment".into(),
            })
        }
    }

    struct TimidEnrichment;
    impl ClassificationEnrichment for TimidEnrichment {
        fn classify(&self, _text: &str) -> Option<DocumentClassification> {
            Some(DocumentClassification {
                kind: DocumentKind::ExamReport,
                confidence: 0.3,
                method: "enrichment".into(),
            })
        }
    }

    #[test]
    fn enrichment_preferred_only_when_more_confident() {
        let confident = DocumentClassifier::with_enrichment(Box::new(ConfidentEnrichment));
        let result = confident.classify("pil reçetesi", "scan.jpg");
        assert_eq!(result.kind, DocumentKind::Audiogram);

        let timid = DocumentClassifier::with_enrichment(Box::new(TimidEnrichment));
        let result = timid.classify("pil reçetesi", "scan.jpg");
        assert_eq!(result.kind, DocumentKind::BatteryPrescription);
    }
}
