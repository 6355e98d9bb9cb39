//! Document record persistence: idempotent upsert over three JSON buckets.
//!
//! - `documents:all` — the global list, every record regardless of state
//! - `documents:patient:<uuid>` — per-patient index
//! - `documents:quarantine` — bounded list of unmatched records, oldest
//!   evicted first, kept visible in the global list for manual assignment
//!
//! Re-uploads are deduplicated by identifier or content fingerprint
//! (filename + truncated OCR prefix + patient name): the second write
//! overwrites the first in place instead of duplicating it.

use base64::Engine;
use rusqlite::Connection;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::kv::{kv_get, kv_put};
use super::StoreError;
use crate::models::{DocumentRecord, MatchLevel, PatientRecord};

const KEY_GLOBAL: &str = "documents:all";
const KEY_QUARANTINE: &str = "documents:quarantine";

fn patient_key(patient_id: &Uuid) -> String {
    format!("documents:patient:{patient_id}")
}

/// Dedup fingerprint: filename + truncated OCR text prefix + patient name,
/// hashed so the key stays short and uniform.
pub fn fingerprint(filename: &str, ocr_text: &str, patient_name: &str, prefix_len: usize) -> String {
    let prefix: String = ocr_text.chars().take(prefix_len).collect();
    let mut hasher = Sha256::new();
    hasher.update(filename.as_bytes());
    hasher.update(b"|");
    hasher.update(prefix.as_bytes());
    hasher.update(b"|");
    hasher.update(patient_name.as_bytes());
    base64::engine::general_purpose::STANDARD.encode(hasher.finalize())
}

/// Idempotent upsert of a processed record into all applicable buckets.
/// Returns the stored record (its id is stable across re-uploads).
pub fn persist_document(
    conn: &Connection,
    mut record: DocumentRecord,
    quarantine_capacity: usize,
) -> Result<DocumentRecord, StoreError> {
    if record.filename.trim().is_empty() {
        return Err(StoreError::MissingIdentifier("filename".into()));
    }
    if record.fingerprint.trim().is_empty() {
        return Err(StoreError::MissingIdentifier("fingerprint".into()));
    }

    // Global list: replace a record sharing an id or fingerprint, keeping
    // the already-stored id stable.
    let mut global = read_bucket(conn, KEY_GLOBAL)?;
    if let Some(existing) = global
        .iter_mut()
        .find(|r| r.id == record.id || r.fingerprint == record.fingerprint)
    {
        record.id = existing.id;
        *existing = record.clone();
        tracing::debug!(id = %record.id, "Duplicate upload — record overwritten in place");
    } else {
        global.push(record.clone());
    }
    write_bucket(conn, KEY_GLOBAL, &global)?;

    match record.patient_id {
        Some(patient_id) => {
            upsert_into(conn, &patient_key(&patient_id), &record)?;
            // A re-assigned or re-uploaded record must not linger in
            // quarantine.
            remove_from(conn, KEY_QUARANTINE, &record.id)?;
        }
        None => {
            let mut quarantine = read_bucket(conn, KEY_QUARANTINE)?;
            match quarantine
                .iter_mut()
                .find(|r| r.id == record.id || r.fingerprint == record.fingerprint)
            {
                Some(existing) => *existing = record.clone(),
                None => quarantine.push(record.clone()),
            }
            // Bounded: evict oldest first.
            quarantine.sort_by_key(|r| r.uploaded_at);
            while quarantine.len() > quarantine_capacity {
                let evicted = quarantine.remove(0);
                tracing::warn!(id = %evicted.id, "Quarantine full — oldest record evicted");
            }
            write_bucket(conn, KEY_QUARANTINE, &quarantine)?;
            tracing::info!(id = %record.id, "Unmatched document quarantined");
        }
    }

    Ok(record)
}

/// Manually assign a quarantined record to a patient, in place.
pub fn assign_patient(
    conn: &Connection,
    record_id: &Uuid,
    patient: &PatientRecord,
) -> Result<DocumentRecord, StoreError> {
    let mut global = read_bucket(conn, KEY_GLOBAL)?;
    let record = global
        .iter_mut()
        .find(|r| r.id == *record_id)
        .ok_or_else(|| StoreError::RecordNotFound(record_id.to_string()))?;

    record.patient_id = Some(patient.id);
    record.match_summary.matched = true;
    record.match_summary.patient_id = Some(patient.id);
    record.match_summary.patient_name = Some(patient.full_name());
    record.match_summary.confidence = 1.0;
    record.match_summary.level = MatchLevel::High;
    record.match_summary.method = "manual_assignment".into();
    record.match_summary.requires_confirmation = false;
    let updated = record.clone();
    write_bucket(conn, KEY_GLOBAL, &global)?;

    upsert_into(conn, &patient_key(&patient.id), &updated)?;
    remove_from(conn, KEY_QUARANTINE, record_id)?;

    tracing::info!(id = %record_id, patient = %patient.full_name(), "Quarantined document assigned");
    Ok(updated)
}

pub fn global_documents(conn: &Connection) -> Result<Vec<DocumentRecord>, StoreError> {
    read_bucket(conn, KEY_GLOBAL)
}

pub fn patient_documents(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Vec<DocumentRecord>, StoreError> {
    read_bucket(conn, &patient_key(patient_id))
}

pub fn quarantined_documents(conn: &Connection) -> Result<Vec<DocumentRecord>, StoreError> {
    read_bucket(conn, KEY_QUARANTINE)
}

pub fn find_document(
    conn: &Connection,
    record_id: &Uuid,
) -> Result<Option<DocumentRecord>, StoreError> {
    Ok(read_bucket(conn, KEY_GLOBAL)?
        .into_iter()
        .find(|r| r.id == *record_id))
}

/// Replace a record wherever it already appears (global + patient or
/// quarantine bucket). Used by the workflow layer after status changes.
pub(crate) fn update_everywhere(
    conn: &Connection,
    record: &DocumentRecord,
) -> Result<(), StoreError> {
    replace_in(conn, KEY_GLOBAL, record)?;
    if let Some(patient_id) = record.patient_id {
        replace_in(conn, &patient_key(&patient_id), record)?;
    } else {
        replace_in(conn, KEY_QUARANTINE, record)?;
    }
    Ok(())
}

// ── Bucket helpers ──────────────────────────────────────────────────────────

fn read_bucket(conn: &Connection, key: &str) -> Result<Vec<DocumentRecord>, StoreError> {
    match kv_get(conn, key)? {
        Some(json) => Ok(serde_json::from_str(&json)?),
        None => Ok(vec![]),
    }
}

fn write_bucket(conn: &Connection, key: &str, records: &[DocumentRecord]) -> Result<(), StoreError> {
    kv_put(conn, key, &serde_json::to_string(records)?)
}

fn upsert_into(conn: &Connection, key: &str, record: &DocumentRecord) -> Result<(), StoreError> {
    let mut records = read_bucket(conn, key)?;
    match records
        .iter_mut()
        .find(|r| r.id == record.id || r.fingerprint == record.fingerprint)
    {
        Some(existing) => *existing = record.clone(),
        None => records.push(record.clone()),
    }
    write_bucket(conn, key, &records)
}

fn remove_from(conn: &Connection, key: &str, record_id: &Uuid) -> Result<(), StoreError> {
    let mut records = read_bucket(conn, key)?;
    let before = records.len();
    records.retain(|r| r.id != *record_id);
    if records.len() != before {
        write_bucket(conn, key, &records)?;
    }
    Ok(())
}

fn replace_in(conn: &Connection, key: &str, record: &DocumentRecord) -> Result<(), StoreError> {
    let mut records = read_bucket(conn, key)?;
    let mut changed = false;
    for slot in records.iter_mut().filter(|r| r.id == record.id) {
        *slot = record.clone();
        changed = true;
    }
    if changed {
        write_bucket(conn, key, &records)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        CompressedDocument, DocumentClassification, DocumentKind, MatchSummary, WorkflowStatus,
    };
    use crate::store::kv::open_memory_store;

    fn record(filename: &str, ocr: &str, patient: Option<&PatientRecord>) -> DocumentRecord {
        let patient_name = patient.map(|p| p.full_name()).unwrap_or_default();
        DocumentRecord {
            id: Uuid::new_v4(),
            patient_id: patient.map(|p| p.id),
            filename: filename.to_string(),
            classification: DocumentClassification {
                kind: DocumentKind::Prescription,
                confidence: 0.9,
                method: "keyword_pattern".into(),
            },
            match_summary: match patient {
                Some(p) => MatchSummary {
                    matched: true,
                    patient_id: Some(p.id),
                    patient_name: Some(p.full_name()),
                    confidence: 0.97,
                    level: MatchLevel::High,
                    method: "exact_name".into(),
                    requires_confirmation: false,
                },
                None => MatchSummary::unmatched(),
            },
            document: CompressedDocument {
                pdf_base64: "JVBERg==".into(),
                original_size: 1000,
                compressed_size: 400,
                compression_ratio: 2.5,
                quality_used: 0.9,
                emergency_compression: false,
            },
            ocr_excerpt: ocr.chars().take(120).collect(),
            fingerprint: fingerprint(filename, ocr, &patient_name, 120),
            uploaded_at: chrono::Local::now().naive_local(),
            workflow_status: WorkflowStatus::InquiryStarted,
            audit_trail: vec![],
        }
    }

    fn sample_patient() -> PatientRecord {
        PatientRecord {
            id: Uuid::new_v4(),
            first_name: "Ayşe".into(),
            last_name: "Yılmaz".into(),
            national_id: Some("10000000146".into()),
            birth_date: None,
            phone: None,
        }
    }

    #[test]
    fn fingerprint_is_deterministic_and_truncates() {
        let long_text = "x".repeat(500);
        let a = fingerprint("scan.pdf", &long_text, "Ayşe Yılmaz", 120);
        let b = fingerprint("scan.pdf", &long_text, "Ayşe Yılmaz", 120);
        assert_eq!(a, b);

        // Differences beyond the prefix do not change the fingerprint.
        let mut tail_differs = "x".repeat(120);
        tail_differs.push_str("yyyy");
        let c = fingerprint("scan.pdf", &tail_differs, "Ayşe Yılmaz", 120);
        assert_eq!(a, c);

        let d = fingerprint("other.pdf", &long_text, "Ayşe Yılmaz", 120);
        assert_ne!(a, d);
    }

    #[test]
    fn matched_record_lands_in_global_and_patient_index() {
        let conn = open_memory_store().unwrap();
        let patient = sample_patient();
        let rec = record("scan.pdf", "pil reçetesi", Some(&patient));

        let stored = persist_document(&conn, rec, 50).unwrap();
        assert_eq!(global_documents(&conn).unwrap().len(), 1);
        assert_eq!(patient_documents(&conn, &patient.id).unwrap().len(), 1);
        assert!(quarantined_documents(&conn).unwrap().is_empty());
        assert!(!stored.is_quarantined());
    }

    #[test]
    fn duplicate_fingerprint_yields_single_overwritten_record() {
        let conn = open_memory_store().unwrap();
        let patient = sample_patient();

        let first = record("scan.pdf", "pil reçetesi uzun metin", Some(&patient));
        let stored_first = persist_document(&conn, first, 50).unwrap();

        let mut second = record("scan.pdf", "pil reçetesi uzun metin", Some(&patient));
        second.classification.kind = DocumentKind::BatteryPrescription;
        let stored_second = persist_document(&conn, second, 50).unwrap();

        let global = global_documents(&conn).unwrap();
        assert_eq!(global.len(), 1);
        // Second write's fields win; id stays stable.
        assert_eq!(stored_second.id, stored_first.id);
        assert_eq!(global[0].classification.kind, DocumentKind::BatteryPrescription);
        assert_eq!(patient_documents(&conn, &patient.id).unwrap().len(), 1);
    }

    #[test]
    fn unmatched_record_quarantined_but_globally_visible() {
        let conn = open_memory_store().unwrap();
        let rec = record("unknown.pdf", "okunamayan metin", None);

        let stored = persist_document(&conn, rec, 50).unwrap();
        assert!(stored.is_quarantined());
        assert_eq!(global_documents(&conn).unwrap().len(), 1);
        assert_eq!(quarantined_documents(&conn).unwrap().len(), 1);
    }

    #[test]
    fn quarantine_capacity_evicts_oldest() {
        let conn = open_memory_store().unwrap();
        for i in 0..5 {
            let mut rec = record(&format!("doc{i}.pdf"), &format!("metin {i}"), None);
            rec.uploaded_at = chrono::NaiveDate::from_ymd_opt(2024, 1, 1 + i as u32)
                .unwrap()
                .and_hms_opt(8, 0, 0)
                .unwrap();
            persist_document(&conn, rec, 3).unwrap();
        }

        let quarantine = quarantined_documents(&conn).unwrap();
        assert_eq!(quarantine.len(), 3);
        // Oldest two evicted, newest three remain.
        assert!(quarantine.iter().all(|r| r.filename != "doc0.pdf"));
        assert!(quarantine.iter().all(|r| r.filename != "doc1.pdf"));
        // Global list keeps everything.
        assert_eq!(global_documents(&conn).unwrap().len(), 5);
    }

    #[test]
    fn manual_assignment_moves_record_without_copy() {
        let conn = open_memory_store().unwrap();
        let rec = record("unknown.pdf", "metin", None);
        let stored = persist_document(&conn, rec, 50).unwrap();

        let patient = sample_patient();
        let assigned = assign_patient(&conn, &stored.id, &patient).unwrap();

        assert_eq!(assigned.patient_id, Some(patient.id));
        assert_eq!(assigned.match_summary.method, "manual_assignment");
        assert!(quarantined_documents(&conn).unwrap().is_empty());
        assert_eq!(patient_documents(&conn, &patient.id).unwrap().len(), 1);
        // Still exactly one record globally — moved, not copied.
        let global = global_documents(&conn).unwrap();
        assert_eq!(global.len(), 1);
        assert_eq!(global[0].patient_id, Some(patient.id));
    }

    #[test]
    fn assigning_unknown_record_errors() {
        let conn = open_memory_store().unwrap();
        let result = assign_patient(&conn, &Uuid::new_v4(), &sample_patient());
        assert!(matches!(result, Err(StoreError::RecordNotFound(_))));
    }

    #[test]
    fn missing_filename_is_fatal() {
        let conn = open_memory_store().unwrap();
        let mut rec = record("x.pdf", "metin", None);
        rec.filename = "  ".into();
        assert!(matches!(
            persist_document(&conn, rec, 50),
            Err(StoreError::MissingIdentifier(_))
        ));
        // No partial write of a well-formed record.
        assert!(global_documents(&conn).unwrap().is_empty());
    }
}
