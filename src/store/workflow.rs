//! Post-capture workflow status machine.
//!
//! A second state machine layered on persisted records, decoupled from
//! pipeline execution: `inquiry_started → prescription_saved →
//! materials_delivered → documents_uploaded → invoiced → payment_received`.
//! Forward-only; every transition appends an audit entry; nothing is
//! reachable from `payment_received`.

use rusqlite::Connection;
use uuid::Uuid;

use super::documents::{find_document, update_everywhere};
use super::StoreError;
use crate::models::{DocumentRecord, WorkflowAuditEntry, WorkflowStatus};

/// Advance a record's workflow status, appending an audit entry.
pub fn advance_workflow(
    conn: &Connection,
    record_id: &Uuid,
    next: WorkflowStatus,
    note: Option<String>,
) -> Result<DocumentRecord, StoreError> {
    let mut record = find_document(conn, record_id)?
        .ok_or_else(|| StoreError::RecordNotFound(record_id.to_string()))?;

    if !record.workflow_status.can_advance_to(&next) {
        return Err(StoreError::InvalidTransition {
            from: record.workflow_status.as_str().into(),
            to: next.as_str().into(),
        });
    }

    record.workflow_status = next;
    record.audit_trail.push(WorkflowAuditEntry {
        status: next,
        at: chrono::Local::now().naive_local(),
        note,
    });
    update_everywhere(conn, &record)?;

    tracing::info!(
        id = %record_id,
        status = next.as_str(),
        "Workflow status advanced"
    );
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        CompressedDocument, DocumentClassification, MatchSummary,
    };
    use crate::store::documents::{fingerprint, persist_document, quarantined_documents};
    use crate::store::kv::open_memory_store;

    fn stored_record(conn: &Connection) -> DocumentRecord {
        let rec = DocumentRecord {
            id: Uuid::new_v4(),
            patient_id: None,
            filename: "wf.pdf".into(),
            classification: DocumentClassification::unclassified(),
            match_summary: MatchSummary::unmatched(),
            document: CompressedDocument {
                pdf_base64: String::new(),
                original_size: 10,
                compressed_size: 5,
                compression_ratio: 2.0,
                quality_used: 0.9,
                emergency_compression: false,
            },
            ocr_excerpt: "metin".into(),
            fingerprint: fingerprint("wf.pdf", "metin", "", 120),
            uploaded_at: chrono::Local::now().naive_local(),
            workflow_status: WorkflowStatus::InquiryStarted,
            audit_trail: vec![],
        };
        persist_document(conn, rec, 50).unwrap()
    }

    #[test]
    fn forward_transition_appends_audit_entry() {
        let conn = open_memory_store().unwrap();
        let rec = stored_record(&conn);

        let updated = advance_workflow(
            &conn,
            &rec.id,
            WorkflowStatus::PrescriptionSaved,
            Some("reçete tarandı".into()),
        )
        .unwrap();

        assert_eq!(updated.workflow_status, WorkflowStatus::PrescriptionSaved);
        assert_eq!(updated.audit_trail.len(), 1);
        assert_eq!(
            updated.audit_trail[0].note.as_deref(),
            Some("reçete tarandı")
        );
    }

    #[test]
    fn skipping_stages_forward_is_allowed() {
        let conn = open_memory_store().unwrap();
        let rec = stored_record(&conn);

        let updated =
            advance_workflow(&conn, &rec.id, WorkflowStatus::Invoiced, None).unwrap();
        assert_eq!(updated.workflow_status, WorkflowStatus::Invoiced);
    }

    #[test]
    fn backward_transition_rejected() {
        let conn = open_memory_store().unwrap();
        let rec = stored_record(&conn);
        advance_workflow(&conn, &rec.id, WorkflowStatus::Invoiced, None).unwrap();

        let result = advance_workflow(&conn, &rec.id, WorkflowStatus::PrescriptionSaved, None);
        assert!(matches!(result, Err(StoreError::InvalidTransition { .. })));
    }

    #[test]
    fn payment_received_is_terminal() {
        let conn = open_memory_store().unwrap();
        let rec = stored_record(&conn);
        advance_workflow(&conn, &rec.id, WorkflowStatus::PaymentReceived, None).unwrap();

        for next in [
            WorkflowStatus::InquiryStarted,
            WorkflowStatus::Invoiced,
            WorkflowStatus::PaymentReceived,
        ] {
            let result = advance_workflow(&conn, &rec.id, next, None);
            assert!(matches!(result, Err(StoreError::InvalidTransition { .. })));
        }
    }

    #[test]
    fn status_change_visible_in_quarantine_bucket() {
        let conn = open_memory_store().unwrap();
        let rec = stored_record(&conn);
        advance_workflow(&conn, &rec.id, WorkflowStatus::DocumentsUploaded, None).unwrap();

        let quarantine = quarantined_documents(&conn).unwrap();
        assert_eq!(
            quarantine[0].workflow_status,
            WorkflowStatus::DocumentsUploaded
        );
    }

    #[test]
    fn audit_trail_accumulates_in_order() {
        let conn = open_memory_store().unwrap();
        let rec = stored_record(&conn);

        advance_workflow(&conn, &rec.id, WorkflowStatus::PrescriptionSaved, None).unwrap();
        advance_workflow(&conn, &rec.id, WorkflowStatus::MaterialsDelivered, None).unwrap();
        let updated =
            advance_workflow(&conn, &rec.id, WorkflowStatus::DocumentsUploaded, None).unwrap();

        let statuses: Vec<WorkflowStatus> =
            updated.audit_trail.iter().map(|e| e.status).collect();
        assert_eq!(
            statuses,
            vec![
                WorkflowStatus::PrescriptionSaved,
                WorkflowStatus::MaterialsDelivered,
                WorkflowStatus::DocumentsUploaded
            ]
        );
    }

    #[test]
    fn unknown_record_errors() {
        let conn = open_memory_store().unwrap();
        let result = advance_workflow(&conn, &Uuid::new_v4(), WorkflowStatus::Invoiced, None);
        assert!(matches!(result, Err(StoreError::RecordNotFound(_))));
    }
}
