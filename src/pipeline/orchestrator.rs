//! Pipeline orchestrator: one capture in, one persisted record out.
//!
//! Drives the 8-stage sequence as a strict order of async steps, reporting
//! progress after each stage through a fire-and-forget hook. Collaborators
//! are injected at construction as trait objects with working defaults, so
//! no call site ever branches on capability presence. Failure semantics per
//! stage:
//!
//! - normalization: degrades internally, fatal only for undecodable input
//! - text extraction: degrades to an empty-text result
//! - identity resolution / classification: infallible by construction
//! - conversion/compression: degrades to the emergency placeholder
//! - persistence: fatal — losing the record would lose the capture

use std::io::Cursor;

use image::{DynamicImage, ImageOutputFormat};
use rusqlite::Connection;
use uuid::Uuid;

use super::classify::DocumentClassifier;
use super::extraction::{ExtractedText, TextExtractionAdapter};
use super::matching::IdentityResolver;
use super::normalize::GeometricNormalizer;
use super::pdf::{archive_filename, AdaptiveCompressor, PdfMeta};
use super::PipelineError;
use crate::config::PipelineSettings;
use crate::models::{DocumentRecord, PatientDirectory, RawUpload, WorkflowStatus};
use crate::store;

/// Pipeline execution state. A run moves strictly forward; `Failed` is
/// reachable from every non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Created,
    Normalizing,
    Extracting,
    Resolving,
    Classifying,
    Converting,
    Compressing,
    Persisting,
    Done,
    Failed,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Normalizing => "normalizing",
            Self::Extracting => "extracting",
            Self::Resolving => "resolving",
            Self::Classifying => "classifying",
            Self::Converting => "converting",
            Self::Compressing => "compressing",
            Self::Persisting => "persisting",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }

    /// 1-based progress step, `Created` and `Failed` excluded.
    fn step_index(&self) -> usize {
        match self {
            Self::Created | Self::Failed => 0,
            Self::Normalizing => 1,
            Self::Extracting => 2,
            Self::Resolving => 3,
            Self::Classifying => 4,
            Self::Converting => 5,
            Self::Compressing => 6,
            Self::Persisting => 7,
            Self::Done => 8,
        }
    }
}

const TOTAL_STEPS: usize = 8;

/// UI progress hook: `(step_index, total_steps, message)`.
pub type ProgressHook = Box<dyn Fn(usize, usize, &str) + Send + Sync>;

/// Success render hook, called with the persisted record.
pub type RenderHook = Box<dyn Fn(&DocumentRecord) + Send + Sync>;

pub struct DocumentPipeline {
    normalizer: GeometricNormalizer,
    extractor: TextExtractionAdapter,
    resolver: IdentityResolver,
    classifier: DocumentClassifier,
    settings: PipelineSettings,
    progress: Option<ProgressHook>,
    on_persisted: Option<RenderHook>,
}

impl DocumentPipeline {
    pub fn new(
        extractor: TextExtractionAdapter,
        resolver: IdentityResolver,
        classifier: DocumentClassifier,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            normalizer: GeometricNormalizer::default(),
            extractor,
            resolver,
            classifier,
            settings,
            progress: None,
            on_persisted: None,
        }
    }

    /// Production wiring with local-only capabilities: the tesseract chain
    /// when installed, no remote search, pattern classification.
    pub fn default_local(settings: PipelineSettings) -> Self {
        let remote_timeout = settings.remote_search_timeout;
        Self::new(
            TextExtractionAdapter::default_chain(),
            IdentityResolver::new(
                Box::new(super::matching::NoRemoteSearch),
                remote_timeout,
            ),
            DocumentClassifier::default(),
            settings,
        )
    }

    pub fn with_progress(mut self, hook: ProgressHook) -> Self {
        self.progress = Some(hook);
        self
    }

    pub fn with_render_hook(mut self, hook: RenderHook) -> Self {
        self.on_persisted = Some(hook);
        self
    }

    /// Run one capture through the full pipeline. No two runs share mutable
    /// state; the store connection is single-writer by contract.
    pub async fn run(
        &self,
        upload: RawUpload,
        directory: &PatientDirectory,
        conn: &Connection,
    ) -> Result<DocumentRecord, PipelineError> {
        let run_id = Uuid::new_v4();
        let started = std::time::Instant::now();
        tracing::info!(
            run = %run_id,
            file = %upload.filename,
            bytes = upload.size(),
            "Pipeline run started"
        );

        let result = self.run_stages(&upload, directory, conn).await;
        match &result {
            Ok(record) => {
                tracing::info!(
                    run = %run_id,
                    record = %record.id,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Pipeline run complete"
                );
                if let Some(hook) = &self.on_persisted {
                    hook(record);
                }
            }
            Err(e) => {
                tracing::error!(
                    run = %run_id,
                    stage = PipelineStage::Failed.as_str(),
                    error = %e,
                    "Pipeline run failed"
                );
            }
        }
        result
    }

    async fn run_stages(
        &self,
        upload: &RawUpload,
        directory: &PatientDirectory,
        conn: &Connection,
    ) -> Result<DocumentRecord, PipelineError> {
        // Stage 1: geometric normalization.
        self.notify(PipelineStage::Normalizing, "Straightening the capture");
        let normalized = self.normalizer.normalize(&upload.bytes)?;

        // Stage 2: text extraction. Failure degrades to empty text — the
        // capture itself must never be lost over OCR trouble.
        self.notify(PipelineStage::Extracting, "Reading the document");
        let extracted = match encode_png(&normalized.image)
            .and_then(|png| self.extractor.extract(&png))
        {
            Ok(extracted) => extracted,
            Err(e) => {
                tracing::warn!(error = %e, "Extraction failed — continuing with empty text");
                ExtractedText::empty()
            }
        };

        // Stage 3: identity resolution (includes timeout-guarded remote
        // enrichment).
        self.notify(PipelineStage::Resolving, "Matching the patient");
        let match_result = self.resolver.resolve(&extracted, directory).await;

        // Stage 4: classification.
        self.notify(PipelineStage::Classifying, "Determining the document type");
        let classification = self
            .classifier
            .classify(&extracted.text, &upload.filename);

        // Stage 5 + 6: PDF conversion and adaptive compression.
        self.notify(PipelineStage::Converting, "Converting to PDF");
        let match_summary = match_result.summary();
        let captured_at = chrono::Local::now().naive_local();
        let filename = archive_filename(
            &match_summary,
            classification.kind,
            captured_at,
            extracted.confidence,
        );
        let meta = PdfMeta {
            title: filename.trim_end_matches(".pdf").to_string(),
            patient_name: match_summary.patient_name.clone(),
            kind: classification.kind,
            captured_at,
        };

        self.notify(PipelineStage::Compressing, "Compressing to the size budget");
        let compressor = AdaptiveCompressor::new(
            self.settings.target_pdf_bytes,
            self.settings.max_compression_rounds,
        );
        let compressed = compressor.convert_and_compress(&normalized.image, upload.size(), &meta);

        // Stage 7: idempotent persistence. The only fatal write path.
        self.notify(PipelineStage::Persisting, "Saving the document");
        let record = DocumentRecord {
            id: Uuid::new_v4(),
            patient_id: match_summary.patient_id,
            filename,
            classification,
            match_summary: match_summary.clone(),
            document: compressed,
            ocr_excerpt: extracted
                .text
                .chars()
                .take(self.settings.fingerprint_text_prefix)
                .collect(),
            // Keyed on the source filename so re-uploads of the same capture
            // dedupe regardless of the generated archive name.
            fingerprint: store::fingerprint(
                &upload.filename,
                &extracted.text,
                match_summary.patient_name.as_deref().unwrap_or(""),
                self.settings.fingerprint_text_prefix,
            ),
            uploaded_at: captured_at,
            workflow_status: WorkflowStatus::InquiryStarted,
            audit_trail: vec![],
        };
        let stored = store::persist_document(conn, record, self.settings.quarantine_capacity)?;

        self.notify(PipelineStage::Done, "Done");
        Ok(stored)
    }

    fn notify(&self, stage: PipelineStage, message: &str) {
        let step = stage.step_index();
        tracing::debug!(stage = stage.as_str(), step, total = TOTAL_STEPS, message, "Pipeline progress");
        if let Some(hook) = &self.progress {
            hook(step, TOTAL_STEPS, message);
        }
    }
}

fn encode_png(image: &image::RgbImage) -> Result<Vec<u8>, super::extraction::ExtractionError> {
    let mut cursor = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(image.clone())
        .write_to(&mut cursor, ImageOutputFormat::Png)
        .map_err(|e| {
            super::extraction::ExtractionError::OcrProcessing(format!("PNG encoding failed: {e}"))
        })?;
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DocumentKind, MatchLevel, PatientRecord};
    use crate::pipeline::extraction::MockOcrProvider;
    use crate::pipeline::matching::NoRemoteSearch;
    use crate::store::{global_documents, open_memory_store, quarantined_documents};
    use image::{Rgb, RgbImage};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn upload(filename: &str) -> RawUpload {
        let img = RgbImage::from_pixel(240, 320, Rgb([235, 235, 235]));
        let mut cursor = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut cursor, ImageOutputFormat::Png)
            .unwrap();
        RawUpload::new(cursor.into_inner(), "image/png", filename)
    }

    fn directory() -> (PatientDirectory, PatientRecord) {
        let patient = PatientRecord {
            id: Uuid::new_v4(),
            first_name: "Ayşe".into(),
            last_name: "Yılmaz".into(),
            national_id: Some("10000000146".into()),
            birth_date: None,
            phone: None,
        };
        (PatientDirectory::new(vec![patient.clone()]), patient)
    }

    fn pipeline_with_ocr(text: &str) -> DocumentPipeline {
        let settings = PipelineSettings::default();
        DocumentPipeline::new(
            TextExtractionAdapter::new(vec![Box::new(MockOcrProvider::new(text, 0.85))]),
            IdentityResolver::new(Box::new(NoRemoteSearch), settings.remote_search_timeout),
            DocumentClassifier::default(),
            settings,
        )
    }

    #[tokio::test]
    async fn full_run_produces_matched_record() {
        let (dir, patient) = directory();
        let conn = open_memory_store().unwrap();
        let pipeline =
            pipeline_with_ocr("Pil Reçetesi\nHasta Adı: Ayşe Yılmaz\nT.C. Kimlik No: 10000000146");

        let record = pipeline
            .run(upload("capture.png"), &dir, &conn)
            .await
            .unwrap();

        assert_eq!(record.patient_id, Some(patient.id));
        assert_eq!(record.match_summary.level, MatchLevel::High);
        assert!(record.match_summary.confidence >= 0.98);
        assert_eq!(record.classification.kind, DocumentKind::BatteryPrescription);
        assert_eq!(record.workflow_status, WorkflowStatus::InquiryStarted);
        assert!(record.filename.starts_with("ayse_yilmaz_battery_prescription_"));
        assert!(!record.document.emergency_compression);
        assert_eq!(global_documents(&conn).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn progress_hook_sees_all_eight_steps() {
        let (dir, _) = directory();
        let conn = open_memory_store().unwrap();
        let steps = Arc::new(AtomicUsize::new(0));
        let seen = steps.clone();

        let pipeline = pipeline_with_ocr("Hasta Adı: Ayşe Yılmaz").with_progress(Box::new(
            move |step, total, _msg| {
                assert_eq!(total, 8);
                seen.fetch_max(step, Ordering::SeqCst);
            },
        ));

        pipeline.run(upload("x.png"), &dir, &conn).await.unwrap();
        assert_eq!(steps.load(Ordering::SeqCst), 8);
    }

    #[tokio::test]
    async fn render_hook_receives_persisted_record() {
        let (dir, _) = directory();
        let conn = open_memory_store().unwrap();
        let rendered = Arc::new(AtomicUsize::new(0));
        let count = rendered.clone();

        let pipeline = pipeline_with_ocr("Hasta Adı: Ayşe Yılmaz").with_render_hook(Box::new(
            move |record| {
                assert!(!record.filename.is_empty());
                count.fetch_add(1, Ordering::SeqCst);
            },
        ));

        pipeline.run(upload("x.png"), &dir, &conn).await.unwrap();
        assert_eq!(rendered.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_extraction_degrades_to_quarantined_record() {
        let (dir, _) = directory();
        let conn = open_memory_store().unwrap();
        let settings = PipelineSettings::default();
        let pipeline = DocumentPipeline::new(
            TextExtractionAdapter::new(vec![Box::new(MockOcrProvider::failing())]),
            IdentityResolver::new(Box::new(NoRemoteSearch), settings.remote_search_timeout),
            DocumentClassifier::default(),
            settings,
        );

        let record = pipeline
            .run(upload("unreadable.png"), &dir, &conn)
            .await
            .unwrap();

        assert!(record.is_quarantined());
        assert!(record.ocr_excerpt.is_empty());
        assert!(record.filename.contains("_UNMATCHED"));
        assert_eq!(quarantined_documents(&conn).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn undecodable_upload_is_terminal_failure() {
        let (dir, _) = directory();
        let conn = open_memory_store().unwrap();
        let pipeline = pipeline_with_ocr("irrelevant");
        let garbage = RawUpload::new(vec![0xDE; 256], "image/png", "junk.png");

        let result = pipeline.run(garbage, &dir, &conn).await;
        assert!(matches!(result, Err(PipelineError::Normalize(_))));
        assert!(global_documents(&conn).unwrap().is_empty());
    }

    #[tokio::test]
    async fn same_capture_twice_persists_once() {
        let (dir, _) = directory();
        let conn = open_memory_store().unwrap();
        let pipeline = pipeline_with_ocr("Hasta Adı: Ayşe Yılmaz\nReçete");

        let first = pipeline.run(upload("same.png"), &dir, &conn).await.unwrap();
        let second = pipeline.run(upload("same.png"), &dir, &conn).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(global_documents(&conn).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn no_identity_signals_yields_unmatched_record() {
        let (dir, _) = directory();
        let conn = open_memory_store().unwrap();
        let pipeline = pipeline_with_ocr("hiçbir kimlik bilgisi olmayan metin");

        let record = pipeline.run(upload("x.png"), &dir, &conn).await.unwrap();
        assert!(!record.match_summary.matched);
        assert_eq!(record.match_summary.confidence, 0.0);
        assert!(record.is_quarantined());
    }
}
