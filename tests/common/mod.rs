//! In-crate fakes for the pipeline's collaborators.

#![allow(dead_code)]

use async_trait::async_trait;
use resumind::store::{MemoryBlobStore, MemoryRecordStore};
use resumind::{
    AnalysisClient, AnalysisError, AnalysisOutcome, AnalysisReply, BlobStore, ConvertError,
    DocumentFile, IngestionRecord, KvEntry, PipelineProgressCallback, PipelineStatus, RasterImage,
    Rasterizer, RecordId, RecordStore, ResumePipeline, StoreError, Submission, UploadedBlob,
};
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const EVALUATION_JSON: &str = r#"{"overallScore":68,"summary":"Clear but generic.","ATS":{"score":74,"tips":[{"type":"good","tip":"Standard section headings"},{"type":"warn","tip":"Skills are buried in a sidebar"}]},"strengths":["Rust","Kubernetes"],"weaknesses":["No quantified impact"]}"#;

/// Route library logs to the test harness; set `RUST_LOG=debug` to see them.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn submission() -> Submission {
    Submission::new(
        "Acme",
        "Backend Engineer",
        "Build and run Rust services.",
        DocumentFile::pdf("Jane Doe.pdf", b"%PDF-1.7 fake".to_vec()),
    )
}

// ── Documents ────────────────────────────────────────────────────────────

/// A one-page PDF with an empty page of `width` × `height` points.
pub fn blank_pdf(width: u32, height: u32) -> Vec<u8> {
    let objects = [
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
        format!("<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {width} {height}] >>"),
    ];

    let mut pdf = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(pdf.len());
        pdf.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, body).as_bytes());
    }

    let xref_at = pdf.len();
    pdf.extend_from_slice(format!("xref\n0 {}\n", objects.len() + 1).as_bytes());
    pdf.extend_from_slice(b"0000000000 65535 f \n");
    for off in offsets {
        pdf.extend_from_slice(format!("{off:010} 00000 n \n").as_bytes());
    }
    pdf.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref_at
        )
        .as_bytes(),
    );
    pdf
}

// ── Blob store ───────────────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingBlobStore {
    inner: MemoryBlobStore,
    pub uploads: Mutex<Vec<String>>,
    /// Fail the upload with this 0-based index (0 = document, 1 = image).
    pub fail_on: Option<usize>,
}

impl RecordingBlobStore {
    pub fn failing_on(index: usize) -> Self {
        Self {
            fail_on: Some(index),
            ..Self::default()
        }
    }

    pub fn upload_count(&self) -> usize {
        self.uploads.lock().unwrap().len()
    }
}

#[async_trait]
impl BlobStore for RecordingBlobStore {
    async fn upload(&self, file: &DocumentFile) -> Result<UploadedBlob, StoreError> {
        let index = {
            let mut uploads = self.uploads.lock().unwrap();
            uploads.push(file.name.clone());
            uploads.len() - 1
        };
        if self.fail_on == Some(index) {
            return Err(StoreError::Backend("quota exceeded".into()));
        }
        self.inner.upload(file).await
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>, StoreError> {
        self.inner.read(path).await
    }
}

// ── Record store ─────────────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingRecordStore {
    inner: MemoryRecordStore,
    pub sets: Mutex<Vec<(String, String)>>,
    /// Fail the `set` call with this 0-based index.
    pub fail_on: Option<usize>,
}

impl RecordingRecordStore {
    pub fn failing_on(index: usize) -> Self {
        Self {
            fail_on: Some(index),
            ..Self::default()
        }
    }

    pub fn set_calls(&self) -> Vec<(String, String)> {
        self.sets.lock().unwrap().clone()
    }

    /// Every successful write, decoded.
    pub fn written_records(&self) -> Vec<IngestionRecord> {
        self.set_calls()
            .iter()
            .enumerate()
            .filter(|(i, _)| self.fail_on != Some(*i))
            .map(|(_, (_, v))| IngestionRecord::from_json(v).expect("record JSON"))
            .collect()
    }
}

#[async_trait]
impl RecordStore for RecordingRecordStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let index = {
            let mut sets = self.sets.lock().unwrap();
            sets.push((key.to_string(), value.to_string()));
            sets.len() - 1
        };
        if self.fail_on == Some(index) {
            return Err(StoreError::Backend("connection reset".into()));
        }
        self.inner.set(key, value).await
    }

    async fn list(&self, pattern: &str, with_values: bool) -> Result<Vec<KvEntry>, StoreError> {
        self.inner.list(pattern, with_values).await
    }
}

// ── Rasterizer ───────────────────────────────────────────────────────────

pub struct FakeRasterizer {
    pub calls: AtomicUsize,
    pub failure: Option<ConvertError>,
}

impl FakeRasterizer {
    pub fn ok() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            failure: None,
        }
    }

    pub fn failing(err: ConvertError) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            failure: Some(err),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Rasterizer for FakeRasterizer {
    async fn rasterize(&self, document: &DocumentFile) -> Result<RasterImage, ConvertError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(ref err) = self.failure {
            return Err(err.clone());
        }
        let png = b"\x89PNG\r\n\x1a\nfake".to_vec();
        let mut tmp = tempfile::NamedTempFile::new().expect("temp file");
        tmp.write_all(&png).expect("write preview");
        let name = document.name.replace(".pdf", ".png");
        Ok(RasterImage {
            preview: tmp.into_temp_path(),
            file: DocumentFile::png(name, png),
            width: 2448,
            height: 3168,
            page_width_pts: 612.0,
            page_height_pts: 792.0,
        })
    }
}

// ── Analyst ──────────────────────────────────────────────────────────────

#[derive(Clone)]
pub enum Script {
    Reply(AnalysisReply),
    Null,
    Fail(AnalysisError),
}

pub struct ScriptedAnalyst {
    script: Script,
    pub requests: Mutex<Vec<(String, String)>>,
}

impl ScriptedAnalyst {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn replying(text: &str) -> Self {
        Self::new(Script::Reply(AnalysisReply::text(text)))
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl AnalysisClient for ScriptedAnalyst {
    async fn feedback(
        &self,
        image_path: &str,
        instructions: &str,
    ) -> Result<Option<AnalysisReply>, AnalysisError> {
        self.requests
            .lock()
            .unwrap()
            .push((image_path.to_string(), instructions.to_string()));
        match self.script {
            Script::Reply(ref reply) => Ok(Some(reply.clone())),
            Script::Null => Ok(None),
            Script::Fail(ref err) => Err(err.clone()),
        }
    }
}

// ── Progress ─────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingProgress {
    pub statuses: Mutex<Vec<PipelineStatus>>,
    pub created: Mutex<Vec<RecordId>>,
    pub completed: Mutex<Vec<AnalysisOutcome>>,
}

impl RecordingProgress {
    pub fn messages(&self) -> Vec<String> {
        self.statuses
            .lock()
            .unwrap()
            .iter()
            .map(|s| s.message.clone())
            .collect()
    }

    pub fn last(&self) -> Option<PipelineStatus> {
        self.statuses.lock().unwrap().last().cloned()
    }
}

impl PipelineProgressCallback for RecordingProgress {
    fn on_status(&self, status: &PipelineStatus) {
        self.statuses.lock().unwrap().push(status.clone());
    }

    fn on_record_created(&self, id: &RecordId) {
        self.created.lock().unwrap().push(id.clone());
    }

    fn on_complete(&self, outcome: &AnalysisOutcome) {
        self.completed.lock().unwrap().push(outcome.clone());
    }
}

// ── Harness ──────────────────────────────────────────────────────────────

pub struct Harness {
    pub blobs: Arc<RecordingBlobStore>,
    pub records: Arc<RecordingRecordStore>,
    pub rasterizer: Arc<FakeRasterizer>,
    pub analyst: Arc<ScriptedAnalyst>,
    pub progress: Arc<RecordingProgress>,
}

impl Harness {
    pub fn new(
        blobs: RecordingBlobStore,
        records: RecordingRecordStore,
        rasterizer: FakeRasterizer,
        analyst: ScriptedAnalyst,
    ) -> Self {
        init_tracing();
        Self {
            blobs: Arc::new(blobs),
            records: Arc::new(records),
            rasterizer: Arc::new(rasterizer),
            analyst: Arc::new(analyst),
            progress: Arc::new(RecordingProgress::default()),
        }
    }

    /// Everything succeeds; the analyst replies with `EVALUATION_JSON`.
    pub fn happy() -> Self {
        Self::with_analyst(ScriptedAnalyst::replying(EVALUATION_JSON))
    }

    pub fn with_analyst(analyst: ScriptedAnalyst) -> Self {
        Self::new(
            RecordingBlobStore::default(),
            RecordingRecordStore::default(),
            FakeRasterizer::ok(),
            analyst,
        )
    }

    pub fn pipeline(&self) -> ResumePipeline {
        ResumePipeline::new(
            self.blobs.clone(),
            self.records.clone(),
            self.rasterizer.clone(),
            self.analyst.clone(),
        )
        .with_progress(self.progress.clone())
    }
}
