//! Persistent data model: the ingestion record and its evaluation.
//!
//! The JSON layout matches what the record store has always held, so records
//! written by earlier front-ends stay readable:
//!
//! ```json
//! {
//!   "id": "4f0c…",
//!   "resumePath": "blobs/…/cv.pdf",
//!   "imagePath": "blobs/…/cv.png",
//!   "companyName": "Acme",
//!   "jobTitle": "Engineer",
//!   "jobDescription": "…",
//!   "feedback": ""            // or a full evaluation object
//! }
//! ```
//!
//! An empty `feedback` means "no result available". The record does not say
//! whether analysis is still pending or failed.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::Path;
use uuid::Uuid;

/// Prefix of every record key.
pub const RECORD_PREFIX: &str = "resume:";

/// Pattern matching every record key, for [`crate::store::RecordStore::list`].
pub const RECORD_PATTERN: &str = "resume:*";

/// Opaque record identifier, generated once per pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Fresh random identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Store key: `resume:<id>`.
    pub fn key(&self) -> String {
        format!("{RECORD_PREFIX}{}", self.0)
    }

    /// Recover the id from a store key.
    pub fn from_key(key: &str) -> Option<Self> {
        key.strip_prefix(RECORD_PREFIX)
            .filter(|id| !id.is_empty())
            .map(|id| Self(id.to_string()))
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A named in-memory file: the uploaded PDF or the rendered PNG.
#[derive(Clone, PartialEq, Eq)]
pub struct DocumentFile {
    pub name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl fmt::Debug for DocumentFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentFile")
            .field("name", &self.name)
            .field("mime", &self.mime)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

impl DocumentFile {
    pub fn new(name: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            bytes,
        }
    }

    pub fn pdf(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self::new(name, "application/pdf", bytes)
    }

    pub fn png(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self::new(name, "image/png", bytes)
    }

    /// Read a local PDF, checking its `%PDF` magic bytes.
    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        if !bytes.starts_with(b"%PDF") {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("'{}' is not a PDF file", path.display()),
            ));
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "resume.pdf".to_string());
        Ok(Self::pdf(name, bytes))
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// The persisted unit of work for one submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestionRecord {
    pub id: RecordId,
    #[serde(rename = "resumePath", alias = "documentPath", default)]
    pub document_path: String,
    #[serde(default)]
    pub image_path: String,
    #[serde(default)]
    pub company_name: String,
    #[serde(default)]
    pub job_title: String,
    #[serde(default)]
    pub job_description: String,
    #[serde(
        rename = "feedback",
        default,
        serialize_with = "blank_when_none",
        deserialize_with = "none_when_blank"
    )]
    pub evaluation: Option<Evaluation>,
}

impl IngestionRecord {
    pub fn key(&self) -> String {
        self.id.key()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

fn blank_when_none<S: Serializer>(value: &Option<Evaluation>, s: S) -> Result<S::Ok, S::Error> {
    match value {
        Some(evaluation) => evaluation.serialize(s),
        None => s.serialize_str(""),
    }
}

fn none_when_blank<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Evaluation>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Stored {
        Full(Box<Evaluation>),
        Text(String),
        Null(()),
    }

    match Stored::deserialize(d)? {
        Stored::Full(evaluation) => Ok(Some(*evaluation)),
        Stored::Text(s) if s.trim().is_empty() => Ok(None),
        Stored::Text(_) => Err(serde::de::Error::custom(
            "feedback must be an evaluation object or empty",
        )),
        Stored::Null(()) => Ok(None),
    }
}

/// Structured reviewer output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
    #[serde(rename = "overallScore", default, skip_serializing_if = "Option::is_none")]
    pub overall_score: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(rename = "ATS")]
    pub ats: AtsReport,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub weaknesses: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl Evaluation {
    /// Range checks serde cannot express.
    pub fn validate(&self) -> Result<(), String> {
        if self.ats.score > 100 {
            return Err(format!("ATS score {} is outside 0–100", self.ats.score));
        }
        if let Some(score) = self.overall_score {
            if score > 100 {
                return Err(format!("overall score {score} is outside 0–100"));
            }
        }
        Ok(())
    }
}

/// Applicant-tracking-system compatibility section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AtsReport {
    pub score: u8,
    /// Display order.
    #[serde(default)]
    pub tips: Vec<AtsTip>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AtsTip {
    #[serde(rename = "type")]
    pub kind: TipKind,
    #[serde(rename = "tip")]
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TipKind {
    Good,
    #[serde(alias = "improve")]
    Warn,
}
