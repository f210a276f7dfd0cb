//! Reviewer replies: normalise the payload shape, then parse the evaluation.
//!
//! A reply carries its payload either as a plain string or as a list of typed
//! parts (`[{ "type": "text", "text": "…" }]`). Both are handled the same way:
//! the first textual part is taken. Anything else is an
//! [`AnalysisError::UnrecognizedReply`], never a panic.

use crate::error::AnalysisError;
use crate::record::Evaluation;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReply {
    pub message: ReplyMessage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplyMessage {
    pub content: ReplyContent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReplyContent {
    Text(String),
    Parts(Vec<ReplyPart>),
    Unrecognized(serde_json::Value),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplyPart {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl AnalysisReply {
    /// Reply whose content is a plain string.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            message: ReplyMessage {
                content: ReplyContent::Text(content.into()),
            },
        }
    }

    /// Reply whose content is a list of text parts.
    pub fn parts<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let parts = texts
            .into_iter()
            .map(|t| ReplyPart {
                kind: Some("text".to_string()),
                text: Some(t.into()),
            })
            .collect();
        Self {
            message: ReplyMessage {
                content: ReplyContent::Parts(parts),
            },
        }
    }

    pub fn first_text(&self) -> Result<&str, AnalysisError> {
        self.message.content.first_text()
    }
}

impl ReplyContent {
    /// The first textual payload, whichever shape carried it.
    pub fn first_text(&self) -> Result<&str, AnalysisError> {
        match self {
            ReplyContent::Text(s) => Ok(s),
            ReplyContent::Parts(parts) => parts
                .iter()
                .find_map(|p| p.text.as_deref())
                .ok_or(AnalysisError::UnrecognizedReply),
            ReplyContent::Unrecognized(_) => Err(AnalysisError::UnrecognizedReply),
        }
    }
}

static RE_OUTER_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[A-Za-z]*\s*\n?(.*?)\n?```\s*$").unwrap());

/// Models sometimes wrap the JSON in a fenced block despite instructions.
fn strip_code_fence(input: &str) -> &str {
    let trimmed = input.trim();
    match RE_OUTER_FENCE.captures(trimmed).and_then(|c| c.get(1)) {
        Some(inner) => inner.as_str().trim(),
        None => trimmed,
    }
}

/// Parse reply text into a validated [`Evaluation`].
pub fn parse_evaluation(text: &str) -> Result<Evaluation, AnalysisError> {
    let body = strip_code_fence(text);
    let evaluation: Evaluation = serde_json::from_str(body)
        .map_err(|e| AnalysisError::MalformedEvaluation(e.to_string()))?;
    evaluation
        .validate()
        .map_err(AnalysisError::MalformedEvaluation)?;
    Ok(evaluation)
}

/// Extract and parse in one step.
pub fn evaluation_from_reply(reply: &AnalysisReply) -> Result<Evaluation, AnalysisError> {
    parse_evaluation(reply.first_text()?)
}
