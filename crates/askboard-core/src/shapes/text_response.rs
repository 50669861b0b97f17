//! Text response shape: a query and the AI answer it produced.
//!
//! The response moves through `pending -> streaming -> complete | error`.
//! Transitions only go forward; once settled (complete or error) a response
//! never changes state again.

use super::{ShapeGeometry, box_bounds};
use chrono::{DateTime, Utc};
use kurbo::{Rect, Size};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Progress of an AI response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseState {
    Pending,
    Streaming,
    Complete,
    Error,
}

impl ResponseState {
    /// Complete and error are terminal.
    pub fn is_settled(self) -> bool {
        matches!(self, ResponseState::Complete | ResponseState::Error)
    }
}

impl fmt::Display for ResponseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResponseState::Pending => "pending",
            ResponseState::Streaming => "streaming",
            ResponseState::Complete => "complete",
            ResponseState::Error => "error",
        };
        f.write_str(name)
    }
}

/// Illegal lifecycle transition.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("Response already settled as {0}")]
    AlreadySettled(ResponseState),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextResponse {
    pub w: f64,
    pub h: f64,
    pub query: String,
    response_state: ResponseState,
    #[serde(default)]
    response_text: Option<String>,
    #[serde(default)]
    error_message: Option<String>,
    created_at: DateTime<Utc>,
}

impl TextResponse {
    /// A response still waiting for the backend.
    pub fn pending(query: impl Into<String>, size: Size) -> Self {
        Self {
            w: size.width,
            h: size.height,
            query: query.into(),
            response_state: ResponseState::Pending,
            response_text: None,
            error_message: None,
            created_at: Utc::now(),
        }
    }

    /// A response whose full text is already known.
    pub fn completed(query: impl Into<String>, text: impl Into<String>, size: Size) -> Self {
        let mut response = Self::pending(query, size);
        response.response_state = ResponseState::Complete;
        response.response_text = Some(text.into());
        response
    }

    /// A response that failed before producing an answer.
    pub fn failed(query: impl Into<String>, message: impl Into<String>, size: Size) -> Self {
        let mut response = Self::pending(query, size);
        response.response_state = ResponseState::Error;
        response.error_message = Some(message.into());
        response
    }

    pub fn state(&self) -> ResponseState {
        self.response_state
    }

    pub fn response_text(&self) -> Option<&str> {
        self.response_text.as_deref()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn ensure_open(&self) -> Result<(), LifecycleError> {
        if self.response_state.is_settled() {
            Err(LifecycleError::AlreadySettled(self.response_state))
        } else {
            Ok(())
        }
    }

    /// Mark the first bytes of the answer as arriving.
    pub fn begin_streaming(&mut self) -> Result<(), LifecycleError> {
        self.ensure_open()?;
        self.response_state = ResponseState::Streaming;
        Ok(())
    }

    /// Append a streamed chunk, entering `streaming` if still pending.
    pub fn append_chunk(&mut self, chunk: &str) -> Result<(), LifecycleError> {
        self.begin_streaming()?;
        self.response_text
            .get_or_insert_with(String::new)
            .push_str(chunk);
        Ok(())
    }

    /// Settle with the streamed text (empty if nothing arrived).
    pub fn complete(&mut self) -> Result<(), LifecycleError> {
        self.ensure_open()?;
        self.response_text.get_or_insert_with(String::new);
        self.response_state = ResponseState::Complete;
        Ok(())
    }

    /// Settle with a full answer, replacing anything streamed so far.
    pub fn complete_with(&mut self, text: impl Into<String>) -> Result<(), LifecycleError> {
        self.ensure_open()?;
        self.response_text = Some(text.into());
        self.response_state = ResponseState::Complete;
        Ok(())
    }

    /// Settle as failed. Partially streamed text is kept.
    pub fn fail(&mut self, message: impl Into<String>) -> Result<(), LifecycleError> {
        self.ensure_open()?;
        self.error_message = Some(message.into());
        self.response_state = ResponseState::Error;
        Ok(())
    }

    /// Check the settled-state invariants. Used on untrusted input.
    pub fn validate(&self) -> Result<(), String> {
        match self.response_state {
            ResponseState::Complete if self.response_text.is_none() => {
                Err("complete response without responseText".to_string())
            }
            ResponseState::Error if self.error_message.is_none() => {
                Err("error response without errorMessage".to_string())
            }
            _ => Ok(()),
        }
    }

    /// Copy response fields from `other`, leaving geometry and query alone.
    pub(crate) fn restore_response_from(&mut self, other: &TextResponse) {
        self.response_state = other.response_state;
        self.response_text.clone_from(&other.response_text);
        self.error_message.clone_from(&other.error_message);
    }
}

impl ShapeGeometry for TextResponse {
    fn local_bounds(&self) -> Rect {
        box_bounds(self.w, self.h)
    }

    fn set_size(&mut self, size: Size) {
        self.w = size.width;
        self.h = size.height;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn size() -> Size {
        Size::new(600.0, 300.0)
    }

    #[test]
    fn test_streaming_then_complete() {
        let mut response = TextResponse::pending("capital of France", size());
        assert_eq!(response.state(), ResponseState::Pending);
        assert_eq!(response.response_text(), None);

        response.append_chunk("Pa").unwrap();
        assert_eq!(response.state(), ResponseState::Streaming);
        response.append_chunk("ris").unwrap();
        response.complete().unwrap();

        assert_eq!(response.state(), ResponseState::Complete);
        assert_eq!(response.response_text(), Some("Paris"));
        assert!(response.validate().is_ok());
    }

    #[test]
    fn test_complete_without_chunks_has_text() {
        let mut response = TextResponse::pending("q", size());
        response.complete().unwrap();
        assert_eq!(response.response_text(), Some(""));
    }

    #[test]
    fn test_fail_keeps_partial_text() {
        let mut response = TextResponse::pending("q", size());
        response.append_chunk("half").unwrap();
        response.fail("backend went away").unwrap();
        assert_eq!(response.state(), ResponseState::Error);
        assert_eq!(response.error_message(), Some("backend went away"));
        assert_eq!(response.response_text(), Some("half"));
    }

    #[test]
    fn test_settled_is_final() {
        let mut done = TextResponse::completed("q", "a", size());
        assert_eq!(
            done.append_chunk("more"),
            Err(LifecycleError::AlreadySettled(ResponseState::Complete))
        );
        assert_eq!(
            done.fail("late"),
            Err(LifecycleError::AlreadySettled(ResponseState::Complete))
        );

        let mut failed = TextResponse::failed("q", "boom", size());
        assert_eq!(
            failed.complete_with("late answer"),
            Err(LifecycleError::AlreadySettled(ResponseState::Error))
        );
        assert_eq!(failed.response_text(), None);
    }

    #[test]
    fn test_validate_rejects_broken_json() {
        let json = serde_json::json!({
            "w": 10.0,
            "h": 10.0,
            "query": "q",
            "responseState": "complete",
            "createdAt": "2024-01-01T00:00:00Z"
        });
        let response: TextResponse = serde_json::from_value(json).unwrap();
        assert!(response.validate().is_err());
    }
}
