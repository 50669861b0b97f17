//! Completion backend contracts.
//!
//! The board never talks to the network itself. A host supplies either a
//! [`CompletionClient`] that resolves to the full answer, or a
//! [`StreamingCompletionClient`] that yields chunks as they arrive.

mod sse;

pub use sse::{SseCompletion, SseDecoder, SseTransport};

use futures_util::StreamExt;
use futures_util::stream::LocalBoxStream;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Completion errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CompletionError {
    /// The backend reported a failure.
    #[error("Backend error: {0}")]
    Backend(String),
    /// The response could not be understood.
    #[error("Protocol error: {0}")]
    Protocol(String),
    #[error("Response stream ended before completion")]
    Interrupted,
}

/// Result type for completion operations.
pub type CompletionResult<T> = Result<T, CompletionError>;

/// Boxed future for async operations (single-threaded, no `Send`).
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Body of an ask request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AskRequest {
    pub prompt: String,
    /// Extra context, such as text extracted from an uploaded document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

impl AskRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            context: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

/// One item of a streamed response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseEvent {
    Chunk(String),
    /// The answer is complete.
    Done,
}

/// Backend resolving a prompt to its full answer.
pub trait CompletionClient {
    fn complete(&self, request: AskRequest) -> BoxFuture<'_, CompletionResult<String>>;
}

/// Backend streaming the answer as it is generated.
///
/// A well-formed stream ends with [`ResponseEvent::Done`]. An `Err` item
/// ends the response as failed.
pub trait StreamingCompletionClient {
    fn stream(&self, request: AskRequest) -> LocalBoxStream<'_, CompletionResult<ResponseEvent>>;
}

/// Drain a response stream into the full answer.
pub async fn collect_response(
    mut events: LocalBoxStream<'_, CompletionResult<ResponseEvent>>,
) -> CompletionResult<String> {
    let mut text = String::new();
    while let Some(event) = events.next().await {
        match event? {
            ResponseEvent::Chunk(chunk) => text.push_str(&chunk),
            ResponseEvent::Done => return Ok(text),
        }
    }
    Err(CompletionError::Interrupted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;

    #[test]
    fn test_request_json() {
        let json = serde_json::to_value(AskRequest::new("capital of France")).unwrap();
        assert_eq!(json, serde_json::json!({ "prompt": "capital of France" }));

        let request = AskRequest::new("summarize").with_context("page 1");
        let json = serde_json::to_value(request).unwrap();
        assert_eq!(json["context"], "page 1");
    }

    #[tokio::test]
    async fn test_collect_response() {
        let events = stream::iter(vec![
            Ok(ResponseEvent::Chunk("Par".to_string())),
            Ok(ResponseEvent::Chunk("is".to_string())),
            Ok(ResponseEvent::Done),
        ])
        .boxed_local();
        assert_eq!(collect_response(events).await, Ok("Paris".to_string()));
    }

    #[tokio::test]
    async fn test_collect_without_done_is_interrupted() {
        let events = stream::iter(vec![Ok(ResponseEvent::Chunk("Par".to_string()))]).boxed_local();
        assert_eq!(collect_response(events).await, Err(CompletionError::Interrupted));
    }

    #[tokio::test]
    async fn test_collect_stops_at_error() {
        let events = stream::iter(vec![
            Ok(ResponseEvent::Chunk("Par".to_string())),
            Err(CompletionError::Backend("quota".to_string())),
            Ok(ResponseEvent::Done),
        ])
        .boxed_local();
        assert_eq!(
            collect_response(events).await,
            Err(CompletionError::Backend("quota".to_string()))
        );
    }
}
