//! Server-Sent Events decoding for the ask endpoint.
//!
//! The backend answers with `data: {"content": "..."}` events, reports
//! failures as `data: {"error": "..."}` and ends with `data: [DONE]`.

use super::{
    AskRequest, BoxFuture, CompletionClient, CompletionError, CompletionResult, ResponseEvent,
    StreamingCompletionClient, collect_response,
};
use futures_util::StreamExt;
use futures_util::stream::{self, LocalBoxStream};
use serde::Deserialize;
use std::collections::VecDeque;

/// Terminator payload.
const DONE_MARKER: &str = "[DONE]";

#[derive(Debug, Deserialize)]
struct EventPayload {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

fn parse_payload(payload: &str) -> CompletionResult<ResponseEvent> {
    if payload.trim() == DONE_MARKER {
        return Ok(ResponseEvent::Done);
    }
    let event: EventPayload = serde_json::from_str(payload)
        .map_err(|e| CompletionError::Protocol(format!("invalid event payload: {e}")))?;
    match event {
        EventPayload { error: Some(message), .. } => Err(CompletionError::Backend(message)),
        EventPayload { content: Some(chunk), .. } => Ok(ResponseEvent::Chunk(chunk)),
        _ => Err(CompletionError::Protocol(
            "event has neither content nor error".to_string(),
        )),
    }
}

/// Incremental SSE parser. Feed it body chunks split anywhere.
#[derive(Debug, Default)]
pub struct SseDecoder {
    line: String,
    data: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a body chunk and return the events it completed.
    pub fn push(&mut self, chunk: &str) -> Vec<CompletionResult<ResponseEvent>> {
        self.line.push_str(chunk);
        let mut events = Vec::new();
        while let Some(end) = self.line.find('\n') {
            let line: String = self.line.drain(..=end).collect();
            if let Some(event) = self.feed_line(line.trim_end_matches(['\n', '\r'])) {
                events.push(event);
            }
        }
        events
    }

    /// Flush whatever the body left unterminated.
    pub fn finish(&mut self) -> Vec<CompletionResult<ResponseEvent>> {
        let rest = std::mem::take(&mut self.line);
        let rest = rest.trim_end_matches('\r');
        let mut events = Vec::new();
        if !rest.is_empty() {
            events.extend(self.feed_line(rest));
        }
        events.extend(self.dispatch());
        events
    }

    fn feed_line(&mut self, line: &str) -> Option<CompletionResult<ResponseEvent>> {
        if line.is_empty() {
            return self.dispatch();
        }
        // Comment / keep-alive
        if line.starts_with(':') {
            return None;
        }
        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        if field == "data" {
            self.data.push(value.to_string());
        }
        None
    }

    fn dispatch(&mut self) -> Option<CompletionResult<ResponseEvent>> {
        if self.data.is_empty() {
            return None;
        }
        let payload = self.data.join("\n");
        self.data.clear();
        Some(parse_payload(&payload))
    }
}

/// Raw HTTP body source for an ask request. Implemented by the host.
pub trait SseTransport {
    fn open(&self, request: &AskRequest) -> LocalBoxStream<'_, CompletionResult<String>>;
}

/// Completion client over an SSE transport.
#[derive(Debug, Clone)]
pub struct SseCompletion<T> {
    transport: T,
}

impl<T: SseTransport> SseCompletion<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}

struct DecodeState<'a> {
    body: LocalBoxStream<'a, CompletionResult<String>>,
    decoder: SseDecoder,
    queued: VecDeque<CompletionResult<ResponseEvent>>,
    ended: bool,
}

fn decode_body(
    body: LocalBoxStream<'_, CompletionResult<String>>,
) -> LocalBoxStream<'_, CompletionResult<ResponseEvent>> {
    let state = DecodeState {
        body,
        decoder: SseDecoder::new(),
        queued: VecDeque::new(),
        ended: false,
    };
    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(event) = state.queued.pop_front() {
                return Some((event, state));
            }
            if state.ended {
                return None;
            }
            match state.body.next().await {
                Some(Ok(chunk)) => {
                    let events = state.decoder.push(&chunk);
                    state.queued.extend(events);
                }
                Some(Err(err)) => {
                    state.ended = true;
                    state.queued.push_back(Err(err));
                }
                None => {
                    state.ended = true;
                    let events = state.decoder.finish();
                    state.queued.extend(events);
                }
            }
        }
    })
    .boxed_local()
}

impl<T: SseTransport> StreamingCompletionClient for SseCompletion<T> {
    fn stream(&self, request: AskRequest) -> LocalBoxStream<'_, CompletionResult<ResponseEvent>> {
        log::debug!("Opening response stream for {} byte prompt", request.prompt.len());
        decode_body(self.transport.open(&request))
    }
}

impl<T: SseTransport> CompletionClient for SseCompletion<T> {
    fn complete(&self, request: AskRequest) -> BoxFuture<'_, CompletionResult<String>> {
        Box::pin(collect_response(self.stream(request)))
    }
}
