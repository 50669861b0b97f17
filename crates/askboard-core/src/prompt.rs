//! Prompt submission: turns a typed question into a text response shape.
//!
//! The controller holds shared handles to the store, the camera and the
//! prompt input. Store borrows never outlive a synchronous step, so several
//! submissions can be in flight at once on a single thread.

use crate::camera::Viewport;
use crate::completion::{
    AskRequest, CompletionClient, CompletionError, ResponseEvent, StreamingCompletionClient,
};
use crate::shapes::{LifecycleError, ShapeId, ShapeSpec, TextResponse};
use crate::store::{ShapeStore, StoreResult};
use futures_util::StreamExt;
use kurbo::{Point, Size};
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

/// Placeholder shown in an empty prompt input.
pub const PROMPT_PLACEHOLDER: &str = "Ask anything...";

/// What to do when the backend fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OnError {
    /// Log only.
    Skip,
    /// Put an error-state response on the board.
    #[default]
    CreateErrorShape,
}

/// What to do with an answer that arrives after a newer submission started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StalePolicy {
    #[default]
    Apply,
    Discard,
}

/// Prompt controller settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PromptConfig {
    pub response_width: f64,
    pub response_height: f64,
    /// Center the camera on each new response.
    pub center_camera: bool,
    pub animation_duration_ms: u64,
    pub on_error: OnError,
    pub stale_policy: StalePolicy,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            response_width: 600.0,
            response_height: 300.0,
            center_camera: true,
            animation_duration_ms: 200,
            on_error: OnError::default(),
            stale_policy: StalePolicy::default(),
        }
    }
}

impl PromptConfig {
    pub fn response_size(&self) -> Size {
        Size::new(self.response_width, self.response_height)
    }

    pub fn animation_duration(&self) -> Duration {
        Duration::from_millis(self.animation_duration_ms)
    }
}

/// Where the prompt input sits on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputPlacement {
    /// Middle of the screen, inviting the first question.
    Centered,
    /// Bottom edge, out of the way of existing content.
    Docked,
}

/// State of the prompt text field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptInput {
    text: String,
    focused: bool,
    /// Shortcut hint shown next to the field, e.g. "⌘ + K".
    hint: String,
}

impl PromptInput {
    pub fn new(hint: impl Into<String>) -> Self {
        Self {
            hint: hint.into(),
            ..Self::default()
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn clear(&mut self) {
        self.text.clear();
    }

    pub fn focus(&mut self) {
        self.focused = true;
    }

    pub fn blur(&mut self) {
        self.focused = false;
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn hint(&self) -> &str {
        &self.hint
    }

    pub fn placeholder(&self) -> &'static str {
        PROMPT_PLACEHOLDER
    }

    pub fn placement(&self, canvas_empty: bool) -> InputPlacement {
        if canvas_empty {
            InputPlacement::Centered
        } else {
            InputPlacement::Docked
        }
    }
}

/// Result of one submission. Submissions never fail outward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Blank input; nothing happened.
    Ignored,
    Created(ShapeId),
    /// The backend failed. `shape` is the error response, if one was made.
    Failed { shape: Option<ShapeId> },
    /// Dropped as stale, or its shape was deleted mid-stream.
    Discarded,
}

/// Submits prompts to a completion backend and places the answers.
pub struct PromptController<S, C, V> {
    store: Rc<RefCell<S>>,
    client: C,
    viewport: Rc<RefCell<V>>,
    input: Rc<RefCell<PromptInput>>,
    config: PromptConfig,
    generation: Cell<u64>,
}

impl<S: ShapeStore, C, V: Viewport> PromptController<S, C, V> {
    pub fn new(
        store: Rc<RefCell<S>>,
        client: C,
        viewport: Rc<RefCell<V>>,
        input: Rc<RefCell<PromptInput>>,
        config: PromptConfig,
    ) -> Self {
        Self {
            store,
            client,
            viewport,
            input,
            config,
            generation: Cell::new(0),
        }
    }

    pub fn config(&self) -> &PromptConfig {
        &self.config
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn input(&self) -> &Rc<RefCell<PromptInput>> {
        &self.input
    }

    /// Trim, clear the input and open a new generation. `None` for blank text.
    fn begin(&self, text: &str) -> Option<(String, u64)> {
        let query = text.trim();
        if query.is_empty() {
            return None;
        }
        self.input.borrow_mut().clear();
        let generation = self.generation.get() + 1;
        self.generation.set(generation);
        Some((query.to_string(), generation))
    }

    fn is_stale(&self, generation: u64) -> bool {
        self.config.stale_policy == StalePolicy::Discard && generation != self.generation.get()
    }

    /// Create a response centered in the current view and bring it into focus.
    fn place(&self, response: TextResponse) -> StoreResult<ShapeId> {
        let size = self.config.response_size();
        let center = self.viewport.borrow().view_center();
        let origin = Point::new(center.x - size.width / 2.0, center.y - size.height / 2.0);

        let id = self
            .store
            .borrow_mut()
            .create_shape(ShapeSpec::text_response(origin, response))?;

        if self.config.center_camera {
            let bounds = self.store.borrow().shape_bounds(id);
            if let Some(bounds) = bounds {
                self.viewport
                    .borrow_mut()
                    .center_on(bounds, self.config.animation_duration());
            }
        }
        Ok(id)
    }

    fn report_failure(&self, query: &str, error: &CompletionError) -> SubmitOutcome {
        log::error!("Failed to create text response shape: {}", error);
        match self.config.on_error {
            OnError::Skip => SubmitOutcome::Failed { shape: None },
            OnError::CreateErrorShape => {
                let response =
                    TextResponse::failed(query, error.to_string(), self.config.response_size());
                match self.place(response) {
                    Ok(id) => SubmitOutcome::Failed { shape: Some(id) },
                    Err(err) => {
                        log::error!("Failed to place error response: {}", err);
                        SubmitOutcome::Failed { shape: None }
                    }
                }
            }
        }
    }

    /// Apply a lifecycle step to a streaming response and commit it.
    /// Returns false if the shape is gone or the step was refused.
    fn advance<F>(&self, id: ShapeId, step: F) -> bool
    where
        F: FnOnce(&mut TextResponse) -> Result<(), LifecycleError>,
    {
        let mut store = self.store.borrow_mut();
        let Some(mut shape) = store.shape(id).cloned() else {
            log::debug!("Response shape {} was deleted, dropping stream", id);
            return false;
        };
        let Some(response) = shape.as_text_response_mut() else {
            return false;
        };
        if let Err(err) = step(response) {
            log::warn!("Response {}: {}", id, err);
            return false;
        }
        match store.update_shape(shape) {
            Ok(()) => true,
            Err(err) => {
                log::warn!("Response {}: {}", id, err);
                false
            }
        }
    }

    fn drop_shape(&self, id: ShapeId) {
        let mut store = self.store.borrow_mut();
        if store.shape(id).is_some() {
            if let Err(err) = store.remove_shapes(&[id]) {
                log::warn!("Could not remove response {}: {}", id, err);
            }
        }
    }
}

impl<S: ShapeStore, C: CompletionClient, V: Viewport> PromptController<S, C, V> {
    /// Ask the backend and place the full answer once it arrives.
    pub async fn submit(&self, text: &str) -> SubmitOutcome {
        let Some((query, generation)) = self.begin(text) else {
            return SubmitOutcome::Ignored;
        };

        let answer = self.client.complete(AskRequest::new(query.as_str())).await;

        if self.is_stale(generation) {
            log::info!("Discarding stale answer for {:?}", query);
            return SubmitOutcome::Discarded;
        }

        match answer {
            Ok(text) => {
                let response = TextResponse::completed(query, text, self.config.response_size());
                match self.place(response) {
                    Ok(id) => SubmitOutcome::Created(id),
                    Err(err) => {
                        log::error!("Failed to create text response shape: {}", err);
                        SubmitOutcome::Failed { shape: None }
                    }
                }
            }
            Err(err) => self.report_failure(&query, &err),
        }
    }

    /// Submit whatever the prompt input currently holds.
    pub async fn submit_input(&self) -> SubmitOutcome {
        let text = self.input.borrow().text().to_string();
        self.submit(&text).await
    }
}

impl<S: ShapeStore, C: StreamingCompletionClient, V: Viewport> PromptController<S, C, V> {
    /// Ask a streaming backend, filling a pending response as chunks arrive.
    pub async fn submit_streaming(&self, text: &str) -> SubmitOutcome {
        let Some((query, generation)) = self.begin(text) else {
            return SubmitOutcome::Ignored;
        };

        let pending = TextResponse::pending(query.as_str(), self.config.response_size());
        let id = match self.place(pending) {
            Ok(id) => id,
            Err(err) => {
                log::error!("Failed to create text response shape: {}", err);
                return SubmitOutcome::Failed { shape: None };
            }
        };

        let mut events = self.client.stream(AskRequest::new(query.as_str()));
        let failure = loop {
            let event = events.next().await;
            if self.is_stale(generation) {
                log::info!("Discarding stale stream for {:?}", query);
                self.drop_shape(id);
                return SubmitOutcome::Discarded;
            }
            match event {
                Some(Ok(ResponseEvent::Chunk(chunk))) => {
                    if !self.advance(id, |r| r.append_chunk(&chunk)) {
                        return SubmitOutcome::Discarded;
                    }
                }
                Some(Ok(ResponseEvent::Done)) => {
                    if !self.advance(id, TextResponse::complete) {
                        return SubmitOutcome::Discarded;
                    }
                    return SubmitOutcome::Created(id);
                }
                Some(Err(err)) => break err,
                None => break CompletionError::Interrupted,
            }
        };

        log::error!("Failed to create text response shape: {}", failure);
        match self.config.on_error {
            OnError::Skip => {
                self.drop_shape(id);
                SubmitOutcome::Failed { shape: None }
            }
            OnError::CreateErrorShape => {
                if self.advance(id, |r| r.fail(failure.to_string())) {
                    SubmitOutcome::Failed { shape: Some(id) }
                } else {
                    SubmitOutcome::Discarded
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::{BoxFuture, CompletionResult};
    use crate::guard::install_guards;
    use crate::shapes::ResponseState;
    use crate::store::CanvasDocument;
    use futures_util::stream::{self, LocalBoxStream};
    use kurbo::Rect;
    use std::collections::HashMap;
    use tokio::sync::oneshot;

    #[derive(Default)]
    struct RecordingViewport {
        centered: Vec<(Rect, Duration)>,
    }

    impl Viewport for RecordingViewport {
        fn view_center(&self) -> Point {
            Point::new(400.0, 300.0)
        }

        fn center_on(&mut self, bounds: Rect, duration: Duration) {
            self.centered.push((bounds, duration));
        }
    }

    /// Backend whose answers are released by the test through oneshot senders.
    #[derive(Default)]
    struct ScriptedBackend {
        replies: RefCell<HashMap<String, oneshot::Receiver<CompletionResult<String>>>>,
        calls: RefCell<Vec<String>>,
    }

    impl ScriptedBackend {
        fn expect(&self, prompt: &str) -> oneshot::Sender<CompletionResult<String>> {
            let (tx, rx) = oneshot::channel();
            self.replies.borrow_mut().insert(prompt.to_string(), rx);
            tx
        }

        fn answer(&self, prompt: &str, reply: CompletionResult<String>) {
            let _ = self.expect(prompt).send(reply);
        }
    }

    impl CompletionClient for ScriptedBackend {
        fn complete(&self, request: AskRequest) -> BoxFuture<'_, CompletionResult<String>> {
            self.calls.borrow_mut().push(request.prompt.clone());
            let reply = self.replies.borrow_mut().remove(&request.prompt);
            Box::pin(async move {
                match reply {
                    Some(rx) => rx.await.unwrap_or(Err(CompletionError::Interrupted)),
                    None => Err(CompletionError::Backend("unexpected prompt".to_string())),
                }
            })
        }
    }

    struct Harness<C> {
        store: Rc<RefCell<CanvasDocument>>,
        viewport: Rc<RefCell<RecordingViewport>>,
        input: Rc<RefCell<PromptInput>>,
        controller: PromptController<CanvasDocument, C, RecordingViewport>,
    }

    fn harness<C>(client: C, config: PromptConfig) -> Harness<C> {
        let mut doc = CanvasDocument::new();
        install_guards(&mut doc);
        let store = Rc::new(RefCell::new(doc));
        let viewport = Rc::new(RefCell::new(RecordingViewport::default()));
        let input = Rc::new(RefCell::new(PromptInput::new("Ctrl + K")));
        let controller = PromptController::new(
            store.clone(),
            client,
            viewport.clone(),
            input.clone(),
            config,
        );
        Harness {
            store,
            viewport,
            input,
            controller,
        }
    }

    fn response_of(store: &Rc<RefCell<CanvasDocument>>, id: ShapeId) -> TextResponse {
        store.borrow().shape(id).unwrap().as_text_response().unwrap().clone()
    }

    #[tokio::test]
    async fn test_answer_becomes_complete_shape() {
        let backend = ScriptedBackend::default();
        backend.answer("capital of France", Ok("Paris".to_string()));
        let h = harness(backend, PromptConfig::default());

        let outcome = h.controller.submit("  capital of France ").await;
        let SubmitOutcome::Created(id) = outcome else {
            panic!("expected a shape, got {outcome:?}");
        };

        let response = response_of(&h.store, id);
        assert_eq!(response.state(), ResponseState::Complete);
        assert_eq!(response.query, "capital of France");
        assert_eq!(response.response_text(), Some("Paris"));

        let bounds = h.store.borrow().shape_bounds(id).unwrap();
        assert_eq!(bounds, Rect::new(100.0, 150.0, 700.0, 450.0));
        assert_eq!(
            h.viewport.borrow().centered,
            vec![(bounds, Duration::from_millis(200))]
        );
        assert_eq!(*h.controller.client().calls.borrow(), vec!["capital of France".to_string()]);
    }

    #[tokio::test]
    async fn test_blank_input_is_ignored() {
        let h = harness(ScriptedBackend::default(), PromptConfig::default());
        h.input.borrow_mut().set_text("draft");

        assert_eq!(h.controller.submit("").await, SubmitOutcome::Ignored);
        assert_eq!(h.controller.submit("   \n\t").await, SubmitOutcome::Ignored);

        assert!(h.controller.client().calls.borrow().is_empty());
        assert!(h.store.borrow().is_empty());
        assert_eq!(h.input.borrow().text(), "draft");
    }

    #[tokio::test]
    async fn test_submit_input_clears_field() {
        let backend = ScriptedBackend::default();
        let release = backend.expect("hello");
        let h = harness(backend, PromptConfig::default());
        h.input.borrow_mut().set_text("hello");

        let driver = async {
            tokio::task::yield_now().await;
            // Cleared before the backend answered
            assert_eq!(h.input.borrow().text(), "");
            let _ = release.send(Ok("hi".to_string()));
        };
        let (outcome, ()) = tokio::join!(h.controller.submit_input(), driver);
        assert!(matches!(outcome, SubmitOutcome::Created(_)));
    }

    #[tokio::test]
    async fn test_overlapping_submissions_land_in_completion_order() {
        let backend = ScriptedBackend::default();
        let release_a = backend.expect("A");
        let release_b = backend.expect("B");
        let h = harness(backend, PromptConfig::default());

        let driver = async {
            let _ = release_b.send(Ok("answer B".to_string()));
            while h.store.borrow().is_empty() {
                tokio::task::yield_now().await;
            }
            let _ = release_a.send(Ok("answer A".to_string()));
        };
        let (a, b, ()) = tokio::join!(h.controller.submit("A"), h.controller.submit("B"), driver);

        let (SubmitOutcome::Created(a), SubmitOutcome::Created(b)) = (a, b) else {
            panic!("both submissions should create shapes");
        };
        assert_eq!(h.store.borrow().z_order(), &[b, a]);
        assert_eq!(response_of(&h.store, a).response_text(), Some("answer A"));
        assert_eq!(h.viewport.borrow().centered.len(), 2);
    }

    #[tokio::test]
    async fn test_stale_answer_discarded() {
        let backend = ScriptedBackend::default();
        let release_a = backend.expect("A");
        let release_b = backend.expect("B");
        let config = PromptConfig {
            stale_policy: StalePolicy::Discard,
            ..PromptConfig::default()
        };
        let h = harness(backend, config);

        let driver = async {
            let _ = release_b.send(Ok("answer B".to_string()));
            let _ = release_a.send(Ok("answer A".to_string()));
        };
        let (a, b, ()) = tokio::join!(h.controller.submit("A"), h.controller.submit("B"), driver);

        assert_eq!(a, SubmitOutcome::Discarded);
        assert!(matches!(b, SubmitOutcome::Created(_)));
        assert_eq!(h.store.borrow().len(), 1);
    }

    #[tokio::test]
    async fn test_failure_creates_error_shape() {
        let backend = ScriptedBackend::default();
        backend.answer("q", Err(CompletionError::Backend("API key not configured".to_string())));
        let h = harness(backend, PromptConfig::default());

        let outcome = h.controller.submit("q").await;
        let SubmitOutcome::Failed { shape: Some(id) } = outcome else {
            panic!("expected an error shape, got {outcome:?}");
        };
        let response = response_of(&h.store, id);
        assert_eq!(response.state(), ResponseState::Error);
        assert_eq!(response.error_message(), Some("Backend error: API key not configured"));
    }

    #[tokio::test]
    async fn test_failure_skipped() {
        let backend = ScriptedBackend::default();
        backend.answer("q", Err(CompletionError::Interrupted));
        let config = PromptConfig {
            on_error: OnError::Skip,
            ..PromptConfig::default()
        };
        let h = harness(backend, config);

        assert_eq!(h.controller.submit("q").await, SubmitOutcome::Failed { shape: None });
        assert!(h.store.borrow().is_empty());
        assert!(h.viewport.borrow().centered.is_empty());
    }

    #[tokio::test]
    async fn test_camera_can_stay_put() {
        let backend = ScriptedBackend::default();
        backend.answer("q", Ok("a".to_string()));
        let config = PromptConfig {
            center_camera: false,
            ..PromptConfig::default()
        };
        let h = harness(backend, config);

        assert!(matches!(h.controller.submit("q").await, SubmitOutcome::Created(_)));
        assert!(h.viewport.borrow().centered.is_empty());
    }

    struct ScriptedStream(Vec<CompletionResult<ResponseEvent>>);

    impl StreamingCompletionClient for ScriptedStream {
        fn stream(
            &self,
            _request: AskRequest,
        ) -> LocalBoxStream<'_, CompletionResult<ResponseEvent>> {
            stream::iter(self.0.clone()).boxed_local()
        }
    }

    fn chunk(text: &str) -> CompletionResult<ResponseEvent> {
        Ok(ResponseEvent::Chunk(text.to_string()))
    }

    #[tokio::test]
    async fn test_streaming_fills_response() {
        let client = ScriptedStream(vec![chunk("Pa"), chunk("ris"), Ok(ResponseEvent::Done)]);
        let h = harness(client, PromptConfig::default());

        let outcome = h.controller.submit_streaming("capital of France").await;
        let SubmitOutcome::Created(id) = outcome else {
            panic!("expected a shape");
        };
        let response = response_of(&h.store, id);
        assert_eq!(response.state(), ResponseState::Complete);
        assert_eq!(response.response_text(), Some("Paris"));
        assert_eq!(h.viewport.borrow().centered.len(), 1);
    }

    #[tokio::test]
    async fn test_undo_keeps_streamed_answer_complete() {
        let client = ScriptedStream(vec![chunk("Pa"), chunk("ris"), Ok(ResponseEvent::Done)]);
        let h = harness(client, PromptConfig::default());

        let SubmitOutcome::Created(id) = h.controller.submit_streaming("q").await else {
            panic!("expected a shape");
        };
        assert!(h.store.borrow_mut().undo());

        let response = response_of(&h.store, id);
        assert_eq!(response.state(), ResponseState::Complete);
        assert_eq!(response.response_text(), Some("Paris"));

        assert!(h.store.borrow_mut().redo());
        assert_eq!(response_of(&h.store, id).state(), ResponseState::Complete);
    }

    #[tokio::test]
    async fn test_streaming_cut_short_fails() {
        let client = ScriptedStream(vec![chunk("Pa")]);
        let h = harness(client, PromptConfig::default());

        let outcome = h.controller.submit_streaming("q").await;
        let SubmitOutcome::Failed { shape: Some(id) } = outcome else {
            panic!("expected an error shape, got {outcome:?}");
        };
        let response = response_of(&h.store, id);
        assert_eq!(response.state(), ResponseState::Error);
        assert_eq!(response.response_text(), Some("Pa"));
    }

    #[tokio::test]
    async fn test_streaming_error_skipped_removes_shape() {
        let client = ScriptedStream(vec![
            chunk("Pa"),
            Err(CompletionError::Backend("boom".to_string())),
        ]);
        let config = PromptConfig {
            on_error: OnError::Skip,
            ..PromptConfig::default()
        };
        let h = harness(client, config);

        assert_eq!(
            h.controller.submit_streaming("q").await,
            SubmitOutcome::Failed { shape: None }
        );
        assert!(h.store.borrow().is_empty());
    }

    /// Deletes every shape the moment the first chunk is requested.
    struct DeletingStream(Rc<RefCell<CanvasDocument>>);

    impl StreamingCompletionClient for DeletingStream {
        fn stream(
            &self,
            _request: AskRequest,
        ) -> LocalBoxStream<'_, CompletionResult<ResponseEvent>> {
            let store = self.0.clone();
            stream::once(async move {
                let ids: Vec<ShapeId> = store.borrow().z_order().to_vec();
                store.borrow_mut().remove_shapes(&ids).unwrap();
                chunk("late")
            })
            .chain(stream::iter(vec![Ok(ResponseEvent::Done)]))
            .boxed_local()
        }
    }

    #[tokio::test]
    async fn test_streaming_stops_when_shape_deleted() {
        let store = Rc::new(RefCell::new(CanvasDocument::new()));
        let viewport = Rc::new(RefCell::new(RecordingViewport::default()));
        let input = Rc::new(RefCell::new(PromptInput::default()));
        let controller = PromptController::new(
            store.clone(),
            DeletingStream(store.clone()),
            viewport,
            input,
            PromptConfig::default(),
        );

        assert_eq!(controller.submit_streaming("q").await, SubmitOutcome::Discarded);
        assert!(store.borrow().is_empty());
    }

    #[test]
    fn test_input_placement_and_focus() {
        let mut input = PromptInput::new("⌘ + K");
        assert_eq!(input.placement(true), InputPlacement::Centered);
        assert_eq!(input.placement(false), InputPlacement::Docked);
        assert!(!input.is_focused());
        input.focus();
        assert!(input.is_focused());
        assert_eq!(input.hint(), "⌘ + K");
        assert_eq!(input.placeholder(), "Ask anything...");
    }

    #[test]
    fn test_config_defaults_from_partial_json() {
        let config: PromptConfig = serde_json::from_str(r#"{"onError": "skip"}"#).unwrap();
        assert_eq!(config.on_error, OnError::Skip);
        assert_eq!(config.response_size(), Size::new(600.0, 300.0));
        assert_eq!(config.animation_duration(), Duration::from_millis(200));
        assert_eq!(config.stale_policy, StalePolicy::Apply);
    }
}
