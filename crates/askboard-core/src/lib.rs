//! Askboard Core Library
//!
//! Shape lifecycle and spatial composition engine for a whiteboard that puts
//! AI answers next to hand-drawn content.

pub mod auto_frame;
pub mod board;
pub mod camera;
pub mod completion;
pub mod config;
pub mod geometry;
pub mod guard;
pub mod prompt;
pub mod shapes;
pub mod shortcuts;
pub mod store;

pub use auto_frame::{AutoFrameEngine, AutoFrameOutcome, DEFAULT_FRAME_MARGIN};
pub use board::{ActionOutcome, Whiteboard};
pub use camera::{Camera, Viewport};
pub use completion::{
    AskRequest, CompletionClient, CompletionError, ResponseEvent, SseCompletion,
    StreamingCompletionClient,
};
pub use config::{BoardConfig, ConfigError};
pub use geometry::{GeometryError, pad, union_bounds};
pub use prompt::{
    OnError, PromptConfig, PromptController, PromptInput, StalePolicy, SubmitOutcome,
};
pub use shapes::{ResponseState, Shape, ShapeId, ShapeKind, ShapeMeta, ShapeSpec, TextResponse};
pub use shortcuts::{BoardAction, KeyChord, Modifiers, Platform, ShortcutRegistry};
pub use store::{CanvasDocument, ChangeBatch, ShapeStore, StoreError};
