//! Whiteboard: wires the document, camera, prompt and shortcuts together.

use crate::auto_frame::{AutoFrameEngine, AutoFrameOutcome};
use crate::camera::Camera;
use crate::config::BoardConfig;
use crate::guard::install_guards;
use crate::prompt::{InputPlacement, PromptController, PromptInput};
use crate::shortcuts::{BoardAction, KeyChord, Platform, ShortcutRegistry};
use crate::store::{CanvasDocument, StoreResult};
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

/// What a board action did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    FocusedPrompt,
    AutoFrame(AutoFrameOutcome),
    /// Whether there was anything to undo.
    Undo(bool),
    Redo(bool),
}

/// One open board. Owns the shared handles every controller works through.
pub struct Whiteboard<C> {
    store: Rc<RefCell<CanvasDocument>>,
    camera: Rc<RefCell<Camera>>,
    input: Rc<RefCell<PromptInput>>,
    shortcuts: ShortcutRegistry,
    auto_frame: AutoFrameEngine,
    prompt: PromptController<CanvasDocument, C, Camera>,
}

impl<C> Whiteboard<C> {
    pub fn new(
        mut document: CanvasDocument,
        client: C,
        config: BoardConfig,
        platform: Platform,
    ) -> Self {
        install_guards(&mut document);

        let shortcuts = ShortcutRegistry::new(platform);
        let hint = shortcuts.label(BoardAction::FocusPrompt).unwrap_or_default();

        let store = Rc::new(RefCell::new(document));
        let camera = Rc::new(RefCell::new(Camera::new(config.viewport.size())));
        let input = Rc::new(RefCell::new(PromptInput::new(hint)));
        let prompt = PromptController::new(
            store.clone(),
            client,
            camera.clone(),
            input.clone(),
            config.prompt.clone(),
        );

        Self {
            store,
            camera,
            input,
            shortcuts,
            auto_frame: config.auto_frame_engine(),
            prompt,
        }
    }

    pub fn store(&self) -> &Rc<RefCell<CanvasDocument>> {
        &self.store
    }

    pub fn camera(&self) -> &Rc<RefCell<Camera>> {
        &self.camera
    }

    pub fn input(&self) -> &Rc<RefCell<PromptInput>> {
        &self.input
    }

    pub fn prompt(&self) -> &PromptController<CanvasDocument, C, Camera> {
        &self.prompt
    }

    pub fn shortcuts(&self) -> &ShortcutRegistry {
        &self.shortcuts
    }

    pub fn input_placement(&self) -> InputPlacement {
        let empty = self.store.borrow().is_empty();
        self.input.borrow().placement(empty)
    }

    /// Dispatch a key press. `None` if no shortcut is bound to it.
    pub fn handle_chord(&self, chord: &KeyChord) -> Option<StoreResult<ActionOutcome>> {
        let action = self.shortcuts.resolve(chord)?;
        log::debug!("Shortcut {:?} -> {:?}", chord.key, action);
        Some(self.perform(action))
    }

    pub fn perform(&self, action: BoardAction) -> StoreResult<ActionOutcome> {
        match action {
            BoardAction::FocusPrompt => {
                self.input.borrow_mut().focus();
                Ok(ActionOutcome::FocusedPrompt)
            }
            BoardAction::AutoFrame => {
                let mut store = self.store.borrow_mut();
                let outcome = self.auto_frame.auto_frame_selection(&mut *store)?;
                Ok(ActionOutcome::AutoFrame(outcome))
            }
            BoardAction::Undo => Ok(ActionOutcome::Undo(self.store.borrow_mut().undo())),
            BoardAction::Redo => Ok(ActionOutcome::Redo(self.store.borrow_mut().redo())),
        }
    }

    /// Advance camera animation. Returns true while a redraw is needed.
    pub fn tick(&self, dt: Duration) -> bool {
        self.camera.borrow_mut().tick(dt)
    }
}
