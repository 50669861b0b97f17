//! Keyboard shortcut registry and documentation.

use std::fmt;

/// Host platform, which decides the primary modifier key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Platform {
    /// Command (⌘) is primary.
    Mac,
    /// Ctrl is primary.
    #[default]
    Other,
}

impl Platform {
    /// Platform of the running binary.
    pub fn current() -> Self {
        if cfg!(target_os = "macos") || cfg!(target_os = "ios") {
            Platform::Mac
        } else {
            Platform::Other
        }
    }

    /// Label of the primary modifier key.
    pub fn primary_label(self) -> &'static str {
        match self {
            Platform::Mac => "⌘",
            Platform::Other => "Ctrl",
        }
    }
}

/// Keyboard modifier state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    /// Only the platform's primary modifier held.
    pub fn primary(platform: Platform) -> Self {
        match platform {
            Platform::Mac => Self {
                meta: true,
                ..Self::default()
            },
            Platform::Other => Self {
                ctrl: true,
                ..Self::default()
            },
        }
    }

    pub fn with_shift(mut self) -> Self {
        self.shift = true;
        self
    }

    fn primary_held(self, platform: Platform) -> bool {
        match platform {
            Platform::Mac => self.meta && !self.ctrl,
            Platform::Other => self.ctrl && !self.meta,
        }
    }
}

/// A key press with its modifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyChord {
    pub key: String,
    pub modifiers: Modifiers,
}

impl KeyChord {
    pub fn new(key: impl Into<String>, modifiers: Modifiers) -> Self {
        Self {
            key: key.into(),
            modifiers,
        }
    }
}

/// Board-level actions reachable from the keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoardAction {
    FocusPrompt,
    AutoFrame,
    Undo,
    Redo,
}

impl fmt::Display for BoardAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BoardAction::FocusPrompt => "Focus the prompt input",
            BoardAction::AutoFrame => "Frame selected handwriting",
            BoardAction::Undo => "Undo",
            BoardAction::Redo => "Redo",
        };
        f.write_str(name)
    }
}

/// A keyboard shortcut definition. `primary` means ⌘ on macOS, Ctrl elsewhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shortcut {
    pub key: &'static str,
    pub primary: bool,
    pub shift: bool,
    pub action: BoardAction,
}

impl Shortcut {
    pub const fn new(key: &'static str, primary: bool, shift: bool, action: BoardAction) -> Self {
        Self {
            key,
            primary,
            shift,
            action,
        }
    }

    /// Format the shortcut for display (e.g., "⌘ + K").
    pub fn format(&self, platform: Platform) -> String {
        let mut parts = Vec::new();
        if self.primary {
            parts.push(platform.primary_label());
        }
        if self.shift {
            parts.push("Shift");
        }
        parts.push(self.key);
        parts.join(" + ")
    }

    fn matches(&self, chord: &KeyChord, platform: Platform) -> bool {
        let mods = chord.modifiers;
        chord.key.eq_ignore_ascii_case(self.key)
            && mods.primary_held(platform) == self.primary
            && mods.shift == self.shift
            && !mods.alt
    }
}

/// Shortcuts of the board for one platform.
#[derive(Debug, Clone)]
pub struct ShortcutRegistry {
    platform: Platform,
    shortcuts: Vec<Shortcut>,
}

impl ShortcutRegistry {
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            shortcuts: vec![
                Shortcut::new("K", true, false, BoardAction::FocusPrompt),
                Shortcut::new("F", true, true, BoardAction::AutoFrame),
                Shortcut::new("Z", true, false, BoardAction::Undo),
                Shortcut::new("Z", true, true, BoardAction::Redo),
            ],
        }
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn all(&self) -> &[Shortcut] {
        &self.shortcuts
    }

    /// Action bound to `chord`, if any.
    pub fn resolve(&self, chord: &KeyChord) -> Option<BoardAction> {
        self.shortcuts
            .iter()
            .find(|s| s.matches(chord, self.platform))
            .map(|s| s.action)
    }

    /// Display label of the first shortcut bound to `action`.
    pub fn label(&self, action: BoardAction) -> Option<String> {
        self.shortcuts
            .iter()
            .find(|s| s.action == action)
            .map(|s| s.format(self.platform))
    }

    /// One line per shortcut, for help output.
    pub fn describe(&self) -> Vec<String> {
        self.shortcuts
            .iter()
            .map(|s| format!("{:20} {}", s.format(self.platform), s.action))
            .collect()
    }
}

impl Default for ShortcutRegistry {
    fn default() -> Self {
        Self::new(Platform::current())
    }
}
