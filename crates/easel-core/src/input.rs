//! Input events delivered to the editor by its host environment.

use kurbo::{Point, Size};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Mouse button identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

/// Modifier keys state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    /// Command on macOS, the Windows key elsewhere.
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        ctrl: false,
        alt: false,
        meta: false,
    };

    pub fn ctrl() -> Self {
        Self { ctrl: true, ..Self::NONE }
    }

    pub fn meta() -> Self {
        Self { meta: true, ..Self::NONE }
    }
}

/// Pointer events in canvas-element coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PointerEvent {
    Down { position: Point, button: MouseButton },
    Up { position: Point, button: MouseButton },
    Move { position: Point },
    Wheel { position: Point, delta_y: f64 },
}

/// Key transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyPhase {
    Down,
    Up,
}

/// A keyboard event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEvent {
    /// Key name as reported by the platform ("c", "Escape", "ArrowLeft").
    pub key: String,
    pub modifiers: Modifiers,
    pub phase: KeyPhase,
}

impl KeyEvent {
    pub fn down(key: impl Into<String>, modifiers: Modifiers) -> Self {
        Self {
            key: key.into(),
            modifiers,
            phase: KeyPhase::Down,
        }
    }

    pub fn up(key: impl Into<String>, modifiers: Modifiers) -> Self {
        Self {
            key: key.into(),
            modifiers,
            phase: KeyPhase::Up,
        }
    }

    pub fn is_down(&self) -> bool {
        self.phase == KeyPhase::Down
    }
}

/// Canvas-level notifications forwarded to every plugin.
#[derive(Debug, Clone, PartialEq)]
pub enum CanvasEvent {
    /// The active selection was created, updated or cleared.
    SelectionChanged,
    /// The element hosting the canvas changed size.
    ContainerResized { size: Size, at: Instant },
    /// Animation-frame tick; lets throttled work run its trailing call.
    Frame { at: Instant },
    /// Scroll wheel over the canvas.
    Wheel { position: Point, delta_y: f64 },
}

/// What the host should do with the originating platform event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputResponse {
    pub prevent_default: bool,
    pub stop_propagation: bool,
}

impl InputResponse {
    /// The event was fully handled by the canvas.
    pub fn consumed() -> Self {
        Self {
            prevent_default: true,
            stop_propagation: true,
        }
    }

    /// Combine two responses; any request to suppress wins.
    pub fn merge(self, other: InputResponse) -> Self {
        Self {
            prevent_default: self.prevent_default || other.prevent_default,
            stop_propagation: self.stop_propagation || other.stop_propagation,
        }
    }
}
