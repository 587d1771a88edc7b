//! Easel Core Library
//!
//! Plugin host for a graphic-design canvas: the hook pipeline, the plugin
//! registry, the context menu aggregator and the workspace viewport, plus the
//! collaborator traits the host talks to and the built-in plugins.

pub mod canvas;
pub mod config;
pub mod document;
pub mod editor;
pub mod error;
pub mod events;
pub mod export;
pub mod hooks;
pub mod hotkeys;
pub mod input;
pub mod menu;
pub mod plugin;
pub mod plugins;
pub mod services;
pub mod viewport;

pub use canvas::{Canvas, CanvasError, CanvasObject, ObjectKind, Scene, SharedCanvas};
pub use config::{ConfigError, EditorConfig};
pub use document::{DocumentError, ObjectRecord, ProjectFile, SceneDocument};
pub use editor::{Editor, Host};
pub use error::{ConfigurationError, EditorError, EditorResult};
pub use events::{EventBus, EventPayload};
pub use hooks::{HookError, HookName, HookOutcome, HookPayload, HookPipeline};
pub use hotkeys::Hotkey;
pub use input::{CanvasEvent, InputResponse, KeyEvent, KeyPhase, Modifiers, MouseButton, PointerEvent};
pub use menu::{ContextMenu, MenuAction, MenuItem};
pub use plugin::{ApiArgs, ApiResponse, Plugin, PluginDescriptor, PluginInit, PluginRegistry, PluginType};
pub use plugins::{CopyPlugin, DocumentPlugin, RulerPlugin, SelectPlugin, WorkspacePlugin};
pub use services::{Clipboard, ClipboardEntry, FileService, PickedFile, Printer, ServiceError, Services};
