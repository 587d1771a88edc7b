//! Editor-level errors.

use crate::canvas::CanvasError;
use crate::document::DocumentError;
use crate::export::ExportError;
use crate::hooks::HookError;
use crate::plugins::workspace::WorkspaceError;
use crate::services::ServiceError;
use thiserror::Error;

/// Fatal setup errors raised while composing plugins into the editor.
///
/// None of these leave a half-registered plugin behind: validation runs
/// before the registry, the hook pipeline or the API table are touched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("plugin {0} is already registered")]
    DuplicatePlugin(String),
    #[error("plugin {plugin} declares event {event}, already claimed by {owner}")]
    DuplicateEvent {
        plugin: String,
        event: String,
        owner: String,
    },
    #[error("plugin {plugin} declares api {api}, already claimed by {owner}")]
    DuplicateApi {
        plugin: String,
        api: String,
        owner: String,
    },
    #[error("no canvas is bound to the editor")]
    CanvasNotBound,
}

/// Errors surfaced by the editor and its API dispatch.
#[derive(Debug, Error)]
pub enum EditorError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    Workspace(#[from] WorkspaceError),
    #[error(transparent)]
    Hook(#[from] HookError),
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error(transparent)]
    Canvas(#[from] CanvasError),
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error("no plugin provides api {0}")]
    UnknownApi(String),
    #[error("invalid argument for {api}: {reason}")]
    InvalidArgument { api: String, reason: String },
    #[error("plugin {0} is busy")]
    PluginBusy(String),
    #[error("plugin {0} not found or has another type")]
    PluginNotFound(String),
    #[error("editor is not initialized")]
    NotInitialized,
}

impl EditorError {
    pub(crate) fn invalid_argument(api: &str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            api: api.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type for editor operations.
pub type EditorResult<T> = Result<T, EditorError>;
