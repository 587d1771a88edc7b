//! Workspace page and viewport control.
//!
//! Owns the single workspace rectangle and keeps the viewport fitted to the
//! container: explicit zoom commands, wheel zoom and throttled refits when
//! the container is resized.

use crate::canvas::{CanvasObject, ObjectKind, SharedCanvas};
use crate::editor::Host;
use crate::error::{EditorError, EditorResult};
use crate::events::EventPayload;
use crate::hooks::{HookName, HookOutcome, HookPayload};
use crate::input::{CanvasEvent, InputResponse};
use crate::plugin::{ApiArgs, ApiResponse, Plugin, PluginDescriptor, PluginInit, PluginType};
use crate::viewport::{self, Throttle};
use kurbo::{Affine, Rect, Size};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// CSS reference density used by 1:1 zoom.
pub const CSS_PIXELS_PER_INCH: f64 = 90.0;

/// Event emitted with the new workspace size.
pub const SIZE_CHANGE: &str = "sizeChange";

/// Workspace errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WorkspaceError {
    #[error("invalid workspace size: width {width:?}, height {height:?}, dpi {dpi:?}")]
    InvalidDimension {
        width: Option<f64>,
        height: Option<f64>,
        dpi: Option<f64>,
    },
    #[error("canvas has no workspace")]
    MissingWorkspace,
}

/// Workspace and zoom settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WorkspaceOptions {
    pub width: f64,
    pub height: f64,
    pub dpi: f64,
    /// Share of the container the workspace fills after a fit.
    pub fit_margin: f64,
    /// Zoom added or removed by `big` / `small`.
    pub zoom_step: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
    /// Zoom is multiplied by `wheel_base ^ delta_y` on wheel events.
    pub wheel_base: f64,
    pub resize_throttle_ms: u64,
}

impl Default for WorkspaceOptions {
    fn default() -> Self {
        Self {
            width: 900.0,
            height: 1200.0,
            dpi: 72.0,
            fit_margin: 0.9,
            zoom_step: 0.05,
            min_zoom: 0.01,
            max_zoom: 20.0,
            wheel_base: 0.999,
            resize_throttle_ms: 50,
        }
    }
}

fn valid(value: Option<f64>) -> bool {
    value.is_some_and(|v| v.is_finite() && v > 0.0)
}

/// Check a requested size, returning it when every part is a positive number.
fn checked_size(width: Option<f64>, height: Option<f64>, dpi: Option<f64>) -> Result<(f64, f64, f64), WorkspaceError> {
    match (width, height, dpi) {
        (Some(w), Some(h), Some(d)) if valid(width) && valid(height) && valid(dpi) => Ok((w, h, d)),
        _ => Err(WorkspaceError::InvalidDimension { width, height, dpi }),
    }
}

pub struct WorkspacePlugin {
    canvas: SharedCanvas,
    host: Host,
    options: WorkspaceOptions,
    resize: Throttle,
}

impl PluginType for WorkspacePlugin {
    const DESCRIPTOR: PluginDescriptor = PluginDescriptor {
        name: "WorkspacePlugin",
        events: &[SIZE_CHANGE],
        apis: &["big", "small", "auto", "one", "setSize", "getWorkspace", "setWorkspaceBg"],
        hotkeys: &[],
        hooks: &[HookName::ImportAfter, HookName::SaveAfter],
    };

    type Options = WorkspaceOptions;

    fn create(init: PluginInit, options: WorkspaceOptions) -> EditorResult<Self> {
        checked_size(Some(options.width), Some(options.height), Some(options.dpi))?;
        let mut plugin = Self {
            canvas: init.canvas,
            host: init.host,
            resize: Throttle::new(Duration::from_millis(options.resize_throttle_ms)),
            options,
        };
        plugin.init_background();
        plugin.init_workspace();
        plugin.auto()?;
        Ok(plugin)
    }
}

impl WorkspacePlugin {
    pub fn options(&self) -> &WorkspaceOptions {
        &self.options
    }

    pub fn zoom(&self) -> f64 {
        self.canvas.borrow().zoom()
    }

    /// Size the drawing surface to the container.
    fn init_background(&self) {
        let mut canvas = self.canvas.borrow_mut();
        let container = canvas.container_size();
        canvas.set_dimensions(container);
    }

    fn init_workspace(&self) {
        let mut canvas = self.canvas.borrow_mut();
        match canvas.workspace_mut() {
            Some(workspace) => {
                workspace.selectable = false;
                workspace.has_controls = false;
            }
            None => {
                let WorkspaceOptions { width, height, dpi, .. } = self.options;
                canvas.add(CanvasObject::workspace(width, height, dpi));
            }
        }
        canvas.request_render();
    }

    /// Bounds of the workspace rectangle in world coordinates.
    pub fn workspace_bounds(&self) -> Result<Rect, WorkspaceError> {
        let canvas = self.canvas.borrow();
        canvas
            .workspace()
            .map(CanvasObject::bounds)
            .ok_or(WorkspaceError::MissingWorkspace)
    }

    /// Resize the workspace, then zoom 1:1. Nothing changes when the size is invalid.
    pub fn set_size(&mut self, width: Option<f64>, height: Option<f64>, dpi: Option<f64>) -> Result<(), WorkspaceError> {
        let (width, height, dpi) = checked_size(width, height, dpi)?;
        if self.canvas.borrow().workspace().is_none() {
            return Err(WorkspaceError::MissingWorkspace);
        }
        log::debug!("workspace size {}x{} @ {} dpi", width, height, dpi);

        self.init_background();
        self.options.width = width;
        self.options.height = height;
        self.options.dpi = dpi;
        if let Some(workspace) = self.canvas.borrow_mut().workspace_mut() {
            workspace.width = width;
            workspace.height = height;
            workspace.kind = ObjectKind::Workspace { dpi };
        }
        self.emit_size(width, height, dpi);
        self.one()
    }

    fn emit_size(&self, width: f64, height: f64, dpi: f64) {
        self.host.emit(SIZE_CHANGE, EventPayload::SizeChange { width, height, dpi });
    }

    /// Reset the viewport to `scale`, centered on the workspace and clipped to it.
    pub fn set_zoom_auto(&mut self, scale: f64) -> Result<(), WorkspaceError> {
        let mut canvas = self.canvas.borrow_mut();
        let container = canvas.container_size();
        canvas.set_dimensions(container);
        let center = canvas.center();
        let (workspace_center, bounds) = canvas
            .workspace()
            .map(|workspace| (workspace.center(), workspace.bounds()))
            .ok_or(WorkspaceError::MissingWorkspace)?;

        let transform = viewport::zoom_to_point(Affine::IDENTITY, center, scale);
        let transform = viewport::center_on(transform, workspace_center, container);
        canvas.set_viewport_transform(transform);
        canvas.set_clip_rect(Some(bounds));
        canvas.request_render();
        Ok(())
    }

    /// Fit the workspace inside the container, leaving a margin.
    pub fn auto(&mut self) -> Result<(), WorkspaceError> {
        let scale = {
            let canvas = self.canvas.borrow();
            let workspace = canvas.workspace().ok_or(WorkspaceError::MissingWorkspace)?;
            viewport::scale_to_fit(Size::new(workspace.width, workspace.height), canvas.container_size())
        };
        self.set_zoom_auto(scale * self.options.fit_margin)
    }

    /// Zoom so the workspace shows at roughly its physical size.
    pub fn one(&mut self) -> Result<(), WorkspaceError> {
        let dpi = {
            let canvas = self.canvas.borrow();
            let workspace = canvas.workspace().ok_or(WorkspaceError::MissingWorkspace)?;
            workspace.dpi().unwrap_or(self.options.dpi)
        };
        self.set_zoom_auto(CSS_PIXELS_PER_INCH / dpi)
    }

    /// Zoom around the middle of the drawing surface.
    fn zoom_centered(&self, zoom: f64) {
        let mut canvas = self.canvas.borrow_mut();
        let center = canvas.center();
        let transform = viewport::zoom_to_point(canvas.viewport_transform(), center, zoom);
        canvas.set_viewport_transform(transform);
        canvas.request_render();
    }

    pub fn big(&mut self) {
        let zoom = self.zoom() + self.options.zoom_step;
        self.zoom_centered(zoom);
    }

    pub fn small(&mut self) {
        let zoom = self.zoom() - self.options.zoom_step;
        self.zoom_centered(zoom.max(self.options.min_zoom));
    }

    /// Apply one wheel step.
    pub fn wheel(&mut self, delta_y: f64) -> InputResponse {
        let WorkspaceOptions {
            wheel_base,
            min_zoom,
            max_zoom,
            ..
        } = self.options;
        let zoom = viewport::wheel_zoom(self.zoom(), delta_y, wheel_base, min_zoom, max_zoom);
        self.zoom_centered(zoom);
        InputResponse::consumed()
    }

    pub fn set_workspace_bg(&mut self, color: &str) -> Result<(), WorkspaceError> {
        let mut canvas = self.canvas.borrow_mut();
        let workspace = canvas.workspace_mut().ok_or(WorkspaceError::MissingWorkspace)?;
        workspace.fill = Some(color.to_string());
        canvas.request_render();
        Ok(())
    }

    fn refit(&mut self) {
        if let Err(err) = self.auto() {
            log::warn!("refit after resize failed: {}", err);
        }
    }

    /// Re-apply the size of a freshly imported workspace.
    fn after_import(&mut self) -> Result<(), WorkspaceError> {
        let size = {
            let mut canvas = self.canvas.borrow_mut();
            match canvas.workspace_mut() {
                Some(workspace) => {
                    workspace.selectable = false;
                    workspace.has_controls = false;
                    Some((workspace.width, workspace.height, workspace.dpi()))
                }
                None => None,
            }
        };
        match size {
            Some((width, height, dpi)) => {
                self.set_size(Some(width), Some(height), dpi)?;
                self.emit_size(width, height, dpi.unwrap_or(self.options.dpi));
            }
            None => {
                log::warn!("imported document has no workspace, adding one");
                self.init_workspace();
                self.auto()?;
            }
        }
        Ok(())
    }
}

impl Plugin for WorkspacePlugin {
    fn call_api(&mut self, api: &str, args: &ApiArgs) -> EditorResult<ApiResponse> {
        match api {
            "big" => self.big(),
            "small" => self.small(),
            "auto" => self.auto()?,
            "one" => self.one()?,
            "setSize" => self.set_size(args.f64(0), args.f64(1), args.f64(2))?,
            "getWorkspace" => {
                let canvas = self.canvas.borrow();
                let record = match canvas.workspace() {
                    Some(workspace) => serde_json::to_value(workspace.to_record())
                        .map_err(crate::document::DocumentError::from)?,
                    None => Value::Null,
                };
                return Ok(ApiResponse::Value(record));
            }
            "setWorkspaceBg" => {
                let color = args
                    .str(0)
                    .ok_or_else(|| EditorError::invalid_argument(api, "expected a color string"))?;
                self.set_workspace_bg(color)?;
            }
            _ => return Err(EditorError::UnknownApi(api.to_string())),
        }
        Ok(ApiResponse::unit())
    }

    fn hook(&mut self, hook: HookName, _payload: &HookPayload) -> HookOutcome {
        match hook {
            HookName::ImportAfter => match self.after_import() {
                Ok(()) => HookOutcome::done(),
                Err(err) => HookOutcome::fail(err.to_string()),
            },
            _ => HookOutcome::done(),
        }
    }

    fn on_canvas_event(&mut self, event: &CanvasEvent) -> InputResponse {
        match event {
            CanvasEvent::ContainerResized { at, .. } => {
                if self.resize.call(*at) {
                    self.refit();
                }
                InputResponse::default()
            }
            CanvasEvent::Frame { at } => {
                if self.resize.flush(*at) {
                    self.refit();
                }
                InputResponse::default()
            }
            CanvasEvent::Wheel { delta_y, .. } => self.wheel(*delta_y),
            CanvasEvent::SelectionChanged => InputResponse::default(),
        }
    }

    fn destroy(&mut self) {
        log::debug!("workspace plugin destroyed");
    }
}
