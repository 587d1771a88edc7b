//! Import, export, clipboard, printing and selection notifications.
//!
//! Registered by [`Editor::init`](crate::Editor::init) on every editor.

use crate::canvas::{Canvas, CanvasObject, ObjectKind, SharedCanvas};
use crate::document::{DEFAULT_DPI, ObjectRecord, ProjectFile, normalize_text_types};
use crate::editor::Host;
use crate::error::{EditorError, EditorResult};
use crate::events::EventPayload;
use crate::export;
use crate::hooks::{HookName, HookPayload, LocalBoxFuture};
use crate::input::{CanvasEvent, InputResponse};
use crate::plugin::{ApiArgs, ApiResponse, Plugin, PluginDescriptor, PluginInit, PluginType};
use crate::plugins::workspace::WorkspaceError;
use kurbo::{Point, Rect};
use serde_json::Value;

pub const SELECT_ONE: &str = "selectOne";
pub const SELECT_MULTIPLE: &str = "selectMultiple";
pub const SELECT_CANCEL: &str = "selectCancel";
/// Emitted after a project finished loading.
pub const LOAD_JSON: &str = "loadJson";

/// Shape of the current selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SelectMode {
    #[default]
    Empty,
    One,
    Multiple,
}

impl SelectMode {
    pub fn as_str(self) -> &'static str {
        match self {
            SelectMode::Empty => "",
            SelectMode::One => "one",
            SelectMode::Multiple => "multiple",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExportFormat {
    Svg,
    Png,
    /// PNG carrying the workspace DPI.
    PrintPng,
}

pub struct DocumentPlugin {
    canvas: SharedCanvas,
    host: Host,
    select_mode: SelectMode,
}

impl PluginType for DocumentPlugin {
    const DESCRIPTOR: PluginDescriptor = PluginDescriptor {
        name: "DocumentPlugin",
        events: &[SELECT_ONE, SELECT_MULTIPLE, SELECT_CANCEL],
        apis: &[
            "insert",
            "loadJSON",
            "getJson",
            "dragAddItem",
            "clipboard",
            "clipboardBase64",
            "saveJson",
            "saveSvg",
            "saveImg",
            "clear",
            "preview",
            "print",
            "addImgByElement",
            "getImageExtension",
            "getSelectMode",
        ],
        hotkeys: &[],
        hooks: &[],
    };

    type Options = ();

    fn create(init: PluginInit, _options: ()) -> EditorResult<Self> {
        Ok(Self {
            canvas: init.canvas,
            host: init.host,
            select_mode: SelectMode::default(),
        })
    }
}

/// Workspace bounds and DPI, the region every export covers.
fn workspace_region(canvas: &dyn Canvas) -> Result<(Rect, f64), WorkspaceError> {
    let workspace = canvas.workspace().ok_or(WorkspaceError::MissingWorkspace)?;
    Ok((workspace.bounds(), workspace.dpi().unwrap_or(DEFAULT_DPI)))
}

/// Last `.` separated part of the last path segment of `url`.
pub fn image_extension(url: &str) -> &str {
    let file_name = url.rsplit('/').next().unwrap_or(url);
    file_name.rsplit('.').next().unwrap_or(file_name)
}

/// Parse, load and announce a project.
pub async fn load_project(canvas: SharedCanvas, host: Host, project: Value) -> EditorResult<()> {
    let mut project = ProjectFile::from_value(project)?;
    let assigned = project.assign_missing_ids();
    let document = project.canvas.to_json_string()?;
    log::debug!("loading project, {} id(s) assigned", assigned);

    host.run_hook(HookName::ImportBefore, HookPayload::Document(document.clone()))
        .await?;
    {
        let mut canvas = canvas.borrow_mut();
        canvas.load_document(project.canvas)?;
        if let Some(workspace) = canvas.workspace_mut() {
            workspace.kind = ObjectKind::Workspace { dpi: project.meta.dpi };
        }
        canvas.request_render();
    }
    host.run_hook(HookName::ImportAfter, HookPayload::Document(document))
        .await?;
    canvas.borrow_mut().request_render();
    host.emit(LOAD_JSON, EventPayload::None);
    Ok(())
}

/// Export the workspace between the save hooks. Returns the data URI.
async fn export_workspace(canvas: SharedCanvas, host: Host, format: ExportFormat) -> EditorResult<String> {
    host.run_hook(HookName::SaveBefore, HookPayload::Empty).await?;
    let exported = render(&*canvas.borrow(), format);
    match exported {
        Ok(uri) => {
            host.run_hook(HookName::SaveAfter, HookPayload::Output(uri.clone()))
                .await?;
            Ok(uri)
        }
        Err(err) => {
            // Let taps undo what they did before the export.
            if let Err(hook_err) = host.run_hook(HookName::SaveAfter, HookPayload::Empty).await {
                log::warn!("save hooks failed after export error: {}", hook_err);
            }
            Err(err)
        }
    }
}

fn render(canvas: &dyn Canvas, format: ExportFormat) -> EditorResult<String> {
    let (region, dpi) = workspace_region(canvas)?;
    let uri = match format {
        ExportFormat::Svg => export::svg_data_uri(&canvas.export_svg(region)?),
        ExportFormat::Png => export::png_data_uri(&canvas.export_png(region)?),
        ExportFormat::PrintPng => {
            let png_data = export::stamp_png_dpi(&canvas.export_png(region)?, dpi)?;
            export::png_data_uri(&png_data)
        }
    };
    Ok(uri)
}

impl DocumentPlugin {
    pub fn select_mode(&self) -> SelectMode {
        self.select_mode
    }

    /// Canvas document as JSON.
    pub fn json(&self) -> EditorResult<Value> {
        let document = self.canvas.borrow().to_document();
        Ok(serde_json::to_value(document).map_err(crate::document::DocumentError::from)?)
    }

    /// Project file of the current canvas, ready to be saved.
    pub fn project(&self) -> ProjectFile {
        let canvas = self.canvas.borrow();
        let dpi = canvas.workspace().and_then(CanvasObject::dpi).unwrap_or(DEFAULT_DPI);
        let mut project = ProjectFile::new(canvas.to_document(), dpi);
        normalize_text_types(&mut project.canvas.objects);
        project
    }

    fn save_json(&self) -> EditorResult<String> {
        let uri = export::json_data_uri(&self.project().to_pretty_json()?);
        self.host.services()?.files.borrow_mut().download(&uri, "json")?;
        Ok(uri)
    }

    fn copy_to_clipboard(host: &Host, text: &str) {
        let result = match host.services() {
            Ok(services) => services.clipboard.borrow_mut().write_text(text).map_err(EditorError::from),
            Err(err) => Err(err),
        };
        if let Err(err) = result {
            log::warn!("clipboard write failed: {}", err);
        }
    }

    fn clipboard(&self) -> EditorResult<()> {
        let document = self.canvas.borrow().to_document();
        let mut out = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"\t");
        let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
        serde::Serialize::serialize(&document, &mut serializer).map_err(crate::document::DocumentError::from)?;
        Self::copy_to_clipboard(&self.host, &String::from_utf8_lossy(&out));
        Ok(())
    }

    /// Add `record` to the canvas, positioned under `point` when given.
    fn drag_add_item(&mut self, record: Value, point: Option<Point>) -> EditorResult<Value> {
        let mut record: ObjectRecord = serde_json::from_value(record).map_err(crate::document::DocumentError::from)?;
        record.ensure_id();
        let object = CanvasObject::try_from(record)?;
        if object.is_workspace() {
            return Err(EditorError::invalid_argument("dragAddItem", "cannot add a workspace"));
        }
        Ok(self.place_item(object, point).map_or(Value::Null, Value::String))
    }

    /// Add `object` scaled to half the workspace width. A drop `point` is in
    /// canvas element pixels; drops outside the element add nothing.
    fn place_item(&mut self, mut object: CanvasObject, point: Option<Point>) -> Option<String> {
        let mut canvas = self.canvas.borrow_mut();
        if let Some(point) = point {
            let size = canvas.dimensions();
            if point.x < 0.0 || point.y < 0.0 || point.x > size.width || point.y > size.height {
                log::debug!("drop at {:?} is outside the canvas, ignored", point);
                return None;
            }
            let world = crate::viewport::screen_to_world(canvas.viewport_transform(), point);
            object.left = world.x - object.width / 2.0;
            object.top = world.y;
        }
        if let Some(workspace) = canvas.workspace() {
            object.scale_to_width(workspace.width / 2.0);
        }
        let id = object.id.clone();
        canvas.add(object);
        canvas.request_render();
        Some(id)
    }

    /// Add the image at `src`. SVG sources become a group, anything else an
    /// image placed at (100, 100). PNG data URIs carry their own size; other
    /// sources need `size`.
    fn add_image(&mut self, src: &str, size: Option<(f64, f64)>) -> EditorResult<Value> {
        let inline = src.starts_with("data:").then(|| export::decode_data_uri(src)).transpose()?;
        let is_svg = match &inline {
            Some((mime, _)) => mime == "image/svg+xml",
            None => image_extension(src).eq_ignore_ascii_case("svg"),
        };
        let size = match (size, &inline) {
            (Some(size), _) => size,
            (None, Some((mime, data))) if mime == "image/png" => {
                let reader = png::Decoder::new(data.as_slice())
                    .read_info()
                    .map_err(export::ExportError::from)?;
                let info = reader.info();
                (info.width as f64, info.height as f64)
            }
            _ => return Err(EditorError::invalid_argument("addImgByElement", "image size is unknown")),
        };
        if !(size.0 > 0.0 && size.1 > 0.0) {
            return Err(EditorError::invalid_argument("addImgByElement", "image size must be positive"));
        }

        let origin = if is_svg { Point::ZERO } else { Point::new(100.0, 100.0) };
        let (type_name, name) = if is_svg { ("group", "svg element") } else { ("image", "image") };
        let mut object = CanvasObject::drawable(type_name, Rect::from_origin_size(origin, size));
        object.name = Some(name.to_string());
        object.extra.insert("src".to_string(), Value::String(src.to_string()));
        Ok(self.place_item(object, None).map_or(Value::Null, Value::String))
    }

    fn clear(&mut self) -> EditorResult<()> {
        {
            let mut canvas = self.canvas.borrow_mut();
            let ids: Vec<String> = canvas
                .objects()
                .iter()
                .filter(|object| !object.is_workspace())
                .map(|object| object.id.clone())
                .collect();
            for id in ids {
                canvas.remove(&id);
            }
        }
        if self.host.has_api("setWorkspaceBg") {
            self.host
                .dispatch("setWorkspaceBg", ApiArgs::from(vec![Value::from("#fff")]))?;
        } else if let Some(workspace) = self.canvas.borrow_mut().workspace_mut() {
            workspace.fill = Some("#fff".to_string());
        }
        let mut canvas = self.canvas.borrow_mut();
        canvas.discard_active();
        canvas.request_render();
        Ok(())
    }

    fn emit_selection(&mut self) {
        let ids: Vec<String> = self
            .canvas
            .borrow()
            .active_objects()
            .into_iter()
            .filter(|object| !object.is_guideline())
            .map(|object| object.id.clone())
            .collect();
        let (mode, event) = match ids.len() {
            0 => (SelectMode::Empty, SELECT_CANCEL),
            1 => (SelectMode::One, SELECT_ONE),
            _ => (SelectMode::Multiple, SELECT_MULTIPLE),
        };
        self.select_mode = mode;
        let payload = if ids.is_empty() {
            EventPayload::None
        } else {
            EventPayload::Selection(ids)
        };
        self.host.emit(event, payload);
    }

    fn export(&self, format: ExportFormat) -> LocalBoxFuture<'static, EditorResult<String>> {
        Box::pin(export_workspace(self.canvas.clone(), self.host.clone(), format))
    }
}

fn point_arg(args: &ApiArgs, index: usize) -> Option<Point> {
    let value = args.get(index)?;
    Some(Point::new(value.get("x")?.as_f64()?, value.get("y")?.as_f64()?))
}

/// Image source, either a bare string or `{ src, width, height }`.
fn image_arg(args: &ApiArgs) -> Option<(String, Option<(f64, f64)>)> {
    match args.get(0)? {
        Value::String(src) => Some((src.clone(), None)),
        value => {
            let src = value.get("src")?.as_str()?.to_string();
            let size = value
                .get("width")
                .and_then(Value::as_f64)
                .zip(value.get("height").and_then(Value::as_f64));
            Some((src, size))
        }
    }
}

impl Plugin for DocumentPlugin {
    fn call_api(&mut self, api: &str, args: &ApiArgs) -> EditorResult<ApiResponse> {
        let host = self.host.clone();
        let canvas = self.canvas.clone();
        let response = match api {
            "insert" => ApiResponse::deferred(async move {
                let picked = match host.services() {
                    Ok(services) => services.files.borrow_mut().pick_files(".json").map_err(EditorError::from),
                    Err(err) => Err(err),
                };
                let file = match picked {
                    Ok(files) => files.into_iter().next(),
                    Err(err) => {
                        log::warn!("file pick failed: {}", err);
                        None
                    }
                };
                let Some(file) = file else {
                    return Ok(Value::Null);
                };
                let text = match String::from_utf8(file.contents) {
                    Ok(text) => text,
                    Err(err) => {
                        log::warn!("{} is not UTF-8: {}", file.name, err);
                        return Ok(Value::Null);
                    }
                };
                match load_project(canvas, host, Value::String(text)).await {
                    Ok(()) => Ok(Value::String(file.name)),
                    Err(EditorError::Document(err)) => {
                        log::warn!("could not read {}: {}", file.name, err);
                        Ok(Value::Null)
                    }
                    Err(err) => Err(err),
                }
            }),
            "loadJSON" => {
                let project = args
                    .get(0)
                    .cloned()
                    .ok_or_else(|| EditorError::invalid_argument(api, "expected a project"))?;
                ApiResponse::deferred(async move {
                    load_project(canvas, host, project).await?;
                    Ok(Value::Null)
                })
            }
            "getJson" => ApiResponse::Value(self.json()?),
            "dragAddItem" => {
                let item = args
                    .get(0)
                    .cloned()
                    .ok_or_else(|| EditorError::invalid_argument(api, "expected an object"))?;
                ApiResponse::Value(self.drag_add_item(item, point_arg(args, 1))?)
            }
            "clipboard" => {
                self.clipboard()?;
                ApiResponse::unit()
            }
            "clipboardBase64" => {
                let preview = self.export(ExportFormat::Png);
                ApiResponse::deferred(async move {
                    let uri = preview.await?;
                    Self::copy_to_clipboard(&host, &uri);
                    Ok(Value::Null)
                })
            }
            "saveJson" => ApiResponse::Value(Value::String(self.save_json()?)),
            "saveSvg" | "saveImg" => {
                let (format, extension) = if api == "saveSvg" {
                    (ExportFormat::Svg, "svg")
                } else {
                    (ExportFormat::PrintPng, "png")
                };
                let exported = self.export(format);
                ApiResponse::deferred(async move {
                    let uri = exported.await?;
                    host.services()?.files.borrow_mut().download(&uri, extension)?;
                    Ok(Value::String(uri))
                })
            }
            "preview" => {
                let preview = self.export(ExportFormat::Png);
                ApiResponse::deferred(async move { Ok(Value::String(preview.await?)) })
            }
            "print" => {
                let exported = self.export(ExportFormat::PrintPng);
                ApiResponse::deferred(async move {
                    let uri = exported.await?;
                    let max_width = workspace_region(&*canvas.borrow())?.0.width();
                    host.services()?.printer.borrow_mut().print_image(&uri, max_width)?;
                    Ok(Value::Null)
                })
            }
            "clear" => {
                self.clear()?;
                ApiResponse::unit()
            }
            "addImgByElement" => {
                let (src, size) = image_arg(args)
                    .ok_or_else(|| EditorError::invalid_argument(api, "expected an image source"))?;
                ApiResponse::Value(self.add_image(&src, size)?)
            }
            "getImageExtension" => {
                let url = args
                    .str(0)
                    .ok_or_else(|| EditorError::invalid_argument(api, "expected a url"))?;
                ApiResponse::Value(Value::from(image_extension(url)))
            }
            "getSelectMode" => ApiResponse::Value(Value::from(self.select_mode.as_str())),
            _ => return Err(EditorError::UnknownApi(api.to_string())),
        };
        Ok(response)
    }

    fn on_canvas_event(&mut self, event: &CanvasEvent) -> InputResponse {
        if matches!(event, CanvasEvent::SelectionChanged) {
            self.emit_selection();
        }
        InputResponse::default()
    }

    fn destroy(&mut self) {
        log::debug!("document plugin destroyed");
    }
}
