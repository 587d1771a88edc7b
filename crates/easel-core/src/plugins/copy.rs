//! Duplicate, copy and paste.
//!
//! Copies go to the clipboard as document JSON tagged with a `version`, so
//! only payloads produced by an editor are pasted back as objects. PNG images
//! on the clipboard are pasted as image objects centered on the workspace.

use crate::canvas::{Canvas, CanvasObject, SharedCanvas};
use crate::document::{DEFAULT_DPI, ObjectRecord};
use crate::editor::Host;
use crate::error::{EditorError, EditorResult};
use crate::export;
use crate::input::KeyEvent;
use crate::menu::{MenuAction, MenuItem};
use crate::plugin::{ApiArgs, ApiResponse, Plugin, PluginDescriptor, PluginInit, PluginType};
use crate::services::ClipboardEntry;
use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

const COPY_COMMAND: &str = "ctrl+c, command+c";
const PASTE_COMMAND: &str = "ctrl+v, command+v";

/// Type tag of a copied multi-object selection.
const SELECTION_TYPE: &str = "activeSelection";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CopyOptions {
    /// Offset of duplicates, as a fraction of the workspace DPI.
    pub spacing_ratio: f64,
}

impl Default for CopyOptions {
    fn default() -> Self {
        Self { spacing_ratio: 0.2 }
    }
}

pub struct CopyPlugin {
    canvas: SharedCanvas,
    options: CopyOptions,
    host: Host,
    next_paste: Point,
}

impl PluginType for CopyPlugin {
    const DESCRIPTOR: PluginDescriptor = PluginDescriptor {
        name: "CopyPlugin",
        events: &[],
        apis: &["clone"],
        hotkeys: &[COPY_COMMAND, PASTE_COMMAND],
        hooks: &[],
    };

    type Options = CopyOptions;

    fn create(init: PluginInit, options: CopyOptions) -> EditorResult<Self> {
        Ok(Self {
            canvas: init.canvas,
            host: init.host,
            options,
            next_paste: Point::new(10.0, 10.0),
        })
    }
}

/// Objects that copy and clone act on: the selection, minus the workspace.
fn copy_targets(canvas: &dyn Canvas) -> Vec<CanvasObject> {
    canvas
        .active_objects()
        .into_iter()
        .filter(|object| !object.is_workspace())
        .cloned()
        .collect()
}

fn union_bounds(objects: &[CanvasObject]) -> Option<Rect> {
    objects
        .iter()
        .map(CanvasObject::bounds)
        .reduce(|acc, bounds| acc.union(bounds))
}

impl CopyPlugin {
    /// Distance between an original and its copy.
    pub fn spacing(&self) -> f64 {
        let dpi = self
            .canvas
            .borrow()
            .workspace()
            .and_then(CanvasObject::dpi)
            .unwrap_or(DEFAULT_DPI);
        dpi * self.options.spacing_ratio
    }

    /// Duplicate the object `id`, or the selection, next to the original and
    /// select the copies. Returns the new ids.
    pub fn clone_objects(&mut self, id: Option<&str>) -> Vec<String> {
        let spacing = self.spacing();
        let mut canvas = self.canvas.borrow_mut();
        let targets = match id {
            Some(id) => canvas
                .object(id)
                .filter(|object| !object.is_workspace())
                .cloned()
                .into_iter()
                .collect(),
            None => copy_targets(&*canvas),
        };

        let ids: Vec<String> = targets
            .iter()
            .map(|object| {
                let mut copy = object.duplicate();
                copy.left += spacing;
                copy.top += spacing;
                let id = copy.id.clone();
                canvas.add(copy);
                id
            })
            .collect();
        if !ids.is_empty() {
            canvas.set_active(ids.clone());
            canvas.request_render();
        }
        ids
    }

    /// Clipboard text for the current selection.
    fn copy_payload(&mut self) -> EditorResult<Option<String>> {
        let spacing = self.spacing();
        let targets = copy_targets(&*self.canvas.borrow());
        let Some(bounds) = union_bounds(&targets) else {
            return Ok(None);
        };
        let or_spacing = |v: f64| if v == 0.0 { spacing } else { v };
        self.next_paste = Point::new(or_spacing(bounds.x0), or_spacing(bounds.y0));

        let payload = if let [object] = targets.as_slice() {
            serde_json::to_value(object.to_record())
        } else {
            let center = bounds.center();
            let children: Vec<ObjectRecord> = targets
                .iter()
                .map(|object| {
                    let mut record = object.to_record();
                    record.left -= center.x;
                    record.top -= center.y;
                    record
                })
                .collect();
            Ok(json!({
                "type": SELECTION_TYPE,
                "version": crate::document::DOCUMENT_VERSION,
                "left": bounds.x0,
                "top": bounds.y0,
                "width": bounds.width(),
                "height": bounds.height(),
                "objects": children,
            }))
        };
        let payload = payload.map_err(crate::document::DocumentError::from)?;
        Ok(Some(payload.to_string()))
    }

    fn copy(&mut self) {
        let payload = match self.copy_payload() {
            Ok(Some(payload)) => payload,
            Ok(None) => return,
            Err(err) => {
                log::warn!("copy failed: {}", err);
                return;
            }
        };
        let result = match self.host.services() {
            Ok(services) => services
                .clipboard
                .borrow_mut()
                .write_text(&payload)
                .map_err(EditorError::from),
            Err(err) => Err(err),
        };
        if let Err(err) = result {
            log::warn!("clipboard write failed: {}", err);
        }
    }

    /// Paste the first usable clipboard entry.
    pub fn paste(&mut self) {
        let entries = match self.host.services() {
            Ok(services) => services.clipboard.borrow_mut().read().map_err(EditorError::from),
            Err(err) => Err(err),
        };
        let entries = match entries {
            Ok(entries) => entries,
            Err(err) => {
                log::warn!("clipboard read failed: {}", err);
                return;
            }
        };

        for entry in entries {
            let result = if entry.mime == "text/plain" {
                self.paste_text(&entry)
            } else if entry.mime.starts_with("image/") {
                self.paste_image(&entry)
            } else {
                continue;
            };
            if let Err(err) = result {
                log::warn!("paste failed: {}", err);
            }
            return;
        }
    }

    fn paste_text(&mut self, entry: &ClipboardEntry) -> EditorResult<()> {
        let text = entry.as_text().unwrap_or_default();
        let Ok(parsed) = serde_json::from_str::<Value>(text) else {
            log::debug!("clipboard text is not a copied object");
            return Ok(());
        };
        if parsed.get("version").is_none_or(Value::is_null) {
            log::debug!("clipboard JSON has no version, ignored");
            return Ok(());
        }

        let spacing = self.spacing();
        let start = Point::new(self.next_paste.x + spacing, self.next_paste.y + spacing);
        let records: Vec<ObjectRecord> = if parsed.get("type").and_then(Value::as_str) == Some(SELECTION_TYPE) {
            let half_width = parsed.get("width").and_then(Value::as_f64).unwrap_or_default() / 2.0;
            let half_height = parsed.get("height").and_then(Value::as_f64).unwrap_or_default() / 2.0;
            let children = parsed.get("objects").cloned().unwrap_or(Value::Array(Vec::new()));
            let mut records: Vec<ObjectRecord> =
                serde_json::from_value(children).map_err(crate::document::DocumentError::from)?;
            for record in &mut records {
                record.left += start.x + half_width;
                record.top += start.y + half_height;
            }
            records
        } else {
            let mut record: ObjectRecord =
                serde_json::from_value(parsed).map_err(crate::document::DocumentError::from)?;
            record.left = start.x;
            record.top = start.y;
            vec![record]
        };

        let objects = records
            .into_iter()
            .map(|mut record| {
                record.id = None;
                record.ensure_id();
                CanvasObject::try_from(record)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut canvas = self.canvas.borrow_mut();
        let ids = objects.iter().map(|object| object.id.clone()).collect();
        for object in objects {
            canvas.add(object);
        }
        canvas.set_active(ids);
        canvas.request_render();
        self.next_paste = start;
        Ok(())
    }

    fn paste_image(&mut self, entry: &ClipboardEntry) -> EditorResult<()> {
        if entry.mime != "image/png" {
            log::warn!("unsupported clipboard image type {}", entry.mime);
            return Ok(());
        }
        let (width, height) = {
            let reader = png::Decoder::new(entry.data.as_slice())
                .read_info()
                .map_err(export::ExportError::from)?;
            let info = reader.info();
            (info.width as f64, info.height as f64)
        };

        let spacing = self.spacing();
        let mut image = CanvasObject::drawable("image", Rect::new(spacing, spacing, spacing + width, spacing + height));
        image.name = Some("pasted image".to_string());
        image
            .extra
            .insert("src".to_string(), Value::String(export::png_data_uri(&entry.data)));

        let mut canvas = self.canvas.borrow_mut();
        if let Some(center) = canvas.workspace().map(CanvasObject::center) {
            image.set_center(center);
        }
        let id = image.id.clone();
        canvas.add(image);
        canvas.set_active(vec![id]);
        canvas.request_render();
        Ok(())
    }
}

impl Plugin for CopyPlugin {
    fn call_api(&mut self, api: &str, args: &ApiArgs) -> EditorResult<ApiResponse> {
        match api {
            "clone" => {
                let ids = self.clone_objects(args.str(0));
                Ok(ApiResponse::Value(json!(ids)))
            }
            _ => Err(EditorError::UnknownApi(api.to_string())),
        }
    }

    fn hotkey(&mut self, combo: &str, event: &KeyEvent) {
        if !event.is_down() {
            return;
        }
        match combo {
            COPY_COMMAND => self.copy(),
            PASTE_COMMAND => self.paste(),
            _ => {}
        }
    }

    fn context_menu(&self) -> Option<Vec<MenuItem>> {
        let canvas = self.canvas.try_borrow().ok()?;
        if copy_targets(&*canvas).is_empty() {
            return None;
        }
        Some(vec![MenuItem::new("Copy", MenuAction::new("clone", ApiArgs::new()))])
    }
}
