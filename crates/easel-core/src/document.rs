//! Persisted project format.
//!
//! A saved project is `{ "fabricData": <canvas document>, "metaData": { "dpi": n } }`.
//! Object fields the editor does not model are kept verbatim so documents
//! survive a load/save cycle untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

/// Version string written into documents and copied objects.
pub const DOCUMENT_VERSION: &str = "5.3.0";

/// Id reserved for the workspace object in serialized documents.
pub const WORKSPACE_ID: &str = "workspace";

/// Object type of ruler guide lines.
pub const GUIDELINE_TYPE: &str = "GuideLine";

/// DPI assumed when a document does not carry one.
pub const DEFAULT_DPI: f64 = 72.0;

/// Document errors.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("missing field: {0}")]
    MissingField(&'static str),
    #[error("invalid object: {0}")]
    InvalidObject(String),
    #[error("invalid dpi: {0}")]
    InvalidDpi(f64),
}

/// Orientation of a guide line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    Horizontal,
    Vertical,
}

fn one() -> f64 {
    1.0
}

fn yes() -> bool {
    true
}

fn is_true(value: &bool) -> bool {
    *value
}

fn default_version() -> String {
    DOCUMENT_VERSION.to_string()
}

/// One serialized canvas object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectRecord {
    #[serde(rename = "type")]
    pub object_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub left: f64,
    #[serde(default)]
    pub top: f64,
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
    #[serde(default = "one")]
    pub scale_x: f64,
    #[serde(default = "one")]
    pub scale_y: f64,
    /// Usually a color string; gradients and patterns are objects.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dpi: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub axis: Option<Axis>,
    #[serde(default = "yes")]
    pub selectable: bool,
    #[serde(default = "yes")]
    pub has_controls: bool,
    #[serde(default = "yes", skip_serializing_if = "is_true")]
    pub visible: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ObjectRecord {
    /// Minimal record of the given type.
    pub fn new(object_type: impl Into<String>) -> Self {
        Self {
            object_type: object_type.into(),
            id: None,
            left: 0.0,
            top: 0.0,
            width: 0.0,
            height: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            fill: None,
            name: None,
            dpi: None,
            axis: None,
            selectable: true,
            has_controls: true,
            visible: true,
            extra: Map::new(),
        }
    }

    /// Give the record a fresh id if it has none. Returns true if one was assigned.
    pub fn ensure_id(&mut self) -> bool {
        match &self.id {
            Some(id) if !id.is_empty() => false,
            _ => {
                self.id = Some(Uuid::new_v4().to_string());
                true
            }
        }
    }
}

/// The serialized canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneDocument {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub objects: Vec<ObjectRecord>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for SceneDocument {
    fn default() -> Self {
        Self {
            version: default_version(),
            objects: Vec::new(),
            extra: Map::new(),
        }
    }
}

impl SceneDocument {
    pub fn to_json_string(&self) -> Result<String, DocumentError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Project-level metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectMeta {
    pub dpi: f64,
}

/// A saved project file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectFile {
    #[serde(rename = "fabricData")]
    pub canvas: SceneDocument,
    #[serde(rename = "metaData")]
    pub meta: ProjectMeta,
}

impl ProjectFile {
    pub fn new(canvas: SceneDocument, dpi: f64) -> Self {
        Self {
            canvas,
            meta: ProjectMeta { dpi },
        }
    }

    /// Parse a project from JSON text.
    pub fn parse(json: &str) -> Result<Self, DocumentError> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    /// Parse a project from a JSON value, or from a string holding JSON.
    pub fn from_value(value: Value) -> Result<Self, DocumentError> {
        match value {
            Value::String(text) => Self::parse(&text),
            Value::Object(ref map) => {
                if !map.contains_key("fabricData") {
                    return Err(DocumentError::MissingField("fabricData"));
                }
                if !map.contains_key("metaData") {
                    return Err(DocumentError::MissingField("metaData"));
                }
                let project: Self = serde_json::from_value(value)?;
                if !(project.meta.dpi.is_finite() && project.meta.dpi > 0.0) {
                    return Err(DocumentError::InvalidDpi(project.meta.dpi));
                }
                Ok(project)
            }
            _ => Err(DocumentError::InvalidObject("project must be a JSON object".to_string())),
        }
    }

    /// Assign ids to top-level objects that lack one. Returns how many were assigned.
    pub fn assign_missing_ids(&mut self) -> usize {
        self.canvas
            .objects
            .iter_mut()
            .map(ObjectRecord::ensure_id)
            .filter(|assigned| *assigned)
            .count()
    }

    /// Tab-indented JSON, the layout used for downloads.
    pub fn to_pretty_json(&self) -> Result<String, DocumentError> {
        let mut out = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"\t");
        let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
        self.serialize(&mut serializer)?;
        String::from_utf8(out).map_err(|e| DocumentError::InvalidObject(e.to_string()))
    }
}

/// Rewrite plain `text` objects as `textbox` so they stay editable after import.
/// Group members are rewritten recursively; groups themselves keep their type.
pub fn normalize_text_types(objects: &mut [ObjectRecord]) {
    for record in objects {
        match record.extra.get_mut("objects").and_then(Value::as_array_mut) {
            Some(children) => normalize_text_values(children),
            None => {
                if record.object_type == "text" {
                    record.object_type = "textbox".to_string();
                }
            }
        }
    }
}

fn normalize_text_values(objects: &mut [Value]) {
    for value in objects {
        let Some(object) = value.as_object_mut() else {
            continue;
        };
        match object.get_mut("objects").and_then(Value::as_array_mut) {
            Some(children) => normalize_text_values(children),
            None => {
                if object.get("type").and_then(Value::as_str) == Some("text") {
                    object.insert("type".to_string(), Value::String("textbox".to_string()));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_project_and_assign_ids() {
        let mut project = ProjectFile::from_value(json!({
            "fabricData": {
                "version": "5.3.0",
                "objects": [
                    { "type": "rect", "id": "workspace", "width": 800, "height": 600 },
                    { "type": "circle", "radius": 10 },
                    { "type": "textbox", "text": "hi" }
                ],
                "background": "#fff"
            },
            "metaData": { "dpi": 300 }
        }))
        .unwrap();

        assert_eq!(project.assign_missing_ids(), 2);
        let ids: Vec<_> = project.canvas.objects.iter().map(|o| o.id.clone().unwrap()).collect();
        assert_eq!(ids[0], "workspace");
        assert_ne!(ids[1], ids[2]);
        assert!(!ids[1].is_empty());

        // Already identified objects keep their ids.
        assert_eq!(project.assign_missing_ids(), 0);
        assert_eq!(project.canvas.objects[1].id.as_deref(), Some(ids[1].as_str()));

        // Unknown fields survive.
        assert_eq!(project.canvas.objects[1].extra["radius"], json!(10));
        assert_eq!(project.canvas.extra["background"], json!("#fff"));
        assert!((project.meta.dpi - 300.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_project_from_string_value() {
        let text = r#"{"fabricData":{"objects":[]},"metaData":{"dpi":96}}"#;
        let project = ProjectFile::from_value(Value::String(text.to_string())).unwrap();
        assert!(project.canvas.objects.is_empty());
        assert_eq!(project.canvas.version, DOCUMENT_VERSION);
    }

    #[test]
    fn test_missing_meta() {
        let err = ProjectFile::from_value(json!({ "fabricData": { "objects": [] } })).unwrap_err();
        assert!(matches!(err, DocumentError::MissingField("metaData")));
        assert!(matches!(ProjectFile::parse("{"), Err(DocumentError::Json(_))));
    }

    #[test]
    fn test_pretty_json_uses_tabs() {
        let project = ProjectFile::new(SceneDocument::default(), 72.0);
        let text = project.to_pretty_json().unwrap();
        assert!(text.contains("\n\t\"fabricData\""));
        assert_eq!(ProjectFile::parse(&text).unwrap(), project);
    }

    #[test]
    fn test_normalize_text_types() {
        let mut group = ObjectRecord::new("group");
        group.extra.insert(
            "objects".to_string(),
            json!([{ "type": "text" }, { "type": "group", "objects": [{ "type": "text" }] }]),
        );
        let mut objects = vec![ObjectRecord::new("text"), group];

        normalize_text_types(&mut objects);
        assert_eq!(objects[0].object_type, "textbox");
        assert_eq!(objects[1].object_type, "group");
        assert_eq!(
            objects[1].extra["objects"],
            json!([{ "type": "textbox" }, { "type": "group", "objects": [{ "type": "textbox" }] }])
        );
    }
}
