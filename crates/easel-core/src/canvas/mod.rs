//! Rendering-engine collaborator.
//!
//! The editor never draws anything itself. It talks to a [`Canvas`], which
//! holds the objects, the selection and the viewport. [`Scene`] is the
//! in-memory implementation used headless and in tests.

mod raster;
mod scene;

pub use raster::parse_color;
pub use scene::Scene;

use crate::document::{
    Axis, DEFAULT_DPI, DOCUMENT_VERSION, DocumentError, GUIDELINE_TYPE, ObjectRecord, SceneDocument,
    WORKSPACE_ID,
};
use kurbo::{Affine, Point, Rect, Size};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cell::RefCell;
use std::rc::Rc;
use thiserror::Error;
use uuid::Uuid;

/// Canvas errors.
#[derive(Debug, Error)]
pub enum CanvasError {
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error("document contains {0} workspace objects")]
    DuplicateWorkspace(usize),
    #[error("export region is empty")]
    EmptyRegion,
    #[error("export region {width}x{height} is too large")]
    TooLarge { width: f64, height: f64 },
    #[error("invalid color {color:?}: {reason}")]
    Color { color: String, reason: String },
    #[error("encode error: {0}")]
    Encode(String),
}

/// What an object is, independent of its id.
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectKind {
    /// The single page rectangle.
    Workspace { dpi: f64 },
    /// Ruler guide line.
    GuideLine { axis: Axis },
    /// Any ordinary drawable, tagged with its engine type name.
    Drawable { type_name: String },
}

/// A live object on the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ObjectRecord", into = "ObjectRecord")]
pub struct CanvasObject {
    pub id: String,
    pub kind: ObjectKind,
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
    pub scale_x: f64,
    pub scale_y: f64,
    pub fill: Option<String>,
    pub name: Option<String>,
    pub selectable: bool,
    pub has_controls: bool,
    pub visible: bool,
    /// Engine properties the editor does not interpret.
    pub extra: Map<String, Value>,
}

impl CanvasObject {
    /// A new drawable with a fresh id.
    pub fn drawable(type_name: impl Into<String>, bounds: Rect) -> Self {
        Self::with_kind(
            ObjectKind::Drawable {
                type_name: type_name.into(),
            },
            bounds,
        )
    }

    /// The workspace page: white, not selectable, no controls.
    pub fn workspace(width: f64, height: f64, dpi: f64) -> Self {
        let mut object = Self::with_kind(ObjectKind::Workspace { dpi }, Rect::new(0.0, 0.0, width, height));
        object.id = WORKSPACE_ID.to_string();
        object.fill = Some("rgba(255,255,255,1)".to_string());
        object.selectable = false;
        object.has_controls = false;
        object
    }

    /// A guide line at `position` along `axis`.
    pub fn guideline(axis: Axis, position: f64) -> Self {
        let bounds = match axis {
            Axis::Horizontal => Rect::new(0.0, position, 0.0, position),
            Axis::Vertical => Rect::new(position, 0.0, position, 0.0),
        };
        let mut object = Self::with_kind(ObjectKind::GuideLine { axis }, bounds);
        object.has_controls = false;
        object
    }

    fn with_kind(kind: ObjectKind, bounds: Rect) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            left: bounds.x0,
            top: bounds.y0,
            width: bounds.width(),
            height: bounds.height(),
            scale_x: 1.0,
            scale_y: 1.0,
            fill: None,
            name: None,
            selectable: true,
            has_controls: true,
            visible: true,
            extra: Map::new(),
        }
    }

    pub fn is_workspace(&self) -> bool {
        matches!(self.kind, ObjectKind::Workspace { .. })
    }

    pub fn is_guideline(&self) -> bool {
        matches!(self.kind, ObjectKind::GuideLine { .. })
    }

    /// DPI of the workspace object, `None` for anything else.
    pub fn dpi(&self) -> Option<f64> {
        match self.kind {
            ObjectKind::Workspace { dpi } => Some(dpi),
            _ => None,
        }
    }

    /// Engine type name used when serializing.
    pub fn type_name(&self) -> &str {
        match &self.kind {
            ObjectKind::Workspace { .. } => "rect",
            ObjectKind::GuideLine { .. } => GUIDELINE_TYPE,
            ObjectKind::Drawable { type_name } => type_name,
        }
    }

    /// Scaled bounding box in world coordinates.
    pub fn bounds(&self) -> Rect {
        Rect::from_origin_size(
            Point::new(self.left, self.top),
            Size::new(self.width * self.scale_x, self.height * self.scale_y),
        )
    }

    pub fn center(&self) -> Point {
        self.bounds().center()
    }

    /// Scale uniformly so the scaled width equals `width`.
    pub fn scale_to_width(&mut self, width: f64) {
        if self.width > 0.0 {
            let scale = width / self.width;
            self.scale_x = scale;
            self.scale_y = scale;
        }
    }

    /// Place the object so its center sits on `center`.
    pub fn set_center(&mut self, center: Point) {
        let bounds = self.bounds();
        self.left = center.x - bounds.width() / 2.0;
        self.top = center.y - bounds.height() / 2.0;
    }

    /// Copy of this object under a fresh id.
    pub fn duplicate(&self) -> Self {
        let mut copy = self.clone();
        copy.id = Uuid::new_v4().to_string();
        copy
    }

    /// Serialized form, tagged with the document version.
    pub fn to_record(&self) -> ObjectRecord {
        let mut record = ObjectRecord::from(self.clone());
        record
            .extra
            .entry("version")
            .or_insert_with(|| Value::String(DOCUMENT_VERSION.to_string()));
        record
    }
}

impl TryFrom<ObjectRecord> for CanvasObject {
    type Error = DocumentError;

    fn try_from(mut record: ObjectRecord) -> Result<Self, Self::Error> {
        let id = record
            .id
            .take()
            .filter(|id| !id.is_empty())
            .ok_or(DocumentError::MissingField("id"))?;

        let kind = if id == WORKSPACE_ID {
            ObjectKind::Workspace {
                dpi: record.dpi.unwrap_or(DEFAULT_DPI),
            }
        } else if record.object_type == GUIDELINE_TYPE {
            ObjectKind::GuideLine {
                axis: record.axis.unwrap_or(Axis::Horizontal),
            }
        } else {
            ObjectKind::Drawable {
                type_name: record.object_type,
            }
        };

        let fill = match record.fill {
            Some(Value::String(color)) => Some(color),
            Some(other) => {
                record.extra.insert("fill".to_string(), other);
                None
            }
            None => None,
        };

        Ok(Self {
            id,
            kind,
            left: record.left,
            top: record.top,
            width: record.width,
            height: record.height,
            scale_x: record.scale_x,
            scale_y: record.scale_y,
            fill,
            name: record.name,
            selectable: record.selectable,
            has_controls: record.has_controls,
            visible: record.visible,
            extra: record.extra,
        })
    }
}

impl From<CanvasObject> for ObjectRecord {
    fn from(object: CanvasObject) -> Self {
        let mut extra = object.extra;
        let fill = match object.fill {
            Some(color) => Some(Value::String(color)),
            None => extra.remove("fill"),
        };
        let (object_type, dpi, axis) = match object.kind {
            ObjectKind::Workspace { dpi } => ("rect".to_string(), Some(dpi), None),
            ObjectKind::GuideLine { axis } => (GUIDELINE_TYPE.to_string(), None, Some(axis)),
            ObjectKind::Drawable { type_name } => (type_name, None, None),
        };
        ObjectRecord {
            object_type,
            id: Some(object.id),
            left: object.left,
            top: object.top,
            width: object.width,
            height: object.height,
            scale_x: object.scale_x,
            scale_y: object.scale_y,
            fill,
            name: object.name,
            dpi,
            axis,
            selectable: object.selectable,
            has_controls: object.has_controls,
            visible: object.visible,
            extra,
        }
    }
}

/// The canvas contract the editor and its plugins rely on.
pub trait Canvas {
    /// Add an object on top of the stack.
    fn add(&mut self, object: CanvasObject);

    fn remove(&mut self, id: &str) -> Option<CanvasObject>;

    /// Objects back to front.
    fn objects(&self) -> &[CanvasObject];

    fn object_mut(&mut self, id: &str) -> Option<&mut CanvasObject>;

    fn object(&self, id: &str) -> Option<&CanvasObject> {
        self.objects().iter().find(|object| object.id == id)
    }

    fn workspace(&self) -> Option<&CanvasObject> {
        self.objects().iter().find(|object| object.is_workspace())
    }

    fn workspace_mut(&mut self) -> Option<&mut CanvasObject>;

    /// Ids of the active objects, in selection order.
    fn active_ids(&self) -> Vec<String>;

    fn active_objects(&self) -> Vec<&CanvasObject> {
        self.active_ids()
            .iter()
            .filter_map(|id| self.object(id))
            .collect()
    }

    fn set_active(&mut self, ids: Vec<String>);

    fn discard_active(&mut self) {
        self.set_active(Vec::new());
    }

    fn to_document(&self) -> SceneDocument;

    /// Replace the canvas content. On error the canvas is left unchanged.
    fn load_document(&mut self, document: SceneDocument) -> Result<(), CanvasError>;

    fn request_render(&mut self);

    fn viewport_transform(&self) -> Affine;

    fn set_viewport_transform(&mut self, transform: Affine);

    fn zoom(&self) -> f64 {
        crate::viewport::zoom_of(self.viewport_transform())
    }

    /// Size of the drawing surface in pixels.
    fn dimensions(&self) -> Size;

    fn set_dimensions(&mut self, size: Size);

    fn center(&self) -> Point {
        let size = self.dimensions();
        Point::new(size.width / 2.0, size.height / 2.0)
    }

    /// Size of the element hosting the canvas.
    fn container_size(&self) -> Size;

    fn set_container_size(&mut self, size: Size);

    fn clip_rect(&self) -> Option<Rect>;

    /// Hide everything outside `clip` (world coordinates).
    fn set_clip_rect(&mut self, clip: Option<Rect>);

    /// PNG bytes of `region` (world coordinates) at zoom 1.
    fn export_png(&self, region: Rect) -> Result<Vec<u8>, CanvasError>;

    /// SVG markup of `region` (world coordinates).
    fn export_svg(&self, region: Rect) -> Result<String, CanvasError>;
}

/// Canvas shared between the editor and its plugins.
pub type SharedCanvas = Rc<RefCell<dyn Canvas>>;
