//! In-memory canvas.

use super::{Canvas, CanvasError, CanvasObject, raster};
use crate::document::SceneDocument;
use kurbo::{Affine, Rect, Size};
use serde_json::{Map, Value};

/// Headless [`Canvas`] holding objects, selection and viewport state.
#[derive(Debug, Clone)]
pub struct Scene {
    objects: Vec<CanvasObject>,
    active: Vec<String>,
    viewport: Affine,
    dimensions: Size,
    container: Size,
    clip: Option<Rect>,
    /// Document-level fields (background, etc.) carried across save/load.
    document_extra: Map<String, Value>,
    render_count: u64,
}

impl Scene {
    /// Empty scene whose drawing surface matches `container`.
    pub fn new(container: Size) -> Self {
        Self {
            objects: Vec::new(),
            active: Vec::new(),
            viewport: Affine::IDENTITY,
            dimensions: container,
            container,
            clip: None,
            document_extra: Map::new(),
            render_count: 0,
        }
    }

    /// How many renders have been requested.
    pub fn render_count(&self) -> u64 {
        self.render_count
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new(Size::new(800.0, 600.0))
    }
}

impl Canvas for Scene {
    fn add(&mut self, object: CanvasObject) {
        if object.is_workspace() && self.workspace().is_some() {
            log::warn!("ignoring second workspace object {}", object.id);
            return;
        }
        self.objects.push(object);
    }

    fn remove(&mut self, id: &str) -> Option<CanvasObject> {
        let index = self.objects.iter().position(|object| object.id == id)?;
        self.active.retain(|active| active != id);
        Some(self.objects.remove(index))
    }

    fn objects(&self) -> &[CanvasObject] {
        &self.objects
    }

    fn object_mut(&mut self, id: &str) -> Option<&mut CanvasObject> {
        self.objects.iter_mut().find(|object| object.id == id)
    }

    fn workspace_mut(&mut self) -> Option<&mut CanvasObject> {
        self.objects.iter_mut().find(|object| object.is_workspace())
    }

    fn active_ids(&self) -> Vec<String> {
        self.active.clone()
    }

    fn set_active(&mut self, ids: Vec<String>) {
        self.active = ids
            .into_iter()
            .filter(|id| self.objects.iter().any(|object| &object.id == id))
            .collect();
    }

    fn to_document(&self) -> SceneDocument {
        SceneDocument {
            objects: self.objects.iter().map(CanvasObject::to_record).collect(),
            extra: self.document_extra.clone(),
            ..SceneDocument::default()
        }
    }

    fn load_document(&mut self, document: SceneDocument) -> Result<(), CanvasError> {
        let objects = document
            .objects
            .into_iter()
            .map(CanvasObject::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        let workspaces = objects.iter().filter(|object| object.is_workspace()).count();
        if workspaces > 1 {
            return Err(CanvasError::DuplicateWorkspace(workspaces));
        }
        log::debug!("loaded {} object(s)", objects.len());
        self.objects = objects;
        self.active.clear();
        self.document_extra = document.extra;
        Ok(())
    }

    fn request_render(&mut self) {
        self.render_count += 1;
    }

    fn viewport_transform(&self) -> Affine {
        self.viewport
    }

    fn set_viewport_transform(&mut self, transform: Affine) {
        self.viewport = transform;
    }

    fn dimensions(&self) -> Size {
        self.dimensions
    }

    fn set_dimensions(&mut self, size: Size) {
        self.dimensions = size;
    }

    fn container_size(&self) -> Size {
        self.container
    }

    fn set_container_size(&mut self, size: Size) {
        self.container = size;
    }

    fn clip_rect(&self) -> Option<Rect> {
        self.clip
    }

    fn set_clip_rect(&mut self, clip: Option<Rect>) {
        self.clip = clip;
    }

    fn export_png(&self, region: Rect) -> Result<Vec<u8>, CanvasError> {
        raster::render_png(&self.objects, region)
    }

    fn export_svg(&self, region: Rect) -> Result<String, CanvasError> {
        raster::render_svg(&self.objects, region)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::ObjectRecord;
    use serde_json::json;

    fn record(value: Value) -> ObjectRecord {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_single_workspace_on_add() {
        let mut scene = Scene::default();
        scene.add(CanvasObject::workspace(100.0, 100.0, 72.0));
        scene.add(CanvasObject::workspace(200.0, 200.0, 72.0));
        assert_eq!(scene.objects().len(), 1);
        assert_eq!(scene.workspace().unwrap().width, 100.0);
    }

    #[test]
    fn test_remove_drops_selection() {
        let mut scene = Scene::default();
        let a = CanvasObject::drawable("rect", Rect::new(0.0, 0.0, 10.0, 10.0));
        let b = CanvasObject::drawable("rect", Rect::new(0.0, 0.0, 10.0, 10.0));
        let (a_id, b_id) = (a.id.clone(), b.id.clone());
        scene.add(a);
        scene.add(b);
        scene.set_active(vec![a_id.clone(), b_id.clone(), "missing".to_string()]);
        assert_eq!(scene.active_ids(), vec![a_id.clone(), b_id.clone()]);

        assert!(scene.remove(&a_id).is_some());
        assert_eq!(scene.active_ids(), vec![b_id]);
        assert!(scene.remove(&a_id).is_none());
    }

    #[test]
    fn test_document_roundtrip_keeps_unknown_fields() {
        let mut document = SceneDocument::default();
        document.extra.insert("background".to_string(), json!("#eee"));
        document.objects = vec![
            record(json!({ "type": "rect", "id": "workspace", "width": 50, "height": 40, "dpi": 96 })),
            record(json!({ "type": "circle", "id": "c1", "radius": 7, "fill": "#000" })),
        ];

        let mut scene = Scene::default();
        scene.load_document(document).unwrap();
        assert_eq!(scene.workspace().unwrap().dpi(), Some(96.0));

        let saved = scene.to_document();
        assert_eq!(saved.extra["background"], json!("#eee"));
        assert_eq!(saved.objects[1].extra["radius"], json!(7));
        assert_eq!(saved.objects[1].extra["version"], json!("5.3.0"));
    }

    #[test]
    fn test_failed_load_leaves_scene_untouched() {
        let mut scene = Scene::default();
        scene.add(CanvasObject::drawable("rect", Rect::new(0.0, 0.0, 1.0, 1.0)));

        let mut document = SceneDocument::default();
        document.objects = vec![
            record(json!({ "type": "rect", "id": "workspace" })),
            record(json!({ "type": "rect", "id": "workspace" })),
        ];
        assert!(matches!(
            scene.load_document(document),
            Err(CanvasError::DuplicateWorkspace(2))
        ));

        let mut document = SceneDocument::default();
        document.objects = vec![record(json!({ "type": "rect" }))];
        assert!(scene.load_document(document).is_err());
        assert_eq!(scene.objects().len(), 1);
    }
}
