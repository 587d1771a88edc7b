//! Ruler guide lines.
//!
//! Guide lines are ordinary canvas objects tagged as guides. They are hidden
//! while a save runs so they never end up in an export.

use crate::canvas::{CanvasObject, SharedCanvas};
use crate::document::Axis;
use crate::error::{EditorError, EditorResult};
use crate::hooks::{HookName, HookOutcome, HookPayload};
use crate::plugin::{ApiArgs, ApiResponse, Plugin, PluginDescriptor, PluginInit, PluginType};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Units the ruler is labelled in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    #[default]
    Pixels,
    Inches,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RulerOptions {
    pub units: Units,
    pub dpi: f64,
}

impl Default for RulerOptions {
    fn default() -> Self {
        Self {
            units: Units::Pixels,
            dpi: 72.0,
        }
    }
}

pub struct RulerPlugin {
    canvas: SharedCanvas,
    options: RulerOptions,
    enabled: bool,
}

impl PluginType for RulerPlugin {
    const DESCRIPTOR: PluginDescriptor = PluginDescriptor {
        name: "RulerPlugin",
        events: &[],
        apis: &["hideGuideline", "showGuideline", "rulerEnable", "rulerDisable", "addGuideline"],
        hotkeys: &[],
        hooks: &[HookName::SaveBefore, HookName::SaveAfter],
    };

    type Options = RulerOptions;

    fn create(init: PluginInit, options: RulerOptions) -> EditorResult<Self> {
        Ok(Self {
            canvas: init.canvas,
            options,
            enabled: true,
        })
    }
}

impl RulerPlugin {
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_guidelines_visible(&mut self, visible: bool) {
        let mut canvas = self.canvas.borrow_mut();
        let ids: Vec<String> = canvas
            .objects()
            .iter()
            .filter(|object| object.is_guideline())
            .map(|object| object.id.clone())
            .collect();
        for id in &ids {
            if let Some(guide) = canvas.object_mut(id) {
                guide.visible = visible;
            }
        }
        canvas.request_render();
    }

    pub fn hide_guidelines(&mut self) {
        self.set_guidelines_visible(false);
    }

    /// Show guide lines again. Does nothing while the ruler is disabled.
    pub fn show_guidelines(&mut self) {
        if self.enabled {
            self.set_guidelines_visible(true);
        }
    }

    pub fn enable(&mut self) {
        self.enabled = true;
        self.set_guidelines_visible(true);
    }

    pub fn disable(&mut self) {
        self.enabled = false;
        self.set_guidelines_visible(false);
    }

    /// Add a guide line at `position`, given in ruler units. Returns its id.
    pub fn add_guideline(&mut self, axis: Axis, position: f64) -> String {
        let position = match self.options.units {
            Units::Pixels => position,
            Units::Inches => position * self.options.dpi,
        };
        let mut guide = CanvasObject::guideline(axis, position);
        guide.visible = self.enabled;
        let id = guide.id.clone();
        let mut canvas = self.canvas.borrow_mut();
        canvas.add(guide);
        canvas.request_render();
        id
    }
}

impl Plugin for RulerPlugin {
    fn call_api(&mut self, api: &str, args: &ApiArgs) -> EditorResult<ApiResponse> {
        match api {
            "hideGuideline" => self.hide_guidelines(),
            "showGuideline" => self.show_guidelines(),
            "rulerEnable" => self.enable(),
            "rulerDisable" => self.disable(),
            "addGuideline" => {
                let axis = args
                    .get(0)
                    .cloned()
                    .and_then(|value| serde_json::from_value::<Axis>(value).ok())
                    .ok_or_else(|| EditorError::invalid_argument(api, "expected \"horizontal\" or \"vertical\""))?;
                let position = args
                    .f64(1)
                    .ok_or_else(|| EditorError::invalid_argument(api, "expected a position"))?;
                return Ok(ApiResponse::Value(Value::String(self.add_guideline(axis, position))));
            }
            _ => return Err(EditorError::UnknownApi(api.to_string())),
        }
        Ok(ApiResponse::unit())
    }

    fn hook(&mut self, hook: HookName, _payload: &HookPayload) -> HookOutcome {
        match hook {
            HookName::SaveBefore => self.hide_guidelines(),
            HookName::SaveAfter => self.show_guidelines(),
            _ => {}
        }
        HookOutcome::done()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::{Canvas, Scene};
    use crate::editor::Editor;
    use crate::plugins::WorkspacePlugin;
    use kurbo::Size;
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn editor(options: RulerOptions) -> (Editor, Rc<RefCell<Scene>>) {
        let scene = Rc::new(RefCell::new(Scene::new(Size::new(800.0, 600.0))));
        let mut editor = Editor::default();
        editor.init(scene.clone()).unwrap();
        editor.use_plugin::<WorkspacePlugin>(Default::default()).unwrap();
        editor.use_plugin::<RulerPlugin>(options).unwrap();
        (editor, scene)
    }

    fn call(editor: &Editor, api: &str, args: Vec<Value>) -> EditorResult<Value> {
        pollster::block_on(editor.call(api, ApiArgs::from(args)))
    }

    #[test]
    fn test_guidelines_hidden_only_during_save() {
        let (editor, scene) = editor(RulerOptions::default());
        let id = call(&editor, "addGuideline", vec![json!("vertical"), json!(120)]).unwrap();
        let id = id.as_str().unwrap().to_string();

        pollster::block_on(editor.run_hook(HookName::SaveBefore, HookPayload::Empty)).unwrap();
        let guide = scene.borrow().object(&id).cloned().unwrap();
        assert!(!guide.visible);
        assert_eq!(guide.left, 120.0);

        pollster::block_on(editor.run_hook(HookName::SaveAfter, HookPayload::Empty)).unwrap();
        assert!(scene.borrow().object(&id).unwrap().visible);
    }

    #[test]
    fn test_inches_and_disable() {
        let (editor, scene) = editor(RulerOptions {
            units: Units::Inches,
            dpi: 300.0,
        });
        let id = call(&editor, "addGuideline", vec![json!("horizontal"), json!(0.5)]).unwrap();
        let id = id.as_str().unwrap().to_string();
        assert_eq!(scene.borrow().object(&id).unwrap().top, 150.0);

        call(&editor, "rulerDisable", vec![]).unwrap();
        assert!(!scene.borrow().object(&id).unwrap().visible);
        // A finished save leaves a disabled ruler's guides hidden.
        pollster::block_on(editor.run_hook(HookName::SaveAfter, HookPayload::Empty)).unwrap();
        assert!(!scene.borrow().object(&id).unwrap().visible);

        call(&editor, "rulerEnable", vec![]).unwrap();
        assert!(scene.borrow().object(&id).unwrap().visible);

        assert!(matches!(
            call(&editor, "addGuideline", vec![json!("diagonal"), json!(1)]),
            Err(EditorError::InvalidArgument { .. })
        ));
    }
}
