//! Keyboard selection: select everything, or nothing.

use crate::canvas::SharedCanvas;
use crate::error::EditorResult;
use crate::input::KeyEvent;
use crate::plugin::{Plugin, PluginDescriptor, PluginInit, PluginType};

const SELECT_ALL_COMMAND: &str = "ctrl+a, command+a";
const SELECT_NONE_COMMAND: &str = "esc";

pub struct SelectPlugin {
    canvas: SharedCanvas,
}

impl PluginType for SelectPlugin {
    const DESCRIPTOR: PluginDescriptor = PluginDescriptor {
        hotkeys: &[SELECT_ALL_COMMAND, SELECT_NONE_COMMAND],
        ..PluginDescriptor::named("SelectPlugin")
    };

    type Options = ();

    fn create(init: PluginInit, _options: ()) -> EditorResult<Self> {
        Ok(Self { canvas: init.canvas })
    }
}

impl SelectPlugin {
    /// Select every selectable object except the workspace and guide lines.
    pub fn select_all(&mut self) {
        let mut canvas = self.canvas.borrow_mut();
        let ids: Vec<String> = canvas
            .objects()
            .iter()
            .filter(|object| object.selectable && !object.is_workspace() && !object.is_guideline())
            .map(|object| object.id.clone())
            .collect();
        canvas.discard_active();
        if !ids.is_empty() {
            canvas.set_active(ids);
        }
        canvas.request_render();
    }

    pub fn select_none(&mut self) {
        let mut canvas = self.canvas.borrow_mut();
        canvas.discard_active();
        canvas.request_render();
    }
}

impl Plugin for SelectPlugin {
    fn hotkey(&mut self, combo: &str, event: &KeyEvent) {
        if !event.is_down() {
            return;
        }
        match combo {
            SELECT_ALL_COMMAND => self.select_all(),
            SELECT_NONE_COMMAND => self.select_none(),
            _ => {}
        }
    }

    fn destroy(&mut self) {
        log::debug!("select plugin destroyed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::{Canvas, CanvasObject, Scene};
    use crate::document::Axis;
    use crate::editor::Editor;
    use crate::events::EventPayload;
    use crate::input::Modifiers;
    use crate::plugins::WorkspacePlugin;
    use kurbo::{Rect, Size};
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_select_all_and_none() {
        let scene = Rc::new(RefCell::new(Scene::new(Size::new(800.0, 600.0))));
        let mut editor = Editor::default();
        editor.init(scene.clone()).unwrap();
        editor.use_plugin::<WorkspacePlugin>(Default::default()).unwrap();
        editor.use_plugin::<SelectPlugin>(()).unwrap();

        let rect = CanvasObject::drawable("rect", Rect::new(0.0, 0.0, 5.0, 5.0));
        let text = CanvasObject::drawable("textbox", Rect::new(5.0, 5.0, 9.0, 9.0));
        let ids = vec![rect.id.clone(), text.id.clone()];
        {
            let mut scene = scene.borrow_mut();
            scene.add(rect);
            scene.add(CanvasObject::guideline(Axis::Horizontal, 40.0));
            scene.add(text);
        }

        let selections = Rc::new(RefCell::new(Vec::new()));
        let seen = Rc::clone(&selections);
        editor.on("selectMultiple", move |payload| seen.borrow_mut().push(payload.clone()));

        // Key up alone does nothing.
        editor.handle_key(&KeyEvent::up("a", Modifiers::ctrl()));
        assert!(scene.borrow().active_ids().is_empty());

        editor.handle_key(&KeyEvent::down("a", Modifiers::meta()));
        assert_eq!(scene.borrow().active_ids(), ids);
        assert_eq!(*selections.borrow(), vec![EventPayload::Selection(ids)]);

        editor.handle_key(&KeyEvent::down("Escape", Modifiers::NONE));
        assert!(scene.borrow().active_ids().is_empty());
    }

    #[test]
    fn test_select_all_on_empty_page() {
        let scene = Rc::new(RefCell::new(Scene::new(Size::new(800.0, 600.0))));
        let mut editor = Editor::default();
        editor.init(scene.clone()).unwrap();
        editor.use_plugin::<WorkspacePlugin>(Default::default()).unwrap();
        editor.use_plugin::<SelectPlugin>(()).unwrap();

        assert_eq!(editor.handle_key(&KeyEvent::down("a", Modifiers::ctrl())), 1);
        assert!(scene.borrow().active_ids().is_empty());
    }
}
