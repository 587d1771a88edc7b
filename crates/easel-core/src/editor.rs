//! The editor host.
//!
//! [`Editor`] binds a canvas, owns the plugin registry, the hook pipeline,
//! the context menu and the event bus, and routes input to plugins. Plugins
//! reach back into the editor through a [`Host`] handle.

use crate::canvas::SharedCanvas;
use crate::config::EditorConfig;
use crate::error::{ConfigurationError, EditorError, EditorResult};
use crate::events::{EventBus, EventPayload, ListenerId};
use crate::hooks::{HookError, HookName, HookPayload, HookPipeline, LocalBoxFuture};
use crate::input::{CanvasEvent, InputResponse, KeyEvent, MouseButton, PointerEvent};
use crate::menu::{self, ContextMenu, MenuItem};
use crate::plugin::{ApiArgs, ApiResponse, Plugin, PluginHandle, PluginInit, PluginRegistry, PluginType};
use crate::plugins::{CopyPlugin, DocumentPlugin, RulerPlugin, SelectPlugin, WorkspacePlugin};
use crate::services::Services;
use kurbo::Point;
use serde_json::Value;
use std::any::Any;
use std::cell::RefCell;
use std::future;
use std::rc::{Rc, Weak};

/// State shared between the editor and the handles given to plugins.
struct EditorShared {
    canvas: RefCell<Option<SharedCanvas>>,
    registry: RefCell<PluginRegistry>,
    hooks: RefCell<HookPipeline>,
    menu: RefCell<Option<ContextMenu>>,
    events: EventBus,
    services: Services,
}

impl EditorShared {
    fn dispatch(&self, api: &str, args: &ApiArgs) -> EditorResult<ApiResponse> {
        let (owner, handle) = self
            .registry
            .borrow()
            .api_target(api)
            .ok_or_else(|| EditorError::UnknownApi(api.to_string()))?;
        let mut plugin = handle
            .try_borrow_mut()
            .map_err(|_| EditorError::PluginBusy(owner.to_string()))?;
        log::debug!("api {} -> {}", api, owner);
        plugin.call_api(api, args)
    }

    fn run_hook(&self, hook: HookName, payload: HookPayload) -> LocalBoxFuture<'static, Result<(), HookError>> {
        self.hooks.borrow().run(hook, payload)
    }

    fn active_ids(&self) -> Option<Vec<String>> {
        self.canvas.borrow().as_ref().map(|canvas| canvas.borrow().active_ids())
    }

    /// Forward a canvas event to every plugin, in registration order.
    fn broadcast(&self, event: &CanvasEvent) -> InputResponse {
        let plugins = self.registry.borrow().plugins();
        plugins.iter().fold(InputResponse::default(), |response, plugin| {
            match plugin.try_borrow_mut() {
                Ok(mut plugin) => response.merge(plugin.on_canvas_event(event)),
                Err(_) => {
                    log::warn!("plugin busy, dropping {:?}", event);
                    response
                }
            }
        })
    }
}

/// Handle plugins use to call back into the editor.
///
/// It does not keep the editor alive; once the editor is gone every call
/// fails with [`EditorError::NotInitialized`] or does nothing.
#[derive(Clone)]
pub struct Host {
    shared: Weak<EditorShared>,
}

impl Host {
    fn shared(&self) -> EditorResult<Rc<EditorShared>> {
        self.shared.upgrade().ok_or(EditorError::NotInitialized)
    }

    /// Notify listeners of `event`. Returns how many were called.
    pub fn emit(&self, event: &str, payload: EventPayload) -> usize {
        match self.shared.upgrade() {
            Some(shared) => shared.events.emit(event, payload),
            None => 0,
        }
    }

    /// Call an API; deferred work is returned unawaited.
    pub fn dispatch(&self, api: &str, args: ApiArgs) -> EditorResult<ApiResponse> {
        self.shared()?.dispatch(api, &args)
    }

    /// Call an API and wait for its value.
    pub fn call(&self, api: &str, args: ApiArgs) -> LocalBoxFuture<'static, EditorResult<Value>> {
        let response = self.dispatch(api, args);
        Box::pin(async move { response?.resolve().await })
    }

    pub fn has_api(&self, api: &str) -> bool {
        self.shared
            .upgrade()
            .is_some_and(|shared| shared.registry.borrow().api_owner(api).is_some())
    }

    /// Run every tap of `hook`.
    pub fn run_hook(&self, hook: HookName, payload: HookPayload) -> LocalBoxFuture<'static, Result<(), HookError>> {
        match self.shared.upgrade() {
            Some(shared) => shared.run_hook(hook, payload),
            None => Box::pin(future::ready(Err(HookError::Undefined(hook)))),
        }
    }

    pub fn services(&self) -> EditorResult<Services> {
        Ok(self.shared()?.services.clone())
    }
}

/// Plugin host wrapping a canvas.
pub struct Editor {
    shared: Rc<EditorShared>,
}

impl Default for Editor {
    fn default() -> Self {
        Self::new(Services::default())
    }
}

impl Editor {
    pub fn new(services: Services) -> Self {
        Self {
            shared: Rc::new(EditorShared {
                canvas: RefCell::new(None),
                registry: RefCell::new(PluginRegistry::new()),
                hooks: RefCell::new(HookPipeline::new()),
                menu: RefCell::new(None),
                events: EventBus::new(),
                services,
            }),
        }
    }

    pub fn host(&self) -> Host {
        Host {
            shared: Rc::downgrade(&self.shared),
        }
    }

    pub fn services(&self) -> &Services {
        &self.shared.services
    }

    /// Bind `canvas`, define the lifecycle hooks, install the context menu
    /// and register the document plugin. A bound editor is torn down first.
    pub fn init(&mut self, canvas: SharedCanvas) -> EditorResult<()> {
        if self.is_initialized() {
            log::info!("re-initializing editor");
            self.destroy();
        }
        *self.shared.canvas.borrow_mut() = Some(canvas);
        {
            let mut hooks = self.shared.hooks.borrow_mut();
            for hook in HookName::ALL {
                hooks.define_hook(hook);
            }
        }
        *self.shared.menu.borrow_mut() = Some(ContextMenu::new());
        self.use_plugin::<DocumentPlugin>(Default::default())
    }

    pub fn is_initialized(&self) -> bool {
        self.shared.canvas.borrow().is_some()
    }

    pub fn canvas(&self) -> EditorResult<SharedCanvas> {
        self.shared
            .canvas
            .borrow()
            .clone()
            .ok_or_else(|| ConfigurationError::CanvasNotBound.into())
    }

    /// Register the workspace, copy, select and ruler plugins.
    pub fn install_defaults(&self, config: &EditorConfig) -> EditorResult<()> {
        self.use_plugin::<WorkspacePlugin>(config.workspace.clone())?;
        self.use_plugin::<CopyPlugin>(config.copy.clone())?;
        self.use_plugin::<SelectPlugin>(Default::default())?;
        self.use_plugin::<RulerPlugin>(config.ruler.clone())?;
        Ok(())
    }

    /// Validate, construct and register a plugin of type `P`.
    pub fn use_plugin<P: PluginType>(&self, options: P::Options) -> EditorResult<()> {
        let canvas = self.canvas()?;
        {
            let registry = self.shared.registry.borrow();
            let hooks = self.shared.hooks.borrow();
            registry.validate(&P::DESCRIPTOR, &hooks)?;
        }
        let plugin = P::create(
            PluginInit {
                canvas,
                host: self.host(),
            },
            options,
        )?;
        let handle: PluginHandle = Rc::new(RefCell::new(plugin));
        let mut registry = self.shared.registry.borrow_mut();
        let mut hooks = self.shared.hooks.borrow_mut();
        registry.insert(P::DESCRIPTOR, handle, &mut hooks)
    }

    /// Remove one plugin, releasing its resources.
    pub fn unregister(&self, name: &str) -> Option<PluginHandle> {
        let handle = {
            let mut registry = self.shared.registry.borrow_mut();
            let mut hooks = self.shared.hooks.borrow_mut();
            registry.unregister(name, &mut hooks)?
        };
        match handle.try_borrow_mut() {
            Ok(mut plugin) => plugin.destroy(),
            Err(_) => log::warn!("plugin {} is busy, skipping destroy", name),
        }
        Some(handle)
    }

    pub fn plugin(&self, name: &str) -> Option<PluginHandle> {
        self.shared.registry.borrow().get(name)
    }

    /// Names of the registered plugins, in registration order.
    pub fn plugin_names(&self) -> Vec<&'static str> {
        self.shared.registry.borrow().names()
    }

    /// Run `f` on the plugin `name` as its concrete type.
    pub fn with_plugin<P: Plugin, R>(&self, name: &str, f: impl FnOnce(&mut P) -> R) -> EditorResult<R> {
        let handle = self
            .plugin(name)
            .ok_or_else(|| EditorError::PluginNotFound(name.to_string()))?;
        let mut guard = handle
            .try_borrow_mut()
            .map_err(|_| EditorError::PluginBusy(name.to_string()))?;
        let any: &mut dyn Any = &mut *guard;
        let plugin = any
            .downcast_mut::<P>()
            .ok_or_else(|| EditorError::PluginNotFound(name.to_string()))?;
        Ok(f(plugin))
    }

    pub fn has_api(&self, api: &str) -> bool {
        self.shared.registry.borrow().api_owner(api).is_some()
    }

    /// Call an API. Deferred work is returned unawaited; plugins hear about
    /// a selection it changes once it resolves.
    pub fn dispatch(&self, api: &str, args: ApiArgs) -> EditorResult<ApiResponse> {
        let work = match self.track_selection(|| self.shared.dispatch(api, &args))? {
            ApiResponse::Deferred(work) => work,
            value => return Ok(value),
        };
        let settled = self.shared.active_ids();
        let shared = Rc::downgrade(&self.shared);
        Ok(ApiResponse::deferred(async move {
            let value = work.await;
            if let Some(shared) = shared.upgrade() {
                if shared.active_ids() != settled {
                    shared.broadcast(&CanvasEvent::SelectionChanged);
                }
            }
            value
        }))
    }

    /// Call an API and wait for its value.
    pub fn call(&self, api: &str, args: ApiArgs) -> LocalBoxFuture<'static, EditorResult<Value>> {
        let response = self.dispatch(api, args);
        Box::pin(async move { response?.resolve().await })
    }

    pub fn on(&self, event: &str, listener: impl Fn(&EventPayload) + 'static) -> ListenerId {
        self.shared.events.on(event, listener)
    }

    /// Remove a listener. Without an id this does nothing.
    pub fn off(&self, event: &str, listener: Option<ListenerId>) -> bool {
        self.shared.events.off(event, listener)
    }

    pub fn emit(&self, event: &str, payload: EventPayload) -> usize {
        self.shared.events.emit(event, payload)
    }

    pub fn run_hook(&self, hook: HookName, payload: HookPayload) -> LocalBoxFuture<'static, Result<(), HookError>> {
        self.shared.run_hook(hook, payload)
    }

    /// Tap keys of `hook`, in run order.
    pub fn hook_taps(&self, hook: HookName) -> Vec<String> {
        self.shared.hooks.borrow().tap_keys(hook)
    }

    /// Deliver a key event to every plugin with a matching hotkey.
    /// Returns how many handlers ran.
    pub fn handle_key(&self, event: &KeyEvent) -> usize {
        let targets = self.shared.registry.borrow().hotkey_targets(event);
        self.track_selection(|| {
            let mut handled = 0;
            for (plugin, combo) in targets {
                match plugin.try_borrow_mut() {
                    Ok(mut plugin) => {
                        plugin.hotkey(&combo, event);
                        handled += 1;
                    }
                    Err(_) => log::warn!("plugin busy, dropping hotkey {}", combo),
                }
            }
            handled
        })
    }

    pub fn handle_pointer(&self, event: &PointerEvent) -> InputResponse {
        match event {
            PointerEvent::Down {
                position,
                button: MouseButton::Right,
            } => {
                self.show_context_menu(*position);
                InputResponse::default()
            }
            PointerEvent::Down { .. } => {
                if let Some(menu) = self.shared.menu.borrow_mut().as_mut() {
                    menu.hide_all();
                }
                InputResponse::default()
            }
            PointerEvent::Wheel { position, delta_y } => self.handle_canvas_event(&CanvasEvent::Wheel {
                position: *position,
                delta_y: *delta_y,
            }),
            _ => InputResponse::default(),
        }
    }

    /// Forward a canvas event to every plugin, in registration order.
    pub fn handle_canvas_event(&self, event: &CanvasEvent) -> InputResponse {
        if let CanvasEvent::ContainerResized { size, .. } = event {
            if let Ok(canvas) = self.canvas() {
                canvas.borrow_mut().set_container_size(*size);
            }
        }
        self.shared.broadcast(event)
    }

    /// Collect menu contributions and show them at `position`.
    /// Returns false when no plugin contributed anything.
    pub fn show_context_menu(&self, position: Point) -> bool {
        let plugins = self.shared.registry.borrow().plugins();
        let items = menu::collect_menu(&plugins);
        match self.shared.menu.borrow_mut().as_mut() {
            Some(menu) => menu.open(items, position),
            None => false,
        }
    }

    /// Items of the context menu while it is visible.
    pub fn context_menu(&self) -> Option<(Point, Vec<MenuItem>)> {
        let menu = self.shared.menu.borrow();
        let menu = menu.as_ref()?;
        menu.position().map(|position| (position, menu.items().to_vec()))
    }

    /// Hide the menu and run the action of item `index` unless it is disabled.
    pub fn activate_menu_item(&self, index: usize) -> EditorResult<Option<ApiResponse>> {
        let item = {
            let mut menu = self.shared.menu.borrow_mut();
            let Some(menu) = menu.as_mut() else {
                return Ok(None);
            };
            let item = menu.is_visible().then(|| menu.items().get(index).cloned()).flatten();
            menu.hide_all();
            item
        };
        match item {
            Some(item) if !item.disabled => self.dispatch(&item.action.api, item.action.args).map(Some),
            _ => Ok(None),
        }
    }

    /// Run `f` and tell plugins when it changed the active selection.
    fn track_selection<R>(&self, f: impl FnOnce() -> R) -> R {
        let before = self.shared.active_ids();
        let result = f();
        if self.shared.active_ids() != before {
            self.handle_canvas_event(&CanvasEvent::SelectionChanged);
        }
        result
    }

    /// Destroy every plugin and clear all state. The editor can be
    /// initialized again afterwards.
    pub fn destroy(&mut self) {
        let plugins = self.shared.registry.borrow().plugins();
        for plugin in &plugins {
            match plugin.try_borrow_mut() {
                Ok(mut plugin) => plugin.destroy(),
                Err(_) => log::warn!("plugin busy during destroy"),
            }
        }
        {
            let mut hooks = self.shared.hooks.borrow_mut();
            self.shared.registry.borrow_mut().unregister_all(&mut hooks);
            hooks.clear();
        }
        self.shared.events.clear();
        *self.shared.menu.borrow_mut() = None;
        *self.shared.canvas.borrow_mut() = None;
        log::debug!("editor destroyed, {} plugin(s) released", plugins.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::{Canvas, CanvasObject, Scene};
    use crate::hooks::HookOutcome;
    use crate::plugin::PluginDescriptor;
    use crate::plugins::workspace::CSS_PIXELS_PER_INCH;
    use kurbo::{Rect, Size};
    use serde_json::json;
    use std::cell::Cell;

    fn scene() -> (Rc<RefCell<Scene>>, SharedCanvas) {
        let scene = Rc::new(RefCell::new(Scene::new(Size::new(800.0, 600.0))));
        let canvas: SharedCanvas = scene.clone();
        (scene, canvas)
    }

    fn editor() -> (Editor, Rc<RefCell<Scene>>) {
        let (scene, canvas) = scene();
        let mut editor = Editor::default();
        editor.init(canvas).unwrap();
        editor.install_defaults(&EditorConfig::default()).unwrap();
        (editor, scene)
    }

    fn args(values: Vec<Value>) -> ApiArgs {
        ApiArgs::from(values)
    }

    /// Plugin declaring event "one" and api "clone" that records its calls.
    struct Recorder {
        host: Host,
        calls: Rc<RefCell<Vec<String>>>,
    }

    thread_local! {
        static RECORDED: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));
    }

    impl PluginType for Recorder {
        const DESCRIPTOR: PluginDescriptor = PluginDescriptor {
            name: "Recorder",
            events: &["one"],
            apis: &["record"],
            hotkeys: &["ctrl+r"],
            hooks: &[HookName::SaveBefore],
        };
        type Options = ();

        fn create(init: PluginInit, _options: ()) -> EditorResult<Self> {
            Ok(Self {
                host: init.host,
                calls: RECORDED.with(Rc::clone),
            })
        }
    }

    impl Plugin for Recorder {
        fn call_api(&mut self, api: &str, args: &ApiArgs) -> EditorResult<ApiResponse> {
            self.calls.borrow_mut().push(format!("{}:{}", api, args.str(0).unwrap_or_default()));
            self.host.emit("one", EventPayload::None);
            Ok(ApiResponse::Value(json!(self.calls.borrow().len())))
        }

        fn hook(&mut self, hook: HookName, _payload: &HookPayload) -> HookOutcome {
            self.calls.borrow_mut().push(hook.to_string());
            HookOutcome::done()
        }

        fn hotkey(&mut self, combo: &str, event: &KeyEvent) {
            self.calls.borrow_mut().push(format!("{}:{:?}", combo, event.phase));
        }
    }

    /// Declares the already taken event "one".
    struct Clash;

    impl PluginType for Clash {
        const DESCRIPTOR: PluginDescriptor = PluginDescriptor {
            events: &["one"],
            ..PluginDescriptor::named("Clash")
        };
        type Options = ();

        fn create(_init: PluginInit, _options: ()) -> EditorResult<Self> {
            Ok(Clash)
        }
    }

    impl Plugin for Clash {}

    /// Selects every drawable, but only once its response is awaited.
    struct LateSelect {
        canvas: SharedCanvas,
    }

    impl PluginType for LateSelect {
        const DESCRIPTOR: PluginDescriptor = PluginDescriptor {
            apis: &["selectLater"],
            ..PluginDescriptor::named("LateSelect")
        };
        type Options = ();

        fn create(init: PluginInit, _options: ()) -> EditorResult<Self> {
            Ok(Self { canvas: init.canvas })
        }
    }

    impl Plugin for LateSelect {
        fn call_api(&mut self, _api: &str, _args: &ApiArgs) -> EditorResult<ApiResponse> {
            let canvas = Rc::clone(&self.canvas);
            Ok(ApiResponse::deferred(async move {
                let mut canvas = canvas.borrow_mut();
                let ids = canvas
                    .objects()
                    .iter()
                    .filter(|object| !object.is_workspace())
                    .map(|object| object.id.clone())
                    .collect();
                canvas.set_active(ids);
                Ok(Value::Null)
            }))
        }
    }

    #[test]
    fn test_init_registers_document_plugin() {
        let (_, canvas) = scene();
        let mut editor = Editor::default();
        assert!(matches!(
            editor.use_plugin::<SelectPlugin>(()),
            Err(EditorError::Configuration(ConfigurationError::CanvasNotBound))
        ));

        editor.init(canvas).unwrap();
        assert_eq!(editor.plugin_names(), vec!["DocumentPlugin"]);
        assert!(editor.has_api("loadJSON"));
        assert!(matches!(
            editor.dispatch("nothing", ApiArgs::new()),
            Err(EditorError::UnknownApi(_))
        ));
    }

    #[test]
    fn test_registered_api_reaches_plugin() {
        let (editor, _) = editor();
        editor.use_plugin::<Recorder>(()).unwrap();

        let fired = Rc::new(Cell::new(0));
        let counter = Rc::clone(&fired);
        editor.on("one", move |_| counter.set(counter.get() + 1));

        let value = pollster::block_on(editor.call("record", args(vec![json!("x")]))).unwrap();
        assert_eq!(value, json!(1));
        assert_eq!(fired.get(), 1);

        let recorded = editor
            .with_plugin::<Recorder, _>("Recorder", |plugin| plugin.calls.borrow().clone())
            .unwrap();
        assert_eq!(recorded, vec!["record:x"]);
        assert!(matches!(
            editor.with_plugin::<Clash, _>("Recorder", |_| ()),
            Err(EditorError::PluginNotFound(_))
        ));
    }

    #[test]
    fn test_conflicting_event_keeps_first_plugin() {
        let (editor, _) = editor();
        editor.use_plugin::<Recorder>(()).unwrap();
        let before = editor.plugin_names();

        let err = editor.use_plugin::<Clash>(()).unwrap_err();
        assert!(matches!(
            err,
            EditorError::Configuration(ConfigurationError::DuplicateEvent { .. })
        ));
        assert_eq!(editor.plugin_names(), before);
        assert!(pollster::block_on(editor.call("record", ApiArgs::new())).is_ok());

        let err = editor.use_plugin::<Recorder>(()).unwrap_err();
        assert!(matches!(
            err,
            EditorError::Configuration(ConfigurationError::DuplicatePlugin(_))
        ));
    }

    #[test]
    fn test_hotkeys_get_both_phases() {
        let (editor, _) = editor();
        editor.use_plugin::<Recorder>(()).unwrap();
        let calls = editor
            .with_plugin::<Recorder, _>("Recorder", |plugin| Rc::clone(&plugin.calls))
            .unwrap();
        calls.borrow_mut().clear();

        let ctrl = crate::input::Modifiers::ctrl();
        assert_eq!(editor.handle_key(&KeyEvent::down("r", ctrl)), 1);
        assert_eq!(editor.handle_key(&KeyEvent::up("r", ctrl)), 1);
        assert_eq!(editor.handle_key(&KeyEvent::down("q", ctrl)), 0);
        assert_eq!(*calls.borrow(), vec!["ctrl+r:Down", "ctrl+r:Up"]);
    }

    #[test]
    fn test_save_hooks_run_in_registration_order() {
        let (editor, _) = editor();
        editor.use_plugin::<Recorder>(()).unwrap();
        assert_eq!(
            editor.hook_taps(HookName::SaveBefore),
            vec!["RulerPluginhookSaveBefore", "RecorderhookSaveBefore"]
        );
        pollster::block_on(editor.run_hook(HookName::SaveBefore, HookPayload::Empty)).unwrap();
    }

    #[test]
    fn test_set_size_then_one_zooms_by_dpi() {
        let (editor, scene) = editor();
        pollster::block_on(editor.call("setSize", args(vec![json!(800), json!(600), json!(300)]))).unwrap();
        pollster::block_on(editor.call("one", ApiArgs::new())).unwrap();

        let zoom = scene.borrow().zoom();
        assert!((zoom - CSS_PIXELS_PER_INCH / 300.0).abs() < 1e-9);
        let workspace = scene.borrow().workspace().cloned().unwrap();
        assert_eq!((workspace.width, workspace.height, workspace.dpi()), (800.0, 600.0, Some(300.0)));
        assert_eq!(scene.borrow().clip_rect(), Some(workspace.bounds()));
    }

    #[test]
    fn test_set_size_rejects_missing_dimension() {
        let (editor, scene) = editor();
        let before = scene.borrow().workspace().cloned();
        let err = pollster::block_on(editor.call("setSize", args(vec![json!(800), Value::Null, json!(300)])))
            .unwrap_err();
        assert!(matches!(err, EditorError::Workspace(_)));
        assert_eq!(scene.borrow().workspace().cloned(), before);
    }

    #[test]
    fn test_auto_is_idempotent() {
        let (editor, scene) = editor();
        pollster::block_on(editor.call("auto", ApiArgs::new())).unwrap();
        let first = scene.borrow().viewport_transform();
        pollster::block_on(editor.call("auto", ApiArgs::new())).unwrap();
        assert_eq!(scene.borrow().viewport_transform(), first);

        // 900x1200 page in an 800x600 container: limited by height.
        let expected = 600.0 / 1200.0 * 0.9;
        assert!((scene.borrow().zoom() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_wheel_zoom_is_bounded() {
        let (editor, scene) = editor();
        let wheel = |delta_y| PointerEvent::Wheel {
            position: Point::new(10.0, 10.0),
            delta_y,
        };
        for _ in 0..100 {
            let response = editor.handle_pointer(&wheel(1000.0));
            assert!(response.prevent_default && response.stop_propagation);
        }
        assert!((scene.borrow().zoom() - 0.01).abs() < 1e-12);
        for _ in 0..100 {
            editor.handle_pointer(&wheel(-1000.0));
        }
        assert!((scene.borrow().zoom() - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_context_menu_merges_contributions() {
        let (editor, scene) = editor();
        assert!(!editor.show_context_menu(Point::new(1.0, 1.0)));
        assert!(editor.context_menu().is_none());

        let object = CanvasObject::drawable("rect", Rect::new(0.0, 0.0, 10.0, 10.0));
        let id = object.id.clone();
        scene.borrow_mut().add(object);
        scene.borrow_mut().set_active(vec![id]);

        let response = editor.handle_pointer(&PointerEvent::Down {
            position: Point::new(30.0, 40.0),
            button: MouseButton::Right,
        });
        assert_eq!(response, InputResponse::default());
        let (position, items) = editor.context_menu().unwrap();
        assert_eq!(position, Point::new(30.0, 40.0));
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].action.api, "clone");

        let before = scene.borrow().objects().len();
        let response = editor.activate_menu_item(0).unwrap().unwrap();
        pollster::block_on(response.resolve()).unwrap();
        assert_eq!(scene.borrow().objects().len(), before + 1);
        assert!(editor.context_menu().is_none());
        assert!(editor.activate_menu_item(0).unwrap().is_none());
    }

    #[test]
    fn test_selection_made_by_deferred_work_is_reported() {
        let (editor, scene) = editor();
        editor.use_plugin::<LateSelect>(()).unwrap();
        scene
            .borrow_mut()
            .add(CanvasObject::drawable("rect", Rect::new(0.0, 0.0, 10.0, 10.0)));

        let fired = Rc::new(Cell::new(0));
        let counter = Rc::clone(&fired);
        editor.on(crate::plugins::document::SELECT_ONE, move |_| counter.set(counter.get() + 1));

        let response = editor.dispatch("selectLater", ApiArgs::new()).unwrap();
        assert_eq!(fired.get(), 0);
        pollster::block_on(response.resolve()).unwrap();
        assert_eq!(fired.get(), 1);

        // Nothing changes the second time round.
        pollster::block_on(editor.call("selectLater", ApiArgs::new())).unwrap();
        assert_eq!(fired.get(), 1);
    }

    #[test]
    fn test_destroy_then_init_again() {
        let (mut editor, _) = editor();
        editor.use_plugin::<Recorder>(()).unwrap();
        let calls = RECORDED.with(Rc::clone);
        calls.borrow_mut().clear();
        let listener = editor.on("sizeChange", |_| {});
        assert!(listener > 0);

        editor.destroy();
        assert!(!editor.is_initialized());
        assert!(editor.plugin_names().is_empty());
        assert!(!editor.has_api("record"));
        assert!(editor.hook_taps(HookName::SaveBefore).is_empty());
        assert!(matches!(editor.canvas(), Err(EditorError::Configuration(_))));

        let (_, canvas) = scene();
        editor.init(canvas).unwrap();
        editor.install_defaults(&EditorConfig::default()).unwrap();
        editor.use_plugin::<Recorder>(()).unwrap();
        pollster::block_on(editor.call("record", ApiArgs::new())).unwrap();
        assert_eq!(*calls.borrow(), vec!["record:"]);
    }

    #[test]
    fn test_resize_is_throttled() {
        let (editor, scene) = editor();
        let start = std::time::Instant::now();
        let resize = |width: f64, at| CanvasEvent::ContainerResized {
            size: Size::new(width, 600.0),
            at,
        };

        editor.handle_canvas_event(&resize(1000.0, start));
        let after_first = scene.borrow().viewport_transform();
        assert_eq!(scene.borrow().dimensions(), Size::new(1000.0, 600.0));

        // Inside the window: container changes, viewport does not yet.
        editor.handle_canvas_event(&resize(400.0, start + std::time::Duration::from_millis(10)));
        assert_eq!(scene.borrow().viewport_transform(), after_first);

        editor.handle_canvas_event(&CanvasEvent::Frame {
            at: start + std::time::Duration::from_millis(60),
        });
        assert_ne!(scene.borrow().viewport_transform(), after_first);
        assert_eq!(scene.borrow().dimensions(), Size::new(400.0, 600.0));
    }
}
