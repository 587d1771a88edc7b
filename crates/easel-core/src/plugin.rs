//! Plugin contract and registry.
//!
//! A plugin type declares a static [`PluginDescriptor`]: its unique name, the
//! events it emits, the APIs it serves, its hotkeys and the lifecycle hooks
//! it taps. Registration validates the descriptor against everything already
//! registered before anything is constructed or recorded.

use crate::canvas::SharedCanvas;
use crate::editor::Host;
use crate::error::{ConfigurationError, EditorError, EditorResult};
use crate::hooks::{HookName, HookOutcome, HookPayload, HookPipeline, LocalBoxFuture};
use crate::hotkeys::Hotkey;
use crate::input::{CanvasEvent, InputResponse, KeyEvent};
use crate::menu::MenuItem;
use serde_json::Value;
use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

/// Static declaration of a plugin type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PluginDescriptor {
    pub name: &'static str,
    pub events: &'static [&'static str],
    pub apis: &'static [&'static str],
    pub hotkeys: &'static [&'static str],
    pub hooks: &'static [HookName],
}

impl PluginDescriptor {
    /// Descriptor with only a name.
    pub const fn named(name: &'static str) -> Self {
        Self {
            name,
            events: &[],
            apis: &[],
            hotkeys: &[],
            hooks: &[],
        }
    }
}

/// Positional API arguments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApiArgs(pub Vec<Value>);

impl ApiArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.0.get(index).filter(|value| !value.is_null())
    }

    pub fn f64(&self, index: usize) -> Option<f64> {
        self.get(index).and_then(Value::as_f64)
    }

    pub fn str(&self, index: usize) -> Option<&str> {
        self.get(index).and_then(Value::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<Value>> for ApiArgs {
    fn from(values: Vec<Value>) -> Self {
        Self(values)
    }
}

/// Result of an API call: a value now, or work to await.
pub enum ApiResponse {
    Value(Value),
    Deferred(LocalBoxFuture<'static, EditorResult<Value>>),
}

impl ApiResponse {
    pub fn unit() -> Self {
        ApiResponse::Value(Value::Null)
    }

    pub fn deferred(work: impl Future<Output = EditorResult<Value>> + 'static) -> Self {
        ApiResponse::Deferred(Box::pin(work))
    }

    /// Wait for the value.
    pub async fn resolve(self) -> EditorResult<Value> {
        match self {
            ApiResponse::Value(value) => Ok(value),
            ApiResponse::Deferred(work) => work.await,
        }
    }
}

impl fmt::Debug for ApiResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiResponse::Value(value) => f.debug_tuple("Value").field(value).finish(),
            ApiResponse::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

impl From<Value> for ApiResponse {
    fn from(value: Value) -> Self {
        ApiResponse::Value(value)
    }
}

/// Behavior of a registered plugin. Every capability is optional.
pub trait Plugin: Any {
    /// Serve one of the APIs declared in the descriptor.
    fn call_api(&mut self, api: &str, _args: &ApiArgs) -> EditorResult<ApiResponse> {
        Err(EditorError::UnknownApi(api.to_string()))
    }

    /// Handle a lifecycle hook listed in the descriptor.
    fn hook(&mut self, _hook: HookName, _payload: &HookPayload) -> HookOutcome {
        HookOutcome::done()
    }

    /// Handle a declared hotkey. `combo` is the declared string; both key
    /// phases are delivered.
    fn hotkey(&mut self, _combo: &str, _event: &KeyEvent) {}

    fn context_menu(&self) -> Option<Vec<MenuItem>> {
        None
    }

    fn on_canvas_event(&mut self, _event: &CanvasEvent) -> InputResponse {
        InputResponse::default()
    }

    /// Release resources. Called once when the editor is destroyed.
    fn destroy(&mut self) {}
}

/// What a plugin receives when it is constructed.
#[derive(Clone)]
pub struct PluginInit {
    pub canvas: SharedCanvas,
    pub host: Host,
}

/// A plugin type the editor can construct.
pub trait PluginType: Plugin + Sized {
    const DESCRIPTOR: PluginDescriptor;

    type Options: Default;

    fn create(init: PluginInit, options: Self::Options) -> EditorResult<Self>;
}

pub type PluginHandle = Rc<RefCell<dyn Plugin>>;

struct PluginEntry {
    descriptor: PluginDescriptor,
    instance: PluginHandle,
    hotkeys: Vec<Hotkey>,
}

/// Registered plugins, in registration order, with the event and API tables.
#[derive(Default)]
pub struct PluginRegistry {
    entries: Vec<PluginEntry>,
    events: HashMap<&'static str, &'static str>,
    apis: HashMap<&'static str, &'static str>,
}

fn tap_key(plugin: &str, hook: HookName) -> String {
    format!("{}{}", plugin, hook.method_name())
}

fn first_duplicate(names: &[&'static str]) -> Option<&'static str> {
    names
        .iter()
        .enumerate()
        .find_map(|(i, name)| names[..i].contains(name).then_some(*name))
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check that `descriptor` can be registered. Mutates nothing.
    pub fn validate(&self, descriptor: &PluginDescriptor, hooks: &HookPipeline) -> EditorResult<()> {
        let plugin = descriptor.name;
        if self.get(plugin).is_some() {
            return Err(ConfigurationError::DuplicatePlugin(plugin.to_string()).into());
        }

        for event in descriptor.events {
            if let Some(owner) = self.events.get(event) {
                return Err(ConfigurationError::DuplicateEvent {
                    plugin: plugin.to_string(),
                    event: event.to_string(),
                    owner: owner.to_string(),
                }
                .into());
            }
        }
        if let Some(event) = first_duplicate(descriptor.events) {
            return Err(ConfigurationError::DuplicateEvent {
                plugin: plugin.to_string(),
                event: event.to_string(),
                owner: plugin.to_string(),
            }
            .into());
        }

        for api in descriptor.apis {
            if let Some(owner) = self.apis.get(api) {
                return Err(ConfigurationError::DuplicateApi {
                    plugin: plugin.to_string(),
                    api: api.to_string(),
                    owner: owner.to_string(),
                }
                .into());
            }
        }
        if let Some(api) = first_duplicate(descriptor.apis) {
            return Err(ConfigurationError::DuplicateApi {
                plugin: plugin.to_string(),
                api: api.to_string(),
                owner: plugin.to_string(),
            }
            .into());
        }

        for hook in descriptor.hooks {
            hooks.check_tap(*hook, &tap_key(plugin, *hook))?;
        }
        Ok(())
    }

    /// Record an already constructed plugin and tap its hooks.
    pub fn insert(
        &mut self,
        descriptor: PluginDescriptor,
        instance: PluginHandle,
        hooks: &mut HookPipeline,
    ) -> EditorResult<()> {
        self.validate(&descriptor, hooks)?;

        for hook in descriptor.hooks {
            let hook = *hook;
            let plugin = Rc::downgrade(&instance);
            let name = descriptor.name;
            hooks.tap(
                hook,
                tap_key(name, hook),
                Rc::new(move |payload: &HookPayload| run_tap(&plugin, name, hook, payload)),
            )?;
        }

        for event in descriptor.events {
            self.events.insert(*event, descriptor.name);
        }
        for api in descriptor.apis {
            self.apis.insert(*api, descriptor.name);
        }
        let hotkeys = descriptor.hotkeys.iter().map(|raw| Hotkey::parse(raw)).collect();
        self.entries.push(PluginEntry {
            descriptor,
            instance,
            hotkeys,
        });
        log::info!("registered plugin {}", descriptor.name);
        Ok(())
    }

    /// Validate, build, then record. A failure at any step leaves the
    /// registry and the pipeline untouched.
    pub fn register(
        &mut self,
        descriptor: PluginDescriptor,
        build: impl FnOnce() -> EditorResult<PluginHandle>,
        hooks: &mut HookPipeline,
    ) -> EditorResult<PluginHandle> {
        self.validate(&descriptor, hooks)?;
        let instance = build()?;
        self.insert(descriptor, Rc::clone(&instance), hooks)?;
        Ok(instance)
    }

    pub fn get(&self, name: &str) -> Option<PluginHandle> {
        self.entries
            .iter()
            .find(|entry| entry.descriptor.name == name)
            .map(|entry| Rc::clone(&entry.instance))
    }

    pub fn descriptor(&self, name: &str) -> Option<PluginDescriptor> {
        self.entries
            .iter()
            .find(|entry| entry.descriptor.name == name)
            .map(|entry| entry.descriptor)
    }

    /// Plugin instances in registration order.
    pub fn plugins(&self) -> Vec<PluginHandle> {
        self.entries.iter().map(|entry| Rc::clone(&entry.instance)).collect()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.entries.iter().map(|entry| entry.descriptor.name).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Name of the plugin serving `api`.
    pub fn api_owner(&self, api: &str) -> Option<&'static str> {
        self.apis.get(api).copied()
    }

    /// Name of the plugin that declared `event`.
    pub fn event_owner(&self, event: &str) -> Option<&'static str> {
        self.events.get(event).copied()
    }

    /// Owner name and instance serving `api`.
    pub fn api_target(&self, api: &str) -> Option<(&'static str, PluginHandle)> {
        let owner = self.api_owner(api)?;
        self.get(owner).map(|instance| (owner, instance))
    }

    /// Every declared hotkey with the plugin that declared it.
    pub fn hotkey_bindings(&self) -> Vec<(&'static str, &Hotkey)> {
        self.entries
            .iter()
            .flat_map(|entry| entry.hotkeys.iter().map(move |hotkey| (entry.descriptor.name, hotkey)))
            .collect()
    }

    /// Plugins with a hotkey matching `event`, with the declared combo string.
    pub fn hotkey_targets(&self, event: &KeyEvent) -> Vec<(PluginHandle, String)> {
        self.entries
            .iter()
            .flat_map(|entry| {
                entry
                    .hotkeys
                    .iter()
                    .filter(|hotkey| hotkey.matches(event))
                    .map(|hotkey| (Rc::clone(&entry.instance), hotkey.raw().to_string()))
            })
            .collect()
    }

    /// Remove one plugin with its events, APIs and taps.
    pub fn unregister(&mut self, name: &str, hooks: &mut HookPipeline) -> Option<PluginHandle> {
        let index = self.entries.iter().position(|entry| entry.descriptor.name == name)?;
        let entry = self.entries.remove(index);
        self.events.retain(|_, owner| *owner != name);
        self.apis.retain(|_, owner| *owner != name);
        for hook in entry.descriptor.hooks {
            hooks.untap(*hook, &tap_key(name, *hook));
        }
        log::info!("unregistered plugin {}", name);
        Some(entry.instance)
    }

    /// Remove every plugin and its taps, returning the instances in
    /// registration order.
    pub fn unregister_all(&mut self, hooks: &mut HookPipeline) -> Vec<PluginHandle> {
        self.events.clear();
        self.apis.clear();
        self.entries
            .drain(..)
            .map(|entry| {
                for hook in entry.descriptor.hooks {
                    hooks.untap(*hook, &tap_key(entry.descriptor.name, *hook));
                }
                entry.instance
            })
            .collect()
    }
}

fn run_tap(plugin: &Weak<RefCell<dyn Plugin>>, name: &str, hook: HookName, payload: &HookPayload) -> HookOutcome {
    let Some(plugin) = plugin.upgrade() else {
        return HookOutcome::fail(format!("{} is no longer registered", name));
    };
    match plugin.try_borrow_mut() {
        Ok(mut plugin) => plugin.hook(hook, payload),
        Err(_) => HookOutcome::fail(format!("{} is busy", name)),
    }
}
