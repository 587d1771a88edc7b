//! Right-click menu assembled from plugin contributions.

use crate::plugin::{ApiArgs, PluginHandle};
use kurbo::Point;

/// API call run when a menu item is activated.
#[derive(Debug, Clone, PartialEq)]
pub struct MenuAction {
    pub api: String,
    pub args: ApiArgs,
}

impl MenuAction {
    pub fn new(api: impl Into<String>, args: ApiArgs) -> Self {
        Self {
            api: api.into(),
            args,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MenuItem {
    pub text: String,
    /// Shortcut hint shown next to the label.
    pub hotkey: Option<String>,
    pub disabled: bool,
    pub action: MenuAction,
}

impl MenuItem {
    pub fn new(text: impl Into<String>, action: MenuAction) -> Self {
        Self {
            text: text.into(),
            hotkey: None,
            disabled: false,
            action,
        }
    }

    pub fn with_hotkey(mut self, hotkey: impl Into<String>) -> Self {
        self.hotkey = Some(hotkey.into());
        self
    }
}

/// The single context menu owned by the editor.
#[derive(Debug, Default)]
pub struct ContextMenu {
    items: Vec<MenuItem>,
    position: Option<Point>,
}

impl ContextMenu {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hide_all(&mut self) {
        self.position = None;
    }

    pub fn set_data(&mut self, items: Vec<MenuItem>) {
        self.items = items;
    }

    pub fn show(&mut self, position: Point) {
        self.position = Some(position);
    }

    pub fn is_visible(&self) -> bool {
        self.position.is_some()
    }

    /// Where the menu is shown, if visible.
    pub fn position(&self) -> Option<Point> {
        self.position
    }

    pub fn items(&self) -> &[MenuItem] {
        &self.items
    }

    /// Replace the items and show the menu at `position`.
    ///
    /// With no items the menu is left as is.
    pub fn open(&mut self, items: Vec<MenuItem>, position: Point) -> bool {
        if items.is_empty() {
            return false;
        }
        self.hide_all();
        self.set_data(items);
        self.show(position);
        true
    }
}

/// Concatenate the menu contributions of `plugins`, in order.
pub fn collect_menu(plugins: &[PluginHandle]) -> Vec<MenuItem> {
    let mut items = Vec::new();
    for plugin in plugins {
        match plugin.try_borrow() {
            Ok(plugin) => items.extend(plugin.context_menu().unwrap_or_default()),
            Err(_) => log::warn!("skipping busy plugin while building the context menu"),
        }
    }
    items
}
