//! Publish/subscribe notifications.
//!
//! This channel only carries notifications such as size or selection
//! changes. Request/response calls go through the API dispatch table.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

/// Identifies a listener for later removal.
pub type ListenerId = u64;

/// Notification payloads.
#[derive(Debug, Clone, PartialEq)]
pub enum EventPayload {
    None,
    SizeChange { width: f64, height: f64, dpi: f64 },
    /// Ids of the objects involved in a selection change.
    Selection(Vec<String>),
}

type Listener = Rc<dyn Fn(&EventPayload)>;

/// Event emitter keyed by event name.
#[derive(Default)]
pub struct EventBus {
    listeners: RefCell<HashMap<String, Vec<(ListenerId, Listener)>>>,
    next_id: Cell<ListenerId>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to `event`.
    pub fn on(&self, event: &str, listener: impl Fn(&EventPayload) + 'static) -> ListenerId {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        self.listeners
            .borrow_mut()
            .entry(event.to_string())
            .or_default()
            .push((id, Rc::new(listener)));
        id
    }

    /// Unsubscribe. A missing listener id is a no-op.
    pub fn off(&self, event: &str, listener: Option<ListenerId>) -> bool {
        let Some(id) = listener else {
            return false;
        };
        let mut listeners = self.listeners.borrow_mut();
        match listeners.get_mut(event) {
            Some(list) => {
                let before = list.len();
                list.retain(|(existing, _)| *existing != id);
                list.len() != before
            }
            None => false,
        }
    }

    /// Notify every listener of `event`. Returns how many were called.
    ///
    /// Listeners may subscribe or unsubscribe while being notified; such
    /// changes apply from the next emit.
    pub fn emit(&self, event: &str, payload: EventPayload) -> usize {
        let snapshot: Vec<Listener> = self
            .listeners
            .borrow()
            .get(event)
            .map(|list| list.iter().map(|(_, l)| Rc::clone(l)).collect())
            .unwrap_or_default();
        log::trace!("emit {} to {} listener(s)", event, snapshot.len());
        for listener in &snapshot {
            listener(&payload);
        }
        snapshot.len()
    }

    pub fn listener_count(&self, event: &str) -> usize {
        self.listeners.borrow().get(event).map_or(0, Vec::len)
    }

    /// Remove every listener.
    pub fn clear(&self) {
        self.listeners.borrow_mut().clear();
    }
}
