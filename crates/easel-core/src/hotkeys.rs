//! Hotkey strings such as `"ctrl+c, command+c"`.
//!
//! A hotkey is a comma separated list of alternative combos; each combo is a
//! `+` separated list of modifiers followed by the key.

use crate::input::{KeyEvent, Modifiers};

/// One key combination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyCombo {
    pub modifiers: Modifiers,
    pub key: String,
}

impl KeyCombo {
    /// Parse a single combo. Returns `None` for an empty combo or one that
    /// only names modifiers.
    pub fn parse(combo: &str) -> Option<Self> {
        let mut modifiers = Modifiers::default();
        let mut key = None;
        for part in combo.split('+').map(str::trim).filter(|p| !p.is_empty()) {
            match part.to_ascii_lowercase().as_str() {
                "ctrl" | "control" | "⌃" => modifiers.ctrl = true,
                "shift" | "⇧" => modifiers.shift = true,
                "alt" | "option" | "⌥" => modifiers.alt = true,
                "command" | "cmd" | "meta" | "⌘" => modifiers.meta = true,
                other => key = Some(normalize_key(other)),
            }
        }
        key.map(|key| Self { modifiers, key })
    }

    pub fn matches(&self, event: &KeyEvent) -> bool {
        self.modifiers == event.modifiers && self.key == normalize_key(&event.key)
    }
}

/// Canonical lowercase key name.
fn normalize_key(key: &str) -> String {
    let lower = key.to_ascii_lowercase();
    match lower.as_str() {
        "esc" => "escape".to_string(),
        "del" => "delete".to_string(),
        "return" => "enter".to_string(),
        " " | "spacebar" => "space".to_string(),
        "arrowleft" => "left".to_string(),
        "arrowright" => "right".to_string(),
        "arrowup" => "up".to_string(),
        "arrowdown" => "down".to_string(),
        _ => lower,
    }
}

/// A declared hotkey with its platform alternatives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hotkey {
    raw: String,
    alternatives: Vec<KeyCombo>,
}

impl Hotkey {
    pub fn parse(raw: &str) -> Self {
        let alternatives = raw.split(',').filter_map(KeyCombo::parse).collect::<Vec<_>>();
        if alternatives.is_empty() {
            log::warn!("hotkey {:?} has no usable combo", raw);
        }
        Self {
            raw: raw.to_string(),
            alternatives,
        }
    }

    /// The declared string, which is what handlers receive.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn alternatives(&self) -> &[KeyCombo] {
        &self.alternatives
    }

    /// True when any alternative matches. Both key phases match.
    pub fn matches(&self, event: &KeyEvent) -> bool {
        self.alternatives.iter().any(|combo| combo.matches(event))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_alternatives() {
        let hotkey = Hotkey::parse("ctrl+c, command+c");
        assert_eq!(hotkey.raw(), "ctrl+c, command+c");
        assert_eq!(hotkey.alternatives().len(), 2);
        assert_eq!(hotkey.alternatives()[0].modifiers, Modifiers::ctrl());
        assert_eq!(hotkey.alternatives()[1].modifiers, Modifiers::meta());
        assert_eq!(hotkey.alternatives()[1].key, "c");
    }

    #[test]
    fn test_matches_both_phases() {
        let hotkey = Hotkey::parse("ctrl+c, command+c");
        assert!(hotkey.matches(&KeyEvent::down("c", Modifiers::ctrl())));
        assert!(hotkey.matches(&KeyEvent::up("C", Modifiers::meta())));
        assert!(!hotkey.matches(&KeyEvent::down("c", Modifiers::NONE)));
        assert!(!hotkey.matches(&KeyEvent::down("v", Modifiers::ctrl())));
    }

    #[test]
    fn test_key_aliases() {
        let hotkey = Hotkey::parse("esc");
        assert!(hotkey.matches(&KeyEvent::down("Escape", Modifiers::NONE)));
        assert!(Hotkey::parse("left").matches(&KeyEvent::down("ArrowLeft", Modifiers::NONE)));
    }

    #[test]
    fn test_modifier_only_combo_is_dropped() {
        let hotkey = Hotkey::parse("ctrl+, shift+a");
        assert_eq!(hotkey.alternatives().len(), 1);
        assert!(hotkey.alternatives()[0].modifiers.shift);
    }
}
