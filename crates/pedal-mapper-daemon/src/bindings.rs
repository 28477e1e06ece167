//! Pedal buttons, resolved selectors and the key binding table
//!
//! The binding table is static data: each of the six [`Selector`]s maps to an
//! ordered list of [`KeyCombo`]s that the emitter plays back when that
//! selector is resolved.

use std::collections::HashSet;
use std::fmt;

use evdev::Key;

/// One of the three physical pedal switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Button {
    Left,
    Middle,
    Right,
}

impl Button {
    /// All buttons in report priority order.
    pub const ALL: [Button; 3] = [Button::Left, Button::Middle, Button::Right];

    /// Position of this button in raw state arrays.
    pub fn index(self) -> usize {
        match self {
            Button::Left => 0,
            Button::Middle => 1,
            Button::Right => 2,
        }
    }
}

impl fmt::Display for Button {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Button::Left => write!(f, "left"),
            Button::Middle => write!(f, "middle"),
            Button::Right => write!(f, "right"),
        }
    }
}

/// A resolved pedal action, used to index the [`BindingTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Selector {
    Single(Button),
    Double(Button),
}

impl Selector {
    /// Slot in the binding table: singles first, then doubles.
    pub fn index(self) -> usize {
        match self {
            Selector::Single(button) => button.index(),
            Selector::Double(button) => Button::ALL.len() + button.index(),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Single(button) => write!(f, "{}", button),
            Selector::Double(button) => write!(f, "double-{}", button),
        }
    }
}

/// A key combination emitted for a selector.
///
/// `mods` are pressed first and released last; `keys` are pressed and
/// released in between. With `hold` set the modifiers latch instead: the
/// first resolution presses them, the next one releases them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyCombo {
    pub mods: Vec<Key>,
    pub keys: Vec<Key>,
    pub hold: bool,
}

impl KeyCombo {
    /// A combo that is pressed and fully released in one go.
    pub fn new(mods: &[Key], keys: &[Key]) -> Self {
        Self {
            mods: mods.to_vec(),
            keys: keys.to_vec(),
            hold: false,
        }
    }

    /// A combo whose modifiers toggle between latched and released.
    pub fn held(mods: &[Key]) -> Self {
        Self {
            mods: mods.to_vec(),
            keys: Vec::new(),
            hold: true,
        }
    }
}

const SELECTOR_COUNT: usize = 6;

/// Immutable mapping from [`Selector`] to the combos it emits.
#[derive(Debug, Clone, Default)]
pub struct BindingTable {
    combos: [Vec<KeyCombo>; SELECTOR_COUNT],
}

impl BindingTable {
    /// An empty table; every selector starts with its own empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the combos bound to `selector`.
    pub fn bind(mut self, selector: Selector, combos: Vec<KeyCombo>) -> Self {
        self.combos[selector.index()] = combos;
        self
    }

    /// Combos bound to `selector`, possibly empty.
    pub fn combos(&self, selector: Selector) -> &[KeyCombo] {
        &self.combos[selector.index()]
    }

    /// Every key referenced anywhere in the table.
    ///
    /// The virtual keyboard must be registered with at least these keys.
    pub fn capabilities(&self) -> HashSet<Key> {
        self.combos
            .iter()
            .flatten()
            .flat_map(|combo| combo.mods.iter().chain(combo.keys.iter()))
            .copied()
            .collect()
    }

    /// Built-in bindings for the Stream Deck Pedal.
    ///
    /// - left: Shift+Tab
    /// - middle: latch Alt (pick a window with right, then middle again)
    /// - right: Tab
    /// - double-middle: Ctrl+W
    /// - double-right: Alt+Tab
    pub fn stream_deck_pedal() -> Self {
        Self::new()
            .bind(
                Selector::Single(Button::Left),
                vec![KeyCombo::new(&[Key::KEY_LEFTSHIFT, Key::KEY_TAB], &[])],
            )
            .bind(
                Selector::Single(Button::Middle),
                vec![KeyCombo::held(&[Key::KEY_LEFTALT])],
            )
            .bind(
                Selector::Single(Button::Right),
                vec![KeyCombo::new(&[Key::KEY_TAB], &[])],
            )
            .bind(
                Selector::Double(Button::Middle),
                vec![KeyCombo::new(&[Key::KEY_LEFTCTRL], &[Key::KEY_W])],
            )
            .bind(
                Selector::Double(Button::Right),
                vec![KeyCombo::new(&[Key::KEY_LEFTALT, Key::KEY_TAB], &[])],
            )
    }
}
