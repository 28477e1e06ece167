//! Hold-aware key emission
//!
//! [`KeyEmitter`] plays back the combos bound to a resolved [`Selector`] and
//! keeps track of modifiers latched by `hold` combos across resolutions.

use std::collections::HashSet;

use anyhow::Result;
use evdev::Key;

use crate::bindings::{BindingTable, Selector};
use crate::injector::KeySink;

/// Emits key events for resolved selectors.
pub struct KeyEmitter<S> {
    bindings: BindingTable,
    /// Modifiers currently latched down by a `hold` combo
    held: HashSet<Key>,
    sink: S,
}

impl<S: KeySink> KeyEmitter<S> {
    pub fn new(bindings: BindingTable, sink: S) -> Self {
        Self {
            bindings,
            held: HashSet::new(),
            sink,
        }
    }

    /// Modifiers currently latched by hold combos.
    pub fn held(&self) -> &HashSet<Key> {
        &self.held
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Emit every combo bound to `selector`, in order.
    ///
    /// For each combo:
    /// 1. Modifiers are pressed in order. For a `hold` combo, a modifier that
    ///    is already latched is released instead and unlatched.
    /// 2. Keys are pressed in order.
    /// 3. Unless the combo holds, keys and then modifiers are released in
    ///    listed order.
    ///
    /// Each transition is flushed before the next one is written.
    pub fn emit(&mut self, selector: Selector) -> Result<()> {
        let Self {
            bindings,
            held,
            sink,
        } = self;

        let combos = bindings.combos(selector);
        if combos.is_empty() {
            tracing::debug!("No bindings for {}", selector);
            return Ok(());
        }

        tracing::debug!("Emitting {} combo(s) for {}", combos.len(), selector);

        for combo in combos {
            for &modifier in &combo.mods {
                if combo.hold && held.remove(&modifier) {
                    send(sink, modifier, false)?;
                    tracing::debug!("Released held {:?}", modifier);
                } else {
                    if combo.hold {
                        held.insert(modifier);
                        tracing::debug!("Holding {:?}", modifier);
                    }
                    send(sink, modifier, true)?;
                }
            }

            for &key in &combo.keys {
                send(sink, key, true)?;
            }

            if !combo.hold {
                for &key in &combo.keys {
                    send(sink, key, false)?;
                }
                for &modifier in &combo.mods {
                    send(sink, modifier, false)?;
                }
            }
        }

        Ok(())
    }

    /// Release every latched modifier.
    pub fn release_held(&mut self) -> Result<()> {
        for modifier in self.held.drain() {
            tracing::info!("Releasing held {:?}", modifier);
            send(&mut self.sink, modifier, false)?;
        }
        Ok(())
    }
}

fn send<S: KeySink>(sink: &mut S, key: Key, pressed: bool) -> Result<()> {
    sink.write(key, pressed)?;
    sink.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bindings::{Button, KeyCombo};
    use crate::injector::testing::{FailingSink, RecordingSink};

    const PRESS: bool = true;
    const RELEASE: bool = false;

    fn emitter(table: BindingTable) -> KeyEmitter<RecordingSink> {
        KeyEmitter::new(table, RecordingSink::default())
    }

    #[test]
    fn test_unbound_selector_is_noop() {
        let mut emitter = emitter(BindingTable::new());
        emitter.emit(Selector::Double(Button::Left)).unwrap();
        assert!(emitter.sink().events.is_empty());
    }

    #[test]
    fn test_plain_combo_press_and_release_order() {
        let table = BindingTable::new().bind(
            Selector::Single(Button::Left),
            vec![KeyCombo::new(
                &[Key::KEY_LEFTCTRL, Key::KEY_LEFTSHIFT],
                &[Key::KEY_T, Key::KEY_N],
            )],
        );
        let mut emitter = emitter(table);

        emitter.emit(Selector::Single(Button::Left)).unwrap();

        assert_eq!(
            emitter.sink().events,
            vec![
                (Key::KEY_LEFTCTRL, PRESS),
                (Key::KEY_LEFTSHIFT, PRESS),
                (Key::KEY_T, PRESS),
                (Key::KEY_N, PRESS),
                (Key::KEY_T, RELEASE),
                (Key::KEY_N, RELEASE),
                (Key::KEY_LEFTCTRL, RELEASE),
                (Key::KEY_LEFTSHIFT, RELEASE),
            ]
        );
        assert!(emitter.held().is_empty());
    }

    #[test]
    fn test_plain_combo_leaves_no_key_down() {
        let mut emitter = emitter(BindingTable::stream_deck_pedal());

        for selector in [
            Selector::Single(Button::Left),
            Selector::Single(Button::Right),
            Selector::Double(Button::Middle),
            Selector::Double(Button::Right),
        ] {
            emitter.emit(selector).unwrap();
            assert!(
                emitter.sink().keys_down().is_empty(),
                "{} left keys down: {:?}",
                selector,
                emitter.sink().keys_down()
            );
        }
    }

    #[test]
    fn test_every_transition_is_flushed() {
        let mut emitter = emitter(BindingTable::stream_deck_pedal());
        emitter.emit(Selector::Double(Button::Middle)).unwrap();

        assert_eq!(emitter.sink().unflushed(), 0);
        assert_eq!(emitter.sink().events.len(), 4);
    }

    #[test]
    fn test_hold_combo_toggles_modifier() {
        let mut emitter = emitter(BindingTable::stream_deck_pedal());
        let middle = Selector::Single(Button::Middle);

        emitter.emit(middle).unwrap();
        assert!(emitter.held().contains(&Key::KEY_LEFTALT));
        assert_eq!(emitter.sink().events, vec![(Key::KEY_LEFTALT, PRESS)]);
        assert_eq!(emitter.sink().keys_down(), vec![Key::KEY_LEFTALT]);

        emitter.emit(middle).unwrap();
        assert!(emitter.held().is_empty());
        assert_eq!(
            emitter.sink().events,
            vec![(Key::KEY_LEFTALT, PRESS), (Key::KEY_LEFTALT, RELEASE)]
        );
        assert!(emitter.sink().keys_down().is_empty());
    }

    #[test]
    fn test_hold_toggle_is_stable_over_cycles() {
        let mut emitter = emitter(BindingTable::stream_deck_pedal());
        let middle = Selector::Single(Button::Middle);

        for cycle in 0..5 {
            emitter.emit(middle).unwrap();
            assert!(emitter.held().contains(&Key::KEY_LEFTALT), "cycle {}", cycle);
            emitter.emit(middle).unwrap();
            assert!(emitter.held().is_empty(), "cycle {}", cycle);
        }

        let events = &emitter.sink().events;
        assert_eq!(events.len(), 10);
        for (i, &(key, pressed)) in events.iter().enumerate() {
            assert_eq!(key, Key::KEY_LEFTALT);
            assert_eq!(pressed, i % 2 == 0);
        }
    }

    #[test]
    fn test_hold_combo_keys_stay_down() {
        let table = BindingTable::new().bind(
            Selector::Single(Button::Left),
            vec![KeyCombo {
                mods: vec![Key::KEY_LEFTMETA],
                keys: vec![Key::KEY_SPACE],
                hold: true,
            }],
        );
        let mut emitter = emitter(table);

        emitter.emit(Selector::Single(Button::Left)).unwrap();
        assert_eq!(
            emitter.sink().events,
            vec![(Key::KEY_LEFTMETA, PRESS), (Key::KEY_SPACE, PRESS)]
        );
    }

    #[test]
    fn test_held_alt_with_tab_between_toggles() {
        // Alt latched by middle, Tab tapped by right, Alt released by middle
        let mut emitter = emitter(BindingTable::stream_deck_pedal());

        emitter.emit(Selector::Single(Button::Middle)).unwrap();
        emitter.emit(Selector::Single(Button::Right)).unwrap();
        emitter.emit(Selector::Single(Button::Middle)).unwrap();

        assert_eq!(
            emitter.sink().events,
            vec![
                (Key::KEY_LEFTALT, PRESS),
                (Key::KEY_TAB, PRESS),
                (Key::KEY_TAB, RELEASE),
                (Key::KEY_LEFTALT, RELEASE),
            ]
        );
    }

    #[test]
    fn test_multiple_combos_emitted_in_order() {
        let table = BindingTable::new().bind(
            Selector::Double(Button::Left),
            vec![
                KeyCombo::new(&[Key::KEY_LEFTCTRL], &[Key::KEY_A]),
                KeyCombo::new(&[Key::KEY_LEFTCTRL], &[Key::KEY_C]),
            ],
        );
        let mut emitter = emitter(table);

        emitter.emit(Selector::Double(Button::Left)).unwrap();

        let keys: Vec<Key> = emitter
            .sink()
            .events
            .iter()
            .filter(|(_, pressed)| *pressed)
            .map(|(key, _)| *key)
            .collect();
        assert_eq!(
            keys,
            vec![Key::KEY_LEFTCTRL, Key::KEY_A, Key::KEY_LEFTCTRL, Key::KEY_C]
        );
    }

    #[test]
    fn test_release_held_unlatches_everything() {
        let table = BindingTable::new().bind(
            Selector::Single(Button::Middle),
            vec![KeyCombo::held(&[Key::KEY_LEFTALT, Key::KEY_LEFTSHIFT])],
        );
        let mut emitter = emitter(table);

        emitter.emit(Selector::Single(Button::Middle)).unwrap();
        assert_eq!(emitter.held().len(), 2);

        emitter.release_held().unwrap();
        assert!(emitter.held().is_empty());
        assert!(emitter.sink().keys_down().is_empty());

        // Nothing left to release
        emitter.release_held().unwrap();
        assert_eq!(emitter.sink().events.len(), 4);
    }

    #[test]
    fn test_sink_failure_propagates() {
        let mut emitter = KeyEmitter::new(BindingTable::stream_deck_pedal(), FailingSink);
        let err = emitter.emit(Selector::Single(Button::Right)).unwrap_err();
        assert!(err.to_string().contains("disconnected"));
    }
}
