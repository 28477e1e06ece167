//! Single/double press disambiguation
//!
//! The pedal cannot report press counts, so every press is buffered for a
//! short debounce window. A second press of the same button inside the window
//! resolves as a double press; otherwise the window expires and the buffered
//! press resolves as a single press.
//!
//! ```text
//!            press(B)
//!  ┌──────┐ ─────────────────────────► ┌───────────────┐
//!  │ IDLE │                            │   PENDING(B)  │ ◄──┐ press(C), C != B
//!  └──────┘ ◄───────────────────────── │ timer armed   │ ───┘ (B dropped, timer re-armed)
//!     ▲        timer fired: Single(B)  └───────┬───────┘
//!     │                                        │ press(B)
//!     └────────────────────────────────────────┘ Double(B)
//! ```
//!
//! # Timer model
//!
//! The debounce timer is not a callback. [`Disambiguator`] only records an
//! [`ArmedTimer`] (deadline plus generation number); the event loop sleeps
//! until that deadline and reports back with [`Disambiguator::fire`]. Every
//! arm bumps the generation, so a fire for a timer that was cancelled or
//! replaced in the meantime is recognised as stale and ignored.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::time::Instant;

use crate::bindings::{Button, Selector};

/// Window in which a second press counts as a double press.
pub const DEBOUNCE_DELAY: Duration = Duration::from_millis(400);

/// Number of recent presses kept to detect repetition.
const SEQUENCE_LEN: usize = 2;

/// The single outstanding debounce timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArmedTimer {
    /// Identifies this arming; only a fire carrying it may resolve.
    pub generation: u64,
    /// When the buffered press resolves as a single press.
    pub deadline: Instant,
    /// The buffered press.
    pub button: Button,
}

/// State machine distinguishing single from double presses.
#[derive(Debug)]
pub struct Disambiguator {
    delay: Duration,
    /// Most recent press first
    sequence: VecDeque<Button>,
    timer: Option<ArmedTimer>,
    generation: u64,
}

impl Disambiguator {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            sequence: VecDeque::with_capacity(SEQUENCE_LEN),
            timer: None,
            generation: 0,
        }
    }

    /// The debounce delay this instance arms timers with.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// The currently armed timer, if a press is pending.
    pub fn armed(&self) -> Option<ArmedTimer> {
        self.timer
    }

    /// Whether a press is buffered waiting for its timer.
    pub fn is_pending(&self) -> bool {
        self.timer.is_some()
    }

    /// Feed a press that happened at `now`.
    ///
    /// Returns `Some(Selector::Double(button))` when this press repeats the
    /// buffered one. Otherwise the press is buffered, any previously buffered
    /// press is dropped, and a fresh timer is armed.
    pub fn press(&mut self, button: Button, now: Instant) -> Option<Selector> {
        if self.sequence.len() == SEQUENCE_LEN {
            self.sequence.pop_back();
        }
        self.sequence.push_front(button);
        self.cancel();

        if self.sequence.len() == SEQUENCE_LEN && self.sequence[0] == self.sequence[1] {
            tracing::debug!("Double press on {}", button);
            self.sequence.clear();
            return Some(Selector::Double(button));
        }

        self.generation = self.generation.wrapping_add(1);
        let timer = ArmedTimer {
            generation: self.generation,
            deadline: now + self.delay,
            button,
        };
        tracing::debug!(
            "Press on {} pending, timer {} armed for {:?}",
            button,
            timer.generation,
            self.delay
        );
        self.timer = Some(timer);

        None
    }

    /// Report that the timer armed with `generation` has elapsed.
    ///
    /// Resolves the buffered press as a single press, unless the timer was
    /// cancelled or re-armed since, in which case the fire is ignored.
    pub fn fire(&mut self, generation: u64) -> Option<Selector> {
        match self.timer {
            Some(timer) if timer.generation == generation => {
                self.timer = None;
                self.sequence.clear();
                tracing::debug!("Timer {} fired, single press on {}", generation, timer.button);
                Some(Selector::Single(timer.button))
            }
            _ => {
                tracing::trace!("Ignoring stale timer {}", generation);
                None
            }
        }
    }

    fn cancel(&mut self) {
        if let Some(timer) = self.timer.take() {
            tracing::trace!("Cancelled timer {}", timer.generation);
        }
    }
}

impl Default for Disambiguator {
    fn default() -> Self {
        Self::new(DEBOUNCE_DELAY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_first_press_arms_timer() {
        let mut d = Disambiguator::default();
        let t0 = Instant::now();

        assert_eq!(d.press(Button::Left, t0), None);

        let timer = d.armed().expect("timer should be armed");
        assert_eq!(timer.button, Button::Left);
        assert_eq!(timer.deadline, t0 + DEBOUNCE_DELAY);
        assert!(d.is_pending());
    }

    #[test]
    fn test_timer_fire_resolves_single() {
        let mut d = Disambiguator::default();
        d.press(Button::Right, Instant::now());
        let timer = d.armed().unwrap();

        assert_eq!(d.fire(timer.generation), Some(Selector::Single(Button::Right)));
        assert!(!d.is_pending());

        // A second fire of the same generation does nothing
        assert_eq!(d.fire(timer.generation), None);
    }

    #[test]
    fn test_same_button_twice_resolves_double() {
        let mut d = Disambiguator::default();
        let t0 = Instant::now();

        assert_eq!(d.press(Button::Middle, t0), None);
        let first = d.armed().unwrap();

        assert_eq!(
            d.press(Button::Middle, t0 + ms(100)),
            Some(Selector::Double(Button::Middle))
        );
        assert!(!d.is_pending());

        // The cancelled timer must not produce a single afterwards
        assert_eq!(d.fire(first.generation), None);
    }

    #[test]
    fn test_different_button_drops_pending_press() {
        let mut d = Disambiguator::default();
        let t0 = Instant::now();

        d.press(Button::Left, t0);
        let left = d.armed().unwrap();

        assert_eq!(d.press(Button::Right, t0 + ms(100)), None);
        let right = d.armed().unwrap();
        assert_eq!(right.button, Button::Right);
        assert_eq!(right.deadline, t0 + ms(100) + DEBOUNCE_DELAY);
        assert_ne!(left.generation, right.generation);

        assert_eq!(d.fire(left.generation), None);
        assert_eq!(d.fire(right.generation), Some(Selector::Single(Button::Right)));
    }

    #[test]
    fn test_repeat_after_different_press_is_double_of_latest() {
        let mut d = Disambiguator::default();
        let t0 = Instant::now();

        d.press(Button::Left, t0);
        d.press(Button::Right, t0 + ms(50));
        assert_eq!(
            d.press(Button::Right, t0 + ms(100)),
            Some(Selector::Double(Button::Right))
        );
    }

    #[test]
    fn test_alternating_presses_never_double() {
        let mut d = Disambiguator::default();
        let t0 = Instant::now();

        assert_eq!(d.press(Button::Left, t0), None);
        assert_eq!(d.press(Button::Right, t0 + ms(10)), None);
        assert_eq!(d.press(Button::Left, t0 + ms(20)), None);

        let timer = d.armed().unwrap();
        assert_eq!(timer.button, Button::Left);
        assert_eq!(d.fire(timer.generation), Some(Selector::Single(Button::Left)));
    }

    #[test]
    fn test_resolution_clears_sequence() {
        let mut d = Disambiguator::default();
        let t0 = Instant::now();

        d.press(Button::Left, t0);
        let timer = d.armed().unwrap();
        d.fire(timer.generation);

        // The press after a resolved single starts over instead of doubling
        assert_eq!(d.press(Button::Left, t0 + ms(500)), None);
        assert!(d.is_pending());

        // Likewise after a double: the third press starts a new window
        assert_eq!(
            d.press(Button::Left, t0 + ms(550)),
            Some(Selector::Double(Button::Left))
        );
        assert_eq!(d.press(Button::Left, t0 + ms(600)), None);
        assert!(d.is_pending());
    }

    #[test]
    fn test_rapid_repress_only_latest_generation_fires() {
        let mut d = Disambiguator::default();
        let t0 = Instant::now();
        let buttons = [Button::Left, Button::Middle, Button::Right, Button::Middle];

        let mut generations = Vec::new();
        for (i, button) in buttons.into_iter().enumerate() {
            assert_eq!(d.press(button, t0 + ms(10 * i as u64)), None);
            generations.push(d.armed().unwrap().generation);
        }

        let latest = generations.pop().unwrap();
        for stale in generations {
            assert_eq!(d.fire(stale), None, "stale timer {} fired", stale);
        }
        assert!(d.is_pending());
        assert_eq!(d.fire(latest), Some(Selector::Single(Button::Middle)));
    }

    #[test]
    fn test_custom_delay_used_for_deadline() {
        let mut d = Disambiguator::new(ms(250));
        let t0 = Instant::now();
        d.press(Button::Left, t0);
        assert_eq!(d.delay(), ms(250));
        assert_eq!(d.armed().unwrap().deadline, t0 + ms(250));
    }
}
