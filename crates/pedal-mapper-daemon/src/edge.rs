//! Edge detection on raw pedal reports
//!
//! The pedal sends an 8-byte input report whose bytes 4, 5 and 6 hold the
//! left, middle and right switch. [`EdgeDetector`] keeps the last observed
//! state of each switch and turns changes into [`Button`] events.
//!
//! # Known limitation
//!
//! Only one button is reported per call. Buttons are checked in priority
//! order (left, middle, right) and the first one that differs from the stored
//! state wins. If two switches change inside a single poll, the second change
//! is picked up on the next report, compared against the partially updated
//! state.

use crate::bindings::Button;

/// Size of one pedal input report in bytes.
pub const REPORT_SIZE: usize = 8;

/// Report offsets of the left, middle and right switch.
const BUTTON_OFFSETS: [usize; 3] = [4, 5, 6];

/// Converts successive raw reports into button events.
#[derive(Debug, Default)]
pub struct EdgeDetector {
    state: [bool; 3],
}

impl EdgeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored switch state, indexed by [`Button::index`].
    pub fn state(&self) -> [bool; 3] {
        self.state
    }

    /// Compare `report` against the stored state and flip at most one bit.
    ///
    /// Returns the flipped button when its stored value becomes active.
    /// Reports too short to contain all three switch bytes are ignored and
    /// leave the state untouched.
    pub fn detect(&mut self, report: &[u8]) -> Option<Button> {
        if report.len() <= BUTTON_OFFSETS[2] {
            if !report.is_empty() {
                tracing::debug!(
                    "Ignoring short pedal report ({} of {} bytes)",
                    report.len(),
                    REPORT_SIZE
                );
            }
            return None;
        }

        let button = Button::ALL.into_iter().find(|button| {
            let active = report[BUTTON_OFFSETS[button.index()]] != 0;
            active != self.state[button.index()]
        })?;

        let slot = &mut self.state[button.index()];
        *slot = !*slot;
        tracing::trace!("Pedal {} switch now {}", button, *slot);

        (*slot).then_some(button)
    }
}
