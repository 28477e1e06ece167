//! Virtual device injection via uinput
//!
//! This module provides the [`KeySink`] seam the emitter writes to, and the
//! uinput-backed [`VirtualDevice`] that implements it in production.

use std::collections::HashSet;

use anyhow::{Context, Result};
use evdev::{uinput::VirtualDeviceBuilder, AttributeSet, EventType, InputEvent, Key};

/// Event value constants for key events.
pub mod event_value {
    /// Key release event value
    pub const RELEASE: i32 = 0;
    /// Key press event value
    pub const PRESS: i32 = 1;
}

/// Destination for synthetic key events.
///
/// `write` queues a key transition; `flush` delivers everything queued so
/// far as one synchronised report.
pub trait KeySink {
    fn write(&mut self, key: Key, pressed: bool) -> Result<()>;

    fn flush(&mut self) -> Result<()>;
}

/// A virtual keyboard for injecting events
pub struct VirtualDevice {
    device: evdev::uinput::VirtualDevice,
    pending: Vec<InputEvent>,
}

impl VirtualDevice {
    /// Create a new virtual keyboard device able to emit exactly `capabilities`.
    ///
    /// # Errors
    ///
    /// Returns an error if the virtual device cannot be created (e.g., insufficient
    /// permissions to access /dev/uinput).
    pub fn new_keyboard(name: &str, capabilities: &HashSet<Key>) -> Result<Self> {
        let mut keys = AttributeSet::<Key>::new();
        for key in capabilities {
            keys.insert(*key);
        }

        let device = VirtualDeviceBuilder::new()
            .context("Failed to open /dev/uinput")?
            .name(name)
            .with_keys(&keys)
            .context("Failed to register key capabilities")?
            .build()
            .with_context(|| format!("Failed to create virtual keyboard '{}'", name))?;

        tracing::info!(
            "Created virtual keyboard '{}' with {} key(s)",
            name,
            capabilities.len()
        );

        Ok(Self {
            device,
            pending: Vec::new(),
        })
    }
}

impl KeySink for VirtualDevice {
    fn write(&mut self, key: Key, pressed: bool) -> Result<()> {
        let value = if pressed {
            event_value::PRESS
        } else {
            event_value::RELEASE
        };
        self.pending
            .push(InputEvent::new(EventType::KEY, key.code(), value));
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        self.pending
            .push(InputEvent::new(EventType::SYNCHRONIZATION, 0, 0));
        let result = self.device.emit(&self.pending);
        self.pending.clear();
        result.context("Failed to write to virtual keyboard")
    }
}
