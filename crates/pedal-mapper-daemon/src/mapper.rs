//! The pedal event loop
//!
//! [`PedalMapper`] owns all state that presses and debounce timers touch:
//! the [`Disambiguator`] and the [`KeyEmitter`]. It runs on a single task,
//! so a press and a timer fire are never handled at the same time and each
//! pending press resolves exactly once.

use std::future::Future;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::Instant;

use crate::bindings::{BindingTable, Button, Selector};
use crate::disambiguator::{ArmedTimer, Disambiguator};
use crate::emitter::KeyEmitter;
use crate::injector::KeySink;

pub struct PedalMapper<S> {
    disambiguator: Disambiguator,
    emitter: KeyEmitter<S>,
}

impl<S: KeySink> PedalMapper<S> {
    pub fn new(bindings: BindingTable, sink: S, debounce: Duration) -> Self {
        Self {
            disambiguator: Disambiguator::new(debounce),
            emitter: KeyEmitter::new(bindings, sink),
        }
    }

    pub fn emitter(&self) -> &KeyEmitter<S> {
        &self.emitter
    }

    /// Feed one press observed at `now`, emitting immediately on a double press.
    pub fn handle_press(&mut self, button: Button, now: Instant) -> Result<()> {
        match self.disambiguator.press(button, now) {
            Some(selector) => self.resolve(selector),
            None => Ok(()),
        }
    }

    /// Handle the elapse of the timer armed with `generation`.
    pub fn handle_timer(&mut self, generation: u64) -> Result<()> {
        match self.disambiguator.fire(generation) {
            Some(selector) => self.resolve(selector),
            None => Ok(()),
        }
    }

    fn resolve(&mut self, selector: Selector) -> Result<()> {
        tracing::debug!("Resolved {}", selector);
        self.emitter
            .emit(selector)
            .with_context(|| format!("Failed to emit keys for {}", selector))
    }

    /// Drive the mapper until `shutdown` completes or the press channel closes.
    ///
    /// When both a due timer and a new press are ready, the timer is handled
    /// first: a press that arrives after the window has elapsed never turns
    /// the expired single press into a double press.
    ///
    /// After the channel closes, an armed timer is still allowed to fire so
    /// the last buffered press is not lost. Shutdown returns immediately.
    pub async fn run<F>(
        &mut self,
        presses: &mut UnboundedReceiver<Button>,
        shutdown: F,
    ) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut open = true;

        loop {
            let armed = self.disambiguator.armed();
            if !open && armed.is_none() {
                tracing::debug!("Press channel closed and nothing pending");
                return Ok(());
            }

            tokio::select! {
                biased;

                generation = wait_for(armed) => {
                    self.handle_timer(generation)?;
                }

                press = presses.recv(), if open => match press {
                    Some(button) => self.handle_press(button, Instant::now())?,
                    None => open = false,
                },

                _ = &mut shutdown => {
                    tracing::info!("Shutdown requested");
                    return Ok(());
                }
            }
        }
    }

    /// Release modifiers still latched by hold combos.
    pub fn release_held(&mut self) -> Result<()> {
        self.emitter
            .release_held()
            .context("Failed to release held modifiers")
    }
}

/// Sleep until the armed timer is due and yield its generation.
///
/// Never completes when no timer is armed.
async fn wait_for(armed: Option<ArmedTimer>) -> u64 {
    match armed {
        Some(timer) => {
            tokio::time::sleep_until(timer.deadline).await;
            timer.generation
        }
        None => std::future::pending().await,
    }
}
