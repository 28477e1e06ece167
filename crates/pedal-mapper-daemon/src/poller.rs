//! Blocking pedal poll loop
//!
//! Runs on a blocking thread: reads reports with a bounded timeout, turns them
//! into button events and hands those to the mapper task over a channel.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;

use crate::bindings::Button;
use crate::edge::{EdgeDetector, REPORT_SIZE};
use crate::hid::{HidError, ReportSource};

/// Poll `source` until `stop` is set or the receiving side hangs up.
///
/// Each read waits at most `poll_interval`, so `stop` is observed within one
/// interval. Timed-out reads are the normal idle case and are skipped.
///
/// # Errors
///
/// Returns the first read error; the device is assumed to be gone.
pub fn poll_pedal<R: ReportSource>(
    source: &mut R,
    detector: &mut EdgeDetector,
    poll_interval: Duration,
    presses: &UnboundedSender<Button>,
    stop: &AtomicBool,
) -> Result<(), HidError> {
    let mut buf = [0u8; REPORT_SIZE];

    tracing::debug!("Polling pedal every {:?}", poll_interval);

    while !stop.load(Ordering::Relaxed) {
        let read = source.read_report(&mut buf, poll_interval)?;
        if read == 0 {
            continue;
        }

        if let Some(button) = detector.detect(&buf[..read]) {
            tracing::debug!("Pedal {} pressed", button);
            if presses.send(button).is_err() {
                tracing::debug!("Press receiver closed, stopping poller");
                break;
            }
        }
    }

    Ok(())
}
