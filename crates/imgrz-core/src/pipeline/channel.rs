//! Bounded result streams between resize workers and the reporter.

use tokio::sync::mpsc;

use crate::config::ProcessingConfig;
use crate::error::PipelineError;
use crate::types::SaveResult;

/// Create a bounded channel pair with the configured buffer size.
///
/// When the buffer is full the sender waits, so a worker never outruns the
/// reporter by more than the buffer.
pub fn bounded_channel<T>(config: &ProcessingConfig) -> (mpsc::Sender<T>, mpsc::Receiver<T>) {
    mpsc::channel(config.channel_capacity.max(1))
}

/// Producer side of the success and failure streams.
///
/// Each worker owns a clone. A stream closes once every clone is dropped,
/// so it cannot close while a worker still holds a sender.
#[derive(Debug, Clone)]
pub struct EventSenders {
    pub saved: mpsc::Sender<SaveResult>,
    pub failed: mpsc::Sender<PipelineError>,
}

/// Consumer side of the success and failure streams.
#[derive(Debug)]
pub struct EventReceivers {
    pub saved: mpsc::Receiver<SaveResult>,
    pub failed: mpsc::Receiver<PipelineError>,
}

/// Create both result streams.
pub fn event_channels(config: &ProcessingConfig) -> (EventSenders, EventReceivers) {
    let (saved_tx, saved_rx) = bounded_channel(config);
    let (failed_tx, failed_rx) = bounded_channel(config);
    (
        EventSenders {
            saved: saved_tx,
            failed: failed_tx,
        },
        EventReceivers {
            saved: saved_rx,
            failed: failed_rx,
        },
    )
}
