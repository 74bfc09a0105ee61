//! Background reporter draining the success and failure streams.

use std::sync::Arc;
use tokio::sync::oneshot;

use crate::error::PipelineError;
use crate::types::{BatchSummary, SaveResult};

use super::channel::EventReceivers;

/// Destination for report lines.
///
/// Injected into the reporter so batches can be observed without capturing
/// process-wide output.
pub trait ReportSink: Send + Sync {
    /// Called once per successfully resized item.
    fn saved(&self, result: &SaveResult);

    /// Called once per failure event.
    fn failed(&self, error: &PipelineError);
}

/// Default sink writing through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl ReportSink for TracingSink {
    fn saved(&self, result: &SaveResult) {
        tracing::info!(
            path = %result.saved_path.display(),
            width = result.width,
            height = result.height,
            "resize ok: {} (width={}, height={})",
            result.saved_path.display(),
            result.width,
            result.height
        );
    }

    fn failed(&self, error: &PipelineError) {
        tracing::warn!(error = %error, kind = ?error.kind(), "resize fail: {}", error);
    }
}

/// Handle on a running reporter.
#[derive(Debug)]
pub struct Reporter {
    done: oneshot::Receiver<BatchSummary>,
}

impl Reporter {
    /// Start draining both streams in the background.
    ///
    /// Must be called from within a Tokio runtime. The reporter runs until
    /// both streams are closed and empty, then raises its completion signal.
    pub fn spawn(receivers: EventReceivers, sink: Arc<dyn ReportSink>) -> Self {
        let (done_tx, done_rx) = oneshot::channel();
        tokio::spawn(async move {
            let summary = drain(receivers, sink).await;
            // The receiver is gone when the batch was dropped without running
            let _ = done_tx.send(summary);
        });
        Self { done: done_rx }
    }

    /// Wait for the completion signal.
    ///
    /// Resolves only after every event has been handed to the sink.
    pub async fn finished(self) -> BatchSummary {
        match self.done.await {
            Ok(summary) => summary,
            Err(_) => {
                tracing::error!("Reporter stopped without completing; report may be partial");
                BatchSummary::default()
            }
        }
    }
}

/// Drain both streams concurrently until each is closed.
///
/// The loops are polled together so a worker blocked on one full stream
/// never waits behind a drain of the other.
async fn drain(receivers: EventReceivers, sink: Arc<dyn ReportSink>) -> BatchSummary {
    let EventReceivers {
        mut saved,
        mut failed,
    } = receivers;

    let saved_loop = async {
        let mut count = 0usize;
        while let Some(result) = saved.recv().await {
            sink.saved(&result);
            count += 1;
        }
        count
    };
    let failed_loop = async {
        let mut count = 0usize;
        while let Some(error) = failed.recv().await {
            sink.failed(&error);
            count += 1;
        }
        count
    };

    let (succeeded, failed) = tokio::join!(saved_loop, failed_loop);
    tracing::debug!("Reporter drained {} ok, {} failed", succeeded, failed);
    BatchSummary {
        succeeded,
        failed,
        ..BatchSummary::default()
    }
}
