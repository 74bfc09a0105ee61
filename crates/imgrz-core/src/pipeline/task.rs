//! Batch orchestration: admission, fan-out, fan-in and the shutdown handshake.
//!
//! A [`Task`] goes through two phases:
//!
//! 1. **Admission**: items are filtered and appended one at a time. The
//!    reporter is already running, so verbose rejections are drained as
//!    they are sent.
//! 2. **Run**: [`Task::run`] consumes the task, spawns one worker per
//!    admitted item, awaits them all, closes the result streams and waits for
//!    the reporter's completion signal.
//!
//! ```text
//! Idle → Dispatching → Draining → Closed → Handshaking → Finished
//! ```

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;
use crate::error::{PipelineError, PipelineResult, Result};
use crate::types::{BatchSummary, ResizeParams, SaveResult};

use super::channel::{event_channels, EventSenders};
use super::discovery::FileDiscovery;
use super::fetch::RemoteFetcher;
use super::filter::Filter;
use super::reporter::{ReportSink, Reporter};
use super::resize::ImageResizer;
use super::source::{LocalImage, RemoteImage, WorkItem};

/// Run phases, logged at debug level as a batch progresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Dispatching,
    Draining,
    Closed,
    Handshaking,
    Finished,
}

/// A batch of resize work.
pub struct Task {
    filter: Filter,
    items: Vec<Arc<dyn WorkItem>>,
    params: ResizeParams,
    verbose: bool,
    senders: EventSenders,
    reporter: Reporter,
    resizer: Arc<ImageResizer>,
    fetcher: RemoteFetcher,
    discovery: FileDiscovery,
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("items", &self.items.len())
            .field("params", &self.params)
            .field("verbose", &self.verbose)
            .field("filter", &self.filter)
            .finish()
    }
}

impl Task {
    /// Create an empty batch and start its reporter.
    ///
    /// Must be called from within a Tokio runtime. Transform parameters and
    /// the filter come from `config`; report lines go to `sink`.
    pub fn new(config: &Config, sink: Arc<dyn ReportSink>) -> Result<Self> {
        let filter = Filter::from_config(&config.filter)?;
        let fetcher = RemoteFetcher::new(&config.limits)?;
        let (senders, receivers) = event_channels(&config.processing);
        let reporter = Reporter::spawn(receivers, sink);

        Ok(Self {
            filter,
            items: Vec::new(),
            params: ResizeParams::from_config(config),
            verbose: false,
            senders,
            reporter,
            resizer: Arc::new(ImageResizer::new(config.limits.clone())),
            fetcher,
            discovery: FileDiscovery::new(config.processing.clone()),
        })
    }

    /// Report admission rejections as failure events instead of dropping them.
    pub fn set_verbose(&mut self, verbose: bool) -> &mut Self {
        self.verbose = verbose;
        self
    }

    /// Replace the admission filter.
    pub fn set_filter(&mut self, filter: Filter) -> &mut Self {
        self.filter = filter;
        self
    }

    /// The fixed transform parameters of this batch.
    pub fn params(&self) -> &ResizeParams {
        &self.params
    }

    /// Filter `item` and append it when admitted.
    pub async fn add_item(&mut self, item: Arc<dyn WorkItem>) -> &mut Self {
        match self.filter.admit(item.as_ref()).await {
            Ok(()) => {
                tracing::trace!("Admitted {}", item.name());
                self.items.push(item);
            }
            Err(rejection) => {
                if self.verbose && self.senders.failed.send(rejection).await.is_err() {
                    tracing::error!("Reporter is gone; rejection of {} not reported", item.name());
                }
            }
        }
        self
    }

    /// Admit a local image by path.
    pub async fn add_image(&mut self, path: impl AsRef<Path>) -> &mut Self {
        let item = LocalImage::new(path.as_ref(), self.resizer.clone());
        self.add_item(Arc::new(item)).await
    }

    /// Admit every path of a comma-separated list.
    pub async fn add_images(&mut self, list: &str) -> &mut Self {
        for path in split_list(list) {
            self.add_image(path).await;
        }
        self
    }

    /// Admit a remote image by URL.
    pub async fn add_url(&mut self, url: &str) -> &mut Self {
        let item = RemoteImage::new(url, self.fetcher.clone(), self.resizer.clone());
        self.add_item(Arc::new(item)).await
    }

    /// Admit every URL of a comma-separated list.
    pub async fn add_urls(&mut self, list: &str) -> &mut Self {
        for url in split_list(list) {
            self.add_url(url).await;
        }
        self
    }

    /// Scan `dir` and admit every image found as a local item.
    ///
    /// A listing failure is returned immediately and nothing is admitted.
    pub async fn add_scan_dir(&mut self, dir: impl AsRef<Path>) -> PipelineResult<&mut Self> {
        let dir = dir.as_ref().to_path_buf();
        let discovery = self.discovery.clone();
        let scan_dir = dir.clone();
        let paths = tokio::task::spawn_blocking(move || discovery.scan(&scan_dir))
            .await
            .map_err(|e| PipelineError::Scan {
                path: dir.clone(),
                message: format!("Task join error: {}", e),
            })??;

        tracing::debug!("Found {} image(s) in {:?}", paths.len(), dir);
        for path in paths {
            self.add_image(path).await;
        }
        Ok(self)
    }

    /// Number of admitted items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether no item has been admitted.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Admitted items in admission order.
    pub fn items(&self) -> &[Arc<dyn WorkItem>] {
        &self.items
    }

    /// Resize every admitted item concurrently and report the outcomes.
    ///
    /// Every item yields exactly one event on the success or failure stream.
    /// Returns once the reporter has handed every event to its sink. An empty
    /// batch finishes immediately.
    pub async fn run(self) -> BatchSummary {
        let Task {
            items,
            params,
            senders,
            reporter,
            ..
        } = self;
        let start = Instant::now();
        let mut state = RunState::Idle;
        let params = Arc::new(params);

        advance(&mut state, RunState::Dispatching);
        tracing::debug!("Dispatching {} resize worker(s)", items.len());
        let mut handles = Vec::with_capacity(items.len());
        for item in items {
            let senders = senders.clone();
            let params = params.clone();
            let name = item.name().to_string();
            let handle = tokio::spawn(async move {
                resize_one(item.as_ref(), &params, &senders).await;
            });
            handles.push((name, handle));
        }

        advance(&mut state, RunState::Draining);
        for (name, handle) in handles {
            if let Err(e) = handle.await {
                // A panicking worker sent nothing; report it so the item
                // still yields one event.
                tracing::error!("Resize worker for {} panicked: {}", name, e);
                let _ = senders
                    .failed
                    .send(PipelineError::Worker {
                        name,
                        message: e.to_string(),
                    })
                    .await;
            }
        }

        // All workers have exited, so this drops the last senders.
        drop(senders);
        advance(&mut state, RunState::Closed);

        advance(&mut state, RunState::Handshaking);
        let mut summary = reporter.finished().await;
        summary.elapsed = start.elapsed();

        advance(&mut state, RunState::Finished);
        tracing::debug!(
            "Batch finished in {:?}: {} ok, {} failed",
            summary.elapsed,
            summary.succeeded,
            summary.failed
        );
        summary
    }
}

/// Resize one item and emit its single terminal event.
async fn resize_one(item: &dyn WorkItem, params: &ResizeParams, senders: &EventSenders) {
    let sent = match item.resize_to(params).await {
        Ok(saved) => senders
            .saved
            .send(SaveResult::new(saved, params))
            .await
            .is_ok(),
        Err(e) => senders.failed.send(e).await.is_ok(),
    };
    if !sent {
        tracing::error!("Reporter is gone; result for {} not reported", item.name());
    }
}

fn advance(state: &mut RunState, next: RunState) {
    tracing::trace!("Task state: {:?} -> {:?}", state, next);
    *state = next;
}

/// Split a comma-separated list, trimming entries and dropping empty ones.
fn split_list(list: &str) -> impl Iterator<Item = &str> {
    list.split(',').map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::pipeline::filter::{ByteRange, PatternRule};
    use async_trait::async_trait;
    use image::{DynamicImage, ImageFormat};
    use std::io::Cursor;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Sink recording every event it receives.
    #[derive(Default)]
    struct Recorder {
        saved: Mutex<Vec<SaveResult>>,
        failed: Mutex<Vec<(ErrorKind, String)>>,
    }

    impl Recorder {
        fn saves(&self) -> Vec<SaveResult> {
            self.saved.lock().unwrap().clone()
        }

        fn failures(&self) -> Vec<(ErrorKind, String)> {
            self.failed.lock().unwrap().clone()
        }
    }

    impl ReportSink for Recorder {
        fn saved(&self, result: &SaveResult) {
            self.saved.lock().unwrap().push(result.clone());
        }

        fn failed(&self, error: &PipelineError) {
            self.failed
                .lock()
                .unwrap()
                .push((error.kind(), error.to_string()));
        }
    }

    /// Item with a scripted outcome that counts transform calls.
    #[derive(Debug)]
    struct MockItem {
        name: String,
        fail: bool,
        panic: bool,
        delay: Duration,
        calls: Arc<AtomicU32>,
    }

    impl MockItem {
        fn ok(name: &str) -> Self {
            Self {
                name: name.to_string(),
                fail: false,
                panic: false,
                delay: Duration::ZERO,
                calls: Arc::new(AtomicU32::new(0)),
            }
        }

        fn failing(name: &str) -> Self {
            Self {
                fail: true,
                ..Self::ok(name)
            }
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }
    }

    #[async_trait]
    impl WorkItem for MockItem {
        fn name(&self) -> &str {
            &self.name
        }

        async fn byte_size(&self) -> PipelineResult<u64> {
            Ok(1024)
        }

        async fn resize_to(&self, params: &ResizeParams) -> PipelineResult<PathBuf> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            if self.panic {
                panic!("transform blew up for {}", self.name);
            }
            if self.fail {
                return Err(PipelineError::Read {
                    path: PathBuf::from(&self.name),
                    message: "unreadable".to_string(),
                });
            }
            Ok(params.output_dir.join(&self.name))
        }
    }

    fn config(width: u32, height: u32) -> Config {
        let mut config = Config::default();
        config.resize.output_dir = PathBuf::from("/tmp/imgrz-test");
        config.resize.width = width;
        config.resize.height = height;
        config
    }

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let mut buffer = Cursor::new(Vec::new());
        DynamicImage::new_rgb8(width, height)
            .write_to(&mut buffer, ImageFormat::Png)
            .unwrap();
        buffer.into_inner()
    }

    #[tokio::test]
    async fn test_empty_batch_runs_to_completion() {
        let sink = Arc::new(Recorder::default());
        let task = Task::new(&config(10, 10), sink.clone()).unwrap();
        assert!(task.is_empty());

        let summary = tokio::time::timeout(Duration::from_secs(5), task.run())
            .await
            .expect("empty batch must not deadlock");

        assert_eq!(summary.total(), 0);
        assert!(sink.saves().is_empty());
        assert!(sink.failures().is_empty());
    }

    #[tokio::test]
    async fn test_one_event_per_item_with_mixed_outcomes() {
        let sink = Arc::new(Recorder::default());
        let mut task = Task::new(&config(100, 50), sink.clone()).unwrap();

        let mut calls = Vec::new();
        for i in 0..40 {
            let item = if i % 3 == 0 {
                MockItem::failing(&format!("bad{i}.png"))
            } else {
                MockItem::ok(&format!("good{i}.png"))
            }
            .with_delay(Duration::from_millis((i % 7) as u64));
            calls.push(item.calls.clone());
            task.add_item(Arc::new(item)).await;
        }
        assert_eq!(task.len(), 40);

        let summary = task.run().await;

        assert_eq!(summary.succeeded, 26);
        assert_eq!(summary.failed, 14);
        assert_eq!(sink.saves().len(), 26);
        assert_eq!(sink.failures().len(), 14);
        assert!(calls.iter().all(|c| c.load(Ordering::SeqCst) == 1));
    }

    #[tokio::test]
    async fn test_save_result_carries_requested_dimensions() {
        let sink = Arc::new(Recorder::default());
        let mut task = Task::new(&config(320, 0), sink.clone()).unwrap();
        task.add_item(Arc::new(MockItem::ok("a.png"))).await;

        task.run().await;

        let saved = sink.saves();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].width, 320);
        assert_eq!(saved[0].height, 0);
        assert_eq!(saved[0].saved_path, PathBuf::from("/tmp/imgrz-test/a.png"));
    }

    #[tokio::test]
    async fn test_rejected_names_never_dispatch() {
        let sink = Arc::new(Recorder::default());
        let mut task = Task::new(&config(10, 10), sink.clone()).unwrap();
        task.set_filter(
            Filter::new().with_name_rule(PatternRule::new(&["skip".to_string()], &[]).unwrap()),
        );

        let skipped = MockItem::ok("skip_me.png");
        let skipped_calls = skipped.calls.clone();
        task.add_item(Arc::new(skipped))
            .await
            .add_item(Arc::new(MockItem::ok("keep.png")))
            .await;

        let names: Vec<&str> = task.items().iter().map(|i| i.name()).collect();
        assert_eq!(names, vec!["keep.png"]);

        let summary = task.run().await;
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 0);
        assert_eq!(skipped_calls.load(Ordering::SeqCst), 0);
        assert!(sink.failures().is_empty());
    }

    #[tokio::test]
    async fn test_size_rejection_is_silent_unless_verbose() {
        let sink = Arc::new(Recorder::default());
        let mut task = Task::new(&config(10, 10), sink.clone()).unwrap();
        task.set_filter(Filter::new().with_size_rule(|size: u64| {
            if size > 100 {
                Err(format!("{size} bytes is too big"))
            } else {
                Ok(())
            }
        }));
        task.add_item(Arc::new(MockItem::ok("big.png"))).await;
        assert!(task.is_empty());

        let summary = task.run().await;
        assert_eq!(summary.total(), 0);
        assert!(sink.failures().is_empty());
    }

    #[tokio::test]
    async fn test_verbose_rejections_are_reported() {
        let sink = Arc::new(Recorder::default());
        let mut task = Task::new(&config(10, 10), sink.clone()).unwrap();
        task.set_verbose(true).set_filter(
            Filter::new().with_name_rule(PatternRule::new(&["skip".to_string()], &[]).unwrap()),
        );

        // More rejections than the stream buffer holds: the running reporter
        // must drain them during admission.
        for i in 0..5 {
            task.add_item(Arc::new(MockItem::ok(&format!("skip{i}.png")))).await;
        }
        task.add_item(Arc::new(MockItem::ok("keep.png"))).await;

        let summary = task.run().await;
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 5);
        let failed = sink.failures();
        assert!(failed.iter().all(|(kind, _)| *kind == ErrorKind::Admission));
        assert!(failed[0].1.contains("skip"));
    }

    #[tokio::test]
    async fn test_verbose_size_rejections_are_reported() {
        let sink = Arc::new(Recorder::default());
        let mut task = Task::new(&config(10, 10), sink.clone()).unwrap();
        task.set_verbose(true)
            .set_filter(Filter::new().with_size_rule(ByteRange {
                min: None,
                max: Some(100),
            }));

        let big = MockItem::ok("big.png");
        let big_calls = big.calls.clone();
        task.add_item(Arc::new(big)).await;
        assert!(task.is_empty());

        let summary = task.run().await;
        assert_eq!(summary.succeeded, 0);
        assert_eq!(summary.failed, 1);
        assert_eq!(big_calls.load(Ordering::SeqCst), 0);
        let failed = sink.failures();
        assert_eq!(failed[0].0, ErrorKind::Admission);
        assert!(failed[0].1.contains("big.png"));
    }

    #[tokio::test]
    async fn test_all_rejected_batch_still_reports_on_run() {
        let sink = Arc::new(Recorder::default());
        let mut task = Task::new(&config(10, 10), sink.clone()).unwrap();
        task.set_verbose(true).set_filter(
            Filter::new().with_name_rule(PatternRule::new(&["skip".to_string()], &[]).unwrap()),
        );
        task.add_image("skip_me.png").await;
        assert!(task.is_empty());

        let summary = task.run().await;
        assert_eq!(summary.failed, 1);
        assert_eq!(sink.failures().len(), 1);
    }

    #[tokio::test]
    async fn test_panicking_worker_still_yields_one_event() {
        let sink = Arc::new(Recorder::default());
        let mut task = Task::new(&config(10, 10), sink.clone()).unwrap();
        let boom = MockItem {
            panic: true,
            ..MockItem::ok("boom.png")
        };
        task.add_item(Arc::new(boom))
            .await
            .add_item(Arc::new(MockItem::ok("fine.png")))
            .await;

        let summary = task.run().await;
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 1);
        assert!(sink.failures()[0].1.contains("boom.png"));
    }

    #[tokio::test]
    async fn test_three_local_items_one_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let one = dir.path().join("one.png");
        let three = dir.path().join("three.png");
        std::fs::write(&one, png_bytes(40, 40)).unwrap();
        std::fs::write(&three, png_bytes(40, 20)).unwrap();
        let two = dir.path().join("two.png"); // never created

        let mut cfg = config(20, 0);
        cfg.resize.output_dir = dir.path().join("out");
        let sink = Arc::new(Recorder::default());
        let mut task = Task::new(&cfg, sink.clone()).unwrap();
        let list = format!("{}, {},{},", one.display(), two.display(), three.display());
        task.add_images(&list).await;
        assert_eq!(task.len(), 3);

        let summary = task.run().await;
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(sink.failures()[0].0, ErrorKind::Resource);
        assert!(dir.path().join("out/one.png").exists());
        assert!(dir.path().join("out/three.png").exists());
    }

    #[tokio::test]
    async fn test_scan_dir_admits_through_filter() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("keep.png"), png_bytes(8, 8)).unwrap();
        std::fs::write(dir.path().join("skip_me.png"), png_bytes(8, 8)).unwrap();
        std::fs::write(dir.path().join("readme.txt"), b"text").unwrap();

        let mut cfg = config(4, 4);
        cfg.resize.output_dir = dir.path().join("out");
        cfg.filter.exclude_names = vec!["skip".to_string()];
        let sink = Arc::new(Recorder::default());
        let mut task = Task::new(&cfg, sink.clone()).unwrap();
        task.add_scan_dir(dir.path()).await.unwrap();

        assert_eq!(task.len(), 1);
        assert!(task.items()[0].name().ends_with("keep.png"));
        let summary = task.run().await;
        assert_eq!(summary.succeeded, 1);
    }

    #[tokio::test]
    async fn test_scan_error_is_returned_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let sink = Arc::new(Recorder::default());
        let mut task = Task::new(&config(4, 4), sink.clone()).unwrap();

        let err = task
            .add_scan_dir(dir.path().join("missing"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Scan);
        assert!(task.is_empty());

        let summary = task.run().await;
        assert_eq!(summary.total(), 0);
        assert!(sink.failures().is_empty());
    }

    #[test]
    fn test_split_list() {
        let items: Vec<&str> = split_list(" a.png, ,b.png,,c.png ").collect();
        assert_eq!(items, vec!["a.png", "b.png", "c.png"]);
        assert_eq!(split_list("").count(), 0);
    }
}
