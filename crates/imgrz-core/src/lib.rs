//! imgrz Core - concurrent batch image resizing.
//!
//! Takes a heterogeneous batch of image sources (local files, remote URLs,
//! directory scans), resizes each one concurrently and reports every outcome.
//!
//! # Architecture
//!
//! ```text
//! sources → Filter → Task → one worker per item → success / failure streams → Reporter
//! ```
//!
//! [`Task::run`] returns only after the reporter has drained both streams, so
//! every result has been reported by the time control comes back.
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use imgrz_core::{Config, Task, TracingSink};
//!
//! #[tokio::main]
//! async fn main() -> imgrz_core::Result<()> {
//!     let config = Config::load()?;
//!     let mut task = Task::new(&config, Arc::new(TracingSink))?;
//!     task.add_images("a.jpg,b.png").await;
//!     task.add_scan_dir("./photos").await?;
//!
//!     let summary = task.run().await;
//!     println!("{} resized, {} failed", summary.succeeded, summary.failed);
//!     Ok(())
//! }
//! ```

// Module declarations
pub mod config;
pub mod error;
pub mod pipeline;
pub mod types;

// Re-exports for convenient access
pub use config::Config;
pub use error::{ConfigError, ErrorKind, ImgrzError, PipelineError, PipelineResult, Result};
pub use pipeline::{
    Filter, LocalImage, RemoteImage, ReportSink, Reporter, Task, TracingSink, WorkItem,
};
pub use types::{BatchSummary, Interpolation, ResizeParams, SaveResult};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
