//! Batch resize pipeline components.
//!
//! - **filter**: Name and size admission rules
//! - **source**: Work items (local paths and remote URLs)
//! - **fetch**: Reading local files and downloading remote ones
//! - **validate**: Size limits and magic-byte checks
//! - **decode**: Load and decode images from various formats
//! - **resize**: Resize, encode and save
//! - **discovery**: Find image files in directories
//! - **channel**: Bounded success and failure streams
//! - **reporter**: Drains the streams into a report sink
//! - **task**: Orchestrates admission, fan-out and the shutdown handshake

pub mod channel;
pub mod decode;
pub mod discovery;
pub mod fetch;
pub mod filter;
pub mod reporter;
pub mod resize;
pub mod source;
pub mod task;
pub mod validate;

// Re-exports for convenient access
pub use decode::{DecodedImage, ImageDecoder};
pub use discovery::FileDiscovery;
pub use fetch::RemoteFetcher;
pub use filter::{parse_byte_size, ByteRange, Filter, NameRule, PatternRule, SizeRule};
pub use reporter::{ReportSink, Reporter, TracingSink};
pub use resize::ImageResizer;
pub use source::{LocalImage, RemoteImage, WorkItem};
pub use task::{RunState, Task};
pub use validate::Validator;
