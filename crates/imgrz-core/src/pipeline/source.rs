//! Work items: anything the orchestrator can resize.
//!
//! The orchestrator only sees [`WorkItem`]; [`LocalImage`] and
//! [`RemoteImage`] are the two concrete sources.

use async_trait::async_trait;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::PipelineResult;
use crate::types::ResizeParams;

use super::fetch::{self, RemoteFetcher};
use super::resize::ImageResizer;

/// A single unit of work in a batch.
///
/// Uses `async_trait` because the orchestrator holds items as
/// `Arc<dyn WorkItem>` and spawns one task per item.
#[async_trait]
pub trait WorkItem: Send + Sync + fmt::Debug {
    /// Descriptor used by name rules and in report lines (path or URL).
    fn name(&self) -> &str;

    /// Source size in bytes, consulted by size rules.
    async fn byte_size(&self) -> PipelineResult<u64>;

    /// Acquire the source, resize it and save the result.
    ///
    /// Returns the path the resized image was written to.
    async fn resize_to(&self, params: &ResizeParams) -> PipelineResult<PathBuf>;
}

/// An image addressed by a local path.
pub struct LocalImage {
    path: PathBuf,
    name: String,
    resizer: Arc<ImageResizer>,
}

impl LocalImage {
    pub fn new(path: impl Into<PathBuf>, resizer: Arc<ImageResizer>) -> Self {
        let path = path.into();
        let name = path.to_string_lossy().into_owned();
        Self {
            path,
            name,
            resizer,
        }
    }
}

impl fmt::Debug for LocalImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalImage")
            .field("path", &self.path)
            .finish()
    }
}

#[async_trait]
impl WorkItem for LocalImage {
    fn name(&self) -> &str {
        &self.name
    }

    async fn byte_size(&self) -> PipelineResult<u64> {
        fetch::local_size(&self.path).await
    }

    async fn resize_to(&self, params: &ResizeParams) -> PipelineResult<PathBuf> {
        let start = std::time::Instant::now();
        let size = fetch::local_size(&self.path).await?;
        self.resizer.validator().check_size(&self.name, size)?;
        let bytes = fetch::read_local(&self.path).await?;
        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned());
        let saved = self
            .resizer
            .resize_bytes(bytes, &self.name, file_name.as_deref(), params)
            .await?;
        tracing::debug!("Resized {:?} in {:?}", self.path, start.elapsed());
        Ok(saved)
    }
}

/// An image addressed by an HTTP(S) URL.
pub struct RemoteImage {
    url: String,
    fetcher: RemoteFetcher,
    resizer: Arc<ImageResizer>,
}

impl RemoteImage {
    pub fn new(url: impl Into<String>, fetcher: RemoteFetcher, resizer: Arc<ImageResizer>) -> Self {
        Self {
            url: url.into(),
            fetcher,
            resizer,
        }
    }
}

impl fmt::Debug for RemoteImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteImage").field("url", &self.url).finish()
    }
}

#[async_trait]
impl WorkItem for RemoteImage {
    fn name(&self) -> &str {
        &self.url
    }

    async fn byte_size(&self) -> PipelineResult<u64> {
        match self.fetcher.content_length(&self.url).await? {
            Some(len) => Ok(len),
            None => Ok(self.fetcher.fetch(&self.url).await?.len() as u64),
        }
    }

    async fn resize_to(&self, params: &ResizeParams) -> PipelineResult<PathBuf> {
        let start = std::time::Instant::now();
        let bytes = self.fetcher.fetch(&self.url).await?;
        let file_name = url_file_name(&self.url);
        let saved = self
            .resizer
            .resize_bytes(bytes, &self.url, file_name.as_deref(), params)
            .await?;
        tracing::debug!("Resized {} in {:?}", self.url, start.elapsed());
        Ok(saved)
    }
}

/// Last path segment of a URL when it looks like a file name.
///
/// Query strings and fragments are ignored; segments without an extension
/// yield `None`.
pub fn url_file_name(url: &str) -> Option<String> {
    let without_scheme = url.split_once("://").map(|(_, rest)| rest).unwrap_or(url);
    let path = without_scheme
        .split(['?', '#'])
        .next()
        .unwrap_or_default();
    let (_, path) = path.split_once('/')?;
    let segment = path.rsplit('/').next()?;
    let has_extension = Path::new(segment)
        .extension()
        .is_some_and(|ext| !ext.is_empty());
    if segment.is_empty() || !has_extension || segment.starts_with('.') {
        return None;
    }
    Some(segment.to_string())
}
