//! Result storage collaborator
//!
//! Raw engine output is read as a byte stream and parsed as multiple
//! concatenated (or newline-delimited) JSON documents, one per result row.

use std::collections::HashMap;
use std::io::Cursor;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::io::AsyncRead;
use tokio::sync::RwLock;

use joule_core::domain::result_row::ResultRow;

/// Read access to raw engine output
#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Opens a read stream for the object at `path`
    async fn get_read_stream(
        &self,
        path: &str,
    ) -> std::io::Result<Box<dyn AsyncRead + Send + Unpin>>;
}

/// Filesystem-backed result store
///
/// Paths from result notifications are resolved relative to the configured
/// root.
#[derive(Debug, Clone)]
pub struct FsResultStore {
    root: PathBuf,
}

impl FsResultStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ResultStore for FsResultStore {
    async fn get_read_stream(
        &self,
        path: &str,
    ) -> std::io::Result<Box<dyn AsyncRead + Send + Unpin>> {
        let file = tokio::fs::File::open(self.root.join(path.trim_start_matches('/'))).await?;
        Ok(Box::new(file))
    }
}

/// In-memory result store for tests and embedded runs
#[derive(Debug, Default)]
pub struct InMemoryResultStore {
    objects: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn put(&self, path: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.objects.write().await.insert(path.into(), bytes.into());
    }
}

#[async_trait]
impl ResultStore for InMemoryResultStore {
    async fn get_read_stream(
        &self,
        path: &str,
    ) -> std::io::Result<Box<dyn AsyncRead + Send + Unpin>> {
        let objects = self.objects.read().await;
        let bytes = objects.get(path).cloned().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotFound, format!("no object at {}", path))
        })?;
        Ok(Box::new(Cursor::new(bytes)))
    }
}

/// Parses a stream of concatenated JSON documents into result rows
pub fn parse_result_rows(bytes: &[u8]) -> Result<Vec<ResultRow>, serde_json::Error> {
    serde_json::Deserializer::from_slice(bytes)
        .into_iter::<ResultRow>()
        .collect()
}

/// Extracts the result name from an engine output path
///
/// The engine writes each category under its own directory, e.g.
/// `results/<job-id>/hourly_consumption/part-0000.json`; the result name is
/// the deepest directory segment.
pub fn result_name_from_path(path: &str) -> Option<String> {
    let mut segments = path.split('/').filter(|s| !s.is_empty()).rev();
    let last = segments.next()?;
    if last.contains('.') {
        segments.next().map(str::to_string)
    } else {
        Some(last.to_string())
    }
}
