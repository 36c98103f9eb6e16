use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::errors::{AssetError, Error, Result};

/// Byte-level progress of a single fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadProgress {
    pub loaded: u64,
    /// `None` when the source does not announce a length.
    pub total: Option<u64>,
}

impl LoadProgress {
    /// Completion rounded to the nearest percent, if the total is known.
    #[must_use]
    pub fn percent(&self) -> Option<u32> {
        match self.total {
            Some(total) if total > 0 => {
                Some((self.loaded as f64 / total as f64 * 100.0).round() as u32)
            }
            _ => None,
        }
    }
}

/// Asynchronous byte source for assets, addressed by URIs relative to a root.
pub trait AssetReader {
    fn read_bytes(&self, uri: &str) -> impl Future<Output = Result<Vec<u8>>>;

    /// Reads bytes while reporting progress.
    ///
    /// The default implementation reports once, on completion.
    fn read_bytes_with_progress(
        &self,
        uri: &str,
        on_progress: &mut dyn FnMut(LoadProgress),
    ) -> impl Future<Output = Result<Vec<u8>>> {
        async move {
            let bytes = self.read_bytes(uri).await?;
            let len = bytes.len() as u64;
            on_progress(LoadProgress { loaded: len, total: Some(len) });
            Ok(bytes)
        }
    }

    /// Human-readable location of `uri`, for logs.
    fn describe(&self, uri: &str) -> String {
        uri.to_string()
    }
}

/// Resolves `relative` against the directory of `base_uri`.
///
/// Absolute URLs and absolute paths are returned unchanged.
#[must_use]
pub fn resolve_relative(base_uri: &str, relative: &str) -> String {
    if relative.contains("://") || relative.starts_with('/') {
        return relative.to_string();
    }
    let relative = relative.replace('\\', "/");
    match base_uri.rfind('/') {
        Some(pos) => format!("{}{}", &base_uri[..=pos], relative),
        None => relative,
    }
}

// ============================================================================
// Local files
// ============================================================================

pub struct FileAssetReader {
    root_path: PathBuf,
}

impl FileAssetReader {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let root_path = if path.is_file() {
            path.parent().unwrap_or(Path::new(".")).to_path_buf()
        } else {
            path.to_path_buf()
        };
        Self { root_path }
    }

    #[inline]
    #[must_use]
    pub fn root_path(&self) -> &Path {
        &self.root_path
    }
}

impl AssetReader for FileAssetReader {
    async fn read_bytes(&self, uri: &str) -> Result<Vec<u8>> {
        let path = self.root_path.join(uri);
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(data),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(AssetError::NotFound(path.display().to_string()).into())
            }
            Err(err) => Err(err.into()),
        }
    }

    fn describe(&self, uri: &str) -> String {
        self.root_path.join(uri).display().to_string()
    }
}

// ============================================================================
// HTTP
// ============================================================================

pub struct HttpAssetReader {
    root_url: url::Url,
    client: reqwest::Client,
}

impl HttpAssetReader {
    /// `url_str` is the asset root; a trailing file name is dropped.
    pub fn new(url_str: &str) -> Result<Self> {
        let url = url::Url::parse(url_str)?;
        let root_url = if url.path().ends_with('/') {
            url
        } else {
            let mut u = url.clone();
            if let Ok(mut segments) = u.path_segments_mut() {
                segments.pop();
                segments.push("");
            }
            u
        };

        Ok(Self {
            root_url,
            client: reqwest::Client::new(),
        })
    }

    #[inline]
    #[must_use]
    pub fn root_url(&self) -> &url::Url {
        &self.root_url
    }

    fn resolve(&self, uri: &str) -> Result<url::Url> {
        Ok(self.root_url.join(uri)?)
    }
}

impl AssetReader for HttpAssetReader {
    async fn read_bytes(&self, uri: &str) -> Result<Vec<u8>> {
        self.read_bytes_with_progress(uri, &mut |_| {}).await
    }

    async fn read_bytes_with_progress(
        &self,
        uri: &str,
        on_progress: &mut dyn FnMut(LoadProgress),
    ) -> Result<Vec<u8>> {
        let url = self.resolve(uri)?;
        let mut resp = self.client.get(url.clone()).send().await?;
        if !resp.status().is_success() {
            return Err(Error::HttpResponse {
                status: resp.status().as_u16(),
                url: url.to_string(),
            });
        }

        let total = resp.content_length();
        let mut bytes = Vec::with_capacity(total.unwrap_or(0) as usize);
        while let Some(chunk) = resp.chunk().await? {
            bytes.extend_from_slice(&chunk);
            on_progress(LoadProgress { loaded: bytes.len() as u64, total });
        }
        Ok(bytes)
    }

    fn describe(&self, uri: &str) -> String {
        self.resolve(uri)
            .map_or_else(|_| uri.to_string(), |url| url.to_string())
    }
}

// ============================================================================
// In-memory
// ============================================================================

/// Serves assets from a map, e.g. bundled data or fixtures.
#[derive(Default, Clone)]
pub struct MemoryAssetReader {
    files: HashMap<String, Arc<[u8]>>,
}

impl MemoryAssetReader {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, uri: &str, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert(uri, bytes);
        self
    }

    pub fn insert(&mut self, uri: &str, bytes: impl Into<Vec<u8>>) {
        self.files.insert(uri.to_string(), Arc::from(bytes.into()));
    }
}

impl AssetReader for MemoryAssetReader {
    async fn read_bytes(&self, uri: &str) -> Result<Vec<u8>> {
        self.files
            .get(uri)
            .map(|bytes| bytes.to_vec())
            .ok_or_else(|| AssetError::NotFound(uri.to_string()).into())
    }
}

// ============================================================================
// Variant
// ============================================================================

/// Picks the reader matching a configured asset root.
#[derive(Clone)]
pub enum AssetReaderVariant {
    File(Arc<FileAssetReader>),
    Http(Arc<HttpAssetReader>),
    Memory(Arc<MemoryAssetReader>),
}

impl AssetReaderVariant {
    /// HTTP(S) URLs get an HTTP reader, anything else is a local directory.
    pub fn from_source(source: &str) -> Result<Self> {
        if source.starts_with("http://") || source.starts_with("https://") {
            Ok(Self::Http(Arc::new(HttpAssetReader::new(source)?)))
        } else {
            Ok(Self::File(Arc::new(FileAssetReader::new(source))))
        }
    }
}

impl AssetReader for AssetReaderVariant {
    async fn read_bytes(&self, uri: &str) -> Result<Vec<u8>> {
        match self {
            Self::File(r) => r.read_bytes(uri).await,
            Self::Http(r) => r.read_bytes(uri).await,
            Self::Memory(r) => r.read_bytes(uri).await,
        }
    }

    async fn read_bytes_with_progress(
        &self,
        uri: &str,
        on_progress: &mut dyn FnMut(LoadProgress),
    ) -> Result<Vec<u8>> {
        match self {
            Self::File(r) => r.read_bytes_with_progress(uri, on_progress).await,
            Self::Http(r) => r.read_bytes_with_progress(uri, on_progress).await,
            Self::Memory(r) => r.read_bytes_with_progress(uri, on_progress).await,
        }
    }

    fn describe(&self, uri: &str) -> String {
        match self {
            Self::File(r) => r.describe(uri),
            Self::Http(r) => r.describe(uri),
            Self::Memory(r) => r.describe(uri),
        }
    }
}
