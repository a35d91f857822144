//! Trust anchor acquisition.
//!
//! A trust anchor is the service's public key (or a certificate carrying it).
//! It is obtained from an ordered chain of [`TrustAnchorSource`]s: normally a
//! local file first and the service's public-key endpoint as a fallback. A
//! failing source is logged and skipped; only an exhausted chain is an error.

use crate::error::{FirmaError, Result};
use crate::paths::require_path;
use async_trait::async_trait;
use reqwest::Client as HttpClient;
use std::fmt;
use std::path::PathBuf;
use tracing::{info, warn};

/// Endpoint serving the service's public key as a raw binary body.
pub const DEFAULT_PUBLIC_KEY_ENDPOINT: &str = "/certs/http/public-key";

/// Raw public key or certificate bytes (PEM or DER).
#[derive(Clone, PartialEq, Eq)]
pub struct TrustAnchor(Vec<u8>);

impl TrustAnchor {
    /// Wrap raw anchor bytes.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// The anchor bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns true if no bytes were obtained.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Consume the anchor, returning its bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl fmt::Debug for TrustAnchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TrustAnchor({} bytes)", self.0.len())
    }
}

/// A place a trust anchor can be obtained from.
#[async_trait]
pub trait TrustAnchorSource: Send + Sync {
    /// Short description used in log messages and errors.
    fn describe(&self) -> String;

    /// Obtain the anchor, reading it whole.
    async fn fetch(&self) -> Result<TrustAnchor>;
}

/// Reads the anchor from `dir/file_name`.
#[derive(Debug, Clone)]
pub struct FileSource {
    dir: PathBuf,
    file_name: String,
}

impl FileSource {
    /// Create a source for `dir/file_name`.
    pub fn new(dir: impl Into<PathBuf>, file_name: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            file_name: file_name.into(),
        }
    }

    /// The joined path this source reads.
    pub fn path(&self) -> PathBuf {
        self.dir.join(&self.file_name)
    }
}

#[async_trait]
impl TrustAnchorSource for FileSource {
    fn describe(&self) -> String {
        format!("file {}", self.path().display())
    }

    async fn fetch(&self) -> Result<TrustAnchor> {
        let path = require_path(self.path())?;
        let bytes = tokio::fs::read(&path).await.map_err(|e| {
            FirmaError::TrustAnchorUnavailable(format!(
                "could not read {}: {}",
                path.display(),
                e
            ))
        })?;
        Ok(TrustAnchor(bytes))
    }
}

/// Downloads the anchor with a single GET.
#[derive(Debug, Clone)]
pub struct RemoteSource {
    http: HttpClient,
    url: String,
}

impl RemoteSource {
    /// Create a source for `base_url + endpoint`.
    pub fn new(http: HttpClient, base_url: &str, endpoint: &str) -> Self {
        Self {
            http,
            url: format!("{}{}", base_url.trim_end_matches('/'), endpoint),
        }
    }

    /// The URL this source requests.
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl TrustAnchorSource for RemoteSource {
    fn describe(&self) -> String {
        format!("endpoint {}", self.url)
    }

    async fn fetch(&self) -> Result<TrustAnchor> {
        let response = self
            .http
            .get(&self.url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| {
                FirmaError::TrustAnchorUnavailable(format!(
                    "could not fetch public key from {}: {}",
                    self.url, e
                ))
            })?;

        let bytes = response.bytes().await.map_err(|e| {
            FirmaError::TrustAnchorUnavailable(format!(
                "could not read public key from {}: {}",
                self.url, e
            ))
        })?;
        Ok(TrustAnchor(bytes.to_vec()))
    }
}

/// Tries each source in order and returns the first non-empty anchor.
#[derive(Default)]
pub struct TrustAnchorLoader {
    sources: Vec<Box<dyn TrustAnchorSource>>,
}

impl TrustAnchorLoader {
    /// Create a loader with no sources.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the usual local-file-then-endpoint chain.
    ///
    /// The file source is only included when both a directory and a file
    /// name are given.
    pub fn standard(
        local: Option<(PathBuf, String)>,
        http: HttpClient,
        base_url: &str,
        endpoint: &str,
    ) -> Self {
        let mut loader = Self::new();
        if let Some((dir, file_name)) = local {
            loader = loader.with_source(FileSource::new(dir, file_name));
        }
        loader.with_source(RemoteSource::new(http, base_url, endpoint))
    }

    /// Append a source to the end of the chain.
    pub fn with_source(mut self, source: impl TrustAnchorSource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    /// Append an already boxed source to the end of the chain.
    pub fn with_boxed_source(mut self, source: Box<dyn TrustAnchorSource>) -> Self {
        self.sources.push(source);
        self
    }

    /// Number of sources in the chain.
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Returns true if the chain has no sources.
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Walk the chain and return the first usable anchor.
    pub async fn load(&self) -> Result<TrustAnchor> {
        let mut last_failure = "no trust anchor source configured".to_string();

        for source in &self.sources {
            match source.fetch().await {
                Ok(anchor) if !anchor.is_empty() => {
                    info!(source = %source.describe(), "loaded trust anchor");
                    return Ok(anchor);
                }
                Ok(_) => {
                    warn!(source = %source.describe(), "trust anchor source returned no data");
                    last_failure = format!("{} returned no data", source.describe());
                }
                Err(e) => {
                    warn!(
                        source = %source.describe(),
                        error = %e,
                        "trust anchor source failed, trying next"
                    );
                    last_failure = e.to_string();
                }
            }
        }

        Err(FirmaError::TrustAnchorUnavailable(last_failure))
    }
}

impl fmt::Debug for TrustAnchorLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.sources.iter().map(|s| s.describe()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Fixed {
        result: std::result::Result<Vec<u8>, String>,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl TrustAnchorSource for Fixed {
        fn describe(&self) -> String {
            "fixed".to_string()
        }

        async fn fetch(&self) -> Result<TrustAnchor> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.result {
                Ok(bytes) => Ok(TrustAnchor::new(bytes.clone())),
                Err(msg) => Err(FirmaError::TrustAnchorUnavailable(msg.clone())),
            }
        }
    }

    fn fixed(result: std::result::Result<&[u8], &str>) -> (Fixed, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let source = Fixed {
            result: result.map(|b| b.to_vec()).map_err(|e| e.to_string()),
            calls: calls.clone(),
        };
        (source, calls)
    }

    #[tokio::test]
    async fn test_first_success_wins() {
        let (first, first_calls) = fixed(Ok(b"first"));
        let (second, second_calls) = fixed(Ok(b"second"));

        let anchor = TrustAnchorLoader::new()
            .with_source(first)
            .with_source(second)
            .load()
            .await
            .unwrap();

        assert_eq!(anchor.as_bytes(), b"first");
        assert_eq!(first_calls.load(Ordering::SeqCst), 1);
        assert_eq!(second_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failure_falls_through() {
        let (first, _) = fixed(Err("missing file"));
        let (second, second_calls) = fixed(Ok(b"remote"));

        let anchor = TrustAnchorLoader::new()
            .with_source(first)
            .with_source(second)
            .load()
            .await
            .unwrap();

        assert_eq!(anchor.as_bytes(), b"remote");
        assert_eq!(second_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_anchor_is_skipped() {
        let (first, _) = fixed(Ok(b""));
        let loader = TrustAnchorLoader::new().with_source(first);

        let err = loader.load().await.unwrap_err();
        assert!(matches!(err, FirmaError::TrustAnchorUnavailable(msg) if msg.contains("no data")));
    }

    #[tokio::test]
    async fn test_exhausted_chain_reports_last_failure() {
        let (first, _) = fixed(Err("local broken"));
        let (second, _) = fixed(Err("remote broken"));

        let err = TrustAnchorLoader::new()
            .with_source(first)
            .with_source(second)
            .load()
            .await
            .unwrap_err();

        assert!(
            matches!(err, FirmaError::TrustAnchorUnavailable(msg) if msg.contains("remote broken"))
        );
    }

    #[tokio::test]
    async fn test_empty_chain() {
        let err = TrustAnchorLoader::new().load().await.unwrap_err();
        assert!(matches!(err, FirmaError::TrustAnchorUnavailable(_)));
    }

    #[tokio::test]
    async fn test_file_source_reads_whole_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("public.pem"), b"-----BEGIN PUBLIC KEY-----").unwrap();

        let source = FileSource::new(dir.path(), "public.pem");
        let anchor = source.fetch().await.unwrap();
        assert_eq!(anchor.as_bytes(), b"-----BEGIN PUBLIC KEY-----");
    }

    #[tokio::test]
    async fn test_file_source_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let source = FileSource::new(dir.path(), "missing.pem");

        let err = source.fetch().await.unwrap_err();
        assert!(matches!(err, FirmaError::InvalidPath(_)));
    }

    #[test]
    fn test_standard_chain_layout() {
        let http = HttpClient::new();
        let remote_only = TrustAnchorLoader::standard(
            None,
            http.clone(),
            "https://firma.test/",
            DEFAULT_PUBLIC_KEY_ENDPOINT,
        );
        assert_eq!(remote_only.len(), 1);

        let both = TrustAnchorLoader::standard(
            Some((PathBuf::from("/certs"), "ca.crt".to_string())),
            http,
            "https://firma.test",
            DEFAULT_PUBLIC_KEY_ENDPOINT,
        );
        assert_eq!(both.len(), 2);
        assert_eq!(
            format!("{:?}", both),
            r#"["file /certs/ca.crt", "endpoint https://firma.test/certs/http/public-key"]"#
        );
    }

    #[test]
    fn test_anchor_debug_hides_bytes() {
        let anchor = TrustAnchor::new(b"secret-ish".to_vec());
        assert_eq!(format!("{:?}", anchor), "TrustAnchor(10 bytes)");
    }
}
