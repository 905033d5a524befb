//! Image Source Resolver: turns an [`ImageSource`] into a decoded bitmap.
//!
//! Remote fetching sits behind the [`Fetcher`] trait so the rest of the
//! engine is transport-agnostic. The production implementation is
//! [`HttpFetcher`] (blocking `reqwest` with a bounded timeout); tests swap in
//! a recording mock.
//!
//! | Source | Failure | Non-fatal warning |
//! |---|---|---|
//! | Local path | [`SourceError::NotFound`] if absent | file above `local_warn_mb` |
//! | Remote URL | [`SourceError::Unavailable`] on timeout / transport / HTTP status | declared size above `remote_warn_mb` |
//! | Encoded bytes | [`SourceError::Decode`] on malformed data | none |
//!
//! Nothing is cached and nothing is retried: each call re-resolves.

use crate::types::ImageSource;
use image::{DynamicImage, ImageReader};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

const MB: u64 = 1024 * 1024;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("source not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("source unavailable: {source_id}: {reason}")]
    Unavailable { source_id: String, reason: String },
    #[error("could not decode {source_id}: {reason}")]
    Decode { source_id: String, reason: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Limits applied while resolving sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLimits {
    pub timeout: Duration,
    pub remote_warn_bytes: u64,
    pub local_warn_bytes: u64,
}

impl Default for SourceLimits {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            remote_warn_bytes: 10 * MB,
            local_warn_bytes: 20 * MB,
        }
    }
}

/// Transport for remote sources.
///
/// Implementations must not retry: a failed fetch fails the request.
pub trait Fetcher: Sync {
    /// Fetch the raw payload behind `url`.
    fn fetch(&self, url: &str) -> Result<Vec<u8>, SourceError>;
}

/// Blocking HTTP fetcher with a whole-request timeout.
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
    warn_bytes: u64,
}

impl HttpFetcher {
    pub fn new(limits: &SourceLimits) -> Result<Self, SourceError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(limits.timeout)
            .user_agent(concat!("thumbforge/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SourceError::Unavailable {
                source_id: "http client".into(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            client,
            warn_bytes: limits.remote_warn_bytes,
        })
    }
}

fn unavailable(url: &str, err: reqwest::Error) -> SourceError {
    let reason = if err.is_timeout() {
        "timed out".to_string()
    } else {
        err.to_string()
    };
    SourceError::Unavailable {
        source_id: url.to_string(),
        reason,
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, SourceError> {
        let response = self
            .client
            .get(url)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| unavailable(url, e))?;

        if let Some(len) = response.content_length()
            && len > self.warn_bytes
        {
            tracing::warn!(
                url,
                size_mb = %format!("{:.1}", len as f64 / MB as f64),
                "large remote image"
            );
        }

        let bytes = response.bytes().map_err(|e| unavailable(url, e))?;
        Ok(bytes.to_vec())
    }
}

/// Resolves sources into decoded images through a [`Fetcher`].
pub struct SourceResolver<F: Fetcher> {
    fetcher: F,
    limits: SourceLimits,
}

impl SourceResolver<HttpFetcher> {
    /// Resolver backed by the real HTTP client.
    pub fn http(limits: SourceLimits) -> Result<Self, SourceError> {
        Ok(Self::new(HttpFetcher::new(&limits)?, limits))
    }
}

impl<F: Fetcher> SourceResolver<F> {
    pub fn new(fetcher: F, limits: SourceLimits) -> Self {
        Self { fetcher, limits }
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Obtain a decoded bitmap for `source`.
    pub fn resolve(&self, source: &ImageSource) -> Result<DynamicImage, SourceError> {
        match source {
            ImageSource::LocalPath(path) => self.load_local(path),
            ImageSource::RemoteUrl(url) => {
                let bytes = self.fetcher.fetch(url)?;
                decode_bytes(&bytes, url)
            }
            ImageSource::EncodedBytes(bytes) => decode_bytes(bytes, &source.identifier()),
        }
    }

    fn load_local(&self, path: &Path) -> Result<DynamicImage, SourceError> {
        let size = match std::fs::metadata(path) {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SourceError::NotFound(path.to_path_buf()));
            }
            Err(e) => return Err(e.into()),
        };
        if size > self.limits.local_warn_bytes {
            tracing::warn!(
                path = %path.display(),
                size_mb = %format!("{:.1}", size as f64 / MB as f64),
                "large local image"
            );
        }
        ImageReader::open(path)?
            .with_guessed_format()?
            .decode()
            .map_err(|e| SourceError::Decode {
                source_id: path.display().to_string(),
                reason: e.to_string(),
            })
    }
}

/// Decode an in-memory encoded image, sniffing the format from its header.
pub fn decode_bytes(bytes: &[u8], source_id: &str) -> Result<DynamicImage, SourceError> {
    let decode_err = |reason: String| SourceError::Decode {
        source_id: source_id.to_string(),
        reason,
    };
    if bytes.is_empty() {
        return Err(decode_err("empty payload".into()));
    }
    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()?
        .decode()
        .map_err(|e| decode_err(e.to_string()))
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::test_helpers::{encode_png, solid_rgba};
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Fetcher that serves canned payloads and records every URL it was asked for.
    /// Uses Mutex (not RefCell) so it is Sync like the real client.
    #[derive(Default)]
    pub struct MockFetcher {
        pub payloads: HashMap<String, Vec<u8>>,
        pub failures: HashMap<String, String>,
        pub requests: Mutex<Vec<String>>,
    }

    impl MockFetcher {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_payload(mut self, url: &str, bytes: Vec<u8>) -> Self {
            self.payloads.insert(url.to_string(), bytes);
            self
        }

        pub fn with_failure(mut self, url: &str, reason: &str) -> Self {
            self.failures.insert(url.to_string(), reason.to_string());
            self
        }

        pub fn get_requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }
    }

    impl Fetcher for MockFetcher {
        fn fetch(&self, url: &str) -> Result<Vec<u8>, SourceError> {
            self.requests.lock().unwrap().push(url.to_string());
            if let Some(reason) = self.failures.get(url) {
                return Err(SourceError::Unavailable {
                    source_id: url.to_string(),
                    reason: reason.clone(),
                });
            }
            self.payloads
                .get(url)
                .cloned()
                .ok_or_else(|| SourceError::Unavailable {
                    source_id: url.to_string(),
                    reason: "404 Not Found".into(),
                })
        }
    }

    fn resolver(fetcher: MockFetcher) -> SourceResolver<MockFetcher> {
        SourceResolver::new(fetcher, SourceLimits::default())
    }

    #[test]
    fn resolve_remote_decodes_payload() {
        let png = encode_png(&solid_rgba(8, 6, [10, 20, 30, 255]));
        let r = resolver(MockFetcher::new().with_payload("https://x.test/a.png", png));

        let img = r
            .resolve(&ImageSource::RemoteUrl("https://x.test/a.png".into()))
            .unwrap();
        assert_eq!((img.width(), img.height()), (8, 6));
        assert_eq!(r.fetcher().get_requests(), vec!["https://x.test/a.png"]);
    }

    #[test]
    fn resolve_remote_failure_is_unavailable() {
        let r = resolver(MockFetcher::new().with_failure("https://x.test/slow.jpg", "timed out"));
        let err = r
            .resolve(&ImageSource::RemoteUrl("https://x.test/slow.jpg".into()))
            .unwrap_err();
        assert!(
            matches!(&err, SourceError::Unavailable { source_id, reason }
                if source_id == "https://x.test/slow.jpg" && reason == "timed out")
        );
    }

    #[test]
    fn resolve_does_not_retry_or_cache() {
        let png = encode_png(&solid_rgba(2, 2, [0, 0, 0, 255]));
        let r = resolver(MockFetcher::new().with_payload("https://x.test/a.png", png));
        let src = ImageSource::RemoteUrl("https://x.test/a.png".into());
        r.resolve(&src).unwrap();
        r.resolve(&src).unwrap();
        assert_eq!(r.fetcher().get_requests().len(), 2);

        let failing = resolver(MockFetcher::new());
        let _ = failing.resolve(&ImageSource::RemoteUrl("https://x.test/gone".into()));
        assert_eq!(failing.fetcher().get_requests().len(), 1);
    }

    #[test]
    fn resolve_missing_local_path_is_not_found() {
        let r = resolver(MockFetcher::new());
        let err = r
            .resolve(&ImageSource::LocalPath("/nonexistent/bg.jpg".into()))
            .unwrap_err();
        assert!(matches!(err, SourceError::NotFound(p) if p == Path::new("/nonexistent/bg.jpg")));
    }

    #[test]
    fn resolve_unreadable_local_path_is_io_not_missing() {
        let tmp = tempfile::TempDir::new().unwrap();
        let file = tmp.path().join("plain.png");
        std::fs::write(&file, b"x").unwrap();

        // a regular file used as a directory: stat fails, but not with NotFound
        let err = resolver(MockFetcher::new())
            .resolve(&ImageSource::LocalPath(file.join("child.png")))
            .unwrap_err();
        assert!(matches!(err, SourceError::Io(_)), "unexpected error: {err:?}");
    }

    #[test]
    fn resolve_local_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("icon.png");
        std::fs::write(&path, encode_png(&solid_rgba(5, 7, [1, 2, 3, 128]))).unwrap();

        let img = resolver(MockFetcher::new())
            .resolve(&ImageSource::LocalPath(path))
            .unwrap();
        assert_eq!((img.width(), img.height()), (5, 7));
    }

    #[test]
    fn resolve_local_garbage_is_decode_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("not-an-image.png");
        std::fs::write(&path, b"definitely not a png").unwrap();

        let err = resolver(MockFetcher::new())
            .resolve(&ImageSource::LocalPath(path))
            .unwrap_err();
        assert!(matches!(err, SourceError::Decode { .. }));
    }

    #[test]
    fn resolve_encoded_bytes() {
        let png = encode_png(&solid_rgba(3, 4, [255, 0, 0, 255]));
        let img = resolver(MockFetcher::new())
            .resolve(&ImageSource::EncodedBytes(png))
            .unwrap();
        assert_eq!((img.width(), img.height()), (3, 4));
    }

    #[test]
    fn malformed_bytes_are_decode_error() {
        let err = decode_bytes(b"\x00\x01\x02garbage", "upload").unwrap_err();
        assert!(matches!(err, SourceError::Decode { source_id, .. } if source_id == "upload"));
        let err = decode_bytes(&[], "upload").unwrap_err();
        assert!(matches!(err, SourceError::Decode { .. }));
    }

    #[test]
    fn http_fetcher_times_out_on_silent_server() {
        use std::net::TcpListener;

        // Accepts connections but never answers.
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let _hold = std::thread::spawn(move || {
            let mut held = Vec::new();
            for stream in listener.incoming().take(1) {
                held.push(stream);
                std::thread::sleep(Duration::from_secs(3));
            }
        });

        let limits = SourceLimits {
            timeout: Duration::from_millis(300),
            ..SourceLimits::default()
        };
        let fetcher = HttpFetcher::new(&limits).unwrap();
        let url = format!("http://{addr}/background.jpg");
        let err = fetcher.fetch(&url).unwrap_err();
        assert!(
            matches!(&err, SourceError::Unavailable { source_id, reason }
                if *source_id == url && reason == "timed out"),
            "unexpected error: {err:?}"
        );
    }
}
