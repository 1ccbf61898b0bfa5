//! S3-compatible object storage for product images.
//!
//! Objects are addressed path-style (`<endpoint>/<bucket>/<key>`) and every
//! transfer goes through a presigned URL, so the same URLs can be handed to
//! other clients.

pub mod presign;

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use chrono::Utc;
use futures::StreamExt;
use rand::Rng;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info, instrument};
use url::Url;

use self::presign::{Credentials, PresignRequest, encode_key, presigned_query};
use crate::config::StorageConfig;

/// Key prefix for product images.
const PRODUCT_IMAGE_PREFIX: &str = "products";
const RANDOM_SUFFIX_LEN: usize = 13;

/// Errors from object storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The configured endpoint is not a usable URL.
    #[error("invalid storage endpoint: {0}")]
    InvalidEndpoint(String),

    /// The request could not be signed.
    #[error("signing failed: {0}")]
    Signing(String),

    /// A local file could not be read or written.
    #[error("file error: {0}")]
    Io(#[from] std::io::Error),

    /// The HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The upload was rejected.
    #[error("upload failed with status {status}: {body}")]
    UploadFailed { status: u16, body: String },

    /// The download was rejected.
    #[error("download failed with status {status}")]
    DownloadFailed { status: u16 },
}

/// Object storage client.
///
/// Cheap to clone; clones share the HTTP connection pool.
#[derive(Clone)]
pub struct ObjectStorage {
    inner: Arc<ObjectStorageInner>,
}

struct ObjectStorageInner {
    client: reqwest::Client,
    endpoint: Url,
    /// Host header value for the endpoint.
    host: String,
    bucket: String,
    region: String,
    access_key_id: String,
    secret_access_key: SecretString,
    public_host: String,
    url_expiry: Duration,
}

impl std::fmt::Debug for ObjectStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectStorage")
            .field("endpoint", &self.inner.endpoint.as_str())
            .field("bucket", &self.inner.bucket)
            .field("secret_access_key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl ObjectStorage {
    /// Create a storage client.
    ///
    /// # Errors
    ///
    /// Returns `InvalidEndpoint` if the endpoint has no host, or `Http` if
    /// the HTTP client fails to build.
    pub fn new(config: &StorageConfig) -> Result<Self, StorageError> {
        let endpoint = Url::parse(&config.endpoint)
            .map_err(|e| StorageError::InvalidEndpoint(format!("{}: {e}", config.endpoint)))?;
        let host = match (endpoint.host_str(), endpoint.port()) {
            (Some(host), Some(port)) => format!("{host}:{port}"),
            (Some(host), None) => host.to_string(),
            (None, _) => return Err(StorageError::InvalidEndpoint(config.endpoint.clone())),
        };

        let client = reqwest::Client::builder().build()?;

        Ok(Self {
            inner: Arc::new(ObjectStorageInner {
                client,
                endpoint,
                host,
                bucket: config.bucket.clone(),
                region: config.region.clone(),
                access_key_id: config.access_key_id.clone(),
                secret_access_key: config.secret_access_key.clone(),
                public_host: config.public_host.clone(),
                url_expiry: config.url_expiry,
            }),
        })
    }

    /// Presigned URL for uploading `key` with `PUT`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Signing` if signing fails.
    pub fn presign_put(&self, key: &str) -> Result<String, StorageError> {
        self.presign("PUT", key, Utc::now())
    }

    /// Presigned URL for downloading `key` with `GET`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Signing` if signing fails.
    pub fn presign_get(&self, key: &str) -> Result<String, StorageError> {
        self.presign("GET", key, Utc::now())
    }

    fn presign(
        &self,
        method: &str,
        key: &str,
        now: chrono::DateTime<Utc>,
    ) -> Result<String, StorageError> {
        let inner = &self.inner;
        let base = inner.endpoint.path().trim_end_matches('/');
        let path = format!(
            "{base}/{}/{}",
            urlencoding::encode(&inner.bucket),
            encode_key(key)
        );

        let query = presigned_query(
            &Credentials {
                access_key_id: &inner.access_key_id,
                secret_access_key: inner.secret_access_key.expose_secret(),
                region: &inner.region,
            },
            &PresignRequest {
                method,
                host: &inner.host,
                path: &path,
                expires: inner.url_expiry,
                now,
            },
        )?;

        Ok(format!(
            "{}://{}{path}?{query}",
            inner.endpoint.scheme(),
            inner.host
        ))
    }

    /// Public URL an uploaded object is served from.
    #[must_use]
    pub fn public_url(&self, key: &str) -> String {
        format!("https://{}/{}", self.inner.public_host, encode_key(key))
    }

    /// `PUT` bytes to a presigned URL.
    ///
    /// # Errors
    ///
    /// Returns `Http` on network failure or `UploadFailed` for a non-success
    /// status.
    #[instrument(skip(self, url, bytes), fields(size = bytes.len()))]
    pub async fn upload_with_presigned_url(
        &self,
        url: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError> {
        let response = self
            .inner
            .client
            .put(url)
            .header("Content-Type", content_type)
            .body(bytes)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %body.chars().take(500).collect::<String>(), "Upload rejected");
            return Err(StorageError::UploadFailed {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        debug!("Upload succeeded");
        Ok(())
    }

    /// Upload a local image under a fresh `products/` key.
    ///
    /// Returns the public URL of the stored image.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the file cannot be read, otherwise as
    /// [`upload_with_presigned_url`](Self::upload_with_presigned_url).
    #[instrument(skip(self), fields(path = %path.display()))]
    pub async fn upload_product_image(&self, path: &Path) -> Result<String, StorageError> {
        let bytes = tokio::fs::read(path).await?;
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map_or_else(|| "jpg".to_string(), str::to_ascii_lowercase);
        let key = generate_unique_key(PRODUCT_IMAGE_PREFIX, &extension);

        let url = self.presign_put(&key)?;
        self.upload_with_presigned_url(&url, bytes, content_type_for(&extension))
            .await?;

        let public_url = self.public_url(&key);
        info!(key = %key, url = %public_url, "Uploaded product image");
        Ok(public_url)
    }

    /// Download `key` to a local file.
    ///
    /// Returns the number of bytes written.
    ///
    /// # Errors
    ///
    /// Returns `DownloadFailed` for a non-success status, `Http` if the body
    /// stream fails, or `Io` if the file cannot be written.
    #[instrument(skip(self), fields(destination = %destination.display()))]
    pub async fn download_object(&self, key: &str, destination: &Path) -> Result<u64, StorageError> {
        let url = self.presign_get(key)?;
        let response = self.inner.client.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            error!(status = %status, "Download rejected");
            return Err(StorageError::DownloadFailed {
                status: status.as_u16(),
            });
        }

        let mut file = tokio::fs::File::create(destination).await?;
        let mut stream = response.bytes_stream();
        let mut written: u64 = 0;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        info!(bytes = written, "Downloaded object");
        Ok(written)
    }
}

/// MIME type for an image file extension. Unknown extensions are sent as JPEG.
#[must_use]
pub fn content_type_for(extension: &str) -> &'static str {
    match extension.to_ascii_lowercase().as_str() {
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => "image/jpeg",
    }
}

/// `<prefix>/<unix-millis>-<13 random base36 chars>.<extension>`
#[must_use]
pub fn generate_unique_key(prefix: &str, extension: &str) -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis());
    let mut rng = rand::rng();
    let suffix: String = (0..RANDOM_SUFFIX_LEN)
        .filter_map(|_| char::from_digit(rng.random_range(0..36), 36))
        .collect();
    format!("{prefix}/{millis}-{suffix}.{extension}")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn config(endpoint: &str) -> StorageConfig {
        StorageConfig {
            endpoint: endpoint.to_string(),
            bucket: "tarstock-images".to_string(),
            region: "auto".to_string(),
            access_key_id: "AKIDEXAMPLE".to_string(),
            secret_access_key: SecretString::from("wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY"),
            public_host: "images.example.com".to_string(),
            url_expiry: Duration::from_secs(3600),
        }
    }

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for("jpg"), "image/jpeg");
        assert_eq!(content_type_for("JPEG"), "image/jpeg");
        assert_eq!(content_type_for("png"), "image/png");
        assert_eq!(content_type_for("gif"), "image/gif");
        assert_eq!(content_type_for("webp"), "image/webp");
        assert_eq!(content_type_for("heic"), "image/jpeg");
    }

    #[test]
    fn test_generate_unique_key_shape() {
        let key = generate_unique_key("products", "png");
        let rest = key.strip_prefix("products/").unwrap();
        let (stem, ext) = rest.rsplit_once('.').unwrap();
        assert_eq!(ext, "png");
        let (millis, suffix) = stem.split_once('-').unwrap();
        assert!(millis.parse::<u128>().is_ok());
        assert_eq!(suffix.len(), RANDOM_SUFFIX_LEN);
        assert!(
            suffix
                .chars()
                .all(|c| c.is_ascii_digit() || c.is_ascii_lowercase())
        );
    }

    #[test]
    fn test_unique_keys_differ() {
        assert_ne!(
            generate_unique_key("products", "jpg"),
            generate_unique_key("products", "jpg")
        );
    }

    #[test]
    fn test_presigned_url_is_path_style() {
        let storage = ObjectStorage::new(&config("https://acct.r2.example.com")).unwrap();
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap();
        let url = storage.presign("PUT", "products/1-abc.jpg", now).unwrap();

        assert!(url.starts_with("https://acct.r2.example.com/tarstock-images/products/1-abc.jpg?"));
        assert!(url.contains("X-Amz-Credential=AKIDEXAMPLE%2F20260301%2Fauto%2Fs3%2Faws4_request"));
        assert!(url.contains("X-Amz-Expires=3600"));
        assert!(url.contains("&X-Amz-Signature="));
    }

    #[test]
    fn test_presigned_url_keeps_port() {
        let storage = ObjectStorage::new(&config("http://localhost:9000")).unwrap();
        let url = storage.presign_get("products/a.png").unwrap();
        assert!(url.starts_with("http://localhost:9000/tarstock-images/products/a.png?"));
    }

    #[test]
    fn test_invalid_endpoint() {
        let err = ObjectStorage::new(&config("not a url")).unwrap_err();
        assert!(matches!(err, StorageError::InvalidEndpoint(_)));
    }

    #[test]
    fn test_public_url() {
        let storage = ObjectStorage::new(&config("https://acct.r2.example.com")).unwrap();
        assert_eq!(
            storage.public_url("products/1-abc.jpg"),
            "https://images.example.com/products/1-abc.jpg"
        );
    }

    #[test]
    fn test_debug_redacts_secret() {
        let storage = ObjectStorage::new(&config("https://acct.r2.example.com")).unwrap();
        let debug_output = format!("{storage:?}");
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("EXAMPLEKEY"));
    }
}
