//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `TURSO_DATABASE_URL` - Database URL (`libsql://` or `https://`)
//! - `TURSO_AUTH_TOKEN` - Bearer token for the database gateway
//!
//! ## Optional
//! - `TARSTOCK_STORE_ID` - Store new products belong to (default: S1)
//! - `TARSTOCK_DEFAULT_UNIT` - Unit for new products (default: pcs)
//! - `TARSTOCK_REQUEST_TIMEOUT_SECS` - HTTP timeout in seconds (default: 30)
//!
//! ## Optional (object storage - enables image uploads)
//! - `STORAGE_ENDPOINT` - S3-compatible endpoint URL
//! - `STORAGE_BUCKET` - Bucket name
//! - `STORAGE_ACCESS_KEY_ID` - Access key id
//! - `STORAGE_SECRET_ACCESS_KEY` - Secret access key
//! - `STORAGE_PUBLIC_HOST` - Host serving uploaded objects publicly
//! - `STORAGE_REGION` - Signing region (default: auto)
//! - `STORAGE_URL_EXPIRY_SECS` - Presigned URL lifetime (default: 3600)

use std::collections::HashMap;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;

use tarstock_core::{DEFAULT_STORE_ID, DEFAULT_UNIT};

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_URL_EXPIRY_SECS: u64 = 3600;
const DEFAULT_REGION: &str = "auto";
const PIPELINE_PATH: &str = "/v2/pipeline";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

const STORAGE_VARS: &[&str] = &[
    "STORAGE_ENDPOINT",
    "STORAGE_BUCKET",
    "STORAGE_ACCESS_KEY_ID",
    "STORAGE_SECRET_ACCESS_KEY",
    "STORAGE_PUBLIC_HOST",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Database gateway configuration
    pub gateway: GatewayConfig,
    /// Object storage configuration (optional - image uploads disabled without it)
    pub storage: Option<StorageConfig>,
    /// Store id assigned to new products
    pub store_id: String,
    /// Unit assigned to new products
    pub default_unit: String,
}

/// Database gateway configuration.
///
/// Implements `Debug` manually to redact the auth token.
#[derive(Clone)]
pub struct GatewayConfig {
    /// Full pipeline endpoint URL
    pub pipeline_url: String,
    /// Bearer token
    pub auth_token: SecretString,
    /// Per-request timeout
    pub timeout: Duration,
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("pipeline_url", &self.pipeline_url)
            .field("auth_token", &"[REDACTED]")
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// S3-compatible object storage configuration.
///
/// Implements `Debug` manually to redact the secret key.
#[derive(Clone)]
pub struct StorageConfig {
    /// Endpoint URL (path-style addressing)
    pub endpoint: String,
    /// Bucket objects are written to
    pub bucket: String,
    /// Signing region
    pub region: String,
    /// Access key id
    pub access_key_id: String,
    /// Secret access key
    pub secret_access_key: SecretString,
    /// Host serving uploaded objects publicly
    pub public_host: String,
    /// Presigned URL lifetime
    pub url_expiry: Duration,
}

impl std::fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageConfig")
            .field("endpoint", &self.endpoint)
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"[REDACTED]")
            .field("public_host", &self.public_host)
            .field("url_expiry", &self.url_expiry)
            .finish()
    }
}

/// Source of configuration values, keyed by variable name.
trait Source {
    fn get(&self, key: &str) -> Option<String>;
}

struct Env;

impl Source for Env {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|v| !v.is_empty())
    }
}

#[cfg(test)]
impl Source for HashMap<&str, &str> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).map(|v| (*v).to_string())
    }
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::load(&Env)
    }

    fn load(source: &impl Source) -> Result<Self, ConfigError> {
        let gateway = GatewayConfig::load(source)?;
        let storage = StorageConfig::load(source)?;

        Ok(Self {
            gateway,
            storage,
            store_id: get_or_default(source, "TARSTOCK_STORE_ID", DEFAULT_STORE_ID),
            default_unit: get_or_default(source, "TARSTOCK_DEFAULT_UNIT", DEFAULT_UNIT),
        })
    }

    /// Returns a reference to the storage configuration (if configured).
    #[must_use]
    pub const fn storage(&self) -> Option<&StorageConfig> {
        self.storage.as_ref()
    }
}

impl GatewayConfig {
    fn load(source: &impl Source) -> Result<Self, ConfigError> {
        let database_url = get_required(source, "TURSO_DATABASE_URL")?;
        let auth_token = get_validated_secret(source, "TURSO_AUTH_TOKEN")?;
        let timeout_secs = get_parsed(source, "TARSTOCK_REQUEST_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?;

        Ok(Self {
            pipeline_url: pipeline_url(&database_url)
                .map_err(|e| ConfigError::InvalidEnvVar("TURSO_DATABASE_URL".to_string(), e))?,
            auth_token,
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

impl StorageConfig {
    fn load(source: &impl Source) -> Result<Option<Self>, ConfigError> {
        let present: Vec<_> = STORAGE_VARS
            .iter()
            .filter(|key| source.get(key).is_some())
            .collect();

        if present.is_empty() {
            return Ok(None);
        }
        if present.len() != STORAGE_VARS.len() {
            return Err(ConfigError::InvalidEnvVar(
                "STORAGE_*".to_string(),
                format!("{} must be set together", STORAGE_VARS.join(", ")),
            ));
        }

        let endpoint = get_required(source, "STORAGE_ENDPOINT")?;
        url::Url::parse(&endpoint)
            .map_err(|e| ConfigError::InvalidEnvVar("STORAGE_ENDPOINT".to_string(), e.to_string()))?;

        Ok(Some(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            bucket: get_required(source, "STORAGE_BUCKET")?,
            region: get_or_default(source, "STORAGE_REGION", DEFAULT_REGION),
            access_key_id: get_required(source, "STORAGE_ACCESS_KEY_ID")?,
            secret_access_key: get_validated_secret(source, "STORAGE_SECRET_ACCESS_KEY")?,
            public_host: get_required(source, "STORAGE_PUBLIC_HOST")?
                .trim_start_matches("https://")
                .trim_end_matches('/')
                .to_string(),
            url_expiry: Duration::from_secs(get_parsed(
                source,
                "STORAGE_URL_EXPIRY_SECS",
                DEFAULT_URL_EXPIRY_SECS,
            )?),
        }))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Turn a database URL into the gateway's pipeline endpoint.
///
/// `libsql://` URLs are served over HTTPS; the pipeline path is appended
/// unless already present.
fn pipeline_url(database_url: &str) -> Result<String, String> {
    let https = database_url
        .strip_prefix("libsql://")
        .map_or_else(|| database_url.to_string(), |rest| format!("https://{rest}"));

    let parsed = url::Url::parse(&https).map_err(|e| e.to_string())?;
    if !matches!(parsed.scheme(), "https" | "http") {
        return Err(format!("unsupported scheme: {}", parsed.scheme()));
    }

    let base = https.trim_end_matches('/');
    if base.ends_with(PIPELINE_PATH) {
        Ok(base.to_string())
    } else {
        Ok(format!("{base}{PIPELINE_PATH}"))
    }
}

/// Get a required variable.
fn get_required(source: &impl Source, key: &str) -> Result<String, ConfigError> {
    source
        .get(key)
        .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get a variable with a default value.
fn get_or_default(source: &impl Source, key: &str, default: &str) -> String {
    source.get(key).unwrap_or_else(|| default.to_string())
}

/// Get a numeric variable with a default value.
fn get_parsed(source: &impl Source, key: &str, default: u64) -> Result<u64, ConfigError> {
    source.get(key).map_or(Ok(default), |raw| {
        raw.parse::<u64>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    // Real tokens and keys have high entropy
    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1})"
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret.
fn get_validated_secret(source: &impl Source, key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required(source, key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;

    const TOKEN: &str = "eyJhbGciOiJFZERTQSJ9.kR7mQ2xZ9vLp4TnW8sYc";
    const SECRET_KEY: &str = "8e6d899be792b0bee11201a6c9f6f83f865f2fce";

    fn minimal() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("TURSO_DATABASE_URL", "libsql://shop-db.turso.io"),
            ("TURSO_AUTH_TOKEN", TOKEN),
        ])
    }

    fn with_storage() -> HashMap<&'static str, &'static str> {
        let mut vars = minimal();
        vars.extend([
            ("STORAGE_ENDPOINT", "https://account.r2.cloudflarestorage.com/"),
            ("STORAGE_BUCKET", "catalog"),
            ("STORAGE_ACCESS_KEY_ID", "c3827ec3b7fb19b6"),
            ("STORAGE_SECRET_ACCESS_KEY", SECRET_KEY),
            ("STORAGE_PUBLIC_HOST", "https://catalog.storage.test/"),
        ]);
        vars
    }

    #[test]
    fn test_pipeline_url_from_libsql() {
        assert_eq!(
            pipeline_url("libsql://shop-db.turso.io").unwrap(),
            "https://shop-db.turso.io/v2/pipeline"
        );
    }

    #[test]
    fn test_pipeline_url_already_complete() {
        assert_eq!(
            pipeline_url("https://shop-db.turso.io/v2/pipeline/").unwrap(),
            "https://shop-db.turso.io/v2/pipeline"
        );
    }

    #[test]
    fn test_pipeline_url_rejects_other_schemes() {
        assert!(pipeline_url("ftp://shop-db.turso.io").is_err());
        assert!(pipeline_url("not a url").is_err());
    }

    #[test]
    fn test_load_minimal() {
        let config = ClientConfig::load(&minimal()).unwrap();
        assert_eq!(
            config.gateway.pipeline_url,
            "https://shop-db.turso.io/v2/pipeline"
        );
        assert_eq!(config.gateway.auth_token.expose_secret(), TOKEN);
        assert_eq!(config.gateway.timeout, Duration::from_secs(30));
        assert_eq!(config.store_id, "S1");
        assert_eq!(config.default_unit, "pcs");
        assert!(config.storage().is_none());
    }

    #[test]
    fn test_load_missing_token() {
        let mut vars = minimal();
        vars.remove("TURSO_AUTH_TOKEN");
        let err = ClientConfig::load(&vars).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == "TURSO_AUTH_TOKEN"));
    }

    #[test]
    fn test_load_invalid_timeout() {
        let mut vars = minimal();
        vars.insert("TARSTOCK_REQUEST_TIMEOUT_SECS", "soon");
        let err = ClientConfig::load(&vars).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(ref k, _) if k == "TARSTOCK_REQUEST_TIMEOUT_SECS"));
    }

    #[test]
    fn test_load_storage() {
        let config = ClientConfig::load(&with_storage()).unwrap();
        let storage = config.storage().unwrap();
        assert_eq!(storage.endpoint, "https://account.r2.cloudflarestorage.com");
        assert_eq!(storage.bucket, "catalog");
        assert_eq!(storage.region, "auto");
        assert_eq!(storage.public_host, "catalog.storage.test");
        assert_eq!(storage.url_expiry, Duration::from_secs(3600));
    }

    #[test]
    fn test_partial_storage_is_rejected() {
        let mut vars = with_storage();
        vars.remove("STORAGE_BUCKET");
        let err = ClientConfig::load(&vars).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(ref k, _) if k == "STORAGE_*"));
    }

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        // "ab" has entropy of 1 bit per char (50% a, 50% b)
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-token-here", "TURSO_AUTH_TOKEN");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaaaaaa", "TURSO_AUTH_TOKEN");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = ClientConfig::load(&with_storage()).unwrap();
        let debug_output = format!("{config:?}");

        assert!(debug_output.contains("shop-db.turso.io"));
        assert!(debug_output.contains("catalog"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains(TOKEN));
        assert!(!debug_output.contains(SECRET_KEY));
    }
}
