//! AWS Signature Version 4 query-string presigning.
//!
//! Only the `host` header is signed and the payload is `UNSIGNED-PAYLOAD`,
//! so the URL can be handed to any HTTP client.

use std::time::Duration;

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use super::StorageError;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";
const SERVICE: &str = "s3";
const UNSIGNED_PAYLOAD: &str = "UNSIGNED-PAYLOAD";

/// Signing identity.
pub struct Credentials<'a> {
    pub access_key_id: &'a str,
    pub secret_access_key: &'a str,
    pub region: &'a str,
}

/// The request to presign.
pub struct PresignRequest<'a> {
    pub method: &'a str,
    /// Host header value, including a non-default port.
    pub host: &'a str,
    /// Absolute path, already URI-encoded.
    pub path: &'a str,
    pub expires: Duration,
    pub now: DateTime<Utc>,
}

/// Build the signed query string (without the leading `?`).
///
/// # Errors
///
/// Returns `StorageError::Signing` if the HMAC key is rejected.
pub fn presigned_query(
    credentials: &Credentials<'_>,
    request: &PresignRequest<'_>,
) -> Result<String, StorageError> {
    let amz_date = request.now.format("%Y%m%dT%H%M%SZ").to_string();
    let date = request.now.format("%Y%m%d").to_string();
    let scope = format!("{date}/{}/{SERVICE}/aws4_request", credentials.region);
    let credential = format!("{}/{scope}", credentials.access_key_id);

    // Already in byte order, as the canonical form requires.
    let params = [
        ("X-Amz-Algorithm", ALGORITHM.to_string()),
        ("X-Amz-Credential", credential),
        ("X-Amz-Date", amz_date.clone()),
        ("X-Amz-Expires", request.expires.as_secs().to_string()),
        ("X-Amz-SignedHeaders", "host".to_string()),
    ];
    let query = params
        .iter()
        .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");

    let canonical_request = format!(
        "{}\n{}\n{query}\nhost:{}\n\nhost\n{UNSIGNED_PAYLOAD}",
        request.method, request.path, request.host
    );
    let string_to_sign = format!(
        "{ALGORITHM}\n{amz_date}\n{scope}\n{}",
        hex::encode(Sha256::digest(canonical_request.as_bytes()))
    );

    let key = signing_key(credentials, &date)?;
    let signature = hex::encode(hmac(&key, &string_to_sign)?);

    Ok(format!("{query}&X-Amz-Signature={signature}"))
}

/// URI-encode each segment of an object key, keeping the separators.
#[must_use]
pub fn encode_key(key: &str) -> String {
    key.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

fn signing_key(credentials: &Credentials<'_>, date: &str) -> Result<Vec<u8>, StorageError> {
    let secret = format!("AWS4{}", credentials.secret_access_key);
    let key = hmac(secret.as_bytes(), date)?;
    let key = hmac(&key, credentials.region)?;
    let key = hmac(&key, SERVICE)?;
    hmac(&key, "aws4_request")
}

fn hmac(key: &[u8], data: &str) -> Result<Vec<u8>, StorageError> {
    let mut mac =
        Hmac::<Sha256>::new_from_slice(key).map_err(|e| StorageError::Signing(e.to_string()))?;
    mac.update(data.as_bytes());
    Ok(mac.finalize().into_bytes().to_vec())
}
