//! AWS Signature Version 4
//!
//! Only header-based signing of single-shot requests is implemented; Route 53
//! needs neither presigned URLs nor chunked payloads.
//!
//! ```text
//! canonical request ──sha256──▶ string to sign ──hmac(signing key)──▶ signature
//!                                                        ▲
//!        "AWS4"+secret ─▶ date ─▶ region ─▶ service ─▶ "aws4_request"
//! ```

use chrono::{DateTime, Utc};
use dyndns_core::Secret;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use std::borrow::Cow;
use std::fmt::Write;

type HmacSha256 = Hmac<Sha256>;

/// Signing algorithm identifier
pub const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Format of the `x-amz-date` header
pub const AMZ_DATE_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// Format of the date component of the credential scope
const SCOPE_DATE_FORMAT: &str = "%Y%m%d";

/// Access key pair, optionally with a session token
#[derive(Debug, Clone)]
pub struct Credentials {
    /// Access key id (not secret, appears in the Authorization header)
    pub access_key_id: String,
    /// Secret access key
    /// ⚠️ NEVER log this value
    pub secret_access_key: Secret,
    /// Session token for temporary credentials
    pub session_token: Option<Secret>,
}

/// The parts of a request covered by the signature
#[derive(Debug, Clone, Copy)]
pub struct SignableRequest<'a> {
    /// HTTP method
    pub method: &'a str,
    /// Path, unencoded
    pub path: &'a str,
    /// Query parameters, unencoded, any order
    pub query: &'a [(&'a str, &'a str)],
    /// Headers to sign, any case, any order
    pub headers: &'a [(&'a str, &'a str)],
    /// Request body
    pub payload: &'a [u8],
}

/// HMAC-SHA256
fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

/// Hex-encoded SHA-256
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Percent-encode every path segment, keeping the separators
pub fn canonical_uri(path: &str) -> String {
    if path.is_empty() {
        return "/".to_string();
    }
    path.split('/')
        .map(urlencoding::encode)
        .collect::<Vec<Cow<'_, str>>>()
        .join("/")
}

/// Encode and sort query parameters
///
/// The same string is used on the wire so the server sees exactly what was
/// signed.
pub fn canonical_query(query: &[(&str, &str)]) -> String {
    let mut pairs: Vec<(Cow<'_, str>, Cow<'_, str>)> = query
        .iter()
        .map(|(k, v)| (urlencoding::encode(k), urlencoding::encode(v)))
        .collect();
    pairs.sort();

    pairs
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

/// Build the canonical request and the signed-headers list
pub fn canonical_request(request: &SignableRequest<'_>) -> (String, String) {
    let mut headers: Vec<(String, String)> = request
        .headers
        .iter()
        .map(|(k, v)| {
            let value = v.split_whitespace().collect::<Vec<_>>().join(" ");
            (k.to_ascii_lowercase(), value)
        })
        .collect();
    headers.sort();

    let canonical_headers = headers.iter().fold(String::new(), |mut acc, (k, v)| {
        let _ = writeln!(acc, "{k}:{v}");
        acc
    });

    let signed_headers = headers
        .iter()
        .map(|(k, _)| k.as_str())
        .collect::<Vec<_>>()
        .join(";");

    let canonical = format!(
        "{}\n{}\n{}\n{}\n{}\n{}",
        request.method,
        canonical_uri(request.path),
        canonical_query(request.query),
        canonical_headers,
        signed_headers,
        sha256_hex(request.payload),
    );

    (canonical, signed_headers)
}

/// Derive the signing key for a date, region and service
pub fn signing_key(secret: &str, date: &str, region: &str, service: &str) -> Vec<u8> {
    let k_date = hmac_sha256(format!("AWS4{secret}").as_bytes(), date.as_bytes());
    let k_region = hmac_sha256(&k_date, region.as_bytes());
    let k_service = hmac_sha256(&k_region, service.as_bytes());
    hmac_sha256(&k_service, b"aws4_request")
}

/// Compute the `Authorization` header value
///
/// # Parameters
///
/// - `credentials`: key pair to sign with
/// - `request`: signed parts of the request; must include `host` and `x-amz-date`
/// - `timestamp`: the instant carried in `x-amz-date`
/// - `region`, `service`: credential scope
pub fn authorization(
    credentials: &Credentials,
    request: &SignableRequest<'_>,
    timestamp: DateTime<Utc>,
    region: &str,
    service: &str,
) -> String {
    let amz_date = timestamp.format(AMZ_DATE_FORMAT).to_string();
    let date = timestamp.format(SCOPE_DATE_FORMAT).to_string();
    let scope = format!("{date}/{region}/{service}/aws4_request");

    let (canonical, signed_headers) = canonical_request(request);
    tracing::trace!("CanonicalRequest:\n{}", canonical);

    let string_to_sign = format!("{ALGORITHM}\n{amz_date}\n{scope}\n{}", sha256_hex(canonical.as_bytes()));

    let key = signing_key(
        credentials.secret_access_key.expose(),
        &date,
        region,
        service,
    );
    let signature = hex::encode(hmac_sha256(&key, string_to_sign.as_bytes()));

    format!(
        "{ALGORITHM} Credential={}/{scope}, SignedHeaders={signed_headers}, Signature={signature}",
        credentials.access_key_id
    )
}
