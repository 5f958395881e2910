//! AWS Signature Version 4 request signing.
//!
//! The signature is built in four steps:
//!
//! ```text
//! canonical request -> string to sign -> signing key -> signature
//! ```
//!
//! The signing key is derived from the secret key and the credential scope
//! (`date/region/service/aws4_request`) with chained HMAC-SHA256.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use hmac::digest::KeyInit;
use hmac::{Hmac, Mac};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use sha2::{Digest, Sha256};

pub const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Unreserved characters stay as they are, everything else is escaped.
const URI_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

type HmacSha256 = Hmac<Sha256>;

/// Static AWS credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &self.session_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Everything a signature depends on apart from the request itself.
#[derive(Debug, Clone, Copy)]
pub struct SigningParams<'a> {
    pub credentials: &'a Credentials,
    pub region: &'a str,
    pub service: &'a str,
    pub time: DateTime<Utc>,
}

impl SigningParams<'_> {
    /// `YYYYMMDD'T'HHMMSS'Z'`, the value of `x-amz-date`.
    #[must_use]
    pub fn amz_date(&self) -> String {
        self.time.format("%Y%m%dT%H%M%SZ").to_string()
    }

    fn date_stamp(&self) -> String {
        self.time.format("%Y%m%d").to_string()
    }

    fn scope(&self) -> String {
        format!(
            "{}/{}/{}/aws4_request",
            self.date_stamp(),
            self.region,
            self.service
        )
    }
}

/// Compute the `Authorization` header value for a request.
///
/// Every header in `headers` is signed, so the caller passes exactly the
/// headers it sends, `host` and `x-amz-date` included.
#[must_use]
pub fn sign(
    params: &SigningParams<'_>,
    method: &str,
    uri: &str,
    query: &str,
    headers: &[(&str, &str)],
    payload: &[u8],
) -> String {
    let lowered: Vec<String> = headers.iter().map(|(name, _)| name.to_lowercase()).collect();
    let mut signed_headers: Vec<&str> = lowered.iter().map(String::as_str).collect();
    signed_headers.sort_unstable();
    signed_headers.dedup();

    let canonical = build_canonical_request(
        method,
        uri,
        query,
        headers,
        &signed_headers,
        &hash_payload(payload),
    );
    let scope = params.scope();
    let string_to_sign = build_string_to_sign(&params.amz_date(), &scope, &canonical);
    let key = derive_signing_key(
        &params.credentials.secret_access_key,
        &params.date_stamp(),
        params.region,
        params.service,
    );
    let signature = compute_signature(&key, &string_to_sign);

    format!(
        "{ALGORITHM} Credential={}/{scope}, SignedHeaders={}, Signature={signature}",
        params.credentials.access_key_id,
        signed_headers.join(";")
    )
}

/// Newline-joined method, URI, query, headers, signed header list and
/// payload hash.
#[must_use]
pub fn build_canonical_request(
    method: &str,
    uri: &str,
    query: &str,
    headers: &[(&str, &str)],
    signed_headers: &[&str],
    payload_hash: &str,
) -> String {
    format!(
        "{method}\n{}\n{}\n{}\n\n{}\n{payload_hash}",
        canonical_uri(uri),
        canonical_query(query),
        canonical_headers(headers, signed_headers),
        signed_headers.join(";")
    )
}

#[must_use]
pub fn build_string_to_sign(amz_date: &str, scope: &str, canonical_request: &str) -> String {
    format!(
        "{ALGORITHM}\n{amz_date}\n{scope}\n{}",
        hash_payload(canonical_request.as_bytes())
    )
}

#[must_use]
pub fn derive_signing_key(secret_key: &str, date: &str, region: &str, service: &str) -> Vec<u8> {
    let k_date = hmac_sha256(format!("AWS4{secret_key}").as_bytes(), date.as_bytes());
    let k_region = hmac_sha256(&k_date, region.as_bytes());
    let k_service = hmac_sha256(&k_region, service.as_bytes());
    hmac_sha256(&k_service, b"aws4_request")
}

#[must_use]
pub fn compute_signature(signing_key: &[u8], string_to_sign: &str) -> String {
    hex::encode(hmac_sha256(signing_key, string_to_sign.as_bytes()))
}

/// Hex SHA-256 of a payload.
#[must_use]
pub fn hash_payload(payload: &[u8]) -> String {
    hex::encode(Sha256::digest(payload))
}

fn canonical_uri(path: &str) -> String {
    if path.is_empty() || path == "/" {
        return "/".to_owned();
    }
    path.split('/')
        .map(|segment| {
            let decoded = percent_decode_str(segment).decode_utf8_lossy();
            utf8_percent_encode(&decoded, URI_ENCODE_SET).to_string()
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn canonical_query(query: &str) -> String {
    let mut params: Vec<(&str, &str)> = query
        .split('&')
        .filter(|p| !p.is_empty())
        .map(|p| p.split_once('=').unwrap_or((p, "")))
        .collect();
    params.sort_unstable();
    params
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

fn canonical_headers(headers: &[(&str, &str)], signed_headers: &[&str]) -> String {
    let mut values: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let value = value.split_whitespace().collect::<Vec<_>>().join(" ");
        values
            .entry(name.to_lowercase())
            .and_modify(|existing| {
                existing.push(',');
                existing.push_str(&value);
            })
            .or_insert(value);
    }
    signed_headers
        .iter()
        .filter_map(|name| values.get(*name).map(|v| format!("{name}:{v}")))
        .collect::<Vec<_>>()
        .join("\n")
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac =
        <HmacSha256 as KeyInit>::new_from_slice(key).expect("HMAC accepts keys of any length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}
