//! AWS Signature Version 4 canonical signer
//!
//! Pure request signing for S3-compatible endpoints (AWS S3, Cloudflare R2,
//! MinIO, Backblaze B2, ...). Uses hmac/sha2 directly instead of the
//! heavyweight aws-sdk-s3 dependency, which keeps compile times down and
//! makes the canonicalization rules explicit and testable.
//!
//! Signing is deterministic: the timestamp is an input, not sampled here,
//! so the same `SigningRequest` always yields the same signature.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

use super::types::MediaError;

type HmacSha256 = Hmac<Sha256>;

/// Host suffix for account-scoped bucket endpoints:
/// `https://{accountId}.r2.cloudflarestorage.com/{bucket}`
pub const STORAGE_HOST: &str = "r2.cloudflarestorage.com";

const SERVICE: &str = "s3";
const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Description of one HTTP request to sign
///
/// `path` is the object key ("" for bucket-level operations such as
/// listing). `headers` and `query` are caller-supplied extras; `host`,
/// `x-amz-date` and `x-amz-content-sha256` are added here.
#[derive(Debug, Clone)]
pub struct SigningRequest<'a> {
    pub method: &'a str,
    pub region: &'a str,
    pub access_key_id: &'a str,
    pub secret_access_key: &'a str,
    pub account_id: &'a str,
    pub bucket: &'a str,
    pub path: &'a str,
    pub headers: &'a [(String, String)],
    pub query: &'a [(String, String)],
    pub payload: &'a [u8],
    pub timestamp: DateTime<Utc>,
}

/// A ready-to-send request: final URL plus headers.
///
/// Single-use — bound to the timestamp it was signed with. The `host`
/// header is excluded (the transport supplies it); `authorization`,
/// `x-amz-date`, `x-amz-content-sha256` and caller headers are included.
/// The URL's query string is in canonical (sorted) order and must not be
/// reordered after signing.
#[derive(Debug, Clone)]
pub struct SignedRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
}

/// Percent-encode under RFC 3986 with the AWS unreserved set
/// (`A-Z a-z 0-9 - _ . ~`), uppercase hex escapes. This also covers the
/// `! ' ( ) *` characters that plain form-encoding under-escapes.
fn uri_encode(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

/// Encode a key path, preserving `/` as the segment separator
fn uri_encode_path(path: &str) -> String {
    path.split('/').map(uri_encode).collect::<Vec<_>>().join("/")
}

/// Canonical query string: pairs sorted by encoded key (then value),
/// each `key=value` percent-encoded
pub(crate) fn canonical_query_string(query: &[(String, String)]) -> String {
    let mut pairs: Vec<(String, String)> = query
        .iter()
        .map(|(k, v)| (uri_encode(k), uri_encode(v)))
        .collect();
    pairs.sort();
    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}

fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

fn require<'a>(field: &'a str, name: &str) -> Result<&'a str, MediaError> {
    if field.is_empty() {
        Err(MediaError::SigningPrecondition(name.to_string()))
    } else {
        Ok(field)
    }
}

/// Sign a request against an S3-compatible endpoint.
///
/// Produces the canonical request, string-to-sign, derived signing key and
/// final `Authorization` header per the SigV4 algorithm. Any missing
/// credential field fails with [`MediaError::SigningPrecondition`] before
/// any other work — there is no partial signing.
pub fn sign(req: &SigningRequest<'_>) -> Result<SignedRequest, MediaError> {
    require(req.method, "method")?;
    require(req.region, "region")?;
    require(req.access_key_id, "accessKeyId")?;
    require(req.secret_access_key, "secretAccessKey")?;
    require(req.account_id, "accountId")?;
    require(req.bucket, "bucket")?;

    let amz_date = req.timestamp.format("%Y%m%dT%H%M%SZ").to_string();
    let date_stamp = req.timestamp.format("%Y%m%d").to_string();

    let host = format!("{}.{}", req.account_id, STORAGE_HOST);

    // Path-style addressing; the trailing slash on bucket-level requests is
    // mandatory — without it the server computes a different canonical
    // request and rejects the signature.
    let canonical_uri = if req.path.is_empty() {
        format!("/{}/", uri_encode_path(req.bucket))
    } else {
        format!(
            "/{}/{}",
            uri_encode_path(req.bucket),
            uri_encode_path(req.path)
        )
    };

    let canonical_query = canonical_query_string(req.query);
    let payload_hash = sha256_hex(req.payload);

    // Lowercase keys, trimmed and whitespace-collapsed values, sorted.
    let mut headers: BTreeMap<String, String> = req
        .headers
        .iter()
        .map(|(k, v)| {
            let key = k.trim().to_ascii_lowercase();
            let value = v.split_whitespace().collect::<Vec<_>>().join(" ");
            (key, value)
        })
        .collect();
    headers.insert("host".to_string(), host.clone());
    headers.insert("x-amz-date".to_string(), amz_date.clone());
    headers.insert("x-amz-content-sha256".to_string(), payload_hash.clone());

    let signed_headers = headers
        .keys()
        .map(|k| k.as_str())
        .collect::<Vec<_>>()
        .join(";");
    let canonical_headers: String = headers
        .iter()
        .map(|(k, v)| format!("{}:{}\n", k, v))
        .collect();

    let canonical_request = format!(
        "{}\n{}\n{}\n{}\n{}\n{}",
        req.method, canonical_uri, canonical_query, canonical_headers, signed_headers, payload_hash
    );

    let credential_scope = format!("{}/{}/{}/aws4_request", date_stamp, req.region, SERVICE);
    let string_to_sign = format!(
        "{}\n{}\n{}\n{}",
        ALGORITHM,
        amz_date,
        credential_scope,
        sha256_hex(canonical_request.as_bytes())
    );

    // Each step feeds raw bytes into the next HMAC; nothing is hex-encoded
    // until the final signature.
    let k_date = hmac_sha256(
        format!("AWS4{}", req.secret_access_key).as_bytes(),
        date_stamp.as_bytes(),
    );
    let k_region = hmac_sha256(&k_date, req.region.as_bytes());
    let k_service = hmac_sha256(&k_region, SERVICE.as_bytes());
    let k_signing = hmac_sha256(&k_service, b"aws4_request");
    let signature = hex::encode(hmac_sha256(&k_signing, string_to_sign.as_bytes()));

    let authorization = format!(
        "{} Credential={}/{}, SignedHeaders={}, Signature={}",
        ALGORITHM, req.access_key_id, credential_scope, signed_headers, signature
    );

    let url = if canonical_query.is_empty() {
        format!("https://{}{}", host, canonical_uri)
    } else {
        format!("https://{}{}?{}", host, canonical_uri, canonical_query)
    };

    let mut out_headers: Vec<(String, String)> = headers
        .into_iter()
        .filter(|(k, _)| k != "host")
        .collect();
    out_headers.push(("authorization".to_string(), authorization));

    Ok(SignedRequest {
        url,
        headers: out_headers,
    })
}
