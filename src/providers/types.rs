//! Shared types for media library services
//!
//! Contains the normalized asset representation returned by every service,
//! the bucket credential/settings types, and the error taxonomy.

use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Default region when the credential string omits one.
///
/// Cloudflare R2 accepts the literal region `auto`; other S3-compatible
/// endpoints commonly treat it as equivalent to `us-east-1`. The signer
/// treats the region as an opaque scope component either way.
pub const DEFAULT_REGION: &str = "auto";

/// Broad asset categories used by the asset picker UI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Image,
    Video,
    Audio,
    Document,
    Other,
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetKind::Image => write!(f, "image"),
            AssetKind::Video => write!(f, "video"),
            AssetKind::Audio => write!(f, "audio"),
            AssetKind::Document => write!(f, "document"),
            AssetKind::Other => write!(f, "other"),
        }
    }
}

impl AssetKind {
    /// Classify a file name by its extension.
    ///
    /// Total over all inputs: anything outside the fixed table is `Other`,
    /// including names without an extension.
    pub fn from_file_name(file_name: &str) -> Self {
        let ext = file_name
            .rsplit('.')
            .next()
            .filter(|ext| ext.len() < file_name.len())
            .map(|ext| ext.to_ascii_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "jpg" | "jpeg" | "png" | "gif" | "webp" | "svg" => AssetKind::Image,
            "mp4" | "webm" | "mov" => AssetKind::Video,
            "mp3" | "wav" | "ogg" => AssetKind::Audio,
            "pdf" | "doc" | "docx" | "txt" => AssetKind::Document,
            _ => AssetKind::Other,
        }
    }

    /// Classify by declared MIME type (used for freshly uploaded files,
    /// where the browser-declared content type is more reliable than the
    /// extension).
    pub fn from_content_type(content_type: &str) -> Self {
        let ct = content_type.to_ascii_lowercase();
        if ct.starts_with("image/") {
            AssetKind::Image
        } else if ct.starts_with("video/") {
            AssetKind::Video
        } else if ct.starts_with("audio/") {
            AssetKind::Audio
        } else if ct == "application/pdf"
            || ct == "text/plain"
            || ct == "application/msword"
            || ct == "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        {
            AssetKind::Document
        } else {
            AssetKind::Other
        }
    }
}

/// Normalized asset record returned by every media library service
///
/// The asset picker renders `preview_url` and `description` without any
/// provider-specific branching, so all services must produce this shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalAsset {
    /// Stable identifier (the object key for bucket assets)
    pub id: String,
    /// Human-readable label shown in the picker
    pub description: String,
    /// Thumbnail/preview URL; empty for non-image kinds
    pub preview_url: String,
    /// URL the asset is fetched (or hotlinked) from
    pub download_url: String,
    /// Bare file name
    pub file_name: String,
    /// Broad category for picker filtering
    pub kind: AssetKind,
    /// Last modification time, used for most-recent-first ordering
    pub last_modified: DateTime<Utc>,
    /// Size in bytes
    pub size: u64,
}

/// Parsed bucket credentials
///
/// Supplied by the caller as a single colon-delimited secret string:
/// `accountId:accessKeyId:secretAccessKey:bucket[:region][:customDomain]`.
#[derive(Debug, Clone)]
pub struct BucketCredentials {
    pub account_id: String,
    pub access_key_id: String,
    /// SecretString for memory zeroization
    pub secret_access_key: SecretString,
    pub bucket: String,
    pub region: String,
    /// Custom public domain embedded in the credential string
    pub custom_domain: Option<String>,
}

impl BucketCredentials {
    /// Parse the colon-delimited credential string.
    ///
    /// The first four fields are mandatory; region defaults to
    /// [`DEFAULT_REGION`] and the custom domain is optional. A malformed
    /// string is a hard error, never silently defaulted.
    pub fn parse(raw: &str) -> Result<Self, MediaError> {
        let parts: Vec<&str> = raw.split(':').map(|p| p.trim()).collect();

        if parts.len() < 4 || parts.len() > 6 {
            return Err(MediaError::InvalidCredentials(format!(
                "expected accountId:accessKeyId:secretAccessKey:bucket[:region][:customDomain], got {} field(s)",
                parts.len()
            )));
        }
        if parts[..4].iter().any(|p| p.is_empty()) {
            return Err(MediaError::InvalidCredentials(
                "accountId, accessKeyId, secretAccessKey and bucket must all be non-empty".to_string(),
            ));
        }

        let region = parts
            .get(4)
            .filter(|r| !r.is_empty())
            .map(|r| r.to_string())
            .unwrap_or_else(|| DEFAULT_REGION.to_string());

        let custom_domain = parts
            .get(5)
            .filter(|d| !d.is_empty())
            .map(|d| d.to_string());

        Ok(Self {
            account_id: parts[0].to_string(),
            access_key_id: parts[1].to_string(),
            secret_access_key: SecretString::from(parts[2].to_string()),
            bucket: parts[3].to_string(),
            region,
            custom_domain,
        })
    }
}

/// Per-operation settings, consumed identically by listing and upload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Whether assets are publicly addressable (affects URL building only)
    pub public_path: bool,
    /// Custom public domain; takes precedence over the credential-embedded one
    pub custom_domain: Option<String>,
    /// Key prefix applied to listing and uploads (e.g. `uploads/`)
    pub path_prefix: Option<String>,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            public_path: true,
            custom_domain: None,
            path_prefix: None,
        }
    }
}

/// Caller-supplied context for one `search` or `upload` invocation
///
/// Read fresh on every operation; no service keeps connection state
/// between calls.
#[derive(Debug, Clone, Default)]
pub struct ServiceContext {
    /// API key or credential string, depending on the service's auth type
    pub api_key: Option<String>,
    pub user_name: Option<String>,
    pub password: Option<String>,
    pub settings: ServiceSettings,
}

/// A file to upload: name, declared content type and raw bytes
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Media service error type
#[derive(Error, Debug)]
pub enum MediaError {
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("Missing signing input: {0}")]
    SigningPrecondition(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Remote rejected request ({status}): {message}")]
    RemoteRejection { status: u16, message: String },

    #[error("Upload of '{file}' failed: {reason}")]
    UploadFailed { file: String, reason: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Unknown service: {0}")]
    UnknownService(String),
}

impl MediaError {
    /// Whether listing may recover from this error by degrading to an
    /// empty result set. Credential and signing errors are never
    /// recoverable — they must surface before any network I/O.
    pub fn is_recoverable_for_listing(&self) -> bool {
        matches!(
            self,
            MediaError::Network(_)
                | MediaError::RemoteRejection { .. }
                | MediaError::Parse(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_kind_from_file_name_table() {
        for ext in ["jpg", "jpeg", "png", "gif", "webp", "svg"] {
            assert_eq!(AssetKind::from_file_name(&format!("a.{ext}")), AssetKind::Image);
        }
        for ext in ["mp4", "webm", "mov"] {
            assert_eq!(AssetKind::from_file_name(&format!("a.{ext}")), AssetKind::Video);
        }
        for ext in ["mp3", "wav", "ogg"] {
            assert_eq!(AssetKind::from_file_name(&format!("a.{ext}")), AssetKind::Audio);
        }
        for ext in ["pdf", "doc", "docx", "txt"] {
            assert_eq!(AssetKind::from_file_name(&format!("a.{ext}")), AssetKind::Document);
        }
    }

    #[test]
    fn test_kind_from_file_name_total() {
        assert_eq!(AssetKind::from_file_name("archive.xyz"), AssetKind::Other);
        assert_eq!(AssetKind::from_file_name("Makefile"), AssetKind::Other);
        assert_eq!(AssetKind::from_file_name(""), AssetKind::Other);
        // Extension matching is case-insensitive
        assert_eq!(AssetKind::from_file_name("PHOTO.JPG"), AssetKind::Image);
    }

    #[test]
    fn test_kind_from_content_type() {
        assert_eq!(AssetKind::from_content_type("image/png"), AssetKind::Image);
        assert_eq!(AssetKind::from_content_type("video/mp4"), AssetKind::Video);
        assert_eq!(AssetKind::from_content_type("audio/ogg"), AssetKind::Audio);
        assert_eq!(AssetKind::from_content_type("application/pdf"), AssetKind::Document);
        assert_eq!(AssetKind::from_content_type("application/zip"), AssetKind::Other);
    }

    /// Extension- and content-type-based classification must agree for the
    /// common extension set (listing classifies by extension, upload by
    /// declared content type).
    #[test]
    fn test_classification_conformance() {
        let cases = [
            ("photo.jpg", "image/jpeg"),
            ("photo.png", "image/png"),
            ("photo.gif", "image/gif"),
            ("photo.webp", "image/webp"),
            ("clip.mp4", "video/mp4"),
            ("clip.webm", "video/webm"),
            ("track.mp3", "audio/mpeg"),
            ("track.wav", "audio/wav"),
            ("track.ogg", "audio/ogg"),
            ("paper.pdf", "application/pdf"),
            ("notes.txt", "text/plain"),
        ];
        for (name, ct) in cases {
            assert_eq!(
                AssetKind::from_file_name(name),
                AssetKind::from_content_type(ct),
                "classification disagrees for {name} / {ct}"
            );
        }
    }

    #[test]
    fn test_parse_credentials_minimal() {
        let creds = BucketCredentials::parse("acct123:AKIA:s3cr3t:media").unwrap();
        assert_eq!(creds.account_id, "acct123");
        assert_eq!(creds.access_key_id, "AKIA");
        assert_eq!(creds.secret_access_key.expose_secret(), "s3cr3t");
        assert_eq!(creds.bucket, "media");
        assert_eq!(creds.region, DEFAULT_REGION);
        assert!(creds.custom_domain.is_none());
    }

    #[test]
    fn test_parse_credentials_full() {
        let creds =
            BucketCredentials::parse("acct:key:secret:bucket:eu-west-1:cdn.example.com").unwrap();
        assert_eq!(creds.region, "eu-west-1");
        assert_eq!(creds.custom_domain.as_deref(), Some("cdn.example.com"));
    }

    #[test]
    fn test_parse_credentials_rejects_missing_fields() {
        assert!(matches!(
            BucketCredentials::parse("acct:key:secret"),
            Err(MediaError::InvalidCredentials(_))
        ));
        assert!(matches!(
            BucketCredentials::parse("acct:key::bucket"),
            Err(MediaError::InvalidCredentials(_))
        ));
        assert!(matches!(
            BucketCredentials::parse(""),
            Err(MediaError::InvalidCredentials(_))
        ));
    }

    #[test]
    fn test_parse_credentials_empty_region_defaults() {
        let creds = BucketCredentials::parse("acct:key:secret:bucket::cdn.example.com").unwrap();
        assert_eq!(creds.region, DEFAULT_REGION);
        assert_eq!(creds.custom_domain.as_deref(), Some("cdn.example.com"));
    }

    #[test]
    fn test_asset_wire_shape() {
        let asset = ExternalAsset {
            id: "uploads/a.png".to_string(),
            description: "a.png".to_string(),
            preview_url: "https://cdn.example.com/uploads/a.png".to_string(),
            download_url: "https://cdn.example.com/uploads/a.png".to_string(),
            file_name: "a.png".to_string(),
            kind: AssetKind::Image,
            last_modified: DateTime::<Utc>::MIN_UTC,
            size: 7,
        };
        let json = serde_json::to_value(&asset).unwrap();
        assert_eq!(json["kind"], "image");
        assert_eq!(json["file_name"], "a.png");
        assert_eq!(json["size"], 7);
    }

    #[test]
    fn test_settings_default() {
        let settings = ServiceSettings::default();
        assert!(settings.public_path);
        assert!(settings.custom_domain.is_none());
        assert!(settings.path_prefix.is_none());
    }
}
