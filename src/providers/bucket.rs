//! S3-compatible bucket media library service
//!
//! Implements `search` (paginated ListObjectsV2 with filtering and
//! classification) and `upload` (sequential signed PUTs) against any
//! S3-compatible endpoint, authenticated with AWS Signature V4.
//!
//! Listing and upload have deliberately different failure policies:
//! transient listing failures degrade to an empty result set so the picker
//! can still offer uploads, while upload failures always surface so no
//! file goes silently missing.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use std::sync::Arc;
use tracing::{debug, warn};

use super::sigv4::{sign, SignedRequest, SigningRequest, STORAGE_HOST};
use super::transport::{HttpRequest, HttpTransport, ReqwestTransport};
use super::types::{
    AssetKind, BucketCredentials, ExternalAsset, MediaError, ServiceContext, ServiceSettings,
    UploadFile,
};
use super::{AuthType, MediaLibraryService, ServiceDescriptor, ServiceType};

const MAX_KEYS_PER_PAGE: &str = "1000";

/// Hard ceiling on listing pagination (~20,000 objects). A safety valve
/// against runaway loops, not an API limit.
const MAX_LIST_PAGES: usize = 20;

/// One parsed object entry from a `ListBucketResult` page
#[derive(Debug, Clone)]
struct ObjectEntry {
    key: String,
    size: u64,
    last_modified: DateTime<Utc>,
}

/// One parsed `ListBucketResult` page
#[derive(Debug)]
struct ListPage {
    objects: Vec<ObjectEntry>,
    is_truncated: bool,
    next_token: Option<String>,
}

/// S3-compatible bucket service
///
/// Stateless between calls: credentials and settings are read fresh from
/// the [`ServiceContext`] on every operation, and every page/file request
/// is signed independently with its own timestamp.
pub struct BucketService {
    transport: Arc<dyn HttpTransport>,
    descriptor: ServiceDescriptor,
}

impl BucketService {
    pub fn new() -> Self {
        Self::with_transport(Arc::new(ReqwestTransport::new()))
    }

    pub fn with_transport(transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            transport,
            descriptor: ServiceDescriptor {
                service_type: ServiceType::CloudStorage,
                service_id: "s3",
                service_label: "S3-Compatible Bucket",
                auth_type: AuthType::ApiKey,
                hotlinking: false,
                api_key_pattern: Some("^.+?:.+?:.+?:[^:]+(:[^:]*){0,2}$"),
            },
        }
    }

    fn credentials(ctx: &ServiceContext) -> Result<BucketCredentials, MediaError> {
        let raw = ctx.api_key.as_deref().ok_or_else(|| {
            MediaError::InvalidCredentials("missing credential string".to_string())
        })?;
        BucketCredentials::parse(raw)
    }

    /// Effective key prefix: normalized to no leading slash and exactly one
    /// trailing slash when non-empty
    fn prefix_path(settings: &ServiceSettings) -> String {
        match settings.path_prefix.as_deref() {
            None | Some("") => String::new(),
            Some(prefix) => {
                let trimmed = prefix.trim_matches('/');
                if trimmed.is_empty() {
                    String::new()
                } else {
                    format!("{}/", trimmed)
                }
            }
        }
    }

    /// Public base URL for asset links. Precedence: explicit settings
    /// domain > credential-embedded domain > the bucket's own endpoint.
    fn public_base(creds: &BucketCredentials, settings: &ServiceSettings) -> String {
        let domain = settings
            .custom_domain
            .as_deref()
            .or(creds.custom_domain.as_deref());
        match domain {
            Some(domain) if domain.starts_with("http://") || domain.starts_with("https://") => {
                domain.trim_end_matches('/').to_string()
            }
            Some(domain) => format!("https://{}", domain.trim_end_matches('/')),
            None => format!(
                "https://{}.{}/{}",
                creds.account_id, STORAGE_HOST, creds.bucket
            ),
        }
    }

    /// Sign and perform one request. The timestamp is regenerated here so
    /// every page and every file gets a fresh signature.
    async fn signed_request(
        &self,
        creds: &BucketCredentials,
        method: &str,
        path: &str,
        headers: &[(String, String)],
        query: &[(String, String)],
        payload: &[u8],
    ) -> Result<(u16, String), MediaError> {
        let signed: SignedRequest = sign(&SigningRequest {
            method,
            region: &creds.region,
            access_key_id: &creds.access_key_id,
            secret_access_key: creds.secret_access_key.expose_secret(),
            account_id: &creds.account_id,
            bucket: &creds.bucket,
            path,
            headers,
            query,
            payload,
            timestamp: Utc::now(),
        })?;

        debug!("{} {}", method, signed.url);

        let response = self
            .transport
            .execute(HttpRequest {
                method: method.to_string(),
                url: signed.url,
                headers: signed.headers,
                body: if payload.is_empty() {
                    None
                } else {
                    Some(payload.to_vec())
                },
            })
            .await?;

        Ok((response.status, response.body_text()))
    }

    async fn list_page(
        &self,
        creds: &BucketCredentials,
        prefix: &str,
        continuation_token: Option<&str>,
    ) -> Result<ListPage, MediaError> {
        let mut query: Vec<(String, String)> = vec![
            ("list-type".to_string(), "2".to_string()),
            ("max-keys".to_string(), MAX_KEYS_PER_PAGE.to_string()),
        ];
        if !prefix.is_empty() {
            query.push(("prefix".to_string(), prefix.to_string()));
        }
        if let Some(token) = continuation_token {
            query.push(("continuation-token".to_string(), token.to_string()));
        }

        let (status, body) = self
            .signed_request(creds, "GET", "", &[], &query, b"")
            .await?;

        if !(200..300).contains(&status) {
            return Err(MediaError::RemoteRejection {
                status,
                message: format!("list failed for bucket '{}'", creds.bucket),
            });
        }

        parse_list_page(&body)
    }

    /// Run the full pagination loop and return raw object entries
    async fn list_all(
        &self,
        creds: &BucketCredentials,
        prefix: &str,
    ) -> Result<Vec<ObjectEntry>, MediaError> {
        let mut objects = Vec::new();
        let mut continuation_token: Option<String> = None;

        for page in 0..MAX_LIST_PAGES {
            let result = self
                .list_page(creds, prefix, continuation_token.as_deref())
                .await?;

            objects.extend(result.objects);

            match (result.is_truncated, result.next_token) {
                (true, Some(token)) => continuation_token = Some(token),
                _ => return Ok(objects),
            }

            if page + 1 == MAX_LIST_PAGES {
                warn!(
                    "listing for bucket '{}' hit the {}-page ceiling; returning partial results",
                    creds.bucket, MAX_LIST_PAGES
                );
            }
        }

        Ok(objects)
    }

    fn entry_to_asset(
        entry: ObjectEntry,
        prefix: &str,
        base_url: &str,
    ) -> ExternalAsset {
        let file_name = entry
            .key
            .strip_prefix(prefix)
            .unwrap_or(&entry.key)
            .to_string();
        let kind = AssetKind::from_file_name(&file_name);
        let download_url = format!("{}/{}", base_url, entry.key);
        let preview_url = if kind == AssetKind::Image {
            download_url.clone()
        } else {
            String::new()
        };

        ExternalAsset {
            id: entry.key.clone(),
            description: file_name.clone(),
            preview_url,
            download_url,
            file_name,
            kind,
            last_modified: entry.last_modified,
            size: entry.size,
        }
    }
}

impl Default for BucketService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MediaLibraryService for BucketService {
    fn descriptor(&self) -> &ServiceDescriptor {
        &self.descriptor
    }

    /// Validate credentials with a one-key probe listing
    async fn init(&self, ctx: &ServiceContext) -> Result<(), MediaError> {
        let creds = Self::credentials(ctx)?;
        let query = vec![
            ("list-type".to_string(), "2".to_string()),
            ("max-keys".to_string(), "1".to_string()),
        ];
        let (status, _) = self
            .signed_request(&creds, "GET", "", &[], &query, b"")
            .await?;

        match status {
            200..=299 => Ok(()),
            401 | 403 => Err(MediaError::InvalidCredentials(format!(
                "bucket '{}' rejected the access keys",
                creds.bucket
            ))),
            status => Err(MediaError::RemoteRejection {
                status,
                message: format!("probe listing failed for bucket '{}'", creds.bucket),
            }),
        }
    }

    async fn search(
        &self,
        query: &str,
        ctx: &ServiceContext,
    ) -> Result<Vec<ExternalAsset>, MediaError> {
        // Credential/format errors propagate; everything past this point
        // degrades to an empty result set so the picker stays usable.
        let creds = Self::credentials(ctx)?;

        let prefix = Self::prefix_path(&ctx.settings);
        let search_prefix = query.trim().to_lowercase();
        let base_url = Self::public_base(&creds, &ctx.settings);

        let objects = match self.list_all(&creds, &prefix).await {
            Ok(objects) => objects,
            Err(e) if e.is_recoverable_for_listing() => {
                warn!("bucket listing degraded to empty results: {}", e);
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };

        let mut assets: Vec<ExternalAsset> = objects
            .into_iter()
            // Zero-byte keys with a trailing slash are directory placeholders
            .filter(|entry| !(entry.size == 0 && entry.key.ends_with('/')))
            .map(|entry| Self::entry_to_asset(entry, &prefix, &base_url))
            .filter(|asset| {
                search_prefix.is_empty() || asset.file_name.to_lowercase().contains(&search_prefix)
            })
            .collect();

        // Most recent first; stable sort keeps listing order on ties
        assets.sort_by(|a, b| b.last_modified.cmp(&a.last_modified));

        Ok(assets)
    }

    async fn upload(
        &self,
        files: &[UploadFile],
        ctx: &ServiceContext,
    ) -> Result<Vec<ExternalAsset>, MediaError> {
        let creds = Self::credentials(ctx)?;

        let prefix = Self::prefix_path(&ctx.settings);
        let base_url = Self::public_base(&creds, &ctx.settings);
        let mut uploaded = Vec::with_capacity(files.len());

        // Sequential on purpose: predictable ordering and minimal burst
        // load on the remote endpoint. PUTs are idempotent (same key
        // overwritten), so a retried or repeated upload is safe.
        for file in files {
            let key = format!("{}{}", prefix, file.name);
            let headers = vec![("content-type".to_string(), file.content_type.clone())];

            let (status, body) = self
                .signed_request(&creds, "PUT", &key, &headers, &[], &file.bytes)
                .await
                .map_err(|e| MediaError::UploadFailed {
                    file: file.name.clone(),
                    reason: e.to_string(),
                })?;

            if !(200..300).contains(&status) {
                return Err(MediaError::UploadFailed {
                    file: file.name.clone(),
                    reason: format!("status {}: {}", status, body.chars().take(200).collect::<String>()),
                });
            }

            // Synthesize the record from known metadata; no re-fetch.
            // Kind comes from the declared content type here, not the
            // extension, because the caller already knows what it sent.
            let kind = AssetKind::from_content_type(&file.content_type);
            let download_url = format!("{}/{}", base_url, key);
            uploaded.push(ExternalAsset {
                id: key.clone(),
                description: file.name.clone(),
                preview_url: if kind == AssetKind::Image {
                    download_url.clone()
                } else {
                    String::new()
                },
                download_url,
                file_name: file.name.clone(),
                kind,
                last_modified: Utc::now(),
                size: file.bytes.len() as u64,
            });
        }

        Ok(uploaded)
    }
}

/// Extract content from an XML tag (first occurrence)
fn extract_xml_tag(xml: &str, tag: &str) -> Option<String> {
    let pattern = format!(r"<{}[^>]*>([^<]*)</{}>", tag, tag);
    let re = regex::Regex::new(&pattern).ok()?;
    let cap = re.captures(xml)?;
    let text = cap.get(1)?.as_str().trim().to_string();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Parse one `ListBucketResult` page: object entries plus pagination state
fn parse_list_page(xml: &str) -> Result<ListPage, MediaError> {
    let contents_pattern = regex::Regex::new(r"(?s)<Contents>(.*?)</Contents>")
        .map_err(|e| MediaError::Parse(e.to_string()))?;

    if !xml.contains("<ListBucketResult") {
        return Err(MediaError::Parse(
            "response is not a ListBucketResult document".to_string(),
        ));
    }

    let mut objects = Vec::new();
    for cap in contents_pattern.captures_iter(xml) {
        let Some(content) = cap.get(1) else { continue };
        let content = content.as_str();

        let Some(key) = extract_xml_tag(content, "Key") else {
            continue;
        };

        let size: u64 = extract_xml_tag(content, "Size")
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);

        let last_modified = extract_xml_tag(content, "LastModified")
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);

        objects.push(ObjectEntry {
            key,
            size,
            last_modified,
        });
    }

    let is_truncated = extract_xml_tag(xml, "IsTruncated")
        .map(|v| v == "true")
        .unwrap_or(false);
    let next_token = extract_xml_tag(xml, "NextContinuationToken");

    Ok(ListPage {
        objects,
        is_truncated,
        next_token,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::transport::HttpResponse;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Scripted transport: pops queued responses, records every request.
    /// When the queue runs dry it repeats the last scripted response, which
    /// lets the safety-valve test feed "always truncated" forever.
    struct MockTransport {
        responses: Mutex<VecDeque<Result<HttpResponse, MediaError>>>,
        repeat_last: Option<HttpResponse>,
        requests: Mutex<Vec<HttpRequest>>,
    }

    impl MockTransport {
        fn new(responses: Vec<Result<HttpResponse, MediaError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into_iter().collect()),
                repeat_last: None,
                requests: Mutex::new(Vec::new()),
            }
        }

        fn repeating(response: HttpResponse) -> Self {
            Self {
                responses: Mutex::new(VecDeque::new()),
                repeat_last: Some(response),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn request_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }

        fn request_urls(&self) -> Vec<String> {
            self.requests.lock().unwrap().iter().map(|r| r.url.clone()).collect()
        }
    }

    #[async_trait]
    impl HttpTransport for MockTransport {
        async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, MediaError> {
            self.requests.lock().unwrap().push(request);
            if let Some(scripted) = self.responses.lock().unwrap().pop_front() {
                return scripted;
            }
            match &self.repeat_last {
                Some(response) => Ok(response.clone()),
                None => Err(MediaError::Network("mock transport exhausted".to_string())),
            }
        }
    }

    fn ok(body: &str) -> Result<HttpResponse, MediaError> {
        Ok(HttpResponse {
            status: 200,
            body: body.as_bytes().to_vec(),
        })
    }

    fn list_xml(objects: &[(&str, u64, &str)], next_token: Option<&str>) -> String {
        let mut xml = String::from(
            r#"<?xml version="1.0" encoding="UTF-8"?><ListBucketResult><Name>media</Name>"#,
        );
        for (key, size, modified) in objects {
            xml.push_str(&format!(
                "<Contents><Key>{key}</Key><Size>{size}</Size><LastModified>{modified}</LastModified></Contents>"
            ));
        }
        match next_token {
            Some(token) => xml.push_str(&format!(
                "<IsTruncated>true</IsTruncated><NextContinuationToken>{token}</NextContinuationToken>"
            )),
            None => xml.push_str("<IsTruncated>false</IsTruncated>"),
        }
        xml.push_str("</ListBucketResult>");
        xml
    }

    fn ctx() -> ServiceContext {
        ServiceContext {
            api_key: Some("acct123:AKIA:s3cr3t:media".to_string()),
            ..Default::default()
        }
    }

    fn service(transport: MockTransport) -> (BucketService, Arc<MockTransport>) {
        let transport = Arc::new(transport);
        (
            BucketService::with_transport(transport.clone()),
            transport,
        )
    }

    #[tokio::test]
    async fn test_pagination_threads_continuation_tokens() {
        let pages = vec![
            ok(&list_xml(&[("a.jpg", 10, "2024-04-01T00:00:00Z")], Some("t1"))),
            ok(&list_xml(&[("b.jpg", 10, "2024-04-02T00:00:00Z")], Some("t2"))),
            ok(&list_xml(&[("c.jpg", 10, "2024-04-03T00:00:00Z")], Some("t3"))),
            ok(&list_xml(&[("d.jpg", 10, "2024-04-04T00:00:00Z")], None)),
        ];
        let (svc, transport) = service(MockTransport::new(pages));

        let assets = svc.search("", &ctx()).await.unwrap();

        assert_eq!(transport.request_count(), 4);
        let urls = transport.request_urls();
        assert!(!urls[0].contains("continuation-token"));
        assert!(urls[1].contains("continuation-token=t1"));
        assert!(urls[2].contains("continuation-token=t2"));
        assert!(urls[3].contains("continuation-token=t3"));

        // Concatenated across pages, most recent first
        let names: Vec<&str> = assets.iter().map(|a| a.file_name.as_str()).collect();
        assert_eq!(names, vec!["d.jpg", "c.jpg", "b.jpg", "a.jpg"]);
    }

    #[tokio::test]
    async fn test_pagination_safety_valve_terminates() {
        let always_truncated = HttpResponse {
            status: 200,
            body: list_xml(&[("x.png", 5, "2024-01-01T00:00:00Z")], Some("again"))
                .into_bytes(),
        };
        let (svc, transport) = service(MockTransport::repeating(always_truncated));

        let assets = svc.search("", &ctx()).await.unwrap();

        assert_eq!(transport.request_count(), 20);
        assert_eq!(assets.len(), 20); // one object per page, all collected
    }

    #[tokio::test]
    async fn test_directory_markers_excluded() {
        let xml = list_xml(
            &[
                ("uploads/", 0, "2024-01-01T00:00:00Z"),
                ("uploads/real.png", 42, "2024-01-02T00:00:00Z"),
            ],
            None,
        );
        let (svc, _) = service(MockTransport::new(vec![ok(&xml)]));

        let assets = svc.search("", &ctx()).await.unwrap();
        assert_eq!(assets.len(), 1);
        assert_eq!(assets[0].id, "uploads/real.png");
    }

    #[tokio::test]
    async fn test_search_filters_case_insensitively() {
        let xml = list_xml(
            &[
                ("Summer-Trip.JPG", 10, "2024-01-01T00:00:00Z"),
                ("winter.png", 10, "2024-01-02T00:00:00Z"),
            ],
            None,
        );
        let (svc, _) = service(MockTransport::new(vec![ok(&xml)]));

        let assets = svc.search("SUMMER", &ctx()).await.unwrap();
        assert_eq!(assets.len(), 1);
        assert_eq!(assets[0].file_name, "Summer-Trip.JPG");
        assert_eq!(assets[0].kind, AssetKind::Image);
    }

    #[tokio::test]
    async fn test_search_classifies_and_builds_urls() {
        let xml = list_xml(
            &[
                ("photo.webp", 10, "2024-01-03T00:00:00Z"),
                ("clip.mov", 10, "2024-01-02T00:00:00Z"),
                ("readme.xyz", 10, "2024-01-01T00:00:00Z"),
            ],
            None,
        );
        let (svc, _) = service(MockTransport::new(vec![ok(&xml)]));

        let assets = svc.search("", &ctx()).await.unwrap();
        assert_eq!(assets[0].kind, AssetKind::Image);
        assert_eq!(
            assets[0].download_url,
            "https://acct123.r2.cloudflarestorage.com/media/photo.webp"
        );
        assert_eq!(assets[0].preview_url, assets[0].download_url);
        assert_eq!(assets[1].kind, AssetKind::Video);
        assert_eq!(assets[1].preview_url, "");
        assert_eq!(assets[2].kind, AssetKind::Other);
    }

    #[tokio::test]
    async fn test_search_uses_custom_domain_from_settings() {
        let xml = list_xml(&[("a.png", 1, "2024-01-01T00:00:00Z")], None);
        let (svc, _) = service(MockTransport::new(vec![ok(&xml)]));

        let mut context = ctx();
        context.api_key = Some("acct:key:secret:media:auto:files.example.com".to_string());
        context.settings.custom_domain = Some("https://cdn.example.com".to_string());

        let assets = svc.search("", &context).await.unwrap();
        // Explicit settings win over the credential-embedded domain
        assert_eq!(assets[0].download_url, "https://cdn.example.com/a.png");
    }

    #[tokio::test]
    async fn test_listing_failure_degrades_to_empty() {
        let (svc, _) = service(MockTransport::new(vec![Err(MediaError::Network(
            "connection reset".to_string(),
        ))]));
        let assets = svc.search("", &ctx()).await.unwrap();
        assert!(assets.is_empty());

        let (svc, _) = service(MockTransport::new(vec![Ok(HttpResponse {
            status: 500,
            body: Vec::new(),
        })]));
        assert!(svc.search("", &ctx()).await.unwrap().is_empty());

        let (svc, _) = service(MockTransport::new(vec![ok("<html>not xml</html>")]));
        assert!(svc.search("", &ctx()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_credentials_fail_before_any_request() {
        let (svc, transport) = service(MockTransport::new(vec![]));
        let mut context = ctx();
        context.api_key = Some("acct:key:secret".to_string()); // bucket missing

        assert!(matches!(
            svc.search("", &context).await,
            Err(MediaError::InvalidCredentials(_))
        ));
        assert!(matches!(
            svc.upload(&[], &context).await,
            Err(MediaError::InvalidCredentials(_))
        ));
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn test_upload_sequential_and_synthesized() {
        let responses = vec![
            Ok(HttpResponse { status: 200, body: Vec::new() }),
            Ok(HttpResponse { status: 201, body: Vec::new() }),
        ];
        let (svc, transport) = service(MockTransport::new(responses));

        let mut context = ctx();
        context.settings.path_prefix = Some("uploads".to_string());

        let files = vec![
            UploadFile {
                name: "cover.png".to_string(),
                content_type: "image/png".to_string(),
                bytes: vec![1, 2, 3],
            },
            UploadFile {
                name: "notes.txt".to_string(),
                content_type: "text/plain".to_string(),
                bytes: vec![4, 5],
            },
        ];

        let assets = svc.upload(&files, &context).await.unwrap();
        assert_eq!(assets.len(), 2);
        assert_eq!(assets[0].id, "uploads/cover.png");
        assert_eq!(assets[0].kind, AssetKind::Image);
        assert_eq!(assets[0].size, 3);
        assert_eq!(assets[1].kind, AssetKind::Document);
        assert_eq!(assets[1].preview_url, "");

        let urls = transport.request_urls();
        assert!(urls[0].ends_with("/media/uploads/cover.png"));
        assert!(urls[1].ends_with("/media/uploads/notes.txt"));
    }

    #[tokio::test]
    async fn test_upload_failure_aborts_batch() {
        let responses = vec![
            Ok(HttpResponse { status: 200, body: Vec::new() }),
            Ok(HttpResponse { status: 403, body: b"denied".to_vec() }),
        ];
        let (svc, transport) = service(MockTransport::new(responses));

        let files = vec![
            UploadFile {
                name: "first.png".to_string(),
                content_type: "image/png".to_string(),
                bytes: vec![0],
            },
            UploadFile {
                name: "second.png".to_string(),
                content_type: "image/png".to_string(),
                bytes: vec![0],
            },
            UploadFile {
                name: "third.png".to_string(),
                content_type: "image/png".to_string(),
                bytes: vec![0],
            },
        ];

        match svc.upload(&files, &ctx()).await {
            Err(MediaError::UploadFailed { file, .. }) => assert_eq!(file, "second.png"),
            other => panic!("expected UploadFailed, got {:?}", other.map(|a| a.len())),
        }
        // Third file never attempted
        assert_eq!(transport.request_count(), 2);
    }

    #[tokio::test]
    async fn test_upload_same_key_twice_is_idempotent() {
        let responses = vec![
            Ok(HttpResponse { status: 200, body: Vec::new() }),
            Ok(HttpResponse { status: 200, body: Vec::new() }),
        ];
        let (svc, _) = service(MockTransport::new(responses));

        let file = UploadFile {
            name: "logo.svg".to_string(),
            content_type: "image/svg+xml".to_string(),
            bytes: b"<svg/>".to_vec(),
        };

        let first = svc.upload(std::slice::from_ref(&file), &ctx()).await.unwrap();
        let second = svc.upload(std::slice::from_ref(&file), &ctx()).await.unwrap();
        // Same key, no duplicate-key error; records differ only in timestamp
        assert_eq!(first[0].id, second[0].id);
        assert_eq!(first[0].download_url, second[0].download_url);
        assert_eq!(first[0].size, second[0].size);
    }

    #[tokio::test]
    async fn test_init_maps_auth_failure_to_invalid_credentials() {
        let (svc, _) = service(MockTransport::new(vec![Ok(HttpResponse {
            status: 403,
            body: Vec::new(),
        })]));
        assert!(matches!(
            svc.init(&ctx()).await,
            Err(MediaError::InvalidCredentials(_))
        ));

        let (svc, _) = service(MockTransport::new(vec![ok(&list_xml(&[], None))]));
        assert!(svc.init(&ctx()).await.is_ok());
    }

    #[test]
    fn test_parse_list_page_fields() {
        let xml = list_xml(
            &[("k/a.png", 7, "2024-02-01T10:30:00Z")],
            Some("next-tok"),
        );
        let page = parse_list_page(&xml).unwrap();
        assert_eq!(page.objects.len(), 1);
        assert_eq!(page.objects[0].key, "k/a.png");
        assert_eq!(page.objects[0].size, 7);
        assert!(page.is_truncated);
        assert_eq!(page.next_token.as_deref(), Some("next-tok"));
    }

    #[test]
    fn test_prefix_path_normalization() {
        let mut settings = ServiceSettings::default();
        assert_eq!(BucketService::prefix_path(&settings), "");

        settings.path_prefix = Some("/uploads/".to_string());
        assert_eq!(BucketService::prefix_path(&settings), "uploads/");

        settings.path_prefix = Some("a/b".to_string());
        assert_eq!(BucketService::prefix_path(&settings), "a/b/");

        settings.path_prefix = Some("//".to_string());
        assert_eq!(BucketService::prefix_path(&settings), "");
    }
}
