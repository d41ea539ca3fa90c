//! Media library services
//!
//! A unified abstraction over external media sources. Every backend
//! implements the `MediaLibraryService` trait and answers `search` with the
//! same `ExternalAsset` shape, so the asset picker needs no
//! provider-specific branching beyond what the capability descriptor
//! declares (service type, auth type, hotlinking).
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │          MediaLibraryService Trait           │
//! │            init, search, upload              │
//! └──────────────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          ▼                         ▼
//!   ┌─────────────┐          ┌──────────────┐
//!   │ S3 bucket   │          │ stock-asset  │
//!   │ (SigV4)     │          │ services ... │
//!   └─────────────┘          └──────────────┘
//! ```

pub mod bucket;
pub mod sigv4;
pub mod transport;
pub mod types;

pub use bucket::BucketService;
pub use sigv4::{sign, SignedRequest, SigningRequest};
pub use transport::{HttpRequest, HttpResponse, HttpRetryConfig, HttpTransport, ReqwestTransport};
pub use types::{
    AssetKind, BucketCredentials, ExternalAsset, MediaError, ServiceContext, ServiceSettings,
    UploadFile,
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// What category of media source a service is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceType {
    /// Read-only stock asset catalogs (no signing, no uploads)
    StockAssets,
    /// User-owned cloud storage (supports uploads, requires init)
    CloudStorage,
}

/// How a service authenticates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthType {
    ApiKey,
    Password,
    None,
}

/// Capability record for one service
///
/// The registry entry is the sole integration point calling code needs:
/// the picker branches on these flags for presentation only. A
/// `hotlinking` service hands the caller a URL to embed directly; a
/// non-hotlinking one (the bucket client) always rehosts.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceDescriptor {
    pub service_type: ServiceType,
    pub service_id: &'static str,
    pub service_label: &'static str,
    pub auth_type: AuthType,
    pub hotlinking: bool,
    /// Regex the UI can use to pre-validate an entered API key
    pub api_key_pattern: Option<&'static str>,
}

/// Unified media library service trait
///
/// Implementations are stateless between calls: context is passed into
/// every operation and nothing survives an invocation.
#[async_trait]
pub trait MediaLibraryService: Send + Sync {
    /// Capability description for this service
    fn descriptor(&self) -> &ServiceDescriptor;

    /// One-time credential validation. `cloud_storage` services verify the
    /// supplied credentials against the backend; catalog services rarely
    /// need this and keep the default no-op.
    async fn init(&self, _ctx: &ServiceContext) -> Result<(), MediaError> {
        Ok(())
    }

    /// Search/list assets matching `query` (empty query lists everything)
    async fn search(
        &self,
        query: &str,
        ctx: &ServiceContext,
    ) -> Result<Vec<ExternalAsset>, MediaError>;

    /// Upload files, returning one record per stored file. All-or-nothing
    /// per invocation: the first failure aborts the remaining batch.
    async fn upload(
        &self,
        files: &[UploadFile],
        ctx: &ServiceContext,
    ) -> Result<Vec<ExternalAsset>, MediaError>;
}

/// Name → service mapping
///
/// Adding a backend means registering one more `MediaLibraryService`
/// implementation; callers resolve by id and stay provider-agnostic.
pub struct ServiceRegistry {
    services: HashMap<&'static str, Arc<dyn MediaLibraryService>>,
}

impl ServiceRegistry {
    pub fn empty() -> Self {
        Self {
            services: HashMap::new(),
        }
    }

    /// Registry with the built-in services registered
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register(Arc::new(BucketService::new()));
        registry
    }

    pub fn register(&mut self, service: Arc<dyn MediaLibraryService>) {
        self.services
            .insert(service.descriptor().service_id, service);
    }

    pub fn get(&self, service_id: &str) -> Result<Arc<dyn MediaLibraryService>, MediaError> {
        self.services
            .get(service_id)
            .cloned()
            .ok_or_else(|| MediaError::UnknownService(service_id.to_string()))
    }

    /// Descriptors of all registered services, sorted by id
    pub fn descriptors(&self) -> Vec<&ServiceDescriptor> {
        let mut all: Vec<&ServiceDescriptor> =
            self.services.values().map(|s| s.descriptor()).collect();
        all.sort_by_key(|d| d.service_id);
        all
    }
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
