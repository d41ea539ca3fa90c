//! medialib — media library integrations for CMS asset pickers
//!
//! The core is an S3-compatible bucket client (AWS Signature V4 signing,
//! paginated listing, sequential uploads) behind the provider-agnostic
//! [`MediaLibraryService`] trait. Stock-asset catalogs and other remote
//! sources plug into the same [`ServiceRegistry`] with a capability
//! descriptor, so calling UI code never branches per provider.

pub mod prefs;
pub mod providers;

pub use prefs::{MemoryPreferenceStore, PreferenceStore};
pub use providers::{
    AssetKind, AuthType, BucketCredentials, BucketService, ExternalAsset, MediaError,
    MediaLibraryService, ServiceContext, ServiceDescriptor, ServiceRegistry, ServiceSettings,
    ServiceType, UploadFile,
};
