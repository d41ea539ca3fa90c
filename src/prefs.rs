//! Injected preference store for remembered credentials
//!
//! Callers that want to remember API keys or credential strings between
//! operations inject a [`PreferenceStore`] rather than relying on ambient
//! global state; the signer/client core never touches it, which keeps the
//! core pure and independently testable.

use std::collections::HashMap;
use std::sync::RwLock;

/// Simple get/set capability for remembered values
pub trait PreferenceStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

/// In-memory store, scoped to the owning process
#[derive(Default)]
pub struct MemoryPreferenceStore {
    inner: RwLock<HashMap<String, String>>,
}

impl MemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn get(&self, key: &str) -> Option<String> {
        self.inner.read().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        if let Ok(mut map) = self.inner.write() {
            map.insert(key.to_string(), value.to_string());
        }
    }

    fn remove(&self, key: &str) {
        if let Ok(mut map) = self.inner.write() {
            map.remove(key);
        }
    }
}

/// Conventional key under which a service's credential string is stored
pub fn credential_key(service_id: &str) -> String {
    format!("credential:{}", service_id)
}
