//! Cache Request
//!
//! Describes one cached operation: which record it addresses, how long the
//! record lives and which eviction the call asks for.

use std::time::Duration;

use serde::{Deserialize, Serialize};

// == Evict Policy ==
/// Eviction a call performs before the loader's value is saved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EvictPolicy {
    /// Keep cached data
    #[default]
    None,
    /// Evict every record of the provider
    Provider,
    /// Evict every group under the request's dynamic key
    DynamicKey,
    /// Evict only the request's dynamic key group
    DynamicKeyGroup,
}

impl EvictPolicy {
    /// True for every policy that evicts something.
    pub fn evicts(&self) -> bool {
        !matches!(self, EvictPolicy::None)
    }
}

/// Request passed to [`ProcessorProviders`](super::ProcessorProviders).
///
/// # Fields
/// - `provider_key`: Name of the cached operation
/// - `dynamic_key`: Sub-identity within the provider, empty when unused
/// - `dynamic_key_group`: Sub-identity within the dynamic key, empty when unused
/// - `life_time_ms`: Life time of the cached record, `None` for no expiry
/// - `expirable`: Whether the size evictor may remove the record
/// - `encrypted`: Whether persistence should encrypt the record
/// - `evict`: Eviction to perform on this call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheRequest {
    pub provider_key: String,
    #[serde(default)]
    pub dynamic_key: String,
    #[serde(default)]
    pub dynamic_key_group: String,
    #[serde(default)]
    pub life_time_ms: Option<u64>,
    #[serde(default = "default_expirable")]
    pub expirable: bool,
    #[serde(default)]
    pub encrypted: bool,
    #[serde(default)]
    pub evict: EvictPolicy,
}

fn default_expirable() -> bool {
    true
}

impl CacheRequest {
    /// Creates an expirable, never-expiring request for `provider_key`.
    pub fn new(provider_key: impl Into<String>) -> Self {
        Self {
            provider_key: provider_key.into(),
            dynamic_key: String::new(),
            dynamic_key_group: String::new(),
            life_time_ms: None,
            expirable: default_expirable(),
            encrypted: false,
            evict: EvictPolicy::None,
        }
    }

    pub fn dynamic_key(mut self, dynamic_key: impl Into<String>) -> Self {
        self.dynamic_key = dynamic_key.into();
        self
    }

    pub fn dynamic_key_group(mut self, dynamic_key_group: impl Into<String>) -> Self {
        self.dynamic_key_group = dynamic_key_group.into();
        self
    }

    /// Sets the life time, truncated to whole milliseconds.
    pub fn life_time(mut self, life_time: Duration) -> Self {
        self.life_time_ms = Some(u64::try_from(life_time.as_millis()).unwrap_or(u64::MAX));
        self
    }

    pub fn expirable(mut self, expirable: bool) -> Self {
        self.expirable = expirable;
        self
    }

    pub fn encrypted(mut self, encrypted: bool) -> Self {
        self.encrypted = encrypted;
        self
    }

    pub fn evict(mut self, evict: EvictPolicy) -> Self {
        self.evict = evict;
        self
    }

    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.provider_key.is_empty() {
            return Some("Provider key cannot be empty".to_string());
        }
        if !self.dynamic_key_group.is_empty() && self.dynamic_key.is_empty() {
            return Some(format!(
                "{}: a dynamic key group requires a dynamic key",
                self.provider_key
            ));
        }
        match self.evict {
            EvictPolicy::DynamicKey if self.dynamic_key.is_empty() => Some(format!(
                "{}: evicting a dynamic key requires a dynamic key",
                self.provider_key
            )),
            EvictPolicy::DynamicKeyGroup if self.dynamic_key_group.is_empty() => Some(format!(
                "{}: evicting a dynamic key group requires a dynamic key group",
                self.provider_key
            )),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_deserialize_defaults() {
        let json = r#"{"provider_key": "mocks"}"#;
        let req: CacheRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req, CacheRequest::new("mocks"));
        assert!(req.expirable);
        assert!(req.life_time_ms.is_none());
    }

    #[test]
    fn test_life_time_in_millis() {
        let req = CacheRequest::new("mocks").life_time(Duration::from_secs(2));
        assert_eq!(req.life_time_ms, Some(2000));
    }

    #[test]
    fn test_validate_empty_provider() {
        assert!(CacheRequest::new("").validate().is_some());
    }

    #[test]
    fn test_validate_group_without_dynamic_key() {
        let req = CacheRequest::new("mocks").dynamic_key_group("g");
        assert!(req.validate().is_some());
    }

    #[test]
    fn test_validate_evict_policy_needs_keys() {
        let req = CacheRequest::new("mocks").evict(EvictPolicy::DynamicKey);
        assert!(req.validate().is_some());

        let req = CacheRequest::new("mocks")
            .dynamic_key("1")
            .evict(EvictPolicy::DynamicKeyGroup);
        assert!(req.validate().is_some());
    }

    #[test]
    fn test_validate_valid_request() {
        let req = CacheRequest::new("mocks")
            .dynamic_key("1")
            .dynamic_key_group("g")
            .evict(EvictPolicy::DynamicKeyGroup);
        assert!(req.validate().is_none());
        assert!(req.evict.evicts());
        assert!(!EvictPolicy::None.evicts());
    }
}
