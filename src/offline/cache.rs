//! Versioned cache containers.
//!
//! A [`CacheSet`] holds named containers of captured responses, keyed by
//! method + URL. At most one container is current; activation flips the
//! current pointer and prunes every other container in the same critical
//! section, so a reader never observes two live versions. Racing writes to
//! the same key resolve last-write-wins.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use super::OfflineResponse;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub method: String,
    pub url: String,
}

impl CacheKey {
    pub fn new(method: &str, url: &str) -> Self {
        Self {
            method: method.to_uppercase(),
            url: url.to_string(),
        }
    }
}

#[derive(Default)]
struct Containers {
    current: Option<String>,
    by_version: HashMap<String, HashMap<CacheKey, OfflineResponse>>,
}

/// Shared handle over the container map; clones observe the same state.
#[derive(Clone, Default)]
pub struct CacheSet {
    inner: Arc<Mutex<Containers>>,
}

impl CacheSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create (or reset) an empty container for `version` without touching
    /// the current pointer. Staging is invisible to lookups until
    /// [`CacheSet::activate`].
    pub fn stage(&self, version: &str) {
        self.inner
            .lock()
            .by_version
            .insert(version.to_string(), HashMap::new());
    }

    /// Store a response under `version`, creating the container if needed.
    pub fn put(&self, version: &str, key: CacheKey, response: OfflineResponse) {
        self.inner
            .lock()
            .by_version
            .entry(version.to_string())
            .or_default()
            .insert(key, response);
    }

    pub fn lookup(&self, version: &str, key: &CacheKey) -> Option<OfflineResponse> {
        self.inner
            .lock()
            .by_version
            .get(version)
            .and_then(|c| c.get(key).cloned())
    }

    /// Make `version` the single current container and delete all others.
    pub fn activate(&self, version: &str) {
        let mut inner = self.inner.lock();
        inner.by_version.retain(|name, _| name == version);
        inner.by_version.entry(version.to_string()).or_default();
        inner.current = Some(version.to_string());
    }

    /// Discard a container that never went current (failed install).
    pub fn discard(&self, version: &str) {
        let mut inner = self.inner.lock();
        if inner.current.as_deref() != Some(version) {
            inner.by_version.remove(version);
        }
    }

    pub fn current(&self) -> Option<String> {
        self.inner.lock().current.clone()
    }

    pub fn versions(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.lock().by_version.keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resp(body: &str) -> OfflineResponse {
        OfflineResponse::html(200, body)
    }

    #[test]
    fn staged_entries_invisible_until_activated() {
        let cache = CacheSet::new();
        let key = CacheKey::new("GET", "/index.html");

        cache.stage("v1");
        cache.put("v1", key.clone(), resp("one"));
        assert!(cache.current().is_none());

        cache.activate("v1");
        assert_eq!(cache.current().as_deref(), Some("v1"));
        assert_eq!(cache.lookup("v1", &key).unwrap().body, b"one");
    }

    #[test]
    fn activation_prunes_every_other_container() {
        let cache = CacheSet::new();
        let key = CacheKey::new("GET", "/index.html");

        cache.put("v1", key.clone(), resp("one"));
        cache.activate("v1");

        cache.stage("v2");
        cache.put("v2", key.clone(), resp("two"));
        cache.activate("v2");

        assert_eq!(cache.versions(), vec!["v2".to_string()]);
        assert_eq!(cache.current().as_deref(), Some("v2"));
        assert!(cache.lookup("v1", &key).is_none());
        assert_eq!(cache.lookup("v2", &key).unwrap().body, b"two");
    }

    #[test]
    fn discard_never_touches_the_current_container() {
        let cache = CacheSet::new();
        cache.activate("v1");
        cache.discard("v1");
        assert_eq!(cache.versions(), vec!["v1".to_string()]);

        cache.stage("v2");
        cache.discard("v2");
        assert_eq!(cache.versions(), vec!["v1".to_string()]);
    }

    #[test]
    fn last_write_wins_on_the_same_key() {
        let cache = CacheSet::new();
        let key = CacheKey::new("GET", "/api/clients");

        cache.put("v1", key.clone(), resp("stale"));
        cache.put("v1", key.clone(), resp("fresh"));
        assert_eq!(cache.lookup("v1", &key).unwrap().body, b"fresh");
    }

    #[test]
    fn keys_normalize_method_case() {
        assert_eq!(CacheKey::new("get", "/x"), CacheKey::new("GET", "/x"));
    }
}
