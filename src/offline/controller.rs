//! Cache controller: the single entry point that executes the strategy
//! table against the network edge and the versioned cache set.
//!
//! Lifecycle mirrors a deploy: `install` stages the manifest into a new
//! container (aborting wholesale on any fetch failure, so a half-fetched
//! version never serves), then `activate` flips the current pointer and
//! prunes the old containers. `handle` serves traffic at any point in
//! between, always against whatever this controller's version holds.

use std::sync::Arc;

use serde_json::{json, Value};

use super::cache::{CacheKey, CacheSet};
use super::{
    classify, strategy_for, Fetch, FetchError, OfflineRequest, OfflineResponse, Strategy,
    OFFLINE_PAGE,
};

pub struct CacheController {
    version: String,
    fetcher: Arc<dyn Fetch>,
    cache: CacheSet,
}

impl CacheController {
    pub fn new(version: &str, fetcher: Arc<dyn Fetch>, cache: CacheSet) -> Self {
        Self {
            version: version.to_string(),
            fetcher,
            cache,
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Fetch every manifest path into a staged container. Any failure
    /// discards the staged container and leaves the previously activated
    /// version serving.
    pub async fn install(&self, manifest: &[&str]) -> Result<(), FetchError> {
        self.cache.stage(&self.version);

        for path in manifest {
            let req = OfflineRequest::get(path);
            match self.fetcher.fetch(&req).await {
                Ok(resp) if resp.is_ok() => {
                    self.cache.put(&self.version, req.key(), resp);
                }
                Ok(resp) => {
                    self.cache.discard(&self.version);
                    tracing::warn!(version = %self.version, path, status = resp.status,
                        "install aborted, manifest entry not cacheable");
                    return Err(FetchError::Failed(format!(
                        "{path} returned status {}",
                        resp.status
                    )));
                }
                Err(e) => {
                    self.cache.discard(&self.version);
                    tracing::warn!(version = %self.version, path, error = %e,
                        "install aborted, manifest fetch failed");
                    return Err(e);
                }
            }
        }

        tracing::info!(version = %self.version, entries = manifest.len(), "install staged");
        Ok(())
    }

    /// Make this controller's version current and drop every other
    /// container. Never called implicitly by `install`.
    pub fn activate(&self) {
        self.cache.activate(&self.version);
        tracing::info!(version = %self.version, "activated, stale caches pruned");
    }

    pub async fn handle(&self, req: &OfflineRequest) -> OfflineResponse {
        match strategy_for(classify(req)) {
            Strategy::NetworkFirst => self.navigation(req).await,
            Strategy::NetworkFirstJsonFallback => self.api_read(req).await,
            Strategy::NetworkOnly => self.api_write(req).await,
            Strategy::CacheFirst => self.static_asset(req).await,
        }
    }

    // ── Strategies ──────────────────────────────────────────────────

    async fn navigation(&self, req: &OfflineRequest) -> OfflineResponse {
        match self.fetcher.fetch(req).await {
            Ok(resp) => {
                if resp.is_ok() {
                    self.cache.put(&self.version, req.key(), resp.clone());
                }
                resp
            }
            Err(e) => {
                tracing::debug!(url = %req.url, error = %e, "navigation falling back to cache");
                self.cache
                    .lookup(&self.version, &req.key())
                    .or_else(|| self.offline_page())
                    .unwrap_or_else(|| OfflineResponse::html(503, "Service Unavailable"))
            }
        }
    }

    async fn api_read(&self, req: &OfflineRequest) -> OfflineResponse {
        match self.fetcher.fetch(req).await {
            Ok(resp) => {
                if resp.is_ok() {
                    self.cache.put(&self.version, req.key(), resp.clone());
                }
                resp
            }
            Err(e) => {
                tracing::debug!(url = %req.url, error = %e, "api read falling back to cache");
                match self.cache.lookup(&self.version, &req.key()) {
                    Some(cached) => mark_offline(cached),
                    None => OfflineResponse::json(
                        503,
                        &json!({
                            "error": "Offline - No cached data available",
                            "offline": true,
                        }),
                    ),
                }
            }
        }
    }

    async fn api_write(&self, req: &OfflineRequest) -> OfflineResponse {
        match self.fetcher.fetch(req).await {
            Ok(resp) => resp,
            Err(e) => {
                tracing::debug!(url = %req.url, error = %e, "api write refused while offline");
                OfflineResponse::json(
                    503,
                    &json!({
                        "error": "Cannot perform this action while offline",
                        "offline": true,
                    }),
                )
            }
        }
    }

    async fn static_asset(&self, req: &OfflineRequest) -> OfflineResponse {
        if let Some(cached) = self.cache.lookup(&self.version, &req.key()) {
            return cached;
        }

        match self.fetcher.fetch(req).await {
            Ok(resp) => {
                if resp.is_ok() {
                    self.cache.put(&self.version, req.key(), resp.clone());
                }
                resp
            }
            Err(_) if req.document => self
                .offline_page()
                .unwrap_or_else(|| OfflineResponse::html(503, "Service Unavailable")),
            Err(_) => OfflineResponse::html(503, "Service Unavailable"),
        }
    }

    fn offline_page(&self) -> Option<OfflineResponse> {
        self.cache
            .lookup(&self.version, &CacheKey::new("GET", OFFLINE_PAGE))
    }

    // ── Hooks ───────────────────────────────────────────────────────

    /// Acknowledged no-op: queued-write replay is out of scope.
    pub fn background_sync(&self, tag: &str) {
        tracing::debug!(tag, "background sync acknowledged");
    }

    /// Acknowledged no-op: notification display is the embedder's concern.
    pub fn push(&self, payload: &str) {
        tracing::debug!(len = payload.len(), "push event acknowledged");
    }
}

/// Re-serve a cached API body with `_offline: true` injected, as the client
/// uses the marker to flag stale data. Non-JSON bodies pass through as-is.
fn mark_offline(cached: OfflineResponse) -> OfflineResponse {
    match cached.json_body() {
        Some(Value::Object(mut map)) => {
            map.insert("_offline".into(), Value::Bool(true));
            OfflineResponse::json(200, &Value::Object(map))
        }
        Some(other) => OfflineResponse::json(
            200,
            &json!({
                "data": other,
                "_offline": true,
            }),
        ),
        None => cached,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Scripted network edge with an offline toggle.
    #[derive(Default)]
    struct ScriptedFetch {
        responses: Mutex<HashMap<CacheKey, OfflineResponse>>,
        offline: AtomicBool,
    }

    impl ScriptedFetch {
        fn script(&self, method: &str, url: &str, resp: OfflineResponse) {
            self.responses
                .lock()
                .insert(CacheKey::new(method, url), resp);
        }

        fn go_offline(&self) {
            self.offline.store(true, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl Fetch for ScriptedFetch {
        async fn fetch(&self, req: &OfflineRequest) -> Result<OfflineResponse, FetchError> {
            if self.offline.load(Ordering::SeqCst) {
                return Err(FetchError::Offline);
            }
            self.responses
                .lock()
                .get(&req.key())
                .cloned()
                .ok_or_else(|| FetchError::Failed(format!("no route for {}", req.url)))
        }
    }

    fn scripted_shell() -> Arc<ScriptedFetch> {
        let fetch = Arc::new(ScriptedFetch::default());
        fetch.script("GET", "/", OfflineResponse::html(200, "<html>app</html>"));
        fetch.script(
            "GET",
            OFFLINE_PAGE,
            OfflineResponse::html(200, "<html>offline</html>"),
        );
        fetch
    }

    #[tokio::test]
    async fn failed_install_leaves_previous_version_serving() {
        let fetch = scripted_shell();
        let cache = CacheSet::new();

        let v1 = CacheController::new("v1", fetch.clone(), cache.clone());
        v1.install(&["/", OFFLINE_PAGE]).await.unwrap();
        v1.activate();

        // v2's manifest references an asset the network cannot serve.
        let v2 = CacheController::new("v2", fetch.clone(), cache.clone());
        let err = v2.install(&["/", "/missing.css"]).await.unwrap_err();
        assert!(matches!(err, FetchError::Failed(_)));

        assert_eq!(cache.current().as_deref(), Some("v1"));
        assert_eq!(cache.versions(), vec!["v1".to_string()]);
    }

    #[tokio::test]
    async fn activating_a_new_version_prunes_the_old_one() {
        let fetch = scripted_shell();
        let cache = CacheSet::new();

        let v1 = CacheController::new("v1", fetch.clone(), cache.clone());
        v1.install(&["/", OFFLINE_PAGE]).await.unwrap();
        v1.activate();

        let v2 = CacheController::new("v2", fetch.clone(), cache.clone());
        v2.install(&["/", OFFLINE_PAGE]).await.unwrap();
        // Staged but not yet current: both containers exist.
        assert_eq!(cache.versions(), vec!["v1".to_string(), "v2".to_string()]);
        assert_eq!(cache.current().as_deref(), Some("v1"));

        v2.activate();
        assert_eq!(cache.versions(), vec!["v2".to_string()]);
        assert_eq!(cache.current().as_deref(), Some("v2"));
    }

    #[tokio::test]
    async fn cached_api_read_is_served_with_offline_marker() {
        let fetch = scripted_shell();
        fetch.script(
            "GET",
            "/api/properties",
            OfflineResponse::json(200, &serde_json::json!({"properties": [{"id": 1}]})),
        );
        let controller = CacheController::new("v1", fetch.clone(), CacheSet::new());

        // Online pass populates the cache.
        let online = controller.handle(&OfflineRequest::get("/api/properties")).await;
        assert_eq!(online.status, 200);
        assert!(online.json_body().unwrap().get("_offline").is_none());

        fetch.go_offline();
        let offline = controller.handle(&OfflineRequest::get("/api/properties")).await;
        assert_eq!(offline.status, 200);
        let body = offline.json_body().unwrap();
        assert_eq!(body["_offline"], true);
        assert_eq!(body["properties"][0]["id"], 1);
    }

    #[tokio::test]
    async fn uncached_api_read_while_offline_is_503() {
        let fetch = scripted_shell();
        fetch.go_offline();
        let controller = CacheController::new("v1", fetch, CacheSet::new());

        let resp = controller.handle(&OfflineRequest::get("/api/leads")).await;
        assert_eq!(resp.status, 503);
        let body = resp.json_body().unwrap();
        assert_eq!(body["error"], "Offline - No cached data available");
        assert_eq!(body["offline"], true);
    }

    #[tokio::test]
    async fn api_writes_are_refused_while_offline_and_never_cached() {
        let fetch = scripted_shell();
        fetch.go_offline();
        let cache = CacheSet::new();
        let controller = CacheController::new("v1", fetch, cache.clone());

        let req = OfflineRequest::post("/api/clients");
        let resp = controller.handle(&req).await;
        assert_eq!(resp.status, 503);
        let body = resp.json_body().unwrap();
        assert_eq!(body["error"], "Cannot perform this action while offline");
        assert_eq!(body["offline"], true);
        assert!(cache.lookup("v1", &req.key()).is_none());
    }

    #[tokio::test]
    async fn navigation_falls_back_to_cached_page_then_offline_page() {
        let fetch = scripted_shell();
        let cache = CacheSet::new();
        let controller = CacheController::new("v1", fetch.clone(), cache);
        controller.install(&["/", OFFLINE_PAGE]).await.unwrap();
        controller.activate();

        fetch.go_offline();

        // Exact page was cached during install.
        let home = controller.handle(&OfflineRequest::navigate("/")).await;
        assert_eq!(home.body, b"<html>app</html>");

        // Never-seen page degrades to the offline fallback.
        let other = controller.handle(&OfflineRequest::navigate("/reports")).await;
        assert_eq!(other.body, b"<html>offline</html>");
    }

    #[tokio::test]
    async fn static_assets_are_cache_first() {
        let fetch = scripted_shell();
        fetch.script(
            "GET",
            "/styles.css",
            OfflineResponse::html(200, "body{}"),
        );
        let controller = CacheController::new("v1", fetch.clone(), CacheSet::new());

        let first = controller.handle(&OfflineRequest::get("/styles.css")).await;
        assert_eq!(first.status, 200);

        // Cached copy keeps serving once the network is gone.
        fetch.go_offline();
        let second = controller.handle(&OfflineRequest::get("/styles.css")).await;
        assert_eq!(second.body, b"body{}");

        let missing = controller.handle(&OfflineRequest::get("/vendor.js")).await;
        assert_eq!(missing.status, 503);
    }
}
