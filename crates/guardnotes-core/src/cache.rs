//! Query cache with key-prefix invalidation.
//!
//! List views read through [`QueryCache::get_or_fetch`]; mutations call
//! [`QueryCache::invalidate`] with a key prefix so every dependent view
//! refetches on its next read. A key is a list of segments, each either a
//! string or a string map; a filter matches every key it is a prefix of,
//! where a map segment matches any map containing all of its entries.
//!
//! An invalidation bumps a generation counter. A fetch that started before
//! the bump does not write its (possibly stale) result back.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Root key of the project selector list.
pub const PROJECTS_SELECTOR_KEY: &str = "projects-selector";
/// Root key of per-project group lists.
pub const GROUPS_KEY: &str = "groups";
/// Root key of per-group credential lists.
pub const CREDENTIALS_KEY: &str = "credentials";

/// One segment of a [`QueryKey`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum KeySegment {
    Str(String),
    Map(BTreeMap<String, String>),
}

impl KeySegment {
    fn matches(&self, filter: &Self) -> bool {
        match (self, filter) {
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Map(key), Self::Map(filter)) => {
                filter.iter().all(|(k, v)| key.get(k) == Some(v))
            }
            _ => false,
        }
    }
}

impl From<&str> for KeySegment {
    fn from(s: &str) -> Self {
        Self::Str(s.to_owned())
    }
}

impl From<String> for KeySegment {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

/// Identifies a cached query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct QueryKey(Vec<KeySegment>);

impl QueryKey {
    /// A key from a list of segments.
    #[must_use]
    pub fn new(segments: Vec<KeySegment>) -> Self {
        Self(segments)
    }

    /// Append a segment.
    #[must_use]
    pub fn with(mut self, segment: impl Into<KeySegment>) -> Self {
        self.0.push(segment.into());
        self
    }

    /// Append a single-entry map segment.
    #[must_use]
    pub fn with_entry(mut self, key: &str, value: impl Into<String>) -> Self {
        let mut map = BTreeMap::new();
        map.insert(key.to_owned(), value.into());
        self.0.push(KeySegment::Map(map));
        self
    }

    /// Whether `filter` selects this key.
    #[must_use]
    pub fn matches(&self, filter: &Self) -> bool {
        filter.0.len() <= self.0.len()
            && self.0.iter().zip(&filter.0).all(|(seg, f)| seg.matches(f))
    }

    /// `["projects-selector"]`
    #[must_use]
    pub fn projects() -> Self {
        Self::default().with(PROJECTS_SELECTOR_KEY)
    }

    /// `["groups", <project slug>]`
    #[must_use]
    pub fn groups(project_slug: &str) -> Self {
        Self::default().with(GROUPS_KEY).with(project_slug)
    }

    /// `["credentials", {"group": <group id>}]`
    #[must_use]
    pub fn credentials(group_id: Uuid) -> Self {
        Self::default()
            .with(CREDENTIALS_KEY)
            .with_entry("group", group_id.to_string())
    }
}

impl std::fmt::Display for QueryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match serde_json::to_string(self) {
            Ok(json) => f.write_str(&json),
            Err(_) => write!(f, "{self:?}"),
        }
    }
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<QueryKey, serde_json::Value>,
    generation: u64,
}

/// Keyed cache of query results, shared by all handlers.
#[derive(Debug, Default)]
pub struct QueryCache {
    state: RwLock<CacheState>,
}

impl QueryCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached value for `key`, or run `fetch` and cache its
    /// result. Errors from `fetch` are returned and never cached.
    ///
    /// # Errors
    ///
    /// Propagates the error returned by `fetch`.
    pub async fn get_or_fetch<T, E, F, Fut>(&self, key: QueryKey, fetch: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let generation = {
            let state = self.state.read().await;
            if let Some(cached) = state.entries.get(&key) {
                match serde_json::from_value::<T>(cached.clone()) {
                    Ok(value) => {
                        tracing::debug!(key = %key, "query cache hit");
                        return Ok(value);
                    }
                    Err(e) => {
                        tracing::warn!(key = %key, error = %e, "discarding undecodable cache entry");
                    }
                }
            }
            state.generation
        };

        tracing::debug!(key = %key, "query cache miss");
        let value = fetch().await?;

        match serde_json::to_value(&value) {
            Ok(json) => {
                let mut state = self.state.write().await;
                if state.generation == generation {
                    state.entries.insert(key, json);
                }
            }
            Err(e) => tracing::warn!(key = %key, error = %e, "query result not cacheable"),
        }

        Ok(value)
    }

    /// Drop every entry selected by `filter`. Returns how many were dropped.
    pub async fn invalidate(&self, filter: &QueryKey) -> usize {
        let mut state = self.state.write().await;
        state.generation = state.generation.wrapping_add(1);
        let before = state.entries.len();
        state.entries.retain(|key, _| !key.matches(filter));
        let dropped = before.saturating_sub(state.entries.len());
        tracing::debug!(filter = %filter, dropped, "query cache invalidated");
        dropped
    }

    /// Whether a value is cached under exactly `key`.
    pub async fn contains(&self, key: &QueryKey) -> bool {
        self.state.read().await.entries.contains_key(key)
    }

    /// Number of cached entries.
    pub async fn len(&self) -> usize {
        self.state.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::convert::Infallible;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn credentials_key_serializes_like_a_query_key() {
        let id = Uuid::nil();
        let key = QueryKey::credentials(id);
        assert_eq!(
            key.to_string(),
            format!(r#"["credentials",{{"group":"{id}"}}]"#)
        );
    }

    #[test]
    fn prefix_filter_matches_longer_keys() {
        let key = QueryKey::groups("atlas");
        assert!(key.matches(&QueryKey::default().with(GROUPS_KEY)));
        assert!(key.matches(&QueryKey::groups("atlas")));
        assert!(!key.matches(&QueryKey::groups("other")));
        assert!(!QueryKey::default().with(GROUPS_KEY).matches(&key));
    }

    #[test]
    fn map_segment_matches_on_subset() {
        let key = QueryKey::default()
            .with(CREDENTIALS_KEY)
            .with(KeySegment::Map(BTreeMap::from([
                ("group".to_owned(), "g1".to_owned()),
                ("env".to_owned(), "PRO".to_owned()),
            ])));
        let filter = QueryKey::default()
            .with(CREDENTIALS_KEY)
            .with_entry("group", "g1");
        assert!(key.matches(&filter));

        let other = QueryKey::default()
            .with(CREDENTIALS_KEY)
            .with_entry("group", "g2");
        assert!(!key.matches(&other));
    }

    #[tokio::test]
    async fn second_read_is_served_from_cache() {
        let cache = QueryCache::new();
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            let v: Vec<String> = cache
                .get_or_fetch(QueryKey::projects(), || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, Infallible>(vec!["atlas".to_owned()])
                })
                .await
                .unwrap();
            assert_eq!(v, vec!["atlas".to_owned()]);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn invalidate_drops_only_matching_entries() {
        let cache = QueryCache::new();
        for slug in ["a", "b"] {
            cache
                .get_or_fetch(QueryKey::groups(slug), || async { Ok::<_, Infallible>(1) })
                .await
                .unwrap();
        }
        cache
            .get_or_fetch(QueryKey::projects(), || async { Ok::<_, Infallible>(1) })
            .await
            .unwrap();

        assert_eq!(cache.invalidate(&QueryKey::groups("a")).await, 1);
        assert!(!cache.contains(&QueryKey::groups("a")).await);
        assert!(cache.contains(&QueryKey::groups("b")).await);

        assert_eq!(cache.invalidate(&QueryKey::default().with(GROUPS_KEY)).await, 1);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn errors_are_not_cached() {
        let cache = QueryCache::new();
        let result: Result<u32, &str> = cache
            .get_or_fetch(QueryKey::projects(), || async { Err("down") })
            .await;
        assert!(result.is_err());
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn fetch_racing_an_invalidation_is_not_stored() {
        let cache = Arc::new(QueryCache::new());
        let (started_tx, started_rx) = tokio::sync::oneshot::channel::<()>();
        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();

        let reader = {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move {
                cache
                    .get_or_fetch(QueryKey::projects(), || async move {
                        started_tx.send(()).unwrap();
                        release_rx.await.unwrap();
                        Ok::<_, Infallible>(vec!["stale".to_owned()])
                    })
                    .await
                    .unwrap()
            })
        };

        started_rx.await.unwrap();
        cache.invalidate(&QueryKey::projects()).await;
        release_tx.send(()).unwrap();

        assert_eq!(reader.await.unwrap(), vec!["stale".to_owned()]);
        assert!(!cache.contains(&QueryKey::projects()).await);
    }
}
