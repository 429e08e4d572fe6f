//! Render cache for read endpoints.
//!
//! Each [`Page`] topic owns a moka cache of serialized responses. A mutation
//! invalidates whole topics; entries rendered concurrently with an
//! invalidation are discarded instead of stored.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::domain::ports::{Page, PageInvalidator};
use crate::error::AppError;

struct Topic {
    entries: Cache<String, Value>,
    generation: AtomicU64,
}

pub struct PageCache {
    topics: HashMap<Page, Topic>,
}

impl PageCache {
    pub fn new(ttl: Duration, capacity: u64) -> Self {
        let topics = Page::ALL
            .into_iter()
            .map(|page| {
                let entries = Cache::builder()
                    .max_capacity(capacity)
                    .time_to_live(ttl)
                    .build();
                (page, Topic { entries, generation: AtomicU64::new(0) })
            })
            .collect();
        Self { topics }
    }

    /// Returns the cached response for `key`, rendering and storing it on a
    /// miss.
    pub async fn get_or_render<T, F, Fut>(&self, page: Page, key: String, render: F) -> Result<Value, AppError>
    where
        T: Serialize,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, AppError>>,
    {
        let Some(topic) = self.topics.get(&page) else {
            return to_value(render().await?);
        };

        if let Some(hit) = topic.entries.get(&key).await {
            debug!(page = ?page, key = %key, "page cache hit");
            return Ok(hit);
        }

        let generation = topic.generation.load(Ordering::Acquire);
        let value = to_value(render().await?)?;
        if topic.generation.load(Ordering::Acquire) == generation {
            topic.entries.insert(key, value.clone()).await;
        }
        Ok(value)
    }

    pub fn entry_count(&self, page: Page) -> u64 {
        self.topics.get(&page).map(|t| t.entries.entry_count()).unwrap_or(0)
    }
}

#[async_trait]
impl PageInvalidator for PageCache {
    async fn invalidate(&self, page: Page) {
        if let Some(topic) = self.topics.get(&page) {
            topic.generation.fetch_add(1, Ordering::AcqRel);
            topic.entries.invalidate_all();
            debug!(path = page.path(), "invalidated page cache");
        }
    }
}

fn to_value<T: Serialize>(rendered: T) -> Result<Value, AppError> {
    serde_json::to_value(rendered).map_err(|e| AppError::InternalWithMsg(format!("render failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[tokio::test]
    async fn test_hit_skips_render_until_invalidated() {
        let cache = PageCache::new(Duration::from_secs(60), 100);
        let counter = AtomicUsize::new(0);
        let renders = &counter;
        let render = move || async move {
            renders.fetch_add(1, Ordering::SeqCst);
            Ok::<_, AppError>(serde_json::json!({"count": 1}))
        };

        let first = cache.get_or_render(Page::Contacts, "/contacts".into(), render).await.unwrap();
        let second = cache.get_or_render(Page::Contacts, "/contacts".into(), render).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(renders.load(Ordering::SeqCst), 1);

        cache.invalidate(Page::Dashboard).await;
        cache.get_or_render(Page::Contacts, "/contacts".into(), render).await.unwrap();
        assert_eq!(renders.load(Ordering::SeqCst), 1);

        cache.invalidate(Page::Contacts).await;
        cache.get_or_render(Page::Contacts, "/contacts".into(), render).await.unwrap();
        assert_eq!(renders.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_render_errors_are_not_cached() {
        let cache = PageCache::new(Duration::from_secs(60), 100);
        let failed = cache
            .get_or_render(Page::Activities, "k".into(), || async {
                Err::<Value, _>(AppError::Validation("bad".into()))
            })
            .await;
        assert!(failed.is_err());

        let ok = cache
            .get_or_render(Page::Activities, "k".into(), || async { Ok::<_, AppError>(1) })
            .await
            .unwrap();
        assert_eq!(ok, serde_json::json!(1));
    }
}
