//! Company logos for whatever postings are on screen, fetched at most once per company.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::client::JobBoardApi;
use crate::fanout::join_ordered;
use crate::normalize;

#[derive(Debug, Default)]
pub struct LogoCache {
    // a key means "already fetched"; the value is None when the company has no logo
    // or the fetch failed
    logos: HashMap<i64, Option<String>>,
}

impl LogoCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn logo(&self, company_id: i64) -> Option<&str> {
        self.logos.get(&company_id)?.as_deref()
    }

    pub fn is_known(&self, company_id: i64) -> bool {
        self.logos.contains_key(&company_id)
    }

    /// Fetch logos for the companies not seen before, concurrently. Returns how
    /// many companies were requested.
    pub async fn hydrate(&mut self, api: &Arc<dyn JobBoardApi>, company_ids: &[i64]) -> usize {
        let mut pending: Vec<i64> = Vec::new();
        for &id in company_ids {
            if !self.is_known(id) && !pending.contains(&id) {
                pending.push(id);
            }
        }
        if pending.is_empty() {
            return 0;
        }
        debug!("Fetching logos for {} companies", pending.len());

        let tasks: Vec<_> = pending
            .iter()
            .map(|&id| {
                let api = Arc::clone(api);
                async move {
                    match api.get_company(id).await {
                        Ok(payload) => normalize::company(&payload).and_then(|c| c.logo),
                        Err(e) => {
                            warn!("Logo fetch failed for company {}: {}", id, e);
                            None
                        }
                    }
                }
            })
            .collect();

        let results = join_ordered(tasks).await;
        for (id, logo) in pending.iter().zip(results) {
            self.logos.insert(*id, logo.flatten());
        }
        pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeApi, Failure};
    use serde_json::json;

    fn api() -> Arc<FakeApi> {
        Arc::new(
            FakeApi::new()
                .with_company(json!({"id": 1, "name": "One", "logo": "one.png"}))
                .with_company(json!({"id": 2, "name": "Two"}))
                .with_company(json!({"id": 3, "name": "Three", "logoUrl": "three.png"}))
                .fail("get_company:4", Failure::Server),
        )
    }

    #[tokio::test]
    async fn test_each_company_fetched_once() {
        let fake = api();
        let shared: Arc<dyn JobBoardApi> = fake.clone();
        let mut cache = LogoCache::new();

        assert_eq!(cache.hydrate(&shared, &[1, 2, 1]).await, 2);
        assert_eq!(cache.hydrate(&shared, &[2, 3, 1]).await, 1);
        assert_eq!(cache.hydrate(&shared, &[1, 2, 3]).await, 0);

        assert_eq!(fake.calls("get_company:1"), 1);
        assert_eq!(fake.calls("get_company:2"), 1);
        assert_eq!(fake.calls("get_company:3"), 1);

        assert_eq!(cache.logo(1), Some("one.png"));
        assert_eq!(cache.logo(2), None);
        assert_eq!(cache.logo(3), Some("three.png"));
    }

    #[tokio::test]
    async fn test_failed_fetch_does_not_block_others() {
        let fake = api();
        let shared: Arc<dyn JobBoardApi> = fake.clone();
        let mut cache = LogoCache::new();

        cache.hydrate(&shared, &[4, 1]).await;
        assert_eq!(cache.logo(1), Some("one.png"));
        assert!(cache.is_known(4));
        assert_eq!(cache.logo(4), None);

        // failures are remembered too
        cache.hydrate(&shared, &[4]).await;
        assert_eq!(fake.calls("get_company:4"), 1);
    }
}
