//! Deduplication index over normalized identity keys.
//!
//! Seeded once from the existing corpus, then consulted for every
//! candidate a search round produces. The check-then-insert is a single
//! operation under one lock guard, so two concurrently completing tasks
//! can never both claim the same key — first writer wins.

use std::collections::HashSet;

use tokio::sync::Mutex;

use listscout_shared::Resource;

/// The single source of truth for "is this item new".
#[derive(Debug, Default)]
pub struct DedupIndex {
    seen: Mutex<HashSet<String>>,
}

impl DedupIndex {
    /// Build an index from the identity keys of the existing corpus.
    pub fn seed(keys: impl IntoIterator<Item = String>) -> Self {
        Self {
            seen: Mutex::new(keys.into_iter().collect()),
        }
    }

    /// Whether the resource's identity key is already claimed.
    pub async fn contains(&self, resource: &Resource) -> bool {
        self.seen.lock().await.contains(&resource.identity_key())
    }

    /// Claim the resource's identity key. Returns `true` exactly once per
    /// key: the check and the insert happen under the same guard, with no
    /// suspension point between them.
    pub async fn try_insert(&self, resource: &Resource) -> bool {
        self.seen.lock().await.insert(resource.identity_key())
    }

    /// Number of known keys (seed corpus plus accepted this run).
    pub async fn len(&self) -> usize {
        self.seen.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn resource(title: &str, url: &str) -> Resource {
        Resource {
            title: title.into(),
            url: url.into(),
            description: String::new(),
            category: "test".into(),
            tags: vec![],
        }
    }

    #[tokio::test]
    async fn second_insert_is_rejected() {
        let index = DedupIndex::default();
        let r = resource("X", "https://a.com/x");

        assert!(index.try_insert(&r).await);
        assert!(!index.try_insert(&r).await);
        assert_eq!(index.len().await, 1);
    }

    #[tokio::test]
    async fn seeded_urls_match_case_insensitively() {
        // Seed corpus has {url: "https://a.com/x"}; a round returns a
        // case-variant duplicate and one genuinely new entry.
        let seed = resource("X", "https://a.com/x");
        let index = DedupIndex::seed([seed.identity_key()]);

        let dup = resource("X-dup", "https://A.com/X");
        let fresh = resource("Y", "https://b.com/y");

        assert!(index.contains(&dup).await);
        assert!(!index.contains(&fresh).await);
        assert!(!index.try_insert(&dup).await);
        assert!(index.try_insert(&fresh).await);
        assert_eq!(index.len().await, 2);
    }

    #[tokio::test]
    async fn title_fallback_when_url_absent() {
        let index = DedupIndex::default();
        let first = resource("  Same Title ", "");
        let second = resource("same title", "");

        assert!(index.try_insert(&first).await);
        assert!(!index.try_insert(&second).await);
    }

    #[tokio::test]
    async fn concurrent_inserts_accept_exactly_once() {
        let index = Arc::new(DedupIndex::default());

        let mut handles = Vec::new();
        for i in 0..16 {
            let index = Arc::clone(&index);
            handles.push(tokio::spawn(async move {
                let r = resource(&format!("task-{i}"), "https://contested.example/page");
                index.try_insert(&r).await
            }));
        }

        let mut accepted = 0;
        for handle in handles {
            if handle.await.expect("task completed") {
                accepted += 1;
            }
        }
        assert_eq!(accepted, 1);
        assert_eq!(index.len().await, 1);
    }
}
