use crate::{ENTRY_TTL, MAX_SIGNATURE_ENTRIES, scope_key};
use moka::sync::Cache;
use std::sync::Arc;
use std::time::Duration;

type SignatureStore = Cache<String, Arc<str>, ahash::RandomState>;

/// Two independent TTL+LRU maps, `(sessionId, model)` keyed: one for
/// reasoning signatures, one for tool-call signatures.
///
/// Setters no-op on empty input; getters return `None` once the TTL has
/// elapsed; inserting past the size cap evicts the least-recently-used
/// entry.
pub struct SignatureCache {
    reasoning: SignatureStore,
    tool: SignatureStore,
}

impl SignatureCache {
    pub fn new(ttl: Duration, max_capacity: u64) -> Self {
        Self {
            reasoning: build_store(ttl, max_capacity),
            tool: build_store(ttl, max_capacity),
        }
    }

    pub fn set_reasoning(&self, session_id: Option<&str>, model: &str, signature: &str) {
        if signature.is_empty() {
            return;
        }
        self.reasoning
            .insert(scope_key(session_id, model), Arc::from(signature));
    }

    pub fn get_reasoning(&self, session_id: Option<&str>, model: &str) -> Option<Arc<str>> {
        self.reasoning.get(&scope_key(session_id, model))
    }

    pub fn set_tool(&self, session_id: Option<&str>, model: &str, signature: &str) {
        if signature.is_empty() {
            return;
        }
        self.tool
            .insert(scope_key(session_id, model), Arc::from(signature));
    }

    pub fn get_tool(&self, session_id: Option<&str>, model: &str) -> Option<Arc<str>> {
        self.tool.get(&scope_key(session_id, model))
    }
}

impl Default for SignatureCache {
    fn default() -> Self {
        Self::new(ENTRY_TTL, MAX_SIGNATURE_ENTRIES)
    }
}

fn build_store(ttl: Duration, max_capacity: u64) -> SignatureStore {
    Cache::builder()
        .time_to_live(ttl.max(Duration::from_millis(1)))
        .max_capacity(max_capacity.max(1))
        .build_with_hasher(ahash::RandomState::new())
}
