use crate::{ENTRY_TTL, MAX_TOOL_NAME_ENTRIES, scope_key};
use moka::sync::Cache;
use std::sync::Arc;
use std::time::Duration;

/// `(sessionId, model, safeName) -> originalName` map.
///
/// Tool names are sanitized before they reach the upstream; when the model
/// later calls a tool by its safe name, this cache recovers the name the
/// client declared. Setters no-op when nothing was actually renamed.
pub struct ToolNameCache {
    entries: Cache<String, Arc<str>, ahash::RandomState>,
}

impl ToolNameCache {
    pub fn new(ttl: Duration, max_capacity: u64) -> Self {
        Self {
            entries: Cache::builder()
                .time_to_live(ttl.max(Duration::from_millis(1)))
                .max_capacity(max_capacity.max(1))
                .build_with_hasher(ahash::RandomState::new()),
        }
    }

    pub fn set(
        &self,
        session_id: Option<&str>,
        model: &str,
        safe_name: &str,
        original_name: &str,
    ) {
        if safe_name.is_empty() || original_name.is_empty() || safe_name == original_name {
            return;
        }
        self.entries
            .insert(entry_key(session_id, model, safe_name), Arc::from(original_name));
    }

    pub fn get(&self, session_id: Option<&str>, model: &str, safe_name: &str) -> Option<Arc<str>> {
        if safe_name.is_empty() {
            return None;
        }
        self.entries.get(&entry_key(session_id, model, safe_name))
    }
}

impl Default for ToolNameCache {
    fn default() -> Self {
        Self::new(ENTRY_TTL, MAX_TOOL_NAME_ENTRIES)
    }
}

fn entry_key(session_id: Option<&str>, model: &str, safe_name: &str) -> String {
    format!("{}::{safe_name}", scope_key(session_id, model))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mapping_roundtrips() {
        let cache = ToolNameCache::default();
        cache.set(Some("-7"), "gemini-2.5-pro", "get_weather", "get weather!");

        assert_eq!(
            cache.get(Some("-7"), "gemini-2.5-pro", "get_weather").as_deref(),
            Some("get weather!")
        );
        assert!(cache.get(Some("-8"), "gemini-2.5-pro", "get_weather").is_none());
    }

    #[test]
    fn identical_names_are_not_recorded() {
        let cache = ToolNameCache::default();
        cache.set(Some("-7"), "m", "already_safe", "already_safe");
        assert!(cache.get(Some("-7"), "m", "already_safe").is_none());
    }

    #[test]
    fn entries_expire_after_ttl() {
        let cache = ToolNameCache::new(Duration::from_millis(10), 16);
        cache.set(Some("-7"), "m", "safe", "orig!");
        assert!(cache.get(Some("-7"), "m", "safe").is_some());

        std::thread::sleep(Duration::from_millis(30));
        assert!(cache.get(Some("-7"), "m", "safe").is_none());
    }

    #[test]
    fn size_cap_bounds_entry_count() {
        let cache = ToolNameCache::new(Duration::from_secs(3600), 8);
        for i in 0..64 {
            cache.set(Some("-7"), "m", &format!("safe_{i}"), "orig!");
        }
        cache.entries.run_pending_tasks();
        assert!(cache.entries.entry_count() <= 8);
    }
}
