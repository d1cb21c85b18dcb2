//! Process-wide scratchpads for the upstream's stateful thinking protocol.
//!
//! OpenAI requests are nominally stateless, but the upstream expects opaque
//! "thought signatures" to be echoed back across turns, and tool names must
//! survive sanitization round-trips. These caches plug that gap. They are
//! scoped by `(sessionId, model)`, bounded by TTL and LRU, and intentionally
//! never persisted: persisting them would conflate project identities across
//! process restarts.

mod fallback;
mod signature_cache;
mod tool_name_cache;

pub use fallback::ModelFamily;
pub use signature_cache::SignatureCache;
pub use tool_name_cache::ToolNameCache;

use std::time::Duration;

/// How long a cache entry stays valid.
pub const ENTRY_TTL: Duration = Duration::from_secs(30 * 60);

/// Upper bound on reasoning/tool signature entries per map.
pub const MAX_SIGNATURE_ENTRIES: u64 = 256;

/// Upper bound on tool-name mapping entries.
pub const MAX_TOOL_NAME_ENTRIES: u64 = 512;

fn scope_key(session_id: Option<&str>, model: &str) -> String {
    format!("{}::{}", session_id.unwrap_or(""), model)
}
