/// Upstream tool names must match `[A-Za-z0-9_-]{1,128}`.
pub const MAX_TOOL_NAME_LEN: usize = 128;

const FALLBACK_TOOL_NAME: &str = "tool";

/// Map every character outside `[A-Za-z0-9_-]` to `_`, trim underscores,
/// cap the length, and fall back to a fixed name when nothing survives.
pub fn sanitize_tool_name(name: &str) -> String {
    let mapped: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();

    let trimmed = mapped.trim_matches('_');
    let capped = if trimmed.len() > MAX_TOOL_NAME_LEN {
        &trimmed[..MAX_TOOL_NAME_LEN]
    } else {
        trimmed
    };

    if capped.is_empty() {
        FALLBACK_TOOL_NAME.to_string()
    } else {
        capped.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spaces_and_punctuation_map_to_underscores() {
        assert_eq!(sanitize_tool_name("get weather!"), "get_weather");
        assert_eq!(sanitize_tool_name("ns.search/web"), "ns_search_web");
    }

    #[test]
    fn already_safe_names_pass_through() {
        assert_eq!(sanitize_tool_name("get_weather-v2"), "get_weather-v2");
    }

    #[test]
    fn surrounding_underscores_are_trimmed() {
        assert_eq!(sanitize_tool_name("__weird__"), "weird");
        assert_eq!(sanitize_tool_name("!!!lookup"), "lookup");
    }

    #[test]
    fn long_names_are_capped() {
        let long = "a".repeat(400);
        assert_eq!(sanitize_tool_name(&long).len(), MAX_TOOL_NAME_LEN);
    }

    #[test]
    fn degenerate_names_fall_back() {
        assert_eq!(sanitize_tool_name(""), "tool");
        assert_eq!(sanitize_tool_name("!!!"), "tool");
        assert_eq!(sanitize_tool_name("___"), "tool");
    }

    #[test]
    fn sanitized_names_match_upstream_contract() {
        for name in ["get weather!", "日本語ツール", "x", &"b".repeat(500)] {
            let safe = sanitize_tool_name(name);
            assert!(!safe.is_empty());
            assert!(safe.len() <= MAX_TOOL_NAME_LEN);
            assert!(
                safe.chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
            );
        }
    }
}
