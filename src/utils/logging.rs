use serde::Serialize;

/// Upper bound on a single pretty-printed payload dump.
const MAX_PRETTY_CHARS: usize = 8 * 1024;

/// Pretty-print `value` for a debug log line. Serialization is skipped
/// entirely unless DEBUG is enabled.
pub(crate) fn with_pretty_json_debug<T, F>(value: &T, log_action: F)
where
    T: Serialize,
    F: FnOnce(&str),
{
    if !tracing::enabled!(tracing::Level::DEBUG) {
        return;
    }

    let mut pretty = serde_json::to_string_pretty(value)
        .unwrap_or_else(|error| format!("<pretty serialize failed: {error}>"));
    if let Some((cut, _)) = pretty.char_indices().nth(MAX_PRETTY_CHARS) {
        pretty.truncate(cut);
        pretty.push_str("\n<truncated>");
    }
    log_action(&pretty);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skipped_without_debug_subscriber() {
        let mut called = false;
        with_pretty_json_debug(&serde_json::json!({"a": 1}), |_| called = true);
        assert!(!called);
    }
}
