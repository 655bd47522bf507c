//! String list parsing for env and CLI values

/// Split a list given as a JSON array (`["a","b"]`) or comma-separated
/// values (`a, b`). Entries are trimmed and empty ones dropped. A value
/// starting with `[` that is not valid JSON is split on commas after
/// stripping brackets and quotes.
pub fn parse_string_array(value: &str) -> Vec<String> {
    let trimmed = value.trim();

    if trimmed.starts_with('[')
        && let Ok(items) = serde_json::from_str::<Vec<String>>(trimmed)
    {
        return items
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
    }

    trimmed
        .trim_start_matches('[')
        .trim_end_matches(']')
        .split(',')
        .map(|s| s.trim().trim_matches('"').trim())
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
