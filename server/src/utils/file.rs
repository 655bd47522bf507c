//! Path helpers

use std::path::PathBuf;

/// Expand `~` and make relative paths absolute against the working directory.
///
/// ```text
/// expand_path("~/.span-indexer")  // -> /home/user/.span-indexer
/// expand_path("spans.json")       // -> /current/dir/spans.json
/// expand_path("/etc/spans.json")  // -> /etc/spans.json
/// ```
pub fn expand_path(path: &str) -> PathBuf {
    let path = path.trim();

    let expanded = match path {
        "" => PathBuf::from("."),
        "~" => dirs::home_dir().unwrap_or_else(|| PathBuf::from(path)),
        _ => match (path.strip_prefix("~/"), dirs::home_dir()) {
            (Some(rest), Some(home)) => home.join(rest),
            _ => PathBuf::from(path),
        },
    };

    if expanded.is_absolute() {
        return expanded;
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(&expanded))
        .unwrap_or(expanded)
}
