use std::path::PathBuf;

/// Per-application cache root on this machine.
///
/// Falls back to the system temp directory when the platform has no cache dir
/// (headless CI users, stripped containers).
pub fn default_cache_root(app_name: &str) -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(sanitize(app_name))
}

fn sanitize(app_name: &str) -> String {
    let cleaned: String = app_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '-'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "video-player-core".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_root_ends_with_app_name() {
        let root = default_cache_root("demo-player");
        assert!(root.ends_with("demo-player"));
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize("My Player/1"), "My-Player-1");
        assert_eq!(sanitize(""), "video-player-core");
    }
}
