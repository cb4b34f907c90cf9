//! # Source Classification
//!
//! Maps a media URI onto the delivery category that decides which data-source
//! chain and demuxer factory are used.
//!
//! Rules are evaluated in a fixed order and the first match wins:
//!
//! | Order | Test                                   | Result        |
//! |-------|----------------------------------------|---------------|
//! | 1     | scheme is exactly `rtmp`               | `Rtmp`        |
//! | 2     | scheme is exactly `rtsp`               | `Rtsp`        |
//! | 3     | lower-cased URI contains `.mpd`        | `Dash`        |
//! | 4     | lower-cased URI contains `.m3u8`       | `Hls`         |
//! | -     | otherwise                              | `Progressive` |
//!
//! Rules 3 and 4 are substring tests over the whole string, so a manifest
//! extension inside a query parameter still counts.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Delivery category of a media URI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Rtmp,
    Rtsp,
    /// MPEG-DASH manifest
    Dash,
    /// HLS playlist
    Hls,
    /// Single progressive file (MP4, MKV, WebM, ...)
    Progressive,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Rtmp => "rtmp",
            ContentType::Rtsp => "rtsp",
            ContentType::Dash => "dash",
            ContentType::Hls => "hls",
            ContentType::Progressive => "progressive",
        }
    }

    /// Streams the engine opens with its own transport stack; no HTTP chain or
    /// cache is built for them.
    pub fn is_streaming_protocol(&self) -> bool {
        matches!(self, ContentType::Rtmp | ContentType::Rtsp)
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

enum Rule {
    Scheme(&'static str, ContentType),
    Contains(&'static str, ContentType),
}

const SCHEME_RULES: &[Rule] = &[
    Rule::Scheme("rtmp", ContentType::Rtmp),
    Rule::Scheme("rtsp", ContentType::Rtsp),
];

const NAME_RULES: &[Rule] = &[
    Rule::Contains(".mpd", ContentType::Dash),
    Rule::Contains(".m3u8", ContentType::Hls),
];

/// Classify a media URI. Never fails; empty input is `Progressive`.
pub fn classify(uri: &str) -> ContentType {
    let scheme = scheme_of(uri);
    for rule in SCHEME_RULES {
        if let Rule::Scheme(expected, content_type) = rule {
            if scheme == Some(*expected) {
                return *content_type;
            }
        }
    }
    infer_content_type(uri)
}

/// Filename-only sniff: manifest extensions anywhere in the lower-cased name.
pub fn infer_content_type(name: &str) -> ContentType {
    let lower = name.to_lowercase();
    for rule in NAME_RULES {
        if let Rule::Contains(needle, content_type) = rule {
            if lower.contains(needle) {
                return *content_type;
            }
        }
    }
    ContentType::Progressive
}

/// Scheme component of `uri`, as written.
///
/// A scheme is the text before the first `:` when it starts with a letter,
/// uses only `ALPHA / DIGIT / + / - / .`, and no `/`, `?` or `#` comes first.
/// A Windows drive path (`C:\...`) has no scheme.
pub fn scheme_of(uri: &str) -> Option<&str> {
    if is_drive_path(uri) {
        return None;
    }
    let end = uri.find(':')?;
    let candidate = &uri[..end];
    let mut chars = candidate.chars();
    let first = chars.next()?;
    if !first.is_ascii_alphabetic() {
        return None;
    }
    if chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')) {
        Some(candidate)
    } else {
        None
    }
}

/// `C:\...` or `C:/...`.
pub fn is_drive_path(uri: &str) -> bool {
    let bytes = uri.as_bytes();
    bytes.len() >= 3
        && bytes[0].is_ascii_alphabetic()
        && bytes[1] == b':'
        && matches!(bytes[2], b'\\' | b'/')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheme_extraction() {
        assert_eq!(scheme_of("rtmp://live.example.com/app"), Some("rtmp"));
        assert_eq!(scheme_of("HTTP://example.com"), Some("HTTP"));
        assert_eq!(scheme_of("/sdcard/movie.mp4"), None);
        assert_eq!(scheme_of("dir/a:b"), None);
        assert_eq!(scheme_of("1abc://x"), None);
        assert_eq!(scheme_of(""), None);
    }

    #[test]
    fn test_streaming_protocols() {
        assert_eq!(classify("rtmp://live.example.com/app/stream"), ContentType::Rtmp);
        assert_eq!(classify("rtsp://cam.local:554/stream1"), ContentType::Rtsp);
        // Scheme wins over manifest extensions
        assert_eq!(classify("rtsp://cam.local/index.m3u8"), ContentType::Rtsp);
        assert!(ContentType::Rtmp.is_streaming_protocol());
        assert!(!ContentType::Hls.is_streaming_protocol());
    }

    #[test]
    fn test_scheme_match_is_exact() {
        assert_eq!(classify("RTMP://live.example.com/app"), ContentType::Progressive);
        assert_eq!(classify("rtmps://live.example.com/app"), ContentType::Progressive);
    }

    #[test]
    fn test_manifest_sniffing() {
        assert_eq!(classify("https://cdn.example.com/a/manifest.mpd"), ContentType::Dash);
        assert_eq!(classify("https://cdn.example.com/a/INDEX.M3U8"), ContentType::Hls);
        assert_eq!(
            classify("https://cdn.example.com/play?src=master.m3u8&t=1"),
            ContentType::Hls
        );
        // .mpd is checked first
        assert_eq!(
            classify("https://cdn.example.com/x.mpd?alt=y.m3u8"),
            ContentType::Dash
        );
        assert_eq!(classify("https://cdn.example.com/movie.mp4"), ContentType::Progressive);
        assert_eq!(classify(""), ContentType::Progressive);
    }

    #[test]
    fn test_infer_content_type_ignores_scheme() {
        assert_eq!(infer_content_type("rtmp://x/live.m3u8"), ContentType::Hls);
        assert_eq!(infer_content_type("clip.webm"), ContentType::Progressive);
    }

    #[test]
    fn test_display_and_serde() {
        assert_eq!(ContentType::Dash.to_string(), "dash");
        let json = serde_json::to_string(&ContentType::Progressive).unwrap();
        assert_eq!(json, "\"progressive\"");
    }
}
