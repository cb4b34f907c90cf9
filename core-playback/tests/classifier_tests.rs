//! Classification of media URIs into demux families.

use core_playback::classifier::{classify, infer_content_type, scheme_of};
use core_playback::ContentType;

#[test]
fn test_classification_table() {
    let cases = [
        ("rtmp://live.example.com/app/stream", ContentType::Rtmp),
        ("rtsp://192.168.1.10:554/h264", ContentType::Rtsp),
        ("https://cdn.example.com/vod/manifest.mpd", ContentType::Dash),
        ("https://cdn.example.com/hls/master.m3u8", ContentType::Hls),
        ("https://cdn.example.com/hls/master.m3u8?token=abc", ContentType::Hls),
        ("https://cdn.example.com/movie.mp4", ContentType::Progressive),
        ("file:///sdcard/Movies/clip.mkv", ContentType::Progressive),
        ("/var/media/clip.webm", ContentType::Progressive),
        ("", ContentType::Progressive),
    ];

    for (uri, expected) in cases {
        assert_eq!(classify(uri), expected, "classifying {:?}", uri);
    }
}

#[test]
fn test_scheme_wins_over_extension() {
    assert_eq!(classify("rtmp://edge.example.com/live/index.m3u8"), ContentType::Rtmp);
    assert_eq!(classify("rtsp://cam.local/stream.mpd"), ContentType::Rtsp);
}

#[test]
fn test_scheme_comparison_is_exact() {
    // Only the lower-case schemes select the native transports
    assert_eq!(classify("RTMP://live.example.com/app"), ContentType::Progressive);
    assert_eq!(classify("Rtsp://cam.local/stream"), ContentType::Progressive);
}

#[test]
fn test_extension_match_ignores_case() {
    assert_eq!(classify("HTTPS://CDN.EXAMPLE.COM/VOD/MANIFEST.MPD"), ContentType::Dash);
    assert_eq!(classify("https://cdn.example.com/Master.M3U8"), ContentType::Hls);
}

#[test]
fn test_dash_checked_before_hls() {
    assert_eq!(
        classify("https://cdn.example.com/a.mpd?fallback=b.m3u8"),
        ContentType::Dash
    );
}

#[test]
fn test_infer_from_file_name() {
    assert_eq!(infer_content_type("stream.m3u8"), ContentType::Hls);
    assert_eq!(infer_content_type("movie.MP4"), ContentType::Progressive);
}

#[test]
fn test_scheme_of() {
    assert_eq!(scheme_of("https://a/b"), Some("https"));
    assert_eq!(scheme_of("/abs/path:with-colon"), None);
    assert_eq!(scheme_of("no-scheme-here"), None);
    assert_eq!(scheme_of(r"C:\Videos\clip.mp4"), None);
    assert_eq!(scheme_of("d:/videos/clip.mp4"), None);
}

#[test]
fn test_content_type_flags() {
    assert!(ContentType::Rtmp.is_streaming_protocol());
    assert!(!ContentType::Hls.is_streaming_protocol());
    assert_eq!(ContentType::Progressive.to_string(), "progressive");
}
