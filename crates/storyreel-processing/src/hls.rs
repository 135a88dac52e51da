//! Minimal HLS media playlist reading.

/// Playlist file name written by the segmenter.
pub const PLAYLIST_FILE_NAME: &str = "index.m3u8";
/// Segment file pattern handed to the encoder.
pub const SEGMENT_PATTERN: &str = "segment_%03d.ts";

/// Segment URIs of a media playlist, in playlist order.
///
/// Every non-empty line that is not a tag or comment is a URI.
pub fn parse_segment_uris(playlist: &str) -> Vec<String> {
    playlist
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Whether a segment URI is a plain relative file name inside the playlist's folder.
pub fn is_local_segment_uri(uri: &str) -> bool {
    !uri.is_empty()
        && !uri.contains('/')
        && !uri.contains('\\')
        && !uri.contains("..")
        && !uri.contains("://")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_segments_in_order() {
        let playlist = "#EXTM3U\n#EXT-X-VERSION:3\n#EXT-X-TARGETDURATION:15\n\
                        #EXTINF:15.000000,\nsegment_000.ts\n\n#EXTINF:4.2,\r\nsegment_001.ts\r\n\
                        #EXT-X-ENDLIST\n";
        assert_eq!(
            parse_segment_uris(playlist),
            vec!["segment_000.ts".to_string(), "segment_001.ts".to_string()]
        );
    }

    #[test]
    fn empty_playlist_has_no_segments() {
        assert!(parse_segment_uris("#EXTM3U\n#EXT-X-ENDLIST\n").is_empty());
        assert!(parse_segment_uris("").is_empty());
    }

    #[test]
    fn only_plain_file_names_are_local() {
        assert!(is_local_segment_uri("segment_000.ts"));
        assert!(!is_local_segment_uri("../segment_000.ts"));
        assert!(!is_local_segment_uri("sub/segment_000.ts"));
        assert!(!is_local_segment_uri("https://cdn/x.ts"));
    }
}
