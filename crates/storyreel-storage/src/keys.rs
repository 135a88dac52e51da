//! Shared key generation for storage backends.
//!
//! Single artifacts live at `{prefix}/{category}/{id}.{ext}`; streamed media share a
//! folder, `{prefix}/{category}/{id}/{file_name}`, so the playlist's relative segment
//! references stay valid once stored.

use crate::traits::{StorageError, StorageResult};
use storyreel_core::MediaCategory;
use url::Url;

const MAX_NAME_LEN: usize = 255;
const MAX_ID_LEN: usize = 128;

/// Trim slashes from a destination prefix and reject traversal or empty segments.
pub fn normalize_prefix(prefix: &str) -> StorageResult<String> {
    let trimmed = prefix.trim().trim_matches('/');
    if trimmed.is_empty() {
        return Err(StorageError::InvalidKey(
            "Destination prefix must not be empty".to_string(),
        ));
    }
    if trimmed.split('/').any(|seg| seg.is_empty() || seg == "." || seg == "..") {
        return Err(StorageError::InvalidKey(format!(
            "Destination prefix contains an invalid segment: {}",
            prefix
        )));
    }
    if trimmed.contains("..") || trimmed.contains('\\') {
        return Err(StorageError::InvalidKey(format!(
            "Destination prefix contains invalid characters: {}",
            prefix
        )));
    }
    Ok(trimmed.to_string())
}

/// Flatten an arbitrary file name into a safe single path component.
///
/// Only the base name is kept. ASCII alphanumerics plus `.`, `-` and `_` survive, all
/// other characters become `_`. Names containing `..` become `invalid_filename`, names
/// shorter than three characters become `file`. The result is at most 255 bytes.
pub fn sanitize_file_name(file_name: &str) -> String {
    let base = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(file_name);
    if base.contains("..") {
        return "invalid_filename".to_string();
    }
    let s: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if s.trim().is_empty() || s.len() < 3 {
        "file".to_string()
    } else {
        fit_file_name(&s, MAX_NAME_LEN)
    }
}

/// Shorten a sanitized name to at most `max_len` bytes, keeping its extension when
/// the extension itself fits.
pub fn fit_file_name(sanitized: &str, max_len: usize) -> String {
    if sanitized.len() <= max_len {
        return sanitized.to_string();
    }
    let (stem, ext) = match sanitized.rfind('.') {
        Some(dot) if dot > 0 && sanitized.len() - dot < max_len => sanitized.split_at(dot),
        _ => (sanitized, ""),
    };
    let keep = max_len - ext.len();
    let stem: String = stem.chars().take(keep).collect();
    format!("{}{}", stem, ext)
}

/// Sanitize a caller-chosen object id. Dots are replaced so the id never carries an
/// extension of its own. Returns `None` when nothing usable remains.
pub fn sanitize_object_id(name: &str) -> Option<String> {
    let s: String = name
        .trim()
        .chars()
        .take(MAX_ID_LEN)
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if s.chars().all(|c| c == '_') {
        None
    } else {
        Some(s)
    }
}

/// Key of a single stored artifact.
pub fn single_object_key(
    prefix: &str,
    category: MediaCategory,
    id: &str,
    extension: Option<&str>,
) -> String {
    match extension.filter(|e| !e.is_empty()) {
        Some(ext) => format!("{}/{}/{}.{}", prefix, category.as_str(), id, ext),
        None => format!("{}/{}/{}", prefix, category.as_str(), id),
    }
}

/// Key of one file (playlist or segment) inside a streamed media folder.
pub fn streamed_object_key(
    prefix: &str,
    category: MediaCategory,
    id: &str,
    file_name: &str,
) -> String {
    format!("{}/{}/{}/{}", prefix, category.as_str(), id, file_name)
}

/// Reject keys that could escape the store's namespace.
pub fn validate_key(storage_key: &str) -> StorageResult<()> {
    if storage_key.is_empty() {
        return Err(StorageError::InvalidKey("Storage key is empty".to_string()));
    }
    if storage_key.contains("..") || storage_key.starts_with('/') || storage_key.contains("//")
    {
        return Err(StorageError::InvalidKey(
            "Storage key contains invalid characters".to_string(),
        ));
    }
    Ok(())
}

/// Extract the storage key from `url`, which must live under `base_url`.
///
/// Scheme, host and port must match, and the URL path must start with the base path.
/// The remainder is percent-decoded and validated.
pub fn key_from_public_url(base_url: &str, url: &str) -> StorageResult<String> {
    let base = Url::parse(base_url)
        .map_err(|e| StorageError::ConfigError(format!("Invalid storage base URL: {}", e)))?;
    let parsed =
        Url::parse(url).map_err(|e| StorageError::InvalidKey(format!("Malformed URL: {}", e)))?;

    if parsed.scheme() != base.scheme()
        || parsed.host_str() != base.host_str()
        || parsed.port_or_known_default() != base.port_or_known_default()
    {
        return Err(StorageError::InvalidKey(format!(
            "URL does not belong to this store: {}",
            url
        )));
    }

    let base_path = base.path().trim_end_matches('/');
    let rest = parsed
        .path()
        .strip_prefix(base_path)
        .and_then(|p| p.strip_prefix('/'))
        .ok_or_else(|| {
            StorageError::InvalidKey(format!("URL does not belong to this store: {}", url))
        })?;

    let key = urlencoding::decode(rest)
        .map_err(|e| StorageError::InvalidKey(format!("Invalid URL encoding: {}", e)))?
        .into_owned();
    validate_key(&key)?;
    Ok(key)
}

/// Last path component of a key and its lowercase extension.
pub fn split_key_file_name(storage_key: &str) -> (String, Option<String>) {
    let file_name = storage_key.rsplit('/').next().unwrap_or(storage_key).to_string();
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .filter(|ext| !ext.is_empty());
    (file_name, extension)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_is_trimmed_and_checked() {
        assert_eq!(normalize_prefix("/story/").unwrap(), "story");
        assert_eq!(normalize_prefix("users/42/story").unwrap(), "users/42/story");
        assert!(normalize_prefix("").is_err());
        assert!(normalize_prefix("///").is_err());
        assert!(normalize_prefix("story/../secrets").is_err());
        assert!(normalize_prefix("story//x").is_err());
    }

    #[test]
    fn sanitize_file_name_flattens_paths() {
        assert_eq!(sanitize_file_name("my photo (1).png"), "my_photo__1_.png");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("a..b.png"), "invalid_filename");
        assert_eq!(sanitize_file_name("x"), "file");
    }

    #[test]
    fn long_names_are_shortened_around_the_extension() {
        let long = format!("{}.png", "a".repeat(300));
        let fitted = fit_file_name(&sanitize_file_name(&long), 200);
        assert_eq!(fitted.len(), 200);
        assert!(fitted.ends_with("a.png"));

        let sanitized = sanitize_file_name(&long);
        assert_eq!(sanitized.len(), MAX_NAME_LEN);
        assert!(sanitized.ends_with(".png"));

        assert_eq!(fit_file_name("short.png", 200), "short.png");
        assert_eq!(fit_file_name("abcdef", 4), "abcd");
        assert_eq!(fit_file_name("a.verylongextension", 6), "a.very");
    }

    #[test]
    fn object_id_drops_dots() {
        assert_eq!(sanitize_object_id("cover.final").as_deref(), Some("cover_final"));
        assert_eq!(sanitize_object_id("..."), None);
        assert_eq!(sanitize_object_id("  "), None);
    }

    #[test]
    fn keys_follow_layout() {
        assert_eq!(
            single_object_key("story", MediaCategory::Image, "abc", Some("jpg")),
            "story/image/abc.jpg"
        );
        assert_eq!(
            single_object_key("story", MediaCategory::DocumentFallback, "abc", None),
            "story/document/abc"
        );
        assert_eq!(
            streamed_object_key("story", MediaCategory::Video, "abc", "index.m3u8"),
            "story/video/abc/index.m3u8"
        );
    }

    #[test]
    fn key_round_trips_through_public_url() {
        let base = "https://stories.s3.eu-west-1.amazonaws.com";
        let key = key_from_public_url(base, &format!("{}/story/image/abc.jpg", base)).unwrap();
        assert_eq!(key, "story/image/abc.jpg");

        let encoded = key_from_public_url(base, &format!("{}/story/doc/a%20b.pdf", base)).unwrap();
        assert_eq!(encoded, "story/doc/a b.pdf");
    }

    #[test]
    fn key_from_url_respects_base_path() {
        let base = "http://localhost:9000/stories";
        assert_eq!(
            key_from_public_url(base, "http://localhost:9000/stories/story/audio/x/index.m3u8")
                .unwrap(),
            "story/audio/x/index.m3u8"
        );
        assert!(key_from_public_url(base, "http://localhost:9000/other/story/a.jpg").is_err());
        assert!(key_from_public_url(base, "http://localhost:9001/stories/story/a.jpg").is_err());
    }

    #[test]
    fn foreign_or_malformed_urls_are_rejected() {
        let base = "https://stories.s3.eu-west-1.amazonaws.com";
        assert!(matches!(
            key_from_public_url(base, "not a url"),
            Err(StorageError::InvalidKey(_))
        ));
        assert!(matches!(
            key_from_public_url(base, "https://evil.example.com/story/image/abc.jpg"),
            Err(StorageError::InvalidKey(_))
        ));
        assert!(key_from_public_url(base, base).is_err());
        assert!(key_from_public_url(base, &format!("{}/story/a%2E%2Eb/x", base)).is_err());
    }

    #[test]
    fn splits_file_name_and_extension() {
        let (name, ext) = split_key_file_name("story/video/abc/segment_001.TS");
        assert_eq!(name, "segment_001.TS");
        assert_eq!(ext.as_deref(), Some("ts"));
        let (name, ext) = split_key_file_name("story/document/abc");
        assert_eq!(name, "abc");
        assert_eq!(ext, None);
    }
}
