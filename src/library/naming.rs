//! Filename derivation, validation and collision-free naming for library entries.
//!
//! Stored names carry a generation token (milliseconds since the Unix epoch)
//! before the extension: `clip.mp4` is stored as `clip_1700000000000.mp4`.
//! Removing the token gives the entry's canonical name, which is what
//! duplicate detection compares.

use std::path::{Component, Path};

use url::Url;

use super::error::LibraryError;

/// Extensions accepted for download and shown in listings.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["mp4", "avi", "mkv", "webm", "mov"];

/// Extension given to URLs whose last segment has none.
pub const DEFAULT_EXTENSION: &str = "mp4";

/// Tokens shorter than this are treated as part of the name (`clip_2024.mp4`).
const MIN_TOKEN_DIGITS: usize = 10;

/// Current generation token: milliseconds since the Unix epoch.
#[must_use]
pub fn timestamp_token() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

/// Splits `name` into stem and extension (without the dot).
///
/// Leading dots do not start an extension (`.hidden` has none).
#[must_use]
pub fn split_extension(name: &str) -> (&str, Option<&str>) {
    match name.rfind('.') {
        Some(pos) if pos > 0 && pos + 1 < name.len() => (&name[..pos], Some(&name[pos + 1..])),
        _ => (name, None),
    }
}

/// Returns true if `name` has one of the [`SUPPORTED_EXTENSIONS`].
#[must_use]
pub fn is_supported_media(name: &str) -> bool {
    split_extension(name)
        .1
        .is_some_and(|ext| SUPPORTED_EXTENSIONS.iter().any(|s| s.eq_ignore_ascii_case(ext)))
}

/// Checks URL syntax and the extension allowlist.
///
/// The URL must be absolute http(s) with a host. When the last path segment
/// has an extension it must be supported; a segment with none is accepted
/// and later stored as `.mp4`.
///
/// # Errors
///
/// Returns [`LibraryError::Validation`] describing the first failed check.
pub fn validate_download_url(raw: &str) -> Result<Url, LibraryError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(LibraryError::validation(raw, "URL is empty"));
    }
    let url = Url::parse(trimmed).map_err(|e| LibraryError::validation(raw, e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(LibraryError::validation(
            raw,
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(LibraryError::validation(raw, "URL has no host"));
    }

    if let Some(segment) = last_segment(&url)
        && let (_, Some(ext)) = split_extension(&segment)
        && !SUPPORTED_EXTENSIONS.iter().any(|s| s.eq_ignore_ascii_case(ext))
    {
        return Err(LibraryError::validation(
            raw,
            format!(
                "unsupported extension '.{ext}' (expected one of: {})",
                SUPPORTED_EXTENSIONS.join(", ")
            ),
        ));
    }

    Ok(url)
}

/// Derives the canonical filename for a download, before any token is added.
///
/// Uses the URL's last path segment (query and fragment are never part of
/// it), percent-decoded and sanitized. Falls back to `video_<token>.mp4`.
#[must_use]
pub fn derive_base_name(url: &Url, token: u64) -> String {
    let Some(segment) = last_segment(url) else {
        return format!("video_{token}.{DEFAULT_EXTENSION}");
    };

    let sanitized = sanitize_filename(&segment);
    let (stem, ext) = split_extension(&sanitized);
    let stem = stem.trim_matches('_');
    if stem.is_empty() {
        return format!("video_{token}.{DEFAULT_EXTENSION}");
    }
    let ext = ext.map_or_else(|| DEFAULT_EXTENSION.to_string(), str::to_ascii_lowercase);
    format!("{stem}.{ext}")
}

/// Inserts `token` before the extension: `clip.mp4` → `clip_<token>.mp4`.
#[must_use]
pub fn stamp_file_name(base_name: &str, token: u64) -> String {
    match split_extension(base_name) {
        (stem, Some(ext)) => format!("{stem}_{token}.{ext}"),
        (stem, None) => format!("{stem}_{token}"),
    }
}

/// Stamps `base_name`, bumping the token until `is_taken` reports a free name.
pub fn unique_stamped_name<F>(base_name: &str, token: u64, is_taken: F) -> String
where
    F: Fn(&str) -> bool,
{
    let mut token = token;
    loop {
        let candidate = stamp_file_name(base_name, token);
        if !is_taken(&candidate) {
            return candidate;
        }
        token = token.wrapping_add(1);
    }
}

/// Removes the generation token from a stored name: `clip_1700000000000.mp4` → `clip.mp4`.
///
/// Names without a token come back unchanged.
#[must_use]
pub fn canonical_name(stored_name: &str) -> String {
    let (stem, ext) = split_extension(stored_name);
    let Some((prefix, token)) = stem.rsplit_once('_') else {
        return stored_name.to_string();
    };
    let is_token = token.len() >= MIN_TOKEN_DIGITS && token.bytes().all(|b| b.is_ascii_digit());
    if !is_token || prefix.is_empty() {
        return stored_name.to_string();
    }
    match ext {
        Some(ext) => format!("{prefix}.{ext}"),
        None => prefix.to_string(),
    }
}

fn last_segment(url: &Url) -> Option<String> {
    let last = url.path_segments()?.next_back()?;
    if last.is_empty() {
        return None;
    }
    let decoded = urlencoding::decode(last).map_or_else(|_| last.to_string(), |d| d.into_owned());
    Some(decoded)
}

/// Sanitizes a filename for storage.
///
/// Replaces separators, characters invalid on common file systems, control
/// characters and whitespace with `_`.
pub(crate) fn sanitize_filename(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() || c.is_whitespace() => '_',
            c => c,
        })
        .collect();

    if sanitized.is_empty() {
        return "_".to_string();
    }

    if is_safe_filename_segment(&sanitized) {
        sanitized
    } else {
        sanitized
            .chars()
            .map(|c| if c == '.' { '_' } else { c })
            .collect()
    }
}

fn is_safe_filename_segment(name: &str) -> bool {
    !Path::new(name).components().any(|component| {
        matches!(
            component,
            Component::CurDir | Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    })
}
