use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use url::Url;

const MAX_STEM_LEN: usize = 50;
const DEFAULT_EXTENSION: &str = ".jpg";

static NON_ALNUM: Lazy<Regex> = Lazy::new(|| Regex::new("[^a-z0-9]+").unwrap());

static LAST_TOKEN: AtomicU64 = AtomicU64::new(0);

/// Wall-clock milliseconds, bumped past the previous token when the clock
/// has not moved so names stay distinct within a process
fn uniqueness_token() -> u64 {
    let now = Utc::now().timestamp_millis().max(0) as u64;
    let previous = match LAST_TOKEN.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
        Some(now.max(last + 1))
    }) {
        Ok(previous) | Err(previous) => previous,
    };
    now.max(previous + 1)
}

/// Derive a filesystem-safe, unique file name from an image URL.
///
/// `https://img.example.com/ad/Photo 1.JPG?rule=large` becomes
/// `photo-1-<millis>.jpg`. Never fails: unparseable URLs get
/// `image-<millis>.jpg`.
pub fn image_file_name(image_url: &str) -> String {
    let token = uniqueness_token();

    let Ok(url) = Url::parse(image_url) else {
        return format!("image-{token}{DEFAULT_EXTENSION}");
    };

    let segment = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or_default();
    let (name, ext) = split_extension(segment);

    let stem = clean_stem(name);
    let stem = if stem.is_empty() { "image" } else { stem.as_str() };

    let extension = clean_extension(ext)
        .or_else(|| {
            url.query_pairs()
                .find(|(key, _)| key == "format")
                .and_then(|(_, value)| clean_extension(&value))
        })
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string());

    format!("{stem}-{token}{extension}")
}

/// Split a path segment like `path.parse` would: a leading dot is part of the name
fn split_extension(segment: &str) -> (&str, &str) {
    let path = Path::new(segment);
    match (
        path.file_stem().and_then(|s| s.to_str()),
        path.extension().and_then(|s| s.to_str()),
    ) {
        (Some(stem), Some(ext)) => (stem, ext),
        _ => (segment, ""),
    }
}

fn clean_stem(name: &str) -> String {
    let lowered = name.to_lowercase();
    let dashed = NON_ALNUM.replace_all(&lowered, "-");
    let trimmed: String = dashed.trim_matches('-').chars().take(MAX_STEM_LEN).collect();
    trimmed.trim_end_matches('-').to_string()
}

fn clean_extension(ext: &str) -> Option<String> {
    let cleaned: String = ext
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect();
    (!cleaned.is_empty()).then(|| format!(".{cleaned}"))
}
