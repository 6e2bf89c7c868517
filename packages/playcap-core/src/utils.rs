//! General utilities shared across the crate.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, TimeZone};

use crate::protocol_constants::WAV_EXTENSION;

// ─────────────────────────────────────────────────────────────────────────────
// Time Utilities
// ─────────────────────────────────────────────────────────────────────────────

/// Returns the current Unix timestamp in milliseconds.
///
/// Returns 0 if the system clock is before the Unix epoch (shouldn't happen in practice).
#[must_use]
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

// ─────────────────────────────────────────────────────────────────────────────
// Capture File Naming
// ─────────────────────────────────────────────────────────────────────────────

/// Returns the file name for a capture started at `started_at`.
///
/// Format: `YYYY-MM-DD-HH-MM-SS.wav` (24-hour clock), so captures sort
/// chronologically by name.
#[must_use]
pub fn capture_file_name<Tz: TimeZone>(started_at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!(
        "{}.{}",
        started_at.format("%Y-%m-%d-%H-%M-%S"),
        WAV_EXTENSION
    )
}

/// Returns `dir/name`, or `dir/stem-N.ext` for the first `N` where
/// `exists` reports no collision.
///
/// Two sessions started within the same second would otherwise share a
/// timestamped name.
pub fn unique_path(dir: &Path, name: &str, exists: impl Fn(&Path) -> bool) -> PathBuf {
    let candidate = dir.join(name);
    if !exists(&candidate) {
        return candidate;
    }

    let (stem, ext) = match name.rsplit_once('.') {
        Some((stem, ext)) => (stem, Some(ext)),
        None => (name, None),
    };

    (1u32..)
        .map(|n| match ext {
            Some(ext) => dir.join(format!("{stem}-{n}.{ext}")),
            None => dir.join(format!("{stem}-{n}")),
        })
        .find(|path| !exists(path))
        .unwrap_or(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Utc};

    #[test]
    fn now_millis_is_after_2020() {
        assert!(now_millis() > 1_577_836_800_000);
    }

    #[test]
    fn capture_file_name_uses_24_hour_timestamp() {
        let started_at = Utc.with_ymd_and_hms(2024, 3, 9, 17, 5, 42).unwrap();
        assert_eq!(capture_file_name(&started_at), "2024-03-09-17-05-42.wav");
    }

    #[test]
    fn capture_file_name_uses_local_offset_time() {
        let offset = FixedOffset::east_opt(9 * 3600).unwrap();
        let started_at = offset.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(capture_file_name(&started_at), "2024-01-01-00-00-00.wav");
    }

    #[test]
    fn unique_path_returns_name_when_free() {
        let path = unique_path(Path::new("/captures"), "a.wav", |_| false);
        assert_eq!(path, PathBuf::from("/captures/a.wav"));
    }

    #[test]
    fn unique_path_appends_counter_on_collision() {
        let taken = [
            PathBuf::from("/captures/a.wav"),
            PathBuf::from("/captures/a-1.wav"),
        ];
        let path = unique_path(Path::new("/captures"), "a.wav", |p| taken.iter().any(|t| t == p));
        assert_eq!(path, PathBuf::from("/captures/a-2.wav"));
    }
}
