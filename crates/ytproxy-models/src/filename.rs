//! Attachment filename sanitization.

use crate::format::MediaFormat;
use crate::video::VideoId;

/// Maximum length of the basename (without extension).
const MAX_BASENAME_LEN: usize = 80;

/// Reduce a video title to a filesystem- and header-safe basename.
///
/// Keeps ASCII alphanumerics, collapses everything else into single
/// underscores, and caps the length. Returns `None` when nothing safe
/// remains (all-symbol titles, empty input).
fn sanitize_title(title: &str) -> Option<String> {
    let mut out = String::with_capacity(title.len().min(MAX_BASENAME_LEN));
    let mut last_was_sep = true;
    for c in title.chars() {
        if out.len() >= MAX_BASENAME_LEN {
            break;
        }
        if c.is_ascii_alphanumeric() {
            out.push(c);
            last_was_sep = false;
        } else if !last_was_sep {
            out.push('_');
            last_was_sep = true;
        }
    }
    let trimmed = out.trim_matches('_');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Build the `Content-Disposition` attachment filename for a download.
///
/// Prefers the (sanitized) title; falls back to the video id, which is
/// already restricted to a safe alphabet.
pub fn attachment_filename(title: Option<&str>, id: &VideoId, format: MediaFormat) -> String {
    let base = title
        .and_then(sanitize_title)
        .unwrap_or_else(|| id.as_str().to_string());
    format!("{}.{}", base, format.extension())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id() -> VideoId {
        VideoId::parse("dQw4w9WgXcQ").unwrap()
    }

    #[test]
    fn sanitizes_titles_to_safe_subset() {
        assert_eq!(
            attachment_filename(Some("Rick Astley - Never Gonna Give You Up"), &id(), MediaFormat::Mp3),
            "Rick_Astley_Never_Gonna_Give_You_Up.mp3"
        );
        // Header-breaking and path characters are stripped
        assert_eq!(
            attachment_filename(Some("a\"b/c\\d\r\ne;f"), &id(), MediaFormat::Mp4),
            "a_b_c_d_e_f.mp4"
        );
        // Non-ASCII collapses rather than passing through
        assert_eq!(
            attachment_filename(Some("café déjà vu"), &id(), MediaFormat::Mp3),
            "caf_d_j_vu.mp3"
        );
    }

    #[test]
    fn falls_back_to_id() {
        assert_eq!(
            attachment_filename(None, &id(), MediaFormat::Mp4),
            "dQw4w9WgXcQ.mp4"
        );
        assert_eq!(
            attachment_filename(Some("!!!"), &id(), MediaFormat::Mp3),
            "dQw4w9WgXcQ.mp3"
        );
        assert_eq!(
            attachment_filename(Some(""), &id(), MediaFormat::Mp3),
            "dQw4w9WgXcQ.mp3"
        );
    }

    #[test]
    fn caps_basename_length() {
        let long = "x".repeat(500);
        let name = attachment_filename(Some(&long), &id(), MediaFormat::Mp4);
        assert!(name.len() <= MAX_BASENAME_LEN + 4);
        assert!(name.ends_with(".mp4"));
    }
}
