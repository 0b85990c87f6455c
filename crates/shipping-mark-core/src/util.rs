//! Utility functions shared across the crate.

use chrono::{DateTime, TimeZone};
use std::path::PathBuf;

/// Get the user's config directory following XDG conventions.
///
/// Returns `$XDG_CONFIG_HOME` if set, otherwise `$HOME/.config`.
pub fn config_dir() -> Option<PathBuf> {
    std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))
}

/// Download name for a combined document.
///
/// `shipping_mark_<display name>_<YYYYmmdd_HHMMSS>.pdf`
pub fn output_file_name<Tz: TimeZone>(display_name: &str, at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!(
        "shipping_mark_{}_{}.pdf",
        display_name,
        at.format("%Y%m%d_%H%M%S")
    )
}

/// Whether a template name is a plain file name (no directory components).
pub fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\'])
        && !name.contains('\0')
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_output_file_name() {
        let at = Utc.with_ymd_and_hms(2026, 2, 11, 9, 5, 3).single();
        let name = at.map(|at| output_file_name("Brazil", &at));
        assert_eq!(name.as_deref(), Some("shipping_mark_Brazil_20260211_090503.pdf"));
    }

    #[test]
    fn test_plain_file_names() {
        assert!(is_plain_file_name("mark.pdf"));
        assert!(!is_plain_file_name("../secret.pdf"));
        assert!(!is_plain_file_name("sub/mark.pdf"));
        assert!(!is_plain_file_name(""));
    }
}
