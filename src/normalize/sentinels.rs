//! Provider marker strings and text cleanup.

use std::borrow::Cow;

/// Precipitation too small to measure.
pub const INAPPRECIABLE: &str = "Ip";
/// Extreme reached at several hours.
pub const VARIOUS: &str = "Varias";
/// Value accumulated over several days, not attributable to one.
pub const ACCUMULATED: &str = "Acum";

/// Replaces a whole-cell marker in a measurement by the value it stands for.
///
/// `Ip` becomes `0.05`. `Varias` only means something for hour fields (see
/// [`replace_hour`]), so here it becomes missing like `Acum`. Any other value
/// is returned as is.
pub fn replace(value: &str) -> Option<&str> {
    match value.trim() {
        INAPPRECIABLE => Some("0.05"),
        VARIOUS | ACCUMULATED => None,
        _ => Some(value),
    }
}

/// Marker replacement for hour-of-extreme fields: `Varias` becomes `-1`, the
/// "several hours" code understood by [`crate::normalize::hours::normalize`].
pub fn replace_hour(value: &str) -> Option<&str> {
    match value.trim() {
        VARIOUS => Some("-1"),
        ACCUMULATED => None,
        _ => Some(value),
    }
}

/// Removes embedded newline characters.
pub fn strip_newlines(value: &str) -> Cow<'_, str> {
    if value.contains(['\n', '\r']) {
        Cow::Owned(value.replace(['\n', '\r'], ""))
    } else {
        Cow::Borrowed(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markers() {
        assert_eq!(replace("Ip"), Some("0.05"));
        assert_eq!(replace("Acum"), None);
        assert_eq!(replace("3,4"), Some("3,4"));
    }

    #[test]
    fn test_varias_is_hour_only() {
        assert_eq!(replace("Varias"), None);
        assert_eq!(replace_hour("Varias"), Some("-1"));
        assert_eq!(replace_hour("Acum"), None);
        assert_eq!(replace_hour("13:40"), Some("13:40"));
    }

    #[test]
    fn test_strip_newlines() {
        assert_eq!(strip_newlines("SAN\nSEBASTIAN"), "SANSEBASTIAN");
        assert!(matches!(strip_newlines("BILBAO"), Cow::Borrowed(_)));
    }
}
