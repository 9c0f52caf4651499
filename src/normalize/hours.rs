//! Hour-of-extreme decoding.
//!
//! AEMET reports the time of the daily maximum/minimum as `"HH:MM"`, a bare
//! hour, `"24"` for end of day, or `"-1"` when it happened at several times.

use chrono::NaiveTime;

/// Marker for "varies" (`"-1"`). One second off midnight so it never collides
/// with a real `00:00` reading.
pub fn varies_marker() -> Option<NaiveTime> {
    NaiveTime::from_hms_opt(0, 0, 59)
}

/// Decodes a provider hour field. Returns `None` for anything that isn't a
/// valid time of day.
///
/// ```
/// use aemet_clima::normalize::hours::normalize;
/// use chrono::NaiveTime;
///
/// assert_eq!(normalize(Some("9")), NaiveTime::from_hms_opt(9, 0, 0));
/// assert_eq!(normalize(Some("25")), None);
/// ```
pub fn normalize(value: Option<&str>) -> Option<NaiveTime> {
    match value?.trim() {
        "-1" => varies_marker(),
        "24" => NaiveTime::from_hms_opt(0, 0, 0),
        v if v.contains(':') => {
            let (hour, minute) = v.split_once(':')?;
            NaiveTime::from_hms_opt(parse_digits(hour)?, parse_digits(minute)?, 0)
        }
        v => NaiveTime::from_hms_opt(parse_digits(v)?, 0, 0),
    }
}

fn parse_digits(value: &str) -> Option<u32> {
    if value.is_empty() || value.len() > 2 || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    value.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hms(h: u32, m: u32, s: u32) -> Option<NaiveTime> {
        NaiveTime::from_hms_opt(h, m, s)
    }

    #[test]
    fn test_sentinels() {
        assert_eq!(normalize(Some("24")), hms(0, 0, 0));
        assert_eq!(normalize(Some("-1")), hms(0, 0, 59));
        assert_ne!(normalize(Some("-1")), normalize(Some("24")));
    }

    #[test]
    fn test_colon_form() {
        assert_eq!(normalize(Some("13:45")), hms(13, 45, 0));
        assert_eq!(normalize(Some("13:61")), None);
        assert_eq!(normalize(Some("24:00")), None);
        assert_eq!(normalize(Some("ab:10")), None);
    }

    #[test]
    fn test_bare_hour() {
        assert_eq!(normalize(Some("9")), hms(9, 0, 0));
        assert_eq!(normalize(Some("09")), hms(9, 0, 0));
        assert_eq!(normalize(Some("25")), None);
    }

    #[test]
    fn test_other_shapes_are_missing() {
        assert_eq!(normalize(None), None);
        assert_eq!(normalize(Some("")), None);
        assert_eq!(normalize(Some("Varias")), None);
        assert_eq!(normalize(Some("-3")), None);
    }
}
