//! Sexagesimal coordinate decoding.
//!
//! AEMET encodes station positions as `DDMMSS` followed by an orientation
//! letter, e.g. `425432N` for 42°54'32" north.

use crate::normalize::error::FormatError;

const ENCODED_LEN: usize = 7;

/// Converts an AEMET coordinate string into signed decimal degrees.
///
/// North and east are positive, south and west negative.
///
/// # Errors
///
/// Returns [`FormatError::InvalidCoordinate`] if the input is not six digits
/// followed by one of `N`, `S`, `E`, `W`, or if the decoded value falls outside
/// the valid latitude (N/S) or longitude (E/W) range.
///
/// # Examples
///
/// ```
/// use aemet_clima::normalize::coordinates::decode;
///
/// let lat = decode("425432N").unwrap();
/// assert!((lat - 42.9089).abs() < 1e-3);
/// assert!(decode("0043W").is_err());
/// ```
pub fn decode(raw: &str) -> Result<f64, FormatError> {
    let raw = raw.trim();
    let invalid = |reason| FormatError::InvalidCoordinate {
        value: raw.to_string(),
        reason,
    };

    if raw.len() != ENCODED_LEN || !raw.is_ascii() {
        return Err(invalid("expected six digits followed by an orientation letter"));
    }
    let (digits, orientation) = raw.split_at(ENCODED_LEN - 1);
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid("degrees, minutes and seconds must be digits"));
    }

    let (sign, limit) = match orientation {
        "N" => (1.0, 90.0),
        "S" => (-1.0, 90.0),
        "E" => (1.0, 180.0),
        "W" => (-1.0, 180.0),
        _ => return Err(invalid("orientation must be one of N, S, E or W")),
    };

    let bytes = digits.as_bytes();
    let pair = |i: usize| f64::from((bytes[i] - b'0') * 10 + (bytes[i + 1] - b'0'));
    let magnitude = pair(0) + pair(2) / 60.0 + pair(4) / 3600.0;

    if magnitude > limit {
        return Err(invalid("value is outside the valid range"));
    }
    Ok(sign * magnitude)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_north() {
        let value = decode("425432N").unwrap();
        assert!((value - 42.9089).abs() < 1e-3, "got {}", value);
    }

    #[test]
    fn test_orientation_signs() {
        assert!(decode("013000N").unwrap() > 0.0);
        assert!(decode("013000E").unwrap() > 0.0);
        assert!(decode("013000S").unwrap() < 0.0);
        assert!(decode("013000W").unwrap() < 0.0);
        assert_eq!(decode("013000W").unwrap(), -1.5);
    }

    #[test]
    fn test_wrong_length_is_rejected() {
        assert!(matches!(
            decode("0043W"),
            Err(FormatError::InvalidCoordinate { .. })
        ));
    }

    #[test]
    fn test_bad_orientation_and_digits() {
        assert!(decode("425432X").is_err());
        assert!(decode("42a432N").is_err());
        assert!(decode("42543é").is_err());
    }

    #[test]
    fn test_latitude_out_of_range() {
        assert!(decode("950000N").is_err());
        assert!(decode("950000E").is_ok());
    }
}
