//! Comma-decimal to dot-decimal rewriting.

use std::borrow::Cow;

/// Rewrites every comma that sits directly between two ASCII digits into a dot.
///
/// Commas anywhere else are left alone, so free text passes through untouched.
/// Returns the input borrowed when nothing needs rewriting.
pub fn normalize_str(value: &str) -> Cow<'_, str> {
    let bytes = value.as_bytes();
    let is_decimal_comma = |i: usize| {
        bytes[i] == b','
            && i > 0
            && bytes[i - 1].is_ascii_digit()
            && bytes.get(i + 1).is_some_and(u8::is_ascii_digit)
    };

    if !(0..bytes.len()).any(is_decimal_comma) {
        return Cow::Borrowed(value);
    }

    let mut out = String::with_capacity(value.len());
    for (i, c) in value.char_indices() {
        if is_decimal_comma(i) {
            out.push('.');
        } else {
            out.push(c);
        }
    }
    Cow::Owned(out)
}

/// Optional variant of [`normalize_str`]; a missing value stays missing.
///
/// ```
/// use aemet_clima::normalize::decimal::normalize;
///
/// assert_eq!(normalize(Some("12,5")).as_deref(), Some("12.5"));
/// assert_eq!(normalize(None), None);
/// ```
pub fn normalize(value: Option<&str>) -> Option<String> {
    value.map(|v| normalize_str(v).into_owned())
}
