//! License key duration parsing.
//!
//! A key may encode a validity window in its structure:
//! `<PREFIX>-<N>D-<rest>`, e.g. `HAMSTER-30D-ABC123` is valid for 30 days
//! from first activation. Keys that do not match the pattern are perpetual
//! as far as this parser is concerned.

/// Extract the duration-in-days encoded in a license key, if any.
///
/// Matching is case-insensitive. Returns `None` when the prefix does not
/// match, the duration segment is missing its `D` suffix, or the number
/// is not a positive integer.
pub fn parse_duration_days(key: &str, prefix: &str) -> Option<u32> {
    let mut segments = key.splitn(3, '-');

    let head = segments.next()?;
    if !head.eq_ignore_ascii_case(prefix) {
        return None;
    }

    let duration = segments.next()?;
    // Require at least one digit and a trailing D/d.
    if duration.len() < 2 {
        return None;
    }
    let (digits, suffix) = duration.split_at(duration.len() - 1);
    if !suffix.eq_ignore_ascii_case("D") {
        return None;
    }
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    // Key must have a non-empty tail segment after the duration.
    if segments.next()?.is_empty() {
        return None;
    }

    digits.parse::<u32>().ok().filter(|days| *days > 0)
}

#[cfg(test)]
mod tests {
    use super::parse_duration_days;

    #[test]
    fn parses_standard_key() {
        assert_eq!(parse_duration_days("HAMSTER-30D-ABC123", "HAMSTER"), Some(30));
    }

    #[test]
    fn is_case_insensitive() {
        assert_eq!(parse_duration_days("hamster-7d-xyz", "HAMSTER"), Some(7));
    }

    #[test]
    fn rejects_zero_duration() {
        assert_eq!(parse_duration_days("HAMSTER-0D-ABC", "HAMSTER"), None);
    }

    #[test]
    fn rejects_wrong_prefix() {
        assert_eq!(parse_duration_days("OTHER-30D-ABC", "HAMSTER"), None);
    }

    #[test]
    fn rejects_missing_day_suffix() {
        assert_eq!(parse_duration_days("HAMSTER-30-ABC", "HAMSTER"), None);
    }

    #[test]
    fn rejects_missing_tail() {
        assert_eq!(parse_duration_days("HAMSTER-30D", "HAMSTER"), None);
        assert_eq!(parse_duration_days("HAMSTER-30D-", "HAMSTER"), None);
        assert_eq!(parse_duration_days("HAMSTER", "HAMSTER"), None);
    }

    #[test]
    fn rejects_non_numeric_duration() {
        assert_eq!(parse_duration_days("HAMSTER-XXD-ABC", "HAMSTER"), None);
        assert_eq!(parse_duration_days("HAMSTER-3X D-ABC", "HAMSTER"), None);
    }
}
