/// Trim whitespace + strip outer quotes if present.
pub fn clean_str(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.starts_with('"') && trimmed.ends_with('"') && trimmed.len() >= 2 {
        trimmed[1..trimmed.len() - 1].trim().to_string()
    } else {
        trimmed.to_string()
    }
}

/// Header key used for alias lookups: trimmed, lower-cased, inner
/// whitespace collapsed to a single space.
pub fn header_key(raw: &str) -> String {
    clean_str(raw)
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parse a locale-formatted quantity such as `"1 234,5"`, `"1.234,5"`,
/// `"1,234.5"` or `"10,5"`.
///
/// Rules:
///  - all whitespace (including NBSP) is dropped
///  - a lone `-` is the zero marker used in the published statistics
///  - with both `,` and `.` present, the last one is the decimal point
///  - a single separator used once is the decimal point
///  - a separator used more than once groups thousands
pub fn parse_number(raw: &str) -> Option<f64> {
    let compact: String = clean_str(raw)
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '\u{a0}' && *c != '\u{202f}')
        .collect();
    if compact.is_empty() {
        return None;
    }
    if compact == "-" {
        return Some(0.0);
    }

    let commas = compact.matches(',').count();
    let dots = compact.matches('.').count();

    let normalized = match (commas, dots) {
        (0, 0) => compact,
        (_, 0) if commas == 1 => compact.replace(',', "."),
        (_, 0) => compact.replace(',', ""),
        (0, _) if dots == 1 => compact,
        (0, _) => compact.replace('.', ""),
        _ => {
            let last_comma = compact.rfind(',')?;
            let last_dot = compact.rfind('.')?;
            if last_comma > last_dot {
                compact.replace('.', "").replace(',', ".")
            } else {
                compact.replace(',', "")
            }
        }
    };

    // `f64::from_str` also accepts "inf"/"nan"; only plain decimals are quantities
    if !normalized
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'))
    {
        return None;
    }
    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_str_strips_quotes_and_space() {
        assert_eq!(clean_str("  \" Rundvekt \" "), "Rundvekt");
        assert_eq!(clean_str("\""), "\"");
    }

    #[test]
    fn header_key_folds_case_and_spacing() {
        assert_eq!(header_key("  Kvantum   (Rundvekt) "), "kvantum (rundvekt)");
        assert_eq!(header_key("LANDINGSDATO"), "landingsdato");
    }

    #[test]
    fn parses_norwegian_and_english_quantities() {
        assert_eq!(parse_number("10,5"), Some(10.5));
        assert_eq!(parse_number("4.5"), Some(4.5));
        assert_eq!(parse_number("1 234,5"), Some(1234.5));
        assert_eq!(parse_number("1\u{a0}234,5"), Some(1234.5));
        assert_eq!(parse_number("1.234,5"), Some(1234.5));
        assert_eq!(parse_number("1,234.5"), Some(1234.5));
        assert_eq!(parse_number("1.234.567"), Some(1_234_567.0));
        assert_eq!(parse_number("1,234,567"), Some(1_234_567.0));
        assert_eq!(parse_number("-"), Some(0.0));
    }

    #[test]
    fn rejects_non_numbers() {
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("bad"), None);
        assert_eq!(parse_number("inf"), None);
        assert_eq!(parse_number("NaN"), None);
        assert_eq!(parse_number("1,2,3.4.5"), None);
    }
}
