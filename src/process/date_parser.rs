use chrono::{DateTime, Datelike, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

/// `YYYY-MM[-DD][ time]`, `YYYY/MM[/DD][ time]`, RFC 3339 included.
static ISO_LIKE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{4})[-/](\d{1,2})(?:[-/](\d{1,2}))?(?:[ T].*)?$").expect("valid regex")
});

/// `DD.MM.YYYY[ time]`
static DOTTED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})\.(\d{1,2})\.(\d{4})(?:\s.*)?$").expect("valid regex"));

/// `YYYYMMDD`
static COMPACT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})(\d{2})(\d{2})$").expect("valid regex"));

const MONTH_NAMES: &[(&str, u32)] = &[
    ("januar", 1),
    ("january", 1),
    ("jan", 1),
    ("februar", 2),
    ("february", 2),
    ("feb", 2),
    ("mars", 3),
    ("march", 3),
    ("mar", 3),
    ("april", 4),
    ("apr", 4),
    ("mai", 5),
    ("may", 5),
    ("juni", 6),
    ("june", 6),
    ("jun", 6),
    ("juli", 7),
    ("july", 7),
    ("jul", 7),
    ("august", 8),
    ("aug", 8),
    ("september", 9),
    ("sep", 9),
    ("oktober", 10),
    ("october", 10),
    ("okt", 10),
    ("oct", 10),
    ("november", 11),
    ("nov", 11),
    ("desember", 12),
    ("december", 12),
    ("des", 12),
    ("dec", 12),
];

fn ym(year: &str, month: &str, day: Option<&str>) -> Option<(i32, u32)> {
    let year: i32 = year.parse().ok()?;
    let month: u32 = month.parse().ok()?;
    let valid = match day {
        Some(d) => {
            let day: u32 = d.parse().ok()?;
            NaiveDate::from_ymd_opt(year, month, day).is_some()
        }
        None => (1..=12).contains(&month),
    };
    valid.then_some((year, month))
}

/// Offset-carrying timestamp layouts besides RFC 3339.
const OFFSET_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%z", "%Y-%m-%d %H:%M:%S %z"];

/// Timestamps with a UTC offset are shifted to UTC before the month is taken.
fn utc_year_month(s: &str) -> Option<(i32, u32)> {
    let parsed = DateTime::parse_from_rfc3339(s).ok().or_else(|| {
        OFFSET_FORMATS
            .iter()
            .find_map(|fmt| DateTime::parse_from_str(s, fmt).ok())
    })?;
    let utc = parsed.with_timezone(&Utc);
    Some((utc.year(), utc.month()))
}

/// Parse a combined date cell into `(year, month)`, dropping day and time.
/// Values with an explicit offset are read in UTC; naive values as written.
pub fn parse_year_month(raw: &str) -> Option<(i32, u32)> {
    let s = raw.trim().trim_matches('"').trim();
    if let Some(ym) = utc_year_month(s) {
        return Some(ym);
    }
    if let Some(c) = ISO_LIKE.captures(s) {
        return ym(&c[1], &c[2], c.get(3).map(|m| m.as_str()));
    }
    if let Some(c) = DOTTED.captures(s) {
        return ym(&c[3], &c[2], Some(&c[1]));
    }
    if let Some(c) = COMPACT.captures(s) {
        return ym(&c[1], &c[2], Some(&c[3]));
    }
    None
}

/// Parse a month cell: `1`–`12`, `01`, or a Norwegian/English month name.
pub fn parse_month(raw: &str) -> Option<u32> {
    let s = raw.trim().trim_matches('"').trim().to_lowercase();
    if let Ok(n) = s.parse::<u32>() {
        return (1..=12).contains(&n).then_some(n);
    }
    let name = s.trim_end_matches('.');
    MONTH_NAMES
        .iter()
        .find(|(label, _)| *label == name)
        .map(|(_, n)| *n)
}

/// Parse a year cell. Accepts `2023` and spreadsheet artefacts like `2023.0`.
pub fn parse_year(raw: &str) -> Option<i32> {
    let s = raw.trim().trim_matches('"').trim();
    let s = s.strip_suffix(".0").unwrap_or(s);
    if s.len() != 4 || !s.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combined_dates() {
        assert_eq!(parse_year_month("2023-01"), Some((2023, 1)));
        assert_eq!(parse_year_month("2023-01-31"), Some((2023, 1)));
        assert_eq!(parse_year_month("2023/12/14 18:02:37"), Some((2023, 12)));
        assert_eq!(parse_year_month("2024-02-29T00:00:00+01:00"), Some((2024, 2)));
        assert_eq!(parse_year_month("15.03.2022"), Some((2022, 3)));
        assert_eq!(parse_year_month("20220315"), Some((2022, 3)));
        assert_eq!(parse_year_month("\"2022-07-01\""), Some((2022, 7)));
    }

    #[test]
    fn offset_timestamps_are_read_in_utc() {
        assert_eq!(parse_year_month("2023-02-01T00:30:00+01:00"), Some((2023, 1)));
        assert_eq!(parse_year_month("2023-01-01 00:30:00+01:00"), Some((2022, 12)));
        assert_eq!(parse_year_month("2023-01-31T23:30:00-02:00"), Some((2023, 2)));
        assert_eq!(parse_year_month("2023-02-01T00:30:00Z"), Some((2023, 2)));
        // no offset: the written date stands
        assert_eq!(parse_year_month("2023-02-01 00:30:00"), Some((2023, 2)));
    }

    #[test]
    fn rejects_impossible_dates() {
        assert_eq!(parse_year_month("2023-13"), None);
        assert_eq!(parse_year_month("2023-02-30"), None);
        assert_eq!(parse_year_month("31.02.2023"), None);
        assert_eq!(parse_year_month("yesterday"), None);
        assert_eq!(parse_year_month(""), None);
    }

    #[test]
    fn month_cells() {
        assert_eq!(parse_month("3"), Some(3));
        assert_eq!(parse_month("03"), Some(3));
        assert_eq!(parse_month("Desember"), Some(12));
        assert_eq!(parse_month(" mai "), Some(5));
        assert_eq!(parse_month("okt."), Some(10));
        assert_eq!(parse_month("0"), None);
        assert_eq!(parse_month("Landingsmåned"), None);
    }

    #[test]
    fn year_cells() {
        assert_eq!(parse_year("2023"), Some(2023));
        assert_eq!(parse_year("2023.0"), Some(2023));
        assert_eq!(parse_year("23"), None);
        assert_eq!(parse_year("Totalt"), None);
    }
}
