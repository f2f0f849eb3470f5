//! Formatting and validation helpers for resume fields

use chrono::{DateTime, NaiveDate};

/// `local@domain.tld`: one `@`, no whitespace, and a dot inside the domain
/// with something on both sides.
pub fn validate_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    domain
        .char_indices()
        .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len())
}

/// Accepts `YYYY-MM`, `YYYY-MM-DD` and RFC 3339 timestamps
fn parse_date(value: &str) -> Option<NaiveDate> {
    let v = value.trim();
    if v.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(v, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(&format!("{}-01", v), "%Y-%m-%d"))
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(v).ok().map(|d| d.date_naive()))
}

/// `"2025-03"` -> `"Mar 2025"`; empty or invalid -> `""`
pub fn format_year_month(year_month: &str) -> String {
    parse_date(year_month)
        .map(|d| d.format("%b %Y").to_string())
        .unwrap_or_default()
}

/// `"2025-03-07"` -> `"07 Mar 2025"`; empty or invalid -> `"—"`
pub fn format_full_date(date: &str) -> String {
    parse_date(date)
        .map(|d| d.format("%d %b %Y").to_string())
        .unwrap_or_else(|| "—".to_string())
}

/// `"Mar 2025 - Jun 2026"`. A missing or empty end, or `present` in any
/// case, reads `Present`; a blank end is formatted like any other value.
/// The separator only appears between two non-empty sides.
pub fn format_duration(start: Option<&str>, end: Option<&str>) -> String {
    let from = start.map(format_year_month).unwrap_or_default();
    let to = match end {
        None | Some("") => "Present".to_string(),
        Some(e) if e.trim().eq_ignore_ascii_case("present") => "Present".to_string(),
        Some(e) => format_year_month(e),
    };
    match (from.is_empty(), to.is_empty()) {
        (false, false) => format!("{} - {}", from, to),
        (false, true) => from,
        _ => to,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emails() {
        assert!(validate_email("jane@example.com"));
        assert!(validate_email("a.b+c@mail.co.uk"));
        assert!(!validate_email("jane@example"));
        assert!(!validate_email("jane@@example.com"));
        assert!(!validate_email("ja ne@example.com"));
        assert!(!validate_email("@example.com"));
        assert!(!validate_email("jane@.com"));
        assert!(!validate_email("jane@example."));
    }

    #[test]
    fn year_month() {
        assert_eq!(format_year_month("2025-03"), "Mar 2025");
        assert_eq!(format_year_month("2024-12-31"), "Dec 2024");
        assert_eq!(format_year_month(""), "");
        assert_eq!(format_year_month("2025-13"), "");
        assert_eq!(format_year_month("soon"), "");
    }

    #[test]
    fn full_date() {
        assert_eq!(format_full_date("2025-03-07"), "07 Mar 2025");
        assert_eq!(format_full_date("2025-03-07T10:00:00Z"), "07 Mar 2025");
        assert_eq!(format_full_date(""), "—");
        assert_eq!(format_full_date("nope"), "—");
    }

    #[test]
    fn durations() {
        assert_eq!(format_duration(Some("2023-01"), Some("2024-06")), "Jan 2023 - Jun 2024");
        assert_eq!(format_duration(Some("2023-01"), None), "Jan 2023 - Present");
        assert_eq!(format_duration(Some("2023-01"), Some("PRESENT")), "Jan 2023 - Present");
        assert_eq!(format_duration(None, Some("2024-06")), "Jun 2024");
        assert_eq!(format_duration(Some("2023-01"), Some("bad")), "Jan 2023");
        assert_eq!(format_duration(None, None), "Present");
    }

    #[test]
    fn blank_end_is_not_present() {
        assert_eq!(format_duration(Some("2023-01"), Some("   ")), "Jan 2023");
        assert_eq!(format_duration(Some("2023-01"), Some("")), "Jan 2023 - Present");
        assert_eq!(format_duration(Some("2023-01"), Some(" present ")), "Jan 2023 - Present");
    }
}
