// Cell-level type coercion.
//
// Every parser here is lenient: a value that cannot be read becomes `None`
// rather than failing the row or the table.

use chrono::{NaiveDate, NaiveDateTime};

/// Text markers exports use for a missing value. "None" is not one of them:
/// it is the injury_status literal for a healthy player.
const NULL_MARKERS: &[&str] = &["", "nan", "na", "n/a", "null", "nat", "-", "--"];

/// Date-time layouts tried in order. Time-of-day is kept.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

/// Date layouts tried in order. Month-first slashes win over day-first.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d", "%m/%d/%Y", "%d/%m/%Y", "%Y/%m/%d", "%d.%m.%Y", "%d-%b-%Y", "%d %b %Y",
];

/// Returns true when the cell text is one of the recognised null markers.
pub fn is_null_marker(raw: &str) -> bool {
    let t = raw.trim();
    NULL_MARKERS.iter().any(|m| t.eq_ignore_ascii_case(m))
}

/// Normalise a raw field into a cell: trimmed, with null markers mapped to
/// `None`.
pub fn to_cell(raw: &str) -> Option<String> {
    if is_null_marker(raw) {
        None
    } else {
        Some(raw.trim().to_string())
    }
}

/// Parse a finite number. Accepts thousands separators ("1,234") and a
/// trailing percent sign. Non-finite results are rejected.
pub fn parse_f64(raw: &str) -> Option<f64> {
    let t = raw.trim().trim_end_matches('%').trim();
    if is_null_marker(t) {
        return None;
    }
    let value: f64 = match t.parse() {
        Ok(v) => v,
        Err(_) => t.replace(',', "").parse().ok()?,
    };
    value.is_finite().then_some(value)
}

/// Parse an integer, also accepting float renderings of whole numbers such
/// as "7.0" (what a numeric column with nulls round-trips as).
pub fn parse_i64(raw: &str) -> Option<i64> {
    let t = raw.trim();
    if let Ok(v) = t.parse::<i64>() {
        return Some(v);
    }
    let f = parse_f64(t)?;
    (f.fract() == 0.0 && f.abs() < i64::MAX as f64).then_some(f as i64)
}

/// Parse a date-time in any of the supported layouts. A bare date parses as
/// midnight.
pub fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    let t = raw.trim();
    if is_null_marker(t) {
        return None;
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(t, fmt) {
            return Some(dt);
        }
    }
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(t) {
        return Some(dt.naive_local());
    }
    parse_plain_date(t).and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Parse a calendar date. Date-times are accepted and truncated.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let t = raw.trim();
    if is_null_marker(t) {
        return None;
    }
    parse_plain_date(t).or_else(|| parse_datetime(t).map(|dt| dt.date()))
}

fn parse_plain_date(t: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(t, fmt).ok())
}

/// Parse a boolean flag ("True", "false", "1", "yes", ...).
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "1" | "1.0" | "yes" | "y" => Some(true),
        "false" | "f" | "0" | "0.0" | "no" | "n" => Some(false),
        _ => None,
    }
}

/// Round to a fixed number of decimals.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_markers_become_none() {
        for raw in ["", "  ", "NaN", "nan", "N/A", "null", "NaT", "-"] {
            assert_eq!(to_cell(raw), None, "{raw:?} should be null");
        }
        assert_eq!(to_cell("None"), Some("None".to_string()));
        assert_eq!(to_cell(" Knee "), Some("Knee".to_string()));
    }

    #[test]
    fn numbers_with_separators_and_percent() {
        assert_eq!(parse_f64("1,234"), Some(1234.0));
        assert_eq!(parse_f64("87.5%"), Some(87.5));
        assert_eq!(parse_f64(" 42 "), Some(42.0));
        assert_eq!(parse_f64("inf"), None);
        assert_eq!(parse_f64("fast"), None);
    }

    #[test]
    fn integers_accept_whole_floats() {
        assert_eq!(parse_i64("7"), Some(7));
        assert_eq!(parse_i64("10.0"), Some(10));
        assert_eq!(parse_i64("10.5"), None);
        assert_eq!(parse_i64("Vitinha"), None);
    }

    #[test]
    fn dates_in_many_layouts() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 14).unwrap();
        for raw in [
            "2024-03-14",
            "03/14/2024",
            "14/03/2024",
            "2024/03/14",
            "14.03.2024",
            "14-Mar-2024",
            "2024-03-14 18:30:00",
            "2024-03-14T18:30:00",
        ] {
            assert_eq!(parse_date(raw), Some(expected), "failed on {raw:?}");
        }
    }

    #[test]
    fn ambiguous_slash_dates_are_month_first() {
        assert_eq!(
            parse_date("01/02/2024"),
            NaiveDate::from_ymd_opt(2024, 1, 2)
        );
    }

    #[test]
    fn unparseable_date_is_none() {
        assert_eq!(parse_date("matchday 3"), None);
        assert_eq!(parse_date("2024-13-40"), None);
    }

    #[test]
    fn datetime_keeps_time_of_day() {
        let dt = parse_datetime("2024-08-17 20:45:12").unwrap();
        assert_eq!(dt.format("%H:%M:%S").to_string(), "20:45:12");
        let midnight = parse_datetime("2024-08-17").unwrap();
        assert_eq!(midnight.format("%H:%M").to_string(), "00:00");
    }

    #[test]
    fn booleans() {
        assert_eq!(parse_bool("True"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn rounding() {
        assert_eq!(round_to(72.46, 1), 72.5);
        assert_eq!(round_to(61.04, 1), 61.0);
    }
}
