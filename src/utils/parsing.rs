use chrono::{DateTime, NaiveDate, NaiveDateTime};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn parse_date(date_str: &str) -> Option<NaiveDate> {
    let date_str = date_str.trim();
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(date_str, "%Y/%m/%d"))
        .or_else(|_| NaiveDate::parse_from_str(date_str, "%d-%m-%Y"))
        .or_else(|_| NaiveDate::parse_from_str(date_str, "%d/%m/%Y"))
        .ok()
}

/// Calendar day of a stored entry date. The backend sends plain dates,
/// ISO timestamps or RFC 2822 stamps depending on the endpoint; the time
/// part is dropped in every case.
pub fn entry_day(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Some(date) = parse_date(raw) {
        return Some(date);
    }
    if let Ok(stamp) = DateTime::parse_from_rfc3339(raw) {
        return Some(stamp.date_naive());
    }
    if let Ok(stamp) = DateTime::parse_from_rfc2822(raw) {
        return Some(stamp.date_naive());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(stamp) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(stamp.date());
        }
    }
    None
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Display form of an entry date; unparsable values are shown as received.
pub fn display_day(raw: &str) -> String {
    entry_day(raw)
        .map(format_date)
        .unwrap_or_else(|| raw.to_string())
}

/// Empty input means "no bound"; anything else must be a valid date.
pub fn parse_optional_date(input: &str) -> Result<Option<NaiveDate>, String> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(None);
    }
    parse_date(input)
        .map(Some)
        .ok_or_else(|| format!("Fecha invalida: {input} (use YYYY-MM-DD)"))
}

pub fn parse_hours(input: &str) -> Option<f64> {
    let normalized = input.trim().replace(',', ".");
    if normalized.is_empty() {
        return None;
    }
    normalized
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

pub fn format_hours(hours: f64) -> String {
    if hours.fract() == 0.0 {
        format!("{hours:.0}")
    } else {
        format!("{hours:.1}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn entry_day_accepts_backend_shapes() {
        assert_eq!(entry_day("2024-01-10"), Some(day(2024, 1, 10)));
        assert_eq!(entry_day("2024-01-10T23:30:00"), Some(day(2024, 1, 10)));
        assert_eq!(entry_day("2024-01-10 08:00:00"), Some(day(2024, 1, 10)));
        assert_eq!(
            entry_day("Wed, 10 Jan 2024 00:00:00 GMT"),
            Some(day(2024, 1, 10))
        );
        assert_eq!(entry_day("ayer"), None);
        assert_eq!(entry_day(""), None);
    }

    #[test]
    fn optional_date_distinguishes_empty_from_invalid() {
        assert_eq!(parse_optional_date("  "), Ok(None));
        assert_eq!(parse_optional_date("2024-02-29"), Ok(Some(day(2024, 2, 29))));
        assert!(parse_optional_date("2023-02-29").is_err());
    }

    #[test]
    fn hours_accept_comma_decimal() {
        assert_eq!(parse_hours("7,5"), Some(7.5));
        assert_eq!(parse_hours(" 8 "), Some(8.0));
        assert_eq!(parse_hours("ocho"), None);
        assert_eq!(parse_hours("NaN"), None);
        assert_eq!(format_hours(4.0), "4");
        assert_eq!(format_hours(2.5), "2.5");
    }
}
