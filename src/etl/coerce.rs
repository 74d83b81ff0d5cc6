//! Type coercion for raw cells.
//!
//! Coercion never fails loudly: a value that does not parse becomes `None`
//! and the row is later dropped by the required-field filter.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};

/// Date-time layouts seen in sales exports, tried in order.
///
/// Month-first is assumed for slash dates with a trailing year
/// (`12/1/2010 8:26`), matching the spreadsheet exports this data comes from.
const DATETIME_FMTS: [&str; 10] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const DATE_FMTS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

/// Two-digit-year slash dates (`12/1/10 8:26`); 69-99 map to 19xx, 00-68 to 20xx.
const SHORT_YEAR_DATETIME_FMTS: [&str; 2] = ["%m/%d/%y %H:%M:%S", "%m/%d/%y %H:%M"];

const SHORT_YEAR_DATE_FMT: &str = "%m/%d/%y";

/// Offset-suffixed layouts not covered by RFC 3339 (`+0100`, no colon).
const OFFSET_FMTS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%z", "%Y-%m-%dT%H:%M:%S%z"];

/// Parse an invoice timestamp; date-only values map to midnight.
///
/// Values carrying a UTC offset keep their wall-clock time. `%Y` accepts any
/// number of digits, so results before year 1000 are treated as misreads of a
/// two-digit year and re-parsed with the short-year layouts.
pub fn parse_invoice_date(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    let full_year = DATETIME_FMTS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            DATE_FMTS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .or_else(|| parse_with_offset(s))
        .filter(|dt| dt.year() >= 1000);
    if full_year.is_some() {
        return full_year;
    }

    SHORT_YEAR_DATETIME_FMTS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, SHORT_YEAR_DATE_FMT)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

fn parse_with_offset(s: &str) -> Option<NaiveDateTime> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .or_else(|| OFFSET_FMTS.iter().find_map(|fmt| DateTime::parse_from_str(s, fmt).ok()))
        .map(|dt| dt.naive_local())
}

/// Parse a numeric cell; non-numeric and non-finite values are missing.
pub fn parse_number(s: &str) -> Option<f64> {
    let v = s.trim().parse::<f64>().ok()?;
    if v.is_finite() { Some(v) } else { None }
}
