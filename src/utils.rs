use crate::error::{LedgerError, Result};
use crate::MonthKey;
use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

/// Earliest year accepted from file names and master rows.
pub const MIN_PLAUSIBLE_YEAR: i32 = 2000;

/// `YYYYMMDD` anywhere in a daily file name; the leftmost match wins.
static FILE_DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{4})(\d{2})(\d{2})").expect("valid date pattern"));

/// `YYYYMM` anywhere in a month-end correction file name.
static FILE_MONTH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{4})(\d{2})").expect("valid month pattern"));

pub fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

pub fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => 0,
    }
}

/// The fiscal year a date belongs to, labeled by the calendar year it starts in.
///
/// With the default April start, 2024-03-31 is FY2023 and 2024-04-01 is FY2024.
pub fn fiscal_year_for_date(date: NaiveDate, fiscal_start_month: u32) -> i32 {
    if date.month() < fiscal_start_month {
        date.year() - 1
    } else {
        date.year()
    }
}

/// The calendar month sitting `offset` months into fiscal year `fiscal_year`.
pub fn fiscal_month(fiscal_year: i32, offset: u32, fiscal_start_month: u32) -> MonthKey {
    MonthKey::from_parts(fiscal_year, fiscal_start_month).add_months(offset as i32)
}

/// Lenient numeric coercion for CSV cells.
///
/// Grouping commas and surrounding whitespace are stripped. Anything that still
/// does not parse as a finite number becomes 0.
pub fn parse_number(raw: &str) -> f64 {
    let cleaned: String = raw.chars().filter(|&c| c != ',').collect();
    match cleaned.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        _ => 0.0,
    }
}

/// Like [`parse_number`], treating a missing cell as 0.
pub fn coerce_cell(cell: Option<&str>) -> f64 {
    cell.map(parse_number).unwrap_or(0.0)
}

/// Extracts the business date encoded as `YYYYMMDD` in a daily file name.
pub fn parse_file_date(file_name: &str) -> Result<NaiveDate> {
    let invalid = || LedgerError::InvalidFileDate(file_name.to_string());

    let caps = FILE_DATE_RE.captures(file_name).ok_or_else(invalid)?;
    let year: i32 = caps[1].parse().map_err(|_| invalid())?;
    let month: u32 = caps[2].parse().map_err(|_| invalid())?;
    let day: u32 = caps[3].parse().map_err(|_| invalid())?;
    if year < MIN_PLAUSIBLE_YEAR {
        return Err(invalid());
    }
    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(invalid)
}

/// Extracts the month encoded as `YYYYMM` in a month-end correction file name.
pub fn parse_file_month(file_name: &str) -> Result<MonthKey> {
    let invalid = || LedgerError::InvalidFileDate(file_name.to_string());

    let caps = FILE_MONTH_RE.captures(file_name).ok_or_else(invalid)?;
    let year: i32 = caps[1].parse().map_err(|_| invalid())?;
    let month: u32 = caps[2].parse().map_err(|_| invalid())?;
    if year < MIN_PLAUSIBLE_YEAR {
        return Err(invalid());
    }
    MonthKey::new(year, month).map_err(|_| invalid())
}

/// Parses the month column of master data. Day-less forms resolve to the 1st.
pub fn parse_master_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    for fmt in ["%Y/%m/%d", "%Y-%m-%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, fmt) {
            return Some(date);
        }
    }

    // Month-only forms: "2024/04", "2024-04", "2024_04"
    trimmed
        .parse::<MonthKey>()
        .ok()
        .map(|month| month.first_day())
}
