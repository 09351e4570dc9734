use chrono::{Datelike, Days, NaiveDate};

use crate::domain::Season;
use crate::error::ClimateError;

/// Calendar date for a decimal year such as `2020.5`.
///
/// The fractional part is turned into whole days from 1 January as
/// `round(frac * 365.25)`, which is close to but not exactly the calendar position.
pub fn fractional_year_to_date(year_float: f64) -> Result<NaiveDate, ClimateError> {
    if !year_float.is_finite() {
        return Err(ClimateError::InvalidDate(year_float.to_string()));
    }
    let year = year_float.trunc();
    let days = ((year_float - year) * 365.25).round();
    let base = NaiveDate::from_ymd_opt(year as i32, 1, 1)
        .ok_or_else(|| ClimateError::InvalidDate(year_float.to_string()))?;
    if days >= 0.0 {
        base.checked_add_days(Days::new(days as u64))
    } else {
        base.checked_sub_days(Days::new((-days) as u64))
    }
    .ok_or_else(|| ClimateError::InvalidDate(year_float.to_string()))
}

pub fn integer_to_date(packed: i64) -> Result<NaiveDate, ClimateError> {
    let year = packed.div_euclid(10_000);
    let remainder = packed.rem_euclid(10_000);
    let month = remainder / 100 + 1;
    let day = remainder % 100;
    NaiveDate::from_ymd_opt(year as i32, month as u32, day as u32)
        .ok_or_else(|| ClimateError::InvalidDate(packed.to_string()))
}

/// Meteorological season and the year it is filed under. December opens the winter
/// of its own year, so January and February belong to the previous year's winter.
pub fn season_of(date: NaiveDate) -> (Season, i32) {
    match date.month() {
        12 => (Season::Winter, date.year()),
        1 | 2 => (Season::Winter, date.year() - 1),
        3..=5 => (Season::Spring, date.year()),
        6..=8 => (Season::Summer, date.year()),
        _ => (Season::Autumn, date.year()),
    }
}

pub fn month_start(year: i32, month: u32) -> Result<NaiveDate, ClimateError> {
    NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| ClimateError::InvalidDate(format!("{year}-{month}")))
}

pub fn month_range(first: NaiveDate, last: NaiveDate) -> Vec<NaiveDate> {
    let mut months = Vec::new();
    let mut current = first.with_day(1).unwrap_or(first);
    while current <= last {
        months.push(current);
        current = match current.checked_add_months(chrono::Months::new(1)) {
            Some(next) => next,
            None => break,
        };
    }
    months
}

pub fn parse_date(value: &str) -> Result<NaiveDate, ClimateError> {
    const FORMATS: [&str; 6] = ["%Y-%m-%d", "%d-%b-%y", "%d-%b-%Y", "%m/%d/%Y", "%m/%d/%y", "%Y/%m/%d"];
    let trimmed = value.trim();
    let date_part = trimmed.split(['T', ' ']).next().unwrap_or(trimmed);
    FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(date_part, format).ok())
        .ok_or_else(|| ClimateError::InvalidDate(value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fractional_year_half_is_early_july() {
        let date = fractional_year_to_date(2020.5).unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2020, 7, 2).unwrap());
    }

    #[test]
    fn fractional_year_whole_is_new_year() {
        let date = fractional_year_to_date(2018.0).unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2018, 1, 1).unwrap());
    }

    #[test]
    fn fractional_year_rejects_nan() {
        assert!(fractional_year_to_date(f64::NAN).is_err());
    }

    #[test]
    fn integer_date_month_is_zero_based() {
        let date = integer_to_date(20050615).unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2005, 7, 15).unwrap());
    }

    #[test]
    fn seasons_file_january_under_previous_winter() {
        let jan = NaiveDate::from_ymd_opt(1990, 1, 1).unwrap();
        let dec = NaiveDate::from_ymd_opt(1989, 12, 1).unwrap();
        assert_eq!(season_of(jan), (Season::Winter, 1989));
        assert_eq!(season_of(dec), (Season::Winter, 1989));
        let sep = NaiveDate::from_ymd_opt(1990, 9, 1).unwrap();
        assert_eq!(season_of(sep), (Season::Autumn, 1990));
    }

    #[test]
    fn month_range_is_inclusive() {
        let first = NaiveDate::from_ymd_opt(1999, 11, 1).unwrap();
        let last = NaiveDate::from_ymd_opt(2000, 2, 1).unwrap();
        assert_eq!(month_range(first, last).len(), 4);
    }

    #[test]
    fn parse_date_spellings() {
        let expected = NaiveDate::from_ymd_opt(1988, 10, 31).unwrap();
        assert_eq!(parse_date("1988-10-31").unwrap(), expected);
        assert_eq!(parse_date("31-Oct-88").unwrap(), expected);
        assert_eq!(parse_date("10/31/1988").unwrap(), expected);
        assert_eq!(parse_date("1988-10-31 00:00:00").unwrap(), expected);
    }
}
