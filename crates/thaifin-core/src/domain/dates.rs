use time::{Date, Month};

use crate::domain::period::gregorian_year;
use crate::ValidationError;

/// Parses the calendar dates Thai sources publish: `dd/mm/yyyy` (Gregorian or
/// Buddhist era) and ISO `yyyy-mm-dd`.
pub fn parse_calendar_date(input: &str) -> Result<Date, ValidationError> {
    let invalid = || ValidationError::InvalidDate {
        value: input.to_owned(),
    };
    let trimmed = input.trim();

    let (year, month, day) = if trimmed.contains('/') {
        let mut parts = trimmed.split('/');
        let day = parts.next().ok_or_else(invalid)?;
        let month = parts.next().ok_or_else(invalid)?;
        let year = parts.next().ok_or_else(invalid)?;
        if parts.next().is_some() {
            return Err(invalid());
        }
        (year, month, day)
    } else {
        let mut parts = trimmed.split('-');
        let year = parts.next().ok_or_else(invalid)?;
        let month = parts.next().ok_or_else(invalid)?;
        let day = parts.next().ok_or_else(invalid)?;
        if parts.next().is_some() {
            return Err(invalid());
        }
        (year, month, day)
    };

    let year = year.trim().parse::<i32>().map_err(|_| invalid())?;
    let month = month.trim().parse::<u8>().map_err(|_| invalid())?;
    let day = day.trim().parse::<u8>().map_err(|_| invalid())?;
    let month = Month::try_from(month).map_err(|_| invalid())?;

    Date::from_calendar_date(gregorian_year(year), month, day).map_err(|_| invalid())
}

/// Parses an operation period such as `01/01/2563 - 31/12/2563` into its bounds.
pub fn parse_date_range(input: &str) -> Result<(Date, Date), ValidationError> {
    let (start, end) = input
        .split_once(" - ")
        .or_else(|| input.split_once('–'))
        .ok_or_else(|| ValidationError::InvalidDate {
            value: input.to_owned(),
        })?;
    let start = parse_calendar_date(start)?;
    let end = parse_calendar_date(end)?;
    if end < start {
        return Err(ValidationError::InvalidDate {
            value: input.to_owned(),
        });
    }
    Ok((start, end))
}
