use chrono::NaiveDate;

use crate::error::AppError;

/// Parses an optional `YYYY-MM-DD` query value. Blank means absent.
pub fn parse_date(name: &str, value: Option<&str>) -> Result<Option<NaiveDate>, AppError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) => v
            .parse::<NaiveDate>()
            .map(Some)
            .map_err(|_| AppError::validation(format!("{name} must be a date in YYYY-MM-DD format"))),
    }
}

pub fn parse_id(name: &str, value: Option<&str>) -> Result<Option<i64>, AppError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) => v
            .parse::<i64>()
            .map(Some)
            .map_err(|_| AppError::validation(format!("{name} must be a number"))),
    }
}

/// Rejects ranges where the start falls after the end.
pub fn parse_date_range(
    start: Option<&str>,
    end: Option<&str>,
) -> Result<(Option<NaiveDate>, Option<NaiveDate>), AppError> {
    let start = parse_date("start_date", start)?;
    let end = parse_date("end_date", end)?;
    if let (Some(s), Some(e)) = (start, end) {
        if s > e {
            return Err(AppError::validation("start_date must not be after end_date"));
        }
    }
    Ok((start, end))
}

/// Checks `value` against the allowed set; blank means absent.
pub fn parse_choice<'a>(
    name: &str,
    value: Option<&'a str>,
    allowed: &[&str],
) -> Result<Option<&'a str>, AppError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) if allowed.contains(&v) => Ok(Some(v)),
        Some(_) => Err(AppError::validation(format!(
            "Invalid {name}. Use: {}",
            allowed.join(", ")
        ))),
    }
}
