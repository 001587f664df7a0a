use super::types::{PricePoint, PriceSeries, Timestamp};
use crate::error::{InputError, SonifyError};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use std::collections::BTreeSet;
use std::path::Path;

const TIMESTAMP_COLUMNS: [&str; 4] = ["timestamp", "datetime", "date", "time"];
const PRICE_COLUMNS: [&str; 3] = ["price", "value", "close"];

/// Reads raw price rows from a CSV file.
///
/// The file needs a header row. The timestamp is taken from the first
/// column named `timestamp`, `datetime`, `date` or `time`, and the price
/// from the first column named `price`, `value` or `close` (case-insensitive).
/// Rows whose price cell is empty are skipped.
///
/// Rows are returned in file order; ordering and positivity are checked
/// later when a day is turned into a [`PriceSeries`].
///
/// # Errors
/// * If the file cannot be read or is not valid CSV
/// * If either column is missing, or a cell cannot be parsed
pub fn load_csv(path: &Path) -> Result<Vec<PricePoint>, SonifyError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)?;

    let headers = reader.headers()?.clone();
    let ts_col = find_column(&headers, &TIMESTAMP_COLUMNS).ok_or_else(|| {
        InputError::Malformed {
            row: 0,
            message: format!("no timestamp column (expected one of {:?})", TIMESTAMP_COLUMNS),
        }
    })?;
    let price_col = find_column(&headers, &PRICE_COLUMNS).ok_or_else(|| InputError::Malformed {
        row: 0,
        message: format!("no price column (expected one of {:?})", PRICE_COLUMNS),
    })?;

    let mut points = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record?;
        let row = i + 1;

        let raw_price = record.get(price_col).unwrap_or("");
        if raw_price.is_empty() {
            continue;
        }
        let price = raw_price.parse::<f64>().map_err(|_| InputError::Malformed {
            row,
            message: format!("invalid price '{}'", raw_price),
        })?;

        let raw_ts = record.get(ts_col).unwrap_or("");
        let timestamp = parse_timestamp(raw_ts).ok_or_else(|| InputError::Malformed {
            row,
            message: format!("invalid timestamp '{}'", raw_ts),
        })?;

        points.push(PricePoint { timestamp, price });
    }

    tracing::debug!("Loaded {} price rows from {}", points.len(), path.display());
    Ok(points)
}

fn find_column(headers: &csv::StringRecord, names: &[&str]) -> Option<usize> {
    names.iter().find_map(|name| {
        headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name))
    })
}

/// Parses a timestamp cell into epoch seconds (UTC).
///
/// Accepts integer epoch seconds, RFC 3339, `%Y-%m-%d %H:%M:%S`,
/// `%Y-%m-%dT%H:%M:%S` and bare `%Y-%m-%d` dates (midnight).
pub fn parse_timestamp(raw: &str) -> Option<Timestamp> {
    if let Ok(secs) = raw.parse::<i64>() {
        return Some(secs);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.timestamp());
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc().timestamp());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .map(|date| date.and_time(NaiveTime::MIN).and_utc().timestamp())
}

fn date_of(timestamp: Timestamp) -> Option<NaiveDate> {
    DateTime::from_timestamp(timestamp, 0).map(|dt| dt.date_naive())
}

/// Lists the distinct UTC calendar days present in the rows, in order
pub fn available_dates(points: &[PricePoint]) -> Vec<NaiveDate> {
    points
        .iter()
        .filter_map(|p| date_of(p.timestamp))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Selects the rows of one UTC calendar day and validates them as a series
///
/// # Errors
/// * [`InputError::Empty`] if the day has no rows
/// * Any other [`InputError`] from [`PriceSeries::new`]
pub fn for_date(points: &[PricePoint], date: NaiveDate) -> Result<PriceSeries, InputError> {
    let day: Vec<PricePoint> = points
        .iter()
        .filter(|p| date_of(p.timestamp) == Some(date))
        .copied()
        .collect();
    PriceSeries::new(day)
}
