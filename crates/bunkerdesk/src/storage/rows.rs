//! Column encoding shared by the table modules.
//!
//! Instants are stored as RFC 3339 UTC strings with second precision, so they
//! sort lexically. Dates are `YYYY-MM-DD`, wall-clock times `HH:MM`.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::Row;

use crate::config::TIME_FORMAT;
use crate::model::ParseEnumError;

pub(super) fn encode_ts(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub(super) fn encode_opt_ts(value: Option<&DateTime<Utc>>) -> Option<String> {
    value.map(encode_ts)
}

pub(super) fn encode_time(value: NaiveTime) -> String {
    value.format(TIME_FORMAT).to_string()
}

pub(super) fn sql_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

fn conversion_error<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

pub(super) fn get_ts(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let value: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e))
}

pub(super) fn get_opt_ts(row: &Row, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let value: Option<String> = row.get(idx)?;
    value
        .map(|s| {
            DateTime::parse_from_rfc3339(&s)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| conversion_error(idx, e))
        })
        .transpose()
}

pub(super) fn get_date(row: &Row, idx: usize) -> rusqlite::Result<NaiveDate> {
    let value: String = row.get(idx)?;
    value.parse().map_err(|e| conversion_error(idx, e))
}

pub(super) fn get_opt_date(row: &Row, idx: usize) -> rusqlite::Result<Option<NaiveDate>> {
    let value: Option<String> = row.get(idx)?;
    value
        .map(|s| s.parse().map_err(|e| conversion_error(idx, e)))
        .transpose()
}

pub(super) fn get_time(row: &Row, idx: usize) -> rusqlite::Result<NaiveTime> {
    let value: String = row.get(idx)?;
    NaiveTime::parse_from_str(&value, TIME_FORMAT).map_err(|e| conversion_error(idx, e))
}

pub(super) fn get_enum<T>(row: &Row, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr<Err = ParseEnumError>,
{
    let value: String = row.get(idx)?;
    value.parse().map_err(|e| conversion_error(idx, e))
}

/// Decode a JSON array column of enum values.
pub(super) fn get_json_list<T>(row: &Row, idx: usize) -> rusqlite::Result<Vec<T>>
where
    T: serde::de::DeserializeOwned,
{
    let value: String = row.get(idx)?;
    serde_json::from_str(&value).map_err(|e| conversion_error(idx, e))
}
