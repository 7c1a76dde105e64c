//! World clocks and local-time helpers.
//!
//! Timezones are IANA names resolved with `chrono-tz`. Local wall-clock
//! input (task due times, deadlines) is resolved against the user's home
//! timezone, tolerating DST gaps and overlaps.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone, Timelike, Utc, Weekday};
use chrono_tz::Tz;
use serde::Serialize;
use tracing::warn;

use crate::config::{ClockSpec, TIME_FORMAT};
use crate::error::{Error, Result};

/// First local hour counted as business hours.
pub const BUSINESS_START_HOUR: u32 = 9;
/// First local hour after business hours.
pub const BUSINESS_END_HOUR: u32 = 18;

/// Resolve an IANA timezone name.
///
/// # Errors
///
/// Returns [`Error::InvalidTimezone`] for a name `chrono-tz` does not know.
pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.trim().parse::<Tz>().map_err(|_| Error::InvalidTimezone {
        name: name.to_string(),
    })
}

/// One clock on the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClockReading {
    /// Display label.
    pub label: String,
    /// IANA timezone name.
    pub timezone: String,
    /// Local wall-clock time.
    pub local_time: NaiveDateTime,
    /// Offset from UTC in minutes, DST included.
    pub utc_offset_minutes: i32,
    /// Whether the local time falls in Mon-Fri 09:00-17:59.
    pub business_hours: bool,
}

impl ClockReading {
    /// Offset rendered as `UTC+05:30`.
    #[must_use]
    pub fn offset_label(&self) -> String {
        format_offset(self.utc_offset_minutes)
    }
}

/// Read every configured clock at `now`.
///
/// # Errors
///
/// Returns [`Error::InvalidTimezone`] if any clock names an unknown zone.
pub fn world_clocks(clocks: &[ClockSpec], now: DateTime<Utc>) -> Result<Vec<ClockReading>> {
    clocks
        .iter()
        .map(|clock| {
            let tz = parse_timezone(&clock.timezone)?;
            let local = now.with_timezone(&tz);
            Ok(ClockReading {
                label: clock.label.clone(),
                timezone: clock.timezone.clone(),
                local_time: local.naive_local(),
                utc_offset_minutes: local.offset().fix().local_minus_utc() / 60,
                business_hours: is_business_hours(local.naive_local()),
            })
        })
        .collect()
}

/// Mon-Fri, 09:00 up to and including 17:59.
#[must_use]
pub fn is_business_hours(local: NaiveDateTime) -> bool {
    let weekday = local.weekday();
    if matches!(weekday, Weekday::Sat | Weekday::Sun) {
        return false;
    }
    (BUSINESS_START_HOUR..BUSINESS_END_HOUR).contains(&local.hour())
}

/// `UTC`, `UTC+04:00` or `UTC-05:30`.
#[must_use]
pub fn format_offset(minutes: i32) -> String {
    if minutes == 0 {
        return "UTC".to_string();
    }
    let sign = if minutes < 0 { '-' } else { '+' };
    let abs = minutes.unsigned_abs();
    format!("UTC{sign}{:02}:{:02}", abs / 60, abs % 60)
}

/// Convert a local wall-clock time in `tz` to UTC.
///
/// Ambiguous times (DST overlap) take the earlier instant. Times inside a
/// spring-forward gap move one hour later.
#[must_use]
pub fn local_to_utc(tz: Tz, local: NaiveDateTime) -> DateTime<Utc> {
    if let Some(dt) = tz.from_local_datetime(&local).earliest() {
        return dt.with_timezone(&Utc);
    }
    let shifted = local + Duration::hours(1);
    if let Some(dt) = tz.from_local_datetime(&shifted).earliest() {
        warn!("{} does not exist in {}; using {}", local, tz, shifted);
        return dt.with_timezone(&Utc);
    }
    warn!("Could not resolve {} in {}; treating it as UTC", local, tz);
    Utc.from_utc_datetime(&local)
}

/// UTC bounds `[start, end)` of a local calendar day.
#[must_use]
pub fn local_day_bounds(tz: Tz, date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = local_to_utc(tz, date.and_time(NaiveTime::MIN));
    let end = date
        .succ_opt()
        .map_or(start + Duration::days(1), |next| {
            local_to_utc(tz, next.and_time(NaiveTime::MIN))
        });
    (start, end)
}

/// Parse `YYYY-MM-DD` (midnight) or `YYYY-MM-DD HH:MM` as a local time in
/// `tz`.
///
/// # Errors
///
/// Returns a validation error when the input matches neither form.
pub fn parse_local_datetime(input: &str, tz: Tz) -> Result<DateTime<Utc>> {
    let input = input.trim();
    if let Some((date, time)) = input.split_once(' ') {
        let date: NaiveDate = date
            .parse()
            .map_err(|_| Error::validation(format!("invalid date in '{input}'")))?;
        let time = NaiveTime::parse_from_str(time.trim(), TIME_FORMAT)
            .map_err(|_| Error::validation(format!("invalid time in '{input}', expected HH:MM")))?;
        return Ok(local_to_utc(tz, date.and_time(time)));
    }
    let date: NaiveDate = input.parse().map_err(|_| {
        Error::validation(format!(
            "invalid date/time '{input}', expected YYYY-MM-DD or YYYY-MM-DD HH:MM"
        ))
    })?;
    Ok(local_to_utc(tz, date.and_time(NaiveTime::MIN)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clock(label: &str, tz: &str) -> ClockSpec {
        ClockSpec {
            label: label.to_string(),
            timezone: tz.to_string(),
        }
    }

    fn ndt(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn test_parse_timezone() {
        assert_eq!(parse_timezone("Asia/Singapore").unwrap(), chrono_tz::Asia::Singapore);
        let err = parse_timezone("Mars/Olympus").unwrap_err();
        assert_eq!(err.to_string(), "unknown timezone: Mars/Olympus");
    }

    #[test]
    fn test_world_clocks_offsets() {
        // Monday 2026-01-05 06:00 UTC
        let now = Utc.with_ymd_and_hms(2026, 1, 5, 6, 0, 0).unwrap();
        let readings = world_clocks(
            &[clock("Singapore", "Asia/Singapore"), clock("Houston", "America/Chicago")],
            now,
        )
        .unwrap();

        assert_eq!(readings[0].utc_offset_minutes, 480);
        assert_eq!(readings[0].local_time, ndt(2026, 1, 5, 14, 0));
        assert!(readings[0].business_hours);

        assert_eq!(readings[1].utc_offset_minutes, -360);
        assert_eq!(readings[1].local_time, ndt(2026, 1, 5, 0, 0));
        assert!(!readings[1].business_hours);
    }

    #[test]
    fn test_world_clocks_dst() {
        let summer = Utc.with_ymd_and_hms(2026, 7, 1, 12, 0, 0).unwrap();
        let readings = world_clocks(&[clock("London", "Europe/London")], summer).unwrap();
        assert_eq!(readings[0].utc_offset_minutes, 60);
        assert_eq!(readings[0].offset_label(), "UTC+01:00");
    }

    #[test]
    fn test_world_clocks_unknown_zone() {
        let err = world_clocks(&[clock("Nowhere", "Nowhere/Land")], Utc::now()).unwrap_err();
        assert!(matches!(err, Error::InvalidTimezone { .. }));
    }

    #[test]
    fn test_business_hours_edges() {
        // 2026-10-19 is a Monday
        assert!(!is_business_hours(ndt(2026, 10, 19, 8, 59)));
        assert!(is_business_hours(ndt(2026, 10, 19, 9, 0)));
        assert!(is_business_hours(ndt(2026, 10, 19, 17, 59)));
        assert!(!is_business_hours(ndt(2026, 10, 19, 18, 0)));
        assert!(!is_business_hours(ndt(2026, 10, 24, 11, 0)));
    }

    #[test]
    fn test_format_offset() {
        assert_eq!(format_offset(0), "UTC");
        assert_eq!(format_offset(330), "UTC+05:30");
        assert_eq!(format_offset(-300), "UTC-05:00");
    }

    #[test]
    fn test_local_to_utc_gap_and_overlap() {
        let london = chrono_tz::Europe::London;
        // Clocks go forward at 01:00 on 2026-03-29
        let gap = local_to_utc(london, ndt(2026, 3, 29, 1, 30));
        assert_eq!(gap, Utc.with_ymd_and_hms(2026, 3, 29, 1, 30, 0).unwrap());
        // Clocks go back at 02:00 on 2026-10-25; 01:30 happens twice
        let overlap = local_to_utc(london, ndt(2026, 10, 25, 1, 30));
        assert_eq!(overlap, Utc.with_ymd_and_hms(2026, 10, 25, 0, 30, 0).unwrap());
    }

    #[test]
    fn test_local_day_bounds() {
        let tz = chrono_tz::Asia::Singapore;
        let date = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        let (start, end) = local_day_bounds(tz, date);
        assert_eq!(start, Utc.with_ymd_and_hms(2026, 10, 18, 16, 0, 0).unwrap());
        assert_eq!(end - start, Duration::days(1));
    }

    #[test]
    fn test_parse_local_datetime() {
        let tz = chrono_tz::Asia::Dubai;
        let with_time = parse_local_datetime("2026-10-19 14:30", tz).unwrap();
        assert_eq!(with_time, Utc.with_ymd_and_hms(2026, 10, 19, 10, 30, 0).unwrap());
        let date_only = parse_local_datetime("2026-10-19", tz).unwrap();
        assert_eq!(date_only, Utc.with_ymd_and_hms(2026, 10, 18, 20, 0, 0).unwrap());
        assert!(parse_local_datetime("tomorrow", tz).unwrap_err().is_validation());
        assert!(parse_local_datetime("2026-10-19 2pm", tz).unwrap_err().is_validation());
    }
}
