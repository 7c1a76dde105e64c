//! Communications chart bucketing.
//!
//! A chart covers one period around an anchor date and splits it into
//! ordered, contiguous, half-open buckets in local time. Each event lands in
//! at most one bucket; events outside the charted range are dropped.

use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, NaiveDateTime, NaiveTime};
use chrono_tz::Tz;
use serde::Serialize;
use tracing::debug;

use crate::clocks::local_to_utc;
use crate::error::{Error, Result};
use crate::model::string_enum;
use crate::storage::Storage;

string_enum! {
    /// Span covered by a chart.
    pub enum ChartPeriod {
        Day => "day",
        Week => "week",
        Month => "month",
        Year => "year",
    }
}

/// One bar of the chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartBucket {
    /// Axis label (`09:00`, `Mon 13`, `13`, `Jan`).
    pub label: String,
    /// Inclusive local start.
    pub start: NaiveDateTime,
    /// Exclusive local end.
    pub end: NaiveDateTime,
    /// Calls in the bucket.
    pub calls: u32,
    /// Emails in the bucket.
    pub emails: u32,
    /// Deals entered in the bucket.
    pub deals: u32,
}

impl ChartBucket {
    fn empty(label: String, start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self {
            label,
            start,
            end,
            calls: 0,
            emails: 0,
            deals: 0,
        }
    }

    /// Whether `at` falls inside the bucket.
    #[must_use]
    pub fn contains(&self, at: NaiveDateTime) -> bool {
        self.start <= at && at < self.end
    }

    /// All communications in the bucket.
    #[must_use]
    pub fn total(&self) -> u32 {
        self.calls + self.emails + self.deals
    }
}

/// Per-series sums over a chart.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ChartTotals {
    /// Calls charted.
    pub calls: u32,
    /// Emails charted.
    pub emails: u32,
    /// Deals charted.
    pub deals: u32,
}

fn midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

fn next_month(date: NaiveDate) -> Result<NaiveDate> {
    date.checked_add_months(Months::new(1))
        .ok_or_else(|| Error::validation(format!("date {date} is out of range")))
}

/// Empty buckets covering `period` around `anchor`.
///
/// Day charts are 24 hourly buckets, week charts 7 daily buckets starting
/// on Monday, month charts one bucket per calendar day, year charts 12
/// monthly buckets.
///
/// # Errors
///
/// Returns a validation error if the range runs past the supported dates.
pub fn bucket_range(period: ChartPeriod, anchor: NaiveDate) -> Result<Vec<ChartBucket>> {
    let out_of_range = || Error::validation(format!("date {anchor} is out of range"));
    let buckets = match period {
        ChartPeriod::Day => {
            let start = midnight(anchor);
            (0..24)
                .map(|hour| {
                    let from = start + Duration::hours(hour);
                    ChartBucket::empty(
                        format!("{hour:02}:00"),
                        from,
                        from + Duration::hours(1),
                    )
                })
                .collect()
        }
        ChartPeriod::Week => {
            let offset = i64::from(anchor.weekday().num_days_from_monday());
            let monday = anchor
                .checked_sub_signed(Duration::days(offset))
                .ok_or_else(out_of_range)?;
            (0..7)
                .map(|day| {
                    let date = monday + Duration::days(day);
                    ChartBucket::empty(
                        date.format("%a %-d").to_string(),
                        midnight(date),
                        midnight(date) + Duration::days(1),
                    )
                })
                .collect()
        }
        ChartPeriod::Month => {
            let first = month_start(anchor);
            let end = next_month(first)?;
            first
                .iter_days()
                .take_while(|date| *date < end)
                .map(|date| {
                    ChartBucket::empty(
                        date.format("%-d").to_string(),
                        midnight(date),
                        midnight(date) + Duration::days(1),
                    )
                })
                .collect()
        }
        ChartPeriod::Year => {
            let mut buckets = Vec::with_capacity(12);
            let mut month = NaiveDate::from_ymd_opt(anchor.year(), 1, 1).ok_or_else(out_of_range)?;
            for _ in 0..12 {
                let next = next_month(month)?;
                buckets.push(ChartBucket::empty(
                    month.format("%b").to_string(),
                    midnight(month),
                    midnight(next),
                ));
                month = next;
            }
            buckets
        }
    };
    Ok(buckets)
}

fn bucket_index(buckets: &[ChartBucket], at: NaiveDateTime) -> Option<usize> {
    let idx = buckets.partition_point(|bucket| bucket.start <= at);
    let idx = idx.checked_sub(1)?;
    buckets[idx].contains(at).then_some(idx)
}

/// Count local event times into the buckets of `period` around `anchor`.
///
/// # Errors
///
/// Returns a validation error if the range runs past the supported dates.
pub fn bucket_events(
    period: ChartPeriod,
    anchor: NaiveDate,
    calls: &[NaiveDateTime],
    emails: &[NaiveDateTime],
    deals: &[NaiveDateTime],
) -> Result<Vec<ChartBucket>> {
    let mut buckets = bucket_range(period, anchor)?;
    for at in calls {
        if let Some(idx) = bucket_index(&buckets, *at) {
            buckets[idx].calls += 1;
        }
    }
    for at in emails {
        if let Some(idx) = bucket_index(&buckets, *at) {
            buckets[idx].emails += 1;
        }
    }
    for at in deals {
        if let Some(idx) = bucket_index(&buckets, *at) {
            buckets[idx].deals += 1;
        }
    }
    Ok(buckets)
}

/// Sum each series over a chart.
#[must_use]
pub fn chart_totals(buckets: &[ChartBucket]) -> ChartTotals {
    buckets.iter().fold(ChartTotals::default(), |acc, bucket| ChartTotals {
        calls: acc.calls + bucket.calls,
        emails: acc.emails + bucket.emails,
        deals: acc.deals + bucket.deals,
    })
}

/// Chart stored calls, emails and deals for `period` around `anchor`, in
/// the local time of `tz`.
///
/// # Errors
///
/// Returns an error if the range is invalid or the database query fails.
pub fn communications_chart(
    storage: &Storage,
    period: ChartPeriod,
    anchor: NaiveDate,
    tz: Tz,
) -> Result<Vec<ChartBucket>> {
    let range = bucket_range(period, anchor)?;
    let (Some(first), Some(last)) = (range.first(), range.last()) else {
        return Ok(Vec::new());
    };
    let since = local_to_utc(tz, first.start);
    let until = local_to_utc(tz, last.end);
    debug!("Charting {} from {} to {}", period, since, until);

    let local = |at: &DateTime<chrono::Utc>| at.with_timezone(&tz).naive_local();
    let calls: Vec<NaiveDateTime> = storage
        .calls_between(since, until)?
        .iter()
        .map(|call| local(&call.called_at))
        .collect();
    let emails: Vec<NaiveDateTime> = storage
        .emails_between(since, until)?
        .iter()
        .map(|email| local(&email.sent_at))
        .collect();
    let deals: Vec<NaiveDateTime> = storage
        .deals_between(since, until)?
        .iter()
        .map(|deal| local(&deal.created_at))
        .collect();

    bucket_events(period, anchor, &calls, &emails, &deals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Call, CallOutcome, Contact};
    use chrono::{TimeZone, Utc};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        date(y, m, d).and_hms_opt(h, 0, 0).unwrap()
    }

    fn assert_contiguous(buckets: &[ChartBucket]) {
        for pair in buckets.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
            assert!(pair[0].start < pair[0].end);
        }
    }

    #[test]
    fn test_day_range() {
        let buckets = bucket_range(ChartPeriod::Day, date(2026, 10, 19)).unwrap();
        assert_eq!(buckets.len(), 24);
        assert_eq!(buckets[9].label, "09:00");
        assert_contiguous(&buckets);
    }

    #[test]
    fn test_week_starts_monday() {
        // Thursday anchor
        let buckets = bucket_range(ChartPeriod::Week, date(2026, 10, 22)).unwrap();
        assert_eq!(buckets.len(), 7);
        assert_eq!(buckets[0].start, at(2026, 10, 19, 0));
        assert_eq!(buckets[0].label, "Mon 19");
        assert_eq!(buckets[6].end, at(2026, 10, 26, 0));
        assert_contiguous(&buckets);
    }

    #[test]
    fn test_month_range_handles_leap_february() {
        let buckets = bucket_range(ChartPeriod::Month, date(2028, 2, 10)).unwrap();
        assert_eq!(buckets.len(), 29);
        assert_eq!(buckets[0].label, "1");
        assert_eq!(buckets[28].end, at(2028, 3, 1, 0));
        assert_contiguous(&buckets);
    }

    #[test]
    fn test_year_range() {
        let buckets = bucket_range(ChartPeriod::Year, date(2026, 6, 15)).unwrap();
        assert_eq!(buckets.len(), 12);
        assert_eq!(buckets[0].label, "Jan");
        assert_eq!(buckets[11].end, at(2027, 1, 1, 0));
        assert_contiguous(&buckets);
    }

    #[test]
    fn test_counts_sum_to_in_range_events() {
        let calls = vec![
            at(2026, 10, 19, 9),
            at(2026, 10, 19, 9),
            at(2026, 10, 25, 23),
            at(2026, 10, 26, 0),
            at(2026, 10, 18, 23),
        ];
        let emails = vec![at(2026, 10, 21, 12)];
        let buckets =
            bucket_events(ChartPeriod::Week, date(2026, 10, 19), &calls, &emails, &[]).unwrap();

        let totals = chart_totals(&buckets);
        assert_eq!(totals.calls, 3);
        assert_eq!(totals.emails, 1);
        assert_eq!(totals.deals, 0);
        assert_eq!(buckets[0].calls, 2);
        assert_eq!(buckets[6].calls, 1);
        assert_eq!(buckets[2].total(), 1);
    }

    #[test]
    fn test_unsorted_input() {
        let calls = vec![at(2026, 10, 19, 15), at(2026, 10, 19, 8), at(2026, 10, 19, 15)];
        let buckets = bucket_events(ChartPeriod::Day, date(2026, 10, 19), &calls, &[], &[]).unwrap();
        assert_eq!(buckets[15].calls, 2);
        assert_eq!(buckets[8].calls, 1);
    }

    #[test]
    fn test_period_parse() {
        assert_eq!("Month".parse::<ChartPeriod>().unwrap(), ChartPeriod::Month);
        assert!("fortnight".parse::<ChartPeriod>().is_err());
    }

    #[test]
    fn test_communications_chart_uses_local_time() {
        let storage = Storage::open_in_memory().unwrap();
        let contact = storage.insert_contact(&Contact::new("Ana")).unwrap();
        // 23:30 UTC on Sunday is 07:30 Monday in Singapore
        let mut call = Call::new(contact, CallOutcome::Connected);
        call.called_at = Utc.with_ymd_and_hms(2026, 10, 18, 23, 30, 0).unwrap();
        storage.log_call(&call).unwrap();

        let buckets = communications_chart(
            &storage,
            ChartPeriod::Week,
            date(2026, 10, 19),
            chrono_tz::Asia::Singapore,
        )
        .unwrap();
        assert_eq!(buckets[0].calls, 1);
        assert_eq!(chart_totals(&buckets).calls, 1);
    }
}
