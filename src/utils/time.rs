use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, SubsecRound, TimeZone, Utc};

pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Drops sub-microsecond digits, matching what a `timestamptz` column keeps.
pub fn db_precision(at: DateTime<Utc>) -> DateTime<Utc> {
    at.trunc_subsecs(6)
}

/// Half-open UTC window `[start, end)` covering the calendar day of `at`.
pub fn day_window(at: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = Utc.from_utc_datetime(&at.date_naive().and_time(NaiveTime::default()));
    (start, start + Duration::days(1))
}

/// Half-open UTC window for the week containing `at`; weeks start on Sunday.
pub fn week_window(at: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let (day_start, _) = day_window(at);
    let offset = at.weekday().num_days_from_sunday() as i64;
    let start = day_start - Duration::days(offset);
    (start, start + Duration::days(7))
}

/// Parses a range bound given either as RFC 3339 or as a bare `YYYY-MM-DD`.
///
/// Upper bounds come back exclusive: a bare date yields the start of the
/// next day, a timestamp yields the next microsecond (Postgres precision),
/// so callers compare with `<`.
pub fn parse_bound(raw: &str, upper: bool) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        let at = at.with_timezone(&Utc);
        return Some(if upper { at + Duration::microseconds(1) } else { at });
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()?;
    let (start, end) = day_window(Utc.from_utc_datetime(&date.and_time(NaiveTime::default())));
    Some(if upper { end } else { start })
}
