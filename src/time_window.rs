//! Calendar-day helpers. Every "day" is a calendar day in the reference zone,
//! never a rolling 24h window.

use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveTime, TimeZone, Utc};

/// Calendar date of `ts` as seen in `tz`.
pub fn calendar_date<Tz: TimeZone>(ts: DateTime<Utc>, tz: &Tz) -> NaiveDate {
    ts.with_timezone(tz).date_naive()
}

pub fn is_today<Tz: TimeZone>(ts: DateTime<Utc>, now: DateTime<Utc>, tz: &Tz) -> bool {
    calendar_date(ts, tz) == calendar_date(now, tz)
}

pub fn is_yesterday<Tz: TimeZone>(ts: DateTime<Utc>, now: DateTime<Utc>, tz: &Tz) -> bool {
    calendar_date(now, tz).pred_opt() == Some(calendar_date(ts, tz))
}

/// An expiry instant equal to `now` has already passed.
pub fn is_expired(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    expires_at <= now
}

/// 23:59:59 of the calendar day containing `now` in `tz`.
pub fn end_of_day<Tz: TimeZone>(now: DateTime<Utc>, tz: &Tz) -> DateTime<Utc> {
    let last_second = calendar_date(now, tz).and_time(NaiveTime::MIN) + Duration::seconds(86_399);
    match tz.from_local_datetime(&last_second) {
        LocalResult::Single(t) => t.with_timezone(&Utc),
        LocalResult::Ambiguous(_, later) => later.with_timezone(&Utc),
        // 23:59:59 skipped by a transition: read the wall clock as UTC.
        LocalResult::None => Utc.from_utc_datetime(&last_second),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Europe::Warsaw;

    fn utc(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    #[test]
    fn end_of_day_winter_offset() {
        let eod = end_of_day(utc("2024-03-10T10:00:00Z"), &Warsaw);
        assert_eq!(eod, utc("2024-03-10T22:59:59Z"));
    }

    #[test]
    fn end_of_day_summer_offset() {
        let eod = end_of_day(utc("2024-07-10T10:00:00Z"), &Warsaw);
        assert_eq!(eod, utc("2024-07-10T21:59:59Z"));
    }

    #[test]
    fn end_of_day_uses_local_calendar_not_utc() {
        // 23:30Z is already 01:30 on the 11th in Warsaw.
        let eod = end_of_day(utc("2024-07-10T23:30:00Z"), &Warsaw);
        assert_eq!(eod, utc("2024-07-11T21:59:59Z"));
    }

    #[test]
    fn end_of_day_is_not_rolling() {
        let now = utc("2024-07-10T20:00:00Z");
        let eod = end_of_day(now, &Warsaw);
        assert!(eod - now < Duration::hours(24));
        assert_eq!(eod - now, Duration::seconds(7199));
    }

    #[test]
    fn today_and_yesterday() {
        let now = utc("2024-07-10T12:00:00Z");
        assert!(is_today(utc("2024-07-09T22:30:00Z"), now, &Warsaw));
        assert!(!is_today(utc("2024-07-09T21:30:00Z"), now, &Warsaw));
        assert!(is_yesterday(utc("2024-07-09T21:30:00Z"), now, &Warsaw));
        assert!(!is_yesterday(utc("2024-07-10T08:00:00Z"), now, &Warsaw));
        assert!(is_today(utc("2024-07-10T00:00:00Z"), now, &Utc));
    }

    #[test]
    fn expiry_boundary() {
        let now = utc("2024-07-10T12:00:00Z");
        assert!(is_expired(now, now));
        assert!(is_expired(now - Duration::milliseconds(1), now));
        assert!(!is_expired(now + Duration::milliseconds(1), now));
    }
}
