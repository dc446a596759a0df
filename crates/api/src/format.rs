//! Timestamps and the KST work-date calendar.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Utc};

/// Korea Standard Time, UTC+9. Work dates are calendar days in this zone.
pub fn kst() -> FixedOffset {
    FixedOffset::east_opt(KST_OFFSET_SECS).expect("UTC+9 is a valid offset")
}

const KST_OFFSET_SECS: i32 = 9 * 3600;

/// Calendar date in KST for the given instant.
pub fn kst_date(now: DateTime<Utc>) -> NaiveDate {
    now.with_timezone(&kst()).date_naive()
}

/// `YYYY-MM-DD` of today in KST.
pub fn today_kst(now: DateTime<Utc>) -> String {
    kst_date(now).format("%Y-%m-%d").to_string()
}

/// `YYYY-MM-DD` of yesterday in KST.
pub fn yesterday_kst(now: DateTime<Utc>) -> String {
    (kst_date(now) - Duration::days(1))
        .format("%Y-%m-%d")
        .to_string()
}

/// SQLite `datetime('now')` layout.
pub fn sqlite_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn kst_crosses_midnight_before_utc() {
        // 16:30 UTC is 01:30 the next day in Seoul.
        let now = Utc.with_ymd_and_hms(2025, 3, 9, 16, 30, 0).unwrap();
        assert_eq!(today_kst(now), "2025-03-10");
        assert_eq!(yesterday_kst(now), "2025-03-09");

        let morning = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        assert_eq!(today_kst(morning), "2025-03-01");
        assert_eq!(yesterday_kst(morning), "2025-02-28");
    }
}
