use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Deserializer, de::Error};

/// Calendar date "now" in the configured zone, used for every expiry check.
pub fn today(offset_minutes: i32) -> NaiveDate {
    match FixedOffset::east_opt(offset_minutes.saturating_mul(60)) {
        Some(offset) => Utc::now().with_timezone(&offset).date_naive(),
        None => Utc::now().date_naive(),
    }
}

/// UTC bounds `[start, next start)` of a local calendar day.
pub fn day_bounds(day: NaiveDate, offset_minutes: i32) -> (DateTime<Utc>, DateTime<Utc>) {
    let shift = FixedOffset::east_opt(offset_minutes.saturating_mul(60))
        .map(|offset| Duration::seconds(i64::from(offset.local_minus_utc())))
        .unwrap_or_else(Duration::zero);
    let start = (day.and_time(NaiveTime::MIN) - shift).and_utc();
    (start, start + Duration::days(1))
}

/// Accepts `YYYY-MM-DD` or an RFC 3339 timestamp; the time part is dropped.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
}

pub fn flexible_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_date(&raw).ok_or_else(|| D::Error::custom(format!("invalid date '{}'", raw)))
}

pub fn flexible_date_opt<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) if !raw.trim().is_empty() => parse_date(&raw)
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("invalid date '{}'", raw))),
        _ => Ok(None),
    }
}
