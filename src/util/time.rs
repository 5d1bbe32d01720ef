use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use anyhow::Result;

/// 当前 UTC 时间，RFC 3339 格式
pub fn format_date_time() -> Result<String> {
    Ok(OffsetDateTime::now_utc().format(&Rfc3339)?)
}

pub fn unix_millis() -> i128 {
    OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000
}
