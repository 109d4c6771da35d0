//! ISO-8601 period parsing, epoch alignment for fixed-length granularities, instant parsing.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{PipelineError, Result};

static ISO_PERIOD: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r"^P(?:(\d+)W)?(?:(\d+)D)?(?:T(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)S)?)?$")
    .expect("period pattern is valid")
});

const SECOND: i64 = 1000;
const MINUTE: i64 = 60 * SECOND;
const HOUR: i64 = 60 * MINUTE;
const DAY: i64 = 24 * HOUR;
const WEEK: i64 = 7 * DAY;

/// Length in milliseconds of an ISO-8601 period such as `PT1H`, `P1D` or `PT15M`.
///
/// Months and years have no fixed length and are rejected.
pub fn period_millis(period: &str) -> Result<i64> {
  let invalid = |reason: &str| PipelineError::Config(format!("invalid period '{}': {}", period, reason));
  let caps = ISO_PERIOD
    .captures(period.trim())
    .ok_or_else(|| invalid("expected PnWnDTnHnMnS"))?;
  let units = [WEEK, DAY, HOUR, MINUTE, SECOND];
  let mut total: i64 = 0;
  for (i, unit) in units.iter().enumerate() {
    if let Some(m) = caps.get(i + 1) {
      let n: i64 = m.as_str().parse().map_err(|_| invalid("number out of range"))?;
      total = n
        .checked_mul(*unit)
        .and_then(|v| total.checked_add(v))
        .ok_or_else(|| invalid("overflow"))?;
    }
  }
  if total <= 0 {
    return Err(invalid("must be positive"));
  }
  Ok(total)
}

/// Smallest multiple of `granularity` (from the epoch) that is `>= millis`.
pub fn ceil_to(millis: i64, granularity: i64) -> i64 {
  let floor = floor_to(millis, granularity);
  if floor < millis { floor + granularity } else { floor }
}

/// Largest multiple of `granularity` (from the epoch) that is `<= millis`.
pub fn floor_to(millis: i64, granularity: i64) -> i64 {
  millis.div_euclid(granularity) * granularity
}

/// Parses an instant given as epoch milliseconds or as an RFC 3339 timestamp.
pub fn parse_instant(value: &str) -> Result<i64> {
  let value = value.trim();
  if let Ok(millis) = value.parse::<i64>() {
    return Ok(millis);
  }
  chrono::DateTime::parse_from_rfc3339(value)
    .map(|t| t.timestamp_millis())
    .map_err(|e| PipelineError::Config(format!("invalid timestamp '{}': {}", value, e)))
}
