//! Human-readable durations such as "30s", "24h" or "1h30m".

use std::time::Duration;

use anyhow::{Context, Result};
use serde::{de, Deserialize, Deserializer};

const SECS_PER_DAY: u64 = 24 * 60 * 60;
const SECS_PER_HOUR: u64 = 60 * 60;
const SECS_PER_MINUTE: u64 = 60;

/// Parse a duration string made of one or more `<number><unit>` parts.
///
/// Supported units are `d`, `h`, `m` and `s`. Parts may be combined
/// (`"1h30m"`) and are summed. Input is case-insensitive and trimmed.
///
/// # Examples
///
/// ```
/// use worthwatch::duration::parse_duration;
/// use std::time::Duration;
///
/// assert_eq!(parse_duration("30s").unwrap(), Duration::from_secs(30));
/// assert_eq!(parse_duration("1h30m").unwrap(), Duration::from_secs(90 * 60));
/// assert_eq!(parse_duration("1d").unwrap(), Duration::from_secs(24 * 60 * 60));
/// ```
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim().to_lowercase();
    if s.is_empty() {
        anyhow::bail!("Duration is empty");
    }

    let mut total: u64 = 0;
    let mut digits = String::new();

    for ch in s.chars() {
        if ch.is_ascii_digit() {
            digits.push(ch);
            continue;
        }

        let unit_secs = match ch {
            'd' => SECS_PER_DAY,
            'h' => SECS_PER_HOUR,
            'm' => SECS_PER_MINUTE,
            's' => 1,
            _ => anyhow::bail!("Unknown duration unit '{ch}' (expected d, h, m or s)"),
        };

        if digits.is_empty() {
            anyhow::bail!("Duration unit '{ch}' is missing a number");
        }

        let num: u64 = digits
            .parse()
            .with_context(|| format!("Invalid number in duration: {digits}"))?;
        let part = num.checked_mul(unit_secs).context("Duration is too large")?;
        total = total.checked_add(part).context("Duration is too large")?;
        digits.clear();
    }

    if !digits.is_empty() {
        anyhow::bail!("Duration must end with d, h, m, or s");
    }

    Ok(Duration::from_secs(total))
}

/// Format a duration as compound parts, largest unit first.
///
/// ```
/// use worthwatch::duration::format_duration;
/// use std::time::Duration;
///
/// assert_eq!(format_duration(Duration::from_secs(23 * 3600 + 30 * 60)), "23h30m");
/// assert_eq!(format_duration(Duration::from_secs(0)), "0s");
/// ```
pub fn format_duration(d: Duration) -> String {
    let mut secs = d.as_secs();
    if secs == 0 {
        return "0s".to_string();
    }

    let mut out = String::new();
    for (unit, size) in [
        ('d', SECS_PER_DAY),
        ('h', SECS_PER_HOUR),
        ('m', SECS_PER_MINUTE),
        ('s', 1),
    ] {
        let count = secs / size;
        if count > 0 {
            out.push_str(&format!("{count}{unit}"));
            secs %= size;
        }
    }
    out
}

/// Serde deserializer for duration strings.
///
/// Use with `#[serde(deserialize_with = "deserialize_duration")]`.
pub fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_duration(&s).map_err(de::Error::custom)
}
