//! Serde helpers for record timestamps.
//!
//! The store emits `2024-05-01 10:00:00.123Z`; RFC 3339 is accepted too so
//! records produced by other tooling validate the same way.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serializer};

/// Format used when writing timestamps back out
pub const STORE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3fZ";

/// Parse a timestamp in either the store format or RFC 3339
pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    let naive = raw.strip_suffix('Z').unwrap_or(raw);
    NaiveDateTime::parse_from_str(naive, "%Y-%m-%d %H:%M:%S%.f")
        .ok()
        .map(|dt| dt.and_utc())
}

/// Render a timestamp in the store format
pub fn format(dt: &DateTime<Utc>) -> String {
    dt.format(STORE_FORMAT).to_string()
}

pub fn serialize<S>(dt: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format(dt))
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}")))
}
