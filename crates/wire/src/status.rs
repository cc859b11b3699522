//! Telemetry sample model and status-string decoding.
//!
//! The vehicle's status query returns a delimited key:value string such as
//! `bat:87;h:30;temp:62;wifi:90;time:114`. Samples are immutable once
//! decoded; each new sample supersedes the previous snapshot wholesale.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::SystemTime;

use crate::error::{WireError, WireResult};

/// One decoded vehicle status report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetrySample {
    /// Battery level in percent (0-100)
    pub battery_pct: u8,
    /// Height above the takeoff point in centimeters
    pub height_cm: u32,
    /// Internal temperature in degrees Celsius
    pub temperature_c: i32,
    /// WiFi link quality (0-100)
    pub wifi_quality: u8,
    /// Accumulated flight time in seconds
    pub flight_time_s: u32,
    /// When the sample was decoded
    pub timestamp: SystemTime,
}

impl TelemetrySample {
    /// Decode a delimited status string into a sample.
    ///
    /// All five fields must be present and in range; a malformed string is
    /// rejected as a whole rather than partially decoded.
    pub fn parse(raw: &str) -> WireResult<Self> {
        let mut fields: HashMap<&str, &str> = HashMap::new();
        for pair in raw.trim().split(';') {
            if pair.is_empty() {
                continue;
            }
            let (key, value) = pair
                .split_once(':')
                .ok_or_else(|| malformed(raw, "field without ':' separator"))?;
            fields.insert(key.trim(), value.trim());
        }

        let battery_pct: u8 = field(&fields, "bat", raw)?;
        if battery_pct > 100 {
            return Err(malformed(raw, "battery out of range"));
        }
        let wifi_quality: u8 = field(&fields, "wifi", raw)?;
        if wifi_quality > 100 {
            return Err(malformed(raw, "wifi quality out of range"));
        }

        Ok(Self {
            battery_pct,
            height_cm: field(&fields, "h", raw)?,
            temperature_c: field(&fields, "temp", raw)?,
            wifi_quality,
            flight_time_s: field(&fields, "time", raw)?,
            timestamp: SystemTime::now(),
        })
    }
}

fn field<T: std::str::FromStr>(
    fields: &HashMap<&str, &str>,
    key: &str,
    raw: &str,
) -> WireResult<T> {
    fields
        .get(key)
        .ok_or_else(|| malformed(raw, &format!("missing field '{key}'")))?
        .parse()
        .map_err(|_| malformed(raw, &format!("unparseable field '{key}'")))
}

fn malformed(raw: &str, reason: &str) -> WireError {
    WireError::MalformedStatus(format!("{reason} in {raw:?}"))
}
