use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};

pub fn now_utc() -> OffsetDateTime {
    OffsetDateTime::now_utc()
}

pub fn parse_timestamp(raw: &str) -> Option<OffsetDateTime> {
    OffsetDateTime::parse(raw.trim(), &Rfc3339).ok()
}

/// Offset of the local timezone, or UTC when it cannot be determined (the
/// `time` crate refuses to read it once other threads are running).
pub fn local_offset() -> UtcOffset {
    UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC)
}

/// Accepts `local`, `utc`/`z`, or a fixed `+HH:MM` / `-HH:MM` offset.
pub fn parse_offset(spec: &str) -> Result<UtcOffset> {
    let spec = spec.trim();
    match spec.to_ascii_lowercase().as_str() {
        "local" => return Ok(local_offset()),
        "utc" | "z" => return Ok(UtcOffset::UTC),
        _ => {}
    }
    UtcOffset::parse(
        spec,
        &format_description!("[offset_hour sign:mandatory]:[offset_minute]"),
    )
    .with_context(|| format!("invalid utc offset {spec:?}"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ClockStyle {
    #[default]
    #[serde(rename = "12h")]
    TwelveHour,
    #[serde(rename = "24h")]
    TwentyFourHour,
}

impl std::str::FromStr for ClockStyle {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "12h" | "12" => Ok(ClockStyle::TwelveHour),
            "24h" | "24" => Ok(ClockStyle::TwentyFourHour),
            _ => anyhow::bail!("unknown clock style: {s}"),
        }
    }
}

/// Time of day only; the date is dropped.
pub fn format_time_of_day(ts: OffsetDateTime, clock: ClockStyle) -> Option<String> {
    let formatted = match clock {
        ClockStyle::TwelveHour => ts.format(&format_description!(
            "[hour repr:12 padding:none]:[minute]:[second] [period]"
        )),
        ClockStyle::TwentyFourHour => ts.format(&format_description!("[hour]:[minute]:[second]")),
    };
    formatted.ok()
}
