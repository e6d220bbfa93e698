use time::UtcOffset;

use crate::models::{DisplayPoint, DisplaySeries, RawValue, SampleSeries};
use crate::timeutils::{format_time_of_day, local_offset, parse_timestamp, ClockStyle};

/// Label shown for a timestamp that cannot be parsed.
pub const INVALID_LABEL: &str = "Invalid Date";

/// Everything label rendering depends on besides the timestamp itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelFormat {
    pub offset: UtcOffset,
    pub clock: ClockStyle,
}

impl Default for LabelFormat {
    fn default() -> Self {
        Self {
            offset: local_offset(),
            clock: ClockStyle::TwelveHour,
        }
    }
}

impl LabelFormat {
    pub fn utc(clock: ClockStyle) -> Self {
        Self {
            offset: UtcOffset::UTC,
            clock,
        }
    }

    pub fn label(&self, raw: &str) -> String {
        parse_timestamp(raw)
            .and_then(|ts| format_time_of_day(ts.to_offset(self.offset), self.clock))
            .unwrap_or_else(|| INVALID_LABEL.to_string())
    }
}

/// One display point per sample, same order. Absent stays absent.
pub fn normalize(series: &SampleSeries, format: &LabelFormat) -> DisplaySeries {
    series
        .iter()
        .map(|sample| DisplayPoint {
            label: format.label(&sample.timestamp),
            value: numeric_value(sample.value.as_ref()),
        })
        .collect()
}

pub fn numeric_value(value: Option<&RawValue>) -> Option<f64> {
    let number = match value? {
        RawValue::Number(n) => *n,
        RawValue::Text(text) => {
            let text = text.trim();
            if text.is_empty() {
                return None;
            }
            text.parse::<f64>().ok()?
        }
    };
    number.is_finite().then_some(number)
}
