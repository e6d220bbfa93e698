use serde::{Deserialize, Serialize};
use std::fmt;

/// Id prefix of chart surfaces: `chart-<field>`.
pub const CHART_PREFIX: &str = "chart";
/// Id prefix of companion latest-value elements: `latest-<field>`.
pub const LATEST_PREFIX: &str = "latest";
pub const ID_SEPARATOR: char = '-';

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldId(String);

impl FieldId {
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Extracts the field from a surface id. Everything after `chart-` is the
    /// field, separators included.
    pub fn from_chart_id(element_id: &str) -> Option<Self> {
        let rest = element_id
            .strip_prefix(CHART_PREFIX)?
            .strip_prefix(ID_SEPARATOR)?;
        if rest.is_empty() {
            return None;
        }
        Some(Self(rest.to_string()))
    }

    pub fn chart_id(&self) -> String {
        format!("{CHART_PREFIX}{ID_SEPARATOR}{}", self.0)
    }

    pub fn latest_id(&self) -> String {
        format!("{LATEST_PREFIX}{ID_SEPARATOR}{}", self.0)
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FieldId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for FieldId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A sample value as it arrives from the source. Upstream feeds sometimes
/// carry numbers as strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Number(f64),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: String,
    pub value: Option<RawValue>,
}

impl Sample {
    pub fn new<T: Into<String>>(timestamp: T, value: Option<RawValue>) -> Self {
        Self {
            timestamp: timestamp.into(),
            value,
        }
    }

    pub fn number<T: Into<String>>(timestamp: T, value: f64) -> Self {
        Self::new(timestamp, Some(RawValue::Number(value)))
    }

    pub fn missing<T: Into<String>>(timestamp: T) -> Self {
        Self::new(timestamp, None)
    }
}

/// Oldest-to-newest samples of one field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleSeries {
    pub samples: Vec<Sample>,
}

impl SampleSeries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sample: Sample) {
        self.samples.push(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }
}

impl FromIterator<Sample> for SampleSeries {
    fn from_iter<I: IntoIterator<Item = Sample>>(iter: I) -> Self {
        Self {
            samples: iter.into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DisplayPoint {
    pub label: String,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DisplaySeries {
    pub points: Vec<DisplayPoint>,
}

impl DisplaySeries {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.points.iter().map(|p| p.label.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = Option<f64>> + '_ {
        self.points.iter().map(|p| p.value)
    }

    /// Value of the newest point; `None` when the series is empty or the newest
    /// sample carried no value.
    pub fn last_value(&self) -> Option<f64> {
        self.points.last().and_then(|p| p.value)
    }
}

impl FromIterator<DisplayPoint> for DisplaySeries {
    fn from_iter<I: IntoIterator<Item = DisplayPoint>>(iter: I) -> Self {
        Self {
            points: iter.into_iter().collect(),
        }
    }
}
