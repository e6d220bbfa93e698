use std::collections::HashMap;

use tracing::debug;

use crate::models::{DisplaySeries, FieldId};

/// Points interpolated between two neighbouring samples of a smoothed run.
const SUBDIVISIONS: usize = 8;
/// Share of the value range added above and below the plotted data.
const Y_PADDING: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl Rgba {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub const fn new(r: u8, g: u8, b: u8, a: f32) -> Self {
        Self { r, g, b, a }
    }
}

/// Visual contract shared by every chart on the dashboard.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartStyle {
    pub accent: Rgba,
    /// Area beneath the line; `None` draws the line only.
    pub fill: Option<Rgba>,
    /// Curve strength, 0 draws straight segments.
    pub tension: f64,
    pub show_x_axis: bool,
    pub y_begin_at_zero: bool,
    pub show_legend: bool,
}

impl Default for ChartStyle {
    fn default() -> Self {
        Self {
            accent: Rgba::rgb(0xff, 0x98, 0x00),
            fill: Some(Rgba::new(0xff, 0xc1, 0x07, 0.16)),
            tension: 0.35,
            show_x_axis: false,
            y_begin_at_zero: false,
            show_legend: false,
        }
    }
}

/// Vertical span of the filled area at one x position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FillSpan {
    pub x: f64,
    pub floor: f64,
    pub top: f64,
}

/// Chart geometry in data coordinates. x is the sample index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Plot {
    /// Contiguous runs of present values; a missing value ends a run.
    pub segments: Vec<Vec<(f64, f64)>>,
    pub fill: Vec<FillSpan>,
    pub x_bounds: [f64; 2],
    pub y_bounds: [f64; 2],
}

impl Plot {
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct ChartInstance {
    surface: String,
    style: ChartStyle,
    series: DisplaySeries,
    revision: u64,
}

impl ChartInstance {
    fn new(surface: &str, style: ChartStyle, series: DisplaySeries) -> Self {
        Self {
            surface: surface.to_string(),
            style,
            series,
            revision: 1,
        }
    }

    pub fn surface(&self) -> &str {
        &self.surface
    }

    pub fn style(&self) -> &ChartStyle {
        &self.style
    }

    pub fn series(&self) -> &DisplaySeries {
        &self.series
    }

    /// Number of times the chart received data, starting at 1 on creation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn plot(&self) -> Plot {
        let runs = present_runs(&self.series);
        if runs.is_empty() {
            return Plot::default();
        }

        let segments: Vec<Vec<(f64, f64)>> = runs
            .iter()
            .map(|run| smooth(run, self.style.tension))
            .collect();

        let (mut min, mut max) = (f64::INFINITY, f64::NEG_INFINITY);
        for &(_, y) in segments.iter().flatten() {
            min = min.min(y);
            max = max.max(y);
        }
        if self.style.y_begin_at_zero {
            min = min.min(0.0);
            max = max.max(0.0);
        }
        let y_bounds = if max == min {
            // at least 1, wider for large magnitudes so the bounds stay distinct
            let pad = (min.abs() * Y_PADDING).max(1.0);
            [min - pad, max + pad]
        } else {
            let pad = (max - min) * Y_PADDING;
            [min - pad, max + pad]
        };

        let last_index = self.series.len().saturating_sub(1) as f64;
        let x_bounds = [0.0, last_index.max(1.0)];

        let fill = if self.style.fill.is_some() {
            segments
                .iter()
                .flatten()
                .map(|&(x, top)| FillSpan {
                    x,
                    floor: y_bounds[0],
                    top,
                })
                .collect()
        } else {
            Vec::new()
        };

        Plot {
            segments,
            fill,
            x_bounds,
            y_bounds,
        }
    }
}

fn present_runs(series: &DisplaySeries) -> Vec<Vec<(f64, f64)>> {
    let mut runs = Vec::new();
    let mut current = Vec::new();
    for (idx, value) in series.values().enumerate() {
        match value {
            Some(v) => current.push((idx as f64, v)),
            None => {
                if !current.is_empty() {
                    runs.push(std::mem::take(&mut current));
                }
            }
        }
    }
    if !current.is_empty() {
        runs.push(current);
    }
    runs
}

/// Cubic Bezier smoothing through every point of `run`. Control points follow
/// the neighbours' direction, scaled by `tension` and the relative distance
/// to each neighbour.
pub fn smooth(run: &[(f64, f64)], tension: f64) -> Vec<(f64, f64)> {
    if run.len() < 3 || tension <= 0.0 {
        return run.to_vec();
    }

    let controls: Vec<((f64, f64), (f64, f64))> = (0..run.len())
        .map(|i| {
            let prev = run[i.saturating_sub(1)];
            let cur = run[i];
            let next = run[(i + 1).min(run.len() - 1)];
            let d01 = distance(prev, cur);
            let d12 = distance(cur, next);
            let total = d01 + d12;
            let (s01, s12) = if total > 0.0 {
                (d01 / total, d12 / total)
            } else {
                (0.0, 0.0)
            };
            let fa = tension * s01;
            let fb = tension * s12;
            let dx = next.0 - prev.0;
            let dy = next.1 - prev.1;
            (
                (cur.0 - fa * dx, cur.1 - fa * dy),
                (cur.0 + fb * dx, cur.1 + fb * dy),
            )
        })
        .collect();

    let mut out = Vec::with_capacity((run.len() - 1) * SUBDIVISIONS + 1);
    out.push(run[0]);
    for i in 0..run.len() - 1 {
        let p0 = run[i];
        let p1 = controls[i].1;
        let p2 = controls[i + 1].0;
        let p3 = run[i + 1];
        for step in 1..=SUBDIVISIONS {
            let t = step as f64 / SUBDIVISIONS as f64;
            out.push(bezier(p0, p1, p2, p3, t));
        }
    }
    out
}

fn distance(a: (f64, f64), b: (f64, f64)) -> f64 {
    ((b.0 - a.0).powi(2) + (b.1 - a.1).powi(2)).sqrt()
}

fn bezier(p0: (f64, f64), p1: (f64, f64), p2: (f64, f64), p3: (f64, f64), t: f64) -> (f64, f64) {
    let mt = 1.0 - t;
    let a = mt * mt * mt;
    let b = 3.0 * mt * mt * t;
    let c = 3.0 * mt * t * t;
    let d = t * t * t;
    (
        a * p0.0 + b * p1.0 + c * p2.0 + d * p3.0,
        a * p0.1 + b * p1.1 + c * p2.1 + d * p3.1,
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindOutcome {
    Created,
    Updated,
    /// Existing chart moved to a different surface.
    Reanchored,
}

/// Registry of live charts, at most one per field.
#[derive(Debug, Default)]
pub struct ChartBinder {
    style: ChartStyle,
    bindings: HashMap<FieldId, ChartInstance>,
    created: u64,
}

impl ChartBinder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_style(style: ChartStyle) -> Self {
        Self {
            style,
            ..Self::default()
        }
    }

    pub fn style(&self) -> &ChartStyle {
        &self.style
    }

    /// Creates the field's chart on first call; later calls replace its data.
    pub fn bind(&mut self, field: &FieldId, surface: &str, series: DisplaySeries) -> BindOutcome {
        match self.bindings.get_mut(field) {
            Some(instance) => {
                instance.series = series;
                instance.revision += 1;
                if instance.surface != surface {
                    debug!(%field, from = %instance.surface, to = surface, "re-anchoring chart");
                    instance.surface = surface.to_string();
                    BindOutcome::Reanchored
                } else {
                    BindOutcome::Updated
                }
            }
            None => {
                debug!(%field, surface, "creating chart");
                self.bindings.insert(
                    field.clone(),
                    ChartInstance::new(surface, self.style.clone(), series),
                );
                self.created += 1;
                BindOutcome::Created
            }
        }
    }

    pub fn get(&self, field: &FieldId) -> Option<&ChartInstance> {
        self.bindings.get(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FieldId, &ChartInstance)> {
        self.bindings.iter()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Chart instances constructed over the binder's lifetime.
    pub fn instances_created(&self) -> u64 {
        self.created
    }
}
