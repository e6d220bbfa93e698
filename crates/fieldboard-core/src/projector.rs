use tracing::trace;

use crate::models::{DisplaySeries, FieldId};
use crate::page::Page;

/// Shown when the newest sample has no value.
pub const NO_DATA: &str = "--";

pub fn format_value(value: f64) -> String {
    if value == 0.0 {
        // avoids "-0"
        return "0".into();
    }
    value.to_string()
}

pub fn latest_text(series: &DisplaySeries) -> String {
    series
        .last_value()
        .map(format_value)
        .unwrap_or_else(|| NO_DATA.to_string())
}

/// Writes the newest value into `latest-<field>` if the page has it. Returns
/// whether an element was updated; a missing element is not an error.
pub fn project_latest(page: &mut Page, field: &FieldId, series: &DisplaySeries) -> bool {
    let Some(element) = page.element_mut(&field.latest_id()) else {
        trace!(%field, "no latest-value element");
        return false;
    };
    element.text = latest_text(series);
    true
}
