pub mod binder;
pub mod config;
pub mod error;
pub mod models;
pub mod normalize;
pub mod orchestrator;
pub mod page;
pub mod projector;
pub mod source;
pub mod timeutils;

pub use binder::{BindOutcome, ChartBinder, ChartInstance, ChartStyle, FillSpan, Plot, Rgba};
pub use config::{Config, FieldConfig, LoggingConfig, SourceConfig, ViewerConfig};
pub use error::{FetchError, PipelineError};
pub use models::{DisplayPoint, DisplaySeries, FieldId, RawValue, Sample, SampleSeries};
pub use normalize::{normalize, LabelFormat};
pub use orchestrator::{Completion, Dashboard, Pass, PassReport};
pub use page::{Element, ElementKind, Page, Placeholder};
pub use projector::{latest_text, project_latest, NO_DATA};
pub use source::{HttpSampleSource, SampleSource, WireSeries};
pub use timeutils::{now_utc, parse_offset, parse_timestamp, ClockStyle};
