use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::stream::FuturesUnordered;
use futures_util::{FutureExt, StreamExt};
use tracing::{debug, info, warn};

use crate::binder::{BindOutcome, ChartBinder, ChartInstance};
use crate::error::PipelineError;
use crate::models::{FieldId, SampleSeries};
use crate::normalize::{normalize, LabelFormat};
use crate::page::{Page, Placeholder};
use crate::projector::project_latest;
use crate::source::SampleSource;

/// A finished retrieval waiting to be rendered.
#[derive(Debug)]
pub struct Completion {
    pub placeholder: Placeholder,
    pub outcome: Result<SampleSeries, PipelineError>,
}

/// Retrievals of one discovery pass, all in flight at once.
pub struct Pass {
    pending: FuturesUnordered<BoxFuture<'static, Completion>>,
    started: usize,
}

impl Pass {
    /// Next retrieval to finish, in completion order. `None` once every
    /// retrieval of the pass has been handed out.
    pub async fn next(&mut self) -> Option<Completion> {
        self.pending.next().await
    }

    pub fn started(&self) -> usize {
        self.started
    }

    pub fn remaining(&self) -> usize {
        self.pending.len()
    }

    pub fn is_done(&self) -> bool {
        self.pending.is_empty()
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct PassReport {
    /// Fields rendered, in completion order.
    pub rendered: Vec<FieldId>,
    /// Fields that failed, in completion order, with a diagnostic.
    pub failed: Vec<(FieldId, String)>,
}

impl PassReport {
    pub fn record(&mut self, field: FieldId, result: &Result<BindOutcome, PipelineError>) {
        match result {
            Ok(_) => self.rendered.push(field),
            Err(err) => self.failed.push((field, err.to_string())),
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "{} rendered, {} failed",
            self.rendered.len(),
            self.failed.len()
        )
    }
}

/// Owns the page, its chart bindings, and the source they are fed from.
pub struct Dashboard {
    page: Page,
    binder: ChartBinder,
    source: Arc<dyn SampleSource>,
    labels: LabelFormat,
    results: usize,
}

impl Dashboard {
    pub fn new(page: Page, source: Arc<dyn SampleSource>) -> Self {
        Self {
            page,
            binder: ChartBinder::new(),
            source,
            labels: LabelFormat::default(),
            results: 30,
        }
    }

    pub fn with_labels(mut self, labels: LabelFormat) -> Self {
        self.labels = labels;
        self
    }

    pub fn with_results(mut self, results: usize) -> Self {
        self.results = results.max(1);
        self
    }

    pub fn with_binder(mut self, binder: ChartBinder) -> Self {
        self.binder = binder;
        self
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    pub fn binder(&self) -> &ChartBinder {
        &self.binder
    }

    pub fn chart(&self, field: &FieldId) -> Option<&ChartInstance> {
        self.binder.get(field)
    }

    /// Discovers placeholders and starts one retrieval per field. Nothing is
    /// awaited here; drive the returned pass with [`Pass::next`].
    pub fn begin_pass(&self) -> Pass {
        let placeholders = self.page.placeholders();
        debug!(fields = placeholders.len(), "starting discovery pass");
        let pending: FuturesUnordered<_> = placeholders
            .into_iter()
            .map(|placeholder| retrieve(self.source.clone(), placeholder, self.results))
            .collect();
        Pass {
            started: pending.len(),
            pending,
        }
    }

    /// Renders one completed retrieval: normalize, bind, project. Failures
    /// are logged and returned without touching the page or the binder.
    pub fn apply(&mut self, completion: Completion) -> Result<BindOutcome, PipelineError> {
        let Completion {
            placeholder,
            outcome,
        } = completion;
        let field = placeholder.field;
        let samples = match outcome {
            Ok(samples) => samples,
            Err(err) => {
                warn!(%field, surface = %placeholder.surface, "chart load error: {err}");
                return Err(err);
            }
        };

        let display = normalize(&samples, &self.labels);
        project_latest(&mut self.page, &field, &display);
        let points = display.len();
        let bound = self.binder.bind(&field, &placeholder.surface, display);
        debug!(%field, points, ?bound, "chart rendered");
        Ok(bound)
    }

    /// Runs a full pass, rendering each field as soon as its data arrives.
    pub async fn refresh(&mut self) -> PassReport {
        let mut pass = self.begin_pass();
        let mut report = PassReport::default();
        while let Some(completion) = pass.next().await {
            let field = completion.placeholder.field.clone();
            let result = self.apply(completion);
            report.record(field, &result);
        }
        info!("discovery pass finished: {}", report.summary());
        report
    }
}

fn retrieve(
    source: Arc<dyn SampleSource>,
    placeholder: Placeholder,
    results: usize,
) -> BoxFuture<'static, Completion> {
    async move {
        let outcome = AssertUnwindSafe(source.fetch(&placeholder.field, results))
            .catch_unwind()
            .await
            .map_err(|payload| PipelineError::Panicked(panic_message(payload.as_ref())))
            .and_then(|fetched| fetched.map_err(PipelineError::from));
        Completion {
            placeholder,
            outcome,
        }
    }
    .boxed()
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".into()
    }
}
