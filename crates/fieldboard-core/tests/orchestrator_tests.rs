use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use fieldboard_core::binder::BindOutcome;
use fieldboard_core::config::FieldConfig;
use fieldboard_core::error::FetchError;
use fieldboard_core::models::{FieldId, Sample, SampleSeries};
use fieldboard_core::normalize::LabelFormat;
use fieldboard_core::orchestrator::Dashboard;
use fieldboard_core::page::{Element, Page};
use fieldboard_core::source::SampleSource;
use fieldboard_core::timeutils::ClockStyle;

#[derive(Clone)]
enum Script {
    Samples(Vec<Sample>),
    Slow(Duration, Vec<Sample>),
    Status(u16),
    Panic,
}

#[derive(Default)]
struct ScriptedSource {
    scripts: HashMap<String, Script>,
    requests: Mutex<Vec<(String, usize)>>,
}

impl ScriptedSource {
    fn with(mut self, field: &str, script: Script) -> Self {
        self.scripts.insert(field.to_string(), script);
        self
    }

    fn requests(&self) -> Vec<(String, usize)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl SampleSource for ScriptedSource {
    async fn fetch(&self, field: &FieldId, results: usize) -> Result<SampleSeries, FetchError> {
        self.requests
            .lock()
            .unwrap()
            .push((field.to_string(), results));
        match self.scripts.get(field.as_str()).cloned() {
            Some(Script::Samples(samples)) => Ok(samples.into_iter().collect()),
            Some(Script::Slow(delay, samples)) => {
                tokio::time::sleep(delay).await;
                Ok(samples.into_iter().collect())
            }
            Some(Script::Status(status)) => Err(FetchError::Status { status }),
            Some(Script::Panic) => panic!("source exploded for {field}"),
            None => Err(FetchError::Status { status: 404 }),
        }
    }
}

fn minutes(values: &[Option<f64>]) -> Vec<Sample> {
    values
        .iter()
        .enumerate()
        .map(|(i, v)| {
            let ts = format!("2024-01-01T00:{i:02}:00Z");
            match v {
                Some(v) => Sample::number(ts, *v),
                None => Sample::missing(ts),
            }
        })
        .collect()
}

fn page(fields: &[&str]) -> Page {
    let fields: Vec<FieldConfig> = fields.iter().map(|f| FieldConfig::new(*f)).collect();
    Page::from_fields(&fields)
}

fn dashboard(page: Page, source: Arc<ScriptedSource>) -> Dashboard {
    Dashboard::new(page, source).with_labels(LabelFormat::utc(ClockStyle::TwelveHour))
}

#[tokio::test]
async fn renders_chart_and_latest_with_gap() {
    let source = Arc::new(
        ScriptedSource::default().with("cpu", Script::Samples(minutes(&[Some(41.2), None]))),
    );
    let mut dash = dashboard(page(&["cpu"]), source.clone());

    let report = dash.refresh().await;
    assert_eq!(report.rendered, vec![FieldId::new("cpu")]);
    assert!(report.failed.is_empty());

    let chart = dash.chart(&FieldId::new("cpu")).expect("cpu chart");
    assert_eq!(chart.surface(), "chart-cpu");
    let labels: Vec<&str> = chart.series().labels().collect();
    assert_eq!(labels, vec!["12:00:00 AM", "12:01:00 AM"]);
    let values: Vec<Option<f64>> = chart.series().values().collect();
    assert_eq!(values, vec![Some(41.2), None]);
    assert_eq!(dash.page().element("latest-cpu").unwrap().text, "--");
    assert_eq!(source.requests(), vec![("cpu".to_string(), 30)]);
}

#[tokio::test]
async fn failing_field_does_not_block_others() {
    let source = Arc::new(
        ScriptedSource::default()
            .with("mem", Script::Status(500))
            .with("cpu", Script::Samples(minutes(&[Some(1.0), Some(2.0)])))
            .with("disk", Script::Panic)
            .with("net", Script::Samples(minutes(&[Some(10.0), Some(20.0), Some(30.0)]))),
    );
    let mut dash = dashboard(page(&["mem", "cpu", "disk", "net"]), source);
    dash.page().element("latest-mem").expect("latest element exists");

    let report = dash.refresh().await;

    let mut rendered = report.rendered.clone();
    rendered.sort();
    assert_eq!(rendered, vec![FieldId::new("cpu"), FieldId::new("net")]);
    let failed: Vec<&str> = report.failed.iter().map(|(f, _)| f.as_str()).collect();
    assert_eq!(failed.len(), 2);
    assert!(failed.contains(&"mem") && failed.contains(&"disk"));
    assert!(report
        .failed
        .iter()
        .any(|(f, msg)| f.as_str() == "disk" && msg.contains("panicked")));

    assert!(dash.chart(&FieldId::new("mem")).is_none());
    assert!(dash.chart(&FieldId::new("disk")).is_none());
    assert_eq!(dash.page().element("latest-mem").unwrap().text, "");
    assert_eq!(dash.page().element("latest-net").unwrap().text, "30");
    assert_eq!(dash.page().element("latest-cpu").unwrap().text, "2");
}

#[tokio::test]
async fn fast_field_renders_before_slow_one() {
    let source = Arc::new(
        ScriptedSource::default()
            .with(
                "a",
                Script::Slow(Duration::from_millis(80), minutes(&[Some(1.0), Some(5.0)])),
            )
            .with("b", Script::Samples(minutes(&[Some(2.0)]))),
    );
    let mut dash = dashboard(page(&["a", "b"]), source);

    let mut pass = dash.begin_pass();
    assert_eq!(pass.started(), 2);

    let first = pass.next().await.expect("first completion");
    assert_eq!(first.placeholder.field, FieldId::new("b"));
    dash.apply(first).expect("b renders");
    assert!(dash.chart(&FieldId::new("b")).is_some());
    assert!(dash.chart(&FieldId::new("a")).is_none());

    let second = pass.next().await.expect("second completion");
    assert_eq!(second.placeholder.field, FieldId::new("a"));
    dash.apply(second).expect("a renders");
    assert_eq!(dash.page().element("latest-a").unwrap().text, "5");
    assert!(pass.next().await.is_none());
    assert!(pass.is_done());
}

#[tokio::test]
async fn repeated_passes_reuse_charts() {
    let source = Arc::new(
        ScriptedSource::default().with("cpu", Script::Samples(minutes(&[Some(3.0)]))),
    );
    let mut dash = dashboard(page(&["cpu"]), source.clone()).with_results(12);

    for _ in 0..3 {
        dash.refresh().await;
    }
    assert_eq!(dash.binder().len(), 1);
    assert_eq!(dash.binder().instances_created(), 1);
    assert_eq!(dash.chart(&FieldId::new("cpu")).unwrap().revision(), 3);
    assert_eq!(source.requests().len(), 3);
    assert!(source.requests().iter().all(|(_, n)| *n == 12));
}

#[tokio::test]
async fn first_bind_creates_then_updates() {
    let source = Arc::new(
        ScriptedSource::default().with("cpu", Script::Samples(minutes(&[Some(3.0)]))),
    );
    let mut dash = dashboard(page(&["cpu"]), source);

    let mut pass = dash.begin_pass();
    let outcome = dash.apply(pass.next().await.unwrap()).unwrap();
    assert_eq!(outcome, BindOutcome::Created);

    let mut pass = dash.begin_pass();
    let outcome = dash.apply(pass.next().await.unwrap()).unwrap();
    assert_eq!(outcome, BindOutcome::Updated);
}

#[tokio::test]
async fn chart_without_companion_still_renders() {
    let mut page = Page::new();
    page.insert(Element::surface("chart-solo"));
    page.insert(Element::text("footer"));
    let source = Arc::new(
        ScriptedSource::default().with("solo", Script::Samples(minutes(&[Some(9.0)]))),
    );
    let mut dash = dashboard(page, source);

    let report = dash.refresh().await;
    assert_eq!(report.rendered, vec![FieldId::new("solo")]);
    assert!(dash.page().element("latest-solo").is_none());
    assert_eq!(dash.page().len(), 2);
}

#[tokio::test]
async fn empty_page_runs_no_pipelines() {
    let source = Arc::new(ScriptedSource::default());
    let mut dash = dashboard(Page::new(), source.clone());
    let report = dash.refresh().await;
    assert!(report.rendered.is_empty() && report.failed.is_empty());
    assert!(source.requests().is_empty());
}
