use anyhow::{Context, Result};
use clap::Parser;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use fieldboard_core::binder::{ChartInstance, Plot, Rgba};
use fieldboard_core::config::{parse_field_list, Config};
use fieldboard_core::orchestrator::{Completion, Dashboard, Pass, PassReport};
use fieldboard_core::page::ElementKind;
use fieldboard_core::timeutils::{format_time_of_day, now_utc};
use fieldboard_core::{HttpSampleSource, LabelFormat};
use once_cell::sync::OnceCell;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::symbols::Marker;
use ratatui::text::Span;
use ratatui::widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, Paragraph};
use ratatui::Terminal;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::util::SubscriberInitExt;

/// How long the loop waits on in-flight retrievals before redrawing.
const PASS_POLL: Duration = Duration::from_millis(100);
const TICK: Duration = Duration::from_millis(250);
const EXPORT_PATH: &str = "fieldboard-export.csv";

#[derive(Parser, Debug)]
#[command(author, version, about = "fieldboard: live charts for monitored fields")]
struct Args {
    /// Path to config TOML
    #[arg(long)]
    config: Option<PathBuf>,
    /// Override the sample endpoint base url
    #[arg(long)]
    base_url: Option<String>,
    /// Samples requested per field
    #[arg(long)]
    results: Option<usize>,
    /// Comma separated field ids, replaces the configured fields
    #[arg(long)]
    fields: Option<String>,
    /// Interval between discovery passes
    #[arg(long)]
    refresh: Option<humantime::Duration>,
    /// Run a single pass and print the rendered series as CSV
    #[arg(long)]
    once: bool,
}

struct App {
    dashboard: Dashboard,
    labels: LabelFormat,
    base_url: String,
    refresh: Duration,
    pass: Option<Pass>,
    report: PassReport,
    last_pass: Option<Instant>,
    status: String,
}

impl App {
    fn new(config: &Config) -> Result<Self> {
        let labels = config.viewer.label_format()?;
        let source = HttpSampleSource::new(&config.source)?;
        let dashboard = Dashboard::new(config.page(), Arc::new(source))
            .with_labels(labels)
            .with_results(config.source.results);
        Ok(Self {
            dashboard,
            labels,
            base_url: config.source.base_url.clone(),
            refresh: config.viewer.refresh,
            pass: None,
            report: PassReport::default(),
            last_pass: None,
            status: String::from("q quit, r refresh, c export csv"),
        })
    }

    fn start_pass(&mut self) {
        if self.pass.is_some() {
            return;
        }
        let pass = self.dashboard.begin_pass();
        self.status = format!("loading {} fields", pass.started());
        self.report = PassReport::default();
        self.last_pass = Some(Instant::now());
        self.pass = Some(pass);
    }

    fn apply(&mut self, completion: Completion) {
        let field = completion.placeholder.field.clone();
        let result = self.dashboard.apply(completion);
        self.report.record(field, &result);
    }

    fn finish_pass(&mut self) {
        self.pass = None;
        let now = now_utc().to_offset(self.labels.offset);
        let at = format_time_of_day(now, self.labels.clock).unwrap_or_default();
        info!("discovery pass finished: {}", self.report.summary());
        self.status = format!("updated {at}: {}", self.report.summary());
    }

    fn refresh_due(&self) -> bool {
        self.pass.is_none()
            && self
                .last_pass
                .map_or(true, |at| at.elapsed() >= self.refresh)
    }
}

fn apply_overrides(config: &mut Config, args: &Args) {
    if let Some(url) = &args.base_url {
        config.source.base_url = url.clone();
    }
    if let Some(results) = args.results {
        config.source.results = results.max(1);
    }
    if let Some(fields) = &args.fields {
        let fields = parse_field_list(fields);
        if !fields.is_empty() {
            config.fields = fields;
        }
    }
    if let Some(refresh) = args.refresh {
        config.viewer.refresh = *refresh;
    }
}

fn export_csv<W: Write>(dashboard: &Dashboard, mut writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(&mut writer);
    csv_writer.write_record(["field", "label", "value"])?;
    for placeholder in dashboard.page().placeholders() {
        let Some(chart) = dashboard.chart(&placeholder.field) else {
            continue;
        };
        for point in &chart.series().points {
            let value = point.value.map(|v| v.to_string()).unwrap_or_default();
            csv_writer.write_record([placeholder.field.as_str(), point.label.as_str(), value.as_str()])?;
        }
    }
    csv_writer.flush()?;
    Ok(())
}

fn color(rgba: Rgba) -> Color {
    Color::Rgb(rgba.r, rgba.g, rgba.b)
}

/// Points filling each span from the floor to the line, spaced at braille
/// dot height for an area `rows` tall.
fn fill_points(plot: &Plot, rows: u16) -> Vec<(f64, f64)> {
    let dots = (rows.max(1) as f64) * 4.0;
    let step = (plot.y_bounds[1] - plot.y_bounds[0]) / dots;
    if step <= 0.0 {
        return Vec::new();
    }
    let mut points = Vec::new();
    for span in &plot.fill {
        // counted, not accumulated: at large magnitudes `floor + step` can equal `floor`
        let count = ((span.top - span.floor) / step).ceil().clamp(0.0, dots) as usize;
        points.extend((0..count).map(|i| (span.x, span.floor + i as f64 * step)));
    }
    points
}

/// Columns and rows of the chart grid.
fn grid(count: usize) -> (usize, usize) {
    let cols = if count > 1 { 2 } else { 1 };
    let rows = count.div_ceil(cols).max(1);
    (cols, rows)
}

fn draw_chart(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    title: &str,
    latest: Option<&str>,
    chart: Option<&ChartInstance>,
) {
    let block_title = match latest {
        Some(text) => format!(" {title}  {text} "),
        None => format!(" {title} "),
    };
    let block = Block::default().borders(Borders::ALL).title(block_title);

    let Some(chart) = chart else {
        frame.render_widget(Paragraph::new("waiting for data").block(block), area);
        return;
    };
    let plot = chart.plot();
    if plot.is_empty() {
        frame.render_widget(Paragraph::new("no data").block(block), area);
        return;
    }

    let style = chart.style();
    let fill = fill_points(&plot, area.height.saturating_sub(2));
    let mut datasets = Vec::new();
    if let Some(fill_color) = style.fill {
        datasets.push(
            Dataset::default()
                .marker(Marker::Braille)
                .graph_type(GraphType::Scatter)
                .style(
                    Style::default()
                        .fg(color(fill_color))
                        .add_modifier(Modifier::DIM),
                )
                .data(&fill),
        );
    }
    for segment in &plot.segments {
        let graph = if segment.len() > 1 {
            GraphType::Line
        } else {
            GraphType::Scatter
        };
        datasets.push(
            Dataset::default()
                .marker(Marker::Braille)
                .graph_type(graph)
                .style(Style::default().fg(color(style.accent)))
                .data(segment),
        );
    }

    let mut x_axis = Axis::default().bounds(plot.x_bounds);
    if style.show_x_axis {
        let labels: Vec<Span> = [chart.series().points.first(), chart.series().points.last()]
            .into_iter()
            .flatten()
            .map(|p| Span::raw(p.label.clone()))
            .collect();
        x_axis = x_axis.labels(labels);
    }
    let y_axis = Axis::default().bounds(plot.y_bounds).labels(vec![
        Span::raw(format!("{:.1}", plot.y_bounds[0])),
        Span::raw(format!("{:.1}", plot.y_bounds[1])),
    ]);

    let mut widget = Chart::new(datasets)
        .block(block)
        .x_axis(x_axis)
        .y_axis(y_axis);
    if !style.show_legend {
        widget = widget.legend_position(None);
    }
    frame.render_widget(widget, area);
}

fn draw_ui(frame: &mut ratatui::Frame<'_>, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(5),
            Constraint::Length(3),
        ])
        .split(frame.size());

    let placeholders = app.dashboard.page().placeholders();
    let header_text = format!(
        "Source: {} | Refresh: {} | Fields: {}",
        app.base_url,
        humantime::format_duration(app.refresh),
        placeholders.len()
    );
    let header = Paragraph::new(header_text)
        .block(Block::default().borders(Borders::ALL).title("fieldboard"));
    frame.render_widget(header, chunks[0]);

    if placeholders.is_empty() {
        let empty = Paragraph::new("no fields configured")
            .block(Block::default().borders(Borders::ALL).title("Charts"));
        frame.render_widget(empty, chunks[1]);
    } else {
        let (cols, rows) = grid(placeholders.len());
        let row_areas = Layout::default()
            .direction(Direction::Vertical)
            .constraints(vec![Constraint::Ratio(1, rows as u32); rows])
            .split(chunks[1]);
        for (idx, placeholder) in placeholders.iter().enumerate() {
            let col_areas = Layout::default()
                .direction(Direction::Horizontal)
                .constraints(vec![Constraint::Ratio(1, cols as u32); cols])
                .split(row_areas[idx / cols]);
            let page = app.dashboard.page();
            let title = page
                .element(&placeholder.surface)
                .and_then(|e| e.title.clone())
                .unwrap_or_else(|| placeholder.field.to_string());
            let latest = page
                .element(&placeholder.field.latest_id())
                .filter(|e| e.kind == ElementKind::Text && !e.text.is_empty())
                .map(|e| e.text.as_str());
            draw_chart(
                frame,
                col_areas[idx % cols],
                &title,
                latest,
                app.dashboard.chart(&placeholder.field),
            );
        }
    }

    let mut footer_text = app.status.clone();
    if let Some((field, err)) = app.report.failed.last() {
        footer_text.push_str(&format!(" | last error {field}: {err}"));
    }
    let footer = Paragraph::new(footer_text)
        .block(Block::default().borders(Borders::ALL).title("Status"))
        .style(Style::default().fg(Color::White));
    frame.render_widget(footer, chunks[2]);
}

fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    rt: &tokio::runtime::Runtime,
    app: &mut App,
) -> Result<()> {
    loop {
        if app.refresh_due() {
            app.start_pass();
        }
        terminal.draw(|f| draw_ui(f, app))?;

        if let Some(pass) = app.pass.as_mut() {
            match rt.block_on(tokio::time::timeout(PASS_POLL, pass.next())) {
                Ok(Some(completion)) => app.apply(completion),
                Ok(None) => app.finish_pass(),
                Err(_) => {}
            }
        }

        let wait = if app.pass.is_some() {
            Duration::ZERO
        } else {
            TICK
        };
        if event::poll(wait)? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                match key.code {
                    KeyCode::Char('q') => return Ok(()),
                    KeyCode::Char('r') => app.start_pass(),
                    KeyCode::Char('c') => {
                        let written = std::fs::File::create(EXPORT_PATH)
                            .context("creating export file")
                            .and_then(|file| export_csv(&app.dashboard, file));
                        app.status = match written {
                            Ok(()) => format!("csv exported to {EXPORT_PATH}"),
                            Err(err) => {
                                warn!("csv export failed: {err:#}");
                                format!("csv export failed: {err}")
                            }
                        };
                    }
                    _ => {}
                }
            }
        }
    }
}

fn run_tui(rt: &tokio::runtime::Runtime, mut app: App) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let result = event_loop(&mut terminal, rt, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), terminal::LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    result
}

fn init_logging(config: &Config) -> Result<()> {
    let writer: BoxMakeWriter = if let Some(path) = &config.logging.file {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("opening log file at {:?}", path))?;
        let (writer, guard) = tracing_appender::non_blocking(file);
        static LOG_GUARD: OnceCell<tracing_appender::non_blocking::WorkerGuard> = OnceCell::new();
        let _ = LOG_GUARD.set(guard);
        BoxMakeWriter::new(writer)
    } else {
        BoxMakeWriter::new(std::io::stderr)
    };

    let ansi = config.logging.file.is_none() && atty::is(atty::Stream::Stderr);
    tracing_subscriber::fmt()
        .with_env_filter(config.logging.level.clone())
        .with_ansi(ansi)
        .with_target(false)
        .with_level(true)
        .with_writer(writer)
        .finish()
        .try_init()
        .ok();
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    let mut config = Config::load(args.config.as_deref())?;
    apply_overrides(&mut config, &args);
    config.validate()?;

    init_logging(&config)?;
    info!(fields = config.fields.len(), source = %config.source.base_url, "starting fieldboard");

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("building runtime")?;
    let app = App::new(&config)?;

    if args.once {
        let mut dashboard = app.dashboard;
        let report = rt.block_on(dashboard.refresh());
        for (field, err) in &report.failed {
            warn!(%field, "no chart rendered: {err}");
        }
        let stdout = io::stdout();
        export_csv(&dashboard, stdout.lock())?;
        return Ok(());
    }

    run_tui(&rt, app)?;
    info!("fieldboard stopped");
    Ok(())
}
