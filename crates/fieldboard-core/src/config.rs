use crate::models::FieldId;
use crate::normalize::LabelFormat;
use crate::page::Page;
use crate::timeutils::{parse_offset, ClockStyle};
use anyhow::{Context, Result};
use directories::{BaseDirs, ProjectDirs};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub viewer: ViewerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default = "FieldConfig::default_fields")]
    pub fields: Vec<FieldConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source: SourceConfig::default(),
            viewer: ViewerConfig::default(),
            logging: LoggingConfig::default(),
            fields: FieldConfig::default_fields(),
        }
    }
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "fieldboard", "fieldboard")
            .context("cannot locate config directory")?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path.map(PathBuf::from).unwrap_or_else(|| {
            Config::default_path().unwrap_or_else(|_| PathBuf::from("./config.toml"))
        });
        let mut cfg = if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("reading config at {:?}", path))?;
            Config::from_toml(&content)?
        } else {
            Config::default()
        };
        cfg.expand_paths();
        Ok(cfg)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let cfg: Config = toml::from_str(content).context("parsing config")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.source.results == 0 {
            anyhow::bail!("source.results must be at least 1");
        }
        let mut seen = std::collections::HashSet::new();
        for field in &self.fields {
            let id = field.id.trim();
            if id.is_empty() {
                anyhow::bail!("field ids must not be empty");
            }
            if !seen.insert(id) {
                anyhow::bail!("field {:?} is listed twice", field.id);
            }
        }
        Ok(())
    }

    pub fn expand_paths(&mut self) {
        if let Some(file) = &self.logging.file {
            self.logging.file = Some(expand_tilde(file));
        }
    }

    pub fn page(&self) -> Page {
        Page::from_fields(&self.fields)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "SourceConfig::default_base_url")]
    pub base_url: String,
    #[serde(default = "SourceConfig::default_results")]
    pub results: usize,
    #[serde(default = "SourceConfig::default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
    /// Extra request headers, e.g. a session cookie.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: Self::default_base_url(),
            results: Self::default_results(),
            timeout: Self::default_timeout(),
            headers: BTreeMap::new(),
        }
    }
}

impl SourceConfig {
    fn default_base_url() -> String {
        "http://127.0.0.1:5000".into()
    }

    fn default_results() -> usize {
        30
    }

    fn default_timeout() -> Duration {
        Duration::from_secs(10)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewerConfig {
    #[serde(default = "ViewerConfig::default_refresh", with = "humantime_serde")]
    pub refresh: Duration,
    #[serde(default)]
    pub clock: ClockStyle,
    #[serde(default = "ViewerConfig::default_utc_offset")]
    pub utc_offset: String,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            refresh: Self::default_refresh(),
            clock: ClockStyle::default(),
            utc_offset: Self::default_utc_offset(),
        }
    }
}

impl ViewerConfig {
    fn default_refresh() -> Duration {
        Duration::from_secs(30)
    }

    fn default_utc_offset() -> String {
        "local".into()
    }

    pub fn label_format(&self) -> Result<LabelFormat> {
        Ok(LabelFormat {
            offset: parse_offset(&self.utc_offset)?,
            clock: self.clock,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            file: Some(PathBuf::from("~/.local/state/fieldboard/fieldboard.log")),
        }
    }
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".into()
    }
}

/// One monitored field on the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldConfig {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    /// Whether the page carries a `latest-<id>` element for this field.
    #[serde(default = "FieldConfig::default_latest")]
    pub latest: bool,
}

impl FieldConfig {
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self {
            id: id.into(),
            title: None,
            latest: true,
        }
    }

    fn default_latest() -> bool {
        true
    }

    pub fn field_id(&self) -> FieldId {
        FieldId::new(self.id.trim())
    }

    pub fn display_title(&self) -> String {
        self.title
            .clone()
            .unwrap_or_else(|| format!("Field {}", self.id.trim()))
    }

    pub fn default_fields() -> Vec<FieldConfig> {
        [
            ("1", "LDR1 (V)"),
            ("2", "LDR2 (Cm)"),
            ("3", "LDR3"),
            ("4", "LDR4 (V)"),
            ("5", "Dust Level (Cm)"),
            ("6", "Panel Output (V)"),
            ("7", "Dust Level (Cm)"),
            ("8", "Cleaning Status"),
        ]
        .into_iter()
        .map(|(id, title)| FieldConfig {
            id: id.into(),
            title: Some(title.into()),
            latest: true,
        })
        .collect()
    }
}

/// Parses a comma separated `--fields` list.
pub fn parse_field_list(spec: &str) -> Vec<FieldConfig> {
    spec.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(FieldConfig::new)
        .collect()
}

fn expand_tilde(path: &Path) -> PathBuf {
    let path_str = path.to_string_lossy();
    if !path_str.starts_with('~') {
        return path.to_path_buf();
    }

    let home = BaseDirs::new()
        .map(|d| d.home_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."));

    if path_str == "~" {
        home
    } else {
        let mut expanded = home;
        expanded.push(path_str.trim_start_matches("~/"));
        expanded
    }
}
