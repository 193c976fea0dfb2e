use crate::domain::widget::{WidgetCategory, WidgetKind, WidgetSize, WidgetTemplate};
use anyhow::Context;
use serde::Deserialize;

const BUILTIN_WIDGETS: &str = include_str!("../../config/widgets.toml");

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub grid: GridSettings,
    #[serde(default)]
    pub persistence: PersistenceSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
pub struct GridSettings {
    #[serde(default = "default_columns")]
    pub columns: u32,
}

fn default_columns() -> u32 {
    12
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            columns: default_columns(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PersistenceBackend {
    #[default]
    Memory,
    Remote,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PersistenceSettings {
    #[serde(default)]
    pub backend: PersistenceBackend,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for PersistenceSettings {
    fn default() -> Self {
        Self {
            backend: PersistenceBackend::default(),
            base_url: None,
            token: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct WidgetsConfig {
    #[serde(default)]
    pub templates: Vec<TemplateConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TemplateConfig {
    pub id: String,
    pub kind: WidgetKind,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: String,
    pub width: u32,
    pub height: u32,
    pub category: WidgetCategory,
}

impl From<TemplateConfig> for WidgetTemplate {
    fn from(config: TemplateConfig) -> Self {
        WidgetTemplate {
            template_id: config.id,
            widget_kind: config.kind,
            display_name: config.name,
            description: config.description,
            icon_ref: config.icon,
            default_size: WidgetSize {
                width: config.width,
                height: config.height,
            },
            category: config.category,
        }
    }
}

pub fn load_app_config() -> anyhow::Result<AppConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/dashboard").required(false))
        .add_source(
            config::Environment::with_prefix("DASHBOARD")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    Ok(settings.try_deserialize()?)
}

/// Load the widget catalog from `config/widgets`, falling back to the
/// catalog compiled into the binary when no file is present.
pub fn load_widgets_config() -> anyhow::Result<WidgetsConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/widgets").required(false))
        .build()?;

    let catalog: WidgetsConfig = settings.try_deserialize()?;
    if catalog.templates.is_empty() {
        tracing::info!("No widget catalog file found, using built-in catalog");
        return builtin_widgets_config();
    }

    Ok(catalog)
}

pub fn builtin_widgets_config() -> anyhow::Result<WidgetsConfig> {
    toml::from_str(BUILTIN_WIDGETS).context("Failed to parse built-in widget catalog")
}
