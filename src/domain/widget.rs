// Widget domain models - catalog templates and placed instances
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WidgetKind {
    Chart,
    Table,
    Kpi,
    Summary,
    Matrix,
    Billing,
}

impl WidgetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WidgetKind::Chart => "chart",
            WidgetKind::Table => "table",
            WidgetKind::Kpi => "kpi",
            WidgetKind::Summary => "summary",
            WidgetKind::Matrix => "matrix",
            WidgetKind::Billing => "billing",
        }
    }
}

impl fmt::Display for WidgetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WidgetCategory {
    Energy,
    Billing,
    Analysis,
    Monitoring,
}

impl FromStr for WidgetCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "energy" => Ok(WidgetCategory::Energy),
            "billing" => Ok(WidgetCategory::Billing),
            "analysis" => Ok(WidgetCategory::Analysis),
            "monitoring" => Ok(WidgetCategory::Monitoring),
            other => Err(format!("unknown widget category: {}", other)),
        }
    }
}

/// Category filter for catalog listings. `All` is the catch-all used by the
/// widget picker; `Only` matches the category exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryFilter {
    All,
    Only(WidgetCategory),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WidgetSize {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetTemplate {
    pub template_id: String,
    pub widget_kind: WidgetKind,
    pub display_name: String,
    pub description: String,
    pub icon_ref: String,
    pub default_size: WidgetSize,
    pub category: WidgetCategory,
}

/// Grid placement in column/row units. Width and height are never zero once
/// validated against a grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WidgetPosition {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl WidgetPosition {
    pub fn origin(size: WidgetSize) -> Self {
        Self {
            x: 0,
            y: 0,
            width: size.width,
            height: size.height,
        }
    }

    pub fn merged(&self, patch: &PositionPatch) -> Self {
        Self {
            x: patch.x.unwrap_or(self.x),
            y: patch.y.unwrap_or(self.y),
            width: patch.width.unwrap_or(self.width),
            height: patch.height.unwrap_or(self.height),
        }
    }

    pub fn fits(&self, columns: u32) -> bool {
        self.width > 0 && self.height > 0 && self.x.saturating_add(self.width) <= columns
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionPatch {
    #[serde(default)]
    pub x: Option<u32>,
    #[serde(default)]
    pub y: Option<u32>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChartType {
    #[default]
    Line,
    Bar,
    Area,
    Stacked,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum KpiMetric {
    #[default]
    ActiveEnergy,
    ReactiveEnergy,
    PowerFactor,
    MaxDemand,
    Cost,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SummaryPeriod {
    Day,
    Week,
    #[default]
    Month,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MatrixResolution {
    #[default]
    Hourly,
    QuarterHourly,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChartOptions {
    pub chart_type: ChartType,
    pub show_legend: bool,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            chart_type: ChartType::Line,
            show_legend: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TableOptions {
    pub page_size: u32,
    pub show_totals: bool,
}

impl Default for TableOptions {
    fn default() -> Self {
        Self {
            page_size: 25,
            show_totals: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KpiOptions {
    pub metric: KpiMetric,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SummaryOptions {
    pub period: SummaryPeriod,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MatrixOptions {
    pub resolution: MatrixResolution,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BillingOptions {
    pub show_breakdown: bool,
    pub include_taxes: bool,
}

impl Default for BillingOptions {
    fn default() -> Self {
        Self {
            show_breakdown: true,
            include_taxes: false,
        }
    }
}

/// Kind-specific display options, tagged with the widget kind they belong to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum KindOptions {
    Chart(ChartOptions),
    Table(TableOptions),
    Kpi(KpiOptions),
    Summary(SummaryOptions),
    Matrix(MatrixOptions),
    Billing(BillingOptions),
}

impl KindOptions {
    pub fn for_kind(kind: WidgetKind) -> Self {
        match kind {
            WidgetKind::Chart => KindOptions::Chart(ChartOptions::default()),
            WidgetKind::Table => KindOptions::Table(TableOptions::default()),
            WidgetKind::Kpi => KindOptions::Kpi(KpiOptions::default()),
            WidgetKind::Summary => KindOptions::Summary(SummaryOptions::default()),
            WidgetKind::Matrix => KindOptions::Matrix(MatrixOptions::default()),
            WidgetKind::Billing => KindOptions::Billing(BillingOptions::default()),
        }
    }

    pub fn kind(&self) -> WidgetKind {
        match self {
            KindOptions::Chart(_) => WidgetKind::Chart,
            KindOptions::Table(_) => WidgetKind::Table,
            KindOptions::Kpi(_) => WidgetKind::Kpi,
            KindOptions::Summary(_) => WidgetKind::Summary,
            KindOptions::Matrix(_) => WidgetKind::Matrix,
            KindOptions::Billing(_) => WidgetKind::Billing,
        }
    }
}

/// Display toggles shared by every widget, the typed options of its kind, and
/// any keys this build does not know about (kept so they survive a round trip).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetSettings {
    pub show_active_energy: bool,
    pub show_reactive_energy: bool,
    pub show_comparison: bool,
    pub options: KindOptions,
    #[serde(default, flatten)]
    pub extra: Map<String, Value>,
}

impl WidgetSettings {
    pub fn defaults_for(kind: WidgetKind) -> Self {
        Self {
            show_active_energy: true,
            show_reactive_energy: true,
            show_comparison: false,
            options: KindOptions::for_kind(kind),
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetInstance {
    pub instance_id: String,
    pub template_id: String,
    pub widget_kind: WidgetKind,
    pub title: String,
    pub position: WidgetPosition,
    pub visible: bool,
    pub settings: WidgetSettings,
}

impl WidgetInstance {
    pub fn from_template(instance_id: String, template: &WidgetTemplate) -> Self {
        Self {
            instance_id,
            template_id: template.template_id.clone(),
            widget_kind: template.widget_kind,
            title: template.display_name.clone(),
            position: WidgetPosition::origin(template.default_size),
            visible: true,
            settings: WidgetSettings::defaults_for(template.widget_kind),
        }
    }

    /// Shallow merge: each provided field replaces the current value whole.
    pub fn apply(&mut self, patch: WidgetPatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(visible) = patch.visible {
            self.visible = visible;
        }
        if let Some(settings) = patch.settings {
            self.settings = settings;
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub visible: Option<bool>,
    #[serde(default)]
    pub settings: Option<WidgetSettings>,
}
