// User preference domain model - units, formats, labels and series colors
use super::errors::{DashboardError, DashboardResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const DEFAULT_TIMEZONE: &str = "Europe/Madrid";
pub const DEFAULT_REFRESH_INTERVAL_SECONDS: u32 = 30;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnergyUnit {
    #[serde(rename = "Wh")]
    WattHour,
    #[default]
    #[serde(rename = "kWh")]
    KilowattHour,
    #[serde(rename = "MWh")]
    MegawattHour,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReactiveUnit {
    #[serde(rename = "VArh")]
    VoltAmpereReactiveHour,
    #[default]
    #[serde(rename = "kVArh")]
    KiloVoltAmpereReactiveHour,
    #[serde(rename = "MVArh")]
    MegaVoltAmpereReactiveHour,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DateFormat {
    #[default]
    #[serde(rename = "DD/MM/YYYY")]
    DayMonthYear,
    #[serde(rename = "MM/DD/YYYY")]
    MonthDayYear,
    #[serde(rename = "YYYY-MM-DD")]
    Iso,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeFormat {
    #[default]
    #[serde(rename = "24h")]
    TwentyFourHour,
    #[serde(rename = "12h")]
    TwelveHour,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Units {
    pub energy: EnergyUnit,
    pub reactive: ReactiveUnit,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomLabel {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl CustomLabel {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPreferences {
    pub user_id: String,
    pub units: Units,
    pub timezone: String,
    pub date_format: DateFormat,
    pub time_format: TimeFormat,
    #[serde(default)]
    pub custom_labels: HashMap<String, CustomLabel>,
    #[serde(default)]
    pub chart_colors: HashMap<String, String>,
    #[serde(default)]
    pub default_layout_id: Option<String>,
    pub auto_refresh: bool,
    pub refresh_interval_seconds: u32,
}

impl UserPreferences {
    pub fn defaults(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            units: Units::default(),
            timezone: DEFAULT_TIMEZONE.to_string(),
            date_format: DateFormat::DayMonthYear,
            time_format: TimeFormat::TwentyFourHour,
            custom_labels: HashMap::new(),
            chart_colors: HashMap::new(),
            default_layout_id: None,
            auto_refresh: true,
            refresh_interval_seconds: DEFAULT_REFRESH_INTERVAL_SECONDS,
        }
    }

    /// Deep merge. Label and color maps merge key by key; a `null` entry
    /// removes that key. The patch is validated before anything changes.
    pub fn apply(&mut self, patch: PreferencesPatch) -> DashboardResult<()> {
        if patch.refresh_interval_seconds == Some(0) {
            return Err(DashboardError::validation(
                "refresh interval must be at least one second",
            ));
        }
        if let Some(timezone) = &patch.timezone {
            if timezone.trim().is_empty() {
                return Err(DashboardError::validation("timezone must not be empty"));
            }
        }

        if let Some(units) = patch.units {
            if let Some(energy) = units.energy {
                self.units.energy = energy;
            }
            if let Some(reactive) = units.reactive {
                self.units.reactive = reactive;
            }
        }
        if let Some(timezone) = patch.timezone {
            self.timezone = timezone;
        }
        if let Some(date_format) = patch.date_format {
            self.date_format = date_format;
        }
        if let Some(time_format) = patch.time_format {
            self.time_format = time_format;
        }
        if let Some(labels) = patch.custom_labels {
            merge_entries(&mut self.custom_labels, labels);
        }
        if let Some(colors) = patch.chart_colors {
            merge_entries(&mut self.chart_colors, colors);
        }
        if let Some(default_layout_id) = patch.default_layout_id {
            self.default_layout_id = default_layout_id;
        }
        if let Some(auto_refresh) = patch.auto_refresh {
            self.auto_refresh = auto_refresh;
        }
        if let Some(interval) = patch.refresh_interval_seconds {
            self.refresh_interval_seconds = interval;
        }

        Ok(())
    }
}

fn merge_entries<V>(target: &mut HashMap<String, V>, entries: HashMap<String, Option<V>>) {
    for (key, value) in entries {
        match value {
            Some(value) => {
                target.insert(key, value);
            }
            None => {
                target.remove(&key);
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitsPatch {
    #[serde(default)]
    pub energy: Option<EnergyUnit>,
    #[serde(default)]
    pub reactive: Option<ReactiveUnit>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesPatch {
    #[serde(default)]
    pub units: Option<UnitsPatch>,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub date_format: Option<DateFormat>,
    #[serde(default)]
    pub time_format: Option<TimeFormat>,
    #[serde(default)]
    pub custom_labels: Option<HashMap<String, Option<CustomLabel>>>,
    #[serde(default)]
    pub chart_colors: Option<HashMap<String, Option<String>>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "crate::domain::double_option"
    )]
    pub default_layout_id: Option<Option<String>>,
    #[serde(default)]
    pub auto_refresh: Option<bool>,
    #[serde(default)]
    pub refresh_interval_seconds: Option<u32>,
}

impl PreferencesPatch {
    pub fn remove_custom_label(meter_id: &str) -> Self {
        Self {
            custom_labels: Some(HashMap::from([(meter_id.to_string(), None)])),
            ..Default::default()
        }
    }

    pub fn set_chart_color(series_name: &str, color: &str) -> Self {
        Self {
            chart_colors: Some(HashMap::from([(
                series_name.to_string(),
                Some(color.to_string()),
            )])),
            ..Default::default()
        }
    }
}
