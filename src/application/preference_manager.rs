// Preference manager - per-user display, unit and label preferences
use crate::domain::errors::DashboardResult;
use crate::domain::preferences::{PreferencesPatch, UserPreferences};

#[derive(Debug, Clone)]
pub struct PreferenceManager {
    preferences: UserPreferences,
}

impl PreferenceManager {
    /// Fresh preferences for a user that has none stored yet.
    pub fn initialize_defaults(user_id: &str) -> Self {
        tracing::info!("Initializing default preferences for {}", user_id);
        Self {
            preferences: UserPreferences::defaults(user_id),
        }
    }

    pub fn from_stored(preferences: UserPreferences) -> Self {
        Self { preferences }
    }

    pub fn preferences(&self) -> &UserPreferences {
        &self.preferences
    }

    pub fn update(&mut self, patch: PreferencesPatch) -> DashboardResult<&UserPreferences> {
        self.preferences.apply(patch)?;
        Ok(&self.preferences)
    }

    pub fn remove_custom_label(&mut self, meter_id: &str) -> DashboardResult<&UserPreferences> {
        self.update(PreferencesPatch::remove_custom_label(meter_id))
    }

    pub fn set_chart_color(
        &mut self,
        series_name: &str,
        color: &str,
    ) -> DashboardResult<&UserPreferences> {
        self.update(PreferencesPatch::set_chart_color(series_name, color))
    }

    /// Explicit reset: the only operation that replaces preferences wholesale.
    pub fn reset(&mut self) -> &UserPreferences {
        let user_id = std::mem::take(&mut self.preferences.user_id);
        self.preferences = UserPreferences::defaults(user_id);
        &self.preferences
    }
}
