// Layout domain model - a named, ordered arrangement of widget instances
use super::widget::WidgetInstance;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardLayout {
    pub layout_id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub widgets: Vec<WidgetInstance>,
    #[serde(default)]
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DashboardLayout {
    pub fn new(layout_id: String, name: String, description: Option<String>, now: DateTime<Utc>) -> Self {
        Self {
            layout_id,
            name,
            description,
            widgets: Vec::new(),
            is_default: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn widget(&self, instance_id: &str) -> Option<&WidgetInstance> {
        self.widgets.iter().find(|w| w.instance_id == instance_id)
    }

    pub fn widget_mut(&mut self, instance_id: &str) -> Option<&mut WidgetInstance> {
        self.widgets.iter_mut().find(|w| w.instance_id == instance_id)
    }

    pub fn index_of(&self, instance_id: &str) -> Option<usize> {
        self.widgets.iter().position(|w| w.instance_id == instance_id)
    }

    /// Move `source_id` into the slot currently held by `target_id`.
    ///
    /// Splice semantics: the source is removed and reinserted at the target's
    /// index, shifting the widgets in between by one. Returns the `(from, to)`
    /// indices, or `None` when either id is missing or both ids are the same.
    /// Position metadata of every widget is left as it was.
    pub fn move_widget(&mut self, source_id: &str, target_id: &str) -> Option<(usize, usize)> {
        if source_id == target_id {
            return None;
        }

        let from = self.index_of(source_id)?;
        let to = self.index_of(target_id)?;

        let widget = self.widgets.remove(from);
        self.widgets.insert(to, widget);
        self.touch();

        Some((from, to))
    }

    pub fn visible_widgets(&self) -> impl Iterator<Item = &WidgetInstance> {
        self.widgets.iter().filter(|w| w.visible)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutPatch {
    #[serde(default)]
    pub name: Option<String>,
    /// `Some(None)` clears the description.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "crate::domain::double_option"
    )]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub is_default: Option<bool>,
}

/// Persisted shape of a user's layout collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutSnapshot {
    #[serde(default)]
    pub layouts: Vec<DashboardLayout>,
    #[serde(default)]
    pub current_layout_id: Option<String>,
}
