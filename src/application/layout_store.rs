// Layout store - the named layouts of one user and which one is current
use crate::application::widget_manager::WidgetInstanceManager;
use crate::domain::errors::{DashboardError, DashboardResult};
use crate::domain::layout::{DashboardLayout, LayoutPatch, LayoutSnapshot};
use crate::domain::widget::PositionPatch;
use chrono::Utc;
use uuid::Uuid;

pub const DEFAULT_LAYOUT_NAME: &str = "Main Dashboard";

/// Starter widgets of the bootstrap layout: template id and grid origin.
const STARTER_WIDGETS: [(&str, u32, u32); 4] = [
    ("energy-summary", 0, 0),
    ("energy-chart", 0, 2),
    ("kpi-active-energy", 8, 2),
    ("kpi-reactive-energy", 8, 4),
];

/// Owns a user's layouts. The current layout is held by id and always names
/// a member of `layouts`, so readers never see a stale copy.
#[derive(Debug, Clone, Default)]
pub struct LayoutStore {
    layouts: Vec<DashboardLayout>,
    current_id: Option<String>,
}

impl LayoutStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore from persisted state. A current id that does not name a stored
    /// layout falls back to the first layout.
    pub fn from_snapshot(snapshot: LayoutSnapshot) -> Self {
        let mut store = Self {
            layouts: snapshot.layouts,
            current_id: snapshot.current_layout_id,
        };

        let current_is_member = store
            .current_id
            .as_deref()
            .is_some_and(|id| store.position(id).is_some());
        if !current_is_member {
            if let Some(stale) = &store.current_id {
                tracing::warn!("Stored current layout {} no longer exists", stale);
            }
            store.current_id = store.layouts.first().map(|l| l.layout_id.clone());
        }

        store
    }

    pub fn snapshot(&self) -> LayoutSnapshot {
        LayoutSnapshot {
            layouts: self.layouts.clone(),
            current_layout_id: self.current_id.clone(),
        }
    }

    pub fn layouts(&self) -> &[DashboardLayout] {
        &self.layouts
    }

    pub fn is_empty(&self) -> bool {
        self.layouts.is_empty()
    }

    fn position(&self, layout_id: &str) -> Option<usize> {
        self.layouts.iter().position(|l| l.layout_id == layout_id)
    }

    fn require(&self, layout_id: &str) -> DashboardResult<usize> {
        self.position(layout_id)
            .ok_or_else(|| DashboardError::LayoutNotFound(layout_id.to_string()))
    }

    pub fn layout(&self, layout_id: &str) -> DashboardResult<&DashboardLayout> {
        let index = self.require(layout_id)?;
        Ok(&self.layouts[index])
    }

    pub fn layout_mut(&mut self, layout_id: &str) -> DashboardResult<&mut DashboardLayout> {
        let index = self.require(layout_id)?;
        Ok(&mut self.layouts[index])
    }

    pub fn current_id(&self) -> Option<&str> {
        self.current_id.as_deref()
    }

    pub fn current(&self) -> Option<&DashboardLayout> {
        self.current_id
            .as_deref()
            .and_then(|id| self.layouts.iter().find(|l| l.layout_id == id))
    }

    pub fn current_mut(&mut self) -> Option<&mut DashboardLayout> {
        let id = self.current_id.as_deref()?;
        self.layouts.iter_mut().find(|l| l.layout_id == id)
    }

    pub fn create_layout(
        &mut self,
        name: &str,
        description: Option<String>,
    ) -> DashboardResult<&DashboardLayout> {
        let name = validate_name(name)?;
        let layout_id = format!("layout-{}", Uuid::new_v4());
        let layout = DashboardLayout::new(layout_id, name, description, Utc::now());

        tracing::info!("Created layout {} ({})", layout.layout_id, layout.name);
        self.layouts.push(layout);
        Ok(&self.layouts[self.layouts.len() - 1])
    }

    pub fn select_layout(&mut self, layout_id: &str) -> DashboardResult<&DashboardLayout> {
        let index = self.require(layout_id)?;
        self.current_id = Some(layout_id.to_string());
        tracing::debug!("Selected layout {}", layout_id);
        Ok(&self.layouts[index])
    }

    /// Merge name, description and default flag. Marking a layout as default
    /// clears the flag everywhere else.
    pub fn update_layout(
        &mut self,
        layout_id: &str,
        patch: LayoutPatch,
    ) -> DashboardResult<&DashboardLayout> {
        let index = self.require(layout_id)?;
        let name = patch.name.as_deref().map(validate_name).transpose()?;

        if patch.is_default == Some(true) {
            for (i, other) in self.layouts.iter_mut().enumerate() {
                if i != index && other.is_default {
                    other.is_default = false;
                    other.touch();
                }
            }
        }

        let layout = &mut self.layouts[index];
        if let Some(name) = name {
            layout.name = name;
        }
        if let Some(description) = patch.description {
            layout.description = description;
        }
        if let Some(is_default) = patch.is_default {
            layout.is_default = is_default;
        }
        layout.touch();

        Ok(&self.layouts[index])
    }

    /// Id of the layout flagged as the user's default.
    pub fn default_id(&self) -> Option<&str> {
        self.layouts
            .iter()
            .find(|l| l.is_default)
            .map(|l| l.layout_id.as_str())
    }

    /// Flag exactly `layout_id` as default, or clear the flag everywhere.
    /// Fails without touching anything when the layout does not exist.
    pub fn mark_default(&mut self, layout_id: Option<&str>) -> DashboardResult<()> {
        if let Some(id) = layout_id {
            if self.position(id).is_none() {
                return Err(DashboardError::validation(format!(
                    "default layout {} does not exist",
                    id
                )));
            }
        }

        for layout in &mut self.layouts {
            let is_default = Some(layout.layout_id.as_str()) == layout_id;
            if layout.is_default != is_default {
                layout.is_default = is_default;
                layout.touch();
            }
        }
        Ok(())
    }

    /// Remove a layout. When it was current, the first remaining layout
    /// becomes current (or none). Returns the new current id.
    pub fn delete_layout(&mut self, layout_id: &str) -> DashboardResult<Option<&str>> {
        let index = self.require(layout_id)?;
        self.layouts.remove(index);

        if self.current_id.as_deref() == Some(layout_id) {
            self.current_id = self.layouts.first().map(|l| l.layout_id.clone());
        }

        tracing::info!("Deleted layout {}", layout_id);
        Ok(self.current_id.as_deref())
    }

    /// Deep copy of a layout, appended as a new non-default layout named
    /// "{name} (Copy)". Every copied widget gets a fresh instance id.
    pub fn duplicate_layout(
        &mut self,
        layout_id: &str,
        manager: &WidgetInstanceManager,
    ) -> DashboardResult<&DashboardLayout> {
        let source = self.layout(layout_id)?;
        let mut copy = DashboardLayout::new(
            format!("layout-{}", Uuid::new_v4()),
            format!("{} (Copy)", source.name),
            source.description.clone(),
            Utc::now(),
        );
        copy.widgets = source.widgets.iter().map(|w| manager.reissue(w)).collect();

        tracing::info!(
            "Duplicated layout {} into {} ({} widgets)",
            layout_id,
            copy.layout_id,
            copy.widgets.len()
        );
        self.layouts.push(copy);
        Ok(&self.layouts[self.layouts.len() - 1])
    }

    /// Move `source_id` into `target_id`'s slot in the current layout.
    pub fn reorder_current(&mut self, source_id: &str, target_id: &str) -> Option<(usize, usize)> {
        self.current_mut()?.move_widget(source_id, target_id)
    }

    /// Seed an empty store with the default layout and make it current.
    /// Returns whether anything was created.
    pub fn bootstrap(&mut self, manager: &WidgetInstanceManager) -> DashboardResult<bool> {
        if !self.is_empty() {
            return Ok(false);
        }

        let mut layout = DashboardLayout::new(
            format!("layout-{}", Uuid::new_v4()),
            DEFAULT_LAYOUT_NAME.to_string(),
            Some("Energy overview".to_string()),
            Utc::now(),
        );
        layout.is_default = true;

        for (template_id, x, y) in STARTER_WIDGETS {
            let instance = manager.add_widget(&mut layout, template_id)?;
            let origin = PositionPatch {
                x: Some(x),
                y: Some(y),
                ..Default::default()
            };
            manager.update_position(&mut layout, &instance.instance_id, &origin)?;
        }
        layout.updated_at = layout.created_at;

        tracing::info!("Bootstrapped default layout {}", layout.layout_id);
        self.current_id = Some(layout.layout_id.clone());
        self.layouts.push(layout);
        Ok(true)
    }
}

fn validate_name(name: &str) -> DashboardResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(DashboardError::validation("layout name must not be empty"));
    }
    Ok(trimmed.to_string())
}
