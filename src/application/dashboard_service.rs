// Dashboard service - per-user composition workspaces behind one command boundary
use crate::application::dashboard_repository::DashboardRepository;
use crate::application::drag_drop::{DragDropCoordinator, DropOutcome};
use crate::application::layout_store::LayoutStore;
use crate::application::preference_manager::PreferenceManager;
use crate::application::widget_manager::WidgetInstanceManager;
use crate::domain::drag::DragState;
use crate::domain::errors::{DashboardError, DashboardResult};
use crate::domain::layout::{DashboardLayout, LayoutPatch, LayoutSnapshot};
use crate::domain::preferences::{
    CustomLabel, DateFormat, PreferencesPatch, TimeFormat, Units, UserPreferences,
};
use crate::domain::widget::{
    CategoryFilter, PositionPatch, WidgetInstance, WidgetKind, WidgetPatch, WidgetPosition,
    WidgetSettings, WidgetTemplate,
};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Everything one user composes: layouts, preferences and the drag gesture
/// in flight.
struct Workspace {
    layouts: LayoutStore,
    preferences: PreferenceManager,
    drag: DragDropCoordinator,
}

impl Workspace {
    /// Point `default_layout_id` at the layout flagged as default. Returns
    /// whether the preferences changed.
    fn sync_default_layout(&mut self) -> DashboardResult<bool> {
        let flagged = self.layouts.default_id().map(str::to_string);
        if self.preferences.preferences().default_layout_id == flagged {
            return Ok(false);
        }

        tracing::debug!("Default layout is now {:?}", flagged);
        self.preferences.update(PreferencesPatch {
            default_layout_id: Some(flagged),
            ..Default::default()
        })?;
        Ok(true)
    }
}

/// A user's workspace, loaded on first use.
type WorkspaceSlot = Arc<Mutex<Option<Workspace>>>;

/// Which records a command has to write back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Persist {
    layouts: bool,
    preferences: bool,
}

impl Persist {
    const NOTHING: Self = Self { layouts: false, preferences: false };
    const LAYOUTS: Self = Self { layouts: true, preferences: false };
    const PREFERENCES: Self = Self { layouts: false, preferences: true };
    const ALL: Self = Self { layouts: true, preferences: true };
}

/// What the renderer needs for one visible widget.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderSlot {
    pub instance_id: String,
    pub widget_kind: WidgetKind,
    pub title: String,
    pub position: WidgetPosition,
    pub settings: WidgetSettings,
}

/// Preferences that change how the renderer interprets metric data.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayPreferences {
    pub units: Units,
    pub timezone: String,
    pub date_format: DateFormat,
    pub time_format: TimeFormat,
    pub custom_labels: HashMap<String, CustomLabel>,
    pub chart_colors: HashMap<String, String>,
}

impl From<&UserPreferences> for DisplayPreferences {
    fn from(prefs: &UserPreferences) -> Self {
        Self {
            units: prefs.units,
            timezone: prefs.timezone.clone(),
            date_format: prefs.date_format,
            time_format: prefs.time_format,
            custom_labels: prefs.custom_labels.clone(),
            chart_colors: prefs.chart_colors.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderPlan {
    pub layout_id: Option<String>,
    pub layout_name: Option<String>,
    /// Width of the grid the slot positions are laid out on.
    pub columns: u32,
    pub slots: Vec<RenderSlot>,
    pub display: DisplayPreferences,
}

#[derive(Clone)]
pub struct DashboardService {
    repository: Arc<dyn DashboardRepository>,
    widgets: Arc<WidgetInstanceManager>,
    workspaces: Arc<Mutex<HashMap<String, WorkspaceSlot>>>,
}

impl DashboardService {
    pub fn new(repository: Arc<dyn DashboardRepository>, widgets: Arc<WidgetInstanceManager>) -> Self {
        Self {
            repository,
            widgets,
            workspaces: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn templates(&self, filter: CategoryFilter) -> Vec<WidgetTemplate> {
        self.widgets
            .registry()
            .list_by_category(filter)
            .into_iter()
            .map(|(_, template)| template.clone())
            .collect()
    }

    pub fn template(&self, template_id: &str) -> DashboardResult<WidgetTemplate> {
        self.widgets.registry().get_template(template_id).cloned()
    }

    async fn command<T>(
        &self,
        user_id: &str,
        persist: Persist,
        f: impl FnOnce(&mut Workspace, &WidgetInstanceManager) -> DashboardResult<T>,
    ) -> DashboardResult<T> {
        self.command_with(user_id, move |_| persist, f).await
    }

    /// Run one command against a user's workspace, writing back the records
    /// `persist` picks for its result.
    ///
    /// Each user has a lock of their own, held across loading, the command
    /// and the write-back, so one user's commands never interleave. The
    /// shared map is only locked to find the user's slot. When the write-back
    /// fails the in-memory change is kept and the next persisting command
    /// writes the full record again.
    async fn command_with<T>(
        &self,
        user_id: &str,
        persist: impl FnOnce(&T) -> Persist,
        f: impl FnOnce(&mut Workspace, &WidgetInstanceManager) -> DashboardResult<T>,
    ) -> DashboardResult<T> {
        let slot = self.slot(user_id).await;
        let mut guard = slot.lock().await;
        let workspace = match &mut *guard {
            Some(workspace) => workspace,
            empty => empty.insert(self.load_workspace(user_id).await?),
        };

        let result = f(workspace, &*self.widgets)?;

        let mut persist = persist(&result);
        if workspace.sync_default_layout()? {
            persist.preferences = true;
        }

        if let Err(e) = self.write_back(user_id, workspace, persist).await {
            tracing::warn!("Failed to persist {:?} for {}: {:#}", persist, user_id, e);
            return Err(DashboardError::Persistence(e));
        }

        Ok(result)
    }

    async fn slot(&self, user_id: &str) -> WorkspaceSlot {
        let mut workspaces = self.workspaces.lock().await;
        Arc::clone(workspaces.entry(user_id.to_string()).or_default())
    }

    async fn write_back(
        &self,
        user_id: &str,
        workspace: &Workspace,
        persist: Persist,
    ) -> anyhow::Result<()> {
        if persist.layouts {
            self.repository
                .save_layouts(user_id, &workspace.layouts.snapshot())
                .await?;
        }
        if persist.preferences {
            self.repository
                .save_preferences(workspace.preferences.preferences())
                .await?;
        }
        Ok(())
    }

    async fn load_workspace(&self, user_id: &str) -> DashboardResult<Workspace> {
        let snapshot = self.repository.load_layouts(user_id).await?;
        let stored_preferences = self.repository.load_preferences(user_id).await?;

        let mut layouts = LayoutStore::from_snapshot(snapshot.unwrap_or_default());
        if layouts.bootstrap(&self.widgets)? {
            if let Err(e) = self
                .repository
                .save_layouts(user_id, &layouts.snapshot())
                .await
            {
                tracing::warn!("Failed to persist default layout for {}: {:#}", user_id, e);
            }
        }

        let fresh = stored_preferences.is_none();
        let preferences = match stored_preferences {
            Some(stored) => PreferenceManager::from_stored(stored),
            None => PreferenceManager::initialize_defaults(user_id),
        };

        let mut workspace = Workspace {
            layouts,
            preferences,
            drag: DragDropCoordinator::new(),
        };
        if workspace.sync_default_layout()? || fresh {
            if let Err(e) = self
                .repository
                .save_preferences(workspace.preferences.preferences())
                .await
            {
                tracing::warn!("Failed to persist preferences for {}: {:#}", user_id, e);
            }
        }

        tracing::debug!(
            "Loaded workspace for {} with {} layouts",
            user_id,
            workspace.layouts.layouts().len()
        );

        Ok(workspace)
    }

    // Layouts

    pub async fn list_layouts(&self, user_id: &str) -> DashboardResult<LayoutSnapshot> {
        self.command(user_id, Persist::NOTHING, |ws, _| Ok(ws.layouts.snapshot()))
            .await
    }

    pub async fn layout(&self, user_id: &str, layout_id: &str) -> DashboardResult<DashboardLayout> {
        self.command(user_id, Persist::NOTHING, |ws, _| {
            ws.layouts.layout(layout_id).cloned()
        })
        .await
    }

    pub async fn current_layout(&self, user_id: &str) -> DashboardResult<Option<DashboardLayout>> {
        self.command(user_id, Persist::NOTHING, |ws, _| {
            Ok(ws.layouts.current().cloned())
        })
        .await
    }

    pub async fn create_layout(
        &self,
        user_id: &str,
        name: &str,
        description: Option<String>,
    ) -> DashboardResult<DashboardLayout> {
        self.command(user_id, Persist::LAYOUTS, |ws, _| {
            ws.layouts.create_layout(name, description).cloned()
        })
        .await
    }

    pub async fn select_layout(
        &self,
        user_id: &str,
        layout_id: &str,
    ) -> DashboardResult<DashboardLayout> {
        self.command(user_id, Persist::LAYOUTS, |ws, _| {
            let layout = ws.layouts.select_layout(layout_id)?.clone();
            ws.drag.reset();
            Ok(layout)
        })
        .await
    }

    /// Moving the default flag moves the preferences' default layout with it.
    pub async fn update_layout(
        &self,
        user_id: &str,
        layout_id: &str,
        patch: LayoutPatch,
    ) -> DashboardResult<DashboardLayout> {
        self.command(user_id, Persist::LAYOUTS, |ws, _| {
            ws.layouts.update_layout(layout_id, patch).cloned()
        })
        .await
    }

    /// Returns the id of the layout that is current afterwards. Deleting the
    /// default layout leaves the user without one.
    pub async fn delete_layout(
        &self,
        user_id: &str,
        layout_id: &str,
    ) -> DashboardResult<Option<String>> {
        self.command(user_id, Persist::LAYOUTS, |ws, _| {
            let was_current = ws.layouts.current_id() == Some(layout_id);
            let current = ws.layouts.delete_layout(layout_id)?.map(str::to_string);
            if was_current {
                ws.drag.reset();
            }
            Ok(current)
        })
        .await
    }

    pub async fn duplicate_layout(
        &self,
        user_id: &str,
        layout_id: &str,
    ) -> DashboardResult<DashboardLayout> {
        self.command(user_id, Persist::LAYOUTS, |ws, widgets| {
            ws.layouts.duplicate_layout(layout_id, widgets).cloned()
        })
        .await
    }

    // Widgets

    pub async fn add_widget(
        &self,
        user_id: &str,
        layout_id: &str,
        template_id: &str,
    ) -> DashboardResult<WidgetInstance> {
        self.command(user_id, Persist::LAYOUTS, |ws, widgets| {
            widgets.add_widget(ws.layouts.layout_mut(layout_id)?, template_id)
        })
        .await
    }

    /// The updated widget, or `None` when the layout has no such widget.
    pub async fn update_widget(
        &self,
        user_id: &str,
        layout_id: &str,
        instance_id: &str,
        patch: WidgetPatch,
    ) -> DashboardResult<Option<WidgetInstance>> {
        self.command(user_id, Persist::LAYOUTS, |ws, widgets| {
            let layout = ws.layouts.layout_mut(layout_id)?;
            widgets.update_widget(layout, instance_id, patch)?;
            Ok(layout.widget(instance_id).cloned())
        })
        .await
    }

    pub async fn update_position(
        &self,
        user_id: &str,
        layout_id: &str,
        instance_id: &str,
        patch: PositionPatch,
    ) -> DashboardResult<Option<WidgetInstance>> {
        self.command(user_id, Persist::LAYOUTS, |ws, widgets| {
            let layout = ws.layouts.layout_mut(layout_id)?;
            widgets.update_position(layout, instance_id, &patch)?;
            Ok(layout.widget(instance_id).cloned())
        })
        .await
    }

    pub async fn remove_widget(
        &self,
        user_id: &str,
        layout_id: &str,
        instance_id: &str,
    ) -> DashboardResult<bool> {
        self.command(user_id, Persist::LAYOUTS, |ws, widgets| {
            let layout = ws.layouts.layout_mut(layout_id)?;
            Ok(widgets.remove_widget(layout, instance_id))
        })
        .await
    }

    // Drag and drop

    pub async fn drag_start(&self, user_id: &str, source_id: &str) -> DashboardResult<DragState> {
        self.command(user_id, Persist::NOTHING, |ws, _| {
            ws.drag.start(&ws.layouts, source_id)?;
            Ok(ws.drag.state().clone())
        })
        .await
    }

    pub async fn drag_hover(&self, user_id: &str, target_id: &str) -> DashboardResult<DragState> {
        self.command(user_id, Persist::NOTHING, |ws, _| {
            ws.drag.hover(&ws.layouts, target_id);
            Ok(ws.drag.state().clone())
        })
        .await
    }

    pub async fn drag_leave(&self, user_id: &str) -> DashboardResult<DragState> {
        self.command(user_id, Persist::NOTHING, |ws, _| {
            ws.drag.leave();
            Ok(ws.drag.state().clone())
        })
        .await
    }

    /// Only a drop that reordered widgets is written back.
    pub async fn drag_drop(&self, user_id: &str) -> DashboardResult<DropOutcome> {
        self.command_with(
            user_id,
            |outcome: &DropOutcome| match outcome {
                DropOutcome::Reordered { .. } => Persist::LAYOUTS,
                DropOutcome::Unchanged | DropOutcome::Cancelled => Persist::NOTHING,
            },
            |ws, _| Ok(ws.drag.release(&mut ws.layouts)),
        )
        .await
    }

    pub async fn drag_cancel(&self, user_id: &str) -> DashboardResult<DropOutcome> {
        self.command(user_id, Persist::NOTHING, |ws, _| Ok(ws.drag.cancel()))
            .await
    }

    // Preferences

    pub async fn preferences(&self, user_id: &str) -> DashboardResult<UserPreferences> {
        self.command(user_id, Persist::NOTHING, |ws, _| {
            Ok(ws.preferences.preferences().clone())
        })
        .await
    }

    pub async fn update_preferences(
        &self,
        user_id: &str,
        patch: PreferencesPatch,
    ) -> DashboardResult<UserPreferences> {
        let moves_default = patch.default_layout_id.is_some();
        let persist = if moves_default { Persist::ALL } else { Persist::PREFERENCES };
        self.command(user_id, persist, |ws, _| {
            let mut next = ws.preferences.clone();
            next.update(patch)?;
            if moves_default {
                ws.layouts
                    .mark_default(next.preferences().default_layout_id.as_deref())?;
            }
            ws.preferences = next;
            Ok(ws.preferences.preferences().clone())
        })
        .await
    }

    pub async fn remove_custom_label(
        &self,
        user_id: &str,
        meter_id: &str,
    ) -> DashboardResult<UserPreferences> {
        self.command(user_id, Persist::PREFERENCES, |ws, _| {
            ws.preferences.remove_custom_label(meter_id).cloned()
        })
        .await
    }

    pub async fn set_chart_color(
        &self,
        user_id: &str,
        series_name: &str,
        color: &str,
    ) -> DashboardResult<UserPreferences> {
        self.command(user_id, Persist::PREFERENCES, |ws, _| {
            ws.preferences.set_chart_color(series_name, color).cloned()
        })
        .await
    }

    /// Defaults everywhere, still linked to the layout flagged as default.
    pub async fn reset_preferences(&self, user_id: &str) -> DashboardResult<UserPreferences> {
        self.command(user_id, Persist::PREFERENCES, |ws, _| {
            ws.preferences.reset();
            ws.sync_default_layout()?;
            Ok(ws.preferences.preferences().clone())
        })
        .await
    }

    // Rendering

    /// Visible widgets of the current layout in sequence order, with the
    /// display preferences the renderer applies to their data.
    pub async fn render_plan(&self, user_id: &str) -> DashboardResult<RenderPlan> {
        self.command(user_id, Persist::NOTHING, |ws, widgets| {
            let current = ws.layouts.current();
            let slots: Vec<RenderSlot> = current
                .map(|layout| {
                    layout
                        .visible_widgets()
                        .map(|w| RenderSlot {
                            instance_id: w.instance_id.clone(),
                            widget_kind: w.widget_kind,
                            title: w.title.clone(),
                            position: w.position,
                            settings: w.settings.clone(),
                        })
                        .collect()
                })
                .unwrap_or_default();

            Ok(RenderPlan {
                layout_id: current.map(|l| l.layout_id.clone()),
                layout_name: current.map(|l| l.name.clone()),
                columns: widgets.columns(),
                slots,
                display: DisplayPreferences::from(ws.preferences.preferences()),
            })
        })
        .await
    }
}

#[cfg(test)]
pub(crate) fn test_service(repository: Arc<dyn DashboardRepository>) -> DashboardService {
    let widgets = crate::application::widget_manager::test_manager();
    DashboardService::new(repository, Arc::new(widgets))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::memory_repository::MemoryDashboardRepository;
    use async_trait::async_trait;
    use std::time::Duration;

    struct FailingRepository;

    #[async_trait]
    impl DashboardRepository for FailingRepository {
        async fn load_layouts(&self, _user_id: &str) -> anyhow::Result<Option<LayoutSnapshot>> {
            Ok(None)
        }

        async fn save_layouts(&self, _user_id: &str, _snapshot: &LayoutSnapshot) -> anyhow::Result<()> {
            anyhow::bail!("preferences service unavailable")
        }

        async fn load_preferences(&self, _user_id: &str) -> anyhow::Result<Option<UserPreferences>> {
            Ok(None)
        }

        async fn save_preferences(&self, _preferences: &UserPreferences) -> anyhow::Result<()> {
            anyhow::bail!("preferences service unavailable")
        }
    }

    fn memory_service() -> (DashboardService, Arc<MemoryDashboardRepository>) {
        let repo = Arc::new(MemoryDashboardRepository::new());
        (test_service(repo.clone()), repo)
    }

    #[tokio::test]
    async fn test_first_access_bootstraps_and_persists() {
        let (service, repo) = memory_service();

        let listing = service.list_layouts("user-1").await.unwrap();
        assert_eq!(listing.layouts.len(), 1);
        assert_eq!(
            listing.current_layout_id.as_deref(),
            Some(listing.layouts[0].layout_id.as_str())
        );

        let stored = repo.load_layouts("user-1").await.unwrap().unwrap();
        assert_eq!(stored, listing);

        let prefs = repo.load_preferences("user-1").await.unwrap().unwrap();
        assert_eq!(prefs.user_id, "user-1");
        assert_eq!(prefs.default_layout_id, listing.current_layout_id);
    }

    #[tokio::test]
    async fn test_users_are_isolated() {
        let (service, _) = memory_service();

        service.create_layout("alice", "Alice view", None).await.unwrap();

        assert_eq!(service.list_layouts("alice").await.unwrap().layouts.len(), 2);
        assert_eq!(service.list_layouts("bob").await.unwrap().layouts.len(), 1);
    }

    #[tokio::test]
    async fn test_workspace_reloads_from_repository() {
        let repo = Arc::new(MemoryDashboardRepository::new());
        let first = test_service(repo.clone());
        let created = first.create_layout("user-1", "Night shift", None).await.unwrap();
        first.select_layout("user-1", &created.layout_id).await.unwrap();

        let second = test_service(repo);
        let current = second.current_layout("user-1").await.unwrap().unwrap();
        assert_eq!(current.layout_id, created.layout_id);
        assert_eq!(second.list_layouts("user-1").await.unwrap().layouts.len(), 2);
    }

    #[tokio::test]
    async fn test_widget_commands_through_service() {
        let (service, repo) = memory_service();
        let layout = service.create_layout("user-1", "Billing", None).await.unwrap();

        let added = service
            .add_widget("user-1", &layout.layout_id, "billing-summary")
            .await
            .unwrap();
        let moved = service
            .update_position(
                "user-1",
                &layout.layout_id,
                &added.instance_id,
                PositionPatch { y: Some(3), ..Default::default() },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(moved.position.y, 3);

        let ghost = service
            .update_widget("user-1", &layout.layout_id, "ghost", WidgetPatch::default())
            .await
            .unwrap();
        assert!(ghost.is_none());

        let stored = repo.load_layouts("user-1").await.unwrap().unwrap();
        let stored_layout = stored
            .layouts
            .iter()
            .find(|l| l.layout_id == layout.layout_id)
            .unwrap();
        assert_eq!(stored_layout.widgets, vec![moved]);

        assert!(service
            .remove_widget("user-1", &layout.layout_id, &added.instance_id)
            .await
            .unwrap());
        assert!(matches!(
            service.add_widget("user-1", "layout-missing", "billing-summary").await,
            Err(DashboardError::LayoutNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_drag_gesture_through_service() {
        let (service, _) = memory_service();
        let current = service.current_layout("user-1").await.unwrap().unwrap();
        let ids: Vec<String> = current.widgets.iter().map(|w| w.instance_id.clone()).collect();

        service.drag_start("user-1", &ids[2]).await.unwrap();
        let state = service.drag_hover("user-1", &ids[0]).await.unwrap();
        assert_eq!(
            state,
            DragState::Hovering {
                source_id: ids[2].clone(),
                target_id: ids[0].clone(),
            }
        );

        let outcome = service.drag_drop("user-1").await.unwrap();
        assert!(matches!(outcome, DropOutcome::Reordered { from: 2, to: 0, .. }));

        let plan = service.render_plan("user-1").await.unwrap();
        assert_eq!(plan.slots[0].instance_id, ids[2]);
    }

    #[tokio::test]
    async fn test_render_plan_skips_hidden_widgets() {
        let (service, _) = memory_service();
        let current = service.current_layout("user-1").await.unwrap().unwrap();
        let hidden = current.widgets[1].instance_id.clone();

        service
            .update_widget(
                "user-1",
                &current.layout_id,
                &hidden,
                WidgetPatch { visible: Some(false), ..Default::default() },
            )
            .await
            .unwrap();
        service
            .set_chart_color("user-1", "activeEnergy", "#2ca02c")
            .await
            .unwrap();

        let plan = service.render_plan("user-1").await.unwrap();
        assert_eq!(plan.layout_id.as_deref(), Some(current.layout_id.as_str()));
        assert_eq!(plan.columns, 12);
        assert_eq!(plan.slots.len(), current.widgets.len() - 1);
        assert!(plan.slots.iter().all(|s| s.instance_id != hidden));
        assert_eq!(
            plan.display.chart_colors.get("activeEnergy").map(String::as_str),
            Some("#2ca02c")
        );
    }

    #[tokio::test]
    async fn test_render_plan_without_layouts_is_empty() {
        let (service, _) = memory_service();
        let current = service.current_layout("user-1").await.unwrap().unwrap();
        assert_eq!(service.delete_layout("user-1", &current.layout_id).await.unwrap(), None);

        let plan = service.render_plan("user-1").await.unwrap();
        assert!(plan.layout_id.is_none());
        assert!(plan.slots.is_empty());
    }

    #[tokio::test]
    async fn test_persistence_failure_keeps_in_memory_state() {
        let service = test_service(Arc::new(FailingRepository));

        let result = service.create_layout("user-1", "Unsaved", None).await;
        assert!(matches!(result, Err(DashboardError::Persistence(_))));

        let listing = service.list_layouts("user-1").await.unwrap();
        assert!(listing.layouts.iter().any(|l| l.name == "Unsaved"));
    }

    #[tokio::test]
    async fn test_validation_errors_do_not_persist() {
        let (service, repo) = memory_service();
        service.list_layouts("user-1").await.unwrap();
        let before = repo.load_layouts("user-1").await.unwrap();

        assert!(matches!(
            service.create_layout("user-1", "  ", None).await,
            Err(DashboardError::Validation(_))
        ));
        assert_eq!(repo.load_layouts("user-1").await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_preferences_merge_and_reset() {
        let (service, repo) = memory_service();

        let patch = PreferencesPatch {
            custom_labels: Some(HashMap::from([(
                "M1".to_string(),
                Some(CustomLabel::named("A")),
            )])),
            ..Default::default()
        };
        service.update_preferences("user-1", patch).await.unwrap();
        let patch = PreferencesPatch {
            custom_labels: Some(HashMap::from([(
                "M2".to_string(),
                Some(CustomLabel::named("B")),
            )])),
            ..Default::default()
        };
        let prefs = service.update_preferences("user-1", patch).await.unwrap();
        assert_eq!(prefs.custom_labels.len(), 2);

        let prefs = service.remove_custom_label("user-1", "M1").await.unwrap();
        assert_eq!(prefs.custom_labels.len(), 1);
        assert_eq!(repo.load_preferences("user-1").await.unwrap(), Some(prefs));

        let main = service.current_layout("user-1").await.unwrap().unwrap();
        let reset = service.reset_preferences("user-1").await.unwrap();
        assert_eq!(
            reset,
            UserPreferences {
                default_layout_id: Some(main.layout_id),
                ..UserPreferences::defaults("user-1")
            }
        );
        assert_eq!(repo.load_preferences("user-1").await.unwrap(), Some(reset));
    }

    #[tokio::test]
    async fn test_default_layout_preference_follows_layout_flag() {
        let (service, repo) = memory_service();
        let main = service.current_layout("user-1").await.unwrap().unwrap();
        let night = service.create_layout("user-1", "Night shift", None).await.unwrap();
        let flag = |is_default| LayoutPatch { is_default: Some(is_default), ..Default::default() };

        service
            .update_layout("user-1", &night.layout_id, flag(true))
            .await
            .unwrap();
        let prefs = service.preferences("user-1").await.unwrap();
        assert_eq!(prefs.default_layout_id.as_deref(), Some(night.layout_id.as_str()));
        assert_eq!(repo.load_preferences("user-1").await.unwrap(), Some(prefs));

        service
            .update_layout("user-1", &night.layout_id, flag(false))
            .await
            .unwrap();
        assert_eq!(service.preferences("user-1").await.unwrap().default_layout_id, None);

        service
            .update_layout("user-1", &main.layout_id, flag(true))
            .await
            .unwrap();
        service.delete_layout("user-1", &main.layout_id).await.unwrap();
        assert_eq!(service.preferences("user-1").await.unwrap().default_layout_id, None);
        let stored = repo.load_preferences("user-1").await.unwrap().unwrap();
        assert_eq!(stored.default_layout_id, None);
    }

    #[tokio::test]
    async fn test_default_layout_preference_must_name_a_layout() {
        let (service, repo) = memory_service();
        let main = service.current_layout("user-1").await.unwrap().unwrap();
        let night = service.create_layout("user-1", "Night shift", None).await.unwrap();
        let point_at = |layout_id: &str| PreferencesPatch {
            default_layout_id: Some(Some(layout_id.to_string())),
            ..Default::default()
        };

        assert!(matches!(
            service.update_preferences("user-1", point_at("layout-missing")).await,
            Err(DashboardError::Validation(_))
        ));
        let prefs = service.preferences("user-1").await.unwrap();
        assert_eq!(prefs.default_layout_id.as_deref(), Some(main.layout_id.as_str()));

        let prefs = service
            .update_preferences("user-1", point_at(&night.layout_id))
            .await
            .unwrap();
        assert_eq!(prefs.default_layout_id.as_deref(), Some(night.layout_id.as_str()));

        let stored = repo.load_layouts("user-1").await.unwrap().unwrap();
        let defaults: Vec<&str> = stored
            .layouts
            .iter()
            .filter(|l| l.is_default)
            .map(|l| l.layout_id.as_str())
            .collect();
        assert_eq!(defaults, vec![night.layout_id.as_str()]);
    }

    #[tokio::test]
    async fn test_drop_without_reorder_writes_nothing() {
        let service = test_service(Arc::new(FailingRepository));
        let current = service.current_layout("user-1").await.unwrap().unwrap();
        let ids: Vec<String> = current.widgets.iter().map(|w| w.instance_id.clone()).collect();

        assert_eq!(service.drag_drop("user-1").await.unwrap(), DropOutcome::Unchanged);

        service.drag_start("user-1", &ids[0]).await.unwrap();
        service.drag_hover("user-1", &ids[0]).await.unwrap();
        assert_eq!(service.drag_drop("user-1").await.unwrap(), DropOutcome::Unchanged);

        service.drag_start("user-1", &ids[1]).await.unwrap();
        assert_eq!(service.drag_drop("user-1").await.unwrap(), DropOutcome::Cancelled);

        service.drag_start("user-1", &ids[1]).await.unwrap();
        service.drag_hover("user-1", &ids[0]).await.unwrap();
        assert!(matches!(
            service.drag_drop("user-1").await,
            Err(DashboardError::Persistence(_))
        ));
    }

    /// Saves for `slow_user` take `delay`; everyone else is served at once.
    struct SlowRepository {
        inner: MemoryDashboardRepository,
        slow_user: &'static str,
        delay: Duration,
    }

    #[async_trait]
    impl DashboardRepository for SlowRepository {
        async fn load_layouts(&self, user_id: &str) -> anyhow::Result<Option<LayoutSnapshot>> {
            self.inner.load_layouts(user_id).await
        }

        async fn save_layouts(&self, user_id: &str, snapshot: &LayoutSnapshot) -> anyhow::Result<()> {
            if user_id == self.slow_user {
                tokio::time::sleep(self.delay).await;
            }
            self.inner.save_layouts(user_id, snapshot).await
        }

        async fn load_preferences(&self, user_id: &str) -> anyhow::Result<Option<UserPreferences>> {
            self.inner.load_preferences(user_id).await
        }

        async fn save_preferences(&self, preferences: &UserPreferences) -> anyhow::Result<()> {
            self.inner.save_preferences(preferences).await
        }
    }

    #[tokio::test]
    async fn test_slow_save_for_one_user_does_not_block_others() {
        let service = test_service(Arc::new(SlowRepository {
            inner: MemoryDashboardRepository::new(),
            slow_user: "alice",
            delay: Duration::from_secs(1),
        }));

        let alice = service.clone();
        let pending =
            tokio::spawn(async move { alice.create_layout("alice", "Slow", None).await });
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!pending.is_finished());

        let prefs = tokio::time::timeout(Duration::from_millis(300), service.preferences("bob"))
            .await
            .expect("bob was blocked behind alice's save")
            .unwrap();
        assert_eq!(prefs.user_id, "bob");

        let created = pending.await.unwrap().unwrap();
        assert_eq!(created.name, "Slow");
    }
}
