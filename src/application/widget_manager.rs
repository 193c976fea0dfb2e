// Widget instance manager - creates and mutates widget instances inside a layout
use crate::application::widget_registry::WidgetRegistry;
use crate::domain::errors::{DashboardError, DashboardResult};
use crate::domain::layout::DashboardLayout;
use crate::domain::widget::{PositionPatch, WidgetInstance, WidgetPatch};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Hands out `{template_id}-{n}` ids with a strictly increasing `n`.
#[derive(Debug)]
pub struct InstanceIdGenerator {
    next: AtomicU64,
}

impl InstanceIdGenerator {
    pub fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }

    /// Seeded from the wall clock so ids minted after a restart do not
    /// collide with ids already stored in persisted layouts.
    pub fn seeded_from_clock() -> Self {
        let millis = chrono::Utc::now().timestamp_millis().max(0) as u64;
        Self::starting_at(millis)
    }

    pub fn next_for(&self, template_id: &str) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        format!("{}-{}", template_id, n)
    }
}

pub struct WidgetInstanceManager {
    registry: Arc<WidgetRegistry>,
    ids: InstanceIdGenerator,
    columns: u32,
}

impl WidgetInstanceManager {
    pub fn new(registry: Arc<WidgetRegistry>, ids: InstanceIdGenerator, columns: u32) -> Self {
        Self {
            registry,
            ids,
            columns,
        }
    }

    pub fn registry(&self) -> &WidgetRegistry {
        &self.registry
    }

    pub fn columns(&self) -> u32 {
        self.columns
    }

    /// Create a detached instance of a template with a fresh id.
    pub fn instantiate(&self, template_id: &str) -> DashboardResult<WidgetInstance> {
        let template = self.registry.get_template(template_id)?;
        let instance_id = self.ids.next_for(&template.template_id);
        Ok(WidgetInstance::from_template(instance_id, template))
    }

    /// Copy of `instance` under a newly minted id.
    pub fn reissue(&self, instance: &WidgetInstance) -> WidgetInstance {
        WidgetInstance {
            instance_id: self.ids.next_for(&instance.template_id),
            ..instance.clone()
        }
    }

    /// Append a new instance of `template_id` to the end of the layout.
    pub fn add_widget(
        &self,
        layout: &mut DashboardLayout,
        template_id: &str,
    ) -> DashboardResult<WidgetInstance> {
        let instance = self.instantiate(template_id)?;
        layout.widgets.push(instance.clone());
        layout.touch();

        tracing::debug!(
            "Added widget {} ({}) to layout {}",
            instance.instance_id,
            instance.widget_kind,
            layout.layout_id
        );

        Ok(instance)
    }

    /// Shallow-merge `patch` into the instance. An unknown id is ignored and
    /// reported as `Ok(false)`.
    pub fn update_widget(
        &self,
        layout: &mut DashboardLayout,
        instance_id: &str,
        patch: WidgetPatch,
    ) -> DashboardResult<bool> {
        let Some(widget) = layout.widget_mut(instance_id) else {
            tracing::debug!("Ignoring update for unknown widget {}", instance_id);
            return Ok(false);
        };

        if let Some(title) = &patch.title {
            if title.trim().is_empty() {
                return Err(DashboardError::validation("widget title must not be empty"));
            }
        }
        if let Some(settings) = &patch.settings {
            let options_kind = settings.options.kind();
            if options_kind != widget.widget_kind {
                return Err(DashboardError::validation(format!(
                    "{} options cannot be applied to {} widget {}",
                    options_kind, widget.widget_kind, instance_id
                )));
            }
        }

        widget.apply(patch);
        layout.touch();
        Ok(true)
    }

    /// Remove the instance. Returns whether anything was removed.
    pub fn remove_widget(&self, layout: &mut DashboardLayout, instance_id: &str) -> bool {
        let Some(index) = layout.index_of(instance_id) else {
            tracing::debug!("Ignoring removal of unknown widget {}", instance_id);
            return false;
        };

        layout.widgets.remove(index);
        layout.touch();
        tracing::debug!("Removed widget {} from layout {}", instance_id, layout.layout_id);
        true
    }

    /// Merge the given position fields. The merged position must still fit
    /// the grid; an unknown id is ignored and reported as `Ok(false)`.
    pub fn update_position(
        &self,
        layout: &mut DashboardLayout,
        instance_id: &str,
        patch: &PositionPatch,
    ) -> DashboardResult<bool> {
        let columns = self.columns;
        let Some(widget) = layout.widget_mut(instance_id) else {
            tracing::debug!("Ignoring position update for unknown widget {}", instance_id);
            return Ok(false);
        };

        let merged = widget.position.merged(patch);
        if !merged.fits(columns) {
            return Err(DashboardError::validation(format!(
                "position x={} width={} height={} does not fit a {}-column grid",
                merged.x, merged.width, merged.height, columns
            )));
        }

        widget.position = merged;
        layout.touch();
        Ok(true)
    }
}

#[cfg(test)]
pub(crate) fn test_manager() -> WidgetInstanceManager {
    WidgetInstanceManager::new(
        crate::application::widget_registry::test_registry(),
        InstanceIdGenerator::starting_at(1),
        12,
    )
}
