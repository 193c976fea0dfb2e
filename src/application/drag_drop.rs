// Drag-and-drop coordinator - turns pointer gestures into reorders of the current layout
use crate::application::layout_store::LayoutStore;
use crate::domain::drag::{DragEvent, DragResolution, DragState};
use crate::domain::errors::{DashboardError, DashboardResult};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum DropOutcome {
    #[serde(rename_all = "camelCase")]
    Reordered {
        source_id: String,
        target_id: String,
        from: usize,
        to: usize,
    },
    /// Dropped on itself, or nothing to drop.
    Unchanged,
    Cancelled,
}

#[derive(Debug, Clone, Default)]
pub struct DragDropCoordinator {
    state: DragState,
}

impl DragDropCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &DragState {
        &self.state
    }

    fn fire(&mut self, event: DragEvent) -> Option<DragResolution> {
        let (next, resolution) = std::mem::take(&mut self.state).transition(event);
        self.state = next;
        resolution
    }

    /// Begin dragging a widget of the current layout.
    pub fn start(&mut self, store: &LayoutStore, source_id: &str) -> DashboardResult<()> {
        let in_current = store
            .current()
            .is_some_and(|layout| layout.widget(source_id).is_some());
        if !in_current {
            return Err(DashboardError::WidgetNotFound(source_id.to_string()));
        }

        if !self.state.is_idle() {
            tracing::debug!("Restarting drag gesture, discarding {:?}", self.state);
        }
        self.fire(DragEvent::Start {
            source_id: source_id.to_string(),
        });
        Ok(())
    }

    /// Pointer entered a widget. Only widgets of the current layout are drop
    /// targets; anything else is ignored and reported as `false`.
    pub fn hover(&mut self, store: &LayoutStore, target_id: &str) -> bool {
        if self.state.is_idle() {
            return false;
        }
        let eligible = store
            .current()
            .is_some_and(|layout| layout.widget(target_id).is_some());
        if !eligible {
            return false;
        }

        self.fire(DragEvent::Enter {
            target_id: target_id.to_string(),
        });
        true
    }

    pub fn leave(&mut self) {
        self.fire(DragEvent::Leave);
    }

    /// Pointer released. Over a target the source moves into the target's
    /// slot; anywhere else the gesture is cancelled.
    pub fn release(&mut self, store: &mut LayoutStore) -> DropOutcome {
        match self.fire(DragEvent::Release) {
            Some(DragResolution::Dropped { source_id, target_id }) => {
                if source_id == target_id {
                    tracing::debug!("Widget {} dropped on itself", source_id);
                    return DropOutcome::Unchanged;
                }
                match store.reorder_current(&source_id, &target_id) {
                    Some((from, to)) => {
                        tracing::debug!(
                            "Moved widget {} from slot {} to slot {}",
                            source_id,
                            from,
                            to
                        );
                        DropOutcome::Reordered {
                            source_id,
                            target_id,
                            from,
                            to,
                        }
                    }
                    None => {
                        tracing::warn!(
                            "Drop of {} onto {} no longer matches the current layout",
                            source_id,
                            target_id
                        );
                        DropOutcome::Unchanged
                    }
                }
            }
            Some(DragResolution::Cancelled) => DropOutcome::Cancelled,
            None => DropOutcome::Unchanged,
        }
    }

    pub fn cancel(&mut self) -> DropOutcome {
        match self.fire(DragEvent::Cancel) {
            Some(_) => DropOutcome::Cancelled,
            None => DropOutcome::Unchanged,
        }
    }

    /// Drop any gesture in flight, e.g. when the current layout changes.
    pub fn reset(&mut self) {
        self.state = DragState::Idle;
    }
}
