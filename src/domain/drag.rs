// Drag gesture state machine
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum DragState {
    #[default]
    Idle,
    #[serde(rename_all = "camelCase")]
    Dragging { source_id: String },
    #[serde(rename_all = "camelCase")]
    Hovering { source_id: String, target_id: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragEvent {
    Start { source_id: String },
    Enter { target_id: String },
    Leave,
    Release,
    Cancel,
}

/// How a gesture ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragResolution {
    Dropped { source_id: String, target_id: String },
    Cancelled,
}

impl DragState {
    pub fn is_idle(&self) -> bool {
        matches!(self, DragState::Idle)
    }

    /// Advance the gesture. Terminal events always land back in `Idle` and
    /// report how the gesture ended; events that make no sense in the current
    /// state leave it unchanged.
    pub fn transition(self, event: DragEvent) -> (DragState, Option<DragResolution>) {
        match (self, event) {
            (_, DragEvent::Start { source_id }) => (DragState::Dragging { source_id }, None),

            (DragState::Dragging { source_id }, DragEvent::Enter { target_id })
            | (DragState::Hovering { source_id, .. }, DragEvent::Enter { target_id }) => {
                (DragState::Hovering { source_id, target_id }, None)
            }

            (DragState::Hovering { source_id, .. }, DragEvent::Leave) => {
                (DragState::Dragging { source_id }, None)
            }

            (DragState::Hovering { source_id, target_id }, DragEvent::Release) => (
                DragState::Idle,
                Some(DragResolution::Dropped { source_id, target_id }),
            ),

            (DragState::Dragging { .. }, DragEvent::Release)
            | (DragState::Dragging { .. }, DragEvent::Cancel)
            | (DragState::Hovering { .. }, DragEvent::Cancel) => {
                (DragState::Idle, Some(DragResolution::Cancelled))
            }

            (state, _) => (state, None),
        }
    }
}
