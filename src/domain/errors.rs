// Error taxonomy for dashboard composition commands
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("widget template not found: {0}")]
    TemplateNotFound(String),

    #[error("layout not found: {0}")]
    LayoutNotFound(String),

    #[error("widget not found: {0}")]
    WidgetNotFound(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Persistence(#[from] anyhow::Error),
}

impl DashboardError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::TemplateNotFound(_) | Self::LayoutNotFound(_) | Self::WidgetNotFound(_)
        )
    }
}

pub type DashboardResult<T> = Result<T, DashboardError>;
