// Repository trait for persisted layouts and preferences
use crate::domain::layout::LayoutSnapshot;
use crate::domain::preferences::UserPreferences;
use async_trait::async_trait;

/// Boundary to the external preferences/layout service. Records are opaque
/// JSON documents keyed by user id.
#[async_trait]
pub trait DashboardRepository: Send + Sync {
    /// Stored layouts of a user, or `None` if the user has never saved any
    async fn load_layouts(&self, user_id: &str) -> anyhow::Result<Option<LayoutSnapshot>>;

    async fn save_layouts(&self, user_id: &str, snapshot: &LayoutSnapshot) -> anyhow::Result<()>;

    async fn load_preferences(&self, user_id: &str) -> anyhow::Result<Option<UserPreferences>>;

    /// Preferences carry their own user id
    async fn save_preferences(&self, preferences: &UserPreferences) -> anyhow::Result<()>;
}
