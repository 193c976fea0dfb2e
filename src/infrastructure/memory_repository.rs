// In-process repository implementation
use crate::application::dashboard_repository::DashboardRepository;
use crate::domain::layout::LayoutSnapshot;
use crate::domain::preferences::UserPreferences;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Keeps records as JSON documents, the same shape the remote preferences
/// service stores, so everything saved here has survived a serde round trip.
#[derive(Debug, Default)]
pub struct MemoryDashboardRepository {
    layouts: RwLock<HashMap<String, Value>>,
    preferences: RwLock<HashMap<String, Value>>,
}

impl MemoryDashboardRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DashboardRepository for MemoryDashboardRepository {
    async fn load_layouts(&self, user_id: &str) -> Result<Option<LayoutSnapshot>> {
        let layouts = self.layouts.read().await;
        layouts
            .get(user_id)
            .map(|doc| serde_json::from_value(doc.clone()))
            .transpose()
            .with_context(|| format!("Corrupt layout record for {}", user_id))
    }

    async fn save_layouts(&self, user_id: &str, snapshot: &LayoutSnapshot) -> Result<()> {
        let doc = serde_json::to_value(snapshot).context("Failed to encode layouts")?;
        self.layouts.write().await.insert(user_id.to_string(), doc);
        Ok(())
    }

    async fn load_preferences(&self, user_id: &str) -> Result<Option<UserPreferences>> {
        let preferences = self.preferences.read().await;
        preferences
            .get(user_id)
            .map(|doc| serde_json::from_value(doc.clone()))
            .transpose()
            .with_context(|| format!("Corrupt preference record for {}", user_id))
    }

    async fn save_preferences(&self, preferences: &UserPreferences) -> Result<()> {
        let doc = serde_json::to_value(preferences).context("Failed to encode preferences")?;
        self.preferences
            .write()
            .await
            .insert(preferences.user_id.clone(), doc);
        Ok(())
    }
}
