// Preferences/layout service repository implementation
use crate::application::dashboard_repository::DashboardRepository;
use crate::domain::layout::LayoutSnapshot;
use crate::domain::preferences::UserPreferences;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RemoteDashboardRepository {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl RemoteDashboardRepository {
    pub fn new(base_url: String, token: Option<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.is_empty()),
        })
    }

    fn record_url(&self, user_id: &str, record: &str) -> String {
        format!(
            "{}/users/{}/{}",
            self.base_url,
            urlencoding::encode(user_id),
            record
        )
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.header("Authorization", format!("Token {}", token)),
            None => request,
        }
    }

    async fn fetch<T: DeserializeOwned>(&self, url: &str) -> Result<Option<T>> {
        let response = self
            .authorize(self.client.get(url))
            .header("Accept", "application/json")
            .send()
            .await
            .context("Failed to send request to preferences service")?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Preferences service GET failed with status {}: {}", status, body);
        }

        let record = response
            .json::<T>()
            .await
            .with_context(|| format!("Failed to parse record from {}", url))?;
        Ok(Some(record))
    }

    async fn store<T: Serialize + Sync>(&self, url: &str, record: &T) -> Result<()> {
        let response = self
            .authorize(self.client.put(url))
            .json(record)
            .send()
            .await
            .context("Failed to send request to preferences service")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Preferences service PUT failed with status {}: {}", status, body);
        }

        Ok(())
    }
}

#[async_trait]
impl DashboardRepository for RemoteDashboardRepository {
    async fn load_layouts(&self, user_id: &str) -> Result<Option<LayoutSnapshot>> {
        let url = self.record_url(user_id, "layouts");
        tracing::debug!("Loading layouts from {}", url);
        self.fetch(&url).await
    }

    async fn save_layouts(&self, user_id: &str, snapshot: &LayoutSnapshot) -> Result<()> {
        let url = self.record_url(user_id, "layouts");
        self.store(&url, snapshot).await
    }

    async fn load_preferences(&self, user_id: &str) -> Result<Option<UserPreferences>> {
        let url = self.record_url(user_id, "preferences");
        tracing::debug!("Loading preferences from {}", url);
        self.fetch(&url).await
    }

    async fn save_preferences(&self, preferences: &UserPreferences) -> Result<()> {
        let url = self.record_url(&preferences.user_id, "preferences");
        self.store(&url, preferences).await
    }
}
