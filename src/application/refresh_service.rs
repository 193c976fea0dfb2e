// Refresh service - periodic refresh signals driven by user preferences
use crate::application::dashboard_service::DashboardService;
use chrono::{DateTime, Utc};
use futures::stream::Stream;
use serde::Serialize;
use std::time::Duration;

/// Tells the renderer to re-query metric data. Carries no engine state.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTick {
    pub user_id: String,
    pub sequence: u64,
    pub issued_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct RefreshService {
    dashboard: DashboardService,
}

impl RefreshService {
    pub fn new(dashboard: DashboardService) -> Self {
        Self { dashboard }
    }

    /// One tick per `refreshIntervalSeconds` while `autoRefresh` is on.
    /// Preferences are read again before every tick, so interval changes
    /// apply from the next wait and switching auto-refresh off ends the
    /// stream.
    pub fn ticks(&self, user_id: String) -> impl Stream<Item = RefreshTick> + Send + use<> {
        let dashboard = self.dashboard.clone();

        async_stream::stream! {
            let mut sequence = 0u64;
            loop {
                let preferences = match dashboard.preferences(&user_id).await {
                    Ok(preferences) => preferences,
                    Err(e) => {
                        tracing::warn!("Stopping refresh for {}: {}", user_id, e);
                        break;
                    }
                };
                if !preferences.auto_refresh {
                    tracing::debug!("Auto-refresh off for {}", user_id);
                    break;
                }

                if sequence > 0 {
                    yield RefreshTick {
                        user_id: user_id.clone(),
                        sequence,
                        issued_at: Utc::now(),
                    };
                }

                let interval = u64::from(preferences.refresh_interval_seconds.max(1));
                tokio::time::sleep(Duration::from_secs(interval)).await;
                sequence += 1;
            }
        }
    }
}
