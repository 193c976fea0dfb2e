// Application state for HTTP handlers
use crate::application::dashboard_service::DashboardService;
use crate::application::refresh_service::RefreshService;

#[derive(Clone)]
pub struct AppState {
    pub dashboard_service: DashboardService,
    pub refresh_service: RefreshService,
}

impl AppState {
    pub fn new(dashboard_service: DashboardService) -> Self {
        Self {
            refresh_service: RefreshService::new(dashboard_service.clone()),
            dashboard_service,
        }
    }
}
