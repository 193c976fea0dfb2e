// HTTP request handlers
use crate::application::dashboard_service::RenderPlan;
use crate::application::drag_drop::DropOutcome;
use crate::application::refresh_service::RefreshTick;
use crate::domain::drag::DragState;
use crate::domain::errors::DashboardError;
use crate::domain::layout::{DashboardLayout, LayoutPatch, LayoutSnapshot};
use crate::domain::preferences::{PreferencesPatch, UserPreferences};
use crate::domain::widget::{
    CategoryFilter, PositionPatch, WidgetCategory, WidgetInstance, WidgetPatch, WidgetTemplate,
};
use crate::presentation::app_state::AppState;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

type ApiResult<T> = Result<Json<T>, DashboardError>;

#[derive(Deserialize)]
pub struct TemplateQuery {
    pub category: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLayoutRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddWidgetRequest {
    pub template_id: String,
}

/// Source widget for `drag/start`, target widget for `drag/hover`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DragRequest {
    pub instance_id: String,
}

#[derive(Deserialize)]
pub struct ChartColorRequest {
    pub color: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteLayoutResponse {
    pub current_layout_id: Option<String>,
}

#[derive(Serialize)]
pub struct RemoveWidgetResponse {
    pub removed: bool,
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// `all` or no category lists everything; an unknown category matches nothing.
pub async fn list_templates(
    Query(query): Query<TemplateQuery>,
    State(state): State<Arc<AppState>>,
) -> Json<Vec<WidgetTemplate>> {
    let filter = match query.category.as_deref() {
        None | Some("all") => CategoryFilter::All,
        Some(category) => match category.parse::<WidgetCategory>() {
            Ok(category) => CategoryFilter::Only(category),
            Err(e) => {
                tracing::debug!("{}", e);
                return Json(Vec::new());
            }
        },
    };

    Json(state.dashboard_service.templates(filter))
}

pub async fn get_template(
    Path(template_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<WidgetTemplate> {
    state.dashboard_service.template(&template_id).map(Json)
}

// Layouts

pub async fn list_layouts(
    Path(user_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<LayoutSnapshot> {
    state.dashboard_service.list_layouts(&user_id).await.map(Json)
}

pub async fn create_layout(
    Path(user_id): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateLayoutRequest>,
) -> Result<(StatusCode, Json<DashboardLayout>), DashboardError> {
    let layout = state
        .dashboard_service
        .create_layout(&user_id, &request.name, request.description)
        .await?;
    Ok((StatusCode::CREATED, Json(layout)))
}

pub async fn current_layout(
    Path(user_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Option<DashboardLayout>> {
    state.dashboard_service.current_layout(&user_id).await.map(Json)
}

pub async fn get_layout(
    Path((user_id, layout_id)): Path<(String, String)>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<DashboardLayout> {
    state.dashboard_service.layout(&user_id, &layout_id).await.map(Json)
}

pub async fn update_layout(
    Path((user_id, layout_id)): Path<(String, String)>,
    State(state): State<Arc<AppState>>,
    Json(patch): Json<LayoutPatch>,
) -> ApiResult<DashboardLayout> {
    state
        .dashboard_service
        .update_layout(&user_id, &layout_id, patch)
        .await
        .map(Json)
}

pub async fn delete_layout(
    Path((user_id, layout_id)): Path<(String, String)>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<DeleteLayoutResponse> {
    let current_layout_id = state
        .dashboard_service
        .delete_layout(&user_id, &layout_id)
        .await?;
    Ok(Json(DeleteLayoutResponse { current_layout_id }))
}

pub async fn duplicate_layout(
    Path((user_id, layout_id)): Path<(String, String)>,
    State(state): State<Arc<AppState>>,
) -> Result<(StatusCode, Json<DashboardLayout>), DashboardError> {
    let layout = state
        .dashboard_service
        .duplicate_layout(&user_id, &layout_id)
        .await?;
    Ok((StatusCode::CREATED, Json(layout)))
}

pub async fn select_layout(
    Path((user_id, layout_id)): Path<(String, String)>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<DashboardLayout> {
    state
        .dashboard_service
        .select_layout(&user_id, &layout_id)
        .await
        .map(Json)
}

// Widgets

pub async fn add_widget(
    Path((user_id, layout_id)): Path<(String, String)>,
    State(state): State<Arc<AppState>>,
    Json(request): Json<AddWidgetRequest>,
) -> Result<(StatusCode, Json<WidgetInstance>), DashboardError> {
    let instance = state
        .dashboard_service
        .add_widget(&user_id, &layout_id, &request.template_id)
        .await?;
    Ok((StatusCode::CREATED, Json(instance)))
}

/// Responds with `null` when the layout has no such widget.
pub async fn update_widget(
    Path((user_id, layout_id, instance_id)): Path<(String, String, String)>,
    State(state): State<Arc<AppState>>,
    Json(patch): Json<WidgetPatch>,
) -> ApiResult<Option<WidgetInstance>> {
    state
        .dashboard_service
        .update_widget(&user_id, &layout_id, &instance_id, patch)
        .await
        .map(Json)
}

pub async fn update_position(
    Path((user_id, layout_id, instance_id)): Path<(String, String, String)>,
    State(state): State<Arc<AppState>>,
    Json(patch): Json<PositionPatch>,
) -> ApiResult<Option<WidgetInstance>> {
    state
        .dashboard_service
        .update_position(&user_id, &layout_id, &instance_id, patch)
        .await
        .map(Json)
}

pub async fn remove_widget(
    Path((user_id, layout_id, instance_id)): Path<(String, String, String)>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<RemoveWidgetResponse> {
    let removed = state
        .dashboard_service
        .remove_widget(&user_id, &layout_id, &instance_id)
        .await?;
    Ok(Json(RemoveWidgetResponse { removed }))
}

// Drag and drop

pub async fn drag_start(
    Path(user_id): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(request): Json<DragRequest>,
) -> ApiResult<DragState> {
    state
        .dashboard_service
        .drag_start(&user_id, &request.instance_id)
        .await
        .map(Json)
}

pub async fn drag_hover(
    Path(user_id): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(request): Json<DragRequest>,
) -> ApiResult<DragState> {
    state
        .dashboard_service
        .drag_hover(&user_id, &request.instance_id)
        .await
        .map(Json)
}

pub async fn drag_leave(
    Path(user_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<DragState> {
    state.dashboard_service.drag_leave(&user_id).await.map(Json)
}

pub async fn drag_drop(
    Path(user_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<DropOutcome> {
    state.dashboard_service.drag_drop(&user_id).await.map(Json)
}

pub async fn drag_cancel(
    Path(user_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<DropOutcome> {
    state.dashboard_service.drag_cancel(&user_id).await.map(Json)
}

// Preferences

pub async fn get_preferences(
    Path(user_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<UserPreferences> {
    state.dashboard_service.preferences(&user_id).await.map(Json)
}

pub async fn update_preferences(
    Path(user_id): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(patch): Json<PreferencesPatch>,
) -> ApiResult<UserPreferences> {
    state
        .dashboard_service
        .update_preferences(&user_id, patch)
        .await
        .map(Json)
}

pub async fn reset_preferences(
    Path(user_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<UserPreferences> {
    state.dashboard_service.reset_preferences(&user_id).await.map(Json)
}

pub async fn remove_custom_label(
    Path((user_id, meter_id)): Path<(String, String)>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<UserPreferences> {
    state
        .dashboard_service
        .remove_custom_label(&user_id, &meter_id)
        .await
        .map(Json)
}

pub async fn set_chart_color(
    Path((user_id, series)): Path<(String, String)>,
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChartColorRequest>,
) -> ApiResult<UserPreferences> {
    state
        .dashboard_service
        .set_chart_color(&user_id, &series, &request.color)
        .await
        .map(Json)
}

// Rendering

pub async fn render_plan(
    Path(user_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<RenderPlan> {
    state.dashboard_service.render_plan(&user_id).await.map(Json)
}

/// Auto-refresh ticks as Server-Sent Events, one `refresh` event per tick.
pub async fn refresh_events(
    Path(user_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let events = state
        .refresh_service
        .ticks(user_id)
        .map(|tick: RefreshTick| Event::default().event("refresh").json_data(tick));

    Sse::new(events).keep_alive(KeepAlive::default())
}
