// Route table
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::*;
use axum::{
    Router,
    routing::{get, post, put},
};
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;

pub fn build_router(state: Arc<AppState>) -> Router {
    let user_routes = Router::new()
        .route("/layouts", get(list_layouts).post(create_layout))
        .route("/layouts/current", get(current_layout))
        .route(
            "/layouts/:layout_id",
            get(get_layout).patch(update_layout).delete(delete_layout),
        )
        .route("/layouts/:layout_id/duplicate", post(duplicate_layout))
        .route("/layouts/:layout_id/select", post(select_layout))
        .route("/layouts/:layout_id/widgets", post(add_widget))
        .route(
            "/layouts/:layout_id/widgets/:instance_id",
            axum::routing::patch(update_widget).delete(remove_widget),
        )
        .route(
            "/layouts/:layout_id/widgets/:instance_id/position",
            axum::routing::patch(update_position),
        )
        .route("/drag/start", post(drag_start))
        .route("/drag/hover", post(drag_hover))
        .route("/drag/leave", post(drag_leave))
        .route("/drag/drop", post(drag_drop))
        .route("/drag/cancel", post(drag_cancel))
        .route(
            "/preferences",
            get(get_preferences)
                .patch(update_preferences)
                .delete(reset_preferences),
        )
        .route(
            "/preferences/labels/:meter_id",
            axum::routing::delete(remove_custom_label),
        )
        .route("/preferences/colors/:series", put(set_chart_color))
        .route("/render-plan", get(render_plan))
        .route("/refresh", get(refresh_events));

    Router::new()
        .route("/healthz", get(health_check))
        .route("/templates", get(list_templates))
        .route("/templates/:template_id", get(get_template))
        .nest("/users/:user_id", user_routes)
        .with_state(state)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::dashboard_repository::DashboardRepository;
    use crate::application::dashboard_service::test_service;
    use crate::domain::layout::LayoutSnapshot;
    use crate::domain::preferences::UserPreferences;
    use crate::infrastructure::memory_repository::MemoryDashboardRepository;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    fn app() -> Router {
        let service = test_service(Arc::new(MemoryDashboardRepository::new()));
        build_router(Arc::new(AppState::new(service)))
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    #[tokio::test]
    async fn test_health_check() {
        let app = app();
        let response = app
            .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_templates_by_category() {
        let app = app();

        let (status, all) = send(&app, "GET", "/templates?category=all", None).await;
        assert_eq!(status, StatusCode::OK);
        let (_, unfiltered) = send(&app, "GET", "/templates", None).await;
        assert_eq!(all, unfiltered);

        let (_, billing) = send(&app, "GET", "/templates?category=billing", None).await;
        let billing = billing.as_array().unwrap();
        assert!(!billing.is_empty());
        assert!(billing.iter().all(|t| t["category"] == "billing"));

        let (status, unknown) = send(&app, "GET", "/templates?category=weather", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(unknown, json!([]));

        let (status, template) = send(&app, "GET", "/templates/energy-chart", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(template["widgetKind"], "chart");

        let (status, body) = send(&app, "GET", "/templates/nonexistent-widget", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains("nonexistent-widget"));
    }

    #[tokio::test]
    async fn test_layout_lifecycle() {
        let app = app();

        let (status, listing) = send(&app, "GET", "/users/u1/layouts", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listing["layouts"].as_array().unwrap().len(), 1);

        let (status, created) = send(
            &app,
            "POST",
            "/users/u1/layouts",
            Some(json!({ "name": "My View" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let layout_id = created["layoutId"].as_str().unwrap().to_string();

        let (status, selected) =
            send(&app, "POST", &format!("/users/u1/layouts/{}/select", layout_id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(selected["name"], "My View");

        let (_, current) = send(&app, "GET", "/users/u1/layouts/current", None).await;
        assert_eq!(current["layoutId"], layout_id.as_str());

        let (status, renamed) = send(
            &app,
            "PATCH",
            &format!("/users/u1/layouts/{}", layout_id),
            Some(json!({ "name": "Plant overview" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(renamed["name"], "Plant overview");

        let (status, copy) =
            send(&app, "POST", &format!("/users/u1/layouts/{}/duplicate", layout_id), None).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(copy["name"], "Plant overview (Copy)");

        let (status, deleted) =
            send(&app, "DELETE", &format!("/users/u1/layouts/{}", layout_id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(deleted["currentLayoutId"].is_string());

        let (status, _) = send(&app, "GET", &format!("/users/u1/layouts/{}", layout_id), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_validation_maps_to_unprocessable() {
        let app = app();
        let (status, body) = send(
            &app,
            "POST",
            "/users/u1/layouts",
            Some(json!({ "name": "   " })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["error"].is_string());

        let (status, _) = send(
            &app,
            "PATCH",
            "/users/u1/preferences",
            Some(json!({ "refreshIntervalSeconds": 0 })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, _) = send(
            &app,
            "PATCH",
            "/users/u1/preferences",
            Some(json!({ "defaultLayoutId": "layout-missing" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (_, current) = send(&app, "GET", "/users/u1/layouts/current", None).await;
        let (_, prefs) = send(&app, "GET", "/users/u1/preferences", None).await;
        assert_eq!(prefs["defaultLayoutId"], current["layoutId"]);
    }

    #[tokio::test]
    async fn test_widget_routes() {
        let app = app();
        let (_, current) = send(&app, "GET", "/users/u1/layouts/current", None).await;
        let layout_id = current["layoutId"].as_str().unwrap().to_string();
        let widgets = format!("/users/u1/layouts/{}/widgets", layout_id);

        let (status, added) = send(
            &app,
            "POST",
            &widgets,
            Some(json!({ "templateId": "billing-summary" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let instance_id = added["instanceId"].as_str().unwrap().to_string();
        assert_eq!(added["position"], json!({ "x": 0, "y": 0, "width": 6, "height": 3 }));

        let (status, updated) = send(
            &app,
            "PATCH",
            &format!("{}/{}", widgets, instance_id),
            Some(json!({ "title": "Invoice", "visible": false })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["title"], "Invoice");
        assert_eq!(updated["visible"], false);

        let (status, moved) = send(
            &app,
            "PATCH",
            &format!("{}/{}/position", widgets, instance_id),
            Some(json!({ "x": 6 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(moved["position"]["x"], 6);

        let (status, _) = send(
            &app,
            "PATCH",
            &format!("{}/{}/position", widgets, instance_id),
            Some(json!({ "x": 10 })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (_, plan) = send(&app, "GET", "/users/u1/render-plan", None).await;
        let slots = plan["slots"].as_array().unwrap();
        assert!(slots.iter().all(|s| s["instanceId"] != instance_id.as_str()));

        let (status, removed) =
            send(&app, "DELETE", &format!("{}/{}", widgets, instance_id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(removed, json!({ "removed": true }));

        let (_, removed) = send(&app, "DELETE", &format!("{}/{}", widgets, instance_id), None).await;
        assert_eq!(removed, json!({ "removed": false }));

        let (status, _) = send(
            &app,
            "POST",
            &widgets,
            Some(json!({ "templateId": "nonexistent-widget" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_drag_routes_reorder_current_layout() {
        let app = app();
        let (_, current) = send(&app, "GET", "/users/u1/layouts/current", None).await;
        let ids: Vec<String> = current["widgets"]
            .as_array()
            .unwrap()
            .iter()
            .map(|w| w["instanceId"].as_str().unwrap().to_string())
            .collect();

        let (status, state) = send(
            &app,
            "POST",
            "/users/u1/drag/start",
            Some(json!({ "instanceId": ids[0] })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(state["state"], "dragging");

        let (_, state) = send(
            &app,
            "POST",
            "/users/u1/drag/hover",
            Some(json!({ "instanceId": ids[3] })),
        )
        .await;
        assert_eq!(state["state"], "hovering");

        let (_, outcome) = send(&app, "POST", "/users/u1/drag/drop", None).await;
        assert_eq!(outcome["outcome"], "reordered");
        assert_eq!(outcome["from"], 0);
        assert_eq!(outcome["to"], 3);

        let (_, current) = send(&app, "GET", "/users/u1/layouts/current", None).await;
        assert_eq!(current["widgets"][3]["instanceId"], ids[0].as_str());

        let (_, outcome) = send(&app, "POST", "/users/u1/drag/cancel", None).await;
        assert_eq!(outcome["outcome"], "unchanged");

        let (status, _) = send(
            &app,
            "POST",
            "/users/u1/drag/start",
            Some(json!({ "instanceId": "ghost" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_preference_routes() {
        let app = app();

        let (status, prefs) = send(&app, "GET", "/users/u1/preferences", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(prefs["units"]["energy"], "kWh");
        assert_eq!(prefs["timezone"], "Europe/Madrid");

        let (_, prefs) = send(
            &app,
            "PATCH",
            "/users/u1/preferences",
            Some(json!({
                "units": { "energy": "MWh" },
                "customLabels": { "M1": { "name": "Chiller" } }
            })),
        )
        .await;
        assert_eq!(prefs["units"]["energy"], "MWh");
        assert_eq!(prefs["units"]["reactive"], "kVArh");
        assert_eq!(prefs["customLabels"]["M1"]["name"], "Chiller");

        let (_, prefs) = send(
            &app,
            "PUT",
            "/users/u1/preferences/colors/activeEnergy",
            Some(json!({ "color": "#1f77b4" })),
        )
        .await;
        assert_eq!(prefs["chartColors"]["activeEnergy"], "#1f77b4");

        let (_, prefs) = send(&app, "DELETE", "/users/u1/preferences/labels/M1", None).await;
        assert_eq!(prefs["customLabels"], json!({}));

        let (_, prefs) = send(&app, "DELETE", "/users/u1/preferences", None).await;
        assert_eq!(prefs["units"]["energy"], "kWh");
        assert_eq!(prefs["chartColors"], json!({}));
    }

    struct UnavailableRepository;

    #[async_trait]
    impl DashboardRepository for UnavailableRepository {
        async fn load_layouts(&self, _user_id: &str) -> anyhow::Result<Option<LayoutSnapshot>> {
            anyhow::bail!("connection refused")
        }

        async fn save_layouts(&self, _user_id: &str, _snapshot: &LayoutSnapshot) -> anyhow::Result<()> {
            anyhow::bail!("connection refused")
        }

        async fn load_preferences(&self, _user_id: &str) -> anyhow::Result<Option<UserPreferences>> {
            anyhow::bail!("connection refused")
        }

        async fn save_preferences(&self, _preferences: &UserPreferences) -> anyhow::Result<()> {
            anyhow::bail!("connection refused")
        }
    }

    #[tokio::test]
    async fn test_unavailable_store_maps_to_bad_gateway() {
        let service = test_service(Arc::new(UnavailableRepository));
        let app = build_router(Arc::new(AppState::new(service)));

        let (status, body) = send(&app, "GET", "/users/u1/layouts", None).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"], "connection refused");

        // The catalog does not depend on the store.
        let (status, _) = send(&app, "GET", "/templates", None).await;
        assert_eq!(status, StatusCode::OK);
    }
}
