// HTTP request handlers
use crate::application::codec::ImportPreview;
use crate::domain::dashboard::DashboardState;
use crate::domain::market::WidgetView;
use crate::domain::settings::{Settings, SettingsPatch};
use crate::domain::widget::{LayoutItem, NewWidget, Widget, WidgetPatch};
use crate::infrastructure::feed_stream::ndjson_feed_response;
use crate::infrastructure::http_response::{accepts_brotli, json_document_response};
use crate::presentation::api_error::ApiError;
use crate::presentation::app_state::AppState;
use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use std::sync::Arc;

const EXPORT_FILENAME: &str = "finboard-dashboard.json";

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

pub async fn get_dashboard(State(state): State<Arc<AppState>>) -> Json<DashboardState> {
    Json(state.dashboard.snapshot().await)
}

/// Export as an indented JSON download
pub async fn export_dashboard(
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Response {
    let text = match state.dashboard.export_json().await {
        Ok(text) => text,
        Err(e) => return ApiError::Internal(e.to_string()).into_response(),
    };

    match json_document_response(text, accepts_brotli(&headers), Some(EXPORT_FILENAME)).await {
        Ok(response) => response,
        Err(status) => status.into_response(),
    }
}

pub async fn import_dashboard(
    State(state): State<Arc<AppState>>,
    body: String,
) -> Result<Json<DashboardState>, ApiError> {
    match state.dashboard.import_json(&body).await {
        Ok(imported) => {
            tracing::info!("Imported dashboard with {} widgets", imported.widgets.len());
            Ok(Json(imported))
        }
        Err(e) => {
            tracing::warn!("Rejected dashboard import: {}", e);
            Err(e.into())
        }
    }
}

/// Validate an import and report its effect without applying it
pub async fn preview_import(
    State(state): State<Arc<AppState>>,
    body: String,
) -> Result<Json<ImportPreview>, ApiError> {
    Ok(Json(state.dashboard.preview_import(&body).await?))
}

pub async fn reset_dashboard(State(state): State<Arc<AppState>>) -> StatusCode {
    state.dashboard.reset().await;
    tracing::info!("Dashboard reset");
    StatusCode::NO_CONTENT
}

/// Layout-change event from the grid surface
pub async fn apply_layout(
    State(state): State<Arc<AppState>>,
    Json(snapshot): Json<Vec<LayoutItem>>,
) -> Json<Vec<Widget>> {
    Json(state.dashboard.apply_layout(&snapshot).await)
}

pub async fn list_widgets(State(state): State<Arc<AppState>>) -> Json<Vec<Widget>> {
    Json(state.dashboard.widgets().await)
}

/// Replace the collection wholesale (drag-to-reorder)
pub async fn reorder_widgets(
    State(state): State<Arc<AppState>>,
    Json(items): Json<Vec<Widget>>,
) -> Result<StatusCode, ApiError> {
    if let Err(e) = state.dashboard.reorder(items).await {
        tracing::warn!("Rejected widget reorder: {}", e);
        return Err(e.into());
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_widget(
    State(state): State<Arc<AppState>>,
    Json(partial): Json<NewWidget>,
) -> (StatusCode, Json<Widget>) {
    let widget = state.dashboard.add(partial).await;
    (StatusCode::CREATED, Json(widget))
}

pub async fn update_widget(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(patch): Json<WidgetPatch>,
) -> Result<Json<Widget>, ApiError> {
    state
        .dashboard
        .update(&id, patch)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("widget {}", id)))
}

/// Always 204: removing an unknown widget is not an error
pub async fn remove_widget(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> StatusCode {
    if !state.dashboard.remove(&id).await {
        tracing::debug!("Remove of unknown widget {} ignored", id);
    }
    StatusCode::NO_CONTENT
}

pub async fn widget_data(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<WidgetView>, ApiError> {
    state
        .dashboard
        .feeds()
        .view(&id)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("widget {}", id)))
}

/// Stream a widget's display state as it refreshes
pub async fn stream_widget(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let Some(rx) = state.dashboard.feeds().subscribe(&id) else {
        return ApiError::NotFound(format!("widget {}", id)).into_response();
    };
    match ndjson_feed_response(rx) {
        Ok(response) => response,
        Err(status) => status.into_response(),
    }
}

pub async fn get_settings(State(state): State<Arc<AppState>>) -> Json<Settings> {
    Json(state.dashboard.settings().await)
}

pub async fn patch_settings(
    State(state): State<Arc<AppState>>,
    Json(patch): Json<SettingsPatch>,
) -> Json<Settings> {
    Json(state.dashboard.set_settings(patch).await)
}
