use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use service::AppState;

/// GET the relay's liveness
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "API router is up and responding to requests", body = String),
        (status = 503, description = "Relay is shutting down and no longer accepts event streams", body = String)
    )
)]
pub async fn health_check(State(app_state): State<AppState>) -> impl IntoResponse {
    if app_state.relay_ref().is_shutting_down() {
        (StatusCode::SERVICE_UNAVAILABLE, "shutting down")
    } else {
        (StatusCode::OK, "healthy")
    }
}
