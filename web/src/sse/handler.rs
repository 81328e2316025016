use crate::error::Error;
use crate::params::event::EventStreamParams;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::header::{self, HeaderName};
use axum::response::sse::{Event, Sse};
use axum::response::IntoResponse;
use futures::StreamExt;
use log::*;
use service::AppState;
use std::convert::Infallible;

const X_ACCEL_BUFFERING: HeaderName = HeaderName::from_static("x-accel-buffering");

/// GET a live stream of state-change notifications
///
/// Each frame's data is the name of a category whose counter moved since the
/// previous poll, or `dummy` when the stream has been idle for a while.
#[utoipa::path(
    get,
    path = "/api/event",
    params(EventStreamParams),
    responses(
        (status = 200, description = "Event stream opened", content_type = "text/event-stream", body = String),
        (status = 400, description = "Query string could not be decoded", body = String)
    )
)]
pub(crate) async fn event_stream(
    State(app_state): State<AppState>,
    params: core::result::Result<Query<EventStreamParams>, QueryRejection>,
) -> Result<impl IntoResponse, Error> {
    let Query(params) = params?;
    let count = params.count();
    debug!("Event stream requested (count: {:?})", count);

    let frames = app_state
        .relay_ref()
        .open_session(count)
        .into_stream()
        .map(|frame| Ok::<Event, Infallible>(Event::from(frame)));

    Ok((
        [
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
            (header::CACHE_CONTROL, "no-cache"),
            (X_ACCEL_BUFFERING, "no"),
        ],
        Sse::new(frames),
    ))
}
