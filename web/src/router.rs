use crate::{controller::health_check_controller, sse};
use axum::{routing::get, Router};
use service::AppState;

use utoipa::OpenApi;
use utoipa_rapidoc::RapiDoc;

// This is the global definition of our OpenAPI document. To be a part
// of the rendered document, a path must be listed here.
#[derive(OpenApi)]
#[openapi(
        info(
            title = "Event Relay API"
        ),
        paths(
            health_check_controller::health_check,
            sse::handler::event_stream,
        ),
        tags(
            (name = "event_relay", description = "Live state-change notifications over Server-Sent Events")
        )
    )]
struct ApiDoc;

pub fn define_routes(app_state: AppState) -> Router {
    let url_prefix = app_state.config.url_prefix();

    Router::new()
        .merge(health_routes(app_state.clone()))
        .merge(event_routes(app_state, &url_prefix))
        .merge(RapiDoc::with_openapi("/api-docs/openapi.json", ApiDoc::openapi()).path("/rapidoc"))
}

fn health_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check_controller::health_check))
        .with_state(app_state)
}

fn event_routes(app_state: AppState, url_prefix: &str) -> Router {
    Router::new()
        // GET {url_prefix}/api/event
        .route(
            &format!("{url_prefix}/api/event"),
            get(sse::handler::event_stream),
        )
        .with_state(app_state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use axum::response::Response;
    use clap::Parser;
    use events::{EventCategory, Notifier};
    use service::config::Config;
    use std::time::Duration;
    use tower::ServiceExt; // for `oneshot`

    fn app_state(extra_args: &[&str]) -> (AppState, Notifier) {
        let mut argv = vec![
            "event_relay",
            "--watcher-interval-ms",
            "10",
            "--poll-interval-ms",
            "20",
        ];
        argv.extend_from_slice(extra_args);
        let config = Config::try_parse_from(argv).unwrap();

        let (relay, notifier, _queue) = service::init_relay(&config).unwrap();
        (AppState::new(config, &relay), notifier)
    }

    async fn get(app_state: &AppState, uri: &str) -> Response {
        define_routes(app_state.clone())
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = tokio::time::timeout(
            Duration::from_secs(5),
            to_bytes(response.into_body(), usize::MAX),
        )
        .await
        .expect("stream should close on its own")
        .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_health_check_reports_healthy() {
        let (app_state, _notifier) = app_state(&[]);

        let response = get(&app_state, "/health").await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "healthy");
        app_state.relay.shutdown();
    }

    #[tokio::test]
    async fn test_health_check_reports_shutdown() {
        let (app_state, _notifier) = app_state(&[]);
        app_state.relay.shutdown();

        let response = get(&app_state, "/health").await;

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_event_stream_headers() {
        let (app_state, _notifier) = app_state(&[]);

        let response = get(&app_state, "/api/event").await;

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers[header::CONTENT_TYPE], "text/event-stream");
        assert_eq!(headers[header::CACHE_CONTROL], "no-cache");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(headers["x-accel-buffering"], "no");

        drop(response);
        app_state.relay.shutdown();
    }

    #[tokio::test]
    async fn test_event_stream_with_count_closes_after_last_frame() {
        let (app_state, notifier) = app_state(&[]);

        let response = get(&app_state, "/api/event?count=1").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(app_state.relay.active_sessions(), 1);

        notifier.notify(EventCategory::Schedule);

        assert_eq!(body_text(response).await, "data: schedule\n\n");
        assert_eq!(app_state.relay.active_sessions(), 0);
        app_state.relay.shutdown();
    }

    #[tokio::test]
    async fn test_event_stream_primed_with_heartbeat() {
        let (app_state, notifier) = app_state(&["--prime-with-heartbeat"]);

        let response = get(&app_state, "/api/event?count=1").await;
        notifier.notify(EventCategory::Control);

        assert_eq!(
            body_text(response).await,
            "data: dummy\n\ndata: control\n\n"
        );
        app_state.relay.shutdown();
    }

    #[tokio::test]
    async fn test_event_stream_ends_on_shutdown() {
        let (app_state, _notifier) = app_state(&[]);

        let response = get(&app_state, "/api/event").await;
        app_state.relay.shutdown();

        assert_eq!(body_text(response).await, "");
    }

    #[tokio::test]
    async fn test_event_stream_with_invalid_count_is_unbounded() {
        for uri in ["/api/event?count=abc", "/api/event?count=-1", "/api/event?count="] {
            let (app_state, notifier) = app_state(&[]);

            let response = get(&app_state, uri).await;
            assert_eq!(response.status(), StatusCode::OK, "{uri}");
            let body = tokio::spawn(body_text(response));

            tokio::time::sleep(Duration::from_millis(50)).await;
            notifier.notify(EventCategory::Log);
            tokio::time::sleep(Duration::from_millis(100)).await;
            notifier.notify(EventCategory::Control);
            tokio::time::sleep(Duration::from_millis(100)).await;
            app_state.relay.shutdown();

            assert_eq!(
                body.await.unwrap(),
                "data: log\n\ndata: control\n\n",
                "{uri}"
            );
        }
    }

    #[tokio::test]
    async fn test_event_stream_mounted_under_url_prefix() {
        let (app_state, _notifier) = app_state(&["--url-prefix", "test"]);

        let prefixed = get(&app_state, "/test/api/event").await;
        assert_eq!(prefixed.status(), StatusCode::OK);
        drop(prefixed);

        let unprefixed = get(&app_state, "/api/event").await;
        assert_eq!(unprefixed.status(), StatusCode::NOT_FOUND);

        app_state.relay.shutdown();
    }

    #[tokio::test]
    async fn test_openapi_document_lists_endpoints() {
        let (app_state, _notifier) = app_state(&[]);

        let response = get(&app_state, "/api-docs/openapi.json").await;
        assert_eq!(response.status(), StatusCode::OK);

        let document: serde_json::Value =
            serde_json::from_str(&body_text(response).await).unwrap();
        assert!(document["paths"]["/health"].is_object());
        assert!(document["paths"]["/api/event"].is_object());
        app_state.relay.shutdown();
    }
}
