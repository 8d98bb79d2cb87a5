//! API routes.

use axum::middleware;
use axum::routing::get;
use axum::Router;

use crate::handlers::download::download_video;
use crate::handlers::health;
use crate::handlers::search::search_videos;
use crate::middleware::{cors_layer, request_logging};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/search", get(search_videos))
        .route("/download", get(download_video));

    Router::new()
        .nest("/api", api_routes)
        .route("/health", get(health))
        .route("/healthz", get(health))
        .layer(middleware::from_fn(request_logging))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::config::ApiConfig;

    fn router() -> Router {
        create_router(AppState::new(ApiConfig::default()))
    }

    async fn get_json(router: Router, uri: &str) -> (StatusCode, Value) {
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let (status, body) = get_json(router(), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn search_without_query_is_a_client_error() {
        let (status, body) = get_json(router(), "/api/search").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "invalid_request");
    }

    #[tokio::test]
    async fn search_with_blank_query_is_a_client_error() {
        let (status, body) = get_json(router(), "/api/search?q=%20%20").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "invalid_request");
    }

    #[tokio::test]
    async fn download_without_params_is_a_client_error() {
        let (status, body) = get_json(router(), "/api/download").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "invalid_request");
    }

    #[tokio::test]
    async fn download_with_empty_id_returns_400_and_no_payload() {
        let (status, body) = get_json(router(), "/api/download?videoId=&format=mp4").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        // Error envelope only, zero payload bytes.
        assert!(body.get("error").is_some());
    }

    #[tokio::test]
    async fn download_with_bad_id_is_a_client_error() {
        let (status, _) = get_json(router(), "/api/download?videoId=nope&format=mp4").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn download_with_unknown_format_is_a_client_error() {
        let (status, body) =
            get_json(router(), "/api/download?videoId=dQw4w9WgXcQ&format=flac").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "invalid_request");
    }

    #[tokio::test]
    async fn unknown_routes_are_404() {
        let (status, _) = get_json(router(), "/api/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
