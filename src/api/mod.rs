//! REST surface: prediction endpoints plus read-only views over the
//! analysis table.

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use chrono_tz::Tz;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{config::HttpConfig, db::analysis::AnalysisRepository, ml::SpamDetector};

pub mod client;
pub mod error;
pub mod export;
pub mod handlers;

pub use error::ApiError;

pub struct AppState {
    pub detector: Arc<SpamDetector>,
    pub repository: AnalysisRepository,
    pub timezone: Tz,
}

/// Every route answers with and without the trailing slash.
pub fn router(state: Arc<AppState>, http: &HttpConfig) -> Router {
    let mut router = Router::new();
    for (path, route) in [
        ("/api/health", get(handlers::health)),
        (
            "/api/analyze",
            get(handlers::health).post(handlers::analyze),
        ),
        ("/api/analyze-file", post(handlers::analyze_file)),
        ("/api/statistics", get(handlers::statistics)),
        ("/api/history", get(handlers::history)),
        ("/api/export", get(handlers::export)),
    ] {
        router = router
            .route(&format!("{path}/"), route.clone())
            .route(path, route);
    }

    let mut router = router
        .layer(DefaultBodyLimit::max(http.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    if http.cors_allow_any {
        router = router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
    }
    router
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
        response::Response,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::{db::init_memory_pool, ml::model::tests::tiny_model};

    const SPAM_TEXT: &str = "Subject: Free prize\n\nClaim your free cash prize now!";
    const HAM_TEXT: &str = "Subject: Project review\n\nThe project review moved to tomorrow.";

    fn http_config() -> HttpConfig {
        HttpConfig {
            max_upload_bytes: 1024 * 1024,
            cors_allow_any: true,
        }
    }

    async fn test_app(detector: SpamDetector) -> Router {
        let pool = init_memory_pool().await.unwrap();
        let state = Arc::new(AppState {
            detector: Arc::new(detector),
            repository: AnalysisRepository::new(pool),
            timezone: chrono_tz::UTC,
        });
        router(state, &http_config())
    }

    async fn loaded_app() -> Router {
        test_app(SpamDetector::with_model(
            tiny_model(),
            PathBuf::from("model.json"),
        ))
        .await
    }

    async fn send(app: &Router, request: Request<Body>) -> Response {
        app.clone().oneshot(request).await.unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::USER_AGENT, "test-agent")
            .header("x-forwarded-for", "198.51.100.4")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    fn multipart_upload(field: &str, filename: &str, content: &[u8]) -> Request<Body> {
        let boundary = "XBOUNDARYX";
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

        Request::post("/api/analyze-file/")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn health_reports_model_state() {
        let app = test_app(SpamDetector::unloaded(PathBuf::from("none.json"))).await;
        for uri in ["/api/health/", "/api/analyze/", "/api/health"] {
            let response = send(&app, get(uri)).await;
            assert_eq!(response.status(), StatusCode::OK);
            let body = json_body(response).await;
            assert_eq!(body["status"], "online");
            assert_eq!(body["model_loaded"], false);
        }
    }

    #[tokio::test]
    async fn analyze_returns_prediction_and_records_it() {
        let app = loaded_app().await;
        let response = send(&app, post_json("/api/analyze/", json!({ "email_text": SPAM_TEXT }))).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["prediction"], "spam");
        let confidence = body["confidence"].as_f64().unwrap();
        assert!((50.0..=100.0).contains(&confidence));
        assert!(body["latency"].as_f64().unwrap() >= 0.0);
        assert!(body["cleaned_text"].as_str().unwrap().contains("prize"));
        assert!(body.get("error").is_none());

        let history = json_body(send(&app, get("/api/history/")).await).await;
        assert_eq!(history["count"], 1);
        assert_eq!(history["results"][0]["prediction"], "spam");
        assert_eq!(history["results"][0]["confidence"], confidence);
    }

    #[tokio::test]
    async fn analyze_validates_input() {
        let app = loaded_app().await;

        let missing = send(&app, post_json("/api/analyze/", json!({}))).await;
        assert_eq!(missing.status(), StatusCode::BAD_REQUEST);
        let body = json_body(missing).await;
        assert!(body["error"]["email_text"][0].as_str().unwrap().contains("required"));

        let short = send(&app, post_json("/api/analyze/", json!({ "email_text": "hi there" }))).await;
        assert_eq!(short.status(), StatusCode::BAD_REQUEST);

        let long = "a".repeat(50_001);
        let too_long = send(&app, post_json("/api/analyze/", json!({ "email_text": long }))).await;
        assert_eq!(too_long.status(), StatusCode::BAD_REQUEST);

        let not_json = Request::post("/api/analyze/")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{oops"))
            .unwrap();
        let response = send(&app, not_json).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(json_body(response).await["error"].is_string());

        let stats = json_body(send(&app, get("/api/statistics/")).await).await;
        assert_eq!(stats["total_analyses"], 0);
    }

    #[tokio::test]
    async fn malformed_bodies_are_bad_requests() {
        let app = loaded_app().await;

        let wrong_type = send(&app, post_json("/api/analyze/", json!({ "email_text": true }))).await;
        assert_eq!(wrong_type.status(), StatusCode::BAD_REQUEST);
        let body = json_body(wrong_type).await;
        assert_eq!(body["error"]["email_text"][0], "Not a valid string.");

        let not_object = send(&app, post_json("/api/analyze/", json!(["free prize now"]))).await;
        assert_eq!(not_object.status(), StatusCode::BAD_REQUEST);
        assert!(json_body(not_object).await["error"]["email_text"].is_array());

        let no_content_type = Request::post("/api/analyze/")
            .body(Body::from(json!({ "email_text": SPAM_TEXT }).to_string()))
            .unwrap();
        let response = send(&app, no_content_type).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(json_body(response).await["error"].is_string());

        let numeric = send(&app, post_json("/api/analyze/", json!({ "email_text": 12345678901u64 }))).await;
        assert_eq!(numeric.status(), StatusCode::OK);
        assert_ne!(json_body(numeric).await["prediction"], "error");
    }

    #[tokio::test]
    async fn missing_model_yields_error_outcome_without_recording() {
        let app = test_app(SpamDetector::unloaded(PathBuf::from("none.json"))).await;
        let response = send(&app, post_json("/api/analyze/", json!({ "email_text": HAM_TEXT }))).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["prediction"], "error");
        assert_eq!(body["confidence"], 0.0);
        assert!(body["error"].as_str().unwrap().contains("none.json"));

        let stats = json_body(send(&app, get("/api/statistics/")).await).await;
        assert_eq!(stats["total_analyses"], 0);
    }

    #[tokio::test]
    async fn analyze_file_accepts_latin1_uploads() {
        let app = loaded_app().await;
        let content = b"Subject: Free prize\r\n\r\nClaim your free cash prize, se\xf1or!";
        let response = send(&app, multipart_upload("file", "inmail.1", content)).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["filename"], "inmail.1");
        assert_eq!(body["prediction"], "spam");
        assert!(body["cleaned_text"].as_str().unwrap().contains("señor"));
    }

    #[tokio::test]
    async fn analyze_file_requires_a_non_empty_file() {
        let app = loaded_app().await;

        let wrong_field = send(&app, multipart_upload("attachment", "a.eml", b"hello")).await;
        assert_eq!(wrong_field.status(), StatusCode::BAD_REQUEST);
        let body = json_body(wrong_field).await;
        assert_eq!(body["error"]["file"][0], "The file is required.");

        let empty = send(&app, multipart_upload("file", "empty.eml", b"")).await;
        assert_eq!(empty.status(), StatusCode::BAD_REQUEST);
        let body = json_body(empty).await;
        assert_eq!(body["error"]["file"][0], "The submitted file is empty.");
    }

    #[tokio::test]
    async fn statistics_and_history_reflect_recorded_analyses() {
        let app = loaded_app().await;
        for text in [SPAM_TEXT, SPAM_TEXT, HAM_TEXT] {
            let response = send(&app, post_json("/api/analyze/", json!({ "email_text": text }))).await;
            assert_eq!(response.status(), StatusCode::OK);
        }

        let stats = json_body(send(&app, get("/api/statistics/")).await).await;
        assert_eq!(stats["total_analyses"], 3);
        assert_eq!(stats["spam_count"], 2);
        assert_eq!(stats["ham_count"], 1);
        assert_eq!(stats["spam_percentage"], 66.67);
        assert_eq!(stats["ham_percentage"], 33.33);
        assert_eq!(stats["last_24h"]["total"], 3);
        let avg = stats["avg_confidence"].as_f64().unwrap();
        assert!((50.0..=100.0).contains(&avg));

        let history = json_body(send(&app, get("/api/history/?limit=2")).await).await;
        assert_eq!(history["count"], 2);
        assert_eq!(history["results"][0]["prediction"], "ham");

        let capped = json_body(send(&app, get("/api/history/?limit=500")).await).await;
        assert_eq!(capped["count"], 3);

        let bad = send(&app, get("/api/history/?limit=lots")).await;
        assert_eq!(bad.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn export_supports_json_and_csv() {
        let app = loaded_app().await;
        send(&app, post_json("/api/analyze/", json!({ "email_text": SPAM_TEXT }))).await;

        let exported = json_body(send(&app, get("/api/export/")).await).await;
        assert_eq!(exported["format"], "json");
        assert_eq!(exported["count"], 1);
        assert_eq!(exported["data"][0]["email_content"], SPAM_TEXT);

        let response = send(&app, get("/api/export/?format=csv&limit=5")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/csv"));
        assert!(response.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .contains("spam_analysis_export.csv"));
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let csv = String::from_utf8(bytes.to_vec()).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some("ID,Prediction,Confidence (%),Latency (ms),Date,Preview")
        );
        assert!(lines.next().unwrap().contains(",SPAM,"));
    }
}
