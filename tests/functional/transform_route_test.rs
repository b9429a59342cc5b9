//! Functional tests for the gateway's transform route

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header::CONTENT_TYPE, Request, StatusCode},
    Router,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use portrait_gateway::api::create_router;
use portrait_gateway::config::Settings;
use portrait_gateway::provider::{AssetHost, HostedAsset, ImageGenerator};
use portrait_gateway::{AppError, AppState, Result};

#[derive(Default)]
struct RecordingGenerator {
    prompts: Mutex<Vec<String>>,
    fail_with: Option<String>,
    delay: Option<Duration>,
}

#[async_trait]
impl ImageGenerator for RecordingGenerator {
    fn name(&self) -> &str {
        "recording"
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().push(prompt.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.fail_with {
            Some(message) => Err(AppError::Provider(message.clone())),
            None => Ok("https://cdn.example/result.png".to_string()),
        }
    }
}

struct FlakyHost {
    uploads: AtomicUsize,
    fail: bool,
}

#[async_trait]
impl AssetHost for FlakyHost {
    fn name(&self) -> &str {
        "flaky"
    }

    async fn upload(&self, _image_base64: &str, folder: &str) -> Result<HostedAsset> {
        self.uploads.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(AppError::Provider("Invalid Signature".to_string()));
        }
        Ok(HostedAsset {
            secure_url: format!("https://res.example/{}/a.png", folder),
            public_id: format!("{}/a", folder),
        })
    }
}

fn app(generator: Arc<RecordingGenerator>, host: Option<Arc<FlakyHost>>) -> Router {
    app_with(Settings::default(), generator, host)
}

fn app_with(
    settings: Settings,
    generator: Arc<RecordingGenerator>,
    host: Option<Arc<FlakyHost>>,
) -> Router {
    let state = AppState {
        settings,
        generator,
        asset_host: host.map(|h| h as Arc<dyn AssetHost>),
    };
    create_router(Arc::new(state))
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn read_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_transform_success() {
    let generator = Arc::new(RecordingGenerator::default());
    let response = app(generator.clone(), None)
        .oneshot(post_json(
            "/transform",
            serde_json::json!({ "imageBase64": "aGVsbG8=", "prompt": "a fox in a forest" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["resultImageUrl"], "https://cdn.example/result.png");
    assert_eq!(body["message"], "Image transformed successfully");
    assert_eq!(generator.prompts.lock().as_slice(), ["a fox in a forest"]);
}

#[tokio::test]
async fn test_missing_image_is_bad_request() {
    let generator = Arc::new(RecordingGenerator::default());
    let response = app(generator.clone(), None)
        .oneshot(post_json("/transform", serde_json::json!({ "prompt": "x" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(
        body["error"],
        "No image provided. Please provide a base64 encoded image."
    );
    assert!(generator.prompts.lock().is_empty());
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let request = Request::builder()
        .method("POST")
        .uri("/transform")
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let response = app(Arc::new(RecordingGenerator::default()), None)
        .oneshot(request)
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(read_json(response).await["success"], false);
}

#[tokio::test]
async fn test_blank_prompt_uses_server_default() {
    let generator = Arc::new(RecordingGenerator::default());
    app(generator.clone(), None)
        .oneshot(post_json(
            "/transform",
            serde_json::json!({ "imageBase64": "aGVsbG8=", "prompt": "  " }),
        ))
        .await
        .unwrap();

    assert_eq!(
        generator.prompts.lock().as_slice(),
        [Settings::default().server.default_prompt]
    );
}

#[tokio::test]
async fn test_hosting_failure_does_not_block_transform() {
    let generator = Arc::new(RecordingGenerator::default());
    let host = Arc::new(FlakyHost {
        uploads: AtomicUsize::new(0),
        fail: true,
    });

    let response = app(generator, Some(host.clone()))
        .oneshot(post_json(
            "/transform",
            serde_json::json!({ "imageBase64": "aGVsbG8=" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json(response).await["success"], true);
    assert_eq!(host.uploads.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_generation_failure_is_server_error() {
    let generator = Arc::new(RecordingGenerator {
        fail_with: Some("quota exceeded".to_string()),
        ..Default::default()
    });

    let response = app(generator, None)
        .oneshot(post_json(
            "/transform",
            serde_json::json!({ "imageBase64": "aGVsbG8=" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = read_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "quota exceeded");
}

#[tokio::test]
async fn test_request_timeout_uses_failure_envelope() {
    let mut settings = Settings::default();
    settings.server.request_timeout_secs = 1;
    let generator = Arc::new(RecordingGenerator {
        delay: Some(Duration::from_secs(10)),
        ..Default::default()
    });

    let response = app_with(settings, generator, None)
        .oneshot(post_json(
            "/transform",
            serde_json::json!({ "imageBase64": "aGVsbG8=" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = read_json(response).await;
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().starts_with("Timeout"));
}

#[tokio::test]
async fn test_legacy_route_alias() {
    let host = Arc::new(FlakyHost {
        uploads: AtomicUsize::new(0),
        fail: false,
    });
    let response = app(Arc::new(RecordingGenerator::default()), Some(host.clone()))
        .oneshot(post_json(
            "/api/transform/image",
            serde_json::json!({ "imageBase64": "aGVsbG8=" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(host.uploads.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_large_upload_fits_body_limit() {
    let encoded = "A".repeat(6 * 1024 * 1024);
    let response = app(Arc::new(RecordingGenerator::default()), None)
        .oneshot(post_json(
            "/transform",
            serde_json::json!({ "imageBase64": encoded }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_health() {
    let response = app(Arc::new(RecordingGenerator::default()), None)
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json(response).await["status"], "ok");
}
