//! Unit tests for the workflow controller's state machine

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;

use portrait_gateway::workflow::prompt;
use portrait_gateway::workflow::{
    CandidateFile, Completion, Phase, TransformRequest, TransformResult, Transformer,
    ValidationError, WorkflowController, WorkflowError,
};

/// Holds every request until a permit is released
struct GatedTransformer {
    calls: AtomicUsize,
    requests: parking_lot::Mutex<Vec<TransformRequest>>,
    gate: Semaphore,
    result: TransformResult,
}

impl GatedTransformer {
    fn new(result: TransformResult) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            requests: parking_lot::Mutex::new(Vec::new()),
            gate: Semaphore::new(0),
            result,
        })
    }

    fn release(&self) {
        self.gate.add_permits(1);
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transformer for GatedTransformer {
    async fn transform(&self, request: &TransformRequest) -> TransformResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(request.clone());
        self.gate.acquire().await.unwrap().forget();
        self.result.clone()
    }
}

fn jpeg(len: usize) -> CandidateFile {
    let mut bytes = vec![0u8; len];
    bytes[..3].copy_from_slice(&[0xFF, 0xD8, 0xFF]);
    CandidateFile::from_bytes("photo.jpg", "image/jpeg", bytes)
}

async fn wait_for_calls(transformer: &GatedTransformer, n: usize) {
    while transformer.calls() < n {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn test_oversized_png_is_rejected_without_state_change() {
    let controller = WorkflowController::new();
    let candidate = CandidateFile::from_bytes("big.png", "image/png", vec![0u8; 6 * 1024 * 1024]);

    let err = controller.select(candidate).await.unwrap_err();
    match err {
        WorkflowError::Validation(e @ ValidationError::TooLarge { .. }) => {
            assert_eq!(e.reason(), "too large")
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(controller.phase(), Phase::Idle);
}

#[tokio::test]
async fn test_blank_prompt_sends_default_instruction() {
    let controller = WorkflowController::new();
    let transformer = GatedTransformer::new(TransformResult::Success {
        result_image_url: "https://x/y.png".to_string(),
    });
    transformer.release();

    controller.select(jpeg(2 * 1024 * 1024)).await.unwrap();
    let completion = controller.transform(transformer.as_ref()).await.unwrap();

    assert_eq!(completion, Completion::Applied(Phase::Succeeded));
    let sent = transformer.requests.lock()[0].clone();
    assert_eq!(sent.prompt, prompt::compose(prompt::DEFAULT_DESCRIPTION));
    assert!(sent.prompt.contains("a character with expressive features and detailed background"));
}

#[tokio::test]
async fn test_repeated_clicks_issue_one_request() {
    let controller = Arc::new(WorkflowController::new());
    let transformer = GatedTransformer::new(TransformResult::failure("quota exceeded"));
    controller.select(jpeg(1024)).await.unwrap();

    let first = {
        let controller = controller.clone();
        let transformer = transformer.clone();
        tokio::spawn(async move { controller.transform(transformer.as_ref()).await })
    };
    wait_for_calls(&transformer, 1).await;
    assert_eq!(controller.phase(), Phase::InFlight);

    for _ in 0..3 {
        let again = controller.transform(transformer.as_ref()).await;
        assert!(matches!(again, Err(WorkflowError::AlreadyInFlight)));
    }

    transformer.release();
    let completion = first.await.unwrap().unwrap();
    assert_eq!(completion, Completion::Applied(Phase::Failed));
    assert_eq!(transformer.calls(), 1);
}

#[tokio::test]
async fn test_new_image_discards_stale_result() {
    let controller = Arc::new(WorkflowController::new());
    let transformer = GatedTransformer::new(TransformResult::Success {
        result_image_url: "https://x/old.png".to_string(),
    });
    controller.select(jpeg(1024)).await.unwrap();

    let pending = {
        let controller = controller.clone();
        let transformer = transformer.clone();
        tokio::spawn(async move { controller.transform(transformer.as_ref()).await })
    };
    wait_for_calls(&transformer, 1).await;

    let newer = controller.select(jpeg(2048)).await.unwrap();
    transformer.release();

    assert_eq!(pending.await.unwrap().unwrap(), Completion::Discarded);
    let snapshot = controller.snapshot();
    assert_eq!(snapshot.phase, Phase::Ready);
    assert!(snapshot.result.is_none());
    assert_eq!(snapshot.image.unwrap().id(), newer);
}

#[tokio::test]
async fn test_failure_then_try_again_without_reupload() {
    let controller = WorkflowController::new();
    let transformer = GatedTransformer::new(TransformResult::failure("quota exceeded"));
    transformer.release();

    let image_id = controller.select(jpeg(1024)).await.unwrap();
    controller.transform(transformer.as_ref()).await.unwrap();

    assert_eq!(controller.phase(), Phase::Failed);
    assert_eq!(controller.result(), Some(TransformResult::failure("quota exceeded")));

    controller.dismiss_error();
    assert_eq!(controller.phase(), Phase::Ready);
    assert_eq!(controller.snapshot().image.unwrap().id(), image_id);

    transformer.release();
    controller.transform(transformer.as_ref()).await.unwrap();
    assert_eq!(transformer.calls(), 2);
}

#[tokio::test]
async fn test_selecting_after_success_returns_to_ready() {
    let controller = WorkflowController::new();
    let transformer = GatedTransformer::new(TransformResult::Success {
        result_image_url: "https://x/y.png".to_string(),
    });
    transformer.release();

    controller.select(jpeg(1024)).await.unwrap();
    controller.transform(transformer.as_ref()).await.unwrap();
    assert_eq!(controller.phase(), Phase::Succeeded);

    controller.select(jpeg(4096)).await.unwrap();
    assert_eq!(controller.phase(), Phase::Ready);
    assert!(controller.result().is_none());
}

#[tokio::test]
async fn test_custom_prompt_is_composed() {
    let controller = WorkflowController::new();
    controller.select(jpeg(1024)).await.unwrap();
    controller.set_prompt("a girl with a red scarf");

    let ticket = controller.begin_transform().unwrap();
    assert_eq!(ticket.request().prompt, prompt::compose("a girl with a red scarf"));
}

#[tokio::test]
async fn test_cancelled_transform_releases_in_flight_guard() {
    let controller = WorkflowController::new();
    let transformer = GatedTransformer::new(TransformResult::Success {
        result_image_url: "https://x/y.png".to_string(),
    });
    controller.select(jpeg(1024)).await.unwrap();

    let cancelled = tokio::time::timeout(
        std::time::Duration::from_millis(50),
        controller.transform(transformer.as_ref()),
    )
    .await;
    assert!(cancelled.is_err());
    assert_eq!(transformer.calls(), 1);
    assert_eq!(controller.phase(), Phase::Ready);

    controller.new_transform();
    controller.select(jpeg(2048)).await.unwrap();
    assert_eq!(controller.phase(), Phase::Ready);

    transformer.release();
    let completion = controller.transform(transformer.as_ref()).await.unwrap();
    assert_eq!(completion, Completion::Applied(Phase::Succeeded));
    assert_eq!(transformer.calls(), 2);
}
