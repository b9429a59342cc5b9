//! Workflow controller: single owner of the upload, prompt, result and in-flight state

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};

use crate::workflow::client::{TransformRequest, TransformResult, Transformer};
use crate::workflow::encoder::{self, EncodedImage};
use crate::workflow::prompt;
use crate::workflow::validator::{self, CandidateFile, MediaType};
use crate::workflow::WorkflowError;

/// Identity of one accepted upload; a new selection always gets a larger id
pub type ImageId = u64;

/// Where the workflow currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Ready,
    InFlight,
    Succeeded,
    Failed,
}

/// An accepted upload. The encoded form is built once from the bytes and never mutated.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    id: ImageId,
    name: String,
    encoded: EncodedImage,
}

impl UploadedImage {
    pub fn id(&self) -> ImageId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn media_type(&self) -> MediaType {
        self.encoded.media_type
    }

    pub fn bytes(&self) -> &[u8] {
        &self.encoded.bytes
    }

    pub fn base64(&self) -> &str {
        &self.encoded.base64
    }

    pub fn preview(&self) -> &str {
        &self.encoded.preview
    }
}

/// Proof that a transform was started for a particular image
#[derive(Debug)]
pub struct TransformTicket {
    image_id: ImageId,
    request: TransformRequest,
}

impl TransformTicket {
    pub fn image_id(&self) -> ImageId {
        self.image_id
    }

    pub fn request(&self) -> &TransformRequest {
        &self.request
    }
}

/// Releases the in-flight guard if a running transform is dropped before its result arrives
struct InFlightGuard<'a> {
    state: &'a Mutex<WorkflowState>,
    image_id: ImageId,
    armed: bool,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut state = self.state.lock();
        if state.in_flight == Some(self.image_id) {
            state.in_flight = None;
            warn!(image_id = self.image_id, "Transform abandoned before its result arrived");
        }
    }
}

/// What happened to a result handed back to the controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// The result belongs to the current image and is now displayed
    Applied(Phase),
    /// The image changed while the request was out; the result was dropped
    Discarded,
}

/// Read-only copy of the state for rendering
#[derive(Debug, Clone)]
pub struct WorkflowSnapshot {
    pub phase: Phase,
    pub image: Option<UploadedImage>,
    pub prompt: String,
    pub result: Option<TransformResult>,
}

#[derive(Debug, Default)]
struct WorkflowState {
    image: Option<UploadedImage>,
    prompt: String,
    result: Option<TransformResult>,
    in_flight: Option<ImageId>,
}

impl WorkflowState {
    fn phase(&self) -> Phase {
        if self.in_flight.is_some() {
            return Phase::InFlight;
        }
        match (&self.image, &self.result) {
            (None, _) => Phase::Idle,
            (Some(_), None) => Phase::Ready,
            (Some(_), Some(TransformResult::Success { .. })) => Phase::Succeeded,
            (Some(_), Some(TransformResult::Failure { .. })) => Phase::Failed,
        }
    }
}

/// Drives select → transform → result for one session
#[derive(Debug, Default)]
pub struct WorkflowController {
    state: Mutex<WorkflowState>,
    next_image_id: AtomicU64,
}

impl WorkflowController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        self.state.lock().phase()
    }

    pub fn snapshot(&self) -> WorkflowSnapshot {
        let state = self.state.lock();
        WorkflowSnapshot {
            phase: state.phase(),
            image: state.image.clone(),
            prompt: state.prompt.clone(),
            result: state.result.clone(),
        }
    }

    pub fn prompt(&self) -> String {
        self.state.lock().prompt.clone()
    }

    pub fn set_prompt(&self, text: impl Into<String>) {
        self.state.lock().prompt = text.into();
    }

    pub fn result(&self) -> Option<TransformResult> {
        self.state.lock().result.clone()
    }

    /// Validate and encode a file, then make it the current image.
    ///
    /// Any earlier result is dropped. On error the state is left as it was.
    pub async fn select(&self, candidate: CandidateFile) -> Result<ImageId, WorkflowError> {
        let media_type = validator::validate(&candidate).map_err(|e| {
            debug!(name = %candidate.name, reason = e.reason(), "Upload rejected");
            e
        })?;
        let encoded = encoder::encode(&candidate, media_type).await?;

        let id = self.next_image_id.fetch_add(1, Ordering::Relaxed) + 1;
        let mut state = self.state.lock();
        state.image = Some(UploadedImage {
            id,
            name: candidate.name,
            encoded,
        });
        state.result = None;

        if state.in_flight.is_some() {
            info!(image_id = id, "New image selected while a transform is running; its result will be dropped");
        } else {
            info!(image_id = id, "Image ready");
        }
        Ok(id)
    }

    /// Start a transform for the current image if none is running
    pub fn begin_transform(&self) -> Result<TransformTicket, WorkflowError> {
        let mut state = self.state.lock();
        if state.in_flight.is_some() {
            debug!("Transform already in flight; ignoring request");
            return Err(WorkflowError::AlreadyInFlight);
        }
        let image = state.image.as_ref().ok_or(WorkflowError::NoImage)?;

        let ticket = TransformTicket {
            image_id: image.id,
            request: TransformRequest {
                image_base64: image.base64().to_string(),
                prompt: prompt::compose(&state.prompt),
            },
        };
        state.in_flight = Some(ticket.image_id);
        state.result = None;

        info!(image_id = ticket.image_id, "Transform started");
        Ok(ticket)
    }

    /// Hand back the single response for `ticket`
    pub fn complete(&self, ticket: TransformTicket, result: TransformResult) -> Completion {
        let mut state = self.state.lock();
        if state.in_flight == Some(ticket.image_id) {
            state.in_flight = None;
        }

        let current = state.image.as_ref().map(|image| image.id);
        if current != Some(ticket.image_id) {
            warn!(
                image_id = ticket.image_id,
                current = ?current,
                "Dropping result for a superseded image"
            );
            return Completion::Discarded;
        }

        match &result {
            TransformResult::Success { result_image_url } => {
                info!(image_id = ticket.image_id, url = %result_image_url, "Transform succeeded")
            }
            TransformResult::Failure { message } => {
                warn!(image_id = ticket.image_id, error = %message, "Transform failed")
            }
        }
        state.result = Some(result);
        Completion::Applied(state.phase())
    }

    /// Run one full transform round trip through `transformer`.
    ///
    /// Dropping the returned future before it resolves releases the in-flight guard.
    pub async fn transform(&self, transformer: &dyn Transformer) -> Result<Completion, WorkflowError> {
        let ticket = self.begin_transform()?;
        let mut guard = InFlightGuard {
            state: &self.state,
            image_id: ticket.image_id,
            armed: true,
        };
        let result = transformer.transform(ticket.request()).await;
        guard.armed = false;
        Ok(self.complete(ticket, result))
    }

    /// Leave `Failed` for `Ready`, keeping the current image
    pub fn dismiss_error(&self) {
        let mut state = self.state.lock();
        if matches!(state.result, Some(TransformResult::Failure { .. })) {
            state.result = None;
        }
    }

    /// Drop the current image and its result; the prompt is kept
    pub fn clear_image(&self) {
        let mut state = self.state.lock();
        state.image = None;
        state.result = None;
    }

    /// Reset to `Idle`, clearing the image, prompt and result
    pub fn new_transform(&self) {
        let mut state = self.state.lock();
        state.image = None;
        state.result = None;
        state.prompt.clear();
        debug!("Workflow reset");
    }
}
