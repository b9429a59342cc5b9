//! Client-side transformation workflow
//!
//! A file is validated, encoded, and held by the [`WorkflowController`] until the
//! user asks for a transform. The controller issues at most one request at a time
//! through a [`Transformer`] and ties every response to the image it was sent for,
//! so a result that arrives after the user picked a different photo is dropped.

pub mod client;
pub mod controller;
pub mod encoder;
pub mod presenter;
pub mod prompt;
pub mod validator;

use thiserror::Error;

pub use client::{TransformClient, TransformRequest, TransformResult, Transformer};
pub use controller::{Completion, ImageId, Phase, WorkflowController, WorkflowSnapshot};
pub use encoder::EncodingError;
pub use presenter::{DownloadError, ResultPresenter};
pub use validator::{CandidateFile, MediaType, ValidationError};

/// Errors raised by user actions on the controller
#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Encoding(#[from] EncodingError),

    #[error("Please upload an image first")]
    NoImage,

    #[error("A transform is already in progress")]
    AlreadyInFlight,
}
