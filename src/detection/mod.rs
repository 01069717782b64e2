// src/detection/mod.rs
//
// Object detection collaborators. The gate never runs a model itself;
// it hands a frozen frame to an ObjectDetector through the dispatcher
// and gets filtered Detections back.

mod filter;
mod remote;

pub use filter::DetectionFilter;
pub use remote::RemoteDetector;

use crate::types::{Frame, Observation};
use std::future::Future;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DetectionError {
    #[error("detection request failed: {0}")]
    Request(String),

    #[error("detection server returned {status}: {body}")]
    Server { status: u16, body: String },

    #[error("could not decode detection response: {0}")]
    Decode(String),

    #[error("could not encode frame: {0}")]
    Encode(String),

    #[error("detection did not complete within {after_ms} ms")]
    Timeout { after_ms: u64 },

    #[error("detection worker failed: {0}")]
    Worker(String),
}

/// Runs one inference pass over a frame.
pub trait ObjectDetector: Send + Sync + 'static {
    fn detect(
        &self,
        frame: &Frame,
    ) -> impl Future<Output = Result<Vec<Observation>, DetectionError>> + Send;
}
