// src/detection/remote.rs
//
// Detection served by a remote model. The frame is JPEG-encoded, sent
// as base64 in a JSON request, and the server answers with raw
// observations that the dispatcher filters.

use super::{DetectionError, ObjectDetector};
use crate::types::{DetectionConfig, Frame, GrayFrame, Observation};
use anyhow::{Context, Result};
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Serialize)]
pub struct DetectionRequest {
    /// Unique request ID for correlation
    pub request_id: String,
    pub frame_id: u64,
    pub timestamp_ms: f64,
    pub width: usize,
    pub height: usize,
    /// Base64-encoded grayscale JPEG
    pub image_base64: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DetectionResponse {
    #[serde(default)]
    pub request_id: Option<String>,
    #[serde(default)]
    pub observations: Vec<Observation>,
}

pub struct RemoteDetector {
    server_url: String,
    http_client: reqwest::Client,
}

impl RemoteDetector {
    pub fn new(config: &DetectionConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        info!("✓ Remote detector targeting {}", config.server_url);

        Ok(Self {
            server_url: config.server_url.clone(),
            http_client,
        })
    }

    pub fn build_request(frame: &Frame) -> Result<DetectionRequest, DetectionError> {
        let jpeg = encode_gray_to_jpeg(&frame.image)?;
        Ok(DetectionRequest {
            request_id: uuid::Uuid::new_v4().to_string(),
            frame_id: frame.frame_id,
            timestamp_ms: frame.timestamp_ms,
            width: frame.image.width,
            height: frame.image.height,
            image_base64: base64::engine::general_purpose::STANDARD.encode(jpeg),
        })
    }
}

impl ObjectDetector for RemoteDetector {
    async fn detect(&self, frame: &Frame) -> Result<Vec<Observation>, DetectionError> {
        let request = Self::build_request(frame)?;
        debug!(
            "Sending detection request {} for frame {}",
            request.request_id, request.frame_id
        );

        let response = self
            .http_client
            .post(&self.server_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| DetectionError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<no body>".to_string());
            return Err(DetectionError::Server {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: DetectionResponse = response
            .json()
            .await
            .map_err(|e| DetectionError::Decode(e.to_string()))?;

        debug!(
            "Detection response for frame {}: {} observation(s)",
            frame.frame_id,
            parsed.observations.len()
        );
        Ok(parsed.observations)
    }
}

/// Encode a grayscale frame as JPEG.
fn encode_gray_to_jpeg(frame: &GrayFrame) -> Result<Vec<u8>, DetectionError> {
    use image::GrayImage;

    let img = GrayImage::from_raw(frame.width as u32, frame.height as u32, frame.data.clone())
        .ok_or_else(|| DetectionError::Encode("buffer does not match frame size".to_string()))?;

    let mut buf = std::io::Cursor::new(Vec::new());
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buf, 80);
    img.write_with_encoder(encoder)
        .map_err(|e| DetectionError::Encode(e.to_string()))?;

    Ok(buf.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> Frame {
        let data = (0..64 * 48).map(|i| (i % 251) as u8).collect();
        Frame::new(7, 233.3, GrayFrame::new(data, 64, 48))
    }

    #[test]
    fn test_request_carries_jpeg_payload() {
        let request = RemoteDetector::build_request(&frame()).unwrap();
        assert_eq!(request.frame_id, 7);
        assert_eq!((request.width, request.height), (64, 48));

        let jpeg = base64::engine::general_purpose::STANDARD
            .decode(&request.image_base64)
            .unwrap();
        // JPEG SOI marker
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn test_mismatched_buffer_fails_to_encode() {
        let bad = GrayFrame {
            data: vec![0; 10],
            width: 64,
            height: 48,
        };
        assert!(matches!(
            encode_gray_to_jpeg(&bad),
            Err(DetectionError::Encode(_))
        ));
    }

    #[test]
    fn test_parses_server_response() {
        let body = r#"{
            "request_id": "abc",
            "observations": [{
                "confidence": 0.92,
                "labels": [{"identifier": "50_cent", "confidence": 0.81}],
                "bounding_box": {"x": 0.1, "y": 0.2, "width": 0.3, "height": 0.25}
            }]
        }"#;
        let parsed: DetectionResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.observations.len(), 1);
        assert_eq!(parsed.observations[0].labels[0].identifier, "50_cent");
        assert_eq!(parsed.observations[0].bounding_box.height, 0.25);
    }

    #[test]
    fn test_missing_observations_means_none() {
        let parsed: DetectionResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.observations.is_empty());
    }
}
