// src/types.rs

use serde::{Deserialize, Serialize};
use std::iter::Sum;
use std::ops::Add;
use std::sync::Arc;

// ============================================================================
// CONFIGURATION
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub gate: GateConfig,
    pub registration: RegistrationConfig,
    pub detection: DetectionConfig,
    pub frames: FramesConfig,
    pub pipeline: PipelineConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Number of translation samples kept (H)
    pub history_length: usize,
    /// L1 norm of the summed history below which the scene counts as stable
    pub stability_threshold: f64,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            history_length: 50,
            stability_threshold: 30.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrationConfig {
    pub blocks_x: usize,
    pub blocks_y: usize,
    /// Block size in pixels (square blocks)
    pub block_size: usize,
    /// Maximum displacement searched in each axis (±px)
    pub search_range: usize,
    /// Minimum fraction of blocks agreeing with the median displacement
    pub min_consensus: f32,
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            blocks_x: 4,
            blocks_y: 3,
            block_size: 16,
            search_range: 8,
            min_consensus: 0.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    pub server_url: String,
    pub min_observation_confidence: f64,
    pub min_label_confidence: f64,
    pub request_timeout_secs: u64,
    /// Safety net for a dispatch that never completes. None keeps a hung
    /// detector blocking new triggers indefinitely.
    pub timeout_ms: Option<u64>,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:3000/api/detect".to_string(),
            min_observation_confidence: 0.1,
            min_label_confidence: 0.3,
            request_timeout_secs: 30,
            timeout_ms: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FramesConfig {
    pub input_dir: String,
    pub output_dir: String,
    pub target_fps: u32,
}

impl Default for FramesConfig {
    fn default() -> Self {
        Self {
            input_dir: "frames".to_string(),
            output_dir: "output".to_string(),
            target_fps: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub frame_queue: usize,
    pub presentation_queue: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            frame_queue: 4,
            presentation_queue: 64,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "scene_gate=info".to_string(),
        }
    }
}

// ============================================================================
// MOTION
// ============================================================================

/// Estimated scene translation between two consecutive frames.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TranslationSample {
    pub dx: f64,
    pub dy: f64,
}

impl TranslationSample {
    pub const ZERO: Self = Self { dx: 0.0, dy: 0.0 };

    pub fn new(dx: f64, dy: f64) -> Self {
        Self { dx, dy }
    }

    pub fn l1_norm(&self) -> f64 {
        self.dx.abs() + self.dy.abs()
    }
}

impl Add for TranslationSample {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.dx + rhs.dx, self.dy + rhs.dy)
    }
}

impl Sum for TranslationSample {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a TranslationSample> for TranslationSample {
    fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

// ============================================================================
// DETECTIONS
// ============================================================================

/// Bounding box in normalized image coordinates, passed through as the
/// detector reports it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl NormalizedRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelCandidate {
    pub identifier: String,
    pub confidence: f64,
}

/// Raw detector output before filtering. Labels are ranked, best first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub confidence: f64,
    pub labels: Vec<LabelCandidate>,
    pub bounding_box: NormalizedRect,
}

/// A labeled box that is shown to the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub label: String,
    pub confidence: f64,
    pub bounding_box: NormalizedRect,
}

// ============================================================================
// FRAMES
// ============================================================================

/// Grayscale frame. Row-major storage: pixel at (x, y) = data[y * width + x]
#[derive(Clone, PartialEq)]
pub struct GrayFrame {
    pub data: Vec<u8>,
    pub width: usize,
    pub height: usize,
}

impl GrayFrame {
    pub fn new(data: Vec<u8>, width: usize, height: usize) -> Self {
        debug_assert_eq!(data.len(), width * height);
        Self {
            data,
            width,
            height,
        }
    }

    /// Convert from RGB packed bytes (3 bytes per pixel)
    pub fn from_rgb(rgb: &[u8], width: usize, height: usize) -> Self {
        let gray = rgb.chunks_exact(3).map(luma).collect();
        Self::new(gray, width, height)
    }
}

impl std::fmt::Debug for GrayFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GrayFrame")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

// ITU-R BT.601 luma
fn luma(pixel: &[u8]) -> u8 {
    (0.299 * pixel[0] as f32 + 0.587 * pixel[1] as f32 + 0.114 * pixel[2] as f32) as u8
}

#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub frame_id: u64,
    pub timestamp_ms: f64,
    pub image: GrayFrame,
}

impl Frame {
    pub fn new(frame_id: u64, timestamp_ms: f64, image: GrayFrame) -> Self {
        Self {
            frame_id,
            timestamp_ms,
            image,
        }
    }
}

/// Shared handle to a captured frame. The gate keeps one as its
/// registration baseline and the dispatcher holds one while detecting.
pub type FrameHandle = Arc<Frame>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translation_sum_and_norm() {
        let samples = [
            TranslationSample::new(1.5, -2.0),
            TranslationSample::new(-0.5, -1.0),
        ];
        let total: TranslationSample = samples.iter().sum();
        assert_eq!(total, TranslationSample::new(1.0, -3.0));
        assert_eq!(total.l1_norm(), 4.0);
    }

    #[test]
    fn test_gray_from_rgb() {
        let rgb = [255, 255, 255, 0, 0, 0];
        let gray = GrayFrame::from_rgb(&rgb, 2, 1);
        assert_eq!(gray.data.len(), 2);
        assert!(gray.data[0] >= 254);
        assert_eq!(gray.data[1], 0);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config = serde_yaml::from_str("gate:\n  history_length: 10\n").unwrap();
        assert_eq!(config.gate.history_length, 10);
        assert_eq!(config.gate.stability_threshold, 30.0);
        assert_eq!(config.detection.min_label_confidence, 0.3);
        assert!(config.detection.timeout_ms.is_none());
    }
}
