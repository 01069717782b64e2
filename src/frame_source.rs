// src/frame_source.rs

use crate::types::{Frame, FrameHandle, FramesConfig, GrayFrame};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};
use walkdir::WalkDir;

const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "bmp", "pgm"];

/// An ordered sequence of still images replayed as a camera feed.
pub struct FrameSource {
    paths: Vec<PathBuf>,
    target_fps: u32,
}

impl FrameSource {
    pub fn open(config: &FramesConfig) -> Result<Self> {
        let mut paths = Vec::new();

        for entry in WalkDir::new(&config.input_dir)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            let is_image = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                .unwrap_or(false);
            if is_image {
                paths.push(path.to_path_buf());
            }
        }
        paths.sort();

        info!(
            "Found {} frame image(s) in {}",
            paths.len(),
            config.input_dir
        );

        Ok(Self {
            paths,
            target_fps: config.target_fps.max(1),
        })
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.target_fps as f64)
    }

    pub fn load_frame(path: &Path, frame_id: u64, timestamp_ms: f64) -> Result<Frame> {
        let image = image::open(path)
            .with_context(|| format!("Failed to decode frame {}", path.display()))?
            .to_luma8();
        let (width, height) = image.dimensions();
        let gray = GrayFrame::new(image.into_raw(), width as usize, height as usize);
        Ok(Frame::new(frame_id, timestamp_ms, gray))
    }

    /// Send every frame at the target rate. Unreadable images are skipped.
    /// Stops early if the receiver goes away. Returns the number sent.
    pub async fn feed(self, frames: mpsc::Sender<FrameHandle>) -> Result<u64> {
        let interval_ms = 1000.0 / self.target_fps as f64;
        let mut ticker = tokio::time::interval(self.frame_interval());
        let mut sent = 0u64;

        for (idx, path) in self.paths.iter().enumerate() {
            ticker.tick().await;

            let frame = match Self::load_frame(path, idx as u64, idx as f64 * interval_ms) {
                Ok(frame) => frame,
                Err(e) => {
                    warn!("Skipping frame: {:#}", e);
                    continue;
                }
            };

            if frames.send(Arc::new(frame)).await.is_err() {
                warn!("Frame receiver closed after {} frames", sent);
                break;
            }
            sent += 1;
        }

        info!("✓ Frame source exhausted ({} frames sent)", sent);
        Ok(sent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    fn write_image(dir: &Path, name: &str, value: u8) {
        let img = GrayImage::from_pixel(8, 6, Luma([value]));
        img.save(dir.join(name)).unwrap();
    }

    fn frames_config(dir: &Path) -> FramesConfig {
        FramesConfig {
            input_dir: dir.to_string_lossy().to_string(),
            target_fps: 1000,
            ..Default::default()
        }
    }

    #[test]
    fn test_finds_images_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        write_image(dir.path(), "frame_002.png", 20);
        write_image(dir.path(), "frame_001.png", 10);
        std::fs::write(dir.path().join("notes.txt"), "not a frame").unwrap();

        let source = FrameSource::open(&frames_config(dir.path())).unwrap();
        assert_eq!(source.len(), 2);
        assert!(source.paths[0].ends_with("frame_001.png"));
    }

    #[test]
    fn test_load_frame_converts_to_gray() {
        let dir = tempfile::tempdir().unwrap();
        write_image(dir.path(), "a.png", 77);

        let frame = FrameSource::load_frame(&dir.path().join("a.png"), 3, 100.0).unwrap();
        assert_eq!(frame.frame_id, 3);
        assert_eq!((frame.image.width, frame.image.height), (8, 6));
        assert!(frame.image.data.iter().all(|&p| p == 77));
    }

    #[tokio::test]
    async fn test_feed_sends_frames_in_order() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..3 {
            write_image(dir.path(), &format!("f{}.png", i), i * 10);
        }
        std::fs::write(dir.path().join("f9.png"), b"garbage").unwrap();

        let source = FrameSource::open(&frames_config(dir.path())).unwrap();
        let (tx, mut rx) = mpsc::channel(8);
        let sent = source.feed(tx).await.unwrap();
        assert_eq!(sent, 3);

        let mut values = Vec::new();
        while let Some(frame) = rx.recv().await {
            values.push(frame.image.data[0]);
        }
        assert_eq!(values, vec![0, 10, 20]);
    }
}
