use crate::types::Config;
use anyhow::{bail, Context, Result};
use std::fs;

const DETECTOR_URL_ENV: &str = "SCENE_GATE_DETECTOR_URL";

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let contents =
            fs::read_to_string(path).with_context(|| format!("Failed to read config {}", path))?;
        let mut config: Config = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse config {}", path))?;

        if let Ok(url) = std::env::var(DETECTOR_URL_ENV) {
            config.detection.server_url = url;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.gate.history_length == 0 {
            bail!("gate.history_length must be at least 1");
        }
        let threshold = self.gate.stability_threshold;
        if !threshold.is_finite() || threshold < 0.0 {
            bail!(
                "gate.stability_threshold must be a non-negative number, got {}",
                threshold
            );
        }

        for (name, value) in [
            (
                "detection.min_observation_confidence",
                self.detection.min_observation_confidence,
            ),
            (
                "detection.min_label_confidence",
                self.detection.min_label_confidence,
            ),
        ] {
            if !(0.0..=1.0).contains(&value) {
                bail!("{} must be within [0, 1], got {}", name, value);
            }
        }

        let reg = &self.registration;
        if reg.block_size == 0 || reg.blocks_x == 0 || reg.blocks_y == 0 {
            bail!("registration block grid and block_size must be non-zero");
        }
        if !(0.0..=1.0).contains(&reg.min_consensus) {
            bail!(
                "registration.min_consensus must be within [0, 1], got {}",
                reg.min_consensus
            );
        }

        if self.frames.target_fps == 0 {
            bail!("frames.target_fps must be at least 1");
        }
        if self.pipeline.frame_queue == 0 || self.pipeline.presentation_queue == 0 {
            bail!("pipeline queue sizes must be at least 1");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_empty_history() {
        let mut config = Config::default();
        config.gate.history_length = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_out_of_range_confidence() {
        let mut config = Config::default();
        config.detection.min_label_confidence = 1.5;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.gate.stability_threshold = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_yaml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "gate:\n  history_length: 20\n  stability_threshold: 12.5\ndetection:\n  timeout_ms: 2500"
        )
        .unwrap();

        let config = Config::load(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.gate.history_length, 20);
        assert_eq!(config.gate.stability_threshold, 12.5);
        assert_eq!(config.detection.timeout_ms, Some(2500));
        assert_eq!(config.frames.target_fps, 30);
    }
}
