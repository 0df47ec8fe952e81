use std::path::Path;

use anyhow::Context;
use frame_snap::{PacketPolicy, SnapConfig, config};
use serde::{Deserialize, Serialize};

/// Which engine writes the JPEG. Decoding always goes through FFmpeg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum EncoderKind {
    #[default]
    Ffmpeg,
    Native,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PacketPolicyName {
    FirstPacketOnly,
    #[default]
    SkipToVideo,
}

impl From<PacketPolicyName> for PacketPolicy {
    fn from(name: PacketPolicyName) -> Self {
        match name {
            PacketPolicyName::FirstPacketOnly => PacketPolicy::FirstPacketOnly,
            PacketPolicyName::SkipToVideo => PacketPolicy::SkipToVideo,
        }
    }
}

/// Settings file, e.g.
///
/// ```json
/// { "max_input_bytes": 2097152, "jpeg_quality": 85, "encoder": "native", "jobs": 8 }
/// ```
///
/// Missing keys keep their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub max_input_bytes: usize,
    pub max_output_bytes: usize,
    pub io_buffer_size: usize,
    pub packet_policy: PacketPolicyName,
    pub flush_on_empty: bool,
    pub jpeg_quality: Option<u8>,
    pub encoder: EncoderKind,
    pub jobs: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            max_input_bytes: config::DEFAULT_BUFFER_CAP,
            max_output_bytes: config::DEFAULT_BUFFER_CAP,
            io_buffer_size: config::DEFAULT_IO_BUFFER_SIZE,
            packet_policy: PacketPolicyName::default(),
            flush_on_empty: true,
            jpeg_quality: None,
            encoder: EncoderKind::default(),
            jobs: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
        }
    }
}

impl AppConfig {
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("parse config {}", path.display()))?;
        log::debug!("loaded config from {}: {:?}", path.display(), config);
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if let Some(quality) = self.jpeg_quality {
            anyhow::ensure!(
                (1..=100).contains(&quality),
                "jpeg_quality must be within 1..=100, got {}",
                quality
            );
        }
        anyhow::ensure!(self.max_input_bytes > 0, "max_input_bytes must be positive");
        anyhow::ensure!(self.max_output_bytes > 0, "max_output_bytes must be positive");
        anyhow::ensure!(self.io_buffer_size > 0, "io_buffer_size must be positive");
        anyhow::ensure!(
            self.io_buffer_size <= i32::MAX as usize,
            "io_buffer_size {} is too large",
            self.io_buffer_size
        );
        anyhow::ensure!(self.jobs > 0, "jobs must be positive");
        Ok(())
    }

    pub fn snap_config(&self) -> SnapConfig {
        SnapConfig {
            max_input_bytes: self.max_input_bytes,
            max_output_bytes: self.max_output_bytes,
            io_buffer_size: self.io_buffer_size,
            packet_policy: self.packet_policy.into(),
            flush_on_empty: self.flush_on_empty,
            jpeg_quality: self.jpeg_quality,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("snap.json");
        std::fs::write(
            &path,
            r#"{ "jpeg_quality": 80, "packet_policy": "first_packet_only", "encoder": "native" }"#,
        )?;

        let config = AppConfig::load(Some(&path))?;
        config.validate()?;
        assert_eq!(config.jpeg_quality, Some(80));
        assert_eq!(config.encoder, EncoderKind::Native);
        assert_eq!(config.max_input_bytes, config::DEFAULT_BUFFER_CAP);

        let snap = config.snap_config();
        assert_eq!(snap.packet_policy, PacketPolicy::FirstPacketOnly);
        assert!(snap.flush_on_empty);
        Ok(())
    }

    #[test]
    fn test_no_file_is_default() -> anyhow::Result<()> {
        assert_eq!(AppConfig::load(None)?, AppConfig::default());
        Ok(())
    }

    #[test]
    fn test_rejects_unknown_keys_and_bad_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snap.json");
        std::fs::write(&path, r#"{ "quality": 80 }"#).unwrap();
        assert!(AppConfig::load(Some(&path)).is_err());

        let config = AppConfig {
            jpeg_quality: Some(0),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = AppConfig {
            jobs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
