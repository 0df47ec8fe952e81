//! The whole conversion: file in, one decoded picture, JPEG out.

use std::path::Path;

use bytes::Bytes;

use crate::{
    buffer::ByteBufferSource,
    config::SnapConfig,
    decode::DecodeStage,
    encode::EncodeStage,
    engine::{DecodeEngine, EncodeEngine},
    error::{Result, SnapError},
    file,
    jpeg::JpegInfo,
};

/// One decode engine, one encode engine and the limits they run under.
///
/// Every call builds and tears down its own engine session, so a `Snapshot` can be shared by
/// reference across threads when both engines allow it.
#[derive(Debug, Clone)]
pub struct Snapshot<D, E> {
    decode_engine: D,
    encode_engine: E,
    config: SnapConfig,
}

impl<D: DecodeEngine, E: EncodeEngine> Snapshot<D, E> {
    pub fn new(decode_engine: D, encode_engine: E, config: SnapConfig) -> Self {
        Self {
            decode_engine,
            encode_engine,
            config,
        }
    }

    pub fn config(&self) -> &SnapConfig {
        &self.config
    }

    /// Decodes the first picture of `input` and returns it as a complete JPEG.
    pub fn convert_bytes(&self, input: impl Into<Bytes>) -> Result<Bytes> {
        self.convert_checked(input.into()).map(|(jpeg, _)| jpeg)
    }

    fn convert_checked(&self, input: Bytes) -> Result<(Bytes, JpegInfo)> {
        if input.is_empty() {
            return Err(SnapError::EmptyInput("memory buffer".to_string()));
        }

        let picture = DecodeStage::new(&self.decode_engine, &self.config)
            .run(ByteBufferSource::new(input))?;
        let jpeg = EncodeStage::new(&self.encode_engine, self.config.max_output_bytes)
            .run(picture)?;
        let info = JpegInfo::parse(&jpeg)?;
        Ok((jpeg, info))
    }

    /// Converts the file at `input` and writes the JPEG to `output`.
    ///
    /// `output` is only replaced once a complete JPEG exists; on error it is left as it was.
    pub fn convert_file(&self, input: &Path, output: &Path) -> Result<JpegInfo> {
        file::validate_paths(input, output)?;
        file::validate_source_extension(input)?;
        let data = file::load_input(input, self.config.max_input_bytes)?;

        let (jpeg, info) = self.convert_checked(data)?;
        file::persist_output(output, &jpeg)?;
        log::info!(
            "{} -> {}: {}x{}, {}B",
            input.display(),
            output.display(),
            info.width,
            info.height,
            info.len
        );
        Ok(info)
    }
}

#[cfg(feature = "ffmpeg")]
pub type FfmpegSnapshot = Snapshot<crate::ffmpeg::FfmpegEngine, crate::ffmpeg::FfmpegEngine>;

#[cfg(feature = "ffmpeg")]
impl FfmpegSnapshot {
    /// FFmpeg on both sides.
    pub fn with_ffmpeg(config: SnapConfig) -> Self {
        let engine = crate::ffmpeg::FfmpegEngine::new(&config);
        Snapshot::new(engine.clone(), engine, config)
    }
}

/// Converts the first frame of an H.264/H.265 file into a JPEG at `output`.
///
/// Returns `true` only when a complete JPEG was written. Failures are logged.
#[cfg(feature = "ffmpeg")]
pub fn decode_frame_to_image(input: impl AsRef<Path>, output: impl AsRef<Path>) -> bool {
    let (input, output) = (input.as_ref(), output.as_ref());
    if let Err(e) = crate::init() {
        log::error!("{:#}", e);
        return false;
    }
    match FfmpegSnapshot::with_ffmpeg(SnapConfig::default()).convert_file(input, output) {
        Ok(_) => true,
        Err(e) => {
            log::error!("convert {} failed: {}", input.display(), e);
            false
        }
    }
}

#[cfg(test)]
#[path = "pipeline_test.rs"]
mod pipeline_test;
