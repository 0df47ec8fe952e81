use std::path::Path;

use frame_snap::JpegInfo;

use crate::config::AppConfig;
#[cfg(feature = "ffmpeg")]
use crate::config::EncoderKind;

/// The configured conversion, FFmpeg decoding plus the chosen JPEG encoder.
#[derive(Clone)]
pub enum Converter {
    #[cfg(feature = "ffmpeg")]
    Ffmpeg(frame_snap::FfmpegSnapshot),
    #[cfg(feature = "ffmpeg")]
    Native(frame_snap::Snapshot<frame_snap::ffmpeg::FfmpegEngine, frame_snap::NativeJpegEngine>),
}

impl Converter {
    #[cfg(feature = "ffmpeg")]
    pub fn new(config: &AppConfig) -> anyhow::Result<Self> {
        frame_snap::init()?;
        let snap = config.snap_config();
        let converter = match config.encoder {
            EncoderKind::Ffmpeg => Converter::Ffmpeg(frame_snap::FfmpegSnapshot::with_ffmpeg(snap)),
            EncoderKind::Native => Converter::Native(frame_snap::Snapshot::new(
                frame_snap::ffmpeg::FfmpegEngine::new(&snap),
                frame_snap::NativeJpegEngine::new(&snap),
                snap,
            )),
        };
        log::debug!("encoder: {:?}", config.encoder);
        Ok(converter)
    }

    #[cfg(not(feature = "ffmpeg"))]
    pub fn new(config: &AppConfig) -> anyhow::Result<Self> {
        log::debug!("encoder: {:?}", config.encoder);
        anyhow::bail!("h26x-snap was built without the `ffmpeg` feature and cannot decode H.264/H.265")
    }

    #[cfg(feature = "ffmpeg")]
    pub fn convert_file(&self, input: &Path, output: &Path) -> frame_snap::Result<JpegInfo> {
        match self {
            Converter::Ffmpeg(snapshot) => snapshot.convert_file(input, output),
            Converter::Native(snapshot) => snapshot.convert_file(input, output),
        }
    }

    #[cfg(not(feature = "ffmpeg"))]
    pub fn convert_file(&self, input: &Path, output: &Path) -> frame_snap::Result<JpegInfo> {
        let _ = (input, output);
        match *self {}
    }
}
