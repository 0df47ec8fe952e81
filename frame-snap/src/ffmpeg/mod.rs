//! Codec engine backed by the system FFmpeg libraries through `ffmpeg-next`.

mod avio;
mod decoder;
mod encoder;
mod input;
mod output;
mod scaler;

pub use decoder::FfmpegDecoder;
pub use encoder::FfmpegEncoder;
pub use input::FfmpegDemuxer;
pub use output::FfmpegMuxer;

use crate::{
    buffer::{ByteBufferSink, ByteBufferSource},
    config::SnapConfig,
    engine::{DecodeEngine, EncodeEngine},
    error::Result,
};

/// Stateless handle; every open call builds a fresh FFmpeg session.
#[derive(Debug, Clone)]
pub struct FfmpegEngine {
    io_buffer_size: usize,
    jpeg_quality: Option<u8>,
}

impl FfmpegEngine {
    pub fn new(config: &SnapConfig) -> Self {
        Self {
            io_buffer_size: config.io_buffer_size,
            jpeg_quality: config.jpeg_quality,
        }
    }
}

impl Default for FfmpegEngine {
    fn default() -> Self {
        Self::new(&SnapConfig::default())
    }
}

impl DecodeEngine for FfmpegEngine {
    type Demuxer = FfmpegDemuxer;

    fn open_demux(&self, source: ByteBufferSource) -> Result<FfmpegDemuxer> {
        FfmpegDemuxer::open(source, self.io_buffer_size)
    }
}

impl EncodeEngine for FfmpegEngine {
    type Muxer = FfmpegMuxer;

    fn open_container(&self, sink: ByteBufferSink) -> Result<FfmpegMuxer> {
        FfmpegMuxer::open(sink, self.io_buffer_size, self.jpeg_quality)
    }
}
