/// Registers FFmpeg components and keeps its own logging to errors. Call once at startup.
#[cfg(feature = "ffmpeg")]
pub fn init() -> anyhow::Result<()> {
    ffmpeg_next::init().map_err(|e| anyhow::anyhow!("ffmpeg_next init: {}", e))?;
    ffmpeg_next::util::log::set_level(ffmpeg_next::util::log::Level::Error);
    Ok(())
}

pub mod buffer;
pub mod config;
pub mod decode;
pub mod encode;
pub mod engine;
pub mod error;
#[cfg(feature = "ffmpeg")]
pub mod ffmpeg;
pub mod file;
pub mod frame;
pub mod jpeg;
pub mod native;
pub mod packet;
pub mod pipeline;
pub mod state;
pub mod stream;
#[cfg(test)]
pub(crate) mod testing;

pub use buffer::{ByteBufferSink, ByteBufferSource};
pub use config::{PacketPolicy, SnapConfig};
pub use error::{ErrorKind, Result, SnapError};
pub use frame::{DecodedPicture, PixelFormat};
pub use jpeg::JpegInfo;
pub use native::NativeJpegEngine;
pub use pipeline::Snapshot;
#[cfg(feature = "ffmpeg")]
pub use pipeline::{FfmpegSnapshot, decode_frame_to_image};
