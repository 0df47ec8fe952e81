use std::fmt::{Display, Formatter};

/// Codec carried by a stream, as far as this crate cares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoCodec {
    H264,
    Hevc,
    Other(String),
}

impl Display for VideoCodec {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            VideoCodec::H264 => write!(f, "h264"),
            VideoCodec::Hevc => write!(f, "hevc"),
            VideoCodec::Other(name) => write!(f, "{}", name),
        }
    }
}

#[cfg(feature = "ffmpeg")]
impl From<ffmpeg_next::codec::Id> for VideoCodec {
    fn from(id: ffmpeg_next::codec::Id) -> Self {
        match id {
            ffmpeg_next::codec::Id::H264 => VideoCodec::H264,
            ffmpeg_next::codec::Id::HEVC => VideoCodec::Hevc,
            other => VideoCodec::Other(format!("{:?}", other).to_lowercase()),
        }
    }
}

/// The video stream picked for decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamInfo {
    pub index: usize,
    pub codec: VideoCodec,
    /// 0 when the container does not know it before decoding.
    pub width: u32,
    pub height: u32,
    /// (numerator, denominator)
    pub time_base: (i32, i32),
    pub rate: (i32, i32),
}

#[cfg(feature = "ffmpeg")]
impl From<&ffmpeg_next::format::stream::Stream<'_>> for StreamInfo {
    fn from(stream: &ffmpeg_next::format::stream::Stream<'_>) -> Self {
        let parameters = stream.parameters();
        let (width, height) = unsafe {
            let ptr = parameters.as_ptr() as *const ffmpeg_next::ffi::AVCodecParameters;
            ((*ptr).width.max(0) as u32, (*ptr).height.max(0) as u32)
        };
        let time_base = stream.time_base();
        let rate = stream.avg_frame_rate();
        Self {
            index: stream.index(),
            codec: VideoCodec::from(parameters.id()),
            width,
            height,
            time_base: (time_base.numerator(), time_base.denominator()),
            rate: (rate.numerator(), rate.denominator()),
        }
    }
}

impl Display for StreamInfo {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "stream index: {}, codec: {}, size: {}x{}, time_base: {}/{}, rate: {}/{}",
            self.index,
            self.codec,
            self.width,
            self.height,
            self.time_base.0,
            self.time_base.1,
            self.rate.0,
            self.rate.1
        )
    }
}
