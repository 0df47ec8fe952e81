use bytes::Bytes;
use ffmpeg_next::format::Pixel;

use super::scaler::Scaler;
use crate::{
    engine::FrameDecoder,
    error::{EngineDiagnostic, Result, SnapError},
    frame::{DecodedPicture, PixelFormat, Plane},
    packet::Packet,
    stream::StreamInfo,
};

/// Opened video decoder. Pictures in layouts the crate does not carry are converted to
/// YUV420P on the way out.
pub struct FfmpegDecoder {
    inner: ffmpeg_next::codec::decoder::Video,
    scaler: Option<Scaler>,
}

impl FfmpegDecoder {
    pub(crate) fn open(
        stream: &ffmpeg_next::format::stream::Stream<'_>,
        info: &StreamInfo,
    ) -> Result<Self> {
        let parameters = stream.parameters();
        let codec = ffmpeg_next::decoder::find(parameters.id())
            .ok_or_else(|| SnapError::DecoderNotFound(info.codec.to_string()))?;

        let mut decoder_ctx = ffmpeg_next::codec::Context::new_with_codec(codec);
        unsafe {
            (*decoder_ctx.as_mut_ptr()).time_base = stream.time_base().into();
        }
        decoder_ctx
            .set_parameters(parameters)
            .map_err(|e| SnapError::DecoderInit(e.into()))?;
        log::debug!("stream type: {:?}", decoder_ctx.medium());

        let video_decoder = decoder_ctx
            .decoder()
            .open_as(codec)
            .and_then(|opened| opened.video())
            .map_err(|e| SnapError::DecoderOpen(e.into()))?;
        log::debug!(
            "decoder {} opened: {}x{}, format: {:?}",
            codec.name(),
            video_decoder.width(),
            video_decoder.height(),
            video_decoder.format()
        );

        Ok(Self {
            inner: video_decoder,
            scaler: None,
        })
    }

    fn to_picture(&mut self, frame: ffmpeg_next::frame::Video) -> Result<DecodedPicture> {
        log::debug!(
            "frame format: {:?}, key: {}, kind: {:?}, pts: {:?}",
            frame.format(),
            frame.is_key(),
            frame.kind(),
            frame.pts()
        );
        let (frame, format) = match PixelFormat::from_pixel(frame.format()) {
            Some(format) => (frame, format),
            None => {
                let mut scaler = match self.scaler.take() {
                    Some(scaler) => scaler,
                    None => Scaler::new(&frame, Pixel::YUV420P)
                        .map_err(|e| SnapError::Decode(e.into()))?,
                };
                let converted = scaler.convert(&frame);
                self.scaler = Some(scaler);
                (
                    converted.map_err(|e| SnapError::Decode(e.into()))?,
                    PixelFormat::Yuv420p,
                )
            }
        };

        let planes = (0..format.planes())
            .map(|i| Plane::new(Bytes::copy_from_slice(frame.data(i)), frame.stride(i)))
            .collect();
        Ok(
            DecodedPicture::new(format, frame.width(), frame.height(), planes)?
                .with_key(frame.is_key())
                .with_pts(frame.pts()),
        )
    }
}

impl FrameDecoder for FfmpegDecoder {
    fn send_packet(&mut self, packet: &Packet) -> Result<()> {
        let packet = ffmpeg_next::Packet::from(packet);
        self.inner
            .send_packet(&packet)
            .map_err(|e| SnapError::Decode(e.into()))
    }

    fn send_eof(&mut self) -> Result<()> {
        self.inner
            .send_eof()
            .map_err(|e| SnapError::Decode(e.into()))
    }

    fn receive_picture(&mut self) -> Result<Option<DecodedPicture>> {
        let mut frame = ffmpeg_next::frame::Video::empty();
        match self.inner.receive_frame(&mut frame) {
            Ok(()) => self.to_picture(frame).map(Some),
            Err(ffmpeg_next::Error::Eof) => Ok(None),
            Err(ffmpeg_next::Error::Other { errno }) if errno == ffmpeg_next::util::error::EAGAIN => {
                Ok(None)
            }
            Err(err) => Err(SnapError::Decode(EngineDiagnostic::from(err))),
        }
    }
}
