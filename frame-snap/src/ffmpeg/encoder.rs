use ffmpeg_next::{format::Pixel, frame::Video, picture};

use super::scaler::Scaler;
use crate::{
    engine::PictureEncoder,
    error::{EngineDiagnostic, Result, SnapError},
    frame::{DecodedPicture, PictureFormat},
    packet::Packet,
};

/// Pixel format the MJPEG encoder is opened with.
pub(crate) const ENCODER_PIXEL: Pixel = Pixel::YUVJ420P;

/// Maps JPEG quality 1..=100 onto the MJPEG quantizer scale 31..=2.
pub(crate) fn qscale_for_quality(quality: u8) -> i32 {
    let quality = quality.clamp(1, 100) as i32;
    2 + (100 - quality) * 29 / 99
}

pub struct FfmpegEncoder {
    inner: ffmpeg_next::codec::encoder::Video,
    format: PictureFormat,
    scaler: Option<Scaler>,
}

impl FfmpegEncoder {
    pub(crate) fn new(inner: ffmpeg_next::codec::encoder::Video, format: PictureFormat) -> Self {
        Self {
            inner,
            format,
            scaler: None,
        }
    }

    /// Copies the planes into a frame owned by FFmpeg.
    fn to_frame(picture: &DecodedPicture) -> Video {
        let format = picture.format();
        let mut frame = Video::new(format.to_pixel(), picture.width(), picture.height());
        for plane in 0..format.planes() {
            let (_, rows) = format.plane_size(plane, picture.width(), picture.height());
            let stride = frame.stride(plane);
            let dst = frame.data_mut(plane);
            for y in 0..rows {
                let row = picture.row(plane, y);
                let start = y as usize * stride;
                dst[start..start + row.len()].copy_from_slice(row);
            }
        }
        frame
    }
}

impl PictureEncoder for FfmpegEncoder {
    fn send_picture(&mut self, picture: &DecodedPicture) -> Result<()> {
        if picture.picture_format() != self.format {
            return Err(SnapError::InvalidPicture(format!(
                "picture {:?} {}x{} does not match the stream",
                picture.format(),
                picture.width(),
                picture.height()
            )));
        }

        let mut frame = Self::to_frame(picture);
        if frame.format() != ENCODER_PIXEL {
            let mut scaler = match self.scaler.take() {
                Some(scaler) => scaler,
                None => Scaler::new(&frame, ENCODER_PIXEL).map_err(|e| SnapError::Encode(e.into()))?,
            };
            let converted = scaler.convert(&frame);
            self.scaler = Some(scaler);
            frame = converted.map_err(|e| SnapError::Encode(e.into()))?;
        }
        frame.set_pts(Some(0));
        frame.set_kind(picture::Type::I);

        self.inner
            .send_frame(&frame)
            .map_err(|e| SnapError::Encode(e.into()))
    }

    fn receive_packet(&mut self) -> Result<Option<Packet>> {
        let mut packet = ffmpeg_next::Packet::empty();
        match self.inner.receive_packet(&mut packet) {
            Ok(()) => Ok(Some(Packet::from(&packet))),
            Err(ffmpeg_next::Error::Other { errno }) if errno == ffmpeg_next::util::error::EAGAIN => {
                Ok(None)
            }
            Err(ffmpeg_next::Error::Eof) => Ok(None),
            Err(err) => Err(SnapError::Encode(EngineDiagnostic::from(err))),
        }
    }
}
