use ffmpeg_next::format::Pixel;
use ffmpeg_next::frame::Video;
use ffmpeg_next::software::scaling;

/// Pixel format conversion at the source size.
pub struct Scaler {
    context: scaling::Context,
}

impl Scaler {
    pub fn new(source: &Video, format: Pixel) -> Result<Self, ffmpeg_next::Error> {
        log::debug!(
            "scaler: {:?} -> {:?} at {}x{}",
            source.format(),
            format,
            source.width(),
            source.height()
        );
        let context = scaling::Context::get(
            source.format(),
            source.width(),
            source.height(),
            format,
            source.width(),
            source.height(),
            scaling::Flags::BILINEAR,
        )?;
        Ok(Self { context })
    }

    pub fn convert(&mut self, frame: &Video) -> Result<Video, ffmpeg_next::Error> {
        let mut converted = Video::empty();
        self.context.run(frame, &mut converted)?;
        converted.set_pts(frame.pts());
        Ok(converted)
    }
}

unsafe impl Send for Scaler {}
