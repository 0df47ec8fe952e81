use std::ffi::c_int;
use std::ops::{Deref, DerefMut};
use std::ptr;

use ffmpeg_next::{codec, ffi, format::context::Output};

use super::{
    avio::MemoryIo,
    encoder::{ENCODER_PIXEL, FfmpegEncoder, qscale_for_quality},
};
use crate::{
    buffer::ByteBufferSink,
    engine::ContainerMuxer,
    error::{EngineDiagnostic, Result, SnapError},
    frame::PictureFormat,
    packet::Packet,
};

/// Nominal encoder time base; a single still has no real timing.
const TIME_BASE: (i32, i32) = (1, 25);

/// Output context whose `pb` belongs to a [`MemoryIo`]. `Output`'s own drop closes `pb`, so
/// it is detached first.
struct CustomOutput(Output);

impl Drop for CustomOutput {
    fn drop(&mut self) {
        unsafe { (*self.0.as_mut_ptr()).pb = ptr::null_mut() };
    }
}

impl Deref for CustomOutput {
    type Target = Output;

    fn deref(&self) -> &Output {
        &self.0
    }
}

impl DerefMut for CustomOutput {
    fn deref_mut(&mut self) -> &mut Output {
        &mut self.0
    }
}

/// Single-image MJPEG container writing into a [`ByteBufferSink`].
pub struct FfmpegMuxer {
    // freed before the I/O context it writes through
    output: CustomOutput,
    io: MemoryIo<ByteBufferSink>,
    quality: Option<u8>,
    has_stream: bool,
}

impl FfmpegMuxer {
    pub fn open(sink: ByteBufferSink, io_buffer_size: usize, quality: Option<u8>) -> Result<Self> {
        let io = MemoryIo::writer(sink, io_buffer_size)?;

        let output = unsafe {
            let mut ptr = ptr::null_mut();
            let ret = ffi::avformat_alloc_output_context2(
                &mut ptr,
                ptr::null(),
                c"mjpeg".as_ptr(),
                ptr::null(),
            );
            if ret < 0 || ptr.is_null() {
                return Err(SnapError::Alloc("output context"));
            }
            (*ptr).pb = io.as_ptr();
            (*ptr).flags = (ffi::AVFMT_FLAG_CUSTOM_IO | ffi::AVFMT_FLAG_FLUSH_PACKETS) as c_int;
            CustomOutput(Output::wrap(ptr))
        };
        log::debug!("output context: {}", output.format().name());

        Ok(Self {
            output,
            io,
            quality,
            has_stream: false,
        })
    }

    /// Prefers the sink's own overflow record over the engine code it turned into.
    fn mux_error(&self, err: ffmpeg_next::Error) -> SnapError {
        match self.io.state().overflow() {
            Some(overflow) => SnapError::SinkOverflow(overflow),
            None => SnapError::Mux(EngineDiagnostic::from(err)),
        }
    }

    fn check_sink(&self) -> Result<()> {
        match self.io.state().overflow() {
            Some(overflow) => Err(SnapError::SinkOverflow(overflow)),
            None => Ok(()),
        }
    }
}

impl ContainerMuxer for FfmpegMuxer {
    type Encoder = FfmpegEncoder;

    fn add_stream(&mut self, format: &PictureFormat) -> Result<FfmpegEncoder> {
        if self.has_stream {
            return Err(SnapError::EncoderOpen(EngineDiagnostic::new(
                0,
                "container holds a single stream",
            )));
        }
        let codec_id: codec::Id = unsafe { (*(*self.output.as_ptr()).oformat).video_codec.into() };
        log::debug!("codec_id={:?}", codec_id);
        let codec = ffmpeg_next::encoder::find(codec_id)
            .ok_or_else(|| SnapError::EncoderNotFound(format!("{:?}", codec_id)))?;

        let mut stream = self
            .output
            .add_stream(codec)
            .map_err(|e| SnapError::EncoderOpen(e.into()))?;

        let mut encoder = codec::Context::new_with_codec(codec)
            .encoder()
            .video()
            .map_err(|e| SnapError::EncoderOpen(e.into()))?;
        encoder.set_width(format.width);
        encoder.set_height(format.height);
        encoder.set_format(ENCODER_PIXEL);
        encoder.set_time_base(TIME_BASE);
        if let Some(quality) = self.quality {
            let qscale = qscale_for_quality(quality);
            encoder.set_flags(codec::Flags::QSCALE);
            encoder.set_quality(qscale as usize * ffi::FF_QP2LAMBDA as usize);
            unsafe {
                (*encoder.as_mut_ptr()).qmin = qscale;
                (*encoder.as_mut_ptr()).qmax = qscale;
            }
        }

        let encoder = encoder
            .open_as(codec)
            .map_err(|e| SnapError::EncoderOpen(e.into()))?;
        stream.set_parameters(&encoder);
        stream.set_time_base(TIME_BASE);
        self.has_stream = true;
        log::debug!(
            "encoder {} opened: {}x{}, quality: {:?}",
            codec.name(),
            format.width,
            format.height,
            self.quality
        );

        Ok(FfmpegEncoder::new(encoder, *format))
    }

    fn write_header(&mut self) -> Result<()> {
        self.output.write_header().map_err(|e| self.mux_error(e))
    }

    fn write_packet(&mut self, packet: &Packet) -> Result<()> {
        let mut out = ffmpeg_next::Packet::from(packet);
        out.set_stream(0);
        out.set_position(-1);
        out.write(&mut self.output).map_err(|e| self.mux_error(e))?;
        self.check_sink()
    }

    fn flush(&mut self) -> Result<()> {
        self.io.flush();
        self.check_sink()
    }

    fn write_trailer(&mut self) -> Result<()> {
        self.output.write_trailer().map_err(|e| self.mux_error(e))?;
        self.io.flush();
        self.check_sink()
    }

    fn into_sink(self) -> ByteBufferSink {
        let FfmpegMuxer { output, io, .. } = self;
        drop(output);
        io.into_state()
    }
}
