//! Pure-Rust JPEG encode engine built on `jpeg-encoder`.
//!
//! The single-image JPEG container has no framing beyond the JPEG markers themselves, so the
//! muxer passes the encoded packet straight into the sink.

use jpeg_encoder::{ColorType, Encoder, EncodingError, SamplingFactor};

use crate::{
    buffer::ByteBufferSink,
    config::{DEFAULT_IO_BUFFER_SIZE, SnapConfig},
    engine::{ContainerMuxer, EncodeEngine, PictureEncoder},
    error::{EngineDiagnostic, Result, SnapError},
    frame::{DecodedPicture, PictureFormat, PixelFormat},
    packet::Packet,
};

pub const DEFAULT_JPEG_QUALITY: u8 = 90;

fn encode_error(err: EncodingError) -> SnapError {
    SnapError::Encode(EngineDiagnostic::new(0, err.to_string()))
}

/// Expands limited-range samples to 0..=255.
fn expand_luma(v: u8) -> u8 {
    ((v.saturating_sub(16) as u32 * 255 + 109) / 219).min(255) as u8
}

fn expand_chroma(v: u8) -> u8 {
    let c = (v as i32 - 128) * 255;
    let c = if c >= 0 { (c + 112) / 224 } else { (c - 112) / 224 };
    (c + 128).clamp(0, 255) as u8
}

fn sampling_factor(format: PixelFormat) -> SamplingFactor {
    match format.chroma_shift() {
        (1, 1) => SamplingFactor::R_4_2_0,
        (1, 0) => SamplingFactor::R_4_2_2,
        _ => SamplingFactor::R_4_4_4,
    }
}

/// Interleaves the planes into full-resolution YCbCr, or plain luma for gray pictures.
fn interleave(picture: &DecodedPicture) -> (Vec<u8>, ColorType) {
    let format = picture.format();
    let (width, height) = (picture.width(), picture.height());
    let full_range = format.is_full_range();
    let luma = |v: u8| if full_range { v } else { expand_luma(v) };
    let chroma = |v: u8| if full_range { v } else { expand_chroma(v) };

    if format == PixelFormat::Gray8 {
        let mut out = Vec::with_capacity((width * height) as usize);
        for y in 0..height {
            out.extend(picture.row(0, y).iter().copied());
        }
        return (out, ColorType::Luma);
    }

    let (sx, sy) = format.chroma_shift();
    let mut out = Vec::with_capacity((width * height * 3) as usize);
    for y in 0..height {
        let y_row = picture.row(0, y);
        let cb_row = picture.row(1, y >> sy);
        let cr_row = picture.row(2, y >> sy);
        for x in 0..width as usize {
            out.push(luma(y_row[x]));
            out.push(chroma(cb_row[x >> sx]));
            out.push(chroma(cr_row[x >> sx]));
        }
    }
    (out, ColorType::Ycbcr)
}

#[derive(Debug, Clone)]
pub struct NativeJpegEngine {
    quality: u8,
    io_buffer_size: usize,
}

impl Default for NativeJpegEngine {
    fn default() -> Self {
        Self {
            quality: DEFAULT_JPEG_QUALITY,
            io_buffer_size: DEFAULT_IO_BUFFER_SIZE,
        }
    }
}

impl NativeJpegEngine {
    pub fn new(config: &SnapConfig) -> Self {
        Self {
            quality: config.jpeg_quality.unwrap_or(DEFAULT_JPEG_QUALITY).clamp(1, 100),
            io_buffer_size: config.io_buffer_size.max(1),
        }
    }
}

impl EncodeEngine for NativeJpegEngine {
    type Muxer = NativeMuxer;

    fn open_container(&self, sink: ByteBufferSink) -> Result<NativeMuxer> {
        Ok(NativeMuxer {
            sink,
            quality: self.quality,
            chunk: self.io_buffer_size,
            stream: None,
        })
    }
}

pub struct NativeMuxer {
    sink: ByteBufferSink,
    quality: u8,
    chunk: usize,
    stream: Option<PictureFormat>,
}

impl ContainerMuxer for NativeMuxer {
    type Encoder = NativeEncoder;

    fn add_stream(&mut self, format: &PictureFormat) -> Result<NativeEncoder> {
        if self.stream.is_some() {
            return Err(SnapError::EncoderOpen(EngineDiagnostic::new(
                0,
                "container holds a single stream",
            )));
        }
        if format.width > u16::MAX as u32 || format.height > u16::MAX as u32 {
            return Err(SnapError::EncoderOpen(EngineDiagnostic::new(
                0,
                format!("{}x{} exceeds the JPEG size limit", format.width, format.height),
            )));
        }
        self.stream = Some(*format);
        log::debug!(
            "jpeg stream: {:?} {}x{}, quality: {}",
            format.format,
            format.width,
            format.height,
            self.quality
        );
        Ok(NativeEncoder {
            format: *format,
            quality: self.quality,
            pending: None,
        })
    }

    fn write_header(&mut self) -> Result<()> {
        if self.stream.is_none() {
            return Err(SnapError::Mux(EngineDiagnostic::new(0, "no stream added")));
        }
        Ok(())
    }

    fn write_packet(&mut self, packet: &Packet) -> Result<()> {
        for chunk in packet.data().chunks(self.chunk) {
            self.sink.write(chunk)?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn write_trailer(&mut self) -> Result<()> {
        Ok(())
    }

    fn into_sink(self) -> ByteBufferSink {
        self.sink
    }
}

pub struct NativeEncoder {
    format: PictureFormat,
    quality: u8,
    pending: Option<Packet>,
}

impl PictureEncoder for NativeEncoder {
    fn send_picture(&mut self, picture: &DecodedPicture) -> Result<()> {
        if picture.picture_format() != self.format {
            return Err(SnapError::InvalidPicture(format!(
                "picture {:?} {}x{} does not match the stream",
                picture.format(),
                picture.width(),
                picture.height()
            )));
        }
        let (samples, color) = interleave(picture);
        let mut out = Vec::new();
        let mut encoder = Encoder::new(&mut out, self.quality);
        if color == ColorType::Ycbcr {
            encoder.set_sampling_factor(sampling_factor(picture.format()));
        }
        encoder
            .encode(
                &samples,
                picture.width() as u16,
                picture.height() as u16,
                color,
            )
            .map_err(encode_error)?;

        self.pending = Some(
            Packet::new(0, out)
                .with_timestamps(Some(0), Some(0))
                .with_key(true),
        );
        Ok(())
    }

    fn receive_packet(&mut self) -> Result<Option<Packet>> {
        Ok(self.pending.take())
    }
}
