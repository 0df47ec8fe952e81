//! The codec engine seen as a set of capabilities.
//!
//! The stages in [`crate::decode`] and [`crate::encode`] drive these traits; an engine only
//! supplies the primitives. Every handle an engine returns releases its native resources in
//! `Drop`, so the stages get reverse-order release by declaring handles in acquisition order.

use crate::{
    buffer::{ByteBufferSink, ByteBufferSource},
    error::Result,
    frame::{DecodedPicture, PictureFormat},
    packet::Packet,
    stream::StreamInfo,
};

/// Container parsing plus decoder lookup.
pub trait DecodeEngine {
    type Demuxer: Demuxer;

    /// Opens a format context over `source` and probes its streams.
    ///
    /// Fails with `DemuxOpen` or `StreamProbe`.
    fn open_demux(&self, source: ByteBufferSource) -> Result<Self::Demuxer>;
}

/// An opened, probed input.
pub trait Demuxer {
    type Decoder: FrameDecoder;

    /// Picks the best video stream. Fails with `NoStream`.
    fn find_stream(&mut self) -> Result<StreamInfo>;

    /// Resolves, configures and opens a decoder for `stream`.
    ///
    /// Fails with `DecoderNotFound`, `DecoderInit` or `DecoderOpen`.
    fn open_decoder(&mut self, stream: &StreamInfo) -> Result<Self::Decoder>;

    /// Next packet of any stream; `None` at end of input.
    fn read_packet(&mut self) -> Result<Option<Packet>>;
}

/// Send/receive decoding.
pub trait FrameDecoder {
    fn send_packet(&mut self, packet: &Packet) -> Result<()>;

    fn send_eof(&mut self) -> Result<()>;

    /// `None` when the decoder needs more input or is drained.
    fn receive_picture(&mut self) -> Result<Option<DecodedPicture>>;
}

/// Single-image JPEG container output.
pub trait EncodeEngine {
    type Muxer: ContainerMuxer;

    /// Allocates the output context bound to `sink`.
    fn open_container(&self, sink: ByteBufferSink) -> Result<Self::Muxer>;
}

pub trait ContainerMuxer {
    type Encoder: PictureEncoder;

    /// Adds the one output stream for `format` and opens the matching encoder.
    ///
    /// Fails with `EncoderNotFound` or `EncoderOpen`.
    fn add_stream(&mut self, format: &PictureFormat) -> Result<Self::Encoder>;

    fn write_header(&mut self) -> Result<()>;

    fn write_packet(&mut self, packet: &Packet) -> Result<()>;

    /// Forces buffered bytes through to the sink.
    fn flush(&mut self) -> Result<()>;

    fn write_trailer(&mut self) -> Result<()>;

    /// Releases the container and hands back the sink with everything written so far.
    fn into_sink(self) -> ByteBufferSink;
}

/// Send/receive encoding.
pub trait PictureEncoder {
    fn send_picture(&mut self, picture: &DecodedPicture) -> Result<()>;

    /// `None` when the encoder has nothing to return yet.
    fn receive_packet(&mut self) -> Result<Option<Packet>>;
}
