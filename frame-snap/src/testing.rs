//! Scriptable in-memory engine for stage and pipeline tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::{
    buffer::{ByteBufferSink, ByteBufferSource},
    engine::{ContainerMuxer, DecodeEngine, Demuxer, EncodeEngine, FrameDecoder, PictureEncoder},
    error::{EngineDiagnostic, Result, SnapError},
    frame::{DecodedPicture, PictureFormat, PixelFormat, Plane},
    packet::Packet,
    stream::{StreamInfo, VideoCodec},
};

/// Counts live engine handles and records the order they were released in.
#[derive(Debug, Clone, Default)]
pub(crate) struct HandleLog {
    live: Arc<AtomicUsize>,
    released: Arc<Mutex<Vec<&'static str>>>,
}

impl HandleLog {
    pub(crate) fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    pub(crate) fn released(&self) -> Vec<&'static str> {
        self.released.lock().unwrap().clone()
    }

    fn acquire(&self, name: &'static str) -> Handle {
        self.live.fetch_add(1, Ordering::SeqCst);
        Handle {
            name,
            log: self.clone(),
        }
    }
}

#[derive(Debug)]
struct Handle {
    name: &'static str,
    log: HandleLog,
}

impl Drop for Handle {
    fn drop(&mut self) {
        self.log.live.fetch_sub(1, Ordering::SeqCst);
        self.log.released.lock().unwrap().push(self.name);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FailAt {
    OpenDemux,
    Probe,
    OpenDecoder,
    ReadPacket,
    SendPacket,
    OpenContainer,
    AddStream,
    WriteHeader,
    SendPicture,
    WriteTrailer,
}

/// When the mock decoder hands out its picture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Yield {
    OnPacket,
    OnEof,
    Never,
}

fn diagnostic(step: &str) -> EngineDiagnostic {
    EngineDiagnostic::new(-22, format!("mock failure at {}", step))
}

#[derive(Debug, Clone)]
pub(crate) struct MockEngine {
    pub(crate) handles: HandleLog,
    pub(crate) video_stream: Option<usize>,
    pub(crate) packets: Vec<Packet>,
    pub(crate) picture: DecodedPicture,
    pub(crate) yield_on: Yield,
    pub(crate) fail_at: Option<FailAt>,
    pub(crate) emit_packet: bool,
    /// Ignore sink errors in `write_packet`, like an engine that drops callback codes.
    pub(crate) swallow_overflow: bool,
}

impl Default for MockEngine {
    fn default() -> Self {
        Self {
            handles: HandleLog::default(),
            video_stream: Some(0),
            packets: vec![Packet::new(0, vec![0, 0, 0, 1, 0x65, 0x88]).with_key(true)],
            picture: test_picture(64, 64),
            yield_on: Yield::OnPacket,
            fail_at: None,
            emit_packet: true,
            swallow_overflow: false,
        }
    }
}

impl MockEngine {
    pub(crate) fn failing_at(fail_at: FailAt) -> Self {
        Self {
            fail_at: Some(fail_at),
            ..Default::default()
        }
    }

    fn fails(&self, at: FailAt) -> bool {
        self.fail_at == Some(at)
    }
}

pub(crate) struct MockDemuxer {
    _format: Handle,
    _io: Handle,
    _source: ByteBufferSource,
    engine: MockEngine,
    packets: VecDeque<Packet>,
}

impl DecodeEngine for MockEngine {
    type Demuxer = MockDemuxer;

    fn open_demux(&self, source: ByteBufferSource) -> Result<MockDemuxer> {
        let io = self.handles.acquire("io");
        if self.fails(FailAt::OpenDemux) || source.is_empty() {
            return Err(SnapError::DemuxOpen(diagnostic("open demux")));
        }
        let format = self.handles.acquire("format");
        if self.fails(FailAt::Probe) {
            return Err(SnapError::StreamProbe(diagnostic("probe")));
        }
        Ok(MockDemuxer {
            _format: format,
            _io: io,
            _source: source,
            engine: self.clone(),
            packets: self.packets.iter().cloned().collect(),
        })
    }
}

impl Demuxer for MockDemuxer {
    type Decoder = MockDecoder;

    fn find_stream(&mut self) -> Result<StreamInfo> {
        let index = self.engine.video_stream.ok_or(SnapError::NoStream)?;
        Ok(StreamInfo {
            index,
            codec: VideoCodec::H264,
            width: self.engine.picture.width(),
            height: self.engine.picture.height(),
            time_base: (1, 1_200_000),
            rate: (25, 1),
        })
    }

    fn open_decoder(&mut self, _stream: &StreamInfo) -> Result<MockDecoder> {
        let handle = self.engine.handles.acquire("decoder");
        if self.engine.fails(FailAt::OpenDecoder) {
            return Err(SnapError::DecoderOpen(diagnostic("open decoder")));
        }
        Ok(MockDecoder {
            _handle: handle,
            engine: self.engine.clone(),
            pending: None,
            fed: false,
        })
    }

    fn read_packet(&mut self) -> Result<Option<Packet>> {
        if self.engine.fails(FailAt::ReadPacket) {
            return Err(SnapError::ReadPacket(diagnostic("read packet")));
        }
        Ok(self.packets.pop_front())
    }
}

pub(crate) struct MockDecoder {
    _handle: Handle,
    engine: MockEngine,
    pending: Option<DecodedPicture>,
    fed: bool,
}

impl FrameDecoder for MockDecoder {
    fn send_packet(&mut self, _packet: &Packet) -> Result<()> {
        if self.engine.fails(FailAt::SendPacket) {
            return Err(SnapError::Decode(diagnostic("send packet")));
        }
        self.fed = true;
        if self.engine.yield_on == Yield::OnPacket {
            self.pending = Some(self.engine.picture.clone());
        }
        Ok(())
    }

    fn send_eof(&mut self) -> Result<()> {
        if self.fed && self.engine.yield_on == Yield::OnEof {
            self.pending = Some(self.engine.picture.clone());
        }
        Ok(())
    }

    fn receive_picture(&mut self) -> Result<Option<DecodedPicture>> {
        Ok(self.pending.take())
    }
}

pub(crate) struct MockMuxer {
    _handle: Handle,
    engine: MockEngine,
    sink: ByteBufferSink,
}

impl EncodeEngine for MockEngine {
    type Muxer = MockMuxer;

    fn open_container(&self, sink: ByteBufferSink) -> Result<MockMuxer> {
        let handle = self.handles.acquire("container");
        if self.fails(FailAt::OpenContainer) {
            return Err(SnapError::Alloc("output context"));
        }
        Ok(MockMuxer {
            _handle: handle,
            engine: self.clone(),
            sink,
        })
    }
}

impl ContainerMuxer for MockMuxer {
    type Encoder = MockEncoder;

    fn add_stream(&mut self, format: &PictureFormat) -> Result<MockEncoder> {
        let handle = self.engine.handles.acquire("encoder");
        if self.engine.fails(FailAt::AddStream) {
            return Err(SnapError::EncoderOpen(diagnostic("open encoder")));
        }
        Ok(MockEncoder {
            _handle: handle,
            engine: self.engine.clone(),
            format: *format,
            pending: None,
        })
    }

    fn write_header(&mut self) -> Result<()> {
        if self.engine.fails(FailAt::WriteHeader) {
            return Err(SnapError::Mux(diagnostic("write header")));
        }
        Ok(())
    }

    fn write_packet(&mut self, packet: &Packet) -> Result<()> {
        match self.sink.write(packet.data()) {
            Err(_) if self.engine.swallow_overflow => Ok(()),
            other => other.map(|_| ()),
        }
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn write_trailer(&mut self) -> Result<()> {
        if self.engine.fails(FailAt::WriteTrailer) {
            return Err(SnapError::Mux(diagnostic("write trailer")));
        }
        Ok(())
    }

    fn into_sink(self) -> ByteBufferSink {
        self.sink
    }
}

pub(crate) struct MockEncoder {
    _handle: Handle,
    engine: MockEngine,
    format: PictureFormat,
    pending: Option<Packet>,
}

impl PictureEncoder for MockEncoder {
    fn send_picture(&mut self, picture: &DecodedPicture) -> Result<()> {
        if self.engine.fails(FailAt::SendPicture) {
            return Err(SnapError::Encode(diagnostic("send picture")));
        }
        assert_eq!(picture.picture_format(), self.format);
        if self.engine.emit_packet {
            let data = minimal_jpeg(picture.width() as u16, picture.height() as u16);
            self.pending = Some(Packet::new(0, data).with_key(true));
        }
        Ok(())
    }

    fn receive_packet(&mut self) -> Result<Option<Packet>> {
        Ok(self.pending.take())
    }
}

/// A YUV420P gradient with distinct values in every plane.
pub(crate) fn test_picture(width: u32, height: u32) -> DecodedPicture {
    let format = PixelFormat::Yuv420p;
    let planes = (0..format.planes())
        .map(|plane| {
            let (w, h) = format.plane_size(plane, width, height);
            let data: Vec<u8> = (0..h)
                .flat_map(|y| (0..w).map(move |x| (x + y) as u8))
                .map(|v| if plane == 0 { v.wrapping_add(16) } else { 128 })
                .collect();
            Plane::new(data, w as usize)
        })
        .collect();
    DecodedPicture::new(format, width, height, planes)
        .unwrap()
        .with_key(true)
        .with_pts(Some(0))
}

/// Smallest byte sequence [`crate::jpeg::JpegInfo::parse`] accepts.
pub(crate) fn minimal_jpeg(width: u16, height: u16) -> Vec<u8> {
    let mut out = vec![0xFF, 0xD8];
    // APP0 with a 2 byte body
    out.extend_from_slice(&[0xFF, 0xE0, 0x00, 0x04, 0x00, 0x00]);
    // SOF0, one component
    out.extend_from_slice(&[0xFF, 0xC0, 0x00, 0x0B, 0x08]);
    out.extend_from_slice(&height.to_be_bytes());
    out.extend_from_slice(&width.to_be_bytes());
    out.extend_from_slice(&[0x01, 0x01, 0x11, 0x00]);
    // SOS header and a few bytes of entropy data
    out.extend_from_slice(&[0xFF, 0xDA, 0x00, 0x08, 0x01, 0x01, 0x00, 0x00, 0x3F, 0x00]);
    out.extend_from_slice(&[0x12, 0x34, 0xFF, 0x00, 0x56]);
    out.extend_from_slice(&[0xFF, 0xD9]);
    out
}
