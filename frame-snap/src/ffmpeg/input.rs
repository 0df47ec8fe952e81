use std::ffi::c_int;
use std::ptr;

use ffmpeg_next::{ffi, format::context::Input, media};

use super::{avio::MemoryIo, decoder::FfmpegDecoder};
use crate::{
    buffer::ByteBufferSource,
    engine::Demuxer,
    error::{EngineDiagnostic, Result, SnapError},
    packet::Packet,
    stream::StreamInfo,
};

/// Format context reading from a [`ByteBufferSource`].
pub struct FfmpegDemuxer {
    // closed before the I/O context it reads through
    inner: Input,
    io: MemoryIo<ByteBufferSource>,
}

impl FfmpegDemuxer {
    pub fn open(source: ByteBufferSource, io_buffer_size: usize) -> Result<Self> {
        let io = MemoryIo::reader(source, io_buffer_size)?;

        let inner = unsafe {
            let mut ptr = ffi::avformat_alloc_context();
            if ptr.is_null() {
                return Err(SnapError::Alloc("format context"));
            }
            (*ptr).pb = io.as_ptr();
            (*ptr).flags |= ffi::AVFMT_FLAG_CUSTOM_IO as c_int;

            // frees the context and nulls `ptr` on failure
            let ret = ffi::avformat_open_input(&mut ptr, ptr::null(), ptr::null(), ptr::null_mut());
            if ret < 0 {
                return Err(SnapError::DemuxOpen(ffmpeg_next::Error::from(ret).into()));
            }
            let input = Input::wrap(ptr);

            let ret = ffi::avformat_find_stream_info(ptr, ptr::null_mut());
            if ret < 0 {
                return Err(SnapError::StreamProbe(ffmpeg_next::Error::from(ret).into()));
            }
            input
        };
        log::debug!(
            "demux opened: format: {}, streams: {}, read {}B of {}B",
            inner.format().name(),
            inner.nb_streams(),
            io.state().cursor(),
            io.state().len()
        );

        Ok(Self { inner, io })
    }
}

impl Demuxer for FfmpegDemuxer {
    type Decoder = FfmpegDecoder;

    fn find_stream(&mut self) -> Result<StreamInfo> {
        let stream = self
            .inner
            .streams()
            .best(media::Type::Video)
            .ok_or(SnapError::NoStream)?;
        let info = StreamInfo::from(&stream);
        log::debug!(
            "time base: {}/{}, codec: {}, size: {}x{}",
            info.time_base.0,
            info.time_base.1,
            info.codec,
            info.width,
            info.height
        );
        Ok(info)
    }

    fn open_decoder(&mut self, info: &StreamInfo) -> Result<FfmpegDecoder> {
        let stream = self.inner.stream(info.index).ok_or(SnapError::NoStream)?;
        FfmpegDecoder::open(&stream, info)
    }

    fn read_packet(&mut self) -> Result<Option<Packet>> {
        let mut packet = ffmpeg_next::Packet::empty();
        match packet.read(&mut self.inner) {
            Ok(()) => {
                log::trace!(
                    "read packet of stream {}, source cursor {}",
                    packet.stream(),
                    self.io.state().cursor()
                );
                Ok(Some(Packet::from(&packet)))
            }
            Err(ffmpeg_next::Error::Eof) => Ok(None),
            Err(e) => Err(SnapError::ReadPacket(EngineDiagnostic::from(e))),
        }
    }
}
