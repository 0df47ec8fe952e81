//! Encode stage: one decoded picture in, one complete JPEG byte stream out.

use bytes::Bytes;

use crate::{
    buffer::ByteBufferSink,
    engine::{ContainerMuxer, EncodeEngine, PictureEncoder},
    error::{Result, SnapError},
    frame::DecodedPicture,
    packet::Packet,
    state::{StageState, StageTracker},
};

pub struct EncodeStage<'e, E: EncodeEngine> {
    engine: &'e E,
    sink_capacity: usize,
    tracker: StageTracker,
}

impl<'e, E: EncodeEngine> EncodeStage<'e, E> {
    pub fn new(engine: &'e E, sink_capacity: usize) -> Self {
        Self {
            engine,
            sink_capacity,
            tracker: StageTracker::new("encode"),
        }
    }

    pub fn state(&self) -> StageState {
        self.tracker.state()
    }

    /// Consumes `picture` and returns the bytes written to the sink.
    ///
    /// On failure the sink is dropped with the container; nothing partial escapes.
    pub fn run(&mut self, picture: DecodedPicture) -> Result<Bytes> {
        let format = picture.picture_format();
        log::debug!("encode stage: {}", picture);

        let sink = ByteBufferSink::with_capacity(self.sink_capacity);
        let mut muxer = self
            .engine
            .open_container(sink)
            .map_err(|e| self.tracker.fail("open container", e))?;
        self.tracker.advance(StageState::Opened);

        let mut encoder = muxer
            .add_stream(&format)
            .map_err(|e| self.tracker.fail("open encoder", e))?;
        self.tracker.advance(StageState::Configured);

        self.tracker.advance(StageState::Running);
        muxer
            .write_header()
            .map_err(|e| self.tracker.fail("write header", e))?;

        let packet = Self::encode_one_picture(&mut encoder, picture)
            .map_err(|e| self.tracker.fail("encode picture", e))?;
        log::debug!(
            "encoded packet: size: {}, key: {}",
            packet.size(),
            packet.is_key()
        );

        muxer
            .write_packet(&packet)
            .and_then(|_| muxer.flush())
            .map_err(|e| self.tracker.fail("write packet", e))?;
        muxer
            .write_trailer()
            .map_err(|e| self.tracker.fail("write trailer", e))?;
        drop(encoder);

        let sink = muxer.into_sink();
        if let Some(overflow) = sink.overflow() {
            return Err(self
                .tracker
                .fail("drain sink", SnapError::SinkOverflow(overflow)));
        }
        if sink.cursor() == 0 {
            return Err(self.tracker.fail("drain sink", SnapError::EmptyOutput));
        }
        self.tracker.advance(StageState::Completed);
        log::debug!("encode stage wrote {}B", sink.cursor());
        Ok(sink.into_bytes())
    }

    /// Sends the picture and takes back exactly one packet.
    fn encode_one_picture(
        encoder: &mut <E::Muxer as ContainerMuxer>::Encoder,
        picture: DecodedPicture,
    ) -> Result<Packet> {
        encoder.send_picture(&picture)?;
        drop(picture);
        encoder.receive_packet()?.ok_or(SnapError::NoEncodedPacket)
    }
}

#[cfg(test)]
#[path = "encode_test.rs"]
mod encode_test;
