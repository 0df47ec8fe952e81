//! Demux/decode stage: one input buffer in, one decoded picture out.

use crate::{
    buffer::ByteBufferSource,
    config::{PacketPolicy, SnapConfig},
    engine::{DecodeEngine, Demuxer, FrameDecoder},
    error::{Result, SnapError},
    frame::DecodedPicture,
    packet::Packet,
    state::{StageState, StageTracker},
    stream::StreamInfo,
};

pub struct DecodeStage<'e, E: DecodeEngine> {
    engine: &'e E,
    policy: PacketPolicy,
    flush_on_empty: bool,
    tracker: StageTracker,
}

impl<'e, E: DecodeEngine> DecodeStage<'e, E> {
    pub fn new(engine: &'e E, config: &SnapConfig) -> Self {
        Self {
            engine,
            policy: config.packet_policy,
            flush_on_empty: config.flush_on_empty,
            tracker: StageTracker::new("decode"),
        }
    }

    pub fn state(&self) -> StageState {
        self.tracker.state()
    }

    /// Runs the stage once. Every engine handle opened here is released before returning,
    /// decoder before demuxer, whether the stage completes or fails.
    pub fn run(&mut self, source: ByteBufferSource) -> Result<DecodedPicture> {
        log::debug!("decode stage: input length={}B", source.len());

        let mut demuxer = self
            .engine
            .open_demux(source)
            .map_err(|e| self.tracker.fail("open demux", e))?;
        self.tracker.advance(StageState::Opened);

        let stream = demuxer
            .find_stream()
            .map_err(|e| self.tracker.fail("find stream", e))?;
        log::debug!("selected {}", stream);

        let mut decoder = demuxer
            .open_decoder(&stream)
            .map_err(|e| self.tracker.fail("open decoder", e))?;
        self.tracker.advance(StageState::Configured);

        self.tracker.advance(StageState::Running);
        let packet = self
            .next_video_packet(&mut demuxer, &stream)
            .map_err(|e| self.tracker.fail("read packet", e))?;
        log::debug!(
            "packet: index: {}, pts: {:?}, size: {}, key: {}",
            packet.index(),
            packet.pts(),
            packet.size(),
            packet.is_key()
        );

        let picture = self
            .decode_one_packet(&mut decoder, &packet)
            .map_err(|e| self.tracker.fail("decode packet", e))?;
        log::debug!("decoded {}", picture);

        self.tracker.advance(StageState::Completed);
        Ok(picture)
    }

    fn next_video_packet(
        &self,
        demuxer: &mut E::Demuxer,
        stream: &StreamInfo,
    ) -> Result<Packet> {
        loop {
            let packet = demuxer
                .read_packet()?
                .ok_or(SnapError::NoPacket(stream.index))?;
            if packet.index() == stream.index {
                return Ok(packet);
            }
            match self.policy {
                PacketPolicy::FirstPacketOnly => {
                    return Err(SnapError::StreamMismatch {
                        expected: stream.index,
                        actual: packet.index(),
                    });
                }
                PacketPolicy::SkipToVideo => {
                    log::debug!(
                        "skip packet of stream {} while waiting for stream {}",
                        packet.index(),
                        stream.index
                    );
                }
            }
        }
    }

    /// Feeds one packet and returns the first picture it yields.
    fn decode_one_packet(
        &self,
        decoder: &mut <E::Demuxer as Demuxer>::Decoder,
        packet: &Packet,
    ) -> Result<DecodedPicture> {
        decoder.send_packet(packet)?;
        if let Some(picture) = decoder.receive_picture()? {
            return Ok(picture);
        }
        if !self.flush_on_empty {
            return Err(SnapError::NoPicture);
        }

        log::debug!("no picture after first packet, draining decoder");
        decoder.send_eof()?;
        decoder.receive_picture()?.ok_or(SnapError::NoPicture)
    }
}

#[cfg(test)]
#[path = "decode_test.rs"]
mod decode_test;
