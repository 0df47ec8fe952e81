/// Default cap for both the loaded input and the produced JPEG.
pub const DEFAULT_BUFFER_CAP: usize = 1024 * 1024;

/// Default size of the scratch buffer the engine reads and writes through.
pub const DEFAULT_IO_BUFFER_SIZE: usize = 32 * 1024;

/// What the decode stage does with packets that do not belong to the video stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PacketPolicy {
    /// Read exactly one packet; a packet from another stream fails the call.
    FirstPacketOnly,
    /// Discard packets of other streams until the video stream delivers one.
    #[default]
    SkipToVideo,
}

#[derive(Debug, Clone)]
pub struct SnapConfig {
    /// Input bytes past this are dropped when loading from a file.
    pub max_input_bytes: usize,
    /// Capacity of the output sink.
    pub max_output_bytes: usize,
    /// Scratch buffer between the engine and the memory adapters.
    pub io_buffer_size: usize,
    pub packet_policy: PacketPolicy,
    /// Send end-of-stream to the decoder when the first packet yields no picture.
    pub flush_on_empty: bool,
    /// 1..=100; `None` keeps the engine default.
    pub jpeg_quality: Option<u8>,
}

impl Default for SnapConfig {
    fn default() -> Self {
        Self {
            max_input_bytes: DEFAULT_BUFFER_CAP,
            max_output_bytes: DEFAULT_BUFFER_CAP,
            io_buffer_size: DEFAULT_IO_BUFFER_SIZE,
            packet_policy: PacketPolicy::default(),
            flush_on_empty: true,
            jpeg_quality: None,
        }
    }
}
