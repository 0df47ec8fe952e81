use bytes::Bytes;

/// One unit of compressed data belonging to one stream.
#[derive(Debug, Clone, Default)]
pub struct Packet {
    stream_index: usize,
    data: Bytes,
    pts: Option<i64>,
    dts: Option<i64>,
    is_key: bool,
}

impl Packet {
    pub fn new(stream_index: usize, data: impl Into<Bytes>) -> Self {
        Self {
            stream_index,
            data: data.into(),
            ..Default::default()
        }
    }

    pub fn with_timestamps(mut self, pts: Option<i64>, dts: Option<i64>) -> Self {
        self.pts = pts;
        self.dts = dts;
        self
    }

    pub fn with_key(mut self, is_key: bool) -> Self {
        self.is_key = is_key;
        self
    }

    pub fn index(&self) -> usize {
        self.stream_index
    }

    pub fn pts(&self) -> Option<i64> {
        self.pts
    }

    pub fn dts(&self) -> Option<i64> {
        self.dts
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn is_key(&self) -> bool {
        self.is_key
    }
}

#[cfg(feature = "ffmpeg")]
impl From<&ffmpeg_next::codec::packet::Packet> for Packet {
    fn from(packet: &ffmpeg_next::codec::packet::Packet) -> Self {
        Self {
            stream_index: packet.stream(),
            data: packet
                .data()
                .map(Bytes::copy_from_slice)
                .unwrap_or_default(),
            pts: packet.pts(),
            dts: packet.dts(),
            is_key: packet.is_key(),
        }
    }
}

#[cfg(feature = "ffmpeg")]
impl From<&Packet> for ffmpeg_next::codec::packet::Packet {
    fn from(packet: &Packet) -> Self {
        let mut out = ffmpeg_next::codec::packet::Packet::copy(packet.data());
        out.set_stream(packet.index());
        out.set_pts(packet.pts());
        out.set_dts(packet.dts());
        if packet.is_key() {
            out.set_flags(ffmpeg_next::codec::packet::Flags::KEY);
        }
        out
    }
}
