//! Structural check of a produced JPEG before anyone treats it as valid.

use crate::error::{Result, SnapError};

const MARKER_SOI: u8 = 0xD8;
const MARKER_EOI: u8 = 0xD9;
const MARKER_SOS: u8 = 0xDA;
const MARKER_TEM: u8 = 0x01;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JpegInfo {
    pub width: u16,
    pub height: u16,
    pub components: u8,
    /// Total byte length, SOI through EOI.
    pub len: usize,
}

fn is_sof(marker: u8) -> bool {
    // SOF0..SOF15 minus DHT (C4), JPG (C8) and DAC (CC)
    (0xC0..=0xCF).contains(&marker) && !matches!(marker, 0xC4 | 0xC8 | 0xCC)
}

fn invalid(msg: impl Into<String>) -> SnapError {
    SnapError::InvalidJpeg(msg.into())
}

impl JpegInfo {
    /// Walks the marker segments up to the first scan and checks the stream is terminated.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < 4 || data[0] != 0xFF || data[1] != MARKER_SOI {
            return Err(invalid("missing SOI marker"));
        }
        if data[data.len() - 2] != 0xFF || data[data.len() - 1] != MARKER_EOI {
            return Err(invalid("missing EOI marker"));
        }

        let mut pos = 2;
        let mut frame: Option<(u16, u16, u8)> = None;
        loop {
            // markers may be preceded by fill bytes
            while pos < data.len() && data[pos] == 0xFF && data.get(pos + 1) == Some(&0xFF) {
                pos += 1;
            }
            if pos + 1 >= data.len() || data[pos] != 0xFF {
                return Err(invalid(format!("expected marker at offset {}", pos)));
            }
            let marker = data[pos + 1];
            pos += 2;
            if marker == MARKER_TEM || (0xD0..=0xD7).contains(&marker) {
                continue;
            }
            if marker == MARKER_EOI {
                return Err(invalid("EOI before any scan"));
            }
            if pos + 2 > data.len() {
                return Err(invalid("truncated segment length"));
            }
            let seg_len = u16::from_be_bytes([data[pos], data[pos + 1]]) as usize;
            if seg_len < 2 || pos + seg_len > data.len() {
                return Err(invalid(format!(
                    "segment 0x{:02X} overruns the buffer",
                    marker
                )));
            }
            if is_sof(marker) {
                if seg_len < 8 {
                    return Err(invalid("short frame header"));
                }
                let height = u16::from_be_bytes([data[pos + 3], data[pos + 4]]);
                let width = u16::from_be_bytes([data[pos + 5], data[pos + 6]]);
                let components = data[pos + 7];
                frame = Some((width, height, components));
            }
            if marker == MARKER_SOS {
                break;
            }
            pos += seg_len;
        }

        let (width, height, components) = frame.ok_or_else(|| invalid("no frame header"))?;
        if width == 0 || height == 0 {
            return Err(invalid(format!("zero frame size {}x{}", width, height)));
        }
        Ok(Self {
            width,
            height,
            components,
            len: data.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::minimal_jpeg;

    #[test]
    fn test_reads_frame_size() {
        let info = JpegInfo::parse(&minimal_jpeg(64, 48)).unwrap();
        assert_eq!((info.width, info.height, info.components), (64, 48, 1));
    }

    #[test]
    fn test_rejects_truncated_stream() {
        let mut data = minimal_jpeg(64, 64);
        data.truncate(data.len() - 3);
        assert!(matches!(JpegInfo::parse(&data), Err(SnapError::InvalidJpeg(_))));
    }

    #[test]
    fn test_rejects_non_jpeg() {
        assert!(JpegInfo::parse(b"\x00\x00\x00\x01\x67\x42").is_err());
        assert!(JpegInfo::parse(&[]).is_err());
    }

    #[test]
    fn test_rejects_missing_frame_header() {
        let data = vec![
            0xFF, 0xD8, 0xFF, 0xDA, 0x00, 0x02, 0x00, 0xFF, 0xD9,
        ];
        assert!(JpegInfo::parse(&data).is_err());
    }
}
