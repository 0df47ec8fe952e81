//! Error taxonomy for the snapshot pipeline.
//!
//! Every variant names the step that failed. [`SnapError::kind`] folds the variants into the
//! five categories callers usually branch on.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SnapError>;

/// Numeric code and text reported by the codec engine for a failed call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineDiagnostic {
    pub code: i32,
    pub message: String,
}

impl EngineDiagnostic {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for EngineDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code {})", self.message, self.code)
    }
}

#[cfg(feature = "ffmpeg")]
impl From<ffmpeg_next::Error> for EngineDiagnostic {
    fn from(err: ffmpeg_next::Error) -> Self {
        let message = err.to_string();
        Self {
            code: i32::from(err),
            message,
        }
    }
}

/// A write the sink refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Overflow {
    pub requested: usize,
    pub written: usize,
    pub capacity: usize,
}

impl fmt::Display for Overflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "write of {} bytes at offset {} exceeds capacity {}",
            self.requested, self.written, self.capacity
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Empty or missing paths, wrong extension, empty file.
    Validation,
    /// Buffer or context allocation failure.
    Resource,
    /// Open, probe, stream selection, codec lookup failures.
    Negotiation,
    /// Wrong stream, no packet, no frame, send/receive failures.
    Protocol,
    /// Sink overflow, file write failure, unusable output.
    Output,
}

#[derive(Error, Debug)]
pub enum SnapError {
    #[error("{0} path is empty")]
    EmptyPath(&'static str),

    #[error("unsupported source extension, expected .h264/.H264/.h265/.H265: {}", .0.display())]
    UnsupportedExtension(PathBuf),

    #[error("input is empty: {0}")]
    EmptyInput(String),

    #[error("failed to allocate {0}")]
    Alloc(&'static str),

    #[error("demux open failed: {0}")]
    DemuxOpen(EngineDiagnostic),

    #[error("stream probe failed: {0}")]
    StreamProbe(EngineDiagnostic),

    #[error("no video stream in input")]
    NoStream,

    #[error("decoder not found for codec {0}")]
    DecoderNotFound(String),

    #[error("decoder init failed: {0}")]
    DecoderInit(EngineDiagnostic),

    #[error("decoder open failed: {0}")]
    DecoderOpen(EngineDiagnostic),

    #[error("packet belongs to stream {actual}, expected video stream {expected}")]
    StreamMismatch { expected: usize, actual: usize },

    #[error("no packet available for stream {0}")]
    NoPacket(usize),

    #[error("read packet failed: {0}")]
    ReadPacket(EngineDiagnostic),

    #[error("decode failed: {0}")]
    Decode(EngineDiagnostic),

    #[error("decoder produced no frame")]
    NoPicture,

    #[error("invalid picture: {0}")]
    InvalidPicture(String),

    #[error("encoder not found for codec {0}")]
    EncoderNotFound(String),

    #[error("encoder open failed: {0}")]
    EncoderOpen(EngineDiagnostic),

    #[error("encode failed: {0}")]
    Encode(EngineDiagnostic),

    #[error("encoder produced no packet")]
    NoEncodedPacket,

    #[error("mux failed: {0}")]
    Mux(EngineDiagnostic),

    #[error("output sink overflow: {0}")]
    SinkOverflow(Overflow),

    #[error("output is empty")]
    EmptyOutput,

    #[error("output is not a complete JPEG: {0}")]
    InvalidJpeg(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl SnapError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SnapError::EmptyPath(_)
            | SnapError::UnsupportedExtension(_)
            | SnapError::EmptyInput(_) => ErrorKind::Validation,
            SnapError::Alloc(_) => ErrorKind::Resource,
            SnapError::DemuxOpen(_)
            | SnapError::StreamProbe(_)
            | SnapError::NoStream
            | SnapError::DecoderNotFound(_)
            | SnapError::DecoderInit(_)
            | SnapError::DecoderOpen(_)
            | SnapError::EncoderNotFound(_)
            | SnapError::EncoderOpen(_) => ErrorKind::Negotiation,
            SnapError::StreamMismatch { .. }
            | SnapError::NoPacket(_)
            | SnapError::ReadPacket(_)
            | SnapError::Decode(_)
            | SnapError::NoPicture
            | SnapError::InvalidPicture(_)
            | SnapError::Encode(_)
            | SnapError::NoEncodedPacket
            | SnapError::Mux(_) => ErrorKind::Protocol,
            SnapError::SinkOverflow(_)
            | SnapError::EmptyOutput
            | SnapError::InvalidJpeg(_)
            | SnapError::Io(_) => ErrorKind::Output,
        }
    }
}
