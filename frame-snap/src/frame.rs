use std::fmt::{Display, Formatter};

use bytes::Bytes;

use crate::error::{Result, SnapError};

/// Planar pixel layouts a [`DecodedPicture`] can carry.
///
/// The `J` variants are full-range ("JPEG") YUV; the others use the limited video range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    Yuv420p,
    Yuvj420p,
    Yuv422p,
    Yuvj422p,
    Yuv444p,
    Yuvj444p,
    Gray8,
}

impl PixelFormat {
    pub fn planes(&self) -> usize {
        match self {
            PixelFormat::Gray8 => 1,
            _ => 3,
        }
    }

    /// Horizontal and vertical chroma subsampling shifts.
    pub fn chroma_shift(&self) -> (u32, u32) {
        match self {
            PixelFormat::Yuv420p | PixelFormat::Yuvj420p => (1, 1),
            PixelFormat::Yuv422p | PixelFormat::Yuvj422p => (1, 0),
            PixelFormat::Yuv444p | PixelFormat::Yuvj444p | PixelFormat::Gray8 => (0, 0),
        }
    }

    pub fn is_full_range(&self) -> bool {
        matches!(
            self,
            PixelFormat::Yuvj420p | PixelFormat::Yuvj422p | PixelFormat::Yuvj444p | PixelFormat::Gray8
        )
    }

    /// Width and height of `plane` for a picture of `width` x `height`.
    pub fn plane_size(&self, plane: usize, width: u32, height: u32) -> (u32, u32) {
        if plane == 0 {
            return (width, height);
        }
        let (sx, sy) = self.chroma_shift();
        (width.div_ceil(1 << sx), height.div_ceil(1 << sy))
    }
}

#[cfg(feature = "ffmpeg")]
impl PixelFormat {
    pub fn from_pixel(pixel: ffmpeg_next::format::Pixel) -> Option<Self> {
        use ffmpeg_next::format::Pixel;
        match pixel {
            Pixel::YUV420P => Some(PixelFormat::Yuv420p),
            Pixel::YUVJ420P => Some(PixelFormat::Yuvj420p),
            Pixel::YUV422P => Some(PixelFormat::Yuv422p),
            Pixel::YUVJ422P => Some(PixelFormat::Yuvj422p),
            Pixel::YUV444P => Some(PixelFormat::Yuv444p),
            Pixel::YUVJ444P => Some(PixelFormat::Yuvj444p),
            Pixel::GRAY8 => Some(PixelFormat::Gray8),
            _ => None,
        }
    }

    pub fn to_pixel(self) -> ffmpeg_next::format::Pixel {
        use ffmpeg_next::format::Pixel;
        match self {
            PixelFormat::Yuv420p => Pixel::YUV420P,
            PixelFormat::Yuvj420p => Pixel::YUVJ420P,
            PixelFormat::Yuv422p => Pixel::YUV422P,
            PixelFormat::Yuvj422p => Pixel::YUVJ422P,
            PixelFormat::Yuv444p => Pixel::YUV444P,
            PixelFormat::Yuvj444p => Pixel::YUVJ444P,
            PixelFormat::Gray8 => Pixel::GRAY8,
        }
    }
}

/// Format, width and height: everything the encoder needs before it sees pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PictureFormat {
    pub format: PixelFormat,
    pub width: u32,
    pub height: u32,
}

/// One sample plane: rows of `stride` bytes.
#[derive(Debug, Clone)]
pub struct Plane {
    pub data: Bytes,
    pub stride: usize,
}

impl Plane {
    pub fn new(data: impl Into<Bytes>, stride: usize) -> Self {
        Self {
            data: data.into(),
            stride,
        }
    }
}

/// The single frame produced by the decode stage.
#[derive(Debug, Clone)]
pub struct DecodedPicture {
    format: PixelFormat,
    width: u32,
    height: u32,
    planes: Vec<Plane>,
    is_key: bool,
    pts: Option<i64>,
}

impl DecodedPicture {
    pub fn new(format: PixelFormat, width: u32, height: u32, planes: Vec<Plane>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(SnapError::InvalidPicture(format!(
                "invalid picture size {}x{}",
                width, height
            )));
        }
        if planes.len() != format.planes() {
            return Err(SnapError::InvalidPicture(format!(
                "{:?} needs {} planes, got {}",
                format,
                format.planes(),
                planes.len()
            )));
        }
        for (index, plane) in planes.iter().enumerate() {
            let (w, h) = format.plane_size(index, width, height);
            let (w, h) = (w as usize, h as usize);
            if plane.stride < w || plane.data.len() < plane.stride * (h - 1) + w {
                return Err(SnapError::InvalidPicture(format!(
                    "plane {} too small: stride {}, {} bytes for {}x{}",
                    index,
                    plane.stride,
                    plane.data.len(),
                    w,
                    h
                )));
            }
        }
        Ok(Self {
            format,
            width,
            height,
            planes,
            is_key: false,
            pts: None,
        })
    }

    pub fn with_key(mut self, is_key: bool) -> Self {
        self.is_key = is_key;
        self
    }

    pub fn with_pts(mut self, pts: Option<i64>) -> Self {
        self.pts = pts;
        self
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn picture_format(&self) -> PictureFormat {
        PictureFormat {
            format: self.format,
            width: self.width,
            height: self.height,
        }
    }

    pub fn planes(&self) -> &[Plane] {
        &self.planes
    }

    pub fn is_key(&self) -> bool {
        self.is_key
    }

    pub fn pts(&self) -> Option<i64> {
        self.pts
    }

    /// The visible samples of row `y` in `plane`, without stride padding.
    pub fn row(&self, plane: usize, y: u32) -> &[u8] {
        let (w, _) = self.format.plane_size(plane, self.width, self.height);
        let p = &self.planes[plane];
        let start = p.stride * y as usize;
        &p.data[start..start + w as usize]
    }
}

impl Display for DecodedPicture {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "DecodedPicture {:?} {}x{}, planes: {}, is_key: {}, pts: {:?}",
            self.format,
            self.width,
            self.height,
            self.planes.len(),
            self.is_key,
            self.pts
        )
    }
}
