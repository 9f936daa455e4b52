//! Decoded video frames.

use std::sync::Arc;

use image::codecs::jpeg::JpegEncoder;
use image::ColorType;

use crate::error::{MediaError, MediaResult};

/// Bytes per pixel of packed rgb24.
pub const RGB24_CHANNELS: usize = 3;

/// JPEG quality used for live view frames.
pub const DEFAULT_JPEG_QUALITY: u8 = 80;

/// One decoded frame in packed rgb24.
///
/// Pixel data is shared, so a frame can sit in several clip buffers
/// without copying.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    width: u32,
    height: u32,
    data: Arc<Vec<u8>>,
}

impl Frame {
    /// Wrap raw rgb24 bytes, checking the buffer matches the geometry.
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> MediaResult<Self> {
        let expected = Self::byte_len(width, height);
        if data.len() != expected {
            return Err(MediaError::invalid_frame(format!(
                "expected {} bytes for {}x{} rgb24, got {}",
                expected,
                width,
                height,
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data: Arc::new(data),
        })
    }

    /// Size in bytes of one rgb24 frame.
    pub fn byte_len(width: u32, height: u32) -> usize {
        width as usize * height as usize * RGB24_CHANNELS
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Encode the frame as JPEG.
    pub fn to_jpeg(&self, quality: u8) -> MediaResult<Vec<u8>> {
        let mut out = Vec::with_capacity(self.data.len() / 8);
        JpegEncoder::new_with_quality(&mut out, quality).encode(
            &self.data,
            self.width,
            self.height,
            ColorType::Rgb8,
        )?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_size_check() {
        assert!(Frame::new(2, 2, vec![0; 12]).is_ok());
        assert!(matches!(
            Frame::new(2, 2, vec![0; 11]),
            Err(MediaError::InvalidFrame(_))
        ));
    }

    #[test]
    fn test_jpeg_encoding() {
        let frame = Frame::new(8, 8, vec![128; Frame::byte_len(8, 8)]).unwrap();
        let jpeg = frame.to_jpeg(DEFAULT_JPEG_QUALITY).unwrap();

        // SOI and EOI markers
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
        assert_eq!(&jpeg[jpeg.len() - 2..], &[0xFF, 0xD9]);
    }

    #[test]
    fn test_clone_shares_pixels() {
        let frame = Frame::new(1, 1, vec![1, 2, 3]).unwrap();
        let copy = frame.clone();
        assert!(Arc::ptr_eq(&frame.data, &copy.data));
    }
}
