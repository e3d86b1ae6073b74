//! QR decoding primitive
//!
//! One call per frame. "No QR code in this frame" is `Ok(None)`, which the
//! decode loop treats as routine; `Err` means a symbol was found but could not
//! be read (blurred, cut off, damaged).

use thiserror::Error;

use crate::camera::Frame;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("QR symbol found but unreadable: {0}")]
    Unreadable(String),
}

pub trait QrDecoder: Send + Sync {
    fn decode(&self, frame: &Frame) -> Result<Option<String>, DecodeError>;
}

/// Decoder backed by `rqrr`
#[derive(Debug, Default, Clone, Copy)]
pub struct RqrrDecoder;

impl QrDecoder for RqrrDecoder {
    fn decode(&self, frame: &Frame) -> Result<Option<String>, DecodeError> {
        let (width, height) = frame.dimensions();
        if width == 0 || height == 0 {
            return Ok(None);
        }

        let mut prepared =
            rqrr::PreparedImage::prepare_from_greyscale(width as usize, height as usize, |x, y| {
                frame.get_pixel(x as u32, y as u32).0[0]
            });

        let mut last_error = None;
        for grid in prepared.detect_grids() {
            match grid.decode() {
                Ok((_meta, content)) => {
                    let content = content.trim().to_string();
                    if !content.is_empty() {
                        return Ok(Some(content));
                    }
                }
                Err(e) => last_error = Some(format!("{:?}", e)),
            }
        }

        match last_error {
            Some(e) => Err(DecodeError::Unreadable(e)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    #[test]
    fn test_blank_frame_has_no_code() {
        let frame = GrayImage::from_pixel(64, 64, Luma([255]));
        assert!(RqrrDecoder.decode(&frame).unwrap().is_none());
    }

    #[test]
    fn test_empty_frame_has_no_code() {
        let frame = GrayImage::new(0, 0);
        assert!(RqrrDecoder.decode(&frame).unwrap().is_none());
    }
}
