//! Image loading utilities for texture data
//!
//! Decodes PNG/JPEG through the `image` crate and converts the result into the
//! layout the GPU upload expects: tightly packed RGBA8 rows, bottom row first.

use std::path::Path;
use crate::assets::AssetError;

/// Loaded image data ready for GPU upload
#[derive(Debug, Clone)]
pub struct ImageData {
    /// Raw RGBA pixel data, bottom-left origin
    pub data: Vec<u8>,
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
}

impl ImageData {
    /// Decode an image file and convert it for upload
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, AssetError> {
        let path_ref = path.as_ref();

        log::debug!("Decoding image {:?}", path_ref);

        let img = image::open(path_ref).map_err(|e| AssetError::DecodeFailure {
            path: path_ref.to_path_buf(),
            reason: e.to_string(),
        })?;

        Self::from_dynamic(img).map_err(|reason| AssetError::DecodeFailure {
            path: path_ref.to_path_buf(),
            reason,
        })
    }

    fn from_dynamic(img: image::DynamicImage) -> Result<Self, String> {
        // GL samples rows bottom-up
        let rgba = img.flipv().to_rgba8();
        let (width, height) = rgba.dimensions();
        if width == 0 || height == 0 {
            return Err(format!("cannot convert {}x{} image to RGBA8", width, height));
        }

        Ok(Self {
            data: rgba.into_raw(),
            width,
            height,
        })
    }
}
