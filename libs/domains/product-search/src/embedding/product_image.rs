use std::io::Cursor;

use image::{ImageFormat, RgbImage};

use crate::error::{SearchError, SearchResult};

/// A decoded image, normalised to 8-bit RGB.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductImage {
    rgb: RgbImage,
}

impl ProductImage {
    /// Decodes any supported format (PNG, JPEG, WebP, GIF) and drops alpha.
    pub fn decode(bytes: &[u8]) -> SearchResult<Self> {
        if bytes.is_empty() {
            return Err(SearchError::ImageDecode("image is empty".to_string()));
        }

        let rgb = image::load_from_memory(bytes)?.to_rgb8();
        Ok(Self { rgb })
    }

    pub fn from_rgb(rgb: RgbImage) -> Self {
        Self { rgb }
    }

    pub fn width(&self) -> u32 {
        self.rgb.width()
    }

    pub fn height(&self) -> u32 {
        self.rgb.height()
    }

    /// Lossless re-encoding handed to the image model.
    pub fn to_png(&self) -> SearchResult<Vec<u8>> {
        let mut buffer = Cursor::new(Vec::new());
        self.rgb.write_to(&mut buffer, ImageFormat::Png)?;
        Ok(buffer.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn png_bytes() -> Vec<u8> {
        let img = RgbaImage::from_pixel(3, 2, Rgba([200, 10, 10, 128]));
        let mut buffer = Cursor::new(Vec::new());
        img.write_to(&mut buffer, ImageFormat::Png).unwrap();
        buffer.into_inner()
    }

    #[test]
    fn test_decode_converts_to_rgb() {
        let image = ProductImage::decode(&png_bytes()).unwrap();
        assert_eq!((image.width(), image.height()), (3, 2));
        assert_eq!(image.rgb.get_pixel(0, 0).0, [200, 10, 10]);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let err = ProductImage::decode(b"definitely not an image").unwrap_err();
        assert!(matches!(err, SearchError::ImageDecode(_)));

        let err = ProductImage::decode(&[]).unwrap_err();
        assert!(matches!(err, SearchError::ImageDecode(_)));
    }

    #[test]
    fn test_png_reencoding_decodes_back() {
        let decoded = ProductImage::decode(&png_bytes()).unwrap();
        let reencoded = ProductImage::decode(&decoded.to_png().unwrap()).unwrap();
        assert_eq!(decoded, reencoded);
    }
}
