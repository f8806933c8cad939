//! Decoded texture pixels ready for upload.

use std::path::Path;

use anyhow::Context;

/// Texture data in CPU memory, rows top to bottom unless flipped on load.
#[derive(Clone, Debug)]
pub struct TextureData {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TextureFormat {
    Rgba8,
}

impl TextureData {
    /// Wrap raw RGBA8 pixels. Panics if `data` does not hold `width * height` pixels.
    pub fn new_rgba8(width: u32, height: u32, data: Vec<u8>) -> Self {
        assert_eq!(
            data.len(),
            width as usize * height as usize * 4,
            "Data size doesn't match RGBA8 format"
        );
        Self {
            data,
            width,
            height,
            format: TextureFormat::Rgba8,
        }
    }

    /// Decode an image file into RGBA8.
    ///
    /// With `flip_y` the rows are reversed so the first row in memory is the
    /// bottom of the image, which is what GL texture coordinates expect.
    pub fn load<P: AsRef<Path>>(path: P, flip_y: bool) -> anyhow::Result<Self> {
        let path = path.as_ref();
        log::debug!("Decoding texture {:?} (flip_y={})", path, flip_y);

        let img = image::open(path).with_context(|| format!("Failed to open image {:?}", path))?;
        let tex = Self::from_image(img, flip_y);

        log::info!(
            "Loaded texture {:?}: {}x{}, {} mip levels",
            path,
            tex.width,
            tex.height,
            tex.mip_level_count()
        );
        Ok(tex)
    }

    /// Decode an in-memory encoded image (PNG).
    pub fn from_bytes(bytes: &[u8], flip_y: bool) -> anyhow::Result<Self> {
        let img = image::load_from_memory(bytes).context("Failed to decode image bytes")?;
        Ok(Self::from_image(img, flip_y))
    }

    fn from_image(img: image::DynamicImage, flip_y: bool) -> Self {
        let mut rgba = img.to_rgba8();
        if flip_y {
            image::imageops::flip_vertical_in_place(&mut rgba);
        }
        let (width, height) = rgba.dimensions();
        Self::new_rgba8(width, height, rgba.into_raw())
    }

    /// Procedural checkerboard with 8px cells, white and gray.
    pub fn checkerboard(size: u32) -> Self {
        let mut data = Vec::with_capacity(size as usize * size as usize * 4);
        for y in 0..size {
            for x in 0..size {
                let cell = ((x / 8) + (y / 8)) % 2;
                let shade = if cell == 0 { 255 } else { 128 };
                data.extend_from_slice(&[shade, shade, shade, 255]);
            }
        }
        Self::new_rgba8(size, size, data)
    }

    pub fn bytes_per_pixel(&self) -> u32 {
        match self.format {
            TextureFormat::Rgba8 => 4,
        }
    }

    /// Length of a full mip chain: `floor(log2(max(w, h))) + 1`.
    pub fn mip_level_count(&self) -> u32 {
        mip_level_count(self.width, self.height)
    }

    pub fn is_valid(&self) -> bool {
        let expected_size =
            self.width as usize * self.height as usize * self.bytes_per_pixel() as usize;
        self.data.len() == expected_size && self.width > 0 && self.height > 0
    }
}

pub fn mip_level_count(width: u32, height: u32) -> u32 {
    let largest = width.max(height);
    if largest == 0 {
        return 0;
    }
    32 - largest.leading_zeros()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_png(img: &image::RgbaImage) -> Vec<u8> {
        let mut out = std::io::Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageFormat::Png)
            .expect("encode png");
        out.into_inner()
    }

    #[test]
    fn mip_chain_lengths() {
        assert_eq!(mip_level_count(1, 1), 1);
        assert_eq!(mip_level_count(2, 2), 2);
        assert_eq!(mip_level_count(256, 64), 9);
        assert_eq!(mip_level_count(300, 1), 9);
        assert_eq!(mip_level_count(0, 0), 0);
    }

    #[test]
    fn checkerboard_is_valid() {
        let tex = TextureData::checkerboard(16);
        assert!(tex.is_valid());
        assert_eq!(&tex.data[0..4], &[255, 255, 255, 255]);
        // Pixel (8, 0) starts the second cell.
        assert_eq!(&tex.data[8 * 4..8 * 4 + 4], &[128, 128, 128, 255]);
    }

    #[test]
    fn flip_y_reverses_rows() {
        let mut img = image::RgbaImage::new(1, 2);
        img.put_pixel(0, 0, image::Rgba([255, 0, 0, 255]));
        img.put_pixel(0, 1, image::Rgba([0, 0, 255, 255]));
        let png = encode_png(&img);

        let upright = TextureData::from_bytes(&png, false).unwrap();
        assert_eq!(&upright.data[0..4], &[255, 0, 0, 255]);

        let flipped = TextureData::from_bytes(&png, true).unwrap();
        assert_eq!(&flipped.data[0..4], &[0, 0, 255, 255]);
        assert_eq!((flipped.width, flipped.height), (1, 2));
    }

    #[test]
    fn huge_dimensions_do_not_overflow_size_checks() {
        let tex = TextureData {
            data: Vec::new(),
            width: 65536,
            height: 65536,
            format: TextureFormat::Rgba8,
        };
        assert!(!tex.is_valid());
    }

    #[test]
    #[should_panic(expected = "Data size doesn't match")]
    fn mismatched_size_is_reported_for_huge_dimensions() {
        TextureData::new_rgba8(32768, 32768, Vec::new());
    }

    #[test]
    fn load_missing_file_fails() {
        let err = TextureData::load("/definitely/not/here.png", true).unwrap_err();
        assert!(err.to_string().contains("Failed to open image"));
    }
}
