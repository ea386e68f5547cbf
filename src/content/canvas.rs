//! Offscreen rendering for drawable sources
//!
//! Bitmaps, decoded frames and other visual sources are standardized by
//! painting them onto an RGBA canvas at their natural size and exporting
//! that canvas as PNG.

use std::fmt;

use crate::error::LlmError;

/// A visual source that can paint itself onto a canvas.
pub trait DrawableSource: Send + Sync + fmt::Debug {
    /// Natural (intrinsic) width and height in pixels.
    fn natural_size(&self) -> (u32, u32);

    /// Paint the source onto `canvas`, which has the natural size.
    fn draw(&self, canvas: &mut OffscreenCanvas) -> Result<(), LlmError>;
}

/// RGBA8 pixel surface
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffscreenCanvas {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl OffscreenCanvas {
    /// Transparent canvas. Zero-sized canvases are rejected.
    pub fn new(width: u32, height: u32) -> Result<Self, LlmError> {
        if width == 0 || height == 0 {
            return Err(LlmError::InvalidInput(format!(
                "Cannot render a {width}x{height} source"
            )));
        }
        Ok(Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize * 4],
        })
    }

    pub const fn width(&self) -> u32 {
        self.width
    }

    pub const fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Set one pixel; out-of-bounds writes are ignored.
    pub fn put_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let offset = (y as usize * self.width as usize + x as usize) * 4;
        self.pixels[offset..offset + 4].copy_from_slice(&rgba);
    }

    pub fn fill(&mut self, rgba: [u8; 4]) {
        for pixel in self.pixels.chunks_exact_mut(4) {
            pixel.copy_from_slice(&rgba);
        }
    }

    /// Copy an RGBA block with its top-left corner at (`x`, `y`), clipped to
    /// the canvas.
    pub fn draw_rgba(
        &mut self,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        data: &[u8],
    ) -> Result<(), LlmError> {
        let expected = width as usize * height as usize * 4;
        if data.len() != expected {
            return Err(LlmError::InvalidInput(format!(
                "RGBA block of {width}x{height} needs {expected} bytes, got {}",
                data.len()
            )));
        }
        let visible_w = width.min(self.width.saturating_sub(x)) as usize;
        if visible_w == 0 {
            return Ok(());
        }
        for row in 0..height.min(self.height.saturating_sub(y)) {
            let src = row as usize * width as usize * 4;
            let dst = ((y + row) as usize * self.width as usize + x as usize) * 4;
            self.pixels[dst..dst + visible_w * 4].copy_from_slice(&data[src..src + visible_w * 4]);
        }
        Ok(())
    }

    /// Export as an 8-bit RGBA PNG.
    pub fn to_png(&self) -> Result<Vec<u8>, LlmError> {
        let mut out = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut out, self.width, self.height);
            encoder.set_color(png::ColorType::Rgba);
            encoder.set_depth(png::BitDepth::Eight);
            let mut writer = encoder.write_header()?;
            writer.write_image_data(&self.pixels)?;
            writer.finish()?;
        }
        Ok(out)
    }
}

/// Decoded RGBA8 bitmap
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbaImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl RgbaImage {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Single-color bitmap.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let pixels = rgba
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 4)
            .collect();
        Self::new(width, height, pixels)
    }
}

impl DrawableSource for RgbaImage {
    fn natural_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn draw(&self, canvas: &mut OffscreenCanvas) -> Result<(), LlmError> {
        canvas.draw_rgba(0, 0, self.width, self.height, &self.pixels)
    }
}

/// Paint `source` at its natural size and encode the result as PNG.
pub fn render_to_png(source: &dyn DrawableSource) -> Result<Vec<u8>, LlmError> {
    let (width, height) = source.natural_size();
    let mut canvas = OffscreenCanvas::new(width, height)?;
    source.draw(&mut canvas)?;
    canvas.to_png()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_bitmap_as_png() {
        let image = RgbaImage::solid(3, 2, [255, 0, 0, 255]);
        let png = render_to_png(&image).unwrap();
        assert_eq!(&png[..8], &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]);
        // IHDR carries the natural size
        assert_eq!(u32::from_be_bytes(png[16..20].try_into().unwrap()), 3);
        assert_eq!(u32::from_be_bytes(png[20..24].try_into().unwrap()), 2);
    }

    #[test]
    fn zero_sized_sources_are_rejected() {
        let image = RgbaImage::new(0, 4, Vec::new());
        assert!(matches!(
            render_to_png(&image),
            Err(LlmError::InvalidInput(_))
        ));
    }

    #[test]
    fn blits_are_clipped() {
        let mut canvas = OffscreenCanvas::new(2, 2).unwrap();
        let block = RgbaImage::solid(3, 3, [1, 2, 3, 4]);
        canvas.draw_rgba(1, 1, 3, 3, &block.pixels).unwrap();
        assert_eq!(&canvas.pixels()[12..16], &[1, 2, 3, 4]);
        assert_eq!(&canvas.pixels()[0..4], &[0, 0, 0, 0]);
    }

    #[test]
    fn mismatched_block_length_fails() {
        let mut canvas = OffscreenCanvas::new(2, 2).unwrap();
        assert!(canvas.draw_rgba(0, 0, 2, 2, &[0; 3]).is_err());
    }
}
