//! Owned pixel buffers and the raster operations behind the OCR pipeline.
//!
//! Every operation returns a fresh buffer; nothing here mutates in place.
//! Rows are stored top-to-bottom, pixels left-to-right, channels interleaved.

mod morph;
mod resize;

pub use resize::ResizeTarget;

use crate::error::RasterError;

/// An 8-bit raster image with 1 to 4 interleaved channels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    channels: usize,
    data: Vec<u8>,
}

/// Margins for [`PixelBuffer::pad`].
///
/// Precedence: `padding` overrides `vertical`/`horizontal`, which override
/// the per-side fields. Unset sides default to 0. The fill color defaults
/// to transparent black.
#[derive(Debug, Clone, Copy, Default)]
pub struct PadOptions {
    pub padding: Option<u32>,
    pub vertical: Option<u32>,
    pub horizontal: Option<u32>,
    pub top: Option<u32>,
    pub bottom: Option<u32>,
    pub left: Option<u32>,
    pub right: Option<u32>,
    pub color: Option<[u8; 4]>,
}

impl PadOptions {
    /// Uniform padding on all four sides.
    pub fn uniform(padding: u32, color: [u8; 4]) -> Self {
        Self {
            padding: Some(padding),
            color: Some(color),
            ..Self::default()
        }
    }

    fn margins(&self) -> (u32, u32, u32, u32) {
        let top = self.padding.or(self.vertical).or(self.top).unwrap_or(0);
        let bottom = self.padding.or(self.vertical).or(self.bottom).unwrap_or(0);
        let left = self.padding.or(self.horizontal).or(self.left).unwrap_or(0);
        let right = self.padding.or(self.horizontal).or(self.right).unwrap_or(0);
        (top, bottom, left, right)
    }
}

impl PixelBuffer {
    /// Create a buffer from raw interleaved bytes, validating the geometry.
    pub fn from_raw(
        width: u32,
        height: u32,
        channels: usize,
        data: Vec<u8>,
    ) -> Result<Self, RasterError> {
        if !(1..=4).contains(&channels) {
            return Err(RasterError::UnsupportedChannels(channels));
        }
        let expected = width as usize * height as usize * channels;
        if data.len() != expected {
            return Err(RasterError::SizeMismatch {
                width,
                height,
                channels,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            channels,
            data,
        })
    }

    pub(crate) fn from_parts(width: u32, height: u32, channels: usize, data: Vec<u8>) -> Self {
        debug_assert_eq!(data.len(), width as usize * height as usize * channels);
        Self {
            width,
            height,
            channels,
            data,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Copy out the rectangle `(x, y, width, height)`.
    ///
    /// Fails when the rectangle is not fully inside the source.
    pub fn crop(&self, x: u32, y: u32, width: u32, height: u32) -> Result<Self, RasterError> {
        if x.checked_add(width).is_none_or(|r| r > self.width)
            || y.checked_add(height).is_none_or(|b| b > self.height)
        {
            return Err(RasterError::CropOutOfBounds {
                x,
                y,
                width,
                height,
                image_width: self.width,
                image_height: self.height,
            });
        }

        let row_bytes = width as usize * self.channels;
        let mut data = Vec::with_capacity(height as usize * row_bytes);
        for row in 0..height as usize {
            let src_row = (y as usize + row) * self.width as usize + x as usize;
            let start = src_row * self.channels;
            data.extend_from_slice(&self.data[start..start + row_bytes]);
        }

        Ok(Self::from_parts(width, height, self.channels, data))
    }

    /// Surround the image with margins filled with `color`.
    ///
    /// The output always has 4 channels because the fill color is RGBA; a
    /// source with fewer channels copies the channels it has over the fill.
    pub fn pad(&self, options: &PadOptions) -> Self {
        let (top, bottom, left, right) = options.margins();
        let color = options.color.unwrap_or([0, 0, 0, 0]);

        let new_w = self.width + left + right;
        let new_h = self.height + top + bottom;

        let mut data = vec![0u8; new_w as usize * new_h as usize * 4];
        for px in data.chunks_exact_mut(4) {
            px.copy_from_slice(&color);
        }

        let copy = self.channels.min(4);
        for row in 0..self.height as usize {
            for col in 0..self.width as usize {
                let src = (row * self.width as usize + col) * self.channels;
                let dst =
                    ((row + top as usize) * new_w as usize + col + left as usize) * 4;
                data[dst..dst + copy].copy_from_slice(&self.data[src..src + copy]);
            }
        }

        Self::from_parts(new_w, new_h, 4, data)
    }

    /// Pack the image into a CHW float32 tensor of length `3 * H * W`.
    ///
    /// `out[c*H*W + h*W + w] = px[c] * norm[c] - mean[c] * norm[c]`; channels
    /// past the third (alpha) are ignored. A buffer with fewer than three
    /// channels broadcasts channel 0 into all three planes.
    pub fn to_tensor(&self, mean: &[f32; 3], norm: &[f32; 3]) -> Vec<f32> {
        let plane = self.width as usize * self.height as usize;
        let mut out = vec![0.0f32; 3 * plane];

        for c in 0..3 {
            let src_c = if self.channels >= 3 { c } else { 0 };
            let scale = norm[c];
            let bias = mean[c] * norm[c];
            let dst = &mut out[c * plane..(c + 1) * plane];
            for (i, slot) in dst.iter_mut().enumerate() {
                *slot = self.data[i * self.channels + src_c] as f32 * scale - bias;
            }
        }

        out
    }
}

#[cfg(feature = "image")]
impl From<&image::DynamicImage> for PixelBuffer {
    fn from(img: &image::DynamicImage) -> Self {
        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();
        Self::from_parts(width, height, 4, rgba.into_raw())
    }
}
