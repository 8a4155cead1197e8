//! Separable triangle-filter resampling.
//!
//! The filter runs one axis at a time, vertical first, keeping f32
//! intermediates; only the final horizontal pass rounds back to bytes.

use crate::error::RasterError;

use super::PixelBuffer;

/// Target dimensions for [`PixelBuffer::resize`].
///
/// At least one dimension must be set; a missing one is derived from the
/// source aspect ratio.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResizeTarget {
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl ResizeTarget {
    /// Scale to an exact width, height following the aspect ratio.
    pub fn width(width: u32) -> Self {
        Self {
            width: Some(width),
            height: None,
        }
    }

    /// Scale to an exact height, width following the aspect ratio.
    pub fn height(height: u32) -> Self {
        Self {
            height: Some(height),
            width: None,
        }
    }

    /// Scale to exact dimensions.
    pub fn exact(width: u32, height: u32) -> Self {
        Self {
            width: Some(width),
            height: Some(height),
        }
    }
}

/// Contribution window of source samples for one output coordinate.
struct FilterWindow {
    start: usize,
    weights: Vec<f32>,
}

/// Triangle-kernel windows for resampling `src` samples down/up to `dst`.
///
/// For output `o` the input center is `(o + 0.5) * ratio - 0.5`; the window
/// is `[floor(c - s), ceil(c + s))` clipped to the source, with weights
/// `max(0, 1 - |k - c| / s)` renormalized over the clipped window.
fn filter_windows(src: usize, dst: usize) -> Vec<FilterWindow> {
    let ratio = src as f32 / dst as f32;
    let support = ratio.max(1.0);

    (0..dst)
        .map(|o| {
            let center = (o as f32 + 0.5) * ratio - 0.5;
            let lo = ((center - support).floor() as i64).max(0) as usize;
            let hi = ((center + support).ceil() as i64).clamp(lo as i64, src as i64) as usize;

            let mut weights: Vec<f32> = (lo..hi)
                .map(|k| {
                    let t = (k as f32 - center) / support;
                    (1.0 - t.abs()).max(0.0)
                })
                .collect();

            let sum: f32 = weights.iter().sum();
            if sum > 0.0 {
                for w in &mut weights {
                    *w /= sum;
                }
            }

            FilterWindow { start: lo, weights }
        })
        .collect()
}

impl PixelBuffer {
    /// Resample to the target size with a separable triangle filter.
    ///
    /// Channels are filtered independently; the result rounds to nearest and
    /// clamps to `[0, 255]`.
    pub fn resize(&self, target: ResizeTarget) -> Result<Self, RasterError> {
        let (dst_w, dst_h) = match (target.width, target.height) {
            (None, None) => return Err(RasterError::MissingResizeTarget),
            (Some(w), Some(h)) => (w, h),
            (Some(w), None) => {
                let h = (self.height as f32 * w as f32 / self.width as f32).round();
                (w, (h as u32).max(1))
            }
            (None, Some(h)) => {
                let w = (self.width as f32 * h as f32 / self.height as f32).round();
                ((w as u32).max(1), h)
            }
        };

        let src_w = self.width as usize;
        let src_h = self.height as usize;
        let out_w = dst_w as usize;
        let out_h = dst_h as usize;
        let ch = self.channels;

        // Vertical pass into an f32 scratch image of out_h x src_w.
        let rows = filter_windows(src_h, out_h);
        let mut mid = vec![0.0f32; out_h * src_w * ch];
        for (oy, win) in rows.iter().enumerate() {
            for x in 0..src_w {
                for c in 0..ch {
                    let mut acc = 0.0f32;
                    for (i, &w) in win.weights.iter().enumerate() {
                        let sy = win.start + i;
                        acc += w * self.data[(sy * src_w + x) * ch + c] as f32;
                    }
                    mid[(oy * src_w + x) * ch + c] = acc;
                }
            }
        }

        // Horizontal pass, rounding back to bytes.
        let cols = filter_windows(src_w, out_w);
        let mut out = vec![0u8; out_h * out_w * ch];
        for y in 0..out_h {
            for (ox, win) in cols.iter().enumerate() {
                for c in 0..ch {
                    let mut acc = 0.0f32;
                    for (i, &w) in win.weights.iter().enumerate() {
                        let sx = win.start + i;
                        acc += w * mid[(y * src_w + sx) * ch + c];
                    }
                    out[(y * out_w + ox) * ch + c] = acc.round().clamp(0.0, 255.0) as u8;
                }
            }
        }

        Ok(Self::from_parts(dst_w, dst_h, ch, out))
    }
}
