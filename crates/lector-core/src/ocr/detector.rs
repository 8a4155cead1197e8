//! Text detection using the PP-OCR DB detection model.

use tracing::debug;

use crate::config::DetectionConfig;
use crate::error::{OcrError, Result};
use crate::raster::{PixelBuffer, ResizeTarget};
use lector_inference::{InferenceBackend, Tensor};

use super::TextBox;

/// Output name some exported detection models report when the session
/// metadata carries none.
const FALLBACK_OUTPUT_NAME: &str = "fetch_name_0";

/// Text detector producing axis-aligned boxes in source coordinates.
pub struct TextDetector<B: InferenceBackend> {
    backend: B,
    config: DetectionConfig,
}

/// Model canvas geometry for one detection pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct TargetSize {
    pub width: u32,
    pub height: u32,
    pub scale_w: f32,
    pub scale_h: f32,
}

/// Scale the source onto the model canvas: longest side towards
/// `max_side`, then each dimension snapped down to a multiple of 32 with a
/// floor of 32.
pub(crate) fn compute_target_size(src_w: u32, src_h: u32, max_side: u32) -> TargetSize {
    let scale = max_side as f32 / src_w.max(src_h) as f32;
    let snap = |v: f32| -> u32 {
        let floored = v.floor() as u32;
        (floored / 32 * 32).max(32)
    };
    let width = snap(src_w as f32 * scale);
    let height = snap(src_h as f32 * scale);
    TargetSize {
        width,
        height,
        scale_w: width as f32 / src_w as f32,
        scale_h: height as f32 / src_h as f32,
    }
}

/// Inflate a map-space box by the configured margins and clamp it to the
/// canvas. Both margins derive from the box height so they track glyph size.
pub(crate) fn apply_box_padding(
    bbox: &TextBox,
    max_w: u32,
    max_h: u32,
    vertical: f32,
    horizontal: f32,
) -> TextBox {
    let vpad = (bbox.height as f32 * vertical).round() as i64;
    let hpad = (bbox.height as f32 * horizontal).round() as i64;

    let left = (bbox.x as i64 - hpad).max(0);
    let top = (bbox.y as i64 - vpad).max(0);
    let right = (bbox.x as i64 + bbox.width as i64 + hpad).min(max_w as i64);
    let bottom = (bbox.y as i64 + bbox.height as i64 + vpad).min(max_h as i64);

    TextBox::new(
        left as u32,
        top as u32,
        (right - left).max(0) as u32,
        (bottom - top).max(0) as u32,
    )
}

/// Project a map-space box back onto the source image and clamp it inside.
fn project_to_source(bbox: &TextBox, target: &TargetSize, src_w: u32, src_h: u32) -> TextBox {
    let x = ((bbox.x as f32 / target.scale_w).round() as u32).min(src_w);
    let y = ((bbox.y as f32 / target.scale_h).round() as u32).min(src_h);
    let width = ((bbox.width as f32 / target.scale_w).round() as u32).min(src_w - x);
    let height = ((bbox.height as f32 / target.scale_h).round() as u32).min(src_h - y);
    TextBox::new(x, y, width, height)
}

impl<B: InferenceBackend> TextDetector<B> {
    /// Create a new text detector over a detection model session.
    pub fn new(backend: B, config: DetectionConfig) -> Self {
        Self { backend, config }
    }

    /// Detect text regions; boxes come back in the coordinates of `image`.
    ///
    /// A missing output tensor is the model's "no text found" answer and
    /// yields an empty list.
    pub fn detect(&self, image: &PixelBuffer) -> Result<Vec<TextBox>> {
        let target = compute_target_size(image.width(), image.height(), self.config.max_side_length);
        debug!(
            "Detection input {}x{} -> canvas {}x{} (scales {:.3}, {:.3})",
            image.width(),
            image.height(),
            target.width,
            target.height,
            target.scale_w,
            target.scale_h
        );

        let resized = image.resize(ResizeTarget::exact(target.width, target.height))?;
        let norm = [
            1.0 / self.config.std_deviation[0],
            1.0 / self.config.std_deviation[1],
            1.0 / self.config.std_deviation[2],
        ];
        let data = resized.to_tensor(&self.config.mean, &norm);
        let input = Tensor::from_shape_vec(
            &[1, 3, target.height as usize, target.width as usize],
            data,
        )?;

        let outputs = self.backend.run(&[("x", input)])?;

        let expected = self
            .backend
            .output_names()
            .first()
            .map(String::as_str)
            .unwrap_or(FALLBACK_OUTPUT_NAME);
        let Some((_, output)) = outputs.iter().find(|(name, _)| name == expected) else {
            debug!("detection output '{}' absent, no text found", expected);
            return Ok(Vec::new());
        };

        let boxes = self.postprocess(output, &target, image.width(), image.height())?;
        debug!("Detected {} text regions", boxes.len());
        Ok(boxes)
    }

    /// Turn the dense probability map into padded source-coordinate boxes.
    fn postprocess(
        &self,
        output: &Tensor,
        target: &TargetSize,
        src_w: u32,
        src_h: u32,
    ) -> Result<Vec<TextBox>> {
        let plane = target.width as usize * target.height as usize;
        let arr = output.array();
        if arr.len() != plane {
            return Err(OcrError::Detection(format!(
                "probability map shape {:?} does not cover the {}x{} canvas",
                output.shape(),
                target.width,
                target.height
            )));
        }

        // The map arrives row-major; quantize it into an 8-bit image.
        let gray: Vec<u8> = arr
            .iter()
            .map(|&p| (p * 255.0).round().clamp(0.0, 255.0) as u8)
            .collect();
        let map = PixelBuffer::from_raw(target.width, target.height, 1, gray)?;

        let cutoff = (255.0 * self.config.text_pixel_threshold).round() as u8;
        let mask = map.threshold(cutoff).dilate(1)?;

        let boxes = mask
            .contours(self.config.minimum_area_threshold)
            .into_iter()
            .map(|bbox| {
                let inflated = apply_box_padding(
                    &bbox,
                    target.width,
                    target.height,
                    self.config.padding_box_vertical,
                    self.config.padding_box_horizontal,
                );
                project_to_source(&inflated, target, src_w, src_h)
            })
            .collect();

        Ok(boxes)
    }
}
