//! Text recognition using the PP-OCR CRNN recognition model.

use ndarray::ArrayD;
use tracing::trace;

use crate::config::RecognitionConfig;
use crate::error::{OcrError, Result};
use crate::raster::{PixelBuffer, ResizeTarget};
use lector_inference::{InferenceBackend, Tensor};

use super::{RecognitionResult, TextBox, reading_order};

/// Text recognizer decoding cropped regions into strings.
pub struct TextRecognizer<B: InferenceBackend> {
    backend: B,
    config: RecognitionConfig,
}

impl<B: InferenceBackend> TextRecognizer<B> {
    /// Create a new text recognizer over a recognition model session.
    pub fn new(backend: B, config: RecognitionConfig) -> Self {
        Self { backend, config }
    }

    /// Recognize every box of `image`, returning results in reading order.
    ///
    /// Empty boxes are dropped; every surviving box yields exactly one
    /// result, even when the decode comes back empty.
    pub fn recognize(&self, image: &PixelBuffer, boxes: &[TextBox]) -> Result<Vec<RecognitionResult>> {
        let mut results = Vec::with_capacity(boxes.len());

        for bbox in boxes {
            if bbox.is_empty() {
                continue;
            }

            let crop = image.crop(bbox.x, bbox.y, bbox.width, bbox.height)?;
            let resized = crop.resize(ResizeTarget::height(self.config.image_height))?;

            let norm = [
                1.0 / self.config.std_deviation[0],
                1.0 / self.config.std_deviation[1],
                1.0 / self.config.std_deviation[2],
            ];
            let data = resized.to_tensor(&self.config.mean, &norm);
            let input = Tensor::from_shape_vec(
                &[1, 3, resized.height() as usize, resized.width() as usize],
                data,
            )?;

            let outputs = self.backend.run(&[("x", input)])?;
            let output = self.expected_output(&outputs)?;

            let (text, confidence) =
                ctc_greedy_decode(output.array(), &self.config.characters_dictionary)?;
            trace!("Recognized '{}' (confidence {:.3}) in {:?}", text, confidence, bbox);

            results.push(RecognitionResult {
                text,
                bbox: *bbox,
                confidence,
            });
        }

        results.sort_by(|a, b| reading_order(&a.bbox, &b.bbox));
        Ok(results)
    }

    /// Find the model's first declared output; unlike detection, its absence
    /// here means an incompatible model and is fatal.
    fn expected_output<'a>(&self, outputs: &'a [(String, Tensor)]) -> Result<&'a Tensor> {
        match self.backend.output_names().first() {
            Some(name) => outputs
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, t)| t)
                .ok_or_else(|| OcrError::MissingOutput {
                    expected: name.clone(),
                    available: outputs.iter().map(|(n, _)| n.clone()).collect(),
                }),
            None => outputs
                .first()
                .map(|(_, t)| t)
                .ok_or_else(|| OcrError::MissingOutput {
                    expected: "<first output>".to_string(),
                    available: Vec::new(),
                }),
        }
    }
}

/// Greedy CTC decode over `[1, T, C]` logits.
///
/// Each step contributes its argmax class; class 0 is the blank and emits
/// nothing. Consecutive repeats are NOT collapsed - the models in scope were
/// exported against a runtime that only skips blanks, and collapsing would
/// change their observed output. Confidence is the mean of the emitted
/// steps' max scores, NaN when every step was blank.
pub(crate) fn ctc_greedy_decode(
    output: &ArrayD<f32>,
    dictionary: &[String],
) -> Result<(String, f32)> {
    let shape = output.shape();
    if shape.len() < 3 {
        return Err(OcrError::Recognition(format!(
            "recognition output shape {:?} is not [1, T, C]",
            shape
        )));
    }
    let steps = shape[1];
    let classes = shape[2];

    let mut text = String::new();
    let mut scores: Vec<f32> = Vec::new();

    for t in 0..steps {
        let mut max_idx = 0usize;
        let mut max_val = f32::NEG_INFINITY;
        for c in 0..classes {
            let v = output[[0, t, c]];
            if v > max_val {
                max_val = v;
                max_idx = c;
            }
        }

        // Class 0 is the CTC blank.
        if max_idx == 0 {
            continue;
        }
        if let Some(glyph) = dictionary.get(max_idx) {
            text.push_str(glyph);
            scores.push(max_val);
        }
    }

    let confidence = if scores.is_empty() {
        f32::NAN
    } else {
        scores.iter().sum::<f32>() / scores.len() as f32
    };

    Ok((text, confidence))
}
