//! Complete OCR engine orchestrating detection and recognition.

use tracing::{debug, info};

use crate::config::OcrConfig;
use crate::error::{OcrError, Result};
use crate::raster::{PadOptions, PixelBuffer};
use lector_inference::InferenceBackend;

use super::{OcrResult, RecognitionResult, TextDetector, TextRecognizer};

/// Raw interleaved pixel input for one [`OcrEngine::recognize`] call.
///
/// The channel count is implied: `data.len() / (width * height)` must be a
/// whole number between 1 and 4.
#[derive(Debug, Clone, Copy)]
pub struct RawImage<'a> {
    pub width: u32,
    pub height: u32,
    pub data: &'a [u8],
}

/// White fill for the optional outer padding; keeps text touching the image
/// edge detectable.
const OUTER_PAD_COLOR: [u8; 4] = [255, 255, 255, 255];

/// OCR engine combining a detection and a recognition session.
///
/// The engine owns both sessions; dropping it releases them. `recognize`
/// must not run concurrently on one engine unless the underlying runtime
/// documents concurrent `run` safety - use one engine per thread otherwise.
pub struct OcrEngine<B: InferenceBackend> {
    detector: TextDetector<B>,
    recognizer: TextRecognizer<B>,
    outer_padding: u32,
}

impl<B: InferenceBackend> std::fmt::Debug for OcrEngine<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OcrEngine")
            .field("outer_padding", &self.outer_padding)
            .finish_non_exhaustive()
    }
}

impl<B: InferenceBackend> OcrEngine<B> {
    /// Build an engine from two model sessions and a configuration.
    pub fn new(detection_backend: B, recognition_backend: B, config: OcrConfig) -> Result<Self> {
        if config.recognition.characters_dictionary.is_empty() {
            return Err(OcrError::Config(
                "recognition characters dictionary is empty".to_string(),
            ));
        }

        let outer_padding = config.detection.padding;
        Ok(Self {
            detector: TextDetector::new(detection_backend, config.detection),
            recognizer: TextRecognizer::new(recognition_backend, config.recognition),
            outer_padding,
        })
    }

    /// Detect and recognize all text in `input`.
    ///
    /// Results come back in reading order. With a nonzero
    /// `detection.padding` the reported boxes are relative to the padded
    /// canvas, offset by that padding from the original image.
    pub fn recognize(&self, input: RawImage<'_>) -> Result<Vec<RecognitionResult>> {
        let image = validate_input(&input)?;
        info!(
            "Processing {}x{} image with {} channels",
            image.width(),
            image.height(),
            image.channels()
        );

        let image = if self.outer_padding > 0 {
            image.pad(&PadOptions::uniform(self.outer_padding, OUTER_PAD_COLOR))
        } else {
            image
        };

        let boxes = self.detector.detect(&image)?;
        if boxes.is_empty() {
            debug!("No text regions detected");
            return Ok(Vec::new());
        }

        let results = self.recognizer.recognize(&image, &boxes)?;
        info!("Recognized {} text regions", results.len());
        Ok(results)
    }

    /// Group reading-order results into lines and join their text.
    pub fn process_recognition(&self, results: &[RecognitionResult]) -> OcrResult {
        OcrResult::from_reading_order(results)
    }
}

#[cfg(feature = "native")]
impl OcrEngine<lector_inference::OrtBackend> {
    /// Build an engine with native ONNX Runtime sessions created from
    /// already-materialized model byte buffers.
    pub fn from_model_bytes(
        detection_model: &[u8],
        recognition_model: &[u8],
        config: OcrConfig,
    ) -> Result<Self> {
        if detection_model.is_empty() {
            return Err(OcrError::Config("detection model buffer is empty".to_string()));
        }
        if recognition_model.is_empty() {
            return Err(OcrError::Config(
                "recognition model buffer is empty".to_string(),
            ));
        }

        let detection = lector_inference::OrtBackend::from_bytes(detection_model)?;
        let recognition = lector_inference::OrtBackend::from_bytes(recognition_model)?;
        Self::new(detection, recognition, config)
    }
}

/// Check the implied channel count and wrap the bytes into a pixel buffer.
fn validate_input(input: &RawImage<'_>) -> Result<PixelBuffer> {
    if input.width == 0 || input.height == 0 {
        return Err(OcrError::Input(format!(
            "image dimensions {}x{} are empty",
            input.width, input.height
        )));
    }

    let pixels = input.width as usize * input.height as usize;
    let channels = input.data.len() as f64 / pixels as f64;
    if channels.fract() != 0.0 || !(1.0..=4.0).contains(&channels) {
        return Err(OcrError::Input(format!(
            "buffer of {} bytes implies {} channels for a {}x{} image, expected 1 to 4",
            input.data.len(),
            channels,
            input.width,
            input.height
        )));
    }

    PixelBuffer::from_raw(
        input.width,
        input.height,
        channels as usize,
        input.data.to_vec(),
    )
    .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DetectionConfig, RecognitionConfig};
    use lector_inference::{InferenceError, Tensor};
    use pretty_assertions::assert_eq;

    /// Detection stub: lights up the map block `[h/4, h/2) x [w/4, w/2)`
    /// regardless of pixel content, under the legacy fallback output name.
    struct StubDetection {
        inputs: Vec<String>,
        outputs: Vec<String>,
    }

    impl StubDetection {
        fn new() -> Self {
            Self {
                inputs: vec!["x".to_string()],
                outputs: Vec::new(),
            }
        }
    }

    impl InferenceBackend for StubDetection {
        fn run(
            &self,
            inputs: &[(&str, Tensor)],
        ) -> lector_inference::Result<Vec<(String, Tensor)>> {
            let shape = inputs[0].1.shape().to_vec();
            let (h, w) = (shape[2], shape[3]);
            let mut map = vec![0.0f32; h * w];
            for y in h / 4..h / 2 {
                for x in w / 4..w / 2 {
                    map[y * w + x] = 1.0;
                }
            }
            Ok(vec![(
                "fetch_name_0".to_string(),
                Tensor::from_shape_vec(&[1, 1, h, w], map)?,
            )])
        }

        fn input_names(&self) -> &[String] {
            &self.inputs
        }

        fn output_names(&self) -> &[String] {
            &self.outputs
        }
    }

    /// Recognition stub: always answers argmax classes [1, 0, 2] with
    /// scores [0.9, 0.99, 0.8] under a declared output name.
    struct StubRecognition {
        inputs: Vec<String>,
        outputs: Vec<String>,
    }

    impl StubRecognition {
        fn new() -> Self {
            Self {
                inputs: vec!["x".to_string()],
                outputs: vec!["softmax_0.tmp_0".to_string()],
            }
        }
    }

    impl InferenceBackend for StubRecognition {
        fn run(
            &self,
            _inputs: &[(&str, Tensor)],
        ) -> lector_inference::Result<Vec<(String, Tensor)>> {
            let classes = 4;
            let mut data = vec![0.0f32; 3 * classes];
            data[1] = 0.9;
            data[classes] = 0.99;
            data[2 * classes + 2] = 0.8;
            Ok(vec![(
                "softmax_0.tmp_0".to_string(),
                Tensor::from_shape_vec(&[1, 3, classes], data)?,
            )])
        }

        fn input_names(&self) -> &[String] {
            &self.inputs
        }

        fn output_names(&self) -> &[String] {
            &self.outputs
        }
    }

    /// Backend that fails every run; detection paths should never tolerate
    /// this silently.
    struct FailingBackend {
        names: Vec<String>,
    }

    impl InferenceBackend for FailingBackend {
        fn run(
            &self,
            _inputs: &[(&str, Tensor)],
        ) -> lector_inference::Result<Vec<(String, Tensor)>> {
            Err(InferenceError::InferenceFailed("boom".to_string()))
        }

        fn input_names(&self) -> &[String] {
            &self.names
        }

        fn output_names(&self) -> &[String] {
            &self.names
        }
    }

    fn test_config() -> OcrConfig {
        OcrConfig {
            detection: DetectionConfig {
                max_side_length: 64,
                minimum_area_threshold: 4,
                ..DetectionConfig::default()
            },
            recognition: RecognitionConfig {
                characters_dictionary: ["", "a", "b", "c"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
                ..RecognitionConfig::default()
            },
        }
    }

    fn engine() -> OcrEngine<Box<dyn InferenceBackend>> {
        OcrEngine::new(
            Box::new(StubDetection::new()) as Box<dyn InferenceBackend>,
            Box::new(StubRecognition::new()),
            test_config(),
        )
        .unwrap()
    }

    #[test]
    fn empty_dictionary_is_a_config_error() {
        let mut config = test_config();
        config.recognition.characters_dictionary.clear();
        let err = OcrEngine::new(
            Box::new(StubDetection::new()) as Box<dyn InferenceBackend>,
            Box::new(StubRecognition::new()),
            config,
        )
        .unwrap_err();
        assert!(matches!(err, OcrError::Config(_)));
    }

    #[test]
    fn rejects_fractional_channel_counts() {
        let engine = engine();
        let data = vec![0u8; 10];
        let err = engine
            .recognize(RawImage {
                width: 2,
                height: 2,
                data: &data,
            })
            .unwrap_err();
        match err {
            OcrError::Input(msg) => assert!(msg.contains("2.5"), "message was: {msg}"),
            other => panic!("expected input error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_out_of_range_channel_counts() {
        let engine = engine();
        let data = vec![0u8; 2 * 2 * 5];
        let err = engine
            .recognize(RawImage {
                width: 2,
                height: 2,
                data: &data,
            })
            .unwrap_err();
        assert!(matches!(err, OcrError::Input(_)));
    }

    #[test]
    fn recognizes_the_stubbed_region() {
        let engine = engine();
        let data = vec![255u8; 64 * 64 * 4];
        let results = engine
            .recognize(RawImage {
                width: 64,
                height: 64,
                data: &data,
            })
            .unwrap();

        assert_eq!(results.len(), 1);
        let r = &results[0];
        // Blank at step 1 is skipped, repeats are kept as-is.
        assert_eq!(r.text, "ab");
        assert!((r.confidence - 0.85).abs() < 1e-6);
        assert!(r.bbox.right() <= 64);
        assert!(r.bbox.bottom() <= 64);
        assert!(!r.bbox.is_empty());
    }

    #[test]
    fn outer_padding_offsets_the_canvas() {
        let mut config = test_config();
        config.detection.padding = 4;
        config.detection.max_side_length = 72;
        let engine = OcrEngine::new(
            Box::new(StubDetection::new()) as Box<dyn InferenceBackend>,
            Box::new(StubRecognition::new()),
            config,
        )
        .unwrap();

        let data = vec![255u8; 64 * 64 * 4];
        let results = engine
            .recognize(RawImage {
                width: 64,
                height: 64,
                data: &data,
            })
            .unwrap();

        // Boxes live on the 72x72 padded canvas.
        assert_eq!(results.len(), 1);
        assert!(results[0].bbox.right() <= 72);
        assert!(results[0].bbox.bottom() <= 72);
    }

    /// Recognition stub that declares one output name but returns another.
    struct MisnamedRecognition {
        inputs: Vec<String>,
        outputs: Vec<String>,
    }

    impl InferenceBackend for MisnamedRecognition {
        fn run(
            &self,
            _inputs: &[(&str, Tensor)],
        ) -> lector_inference::Result<Vec<(String, Tensor)>> {
            Ok(vec![(
                "argmax_0.tmp_0".to_string(),
                Tensor::from_shape_vec(&[1, 1, 4], vec![0.0; 4])?,
            )])
        }

        fn input_names(&self) -> &[String] {
            &self.inputs
        }

        fn output_names(&self) -> &[String] {
            &self.outputs
        }
    }

    #[test]
    fn recognition_missing_output_is_fatal() {
        let engine = OcrEngine::new(
            Box::new(StubDetection::new()) as Box<dyn InferenceBackend>,
            Box::new(MisnamedRecognition {
                inputs: vec!["x".to_string()],
                outputs: vec!["softmax_0.tmp_0".to_string()],
            }),
            test_config(),
        )
        .unwrap();

        let data = vec![255u8; 64 * 64 * 4];
        let err = engine
            .recognize(RawImage {
                width: 64,
                height: 64,
                data: &data,
            })
            .unwrap_err();
        match err {
            OcrError::MissingOutput {
                expected,
                available,
            } => {
                assert_eq!(expected, "softmax_0.tmp_0");
                assert_eq!(available, vec!["argmax_0.tmp_0".to_string()]);
            }
            other => panic!("expected missing-output error, got {other:?}"),
        }
    }

    #[test]
    fn detection_inference_failure_propagates() {
        let engine = OcrEngine::new(
            Box::new(FailingBackend { names: Vec::new() }) as Box<dyn InferenceBackend>,
            Box::new(StubRecognition::new()),
            test_config(),
        )
        .unwrap();

        let data = vec![255u8; 64 * 64 * 4];
        let err = engine
            .recognize(RawImage {
                width: 64,
                height: 64,
                data: &data,
            })
            .unwrap_err();
        assert!(matches!(err, OcrError::Inference(_)));
    }

    #[test]
    fn process_recognition_delegates_to_line_grouping() {
        let engine = engine();
        let results = vec![
            RecognitionResult {
                text: "hello".to_string(),
                bbox: crate::ocr::TextBox::new(0, 10, 40, 20),
                confidence: 1.0,
            },
            RecognitionResult {
                text: "world".to_string(),
                bbox: crate::ocr::TextBox::new(50, 12, 40, 20),
                confidence: 0.5,
            },
        ];
        let grouped = engine.process_recognition(&results);
        assert_eq!(grouped.text, "hello world");
        assert_eq!(grouped.lines.len(), 1);
        assert!((grouped.confidence - 0.75).abs() < 1e-6);
    }
}
