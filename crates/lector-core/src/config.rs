//! Configuration records for the OCR pipeline.

use serde::{Deserialize, Serialize};

/// Configuration for the detection stage.
///
/// `mean` and `std_deviation` are on the 0-255 scale; the tensor packer
/// multiplies by `1/std` and subtracts `mean/std`, which is the same as
/// `(px/255 - m)/s` for the unit-scale PaddleOCR constants.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Outer whitespace added around the input image, in pixels.
    /// Makes text touching the image edge detectable.
    pub padding: u32,

    /// Per-channel normalization mean (0-255 scale).
    pub mean: [f32; 3],

    /// Per-channel normalization standard deviation (0-255 scale).
    pub std_deviation: [f32; 3],

    /// Longest side of the canvas fed to the detection model.
    pub max_side_length: u32,

    /// Probability above which a map pixel counts as text.
    pub text_pixel_threshold: f32,

    /// Minimum connected-component area in map pixels.
    pub minimum_area_threshold: usize,

    /// Vertical box inflation as a fraction of box height.
    pub padding_box_vertical: f32,

    /// Horizontal box inflation as a fraction of box *height*.
    /// Height, not width: the margin tracks glyph size.
    pub padding_box_horizontal: f32,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            padding: 0,
            mean: [123.675, 116.28, 103.53],
            std_deviation: [58.395, 57.12, 57.375],
            max_side_length: 960,
            text_pixel_threshold: 0.5,
            minimum_area_threshold: 20,
            padding_box_vertical: 0.4,
            padding_box_horizontal: 0.6,
        }
    }
}

/// Configuration for the recognition stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognitionConfig {
    /// Per-channel normalization mean (0-255 scale).
    pub mean: [f32; 3],

    /// Per-channel normalization standard deviation (0-255 scale).
    pub std_deviation: [f32; 3],

    /// Fixed crop height fed to the recognition model; width scales with
    /// the crop's aspect ratio.
    pub image_height: u32,

    /// Glyph table indexed by model class id. Index 0 is the CTC blank.
    pub characters_dictionary: Vec<String>,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            mean: [127.5, 127.5, 127.5],
            std_deviation: [127.5, 127.5, 127.5],
            image_height: 48,
            characters_dictionary: Vec::new(),
        }
    }
}

/// Combined pipeline configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Detection stage settings.
    pub detection: DetectionConfig,

    /// Recognition stage settings.
    pub recognition: RecognitionConfig,
}

impl OcrConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
        std::fs::write(path, content)
    }
}
