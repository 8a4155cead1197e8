//! Error types for the lector-core library.

use thiserror::Error;

/// Errors from pixel-buffer operations.
///
/// These indicate misuse of the raster primitives and are fatal for the
/// call that triggered them.
#[derive(Error, Debug)]
pub enum RasterError {
    /// Crop rectangle reaches outside the source image.
    #[error(
        "crop rectangle ({x}, {y}) {width}x{height} exceeds image bounds {image_width}x{image_height}"
    )]
    CropOutOfBounds {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        image_width: u32,
        image_height: u32,
    },

    /// Resize called without a target width or height.
    #[error("resize requires a target width or height")]
    MissingResizeTarget,

    /// Morphological dilation only operates on single-channel images.
    #[error("dilation requires a single-channel image, got {0} channels")]
    NotGrayscale(usize),

    /// Buffer length does not match the declared geometry.
    #[error("pixel buffer of {actual} bytes does not match {width}x{height} with {channels} channels")]
    SizeMismatch {
        width: u32,
        height: u32,
        channels: usize,
        actual: usize,
    },

    /// Channel count outside the supported 1..=4 range.
    #[error("unsupported channel count: {0}")]
    UnsupportedChannels(usize),
}

/// Main error type for the lector OCR pipeline.
#[derive(Error, Debug)]
pub enum OcrError {
    /// Invalid pipeline configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Invalid caller-supplied input.
    #[error("invalid input: {0}")]
    Input(String),

    /// A raster operation failed.
    #[error("raster operation failed: {0}")]
    Raster(#[from] RasterError),

    /// Inference error from the inference layer.
    #[error("inference error: {0}")]
    Inference(#[from] lector_inference::InferenceError),

    /// Text detection failed.
    #[error("text detection failed: {0}")]
    Detection(String),

    /// Text recognition failed.
    #[error("text recognition failed: {0}")]
    Recognition(String),

    /// The recognition model produced no tensor under the expected name.
    #[error("missing output tensor '{expected}', model outputs: {available:?}")]
    MissingOutput {
        expected: String,
        available: Vec<String>,
    },
}

/// Result type for the lector library.
pub type Result<T> = std::result::Result<T, OcrError>;
