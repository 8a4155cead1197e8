//! Portable OCR pipeline around the PaddleOCR PP-OCR models.
//!
//! This crate provides:
//! - Pixel-buffer primitives (crop, triangle resize, pad, tensor packing,
//!   thresholding, dilation, connected components)
//! - Text detection over the PP-OCR DB probability map
//! - Text recognition with greedy CTC decoding
//! - An engine orchestrating both with reading-order line grouping
//!
//! The ONNX runtime sits behind the [`InferenceBackend`] trait from
//! `lector-inference`; the pipeline itself never touches a concrete runtime.

pub mod config;
pub mod error;
pub mod ocr;
pub mod raster;

pub use config::{DetectionConfig, OcrConfig, RecognitionConfig};
pub use error::{OcrError, RasterError, Result};
pub use ocr::{
    OcrEngine, OcrResult, RawImage, RecognitionResult, TextBox, TextDetector, TextRecognizer,
};
pub use raster::{PadOptions, PixelBuffer, ResizeTarget};

/// Re-export inference types.
pub use lector_inference::{InferenceBackend, InferenceError, Tensor};

#[cfg(feature = "native")]
pub use lector_inference::OrtBackend;

#[cfg(feature = "wasm")]
pub use lector_inference::TractBackend;
