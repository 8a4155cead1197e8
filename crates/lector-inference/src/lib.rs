//! ONNX inference abstraction layer for lector.
//!
//! This crate provides a unified interface for running the PP-OCR ONNX models
//! across different backends:
//! - `ort` with XNNPACK execution provider for native platforms
//! - `tract` directly for WASM/browser environments
//!
//! The OCR pipeline only ever exchanges float32 tensors with its models, so
//! the tensor type here is fixed to `f32`.

mod backend;
mod error;
mod tensor;

pub use backend::InferenceBackend;
pub use error::InferenceError;
pub use tensor::Tensor;

#[cfg(feature = "native")]
pub use backend::ort::OrtBackend;

#[cfg(feature = "wasm")]
pub use backend::tract::TractBackend;

/// Result type for inference operations.
pub type Result<T> = std::result::Result<T, InferenceError>;
