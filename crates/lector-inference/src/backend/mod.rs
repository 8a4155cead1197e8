//! Inference backend implementations.

#[cfg(feature = "native")]
pub mod ort;

#[cfg(feature = "wasm")]
pub mod tract;

use crate::{Result, Tensor};

/// Trait for ONNX inference backends.
///
/// This trait abstracts over different ONNX runtime implementations,
/// allowing the same pipeline to run on native platforms (via ort) and
/// in the browser (via tract). One backend owns one model session.
pub trait InferenceBackend: Send + Sync {
    /// Run inference with the given named input tensors.
    ///
    /// Returns the named output tensors produced by the model.
    fn run(&self, inputs: &[(&str, Tensor)]) -> Result<Vec<(String, Tensor)>>;

    /// Get the input names expected by the model.
    fn input_names(&self) -> &[String];

    /// Get the output names produced by the model.
    fn output_names(&self) -> &[String];
}

impl<T: InferenceBackend + ?Sized> InferenceBackend for Box<T> {
    fn run(&self, inputs: &[(&str, Tensor)]) -> Result<Vec<(String, Tensor)>> {
        (**self).run(inputs)
    }

    fn input_names(&self) -> &[String] {
        (**self).input_names()
    }

    fn output_names(&self) -> &[String] {
        (**self).output_names()
    }
}
