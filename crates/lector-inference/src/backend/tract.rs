//! Tract backend for cross-platform ONNX inference.

use ndarray::ArrayD;
use tract_onnx::prelude::*;
use tracing::debug;

use crate::error::InferenceError;
use crate::{InferenceBackend, Result, Tensor};

/// Backend using Tract for cross-platform ONNX inference.
///
/// Tract compiles the graph for one concrete input shape, so the shape must
/// be supplied at load time. The detection model works with any 32-multiple
/// canvas it was loaded for; for recognition the caller fixes a maximum
/// width and pads crops up to it.
pub struct TractBackend {
    model: SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>,
    input_names: Vec<String>,
    output_names: Vec<String>,
}

impl TractBackend {
    /// Load a model from bytes with the input shape it will be run with.
    pub fn from_bytes_with_shape(bytes: &[u8], input_shape: &[usize]) -> Result<Self> {
        debug!(
            "Loading ONNX model with Tract from {} bytes, input shape {:?}",
            bytes.len(),
            input_shape
        );

        let mut model = tract_onnx::onnx()
            .model_for_read(&mut std::io::Cursor::new(bytes))
            .map_err(|e| InferenceError::ModelLoad(e.to_string()))?;

        // Pin the dynamic dimensions to the concrete shape.
        model
            .set_input_fact(0, InferenceFact::dt_shape(f32::datum_type(), input_shape))
            .map_err(|e| InferenceError::ModelLoad(format!("failed to set input shape: {}", e)))?;

        let model = model
            .into_typed()
            .map_err(|e| InferenceError::ModelLoad(format!("failed to type model: {}", e)))?
            .into_optimized()
            .map_err(|e| InferenceError::ModelLoad(format!("failed to optimize: {}", e)))?
            .into_runnable()
            .map_err(|e| InferenceError::SessionCreate(e.to_string()))?;

        // Tract does not expose the graph's tensor names after optimization.
        let input_names = vec!["x".to_string()];
        let output_names = vec!["output".to_string()];

        Ok(Self {
            model,
            input_names,
            output_names,
        })
    }

    fn convert_input(&self, tensor: &Tensor) -> Result<TValue> {
        let shape: TVec<usize> = tensor.shape().iter().cloned().collect();
        let data: Vec<f32> = tensor.array().iter().cloned().collect();
        let tract_tensor =
            tract_ndarray::ArrayD::from_shape_vec(tract_ndarray::IxDyn(shape.as_slice()), data)
                .map_err(|e| InferenceError::InvalidInput(e.to_string()))?;
        Ok(tract_tensor.into_tvalue())
    }
}

impl InferenceBackend for TractBackend {
    fn run(&self, inputs: &[(&str, Tensor)]) -> Result<Vec<(String, Tensor)>> {
        let tract_inputs: TVec<TValue> = inputs
            .iter()
            .map(|(_, tensor)| self.convert_input(tensor))
            .collect::<Result<TVec<_>>>()?;

        let outputs = self
            .model
            .run(tract_inputs)
            .map_err(|e| InferenceError::InferenceFailed(e.to_string()))?;

        let mut results = Vec::with_capacity(outputs.len());

        for (idx, output) in outputs.iter().enumerate() {
            let name = self
                .output_names
                .get(idx)
                .cloned()
                .unwrap_or_else(|| format!("output_{}", idx));

            let view = output.to_array_view::<f32>().map_err(|e| {
                InferenceError::OutputExtraction(format!("non-float32 output '{}': {}", name, e))
            })?;
            let shape: Vec<usize> = view.shape().to_vec();
            let data: Vec<f32> = view.iter().cloned().collect();
            let arr = ArrayD::from_shape_vec(ndarray::IxDyn(&shape), data)
                .map_err(|e| InferenceError::OutputExtraction(e.to_string()))?;

            results.push((name, Tensor::from(arr)));
        }

        Ok(results)
    }

    fn input_names(&self) -> &[String] {
        &self.input_names
    }

    fn output_names(&self) -> &[String] {
        &self.output_names
    }
}
