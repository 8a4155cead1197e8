//! Float32 tensor type exchanged with inference backends.

use ndarray::{ArrayD, IxDyn};

use crate::{InferenceError, Result};

/// A float32 tensor with dynamic shape.
///
/// Both PP-OCR model contracts in scope are single-input, single-output
/// float32 graphs, so this wraps an `ArrayD<f32>` rather than dispatching
/// over dtypes.
#[derive(Debug, Clone)]
pub struct Tensor(ArrayD<f32>);

impl Tensor {
    /// Create a tensor from a flat buffer and its shape.
    ///
    /// Fails when `data.len()` does not match the product of `shape`.
    pub fn from_shape_vec(shape: &[usize], data: Vec<f32>) -> Result<Self> {
        ArrayD::from_shape_vec(IxDyn(shape), data)
            .map(Tensor)
            .map_err(|e| InferenceError::InvalidInput(e.to_string()))
    }

    /// Get the shape of the tensor.
    pub fn shape(&self) -> &[usize] {
        self.0.shape()
    }

    /// Borrow the underlying array.
    pub fn array(&self) -> &ArrayD<f32> {
        &self.0
    }

    /// Consume the tensor, yielding the underlying array.
    pub fn into_array(self) -> ArrayD<f32> {
        self.0
    }
}

impl From<ArrayD<f32>> for Tensor {
    fn from(arr: ArrayD<f32>) -> Self {
        Tensor(arr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn from_shape_vec_roundtrip() {
        let t = Tensor::from_shape_vec(&[1, 2, 3], vec![0.0; 6]).unwrap();
        assert_eq!(t.shape(), &[1, 2, 3]);
        assert_eq!(t.array().len(), 6);
    }

    #[test]
    fn from_shape_vec_rejects_mismatch() {
        let err = Tensor::from_shape_vec(&[2, 2], vec![0.0; 3]).unwrap_err();
        assert!(matches!(err, InferenceError::InvalidInput(_)));
    }
}
