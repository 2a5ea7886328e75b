use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::math::{matrix::Matrix, tensor::Tensor};

/// Fully connected layer: `z = x · W + b`.
///
/// The input is flattened, so a `(C, 1, 1)` pooled feature map feeds it
/// directly. Output shape is `[size]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dense {
    pub size: usize,
    pub weights: Matrix,
    pub biases: Matrix,
}

impl Dense {
    pub fn new<R: Rng + ?Sized>(size: usize, input_size: usize, rng: &mut R) -> Dense {
        Dense {
            size,
            weights: Matrix::he(input_size, size, rng),
            biases: Matrix::zeros(1, size),
        }
    }

    pub fn input_size(&self) -> usize {
        self.weights.rows
    }

    pub fn forward(&self, input: &Tensor) -> Result<Tensor, String> {
        self.check_input(input)?;
        let z = &(&Matrix::row(input.data.clone()) * &self.weights) + &self.biases;
        Ok(Tensor::from_vec(&[self.size], z.into_flat()))
    }

    /// Gradient w.r.t. the input: `∂L/∂x = ∂L/∂z · Wᵀ`, reshaped to the
    /// input's shape.
    pub fn backward(&self, input: &Tensor, grad_output: &Tensor) -> Result<Tensor, String> {
        self.check_input(input)?;
        if grad_output.len() != self.size {
            return Err(format!(
                "gradient has {} values, layer has {} outputs",
                grad_output.len(), self.size
            ));
        }
        let grad_x = &Matrix::row(grad_output.data.clone()) * &self.weights.transpose();
        Ok(Tensor::from_vec(&input.shape, grad_x.into_flat()))
    }

    fn check_input(&self, input: &Tensor) -> Result<(), String> {
        let w = &self.weights;
        if w.data.len() != w.rows || w.data.iter().any(|row| row.len() != w.cols) {
            return Err(format!("weights do not form a {}x{} matrix", w.rows, w.cols));
        }
        if w.cols != self.size {
            return Err(format!("weights have {} columns, layer has {} outputs", w.cols, self.size));
        }
        let b = &self.biases;
        if b.rows != 1 || b.cols != self.size || b.data.len() != 1 || b.data[0].len() != self.size {
            return Err(format!("biases must be 1x{}, got {}x{}", self.size, b.rows, b.cols));
        }
        if input.len() != self.input_size() {
            return Err(format!(
                "expected {} input values, got {}",
                self.input_size(), input.len()
            ));
        }
        Ok(())
    }
}
