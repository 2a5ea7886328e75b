use serde::{Serialize, Deserialize};

use crate::math::tensor::Tensor;

/// Inference-mode batch normalization folded into a per-channel affine map:
/// `y[c] = x[c] · scale[c] + shift[c]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchNorm {
    pub scale: Vec<f64>,
    pub shift: Vec<f64>,
}

impl BatchNorm {
    /// Same `scale` and `shift` on every channel.
    pub fn uniform(channels: usize, scale: f64, shift: f64) -> BatchNorm {
        BatchNorm { scale: vec![scale; channels], shift: vec![shift; channels] }
    }

    /// Folds running statistics and learned parameters into scale/shift.
    pub fn from_statistics(mean: &[f64], var: &[f64], gamma: &[f64], beta: &[f64], eps: f64) -> BatchNorm {
        let scale: Vec<f64> = var.iter().zip(gamma)
            .map(|(v, g)| g / (v + eps).sqrt())
            .collect();
        let shift = mean.iter().zip(beta).zip(&scale)
            .map(|((m, b), s)| b - m * s)
            .collect();
        BatchNorm { scale, shift }
    }

    fn check_input(&self, input: &Tensor) -> Result<usize, String> {
        let (c, h, w) = input.dims3().ok_or("expected a (channels, height, width) tensor")?;
        if self.scale.len() != c || self.shift.len() != c {
            return Err(format!("expected {} channels, got {}", self.scale.len(), c));
        }
        Ok(h * w)
    }

    pub fn forward(&self, input: &Tensor) -> Result<Tensor, String> {
        let area = self.check_input(input)?;
        let data = input.data.iter().enumerate()
            .map(|(i, &x)| {
                let c = i / area;
                x * self.scale[c] + self.shift[c]
            })
            .collect();
        Ok(Tensor::from_vec(&input.shape, data))
    }

    pub fn backward(&self, input: &Tensor, grad_output: &Tensor) -> Result<Tensor, String> {
        let area = self.check_input(input)?;
        if grad_output.shape != input.shape {
            return Err(format!("gradient shape {:?} does not match input", grad_output.shape));
        }
        let data = grad_output.data.iter().enumerate()
            .map(|(i, &g)| g * self.scale[i / area])
            .collect();
        Ok(Tensor::from_vec(&input.shape, data))
    }
}
