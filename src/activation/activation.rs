use serde::{Serialize, Deserialize};

/// Element-wise non-linearity applied by an activation layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ActivationFunction {
    Sigmoid,
    ReLU,
    Identity,
    Tanh,
    LeakyReLU { alpha: f64 },
}

impl ActivationFunction {
    pub fn function(&self, x: f64) -> f64 {
        match self {
            ActivationFunction::Sigmoid => 1.0 / (1.0 + (-x).exp()),
            ActivationFunction::ReLU => if x > 0.0 { x } else { 0.0 },
            ActivationFunction::Identity => x,
            ActivationFunction::Tanh => x.tanh(),
            ActivationFunction::LeakyReLU { alpha } => if x > 0.0 { x } else { alpha * x },
        }
    }

    /// Derivative evaluated at the pre-activation value `x`.
    ///
    /// ReLU uses 0 at exactly `x == 0`, matching the subgradient autodiff
    /// frameworks pick.
    pub fn derivative(&self, x: f64) -> f64 {
        match self {
            ActivationFunction::Sigmoid => {
                let fx = self.function(x);
                fx * (1.0 - fx)
            },
            ActivationFunction::ReLU => if x > 0.0 { 1.0 } else { 0.0 },
            ActivationFunction::Identity => 1.0,
            ActivationFunction::Tanh => {
                let t = x.tanh();
                1.0 - t * t
            }
            ActivationFunction::LeakyReLU { alpha } => if x > 0.0 { 1.0 } else { *alpha },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn sigmoid_derivative_matches_finite_difference() {
        let f = ActivationFunction::Sigmoid;
        let h = 1e-6;
        for &x in &[-2.0, -0.3, 0.0, 1.7] {
            let numeric = (f.function(x + h) - f.function(x - h)) / (2.0 * h);
            assert_abs_diff_eq!(f.derivative(x), numeric, epsilon = 1e-6);
        }
    }

    #[test]
    fn relu_clips_negatives() {
        let f = ActivationFunction::ReLU;
        assert_eq!(f.function(-3.0), 0.0);
        assert_eq!(f.function(2.5), 2.5);
        assert_eq!(f.derivative(0.0), 0.0);
    }

    #[test]
    fn leaky_relu_keeps_a_slope() {
        let f = ActivationFunction::LeakyReLU { alpha: 0.1 };
        assert_abs_diff_eq!(f.function(-2.0), -0.2);
        assert_abs_diff_eq!(f.derivative(-2.0), 0.1);
    }
}
