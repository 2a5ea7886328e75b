//! Request-local observation of one named layer.
//!
//! A [`Tap`] is handed to [`Network::forward`](crate::Network::forward) and
//! [`Network::backward`](crate::Network::backward), which report the tapped
//! layer's output and the gradient flowing into that output. Nothing is
//! installed on the shared network: the tap owns its captures, and dropping it
//! is the teardown.

use crate::error::InferenceError;
use crate::math::tensor::Tensor;

#[derive(Debug, Clone)]
enum TapState {
    Armed,
    Forwarded { activation: Tensor },
    Complete { activation: Tensor, gradient: Tensor },
}

/// Capture slot for exactly one forward/backward execution on one layer.
#[derive(Debug, Clone)]
pub struct Tap {
    layer_index: usize,
    layer_name: String,
    state: TapState,
}

impl Tap {
    pub(crate) fn new(layer_index: usize, layer_name: impl Into<String>) -> Tap {
        Tap {
            layer_index,
            layer_name: layer_name.into(),
            state: TapState::Armed,
        }
    }

    pub fn layer_name(&self) -> &str {
        &self.layer_name
    }

    pub fn layer_index(&self) -> usize {
        self.layer_index
    }

    /// True until a forward pass has been observed: no activation and no
    /// gradient are held.
    pub fn is_clean(&self) -> bool {
        matches!(self.state, TapState::Armed)
    }

    pub fn activation(&self) -> Option<&Tensor> {
        match &self.state {
            TapState::Armed => None,
            TapState::Forwarded { activation } | TapState::Complete { activation, .. } => Some(activation),
        }
    }

    pub fn gradient(&self) -> Option<&Tensor> {
        match &self.state {
            TapState::Complete { gradient, .. } => Some(gradient),
            _ => None,
        }
    }

    pub(crate) fn observe_forward(&mut self, output: &Tensor) -> Result<(), InferenceError> {
        match self.state {
            TapState::Armed => {
                self.state = TapState::Forwarded { activation: output.clone() };
                Ok(())
            }
            _ => Err(InferenceError::TapReused(self.layer_name.clone())),
        }
    }

    pub(crate) fn observe_backward(&mut self, gradient: Tensor) -> Result<(), InferenceError> {
        match std::mem::replace(&mut self.state, TapState::Armed) {
            TapState::Forwarded { activation } => {
                self.state = TapState::Complete { activation, gradient };
                Ok(())
            }
            TapState::Armed => Err(InferenceError::TapIncomplete(self.layer_name.clone())),
            complete @ TapState::Complete { .. } => {
                self.state = complete;
                Err(InferenceError::TapReused(self.layer_name.clone()))
            }
        }
    }

    /// Consumes the tap, yielding `(activation, gradient)`.
    pub fn into_parts(self) -> Result<(Tensor, Tensor), InferenceError> {
        match self.state {
            TapState::Complete { activation, gradient } => Ok((activation, gradient)),
            _ => Err(InferenceError::TapIncomplete(self.layer_name)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_tap_is_clean() {
        let tap = Tap::new(3, "features.block4");
        assert!(tap.is_clean());
        assert!(tap.activation().is_none());
        assert!(tap.gradient().is_none());
    }

    #[test]
    fn completes_after_forward_then_backward() {
        let mut tap = Tap::new(0, "conv");
        tap.observe_forward(&Tensor::zeros(&[2, 1, 1])).unwrap();
        assert!(!tap.is_clean());
        tap.observe_backward(Tensor::from_vec(&[2, 1, 1], vec![1.0, 2.0])).unwrap();
        let (activation, gradient) = tap.into_parts().unwrap();
        assert_eq!(activation.shape, vec![2, 1, 1]);
        assert_eq!(gradient.data, vec![1.0, 2.0]);
    }

    #[test]
    fn second_forward_is_rejected() {
        let mut tap = Tap::new(0, "conv");
        tap.observe_forward(&Tensor::zeros(&[1])).unwrap();
        assert_eq!(
            tap.observe_forward(&Tensor::zeros(&[1])),
            Err(InferenceError::TapReused("conv".into()))
        );
    }

    #[test]
    fn backward_before_forward_is_rejected() {
        let mut tap = Tap::new(0, "conv");
        assert!(matches!(tap.observe_backward(Tensor::zeros(&[1])), Err(InferenceError::TapIncomplete(_))));
        assert!(tap.is_clean());
    }

    #[test]
    fn incomplete_tap_cannot_be_consumed() {
        let mut tap = Tap::new(0, "conv");
        tap.observe_forward(&Tensor::zeros(&[1])).unwrap();
        assert!(tap.into_parts().is_err());
    }
}
