use serde::{Serialize, Deserialize};

/// N-dimensional array with flat row-major storage.
///
/// Image activations use the `(channels, height, width)` layout; the network
/// input carries an extra leading batch axis, `(1, 1, height, width)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tensor {
    pub shape: Vec<usize>,
    pub data: Vec<f64>,
}

impl Tensor {
    pub fn zeros(shape: &[usize]) -> Tensor {
        let len = shape.iter().product();
        Tensor { shape: shape.to_vec(), data: vec![0.0; len] }
    }

    /// Wraps `data` with the given shape.
    ///
    /// # Panics
    /// Panics if `data.len()` does not equal the product of `shape`.
    pub fn from_vec(shape: &[usize], data: Vec<f64>) -> Tensor {
        let len: usize = shape.iter().product();
        assert_eq!(len, data.len(), "tensor data does not match shape {:?}", shape);
        Tensor { shape: shape.to_vec(), data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of axes.
    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// Returns the `(channels, height, width)` dimensions of a rank-3 tensor.
    pub fn dims3(&self) -> Option<(usize, usize, usize)> {
        match self.shape.as_slice() {
            &[c, h, w] => Some((c, h, w)),
            _ => None,
        }
    }

    /// Removes leading axes of size one until the tensor has `rank` axes.
    /// Returns `None` if a leading axis larger than one would have to go.
    pub fn squeeze_leading(&self, rank: usize) -> Option<Tensor> {
        if self.rank() < rank {
            return None;
        }
        let extra = self.rank() - rank;
        if self.shape[..extra].iter().any(|&d| d != 1) {
            return None;
        }
        Some(Tensor { shape: self.shape[extra..].to_vec(), data: self.data.clone() })
    }

    pub fn reshape(mut self, shape: &[usize]) -> Tensor {
        let len: usize = shape.iter().product();
        assert_eq!(len, self.data.len(), "cannot reshape {:?} into {:?}", self.shape, shape);
        self.shape = shape.to_vec();
        self
    }

    pub fn map<F>(&self, functor: F) -> Tensor
    where
        F: Fn(f64) -> f64,
    {
        Tensor {
            shape: self.shape.clone(),
            data: self.data.iter().map(|&x| functor(x)).collect(),
        }
    }

    /// True when no element is NaN or infinite.
    pub fn is_finite(&self) -> bool {
        self.data.iter().all(|x| x.is_finite())
    }

    /// Returns the contiguous `(height, width)` plane of channel `c` in a
    /// rank-3 tensor.
    pub fn channel(&self, c: usize) -> &[f64] {
        let (_, h, w) = self.dims3().expect("channel() requires a rank-3 tensor");
        &self.data[c * h * w..(c + 1) * h * w]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn squeeze_drops_batch_axis() {
        let t = Tensor::zeros(&[1, 3, 2, 2]);
        let s = t.squeeze_leading(3).unwrap();
        assert_eq!(s.shape, vec![3, 2, 2]);
    }

    #[test]
    fn squeeze_refuses_real_batches() {
        let t = Tensor::zeros(&[2, 3, 2, 2]);
        assert!(t.squeeze_leading(3).is_none());
    }

    #[test]
    fn channel_slices_planes() {
        let t = Tensor::from_vec(&[2, 1, 2], vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(t.channel(1), &[3.0, 4.0]);
    }

    #[test]
    fn detects_non_finite_values() {
        let t = Tensor::from_vec(&[2], vec![1.0, f64::NAN]);
        assert!(!t.is_finite());
    }
}
