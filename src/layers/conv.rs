use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::math::{matrix::Matrix, tensor::Tensor};

/// 2D convolution over a `(channels, height, width)` feature map.
///
/// Weights are stored flat in `(out_channels, in_channels, kernel, kernel)`
/// order; biases hold one value per output channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conv2d {
    pub in_channels: usize,
    pub out_channels: usize,
    pub kernel: usize,
    pub stride: usize,
    pub padding: usize,
    pub weights: Vec<f64>,
    pub biases: Vec<f64>,
}

impl Conv2d {
    /// He-initialized convolution with zero biases.
    pub fn new<R: Rng + ?Sized>(
        in_channels: usize,
        out_channels: usize,
        kernel: usize,
        stride: usize,
        padding: usize,
        rng: &mut R,
    ) -> Conv2d {
        let fan_in = (in_channels * kernel * kernel).max(1);
        let std_dev = (2.0 / fan_in as f64).sqrt();
        let weights = (0..out_channels * in_channels * kernel * kernel)
            .map(|_| Matrix::sample_standard_normal(rng) * std_dev)
            .collect();
        Conv2d {
            in_channels,
            out_channels,
            kernel,
            stride,
            padding,
            weights,
            biases: vec![0.0; out_channels],
        }
    }

    /// Output spatial size for an input of `(height, width)`.
    pub fn output_size(&self, height: usize, width: usize) -> Option<(usize, usize)> {
        let ph = height + 2 * self.padding;
        let pw = width + 2 * self.padding;
        if self.stride == 0 || self.kernel == 0 || ph < self.kernel || pw < self.kernel {
            return None;
        }
        Some(((ph - self.kernel) / self.stride + 1, (pw - self.kernel) / self.stride + 1))
    }

    #[inline]
    fn weight(&self, o: usize, c: usize, ky: usize, kx: usize) -> f64 {
        let k = self.kernel;
        self.weights[((o * self.in_channels + c) * k + ky) * k + kx]
    }

    fn check_input(&self, input: &Tensor) -> Result<(usize, usize, usize, usize), String> {
        let expected = self.out_channels * self.in_channels * self.kernel * self.kernel;
        if self.weights.len() != expected || self.biases.len() != self.out_channels {
            return Err(format!(
                "weights hold {} values and biases {}, expected {} and {}",
                self.weights.len(), self.biases.len(), expected, self.out_channels
            ));
        }
        let (c, h, w) = input.dims3().ok_or("expected a (channels, height, width) tensor")?;
        if c != self.in_channels {
            return Err(format!("expected {} channels, got {}", self.in_channels, c));
        }
        let (oh, ow) = self.output_size(h, w)
            .ok_or_else(|| format!("kernel {} does not fit a {}x{} input", self.kernel, h, w))?;
        Ok((h, w, oh, ow))
    }

    pub fn forward(&self, input: &Tensor) -> Result<Tensor, String> {
        let (h, w, oh, ow) = self.check_input(input)?;
        let mut out = Tensor::zeros(&[self.out_channels, oh, ow]);

        for o in 0..self.out_channels {
            for oy in 0..oh {
                for ox in 0..ow {
                    let mut sum = self.biases[o];
                    for c in 0..self.in_channels {
                        let plane = input.channel(c);
                        for ky in 0..self.kernel {
                            let iy = (oy * self.stride + ky) as isize - self.padding as isize;
                            if iy < 0 || iy >= h as isize {
                                continue;
                            }
                            for kx in 0..self.kernel {
                                let ix = (ox * self.stride + kx) as isize - self.padding as isize;
                                if ix < 0 || ix >= w as isize {
                                    continue;
                                }
                                sum += plane[iy as usize * w + ix as usize] * self.weight(o, c, ky, kx);
                            }
                        }
                    }
                    out.data[(o * oh + oy) * ow + ox] = sum;
                }
            }
        }

        Ok(out)
    }

    /// Gradient w.r.t. the input (a transposed convolution of `grad_output`).
    pub fn backward(&self, input: &Tensor, grad_output: &Tensor) -> Result<Tensor, String> {
        let (h, w, oh, ow) = self.check_input(input)?;
        if grad_output.shape != [self.out_channels, oh, ow] {
            return Err(format!(
                "gradient shape {:?} does not match output shape {:?}",
                grad_output.shape, [self.out_channels, oh, ow]
            ));
        }
        let mut grad_input = Tensor::zeros(&input.shape);

        for o in 0..self.out_channels {
            for oy in 0..oh {
                for ox in 0..ow {
                    let g = grad_output.data[(o * oh + oy) * ow + ox];
                    if g == 0.0 {
                        continue;
                    }
                    for c in 0..self.in_channels {
                        for ky in 0..self.kernel {
                            let iy = (oy * self.stride + ky) as isize - self.padding as isize;
                            if iy < 0 || iy >= h as isize {
                                continue;
                            }
                            for kx in 0..self.kernel {
                                let ix = (ox * self.stride + kx) as isize - self.padding as isize;
                                if ix < 0 || ix >= w as isize {
                                    continue;
                                }
                                grad_input.data[(c * h + iy as usize) * w + ix as usize] +=
                                    g * self.weight(o, c, ky, kx);
                            }
                        }
                    }
                }
            }
        }

        Ok(grad_input)
    }
}
