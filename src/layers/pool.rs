use serde::{Serialize, Deserialize};

use crate::math::tensor::Tensor;

/// Non-overlapping max pooling (stride equals window size). Trailing rows and
/// columns that do not fill a whole window are dropped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaxPool2d {
    pub size: usize,
}

impl MaxPool2d {
    fn dims(&self, input: &Tensor) -> Result<(usize, usize, usize, usize, usize), String> {
        let (c, h, w) = input.dims3().ok_or("expected a (channels, height, width) tensor")?;
        if self.size == 0 || h < self.size || w < self.size {
            return Err(format!("window {} does not fit a {}x{} input", self.size, h, w));
        }
        Ok((c, h, w, h / self.size, w / self.size))
    }

    /// Flat input index of the maximum inside window `(oy, ox)` of channel
    /// `c`. The first maximum in scan order wins.
    fn argmax(&self, input: &Tensor, c: usize, oy: usize, ox: usize) -> usize {
        let (_, h, w) = input.dims3().unwrap_or_default();
        let mut best = (c * h + oy * self.size) * w + ox * self.size;
        for ky in 0..self.size {
            for kx in 0..self.size {
                let idx = (c * h + oy * self.size + ky) * w + ox * self.size + kx;
                if input.data[idx] > input.data[best] {
                    best = idx;
                }
            }
        }
        best
    }

    pub fn forward(&self, input: &Tensor) -> Result<Tensor, String> {
        let (c, _, _, oh, ow) = self.dims(input)?;
        let mut out = Tensor::zeros(&[c, oh, ow]);
        for ch in 0..c {
            for oy in 0..oh {
                for ox in 0..ow {
                    out.data[(ch * oh + oy) * ow + ox] = input.data[self.argmax(input, ch, oy, ox)];
                }
            }
        }
        Ok(out)
    }

    /// Routes each output gradient to the position that won the max.
    pub fn backward(&self, input: &Tensor, grad_output: &Tensor) -> Result<Tensor, String> {
        let (c, _, _, oh, ow) = self.dims(input)?;
        if grad_output.shape != [c, oh, ow] {
            return Err(format!("gradient shape {:?} does not match output", grad_output.shape));
        }
        let mut grad_input = Tensor::zeros(&input.shape);
        for ch in 0..c {
            for oy in 0..oh {
                for ox in 0..ow {
                    grad_input.data[self.argmax(input, ch, oy, ox)] +=
                        grad_output.data[(ch * oh + oy) * ow + ox];
                }
            }
        }
        Ok(grad_input)
    }
}

/// Averages every channel over its spatial extent: `(C, H, W)` → `(C, 1, 1)`.
pub fn global_avg_pool(input: &Tensor) -> Result<Tensor, String> {
    let (c, h, w) = input.dims3().ok_or("expected a (channels, height, width) tensor")?;
    if h * w == 0 {
        return Err("cannot pool an empty feature map".into());
    }
    let area = (h * w) as f64;
    let data = (0..c).map(|ch| input.channel(ch).iter().sum::<f64>() / area).collect();
    Ok(Tensor::from_vec(&[c, 1, 1], data))
}

/// Spreads each channel's gradient evenly over its spatial positions.
pub fn global_avg_pool_backward(input: &Tensor, grad_output: &Tensor) -> Result<Tensor, String> {
    let (c, h, w) = input.dims3().ok_or("expected a (channels, height, width) tensor")?;
    if grad_output.len() != c {
        return Err(format!("gradient has {} values for {} channels", grad_output.len(), c));
    }
    let area = (h * w) as f64;
    let mut grad_input = Tensor::zeros(&input.shape);
    for ch in 0..c {
        let g = grad_output.data[ch] / area;
        for v in &mut grad_input.data[ch * h * w..(ch + 1) * h * w] {
            *v = g;
        }
    }
    Ok(grad_input)
}
