//! Convolution building blocks shared by the filters and the selection mask.

use crate::{color::Color, raster::Raster, util::to_channel};

/// Normalized 1D Gaussian kernel for `sigma`, truncated at four sigma.
/// Non-positive or non-finite sigma gives the identity kernel.
#[must_use]
pub fn gaussian_kernel(sigma: f32) -> Vec<f32> {
    if !sigma.is_finite() || sigma <= 0.0 {
        return vec![1.0];
    }
    // Truncated, so small and positive. The cap is only there to keep absurd input bounded.
    let radius = (4.0 * sigma).ceil().min(1024.0) as usize;
    let denominator = 2.0 * sigma * sigma;
    let mut kernel: Vec<f32> = (0..=radius * 2)
        .map(|idx| {
            let x = idx as f32 - radius as f32;
            (-(x * x) / denominator).exp()
        })
        .collect();
    let sum: f32 = kernel.iter().sum();
    kernel.iter_mut().for_each(|weight| *weight /= sum);
    kernel
}

/// Convolve a row-major plane with `kernel` horizontally then vertically, clamping at the edges.
/// `kernel` must have odd length.
#[must_use]
pub fn convolve_separable(plane: &[f32], width: usize, height: usize, kernel: &[f32]) -> Vec<f32> {
    if kernel.len() <= 1 || plane.is_empty() {
        return plane.to_vec();
    }
    let radius = kernel.len() / 2;
    let sample = |data: &[f32], x: usize, y: usize, offset: usize, horizontal: bool| {
        // Position of tap `offset` around (x, y), clamped into the plane.
        if horizontal {
            let sx = (x + offset).saturating_sub(radius).min(width - 1);
            data[y * width + sx]
        } else {
            let sy = (y + offset).saturating_sub(radius).min(height - 1);
            data[sy * width + x]
        }
    };
    let pass = |data: &[f32], horizontal: bool| -> Vec<f32> {
        (0..height)
            .flat_map(|y| (0..width).map(move |x| (x, y)))
            .map(|(x, y)| {
                kernel
                    .iter()
                    .enumerate()
                    .map(|(offset, weight)| weight * sample(data, x, y, offset, horizontal))
                    .sum()
            })
            .collect()
    };
    let horizontal = pass(plane, true);
    pass(&horizontal, false)
}

/// Split into R, G, B, A planes of `[0, 255]` floats.
#[must_use]
pub fn to_planes(image: &Raster) -> [Vec<f32>; 4] {
    std::array::from_fn(|channel| {
        image
            .pixels()
            .iter()
            .map(|color| f32::from(color.0[channel]))
            .collect()
    })
}

/// Inverse of [`to_planes`], rounding and clamping. Planes must match the raster size.
#[must_use]
pub fn from_planes(width: u32, height: u32, planes: &[Vec<f32>; 4]) -> Raster {
    let mut out = Raster::new(width, height);
    for (idx, pixel) in out.pixels_mut().iter_mut().enumerate() {
        *pixel = Color(std::array::from_fn(|channel| {
            to_channel(planes[channel][idx])
        }));
    }
    out
}

/// 3x3 kernel over the color channels, `out = sum / divisor + offset`. Alpha is kept.
/// Edges are clamped.
#[must_use]
pub fn convolve3x3(image: &Raster, kernel: &[[f32; 3]; 3], divisor: f32, offset: f32) -> Raster {
    let mut out = image.clone();
    let (width, height) = (image.width(), image.height());
    let clamp = |value: i32, max: u32| {
        let max = crate::util::to_i32_saturating(max) - 1;
        value.clamp(0, max)
    };
    for (x, y) in image.bounds().positions() {
        let mut sum = [0.0f32; 3];
        for (ky, row) in kernel.iter().enumerate() {
            for (kx, weight) in row.iter().enumerate() {
                let sx = clamp(x + kx as i32 - 1, width);
                let sy = clamp(y + ky as i32 - 1, height);
                let Some(source) = image.get(sx, sy) else {
                    continue;
                };
                for (channel, total) in sum.iter_mut().enumerate() {
                    *total += weight * f32::from(source.0[channel]);
                }
            }
        }
        if let Some(pixel) = out.get_mut(x, y) {
            for (channel, total) in sum.iter().enumerate() {
                pixel.0[channel] = to_channel(total / divisor + offset);
            }
        }
    }
    out
}
