//! Resampling of the photograph through a dense mapping
//!
//! The mapping is laid out x-major, so the remapped buffer comes out with
//! one row per destination column. [`transpose`] turns it into the
//! canonical row-major image.

use image::{ImageBuffer, Pixel};
use rayon::prelude::*;

use crate::interpolate::DenseMapping;

/// Maximum channels handled per pixel
const MAX_CHANNELS: usize = 4;

/// Resample `src` at every coordinate of `mapping` using bicubic interpolation.
///
/// Source coordinates outside the image receive `border`. The result has
/// `mapping.height()` columns and `mapping.width()` rows.
pub fn remap<P>(
    src: &ImageBuffer<P, Vec<u8>>,
    mapping: &DenseMapping,
    border: P,
) -> ImageBuffer<P, Vec<u8>>
where
    P: Pixel<Subpixel = u8> + Sync,
{
    let channels = P::CHANNEL_COUNT as usize;
    let out_w = mapping.height() as usize;
    let out_h = mapping.width() as usize;
    let src_w = src.width() as usize;
    let src_h = src.height() as usize;
    let src_stride = src_w * channels;
    let border = border.channels();

    let mut data = vec![0u8; out_w * out_h * channels];

    data.par_chunks_mut(out_w * channels)
        .enumerate()
        .for_each(|(x, row)| {
            let (map_x, map_y) = mapping.column(x as u32);
            for (y, pixel) in row.chunks_exact_mut(channels).enumerate() {
                let sampled = bicubic_sample(
                    src.as_raw(),
                    src_stride,
                    src_w,
                    src_h,
                    channels,
                    map_x[y] as f64,
                    map_y[y] as f64,
                );
                match sampled {
                    Some(value) => pixel.copy_from_slice(&value[..channels]),
                    None => pixel.copy_from_slice(border),
                }
            }
        });

    // Buffer length matches the dimensions by construction
    ImageBuffer::from_raw(out_w as u32, out_h as u32, data)
        .unwrap_or_else(|| ImageBuffer::new(out_w as u32, out_h as u32))
}

/// Swap the x and y axes of an image
pub fn transpose<P>(img: &ImageBuffer<P, Vec<u8>>) -> ImageBuffer<P, Vec<u8>>
where
    P: Pixel<Subpixel = u8>,
{
    ImageBuffer::from_fn(img.height(), img.width(), |x, y| *img.get_pixel(y, x))
}

/// Catmull-Rom cubic convolution weight
#[inline]
fn cubic_weight(t: f64) -> f64 {
    const A: f64 = -0.5;

    let t = t.abs();
    if t <= 1.0 {
        ((A + 2.0) * t - (A + 3.0)) * t * t + 1.0
    } else if t < 2.0 {
        ((A * t - 5.0 * A) * t + 8.0 * A) * t - 4.0 * A
    } else {
        0.0
    }
}

/// Bicubic interpolation sampling.
///
/// Returns `None` for coordinates outside `[0, width-1] x [0, height-1]`.
/// Taps that fall past the image edge reuse the nearest edge pixel.
#[inline]
fn bicubic_sample(
    src: &[u8],
    stride: usize,
    width: usize,
    height: usize,
    channels: usize,
    x: f64,
    y: f64,
) -> Option<[u8; MAX_CHANNELS]> {
    let max_x = (width - 1) as f64;
    let max_y = (height - 1) as f64;
    if !(x >= 0.0 && y >= 0.0 && x <= max_x && y <= max_y) {
        return None;
    }

    let x0 = x.floor() as isize;
    let y0 = y.floor() as isize;
    let fx = x - x0 as f64;
    let fy = y - y0 as f64;

    let wx = [
        cubic_weight(fx + 1.0),
        cubic_weight(fx),
        cubic_weight(fx - 1.0),
        cubic_weight(fx - 2.0),
    ];
    let wy = [
        cubic_weight(fy + 1.0),
        cubic_weight(fy),
        cubic_weight(fy - 1.0),
        cubic_weight(fy - 2.0),
    ];

    let clamp = |v: isize, len: usize| v.clamp(0, len as isize - 1) as usize;

    let mut sum = [0.0f64; MAX_CHANNELS];
    for (j, &wyj) in wy.iter().enumerate() {
        let row = clamp(y0 - 1 + j as isize, height) * stride;
        for (i, &wxi) in wx.iter().enumerate() {
            let offset = row + clamp(x0 - 1 + i as isize, width) * channels;
            let weight = wxi * wyj;
            for c in 0..channels.min(MAX_CHANNELS) {
                sum[c] += src.get(offset + c).copied().unwrap_or(0) as f64 * weight;
            }
        }
    }

    let mut result = [0u8; MAX_CHANNELS];
    for c in 0..channels.min(MAX_CHANNELS) {
        result[c] = sum[c].round().clamp(0.0, 255.0) as u8;
    }
    Some(result)
}
