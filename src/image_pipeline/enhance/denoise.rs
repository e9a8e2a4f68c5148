//! Non-local-means color denoising.
//!
//! The image is split into full-range BT.601 luma and chroma. Luma is filtered
//! with `luminance_strength`, the two chroma channels jointly with
//! `color_strength`. For every pixel, each candidate in the search window is
//! weighted by `exp(-d / h²)`, `d` being the mean squared difference between
//! the two template patches. Borders are reflect-101 padded, so candidates
//! near the edge are drawn from the mirrored image.

use ndarray::{s, Array2, Array3, ArrayView3, Axis, Zip};
use tracing::debug;

use crate::image_pipeline::buffer::{FloatImage, ImageBuffer, CHANNELS};
use crate::image_pipeline::common::error::Result;
use crate::image_pipeline::common::numeric::quantize_round;
use crate::image_pipeline::enhance::types::DenoiseConfig;
use crate::image_pipeline::filters::reflect101;

fn rgb_to_ycbcr(image: &ImageBuffer) -> FloatImage {
    let rgb = image.to_float();
    let mut ycc = FloatImage::zeros(rgb.raw_dim());
    Zip::from(ycc.lanes_mut(Axis(2)))
        .and(rgb.lanes(Axis(2)))
        .for_each(|mut out, px| {
            let (r, g, b) = (px[0], px[1], px[2]);
            out[0] = 0.299 * r + 0.587 * g + 0.114 * b;
            out[1] = 128.0 - 0.168_736 * r - 0.331_264 * g + 0.5 * b;
            out[2] = 128.0 + 0.5 * r - 0.418_688 * g - 0.081_312 * b;
        });
    ycc
}

fn ycbcr_to_rgb(ycc: &FloatImage) -> Array3<u8> {
    let mut rgb = Array3::<u8>::zeros(ycc.raw_dim());
    Zip::from(rgb.lanes_mut(Axis(2)))
        .and(ycc.lanes(Axis(2)))
        .for_each(|mut out, px| {
            let (y, cb, cr) = (px[0], px[1] - 128.0, px[2] - 128.0);
            out[0] = quantize_round(y + 1.402 * cr);
            out[1] = quantize_round(y - 0.344_136 * cb - 0.714_136 * cr);
            out[2] = quantize_round(y + 1.772 * cb);
        });
    rgb
}

/// Summed-area table with a leading zero row and column.
fn integral(values: &Array2<f64>) -> Array2<f64> {
    let (h, w) = values.dim();
    let mut table = Array2::<f64>::zeros((h + 1, w + 1));
    for y in 0..h {
        let mut row_sum = 0.0;
        for x in 0..w {
            row_sum += values[[y, x]];
            table[[y + 1, x + 1]] = table[[y, x + 1]] + row_sum;
        }
    }
    table
}

/// NL-means over a group of channels that share patch distances.
fn nl_means(input: ArrayView3<'_, f32>, h: f32, template_window: usize, search_window: usize) -> FloatImage {
    let (height, width, channels) = input.dim();
    let t = template_window / 2;
    let sr = (search_window / 2) as isize;
    let pad = t + sr as usize;

    let padded = Array3::from_shape_fn((height + 2 * pad, width + 2 * pad, channels), |(y, x, c)| {
        let sy = reflect101(y as isize - pad as isize, height);
        let sx = reflect101(x as isize - pad as isize, width);
        f64::from(input[[sy, sx, c]])
    });

    let norm = 1.0 / ((template_window * template_window * channels) as f64 * f64::from(h) * f64::from(h));
    let span = (height + 2 * t, width + 2 * t);
    let base = sr as usize;

    let mut weight_sum = Array2::<f64>::zeros((height, width));
    let mut value_sum = Array3::<f64>::zeros((height, width, channels));

    for dy in -sr..=sr {
        for dx in -sr..=sr {
            let (cy, cx) = ((base as isize + dy) as usize, (base as isize + dx) as usize);
            let mut diff = Array2::<f64>::zeros(span);
            Zip::indexed(&mut diff).par_for_each(|(y, x), d| {
                *d = (0..channels)
                    .map(|c| {
                        let e = padded[[base + y, base + x, c]] - padded[[cy + y, cx + x, c]];
                        e * e
                    })
                    .sum();
            });
            let table = integral(&diff);
            let side = 2 * t + 1;

            Zip::indexed(&mut weight_sum)
                .and(value_sum.lanes_mut(Axis(2)))
                .par_for_each(|(y, x), w, mut values| {
                    let ssd = table[[y + side, x + side]] - table[[y, x + side]] - table[[y + side, x]]
                        + table[[y, x]];
                    let weight = (-ssd.max(0.0) * norm).exp();
                    *w += weight;
                    for (c, v) in values.iter_mut().enumerate() {
                        *v += weight * padded[[cy + t + y, cx + t + x, c]];
                    }
                });
        }
    }

    let mut out = FloatImage::zeros((height, width, channels));
    Zip::from(out.lanes_mut(Axis(2)))
        .and(value_sum.lanes(Axis(2)))
        .and(&weight_sum)
        .par_for_each(|mut o, v, &w| {
            for (oc, &vc) in o.iter_mut().zip(v.iter()) {
                *oc = (vc / w) as f32;
            }
        });
    out
}

/// Non-local-means denoising of an RGB image.
pub fn denoise(image: &ImageBuffer, config: &DenoiseConfig) -> Result<ImageBuffer> {
    config.validate()?;
    let ycc = rgb_to_ycbcr(image);

    let (template, search) = (config.template_window, config.search_window);
    let (luma, chroma) = rayon::join(
        || nl_means(ycc.slice(s![.., .., 0..1]), config.luminance_strength, template, search),
        || nl_means(ycc.slice(s![.., .., 1..CHANNELS]), config.color_strength, template, search),
    );

    let mut filtered = FloatImage::zeros(ycc.raw_dim());
    filtered.slice_mut(s![.., .., 0..1]).assign(&luma);
    filtered.slice_mut(s![.., .., 1..CHANNELS]).assign(&chroma);
    debug!(
        width = image.width(),
        height = image.height(),
        "NL-means denoise complete"
    );
    ImageBuffer::new(ycbcr_to_rgb(&filtered))
}
