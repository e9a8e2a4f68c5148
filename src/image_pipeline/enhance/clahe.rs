//! Contrast-limited adaptive histogram equalization (CLAHE).
//!
//! Each tile of a fixed grid gets its own equalization LUT built from a
//! clipped histogram; the clipped excess is spread back over all bins. Output
//! samples blend the LUTs of the four nearest tile centres bilinearly. Images
//! whose size is not a multiple of the grid are extended with a reflect-101
//! border for the histogram pass only.

use ndarray::{Array2, ArrayView2, Axis};
use rayon::prelude::*;

use crate::image_pipeline::buffer::{ImageBuffer, CHANNELS};
use crate::image_pipeline::common::error::{EnhanceError, Result};
use crate::image_pipeline::common::numeric::quantize_round;
use crate::image_pipeline::filters::reflect101;

const HIST_SIZE: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClaheParams {
    /// Bin ceiling as a multiple of the flat-histogram height; non-positive disables clipping
    pub clip_limit: f32,
    /// `(columns, rows)`
    pub tile_grid: (usize, usize),
}

impl Default for ClaheParams {
    fn default() -> Self {
        Self {
            clip_limit: 2.0,
            tile_grid: (8, 8),
        }
    }
}

impl ClaheParams {
    pub fn validate(&self) -> Result<()> {
        if !self.clip_limit.is_finite() {
            return Err(EnhanceError::InvalidConfig(format!(
                "clip limit must be finite, got {}",
                self.clip_limit
            )));
        }
        if self.tile_grid.0 == 0 || self.tile_grid.1 == 0 {
            return Err(EnhanceError::InvalidConfig(format!(
                "tile grid must be at least 1x1, got {}x{}",
                self.tile_grid.0, self.tile_grid.1
            )));
        }
        Ok(())
    }
}

type Lut = [u8; HIST_SIZE];

fn tile_lut(source: &Array2<u8>, rows: (usize, usize), cols: (usize, usize), clip_limit: f32) -> Lut {
    let mut hist = [0usize; HIST_SIZE];
    for y in rows.0..rows.1 {
        for x in cols.0..cols.1 {
            hist[source[[y, x]] as usize] += 1;
        }
    }
    let area = (rows.1 - rows.0) * (cols.1 - cols.0);

    if clip_limit > 0.0 {
        let ceiling = ((clip_limit * area as f32 / HIST_SIZE as f32) as usize).max(1);
        let mut clipped = 0;
        for bin in hist.iter_mut() {
            if *bin > ceiling {
                clipped += *bin - ceiling;
                *bin = ceiling;
            }
        }

        let batch = clipped / HIST_SIZE;
        let mut residual = clipped % HIST_SIZE;
        hist.iter_mut().for_each(|bin| *bin += batch);
        if residual > 0 {
            let step = (HIST_SIZE / residual).max(1);
            let mut i = 0;
            while i < HIST_SIZE && residual > 0 {
                hist[i] += 1;
                residual -= 1;
                i += step;
            }
        }
    }

    let scale = (HIST_SIZE - 1) as f32 / area as f32;
    let mut lut = [0u8; HIST_SIZE];
    let mut cdf = 0usize;
    for (entry, &count) in lut.iter_mut().zip(hist.iter()) {
        cdf += count;
        *entry = quantize_round(cdf as f32 * scale);
    }
    lut
}

/// Neighbouring tile indices and the weight of the second one along one axis.
#[inline]
fn tile_neighbours(pos: usize, inv_tile: f32, tiles: usize) -> (usize, usize, f32) {
    let f = pos as f32 * inv_tile - 0.5;
    let first = f.floor();
    let weight = f - first;
    let first = first as isize;
    let lo = first.max(0) as usize;
    let hi = ((first + 1) as usize).min(tiles - 1);
    (lo, hi, weight)
}

/// CLAHE on a single 8-bit channel.
pub fn clahe_channel(channel: ArrayView2<'_, u8>, params: &ClaheParams) -> Result<Array2<u8>> {
    params.validate()?;
    let (height, width) = channel.dim();
    let (tiles_x, tiles_y) = params.tile_grid;

    let ext_width = width.div_ceil(tiles_x) * tiles_x;
    let ext_height = height.div_ceil(tiles_y) * tiles_y;
    let source = if ext_width != width || ext_height != height {
        Array2::from_shape_fn((ext_height, ext_width), |(y, x)| {
            channel[[reflect101(y as isize, height), reflect101(x as isize, width)]]
        })
    } else {
        channel.to_owned()
    };
    let tile_width = ext_width / tiles_x;
    let tile_height = ext_height / tiles_y;

    let luts: Vec<Lut> = (0..tiles_x * tiles_y)
        .into_par_iter()
        .map(|i| {
            let (ty, tx) = (i / tiles_x, i % tiles_x);
            tile_lut(
                &source,
                (ty * tile_height, (ty + 1) * tile_height),
                (tx * tile_width, (tx + 1) * tile_width),
                params.clip_limit,
            )
        })
        .collect();
    let lut = |ty: usize, tx: usize| &luts[ty * tiles_x + tx];

    let inv_tw = 1.0 / tile_width as f32;
    let inv_th = 1.0 / tile_height as f32;
    let mut out = Array2::<u8>::zeros((height, width));
    out.axis_iter_mut(Axis(0))
        .into_par_iter()
        .enumerate()
        .for_each(|(y, mut row)| {
            let (ty1, ty2, ya) = tile_neighbours(y, inv_th, tiles_y);
            for (x, o) in row.iter_mut().enumerate() {
                let (tx1, tx2, xa) = tile_neighbours(x, inv_tw, tiles_x);
                let v = channel[[y, x]] as usize;
                let top = f32::from(lut(ty1, tx1)[v]) * (1.0 - xa) + f32::from(lut(ty1, tx2)[v]) * xa;
                let bottom = f32::from(lut(ty2, tx1)[v]) * (1.0 - xa) + f32::from(lut(ty2, tx2)[v]) * xa;
                *o = quantize_round(top * (1.0 - ya) + bottom * ya);
            }
        });
    Ok(out)
}

/// CLAHE applied to R, G and B independently, without any color-space conversion.
pub fn clahe_image(image: &ImageBuffer, params: &ClaheParams) -> Result<ImageBuffer> {
    params.validate()?;
    let channels = (0..CHANNELS)
        .into_par_iter()
        .map(|c| clahe_channel(image.channel(c), params))
        .collect::<Result<Vec<_>>>()?;
    let channels: [Array2<u8>; 3] = channels.try_into().map_err(|_| {
        EnhanceError::ComputationFailure("CLAHE did not produce three channels".to_string())
    })?;
    ImageBuffer::from_channels(channels)
}
