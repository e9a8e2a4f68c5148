//! Grayscale erosion with a square structuring element.
//!
//! The element spans offsets `-size/2 ..= size - 1 - size/2` on both axes.
//! Samples outside the image never take part in the minimum, so an element
//! larger than the image reduces every output to the global minimum.

use std::collections::VecDeque;

use ndarray::{Array2, ArrayView2, Axis, Zip};

use crate::image_pipeline::common::error::{EnhanceError, Result};

/// Sliding-window minimum over one line, O(n) regardless of `size`.
fn min_filter_line<T: Copy + PartialOrd>(line: &[T], size: usize, out: &mut [T]) {
    let n = line.len();
    let before = size / 2;
    let after = size - 1 - before;
    let mut window: VecDeque<usize> = VecDeque::new();
    let mut next = 0;

    for (x, o) in out.iter_mut().enumerate() {
        let hi = x.saturating_add(after).min(n - 1);
        while next <= hi {
            while window.back().is_some_and(|&b| line[b] >= line[next]) {
                window.pop_back();
            }
            window.push_back(next);
            next += 1;
        }
        let lo = x.saturating_sub(before);
        while window.front().is_some_and(|&f| f < lo) {
            window.pop_front();
        }
        if let Some(&m) = window.front() {
            *o = line[m];
        }
    }
}

fn erode_lanes<T>(input: ArrayView2<'_, T>, size: usize, axis: Axis) -> Array2<T>
where
    T: Copy + PartialOrd + Send + Sync,
{
    let mut out = input.to_owned();
    Zip::from(out.lanes_mut(axis))
        .and(input.lanes(axis))
        .par_for_each(|mut out_lane, in_lane| {
            let line: Vec<T> = in_lane.iter().copied().collect();
            let mut eroded = line.clone();
            min_filter_line(&line, size, &mut eroded);
            out_lane.iter_mut().zip(eroded).for_each(|(o, v)| *o = v);
        });
    out
}

/// Minimum over the `size × size` neighbourhood of every sample.
pub fn erode<T>(plane: ArrayView2<'_, T>, size: usize) -> Result<Array2<T>>
where
    T: Copy + PartialOrd + Send + Sync,
{
    if size == 0 {
        return Err(EnhanceError::InvalidConfig(
            "structuring element size must be positive".to_string(),
        ));
    }
    let rows = erode_lanes(plane, size, Axis(1));
    Ok(erode_lanes(rows.view(), size, Axis(0)))
}
