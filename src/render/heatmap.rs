//! Heatmap transform.
//!
//! Known limitation: this is an approximate occupancy grid, not a 2D density
//! estimate. Axis values are deduplicated and sorted; when an axis has more
//! than [`MAX_AXIS_CELLS`] distinct values it is bucketed into that many
//! equal-width bins and each cell counts the samples that land in it.

use crate::data::series::TechniqueSeries;
use crate::error::RenderError;

pub const MAX_AXIS_CELLS: usize = 200;

#[derive(Debug, Clone, PartialEq)]
pub struct HeatmapGrid {
    /// Cell centres along x, ascending.
    pub x: Vec<f64>,
    /// Cell centres along y, ascending.
    pub y: Vec<f64>,
    /// `z[row][col]`, row indexes `y`, col indexes `x`.
    pub z: Vec<Vec<f64>>,
    /// Half extent of a cell, used to draw it.
    pub cell_half_width: f64,
    pub cell_half_height: f64,
}

impl HeatmapGrid {
    pub fn max_count(&self) -> f64 {
        self.z.iter().flatten().copied().fold(0.0, f64::max)
    }
}

struct AxisBins {
    centres: Vec<f64>,
    min: f64,
    step: f64,
    exact: bool,
}

impl AxisBins {
    fn build(values: &[f64]) -> Result<Self, RenderError> {
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);
        sorted.dedup();
        let (min, max) = match (sorted.first(), sorted.last()) {
            (Some(&lo), Some(&hi)) => (lo, hi),
            _ => return Err(RenderError::EmptyHeatmap),
        };
        if !(min.is_finite() && max.is_finite()) {
            return Err(RenderError::NonFiniteRange);
        }
        if sorted.len() <= MAX_AXIS_CELLS {
            let step = smallest_gap(&sorted).unwrap_or(1.0);
            return Ok(Self {
                centres: sorted,
                min,
                step,
                exact: true,
            });
        }
        let step = (max - min) / MAX_AXIS_CELLS as f64;
        let centres = (0..MAX_AXIS_CELLS)
            .map(|i| min + step * (i as f64 + 0.5))
            .collect();
        Ok(Self {
            centres,
            min,
            step,
            exact: false,
        })
    }

    fn slot(&self, v: f64) -> usize {
        if self.exact {
            self.centres
                .binary_search_by(|c| c.total_cmp(&v))
                .unwrap_or_else(|i| i.min(self.centres.len() - 1))
        } else {
            (((v - self.min) / self.step) as usize).min(self.centres.len() - 1)
        }
    }
}

fn smallest_gap(sorted: &[f64]) -> Option<f64> {
    sorted
        .windows(2)
        .map(|w| w[1] - w[0])
        .filter(|d| *d > 0.0)
        .min_by(f64::total_cmp)
}

/// Build the grid over every retained point of the given series.
pub fn heatmap_from(series: &[TechniqueSeries]) -> Result<HeatmapGrid, RenderError> {
    let xs: Vec<f64> = series.iter().flat_map(|s| s.x().iter().copied()).collect();
    let ys: Vec<f64> = series.iter().flat_map(|s| s.y().iter().copied()).collect();
    let bx = AxisBins::build(&xs)?;
    let by = AxisBins::build(&ys)?;

    let mut z = vec![vec![0.0; bx.centres.len()]; by.centres.len()];
    for (x, y) in xs.iter().zip(ys.iter()) {
        z[by.slot(*y)][bx.slot(*x)] += 1.0;
    }
    Ok(HeatmapGrid {
        cell_half_width: bx.step / 2.0,
        cell_half_height: by.step / 2.0,
        x: bx.centres,
        y: by.centres,
        z,
    })
}
