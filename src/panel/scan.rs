//! Grouped scans: running sums and products, first differences and lags
//!
//! Every scan restarts at the first row of a group. Groups own their rows, so
//! a scan can never carry a value across a group boundary.

use super::{Panel, PanelRow};
use rayon::prelude::*;

/// Sequential operation applied along the BOY axis of a group
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScanOp {
    CumSum,
    CumProd,
    /// `x[t] - x[t-1]`; the first element is kept as is
    Diff,
    /// `x[t-1]`; the first element is `fill`
    Lag { fill: f64 },
}

impl ScanOp {
    pub fn apply(&self, values: &[f64]) -> Vec<f64> {
        match *self {
            ScanOp::CumSum => cumsum(values),
            ScanOp::CumProd => cumprod(values),
            ScanOp::Diff => diff(values),
            ScanOp::Lag { fill } => lag(values, fill),
        }
    }
}

pub fn cumsum(values: &[f64]) -> Vec<f64> {
    values
        .iter()
        .scan(0.0, |acc, &x| {
            *acc += x;
            Some(*acc)
        })
        .collect()
}

pub fn cumprod(values: &[f64]) -> Vec<f64> {
    values
        .iter()
        .scan(1.0, |acc, &x| {
            *acc *= x;
            Some(*acc)
        })
        .collect()
}

pub fn diff(values: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.len());
    let mut previous = 0.0;
    for &x in values {
        out.push(x - previous);
        previous = x;
    }
    out
}

pub fn lag(values: &[f64], fill: f64) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.len());
    if values.is_empty() {
        return out;
    }
    out.push(fill);
    out.extend_from_slice(&values[..values.len() - 1]);
    out
}

/// Apply a scan to one column of a group's rows
pub fn scan_rows<G, S>(rows: &mut [PanelRow], op: ScanOp, get: G, set: S)
where
    G: Fn(&PanelRow) -> f64,
    S: Fn(&mut PanelRow, f64),
{
    let input: Vec<f64> = rows.iter().map(&get).collect();
    for (row, value) in rows.iter_mut().zip(op.apply(&input)) {
        set(row, value);
    }
}

/// Apply a scan to one column of every group in the panel
pub fn group_scan<G, S>(panel: &mut Panel, op: ScanOp, get: G, set: S)
where
    G: Fn(&PanelRow) -> f64 + Sync,
    S: Fn(&mut PanelRow, f64) + Sync,
{
    panel
        .groups_mut()
        .par_iter_mut()
        .for_each(|group| scan_rows(&mut group.rows, op, &get, &set));
}
