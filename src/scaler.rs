//! Feature standardization
//!
//! Centers and scales feature columns to zero mean and unit variance. The
//! fitted statistics travel with the trained artifacts so serving applies
//! exactly the transform the classifiers saw during training.

use crate::error::EngineError;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Per-column standardization fitted on a training matrix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    means: Vec<f64>,
    scales: Vec<f64>,
}

impl StandardScaler {
    /// Fits column means and population standard deviations.
    ///
    /// Columns with zero deviation keep a scale of 1.0 so constant features
    /// center to zero instead of dividing by zero.
    pub fn fit(matrix: &Array2<f64>) -> Self {
        let rows = matrix.nrows() as f64;
        let mut means = Vec::with_capacity(matrix.ncols());
        let mut scales = Vec::with_capacity(matrix.ncols());
        for column in matrix.columns() {
            let mean = if rows > 0.0 { column.sum() / rows } else { 0.0 };
            let variance = if rows > 0.0 {
                column.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / rows
            } else {
                0.0
            };
            let deviation = variance.sqrt();
            means.push(mean);
            scales.push(if deviation > 0.0 { deviation } else { 1.0 });
        }
        Self { means, scales }
    }

    /// Number of columns the scaler was fitted on
    pub fn len(&self) -> usize {
        self.means.len()
    }

    pub fn is_empty(&self) -> bool {
        self.means.is_empty()
    }

    /// Standardizes a full matrix.
    pub fn transform(&self, matrix: &Array2<f64>) -> Result<Array2<f64>, EngineError> {
        if matrix.ncols() != self.means.len() {
            return Err(EngineError::DimensionMismatch {
                expected: self.means.len(),
                got: matrix.ncols(),
            });
        }
        let mut scaled = matrix.clone();
        for (j, mut column) in scaled.columns_mut().into_iter().enumerate() {
            let mean = self.means[j];
            let scale = self.scales[j];
            column.mapv_inplace(|v| (v - mean) / scale);
        }
        Ok(scaled)
    }

    /// Standardizes a single row.
    pub fn transform_row(&self, row: &Array1<f64>) -> Result<Array1<f64>, EngineError> {
        if row.len() != self.means.len() {
            return Err(EngineError::DimensionMismatch {
                expected: self.means.len(),
                got: row.len(),
            });
        }
        Ok(Array1::from_iter(row.iter().enumerate().map(|(j, v)| {
            (v - self.means[j]) / self.scales[j]
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_fit_transform_centers_and_scales() {
        let matrix = array![[1.0, 10.0], [3.0, 10.0], [5.0, 10.0]];
        let scaler = StandardScaler::fit(&matrix);
        let scaled = scaler.transform(&matrix).unwrap();

        // First column: mean 3, population deviation sqrt(8/3)
        let deviation = (8.0f64 / 3.0).sqrt();
        assert!((scaled[[0, 0]] - (1.0 - 3.0) / deviation).abs() < 0.001);
        assert!((scaled[[2, 0]] - (5.0 - 3.0) / deviation).abs() < 0.001);
        // Column means land on zero
        let mean: f64 = scaled.column(0).sum() / 3.0;
        assert!(mean.abs() < 0.001);
    }

    #[test]
    fn test_constant_column_keeps_unit_scale() {
        let matrix = array![[1.0, 7.0], [2.0, 7.0]];
        let scaler = StandardScaler::fit(&matrix);
        let scaled = scaler.transform(&matrix).unwrap();
        assert_eq!(scaled[[0, 1]], 0.0);
        assert_eq!(scaled[[1, 1]], 0.0);
    }

    #[test]
    fn test_transform_rejects_width_mismatch() {
        let scaler = StandardScaler::fit(&array![[1.0, 2.0], [3.0, 4.0]]);
        let err = scaler.transform(&array![[1.0], [2.0]]).unwrap_err();
        assert!(matches!(
            err,
            EngineError::DimensionMismatch {
                expected: 2,
                got: 1
            }
        ));
    }

    #[test]
    fn test_transform_row_matches_matrix_transform() {
        let matrix = array![[2.0, 4.0], [6.0, 8.0]];
        let scaler = StandardScaler::fit(&matrix);
        let scaled = scaler.transform(&matrix).unwrap();
        let row = scaler.transform_row(&array![2.0, 4.0]).unwrap();
        assert!((row[0] - scaled[[0, 0]]).abs() < 0.001);
        assert!((row[1] - scaled[[0, 1]]).abs() < 0.001);
    }
}
