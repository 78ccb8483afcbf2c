use crate::error::{CleaningError, Result};
use crate::utils::numeric_values;
use polars::prelude::*;
use tracing::debug;

/// Distance-weighted nearest-neighbor imputer over a standardized numeric
/// context.
#[derive(Debug, Clone)]
pub struct KnnImputer {
    n_neighbors: usize,
}

/// Per-column mean and standard deviation used to move values in and out of
/// standardized space.
#[derive(Debug, Clone, PartialEq)]
struct Standardizer {
    means: Vec<f64>,
    stds: Vec<f64>,
}

impl Standardizer {
    /// Population mean and standard deviation of every context column.
    fn fit(df: &DataFrame, columns: &[String]) -> Result<Self> {
        let mut means = Vec::with_capacity(columns.len());
        let mut stds = Vec::with_capacity(columns.len());

        for name in columns {
            let series = df
                .column(name)?
                .as_materialized_series()
                .cast(&DataType::Float64)?;
            match (series.mean(), series.std(0)) {
                (Some(mean), Some(std)) if std > f64::EPSILON => {
                    means.push(mean);
                    stds.push(std);
                }
                _ => return Err(CleaningError::DegenerateVariance(name.clone())),
            }
        }

        Ok(Self { means, stds })
    }

    fn transform(&self, matrix: &mut [Vec<Option<f64>>]) {
        for row in matrix.iter_mut() {
            for (col_idx, cell) in row.iter_mut().enumerate() {
                if let Some(v) = cell {
                    *v = (*v - self.means[col_idx]) / self.stds[col_idx];
                }
            }
        }
    }

    fn inverse(&self, col_idx: usize, z: f64) -> f64 {
        z * self.stds[col_idx] + self.means[col_idx]
    }
}

impl KnnImputer {
    /// Create a new KNN imputer with specified number of neighbors
    pub fn new(n_neighbors: usize) -> Self {
        Self {
            n_neighbors: n_neighbors.max(1),
        }
    }

    pub fn n_neighbors(&self) -> usize {
        self.n_neighbors
    }

    /// Impute the missing cells of `target` using every column in `context`
    /// as features. `context` must contain `target`.
    ///
    /// Returns one value per row: present cells are passed through unchanged,
    /// missing cells receive the neighbor estimate. The frame is not modified.
    pub fn impute_column(
        &self,
        df: &DataFrame,
        target: &str,
        context: &[String],
    ) -> Result<Vec<f64>> {
        let target_idx = context
            .iter()
            .position(|c| c == target)
            .ok_or_else(|| CleaningError::ColumnNotFound(target.to_string()))?;

        let original = numeric_values(df.column(target)?.as_materialized_series())?;
        let donors: Vec<usize> = (0..original.len())
            .filter(|&row| original[row].is_some())
            .collect();

        if donors.is_empty() {
            return Err(CleaningError::InsufficientContext {
                column: target.to_string(),
                available: 0,
            });
        }

        let standardizer = Standardizer::fit(df, context)?;
        let mut matrix = self.create_data_matrix(df, context)?;
        standardizer.transform(&mut matrix);

        debug!(
            "KNN imputing '{}' from {} donors over {} context columns",
            target,
            donors.len(),
            context.len()
        );

        let imputed = original
            .iter()
            .enumerate()
            .map(|(row_idx, value)| match value {
                Some(v) => *v,
                None => {
                    let z = self.impute_value(&matrix, row_idx, target_idx, &donors);
                    standardizer.inverse(target_idx, z)
                }
            })
            .collect();

        Ok(imputed)
    }

    /// Create a data matrix from the dataframe for distance calculations
    fn create_data_matrix(
        &self,
        df: &DataFrame,
        columns: &[String],
    ) -> Result<Vec<Vec<Option<f64>>>> {
        let n_rows = df.height();
        let mut matrix = vec![vec![None; columns.len()]; n_rows];

        for (col_idx, col_name) in columns.iter().enumerate() {
            let values = numeric_values(df.column(col_name)?.as_materialized_series())?;
            for (row, value) in matrix.iter_mut().zip(values) {
                row[col_idx] = value;
            }
        }

        Ok(matrix)
    }

    /// Estimate one standardized target value from the nearest donors.
    fn impute_value(
        &self,
        matrix: &[Vec<Option<f64>>],
        target_row: usize,
        target_col: usize,
        donors: &[usize],
    ) -> f64 {
        let mut distances: Vec<(usize, f64)> = donors
            .iter()
            .filter_map(|&donor| {
                calculate_distance(&matrix[target_row], &matrix[donor]).map(|d| (donor, d))
            })
            .collect();

        if distances.is_empty() {
            // No shared feature with any donor: donor mean, which is 0 once standardized
            return donor_mean(matrix, target_col, donors);
        }

        distances.sort_by(|a, b| a.1.total_cmp(&b.1));
        distances.truncate(self.n_neighbors);

        let exact: Vec<f64> = distances
            .iter()
            .filter(|(_, d)| *d == 0.0)
            .filter_map(|(row, _)| matrix[*row][target_col])
            .collect();
        if !exact.is_empty() {
            return exact.iter().sum::<f64>() / exact.len() as f64;
        }

        let mut weighted_sum = 0.0;
        let mut weight_sum = 0.0;
        for (row, distance) in &distances {
            if let Some(value) = matrix[*row][target_col] {
                let weight = 1.0 / distance;
                weighted_sum += value * weight;
                weight_sum += weight;
            }
        }

        weighted_sum / weight_sum
    }
}

/// Euclidean distance over the features both rows observe, scaled up by the
/// fraction of features that were skipped. `None` if nothing is co-observed.
fn calculate_distance(row1: &[Option<f64>], row2: &[Option<f64>]) -> Option<f64> {
    let mut sum_squared_diff = 0.0;
    let mut count = 0usize;

    for (a, b) in row1.iter().zip(row2) {
        if let (Some(a), Some(b)) = (a, b) {
            sum_squared_diff += (a - b).powi(2);
            count += 1;
        }
    }

    if count == 0 {
        None
    } else {
        Some((row1.len() as f64 / count as f64 * sum_squared_diff).sqrt())
    }
}

fn donor_mean(matrix: &[Vec<Option<f64>>], col: usize, donors: &[usize]) -> f64 {
    let sum: f64 = donors.iter().filter_map(|&row| matrix[row][col]).sum();
    sum / donors.len() as f64
}
