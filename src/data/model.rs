use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Dataset – raw rows as loaded, missing cells preserved
// ---------------------------------------------------------------------------

/// The concatenated per-subject tables, one row per sample.
///
/// Cells are `None` where the source file had an empty or `NaN` value.
/// Every row has exactly `n_channels` cells.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    n_channels: usize,
    rows: Vec<Vec<Option<f64>>>,
}

impl Dataset {
    /// An empty dataset that accepts rows of `n_channels` cells.
    pub fn new(n_channels: usize) -> Self {
        Self {
            n_channels,
            rows: Vec::new(),
        }
    }

    /// Build from rows, checking every row has `n_channels` cells.
    pub fn from_rows(n_channels: usize, rows: Vec<Vec<Option<f64>>>) -> Result<Self> {
        let mut ds = Self::new(n_channels);
        for row in rows {
            ds.push_row(row)?;
        }
        Ok(ds)
    }

    /// Convenience for fully populated data.
    pub fn from_dense(n_channels: usize, rows: Vec<Vec<f64>>) -> Result<Self> {
        Self::from_rows(
            n_channels,
            rows.into_iter()
                .map(|r| r.into_iter().map(Some).collect())
                .collect(),
        )
    }

    pub fn push_row(&mut self, row: Vec<Option<f64>>) -> Result<()> {
        if row.len() != self.n_channels {
            return Err(Error::Shape(format!(
                "row {} has {} cells, expected {}",
                self.rows.len(),
                row.len(),
                self.n_channels
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    /// Append all rows of `other`, keeping their order.
    pub fn extend(&mut self, other: Dataset) -> Result<()> {
        if other.n_channels != self.n_channels {
            return Err(Error::Shape(format!(
                "cannot append a {}-channel table to a {}-channel dataset",
                other.n_channels, self.n_channels
            )));
        }
        self.rows.extend(other.rows);
        Ok(())
    }

    pub fn n_channels(&self) -> usize {
        self.n_channels
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Vec<Option<f64>>] {
        &self.rows
    }

    /// Number of `None` cells across the whole table.
    pub fn missing_count(&self) -> usize {
        self.rows
            .iter()
            .map(|r| r.iter().filter(|c| c.is_none()).count())
            .sum()
    }
}

// ---------------------------------------------------------------------------
// FeatureMatrix – dense row-major numbers
// ---------------------------------------------------------------------------

/// Dense `n_rows × n_cols` matrix, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    n_rows: usize,
    n_cols: usize,
    data: Vec<f64>,
}

impl FeatureMatrix {
    /// Wrap a row-major buffer; `data.len()` must equal `n_rows * n_cols`.
    pub fn from_vec(n_rows: usize, n_cols: usize, data: Vec<f64>) -> Result<Self> {
        if data.len() != n_rows * n_cols {
            return Err(Error::Shape(format!(
                "{} values cannot form a {n_rows}x{n_cols} matrix",
                data.len()
            )));
        }
        Ok(Self {
            n_rows,
            n_cols,
            data,
        })
    }

    /// Build from equally long rows.
    pub fn from_rows(n_cols: usize, rows: &[Vec<f64>]) -> Result<Self> {
        let mut data = Vec::with_capacity(rows.len() * n_cols);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != n_cols {
                return Err(Error::Shape(format!(
                    "row {i} has {} values, expected {n_cols}",
                    row.len()
                )));
            }
            data.extend_from_slice(row);
        }
        Self::from_vec(rows.len(), n_cols, data)
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.n_rows, self.n_cols)
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.n_cols + col]
    }

    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.n_cols..(i + 1) * self.n_cols]
    }

    pub fn row_mut(&mut self, i: usize) -> &mut [f64] {
        &mut self.data[i * self.n_cols..(i + 1) * self.n_cols]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        // `chunks_exact(0)` panics; a zero-column matrix has no meaningful rows.
        self.data.chunks_exact(self.n_cols.max(1))
    }

    /// Values of one column, top to bottom.
    pub fn column(&self, col: usize) -> Vec<f64> {
        (0..self.n_rows).map(|r| self.get(r, col)).collect()
    }

    /// New matrix made of the given rows, in the given order.
    pub fn select_rows(&self, indices: &[usize]) -> Self {
        let mut data = Vec::with_capacity(indices.len() * self.n_cols);
        for &i in indices {
            data.extend_from_slice(self.row(i));
        }
        Self {
            n_rows: indices.len(),
            n_cols: self.n_cols,
            data,
        }
    }
}
