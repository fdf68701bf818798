//! Block compressed-row matrix with fixed-size dense blocks.
//!
//! The sparsity pattern is fixed at construction (one sorted column list per block row);
//! afterwards only block values change. Writing to a block outside the pattern is an error.
use nalgebra::{DMatrix, SMatrix, SVector};

#[derive(Debug, Clone, PartialEq)]
pub struct BlockSparseMatrix<const R: usize, const C: usize> {
    num_cols: usize,
    row_start: Vec<usize>,
    col_indices: Vec<usize>,
    values: Vec<SMatrix<f64, R, C>>,
}

impl<const R: usize, const C: usize> Default for BlockSparseMatrix<R, C> {
    fn default() -> Self {
        Self {
            num_cols: 0,
            row_start: vec![0],
            col_indices: Vec::new(),
            values: Vec::new(),
        }
    }
}

impl<const R: usize, const C: usize> BlockSparseMatrix<R, C> {
    /// `pattern[i]` lists the block columns of block row `i`; duplicates are merged.
    pub fn from_pattern(num_cols: usize, pattern: &[Vec<usize>]) -> Result<Self, String> {
        let mut row_start = Vec::with_capacity(pattern.len() + 1);
        let mut col_indices = Vec::new();
        row_start.push(0);
        for (row, cols) in pattern.iter().enumerate() {
            let mut cols = cols.clone();
            cols.sort_unstable();
            cols.dedup();
            if let Some(&last) = cols.last() {
                if last >= num_cols {
                    return Err(format!(
                        "row {} references column {} of a matrix with {} block columns",
                        row, last, num_cols
                    ));
                }
            }
            col_indices.extend(cols);
            row_start.push(col_indices.len());
        }
        let values = vec![SMatrix::<f64, R, C>::zeros(); col_indices.len()];
        Ok(Self {
            num_cols,
            row_start,
            col_indices,
            values,
        })
    }

    pub fn num_rows(&self) -> usize {
        self.row_start.len() - 1
    }

    pub fn num_cols(&self) -> usize {
        self.num_cols
    }

    /// number of stored blocks
    pub fn nnz(&self) -> usize {
        self.col_indices.len()
    }

    /// block columns of row `row`
    pub fn row_pattern(&self, row: usize) -> &[usize] {
        &self.col_indices[self.row_start[row]..self.row_start[row + 1]]
    }

    fn position(&self, row: usize, col: usize) -> Option<usize> {
        if row >= self.num_rows() {
            return None;
        }
        let start = self.row_start[row];
        self.row_pattern(row)
            .binary_search(&col)
            .ok()
            .map(|offset| start + offset)
    }

    pub fn exists(&self, row: usize, col: usize) -> bool {
        self.position(row, col).is_some()
    }

    pub fn block(&self, row: usize, col: usize) -> Option<&SMatrix<f64, R, C>> {
        self.position(row, col).map(|pos| &self.values[pos])
    }

    pub fn block_mut(&mut self, row: usize, col: usize) -> Option<&mut SMatrix<f64, R, C>> {
        self.position(row, col).map(move |pos| &mut self.values[pos])
    }

    pub fn add_to_block(&mut self, row: usize, col: usize, value: &SMatrix<f64, R, C>) -> Result<(), String> {
        match self.block_mut(row, col) {
            Some(block) => {
                *block += value;
                Ok(())
            }
            None => Err(format!("block ({}, {}) is not part of the sparsity pattern", row, col)),
        }
    }

    /// zeroes the values, keeps the pattern
    pub fn clear_values(&mut self) {
        for block in self.values.iter_mut() {
            block.fill(0.0);
        }
    }

    /// `y = A x`
    pub fn mv(&self, x: &[SVector<f64, C>]) -> Vec<SVector<f64, R>> {
        debug_assert_eq!(x.len(), self.num_cols);
        (0..self.num_rows())
            .map(|row| {
                let mut acc = SVector::<f64, R>::zeros();
                for pos in self.row_start[row]..self.row_start[row + 1] {
                    acc += self.values[pos] * x[self.col_indices[pos]];
                }
                acc
            })
            .collect()
    }

    /// `y -= A^T x`
    pub fn mmtv(&self, x: &[SVector<f64, R>], y: &mut [SVector<f64, C>]) {
        debug_assert_eq!(x.len(), self.num_rows());
        debug_assert_eq!(y.len(), self.num_cols);
        for (row, x_row) in x.iter().enumerate() {
            for pos in self.row_start[row]..self.row_start[row + 1] {
                y[self.col_indices[pos]] -= self.values[pos].transpose() * x_row;
            }
        }
    }

    pub fn to_dense(&self) -> DMatrix<f64> {
        let mut dense = DMatrix::zeros(self.num_rows() * R, self.num_cols * C);
        for row in 0..self.num_rows() {
            for pos in self.row_start[row]..self.row_start[row + 1] {
                let col = self.col_indices[pos];
                dense
                    .view_mut((row * R, col * C), (R, C))
                    .copy_from(&self.values[pos]);
            }
        }
        dense
    }
}

/// Stacks block vectors into one flat vector.
pub fn flatten<const N: usize>(blocks: &[SVector<f64, N>]) -> nalgebra::DVector<f64> {
    nalgebra::DVector::from_iterator(blocks.len() * N, blocks.iter().flat_map(|b| b.iter().copied()))
}

/// Splits a flat vector into blocks of `N`.
pub fn unflatten<const N: usize>(flat: &nalgebra::DVector<f64>) -> Vec<SVector<f64, N>> {
    flat.as_slice()
        .chunks(N)
        .map(SVector::<f64, N>::from_column_slice)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::{Matrix2, Vector2};

    fn sample() -> BlockSparseMatrix<2, 2> {
        let mut m = BlockSparseMatrix::<2, 2>::from_pattern(2, &[vec![1, 0, 1], vec![1]]).unwrap();
        m.add_to_block(0, 0, &Matrix2::new(1.0, 2.0, 3.0, 4.0)).unwrap();
        m.add_to_block(0, 1, &Matrix2::identity()).unwrap();
        m.add_to_block(1, 1, &Matrix2::new(2.0, 0.0, 0.0, 5.0)).unwrap();
        m
    }

    #[test]
    fn pattern_is_sorted_and_fixed() {
        let mut m = sample();
        assert_eq!(m.nnz(), 3);
        assert_eq!(m.row_pattern(0), &[0, 1]);
        assert!(!m.exists(1, 0));
        assert!(m.add_to_block(1, 0, &Matrix2::identity()).is_err());
        assert!(BlockSparseMatrix::<2, 2>::from_pattern(1, &[vec![3]]).is_err());
        m.clear_values();
        assert_eq!(m.block(0, 0).unwrap(), &Matrix2::zeros());
    }

    #[test]
    fn products_match_the_dense_matrix() {
        let m = sample();
        let x = vec![Vector2::new(1.0, -1.0), Vector2::new(0.5, 2.0)];
        let y = m.mv(&x);
        let dense = m.to_dense();
        let y_dense = &dense * flatten(&x);
        assert_relative_eq!(flatten(&y), y_dense, epsilon = 1e-14);

        let mut z = vec![Vector2::zeros(); 2];
        m.mmtv(&y, &mut z);
        let z_dense = -(dense.transpose() * y_dense);
        assert_relative_eq!(flatten(&z), z_dense, epsilon = 1e-14);
        assert_eq!(unflatten::<2>(&flatten(&x)), x);
    }
}
