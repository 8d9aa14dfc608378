use crate::distributed::comm::Contribution;
use crate::distributed::grid::{global_to_local, owner, ProcessGrid};
use ndarray::prelude::*;
use std::ops::{AddAssign, SubAssign};

/// Transposition flag of the operands of [DistributedMatrix::gemm].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transpose {
    No,
    Yes,
}

/// Real dense matrix that is distributed block-cyclically over a [ProcessGrid]. Every process
/// stores its local block together with the global indices of its local rows and columns.
#[derive(Debug, Clone)]
pub struct DistributedMatrix {
    grid: ProcessGrid,
    nrows: usize,
    ncols: usize,
    local: Array2<f64>,
    row_indices: Vec<usize>,
    col_indices: Vec<usize>,
}

impl DistributedMatrix {
    pub fn zeros(grid: &ProcessGrid, nrows: usize, ncols: usize) -> Self {
        let row_indices: Vec<usize> = grid.local_rows(nrows);
        let col_indices: Vec<usize> = grid.local_cols(ncols);
        Self {
            grid: grid.clone(),
            nrows,
            ncols,
            local: Array2::zeros([row_indices.len(), col_indices.len()]),
            row_indices,
            col_indices,
        }
    }

    /// Builds the distributed matrix from a dense matrix that is known on every process.
    /// Each process copies only the elements it owns.
    pub fn from_replicated(grid: &ProcessGrid, full: ArrayView2<f64>) -> Self {
        let mut matrix: Self = Self::zeros(grid, full.nrows(), full.ncols());
        matrix.fill_local(|row, col| full[[row, col]]);
        matrix
    }

    /// Sets every local element to the value of `f(global_row, global_col)`.
    pub fn fill_local<F: Fn(usize, usize) -> f64>(&mut self, f: F) {
        for (mut row, &g_row) in self
            .local
            .axis_iter_mut(Axis(0))
            .zip(self.row_indices.iter())
        {
            for (value, &g_col) in row.iter_mut().zip(self.col_indices.iter()) {
                *value = f(g_row, g_col);
            }
        }
    }

    pub fn grid(&self) -> &ProcessGrid {
        &self.grid
    }

    pub fn nrows(&self) -> usize {
        self.nrows
    }

    pub fn ncols(&self) -> usize {
        self.ncols
    }

    pub fn dim(&self) -> (usize, usize) {
        (self.nrows, self.ncols)
    }

    pub fn local(&self) -> ArrayView2<'_, f64> {
        self.local.view()
    }

    /// Global indices of the local rows.
    pub fn row_indices(&self) -> &[usize] {
        &self.row_indices
    }

    /// Global indices of the local columns.
    pub fn col_indices(&self) -> &[usize] {
        &self.col_indices
    }

    /// Iterator over all local elements as (global row, global column, value).
    pub fn local_entries(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        self.local
            .indexed_iter()
            .map(move |((i, j), &value)| (self.row_indices[i], self.col_indices[j], value))
    }

    /// Adds a set of contributions that all belong to elements stored on this process.
    pub fn add_contributions(&mut self, contributions: &[Contribution]) {
        let nb: usize = self.grid.block_size();
        let (nprow, npcol): (usize, usize) = (self.grid.nprow(), self.grid.npcol());
        for c in contributions.iter() {
            debug_assert_eq!(self.grid.owner_of(c.row, c.col), self.grid.comm().rank());
            let l_row: usize = global_to_local(c.row, nb, nprow);
            let l_col: usize = global_to_local(c.col, nb, npcol);
            self.local[[l_row, l_col]] += c.value;
        }
    }

    /// Collective: the full matrix is assembled on every process.
    pub fn gather(&self) -> Array2<f64> {
        let mut buffer: Vec<f64> = vec![0.0; self.nrows * self.ncols];
        for (row, col, value) in self.local_entries() {
            buffer[row * self.ncols + col] = value;
        }
        self.grid.comm().all_reduce_sum(&mut buffer);
        Array2::from_shape_vec((self.nrows, self.ncols), buffer).unwrap()
    }

    /// Collective: the global diagonal is assembled on every process.
    pub fn gather_diag(&self) -> Array1<f64> {
        let mut diag: Array1<f64> = Array1::zeros(self.nrows.min(self.ncols));
        for (row, col, value) in self.local_entries() {
            if row == col {
                diag[row] = value;
            }
        }
        self.grid
            .comm()
            .all_reduce_sum(diag.as_slice_mut().unwrap());
        diag
    }

    /// Adds `diag[k]` to the element (k, k) for all k.
    pub fn add_to_diag(&mut self, diag: ArrayView1<f64>) {
        assert_eq!(diag.len(), self.nrows.min(self.ncols));
        let rows: &[usize] = &self.row_indices;
        let cols: &[usize] = &self.col_indices;
        for (mut row, &g_row) in self.local.axis_iter_mut(Axis(0)).zip(rows.iter()) {
            for (value, &g_col) in row.iter_mut().zip(cols.iter()) {
                if g_row == g_col {
                    *value += diag[g_row];
                }
            }
        }
    }

    /// Multiplies the global column k by `factors[k]`.
    pub fn scale_columns(&mut self, factors: ArrayView1<f64>) {
        assert_eq!(factors.len(), self.ncols);
        for (mut column, &g_col) in self
            .local
            .axis_iter_mut(Axis(1))
            .zip(self.col_indices.iter())
        {
            column *= factors[g_col];
        }
    }

    pub fn scale(&mut self, factor: f64) {
        self.local *= factor;
    }

    /// `self += factor * other` for matrices on the same grid.
    pub fn scaled_add(&mut self, factor: f64, other: &DistributedMatrix) {
        self.assert_same_layout(other);
        self.local.scaled_add(factor, &other.local);
    }

    /// Collective: `self = alpha * op(a) * op(b) + beta * self`. The operands may live on
    /// other grids of the same processes. Every process receives the rows of op(a) and the
    /// columns of op(b) that its local block of the product needs.
    pub fn gemm(
        &mut self,
        trans_a: Transpose,
        trans_b: Transpose,
        alpha: f64,
        a: &DistributedMatrix,
        b: &DistributedMatrix,
        beta: f64,
    ) {
        let (m, k_a): (usize, usize) = op_dim(trans_a, a);
        let (k_b, n): (usize, usize) = op_dim(trans_b, b);
        assert_eq!(k_a, k_b, "inner dimensions do not agree");
        assert_eq!(
            (m, n),
            self.dim(),
            "product does not fit into the result matrix"
        );
        let (panel_a, panel_b): (Array2<f64>, Array2<f64>) =
            self.exchange_panels(trans_a, trans_b, a, b, k_a);
        let product: Array2<f64> = panel_a.dot(&panel_b);
        self.local *= beta;
        self.local.scaled_add(alpha, &product);
    }

    /// Collective: routes every element of op(a) to the processes of its process row and
    /// every element of op(b) to the processes of its process column on the grid of `self`.
    /// Returns op(a) restricted to the local rows and op(b) restricted to the local columns.
    fn exchange_panels(
        &self,
        trans_a: Transpose,
        trans_b: Transpose,
        a: &DistributedMatrix,
        b: &DistributedMatrix,
        inner: usize,
    ) -> (Array2<f64>, Array2<f64>) {
        let comm = self.grid.comm();
        assert_eq!(a.grid.comm().size(), comm.size());
        assert_eq!(b.grid.comm().size(), comm.size());
        let nb: usize = self.grid.block_size();
        let (nprow, npcol): (usize, usize) = (self.grid.nprow(), self.grid.npcol());
        // Elements of op(b) are shifted by the number of rows of op(a).
        let offset: usize = self.nrows;

        let mut outgoing: Vec<Vec<Contribution>> = vec![Vec::new(); comm.size()];
        for (row, col, value) in a.local_entries() {
            let (r, k): (usize, usize) = op_position(trans_a, row, col);
            let prow: usize = owner(r, nb, nprow);
            for pcol in 0..npcol {
                outgoing[self.grid.rank_of(prow, pcol)].push(Contribution {
                    row: r,
                    col: k,
                    value,
                });
            }
        }
        for (row, col, value) in b.local_entries() {
            let (k, c): (usize, usize) = op_position(trans_b, row, col);
            let pcol: usize = owner(c, nb, npcol);
            for prow in 0..nprow {
                outgoing[self.grid.rank_of(prow, pcol)].push(Contribution {
                    row: offset + k,
                    col: c,
                    value,
                });
            }
        }

        let mut panel_a: Array2<f64> = Array2::zeros([self.row_indices.len(), inner]);
        let mut panel_b: Array2<f64> = Array2::zeros([inner, self.col_indices.len()]);
        for c in comm.all_to_all(outgoing).into_iter() {
            if c.row < offset {
                panel_a[[global_to_local(c.row, nb, nprow), c.col]] = c.value;
            } else {
                panel_b[[c.row - offset, global_to_local(c.col, nb, npcol)]] = c.value;
            }
        }
        (panel_a, panel_b)
    }

    /// Collective: returns `op(a) * op(b)` on the grid of `a`.
    pub fn product(
        trans_a: Transpose,
        trans_b: Transpose,
        a: &DistributedMatrix,
        b: &DistributedMatrix,
    ) -> DistributedMatrix {
        let (nrows, _): (usize, usize) = op_dim(trans_a, a);
        let (_, ncols): (usize, usize) = op_dim(trans_b, b);
        let mut c: DistributedMatrix = DistributedMatrix::zeros(&a.grid, nrows, ncols);
        c.gemm(trans_a, trans_b, 1.0, a, b, 0.0);
        c
    }

    fn assert_same_layout(&self, other: &DistributedMatrix) {
        assert_eq!(self.dim(), other.dim(), "matrix dimensions differ");
        assert_eq!(
            self.row_indices, other.row_indices,
            "matrices are distributed differently"
        );
        assert_eq!(
            self.col_indices, other.col_indices,
            "matrices are distributed differently"
        );
    }
}

/// Dimension of op(m).
fn op_dim(trans: Transpose, m: &DistributedMatrix) -> (usize, usize) {
    match trans {
        Transpose::No => (m.nrows, m.ncols),
        Transpose::Yes => (m.ncols, m.nrows),
    }
}

/// Position of the element (row, col) of m in op(m).
fn op_position(trans: Transpose, row: usize, col: usize) -> (usize, usize) {
    match trans {
        Transpose::No => (row, col),
        Transpose::Yes => (col, row),
    }
}

impl AddAssign<&DistributedMatrix> for DistributedMatrix {
    fn add_assign(&mut self, rhs: &DistributedMatrix) {
        self.scaled_add(1.0, rhs);
    }
}

impl SubAssign<&DistributedMatrix> for DistributedMatrix {
    fn sub_assign(&mut self, rhs: &DistributedMatrix) {
        self.scaled_add(-1.0, rhs);
    }
}
