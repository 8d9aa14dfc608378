use crate::bse::{BseDimensions, Factorization};
use crate::distributed::{DistributedMatrix, ProcessGrid, SerialCommunicator};
use ndarray::prelude::*;
use ndarray_linalg::generate::random;
use std::rc::Rc;

/// Grid that consists only of the calling process.
pub fn serial_grid(block_size: usize) -> ProcessGrid {
    ProcessGrid::new(Rc::new(SerialCommunicator), 1, 1, block_size)
}

/// Distributed matrix with the given diagonal and zeros elsewhere.
pub fn diagonal_matrix(grid: &ProcessGrid, diag: ArrayView1<f64>) -> DistributedMatrix {
    let mut matrix: DistributedMatrix = DistributedMatrix::zeros(grid, diag.len(), diag.len());
    matrix.add_to_diag(diag);
    matrix
}

/// Random symmetric matrix of dimension n.
pub fn random_symmetric(n: usize) -> Array2<f64> {
    let r: Array2<f64> = random((n, n));
    &r + &r.t()
}

/// Replicated RI factors of a model system.
#[derive(Debug, Clone)]
pub struct RiFactorArrays {
    pub s_ia: Array2<f64>,
    pub s_bar_ia: Array2<f64>,
    pub s_bar_ij: Array2<f64>,
    pub s_ab: Array2<f64>,
}

/// Distributes the factors on `grid` in the order S_ia, S_bar_ia, S_bar_ij, S_ab.
pub fn replicate(grid: &ProcessGrid, arrays: &RiFactorArrays) -> [DistributedMatrix; 4] {
    [
        DistributedMatrix::from_replicated(grid, arrays.s_ia.view()),
        DistributedMatrix::from_replicated(grid, arrays.s_bar_ia.view()),
        DistributedMatrix::from_replicated(grid, arrays.s_bar_ij.view()),
        DistributedMatrix::from_replicated(grid, arrays.s_ab.view()),
    ]
}

/// Random factors of a pair space that are symmetric under the exchange of both orbitals.
fn pair_symmetric_factors(dim_ri: usize, n: usize, scale: f64) -> Array2<f64> {
    let pairs = Factorization::new(n, n);
    let r: Array2<f64> = random((dim_ri, n * n));
    Array2::from_shape_fn((dim_ri, n * n), |(p, q)| {
        let (x, y): (usize, usize) = pairs.split(q);
        scale * r[[p, pairs.combine(x.min(y), x.max(y))]]
    })
}

/// Random RI factors whose screened factors are obtained with a symmetric model screening
/// `S_bar = W S`. A and B are symmetric for these factors.
pub fn random_ri_factors(dims: BseDimensions, scale: f64) -> RiFactorArrays {
    let n_ri: usize = dims.dim_ri;
    let r: Array2<f64> = random((n_ri, n_ri));
    let w: Array2<f64> = Array2::<f64>::eye(n_ri) + 0.1 * (&r + &r.t());

    let s_ia: Array2<f64> = random((n_ri, dims.n_ov()));
    let s_ia: Array2<f64> = scale * s_ia;
    let s_ij: Array2<f64> = pair_symmetric_factors(n_ri, dims.homo, scale);
    let s_ab: Array2<f64> = pair_symmetric_factors(n_ri, dims.virt, scale);
    RiFactorArrays {
        s_bar_ia: w.dot(&s_ia),
        s_ia,
        s_bar_ij: w.dot(&s_ij),
        s_ab,
    }
}

/// All factors equal to one.
pub fn unit_ri_factors(dims: BseDimensions) -> RiFactorArrays {
    let n_ri: usize = dims.dim_ri;
    RiFactorArrays {
        s_ia: Array2::ones((n_ri, dims.n_ov())),
        s_bar_ia: Array2::ones((n_ri, dims.n_ov())),
        s_bar_ij: Array2::ones((n_ri, dims.homo * dims.homo)),
        s_ab: Array2::ones((n_ri, dims.virt * dims.virt)),
    }
}
