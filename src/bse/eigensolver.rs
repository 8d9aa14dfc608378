use crate::bse::BseError;
use crate::distributed::DistributedMatrix;
use ndarray::prelude::*;
use ndarray_linalg::{Eigh, UPLO};

/// Eigenvalues (ascending, known on every process) and the distributed eigenvectors, stored
/// column-wise.
pub struct EigenPairs {
    pub eigenvalues: Array1<f64>,
    pub eigenvectors: DistributedMatrix,
}

/// Collective: full diagonalization of a symmetric distributed matrix. Only the lower triangle
/// is referenced. The matrix is assembled on every process and handed to the dense LAPACK
/// solver on the root process. Its eigenvalues and eigenvectors are broadcast, so that every
/// decision taken on them is the same on all processes. The eigenvectors are distributed on
/// the grid of the input matrix.
pub fn diagonalize(matrix: &DistributedMatrix) -> Result<EigenPairs, BseError> {
    assert_eq!(
        matrix.nrows(),
        matrix.ncols(),
        "only square matrices can be diagonalized"
    );
    let comm = matrix.grid().comm();
    let n: usize = matrix.nrows();
    let full: Array2<f64> = matrix.gather();

    let mut eigenvalues: Vec<f64> = vec![0.0; n];
    let mut eigenvectors: Vec<f64> = vec![0.0; n * n];
    let mut failure: Option<String> = None;
    if comm.is_root() {
        match full.eigh(UPLO::Lower) {
            Ok((values, vectors)) => {
                eigenvalues = values.to_vec();
                eigenvectors = vectors.iter().copied().collect();
            }
            Err(err) => failure = Some(err.to_string()),
        }
    }
    drop(full);

    if comm.any(failure.is_some()) {
        return Err(BseError::SolverFailure {
            message: failure
                .unwrap_or_else(|| String::from("the diagonalization failed on the root process")),
        });
    }
    comm.broadcast(&mut eigenvalues);
    comm.broadcast(&mut eigenvectors);

    let eigenvectors: Array2<f64> = Array2::from_shape_vec((n, n), eigenvectors).map_err(|err| {
        BseError::SolverFailure {
            message: err.to_string(),
        }
    })?;
    Ok(EigenPairs {
        eigenvalues: Array1::from(eigenvalues),
        eigenvectors: DistributedMatrix::from_replicated(matrix.grid(), eigenvectors.view()),
    })
}

/// Tamm-Dancoff approximation: the eigenvalues of A are the excitation energies and the
/// eigenvectors are the excitation amplitudes X.
pub fn solve_tda(a_mat: &DistributedMatrix) -> Result<EigenPairs, BseError> {
    diagonalize(a_mat)
}

/// Full BSE: the eigenvalues of C are the squared excitation energies. The returned pairs hold
/// the excitation energies and the eigenvectors of C.
pub fn solve_full(c_mat: &DistributedMatrix) -> Result<EigenPairs, BseError> {
    let pairs: EigenPairs = diagonalize(c_mat)?;
    if let Some((state, &omega_squared)) = pairs
        .eigenvalues
        .iter()
        .enumerate()
        .find(|&(_, &value)| !(value > 0.0))
    {
        return Err(BseError::NonPositiveExcitationEnergy {
            state,
            omega_squared,
        });
    }
    Ok(EigenPairs {
        eigenvalues: pairs.eigenvalues.mapv(f64::sqrt),
        eigenvectors: pairs.eigenvectors,
    })
}
