use crate::bse::eigensolver::{diagonalize, EigenPairs};
use crate::bse::BseError;
use crate::distributed::{DistributedMatrix, Transpose};
use ndarray::prelude::*;

/// Symmetric form of the BSE and the square roots of A - B that are needed to transform its
/// eigenvectors back.
pub struct HermitianReduction {
    /// `C = (A-B)^(1/2) (A+B) (A-B)^(1/2)`
    pub c: DistributedMatrix,
    /// `(A-B)^(1/2)`
    pub sqrt_a_m_b: DistributedMatrix,
    /// `(A-B)^(-1/2)`
    pub inv_sqrt_a_m_b: DistributedMatrix,
    /// Smallest eigenvalue of A - B.
    pub min_eigenvalue: f64,
}

/// Reduces the non-Hermitian BSE to the symmetric eigenvalue problem
/// `(A-B)^(1/2) (A+B) (A-B)^(1/2) F = Omega^2 F`.
///
/// A - B is diagonalized once; the inverse square root is built from its spectrum and the
/// square root follows as `(A-B)^(-1/2) (A-B)`. A and B are consumed and every intermediate
/// is released as soon as it has been folded into the next matrix.
pub fn reduce(
    a_mat: DistributedMatrix,
    b_mat: DistributedMatrix,
) -> Result<HermitianReduction, BseError> {
    assert_eq!(a_mat.dim(), b_mat.dim(), "A and B differ in shape");
    assert_eq!(a_mat.nrows(), a_mat.ncols(), "A is not square");

    // A + B overwrites A and A - B = (A + B) - 2B overwrites B.
    let mut a_p_b: DistributedMatrix = a_mat;
    a_p_b += &b_mat;
    let mut a_m_b: DistributedMatrix = b_mat;
    a_m_b.scale(-2.0);
    a_m_b += &a_p_b;

    let EigenPairs {
        eigenvalues,
        eigenvectors,
    } = diagonalize(&a_m_b)?;
    // The eigenvalues are broadcast from the root, so every process reaches the same decision.
    let min_eigenvalue: f64 = eigenvalues.iter().copied().fold(f64::INFINITY, f64::min);
    if !(min_eigenvalue > 0.0) {
        return Err(BseError::NotPositiveDefinite { min_eigenvalue });
    }

    // (A-B)^(-1/2) = (V L^(-1/4)) (V L^(-1/4))^T
    let mut half: DistributedMatrix = eigenvectors;
    half.scale_columns(eigenvalues.mapv(|l| l.powf(-0.25)).view());
    let inv_sqrt_a_m_b: DistributedMatrix =
        DistributedMatrix::product(Transpose::No, Transpose::Yes, &half, &half);
    drop(half);

    let sqrt_a_m_b: DistributedMatrix =
        DistributedMatrix::product(Transpose::No, Transpose::No, &inv_sqrt_a_m_b, &a_m_b);
    drop(a_m_b);

    let tmp: DistributedMatrix =
        DistributedMatrix::product(Transpose::No, Transpose::No, &a_p_b, &sqrt_a_m_b);
    drop(a_p_b);
    let c: DistributedMatrix =
        DistributedMatrix::product(Transpose::No, Transpose::No, &sqrt_a_m_b, &tmp);
    drop(tmp);

    Ok(HermitianReduction {
        c,
        sqrt_a_m_b,
        inv_sqrt_a_m_b,
        min_eigenvalue,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distributed::run_on_thread_group;
    use crate::distributed::ProcessGrid;
    use crate::utils::tests::serial_grid;
    use approx::AbsDiffEq;
    use ndarray_linalg::generate::random;

    /// A and B with A - B and A + B positive definite.
    fn coupling_matrices(n: usize) -> (Array2<f64>, Array2<f64>) {
        let r: Array2<f64> = random((n, n));
        let a: Array2<f64> =
            Array2::from_diag(&Array1::linspace(1.0, 2.0, n)) + 0.05 * (&r + &r.t());
        let q: Array2<f64> = random((n, n));
        let b: Array2<f64> = 0.05 * (&q + &q.t());
        (a, b)
    }

    #[test]
    fn square_roots_are_consistent() {
        let (a, b) = coupling_matrices(6);
        let a_m_b: Array2<f64> = &a - &b;
        let a_p_b: Array2<f64> = &a + &b;
        let grid = serial_grid(2);
        let reduction = reduce(
            DistributedMatrix::from_replicated(&grid, a.view()),
            DistributedMatrix::from_replicated(&grid, b.view()),
        )
        .unwrap();
        let sqrt: Array2<f64> = reduction.sqrt_a_m_b.gather();
        let inv_sqrt: Array2<f64> = reduction.inv_sqrt_a_m_b.gather();
        let c: Array2<f64> = reduction.c.gather();

        assert!(sqrt.dot(&sqrt).abs_diff_eq(&a_m_b, 1e-10));
        assert!(inv_sqrt
            .dot(&a_m_b)
            .dot(&inv_sqrt)
            .abs_diff_eq(&Array2::<f64>::eye(6), 1e-10));
        assert!(c.abs_diff_eq(&c.t(), 1e-10));
        assert!(c.abs_diff_eq(&sqrt.dot(&a_p_b).dot(&sqrt), 1e-10));
        assert!(reduction.min_eigenvalue > 0.0);
    }

    #[test]
    fn negative_eigenvalue_is_rejected() {
        let a: Array2<f64> = array![[1.0, 0.0], [0.0, 0.5]];
        let b: Array2<f64> = array![[0.2, 0.0], [0.0, 0.9]];
        let grid = serial_grid(1);
        let result = reduce(
            DistributedMatrix::from_replicated(&grid, a.view()),
            DistributedMatrix::from_replicated(&grid, b.view()),
        );
        match result {
            Err(BseError::NotPositiveDefinite { min_eigenvalue }) => {
                assert!(min_eigenvalue.abs_diff_eq(&-0.4, 1e-12))
            }
            _ => panic!("A - B with a negative eigenvalue was accepted"),
        }
    }

    #[test]
    fn rejection_is_consistent_on_all_processes() {
        let a: Array2<f64> = Array2::from_diag(&array![1.0, 0.5, 0.7, 0.9]);
        let b: Array2<f64> = Array2::from_diag(&array![0.2, 0.9, 0.1, 0.1]);
        let rejected: Vec<bool> = run_on_thread_group(2, |comm| {
            let grid = ProcessGrid::new(comm, 1, 2, 1);
            reduce(
                DistributedMatrix::from_replicated(&grid, a.view()),
                DistributedMatrix::from_replicated(&grid, b.view()),
            )
            .is_err()
        });
        assert_eq!(rejected, vec![true, true]);
    }
}
