use crate::bse::states::Transition;
use crate::bse::BseDimensions;
use crate::distributed::{Contribution, DistributedMatrix, Transpose};
use ndarray::prelude::*;
use rayon::prelude::*;

/// Transforms the eigenvectors Z of C into the excitation amplitudes X.
///
/// With `C Z = Omega^2 Z` the solutions of the BSE are
/// `X+Y = Omega^(-1/2) (A-B)^(1/2) Z` and `X-Y = Omega^(1/2) (A-B)^(-1/2) Z`,
/// normalized such that `(X+Y)^T (X-Y) = 1`. The factor 1/2 of `X = ((X+Y) + (X-Y)) / 2` is
/// folded into the column scaling of both terms. The square roots are consumed.
pub fn reconstruct_amplitudes(
    z_mat: &DistributedMatrix,
    omega: ArrayView1<f64>,
    sqrt_a_m_b: DistributedMatrix,
    inv_sqrt_a_m_b: DistributedMatrix,
) -> DistributedMatrix {
    assert_eq!(omega.len(), z_mat.ncols());
    assert!(
        omega.iter().all(|&w| w > 0.0),
        "the excitation energies have to be positive"
    );

    let mut x_mat: DistributedMatrix =
        DistributedMatrix::product(Transpose::No, Transpose::No, &sqrt_a_m_b, z_mat);
    drop(sqrt_a_m_b);
    x_mat.scale_columns(omega.mapv(|w| 0.5 / w.sqrt()).view());

    let mut x_m_y: DistributedMatrix =
        DistributedMatrix::product(Transpose::No, Transpose::No, &inv_sqrt_a_m_b, z_mat);
    drop(inv_sqrt_a_m_b);
    x_m_y.scale_columns(omega.mapv(|w| 0.5 * w.sqrt()).view());

    x_mat += &x_m_y;
    x_mat
}

/// Collective: collects for the first `n_states` excitations all single-particle transitions
/// whose amplitude exceeds `threshold` in absolute value. The transitions of every excitation
/// are ordered by their combined (i, a) index and are known on every process afterwards.
pub fn filter_transitions(
    x_mat: &DistributedMatrix,
    n_states: usize,
    threshold: f64,
    dims: BseDimensions,
) -> Vec<Vec<Transition>> {
    assert_eq!(x_mat.nrows(), dims.n_ov());
    let n_states: usize = n_states.min(x_mat.ncols());
    let local: ArrayView2<f64> = x_mat.local();
    let rows: &[usize] = x_mat.row_indices();

    let selected: Vec<Contribution> = x_mat
        .col_indices()
        .par_iter()
        .enumerate()
        .filter(|(_, &state)| state < n_states)
        .flat_map_iter(|(l_col, &state)| {
            local
                .column(l_col)
                .into_iter()
                .zip(rows.iter())
                .filter(|(value, _)| value.abs() > threshold)
                .map(|(&value, &row)| Contribution {
                    row,
                    col: state,
                    value,
                })
                .collect::<Vec<Contribution>>()
        })
        .collect();

    // Every process receives the selection of every other process.
    let comm = x_mat.grid().comm();
    let received: Vec<Contribution> = comm.all_to_all(vec![selected; comm.size()]);

    let ov = dims.ov();
    let mut transitions: Vec<Vec<Transition>> = vec![Vec::new(); n_states];
    for c in received.into_iter() {
        let (i, a): (usize, usize) = ov.split(c.row);
        transitions[c.col].push(Transition::new(i, a, c.value, dims.homo));
    }
    for list in transitions.iter_mut() {
        list.sort_by_key(|t| ov.combine(t.occ, t.virt));
    }
    transitions
}
