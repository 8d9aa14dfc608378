use crate::bse::remap::{direct_term_permutation, exchange_term_permutation, remap_accumulate};
use crate::bse::{BseDimensions, SpinConfiguration};
use crate::distributed::{DistributedMatrix, ProcessGrid, Transpose};
use ndarray::prelude::*;

/// The differences between the virtual and occupied quasiparticle energies
/// `e[homo + a] - e[i]`, ordered by the combined index (i, a) with i running fastest.
pub fn orbe_differences(energies: ArrayView1<f64>, homo: usize, virt: usize) -> Array1<f64> {
    assert_eq!(
        energies.len(),
        homo + virt,
        "expected {} quasiparticle energies",
        homo + virt
    );
    let occ: ArrayView1<f64> = energies.slice(s![..homo]);
    let vir: ArrayView1<f64> = energies.slice(s![homo..]);
    // Broadcasting the virtual energies along the occupied axis and flattening in column-major
    // order puts the occupied index on the fast axis.
    let diff: Array2<f64> = &vir.insert_axis(Axis(0)) - &occ.insert_axis(Axis(1));
    diff.t().iter().copied().collect()
}

/// The bare exchange kernel `alpha * S_ia^T S_ia` on the grid of `s_ia`.
fn exchange_kernel(s_ia: &DistributedMatrix, n_ov: usize, alpha: f64) -> DistributedMatrix {
    let mut kernel: DistributedMatrix = DistributedMatrix::zeros(s_ia.grid(), n_ov, n_ov);
    // Triplets have no exchange contribution.
    if alpha != 0.0 {
        kernel.gemm(Transpose::Yes, Transpose::No, alpha, s_ia, s_ia, 0.0);
    }
    kernel
}

fn check_factor(name: &str, factor: &DistributedMatrix, dim_ri: usize, n_pairs: usize) {
    assert_eq!(
        factor.dim(),
        (dim_ri, n_pairs),
        "RI factor {} has the shape {:?}, expected {:?}",
        name,
        factor.dim(),
        (dim_ri, n_pairs)
    );
}

/// Builds the resonant coupling matrix
/// `A[ia,jb] = (e_a - e_i) delta_ij delta_ab + alpha (ia|jb) - (ij|W|ab)`.
///
/// * `s_ia` unscreened RI factors of the occupied-virtual pairs, [dim_ri, homo * virt]
/// * `s_bar_ij` screened RI factors of the occupied-occupied pairs, [dim_ri, homo^2]
/// * `s_ab` unscreened RI factors of the virtual-virtual pairs, [dim_ri, virt^2]
/// * `aux_grid` process grid of the [homo^2, virt^2] intermediate of the direct term
///
/// The matrix is created on the grid of `s_ia`.
pub fn create_a(
    s_ia: &DistributedMatrix,
    s_bar_ij: &DistributedMatrix,
    s_ab: &DistributedMatrix,
    energies: ArrayView1<f64>,
    dims: BseDimensions,
    spin: SpinConfiguration,
    aux_grid: &ProcessGrid,
) -> DistributedMatrix {
    check_factor("S_ia", s_ia, dims.dim_ri, dims.n_ov());
    check_factor("S_bar_ij", s_bar_ij, dims.dim_ri, dims.homo * dims.homo);
    check_factor("S_ab", s_ab, dims.dim_ri, dims.virt * dims.virt);

    let mut a_mat: DistributedMatrix = exchange_kernel(s_ia, dims.n_ov(), spin.alpha());

    // Screened direct term, W[(i,j),(a,b)] = (ij|W|ab).
    let mut w_mat: DistributedMatrix =
        DistributedMatrix::zeros(aux_grid, dims.homo * dims.homo, dims.virt * dims.virt);
    w_mat.gemm(Transpose::Yes, Transpose::No, 1.0, s_bar_ij, s_ab, 0.0);
    remap_accumulate(
        &mut a_mat,
        &w_mat,
        -1.0,
        dims.oo(),
        dims.vv(),
        dims.ov(),
        dims.ov(),
        direct_term_permutation(),
    );
    drop(w_mat);

    a_mat.add_to_diag(orbe_differences(energies, dims.homo, dims.virt).view());
    a_mat
}

/// Builds the coupling matrix `B[ia,jb] = alpha (ia|jb) - (ib|W|ja)`.
///
/// * `s_ia` unscreened RI factors of the occupied-virtual pairs, [dim_ri, homo * virt]
/// * `s_bar_ia` screened RI factors of the occupied-virtual pairs, [dim_ri, homo * virt]
pub fn create_b(
    s_ia: &DistributedMatrix,
    s_bar_ia: &DistributedMatrix,
    dims: BseDimensions,
    spin: SpinConfiguration,
) -> DistributedMatrix {
    check_factor("S_ia", s_ia, dims.dim_ri, dims.n_ov());
    check_factor("S_bar_ia", s_bar_ia, dims.dim_ri, dims.n_ov());

    let mut b_mat: DistributedMatrix = exchange_kernel(s_ia, dims.n_ov(), spin.alpha());

    // Screened exchange term, W[(i,b),(j,a)] = (ib|W|ja).
    let mut w_mat: DistributedMatrix =
        DistributedMatrix::zeros(s_ia.grid(), dims.n_ov(), dims.n_ov());
    w_mat.gemm(Transpose::Yes, Transpose::No, 1.0, s_bar_ia, s_ia, 0.0);
    remap_accumulate(
        &mut b_mat,
        &w_mat,
        -1.0,
        dims.ov(),
        dims.ov(),
        dims.ov(),
        dims.ov(),
        exchange_term_permutation(),
    );
    b_mat
}
