use crate::bse::index::{Factorization, Permutation, SubIndex};
use crate::distributed::{owner, Contribution, DistributedMatrix};
use rayon::prelude::*;

/// Adds `scale * src` to `dest` after permuting the four sub-indices of every element.
///
/// The rows of `src` are combined indices split by `row_factor_src`, its columns by
/// `col_factor_src`; the same holds for `dest`. Every element (r1, r2, c1, c2) of `src` is
/// permuted into (r1', r2', c1', c2'), recombined and sent to the process that owns the
/// destination element. The two matrices may live on different process grids as long as both
/// grids span the same processes. This is a collective operation.
pub fn remap_accumulate(
    dest: &mut DistributedMatrix,
    src: &DistributedMatrix,
    scale: f64,
    row_factor_src: Factorization,
    col_factor_src: Factorization,
    row_factor_dest: Factorization,
    col_factor_dest: Factorization,
    permutation: Permutation,
) {
    assert_eq!(
        (row_factor_src.size(), col_factor_src.size()),
        src.dim(),
        "factorization of the source does not match its dimensions"
    );
    assert_eq!(
        (row_factor_dest.size(), col_factor_dest.size()),
        dest.dim(),
        "factorization of the destination does not match its dimensions"
    );
    let source_extents: [usize; 4] = [
        row_factor_src.n1,
        row_factor_src.n2,
        col_factor_src.n1,
        col_factor_src.n2,
    ];
    let dest_extents: [usize; 4] = [
        row_factor_dest.n1,
        row_factor_dest.n2,
        col_factor_dest.n1,
        col_factor_dest.n2,
    ];
    assert_eq!(
        permutation.apply(source_extents),
        dest_extents,
        "permutation {} maps the source extents {:?} onto incompatible destination extents {:?}",
        permutation,
        source_extents,
        dest_extents
    );
    let n_procs: usize = dest.grid().comm().size();
    assert_eq!(
        src.grid().comm().size(),
        n_procs,
        "source and destination are distributed over different process groups"
    );

    // The local elements are translated column by column and sorted by the owning process.
    let (nb, nprow, npcol): (usize, usize, usize) = (
        dest.grid().block_size(),
        dest.grid().nprow(),
        dest.grid().npcol(),
    );
    let rows: &[usize] = src.row_indices();
    let local = src.local();
    let outgoing: Vec<Vec<Contribution>> = src
        .col_indices()
        .par_iter()
        .enumerate()
        .fold(
            || vec![Vec::new(); n_procs],
            |mut buckets, (l_col, &col)| {
                let (c1, c2): (usize, usize) = col_factor_src.split(col);
                for (l_row, &row) in rows.iter().enumerate() {
                    let (r1, r2): (usize, usize) = row_factor_src.split(row);
                    let [d_r1, d_r2, d_c1, d_c2] = permutation.apply([r1, r2, c1, c2]);
                    let d_row: usize = row_factor_dest.combine(d_r1, d_r2);
                    let d_col: usize = col_factor_dest.combine(d_c1, d_c2);
                    let dest_rank: usize =
                        owner(d_row, nb, nprow) * npcol + owner(d_col, nb, npcol);
                    buckets[dest_rank].push(Contribution {
                        row: d_row,
                        col: d_col,
                        value: scale * local[[l_row, l_col]],
                    });
                }
                buckets
            },
        )
        .reduce(
            || vec![Vec::new(); n_procs],
            |mut left, right| {
                left.iter_mut()
                    .zip(right.into_iter())
                    .for_each(|(l, r)| l.extend(r));
                left
            },
        );

    let received: Vec<Contribution> = dest.grid().comm().all_to_all(outgoing);
    dest.add_contributions(&received);
}

/// Permutation that moves W[(i,j),(a,b)] to A[(i,a),(j,b)].
pub fn direct_term_permutation() -> Permutation {
    Permutation::new(SubIndex::Row1, SubIndex::Col1, SubIndex::Row2, SubIndex::Col2)
}

/// Permutation that moves W[(i,b),(j,a)] to B[(i,a),(j,b)].
pub fn exchange_term_permutation() -> Permutation {
    Permutation::new(SubIndex::Row1, SubIndex::Col2, SubIndex::Col1, SubIndex::Row2)
}
