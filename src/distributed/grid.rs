use crate::distributed::comm::Communicator;
use std::fmt;
use std::rc::Rc;

/// Two dimensional process grid with a fixed block size for the block-cyclic distribution of
/// matrices. Processes are numbered row-major over the grid, i.e. `rank = prow * npcol + pcol`.
/// Several grids can share the same communicator; each distributed matrix carries the grid it
/// was created on.
#[derive(Clone)]
pub struct ProcessGrid {
    comm: Rc<dyn Communicator>,
    nprow: usize,
    npcol: usize,
    myrow: usize,
    mycol: usize,
    block_size: usize,
}

impl ProcessGrid {
    pub fn new(comm: Rc<dyn Communicator>, nprow: usize, npcol: usize, block_size: usize) -> Self {
        assert!(block_size > 0, "block size must be positive");
        assert_eq!(
            nprow * npcol,
            comm.size(),
            "process grid {}x{} does not match the number of processes {}",
            nprow,
            npcol,
            comm.size()
        );
        let rank: usize = comm.rank();
        Self {
            nprow,
            npcol,
            myrow: rank / npcol,
            mycol: rank % npcol,
            block_size,
            comm,
        }
    }

    /// Grid that is as close to square as possible, with more columns than rows if the number
    /// of processes is not a square number.
    pub fn square(comm: Rc<dyn Communicator>, block_size: usize) -> Self {
        let size: usize = comm.size();
        let mut nprow: usize = (size as f64).sqrt() as usize;
        while nprow > 1 && size % nprow != 0 {
            nprow -= 1;
        }
        let nprow: usize = nprow.max(1);
        Self::new(comm, nprow, size / nprow, block_size)
    }

    /// Grid on the same processes with a different shape or block size.
    pub fn with_shape(&self, nprow: usize, npcol: usize, block_size: usize) -> Self {
        Self::new(Rc::clone(&self.comm), nprow, npcol, block_size)
    }

    pub fn comm(&self) -> &dyn Communicator {
        self.comm.as_ref()
    }

    pub fn nprow(&self) -> usize {
        self.nprow
    }

    pub fn npcol(&self) -> usize {
        self.npcol
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn is_root(&self) -> bool {
        self.comm.is_root()
    }

    /// Rank of the process at the grid coordinates.
    pub fn rank_of(&self, prow: usize, pcol: usize) -> usize {
        prow * self.npcol + pcol
    }

    /// Rank of the process that owns the global element (row, col).
    pub fn owner_of(&self, row: usize, col: usize) -> usize {
        self.rank_of(
            owner(row, self.block_size, self.nprow),
            owner(col, self.block_size, self.npcol),
        )
    }

    /// Global row indices of the local rows of a matrix with `n` global rows.
    pub fn local_rows(&self, n: usize) -> Vec<usize> {
        local_to_global_table(n, self.block_size, self.myrow, self.nprow)
    }

    /// Global column indices of the local columns of a matrix with `n` global columns.
    pub fn local_cols(&self, n: usize) -> Vec<usize> {
        local_to_global_table(n, self.block_size, self.mycol, self.npcol)
    }
}

impl fmt::Debug for ProcessGrid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessGrid")
            .field("nprow", &self.nprow)
            .field("npcol", &self.npcol)
            .field("myrow", &self.myrow)
            .field("mycol", &self.mycol)
            .field("block_size", &self.block_size)
            .finish()
    }
}

/// Number of the `n` global indices that are stored on process `iproc` out of `nprocs`.
pub fn numroc(n: usize, nb: usize, iproc: usize, nprocs: usize) -> usize {
    let nblocks: usize = n / nb;
    let mut count: usize = (nblocks / nprocs) * nb;
    let extra: usize = nblocks % nprocs;
    if iproc < extra {
        count += nb;
    } else if iproc == extra {
        count += n % nb;
    }
    count
}

/// Process coordinate that owns the global index.
pub fn owner(global: usize, nb: usize, nprocs: usize) -> usize {
    (global / nb) % nprocs
}

/// Global index of the local index `local` on process `iproc`.
pub fn local_to_global(local: usize, nb: usize, iproc: usize, nprocs: usize) -> usize {
    (local / nb) * nb * nprocs + iproc * nb + local % nb
}

/// Local index of a global index on the process that owns it.
pub fn global_to_local(global: usize, nb: usize, nprocs: usize) -> usize {
    (global / (nb * nprocs)) * nb + global % nb
}

fn local_to_global_table(n: usize, nb: usize, iproc: usize, nprocs: usize) -> Vec<usize> {
    (0..numroc(n, nb, iproc, nprocs))
        .map(|l| local_to_global(l, nb, iproc, nprocs))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distributed::{run_on_thread_group, SerialCommunicator};

    #[test]
    fn numroc_covers_all_indices() {
        for n in [0, 1, 5, 7, 16, 17] {
            for nprocs in 1..4 {
                let total: usize = (0..nprocs).map(|p| numroc(n, 2, p, nprocs)).sum();
                assert_eq!(total, n);
            }
        }
    }

    #[test]
    fn local_global_round_trip() {
        let (nb, nprocs, n): (usize, usize, usize) = (3, 2, 13);
        for p in 0..nprocs {
            for l in 0..numroc(n, nb, p, nprocs) {
                let g: usize = local_to_global(l, nb, p, nprocs);
                assert_eq!(owner(g, nb, nprocs), p);
                assert_eq!(global_to_local(g, nb, nprocs), l);
            }
        }
    }

    #[test]
    fn square_grid_shapes() {
        let grid = ProcessGrid::square(Rc::new(SerialCommunicator), 4);
        assert_eq!((grid.nprow(), grid.npcol()), (1, 1));
        let shapes: Vec<(usize, usize, Vec<usize>, Vec<usize>)> = run_on_thread_group(6, |comm| {
            let grid = ProcessGrid::square(comm, 2);
            (grid.nprow(), grid.npcol(), grid.local_rows(6), grid.local_cols(6))
        });
        assert_eq!(shapes[0].0, 2);
        assert_eq!(shapes[0].1, 3);
        // rank 5 sits at grid position (1, 2)
        assert_eq!(shapes[5].2, vec![2, 3]);
        assert_eq!(shapes[5].3, vec![4, 5]);
    }
}
