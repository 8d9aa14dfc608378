use mpi::collective::SystemOperation;
use mpi::datatype::{Partition, PartitionMut};
use mpi::topology::{Communicator as MpiCommunicator, SimpleCommunicator};
use mpi::traits::*;
use mpi::Count;

/// A single matrix element that is sent to the process owning its global position.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Equivalence)]
pub struct Contribution {
    pub row: usize,
    pub col: usize,
    pub value: f64,
}

/// Collective operations between the processes that share a process grid. All processes of
/// the group have to call the same operations in the same order.
pub trait Communicator {
    /// Index of the calling process in the group.
    fn rank(&self) -> usize;

    /// Number of processes in the group.
    fn size(&self) -> usize;

    fn barrier(&self);

    /// Elementwise sum of `buffer` over all processes. On return every process holds the sum.
    fn all_reduce_sum(&self, buffer: &mut [f64]);

    /// Personalized all-to-all exchange. `outgoing[r]` is delivered to process `r`; the
    /// returned vector contains everything that was addressed to the calling process.
    fn all_to_all(&self, outgoing: Vec<Vec<Contribution>>) -> Vec<Contribution>;

    /// Overwrites `buffer` on every process with the values of the root process.
    fn broadcast(&self, buffer: &mut [f64]) {
        if !self.is_root() {
            buffer.iter_mut().for_each(|value| *value = 0.0);
        }
        self.all_reduce_sum(buffer);
    }

    /// Returns true on every process if the flag was set on at least one of them.
    fn any(&self, flag: bool) -> bool {
        let mut buffer: [f64; 1] = [if flag { 1.0 } else { 0.0 }];
        self.all_reduce_sum(&mut buffer);
        buffer[0] > 0.0
    }

    fn is_root(&self) -> bool {
        self.rank() == 0
    }
}

impl Communicator for SimpleCommunicator {
    fn rank(&self) -> usize {
        MpiCommunicator::rank(self) as usize
    }

    fn size(&self) -> usize {
        MpiCommunicator::size(self) as usize
    }

    fn barrier(&self) {
        CommunicatorCollectives::barrier(self);
    }

    fn all_reduce_sum(&self, buffer: &mut [f64]) {
        let send: Vec<f64> = buffer.to_vec();
        self.all_reduce_into(&send[..], buffer, SystemOperation::sum());
    }

    fn all_to_all(&self, outgoing: Vec<Vec<Contribution>>) -> Vec<Contribution> {
        let size: usize = Communicator::size(self);
        assert_eq!(outgoing.len(), size, "all-to-all expects one bucket per rank");

        // Every process first learns how many elements it receives from each other process.
        let send_counts: Vec<Count> = outgoing.iter().map(|b| b.len() as Count).collect();
        let mut recv_counts: Vec<Count> = vec![0; size];
        self.all_to_all_into(&send_counts[..], &mut recv_counts[..]);

        let send_displacements: Vec<Count> = displacements(&send_counts);
        let recv_displacements: Vec<Count> = displacements(&recv_counts);
        let n_recv: usize = recv_counts.iter().map(|&c| c as usize).sum();

        let send_contig: Vec<Contribution> = outgoing.into_iter().flatten().collect();
        let mut recv_contig: Vec<Contribution> = vec![
            Contribution {
                row: 0,
                col: 0,
                value: 0.0,
            };
            n_recv
        ];
        {
            let send_part = Partition::new(&send_contig[..], send_counts, send_displacements);
            let mut recv_part =
                PartitionMut::new(&mut recv_contig[..], recv_counts, recv_displacements);
            self.all_to_all_varcount_into(&send_part, &mut recv_part);
        }
        recv_contig
    }

    fn broadcast(&self, buffer: &mut [f64]) {
        self.process_at_rank(0).broadcast_into(buffer);
    }
}

/// Exclusive prefix sum of the message counts.
fn displacements(counts: &[Count]) -> Vec<Count> {
    counts
        .iter()
        .scan(0, |acc, &count| {
            let start: Count = *acc;
            *acc += count;
            Some(start)
        })
        .collect()
}
