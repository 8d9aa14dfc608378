//! In-process communicators for tests: a group of size one and a group of ranks that run on
//! threads of the test process.
use crate::distributed::comm::{Communicator, Contribution};
use std::mem;
use std::rc::Rc;
use std::sync::{Arc, Barrier, Mutex};

/// Group that consists only of the calling process.
#[derive(Debug, Default, Clone, Copy)]
pub struct SerialCommunicator;

impl Communicator for SerialCommunicator {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn barrier(&self) {}

    fn all_reduce_sum(&self, _buffer: &mut [f64]) {}

    fn all_to_all(&self, outgoing: Vec<Vec<Contribution>>) -> Vec<Contribution> {
        assert_eq!(outgoing.len(), 1, "serial all-to-all expects exactly one bucket");
        outgoing.into_iter().next().unwrap_or_default()
    }
}

/// Shared state of a group of in-process ranks.
struct ThreadGroup {
    size: usize,
    barrier: Barrier,
    reduction: Mutex<Vec<f64>>,
    mailboxes: Vec<Mutex<Vec<Contribution>>>,
}

/// Rank of a group of processes that are emulated by threads of the same OS process. Every
/// rank has to run on its own thread, otherwise the first collective call deadlocks.
pub struct ThreadCommunicator {
    rank: usize,
    group: Arc<ThreadGroup>,
}

impl ThreadCommunicator {
    /// Creates the communicators of all `size` ranks of a new group.
    pub fn group(size: usize) -> Vec<ThreadCommunicator> {
        assert!(size > 0, "a process group needs at least one rank");
        let group: Arc<ThreadGroup> = Arc::new(ThreadGroup {
            size,
            barrier: Barrier::new(size),
            reduction: Mutex::new(Vec::new()),
            mailboxes: (0..size).map(|_| Mutex::new(Vec::new())).collect(),
        });
        (0..size)
            .map(|rank| ThreadCommunicator {
                rank,
                group: Arc::clone(&group),
            })
            .collect()
    }
}

impl Communicator for ThreadCommunicator {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.group.size
    }

    fn barrier(&self) {
        self.group.barrier.wait();
    }

    fn all_reduce_sum(&self, buffer: &mut [f64]) {
        // The root resets the accumulator once everybody left the previous collective.
        self.barrier();
        if self.is_root() {
            let mut acc = self.group.reduction.lock().unwrap();
            acc.clear();
            acc.resize(buffer.len(), 0.0);
        }
        self.barrier();
        {
            let mut acc = self.group.reduction.lock().unwrap();
            assert_eq!(acc.len(), buffer.len(), "all-reduce buffers differ in length");
            acc.iter_mut().zip(buffer.iter()).for_each(|(a, b)| *a += *b);
        }
        self.barrier();
        buffer.copy_from_slice(&self.group.reduction.lock().unwrap());
        self.barrier();
    }

    fn all_to_all(&self, outgoing: Vec<Vec<Contribution>>) -> Vec<Contribution> {
        assert_eq!(
            outgoing.len(),
            self.size(),
            "all-to-all expects one bucket per rank"
        );
        self.barrier();
        for (dest, bucket) in outgoing.into_iter().enumerate() {
            if !bucket.is_empty() {
                self.group.mailboxes[dest].lock().unwrap().extend(bucket);
            }
        }
        self.barrier();
        let received: Vec<Contribution> =
            mem::take(&mut *self.group.mailboxes[self.rank].lock().unwrap());
        self.barrier();
        received
    }
}

/// Runs `job` on every rank of a new thread group of the given size and returns the results
/// ordered by rank.
pub fn run_on_thread_group<T, F>(size: usize, job: F) -> Vec<T>
where
    T: Send,
    F: Fn(Rc<dyn Communicator>) -> T + Sync,
{
    let comms: Vec<ThreadCommunicator> = ThreadCommunicator::group(size);
    std::thread::scope(|scope| {
        let handles: Vec<_> = comms
            .into_iter()
            .map(|comm| {
                let job = &job;
                scope.spawn(move || job(Rc::new(comm)))
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("rank thread panicked"))
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_reduce_sums_over_ranks() {
        let results: Vec<Vec<f64>> = run_on_thread_group(3, |comm| {
            let mut buffer: Vec<f64> = vec![comm.rank() as f64, 1.0];
            comm.all_reduce_sum(&mut buffer);
            buffer
        });
        for buffer in results.iter() {
            assert_eq!(buffer, &vec![3.0, 3.0]);
        }
    }

    #[test]
    fn all_to_all_delivers_to_addressee() {
        let results: Vec<Vec<Contribution>> = run_on_thread_group(2, |comm| {
            let other: usize = 1 - comm.rank();
            let mut outgoing: Vec<Vec<Contribution>> = vec![Vec::new(); 2];
            outgoing[other].push(Contribution {
                row: comm.rank(),
                col: other,
                value: 1.5,
            });
            comm.all_to_all(outgoing)
        });
        assert_eq!(results[0].len(), 1);
        assert_eq!(results[0][0].row, 1);
        assert_eq!(results[1][0].row, 0);
    }

    #[test]
    fn any_is_consistent() {
        let results: Vec<bool> = run_on_thread_group(4, |comm| comm.any(comm.rank() == 2));
        assert!(results.iter().all(|&flag| flag));
    }

    #[test]
    fn broadcast_takes_the_root_values() {
        let results: Vec<Vec<f64>> = run_on_thread_group(3, |comm| {
            let mut buffer: Vec<f64> = vec![comm.rank() as f64 + 0.5, -2.0 * comm.rank() as f64];
            comm.broadcast(&mut buffer);
            buffer
        });
        for buffer in results.iter() {
            assert_eq!(buffer, &vec![0.5, 0.0]);
        }
    }
}
