mod comm;
mod grid;
#[cfg(test)]
mod local_comm;
mod matrix;

pub use comm::{Communicator, Contribution};
pub use grid::{owner, ProcessGrid};
#[cfg(test)]
pub use local_comm::{run_on_thread_group, SerialCommunicator};
pub use matrix::{DistributedMatrix, Transpose};
