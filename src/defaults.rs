use crate::bse::{Approximation, SpinConfiguration};

// config file
pub const CONFIG_FILE_NAME: &str = "bse.toml";

// BSE SETTINGS
pub const SPIN: SpinConfiguration = SpinConfiguration::Singlet;
pub const APPROXIMATION: Approximation = Approximation::Full;
// transitions with a larger absolute amplitude are printed
pub const AMPLITUDE_THRESHOLD: f64 = 0.1;
// number of excitations in the report
pub const N_EXCITATIONS: usize = 10;

// PARALLELIZATION
pub const NUMBER_OF_CORES: usize = 1;
// edge length of the blocks of the block-cyclic distribution
pub const BLOCK_SIZE: usize = 32;

// INPUT FILES
pub const QP_ENERGIES_FILE: &str = "qp_energies.npy";
pub const S_IA_FILE: &str = "s_ia.npy";
pub const S_BAR_IA_FILE: &str = "s_bar_ia.npy";
pub const S_BAR_IJ_FILE: &str = "s_bar_ij.npy";
pub const S_AB_FILE: &str = "s_ab.npy";

// OUTPUT
pub const SPECTRUM_FILE: &str = "bse_energies.npy";
