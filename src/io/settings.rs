use crate::bse::{Approximation, BseParameters, SpinConfiguration};
use crate::defaults::*;
use serde::{Deserialize, Serialize};

fn default_verbose() -> i8 {
    0
}
fn default_spin() -> SpinConfiguration {
    SPIN
}
fn default_approximation() -> Approximation {
    APPROXIMATION
}
fn default_amplitude_threshold() -> f64 {
    AMPLITUDE_THRESHOLD
}
fn default_n_excitations() -> usize {
    N_EXCITATIONS
}
fn default_debug() -> bool {
    false
}
fn default_run_both_spins() -> bool {
    false
}
fn default_number_of_cores() -> usize {
    NUMBER_OF_CORES
}
fn default_block_size() -> usize {
    BLOCK_SIZE
}
fn default_homo() -> usize {
    0
}
fn default_virtual() -> usize {
    0
}
fn default_qp_energies() -> String {
    String::from(QP_ENERGIES_FILE)
}
fn default_s_ia() -> String {
    String::from(S_IA_FILE)
}
fn default_s_bar_ia() -> String {
    String::from(S_BAR_IA_FILE)
}
fn default_s_bar_ij() -> String {
    String::from(S_BAR_IJ_FILE)
}
fn default_s_ab() -> String {
    String::from(S_AB_FILE)
}
fn default_bse_config() -> BseConfig {
    let bse_config: BseConfig = toml::from_str("").unwrap();
    bse_config
}
fn default_parallelization_config() -> ParallelizationConfig {
    let parallelization_config: ParallelizationConfig = toml::from_str("").unwrap();
    parallelization_config
}
fn default_input_config() -> InputConfig {
    let input_config: InputConfig = toml::from_str("").unwrap();
    input_config
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Configuration {
    #[serde(default = "default_verbose")]
    pub verbose: i8,
    #[serde(default = "default_bse_config")]
    pub bse: BseConfig,
    #[serde(default = "default_parallelization_config")]
    pub parallelization: ParallelizationConfig,
    #[serde(default = "default_input_config")]
    pub input: InputConfig,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug)]
pub struct BseConfig {
    #[serde(default = "default_spin")]
    pub spin: SpinConfiguration,
    #[serde(default = "default_approximation")]
    pub approximation: Approximation,
    #[serde(default = "default_amplitude_threshold")]
    pub amplitude_threshold: f64,
    #[serde(default = "default_n_excitations")]
    pub n_excitations: usize,
    #[serde(default = "default_debug")]
    pub debug: bool,
    /// Solve for the singlet and the triplet excitations in one run.
    #[serde(default = "default_run_both_spins")]
    pub run_both_spins: bool,
}

impl BseConfig {
    /// Parameters of the runs that were requested, one per spin configuration.
    pub fn parameters(&self) -> Vec<BseParameters> {
        let spins: Vec<SpinConfiguration> = if self.run_both_spins {
            vec![SpinConfiguration::Singlet, SpinConfiguration::Triplet]
        } else {
            vec![self.spin]
        };
        spins
            .into_iter()
            .map(|spin| BseParameters {
                spin,
                approximation: self.approximation,
                amplitude_threshold: self.amplitude_threshold,
                n_excitations: self.n_excitations,
                debug: self.debug,
            })
            .collect()
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug)]
pub struct ParallelizationConfig {
    /// Threads of the global rayon pool.
    #[serde(default = "default_number_of_cores")]
    pub number_of_cores: usize,
    #[serde(default = "default_block_size")]
    pub block_size: usize,
}

/// Size of the orbital spaces and the files of the GW calculation, relative to the input
/// directory.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct InputConfig {
    #[serde(default = "default_homo")]
    pub homo: usize,
    #[serde(default = "default_virtual", rename = "virtual")]
    pub virt: usize,
    #[serde(default = "default_qp_energies")]
    pub qp_energies: String,
    #[serde(default = "default_s_ia")]
    pub s_ia: String,
    #[serde(default = "default_s_bar_ia")]
    pub s_bar_ia: String,
    #[serde(default = "default_s_bar_ij")]
    pub s_bar_ij: String,
    #[serde(default = "default_s_ab")]
    pub s_ab: String,
}
