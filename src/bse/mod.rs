//! Solution of the Bethe-Salpeter equation for the excitation energies of a molecule from
//! GW quasiparticle energies and the resolution-of-identity factors of the screened and
//! unscreened Coulomb interaction.
//!
//! The coupling matrices A and B are assembled on a distributed process grid, the problem is
//! either solved in the Tamm-Dancoff approximation (only A) or reduced to the symmetric matrix
//! `C = (A-B)^(1/2) (A+B) (A-B)^(1/2)` whose eigenvalues are the squared excitation energies.

mod assembly;
mod eigensolver;
mod index;
mod logging;
mod reconstruction;
mod reduction;
mod remap;
mod states;

pub use index::Factorization;
pub use states::{BseStates, Transition};

use assembly::{create_a, create_b};
use eigensolver::{solve_full, solve_tda, EigenPairs};
use reconstruction::{filter_transitions, reconstruct_amplitudes};
use reduction::{reduce, HermitianReduction};

use crate::distributed::{DistributedMatrix, ProcessGrid};
use crate::utils::Timer;
use ndarray::prelude::*;
use serde::{Deserialize, Serialize};
use std::error;
use std::fmt;

/// Spin configuration of the excitations. Only singlets include the exchange term.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SpinConfiguration {
    Singlet,
    Triplet,
}

impl SpinConfiguration {
    /// Prefactor of the bare exchange kernel.
    pub fn alpha(&self) -> f64 {
        match self {
            SpinConfiguration::Singlet => 2.0,
            SpinConfiguration::Triplet => 0.0,
        }
    }
}

impl fmt::Display for SpinConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpinConfiguration::Singlet => write!(f, "Singlet"),
            SpinConfiguration::Triplet => write!(f, "Triplet"),
        }
    }
}

/// Either the Tamm-Dancoff approximation (B = 0) or the full problem.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Approximation {
    Tda,
    Full,
}

impl fmt::Display for Approximation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Approximation::Tda => write!(f, "TDA"),
            Approximation::Full => write!(f, "full BSE"),
        }
    }
}

/// Fatal errors of the BSE solution. They are raised consistently on all processes.
#[derive(Debug, Clone, PartialEq)]
pub enum BseError {
    /// A - B has a non-positive eigenvalue, the reduction to a symmetric problem is undefined.
    NotPositiveDefinite { min_eigenvalue: f64 },
    /// The dense eigensolver did not succeed.
    SolverFailure { message: String },
    /// A squared excitation energy of the full problem is not positive.
    NonPositiveExcitationEnergy { state: usize, omega_squared: f64 },
}

impl fmt::Display for BseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BseError::NotPositiveDefinite { min_eigenvalue } => write!(
                f,
                "The matrix A-B is not positive definite (smallest eigenvalue: {:.6e}). \
                 The quasiparticle energies or the screened interaction are unphysical.",
                min_eigenvalue
            ),
            BseError::SolverFailure { message } => {
                write!(f, "The dense eigensolver failed: {}", message)
            }
            BseError::NonPositiveExcitationEnergy {
                state,
                omega_squared,
            } => write!(
                f,
                "The squared excitation energy of state {} is not positive: {:.6e}",
                state + 1,
                omega_squared
            ),
        }
    }
}

impl error::Error for BseError {}

/// Number of occupied and virtual orbitals and the size of the auxiliary basis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BseDimensions {
    pub homo: usize,
    pub virt: usize,
    pub dim_ri: usize,
}

impl BseDimensions {
    pub fn new(homo: usize, virt: usize, dim_ri: usize) -> Self {
        assert!(homo > 0 && virt > 0, "at least one occupied and one virtual orbital");
        assert!(dim_ri > 0, "the auxiliary basis is empty");
        Self { homo, virt, dim_ri }
    }

    /// Dimension of the occupied-virtual product space.
    pub fn n_ov(&self) -> usize {
        self.homo * self.virt
    }

    /// Combined (i, a) index.
    pub fn ov(&self) -> Factorization {
        Factorization::new(self.homo, self.virt)
    }

    /// Combined (i, j) index.
    pub fn oo(&self) -> Factorization {
        Factorization::new(self.homo, self.homo)
    }

    /// Combined (a, b) index.
    pub fn vv(&self) -> Factorization {
        Factorization::new(self.virt, self.virt)
    }
}

/// Resolution-of-identity factors, each of shape [dim_ri, pair index].
pub struct RiFactors<'a> {
    /// Unscreened factors of the occupied-virtual pairs.
    pub s_ia: &'a DistributedMatrix,
    /// Screened factors of the occupied-virtual pairs.
    pub s_bar_ia: &'a DistributedMatrix,
    /// Screened factors of the occupied-occupied pairs.
    pub s_bar_ij: &'a DistributedMatrix,
    /// Unscreened factors of the virtual-virtual pairs.
    pub s_ab: &'a DistributedMatrix,
}

/// Settings of a single BSE solution.
#[derive(Debug, Clone, Copy)]
pub struct BseParameters {
    pub spin: SpinConfiguration,
    pub approximation: Approximation,
    /// Transitions with an absolute amplitude above this value are reported.
    pub amplitude_threshold: f64,
    /// Maximal number of excitations in the report.
    pub n_excitations: usize,
    /// Additional diagnostics of the intermediate matrices.
    pub debug: bool,
}

/// Assembles and solves the BSE. `aux_grid` is used for the [homo^2, virt^2] intermediate of the
/// screened direct term; all other matrices live on the grid of `s_ia`. Collective operation.
pub fn solve_bse(
    factors: &RiFactors,
    energies: ArrayView1<f64>,
    dims: BseDimensions,
    params: &BseParameters,
    aux_grid: &ProcessGrid,
) -> Result<BseStates, BseError> {
    let root: bool = factors.s_ia.grid().is_root();
    let timer: Timer = Timer::start();
    if root {
        logging::print_bse_init(&dims, params);
    }

    let a_mat: DistributedMatrix = create_a(
        factors.s_ia,
        factors.s_bar_ij,
        factors.s_ab,
        energies,
        dims,
        params.spin,
        aux_grid,
    );
    if params.debug {
        let diag: Array1<f64> = a_mat.gather_diag();
        if root {
            logging::print_diagonal("A", diag.view());
        }
    }
    if root {
        logging::print_stage("matrix A assembled", &timer);
    }

    let (omega, x_mat): (Array1<f64>, DistributedMatrix) = match params.approximation {
        Approximation::Tda => {
            let pairs: EigenPairs = solve_tda(&a_mat)?;
            drop(a_mat);
            if root {
                logging::print_stage("matrix A diagonalized", &timer);
            }
            (pairs.eigenvalues, pairs.eigenvectors)
        }
        Approximation::Full => {
            let b_mat: DistributedMatrix =
                create_b(factors.s_ia, factors.s_bar_ia, dims, params.spin);
            if params.debug {
                let diag: Array1<f64> = b_mat.gather_diag();
                if root {
                    logging::print_diagonal("B", diag.view());
                }
            }
            if root {
                logging::print_stage("matrix B assembled", &timer);
            }

            let reduction: HermitianReduction = reduce(a_mat, b_mat)?;
            if root {
                if params.debug {
                    logging::print_min_eigenvalue(reduction.min_eigenvalue);
                }
                logging::print_stage("reduction to symmetric form", &timer);
            }

            let HermitianReduction {
                c,
                sqrt_a_m_b,
                inv_sqrt_a_m_b,
                ..
            } = reduction;
            let pairs: EigenPairs = solve_full(&c)?;
            drop(c);
            if root {
                logging::print_stage("matrix C diagonalized", &timer);
            }

            let x_mat: DistributedMatrix = reconstruct_amplitudes(
                &pairs.eigenvectors,
                pairs.eigenvalues.view(),
                sqrt_a_m_b,
                inv_sqrt_a_m_b,
            );
            (pairs.eigenvalues, x_mat)
        }
    };

    let n_states: usize = params.n_excitations.min(omega.len());
    let transitions: Vec<Vec<Transition>> =
        filter_transitions(&x_mat, n_states, params.amplitude_threshold, dims);
    let states: BseStates = BseStates::new(omega, transitions, params);

    if root {
        logging::print_bse_end(&timer);
    }
    Ok(states)
}
