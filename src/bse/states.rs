use crate::bse::{Approximation, BseParameters, SpinConfiguration};
use crate::constants::HARTREE_TO_EV;
use ndarray::prelude::*;
use ndarray_npy::{write_npy, WriteNpyError};
use std::fmt::{Display, Formatter};

/// Single-particle transition from an occupied to a virtual orbital that contributes to an
/// excitation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    /// Index of the occupied orbital, counted from the lowest orbital.
    pub occ: usize,
    /// Index of the virtual orbital, counted from the LUMO.
    pub virt: usize,
    /// Amplitude X of the transition.
    pub amplitude: f64,
    /// Orbital numbers starting at one.
    pub occupied_orbital: usize,
    pub virtual_orbital: usize,
    homo: usize,
}

impl Transition {
    pub fn new(occ: usize, virt: usize, amplitude: f64, homo: usize) -> Self {
        assert!(occ < homo);
        Self {
            occ,
            virt,
            amplitude,
            occupied_orbital: occ + 1,
            virtual_orbital: homo + virt + 1,
            homo,
        }
    }

    /// Label of the occupied orbital relative to the HOMO, e.g. H-1.
    pub fn occupied_label(&self) -> String {
        let h: usize = self.homo - 1 - self.occ;
        if h == 0 {
            String::from("H")
        } else {
            format!("H-{}", h)
        }
    }

    /// Label of the virtual orbital relative to the LUMO, e.g. L+2.
    pub fn virtual_label(&self) -> String {
        if self.virt == 0 {
            String::from("L")
        } else {
            format!("L+{}", self.virt)
        }
    }

    /// Contribution of the transition in percent.
    pub fn weight(&self) -> f64 {
        self.amplitude.powi(2) * 1e2
    }
}

/// Result of the BSE for a single excitation.
#[derive(Debug, Clone)]
pub struct ExcitationRecord {
    /// Index of the excitation, starting at zero.
    pub index: usize,
    /// Excitation energy in Hartree.
    pub energy: f64,
    pub spin: SpinConfiguration,
    /// Transitions with an amplitude above the threshold, ordered by the combined (i, a) index.
    pub transitions: Vec<Transition>,
}

/// Excitation energies of all states and the dominant transitions of the lowest ones.
pub struct BseStates {
    pub spin: SpinConfiguration,
    pub approximation: Approximation,
    /// Excitation energies in ascending order in Hartree.
    pub energies: Array1<f64>,
    pub records: Vec<ExcitationRecord>,
    /// Amplitude threshold that was used for the selection of the transitions.
    pub threshold: f64,
}

impl BseStates {
    pub fn new(
        energies: Array1<f64>,
        transitions: Vec<Vec<Transition>>,
        params: &BseParameters,
    ) -> Self {
        let records: Vec<ExcitationRecord> = transitions
            .into_iter()
            .zip(energies.iter())
            .enumerate()
            .map(|(index, (transitions, &energy))| ExcitationRecord {
                index,
                energy,
                spin: params.spin,
                transitions,
            })
            .collect();
        Self {
            spin: params.spin,
            approximation: params.approximation,
            energies,
            records,
            threshold: params.amplitude_threshold,
        }
    }

    /// Write the excitation energies in eV to a .npy file.
    pub fn spectrum_to_npy(&self, filename: &str) -> Result<(), WriteNpyError> {
        let energies_ev: Array1<f64> = HARTREE_TO_EV * &self.energies;
        write_npy(filename, &energies_ev)
    }
}

impl Display for BseStates {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut txt: String = format!("{:^80}\n", "");
        txt += &format!(
            "{: ^80}\n",
            format!(
                "BSE Excitation Energies ({}, {})",
                self.approximation, self.spin
            )
        );
        txt += &format!("{:-^75}\n", "");

        for (n, record) in self.records.iter().enumerate() {
            txt += &format!(
                "Excited state {: >5}: Excitation energy = {:>10.6} eV\n",
                record.index + 1,
                record.energy * HARTREE_TO_EV
            );
            txt += &format!(
                "  Excitation energy: {:18.12} Hartree\n",
                record.energy
            );
            txt += &format!("  Multiplicity: {}\n", record.spin);

            for transition in record.transitions.iter() {
                txt += &format!(
                    "  {: <5} --> {: <5} ({: >4} -> {: >4})  Amplitude: {:7.4} => {:>5.1} %\n",
                    transition.occupied_label(),
                    transition.virtual_label(),
                    transition.occupied_orbital,
                    transition.virtual_orbital,
                    transition.amplitude,
                    transition.weight()
                );
            }

            if n + 1 < self.records.len() {
                txt += &format!("{: ^80}\n", "");
            }
        }

        txt += &format!(
            "All transition with amplitudes > {:10.8} were printed.\n",
            self.threshold
        );
        txt += &format!("{:-^75}\n", "");
        write!(f, "{}", txt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray_npy::read_npy;

    fn parameters() -> BseParameters {
        BseParameters {
            spin: SpinConfiguration::Singlet,
            approximation: Approximation::Full,
            amplitude_threshold: 0.3,
            n_excitations: 2,
            debug: false,
        }
    }

    #[test]
    fn orbital_labels() {
        let t = Transition::new(2, 0, 0.7, 3);
        assert_eq!(t.occupied_label(), "H");
        assert_eq!(t.virtual_label(), "L");
        let t = Transition::new(0, 2, -0.5, 3);
        assert_eq!(t.occupied_label(), "H-2");
        assert_eq!(t.virtual_label(), "L+2");
        assert_eq!((t.occupied_orbital, t.virtual_orbital), (1, 6));
        assert!((t.weight() - 25.0).abs() < 1e-12);
    }

    #[test]
    fn records_cover_the_reported_states() {
        let energies: Array1<f64> = array![0.2, 0.3, 0.45];
        let transitions = vec![
            vec![Transition::new(1, 0, 0.95, 2)],
            vec![Transition::new(0, 0, -0.6, 2), Transition::new(1, 1, 0.7, 2)],
        ];
        let states = BseStates::new(energies, transitions, &parameters());
        assert_eq!(states.energies.len(), 3);
        assert_eq!(states.records.len(), 2);
        assert_eq!(states.records[1].index, 1);
        assert_eq!(states.records[1].energy, 0.3);

        let txt: String = states.to_string();
        assert!(txt.contains("Excited state     2"));
        assert!(txt.contains("H-1   --> L"));
        assert!(txt.contains("L+1"));
        assert!(txt.contains("Multiplicity: Singlet"));
        assert!(txt.contains("BSE Excitation Energies (full BSE, Singlet)"));
    }

    #[test]
    fn spectrum_is_written_in_ev() {
        let energies: Array1<f64> = array![0.1, 0.25];
        let states = BseStates::new(energies.clone(), Vec::new(), &parameters());
        let filename = std::env::temp_dir().join(format!("bse_spectrum_{}.npy", std::process::id()));
        let filename: &str = filename.to_str().unwrap();
        states.spectrum_to_npy(filename).unwrap();
        let read: Array1<f64> = read_npy(filename).unwrap();
        std::fs::remove_file(filename).unwrap();
        assert_eq!(read, HARTREE_TO_EV * &energies);
    }
}
