use crate::bse::BseDimensions;
use crate::defaults::CONFIG_FILE_NAME;
use crate::io::Configuration;
use anyhow::{bail, Context, Result};
use ndarray::prelude::*;
use ndarray_npy::read_npy;
use std::fs;
use std::path::{Path, PathBuf};

/// Quasiparticle energies and RI factors of a GW calculation, replicated on every process.
pub struct BseInput {
    pub dims: BseDimensions,
    /// Quasiparticle energies of the occupied and the virtual orbitals in Hartree.
    pub energies: Array1<f64>,
    pub s_ia: Array2<f64>,
    pub s_bar_ia: Array2<f64>,
    pub s_bar_ij: Array2<f64>,
    pub s_ab: Array2<f64>,
}

/// Reads the configuration from the input directory. If the file does not exist, the default
/// settings are used and, if `write_defaults` is set, written to the directory, so that the
/// user can see all options.
pub fn read_input(directory: &Path, write_defaults: bool) -> Result<Configuration> {
    let config_file_path: PathBuf = directory.join(CONFIG_FILE_NAME);
    let config_string: String = if config_file_path.exists() {
        fs::read_to_string(&config_file_path)
            .with_context(|| format!("Unable to read {}", config_file_path.display()))?
    } else {
        String::from("")
    };
    let config: Configuration = toml::from_str(&config_string)
        .with_context(|| format!("Invalid configuration in {}", config_file_path.display()))?;
    if write_defaults && !config_file_path.exists() {
        fs::write(&config_file_path, toml::to_string(&config)?)
            .with_context(|| format!("Unable to write {}", config_file_path.display()))?;
    }
    Ok(config)
}

fn load_2d(directory: &Path, filename: &str, shape: (usize, usize)) -> Result<Array2<f64>> {
    let path: PathBuf = directory.join(filename);
    let array: Array2<f64> =
        read_npy(&path).with_context(|| format!("Unable to read {}", path.display()))?;
    if array.dim() != shape {
        bail!(
            "{} has the shape {:?}, expected {:?}",
            path.display(),
            array.dim(),
            shape
        );
    }
    Ok(array)
}

/// Loads the quasiparticle energies and the RI factors from `.npy` files. The size of the
/// auxiliary basis is taken from the first factor.
pub fn load_bse_input(directory: &Path, config: &Configuration) -> Result<BseInput> {
    let (homo, virt): (usize, usize) = (config.input.homo, config.input.virt);
    if homo == 0 || virt == 0 {
        bail!(
            "The number of occupied and virtual orbitals has to be set in the [input] section of {}",
            CONFIG_FILE_NAME
        );
    }

    let path: PathBuf = directory.join(&config.input.qp_energies);
    let all_energies: Array1<f64> =
        read_npy(&path).with_context(|| format!("Unable to read {}", path.display()))?;
    if all_energies.len() < homo + virt {
        bail!(
            "{} contains {} energies, at least {} are needed",
            path.display(),
            all_energies.len(),
            homo + virt
        );
    }
    let energies: Array1<f64> = all_energies.slice(s![..homo + virt]).to_owned();

    let ia_path: PathBuf = directory.join(&config.input.s_ia);
    let s_ia: Array2<f64> =
        read_npy(&ia_path).with_context(|| format!("Unable to read {}", ia_path.display()))?;
    let dim_ri: usize = s_ia.nrows();
    if s_ia.ncols() != homo * virt || dim_ri == 0 {
        bail!(
            "{} has the shape {:?}, expected [dim_ri, {}]",
            ia_path.display(),
            s_ia.dim(),
            homo * virt
        );
    }
    let dims = BseDimensions::new(homo, virt, dim_ri);

    Ok(BseInput {
        dims,
        energies,
        s_bar_ia: load_2d(directory, &config.input.s_bar_ia, (dim_ri, homo * virt))?,
        s_bar_ij: load_2d(directory, &config.input.s_bar_ij, (dim_ri, homo * homo))?,
        s_ab: load_2d(directory, &config.input.s_ab, (dim_ri, virt * virt))?,
        s_ia,
    })
}
