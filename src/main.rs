use crate::bse::{solve_bse, BseError, BseParameters, BseStates, RiFactors};
use crate::distributed::{Communicator, DistributedMatrix, ProcessGrid};
use crate::io::{load_bse_input, read_input, write_footer, write_header, BseInput, Configuration};
use crate::utils::Timer;
use anyhow::{Context, Result};
use clap::{App, Arg};
use env_logger::Builder;
use log::{error, info, LevelFilter};
use mpi::topology::SimpleCommunicator;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process;
use std::rc::Rc;

mod bse;
mod constants;
mod defaults;
mod distributed;
mod io;
mod utils;

#[macro_use]
extern crate clap;

fn main() {
    // MPI.
    let universe = match mpi::initialize() {
        Some(universe) => universe,
        None => {
            eprintln!("Error: MPI could not be initialized");
            process::exit(1);
        }
    };
    let world: SimpleCommunicator = universe.world();
    let root: bool = world.is_root();

    // Input.
    let matches = App::new(crate_name!())
        .version(crate_version!())
        .about("excitation energies from the Bethe-Salpeter equation on top of GW")
        .arg(
            Arg::new("input-directory")
                .about("Directory with the quasiparticle energies and the RI factors")
                .default_value(".")
                .index(1),
        )
        .get_matches();
    let directory: PathBuf = PathBuf::from(matches.value_of("input-directory").unwrap_or("."));
    let config: Configuration = match read_input(&directory, root) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            abort(&world);
        }
    };

    // Logging.
    // The log level is set.
    let log_level: LevelFilter = match config.verbose {
        _ if !root => LevelFilter::Error,
        2 => LevelFilter::Trace,
        1 => LevelFilter::Debug,
        0 => LevelFilter::Info,
        -1 => LevelFilter::Warn,
        -2 => LevelFilter::Error,
        _ => LevelFilter::Info,
    };
    // and the logger is build.
    Builder::new()
        .format(|buf, record| writeln!(buf, "{}", record.args()))
        .filter(None, log_level)
        .init();

    if let Err(err) = run(&directory, &config, Rc::new(universe.world())) {
        error!("{:#}", err);
        abort(&world);
    }
}

/// A failing process stops the whole world, the others would wait in the next collective.
fn abort(world: &SimpleCommunicator) -> ! {
    mpi::topology::Communicator::abort(world, 1)
}

fn run(directory: &Path, config: &Configuration, comm: Rc<dyn Communicator>) -> Result<()> {
    // Multithreading.
    rayon::ThreadPoolBuilder::new()
        .num_threads(config.parallelization.number_of_cores)
        .build_global()
        .context("The thread pool could not be initialized")?;

    // The program header is written to the command line.
    write_header();
    // and the total wall-time timer is started.
    let timer: Timer = Timer::start();
    info!("{: <35} {}", "number of processes:", comm.size());

    let input: BseInput = load_bse_input(directory, config)?;
    let runs: Vec<BseParameters> = config.bse.parameters();
    for params in runs.iter() {
        let states: BseStates = solve_distributed(&input, config, params, &comm)?;
        info!("{}", states);
        if !comm.is_root() {
            continue;
        }

        let filename: String = if runs.len() > 1 {
            format!(
                "{}_{}",
                params.spin.to_string().to_lowercase(),
                defaults::SPECTRUM_FILE
            )
        } else {
            String::from(defaults::SPECTRUM_FILE)
        };
        let path: PathBuf = directory.join(filename);
        states
            .spectrum_to_npy(&path.to_string_lossy())
            .with_context(|| format!("Unable to write {}", path.display()))?;
    }

    comm.barrier();
    write_footer(timer);
    Ok(())
}

/// Distributes the replicated input over the process grid and solves the BSE. Every process
/// returns the same outcome.
fn solve_distributed(
    input: &BseInput,
    config: &Configuration,
    params: &BseParameters,
    comm: &Rc<dyn Communicator>,
) -> Result<BseStates, BseError> {
    let block_size: usize = config.parallelization.block_size;
    let grid = ProcessGrid::square(Rc::clone(comm), block_size);
    // The [homo^2, virt^2] intermediate is distributed over rows only.
    let aux_grid = grid.with_shape(comm.size(), 1, block_size);
    let s_ia = DistributedMatrix::from_replicated(&grid, input.s_ia.view());
    let s_bar_ia = DistributedMatrix::from_replicated(&grid, input.s_bar_ia.view());
    let s_bar_ij = DistributedMatrix::from_replicated(&grid, input.s_bar_ij.view());
    let s_ab = DistributedMatrix::from_replicated(&grid, input.s_ab.view());
    let factors = RiFactors {
        s_ia: &s_ia,
        s_bar_ia: &s_bar_ia,
        s_bar_ij: &s_bar_ij,
        s_ab: &s_ab,
    };
    solve_bse(
        &factors,
        input.energies.view(),
        input.dims,
        params,
        &aux_grid,
    )
}
