use crate::bse::{BseDimensions, BseParameters};
use crate::utils::Timer;
use log::{debug, info};
use ndarray::ArrayView1;

pub fn print_bse_init(dims: &BseDimensions, params: &BseParameters) {
    info!("{:^80}", "");
    info!("{: ^80}", "Bethe-Salpeter Equation");
    info!("{:-^80}", "");
    info!("{: <35} {}", "approximation:", params.approximation);
    info!("{: <35} {}", "spin configuration:", params.spin);
    info!("{: <35} {}", "occupied orbitals:", dims.homo);
    info!("{: <35} {}", "virtual orbitals:", dims.virt);
    info!("{: <35} {}", "size of the auxiliary basis:", dims.dim_ri);
    info!("{: <35} {}", "dimension of the BSE matrices:", dims.n_ov());
    info!("{:^80}", "");
}

/// Diagonal of an intermediate matrix, only printed in debug runs.
pub fn print_diagonal(name: &str, diag: ArrayView1<f64>) {
    debug!("");
    debug!("{: <35} ", format!("diagonal of the matrix {}", name));
    debug!("{:-^35}", "");
    for (idx, value) in diag.iter().enumerate() {
        debug!("{: >6} {:>18.12}", idx + 1, value);
    }
    debug!("{:-^35}", "");
}

pub fn print_stage(stage: &str, timer: &Timer) {
    info!("{: <45} {:>24.2} s", stage, timer.elapsed());
}

pub fn print_min_eigenvalue(min_eigenvalue: f64) {
    debug!("{: <35} {:>18.10e}", "smallest eigenvalue of A-B:", min_eigenvalue);
}

pub fn print_bse_end(timer: &Timer) {
    info!("{:-<80} ", "");
    info!("{}", timer);
}
