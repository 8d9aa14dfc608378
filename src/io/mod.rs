mod imprint;
mod input;
pub(crate) mod settings;

pub use imprint::{write_footer, write_header};
pub use input::{load_bse_input, read_input, BseInput};
pub use settings::Configuration;
