//! # Leit
//!
//! A command-line driver for the leitmotif soundtrack engine.

use log::error;

mod cli;
mod logging;
mod runner;
mod scenario;
mod source;

fn main() {
    logging::init();
    let args = cli::args::build_cli().get_matches();

    let code = match runner::run(&args) {
        Ok(code) => code,
        Err(err) => {
            error!("{}", err.to_string().to_lowercase());
            -1
        }
    };

    std::process::exit(code)
}
