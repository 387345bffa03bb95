use clap::Parser;

use fmsi::cli::{self, Cli};

fn main() {
    env_logger::init();

    let cli = Cli::parse();
    if let Err(error) = cli::run(cli) {
        log::error!("{error}");
        std::process::exit(cli::exit_code_for(&error));
    }
}
