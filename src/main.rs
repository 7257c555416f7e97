use clap::Parser;
use overlaytrader::cli::{Cli, run};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
