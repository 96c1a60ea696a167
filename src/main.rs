use std::process::ExitCode;

use clap::Parser;

use pixelforge::cli::{self, CliArgs};
use pixelforge::logger;

fn main() -> ExitCode {
    logger::init();
    let args = CliArgs::parse();
    cli::run(args)
}
