use std::process::ExitCode;

use clap::Parser;
use log::LevelFilter;

use stm8_dce::cli::Cli;
use stm8_dce::config::Config;
use stm8_dce::driver;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.debug {
        LevelFilter::Trace
    } else if cli.verbose {
        LevelFilter::Info
    } else {
        LevelFilter::Warn
    };
    env_logger::Builder::new().filter_level(level).init();

    let config = Config {
        entry: cli.entry.clone(),
        output_dir: cli.output.clone(),
        code_segment: cli.code_segment.clone(),
        const_segment: cli.const_segment.clone(),
        exclude_functions: cli.exclude_functions(),
        exclude_constants: cli.exclude_constants(),
        verbose: cli.verbose || cli.debug,
        debug: cli.debug,
        optimize_irq: cli.opt_irq,
    };

    match driver::run(&config, &cli.input) {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}
