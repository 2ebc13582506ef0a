//! Orchestrates a full run: copy inputs, parse, resolve, compute
//! reachability, rewrite, report. This is the only place that touches the
//! filesystem outside of the rewriter itself.

use std::ffi::OsStr;
use std::fs;
use std::path::PathBuf;

use log::info;

use crate::asm::{parse_asm_file, AreaNames};
use crate::config::Config;
use crate::error::Error;
use crate::model::Program;
use crate::object::parse_object_file;
use crate::reach;
use crate::resolve::resolve;
use crate::rewrite::{self, Summary};

/// Runs the whole pipeline for one invocation and returns the final
/// removed/total summary.
pub fn run(config: &Config, inputs: &[PathBuf]) -> Result<Summary, Error> {
    config.validate()?;

    let mut program = Program::new();
    let areas = AreaNames {
        code: &config.code_segment,
        constant: &config.const_segment,
    };

    for input in inputs {
        match input.extension().and_then(OsStr::to_str) {
            Some("asm") => {
                let file_name = input.file_name().ok_or_else(|| Error::Io {
                    path: input.clone(),
                    source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "missing file name"),
                })?;
                let dest = config.output_dir.join(file_name);
                fs::copy(input, &dest).map_err(|e| Error::Io {
                    path: input.clone(),
                    source: e,
                })?;
                info!("copied {} to {}", input.display(), dest.display());

                let contents = fs::read_to_string(&dest).map_err(|e| Error::Io {
                    path: dest.clone(),
                    source: e,
                })?;
                parse_asm_file(&mut program, &dest, &contents, &areas);
            }
            Some("rel") | Some("lib") => {
                let bytes = fs::read(input).map_err(|e| Error::Io {
                    path: input.clone(),
                    source: e,
                })?;
                let contents = String::from_utf8_lossy(&bytes);
                parse_object_file(&mut program, input, &contents);
            }
            _ => {
                log::warn!("ignoring input with unrecognized extension: {}", input.display());
            }
        }
    }

    resolve(&mut program)?;

    let reach_config = reach::Config {
        entry: &config.entry,
        optimize_irq: config.optimize_irq,
        exclude_functions: &config.exclude_functions,
        exclude_constants: &config.exclude_constants,
    };
    let reachable = reach::compute(&program, &reach_config)?;

    let removed = rewrite::derive_removed(&program, &reachable);

    if config.verbose || config.debug {
        report(&program, &reachable, &removed);
    }

    let summary = rewrite::rewrite(&program, &removed)?;

    println!(
        "Removed {}/{} functions",
        summary.removed_functions, summary.total_functions
    );
    println!(
        "Removed {}/{} constants",
        summary.removed_constants, summary.total_constants
    );

    Ok(summary)
}

fn report(program: &Program, reachable: &reach::Reachable, removed: &rewrite::Removed) {
    println!("Keeping functions:");
    for (i, function) in program.functions.iter().enumerate() {
        if reachable.functions.contains(&crate::model::FunctionId(i)) {
            println!("\t{} - {}", function.name, function.loc);
        }
    }
    println!("Removing functions:");
    for &id in &removed.functions {
        let function = program.function(id);
        println!("\t{} - {}", function.name, function.loc);
    }
    println!("Keeping constants:");
    for (i, constant) in program.constants.iter().enumerate() {
        if reachable.constants.contains(&crate::model::ConstantId(i)) {
            println!("\t{} - {}", constant.name, constant.loc);
        }
    }
    println!("Removing constants:");
    for &id in &removed.constants {
        let constant = program.constant(id);
        println!("\t{} - {}", constant.name, constant.loc);
    }
}
