//! Run configuration, built once from parsed CLI arguments and threaded
//! immutably through every phase. Nothing here is a process-wide mutable
//! static: every function that needs a setting takes `&Config` explicitly.

use std::path::PathBuf;
use std::{error, fmt};

use crate::reach::Exclusion;

#[derive(Debug)]
pub enum Error {
    OutputDirMissing(PathBuf),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutputDirMissing(path) => {
                write!(f, "Error: Output directory does not exist: {}", path.display())
            }
        }
    }
}

impl error::Error for Error {}

#[derive(Debug, Clone)]
pub struct Config {
    pub entry: String,
    pub output_dir: PathBuf,
    pub code_segment: String,
    pub const_segment: String,
    pub exclude_functions: Vec<Exclusion>,
    pub exclude_constants: Vec<Exclusion>,
    pub verbose: bool,
    pub debug: bool,
    pub optimize_irq: bool,
}

impl Config {
    /// Validates filesystem preconditions that must hold before the driver
    /// touches any input file.
    pub fn validate(&self) -> Result<(), Error> {
        if !self.output_dir.is_dir() {
            return Err(Error::OutputDirMissing(self.output_dir.clone()));
        }
        Ok(())
    }
}
