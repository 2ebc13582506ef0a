//! CLI definitions: a single `clap`-derived command mirroring the external
//! interface described for this tool (no subcommands, just flags over a
//! list of input files).

use std::path::PathBuf;

use clap::Parser;

use crate::reach::Exclusion;

#[derive(Parser)]
#[command(name = "stm8-dce")]
#[command(about = "Link-time dead code elimination for SDCC-generated STM8 assembly")]
#[command(version)]
pub struct Cli {
    /// Assembly (.asm) and object (.rel/.lib) files to process
    #[arg(required = true)]
    pub input: Vec<PathBuf>,

    /// Output directory for the rewritten assembly files (must already exist)
    #[arg(short, long)]
    pub output: PathBuf,

    /// Entry label
    #[arg(short, long, default_value = "_main")]
    pub entry: String,

    /// Exclude a function from removal (NAME or FILE.asm:NAME)
    #[arg(short = 'x', long = "exclude-function", value_name = "NAME")]
    pub exclude_function: Vec<String>,

    /// Exclude a constant from removal (NAME or FILE.asm:NAME)
    #[arg(long = "exclude-constant", value_name = "NAME")]
    pub exclude_constant: Vec<String>,

    /// Name of the code area
    #[arg(long = "code-segment", default_value = "CODE")]
    pub code_segment: String,

    /// Name of the const area
    #[arg(long = "const-segment", default_value = "CONST")]
    pub const_segment: String,

    /// Print every kept/removed symbol with file and line
    #[arg(short, long)]
    pub verbose: bool,

    /// Trace resolution and traversal decisions (implies --verbose)
    #[arg(short, long)]
    pub debug: bool,

    /// Drop empty interrupt handlers (the vector slot is still neutralized)
    #[arg(long = "opt-irq")]
    pub opt_irq: bool,
}

/// Splits a `FILE.asm:NAME` or bare `NAME` exclusion spec on the first `:`.
#[must_use]
pub fn eval_exclusion(spec: &str) -> Exclusion {
    Exclusion::parse(spec)
}

impl Cli {
    #[must_use]
    pub fn exclude_functions(&self) -> Vec<Exclusion> {
        self.exclude_function.iter().map(|s| eval_exclusion(s)).collect()
    }

    #[must_use]
    pub fn exclude_constants(&self) -> Vec<Exclusion> {
        self.exclude_constant.iter().map(|s| eval_exclusion(s)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_name_exclusion() {
        assert_eq!(eval_exclusion("_helper"), Exclusion::Name("_helper".to_string()));
    }

    #[test]
    fn qualified_exclusion() {
        assert_eq!(
            eval_exclusion("util.asm:_helper"),
            Exclusion::Qualified {
                file: "util.asm".to_string(),
                name: "_helper".to_string(),
            }
        );
    }

    #[test]
    fn parses_minimal_invocation() {
        let cli = Cli::parse_from(["stm8-dce", "-o", "out", "main.asm"]);
        assert_eq!(cli.entry, "_main");
        assert_eq!(cli.code_segment, "CODE");
        assert_eq!(cli.const_segment, "CONST");
        assert!(!cli.verbose);
        assert_eq!(cli.input, vec![PathBuf::from("main.asm")]);
    }

    #[test]
    fn parses_repeated_exclusions() {
        let cli = Cli::parse_from([
            "stm8-dce",
            "-o",
            "out",
            "-x",
            "_a",
            "--exclude-function",
            "util.asm:_b",
            "main.asm",
        ]);
        assert_eq!(cli.exclude_function, vec!["_a".to_string(), "util.asm:_b".to_string()]);
    }
}
