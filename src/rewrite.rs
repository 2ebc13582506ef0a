//! The rewriter: turns a set of removed entities into in-place edits of the
//! assembly files that were parsed, commenting dead code out and neutralizing
//! dead interrupt vector slots without disturbing table layout.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::PathBuf;
use std::{error, fmt, io};

use crate::model::{ConstantId, FunctionId, GlobalDeclId, InterruptEntryId, Program};
use crate::reach::Reachable;

/// Replaces a dead interrupt vector slot. Byte-exact: four leading spaces,
/// the mnemonic, and a null target, so every surviving slot keeps its offset.
const NEUTRALIZED_VECTOR: &str = "    int 0x000000";

#[derive(Debug)]
pub enum Error {
    Io { path: PathBuf, source: io::Error },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "{}: {source}", path.display()),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
        }
    }
}

/// The fully-derived removal sets the rewriter needs: the two primary sets
/// (functions, constants not in the keep-set) plus the globals and interrupt
/// entries they drag down with them.
#[derive(Debug, Default)]
pub struct Removed {
    pub functions: Vec<FunctionId>,
    pub constants: Vec<ConstantId>,
    pub globals: Vec<GlobalDeclId>,
    pub interrupts: Vec<InterruptEntryId>,
}

/// Computes `Removed` as the complement of `reachable` over the whole
/// program, plus every global/interrupt entry attached to a removed
/// function or constant.
#[must_use]
pub fn derive_removed(program: &Program, reachable: &Reachable) -> Removed {
    let functions: Vec<FunctionId> = (0..program.functions.len())
        .map(FunctionId)
        .filter(|id| !reachable.functions.contains(id))
        .collect();
    let constants: Vec<ConstantId> = (0..program.constants.len())
        .map(ConstantId)
        .filter(|id| !reachable.constants.contains(id))
        .collect();

    let mut global_ids: HashSet<GlobalDeclId> = HashSet::new();
    let mut interrupt_ids: HashSet<InterruptEntryId> = HashSet::new();

    for &id in &functions {
        global_ids.extend(program.function(id).global_decls.iter().copied());
        if let Some(isr) = program.function(id).isr_decl {
            interrupt_ids.insert(isr);
        }
    }
    for &id in &constants {
        global_ids.extend(program.constant(id).global_decls.iter().copied());
    }

    Removed {
        functions,
        constants,
        globals: global_ids.into_iter().collect(),
        interrupts: interrupt_ids.into_iter().collect(),
    }
}

enum Op {
    Comment(usize),
    CommentRange(usize, usize),
    Neutralize(usize),
}

/// Counts of removed vs. total entities, reported to the user at the end of
/// a run.
#[derive(Debug, Clone, Copy)]
pub struct Summary {
    pub removed_functions: usize,
    pub total_functions: usize,
    pub removed_constants: usize,
    pub total_constants: usize,
}

/// Applies `removed` to the files named by the entities' locations, reading
/// each file once, applying every edit in memory, then writing it back once.
/// A phase error aborts before any file is written, so a run either rewrites
/// every affected file or touches none of them.
pub fn rewrite(program: &Program, removed: &Removed) -> Result<Summary, Error> {
    let mut ops: HashMap<PathBuf, Vec<Op>> = HashMap::new();

    for &id in &removed.globals {
        let global = program.global(id);
        ops.entry(global.loc.path.clone())
            .or_default()
            .push(Op::Comment(global.loc.line));
    }
    for &id in &removed.interrupts {
        let entry = program.interrupt(id);
        ops.entry(entry.loc.path.clone())
            .or_default()
            .push(Op::Neutralize(entry.loc.line));
    }
    for &id in &removed.functions {
        let function = program.function(id);
        ops.entry(function.loc.path.clone())
            .or_default()
            .push(Op::CommentRange(function.start_line(), function.end_line));
    }
    for &id in &removed.constants {
        let constant = program.constant(id);
        ops.entry(constant.loc.path.clone())
            .or_default()
            .push(Op::CommentRange(constant.start_line(), constant.end_line));
    }

    let mut rewritten: Vec<(PathBuf, String)> = Vec::with_capacity(ops.len());
    for (path, file_ops) in &ops {
        let contents = fs::read_to_string(path).map_err(|e| Error::Io {
            path: path.clone(),
            source: e,
        })?;
        let had_trailing_newline = contents.ends_with('\n');
        let mut lines: Vec<String> = contents.lines().map(String::from).collect();

        for op in file_ops {
            match *op {
                Op::Comment(line) => {
                    if let Some(l) = lines.get_mut(line - 1) {
                        l.insert(0, ';');
                    }
                }
                Op::Neutralize(line) => {
                    if let Some(l) = lines.get_mut(line - 1) {
                        *l = NEUTRALIZED_VECTOR.to_string();
                    }
                }
                Op::CommentRange(start, end) => {
                    for i in start..=end {
                        if let Some(l) = lines.get_mut(i - 1) {
                            l.insert(0, ';');
                        }
                    }
                }
            }
        }

        let mut out = lines.join("\n");
        if had_trailing_newline {
            out.push('\n');
        }
        rewritten.push((path.clone(), out));
    }

    for (path, contents) in &rewritten {
        fs::write(path, contents).map_err(|e| Error::Io {
            path: path.clone(),
            source: e,
        })?;
    }

    Ok(Summary {
        removed_functions: removed.functions.len(),
        total_functions: program.functions.len(),
        removed_constants: removed.constants.len(),
        total_constants: program.constants.len(),
    })
}
