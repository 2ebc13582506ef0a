//! The reachability engine: walks the resolved call/reference graph from a
//! fixed set of roots and decides which functions and constants survive.

use std::collections::HashSet;
use std::{error, fmt};

use log::{debug, warn};

use crate::model::{ConstantId, FunctionId, FunctionOrConstant, Program, Referrer};

/// SDCC may call these two runtime hooks without any visible reference in
/// the assembly (SDCC manual §3.14.2), so they are always kept when present.
const SDCC_REQUIRED: &[&str] = &["_getchar", "_putchar"];

/// A user-supplied exclusion, either a bare name or a `FILE:NAME` pair that
/// disambiguates between same-named static definitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Exclusion {
    Name(String),
    Qualified { file: String, name: String },
}

impl Exclusion {
    #[must_use]
    pub fn parse(spec: &str) -> Self {
        match spec.split_once(':') {
            Some((file, name)) => Exclusion::Qualified {
                file: file.to_string(),
                name: name.to_string(),
            },
            None => Exclusion::Name(spec.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Error {
    EntryNotFound(String),
    AmbiguousEntry { name: String, count: usize },
    AmbiguousExclusion { name: String, count: usize },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EntryNotFound(name) => write!(f, "Error: Entry label not found: {name}"),
            Self::AmbiguousEntry { name, count } => {
                write!(f, "Error: Multiple definitions for entry label: {name} ({count} candidates)")
            }
            Self::AmbiguousExclusion { name, count } => write!(
                f,
                "Error: Multiple possible definitions for excluded symbol: {name} ({count} candidates); use file.asm:label to disambiguate"
            ),
        }
    }
}

impl error::Error for Error {}

pub struct Config<'a> {
    pub entry: &'a str,
    pub optimize_irq: bool,
    pub exclude_functions: &'a [Exclusion],
    pub exclude_constants: &'a [Exclusion],
}

#[derive(Debug, Default)]
pub struct Reachable {
    pub functions: HashSet<FunctionId>,
    pub constants: HashSet<ConstantId>,
}

fn traverse(program: &Program, root: FunctionId, keep: &mut HashSet<FunctionId>) {
    if !keep.insert(root) {
        return;
    }
    debug!("traversing {}", program.function(root).name);
    for &callee in &program.function(root).resolved_refs {
        traverse(program, callee, keep);
    }
}

fn resolve_exclusion_function(program: &Program, exclusion: &Exclusion) -> Result<Option<FunctionId>, Error> {
    match exclusion {
        Exclusion::Qualified { file, name } => {
            let found = program.function_by_filename_name(file, name);
            if found.is_none() {
                warn!("excluded function not found: {file}:{name}");
            }
            Ok(found)
        }
        Exclusion::Name(name) => {
            let candidates = program.functions_by_name(name);
            match candidates.len() {
                0 => {
                    warn!("excluded function not found: {name}");
                    Ok(None)
                }
                1 => Ok(Some(candidates[0])),
                n => Err(Error::AmbiguousExclusion { name: name.clone(), count: n }),
            }
        }
    }
}

fn resolve_exclusion_constant(program: &Program, exclusion: &Exclusion) -> Result<Option<ConstantId>, Error> {
    match exclusion {
        Exclusion::Qualified { file, name } => {
            let found = program.constant_by_filename_name(file, name);
            if found.is_none() {
                warn!("excluded constant not found: {file}:{name}");
            }
            Ok(found)
        }
        Exclusion::Name(name) => {
            let candidates = program.constants_by_name(name);
            match candidates.len() {
                0 => {
                    warn!("excluded constant not found: {name}");
                    Ok(None)
                }
                1 => Ok(Some(candidates[0])),
                n => Err(Error::AmbiguousExclusion { name: name.clone(), count: n }),
            }
        }
    }
}

/// Computes the set of functions and constants reachable from the
/// configured roots.
pub fn compute(program: &Program, config: &Config<'_>) -> Result<Reachable, Error> {
    let mut reachable = Reachable::default();

    let entry_candidates = program.functions_by_name(config.entry);
    let mut entry_roots: Vec<FunctionId> = Vec::new();
    let mut module_const_roots: HashSet<ConstantId> = HashSet::new();

    match entry_candidates.len() {
        0 => {
            let module_entry = program.modules.iter().find(|m| {
                m.defined_symbols.iter().any(|s| s.name == config.entry)
            });
            match module_entry {
                Some(module) => {
                    for edge in &module.outbound {
                        match *edge {
                            FunctionOrConstant::Function(id) => entry_roots.push(id),
                            FunctionOrConstant::Constant(id) => {
                                module_const_roots.insert(id);
                            }
                        }
                    }
                    if entry_roots.is_empty() {
                        return Err(Error::EntryNotFound(config.entry.to_string()));
                    }
                }
                None => return Err(Error::EntryNotFound(config.entry.to_string())),
            }
        }
        1 => entry_roots.push(entry_candidates[0]),
        n => {
            return Err(Error::AmbiguousEntry {
                name: config.entry.to_string(),
                count: n,
            })
        }
    }

    for root in entry_roots {
        traverse(program, root, &mut reachable.functions);
    }

    for (i, function) in program.functions.iter().enumerate() {
        if function.isr_decl.is_none() {
            continue;
        }
        if config.optimize_irq && function.is_empty {
            continue;
        }
        traverse(program, FunctionId(i), &mut reachable.functions);
    }

    for initializer in &program.initializers {
        for &target in &initializer.resolved_function_ptrs {
            traverse(program, target, &mut reachable.functions);
        }
    }

    for &name in SDCC_REQUIRED {
        for id in program.functions_by_name(name) {
            traverse(program, id, &mut reachable.functions);
        }
    }

    for exclusion in config.exclude_functions {
        if let Some(id) = resolve_exclusion_function(program, exclusion)? {
            traverse(program, id, &mut reachable.functions);
        }
    }

    for function in reachable.functions.iter().copied().collect::<Vec<_>>() {
        reachable.constants.extend(program.function(function).resolved_consts.iter().copied());
    }
    for initializer in &program.initializers {
        reachable.constants.extend(initializer.resolved_constant_ptrs.iter().copied());
    }
    reachable.constants.extend(module_const_roots);

    for exclusion in config.exclude_constants {
        if let Some(id) = resolve_exclusion_constant(program, exclusion)? {
            reachable.constants.insert(id);
        }
    }

    apply_module_coupling(program, &mut reachable);

    Ok(reachable)
}

/// A module whose inbound set intersects the current keep-set contributes
/// its outbound functions/constants as additional roots. Pulling in one
/// module's outbound functions can itself satisfy another module's inbound
/// condition (a library pull-in chain), so passes repeat over the modules
/// not yet applied until a full pass makes no further progress.
fn apply_module_coupling(program: &Program, reachable: &mut Reachable) {
    let mut applied = vec![false; program.modules.len()];

    loop {
        let mut progress = false;

        for (i, module) in program.modules.iter().enumerate() {
            if applied[i] || module.inbound.is_empty() {
                continue;
            }
            let pulled_in = module.inbound.iter().any(|referrer| match *referrer {
                Referrer::Function(id) => reachable.functions.contains(&id),
                Referrer::Initializer(_) => true,
            });
            if !pulled_in {
                continue;
            }

            applied[i] = true;
            progress = true;
            for &edge in &module.outbound {
                match edge {
                    FunctionOrConstant::Function(id) => {
                        traverse(program, id, &mut reachable.functions);
                        reachable
                            .constants
                            .extend(program.function(id).resolved_consts.iter().copied());
                    }
                    FunctionOrConstant::Constant(id) => {
                        reachable.constants.insert(id);
                    }
                }
            }
        }

        if !progress {
            break;
        }
    }
}
