//! The symbol resolver: turns the raw name references collected by the
//! assembly parser into indexed edges, applying the global/static visibility
//! discipline described in the component design.
//!
//! Resolution runs once, after every input file has been parsed, in the
//! fixed step order: globals, interrupts, calls, long reads, initializer
//! pointers, object-module edges.

use std::path::Path;
use std::{error, fmt};

use crate::model::{
    ConstantId, FunctionId, FunctionOrConstant, GlobalDeclId, InitializerId, InterruptEntryId, Loc,
    Program, Referrer,
};

#[derive(Debug, Clone)]
pub enum Error {
    ConflictingGlobalFunction { name: String, sites: Vec<Loc> },
    MultipleStaticFunctions { name: String, sites: Vec<Loc> },
    ConflictingGlobalConstant { name: String, sites: Vec<Loc> },
    MultipleStaticConstants { name: String, sites: Vec<Loc> },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConflictingGlobalFunction { name, sites } => {
                write!(f, "Error: Conflicting definitions for non-static function: {name}")?;
                for site in sites {
                    write!(f, "\nIn file {site}")?;
                }
                Ok(())
            }
            Self::MultipleStaticFunctions { name, sites } => {
                write!(f, "Error: Multiple static definitions for function {name}")?;
                for site in sites {
                    write!(f, "\nIn file {site}")?;
                }
                Ok(())
            }
            Self::ConflictingGlobalConstant { name, sites } => {
                write!(f, "Error: Conflicting definitions for global constant: {name}")?;
                for site in sites {
                    write!(f, "\nIn file {site}")?;
                }
                Ok(())
            }
            Self::MultipleStaticConstants { name, sites } => {
                write!(f, "Error: Multiple static definitions for constant {name}")?;
                for site in sites {
                    write!(f, "\nIn file {site}")?;
                }
                Ok(())
            }
        }
    }
}

impl error::Error for Error {}

enum Conflict {
    Global(Vec<Loc>),
    Static(Vec<Loc>),
}

/// Applies the global/static visibility discipline over a set of same-named
/// candidates. `None` means no candidate resolves the reference (either
/// there were no candidates at all, or static candidates exist but none in
/// the caller's file, which is silently dropped, matching how a static name
/// collision in an unrelated file never reaches the caller).
fn resolve_name<I: Copy>(
    candidates: &[I],
    is_global: impl Fn(I) -> bool,
    is_same_file: impl Fn(I, &Path) -> bool,
    loc_of: impl Fn(I) -> Loc,
    caller_path: &Path,
) -> Result<Option<I>, Conflict> {
    if candidates.is_empty() {
        return Ok(None);
    }

    let globals: Vec<I> = candidates.iter().copied().filter(|&c| is_global(c)).collect();
    if !globals.is_empty() {
        if globals.len() > 1 {
            return Err(Conflict::Global(globals.iter().map(|&c| loc_of(c)).collect()));
        }
        return Ok(Some(globals[0]));
    }

    let statics: Vec<I> = candidates
        .iter()
        .copied()
        .filter(|&c| is_same_file(c, caller_path))
        .collect();
    if statics.len() > 1 {
        return Err(Conflict::Static(statics.iter().map(|&c| loc_of(c)).collect()));
    }
    Ok(statics.first().copied())
}

fn resolve_function_ref(
    program: &Program,
    name: &str,
    caller_path: &Path,
) -> Result<Option<FunctionId>, Error> {
    let candidates = program.functions_by_name(name);
    resolve_name(
        &candidates,
        |id| !program.function(id).global_decls.is_empty(),
        |id, path| program.function(id).loc.path == path,
        |id| program.function(id).loc.clone(),
        caller_path,
    )
    .map_err(|conflict| match conflict {
        Conflict::Global(sites) => Error::ConflictingGlobalFunction {
            name: name.to_string(),
            sites,
        },
        Conflict::Static(sites) => Error::MultipleStaticFunctions {
            name: name.to_string(),
            sites,
        },
    })
}

fn resolve_constant_ref(
    program: &Program,
    name: &str,
    caller_path: &Path,
) -> Result<Option<ConstantId>, Error> {
    let candidates = program.constants_by_name(name);
    resolve_name(
        &candidates,
        |id| !program.constant(id).global_decls.is_empty(),
        |id, path| program.constant(id).loc.path == path,
        |id| program.constant(id).loc.clone(),
        caller_path,
    )
    .map_err(|conflict| match conflict {
        Conflict::Global(sites) => Error::ConflictingGlobalConstant {
            name: name.to_string(),
            sites,
        },
        Conflict::Static(sites) => Error::MultipleStaticConstants {
            name: name.to_string(),
            sites,
        },
    })
}

fn attach_globals(program: &mut Program) {
    let globals: Vec<(GlobalDeclId, String)> = program
        .globals
        .iter()
        .enumerate()
        .map(|(i, g)| (GlobalDeclId(i), g.name.clone()))
        .collect();

    for (id, name) in &globals {
        for function in &mut program.functions {
            if &function.name == name {
                function.global_decls.push(*id);
            }
        }
        for constant in &mut program.constants {
            if &constant.name == name {
                constant.global_decls.push(*id);
            }
        }
    }
}

fn attach_interrupts(program: &mut Program) {
    let interrupts: Vec<(InterruptEntryId, String)> = program
        .interrupts
        .iter()
        .enumerate()
        .map(|(i, e)| (InterruptEntryId(i), e.name.clone()))
        .collect();

    for function in &mut program.functions {
        for (id, name) in &interrupts {
            if &function.name == *name {
                function.isr_decl = Some(*id);
            }
        }
    }
}

fn resolve_calls(program: &mut Program) -> Result<(), Error> {
    let mut updates = Vec::with_capacity(program.functions.len());
    for (i, function) in program.functions.iter().enumerate() {
        let id = FunctionId(i);
        let mut refs = Vec::new();
        let mut external = Vec::new();
        for call in &function.calls_out {
            match resolve_function_ref(program, call, &function.loc.path)? {
                Some(target) => refs.push(target),
                None => {
                    if program.functions_by_name(call).is_empty() {
                        external.push(call.clone());
                    }
                }
            }
        }
        updates.push((id, refs, external));
    }

    for (id, refs, external) in updates {
        let function = program.function_mut(id);
        function.resolved_refs.extend(refs);
        function.external_refs.extend(external);
    }
    Ok(())
}

fn resolve_long_reads(program: &mut Program) -> Result<(), Error> {
    let mut updates = Vec::with_capacity(program.functions.len());
    for (i, function) in program.functions.iter().enumerate() {
        let id = FunctionId(i);
        let mut refs = Vec::new();
        let mut consts = Vec::new();
        let mut external_consts = Vec::new();

        for label in &function.long_reads {
            let func_match = resolve_function_ref(program, label, &function.loc.path)?;
            let const_match = resolve_constant_ref(program, label, &function.loc.path)?;

            if let Some(target) = func_match {
                refs.push(target);
            }
            if let Some(target) = const_match {
                consts.push(target);
            }
            if func_match.is_none()
                && const_match.is_none()
                && program.functions_by_name(label).is_empty()
                && program.constants_by_name(label).is_empty()
            {
                external_consts.push(label.clone());
            }
        }

        updates.push((id, refs, consts, external_consts));
    }

    for (id, refs, consts, external_consts) in updates {
        let function = program.function_mut(id);
        function.resolved_refs.extend(refs);
        function.resolved_consts.extend(consts);
        function.external_consts.extend(external_consts);
    }
    Ok(())
}

fn resolve_initializer_pointers(program: &mut Program) -> Result<(), Error> {
    let mut updates = Vec::with_capacity(program.initializers.len());
    for (i, initializer) in program.initializers.iter().enumerate() {
        let id = InitializerId(i);
        let mut function_ptrs = Vec::new();
        let mut constant_ptrs = Vec::new();
        let mut unresolved = Vec::new();

        for name in &initializer.pointer_names {
            if let Some(target) = resolve_constant_ref(program, name, &initializer.loc.path)? {
                constant_ptrs.push(target);
                continue;
            }
            if let Some(target) = resolve_function_ref(program, name, &initializer.loc.path)? {
                function_ptrs.push(target);
                continue;
            }
            unresolved.push(name.clone());
        }

        updates.push((id, function_ptrs, constant_ptrs, unresolved));
    }

    for (id, function_ptrs, constant_ptrs, unresolved) in updates {
        let initializer = &mut program.initializers[id.0];
        initializer.resolved_function_ptrs.extend(function_ptrs);
        initializer.resolved_constant_ptrs.extend(constant_ptrs);
        initializer.unresolved_ptrs.extend(unresolved);
    }
    Ok(())
}

fn resolve_modules(program: &mut Program) {
    for module_index in 0..program.modules.len() {
        let defined: Vec<String> = program.modules[module_index]
            .defined_symbols
            .iter()
            .map(|s| s.name.clone())
            .collect();

        let mut inbound = Vec::new();
        for symbol in &defined {
            for (i, function) in program.functions.iter().enumerate() {
                if function.external_refs.iter().any(|n| n == symbol)
                    || function.external_consts.iter().any(|n| n == symbol)
                {
                    inbound.push(Referrer::Function(FunctionId(i)));
                }
            }
            for (i, initializer) in program.initializers.iter().enumerate() {
                if initializer.unresolved_ptrs.iter().any(|n| n == symbol) {
                    inbound.push(Referrer::Initializer(InitializerId(i)));
                }
            }
        }

        if inbound.is_empty() {
            program.modules[module_index].inbound = inbound;
            continue;
        }

        let referenced: Vec<String> = program.modules[module_index]
            .referenced_symbols
            .iter()
            .map(|s| s.name.clone())
            .collect();

        let mut outbound = Vec::new();
        for symbol in &referenced {
            if let Some((i, _)) = program
                .functions
                .iter()
                .enumerate()
                .find(|(_, f)| &f.name == symbol)
            {
                outbound.push(FunctionOrConstant::Function(FunctionId(i)));
                continue;
            }
            if let Some((i, _)) = program
                .constants
                .iter()
                .enumerate()
                .find(|(_, c)| &c.name == symbol)
            {
                outbound.push(FunctionOrConstant::Constant(ConstantId(i)));
            }
        }

        program.modules[module_index].inbound = inbound;
        program.modules[module_index].outbound = outbound;
    }
}

/// Resolves every raw name reference in `program` into indexed edges.
///
/// Must be called exactly once, after every input file has been parsed into
/// the program arena.
pub fn resolve(program: &mut Program) -> Result<(), Error> {
    attach_globals(program);
    attach_interrupts(program);
    resolve_calls(program)?;
    resolve_long_reads(program)?;
    resolve_initializer_pointers(program)?;
    resolve_modules(program);
    Ok(())
}
