//! Parses SDCC `.rel`/`.lib` object files into [`Module`](crate::model::Module)
//! records.
//!
//! The format is line-oriented: an `H` line opens a module (the following
//! line is conventionally its `M` name line), `M` lines name it, and `S`
//! lines declare a defined or referenced symbol. Everything else (area
//! records, relocation records, checksum lines) is irrelevant to reachability
//! and is skipped.

use std::path::Path;

use crate::model::{Module, ObjectSymbol, Program};

const ABS_SYMBOL: &str = ".__.ABS.";

enum ObjLine<'a> {
    Header,
    ModuleName(&'a str),
    Symbol(ObjectSymbol, SymbolKind),
    Other,
}

enum SymbolKind {
    Def,
    Ref,
}

fn classify(line: &str) -> ObjLine<'_> {
    if let Some(rest) = line.strip_prefix("H ") {
        let _ = rest;
        return ObjLine::Header;
    }
    if let Some(rest) = line.strip_prefix("M ") {
        let name = rest.split_whitespace().next().unwrap_or("").trim();
        return ObjLine::ModuleName(name);
    }
    if let Some(rest) = line.strip_prefix("S ") {
        if let Some((name, tail)) = rest.split_once(' ') {
            let name = name.trim();
            let (kind, offset) = if let Some(off) = tail.strip_prefix("Def") {
                (SymbolKind::Def, off)
            } else if let Some(off) = tail.strip_prefix("Ref") {
                (SymbolKind::Ref, off)
            } else {
                return ObjLine::Other;
            };
            if offset.trim().is_empty() || !offset.trim().chars().all(|c| c.is_ascii_hexdigit()) {
                return ObjLine::Other;
            }
            return ObjLine::Symbol(
                ObjectSymbol {
                    name: name.to_string(),
                    line: 0,
                },
                kind,
            );
        }
    }
    ObjLine::Other
}

/// Parses one `.rel`/`.lib` file's contents, appending every module found to
/// `program` in file order. A single `.lib` archive may contain many
/// concatenated modules; each `H` line starts a fresh one.
pub fn parse_object_file(program: &mut Program, path: &Path, contents: &str) {
    for (line_number, raw_line) in contents.lines().enumerate() {
        let line_number = line_number + 1;
        match classify(raw_line) {
            ObjLine::Header => {
                program.push_module(Module::new(path.to_path_buf(), line_number - 1));
            }
            ObjLine::ModuleName(name) => {
                if let Some(module) = program.modules.last_mut() {
                    module.name = name.to_string();
                }
            }
            ObjLine::Symbol(mut symbol, kind) => {
                if symbol.name == ABS_SYMBOL {
                    continue;
                }
                symbol.line = line_number;
                let Some(module) = program.modules.last_mut() else {
                    continue;
                };
                match kind {
                    SymbolKind::Def => module.defined_symbols.push(symbol),
                    SymbolKind::Ref => module.referenced_symbols.push(symbol),
                }
            }
            ObjLine::Other => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn parse(contents: &str) -> Program {
        let mut program = Program::new();
        parse_object_file(&mut program, &PathBuf::from("lib.rel"), contents);
        program
    }

    #[test]
    fn single_module_with_defs_and_refs() {
        let program = parse(
            "H 4 areas 3 global symbols\nM mymodule\nS _helper Def0000\nS _external Ref0000\n",
        );
        assert_eq!(program.modules.len(), 1);
        let m = &program.modules[0];
        assert_eq!(m.name, "mymodule");
        assert_eq!(m.header_line, 0);
        assert_eq!(m.defined_symbols.len(), 1);
        assert_eq!(m.defined_symbols[0].name, "_helper");
        assert_eq!(m.referenced_symbols.len(), 1);
        assert_eq!(m.referenced_symbols[0].name, "_external");
    }

    #[test]
    fn archive_with_multiple_modules() {
        let program = parse(
            "H 1 areas 1 global symbols\nM first\nS _a Def0000\nH 1 areas 1 global symbols\nM second\nS _b Def0000\n",
        );
        assert_eq!(program.modules.len(), 2);
        assert_eq!(program.modules[0].name, "first");
        assert_eq!(program.modules[0].header_line, 0);
        assert_eq!(program.modules[1].name, "second");
        assert_eq!(program.modules[1].header_line, 3);
    }

    #[test]
    fn abs_symbol_is_ignored() {
        let program = parse("H 1 areas 1 global symbols\nM mymodule\nS .__.ABS. Def0000\n");
        assert!(program.modules[0].defined_symbols.is_empty());
    }

    #[test]
    fn unnamed_module_keeps_default_name() {
        let program = parse("H 1 areas 1 global symbols\nS _a Def0000\n");
        assert_eq!(program.modules[0].name, crate::model::UNNAMED_MODULE);
    }
}
