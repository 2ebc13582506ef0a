//! The assembly parser: walks a classified token stream and emits globals,
//! interrupt entries, functions, constants, and initializers into a
//! [`Program`].
//!
//! The parser is a small state machine over a token queue, mirroring the
//! area-driven structure of SDCC output: outside any area, only `.globl` and
//! `int` lines matter; inside `CODE`/`CONST`/`INITIALIZER` areas, absolute
//! labels start a new entity that runs until the next absolute label or area
//! directive (which is pushed back for the outer loop to see).

use std::collections::VecDeque;
use std::path::Path;

use crate::line::{classify_line, Token};
use crate::model::{Constant, Function, GlobalDecl, Initializer, InterruptEntry, Loc, Program};

/// Area names the core distinguishes; everything else is ignored.
pub struct AreaNames<'a> {
    pub code: &'a str,
    pub constant: &'a str,
}

struct Located {
    line: usize,
    token: Token,
}

/// Parses one assembly file's tokens, appending every entity found to
/// `program` in source order.
pub fn parse_asm_file(program: &mut Program, path: &Path, contents: &str, areas: &AreaNames<'_>) {
    let mut queue: VecDeque<Located> = VecDeque::new();
    for (line_number, raw_line) in contents.lines().enumerate() {
        let line = line_number + 1;
        for token in classify_line(raw_line) {
            queue.push_back(Located { line, token });
        }
    }

    while let Some(item) = queue.pop_front() {
        match item.token {
            Token::Directive(ref d) if d.is_globl() => {
                if let Some(name) = &d.value {
                    program.push_global(GlobalDecl {
                        loc: Loc::new(path.to_path_buf(), item.line),
                        name: name.clone(),
                    });
                }
            }
            Token::Instruction(ref instr) => {
                if let Some(name) = instr.as_int() {
                    program.push_interrupt(InterruptEntry {
                        loc: Loc::new(path.to_path_buf(), item.line),
                        name: name.to_string(),
                    });
                }
            }
            Token::Directive(ref d) if d.is_area(Some(areas.code)) => {
                parse_code_area(program, path, &mut queue);
            }
            Token::Directive(ref d) if d.is_area(Some(areas.constant)) => {
                parse_const_area(program, path, &mut queue);
            }
            Token::Directive(ref d) if d.is_area(Some("INITIALIZER")) => {
                parse_initializer_area(program, path, &mut queue);
            }
            _ => {}
        }
    }
}

fn is_boundary(token: &Token) -> bool {
    matches!(token, Token::Directive(d) if d.is_area(None))
        || matches!(token, Token::Label(l) if l.is_absolute)
}

fn parse_code_area(program: &mut Program, path: &Path, queue: &mut VecDeque<Located>) {
    while let Some(item) = queue.pop_front() {
        match item.token {
            Token::Directive(ref d) if d.is_area(None) => {
                queue.push_front(item);
                return;
            }
            Token::Label(ref l) if l.is_absolute => {
                parse_function(program, path, l.name.clone(), item.line, queue);
            }
            _ => {}
        }
    }
}

fn parse_const_area(program: &mut Program, path: &Path, queue: &mut VecDeque<Located>) {
    while let Some(item) = queue.pop_front() {
        match item.token {
            Token::Directive(ref d) if d.is_area(None) => {
                queue.push_front(item);
                return;
            }
            Token::Label(ref l) if l.is_absolute => {
                parse_constant(program, path, l.name.clone(), item.line, queue);
            }
            _ => {}
        }
    }
}

fn parse_initializer_area(program: &mut Program, path: &Path, queue: &mut VecDeque<Located>) {
    while let Some(item) = queue.pop_front() {
        match item.token {
            Token::Directive(ref d) if d.is_area(None) => {
                queue.push_front(item);
                return;
            }
            Token::Label(ref l) if l.is_absolute => {
                parse_initializer(program, path, l.name.clone(), item.line, queue);
            }
            _ => {}
        }
    }
}

fn parse_function(
    program: &mut Program,
    path: &Path,
    name: String,
    start_line: usize,
    queue: &mut VecDeque<Located>,
) {
    let mut function = Function::new(Loc::new(path.to_path_buf(), start_line), name);
    let mut end_line = start_line;

    while let Some(item) = queue.pop_front() {
        if let Token::Instruction(instr) = &item.token {
            if instr.is_iret() {
                continue;
            }
        }

        if is_boundary(&item.token) {
            end_line = item.line - 1;
            queue.push_front(item);
            break;
        }

        function.is_empty = false;

        if let Token::Instruction(instr) = &item.token {
            if let Some(call) = instr.as_call() {
                if !function.calls_out.iter().any(|c| c == call) {
                    function.calls_out.push(call.to_string());
                }
                continue;
            }
            for label in instr.long_read_labels() {
                if !function.long_reads.contains(&label) {
                    function.long_reads.push(label);
                }
            }
        }
    }

    function.end_line = end_line;
    program.push_function(function);
}

fn parse_constant(
    program: &mut Program,
    path: &Path,
    name: String,
    start_line: usize,
    queue: &mut VecDeque<Located>,
) {
    let mut constant = Constant::new(Loc::new(path.to_path_buf(), start_line), name);
    let mut end_line = start_line;

    while let Some(item) = queue.pop_front() {
        if is_boundary(&item.token) {
            end_line = item.line - 1;
            queue.push_front(item);
            break;
        }
    }

    constant.end_line = end_line;
    program.push_constant(constant);
}

fn is_symbol_like(value: &str) -> bool {
    let mut chars = value.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    value.chars().all(|c| c.is_alphanumeric() || c == '_')
}

fn parse_initializer(
    program: &mut Program,
    path: &Path,
    name: String,
    start_line: usize,
    queue: &mut VecDeque<Located>,
) {
    let mut initializer = Initializer::new(Loc::new(path.to_path_buf(), start_line), name);
    let mut end_line = start_line;

    while let Some(item) = queue.pop_front() {
        if is_boundary(&item.token) {
            end_line = item.line - 1;
            queue.push_front(item);
            break;
        }

        if let Token::Directive(d) = &item.token {
            if d.is_dw() {
                if let Some(value) = &d.value {
                    if is_symbol_like(value) {
                        initializer.pointer_names.push(value.clone());
                    }
                }
            }
        }
    }

    initializer.end_line = end_line;
    program.push_initializer(initializer);
}
