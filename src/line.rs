//! Pure line classification: turns one physical line of assembler text into
//! zero, one, or two [`Token`]s (a `LABEL: INSTR` pair classifies as two).

use std::{error, fmt};

/// Registers never count as labels, even when they appear where a label
/// would be syntactically legal.
const REGISTERS: &[&str] = &[
    "a", "x", "xl", "xh", "y", "yl", "yh", "sp", "pc", "pcl", "pch", "pce", "cc",
];

/// Mnemonics whose operands may carry a long-address label read, per the
/// SDCC STM8 instruction set.
pub const LONG_READ_MNEMONICS: &[&str] = &[
    "ld", "ldf", "ldw", "mov", "adc", "add", "and", "bcp", "cp", "or", "sub", "sbc", "xor",
    "addw", "subw", "cpw", "btjt", "btjf", "push", "call", "callf", "jp", "jpf", "int",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Directive(Directive),
    Label(Label),
    Instruction(Instruction),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    /// Everything after the directive keyword, e.g. `NAME` in `.globl NAME`.
    pub value: Option<String>,
    raw: String,
}

impl Directive {
    pub fn is_area(&self, area_name: Option<&str>) -> bool {
        let Some(value) = &self.value else {
            return false;
        };
        if !self.raw.starts_with(".area") {
            return false;
        }
        match area_name {
            None => true,
            Some(name) => value == name,
        }
    }

    #[must_use]
    pub fn is_globl(&self) -> bool {
        self.raw.starts_with(".globl")
    }

    #[must_use]
    pub fn is_dw(&self) -> bool {
        self.raw.starts_with(".dw")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    pub name: String,
    /// `$`-suffixed numeric local labels are not absolute.
    pub is_absolute: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub mnemonic: String,
    pub args: Vec<String>,
}

impl Instruction {
    fn is_register(arg: &str) -> bool {
        REGISTERS.contains(&arg.to_ascii_lowercase().as_str())
    }

    /// Returns the call target, if this instruction is a call.
    ///
    /// A call is `call TARGET`, or `jp LABEL` where `LABEL` looks like a
    /// plain symbol (not register-indirect, not numeric). `jpf` is
    /// deliberately excluded here: it only ever promotes reachability as a
    /// long read, never as a call edge.
    #[must_use]
    pub fn as_call(&self) -> Option<&str> {
        match self.mnemonic.as_str() {
            "call" => self.args.first().map(String::as_str),
            "jp" => {
                let label = self.args.first()?;
                let mut chars = label.chars();
                let first = chars.next()?;
                if !(first == '_' || first.is_alphabetic()) {
                    return None;
                }
                if label.chars().all(|c| c.is_alphanumeric() || c == '_') {
                    Some(label.as_str())
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    #[must_use]
    pub fn is_iret(&self) -> bool {
        self.mnemonic == "iret" && self.args.is_empty()
    }

    /// Returns the interrupt name if this is an `int NAME` vector slot.
    #[must_use]
    pub fn as_int(&self) -> Option<&str> {
        if self.mnemonic == "int" {
            self.args.first().map(String::as_str)
        } else {
            None
        }
    }

    /// Returns every distinct label read by a long-address-capable
    /// instruction, in first-seen order. See `§4.1`/`§4.3` for the operand
    /// selection rules (single operand, `dst, src`, or the three-operand
    /// `btjt`/`btjf` forms).
    #[must_use]
    pub fn long_read_labels(&self) -> Vec<String> {
        if !LONG_READ_MNEMONICS.contains(&self.mnemonic.as_str()) {
            return Vec::new();
        }

        let eval_args: &[String] = if self.args.len() == 2 {
            &self.args[1..]
        } else {
            &self.args
        };

        let mut labels = Vec::new();
        for arg in eval_args {
            if let Some(label) = extract_label(arg) {
                if Self::is_register(&label) {
                    continue;
                }
                if !labels.contains(&label) {
                    labels.push(label);
                }
            }
        }
        labels
    }
}

/// Extracts the first `[A-Za-z0-9_]+` run that starts with a letter or `_`
/// and is not itself preceded by an alphanumeric character (so hex literals
/// like `0x12AB` don't get mistaken for a label).
fn extract_label(arg: &str) -> Option<String> {
    let chars: Vec<char> = arg.chars().collect();
    for (i, &c) in chars.iter().enumerate() {
        let prev_alnum = i > 0 && chars[i - 1].is_alphanumeric();
        if (c.is_alphabetic() || c == '_') && !prev_alnum {
            let label: String = chars[i..]
                .iter()
                .take_while(|c| c.is_alphanumeric() || **c == '_')
                .collect();
            return Some(label);
        }
    }
    None
}

#[derive(Debug, Clone)]
pub enum Error {
    NotADirective,
    NotALabel,
    NotAnInstruction,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NotADirective => "not a directive",
            Self::NotALabel => "not a label",
            Self::NotAnInstruction => "not an instruction",
        })
    }
}

impl error::Error for Error {}

/// Strips a `;` comment and surrounding whitespace.
#[must_use]
pub fn sanitize(line: &str) -> &str {
    line.split(';').next().unwrap_or("").trim()
}

fn parse_directive(sanitized: &str) -> Result<Directive, Error> {
    if !sanitized.starts_with('.') {
        return Err(Error::NotADirective);
    }
    let mut parts = sanitized.splitn(2, char::is_whitespace);
    let _keyword = parts.next();
    let value = parts.next().map(str::trim).filter(|s| !s.is_empty()).map(String::from);
    Ok(Directive {
        value,
        raw: sanitized.to_string(),
    })
}

fn parse_label(sanitized: &str) -> Result<Label, Error> {
    if !sanitized.ends_with(':') {
        return Err(Error::NotALabel);
    }
    let name = sanitized[..sanitized.len() - 1].to_string();
    let is_absolute = !name.ends_with('$');
    Ok(Label { name, is_absolute })
}

/// Splits an instruction's argument list on commas, treating parenthesized
/// groups as atomic (so `ldw x, (_tbl, y)` keeps its second argument intact).
fn split_args(rest: &str) -> Vec<String> {
    let mut args = Vec::new();
    let chars: Vec<char> = rest.chars().collect();
    let mut i = 0;
    let mut start = 0;
    while i < chars.len() {
        match chars[i] {
            '(' => {
                while i < chars.len() && chars[i] != ')' {
                    i += 1;
                }
            }
            ',' => {
                args.push(chars[start..i].iter().collect::<String>().trim().to_string());
                i += 1;
                start = i;
                continue;
            }
            _ => {}
        }
        i += 1;
    }
    let tail: String = chars[start..].iter().collect();
    let tail = tail.trim();
    if !tail.is_empty() || !args.is_empty() {
        args.push(tail.to_string());
    }
    args
}

fn parse_instruction(sanitized: &str) -> Result<Instruction, Error> {
    if sanitized.is_empty() {
        return Err(Error::NotAnInstruction);
    }
    let mut parts = sanitized.splitn(2, char::is_whitespace);
    let mnemonic = parts.next().unwrap_or_default().to_string();
    if mnemonic.is_empty() {
        return Err(Error::NotAnInstruction);
    }
    let args = match parts.next() {
        Some(rest) if !rest.trim().is_empty() => split_args(rest.trim()),
        _ => Vec::new(),
    };
    Ok(Instruction { mnemonic, args })
}

/// Splits `LABEL: INSTR` into its two parts; a line without a `:`, or whose
/// tail is empty, is returned unsplit.
fn split_label_and_instruction(sanitized: &str) -> Vec<String> {
    if let Some((label, rest)) = sanitized.split_once(':') {
        let rest = rest.trim();
        if !rest.is_empty() {
            return vec![format!("{}:", label.trim()), rest.to_string()];
        }
    }
    vec![sanitized.to_string()]
}

/// Classifies a single source line into its constituent tokens.
///
/// A `LABEL: INSTR` line yields two tokens; a pure directive, label, or
/// instruction line yields one; a blank or unrecognized line yields none.
#[must_use]
pub fn classify_line(line: &str) -> Vec<Token> {
    let sanitized = sanitize(line);
    let mut tokens = Vec::new();

    for part in split_label_and_instruction(sanitized) {
        if let Ok(d) = parse_directive(&part) {
            tokens.push(Token::Directive(d));
            continue;
        }
        if let Ok(l) = parse_label(&part) {
            tokens.push(Token::Label(l));
            continue;
        }
        if let Ok(i) = parse_instruction(&part) {
            tokens.push(Token::Instruction(i));
            continue;
        }
    }

    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_comments() {
        assert_eq!(sanitize("  ld a, #1 ; load one"), "ld a, #1");
        assert_eq!(sanitize(";just a comment"), "");
    }

    #[test]
    fn classifies_area_directive() {
        let tokens = classify_line(".area CODE");
        assert_eq!(tokens.len(), 1);
        match &tokens[0] {
            Token::Directive(d) => {
                assert!(d.is_area(Some("CODE")));
                assert!(!d.is_area(Some("CONST")));
                assert!(d.is_area(None));
            }
            _ => panic!("expected directive"),
        }
    }

    #[test]
    fn classifies_globl_directive() {
        let tokens = classify_line(".globl _main");
        match &tokens[0] {
            Token::Directive(d) => {
                assert!(d.is_globl());
                assert_eq!(d.value.as_deref(), Some("_main"));
            }
            _ => panic!("expected directive"),
        }
    }

    #[test]
    fn absolute_vs_local_label() {
        let tokens = classify_line("_main:");
        match &tokens[0] {
            Token::Label(l) => assert!(l.is_absolute),
            _ => panic!("expected label"),
        }

        let tokens = classify_line("00105$:");
        match &tokens[0] {
            Token::Label(l) => assert!(!l.is_absolute),
            _ => panic!("expected label"),
        }
    }

    #[test]
    fn splits_label_and_instruction() {
        let tokens = classify_line("_main: ret");
        assert_eq!(tokens.len(), 2);
        assert!(matches!(&tokens[0], Token::Label(l) if l.name == "_main"));
        assert!(matches!(&tokens[1], Token::Instruction(i) if i.mnemonic == "ret"));
    }

    #[test]
    fn call_instruction() {
        let tokens = classify_line("call _helper");
        match &tokens[0] {
            Token::Instruction(i) => assert_eq!(i.as_call(), Some("_helper")),
            _ => panic!("expected instruction"),
        }
    }

    #[test]
    fn jp_to_label_is_a_call_jp_indirect_is_not() {
        let tokens = classify_line("jp _target");
        match &tokens[0] {
            Token::Instruction(i) => assert_eq!(i.as_call(), Some("_target")),
            _ => panic!(),
        }

        let tokens = classify_line("jp (x)");
        match &tokens[0] {
            Token::Instruction(i) => assert_eq!(i.as_call(), None),
            _ => panic!(),
        }
    }

    #[test]
    fn jpf_is_never_a_call() {
        let tokens = classify_line("jpf _target");
        match &tokens[0] {
            Token::Instruction(i) => assert_eq!(i.as_call(), None),
            _ => panic!(),
        }
    }

    #[test]
    fn long_read_single_operand() {
        let tokens = classify_line("push _label");
        match &tokens[0] {
            Token::Instruction(i) => assert_eq!(i.long_read_labels(), vec!["_label".to_string()]),
            _ => panic!(),
        }
    }

    #[test]
    fn long_read_two_operand_uses_src_only() {
        let tokens = classify_line("ld a, _label");
        match &tokens[0] {
            Token::Instruction(i) => assert_eq!(i.long_read_labels(), vec!["_label".to_string()]),
            _ => panic!(),
        }

        let tokens = classify_line("ld _dst, a");
        match &tokens[0] {
            Token::Instruction(i) => assert!(i.long_read_labels().is_empty()),
            _ => panic!(),
        }
    }

    #[test]
    fn long_read_three_operand_examines_both() {
        let tokens = classify_line("btjt _flags, #1, _label");
        match &tokens[0] {
            Token::Instruction(i) => {
                let labels = i.long_read_labels();
                assert!(labels.contains(&"_flags".to_string()));
                assert!(labels.contains(&"_label".to_string()));
            }
            _ => panic!(),
        }
    }

    #[test]
    fn hex_literal_is_not_mistaken_for_a_label() {
        let tokens = classify_line("ld a, #0x12AB");
        match &tokens[0] {
            Token::Instruction(i) => assert!(i.long_read_labels().is_empty()),
            _ => panic!(),
        }
    }

    #[test]
    fn register_operand_is_not_a_label() {
        let tokens = classify_line("push x");
        match &tokens[0] {
            Token::Instruction(i) => assert!(i.long_read_labels().is_empty()),
            _ => panic!(),
        }
    }

    #[test]
    fn parenthesized_operand_is_not_split_on_comma() {
        let tokens = classify_line("ldw x, (_tbl, y)");
        match &tokens[0] {
            Token::Instruction(i) => assert_eq!(i.args, vec!["x".to_string(), "(_tbl, y)".to_string()]),
            _ => panic!(),
        }
    }

    #[test]
    fn iret_marks_interrupt_return() {
        let tokens = classify_line("iret");
        match &tokens[0] {
            Token::Instruction(i) => assert!(i.is_iret()),
            _ => panic!(),
        }
    }

    #[test]
    fn int_vector_slot() {
        let tokens = classify_line("int _irq_handler");
        match &tokens[0] {
            Token::Instruction(i) => assert_eq!(i.as_int(), Some("_irq_handler")),
            _ => panic!(),
        }
    }

    #[test]
    fn blank_and_comment_only_lines_classify_empty() {
        assert!(classify_line("").is_empty());
        assert!(classify_line("   ").is_empty());
        assert!(classify_line("; a comment").is_empty());
    }
}
