//! End-to-end pipeline tests driven through `stm8_dce::driver::run`, against
//! temp-directory fixtures rather than golden binaries.

use std::fs;

use stm8_dce::config::Config;
use stm8_dce::driver;

fn base_config(output_dir: std::path::PathBuf) -> Config {
    Config {
        entry: "_main".to_string(),
        output_dir,
        code_segment: "CODE".to_string(),
        const_segment: "CONST".to_string(),
        exclude_functions: Vec::new(),
        exclude_constants: Vec::new(),
        verbose: false,
        debug: false,
        optimize_irq: false,
    }
}

/// Minimal reachability: a dead function is commented out, a live one is kept,
/// and the original input file is left untouched.
#[test]
fn minimal_reachability_removes_unreferenced_function() {
    let input_dir = tempfile::tempdir().unwrap();
    let output_dir = tempfile::tempdir().unwrap();

    let input_path = input_dir.path().join("main.asm");
    fs::write(
        &input_path,
        "\
.area CODE
_main:
\tcall _live
\tret
_live:
\tret
_dead:
\tret
",
    )
    .unwrap();

    let config = base_config(output_dir.path().to_path_buf());
    let summary = driver::run(&config, &[input_path.clone()]).unwrap();

    assert_eq!(summary.removed_functions, 1);
    assert_eq!(summary.total_functions, 3);

    // Original input is untouched.
    let original = fs::read_to_string(&input_path).unwrap();
    assert!(!original.contains(';'));

    let rewritten_path = output_dir.path().join("main.asm");
    let rewritten = fs::read_to_string(&rewritten_path).unwrap();
    assert!(rewritten.contains(";_dead:"));
    assert!(!rewritten.contains(";_live:"));
    assert!(!rewritten.contains(";_main:"));
}

/// Static disambiguation: two files each define a static `_util`; a caller in
/// one file must resolve to its own file's definition, not the other file's.
#[test]
fn static_disambiguation_prefers_same_file_definition() {
    let input_dir = tempfile::tempdir().unwrap();
    let output_dir = tempfile::tempdir().unwrap();

    let a_path = input_dir.path().join("a.asm");
    fs::write(
        &a_path,
        "\
.area CODE
_main:
\tcall _util
\tret
_util:
\tret
",
    )
    .unwrap();

    let b_path = input_dir.path().join("b.asm");
    fs::write(
        &b_path,
        "\
.area CODE
_util:
\tret
",
    )
    .unwrap();

    let config = base_config(output_dir.path().to_path_buf());
    let summary = driver::run(&config, &[a_path, b_path]).unwrap();

    // a.asm's _main and _util are reachable; b.asm's _util is dead.
    assert_eq!(summary.total_functions, 3);
    assert_eq!(summary.removed_functions, 1);

    let a_rewritten = fs::read_to_string(output_dir.path().join("a.asm")).unwrap();
    assert!(!a_rewritten.contains(";_util:"));

    let b_rewritten = fs::read_to_string(output_dir.path().join("b.asm")).unwrap();
    assert!(b_rewritten.contains(";_util:"));
}

/// A conflicting pair of non-static definitions for the same name is a fatal
/// resolution error, surfaced through the top-level error type.
#[test]
fn conflicting_global_definitions_are_reported() {
    let input_dir = tempfile::tempdir().unwrap();
    let output_dir = tempfile::tempdir().unwrap();

    let a_path = input_dir.path().join("a.asm");
    fs::write(
        &a_path,
        ".globl _dup\n.area CODE\n_main:\ncall _dup\nret\n.area CODE\n_dup:\nret\n",
    )
    .unwrap();

    let b_path = input_dir.path().join("b.asm");
    fs::write(&b_path, ".globl _dup\n.area CODE\n_dup:\nret\n").unwrap();

    let config = base_config(output_dir.path().to_path_buf());
    let err = driver::run(&config, &[a_path, b_path]).unwrap_err();

    assert!(err.to_string().contains("Conflicting definitions"));
}

/// An excluded function is kept even though nothing calls it, and the
/// rewrite is idempotent: re-running against the already-rewritten output
/// produces no further changes.
#[test]
fn excluded_function_is_kept_and_rewrite_is_idempotent() {
    let input_dir = tempfile::tempdir().unwrap();
    let output_dir = tempfile::tempdir().unwrap();

    let input_path = input_dir.path().join("main.asm");
    fs::write(
        &input_path,
        ".area CODE\n_main:\nret\n_isr_handler:\nret\n",
    )
    .unwrap();

    let mut config = base_config(output_dir.path().to_path_buf());
    config.exclude_functions = vec![stm8_dce::reach::Exclusion::parse("_isr_handler")];

    let summary = driver::run(&config, &[input_path]).unwrap();
    assert_eq!(summary.removed_functions, 0);
    assert_eq!(summary.total_functions, 2);

    let rewritten_path = output_dir.path().join("main.asm");
    let first_pass = fs::read_to_string(&rewritten_path).unwrap();

    let second_output_dir = tempfile::tempdir().unwrap();
    let mut second_config = base_config(second_output_dir.path().to_path_buf());
    second_config.exclude_functions = vec![stm8_dce::reach::Exclusion::parse("_isr_handler")];
    let second_summary = driver::run(&second_config, &[rewritten_path]).unwrap();

    assert_eq!(second_summary.removed_functions, 0);
    let second_pass = fs::read_to_string(second_output_dir.path().join("main.asm")).unwrap();
    assert_eq!(first_pass, second_pass);
}

/// Library pull-in: `_main` calls `_helper`, which lives only in a `.lib`
/// module. That module references `_CONSTANT_X` and `_fn_y`, both defined in
/// `main.asm`; pulling the module in must keep both, including `_fn_y`'s own
/// transitive callee.
#[test]
fn library_pull_in_keeps_the_modules_outbound_symbols() {
    let input_dir = tempfile::tempdir().unwrap();
    let output_dir = tempfile::tempdir().unwrap();

    let asm_path = input_dir.path().join("main.asm");
    fs::write(
        &asm_path,
        "\
.area CODE
_main:
\tcall _helper
\tret
_fn_y:
\tcall _deep
\tret
_deep:
\tret
.area CONST
_CONSTANT_X:
\t.dw 0
",
    )
    .unwrap();

    let lib_path = input_dir.path().join("libmod.lib");
    fs::write(
        &lib_path,
        "H 1 areas 1 global symbols\nM libmod\nS _helper Def0000\nS _CONSTANT_X Ref0000\nS _fn_y Ref0000\n",
    )
    .unwrap();

    let config = base_config(output_dir.path().to_path_buf());
    let summary = driver::run(&config, &[asm_path, lib_path]).unwrap();

    assert_eq!(summary.total_functions, 3);
    assert_eq!(summary.removed_functions, 0);
    assert_eq!(summary.total_constants, 1);
    assert_eq!(summary.removed_constants, 0);

    let rewritten = fs::read_to_string(output_dir.path().join("main.asm")).unwrap();
    assert!(!rewritten.contains(";_fn_y:"));
    assert!(!rewritten.contains(";_deep:"));
    assert!(!rewritten.contains(";_CONSTANT_X:"));
}
