use std::{fs, io::Cursor};

use tessella::{
    diagnostics::{DiagnosticKind, TessellaError},
    engine::{Io, Program},
    prepper,
    queue::ActivationQueue,
    tile::Name,
};
use tempfile::tempdir;

fn run_with_input(source: &str, input: &str) -> (String, Program) {
    let mut program = Program::from_source(source).expect("program should build");
    let mut reader = Cursor::new(input.as_bytes());
    let mut output = Vec::new();
    {
        let mut io = Io {
            input: &mut reader,
            output: &mut output,
        };
        program.run(&mut io).expect("program should run");
    }
    let text = String::from_utf8(output).expect("output should be UTF-8");
    (text, program)
}

fn run(source: &str) -> (String, Program) {
    run_with_input(source, "")
}

fn run_in_dir(source: &str, base: &std::path::Path) -> (String, Program) {
    let mut program = Program::from_source(source)
        .expect("program should build")
        .with_base(base);
    let mut reader = Cursor::new(&b""[..]);
    let mut output = Vec::new();
    {
        let mut io = Io {
            input: &mut reader,
            output: &mut output,
        };
        program.run(&mut io).expect("program should run");
    }
    let text = String::from_utf8(output).expect("output should be UTF-8");
    (text, program)
}

fn var(program: &Program, name: &str) -> i64 {
    program.variables().get(&Name::parse(name))
}

#[test]
fn initializer_marked_output_prints_default_zero() {
    let (output, program) = run(".@");
    assert_eq!(output, "0");
    assert!(program.queue().is_empty());
}

#[test]
fn increment_then_read_shared_name_prints_one() {
    // Both tiles default to the attached name "0".
    let (output, _) = run(".+.@");
    assert_eq!(output, "1");
}

#[test]
fn rightward_propagation_stops_before_blocker() {
    let (output, _) = run(".>@a_@b");
    assert_eq!(output, "0");
}

#[test]
fn propagation_at_array_edge_is_noop() {
    let (output, _) = run(".>");
    assert_eq!(output, "");
}

#[test]
fn poke_activates_exactly_one_tile() {
    let (output, program) = run(".}+x@x");
    assert_eq!(output, "");
    assert_eq!(var(&program, "x"), 1);
}

#[test]
fn propagation_enqueues_poke_and_stops_behind_it() {
    // If `>` ran past the poke tile, `y` would be incremented too.
    let (_, program) = run(".>}+x+y");
    assert_eq!(var(&program, "x"), 1);
    assert_eq!(var(&program, "y"), 0);
}

#[test]
fn deactivation_removes_pending_tiles() {
    let (output, program) = run(".>+a@a.(");
    assert_eq!(output, "");
    assert_eq!(var(&program, "a"), 0);
}

#[test]
fn blocker_shields_tiles_from_deactivation() {
    let (output, _) = run(".)_.@a");
    assert_eq!(output, "0");
}

#[test]
fn deactivated_tile_can_be_activated_again() {
    // `)` flushes the pending output tile; the remote activator brings it
    // back afterward.
    let (output, _) = run(".).@a_.,a");
    assert_eq!(output, "0");
}

#[test]
fn remote_activator_prefers_left_on_equidistant_tie() {
    // The left candidate prints "0"; the right one would print a newline.
    let (output, _) = run("@x.,x;x");
    assert_eq!(output, "0");
}

#[test]
fn unresolved_remote_activator_is_fatal() {
    let err = Program::from_source(".,missing").expect_err("linking should fail");
    match err {
        TessellaError::Diagnostic(diag) => {
            assert_eq!(diag.kind, DiagnosticKind::Link);
            assert!(diag.message.contains("missing"), "{}", diag.message);
        }
        other => panic!("expected diagnostic, found {other}"),
    }
}

#[test]
fn comparator_tie_activates_leftward() {
    // Both sides read 0; a rightward activation would print a newline.
    let (output, _) = run("@a.?;");
    assert_eq!(output, "0");
}

#[test]
fn comparator_counts_consecutive_units() {
    let (right_wins, _) = run("@a|.?||;");
    assert_eq!(right_wins, "\n");

    let (left_wins, _) = run(";||.?|@a");
    assert_eq!(left_wins, "\n");
}

#[test]
fn comparator_reads_referenced_variables() {
    let (right_wins, _) = run_with_input(".\"x_@y.?*x;", "5");
    assert_eq!(right_wins, "\n");

    let (tie_falls_left, _) = run_with_input(".\"x_@y.?*x;", "0");
    assert_eq!(tie_falls_left, "0");
}

#[test]
fn integer_input_walks_variable_to_value() {
    let (output, _) = run_with_input(".\"x.@x", "7");
    assert_eq!(output, "7");

    let (negative, _) = run_with_input(".\"x.@x", "  -3 ");
    assert_eq!(negative, "-3");
}

#[test]
fn exhausted_input_defaults_to_zero() {
    let (output, _) = run_with_input(".\"x.@x", "");
    assert_eq!(output, "0");
}

#[test]
fn parameter_input_without_parameters_defaults_to_zero() {
    let (output, _) = run(".'x.@x");
    assert_eq!(output, "0");
}

#[test]
fn assignment_sums_adjacent_references() {
    let (output, program) = run(".+a.+a.+b.+b.+b*a.=s*b.@s");
    assert_eq!(output, "5");
    assert_eq!(var(&program, "s"), 5);
}

#[test]
fn destructor_removes_variable() {
    let (output, program) = run(".+x.~x.@x");
    assert_eq!(output, "0");
    assert!(program.variables().is_empty());
}

#[test]
fn char_and_newline_output() {
    let (output, _) = run_with_input(".\"x.$x.;", "65");
    assert_eq!(output, "A\n");
}

#[test]
fn function_call_marshals_parameters_and_returns() {
    let dir = tempdir().expect("create temp dir");
    fs::write(dir.path().join("swap.ptes"), ".'p.'q.^q.^p").expect("write callee");

    let (_, program) = run_in_dir(".+a.+b.+b*b*a.&swap*x*y", dir.path());

    // Arguments snapshot nearest-first (a then b); return slots fill in
    // declared order (x then y) from the callee's return tiles.
    assert_eq!(var(&program, "a"), 1);
    assert_eq!(var(&program, "b"), 2);
    assert_eq!(var(&program, "x"), 2);
    assert_eq!(var(&program, "y"), 1);
}

#[test]
fn function_call_falls_back_to_stdlib_directory() {
    let dir = tempdir().expect("create temp dir");
    fs::create_dir(dir.path().join("stdlib")).expect("create stdlib dir");
    fs::write(dir.path().join("stdlib").join("lib.ptes"), ".+z.@z").expect("write callee");

    let (output, _) = run_in_dir(".&lib", dir.path());
    assert_eq!(output, "1");
}

#[test]
fn missing_callee_file_is_fatal() {
    let dir = tempdir().expect("create temp dir");
    let mut program = Program::from_source(".&nosuch")
        .expect("caller should build")
        .with_base(dir.path());
    let mut reader = Cursor::new(&b""[..]);
    let mut output = Vec::new();
    let mut io = Io {
        input: &mut reader,
        output: &mut output,
    };
    let err = program.run(&mut io).expect_err("call should fail");
    match err {
        TessellaError::Diagnostic(diag) => {
            assert_eq!(diag.kind, DiagnosticKind::Load);
            assert!(diag.message.contains("nosuch.ptes"), "{}", diag.message);
        }
        other => panic!("expected diagnostic, found {other}"),
    }
}

#[test]
fn unfilled_return_holders_copy_back_zero() {
    let dir = tempdir().expect("create temp dir");
    fs::write(dir.path().join("noret.ptes"), "").expect("write callee");

    let (output, _) = run_in_dir(".+x.&noret*x.@x", dir.path());
    assert_eq!(output, "0");
}

#[test]
fn queue_membership_is_exclusive() {
    let mut queue = ActivationQueue::new(3);
    queue.push(1);
    queue.push(1);
    queue.push(0);
    assert_eq!(queue.len(), 2);
    assert_eq!(queue.position(1), Some(1));
    assert_eq!(queue.pop(), Some(1));
    assert!(!queue.contains(1));
    // Popped tiles may be queued again.
    queue.push(1);
    assert_eq!(queue.pop(), Some(0));
    assert_eq!(queue.pop(), Some(1));
    assert_eq!(queue.pop(), None);
}

#[test]
fn queue_removal_clears_membership() {
    let mut queue = ActivationQueue::new(4);
    queue.push(2);
    queue.push(3);
    queue.remove(2);
    assert!(!queue.contains(2));
    assert_eq!(queue.len(), 1);
    queue.push(2);
    assert_eq!(queue.pop(), Some(3));
    assert_eq!(queue.pop(), Some(2));
}

#[test]
fn prepper_strips_comments_and_whitespace() {
    assert_eq!(prepper::prepare("+x @x # note\n;", false), "+x@x_;");
}

#[test]
fn prepper_collapses_consecutive_blockers() {
    assert_eq!(prepper::prepare("a\n\n\nb", false), "a_b");
}

#[test]
fn prepper_minifies_names_consistently() {
    assert_eq!(prepper::prepare("+alpha@alpha>beta", true), "+1@1>2");
}

#[test]
fn prepper_never_minifies_call_names() {
    assert_eq!(prepper::prepare("*count&fact*out", true), "*1&fact*2");
}

#[test]
fn prepper_minifies_indirection_sides_independently() {
    assert_eq!(prepper::prepare("+arr:i:", true), "+1:2:");
}
