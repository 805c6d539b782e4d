use joosc::common::consts::{EXIT_SUCCESS, EXIT_WARNING};
use joosc::{compile_program, compile_source, Config};

fn ok(src: &str) {
    compile_source(src, &Config::default()).expect("expected ok");
}

fn err_contains(src: &str, needle: &str) {
    let e = compile_source(src, &Config::default())
        .expect_err("expected error")
        .to_string();
    assert!(e.contains(needle), "expected '{needle}' in: {e}");
}

fn exit_code(src: &str) -> i32 {
    compile_program(&[("Main.java".to_string(), src.to_string())], &Config::default()).exit_code
}

#[test]
fn missing_return_is_an_error() {
    err_contains(
        "public class Main {
             public Main() {}
             public static int test() { int x = 1; }
         }",
        "complete without returning",
    );
    err_contains(
        "public class Main {
             public Main() {}
             public static int f(boolean b) { if (b) { return 1; } }
             public static int test() { return 1; }
         }",
        "complete without returning",
    );
}

#[test]
fn if_else_with_returns_in_both_branches_completes_abruptly() {
    ok("public class Main {
            public Main() {}
            public static int f(boolean b) { if (b) { return 1; } else { return 2; } }
            public static int test() { return 123; }
        }");
}

#[test]
fn while_true_never_completes() {
    ok("public class Main {
            public Main() {}
            public static int f() { while (true) { } }
            public static int test() { return 123; }
        }");
}

#[test]
fn for_ever_never_completes() {
    ok("public class Main {
            public Main() {}
            public static int f() { for (;;) { } }
            public static int test() { return 123; }
        }");
}

#[test]
fn unreachable_after_return_is_a_warning() {
    // The coursework policy: unreachable code warns (exit 43), the program
    // still compiles.
    let code = exit_code(
        "public class Main {
             public Main() {}
             public static int test() { if (true) { return 1; } return 2; }
         }",
    );
    assert_eq!(code, EXIT_WARNING);
}

#[test]
fn while_false_body_is_unreachable() {
    let code = exit_code(
        "public class Main {
             public Main() {}
             public static int test() { while (false) { int x = 1; } return 123; }
         }",
    );
    assert_eq!(code, EXIT_WARNING);
}

#[test]
fn clean_program_exits_zero() {
    let code = exit_code(
        "public class Main {
             public Main() {}
             public static int test() { int x = 1; return x + 122; }
         }",
    );
    assert_eq!(code, EXIT_SUCCESS);
}

#[test]
fn read_of_unassigned_local_is_an_error() {
    err_contains(
        "public class Main {
             public Main() {}
             public static int test() { int x; return x; }
         }",
        "may not have been initialized",
    );
}

#[test]
fn assignment_on_both_branches_satisfies_da() {
    ok("public class Main {
            public Main() {}
            public static int f(boolean b) { int x; if (b) { x = 1; } else { x = 2; } return x; }
            public static int test() { return 123; }
        }");
}

#[test]
fn assignment_on_one_branch_is_not_enough() {
    err_contains(
        "public class Main {
             public Main() {}
             public static int f(boolean b) { int x; if (b) { x = 1; } return x; }
             public static int test() { return 1; }
         }",
        "may not have been initialized",
    );
}

#[test]
fn early_return_branch_does_not_constrain_the_join() {
    ok("public class Main {
            public Main() {}
            public static int f(boolean b) { int x; if (b) { return 0; } else { x = 2; } return x; }
            public static int test() { return 123; }
        }");
}

#[test]
fn loop_body_assignment_is_not_assumed_on_exit() {
    err_contains(
        "public class Main {
             public Main() {}
             public static int f(boolean b) { int x; while (b) { x = 1; } return x; }
             public static int test() { return 1; }
         }",
        "may not have been initialized",
    );
}

#[test]
fn initializer_may_not_read_its_own_variable() {
    err_contains(
        "public class Main {
             public Main() {}
             public static int test() { int x = x + 1; return x; }
         }",
        "may not have been initialized",
    );
}

#[test]
fn parameters_are_always_assigned() {
    ok("public class Main {
            public Main() {}
            public static int f(int p) { return p; }
            public static int test() { return 123; }
        }");
}
