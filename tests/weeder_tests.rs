use joosc::{compile_source, Config};

fn ok(src: &str) {
    compile_source(src, &Config::default()).expect("expected ok");
}

fn err_contains(src: &str, needle: &str) {
    let e = compile_source(src, &Config::default())
        .expect_err("expected error")
        .to_string();
    assert!(e.contains(needle), "expected '{needle}' in: {e}");
}

#[test]
fn minimal_program_is_accepted() {
    ok("public class Main { public Main() {} public static int test() { return 123; } }");
}

#[test]
fn class_cannot_be_abstract_and_final() {
    err_contains(
        "public abstract final class Main { public Main() {} }",
        "abstract and final",
    );
}

#[test]
fn method_needs_access_modifier() {
    err_contains(
        "public class Main { public Main() {} static int test() { return 1; } }",
        "public or protected",
    );
}

#[test]
fn abstract_method_requires_abstract_class() {
    err_contains(
        "public class Main { public Main() {} public abstract int f(); }",
        "abstract method",
    );
}

#[test]
fn static_method_cannot_be_final() {
    err_contains(
        "public class Main { public Main() {} public static final int f() { return 0; } }",
        "cannot be final",
    );
}

#[test]
fn native_must_be_static_int_int() {
    err_contains(
        "public class Main { public Main() {} public native int f(int x); }",
        "must be static",
    );
    err_contains(
        "public class Main { public Main() {} public static native boolean f(int x); }",
        "signature",
    );
}

#[test]
fn interface_methods_have_no_bodies() {
    err_contains(
        "public interface Main { int f() { return 1; } }",
        "must not have a body",
    );
}

#[test]
fn integer_literal_bounds() {
    // 2^31 is only valid directly under unary minus.
    err_contains(
        "public class Main { public Main() {} public static int test() { return 2147483648; } }",
        "out of range",
    );
    ok("public class Main { public Main() {} public static int test() { return -2147483648; } }");
    err_contains(
        "public class Main { public Main() {} public static int test() { return -2147483649; } }",
        "out of range",
    );
}

#[test]
fn int_max_is_fine_without_minus() {
    ok("public class Main { public Main() {} public static int test() { int x = 2147483647; return 123; } }");
}

#[test]
fn non_joos_statements_are_rejected() {
    err_contains(
        "public class Main { public Main() { while (true) { break; } } }",
        "break",
    );
    err_contains(
        "public class Main { public Main() { try { } catch (Exception e) { } } }",
        "try",
    );
    err_contains(
        "public class Main { public Main() { switch (1) { } } }",
        "switch",
    );
    err_contains("public class Main { public Main() { int[][] m = null; } }", "multidimensional");
}

#[test]
fn void_return_arity_is_checked() {
    err_contains(
        "public class Main { public Main() {} public void f() { return 1; } }",
        "cannot return a value",
    );
    err_contains(
        "public class Main { public Main() {} public int f() { return; } }",
        "must return a value",
    );
}

#[test]
fn public_class_name_must_match_file() {
    let e = joosc::compile_sources(
        &[("Other.java", "public class Main { public Main() {} public static int test() { return 1; } }")],
        &Config::default(),
    )
    .expect_err("expected error")
    .to_string();
    assert!(e.contains("file named"), "{e}");
}

#[test]
fn duplicate_formal_parameters_rejected() {
    err_contains(
        "public class Main { public Main() {} public int f(int a, int a) { return a; } }",
        "duplicate formal parameter",
    );
}
