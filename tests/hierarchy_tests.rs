use joosc::{compile_sources, Config};

fn ok(sources: &[(&str, &str)]) {
    compile_sources(sources, &Config::default()).expect("expected ok");
}

fn err_contains(sources: &[(&str, &str)], needle: &str) {
    let e = compile_sources(sources, &Config::default())
        .expect_err("expected error")
        .to_string();
    assert!(e.contains(needle), "expected '{needle}' in: {e}");
}

#[test]
fn cyclic_hierarchy_is_rejected() {
    err_contains(
        &[
            ("A.java", "public class A extends B { public A() {} public static int test() { return 1; } }"),
            ("B.java", "public class B extends A { public B() {} }"),
        ],
        "cyclic",
    );
}

#[test]
fn self_extension_is_a_cycle() {
    err_contains(
        &[("A.java", "public class A extends A { public A() {} public static int test() { return 1; } }")],
        "cyclic",
    );
}

#[test]
fn cannot_extend_final_class() {
    err_contains(
        &[
            ("A.java", "public final class A { public A() {} }"),
            ("B.java", "public class B extends A { public B() {} public static int test() { return 1; } }"),
        ],
        "final class",
    );
}

#[test]
fn class_cannot_extend_interface() {
    err_contains(
        &[
            ("I.java", "public interface I { }"),
            ("B.java", "public class B extends I { public B() {} public static int test() { return 1; } }"),
        ],
        "cannot extend interface",
    );
}

#[test]
fn interface_cannot_extend_class() {
    err_contains(
        &[
            ("A.java", "public class A { public A() {} }"),
            ("I.java", "public interface I extends A { }"),
            ("Main.java", "public class Main { public Main() {} public static int test() { return 1; } }"),
        ],
        "cannot extend class",
    );
}

#[test]
fn final_method_cannot_be_overridden() {
    err_contains(
        &[
            ("A.java", "public class A { public A() {} public final int f() { return 0; } }"),
            (
                "B.java",
                "public class B extends A { public B() {} public int f() { return 1; } public static int test() { return 1; } }",
            ),
        ],
        "final method",
    );
}

#[test]
fn override_must_keep_return_type() {
    err_contains(
        &[
            ("A.java", "public class A { public A() {} public int f() { return 0; } }"),
            (
                "B.java",
                "public class B extends A { public B() {} public boolean f() { return true; } public static int test() { return 1; } }",
            ),
        ],
        "return type",
    );
}

#[test]
fn override_cannot_reduce_visibility() {
    err_contains(
        &[
            ("A.java", "public class A { public A() {} public int f() { return 0; } }"),
            (
                "B.java",
                "public class B extends A { public B() {} protected int f() { return 1; } public static int test() { return 1; } }",
            ),
        ],
        "protected",
    );
}

#[test]
fn override_cannot_change_staticness() {
    err_contains(
        &[
            ("A.java", "public class A { public A() {} public int f() { return 0; } }"),
            (
                "B.java",
                "public class B extends A { public B() {} public static int f() { return 1; } public static int test() { return 1; } }",
            ),
        ],
        "staticness",
    );
}

#[test]
fn concrete_class_must_implement_interface() {
    err_contains(
        &[
            ("I.java", "public interface I { int f(); }"),
            (
                "B.java",
                "public class B implements I { public B() {} public static int test() { return 1; } }",
            ),
        ],
        "does not implement",
    );
}

#[test]
fn abstract_class_may_leave_methods_abstract() {
    ok(&[
        ("I.java", "public interface I { int f(); }"),
        ("B.java", "public abstract class B implements I { public B() {} }"),
        (
            "Main.java",
            "public class Main { public Main() {} public static int test() { return 123; } }",
        ),
    ]);
}

#[test]
fn inherited_implementation_satisfies_interface() {
    ok(&[
        ("I.java", "public interface I { int f(); }"),
        ("A.java", "public class A { public A() {} public int f() { return 7; } }"),
        ("B.java", "public class B extends A implements I { public B() {} }"),
        (
            "Main.java",
            "public class Main { public Main() {} public static int test() { return 123; } }",
        ),
    ]);
}

#[test]
fn duplicate_method_signatures_rejected() {
    err_contains(
        &[(
            "A.java",
            "public class A { public A() {} public int f(int x) { return 0; } public int f(int y) { return 1; } public static int test() { return 1; } }",
        )],
        "two methods",
    );
}

#[test]
fn multiply_inherited_return_types_must_agree() {
    err_contains(
        &[
            ("I.java", "public interface I { int f(); }"),
            ("J.java", "public interface J { boolean f(); }"),
            (
                "B.java",
                "public abstract class B implements I, J { public B() {} public static int test() { return 1; } }",
            ),
        ],
        "return type",
    );
}

#[test]
fn superclass_needs_zero_arg_constructor() {
    err_contains(
        &[
            ("A.java", "public class A { public A(int x) {} }"),
            (
                "B.java",
                "public class B extends A { public B() {} public static int test() { return 1; } }",
            ),
        ],
        "zero-argument constructor",
    );
}

#[test]
fn interface_gets_object_methods() {
    // An interface reference can receive Object's public methods.
    ok(&[
        ("I.java", "public interface I { }"),
        (
            "Main.java",
            "public class Main {
                 public Main() {}
                 public static int test(I i) { int h = i.hashCode(); return 123; }
                 public static int test() { return 123; }
             }",
        ),
    ]);
}
