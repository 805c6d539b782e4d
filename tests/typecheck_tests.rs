use joosc::{compile_source, compile_sources, Config};

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
fn numeric_binary_promotes_to_int() {
    ok("public class Main {
            public Main() {}
            public static int test() { byte b = 1; short s = 2; char c = 'x'; int r = b + s + c; return 123; }
        }");
    err_contains(
        "public class Main { public Main() {} public static int test() { byte b = 1; byte c = b + b; return 1; } }",
        "cannot convert",
    );
}

#[test]
fn widening_assignments_only() {
    ok("public class Main { public Main() {} public static int test() { byte b = 1; int i = b; return 123; } }");
    err_contains(
        "public class Main { public Main() {} public static int test() { int i = 1; byte b = i; return 1; } }",
        "cannot convert",
    );
    // char and short are unrelated in both directions
    err_contains(
        "public class Main { public Main() {} public static int test() { char c = 'a'; short s = c; return 1; } }",
        "cannot convert",
    );
}

#[test]
fn conditions_must_be_boolean() {
    err_contains(
        "public class Main { public Main() {} public static int test() { if (1) { return 1; } return 2; } }",
        "condition must be boolean",
    );
}

#[test]
fn logical_operators_require_booleans() {
    err_contains(
        "public class Main { public Main() {} public static int test() { boolean b = true && 1; return 1; } }",
        "operator",
    );
}

#[test]
fn equality_needs_comparable_operands() {
    err_contains(
        "public class Main { public Main() {} public static int test() { boolean b = 1 == true; return 1; } }",
        "operator",
    );
    ok("public class Main { public Main() {} public static int test() { boolean b = \"a\" == null; return 123; } }");
}

#[test]
fn string_concatenation_types() {
    ok("public class Main {
            public Main() {}
            public static int test() { String s = \"n=\" + 42 + ';' + true + null; return 123; }
        }");
    err_contains(
        "public class Main { public Main() {} public static int test() { int i = \"a\" + 1; return 1; } }",
        "cannot convert",
    );
}

#[test]
fn instanceof_requires_reference_operands() {
    err_contains(
        "public class Main { public Main() {} public static int test() { boolean b = 1 instanceof Object; return 1; } }",
        "instanceof",
    );
    ok("public class Main { public Main() {} public static int test() { boolean b = null instanceof Object; return 123; } }");
}

#[test]
fn casts_follow_the_numeric_and_reference_rules() {
    ok("public class Main {
            public Main() {}
            public static int test() { int i = (int) 'a'; char c = (char) 97; byte b = (byte) 300; return 123; }
        }");
    err_contains(
        "public class Main { public Main() {} public static int test() { boolean b = (boolean) 1; return 1; } }",
        "cannot cast",
    );
}

#[test]
fn unrelated_reference_cast_is_rejected() {
    let e = compile_sources(
        &[
            ("A.java", "public class A { public A() {} }"),
            ("B.java", "public class B { public B() {} }"),
            (
                "Main.java",
                "public class Main { public Main() {} public static int test() { A a = new A(); B b = (B) a; return 1; } }",
            ),
        ],
        &Config::default(),
    )
    .expect_err("expected error")
    .to_string();
    assert!(e.contains("cannot cast"), "{e}");
}

#[test]
fn array_covariance_is_reference_only() {
    ok("public class Main {
            public Main() {}
            public static int test() { Object[] os = new String[2]; return 123; }
        }");
    err_contains(
        "public class Main { public Main() {} public static int test() { int[] is = new short[2]; return 1; } }",
        "cannot convert",
    );
}

#[test]
fn arrays_are_objects_cloneables_and_serializable() {
    ok("public class Main {
            public Main() {}
            public static int test() {
                int[] xs = new int[1];
                Object o = xs;
                Cloneable c = xs;
                java.io.Serializable s = xs;
                return 123;
            }
        }");
}

#[test]
fn array_index_and_size_must_be_numeric() {
    err_contains(
        "public class Main { public Main() {} public static int test() { int[] xs = new int[true]; return 1; } }",
        "array size",
    );
    err_contains(
        "public class Main { public Main() {} public static int test() { int[] xs = new int[1]; return xs[false]; } }",
        "array index",
    );
}

#[test]
fn array_length_is_a_readonly_int() {
    ok("public class Main { public Main() {} public static int test() { int[] xs = new int[2]; return 121 + xs.length; } }");
    err_contains(
        "public class Main { public Main() {} public static int test() { int[] xs = new int[2]; xs.length = 3; return 1; } }",
        "length",
    );
}

#[test]
fn cannot_instantiate_abstract_class_or_interface() {
    err_contains(
        "public abstract class Main { public Main() {} public static int test() { Main m = new Main(); return 1; } }",
        "abstract",
    );
}

#[test]
fn overload_picks_most_specific() {
    // byte argument: both f(short) and f(int) applicable, f(short) wins.
    let assembly = compile_sources(
        &[(
            "Main.java",
            "public class Main {
                 public Main() {}
                 public static int f(short s) { return 1; }
                 public static int f(int i) { return 2; }
                 public static int test() { byte b = 3; return f(b); }
             }",
        )],
        &Config::default(),
    )
    .expect("expected ok");
    let (_, main_s) = assembly.iter().find(|(n, _)| n == "Main.s").unwrap();
    assert!(main_s.contains("call _Main$f__S"), "{main_s}");
}

#[test]
fn overload_int_argument_selects_int() {
    // f(int) vs f(short) called with an int literal: only f(int) applies.
    let assembly = compile_sources(
        &[(
            "Main.java",
            "public class Main {
                 public Main() {}
                 public static int f(short s) { return 1; }
                 public static int f(int i) { return 2; }
                 public static int test() { return f(40) + 83; }
             }",
        )],
        &Config::default(),
    )
    .expect("expected ok");
    let (_, main_s) = assembly.iter().find(|(n, _)| n == "Main.s").unwrap();
    assert!(main_s.contains("call _Main$f__I"), "{main_s}");
    assert!(!main_s.contains("call _Main$f__S"), "{main_s}");
}

#[test]
fn ambiguous_overload_is_an_error() {
    err_contains(
        "public class Main {
             public Main() {}
             public static int f(int a, short b) { return 1; }
             public static int f(short a, int b) { return 2; }
             public static int test() { byte x = 1; byte y = 2; return f(x, y); }
         }",
        "ambiguous",
    );
}

#[test]
fn no_applicable_method_is_an_error() {
    err_contains(
        "public class Main {
             public Main() {}
             public static int f(int a) { return 1; }
             public static int test() { return f(true); }
         }",
        "no applicable method",
    );
}

#[test]
fn static_and_instance_calls_do_not_mix() {
    err_contains(
        "public class Main {
             public Main() {}
             public int g() { return 1; }
             public static int test() { return g(); }
         }",
        "static context",
    );
    err_contains(
        "public class Main {
             public Main() {}
             public static int h() { return 1; }
             public static int test() { Main m = new Main(); return m.h(); }
         }",
        "through an instance",
    );
}

#[test]
fn protected_member_unrelated_subclass_supertype_receiver() {
    // B may touch A's protected field on a B receiver, but not through a
    // plain A receiver.
    let e = compile_sources(
        &[
            ("pa/A.java", "package pa; public class A { public A() {} protected int f; }"),
            (
                "pb/B.java",
                "package pb;
                 public class B extends pa.A {
                     public B() {}
                     public int get(pa.A a) { return a.f; }
                     public static int test() { return 1; }
                 }",
            ),
        ],
        &Config::default(),
    )
    .expect_err("expected error")
    .to_string();
    assert!(e.contains("protected"), "{e}");

    compile_sources(
        &[
            ("pa/A.java", "package pa; public class A { public A() {} protected int f; }"),
            (
                "pb/B.java",
                "package pb;
                 public class B extends pa.A {
                     public B() {}
                     public int get(B b) { return b.f; }
                     public static int test() { return 123; }
                 }",
            ),
        ],
        &Config::default(),
    )
    .expect("receiver of own type should be allowed");
}

#[test]
fn final_fields_cannot_be_reassigned() {
    err_contains(
        "public class Main {
             public Main() {}
             public static final int LIMIT = 10;
             public static int test() { Main.LIMIT = 11; return 1; }
         }",
        "final field",
    );
}

#[test]
fn void_methods_have_no_value() {
    err_contains(
        "public class Main {
             public Main() {}
             public void v() { }
             public static int test() { Main m = new Main(); int x = m.v(); return x; }
         }",
        "void",
    );
}

#[test]
fn expression_statements_are_restricted() {
    err_contains(
        "public class Main { public Main() {} public static int test() { 1 + 2; return 1; } }",
        "not a statement",
    );
}

#[test]
fn qualified_static_field_chains_resolve() {
    ok("public class Main {
            public Main() {}
            public static int test() { java.lang.System.out.println(123); return 123; }
        }");
}
