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

const MAIN: (&str, &str) = (
    "Main.java",
    "public class Main { public Main() {} public static int test() { return 123; } }",
);

#[test]
fn single_type_import_resolves() {
    ok(&[
        (
            "Main.java",
            "import java.io.OutputStream;
             public class Main {
                 public Main() {}
                 public static int test() { OutputStream o = new OutputStream(); return 123; }
             }",
        ),
    ]);
}

#[test]
fn unknown_import_is_an_error() {
    err_contains(
        &[(
            "Main.java",
            "import java.util.Vector;
             public class Main { public Main() {} public static int test() { return 1; } }",
        )],
        "does not resolve",
    );
}

#[test]
fn unknown_on_demand_package_is_an_error() {
    err_contains(
        &[(
            "Main.java",
            "import java.util.*;
             public class Main { public Main() {} public static int test() { return 1; } }",
        )],
        "does not exist",
    );
}

#[test]
fn java_lang_is_implicitly_imported() {
    ok(&[(
        "Main.java",
        "public class Main {
             public Main() {}
             public static int test() { Object o = new Object(); String s = \"x\"; return 123; }
         }",
    )]);
}

#[test]
fn clashing_single_imports_are_an_error() {
    err_contains(
        &[
            ("pa/C.java", "package pa; public class C { public C() {} }"),
            ("pb/C.java", "package pb; public class C { public C() {} }"),
            (
                "Main.java",
                "import pa.C; import pb.C;
                 public class Main { public Main() {} public static int test() { return 1; } }",
            ),
        ],
        "clashes",
    );
}

#[test]
fn ambiguous_on_demand_import_is_an_error() {
    err_contains(
        &[
            ("pa/C.java", "package pa; public class C { public C() {} }"),
            ("pb/C.java", "package pb; public class C { public C() {} }"),
            (
                "Main.java",
                "import pa.*; import pb.*;
                 public class Main { public Main() {} public static int test() { C c = null; return 1; } }",
            ),
        ],
        "ambiguous",
    );
}

#[test]
fn single_import_beats_on_demand() {
    ok(&[
        ("pa/C.java", "package pa; public class C { public C() {} }"),
        ("pb/C.java", "package pb; public class C { public C() {} }"),
        (
            "Main.java",
            "import pa.C; import pb.*;
             public class Main { public Main() {} public static int test() { C c = new C(); return 123; } }",
        ),
    ]);
}

#[test]
fn duplicate_canonical_names_are_fatal() {
    err_contains(
        &[
            MAIN,
            ("p/A.java", "package p; public class A { public A() {} }"),
            ("p2/A.java", "package p; public class A { public A() {} }"),
        ],
        "duplicate declaration",
    );
}

#[test]
fn same_package_types_are_visible_without_import() {
    ok(&[
        (
            "p/Main.java",
            "package p;
             public class Main { public Main() {} public static int test() { Helper h = new Helper(); return 123; } }",
        ),
        ("p/Helper.java", "package p; public class Helper { public Helper() {} }"),
    ]);
}

#[test]
fn unresolved_type_reference_is_an_error() {
    err_contains(
        &[(
            "Main.java",
            "public class Main { public Main() {} public static int test() { Missing m = null; return 1; } }",
        )],
        "cannot resolve",
    );
}
