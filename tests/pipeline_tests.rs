//! End-to-end scenarios over the public driver API, checking the
//! compiler-side classification and exit codes.

use joosc::common::consts::{EXIT_ERROR, EXIT_SUCCESS, EXIT_WARNING};
use joosc::{compile_program, Config};

fn outcome_of(sources: &[(&str, &str)]) -> joosc::CompileOutcome {
    let owned: Vec<(String, String)> = sources
        .iter()
        .map(|(n, s)| (n.to_string(), s.to_string()))
        .collect();
    compile_program(&owned, &Config::default())
}

#[test]
fn scenario_1_minimal_test_method() {
    let outcome = outcome_of(&[(
        "A.java",
        "public class A { public A(){} public static int test(){ return 123; } }",
    )]);
    assert_eq!(outcome.exit_code, EXIT_SUCCESS);
    let assembly = outcome.assembly.expect("assembly");
    let (_, a_s) = assembly.iter().find(|(n, _)| n == "A.s").unwrap();
    assert!(a_s.contains("mov eax, 123"));
}

#[test]
fn scenario_2_final_override_rejected() {
    let outcome = outcome_of(&[
        (
            "A.java",
            "public class A { public A(){} public final int m(){ return 0; } }",
        ),
        (
            "B.java",
            "public class B extends A { public B(){} public int m(){ return 1; } public static int test(){ return 1; } }",
        ),
    ]);
    assert_eq!(outcome.exit_code, EXIT_ERROR);
}

#[test]
fn scenario_3_definite_assignment_rejected() {
    let outcome = outcome_of(&[(
        "A.java",
        "public class A { public A(){} public static int test(){ int x; return x; } }",
    )]);
    assert_eq!(outcome.exit_code, EXIT_ERROR);
}

#[test]
fn scenario_4_unreachable_statement_warns() {
    let outcome = outcome_of(&[(
        "A.java",
        "public class A { public A(){} public static int test(){ if (true) return 1; return 2; } }",
    )]);
    assert_eq!(outcome.exit_code, EXIT_WARNING);
    assert!(outcome.assembly.is_some(), "warnings still produce assembly");
}

#[test]
fn scenario_5_overload_selects_int() {
    let outcome = outcome_of(&[(
        "A.java",
        "public class A {
             public A(){}
             public static int f(int x){ return 10; }
             public static int f(short x){ return 20; }
             public static int test(){ return f(1) + 113; }
         }",
    )]);
    assert_eq!(outcome.exit_code, EXIT_SUCCESS);
    let assembly = outcome.assembly.expect("assembly");
    let (_, a_s) = assembly.iter().find(|(n, _)| n == "A.s").unwrap();
    assert!(a_s.contains("call _A$f__I"), "{a_s}");
}

#[test]
fn scenario_6_cyclic_hierarchy_rejected() {
    let outcome = outcome_of(&[
        ("A.java", "public class A extends B { public A(){} public static int test(){ return 1; } }"),
        ("B.java", "public class B extends A { public B(){} }"),
    ]);
    assert_eq!(outcome.exit_code, EXIT_ERROR);
}

#[test]
fn parse_errors_exit_42() {
    let outcome = outcome_of(&[("A.java", "public class A { public A( }")]);
    assert_eq!(outcome.exit_code, EXIT_ERROR);
}

#[test]
fn missing_test_method_is_an_error() {
    let outcome = outcome_of(&[("A.java", "public class A { public A(){} }")]);
    assert_eq!(outcome.exit_code, EXIT_ERROR);
    assert!(outcome
        .diagnostics
        .iter()
        .any(|d| d.to_string().contains("test()")));
}

#[test]
fn every_unit_gets_an_assembly_file() {
    let outcome = outcome_of(&[
        ("A.java", "public class A { public A(){} public static int test(){ return 123; } }"),
        ("B.java", "public class B { public B(){} }"),
    ]);
    let assembly = outcome.assembly.expect("assembly");
    let names: Vec<&str> = assembly.iter().map(|(n, _)| n.as_str()).collect();
    assert!(names.contains(&"A.s"));
    assert!(names.contains(&"B.s"));
    assert!(names.contains(&"start.s"));
    // stdlib units are compiled and emitted too
    assert!(names.contains(&"java.lang.String.s"));
    assert!(names.contains(&"java.lang.Object.s"));
}

#[test]
fn assembly_can_be_written_to_an_output_directory() {
    use std::fs;
    use tempfile::TempDir;

    let outcome = outcome_of(&[(
        "A.java",
        "public class A { public A(){} public static int test(){ return 123; } }",
    )]);
    let assembly = outcome.assembly.expect("assembly");

    let dir = TempDir::new().unwrap();
    for (name, contents) in &assembly {
        fs::write(dir.path().join(name), contents).unwrap();
    }
    assert!(dir.path().join("A.s").exists());
    assert!(dir.path().join("start.s").exists());
    let start = fs::read_to_string(dir.path().join("start.s")).unwrap();
    assert!(start.contains("global _start"));
}

#[test]
fn whole_program_exercise() {
    // Inheritance, dispatch, arrays, strings, loops and statics together.
    let outcome = outcome_of(&[
        (
            "Shape.java",
            "public abstract class Shape {
                 public Shape() {}
                 public abstract int area();
                 public int doubled() { return 2 * area(); }
             }",
        ),
        (
            "Square.java",
            "public class Square extends Shape {
                 public Square(int side) { this.side = side; }
                 public int side;
                 public int area() { return side * side; }
             }",
        ),
        (
            "Main.java",
            "public class Main {
                 public Main() {}
                 public static int sum(Shape[] shapes) {
                     int total = 0;
                     for (int i = 0; i < shapes.length; i = i + 1) {
                         total = total + shapes[i].area();
                     }
                     return total;
                 }
                 public static int test() {
                     Shape[] shapes = new Shape[2];
                     shapes[0] = new Square(3);
                     shapes[1] = new Square(4);
                     String label = \"sum=\" + sum(shapes);
                     if (shapes[0] instanceof Square) {
                         return sum(shapes) + new Square(7).doubled();
                     }
                     return 0;
                 }
             }",
        ),
    ]);
    assert_eq!(outcome.exit_code, EXIT_SUCCESS, "{:?}", outcome.diagnostics);
    let assembly = outcome.assembly.expect("assembly");
    let (_, start) = assembly.iter().find(|(n, _)| n == "start.s").unwrap();
    // Shape[] appears in an instanceof-free position, but Square is cast
    // tested, so the array runtime tables exist in start.s.
    assert!(start.contains("_vtable$arr$"), "{start}");
}
