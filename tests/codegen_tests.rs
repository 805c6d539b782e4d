use joosc::{compile_source, compile_sources, Assembly, Config, OptLevel};

fn compile(sources: &[(&str, &str)]) -> Assembly {
    compile_sources(sources, &Config::default()).expect("expected ok")
}

fn file<'a>(assembly: &'a Assembly, name: &str) -> &'a str {
    &assembly
        .iter()
        .find(|(n, _)| n == name)
        .unwrap_or_else(|| panic!("missing {name}"))
        .1
}

/// The `dd` entries following a data label, in order.
fn data_words(asm: &str, label: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut in_block = false;
    for line in asm.lines() {
        let line = line.trim();
        if line == format!("{label}:") {
            in_block = true;
            continue;
        }
        if in_block {
            if let Some(value) = line.strip_prefix("dd ") {
                words.push(value.to_string());
            } else if !line.is_empty() {
                break;
            }
        }
    }
    assert!(in_block, "label {label} not found");
    words
}

#[test]
fn constant_folding_reaches_the_emitted_code() {
    let assembly = compile(&[(
        "Main.java",
        "public class Main { public Main() {} public static int test() { return 40 + 2 + 81; } }",
    )]);
    assert!(file(&assembly, "Main.s").contains("mov eax, 123"));
}

#[test]
fn static_final_constants_fold_through_reads() {
    let assembly = compile(&[(
        "Main.java",
        "public class Main {
             public Main() {}
             public static final int BASE = 100;
             public static final int OFFSET = BASE + 23;
             public static int test() { return Main.OFFSET; }
         }",
    )]);
    assert!(file(&assembly, "Main.s").contains("mov eax, 123"));
}

#[test]
fn override_lands_at_the_inherited_vtable_slot() {
    let assembly = compile(&[
        (
            "A.java",
            "public class A { public A() {} public int m() { return 1; } }",
        ),
        (
            "B.java",
            "public class B extends A { public B() {} public int m() { return 2; } }",
        ),
        (
            "Main.java",
            "public class Main { public Main() {} public static int test() { return 123; } }",
        ),
    ]);

    let a_table = data_words(file(&assembly, "A.s"), "_vtable$A");
    let b_table = data_words(file(&assembly, "B.s"), "_vtable$B");
    assert_eq!(a_table.len(), b_table.len(), "global slot layout must agree");

    let a_slot = a_table.iter().position(|w| w == "_A$m__").expect("A.m in A's vtable");
    let b_slot = b_table.iter().position(|w| w == "_B$m__").expect("B.m in B's vtable");
    assert_eq!(a_slot, b_slot, "override must occupy the inherited slot");
}

#[test]
fn subtype_columns_encode_the_static_relation() {
    let stdlib_count = joosc::stdlib::SOURCES.len();
    let assembly = compile(&[
        ("A.java", "public class A { public A() {} }"),
        ("B.java", "public class B extends A { public B() {} }"),
        (
            "Main.java",
            "public class Main { public Main() {} public static int test() { return 123; } }",
        ),
    ]);

    // User units are appended after the stdlib, so A and B get the next
    // two type ids, which are also their column indices.
    let a_col = stdlib_count;
    let b_col = stdlib_count + 1;
    let object_col = 0; // java.lang.Object is the first stdlib unit

    let b_column = data_words(file(&assembly, "B.s"), "_subtype$B");
    assert_eq!(b_column[b_col], "1", "B is a B");
    assert_eq!(b_column[a_col], "1", "B is an A");
    assert_eq!(b_column[object_col], "1", "B is an Object");

    let a_column = data_words(file(&assembly, "A.s"), "_subtype$A");
    assert_eq!(a_column[a_col], "1", "A is an A");
    assert_eq!(a_column[b_col], "0", "A is not a B");
}

#[test]
fn instance_calls_dispatch_through_the_vtable() {
    let assembly = compile(&[(
        "Main.java",
        "public class Main {
             public Main() {}
             public int m() { return 7; }
             public static int test() { Main x = new Main(); return x.m(); }
         }",
    )]);
    let main_s = file(&assembly, "Main.s");
    assert!(main_s.contains("mov eax, [eax]"), "{main_s}");
    assert!(main_s.contains("call [eax + "), "{main_s}");
}

#[test]
fn static_calls_are_direct() {
    let assembly = compile(&[(
        "Main.java",
        "public class Main {
             public Main() {}
             public static int helper(int a, int b) { return a + b; }
             public static int test() { return helper(100, 23); }
         }",
    )]);
    let main_s = file(&assembly, "Main.s");
    assert!(main_s.contains("call _Main$helper__I_I"), "{main_s}");
    // cdecl: two arguments, caller cleans 8 bytes.
    assert!(main_s.contains("add esp, 8"), "{main_s}");
}

#[test]
fn division_guards_against_zero() {
    let assembly = compile(&[(
        "Main.java",
        "public class Main {
             public Main() {}
             public static int test() { int a = 246; int b = 2; return a / b; }
         }",
    )]);
    let main_s = file(&assembly, "Main.s");
    assert!(main_s.contains("idiv"), "{main_s}");
    assert!(main_s.contains("call __exception"), "{main_s}");
}

#[test]
fn string_literals_become_static_objects() {
    let assembly = compile(&[(
        "Main.java",
        "public class Main {
             public Main() {}
             public static String greet() { return \"hi\"; }
             public static int test() { return 123; }
         }",
    )]);
    let main_s = file(&assembly, "Main.s");
    // Main is the first unit after the embedded stdlib.
    let unit = joosc::stdlib::SOURCES.len();
    let object = data_words(main_s, &format!("_string${unit}_0"));
    assert_eq!(object[0], "_vtable$java$lang$String");
    assert_eq!(object[1], format!("_chars${unit}_0"));
    let chars = data_words(main_s, &format!("_chars${unit}_0"));
    assert_eq!(chars[0], "_vtable$arr$C");
    assert_eq!(chars[1], "2"); // length
    assert_eq!(chars[2], "104"); // 'h'
    assert_eq!(chars[3], "105"); // 'i'
}

#[test]
fn start_file_runs_initializers_then_test() {
    let assembly = compile(&[(
        "Main.java",
        "public class Main {
             public Main() {}
             public static int counter = 3;
             public static int test() { return 123; }
         }",
    )]);
    let start = file(&assembly, "start.s");
    let init_pos = start.find("call _Main$static_init").expect("init call");
    let test_pos = start.find("call _Main$test__").expect("test call");
    let exit_pos = start.find("call __debexit").expect("debexit call");
    assert!(init_pos < test_pos && test_pos < exit_pos, "{start}");
    assert!(start.contains("push eax"), "{start}");
}

#[test]
fn static_fields_are_zeroed_words_in_data() {
    let assembly = compile(&[(
        "Main.java",
        "public class Main {
             public Main() {}
             public static int counter = 3;
             public static int test() { return 123; }
         }",
    )]);
    let main_s = file(&assembly, "Main.s");
    let words = data_words(main_s, "_field$Main$counter");
    assert_eq!(words, vec!["0"]);
}

#[test]
fn register_allocation_uses_the_pool() {
    let source = "public class Main {
         public Main() {}
         public static int test() {
             int a = 100;
             int b = 20;
             int c = 3;
             int r = 0;
             for (int i = 0; i < 1; i = i + 1) {
                 r = a + b + c;
             }
             return r;
         }
     }";

    let trivial = compile_source(source, &Config::default()).expect("trivial");
    let opt = compile_source(
        source,
        &Config { opt: OptLevel::RegAlloc, ..Config::default() },
    )
    .expect("regalloc");

    let trivial_main = file(&trivial, "Main.s");
    let opt_main = file(&opt, "Main.s");

    // The trivial allocator never places temps in the pool registers.
    assert!(!trivial_main.contains("mov ebx, "), "{trivial_main}");
    // Linear scan does.
    let uses_pool = ["mov ebx, ", "mov esi, ", "mov edi, "]
        .iter()
        .any(|p| opt_main.contains(p));
    assert!(uses_pool, "{opt_main}");
}

#[test]
fn interfaces_emit_no_code() {
    let assembly = compile(&[
        ("I.java", "public interface I { int f(); }"),
        (
            "Main.java",
            "public class Main implements I {
                 public Main() {}
                 public int f() { return 1; }
                 public static int test() { return 123; }
             }",
        ),
    ]);
    let iface = file(&assembly, "I.s");
    assert!(!iface.contains("section .text"), "{iface}");
}
