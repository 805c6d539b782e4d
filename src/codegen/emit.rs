//! Emission: one NASM file per compilation unit, plus `start.s` with the
//! program entry point and the array runtime tables.

use crate::codegen::ir::IrUnit;
use crate::codegen::layout::{self, Layout, TestTarget};
use crate::codegen::register_alloc::{self, Allocation};
use crate::codegen::tile::tile_function;
use crate::codegen::writer::AsmWriter;
use crate::common::config::{Config, OptLevel};
use crate::common::consts::RT_DEBEXIT;
use crate::wash::hierarchy::Hierarchy;
use crate::wash::Program;

fn allocate(config: &Config, f: &crate::codegen::ir::IrFunction) -> Allocation {
    match config.opt {
        OptLevel::None => register_alloc::trivial(f),
        OptLevel::RegAlloc => register_alloc::linear_scan(f),
    }
}

pub fn emit_unit(
    program: &Program,
    hierarchy: &Hierarchy,
    layout: &Layout,
    ir: &IrUnit,
    config: &Config,
) -> (String, String) {
    let file_name = format!("{}.s", ir.class_name);
    let mut out = AsmWriter::new();
    out.comment(&format!("unit: {}", ir.class_name));

    if !ir.is_class {
        // Interfaces carry no code or data; their subtype-test columns
        // live in the concrete classes that implement them.
        return (file_name, out.finish());
    }

    out.section(".text");
    for f in &ir.functions {
        let alloc = allocate(config, f);
        tile_function(f, &alloc, &mut out);
        out.blank();
    }

    out.section(".data");
    for label in &ir.static_fields {
        out.label(label);
        out.dd("0");
    }

    // vtable: word 0 points at the subtype column, then one word per
    // global slot.
    let unit = ir.unit;
    out.label(&layout::vtable_label(program, unit));
    let subtype = layout::subtype_label(program, unit);
    out.reference(&subtype);
    out.dd(subtype.clone());
    for sig in &layout.slot_sigs {
        let entry = hierarchy.contains[unit].get(sig).and_then(|m| {
            let info = &program.types[m.owner].methods[m.index];
            (info.has_body && !info.is_static())
                .then(|| layout::method_label(program, *m))
        });
        match entry {
            Some(label) => {
                out.reference(&label);
                out.dd(label);
            }
            None => out.dd("0"),
        }
    }

    // Subtype column: one word per test target.
    out.label(&layout::subtype_label(program, unit));
    let runtime = TestTarget::Class(unit);
    for target in &layout.test_targets {
        let bit = layout.is_instance(program, hierarchy, &runtime, target);
        out.dd(if bit { "1" } else { "0" });
    }

    // String literals: a String object (vtable + backing array reference)
    // and its char array.
    if !ir.strings.is_empty() {
        let string_vtable = layout::vtable_label(program, program.well_known.string);
        let char_array_vtable =
            layout::array_vtable_label(program, &layout::ElemKey::Char);
        for lit in &ir.strings {
            out.label(&lit.object_label);
            out.reference(&string_vtable);
            out.dd(string_vtable.clone());
            out.dd(lit.chars_label.clone());

            out.label(&lit.chars_label);
            out.reference(&char_array_vtable);
            out.dd(char_array_vtable.clone());
            out.dd(lit.value.chars().count().to_string());
            for ch in lit.value.chars() {
                out.dd((ch as u32).to_string());
            }
        }
    }

    (file_name, out.finish())
}

/// The extra file: `_start` runs every static initializer in unit order,
/// invokes `test()` of the start class, and exits through `__debexit`.
/// The array vtables and subtype columns are program-wide and live here.
pub fn emit_start(
    program: &Program,
    hierarchy: &Hierarchy,
    layout: &Layout,
    ir_units: &[IrUnit],
    test_label: &str,
) -> String {
    let mut out = AsmWriter::new();
    out.comment("program entry and array runtime tables");

    out.section(".text");
    out.label("_start");
    for unit in ir_units {
        if let Some(init) = &unit.init_label {
            out.reference(init);
            out.ins(format!("call {init}"));
        }
    }
    out.reference(test_label);
    out.ins(format!("call {test_label}"));
    out.ins("push eax");
    out.reference(RT_DEBEXIT);
    out.ins(format!("call {RT_DEBEXIT}"));

    out.section(".data");
    let object = program.well_known.object;
    for elem in &layout.array_elems {
        // Arrays dispatch Object's methods through their own vtable.
        out.label(&layout::array_vtable_label(program, elem));
        let subtype = layout::array_subtype_label(program, elem);
        out.dd(subtype.clone());
        for sig in &layout.slot_sigs {
            let entry = hierarchy.contains[object].get(sig).and_then(|m| {
                let info = &program.types[m.owner].methods[m.index];
                (info.has_body && !info.is_static())
                    .then(|| layout::method_label(program, *m))
            });
            match entry {
                Some(label) => {
                    out.reference(&label);
                    out.dd(label);
                }
                None => out.dd("0"),
            }
        }

        out.label(&layout::array_subtype_label(program, elem));
        let runtime = TestTarget::Array(elem.clone());
        for target in &layout.test_targets {
            let bit = layout.is_instance(program, hierarchy, &runtime, target);
            out.dd(if bit { "1" } else { "0" });
        }
    }

    out.finish()
}
