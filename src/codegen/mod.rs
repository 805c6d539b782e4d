//! Back end: IR lowering, layout, instruction selection, register
//! allocation and assembly emission.

pub mod emit;
pub mod ir;
pub mod layout;
pub mod lower;
pub mod register_alloc;
pub mod tile;
pub mod writer;

use crate::common::config::Config;
use crate::common::consts::TEST_METHOD;
use crate::wash::hierarchy::Hierarchy;
use crate::wash::{Attributes, MethodRef, Program, Ty};

/// Generated assembly: `(file name, contents)` per compilation unit plus
/// `start.s`.
pub type Assembly = Vec<(String, String)>;

/// Run the whole back end. Fails only when the designated start class
/// (the first user unit) lacks a `public static int test()`.
pub fn generate_assembly(
    program: &Program,
    hierarchy: &Hierarchy,
    attrs: &Attributes,
    config: &Config,
) -> Result<Assembly, String> {
    let start_class = program.user_start;
    let test = program.types[start_class]
        .methods
        .iter()
        .position(|m| {
            m.name == TEST_METHOD && m.is_static() && m.params.is_empty() && m.ret == Ty::Int
        })
        .map(|index| MethodRef { owner: start_class, index })
        .ok_or_else(|| {
            format!(
                "start class '{}' does not declare 'public static int test()'",
                program.types[start_class].name
            )
        })?;

    let layout = layout::Layout::build(program, hierarchy, attrs);
    let ir_units = lower::lower_program(program, hierarchy, attrs, &layout);

    let mut files = Vec::with_capacity(ir_units.len() + 1);
    for unit in &ir_units {
        files.push(emit::emit_unit(program, hierarchy, &layout, unit, config));
    }

    let test_label = layout::method_label(program, test);
    files.push((
        "start.s".to_string(),
        emit::emit_start(program, hierarchy, &layout, &ir_units, &test_label),
    ));
    Ok(files)
}
