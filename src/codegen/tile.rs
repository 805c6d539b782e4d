//! Instruction selection: maximal-munch tiles from the canonical IR to
//! x86-32 text.
//!
//! Operands are fetched from their allocated locations into the scratch
//! registers `eax`/`ecx`/`edx` and results stored back, so the same tiles
//! serve both the trivial allocator (everything in slots) and linear scan
//! (hot temps in `ebx`/`esi`/`edi`). A comparison feeding a branch fuses
//! into `cmp` + `jcc`; comparisons used as values go through `setcc`.

use std::collections::HashMap;

use crate::codegen::ir::*;
use crate::codegen::register_alloc::{Allocation, Loc};
use crate::codegen::writer::AsmWriter;
use crate::common::consts::WORD;

/// Local label every function returns through.
const RET_LABEL: &str = ".ret";

pub fn tile_function(f: &IrFunction, alloc: &Allocation, out: &mut AsmWriter) {
    let reads = read_counts(f);

    out.label(&f.label);
    out.ins("push ebp");
    out.ins("mov ebp, esp");
    if alloc.frame_size > 0 {
        out.ins(format!("sub esp, {}", alloc.frame_size));
    }
    // ebx/esi/edi are preserved for our caller and double as the linear
    // scan pool.
    out.ins("push ebx");
    out.ins("push esi");
    out.ins("push edi");

    let mut i = 0;
    while i < f.body.len() {
        // cmp + jcc fusion: a comparison whose only consumer is the next
        // conditional jump.
        if let (
            Instr::Bin { dst, op, lhs, rhs },
            Some(Instr::CJump { cond: Value::Temp(cond), if_true, if_false }),
        ) = (&f.body[i], f.body.get(i + 1))
        {
            if op.is_comparison() && cond == dst && reads.get(dst).copied().unwrap_or(0) == 1 {
                load(out, alloc, "eax", lhs);
                let rhs_op = operand(out, alloc, rhs);
                out.ins(format!("cmp eax, {rhs_op}"));
                out.reference(if_true);
                out.reference(if_false);
                out.ins(format!("j{} {}", op.cc(), if_true));
                out.ins(format!("jmp {}", if_false));
                i += 2;
                continue;
            }
        }

        tile_instr(&f.body[i], alloc, out);
        i += 1;
    }

    out.label(RET_LABEL);
    out.ins("pop edi");
    out.ins("pop esi");
    out.ins("pop ebx");
    out.ins("mov esp, ebp");
    out.ins("pop ebp");
    out.ins("ret");
}

fn tile_instr(instr: &Instr, alloc: &Allocation, out: &mut AsmWriter) {
    match instr {
        Instr::Label(l) => out.label(l),
        Instr::Move { dst, src } => {
            let dst_loc = location(alloc, *dst);
            match src {
                Value::Const(v) if !is_reg(&dst_loc) => {
                    out.ins(format!("mov dword {dst_loc}, {v}"))
                }
                Value::Const(v) => out.ins(format!("mov {dst_loc}, {v}")),
                _ => {
                    load(out, alloc, "eax", src);
                    if dst_loc != "eax" {
                        out.ins(format!("mov {dst_loc}, eax"));
                    }
                }
            }
        }
        Instr::Bin { dst, op, lhs, rhs } => {
            tile_bin(*dst, *op, lhs, rhs, alloc, out);
        }
        Instr::Load { dst, base, offset } => {
            load(out, alloc, "eax", base);
            out.ins(format!("mov eax, [eax{}]", offset_str(*offset)));
            store(out, alloc, *dst, "eax");
        }
        Instr::Store { base, offset, src } => {
            load(out, alloc, "eax", base);
            match src {
                Value::Const(v) => {
                    out.ins(format!("mov dword [eax{}], {v}", offset_str(*offset)))
                }
                _ => {
                    load(out, alloc, "ecx", src);
                    out.ins(format!("mov [eax{}], ecx", offset_str(*offset)));
                }
            }
        }
        Instr::Jump(l) => {
            out.reference(l);
            out.ins(format!("jmp {l}"));
        }
        Instr::CJump { cond, if_true, if_false } => {
            out.reference(if_true);
            out.reference(if_false);
            match cond {
                Value::Const(0) => out.ins(format!("jmp {if_false}")),
                Value::Const(_) => out.ins(format!("jmp {if_true}")),
                _ => {
                    load(out, alloc, "eax", cond);
                    out.ins("cmp eax, 0");
                    out.ins(format!("jne {if_true}"));
                    out.ins(format!("jmp {if_false}"));
                }
            }
        }
        Instr::Call { dst, target, args } => {
            // cdecl: arguments pushed right to left, caller cleans up.
            for arg in args.iter().rev() {
                match arg {
                    Value::Const(v) => out.ins(format!("push dword {v}")),
                    Value::Name(n) => {
                        out.reference(n);
                        out.ins(format!("push dword {n}"));
                    }
                    Value::Temp(t) => {
                        let loc = location(alloc, *t);
                        if loc.starts_with('[') {
                            out.ins(format!("push dword {loc}"));
                        } else {
                            out.ins(format!("push {loc}"));
                        }
                    }
                }
            }
            match target {
                CallTarget::Label(l) => {
                    out.reference(l);
                    out.ins(format!("call {l}"));
                }
                CallTarget::Virtual { recv, slot } => {
                    load(out, alloc, "eax", recv);
                    out.ins("mov eax, [eax]");
                    out.ins(format!("call [eax + {}]", WORD * (*slot as i32 + 1)));
                }
            }
            if !args.is_empty() {
                out.ins(format!("add esp, {}", WORD * args.len() as i32));
            }
            if let Some(dst) = dst {
                store(out, alloc, *dst, "eax");
            }
        }
        Instr::Return(value) => {
            if let Some(value) = value {
                load(out, alloc, "eax", value);
            }
            out.ins(format!("jmp {RET_LABEL}"));
        }
        Instr::Ext { dst, src, kind } => {
            load(out, alloc, "eax", src);
            match kind {
                ExtKind::Byte => out.ins("movsx eax, al"),
                ExtKind::Short => out.ins("movsx eax, ax"),
                ExtKind::Char => out.ins("movzx eax, ax"),
            }
            store(out, alloc, *dst, "eax");
        }
    }
}

fn tile_bin(dst: Temp, op: BinOp, lhs: &Value, rhs: &Value, alloc: &Allocation, out: &mut AsmWriter) {
    load(out, alloc, "eax", lhs);
    match op {
        BinOp::Add | BinOp::Sub | BinOp::And | BinOp::Or => {
            let mnemonic = match op {
                BinOp::Add => "add",
                BinOp::Sub => "sub",
                BinOp::And => "and",
                _ => "or",
            };
            let rhs_op = operand(out, alloc, rhs);
            out.ins(format!("{mnemonic} eax, {rhs_op}"));
        }
        BinOp::Mul => {
            let rhs_op = operand(out, alloc, rhs);
            out.ins(format!("imul eax, {rhs_op}"));
        }
        BinOp::Div | BinOp::Rem => {
            // Sign-extend eax into edx:eax; the divisor must avoid both.
            load(out, alloc, "ecx", rhs);
            out.ins("cdq");
            out.ins("idiv ecx");
            if op == BinOp::Rem {
                out.ins("mov eax, edx");
            }
        }
        BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
            let rhs_op = operand(out, alloc, rhs);
            out.ins(format!("cmp eax, {rhs_op}"));
            out.ins(format!("set{} al", op.cc()));
            out.ins("movzx eax, al");
        }
    }
    store(out, alloc, dst, "eax");
}

fn location(alloc: &Allocation, temp: Temp) -> String {
    match alloc.loc(temp) {
        Loc::Reg(r) => r.to_string(),
        Loc::Slot(offset) => format!("[ebp{}]", offset_str(offset)),
    }
}

fn is_reg(loc: &str) -> bool {
    !loc.starts_with('[')
}

fn offset_str(offset: i32) -> String {
    use std::cmp::Ordering;
    match offset.cmp(&0) {
        Ordering::Greater => format!(" + {offset}"),
        Ordering::Less => format!(" - {}", -offset),
        Ordering::Equal => String::new(),
    }
}

/// Bring a value into the given scratch register.
fn load(out: &mut AsmWriter, alloc: &Allocation, reg: &str, value: &Value) {
    match value {
        Value::Const(v) => out.ins(format!("mov {reg}, {v}")),
        Value::Name(n) => {
            out.reference(n);
            out.ins(format!("mov {reg}, {n}"));
        }
        Value::Temp(t) => {
            let loc = location(alloc, *t);
            if loc != reg {
                out.ins(format!("mov {reg}, {loc}"));
            }
        }
    }
}

fn store(out: &mut AsmWriter, alloc: &Allocation, temp: Temp, reg: &str) {
    let loc = location(alloc, temp);
    if loc != reg {
        out.ins(format!("mov {loc}, {reg}"));
    }
}

/// Render a value as a direct instruction operand where the encoding
/// allows it (immediates, registers, memory slots).
fn operand(out: &mut AsmWriter, alloc: &Allocation, value: &Value) -> String {
    match value {
        Value::Const(v) => v.to_string(),
        Value::Name(n) => {
            out.reference(n);
            n.clone()
        }
        Value::Temp(t) => location(alloc, *t),
    }
}

/// How many times each temp is read (not defined); drives cmp/jcc fusion.
fn read_counts(f: &IrFunction) -> HashMap<Temp, usize> {
    let mut counts: HashMap<Temp, usize> = HashMap::new();
    let mut read = |v: &Value| {
        if let Value::Temp(t) = v {
            *counts.entry(*t).or_insert(0) += 1;
        }
    };
    for instr in &f.body {
        match instr {
            Instr::Label(_) | Instr::Jump(_) => {}
            Instr::Move { src, .. } => read(src),
            Instr::Bin { lhs, rhs, .. } => {
                read(lhs);
                read(rhs);
            }
            Instr::Load { base, .. } => read(base),
            Instr::Store { base, src, .. } => {
                read(base);
                read(src);
            }
            Instr::CJump { cond, .. } => read(cond),
            Instr::Call { target, args, .. } => {
                if let CallTarget::Virtual { recv, .. } = target {
                    read(recv);
                }
                for arg in args {
                    read(arg);
                }
            }
            Instr::Return(value) => {
                if let Some(value) = value {
                    read(value);
                }
            }
            Instr::Ext { src, .. } => read(src),
        }
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::register_alloc::trivial;

    fn tile(body: Vec<Instr>, num_params: usize, next_temp: Temp) -> String {
        let f = IrFunction { label: "_f".into(), num_params, body, next_temp };
        let alloc = trivial(&f);
        let mut out = AsmWriter::new();
        tile_function(&f, &alloc, &mut out);
        out.finish()
    }

    #[test]
    fn constant_return_is_an_immediate() {
        let asm = tile(vec![Instr::Return(Some(Value::Const(123)))], 0, 0);
        assert!(asm.contains("mov eax, 123"), "{asm}");
        assert!(asm.contains("jmp .ret"), "{asm}");
    }

    #[test]
    fn comparison_fuses_with_branch() {
        let asm = tile(
            vec![
                Instr::Bin { dst: 0, op: BinOp::Lt, lhs: Value::Const(1), rhs: Value::Const(2) },
                Instr::CJump {
                    cond: Value::Temp(0),
                    if_true: ".L0".into(),
                    if_false: ".L1".into(),
                },
                Instr::Label(".L0".into()),
                Instr::Label(".L1".into()),
            ],
            0,
            1,
        );
        assert!(asm.contains("jl .L0"), "{asm}");
        assert!(!asm.contains("setl"), "{asm}");
    }

    #[test]
    fn comparison_as_value_uses_setcc() {
        let asm = tile(
            vec![
                Instr::Bin { dst: 0, op: BinOp::Eq, lhs: Value::Const(1), rhs: Value::Const(1) },
                Instr::Return(Some(Value::Temp(0))),
            ],
            0,
            1,
        );
        assert!(asm.contains("sete al"), "{asm}");
        assert!(asm.contains("movzx eax, al"), "{asm}");
    }

    #[test]
    fn call_pushes_args_right_to_left_and_cleans() {
        let asm = tile(
            vec![Instr::Call {
                dst: Some(0),
                target: CallTarget::Label("_g".into()),
                args: vec![Value::Const(1), Value::Const(2)],
            }],
            0,
            1,
        );
        let push2 = asm.find("push dword 2").expect("push 2");
        let push1 = asm.find("push dword 1").expect("push 1");
        assert!(push2 < push1, "right-to-left push order: {asm}");
        assert!(asm.contains("add esp, 8"), "{asm}");
        assert!(asm.contains("extern _g"), "{asm}");
    }

    #[test]
    fn virtual_call_indexes_vtable() {
        let asm = tile(
            vec![Instr::Call {
                dst: None,
                target: CallTarget::Virtual { recv: Value::Temp(0), slot: 2 },
                args: vec![Value::Temp(0)],
            }],
            1,
            1,
        );
        assert!(asm.contains("mov eax, [eax]"), "{asm}");
        assert!(asm.contains("call [eax + 12]"), "{asm}");
    }
}
