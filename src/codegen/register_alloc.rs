//! Register allocation.
//!
//! Two strategies, selected by the driver's optimization flag:
//!
//! - **trivial**: every temporary gets a stack slot in the frame and
//!   operands reload on every use; the frame size is known up-front.
//! - **linear scan**: live intervals over the straight-line IR, extended
//!   across loop back-edges; intervals live across a call are spilled
//!   (caller-save discipline), the rest compete for `ebx`/`esi`/`edi`,
//!   which the prologue preserves. `eax`/`ecx`/`edx` stay reserved as
//!   instruction-selection scratch.

use std::collections::HashMap;

use crate::codegen::ir::{CallTarget, Instr, IrFunction, Temp, Value};
use crate::common::consts::WORD;

/// Where a temporary lives during execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Loc {
    /// `[ebp + offset]`; positive offsets are incoming parameters.
    Slot(i32),
    Reg(&'static str),
}

#[derive(Debug)]
pub struct Allocation {
    pub locs: HashMap<Temp, Loc>,
    /// Bytes of local slot space to reserve below the saved base pointer.
    pub frame_size: i32,
}

impl Allocation {
    pub fn loc(&self, temp: Temp) -> Loc {
        self.locs[&temp]
    }
}

/// Incoming parameter `i` sits above the return address and saved ebp.
fn param_slot(i: usize) -> Loc {
    Loc::Slot(2 * WORD + WORD * i as i32)
}

/// Trivial allocation: a slot for everything.
pub fn trivial(f: &IrFunction) -> Allocation {
    let mut locs = HashMap::new();
    for i in 0..f.num_params {
        locs.insert(i as Temp, param_slot(i));
    }
    let mut slots = 0;
    for t in f.num_params as Temp..f.next_temp {
        slots += 1;
        locs.insert(t, Loc::Slot(-(WORD * slots)));
    }
    Allocation { locs, frame_size: WORD * slots }
}

#[derive(Debug, Clone, Copy)]
struct Interval {
    start: usize,
    end: usize,
}

const POOL: [&str; 3] = ["ebx", "esi", "edi"];

/// Linear scan over live intervals.
pub fn linear_scan(f: &IrFunction) -> Allocation {
    let mut locs = HashMap::new();
    for i in 0..f.num_params {
        locs.insert(i as Temp, param_slot(i));
    }

    // Occurrence intervals per temp.
    let mut intervals: HashMap<Temp, Interval> = HashMap::new();
    let mut label_pos: HashMap<&str, usize> = HashMap::new();
    let mut calls: Vec<usize> = Vec::new();
    for (i, instr) in f.body.iter().enumerate() {
        if let Instr::Label(l) = instr {
            label_pos.insert(l, i);
        }
        if matches!(instr, Instr::Call { .. }) {
            calls.push(i);
        }
        for t in instr_temps(instr) {
            if (t as usize) < f.num_params {
                continue;
            }
            intervals
                .entry(t)
                .and_modify(|iv| iv.end = i)
                .or_insert(Interval { start: i, end: i });
        }
    }

    // A value live at a loop header stays live across the whole loop:
    // extend any interval spanning the target of a backward branch to the
    // branch itself. Repeat until stable, since extensions can overlap.
    loop {
        let mut changed = false;
        for (i, instr) in f.body.iter().enumerate() {
            let targets: Vec<&str> = match instr {
                Instr::Jump(l) => vec![l.as_str()],
                Instr::CJump { if_true, if_false, .. } => {
                    vec![if_true.as_str(), if_false.as_str()]
                }
                _ => continue,
            };
            for target in targets {
                let Some(&h) = label_pos.get(target) else { continue };
                if h > i {
                    continue;
                }
                for iv in intervals.values_mut() {
                    if iv.start <= h && iv.end >= h && iv.end < i {
                        iv.end = i;
                        changed = true;
                    }
                }
            }
        }
        if !changed {
            break;
        }
    }

    // All registers are caller-save at call boundaries: an interval that
    // crosses a call is spilled outright.
    let crosses_call = |iv: &Interval| calls.iter().any(|&c| iv.start < c && c < iv.end);

    let mut order: Vec<(Temp, Interval)> = intervals.into_iter().collect();
    order.sort_by_key(|(t, iv)| (iv.start, *t));

    let mut active: Vec<(usize, &'static str, Temp)> = Vec::new(); // (end, reg, temp)
    let mut slots = 0;
    let mut spill = |locs: &mut HashMap<Temp, Loc>, t: Temp, slots: &mut i32| {
        *slots += 1;
        locs.insert(t, Loc::Slot(-(WORD * *slots)));
    };

    for (t, iv) in order {
        active.retain(|(end, _, _)| *end >= iv.start);

        if crosses_call(&iv) {
            spill(&mut locs, t, &mut slots);
            continue;
        }

        let in_use: Vec<&str> = active.iter().map(|(_, r, _)| *r).collect();
        match POOL.iter().find(|r| !in_use.contains(r)) {
            Some(reg) => {
                locs.insert(t, Loc::Reg(reg));
                active.push((iv.end, reg, t));
            }
            None => spill(&mut locs, t, &mut slots),
        }
    }

    Allocation { locs, frame_size: WORD * slots }
}

fn value_temp(v: &Value, out: &mut Vec<Temp>) {
    if let Value::Temp(t) = v {
        out.push(*t);
    }
}

fn instr_temps(instr: &Instr) -> Vec<Temp> {
    let mut out = Vec::new();
    match instr {
        Instr::Label(_) | Instr::Jump(_) => {}
        Instr::Move { dst, src } => {
            out.push(*dst);
            value_temp(src, &mut out);
        }
        Instr::Bin { dst, lhs, rhs, .. } => {
            out.push(*dst);
            value_temp(lhs, &mut out);
            value_temp(rhs, &mut out);
        }
        Instr::Load { dst, base, .. } => {
            out.push(*dst);
            value_temp(base, &mut out);
        }
        Instr::Store { base, src, .. } => {
            value_temp(base, &mut out);
            value_temp(src, &mut out);
        }
        Instr::CJump { cond, .. } => value_temp(cond, &mut out),
        Instr::Call { dst, target, args } => {
            if let Some(dst) = dst {
                out.push(*dst);
            }
            if let CallTarget::Virtual { recv, .. } = target {
                value_temp(recv, &mut out);
            }
            for arg in args {
                value_temp(arg, &mut out);
            }
        }
        Instr::Return(value) => {
            if let Some(value) = value {
                value_temp(value, &mut out);
            }
        }
        Instr::Ext { dst, src, .. } => {
            out.push(*dst);
            value_temp(src, &mut out);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::ir::BinOp;

    fn func(body: Vec<Instr>, num_params: usize, next_temp: Temp) -> IrFunction {
        IrFunction { label: "_f".into(), num_params, body, next_temp }
    }

    #[test]
    fn trivial_gives_every_temp_a_slot() {
        let f = func(
            vec![
                Instr::Move { dst: 1, src: Value::Const(1) },
                Instr::Move { dst: 2, src: Value::Temp(1) },
                Instr::Return(Some(Value::Temp(2))),
            ],
            1,
            3,
        );
        let alloc = trivial(&f);
        assert_eq!(alloc.loc(0), Loc::Slot(8));
        assert_eq!(alloc.loc(1), Loc::Slot(-4));
        assert_eq!(alloc.loc(2), Loc::Slot(-8));
        assert_eq!(alloc.frame_size, 8);
    }

    #[test]
    fn linear_scan_reuses_registers() {
        // Two disjoint intervals share one register.
        let f = func(
            vec![
                Instr::Move { dst: 0, src: Value::Const(1) },
                Instr::Move { dst: 1, src: Value::Temp(0) },
                Instr::Move { dst: 2, src: Value::Const(2) },
                Instr::Move { dst: 3, src: Value::Temp(2) },
            ],
            0,
            4,
        );
        let alloc = linear_scan(&f);
        assert_eq!(alloc.loc(0), Loc::Reg("ebx"));
        assert_eq!(alloc.loc(2), Loc::Reg("ebx"));
        assert_eq!(alloc.frame_size, 0);
    }

    #[test]
    fn interval_crossing_call_is_spilled() {
        let f = func(
            vec![
                Instr::Move { dst: 0, src: Value::Const(1) },
                Instr::Call {
                    dst: Some(1),
                    target: CallTarget::Label("_g".into()),
                    args: vec![],
                },
                Instr::Bin {
                    dst: 2,
                    op: BinOp::Add,
                    lhs: Value::Temp(0),
                    rhs: Value::Temp(1),
                },
            ],
            0,
            3,
        );
        let alloc = linear_scan(&f);
        assert!(matches!(alloc.loc(0), Loc::Slot(_)));
    }

    #[test]
    fn loop_back_edge_extends_interval() {
        // t0 is defined before the loop and read inside it; t1 is a loop
        // counter whose interval must cover the back edge.
        let f = func(
            vec![
                Instr::Move { dst: 0, src: Value::Const(10) },
                Instr::Label(".L0".into()),
                Instr::Bin { dst: 1, op: BinOp::Add, lhs: Value::Temp(0), rhs: Value::Const(1) },
                Instr::CJump {
                    cond: Value::Temp(1),
                    if_true: ".L0".into(),
                    if_false: ".L1".into(),
                },
                Instr::Label(".L1".into()),
            ],
            0,
            2,
        );
        let alloc = linear_scan(&f);
        // Both live through the loop, so they must not share a register.
        assert_ne!(alloc.loc(0), alloc.loc(1));
    }
}
