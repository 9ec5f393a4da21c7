//! Text formatter for the SSA IR.

use std::fmt::Write as _;

use super::ir::*;

/// Renders a function in the canonical text form used by tests.
pub fn format_func(func: &Function) -> String {
    let mut formatter = Formatter::new();
    formatter.write_function(func);
    formatter.finish()
}

/// Renders a single instruction, result binding included.
pub fn inst_text(inst: &Instruction) -> String {
    let mut out = String::new();
    if let Some(result) = inst.result {
        let _ = write!(&mut out, "%v{} = ", result.0);
    }
    write_inst_kind(&mut out, &inst.kind);
    out
}

/// Renders a terminator.
pub fn term_text(term: &Terminator) -> String {
    let mut out = String::new();
    write_terminator(&mut out, term);
    out
}

struct Formatter {
    out: String,
}

impl Formatter {
    fn new() -> Self {
        Self { out: String::new() }
    }

    fn finish(self) -> String {
        self.out
    }

    fn write_function(&mut self, func: &Function) {
        let _ = writeln!(&mut self.out, "fn {} {{", func.name);

        if !func.locals.is_empty() {
            let _ = writeln!(&mut self.out, "  locals:");
            for local in &func.locals {
                let _ = write!(&mut self.out, "    %l{}", local.id.0);
                if let Some(name) = &local.name {
                    let _ = write!(&mut self.out, " // {}", name);
                }
                let _ = writeln!(&mut self.out);
            }
        }

        for (index, block) in func.blocks.iter().enumerate() {
            if index > 0 || !func.locals.is_empty() {
                let _ = writeln!(&mut self.out);
            }
            self.write_block(block);
        }

        let _ = writeln!(&mut self.out, "}}");
    }

    fn write_block(&mut self, block: &Block) {
        let _ = write!(&mut self.out, "  bb{}(", block.id.0);
        for (i, param) in block.params.iter().enumerate() {
            if i > 0 {
                let _ = write!(&mut self.out, ", ");
            }
            let _ = write!(&mut self.out, "%v{}", param.0);
        }
        let _ = writeln!(&mut self.out, "):");

        for inst in &block.insts {
            let _ = writeln!(&mut self.out, "    {}", inst_text(inst));
        }
        if !block.insts.is_empty() {
            let _ = writeln!(&mut self.out);
        }
        let _ = write!(&mut self.out, "    ");
        write_terminator(&mut self.out, &block.term);
        let _ = writeln!(&mut self.out);
    }
}

fn write_inst_kind(out: &mut String, kind: &InstKind) {
    match kind {
        InstKind::Const { value } => {
            let _ = write!(out, "const ");
            write_const(out, value);
        }
        InstKind::BinOp { op, lhs, rhs } => {
            let _ = write!(out, "{} %v{}, %v{}", op_name(op), lhs.0, rhs.0);
        }
        InstKind::Cmp { op, lhs, rhs } => {
            let _ = write!(out, "cmp.{} %v{}, %v{}", cmp_name(op), lhs.0, rhs.0);
        }
        InstKind::AddrOfLocal { local } => {
            let _ = write!(out, "addr_of %l{}", local.0);
        }
        InstKind::FieldAddr { base, index } => {
            let _ = write!(out, "field_addr %v{}, {}", base.0, index);
        }
        InstKind::Load { ptr } => {
            let _ = write!(out, "load %v{}", ptr.0);
        }
        InstKind::Store { ptr, value } => {
            let _ = write!(out, "store %v{}, %v{}", ptr.0, value.0);
        }
        InstKind::Call { callee, args } => {
            let _ = write!(out, "call {}(", callee);
            for (i, arg) in args.iter().enumerate() {
                if i > 0 {
                    let _ = write!(out, ", ");
                }
                let _ = write!(out, "%v{}", arg.0);
            }
            let _ = write!(out, ")");
        }
    }
}

fn write_terminator(out: &mut String, term: &Terminator) {
    match term {
        Terminator::Br { target, args } => {
            let _ = write!(out, "br bb{}", target.0);
            write_block_args(out, args);
        }
        Terminator::CondBr {
            cond,
            then_bb,
            then_args,
            else_bb,
            else_args,
        } => {
            let _ = write!(out, "cbr %v{}, bb{}", cond.0, then_bb.0);
            write_block_args(out, then_args);
            let _ = write!(out, ", bb{}", else_bb.0);
            write_block_args(out, else_args);
        }
        Terminator::Return { value } => {
            let _ = write!(out, "ret");
            if let Some(value) = value {
                let _ = write!(out, " %v{}", value.0);
            }
        }
        Terminator::Unreachable => {
            let _ = write!(out, "unreachable");
        }
    }
}

fn write_block_args(out: &mut String, args: &[ValueId]) {
    let _ = write!(out, "(");
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            let _ = write!(out, ", ");
        }
        let _ = write!(out, "%v{}", arg.0);
    }
    let _ = write!(out, ")");
}

fn write_const(out: &mut String, value: &ConstValue) {
    match value {
        ConstValue::Unit => {
            let _ = write!(out, "unit");
        }
        ConstValue::Bool(b) => {
            let _ = write!(out, "{}", b);
        }
        ConstValue::Int(v) => {
            let _ = write!(out, "{}", v);
        }
        ConstValue::GlobalAddr { id } => {
            let _ = write!(out, "@g{}", id.0);
        }
    }
}

fn op_name(op: &BinOp) -> &'static str {
    match op {
        BinOp::Add => "add",
        BinOp::Sub => "sub",
        BinOp::Mul => "mul",
        BinOp::Div => "div",
    }
}

fn cmp_name(op: &CmpOp) -> &'static str {
    match op {
        CmpOp::Eq => "eq",
        CmpOp::Ne => "ne",
        CmpOp::Lt => "lt",
        CmpOp::Le => "le",
        CmpOp::Gt => "gt",
        CmpOp::Ge => "ge",
    }
}

#[cfg(test)]
#[path = "../tests/ir/t_format.rs"]
mod tests;
