use crate::bytecode::{Op, Program};

/// Renders a disassembly listing of a compiled program.
///
/// Jump targets are marked so the control-flow skeleton is readable at a
/// glance:
///
/// ```text
/// 0000    PUSH            0
/// 0001  ► LOAD            1
/// ```
pub fn disassemble(program: &Program) -> String {
    let ops = program.ops();
    let targets = collect_jump_targets(ops);

    let mut out = String::new();
    for (ip, op) in ops.iter().enumerate() {
        let marker = if targets.contains(&ip) { "►" } else { " " };
        out.push_str(&format!("{:04}  {} {}\n", ip, marker, format_op(op)));
    }
    out
}

/// Prints the disassembly to stdout (the `--bc` CLI mode).
pub fn print_program(program: &Program) {
    println!("=== BYTECODE ({} instructions) ===", program.len());
    print!("{}", disassemble(program));
}

fn collect_jump_targets(ops: &[Op]) -> Vec<usize> {
    let mut targets = Vec::new();
    for op in ops {
        if let Some(target) = op.jump_target() {
            if !targets.contains(&target) {
                targets.push(target);
            }
        }
    }
    targets
}

fn format_op(op: &Op) -> String {
    match op {
        Op::Reserve(n) => format!("RESERVE         {}", n),
        Op::Push(v) => format!("PUSH            {}", v),
        Op::Pop => "POP".to_string(),
        Op::PopN(n) => format!("POP_N           {}", n),
        Op::Dup => "DUP".to_string(),
        Op::Swap => "SWAP".to_string(),
        Op::Add => "ADD".to_string(),
        Op::Sub => "SUB".to_string(),
        Op::Mul => "MUL".to_string(),
        Op::Div => "DIV".to_string(),
        Op::Mod => "MOD".to_string(),
        Op::Neg => "NEG".to_string(),
        Op::Not => "NOT".to_string(),
        Op::Print => "PRINT".to_string(),
        Op::Load(slot) => format!("LOAD            {}", slot),
        Op::Store(slot) => format!("STORE           {}", slot),
        Op::Eq => "EQ".to_string(),
        Op::Ne => "NE".to_string(),
        Op::Lt => "LT".to_string(),
        Op::Gt => "GT".to_string(),
        Op::Le => "LE".to_string(),
        Op::Ge => "GE".to_string(),
        Op::Jump(t) => format!("JUMP            {}", t),
        Op::JumpIfFalse(t) => format!("JUMP_IF_FALSE   {}", t),
        Op::JumpIfFalsePeek(t) => format!("JUMP_IF_FALSE_PEEK {}", t),
        Op::JumpIfTruePeek(t) => format!("JUMP_IF_TRUE_PEEK  {}", t),
        Op::AllocArr(tag) => format!("ALLOC_ARR       {}", tag.name()),
        Op::LoadIdx => "LOAD_IDX".to_string(),
        Op::StoreIdx => "STORE_IDX".to_string(),
    }
}
