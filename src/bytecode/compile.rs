use tracing::debug;

use crate::bytecode::symbols::SymbolTable;
use crate::bytecode::{self, Op};
use crate::frontend::error::CompileError;
use crate::frontend::lexer::Lexer;
use crate::frontend::parser::Parser;
use crate::frontend::token::{Token, TokenKind};
use crate::lang::ast::{ArraySize, Declarator, Expr, Program, Stmt};
use crate::lang::value::{TypeTag, Value};

/// Placeholder operand for forward jumps, overwritten by `patch_to`.
const PATCH_LATER: usize = usize::MAX;

/// Compiles source text all the way to bytecode.
pub fn compile(source: &str) -> Result<bytecode::Program, CompileError> {
    let tokens = Lexer::new(source).tokenize()?;
    let program = Parser::new(tokens).parse()?;
    CodeGen::new().generate(&program)
}

/// Where `continue` lands inside the innermost loop.
///
/// A `while` knows its continue target up front (the loop start). A `for`
/// does not: continue must reach the increment block synthesized after the
/// body, so its jumps are collected and patched once that address exists.
enum ContinueTarget {
    Label(usize),
    Patches(Vec<usize>),
}

/// Per-loop compile-time state for `break`/`continue` resolution.
///
/// `base` is the symbol count when the loop was entered. A `break` or
/// `continue` jumps over the `PopN` that block exits would have emitted, so
/// both first discard any locals declared above `base` to keep the stack
/// balanced.
struct LoopCtx {
    breaks: Vec<usize>,
    cont: ContinueTarget,
    base: usize,
}

/// AST to bytecode translator.
///
/// Emitted code keeps the stack balanced: each statement restores the stack
/// to its entry height (the final top-level expression statement excepted,
/// whose value is left as the program result), and each expression adds
/// exactly one value.
pub struct CodeGen {
    code: Vec<Op>,
    symbols: SymbolTable,
    loops: Vec<LoopCtx>,
}

impl Default for CodeGen {
    fn default() -> Self {
        Self::new()
    }
}

impl CodeGen {
    pub fn new() -> Self {
        CodeGen {
            code: Vec::new(),
            symbols: SymbolTable::new(),
            loops: Vec::new(),
        }
    }

    /// Generates bytecode for a whole program. All generator state is reset
    /// on entry, so one `CodeGen` can compile many programs.
    pub fn generate(&mut self, program: &Program) -> Result<bytecode::Program, CompileError> {
        self.code.clear();
        self.symbols = SymbolTable::new();
        self.loops.clear();

        let count = program.stmts.len();
        for (i, stmt) in program.stmts.iter().enumerate() {
            // The value of a final top-level expression statement is kept on
            // the stack as the program result.
            if i + 1 == count {
                if let Stmt::Expr(expr) = stmt {
                    self.expr(expr)?;
                    break;
                }
            }
            self.stmt(stmt)?;
        }

        debug!(instructions = self.code.len(), "bytecode generated");
        Ok(bytecode::Program::new(std::mem::take(&mut self.code)))
    }

    // ------------------------------------------------------------------
    // Emission helpers
    // ------------------------------------------------------------------

    fn emit(&mut self, op: Op) -> usize {
        self.code.push(op);
        self.code.len() - 1
    }

    /// Next instruction address.
    fn here(&self) -> usize {
        self.code.len()
    }

    /// Overwrites the operand of the jump emitted at `at`.
    fn patch_to(&mut self, at: usize, target: usize) {
        match &mut self.code[at] {
            Op::Jump(t) | Op::JumpIfFalse(t) | Op::JumpIfFalsePeek(t) | Op::JumpIfTruePeek(t) => {
                *t = target;
            }
            _ => unreachable!("backpatch site {at} is not a jump"),
        }
    }

    fn patch_here(&mut self, at: usize) {
        let target = self.here();
        self.patch_to(at, target);
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn stmt(&mut self, stmt: &Stmt) -> Result<(), CompileError> {
        match stmt {
            Stmt::Expr(expr) => {
                self.expr(expr)?;
                self.emit(Op::Pop);
                Ok(())
            }
            Stmt::Empty => Ok(()),
            Stmt::Block(stmts) => {
                self.symbols.enter_scope();
                for s in stmts {
                    self.stmt(s)?;
                }
                let locals = self.symbols.exit_scope();
                if locals > 0 {
                    self.emit(Op::PopN(locals));
                }
                Ok(())
            }
            Stmt::VarDecl { ty, decls } => {
                for decl in decls {
                    self.declarator(ty, decl)?;
                }
                Ok(())
            }
            Stmt::If {
                cond,
                then_branch,
                else_branch,
            } => {
                self.expr(cond)?;
                let then_jump = self.emit(Op::JumpIfFalse(PATCH_LATER));
                self.stmt(then_branch)?;
                match else_branch {
                    Some(else_branch) => {
                        let else_jump = self.emit(Op::Jump(PATCH_LATER));
                        self.patch_here(then_jump);
                        self.stmt(else_branch)?;
                        self.patch_here(else_jump);
                    }
                    None => self.patch_here(then_jump),
                }
                Ok(())
            }
            Stmt::While { cond, body } => {
                let loop_start = self.here();
                self.loops.push(LoopCtx {
                    breaks: Vec::new(),
                    cont: ContinueTarget::Label(loop_start),
                    base: self.symbols.len(),
                });
                self.expr(cond)?;
                let exit_jump = self.emit(Op::JumpIfFalse(PATCH_LATER));
                self.stmt(body)?;
                self.emit(Op::Jump(loop_start));
                self.patch_here(exit_jump);
                let ctx = self.loops.pop().unwrap();
                for br in ctx.breaks {
                    self.patch_here(br);
                }
                Ok(())
            }
            Stmt::For {
                init,
                cond,
                step,
                body,
            } => {
                // The header's declarations live in their own scope.
                self.symbols.enter_scope();
                if let Some(init) = init {
                    self.stmt(init)?;
                }
                let loop_start = self.here();
                let mut exit_jump = None;
                if let Some(cond) = cond {
                    self.expr(cond)?;
                    exit_jump = Some(self.emit(Op::JumpIfFalse(PATCH_LATER)));
                }
                self.loops.push(LoopCtx {
                    breaks: Vec::new(),
                    cont: ContinueTarget::Patches(Vec::new()),
                    base: self.symbols.len(),
                });
                self.stmt(body)?;

                let increment_start = self.here();
                let ctx = self.loops.pop().unwrap();
                if let ContinueTarget::Patches(patches) = ctx.cont {
                    for p in patches {
                        self.patch_to(p, increment_start);
                    }
                }
                if let Some(step) = step {
                    self.expr(step)?;
                    self.emit(Op::Pop);
                }
                self.emit(Op::Jump(loop_start));
                if let Some(exit_jump) = exit_jump {
                    self.patch_here(exit_jump);
                }
                for br in ctx.breaks {
                    self.patch_here(br);
                }
                let locals = self.symbols.exit_scope();
                if locals > 0 {
                    self.emit(Op::PopN(locals));
                }
                Ok(())
            }
            Stmt::Break(tok) => {
                if self.loops.is_empty() {
                    return Err(CompileError::at_token(tok, "'break' outside of a loop"));
                }
                self.unwind_loop_locals();
                let jump = self.emit(Op::Jump(PATCH_LATER));
                self.loops.last_mut().unwrap().breaks.push(jump);
                Ok(())
            }
            Stmt::Continue(tok) => {
                let target = match self.loops.last() {
                    Some(LoopCtx {
                        cont: ContinueTarget::Label(label),
                        ..
                    }) => Some(*label),
                    Some(_) => None,
                    None => {
                        return Err(CompileError::at_token(tok, "'continue' outside of a loop"));
                    }
                };
                self.unwind_loop_locals();
                match target {
                    Some(label) => {
                        self.emit(Op::Jump(label));
                    }
                    None => {
                        let jump = self.emit(Op::Jump(PATCH_LATER));
                        if let Some(LoopCtx {
                            cont: ContinueTarget::Patches(patches),
                            ..
                        }) = self.loops.last_mut()
                        {
                            patches.push(jump);
                        }
                    }
                }
                Ok(())
            }
        }
    }

    /// `break` and `continue` bypass the `PopN` of the blocks they leave, so
    /// the locals those blocks declared are discarded here, before the jump.
    /// The scope records themselves stay put; the enclosing blocks still
    /// exit normally at compile time.
    fn unwind_loop_locals(&mut self) {
        if let Some(ctx) = self.loops.last() {
            let extra = self.symbols.len() - ctx.base;
            if extra > 0 {
                self.emit(Op::PopN(extra));
            }
        }
    }

    /// Lowers one declarator: leave exactly one value on the stack (the
    /// scalar's initial value, the uninitialized sentinel, or the array
    /// pointer), then bind the name so its slot is that value's index.
    fn declarator(&mut self, ty: &Token, decl: &Declarator) -> Result<(), CompileError> {
        match &decl.array {
            Some(size) => {
                let tag = Self::type_tag(ty)?;
                match size {
                    ArraySize::Explicit(size_expr) => {
                        self.check_initializer_fits(size_expr, decl)?;
                        self.expr(size_expr)?;
                    }
                    ArraySize::Inferred => {
                        // The parser guarantees an initializer list here.
                        let len = match &decl.init {
                            Some(Expr::InitList { items, .. }) => items.len(),
                            _ => 0,
                        };
                        self.emit(Op::Push(Value::Int(len as i64)));
                    }
                }
                self.emit(Op::AllocArr(tag));
                if let Some(Expr::InitList { items, .. }) = &decl.init {
                    for (i, item) in items.iter().enumerate() {
                        self.emit(Op::Dup);
                        self.emit(Op::Push(Value::Int(i as i64)));
                        self.expr(item)?;
                        self.emit(Op::StoreIdx);
                        self.emit(Op::Pop);
                    }
                }
            }
            None => match &decl.init {
                Some(init) => self.expr(init)?,
                None => {
                    self.emit(Op::Push(Value::Uninit));
                }
            },
        }
        self.symbols.define(&decl.name)?;
        Ok(())
    }

    /// When the declared size is an integer literal, an oversized initializer
    /// list is rejected at compile time. Non-literal sizes are left to the
    /// runtime bounds check on the fill stores.
    fn check_initializer_fits(
        &self,
        size_expr: &Expr,
        decl: &Declarator,
    ) -> Result<(), CompileError> {
        if let (
            Expr::Literal {
                value: Value::Int(size),
                ..
            },
            Some(Expr::InitList { brace, items }),
        ) = (size_expr, &decl.init)
        {
            if items.len() as i64 > *size {
                return Err(CompileError::at_token(
                    brace,
                    format!(
                        "initializer list length {} exceeds array size {}",
                        items.len(),
                        size
                    ),
                ));
            }
        }
        Ok(())
    }

    fn type_tag(ty: &Token) -> Result<TypeTag, CompileError> {
        match ty.kind {
            TokenKind::Int => Ok(TypeTag::Int),
            TokenKind::Double => Ok(TypeTag::Double),
            TokenKind::Bool => Ok(TypeTag::Bool),
            _ => Err(CompileError::at_token(ty, "expected a type keyword")),
        }
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn expr(&mut self, expr: &Expr) -> Result<(), CompileError> {
        match expr {
            Expr::Literal { value, .. } => {
                self.emit(Op::Push(value.clone()));
                Ok(())
            }
            Expr::Ident(name) => {
                let slot = self.symbols.resolve(name)?;
                self.emit(Op::Load(slot));
                Ok(())
            }
            Expr::Unary { op, right } => {
                self.expr(right)?;
                match op.kind {
                    TokenKind::Minus => self.emit(Op::Neg),
                    TokenKind::Bang => self.emit(Op::Not),
                    _ => return Err(CompileError::at_token(op, "invalid unary operator")),
                };
                Ok(())
            }
            Expr::Binary { left, op, right } => match op.kind {
                TokenKind::AmpAmp => {
                    // Short-circuit: if the left operand already decides the
                    // result it stays on the stack and the right side never
                    // runs; otherwise it is popped before the right side.
                    self.expr(left)?;
                    let end_jump = self.emit(Op::JumpIfFalsePeek(PATCH_LATER));
                    self.emit(Op::Pop);
                    self.expr(right)?;
                    self.patch_here(end_jump);
                    Ok(())
                }
                TokenKind::PipePipe => {
                    self.expr(left)?;
                    let end_jump = self.emit(Op::JumpIfTruePeek(PATCH_LATER));
                    self.emit(Op::Pop);
                    self.expr(right)?;
                    self.patch_here(end_jump);
                    Ok(())
                }
                _ => {
                    self.expr(left)?;
                    self.expr(right)?;
                    let op = Self::binary_op(op)?;
                    self.emit(op);
                    Ok(())
                }
            },
            Expr::Subscript { object, index } => {
                self.expr(object)?;
                self.expr(index)?;
                self.emit(Op::LoadIdx);
                Ok(())
            }
            Expr::Assign { target, op, value } => self.assign(target, op, value),
            Expr::Update { op, target, prefix } => self.update(op, target, *prefix),
            Expr::InitList { brace, .. } => Err(CompileError::at_token(
                brace,
                "initializer list is only allowed in an array declaration",
            )),
        }
    }

    fn assign(&mut self, target: &Expr, op: &Token, value: &Expr) -> Result<(), CompileError> {
        match target {
            Expr::Ident(name) => {
                let slot = self.symbols.resolve(name)?;
                if op.kind == TokenKind::Eq {
                    self.expr(value)?;
                } else {
                    self.emit(Op::Load(slot));
                    self.expr(value)?;
                    let binop = Self::compound_op(op)?;
                    self.emit(binop);
                }
                // Store keeps the value on the stack as the expression result.
                self.emit(Op::Store(slot));
                Ok(())
            }
            Expr::Subscript { object, index } => {
                if op.kind == TokenKind::Eq {
                    self.expr(object)?;
                    self.expr(index)?;
                    self.expr(value)?;
                } else {
                    // Read-modify-write: stage the write address, then
                    // compile (object, index) a second time to read the old
                    // element.
                    self.expr(object)?;
                    self.expr(index)?;
                    self.expr(object)?;
                    self.expr(index)?;
                    self.emit(Op::LoadIdx);
                    self.expr(value)?;
                    let binop = Self::compound_op(op)?;
                    self.emit(binop);
                }
                self.emit(Op::StoreIdx);
                Ok(())
            }
            _ => Err(CompileError::at_token(op, "invalid assignment target")),
        }
    }

    fn update(&mut self, op: &Token, target: &Expr, prefix: bool) -> Result<(), CompileError> {
        let (delta, inverse) = match op.kind {
            TokenKind::PlusPlus => (Op::Add, Op::Sub),
            TokenKind::MinusMinus => (Op::Sub, Op::Add),
            _ => return Err(CompileError::at_token(op, "invalid update operator")),
        };
        match target {
            Expr::Ident(name) => {
                let slot = self.symbols.resolve(name)?;
                if prefix {
                    self.emit(Op::Load(slot));
                    self.emit(Op::Push(Value::Int(1)));
                    self.emit(delta);
                    self.emit(Op::Store(slot));
                } else {
                    // The pre-update value stays below the new one; the store
                    // writes the slot and the extra copy is dropped.
                    self.emit(Op::Load(slot));
                    self.emit(Op::Dup);
                    self.emit(Op::Push(Value::Int(1)));
                    self.emit(delta);
                    self.emit(Op::Store(slot));
                    self.emit(Op::Pop);
                }
                Ok(())
            }
            Expr::Subscript { object, index } => {
                self.expr(object)?;
                self.expr(index)?;
                self.expr(object)?;
                self.expr(index)?;
                self.emit(Op::LoadIdx);
                self.emit(Op::Push(Value::Int(1)));
                self.emit(delta);
                self.emit(Op::StoreIdx);
                if !prefix {
                    // Recover the pre-update value from the stored result.
                    self.emit(Op::Push(Value::Int(1)));
                    self.emit(inverse);
                }
                Ok(())
            }
            _ => Err(CompileError::at_token(
                op,
                format!("'{}' requires a variable or subscript", op.lexeme),
            )),
        }
    }

    fn binary_op(op: &Token) -> Result<Op, CompileError> {
        match op.kind {
            TokenKind::Plus => Ok(Op::Add),
            TokenKind::Minus => Ok(Op::Sub),
            TokenKind::Star => Ok(Op::Mul),
            TokenKind::Slash => Ok(Op::Div),
            TokenKind::Percent => Ok(Op::Mod),
            TokenKind::EqEq => Ok(Op::Eq),
            TokenKind::BangEq => Ok(Op::Ne),
            TokenKind::Lt => Ok(Op::Lt),
            TokenKind::LtEq => Ok(Op::Le),
            TokenKind::Gt => Ok(Op::Gt),
            TokenKind::GtEq => Ok(Op::Ge),
            _ => Err(CompileError::at_token(op, "invalid binary operator")),
        }
    }

    fn compound_op(op: &Token) -> Result<Op, CompileError> {
        match op.kind {
            TokenKind::PlusEq => Ok(Op::Add),
            TokenKind::MinusEq => Ok(Op::Sub),
            TokenKind::StarEq => Ok(Op::Mul),
            TokenKind::SlashEq => Ok(Op::Div),
            TokenKind::PercentEq => Ok(Op::Mod),
            _ => Err(CompileError::at_token(op, "invalid compound assignment")),
        }
    }
}
