use crate::frontend::error::CompileError;
use crate::frontend::token::Token;

/// Compile-time symbol table: a flat list of `(name, depth)` records plus
/// the current scope depth.
///
/// Locals are pushed onto the unified stack in declaration order, so a
/// record's index in this list is exactly its runtime slot. No separate
/// allocation pass exists; keeping the two in lockstep is the whole contract.
#[derive(Debug, Default)]
pub struct SymbolTable {
    records: Vec<Symbol>,
    depth: usize,
}

#[derive(Debug)]
struct Symbol {
    name: String,
    depth: usize,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enter_scope(&mut self) {
        self.depth += 1;
    }

    /// Leaves the current scope, removing its records. Returns how many were
    /// dropped so the generator can emit a matching `PopN`.
    pub fn exit_scope(&mut self) -> usize {
        let mut popped = 0;
        while self
            .records
            .last()
            .map(|r| r.depth == self.depth)
            .unwrap_or(false)
        {
            self.records.pop();
            popped += 1;
        }
        self.depth -= 1;
        popped
    }

    /// Registers a name in the current scope and returns its slot.
    /// Redeclaring a name at the same depth is a compile error.
    pub fn define(&mut self, name: &Token) -> Result<usize, CompileError> {
        let exists = self
            .records
            .iter()
            .any(|r| r.depth == self.depth && r.name == name.lexeme);
        if exists {
            return Err(CompileError::at_token(
                name,
                format!("variable '{}' is already defined in this scope", name.lexeme),
            ));
        }
        self.records.push(Symbol {
            name: name.lexeme.clone(),
            depth: self.depth,
        });
        Ok(self.records.len() - 1)
    }

    /// Finds the innermost record for a name and returns its slot.
    pub fn resolve(&self, name: &Token) -> Result<usize, CompileError> {
        self.records
            .iter()
            .rposition(|r| r.name == name.lexeme)
            .ok_or_else(|| {
                CompileError::at_token(name, format!("undefined variable '{}'", name.lexeme))
            })
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
