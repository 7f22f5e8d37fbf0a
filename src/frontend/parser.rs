use crate::frontend::error::CompileError;
use crate::frontend::token::{Token, TokenKind};
use crate::lang::ast::{ArraySize, Declarator, Expr, Program, Stmt};
use crate::lang::value::Value;

/// Recursive-descent parser for Cinder.
///
/// Statements and declarations are parsed by dedicated methods; expressions
/// use a Pratt loop driven by binding powers, so precedence and
/// associativity live in one table instead of a ladder of grammar functions.
///
/// The token stream always ends with `Eof` and the parser never advances past
/// it, which keeps every error anchored to a real source position.
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    /// Creates a parser from lexer output. A trailing `Eof` is appended if a
    /// hand-built token list lacks one.
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if tokens.last().map(|t| t.kind) != Some(TokenKind::Eof) {
            let (line, col) = tokens.last().map(|t| (t.line, t.col)).unwrap_or((1, 1));
            tokens.push(Token::new(TokenKind::Eof, "", line, col));
        }
        Parser { tokens, pos: 0 }
    }

    fn current(&self) -> &Token {
        &self.tokens[self.pos]
    }

    /// Consumes and returns the current token; `Eof` is never passed.
    fn advance(&mut self) -> Token {
        let token = self.tokens[self.pos].clone();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.current().kind == kind
    }

    fn matches(&mut self, kind: TokenKind) -> Option<Token> {
        if self.check(kind) {
            Some(self.advance())
        } else {
            None
        }
    }

    fn expect(&mut self, kind: TokenKind, message: &str) -> Result<Token, CompileError> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.error(message))
        }
    }

    fn error(&self, message: &str) -> CompileError {
        CompileError::at_token(self.current(), message)
    }

    /// Parses a whole program: declarations and statements until `Eof`.
    pub fn parse(&mut self) -> Result<Program, CompileError> {
        let mut stmts = Vec::new();
        while !self.check(TokenKind::Eof) {
            stmts.push(self.declaration()?);
        }
        Ok(Program { stmts })
    }

    /// A declaration begins with a type keyword; anything else is a statement.
    fn declaration(&mut self) -> Result<Stmt, CompileError> {
        if self.current().kind.is_type_keyword() {
            let ty = self.advance();
            self.var_decl(ty)
        } else {
            self.statement()
        }
    }

    /// Parses the declarator list after a type keyword, up to the `;`.
    fn var_decl(&mut self, ty: Token) -> Result<Stmt, CompileError> {
        let mut decls = vec![self.declarator()?];
        while self.matches(TokenKind::Comma).is_some() {
            decls.push(self.declarator()?);
        }
        self.expect(
            TokenKind::Semicolon,
            "expected ';' after variable declaration",
        )?;
        Ok(Stmt::VarDecl { ty, decls })
    }

    /// One `name [size]? (= init)?` item, with the shape rules enforced:
    /// implicit-size arrays need an initializer list, scalars reject one, and
    /// arrays reject a bare expression initializer.
    fn declarator(&mut self) -> Result<Declarator, CompileError> {
        let name = self.expect(TokenKind::Ident, "expected variable name")?;

        let mut array = None;
        if self.matches(TokenKind::LBracket).is_some() {
            if self.matches(TokenKind::RBracket).is_some() {
                array = Some(ArraySize::Inferred);
            } else {
                let size = self.expression()?;
                self.expect(TokenKind::RBracket, "expected ']' after array size")?;
                array = Some(ArraySize::Explicit(size));
            }
        }

        let mut init = None;
        if self.matches(TokenKind::Eq).is_some() {
            if self.check(TokenKind::LBrace) {
                init = Some(self.initializer_list()?);
            } else {
                init = Some(self.expression()?);
            }
        }

        match (&array, &init) {
            (Some(ArraySize::Inferred), Some(Expr::InitList { .. })) => {}
            (Some(ArraySize::Inferred), _) => {
                return Err(CompileError::at_token(
                    &name,
                    "array with implicit size must have an initializer list",
                ));
            }
            (Some(_), Some(e)) if !matches!(e, Expr::InitList { .. }) => {
                return Err(CompileError::at_token(
                    &name,
                    "array initializer must be an initializer list",
                ));
            }
            (None, Some(Expr::InitList { brace, .. })) => {
                return Err(CompileError::at_token(
                    brace,
                    "initializer list is not allowed for a scalar variable",
                ));
            }
            _ => {}
        }

        Ok(Declarator { name, array, init })
    }

    fn initializer_list(&mut self) -> Result<Expr, CompileError> {
        let brace = self.advance(); // '{'
        let mut items = Vec::new();
        if !self.check(TokenKind::RBrace) {
            loop {
                items.push(self.expression()?);
                if self.matches(TokenKind::Comma).is_none() {
                    break;
                }
            }
        }
        self.expect(TokenKind::RBrace, "expected '}' after initializer list")?;
        Ok(Expr::InitList { brace, items })
    }

    fn statement(&mut self) -> Result<Stmt, CompileError> {
        match self.current().kind {
            TokenKind::LBrace => {
                self.advance();
                self.block()
            }
            TokenKind::If => self.if_stmt(),
            TokenKind::While => self.while_stmt(),
            TokenKind::For => self.for_stmt(),
            TokenKind::Break => {
                let tok = self.advance();
                self.expect(TokenKind::Semicolon, "expected ';' after 'break'")?;
                Ok(Stmt::Break(tok))
            }
            TokenKind::Continue => {
                let tok = self.advance();
                self.expect(TokenKind::Semicolon, "expected ';' after 'continue'")?;
                Ok(Stmt::Continue(tok))
            }
            TokenKind::Semicolon => {
                self.advance();
                Ok(Stmt::Empty)
            }
            _ => self.expr_stmt(),
        }
    }

    /// The opening `{` has already been consumed.
    fn block(&mut self) -> Result<Stmt, CompileError> {
        let mut stmts = Vec::new();
        while !self.check(TokenKind::RBrace) && !self.check(TokenKind::Eof) {
            stmts.push(self.declaration()?);
        }
        self.expect(TokenKind::RBrace, "expected '}' after block")?;
        Ok(Stmt::Block(stmts))
    }

    fn if_stmt(&mut self) -> Result<Stmt, CompileError> {
        self.advance(); // 'if'
        self.expect(TokenKind::LParen, "expected '(' after 'if'")?;
        let cond = self.expression()?;
        self.expect(TokenKind::RParen, "expected ')' after condition")?;
        let then_branch = Box::new(self.statement()?);
        let mut else_branch = None;
        if self.matches(TokenKind::Else).is_some() {
            else_branch = Some(Box::new(self.statement()?));
        }
        Ok(Stmt::If {
            cond,
            then_branch,
            else_branch,
        })
    }

    fn while_stmt(&mut self) -> Result<Stmt, CompileError> {
        self.advance(); // 'while'
        self.expect(TokenKind::LParen, "expected '(' after 'while'")?;
        let cond = self.expression()?;
        self.expect(TokenKind::RParen, "expected ')' after condition")?;
        let body = Box::new(self.statement()?);
        Ok(Stmt::While { cond, body })
    }

    /// `for (init; cond; step) body` where the initializer is empty, a
    /// variable declaration, or an expression statement.
    fn for_stmt(&mut self) -> Result<Stmt, CompileError> {
        self.advance(); // 'for'
        self.expect(TokenKind::LParen, "expected '(' after 'for'")?;

        let init = if self.matches(TokenKind::Semicolon).is_some() {
            None
        } else if self.current().kind.is_type_keyword() {
            let ty = self.advance();
            Some(Box::new(self.var_decl(ty)?))
        } else {
            Some(Box::new(self.expr_stmt()?))
        };

        let cond = if self.check(TokenKind::Semicolon) {
            None
        } else {
            Some(self.expression()?)
        };
        self.expect(TokenKind::Semicolon, "expected ';' after loop condition")?;

        let step = if self.check(TokenKind::RParen) {
            None
        } else {
            Some(self.expression()?)
        };
        self.expect(TokenKind::RParen, "expected ')' after for clauses")?;

        let body = Box::new(self.statement()?);
        Ok(Stmt::For {
            init,
            cond,
            step,
            body,
        })
    }

    fn expr_stmt(&mut self) -> Result<Stmt, CompileError> {
        let expr = self.expression()?;
        self.expect(TokenKind::Semicolon, "expected ';' after expression")?;
        Ok(Stmt::Expr(expr))
    }

    pub fn expression(&mut self) -> Result<Expr, CompileError> {
        self.parse_expr(0)
    }

    /// Pratt loop. Binding powers, low to high: assignment (right
    /// associative), `||`, `&&`, equality, relational, additive,
    /// multiplicative. Unary and postfix forms bind tighter and are handled
    /// below the loop.
    fn parse_expr(&mut self, min_bp: u8) -> Result<Expr, CompileError> {
        let mut left = self.parse_unary()?;
        loop {
            let kind = self.current().kind;
            let (l_bp, r_bp) = match kind {
                k if k.is_assign_op() => (2, 1),
                TokenKind::PipePipe => (3, 4),
                TokenKind::AmpAmp => (5, 6),
                TokenKind::EqEq | TokenKind::BangEq => (7, 8),
                TokenKind::Lt | TokenKind::LtEq | TokenKind::Gt | TokenKind::GtEq => (9, 10),
                TokenKind::Plus | TokenKind::Minus => (11, 12),
                TokenKind::Star | TokenKind::Slash | TokenKind::Percent => (13, 14),
                _ => break,
            };
            if l_bp < min_bp {
                break;
            }
            let op = self.advance();
            let right = self.parse_expr(r_bp)?;
            left = if op.kind.is_assign_op() {
                Self::check_assign_target(&left, &op)?;
                Expr::Assign {
                    target: Box::new(left),
                    op,
                    value: Box::new(right),
                }
            } else {
                Expr::Binary {
                    left: Box::new(left),
                    op,
                    right: Box::new(right),
                }
            };
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, CompileError> {
        match self.current().kind {
            TokenKind::Minus | TokenKind::Bang => {
                let op = self.advance();
                let right = self.parse_unary()?;
                Ok(Expr::Unary {
                    op,
                    right: Box::new(right),
                })
            }
            TokenKind::PlusPlus | TokenKind::MinusMinus => {
                let op = self.advance();
                let target = self.parse_unary()?;
                Self::check_update_target(&target, &op)?;
                Ok(Expr::Update {
                    op,
                    target: Box::new(target),
                    prefix: true,
                })
            }
            _ => self.parse_postfix(),
        }
    }

    fn parse_postfix(&mut self) -> Result<Expr, CompileError> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.current().kind {
                TokenKind::LBracket => {
                    self.advance();
                    let index = self.expression()?;
                    self.expect(TokenKind::RBracket, "expected ']' after index")?;
                    expr = Expr::Subscript {
                        object: Box::new(expr),
                        index: Box::new(index),
                    };
                }
                TokenKind::PlusPlus | TokenKind::MinusMinus => {
                    let op = self.advance();
                    Self::check_update_target(&expr, &op)?;
                    expr = Expr::Update {
                        op,
                        target: Box::new(expr),
                        prefix: false,
                    };
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr, CompileError> {
        match self.current().kind {
            TokenKind::IntLit => {
                let token = self.advance();
                let value = token
                    .lexeme
                    .parse::<i64>()
                    .map_err(|_| CompileError::at_token(&token, "integer literal out of range"))?;
                Ok(Expr::Literal {
                    value: Value::Int(value),
                    token,
                })
            }
            TokenKind::DoubleLit => {
                let token = self.advance();
                let value = token
                    .lexeme
                    .parse::<f64>()
                    .map_err(|_| CompileError::at_token(&token, "invalid double literal"))?;
                Ok(Expr::Literal {
                    value: Value::Double(value),
                    token,
                })
            }
            TokenKind::True => {
                let token = self.advance();
                Ok(Expr::Literal {
                    value: Value::Bool(true),
                    token,
                })
            }
            TokenKind::False => {
                let token = self.advance();
                Ok(Expr::Literal {
                    value: Value::Bool(false),
                    token,
                })
            }
            TokenKind::Ident => Ok(Expr::Ident(self.advance())),
            TokenKind::LParen => {
                self.advance();
                let expr = self.expression()?;
                self.expect(TokenKind::RParen, "expected ')' after expression")?;
                Ok(expr)
            }
            _ => Err(self.error("expected expression")),
        }
    }

    /// Assignment only writes through an identifier or a subscript.
    fn check_assign_target(target: &Expr, op: &Token) -> Result<(), CompileError> {
        match target {
            Expr::Ident(_) | Expr::Subscript { .. } => Ok(()),
            _ => Err(CompileError::at_token(op, "invalid assignment target")),
        }
    }

    /// `++`/`--` have the same lvalue requirement as assignment.
    fn check_update_target(target: &Expr, op: &Token) -> Result<(), CompileError> {
        match target {
            Expr::Ident(_) | Expr::Subscript { .. } => Ok(()),
            _ => Err(CompileError::at_token(
                op,
                format!("'{}' requires a variable or subscript", op.lexeme),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::lexer::Lexer;

    fn parse(source: &str) -> Program {
        let tokens = Lexer::new(source).tokenize().unwrap();
        Parser::new(tokens).parse().unwrap()
    }

    fn parse_err(source: &str) -> CompileError {
        let tokens = Lexer::new(source).tokenize().unwrap();
        Parser::new(tokens).parse().unwrap_err()
    }

    fn parse_expr(source: &str) -> Expr {
        match parse(&format!("{};", source)).stmts.into_iter().next() {
            Some(Stmt::Expr(e)) => e,
            other => panic!("expected expression statement, got {:?}", other),
        }
    }

    // -------------------------------------------------------------------
    // Expressions
    // -------------------------------------------------------------------

    #[test]
    fn test_precedence_mul_over_add() {
        // 1 + 2 * 3 parses as 1 + (2 * 3)
        match parse_expr("1 + 2 * 3") {
            Expr::Binary { op, right, .. } => {
                assert_eq!(op.lexeme, "+");
                assert!(matches!(*right, Expr::Binary { .. }));
            }
            other => panic!("unexpected shape: {:?}", other),
        }
    }

    #[test]
    fn test_relational_over_logical() {
        // a < b && c > d parses as (a < b) && (c > d)
        match parse_expr("a < b && c > d") {
            Expr::Binary { left, op, right } => {
                assert_eq!(op.kind, TokenKind::AmpAmp);
                assert!(matches!(*left, Expr::Binary { .. }));
                assert!(matches!(*right, Expr::Binary { .. }));
            }
            other => panic!("unexpected shape: {:?}", other),
        }
    }

    #[test]
    fn test_or_binds_looser_than_and() {
        match parse_expr("a || b && c") {
            Expr::Binary { op, right, .. } => {
                assert_eq!(op.kind, TokenKind::PipePipe);
                match *right {
                    Expr::Binary { op, .. } => assert_eq!(op.kind, TokenKind::AmpAmp),
                    other => panic!("unexpected rhs: {:?}", other),
                }
            }
            other => panic!("unexpected shape: {:?}", other),
        }
    }

    #[test]
    fn test_assignment_right_associative() {
        // a = b = 1 parses as a = (b = 1)
        match parse_expr("a = b = 1") {
            Expr::Assign { value, .. } => {
                assert!(matches!(*value, Expr::Assign { .. }));
            }
            other => panic!("unexpected shape: {:?}", other),
        }
    }

    #[test]
    fn test_compound_assignment() {
        match parse_expr("a += 2") {
            Expr::Assign { op, .. } => assert_eq!(op.kind, TokenKind::PlusEq),
            other => panic!("unexpected shape: {:?}", other),
        }
    }

    #[test]
    fn test_subscript_assignment_target() {
        match parse_expr("a[0] = 1") {
            Expr::Assign { target, .. } => {
                assert!(matches!(*target, Expr::Subscript { .. }));
            }
            other => panic!("unexpected shape: {:?}", other),
        }
    }

    #[test]
    fn test_invalid_assignment_target() {
        let err = parse_err("1 = 2;");
        assert!(err.message.contains("invalid assignment target"));
        let err = parse_err("a + b = 2;");
        assert!(err.message.contains("invalid assignment target"));
    }

    #[test]
    fn test_unary_chain() {
        // !-a parses as !(-a)
        match parse_expr("!-a") {
            Expr::Unary { op, right } => {
                assert_eq!(op.kind, TokenKind::Bang);
                assert!(matches!(*right, Expr::Unary { .. }));
            }
            other => panic!("unexpected shape: {:?}", other),
        }
    }

    #[test]
    fn test_prefix_and_postfix_update() {
        match parse_expr("++a") {
            Expr::Update { prefix, .. } => assert!(prefix),
            other => panic!("unexpected shape: {:?}", other),
        }
        match parse_expr("a--") {
            Expr::Update { prefix, op, .. } => {
                assert!(!prefix);
                assert_eq!(op.kind, TokenKind::MinusMinus);
            }
            other => panic!("unexpected shape: {:?}", other),
        }
    }

    #[test]
    fn test_update_on_subscript() {
        match parse_expr("a[i]++") {
            Expr::Update { target, prefix, .. } => {
                assert!(!prefix);
                assert!(matches!(*target, Expr::Subscript { .. }));
            }
            other => panic!("unexpected shape: {:?}", other),
        }
    }

    #[test]
    fn test_update_on_non_lvalue() {
        let err = parse_err("(a + b)++;");
        assert!(err.message.contains("requires a variable or subscript"));
        let err = parse_err("++1;");
        assert!(err.message.contains("requires a variable or subscript"));
    }

    #[test]
    fn test_nested_subscript() {
        // a[b[0]] keeps the inner subscript in the index slot
        match parse_expr("a[b[0]]") {
            Expr::Subscript { index, .. } => {
                assert!(matches!(*index, Expr::Subscript { .. }));
            }
            other => panic!("unexpected shape: {:?}", other),
        }
    }

    #[test]
    fn test_grouping() {
        // (1 + 2) * 3 keeps the addition on the left
        match parse_expr("(1 + 2) * 3") {
            Expr::Binary { left, op, .. } => {
                assert_eq!(op.kind, TokenKind::Star);
                assert!(matches!(*left, Expr::Binary { .. }));
            }
            other => panic!("unexpected shape: {:?}", other),
        }
    }

    // -------------------------------------------------------------------
    // Statements
    // -------------------------------------------------------------------

    #[test]
    fn test_declaration_list() {
        let program = parse("int i = 0, s;");
        match &program.stmts[0] {
            Stmt::VarDecl { ty, decls } => {
                assert_eq!(ty.kind, TokenKind::Int);
                assert_eq!(decls.len(), 2);
                assert_eq!(decls[0].name.lexeme, "i");
                assert!(decls[0].init.is_some());
                assert!(decls[1].init.is_none());
            }
            other => panic!("unexpected statement: {:?}", other),
        }
    }

    #[test]
    fn test_array_declarations() {
        let program = parse("int a[5]; int b[] = {1, 2}; double c[3] = {};");
        match &program.stmts[0] {
            Stmt::VarDecl { decls, .. } => {
                assert!(matches!(decls[0].array, Some(ArraySize::Explicit(_))));
                assert!(decls[0].init.is_none());
            }
            other => panic!("unexpected statement: {:?}", other),
        }
        match &program.stmts[1] {
            Stmt::VarDecl { decls, .. } => {
                assert!(matches!(decls[0].array, Some(ArraySize::Inferred)));
                assert!(matches!(decls[0].init, Some(Expr::InitList { .. })));
            }
            other => panic!("unexpected statement: {:?}", other),
        }
    }

    #[test]
    fn test_implicit_size_requires_list() {
        let err = parse_err("int a[];");
        assert!(err
            .message
            .contains("array with implicit size must have an initializer list"));
        let err = parse_err("int a[] = 1;");
        assert!(err
            .message
            .contains("array with implicit size must have an initializer list"));
    }

    #[test]
    fn test_array_rejects_bare_expression_initializer() {
        let err = parse_err("int a[3] = 1;");
        assert!(err
            .message
            .contains("array initializer must be an initializer list"));
    }

    #[test]
    fn test_scalar_rejects_initializer_list() {
        let err = parse_err("int a = {1};");
        assert!(err
            .message
            .contains("initializer list is not allowed for a scalar variable"));
    }

    #[test]
    fn test_keyword_as_variable_name() {
        let err = parse_err("int while = 1;");
        assert!(err.message.contains("expected variable name"));
    }

    #[test]
    fn test_if_else() {
        let program = parse("if (a < 1) b = 1; else { b = 2; }");
        match &program.stmts[0] {
            Stmt::If { else_branch, .. } => assert!(else_branch.is_some()),
            other => panic!("unexpected statement: {:?}", other),
        }
    }

    #[test]
    fn test_for_full_header() {
        let program = parse("for (int i = 0; i < 10; i++) ;");
        match &program.stmts[0] {
            Stmt::For {
                init, cond, step, ..
            } => {
                assert!(matches!(init.as_deref(), Some(Stmt::VarDecl { .. })));
                assert!(cond.is_some());
                assert!(step.is_some());
            }
            other => panic!("unexpected statement: {:?}", other),
        }
    }

    #[test]
    fn test_for_empty_header() {
        let program = parse("for (;;) break;");
        match &program.stmts[0] {
            Stmt::For {
                init, cond, step, ..
            } => {
                assert!(init.is_none());
                assert!(cond.is_none());
                assert!(step.is_none());
            }
            other => panic!("unexpected statement: {:?}", other),
        }
    }

    #[test]
    fn test_for_expression_initializer() {
        let program = parse("for (i = 0; i < 3;) i++;");
        match &program.stmts[0] {
            Stmt::For { init, step, .. } => {
                assert!(matches!(init.as_deref(), Some(Stmt::Expr(_))));
                assert!(step.is_none());
            }
            other => panic!("unexpected statement: {:?}", other),
        }
    }

    #[test]
    fn test_empty_statement() {
        let program = parse(";");
        assert_eq!(program.stmts, vec![Stmt::Empty]);
    }

    // -------------------------------------------------------------------
    // Terminator diagnostics
    // -------------------------------------------------------------------

    #[test]
    fn test_missing_semicolon_after_expression() {
        let err = parse_err("a = 1");
        assert!(err.message.contains("expected ';' after expression"));
        assert_eq!(err.location, "end of file");
    }

    #[test]
    fn test_missing_semicolon_after_declaration() {
        let err = parse_err("int a = 1");
        assert!(err
            .message
            .contains("expected ';' after variable declaration"));
    }

    #[test]
    fn test_missing_paren_after_if() {
        let err = parse_err("if a < 1) ;");
        assert!(err.message.contains("expected '(' after 'if'"));
    }

    #[test]
    fn test_missing_paren_after_condition() {
        let err = parse_err("while (a < 1 ;");
        assert!(err.message.contains("expected ')' after condition"));
    }

    #[test]
    fn test_missing_brace_after_block() {
        let err = parse_err("{ int a = 1;");
        assert!(err.message.contains("expected '}' after block"));
    }

    #[test]
    fn test_missing_bracket_after_index() {
        let err = parse_err("a[1 + 2;");
        assert!(err.message.contains("expected ']' after index"));
    }

    #[test]
    fn test_missing_semicolon_after_break() {
        let err = parse_err("while (true) break");
        assert!(err.message.contains("expected ';' after 'break'"));
    }

    #[test]
    fn test_error_position_is_reported() {
        let err = parse_err("int a = ;");
        assert!(err.message.contains("expected expression"));
        assert_eq!((err.line, err.col), (1, 9));
        assert_eq!(err.location, "';'");
    }
}
