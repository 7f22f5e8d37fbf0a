use crate::frontend::token::{Token, TokenKind};

/// Prints a lexed token stream for the `--tokens` CLI mode.
pub struct TokenDumper {
    pub color: bool,
    pub show_debug_repr: bool, // if false, prints the bare lexeme instead
}

impl Default for TokenDumper {
    fn default() -> Self {
        Self {
            color: true,
            show_debug_repr: true,
        }
    }
}

impl TokenDumper {
    // ANSI colors
    const RESET: &'static str = "\x1b[0m";
    const DIM: &'static str = "\x1b[2m";
    const YEL: &'static str = "\x1b[33m";
    const CYN: &'static str = "\x1b[36m";
    const MAG: &'static str = "\x1b[35m";
    const GRN: &'static str = "\x1b[32m";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn no_color(mut self) -> Self {
        self.color = false;
        self
    }

    pub fn pretty(mut self) -> Self {
        self.show_debug_repr = false;
        self
    }

    pub fn dump(&self, tokens: &[Token]) {
        for token in tokens {
            self.print_one(token);
        }
    }

    fn print_one(&self, token: &Token) {
        let kind = self.kind(token.kind);
        let colr = if self.color {
            self.color(token.kind)
        } else {
            ""
        };
        let reset = if self.color { Self::RESET } else { "" };

        if self.show_debug_repr {
            println!(
                "[{:02}:{:02}] {}{:<8} {:?}{}",
                token.line, token.col, colr, kind, token.kind, reset
            );
        } else {
            println!(
                "[{:02}:{:02}] {}{:<8} {}{}",
                token.line, token.col, colr, kind, token, reset
            );
        }
    }

    fn kind(&self, kind: TokenKind) -> &'static str {
        use TokenKind::*;
        match kind {
            Eof => "EOF",

            // literals
            IntLit => "INT",
            DoubleLit => "DOUBLE",
            True | False => "BOOL",

            // names
            Ident => "IDENT",

            // structure
            LParen | RParen => "PAREN",
            LBrace | RBrace => "BRACE",
            LBracket | RBracket => "BRACKET",
            Comma | Semicolon => "PUNCT",

            // operators
            Plus | Minus | Star | Slash | Percent | PlusPlus | MinusMinus => "OP",
            Eq | PlusEq | MinusEq | StarEq | SlashEq | PercentEq => "ASSIGN",
            EqEq | BangEq | Lt | LtEq | Gt | GtEq => "CMP",
            Bang | AmpAmp | PipePipe => "LOGIC",

            // everything else is a keyword
            _ => "KEYWORD",
        }
    }

    fn color(&self, kind: TokenKind) -> &'static str {
        use TokenKind::*;
        match kind {
            Eof => Self::DIM,
            IntLit | DoubleLit | True | False => Self::CYN,
            Ident => Self::YEL,
            Plus | Minus | Star | Slash | Percent | PlusPlus | MinusMinus | Eq | PlusEq
            | MinusEq | StarEq | SlashEq | PercentEq => Self::MAG,
            EqEq | BangEq | Lt | LtEq | Gt | GtEq | Bang | AmpAmp | PipePipe => Self::MAG,
            Int | Double | Bool | If | Else | For | While | Break | Continue => Self::GRN,
            _ => Self::RESET,
        }
    }
}
