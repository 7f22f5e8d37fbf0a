use crate::frontend::error::CompileError;
use crate::frontend::token::{Token, TokenKind};

/// Hand-written scanner for Cinder source text.
///
/// The lexer walks the source one character at a time, tracking 1-based line
/// and column positions. `next_token` returns the next token and keeps
/// returning `Eof` once the input is exhausted, so callers may pull tokens
/// past the end without special-casing.
pub struct Lexer {
    source: Vec<char>,
    pos: usize,
    line: usize,
    col: usize,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Lexer {
            source: source.chars().collect(),
            pos: 0,
            line: 1,
            col: 1,
        }
    }

    fn current(&self) -> Option<char> {
        self.source.get(self.pos).copied()
    }

    fn peek(&self) -> Option<char> {
        self.source.get(self.pos + 1).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.current();
        if ch == Some('\n') {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        self.pos += 1;
        ch
    }

    /// Consumes spaces, tabs, carriage returns, newlines, and both comment
    /// forms. An unterminated `/* ... ` block is a compile error reported at
    /// the position where the comment opened.
    fn skip_trivia(&mut self) -> Result<(), CompileError> {
        loop {
            match self.current() {
                Some(' ') | Some('\t') | Some('\r') | Some('\n') => {
                    self.advance();
                }
                Some('/') if self.peek() == Some('/') => {
                    while let Some(ch) = self.current() {
                        if ch == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                Some('/') if self.peek() == Some('*') => {
                    let start_line = self.line;
                    let start_col = self.col;
                    self.advance(); // '/'
                    self.advance(); // '*'
                    loop {
                        match self.current() {
                            Some('*') if self.peek() == Some('/') => {
                                self.advance();
                                self.advance();
                                break;
                            }
                            Some(_) => {
                                self.advance();
                            }
                            None => {
                                return Err(CompileError::at(
                                    "unterminated block comment",
                                    start_line,
                                    start_col,
                                    "/*",
                                ));
                            }
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    /// Returns the next token, or `Eof` forever once the input runs out.
    pub fn next_token(&mut self) -> Result<Token, CompileError> {
        self.skip_trivia()?;

        let line = self.line;
        let col = self.col;

        let ch = match self.current() {
            Some(ch) => ch,
            None => return Ok(Token::new(TokenKind::Eof, "", line, col)),
        };

        if ch.is_ascii_digit() {
            return Ok(self.read_number(line, col));
        }

        if ch.is_ascii_alphabetic() || ch == '_' {
            return Ok(self.read_identifier(line, col));
        }

        self.read_operator(line, col)
    }

    /// Collects all tokens up to and including the final `Eof`.
    pub fn tokenize(&mut self) -> Result<Vec<Token>, CompileError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    /// Scans digits, continuing past a `.` only when another digit follows.
    /// `1.` therefore lexes as the integer `1` and a stray dot, which the
    /// operator scanner then rejects.
    fn read_number(&mut self, line: usize, col: usize) -> Token {
        let mut lexeme = String::new();
        while let Some(ch) = self.current() {
            if ch.is_ascii_digit() {
                lexeme.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        let is_double = self.current() == Some('.')
            && self.peek().map(|c| c.is_ascii_digit()).unwrap_or(false);
        if is_double {
            lexeme.push('.');
            self.advance();
            while let Some(ch) = self.current() {
                if ch.is_ascii_digit() {
                    lexeme.push(ch);
                    self.advance();
                } else {
                    break;
                }
            }
            Token::new(TokenKind::DoubleLit, lexeme, line, col)
        } else {
            Token::new(TokenKind::IntLit, lexeme, line, col)
        }
    }

    fn read_identifier(&mut self, line: usize, col: usize) -> Token {
        let mut lexeme = String::new();
        while let Some(ch) = self.current() {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                lexeme.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        match TokenKind::keyword(&lexeme) {
            Some(kind) => Token::new(kind, lexeme, line, col),
            None => Token::new(TokenKind::Ident, lexeme, line, col),
        }
    }

    /// Longest-match scan for operators and punctuation.
    fn read_operator(&mut self, line: usize, col: usize) -> Result<Token, CompileError> {
        let ch = self.current().unwrap_or('\0');
        let next = self.peek();

        let token = match (ch, next) {
            ('+', Some('+')) => self.double(TokenKind::PlusPlus, "++", line, col),
            ('+', Some('=')) => self.double(TokenKind::PlusEq, "+=", line, col),
            ('-', Some('-')) => self.double(TokenKind::MinusMinus, "--", line, col),
            ('-', Some('=')) => self.double(TokenKind::MinusEq, "-=", line, col),
            ('*', Some('=')) => self.double(TokenKind::StarEq, "*=", line, col),
            ('/', Some('=')) => self.double(TokenKind::SlashEq, "/=", line, col),
            ('%', Some('=')) => self.double(TokenKind::PercentEq, "%=", line, col),
            ('=', Some('=')) => self.double(TokenKind::EqEq, "==", line, col),
            ('!', Some('=')) => self.double(TokenKind::BangEq, "!=", line, col),
            ('<', Some('=')) => self.double(TokenKind::LtEq, "<=", line, col),
            ('>', Some('=')) => self.double(TokenKind::GtEq, ">=", line, col),
            ('&', Some('&')) => self.double(TokenKind::AmpAmp, "&&", line, col),
            ('|', Some('|')) => self.double(TokenKind::PipePipe, "||", line, col),
            ('&', _) => {
                return Err(CompileError::at(
                    "unexpected character: '&' (did you mean '&&'?)",
                    line,
                    col,
                    "&",
                ));
            }
            ('|', _) => {
                return Err(CompileError::at(
                    "unexpected character: '|' (did you mean '||'?)",
                    line,
                    col,
                    "|",
                ));
            }
            ('+', _) => self.single(TokenKind::Plus, "+", line, col),
            ('-', _) => self.single(TokenKind::Minus, "-", line, col),
            ('*', _) => self.single(TokenKind::Star, "*", line, col),
            ('/', _) => self.single(TokenKind::Slash, "/", line, col),
            ('%', _) => self.single(TokenKind::Percent, "%", line, col),
            ('=', _) => self.single(TokenKind::Eq, "=", line, col),
            ('!', _) => self.single(TokenKind::Bang, "!", line, col),
            ('<', _) => self.single(TokenKind::Lt, "<", line, col),
            ('>', _) => self.single(TokenKind::Gt, ">", line, col),
            ('(', _) => self.single(TokenKind::LParen, "(", line, col),
            (')', _) => self.single(TokenKind::RParen, ")", line, col),
            ('{', _) => self.single(TokenKind::LBrace, "{", line, col),
            ('}', _) => self.single(TokenKind::RBrace, "}", line, col),
            ('[', _) => self.single(TokenKind::LBracket, "[", line, col),
            (']', _) => self.single(TokenKind::RBracket, "]", line, col),
            (',', _) => self.single(TokenKind::Comma, ",", line, col),
            (';', _) => self.single(TokenKind::Semicolon, ";", line, col),
            _ => {
                return Err(CompileError::at(
                    format!("unexpected character: '{}'", ch),
                    line,
                    col,
                    &ch.to_string(),
                ));
            }
        };

        Ok(token)
    }

    fn single(&mut self, kind: TokenKind, text: &str, line: usize, col: usize) -> Token {
        self.advance();
        Token::new(kind, text, line, col)
    }

    fn double(&mut self, kind: TokenKind, text: &str, line: usize, col: usize) -> Token {
        self.advance();
        self.advance();
        Token::new(kind, text, line, col)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Lex a source string and return the token kinds, without the Eof.
    fn kinds(source: &str) -> Vec<TokenKind> {
        let mut lexer = Lexer::new(source);
        lexer
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .filter(|k| *k != TokenKind::Eof)
            .collect()
    }

    /// Lex a source string and return (kind, lexeme) pairs, without the Eof.
    fn lexemes(source: &str) -> Vec<(TokenKind, String)> {
        let mut lexer = Lexer::new(source);
        lexer
            .tokenize()
            .unwrap()
            .into_iter()
            .filter(|t| t.kind != TokenKind::Eof)
            .map(|t| (t.kind, t.lexeme))
            .collect()
    }

    fn lex_err(source: &str) -> CompileError {
        let mut lexer = Lexer::new(source);
        lexer.tokenize().unwrap_err()
    }

    #[test]
    fn test_keywords_and_identifiers() {
        assert_eq!(
            kinds("int x while whiley _tmp"),
            vec![
                TokenKind::Int,
                TokenKind::Ident,
                TokenKind::While,
                TokenKind::Ident,
                TokenKind::Ident,
            ]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            lexemes("0 42 3.14 10.0"),
            vec![
                (TokenKind::IntLit, "0".to_string()),
                (TokenKind::IntLit, "42".to_string()),
                (TokenKind::DoubleLit, "3.14".to_string()),
                (TokenKind::DoubleLit, "10.0".to_string()),
            ]
        );
    }

    #[test]
    fn test_dot_without_digit_is_error() {
        let err = lex_err("1.x");
        assert!(err.message.contains("unexpected character: '.'"));
    }

    #[test]
    fn test_operators_longest_match() {
        assert_eq!(
            kinds("+ ++ += - -- -= * *= / /= % %= = == ! != < <= > >= && ||"),
            vec![
                TokenKind::Plus,
                TokenKind::PlusPlus,
                TokenKind::PlusEq,
                TokenKind::Minus,
                TokenKind::MinusMinus,
                TokenKind::MinusEq,
                TokenKind::Star,
                TokenKind::StarEq,
                TokenKind::Slash,
                TokenKind::SlashEq,
                TokenKind::Percent,
                TokenKind::PercentEq,
                TokenKind::Eq,
                TokenKind::EqEq,
                TokenKind::Bang,
                TokenKind::BangEq,
                TokenKind::Lt,
                TokenKind::LtEq,
                TokenKind::Gt,
                TokenKind::GtEq,
                TokenKind::AmpAmp,
                TokenKind::PipePipe,
            ]
        );
    }

    #[test]
    fn test_adjacent_compound_tokens() {
        // i+++j lexes greedily as i ++ + j
        assert_eq!(
            kinds("i+++j"),
            vec![
                TokenKind::Ident,
                TokenKind::PlusPlus,
                TokenKind::Plus,
                TokenKind::Ident,
            ]
        );
    }

    #[test]
    fn test_punctuation() {
        assert_eq!(
            kinds("( ) { } [ ] , ;"),
            vec![
                TokenKind::LParen,
                TokenKind::RParen,
                TokenKind::LBrace,
                TokenKind::RBrace,
                TokenKind::LBracket,
                TokenKind::RBracket,
                TokenKind::Comma,
                TokenKind::Semicolon,
            ]
        );
    }

    #[test]
    fn test_line_comment() {
        assert_eq!(
            kinds("1 // trailing comment\n2"),
            vec![TokenKind::IntLit, TokenKind::IntLit]
        );
    }

    #[test]
    fn test_block_comment_spans_lines() {
        let mut lexer = Lexer::new("1 /* a\n   b */ 2");
        let tokens = lexer.tokenize().unwrap();
        assert_eq!(tokens[0].lexeme, "1");
        assert_eq!(tokens[1].lexeme, "2");
        // the block comment consumed a newline, so `2` sits on line 2
        assert_eq!(tokens[1].line, 2);
        assert_eq!(tokens[1].col, 9);
    }

    #[test]
    fn test_unterminated_block_comment() {
        let err = lex_err("int x; /* open");
        assert!(err.message.contains("unterminated block comment"));
        assert_eq!((err.line, err.col), (1, 8));
    }

    #[test]
    fn test_single_ampersand_error() {
        let err = lex_err("a & b");
        assert!(err.message.contains("did you mean '&&'?"));
    }

    #[test]
    fn test_single_pipe_error() {
        let err = lex_err("a | b");
        assert!(err.message.contains("did you mean '||'?"));
    }

    #[test]
    fn test_unexpected_character() {
        let err = lex_err("int x = @;");
        assert!(err.message.contains("unexpected character: '@'"));
        assert_eq!((err.line, err.col), (1, 9));
    }

    #[test]
    fn test_positions() {
        let mut lexer = Lexer::new("int x;\n  x = 1;");
        let tokens = lexer.tokenize().unwrap();

        let at = |i: usize| -> (usize, usize) { (tokens[i].line, tokens[i].col) };
        assert_eq!(at(0), (1, 1)); // int
        assert_eq!(at(1), (1, 5)); // x
        assert_eq!(at(2), (1, 6)); // ;
        assert_eq!(at(3), (2, 3)); // x
        assert_eq!(at(4), (2, 5)); // =
        assert_eq!(at(5), (2, 7)); // 1
        assert_eq!(at(6), (2, 8)); // ;
    }

    #[test]
    fn test_eof_forever() {
        let mut lexer = Lexer::new("1");
        assert_eq!(lexer.next_token().unwrap().kind, TokenKind::IntLit);
        assert_eq!(lexer.next_token().unwrap().kind, TokenKind::Eof);
        assert_eq!(lexer.next_token().unwrap().kind, TokenKind::Eof);
        assert_eq!(lexer.next_token().unwrap().kind, TokenKind::Eof);
    }

    #[test]
    fn test_empty_source() {
        let mut lexer = Lexer::new("");
        let tokens = lexer.tokenize().unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Eof);
        assert_eq!((tokens[0].line, tokens[0].col), (1, 1));
    }
}
