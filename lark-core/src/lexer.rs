use crate::error::Error;

// ============================================================================
// Positions and Tokens
// ============================================================================

/// Source position. `line` and `col` are 1-based; `offset` counts chars.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pos {
    pub line: usize,
    pub col: usize,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Str(String),
    Number(f64),
    /// Name stored with its leading `:`.
    Keyword(String),
    Symbol(String),
    Quote,
    Quasiquote,
    Unquote,
    UnquoteSplicing,
    Comment,
    Whitespace,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub start: Pos,
    pub end: Pos,
}

// ============================================================================
// Lexer
// ============================================================================

pub struct Lexer {
    input: Vec<char>,
    position: usize,
    line: usize,
    col: usize,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Lexer {
            input: input.chars().collect(),
            position: 0,
            line: 1,
            col: 1,
        }
    }

    fn pos(&self) -> Pos {
        Pos {
            line: self.line,
            col: self.col,
            offset: self.position,
        }
    }

    fn current_char(&self) -> char {
        if self.position < self.input.len() {
            self.input[self.position]
        } else {
            '\0'
        }
    }

    fn peek_ahead(&self, n: usize) -> char {
        if self.position + n < self.input.len() {
            self.input[self.position + n]
        } else {
            '\0'
        }
    }

    fn advance(&mut self) {
        if self.position < self.input.len() {
            if self.input[self.position] == '\n' {
                self.line += 1;
                self.col = 1;
            } else {
                self.col += 1;
            }
            self.position += 1;
        }
    }

    fn is_eof(&self) -> bool {
        self.position >= self.input.len()
    }

    /// Commas are whitespace, like in the surface syntax of Clojure.
    fn is_whitespace(c: char) -> bool {
        matches!(c, ' ' | '\t' | '\r' | '\n' | ',')
    }

    /// Characters that end a symbol, keyword, or number run.
    fn is_atom_terminator(c: char) -> bool {
        Self::is_whitespace(c)
            || matches!(
                c,
                '(' | ')' | '[' | ']' | '{' | '}' | ';' | '"' | '\'' | '`' | '~'
            )
    }

    fn token(&self, kind: TokenKind, start: Pos) -> Token {
        Token {
            kind,
            start,
            end: self.pos(),
        }
    }

    // ========================================================================
    // String Parsing
    // ========================================================================

    fn read_string(&mut self) -> Result<TokenKind, Error> {
        let start = self.pos();
        self.advance(); // opening quote
        let mut content = String::new();

        while !self.is_eof() && self.current_char() != '"' {
            if self.current_char() == '\\' {
                self.advance();
                if self.is_eof() {
                    break;
                }
                let c = self.current_char();
                self.advance();
                match c {
                    'n' => content.push('\n'),
                    'r' => content.push('\r'),
                    't' => content.push('\t'),
                    '\\' => content.push('\\'),
                    '"' => content.push('"'),
                    // Unknown escapes emit the escaped character verbatim.
                    other => content.push(other),
                }
            } else {
                content.push(self.current_char());
                self.advance();
            }
        }

        if self.is_eof() {
            return Err(Error::tokenizer(
                "unterminated string literal",
                start.line,
                start.col,
            ));
        }

        self.advance(); // closing quote
        Ok(TokenKind::Str(content))
    }

    // ========================================================================
    // Atom Runs: numbers, keywords, symbols
    // ========================================================================

    fn read_atom_run(&mut self) -> String {
        let mut text = String::new();
        while !self.is_eof() && !Self::is_atom_terminator(self.current_char()) {
            text.push(self.current_char());
            self.advance();
        }
        text
    }

    fn read_number(&mut self) -> Result<TokenKind, Error> {
        let start = self.pos();
        let lexeme = self.read_atom_run();
        match parse_number(&lexeme) {
            Some(n) => Ok(TokenKind::Number(n)),
            None => Err(Error::tokenizer(
                format!("malformed number {lexeme}"),
                start.line,
                start.col,
            )),
        }
    }

    fn read_keyword(&mut self) -> TokenKind {
        self.advance(); // ':'
        let name = self.read_atom_run();
        TokenKind::Keyword(format!(":{name}"))
    }

    fn read_symbol(&mut self) -> TokenKind {
        TokenKind::Symbol(self.read_atom_run())
    }

    fn read_whitespace(&mut self) -> TokenKind {
        while !self.is_eof() && Self::is_whitespace(self.current_char()) {
            self.advance();
        }
        TokenKind::Whitespace
    }

    /// Comment runs from `;` to end of line, newline included.
    fn read_comment(&mut self) -> TokenKind {
        while !self.is_eof() && self.current_char() != '\n' {
            self.advance();
        }
        if self.current_char() == '\n' {
            self.advance();
        }
        TokenKind::Comment
    }

    // ========================================================================
    // Main Tokenization
    // ========================================================================

    fn next_token(&mut self) -> Result<Option<Token>, Error> {
        if self.is_eof() {
            return Ok(None);
        }

        let start = self.pos();
        let ch = self.current_char();

        let kind = match ch {
            c if Self::is_whitespace(c) => self.read_whitespace(),
            ';' => self.read_comment(),
            '(' => {
                self.advance();
                TokenKind::LParen
            }
            ')' => {
                self.advance();
                TokenKind::RParen
            }
            '[' => {
                self.advance();
                TokenKind::LBracket
            }
            ']' => {
                self.advance();
                TokenKind::RBracket
            }
            '{' => {
                self.advance();
                TokenKind::LBrace
            }
            '}' => {
                self.advance();
                TokenKind::RBrace
            }
            '\'' => {
                self.advance();
                TokenKind::Quote
            }
            '`' => {
                self.advance();
                TokenKind::Quasiquote
            }
            '~' => {
                self.advance();
                if self.current_char() == '@' {
                    self.advance();
                    TokenKind::UnquoteSplicing
                } else {
                    TokenKind::Unquote
                }
            }
            '"' => self.read_string()?,
            ':' => self.read_keyword(),
            c if c.is_ascii_digit() => self.read_number()?,
            '-' if self.peek_ahead(1).is_ascii_digit() => self.read_number()?,
            _ => self.read_symbol(),
        };

        Ok(Some(self.token(kind, start)))
    }
}

/// A number is an optional `-`, digits, and an optional `.` with digits.
/// Trailing dots and multi-dot runs are malformed rather than symbols.
fn parse_number(lexeme: &str) -> Option<f64> {
    let body = lexeme.strip_prefix('-').unwrap_or(lexeme);
    let mut parts = body.splitn(3, '.');
    let int = parts.next()?;
    let frac = parts.next();
    if parts.next().is_some() {
        return None;
    }
    if int.is_empty() || !int.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    if let Some(frac) = frac {
        if frac.is_empty() || !frac.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
    }
    lexeme.parse().ok()
}

/// Tokenize `input`. Whitespace tokens are dropped; comment tokens are
/// retained for the parser to skip.
pub fn tokenize(input: &str) -> Result<Vec<Token>, Error> {
    let mut lexer = Lexer::new(input);
    let mut tokens = Vec::new();
    while let Some(token) = lexer.next_token()? {
        if token.kind != TokenKind::Whitespace {
            tokens.push(token);
        }
    }
    Ok(tokens)
}
