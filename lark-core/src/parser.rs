use crate::error::Error;
use crate::interner::Interned;
use crate::language::Value;
use crate::lexer::{tokenize, Pos, Token, TokenKind};

// ============================================================================
// Parser
// ============================================================================

/// Turns the token stream into forms. Comments are skipped up front;
/// reader macros expand into their list equivalents.
pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Parser {
            tokens: tokens
                .into_iter()
                .filter(|t| t.kind != TokenKind::Comment)
                .collect(),
            position: 0,
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.position).cloned();
        if token.is_some() {
            self.position += 1;
        }
        token
    }

    fn last_pos(&self) -> Pos {
        self.tokens.last().map(|t| t.end).unwrap_or(Pos {
            line: 1,
            col: 1,
            offset: 0,
        })
    }

    /// Parse every remaining top-level form.
    pub fn parse_forms(&mut self) -> Result<Vec<Value>, Error> {
        let mut forms = Vec::new();
        while self.peek().is_some() {
            forms.push(self.parse_form()?);
        }
        Ok(forms)
    }

    pub fn parse_form(&mut self) -> Result<Value, Error> {
        let token = self.advance().ok_or_else(|| {
            let pos = self.last_pos();
            Error::parser("unexpected end of input", pos.line, pos.col)
        })?;

        match token.kind {
            TokenKind::Number(n) => Ok(Value::Number(n)),
            TokenKind::Str(s) => Ok(Value::Str(s)),
            TokenKind::Keyword(name) => Ok(Value::Keyword(Interned::new(&name))),
            TokenKind::Symbol(name) => Ok(reinterpret_symbol(&name)),
            TokenKind::Quote => self.parse_reader_macro("quote", &token),
            TokenKind::Quasiquote => self.parse_reader_macro("quasiquote", &token),
            TokenKind::Unquote => self.parse_reader_macro("unquote", &token),
            TokenKind::UnquoteSplicing => self.parse_reader_macro("unquote-splicing", &token),
            TokenKind::LParen => {
                let items = self.parse_until(&token, "(", TokenKind::RParen)?;
                Ok(Value::list(items))
            }
            TokenKind::LBracket => {
                let items = self.parse_until(&token, "[", TokenKind::RBracket)?;
                Ok(Value::vector(items))
            }
            TokenKind::LBrace => {
                let items = self.parse_until(&token, "{", TokenKind::RBrace)?;
                if items.len() % 2 != 0 {
                    return Err(Error::parser(
                        "map literal must contain an even number of forms",
                        token.start.line,
                        token.start.col,
                    ));
                }
                let mut entries = Vec::with_capacity(items.len() / 2);
                let mut iter = items.into_iter();
                while let (Some(k), Some(v)) = (iter.next(), iter.next()) {
                    entries.push((k, v));
                }
                Ok(Value::map(entries))
            }
            TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace => Err(Error::parser(
                format!("unexpected {}", delimiter_name(&token.kind)),
                token.start.line,
                token.start.col,
            )),
            TokenKind::Comment | TokenKind::Whitespace => {
                // Filtered before parsing; reaching here is a parser bug.
                Err(Error::parser(
                    "unexpected trivia token",
                    token.start.line,
                    token.start.col,
                ))
            }
        }
    }

    /// `'x` and friends expand to two-element lists: `(quote x)`.
    fn parse_reader_macro(&mut self, name: &str, opener: &Token) -> Result<Value, Error> {
        if self.peek().is_none() {
            return Err(Error::parser(
                format!("{name} must be followed by a form"),
                opener.start.line,
                opener.start.col,
            ));
        }
        let form = self.parse_form()?;
        Ok(Value::list([Value::symbol(name), form]))
    }

    fn parse_until(
        &mut self,
        opener: &Token,
        open_text: &str,
        close: TokenKind,
    ) -> Result<Vec<Value>, Error> {
        let mut items = Vec::new();
        loop {
            match self.peek() {
                None => {
                    return Err(Error::parser(
                        format!(
                            "unclosed {open_text} opened at {}:{}",
                            opener.start.line, opener.start.col
                        ),
                        opener.start.line,
                        opener.start.col,
                    ));
                }
                Some(token) if token.kind == close => {
                    self.advance();
                    return Ok(items);
                }
                Some(_) => items.push(self.parse_form()?),
            }
        }
    }
}

/// `true`, `false`, and `nil` read as literals; everything else is a
/// symbol with the lexeme as its name.
fn reinterpret_symbol(name: &str) -> Value {
    match name {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        "nil" => Value::Nil,
        other => Value::symbol(other),
    }
}

fn delimiter_name(kind: &TokenKind) -> &'static str {
    match kind {
        TokenKind::RParen => ")",
        TokenKind::RBracket => "]",
        TokenKind::RBrace => "}",
        _ => "token",
    }
}

/// Tokenize and parse `source` into its top-level forms.
pub fn parse(source: &str) -> Result<Vec<Value>, Error> {
    let tokens = tokenize(source)?;
    Parser::new(tokens).parse_forms()
}
