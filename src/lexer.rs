//! Tokenizer for filter expressions.
//!
//! ```text
//! exif.make == 'Canon' and exif.iso >= 800 | sort dateTaken desc | limit 5
//! ^^^^^^^^^ ^^ ^^^^^^^ ^^^ ^^^^^^^^ ^^ ^^^ ^ ^^^^ ^^^^^^^^^ ^^^^ ^ ^^^^^ ^
//! ident     op string  kw  ident    op num | kw   ident     kw   | kw    num
//! ```
//!
//! Dotted paths are a single identifier token; the parser splits them into
//! segments. String literals take single or double quotes and have no escape
//! sequences: the string ends at the next matching quote. Numbers are
//! integers or decimals, optionally negative, without exponents.
//!
//! Every token records its byte offset and length in the source string so
//! parse errors can point at it.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Ident(String),
    Str(String),
    Number(f64),
    Null,
    All,
    True,
    False,
    And,
    Or,
    Not,
    Sort,
    Limit,
    Asc,
    Desc,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    LParen,
    RParen,
    Comma,
    Pipe,
    Eof,
}

/// A token and its byte span in the source.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub offset: usize,
    pub len: usize,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LexError {
    #[error("Unterminated string literal")]
    UnterminatedString { offset: usize },
    #[error("Unexpected character '{ch}'")]
    UnexpectedChar { ch: char, offset: usize },
    #[error("Malformed number '{text}'")]
    MalformedNumber { text: String, offset: usize },
}

impl LexError {
    /// Byte offset of the offending input.
    pub fn offset(&self) -> usize {
        match self {
            LexError::UnterminatedString { offset }
            | LexError::UnexpectedChar { offset, .. }
            | LexError::MalformedNumber { offset, .. } => *offset,
        }
    }

    /// Number of bytes to underline in a diagnostic.
    pub fn width(&self) -> usize {
        match self {
            LexError::MalformedNumber { text, .. } => text.len(),
            _ => 1,
        }
    }
}

fn keyword(word: &str) -> Option<TokenKind> {
    Some(match word {
        "null" => TokenKind::Null,
        "all" => TokenKind::All,
        "true" => TokenKind::True,
        "false" => TokenKind::False,
        "and" => TokenKind::And,
        "or" => TokenKind::Or,
        "not" => TokenKind::Not,
        "sort" => TokenKind::Sort,
        "limit" => TokenKind::Limit,
        "asc" => TokenKind::Asc,
        "desc" => TokenKind::Desc,
        _ => return None,
    })
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '.'
}

struct Lexer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        self.input[self.pos..].chars().nth(1)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eat_while(&mut self, pred: impl Fn(char) -> bool) {
        while self.peek().is_some_and(&pred) {
            self.bump();
        }
    }

    fn next_token(&mut self) -> Result<Token, LexError> {
        self.eat_while(char::is_whitespace);
        let start = self.pos;
        let Some(c) = self.bump() else {
            return Ok(Token {
                kind: TokenKind::Eof,
                offset: start,
                len: 0,
            });
        };

        let kind = match c {
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            ',' => TokenKind::Comma,
            '|' => TokenKind::Pipe,
            '=' if self.peek() == Some('=') => {
                self.bump();
                TokenKind::Eq
            }
            '!' if self.peek() == Some('=') => {
                self.bump();
                TokenKind::Ne
            }
            '<' if self.peek() == Some('=') => {
                self.bump();
                TokenKind::Le
            }
            '>' if self.peek() == Some('=') => {
                self.bump();
                TokenKind::Ge
            }
            '<' => TokenKind::Lt,
            '>' => TokenKind::Gt,
            '\'' | '"' => {
                let body_start = self.pos;
                let Some(end) = self.input[body_start..].find(c) else {
                    return Err(LexError::UnterminatedString { offset: start });
                };
                self.pos = body_start + end + 1;
                TokenKind::Str(self.input[body_start..body_start + end].to_string())
            }
            '-' if self.peek().is_some_and(|d| d.is_ascii_digit()) => self.number(start)?,
            d if d.is_ascii_digit() => self.number(start)?,
            c if is_ident_start(c) => {
                self.eat_while(is_ident_continue);
                let word = &self.input[start..self.pos];
                keyword(word).unwrap_or_else(|| TokenKind::Ident(word.to_string()))
            }
            ch => return Err(LexError::UnexpectedChar { ch, offset: start }),
        };

        Ok(Token {
            kind,
            offset: start,
            len: self.pos - start,
        })
    }

    /// Lex the rest of a number whose first character was already consumed.
    fn number(&mut self, start: usize) -> Result<TokenKind, LexError> {
        self.eat_while(|c| c.is_ascii_digit());
        if self.peek() == Some('.') && self.peek_second().is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
            self.eat_while(|c| c.is_ascii_digit());
        }
        // `12abc`, `1.2.3`, `5.` are one malformed token, not a number and an identifier
        if self.peek().is_some_and(is_ident_continue) {
            self.eat_while(is_ident_continue);
            return Err(LexError::MalformedNumber {
                text: self.input[start..self.pos].to_string(),
                offset: start,
            });
        }
        let text = &self.input[start..self.pos];
        text.parse::<f64>()
            .map(TokenKind::Number)
            .map_err(|_| LexError::MalformedNumber {
                text: text.to_string(),
                offset: start,
            })
    }
}

/// Split `input` into tokens. The last token is always [`TokenKind::Eof`].
pub fn tokenize(input: &str) -> Result<Vec<Token>, LexError> {
    let mut lexer = Lexer { input, pos: 0 };
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token()?;
        let done = token.kind == TokenKind::Eof;
        tokens.push(token);
        if done {
            return Ok(tokens);
        }
    }
}
