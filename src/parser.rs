//! Recursive-descent parser for filter expressions.
//!
//! ## Grammar
//!
//! From loosest to tightest binding:
//!
//! ```text
//! filter     := or_expr ( '|' stage )*
//! stage      := 'sort' path ( 'asc' | 'desc' )?
//!             | 'limit' integer
//! or_expr    := and_expr ( 'or' and_expr )*
//! and_expr   := comparison ( 'and' comparison )*
//! comparison := unary ( ( '==' | '!=' | '<' | '<=' | '>' | '>=' ) unary )?
//! unary      := 'not' unary | primary
//! primary    := literal | 'all' | path | name '(' args? ')' | '(' or_expr ')'
//! ```
//!
//! `and` binds tighter than `or`, so `a or b and c` is `a or (b and c)`.
//! Comparisons don't chain: `a == b == c` is rejected rather than guessed at.
//! Because `not` binds tighter than a comparison, negate a comparison with
//! parentheses: `not (exif.make == 'Canon')`.
//!
//! ## Diagnostics
//!
//! Errors carry the source string and the position of the offending token,
//! rendered with a caret underline:
//!
//! ```text
//! Filter parse error at position 15: Unexpected token 'xyz'
//! Expression: exif.make == xyz
//!                          ^^^
//! ```
//!
//! The reported position is where the parser stopped reading: the last byte
//! of the offending token, or the input length at end of input. The carets
//! sit under the whole token, counted in characters so text before it may
//! be non-ASCII.

use crate::ast::{CompareOp, CompiledFilter, LogicalOp, Node, PipeStage};
use crate::functions::Function;
use crate::lexer::{self, LexError, Token, TokenKind};
use crate::resolve::DIRECT_FIELDS;
use crate::sort::SortDirection;
use crate::value::Value;
use std::fmt;

const EXPRESSION_LABEL: &str = "Expression: ";

/// A syntax error in a filter expression.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    message: String,
    position: usize,
    caret_start: usize,
    caret_len: usize,
    expression: String,
}

impl ParseError {
    fn new(
        message: impl Into<String>,
        position: usize,
        caret_start: usize,
        caret_len: usize,
        expression: &str,
    ) -> Self {
        Self {
            message: message.into(),
            position,
            caret_start,
            caret_len,
            expression: expression.to_string(),
        }
    }

    fn from_lex(err: LexError, expression: &str) -> Self {
        let offset = err.offset();
        Self::new(err.to_string(), offset, offset, err.width(), expression)
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// 0-based byte offset into [`expression`](Self::expression).
    pub fn position(&self) -> usize {
        self.position
    }

    /// The complete filter string that failed to parse.
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Three-line diagnostic with a caret underline.
    pub fn render(&self) -> String {
        let start = self.caret_start.min(self.expression.len());
        let end = (start + self.caret_len).min(self.expression.len());
        let indent = self.expression.get(..start).map_or(start, |s| s.chars().count());
        let width = self.expression.get(start..end).map_or(1, |s| s.chars().count());
        format!(
            "Filter parse error at position {}: {}\n{EXPRESSION_LABEL}{}\n{}{}",
            self.position,
            self.message,
            self.expression,
            " ".repeat(EXPRESSION_LABEL.len() + indent),
            "^".repeat(width.max(1)),
        )
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl std::error::Error for ParseError {}

/// Parse a filter string into a predicate and its pipe stages.
pub fn parse(input: &str) -> Result<CompiledFilter, ParseError> {
    let tokens = lexer::tokenize(input).map_err(|e| ParseError::from_lex(e, input))?;
    let mut parser = Parser {
        input,
        tokens,
        pos: 0,
    };
    parser.filter()
}

struct Parser<'a> {
    input: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> &Token {
        // tokenize() always ends with Eof, and advance() never moves past it
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_kind(&self) -> &TokenKind {
        &self.peek().kind
    }

    fn peek_next_kind(&self) -> &TokenKind {
        &self.tokens[(self.pos + 1).min(self.tokens.len() - 1)].kind
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek_kind() == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    fn text(&self, token: &Token) -> &'a str {
        &self.input[token.offset..token.offset + token.len]
    }

    /// Error pointing at `token`.
    fn error_at(&self, token: &Token, message: impl Into<String>) -> ParseError {
        let (position, caret_start) = match token.kind {
            TokenKind::Eof => (self.input.len(), self.input.len()),
            _ => (token.offset + token.len.saturating_sub(1), token.offset),
        };
        ParseError::new(message, position, caret_start, token.len, self.input)
    }

    fn unexpected(&self, token: &Token) -> ParseError {
        match token.kind {
            TokenKind::Eof => self.error_at(token, "Unexpected end of expression"),
            _ => self.error_at(token, format!("Unexpected token '{}'", self.text(token))),
        }
    }

    fn filter(&mut self) -> Result<CompiledFilter, ParseError> {
        if self.peek_kind() == &TokenKind::Eof {
            let token = self.peek().clone();
            return Err(self.error_at(&token, "Empty filter expression"));
        }
        let predicate = self.or_expr()?;
        let mut pipeline = Vec::new();
        while self.eat(&TokenKind::Pipe) {
            pipeline.push(self.stage()?);
        }
        let token = self.advance();
        if token.kind != TokenKind::Eof {
            return Err(self.unexpected(&token));
        }
        Ok(CompiledFilter {
            predicate,
            pipeline,
        })
    }

    fn stage(&mut self) -> Result<PipeStage, ParseError> {
        let token = self.advance();
        match token.kind {
            TokenKind::Sort => {
                let field_token = self.advance();
                let TokenKind::Ident(name) = &field_token.kind else {
                    return Err(self.error_at(&field_token, "Expected a field name after 'sort'"));
                };
                let field = self.path(&field_token, name)?;
                let direction = if self.eat(&TokenKind::Desc) {
                    SortDirection::Desc
                } else {
                    self.eat(&TokenKind::Asc);
                    SortDirection::Asc
                };
                Ok(PipeStage::Sort { field, direction })
            }
            TokenKind::Limit => {
                let count_token = self.advance();
                match count_token.kind {
                    TokenKind::Number(n) if n >= 0.0 && n.fract() == 0.0 => {
                        Ok(PipeStage::Limit(n as usize))
                    }
                    _ => Err(self.error_at(&count_token, "limit expects a non-negative integer")),
                }
            }
            _ => Err(self.error_at(&token, "Expected 'sort' or 'limit' after '|'")),
        }
    }

    fn or_expr(&mut self) -> Result<Node, ParseError> {
        let mut left = self.and_expr()?;
        while self.eat(&TokenKind::Or) {
            let right = self.and_expr()?;
            left = Node::Logical {
                op: LogicalOp::Or,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> Result<Node, ParseError> {
        let mut left = self.comparison()?;
        while self.eat(&TokenKind::And) {
            let right = self.comparison()?;
            left = Node::Logical {
                op: LogicalOp::And,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn compare_op(&self) -> Option<CompareOp> {
        Some(match self.peek_kind() {
            TokenKind::Eq => CompareOp::Eq,
            TokenKind::Ne => CompareOp::Ne,
            TokenKind::Lt => CompareOp::Lt,
            TokenKind::Le => CompareOp::Le,
            TokenKind::Gt => CompareOp::Gt,
            TokenKind::Ge => CompareOp::Ge,
            _ => return None,
        })
    }

    fn comparison(&mut self) -> Result<Node, ParseError> {
        let left = self.unary()?;
        let Some(op) = self.compare_op() else {
            return Ok(left);
        };
        self.advance();
        let right = self.unary()?;
        if self.compare_op().is_some() {
            let token = self.peek().clone();
            return Err(self.error_at(&token, "Comparison operators cannot be chained"));
        }
        Ok(Node::Compare {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    fn unary(&mut self) -> Result<Node, ParseError> {
        if self.eat(&TokenKind::Not) {
            return Ok(Node::Not(Box::new(self.unary()?)));
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Node, ParseError> {
        let token = self.advance();
        match &token.kind {
            TokenKind::Str(s) => Ok(Node::Literal(Value::String(s.clone()))),
            TokenKind::Number(n) => Ok(Node::Literal(Value::Number(*n))),
            TokenKind::Null => Ok(Node::Literal(Value::Null)),
            TokenKind::True => Ok(Node::Literal(Value::Bool(true))),
            TokenKind::False => Ok(Node::Literal(Value::Bool(false))),
            TokenKind::All => Ok(Node::All),
            TokenKind::LParen => {
                let inner = self.or_expr()?;
                let close = self.advance();
                match close.kind {
                    TokenKind::RParen => Ok(inner),
                    TokenKind::Eof => {
                        Err(self.error_at(&close, "Unbalanced parentheses: expected ')'"))
                    }
                    _ => Err(self.error_at(
                        &close,
                        format!("Expected ')' but found '{}'", self.text(&close)),
                    )),
                }
            }
            TokenKind::Ident(name) if self.peek_kind() == &TokenKind::LParen => {
                self.call(&token, name)
            }
            TokenKind::Ident(name) => {
                let path = self.path(&token, name)?;
                // A lone unknown word is almost always a string missing its quotes
                if path.len() == 1 && !DIRECT_FIELDS.contains(&path[0].as_str()) {
                    return Err(self.unexpected(&token));
                }
                Ok(Node::Property(path))
            }
            _ => Err(self.unexpected(&token)),
        }
    }

    fn path(&self, token: &Token, name: &str) -> Result<Vec<String>, ParseError> {
        let segments: Vec<String> = name.split('.').map(str::to_string).collect();
        if segments.iter().any(String::is_empty) {
            return Err(self.error_at(token, format!("Malformed property path '{name}'")));
        }
        Ok(segments)
    }

    fn call(&mut self, name_token: &Token, name: &str) -> Result<Node, ParseError> {
        let Some(function) = Function::from_name(name) else {
            return Err(self.error_at(name_token, format!("Unknown function '{name}'")));
        };
        self.advance(); // '('
        let mut args = Vec::new();
        if !self.eat(&TokenKind::RParen) {
            loop {
                args.push(self.or_expr()?);
                let token = self.advance();
                match token.kind {
                    TokenKind::Comma => continue,
                    TokenKind::RParen => break,
                    TokenKind::Eof => {
                        return Err(self.error_at(&token, "Unbalanced parentheses: expected ')'"));
                    }
                    _ => return Err(self.unexpected(&token)),
                }
            }
        }
        if args.len() != function.arity() {
            return Err(self.error_at(
                name_token,
                format!(
                    "{}() takes {} argument(s), found {}",
                    function.name(),
                    function.arity(),
                    args.len()
                ),
            ));
        }
        Ok(Node::Call { function, args })
    }
}
