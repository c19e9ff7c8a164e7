//! EL lexer and recursive-descent parser.
//!
//! Operator precedence (lowest → highest):
//!   switch  →  range  →  or  →  and  →  bitor  →  bitxor  →  bitand  →
//!   equality  →  relational  →  shift  →  additive  →  multiplicative  →
//!   unary  →  postfix  →  primary
//!
//! Two modes are supported. [`ParserMode::Strict`] requires the whole input
//! to form one expression and every switch default to be the last case.
//! [`ParserMode::Lenient`] stops after the first complete expression and
//! moves misplaced defaults behind the conditional cases.

use std::collections::VecDeque;
use std::fmt;

use tracing::{debug, trace};

use super::error::SyntaxError;
use super::expr::{BinaryOp, ExpressionKind, ExpressionNode, Location, LogicalOp, UnaryOp};
use super::value::Value;

/// Maximum nesting of sub-expressions: parentheses, collections, switches,
/// subscripts and unary operators.
pub const MAX_NESTING_DEPTH: usize = 128;

/// Maximum number of chained binary operators on one path through the tree,
/// e.g. the `+` links of `1 + 2 + ... + n`.
pub const MAX_CHAINED_OPERATORS: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParserMode {
    #[default]
    Strict,
    Lenient,
}

// ── Token ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum Token {
    // Literals
    Number(f64),
    Str(String),
    Ident(String),
    True,
    False,
    Null,

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Bang,
    Tilde,
    Ampersand,
    Pipe,
    Caret,
    ShiftLeft,
    ShiftRight,

    // Comparison
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,

    // Logical
    And,
    Or,

    // Misc
    Arrow,
    DotDot,
    Dot,
    Comma,
    Colon,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Token::Number(n) => return write!(f, "number {}", Value::Number(*n)),
            Token::Str(s) => return write!(f, "string {}", Value::from(s.as_str())),
            Token::Ident(name) => return write!(f, "identifier '{name}'"),
            Token::Eof => return f.write_str("end of input"),
            Token::True => "true",
            Token::False => "false",
            Token::Null => "null",
            Token::Plus => "+",
            Token::Minus => "-",
            Token::Star => "*",
            Token::Slash => "/",
            Token::Percent => "%",
            Token::Bang => "!",
            Token::Tilde => "~",
            Token::Ampersand => "&",
            Token::Pipe => "|",
            Token::Caret => "^",
            Token::ShiftLeft => "<<",
            Token::ShiftRight => ">>",
            Token::Eq => "==",
            Token::Ne => "!=",
            Token::Lt => "<",
            Token::Le => "<=",
            Token::Gt => ">",
            Token::Ge => ">=",
            Token::And => "&&",
            Token::Or => "||",
            Token::Arrow => "->",
            Token::DotDot => "..",
            Token::Dot => ".",
            Token::Comma => ",",
            Token::Colon => ":",
            Token::LParen => "(",
            Token::RParen => ")",
            Token::LBracket => "[",
            Token::RBracket => "]",
            Token::LBrace => "{",
            Token::RBrace => "}",
        };
        write!(f, "'{symbol}'")
    }
}

#[derive(Debug, Clone)]
struct Spanned {
    token: Token,
    location: Location,
}

// ── Lexer ─────────────────────────────────────────────────────────────────────

struct Lexer {
    src: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
    origin: Location,
}

impl Lexer {
    fn new(src: &str, origin: Location) -> Self {
        Lexer {
            src: src.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
            origin,
        }
    }

    fn peek_n(&self, n: usize) -> Option<char> {
        self.src.get(self.pos + n).copied()
    }

    fn peek(&self) -> Option<char> {
        self.peek_n(0)
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek();
        if let Some(c) = ch {
            self.pos += 1;
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        ch
    }

    fn eat(&mut self, ch: char) -> bool {
        if self.peek() == Some(ch) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Current position, translated relative to the origin.
    fn location(&self) -> Location {
        let column = if self.line == 1 {
            self.origin.column + self.column - 1
        } else {
            self.column
        };
        Location {
            file: self.origin.file.clone(),
            line: self.origin.line + self.line - 1,
            column,
        }
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.advance();
        }
    }

    fn read_digits(&mut self, s: &mut String) {
        while let Some(c) = self.peek().filter(char::is_ascii_digit) {
            s.push(c);
            self.advance();
        }
    }

    fn read_number(&mut self, first: char, start: &Location) -> Result<Token, SyntaxError> {
        // Hex literal
        if first == '0' && matches!(self.peek(), Some('x' | 'X')) {
            self.advance();
            let mut hex = String::new();
            while let Some(c) = self.peek().filter(char::is_ascii_hexdigit) {
                hex.push(c);
                self.advance();
            }
            return i64::from_str_radix(&hex, 16)
                .map(|n| Token::Number(n as f64))
                .map_err(|_| SyntaxError::new(start.clone(), "malformed hexadecimal literal"));
        }

        let mut s = String::from(first);
        self.read_digits(&mut s);
        // A '.' only starts a fraction when a digit follows; `1..2` is a range.
        if self.peek() == Some('.') && matches!(self.peek_n(1), Some(c) if c.is_ascii_digit()) {
            s.push('.');
            self.advance();
            self.read_digits(&mut s);
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            let exponent_follows = match self.peek_n(1) {
                Some(c) if c.is_ascii_digit() => true,
                Some('+' | '-') => matches!(self.peek_n(2), Some(c) if c.is_ascii_digit()),
                _ => false,
            };
            if exponent_follows {
                s.push('e');
                self.advance();
                if let Some(sign @ ('+' | '-')) = self.peek() {
                    s.push(sign);
                    self.advance();
                }
                self.read_digits(&mut s);
            }
        }

        s.parse()
            .map(Token::Number)
            .map_err(|_| SyntaxError::new(start.clone(), format!("malformed number '{s}'")))
    }

    fn read_string(&mut self, quote: char, start: &Location) -> Result<Token, SyntaxError> {
        let mut s = String::new();
        loop {
            match self.advance() {
                None => return Err(SyntaxError::new(start.clone(), "unterminated string")),
                Some('\\') => match self.advance() {
                    Some('n') => s.push('\n'),
                    Some('t') => s.push('\t'),
                    Some('r') => s.push('\r'),
                    Some(c) => s.push(c),
                    None => return Err(SyntaxError::new(start.clone(), "unterminated string")),
                },
                Some(c) if c == quote => break,
                Some(c) => s.push(c),
            }
        }
        Ok(Token::Str(s))
    }

    fn read_ident(&mut self, first: char) -> Token {
        let mut s = String::from(first);
        while let Some(c) = self.peek().filter(|c| c.is_ascii_alphanumeric() || *c == '_') {
            s.push(c);
            self.advance();
        }
        match s.as_str() {
            "true" => Token::True,
            "false" => Token::False,
            "null" => Token::Null,
            _ => Token::Ident(s),
        }
    }

    fn next_token(&mut self) -> Result<Spanned, SyntaxError> {
        self.skip_ws();
        let location = self.location();
        let Some(ch) = self.advance() else {
            return Ok(Spanned {
                token: Token::Eof,
                location,
            });
        };

        let token = match ch {
            '0'..='9' => self.read_number(ch, &location)?,
            '"' | '\'' => self.read_string(ch, &location)?,
            c if c.is_ascii_alphabetic() || c == '_' => self.read_ident(c),
            '+' => Token::Plus,
            '-' => {
                if self.eat('>') {
                    Token::Arrow
                } else {
                    Token::Minus
                }
            }
            '*' => Token::Star,
            '/' => Token::Slash,
            '%' => Token::Percent,
            '!' => {
                if self.eat('=') {
                    Token::Ne
                } else {
                    Token::Bang
                }
            }
            '~' => Token::Tilde,
            '^' => Token::Caret,
            '&' => {
                if self.eat('&') {
                    Token::And
                } else {
                    Token::Ampersand
                }
            }
            '|' => {
                if self.eat('|') {
                    Token::Or
                } else {
                    Token::Pipe
                }
            }
            '<' => {
                if self.eat('<') {
                    Token::ShiftLeft
                } else if self.eat('=') {
                    Token::Le
                } else {
                    Token::Lt
                }
            }
            '>' => {
                if self.eat('>') {
                    Token::ShiftRight
                } else if self.eat('=') {
                    Token::Ge
                } else {
                    Token::Gt
                }
            }
            '=' if self.eat('=') => Token::Eq,
            '.' => {
                if self.eat('.') {
                    Token::DotDot
                } else {
                    Token::Dot
                }
            }
            ',' => Token::Comma,
            ':' => Token::Colon,
            '(' => Token::LParen,
            ')' => Token::RParen,
            '[' => Token::LBracket,
            ']' => Token::RBracket,
            '{' => Token::LBrace,
            '}' => Token::RBrace,
            c => return Err(SyntaxError::new(location, format!("unexpected character '{c}'"))),
        };
        Ok(Spanned { token, location })
    }
}

// ── Parser ────────────────────────────────────────────────────────────────────

#[derive(Clone, Copy)]
enum Infix {
    Logical(LogicalOp),
    Binary(BinaryOp),
}

impl Infix {
    fn node(self, lhs: ExpressionNode, rhs: ExpressionNode) -> ExpressionNode {
        let location = lhs.location().cloned();
        let kind = match self {
            Infix::Logical(op) => ExpressionKind::Logical(op, Box::new(lhs), Box::new(rhs)),
            Infix::Binary(op) => ExpressionKind::Binary(op, Box::new(lhs), Box::new(rhs)),
        };
        ExpressionNode::new(kind, location)
    }
}

/// Infix operator for `token` with its precedence; higher binds tighter.
fn infix_op(token: &Token) -> Option<(Infix, u8)> {
    let (op, precedence) = match token {
        Token::Or => return Some((Infix::Logical(LogicalOp::Or), 1)),
        Token::And => return Some((Infix::Logical(LogicalOp::And), 2)),
        Token::Pipe => (BinaryOp::BitOr, 3),
        Token::Caret => (BinaryOp::BitXor, 4),
        Token::Ampersand => (BinaryOp::BitAnd, 5),
        Token::Eq => (BinaryOp::Eq, 6),
        Token::Ne => (BinaryOp::Ne, 6),
        Token::Lt => (BinaryOp::Lt, 7),
        Token::Le => (BinaryOp::Le, 7),
        Token::Gt => (BinaryOp::Gt, 7),
        Token::Ge => (BinaryOp::Ge, 7),
        Token::ShiftLeft => (BinaryOp::Shl, 8),
        Token::ShiftRight => (BinaryOp::Shr, 8),
        Token::Plus => (BinaryOp::Add, 9),
        Token::Minus => (BinaryOp::Sub, 9),
        Token::Star => (BinaryOp::Mul, 10),
        Token::Slash => (BinaryOp::Div, 10),
        Token::Percent => (BinaryOp::Rem, 10),
        _ => return None,
    };
    Some((Infix::Binary(op), precedence))
}

fn is_default_case(case: &ExpressionNode) -> bool {
    !matches!(case.kind(), ExpressionKind::Case(..))
}

struct Parser {
    lexer: Lexer,
    lookahead: VecDeque<Spanned>,
    mode: ParserMode,
    depth: usize,
    chained: usize,
}

impl Parser {
    fn new(lexer: Lexer, mode: ParserMode) -> Self {
        Parser {
            lexer,
            lookahead: VecDeque::new(),
            mode,
            depth: 0,
            chained: 0,
        }
    }

    /// Make sure at least `n + 1` tokens are buffered (or the input is exhausted).
    fn fill(&mut self, n: usize) -> Result<(), SyntaxError> {
        while self.lookahead.len() <= n {
            let t = self.lexer.next_token()?;
            let done = t.token == Token::Eof;
            self.lookahead.push_back(t);
            if done {
                break;
            }
        }
        Ok(())
    }

    fn peek_at(&mut self, n: usize) -> Result<&Token, SyntaxError> {
        self.fill(n)?;
        Ok(self.lookahead.get(n).map(|s| &s.token).unwrap_or(&Token::Eof))
    }

    fn peek(&mut self) -> Result<&Token, SyntaxError> {
        self.peek_at(0)
    }

    fn advance(&mut self) -> Result<Spanned, SyntaxError> {
        self.fill(0)?;
        match self.lookahead.pop_front() {
            Some(t) => Ok(t),
            None => Ok(Spanned {
                token: Token::Eof,
                location: self.lexer.location(),
            }),
        }
    }

    fn eat(&mut self, expected: &Token) -> Result<bool, SyntaxError> {
        if self.peek()? == expected {
            self.advance()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn expect(&mut self, expected: &Token, what: &str) -> Result<Location, SyntaxError> {
        let next = self.advance()?;
        if &next.token == expected {
            Ok(next.location)
        } else {
            Err(SyntaxError::new(
                next.location,
                format!("expected {what} but found {}", next.token),
            ))
        }
    }

    fn enter(&mut self, location: &Location) -> Result<(), SyntaxError> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(SyntaxError::new(location.clone(), "expression is nested too deeply"));
        }
        self.depth += 1;
        Ok(())
    }

    // ── Grammar ───────────────────────────────────────────────────────────────

    fn parse_root(&mut self) -> Result<ExpressionNode, SyntaxError> {
        let expr = self.parse_expr()?;
        match (self.advance(), self.mode) {
            (Ok(next), _) if next.token == Token::Eof => {}
            (Ok(next), ParserMode::Strict) => {
                return Err(SyntaxError::new(
                    next.location,
                    format!("unexpected {} after end of expression", next.token),
                ));
            }
            (Err(e), ParserMode::Strict) => return Err(e),
            (Ok(next), ParserMode::Lenient) => {
                debug!(location = %next.location, "ignoring input after end of expression");
            }
            (Err(e), ParserMode::Lenient) => {
                debug!(error = %e, "ignoring malformed input after end of expression");
            }
        }
        Ok(expr)
    }

    fn parse_expr(&mut self) -> Result<ExpressionNode, SyntaxError> {
        self.fill(0)?;
        let location = self.lookahead[0].location.clone();
        self.enter(&location)?;
        let result = self.parse_range();
        self.depth -= 1;
        result
    }

    fn parse_range(&mut self) -> Result<ExpressionNode, SyntaxError> {
        let from = self.parse_binary(1)?;
        if self.eat(&Token::DotDot)? {
            let to = self.parse_binary(1)?;
            let location = from.location().cloned();
            return Ok(ExpressionNode::new(
                ExpressionKind::Range(Box::new(from), Box::new(to)),
                location,
            ));
        }
        Ok(from)
    }

    fn parse_binary(&mut self, min_precedence: u8) -> Result<ExpressionNode, SyntaxError> {
        let chained = self.chained;
        let result = self.parse_binary_chain(min_precedence);
        self.chained = chained;
        result
    }

    /// Precedence climbing over left-associative operators. Each link
    /// deepens the left spine, so links are counted against
    /// [`MAX_CHAINED_OPERATORS`].
    fn parse_binary_chain(&mut self, min_precedence: u8) -> Result<ExpressionNode, SyntaxError> {
        let mut lhs = self.parse_unary()?;
        while let Some((op, precedence)) =
            infix_op(self.peek()?).filter(|&(_, p)| p >= min_precedence)
        {
            let operator = self.advance()?;
            if self.chained >= MAX_CHAINED_OPERATORS {
                return Err(SyntaxError::new(
                    operator.location,
                    "expression has too many chained operators",
                ));
            }
            self.chained += 1;
            let rhs = self.parse_binary(precedence + 1)?;
            lhs = op.node(lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<ExpressionNode, SyntaxError> {
        let op = match self.peek()? {
            Token::Plus => UnaryOp::Plus,
            Token::Minus => UnaryOp::Neg,
            Token::Bang => UnaryOp::Not,
            Token::Tilde => UnaryOp::BitNot,
            _ => return self.parse_postfix(),
        };
        let operator = self.advance()?;
        self.enter(&operator.location)?;
        let operand = self.parse_unary();
        self.depth -= 1;
        let operand = operand?;

        // Fold negative number literals so that `-1` is a literal.
        if let (UnaryOp::Neg, ExpressionKind::Literal(Value::Number(n))) = (op, operand.kind()) {
            return Ok(ExpressionNode::new(
                ExpressionKind::Literal(Value::Number(-n)),
                Some(operator.location),
            ));
        }
        Ok(ExpressionNode::new(
            ExpressionKind::Unary(op, Box::new(operand)),
            Some(operator.location),
        ))
    }

    fn parse_postfix(&mut self) -> Result<ExpressionNode, SyntaxError> {
        let depth = self.depth;
        let result = self.parse_postfix_chain();
        self.depth = depth;
        result
    }

    fn parse_postfix_chain(&mut self) -> Result<ExpressionNode, SyntaxError> {
        let mut expr = self.parse_primary()?;
        loop {
            let index = match self.peek()? {
                Token::LBracket => {
                    let open = self.advance()?;
                    self.enter(&open.location)?;
                    let index = self.parse_expr()?;
                    self.expect(&Token::RBracket, "']'")?;
                    index
                }
                Token::Dot => {
                    let dot = self.advance()?;
                    self.enter(&dot.location)?;
                    let name = self.advance()?;
                    let Token::Ident(member) = name.token else {
                        return Err(SyntaxError::new(
                            name.location,
                            format!("expected member name but found {}", name.token),
                        ));
                    };
                    ExpressionNode::new(
                        ExpressionKind::Literal(Value::String(member)),
                        Some(name.location),
                    )
                }
                _ => break,
            };
            let location = expr.location().cloned();
            expr = ExpressionNode::new(
                ExpressionKind::Subscript(Box::new(expr), Box::new(index)),
                location,
            );
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<ExpressionNode, SyntaxError> {
        let t = self.advance()?;
        let value = match t.token {
            Token::Number(n) => Value::Number(n),
            Token::Str(s) => Value::String(s),
            Token::True => Value::Boolean(true),
            Token::False => Value::Boolean(false),
            Token::Null => Value::Null,
            Token::Ident(name) => {
                return Ok(ExpressionNode::new(
                    ExpressionKind::Variable(name),
                    Some(t.location),
                ));
            }
            Token::LParen => {
                let inner = self.parse_expr()?;
                self.expect(&Token::RParen, "')'")?;
                return Ok(inner);
            }
            Token::LBracket => return self.parse_array(t.location),
            Token::LBrace => {
                if self.peek()? == &Token::LBrace {
                    self.advance()?;
                    return self.parse_switch(t.location);
                }
                return self.parse_map(t.location);
            }
            other => return Err(SyntaxError::new(t.location, format!("unexpected {other}"))),
        };
        Ok(ExpressionNode::new(ExpressionKind::Literal(value), Some(t.location)))
    }

    fn parse_array(&mut self, location: Location) -> Result<ExpressionNode, SyntaxError> {
        let mut elements = Vec::new();
        if self.peek()? != &Token::RBracket {
            loop {
                elements.push(self.parse_expr()?);
                if !self.eat(&Token::Comma)? {
                    break;
                }
            }
        }
        self.expect(&Token::RBracket, "',' or ']'")?;
        Ok(ExpressionNode::new(ExpressionKind::Array(elements), Some(location)))
    }

    fn parse_map(&mut self, location: Location) -> Result<ExpressionNode, SyntaxError> {
        let mut entries = Vec::new();
        if self.peek()? != &Token::RBrace {
            loop {
                let key = self.advance()?;
                let key = match key.token {
                    Token::Str(s) | Token::Ident(s) => s,
                    other => {
                        return Err(SyntaxError::new(
                            key.location,
                            format!("expected map key but found {other}"),
                        ));
                    }
                };
                self.expect(&Token::Colon, "':'")?;
                entries.push((key, self.parse_expr()?));
                if !self.eat(&Token::Comma)? {
                    break;
                }
            }
        }
        self.expect(&Token::RBrace, "',' or '}'")?;
        Ok(ExpressionNode::new(ExpressionKind::Map(entries), Some(location)))
    }

    fn parse_switch(&mut self, location: Location) -> Result<ExpressionNode, SyntaxError> {
        let mut cases = Vec::new();
        loop {
            cases.push(self.parse_case()?);
            if !self.eat(&Token::Comma)? {
                break;
            }
        }
        self.expect(&Token::RBrace, "',' or '}}'")?;
        self.expect(&Token::RBrace, "'}}'")?;
        let cases = self.order_cases(cases)?;
        Ok(ExpressionNode::switch(cases, Some(location)))
    }

    fn parse_case(&mut self) -> Result<ExpressionNode, SyntaxError> {
        let condition = self.parse_expr()?;
        if !self.eat(&Token::Arrow)? {
            return Ok(condition);
        }
        let value = self.parse_expr()?;
        let location = condition.location().cloned();
        Ok(ExpressionNode::new(
            ExpressionKind::Case(Box::new(condition), Box::new(value)),
            location,
        ))
    }

    fn order_cases(&self, cases: Vec<ExpressionNode>) -> Result<Vec<ExpressionNode>, SyntaxError> {
        let Some(index) = cases.iter().position(is_default_case) else {
            return Ok(cases);
        };
        if index + 1 == cases.len() {
            return Ok(cases);
        }
        match self.mode {
            ParserMode::Strict => Err(SyntaxError::new(
                cases[index].location().cloned().unwrap_or_default(),
                "default case must be the last case",
            )),
            ParserMode::Lenient => {
                debug!(
                    location = ?cases[index].location(),
                    "moving default case behind conditional cases"
                );
                let (conditional, defaults): (Vec<_>, Vec<_>) =
                    cases.into_iter().partition(|c| !is_default_case(c));
                Ok(conditional.into_iter().chain(defaults).collect())
            }
        }
    }
}

/// Parse an EL expression.
pub fn parse(source: &str, mode: ParserMode) -> Result<ExpressionNode, SyntaxError> {
    parse_at(source, mode, Location::default())
}

/// Parse an EL expression whose first character sits at `origin`.
///
/// All node and error locations are reported relative to `origin`, which lets
/// an expression embedded in a larger text point into that text.
pub fn parse_at(
    source: &str,
    mode: ParserMode,
    origin: Location,
) -> Result<ExpressionNode, SyntaxError> {
    trace!(source, ?mode, "parsing expression");
    Parser::new(Lexer::new(source, origin), mode).parse_root()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
