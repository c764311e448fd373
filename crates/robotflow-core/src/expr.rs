//! The restricted expression language used by condition and value fields.
//!
//! Supported: integer, float and quoted string literals, `true`/`false` in
//! any case, variable identifiers, `+ - * / %`, comparisons (chainable, as in
//! Python), `and`/`or`/`not` with `&&`/`||`/`!` as aliases, and parentheses.
//!
//! An [`Expr`] is parsed once and then either rendered as canonical Python
//! source ([`Expr::render_python`]) or evaluated against a variable scope
//! ([`Expr::eval`]). Evaluation follows Python semantics: `/` always yields a
//! float, `%` takes the sign of the divisor, `and`/`or` short-circuit and
//! return an operand.

use std::cmp::Ordering;
use std::collections::HashMap;

use indexmap::IndexMap;
use thiserror::Error;

use crate::ident::sanitize_identifier;
use crate::types::{Value, ValueType};

/// Maximum parenthesis/unary nesting accepted by the parser.
const MAX_NESTING: usize = 64;

/// Maximum number of tokens in one expression.
const MAX_TOKENS: usize = 1024;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised while parsing expression source. Positions are byte offsets.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("empty expression")]
    Empty,

    #[error("unexpected character '{ch}' at {pos}")]
    UnexpectedChar { ch: char, pos: usize },

    #[error("unterminated string starting at {pos}")]
    UnterminatedString { pos: usize },

    #[error("invalid number '{text}' at {pos}")]
    BadNumber { text: String, pos: usize },

    #[error("unexpected '{found}' at {pos}")]
    UnexpectedToken { found: String, pos: usize },

    #[error("unexpected end of expression")]
    UnexpectedEnd,

    #[error("expression nested deeper than {MAX_NESTING} levels")]
    TooDeep,

    #[error("expression longer than {MAX_TOKENS} tokens")]
    TooLong,
}

/// Errors raised while evaluating a parsed expression.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("unknown variable '{name}'")]
    UnknownVariable { name: String },

    #[error("unsupported operand types for {op}: {left} and {right}")]
    TypeMismatch {
        op: &'static str,
        left: ValueType,
        right: ValueType,
    },

    #[error("bad operand type for unary {op}: {ty}")]
    BadOperand { op: &'static str, ty: ValueType },

    #[error("division by zero")]
    DivisionByZero,

    #[error("integer overflow")]
    Overflow,
}

// ---------------------------------------------------------------------------
// AST
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl ArithOp {
    fn symbol(&self) -> &'static str {
        match self {
            ArithOp::Add => "+",
            ArithOp::Sub => "-",
            ArithOp::Mul => "*",
            ArithOp::Div => "/",
            ArithOp::Rem => "%",
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            ArithOp::Add | ArithOp::Sub => PREC_ADD,
            ArithOp::Mul | ArithOp::Div | ArithOp::Rem => PREC_MUL,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    fn symbol(&self) -> &'static str {
        match self {
            CmpOp::Eq => "==",
            CmpOp::Ne => "!=",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicOp {
    And,
    Or,
}

/// A parsed expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Var(String),
    Neg(Box<Expr>),
    Not(Box<Expr>),
    Arith {
        op: ArithOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// `first op0 e0 op1 e1 ...`, true when every adjacent pair holds.
    Compare {
        first: Box<Expr>,
        rest: Vec<(CmpOp, Expr)>,
    },
    Logic {
        op: LogicOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

const PREC_OR: u8 = 1;
const PREC_AND: u8 = 2;
const PREC_NOT: u8 = 3;
const PREC_CMP: u8 = 4;
const PREC_ADD: u8 = 5;
const PREC_MUL: u8 = 6;
const PREC_NEG: u8 = 7;
const PREC_ATOM: u8 = 8;

// ---------------------------------------------------------------------------
// Lexer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    Ident(String),
    And,
    Or,
    Not,
    Arith(ArithOp),
    Cmp(CmpOp),
    LParen,
    RParen,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Int(i) => i.to_string(),
            Token::Float(f) => f.to_string(),
            Token::Str(s) => format!("{s:?}"),
            Token::Bool(b) => b.to_string(),
            Token::Ident(name) => name.clone(),
            Token::And => "and".into(),
            Token::Or => "or".into(),
            Token::Not => "not".into(),
            Token::Arith(op) => op.symbol().into(),
            Token::Cmp(op) => op.symbol().into(),
            Token::LParen => "(".into(),
            Token::RParen => ")".into(),
        }
    }
}

fn lex(src: &str) -> Result<Vec<(usize, Token)>, ParseError> {
    let chars: Vec<(usize, char)> = src.char_indices().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let (pos, c) = chars[i];
        let next = chars.get(i + 1).map(|&(_, c)| c);

        if c.is_whitespace() {
            i += 1;
            continue;
        }

        let token = if c.is_ascii_digit() || (c == '.' && next.is_some_and(|n| n.is_ascii_digit())) {
            let start = i;
            while i < chars.len() && (chars[i].1.is_ascii_digit() || chars[i].1 == '.') {
                i += 1;
            }
            let text: String = chars[start..i].iter().map(|&(_, c)| c).collect();
            let bad = || ParseError::BadNumber {
                text: text.clone(),
                pos,
            };
            let token = if text.contains('.') {
                Token::Float(text.parse().map_err(|_| bad())?)
            } else {
                Token::Int(text.parse().map_err(|_| bad())?)
            };
            tokens.push((pos, token));
            continue;
        } else if c.is_ascii_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].1.is_ascii_alphanumeric() || chars[i].1 == '_') {
                i += 1;
            }
            let word: String = chars[start..i].iter().map(|&(_, c)| c).collect();
            let token = match word.as_str() {
                "and" => Token::And,
                "or" => Token::Or,
                "not" => Token::Not,
                w if w.eq_ignore_ascii_case("true") => Token::Bool(true),
                w if w.eq_ignore_ascii_case("false") => Token::Bool(false),
                _ => Token::Ident(word.clone()),
            };
            tokens.push((pos, token));
            continue;
        } else if c == '"' || c == '\'' {
            let quote = c;
            let mut text = String::new();
            i += 1;
            loop {
                let Some(&(_, ch)) = chars.get(i) else {
                    return Err(ParseError::UnterminatedString { pos });
                };
                i += 1;
                if ch == quote {
                    break;
                }
                if ch == '\\' {
                    let Some(&(_, esc)) = chars.get(i) else {
                        return Err(ParseError::UnterminatedString { pos });
                    };
                    i += 1;
                    text.push(match esc {
                        'n' => '\n',
                        't' => '\t',
                        'r' => '\r',
                        other => other,
                    });
                } else {
                    text.push(ch);
                }
            }
            tokens.push((pos, Token::Str(text)));
            continue;
        } else {
            let two = next.map(|n| [c, n]);
            let (token, width) = match (c, two) {
                (_, Some(['&', '&'])) => (Token::And, 2),
                (_, Some(['|', '|'])) => (Token::Or, 2),
                (_, Some(['=', '='])) => (Token::Cmp(CmpOp::Eq), 2),
                (_, Some(['!', '='])) => (Token::Cmp(CmpOp::Ne), 2),
                (_, Some(['<', '='])) => (Token::Cmp(CmpOp::Le), 2),
                (_, Some(['>', '='])) => (Token::Cmp(CmpOp::Ge), 2),
                ('<', _) => (Token::Cmp(CmpOp::Lt), 1),
                ('>', _) => (Token::Cmp(CmpOp::Gt), 1),
                ('!', _) => (Token::Not, 1),
                ('+', _) => (Token::Arith(ArithOp::Add), 1),
                ('-', _) => (Token::Arith(ArithOp::Sub), 1),
                ('*', _) => (Token::Arith(ArithOp::Mul), 1),
                ('/', _) => (Token::Arith(ArithOp::Div), 1),
                ('%', _) => (Token::Arith(ArithOp::Rem), 1),
                ('(', _) => (Token::LParen, 1),
                (')', _) => (Token::RParen, 1),
                _ => return Err(ParseError::UnexpectedChar { ch: c, pos }),
            };
            i += width;
            token
        };
        tokens.push((pos, token));
    }

    if tokens.len() > MAX_TOKENS {
        return Err(ParseError::TooLong);
    }
    Ok(tokens)
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Parses expression source.
pub fn parse(src: &str) -> Result<Expr, ParseError> {
    let tokens = lex(src)?;
    if tokens.is_empty() {
        return Err(ParseError::Empty);
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let expr = parser.or_expr()?;
    match parser.tokens.get(parser.pos) {
        None => Ok(expr),
        Some((pos, tok)) => Err(ParseError::UnexpectedToken {
            found: tok.describe(),
            pos: *pos,
        }),
    }
}

struct Parser {
    tokens: Vec<(usize, Token)>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(_, t)| t)
    }

    fn bump(&mut self) -> Option<(usize, Token)> {
        let tok = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        tok
    }

    fn enter(&mut self) -> Result<(), ParseError> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(ParseError::TooDeep);
        }
        Ok(())
    }

    fn or_expr(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.and_expr()?;
        while self.peek() == Some(&Token::Or) {
            self.bump();
            let rhs = self.and_expr()?;
            lhs = Expr::Logic {
                op: LogicOp::Or,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn and_expr(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.not_expr()?;
        while self.peek() == Some(&Token::And) {
            self.bump();
            let rhs = self.not_expr()?;
            lhs = Expr::Logic {
                op: LogicOp::And,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn not_expr(&mut self) -> Result<Expr, ParseError> {
        if self.peek() == Some(&Token::Not) {
            self.bump();
            self.enter()?;
            let inner = self.not_expr()?;
            self.depth -= 1;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Expr, ParseError> {
        let first = self.additive()?;
        let mut rest = Vec::new();
        while let Some(Token::Cmp(op)) = self.peek() {
            let op = *op;
            self.bump();
            rest.push((op, self.additive()?));
        }
        if rest.is_empty() {
            Ok(first)
        } else {
            Ok(Expr::Compare {
                first: Box::new(first),
                rest,
            })
        }
    }

    fn additive(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.term()?;
        while let Some(Token::Arith(op @ (ArithOp::Add | ArithOp::Sub))) = self.peek() {
            let op = *op;
            self.bump();
            let rhs = self.term()?;
            lhs = Expr::Arith {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn term(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.unary()?;
        while let Some(Token::Arith(op @ (ArithOp::Mul | ArithOp::Div | ArithOp::Rem))) = self.peek() {
            let op = *op;
            self.bump();
            let rhs = self.unary()?;
            lhs = Expr::Arith {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr, ParseError> {
        match self.peek() {
            Some(Token::Arith(ArithOp::Sub)) => {
                self.bump();
                self.enter()?;
                let inner = self.unary()?;
                self.depth -= 1;
                Ok(Expr::Neg(Box::new(inner)))
            }
            Some(Token::Arith(ArithOp::Add)) => {
                self.bump();
                self.enter()?;
                let inner = self.unary()?;
                self.depth -= 1;
                Ok(inner)
            }
            _ => self.atom(),
        }
    }

    fn atom(&mut self) -> Result<Expr, ParseError> {
        let (pos, tok) = self.bump().ok_or(ParseError::UnexpectedEnd)?;
        match tok {
            Token::Int(i) => Ok(Expr::Literal(Value::Int(i))),
            Token::Float(f) => Ok(Expr::Literal(Value::Float(f))),
            Token::Str(s) => Ok(Expr::Literal(Value::Str(s))),
            Token::Bool(b) => Ok(Expr::Literal(Value::Bool(b))),
            Token::Ident(name) => Ok(Expr::Var(name)),
            Token::LParen => {
                self.enter()?;
                let inner = self.or_expr()?;
                self.depth -= 1;
                match self.bump() {
                    Some((_, Token::RParen)) => Ok(inner),
                    Some((pos, tok)) => Err(ParseError::UnexpectedToken {
                        found: tok.describe(),
                        pos,
                    }),
                    None => Err(ParseError::UnexpectedEnd),
                }
            }
            other => Err(ParseError::UnexpectedToken {
                found: other.describe(),
                pos,
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Python rendering
// ---------------------------------------------------------------------------

/// Renders a value as a Python literal.
pub fn python_literal(value: &Value) -> String {
    match value {
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) if f.is_nan() => "float('nan')".to_string(),
        Value::Float(f) if f.is_infinite() && *f > 0.0 => "float('inf')".to_string(),
        Value::Float(f) if f.is_infinite() => "float('-inf')".to_string(),
        Value::Float(f) => format!("{f:?}"),
        Value::Str(s) => python_string(s),
    }
}

/// Quotes and escapes a string as a single-quoted Python literal.
pub fn python_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => out.push_str(&format!("\\x{:02x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// Renders free text as a one-line Python comment, `#` included.
///
/// Line breaks and other control characters are written as escapes, so the
/// text can never end the comment and start a statement.
pub fn python_comment(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push_str("# ");
    for c in text.chars() {
        match c {
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push(' '),
            c if c.is_control() => out.push_str(&format!("\\x{:02x}", c as u32)),
            '\u{2028}' | '\u{2029}' => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out
}

impl Expr {
    fn precedence(&self) -> u8 {
        match self {
            Expr::Literal(Value::Int(i)) if *i < 0 => PREC_NEG,
            Expr::Literal(Value::Float(f)) if *f < 0.0 => PREC_NEG,
            Expr::Literal(_) | Expr::Var(_) => PREC_ATOM,
            Expr::Neg(_) => PREC_NEG,
            Expr::Not(_) => PREC_NOT,
            Expr::Arith { op, .. } => op.precedence(),
            Expr::Compare { .. } => PREC_CMP,
            Expr::Logic { op: LogicOp::And, .. } => PREC_AND,
            Expr::Logic { op: LogicOp::Or, .. } => PREC_OR,
        }
    }

    /// Renders canonical Python source with minimal parentheses. Variable
    /// names are passed through [`sanitize_identifier`].
    pub fn render_python(&self) -> String {
        let mut out = String::new();
        self.render_into(&mut out, 0);
        out
    }

    fn render_into(&self, out: &mut String, min_prec: u8) {
        let prec = self.precedence();
        let wrap = prec < min_prec;
        if wrap {
            out.push('(');
        }
        match self {
            Expr::Literal(v) => out.push_str(&python_literal(v)),
            Expr::Var(name) => out.push_str(&sanitize_identifier(name)),
            Expr::Neg(inner) => {
                out.push('-');
                inner.render_into(out, PREC_NEG);
            }
            Expr::Not(inner) => {
                out.push_str("not ");
                inner.render_into(out, PREC_NOT);
            }
            Expr::Arith { op, lhs, rhs } => {
                lhs.render_into(out, prec);
                out.push(' ');
                out.push_str(op.symbol());
                out.push(' ');
                rhs.render_into(out, prec + 1);
            }
            Expr::Compare { first, rest } => {
                first.render_into(out, PREC_ADD);
                for (op, e) in rest {
                    out.push(' ');
                    out.push_str(op.symbol());
                    out.push(' ');
                    e.render_into(out, PREC_ADD);
                }
            }
            Expr::Logic { op, lhs, rhs } => {
                lhs.render_into(out, prec);
                out.push_str(match op {
                    LogicOp::And => " and ",
                    LogicOp::Or => " or ",
                });
                rhs.render_into(out, prec + 1);
            }
        }
        if wrap {
            out.push(')');
        }
    }

    /// Variable names referenced by this expression, first occurrence order.
    pub fn variables(&self) -> Vec<&str> {
        let mut names = Vec::new();
        let mut stack = vec![self];
        while let Some(expr) = stack.pop() {
            match expr {
                Expr::Literal(_) => {}
                Expr::Var(name) => {
                    if !names.contains(&name.as_str()) {
                        names.push(name.as_str());
                    }
                }
                Expr::Neg(inner) | Expr::Not(inner) => stack.push(inner),
                Expr::Arith { lhs, rhs, .. } | Expr::Logic { lhs, rhs, .. } => {
                    stack.push(rhs);
                    stack.push(lhs);
                }
                Expr::Compare { first, rest } => {
                    for (_, e) in rest.iter().rev() {
                        stack.push(e);
                    }
                    stack.push(first);
                }
            }
        }
        names
    }
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

/// Variable bindings visible to an expression.
pub trait Scope {
    fn lookup(&self, name: &str) -> Option<Value>;
}

impl Scope for HashMap<String, Value> {
    fn lookup(&self, name: &str) -> Option<Value> {
        self.get(name).cloned()
    }
}

impl Scope for IndexMap<String, Value> {
    fn lookup(&self, name: &str) -> Option<Value> {
        self.get(name).cloned()
    }
}

#[derive(Clone, Copy)]
enum Num {
    I(i64),
    F(f64),
}

impl Num {
    fn of(v: &Value) -> Option<Num> {
        match v {
            Value::Bool(b) => Some(Num::I(i64::from(*b))),
            Value::Int(i) => Some(Num::I(*i)),
            Value::Float(f) => Some(Num::F(*f)),
            Value::Str(_) => None,
        }
    }

    fn f(self) -> f64 {
        match self {
            Num::I(i) => i as f64,
            Num::F(f) => f,
        }
    }
}

impl Expr {
    /// Evaluates against `scope` with Python semantics.
    pub fn eval(&self, scope: &dyn Scope) -> Result<Value, EvalError> {
        match self {
            Expr::Literal(v) => Ok(v.clone()),
            Expr::Var(name) => scope.lookup(name).ok_or_else(|| EvalError::UnknownVariable {
                name: name.clone(),
            }),
            Expr::Neg(inner) => {
                let v = inner.eval(scope)?;
                match Num::of(&v) {
                    Some(Num::I(i)) => i.checked_neg().map(Value::Int).ok_or(EvalError::Overflow),
                    Some(Num::F(f)) => Ok(Value::Float(-f)),
                    None => Err(EvalError::BadOperand {
                        op: "-",
                        ty: v.value_type(),
                    }),
                }
            }
            Expr::Not(inner) => Ok(Value::Bool(!inner.eval(scope)?.truthy())),
            Expr::Arith { op, lhs, rhs } => {
                let l = lhs.eval(scope)?;
                let r = rhs.eval(scope)?;
                arith(*op, &l, &r)
            }
            Expr::Compare { first, rest } => {
                let mut left = first.eval(scope)?;
                for (op, e) in rest {
                    let right = e.eval(scope)?;
                    if !compare(*op, &left, &right)? {
                        return Ok(Value::Bool(false));
                    }
                    left = right;
                }
                Ok(Value::Bool(true))
            }
            Expr::Logic { op, lhs, rhs } => {
                let l = lhs.eval(scope)?;
                match (op, l.truthy()) {
                    (LogicOp::And, false) | (LogicOp::Or, true) => Ok(l),
                    _ => rhs.eval(scope),
                }
            }
        }
    }
}

/// Applies an arithmetic operator to two values with Python semantics.
pub fn arith(op: ArithOp, l: &Value, r: &Value) -> Result<Value, EvalError> {
    if let (ArithOp::Add, Value::Str(a), Value::Str(b)) = (op, l, r) {
        return Ok(Value::Str(format!("{a}{b}")));
    }
    let mismatch = || EvalError::TypeMismatch {
        op: op.symbol(),
        left: l.value_type(),
        right: r.value_type(),
    };
    let (a, b) = match (Num::of(l), Num::of(r)) {
        (Some(a), Some(b)) => (a, b),
        _ => return Err(mismatch()),
    };

    match (op, a, b) {
        (ArithOp::Add, Num::I(x), Num::I(y)) => x.checked_add(y).map(Value::Int).ok_or(EvalError::Overflow),
        (ArithOp::Sub, Num::I(x), Num::I(y)) => x.checked_sub(y).map(Value::Int).ok_or(EvalError::Overflow),
        (ArithOp::Mul, Num::I(x), Num::I(y)) => x.checked_mul(y).map(Value::Int).ok_or(EvalError::Overflow),
        (ArithOp::Add, a, b) => Ok(Value::Float(a.f() + b.f())),
        (ArithOp::Sub, a, b) => Ok(Value::Float(a.f() - b.f())),
        (ArithOp::Mul, a, b) => Ok(Value::Float(a.f() * b.f())),
        (ArithOp::Div, a, b) => {
            if b.f() == 0.0 {
                return Err(EvalError::DivisionByZero);
            }
            Ok(Value::Float(a.f() / b.f()))
        }
        (ArithOp::Rem, Num::I(x), Num::I(y)) => {
            if y == 0 {
                return Err(EvalError::DivisionByZero);
            }
            let mut m = x.checked_rem(y).ok_or(EvalError::Overflow)?;
            if m != 0 && (m < 0) != (y < 0) {
                m += y;
            }
            Ok(Value::Int(m))
        }
        (ArithOp::Rem, a, b) => {
            let (x, y) = (a.f(), b.f());
            if y == 0.0 {
                return Err(EvalError::DivisionByZero);
            }
            let mut m = x % y;
            if m != 0.0 && (m < 0.0) != (y < 0.0) {
                m += y;
            }
            Ok(Value::Float(m))
        }
    }
}

fn compare(op: CmpOp, l: &Value, r: &Value) -> Result<bool, EvalError> {
    let ordering = match (l, r) {
        (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
        _ => match (Num::of(l), Num::of(r)) {
            (Some(Num::I(a)), Some(Num::I(b))) => Some(a.cmp(&b)),
            (Some(a), Some(b)) => a.f().partial_cmp(&b.f()),
            _ => {
                // Mixed string/number: only equality is defined.
                return match op {
                    CmpOp::Eq => Ok(false),
                    CmpOp::Ne => Ok(true),
                    _ => Err(EvalError::TypeMismatch {
                        op: op.symbol(),
                        left: l.value_type(),
                        right: r.value_type(),
                    }),
                };
            }
        },
    };

    // NaN compares unequal to everything.
    let Some(ord) = ordering else {
        return Ok(op == CmpOp::Ne);
    };
    Ok(match op {
        CmpOp::Eq => ord == Ordering::Equal,
        CmpOp::Ne => ord != Ordering::Equal,
        CmpOp::Lt => ord == Ordering::Less,
        CmpOp::Le => ord != Ordering::Greater,
        CmpOp::Gt => ord == Ordering::Greater,
        CmpOp::Ge => ord != Ordering::Less,
    })
}

/// Parses and evaluates in one step.
pub fn eval_str(src: &str, scope: &dyn Scope) -> Result<Value, ExprError> {
    Ok(parse(src)?.eval(scope)?)
}

/// Either failure of [`eval_str`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExprError {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("evaluation error: {0}")]
    Eval(#[from] EvalError),
}
