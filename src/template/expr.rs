//! A deliberately small expression language for template tags.
//!
//! Covers literals, arithmetic, comparisons, boolean logic and `ENV`
//! lookups. There are no variables or assignments, so every expression is
//! evaluated in an empty context.

use std::fmt;

use super::TemplateError;

/// Result of evaluating a template expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Nil,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl Value {
    fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    fn as_number(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => Ok(()),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(v) if v.is_finite() && v.fract() == 0.0 => write!(f, "{v:.1}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::String(s) => f.write_str(s),
        }
    }
}

/// Evaluates a single expression.
pub fn evaluate(expression: &str) -> Result<Value, TemplateError> {
    let parse_error = |message: String| TemplateError::Parse {
        expression: expression.to_string(),
        message,
    };

    let tokens = tokenize(expression).map_err(parse_error)?;
    let mut parser = Parser::new(tokens);
    let expr = parser.parse_expression().map_err(parse_error)?;
    parser.expect_end().map_err(parse_error)?;

    eval(&expr).map_err(|message| TemplateError::Evaluation {
        expression: expression.to_string(),
        message,
    })
}

#[derive(Debug, Clone, Copy)]
enum UnaryOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, Copy)]
enum BinaryOp {
    Or,
    And,
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

#[derive(Debug, Clone)]
enum Expr {
    Literal(Value),
    Env {
        name: Box<Expr>,
        default: Option<Box<Expr>>,
        required: bool,
    },
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    LParen,
    RParen,
    LBracket,
    RBracket,
    Dot,
    Comma,
    Not,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    EqEq,
    NotEq,
    Gt,
    Gte,
    Lt,
    Lte,
    AndAnd,
    OrOr,
    Identifier(String),
    Integer(i64),
    Float(f64),
    String(String),
    True,
    False,
    Nil,
}

fn tokenize(input: &str) -> Result<Vec<Token>, String> {
    let mut chars = input.char_indices().peekable();
    let mut tokens = Vec::new();

    while let Some((idx, ch)) = chars.peek().copied() {
        if ch.is_whitespace() {
            chars.next();
            continue;
        }

        if ch.is_ascii_digit() {
            let start = idx;
            let mut is_float = false;
            chars.next();
            while let Some((i, c)) = chars.peek().copied() {
                if c.is_ascii_digit() || c == '_' {
                    chars.next();
                } else if c == '.'
                    && !is_float
                    && input[i + 1..].starts_with(|n: char| n.is_ascii_digit())
                {
                    is_float = true;
                    chars.next();
                } else {
                    break;
                }
            }
            let end = chars.peek().map(|(i, _)| *i).unwrap_or(input.len());
            let text = input[start..end].replace('_', "");
            let token = if is_float {
                Token::Float(
                    text.parse()
                        .map_err(|err| format!("invalid number '{text}': {err}"))?,
                )
            } else {
                Token::Integer(
                    text.parse()
                        .map_err(|err| format!("invalid number '{text}': {err}"))?,
                )
            };
            tokens.push(token);
            continue;
        }

        if ch == '\'' || ch == '"' {
            let quote = ch;
            chars.next();
            let mut value = String::new();
            let mut escaped = false;
            let mut terminated = false;

            for (_, c) in chars.by_ref() {
                if escaped {
                    value.push(match c {
                        'n' if quote == '"' => '\n',
                        't' if quote == '"' => '\t',
                        other => other,
                    });
                    escaped = false;
                    continue;
                }
                if c == '\\' {
                    escaped = true;
                    continue;
                }
                if c == quote {
                    terminated = true;
                    break;
                }
                value.push(c);
            }

            if !terminated {
                return Err("unterminated string literal".to_owned());
            }
            tokens.push(Token::String(value));
            continue;
        }

        if ch.is_ascii_alphabetic() || ch == '_' {
            let start = idx;
            chars.next();
            while let Some((_, c)) = chars.peek().copied() {
                if c.is_ascii_alphanumeric() || c == '_' {
                    chars.next();
                } else {
                    break;
                }
            }
            let end = chars.peek().map(|(i, _)| *i).unwrap_or(input.len());
            let token = match &input[start..end] {
                "true" => Token::True,
                "false" => Token::False,
                "nil" => Token::Nil,
                ident => Token::Identifier(ident.to_owned()),
            };
            tokens.push(token);
            continue;
        }

        chars.next();
        let next_is_eq = matches!(chars.peek(), Some((_, '=')));
        let token = match ch {
            '(' => Token::LParen,
            ')' => Token::RParen,
            '[' => Token::LBracket,
            ']' => Token::RBracket,
            '.' => Token::Dot,
            ',' => Token::Comma,
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => Token::Star,
            '/' => Token::Slash,
            '%' => Token::Percent,
            '!' if next_is_eq => {
                chars.next();
                Token::NotEq
            }
            '!' => Token::Not,
            '=' if next_is_eq => {
                chars.next();
                Token::EqEq
            }
            '>' if next_is_eq => {
                chars.next();
                Token::Gte
            }
            '>' => Token::Gt,
            '<' if next_is_eq => {
                chars.next();
                Token::Lte
            }
            '<' => Token::Lt,
            '&' if matches!(chars.peek(), Some((_, '&'))) => {
                chars.next();
                Token::AndAnd
            }
            '|' if matches!(chars.peek(), Some((_, '|'))) => {
                chars.next();
                Token::OrOr
            }
            '=' => return Err("assignment is not supported; use '==' for comparison".to_owned()),
            other => return Err(format!("unexpected character '{other}'")),
        };
        tokens.push(token);
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    index: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, index: 0 }
    }

    fn parse_expression(&mut self) -> Result<Expr, String> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_and()?;
        while self.match_token(&Token::OrOr) {
            let right = self.parse_and()?;
            left = binary(left, BinaryOp::Or, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_comparison()?;
        while self.match_token(&Token::AndAnd) {
            let right = self.parse_comparison()?;
            left = binary(left, BinaryOp::And, right);
        }
        Ok(left)
    }

    fn parse_comparison(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_additive()?;
        loop {
            let op = match self.peek() {
                Some(Token::EqEq) => BinaryOp::Eq,
                Some(Token::NotEq) => BinaryOp::Neq,
                Some(Token::Gt) => BinaryOp::Gt,
                Some(Token::Gte) => BinaryOp::Gte,
                Some(Token::Lt) => BinaryOp::Lt,
                Some(Token::Lte) => BinaryOp::Lte,
                _ => break,
            };
            self.index += 1;
            let right = self.parse_additive()?;
            left = binary(left, op, right);
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => break,
            };
            self.index += 1;
            let right = self.parse_multiplicative()?;
            left = binary(left, op, right);
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                Some(Token::Percent) => BinaryOp::Rem,
                _ => break,
            };
            self.index += 1;
            let right = self.parse_unary()?;
            left = binary(left, op, right);
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, String> {
        let op = if self.match_token(&Token::Not) {
            UnaryOp::Not
        } else if self.match_token(&Token::Minus) {
            UnaryOp::Neg
        } else {
            return self.parse_primary();
        };
        Ok(Expr::Unary {
            op,
            expr: Box::new(self.parse_unary()?),
        })
    }

    fn parse_primary(&mut self) -> Result<Expr, String> {
        let Some(token) = self.peek().cloned() else {
            return Err("unexpected end of expression".to_owned());
        };
        self.index += 1;

        match token {
            Token::True => Ok(Expr::Literal(Value::Bool(true))),
            Token::False => Ok(Expr::Literal(Value::Bool(false))),
            Token::Nil => Ok(Expr::Literal(Value::Nil)),
            Token::Integer(i) => Ok(Expr::Literal(Value::Integer(i))),
            Token::Float(f) => Ok(Expr::Literal(Value::Float(f))),
            Token::String(s) => Ok(Expr::Literal(Value::String(s))),
            Token::Identifier(name) if name == "ENV" => self.parse_env(),
            Token::Identifier(name) => Err(format!("undefined name '{name}'")),
            Token::LParen => {
                let expr = self.parse_expression()?;
                self.consume(&Token::RParen, "expected ')' after expression")?;
                Ok(expr)
            }
            other => Err(format!("unexpected token {other:?}")),
        }
    }

    /// `ENV['NAME']` or `ENV.fetch('NAME'[, default])`.
    fn parse_env(&mut self) -> Result<Expr, String> {
        if self.match_token(&Token::LBracket) {
            let name = self.parse_expression()?;
            self.consume(&Token::RBracket, "expected ']' after ENV key")?;
            return Ok(Expr::Env {
                name: Box::new(name),
                default: None,
                required: false,
            });
        }

        self.consume(&Token::Dot, "expected ENV[...] or ENV.fetch(...)")?;
        if !matches!(self.peek(), Some(Token::Identifier(method)) if method == "fetch") {
            return Err("only ENV.fetch is supported".to_owned());
        }
        self.index += 1;
        self.consume(&Token::LParen, "expected '(' after ENV.fetch")?;
        let name = self.parse_expression()?;
        let default = if self.match_token(&Token::Comma) {
            Some(Box::new(self.parse_expression()?))
        } else {
            None
        };
        self.consume(&Token::RParen, "expected ')' after ENV.fetch arguments")?;

        Ok(Expr::Env {
            name: Box::new(name),
            required: default.is_none(),
            default,
        })
    }

    fn consume(&mut self, expected: &Token, msg: &str) -> Result<(), String> {
        if self.match_token(expected) {
            Ok(())
        } else {
            Err(msg.to_owned())
        }
    }

    fn match_token(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.index += 1;
            return true;
        }
        false
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.index)
    }

    fn expect_end(&self) -> Result<(), String> {
        match self.peek() {
            Some(token) => Err(format!("unexpected trailing token {token:?}")),
            None => Ok(()),
        }
    }
}

fn binary(left: Expr, op: BinaryOp, right: Expr) -> Expr {
    Expr::Binary {
        left: Box::new(left),
        op,
        right: Box::new(right),
    }
}

fn eval(expr: &Expr) -> Result<Value, String> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Env {
            name,
            default,
            required,
        } => {
            let name = eval(name)?.to_string();
            match std::env::var(&name) {
                Ok(value) => Ok(Value::String(value)),
                Err(_) => match default {
                    Some(default) => eval(default),
                    None if *required => Err(format!("key not found: \"{name}\"")),
                    None => Ok(Value::Nil),
                },
            }
        }
        Expr::Unary { op, expr } => {
            let value = eval(expr)?;
            match (op, value) {
                (UnaryOp::Not, value) => Ok(Value::Bool(!value.is_truthy())),
                (UnaryOp::Neg, Value::Integer(i)) => i
                    .checked_neg()
                    .map(Value::Integer)
                    .ok_or_else(|| "integer overflow".to_owned()),
                (UnaryOp::Neg, Value::Float(f)) => Ok(Value::Float(-f)),
                (UnaryOp::Neg, other) => Err(format!("cannot negate {}", other.type_name())),
            }
        }
        Expr::Binary { left, op, right } => {
            let left = eval(left)?;
            // Short-circuit like Ruby: `a || b` returns the first truthy operand.
            match op {
                BinaryOp::Or if left.is_truthy() => return Ok(left),
                BinaryOp::And if !left.is_truthy() => return Ok(left),
                BinaryOp::Or | BinaryOp::And => return eval(right),
                _ => {}
            }
            let right = eval(right)?;
            eval_binary(left, *op, right)
        }
    }
}

fn eval_binary(left: Value, op: BinaryOp, right: Value) -> Result<Value, String> {
    match op {
        BinaryOp::Eq => Ok(Value::Bool(values_equal(&left, &right))),
        BinaryOp::Neq => Ok(Value::Bool(!values_equal(&left, &right))),
        BinaryOp::Gt | BinaryOp::Gte | BinaryOp::Lt | BinaryOp::Lte => compare(&left, op, &right),
        BinaryOp::Add => match (left, right) {
            (Value::String(a), Value::String(b)) => Ok(Value::String(a + &b)),
            (left, right) => arithmetic(left, op, right),
        },
        _ => arithmetic(left, op, right),
    }
}

fn arithmetic(left: Value, op: BinaryOp, right: Value) -> Result<Value, String> {
    if let (Value::Integer(a), Value::Integer(b)) = (&left, &right) {
        let (a, b) = (*a, *b);
        let result = match op {
            BinaryOp::Add => a.checked_add(b),
            BinaryOp::Sub => a.checked_sub(b),
            BinaryOp::Mul => a.checked_mul(b),
            BinaryOp::Div | BinaryOp::Rem if b == 0 => {
                return Err("divided by 0".to_owned());
            }
            // Integer division and modulo round toward negative infinity.
            BinaryOp::Div => a.checked_div(b).map(|q| {
                if a % b != 0 && ((a < 0) != (b < 0)) {
                    q - 1
                } else {
                    q
                }
            }),
            BinaryOp::Rem => a.checked_rem(b).map(|r| {
                if r != 0 && ((r < 0) != (b < 0)) {
                    r + b
                } else {
                    r
                }
            }),
            _ => None,
        };
        return result
            .map(Value::Integer)
            .ok_or_else(|| "integer overflow".to_owned());
    }

    let (Some(a), Some(b)) = (left.as_number(), right.as_number()) else {
        return Err(format!(
            "unsupported operand types: {} and {}",
            left.type_name(),
            right.type_name()
        ));
    };
    let result = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => a / b,
        BinaryOp::Rem => a - b * (a / b).floor(),
        _ => return Err(format!("unsupported operator {op:?}")),
    };
    Ok(Value::Float(result))
}

fn values_equal(left: &Value, right: &Value) -> bool {
    match (left.as_number(), right.as_number()) {
        (Some(a), Some(b)) => a == b,
        _ => left == right,
    }
}

fn compare(left: &Value, op: BinaryOp, right: &Value) -> Result<Value, String> {
    let ordering = match (left, right) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => match (left.as_number(), right.as_number()) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => None,
        },
    }
    .ok_or_else(|| {
        format!(
            "comparison of {} with {} failed",
            left.type_name(),
            right.type_name()
        )
    })?;

    Ok(Value::Bool(match op {
        BinaryOp::Gt => ordering.is_gt(),
        BinaryOp::Gte => ordering.is_ge(),
        BinaryOp::Lt => ordering.is_lt(),
        _ => ordering.is_le(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval_str(expression: &str) -> Value {
        evaluate(expression).unwrap()
    }

    #[test]
    fn test_precedence() {
        assert_eq!(eval_str("2 + 3 * 4"), Value::Integer(14));
        assert_eq!(eval_str("(2 + 3) * 4"), Value::Integer(20));
        assert_eq!(eval_str("-2 * -3"), Value::Integer(6));
    }

    #[test]
    fn test_integer_division_floors() {
        assert_eq!(eval_str("7 / 2"), Value::Integer(3));
        assert_eq!(eval_str("-7 / 2"), Value::Integer(-4));
        assert_eq!(eval_str("-7 % 3"), Value::Integer(2));
    }

    #[test]
    fn test_float_rendering() {
        assert_eq!(eval_str("1.5 * 2").to_string(), "3.0");
        assert_eq!(eval_str("1 / 4.0").to_string(), "0.25");
    }

    #[test]
    fn test_strings() {
        assert_eq!(
            eval_str("'db' + \"_\" + 'name'"),
            Value::String("db_name".into())
        );
        assert_eq!(eval_str("'a' < 'b'"), Value::Bool(true));
    }

    #[test]
    fn test_boolean_logic() {
        assert_eq!(eval_str("1 < 2 && 'a' == 'a'"), Value::Bool(true));
        assert_eq!(eval_str("nil || 'fallback'"), Value::String("fallback".into()));
        assert_eq!(eval_str("!true"), Value::Bool(false));
        assert_eq!(eval_str("1 == 1.0"), Value::Bool(true));
    }

    #[test]
    fn test_env_lookup() {
        std::env::set_var("TOGGLE_EXPR_TEST_VAR", "present");
        assert_eq!(
            eval_str("ENV['TOGGLE_EXPR_TEST_VAR']"),
            Value::String("present".into())
        );
        assert_eq!(eval_str("ENV['TOGGLE_EXPR_TEST_MISSING']"), Value::Nil);
        assert!(matches!(
            evaluate("ENV.fetch('TOGGLE_EXPR_TEST_MISSING')"),
            Err(TemplateError::Evaluation { .. })
        ));
    }

    #[test]
    fn test_string_times_integer_is_an_error() {
        for expression in ["'ab' * 9223372036854775807", "'ab' * 2", "2 * 'ab'"] {
            assert!(
                matches!(evaluate(expression), Err(TemplateError::Evaluation { .. })),
                "{expression}"
            );
        }
    }

    #[test]
    fn test_method_calls_are_rejected() {
        assert!(matches!(
            evaluate("'abc'.upcase"),
            Err(TemplateError::Parse { .. })
        ));
        assert!(matches!(evaluate("1 and 2"), Err(TemplateError::Parse { .. })));
    }

    #[test]
    fn test_nil_renders_empty() {
        assert_eq!(eval_str("nil").to_string(), "");
    }

    #[test]
    fn test_errors() {
        assert!(matches!(evaluate("foo"), Err(TemplateError::Parse { .. })));
        assert!(matches!(evaluate("1 +"), Err(TemplateError::Parse { .. })));
        assert!(matches!(evaluate("x = 1"), Err(TemplateError::Parse { .. })));
        assert!(matches!(
            evaluate("'a' - 1"),
            Err(TemplateError::Evaluation { .. })
        ));
        assert!(matches!(
            evaluate("1 < 'a'"),
            Err(TemplateError::Evaluation { .. })
        ));
    }
}
