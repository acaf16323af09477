// Formula parser - converts formula text into an AST
// Supports: numbers (1, 2.5, .5, 1e3), cell refs (A1), + - * /, unary + -, parentheses

use std::fmt::Write as _;

use crate::error::FormulaParseError;
use crate::position::{self, Position};

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    /// Cell reference. May lie outside the grid; such references evaluate to `#REF!`.
    CellRef(Position),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    BinaryOp {
        op: Op,
        left: Box<Expr>,
        right: Box<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Minus,
}

impl Op {
    fn symbol(self) -> char {
        match self {
            Op::Add => '+',
            Op::Sub => '-',
            Op::Mul => '*',
            Op::Div => '/',
        }
    }

    fn precedence(self) -> u8 {
        match self {
            Op::Add | Op::Sub => 1,
            Op::Mul | Op::Div => 2,
        }
    }

    /// `a - (b - c)` and `a / (b * c)` cannot drop the parentheses.
    fn is_left_associative_only(self) -> bool {
        matches!(self, Op::Sub | Op::Div)
    }
}

impl Expr {
    fn precedence(&self) -> u8 {
        match self {
            Expr::BinaryOp { op, .. } => op.precedence(),
            Expr::Unary { .. } => 3,
            Expr::Number(_) | Expr::CellRef(_) => 4,
        }
    }

    /// Collect cell references in source order (duplicates included).
    pub fn collect_refs(&self, out: &mut Vec<Position>) {
        match self {
            Expr::Number(_) => {}
            Expr::CellRef(pos) => out.push(*pos),
            Expr::Unary { operand, .. } => operand.collect_refs(out),
            Expr::BinaryOp { left, right, .. } => {
                left.collect_refs(out);
                right.collect_refs(out);
            }
        }
    }

    /// Canonical rendering with the minimal set of parentheses.
    pub fn write_canonical(&self, out: &mut String) {
        match self {
            Expr::Number(n) => {
                let _ = write!(out, "{}", n);
            }
            Expr::CellRef(pos) => {
                if pos.is_valid() {
                    let _ = write!(out, "{}", pos);
                } else {
                    out.push_str("#REF!");
                }
            }
            Expr::Unary { op, operand } => {
                out.push(match op {
                    UnaryOp::Plus => '+',
                    UnaryOp::Minus => '-',
                });
                write_child(operand, operand.precedence() < self.precedence(), out);
            }
            Expr::BinaryOp { op, left, right } => {
                let prec = op.precedence();
                write_child(left, left.precedence() < prec, out);
                out.push(op.symbol());
                let right_parens = right.precedence() < prec
                    || (right.precedence() == prec && op.is_left_associative_only());
                write_child(right, right_parens, out);
            }
        }
    }
}

fn write_child(expr: &Expr, parens: bool, out: &mut String) {
    if parens {
        out.push('(');
        expr.write_canonical(out);
        out.push(')');
    } else {
        expr.write_canonical(out);
    }
}

/// Parse formula text (without the leading `=`) into an AST.
pub fn parse(expression: &str) -> Result<Expr, FormulaParseError> {
    let tokens = tokenize(expression).map_err(|msg| FormulaParseError::new(expression, msg))?;
    if tokens.is_empty() {
        return Err(FormulaParseError::new(expression, "empty formula"));
    }
    let (expr, pos) =
        parse_add_sub(&tokens, 0).map_err(|msg| FormulaParseError::new(expression, msg))?;
    if pos != tokens.len() {
        return Err(FormulaParseError::new(
            expression,
            format!("unexpected token {:?}", tokens[pos]),
        ));
    }
    Ok(expr)
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    CellRef(Position),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
}

fn tokenize(input: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            ' ' | '\t' | '\n' | '\r' => { chars.next(); }
            '+' => { tokens.push(Token::Plus); chars.next(); }
            '-' => { tokens.push(Token::Minus); chars.next(); }
            '*' => { tokens.push(Token::Star); chars.next(); }
            '/' => { tokens.push(Token::Slash); chars.next(); }
            '(' => { tokens.push(Token::LParen); chars.next(); }
            ')' => { tokens.push(Token::RParen); chars.next(); }
            'A'..='Z' => {
                let mut ident = String::new();
                while let Some(&ch) = chars.peek() {
                    if ch.is_ascii_alphanumeric() {
                        ident.push(ch);
                        chars.next();
                    } else {
                        break;
                    }
                }
                match position::parse_a1_unchecked(&ident) {
                    Some(pos) => tokens.push(Token::CellRef(pos)),
                    None => return Err(format!("invalid cell reference: {}", ident)),
                }
            }
            '0'..='9' | '.' => {
                let mut num_str = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_digit() || d == '.' {
                        num_str.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                // Exponent: e/E, optional sign, at least one digit
                if let Some(&e) = chars.peek() {
                    if e == 'e' || e == 'E' {
                        let mut lookahead = chars.clone();
                        lookahead.next();
                        let mut exp = String::from("e");
                        if let Some(&sign) = lookahead.peek() {
                            if sign == '+' || sign == '-' {
                                exp.push(sign);
                                lookahead.next();
                            }
                        }
                        let mut has_digits = false;
                        while let Some(&d) = lookahead.peek() {
                            if d.is_ascii_digit() {
                                exp.push(d);
                                lookahead.next();
                                has_digits = true;
                            } else {
                                break;
                            }
                        }
                        if !has_digits {
                            return Err(format!("malformed exponent in number: {}{}", num_str, e));
                        }
                        num_str.push_str(&exp);
                        chars = lookahead;
                    }
                }
                let num: f64 = num_str.parse().map_err(|_| format!("invalid number: {}", num_str))?;
                if !num.is_finite() {
                    return Err(format!("number out of range: {}", num_str));
                }
                tokens.push(Token::Number(num));
            }
            _ => return Err(format!("unexpected character: {}", c)),
        }
    }

    Ok(tokens)
}

// Lowest precedence: + and -
fn parse_add_sub(tokens: &[Token], pos: usize) -> Result<(Expr, usize), String> {
    let (mut left, mut pos) = parse_mul_div(tokens, pos)?;

    while pos < tokens.len() {
        let op = match &tokens[pos] {
            Token::Plus => Op::Add,
            Token::Minus => Op::Sub,
            _ => break,
        };
        let (right, new_pos) = parse_mul_div(tokens, pos + 1)?;
        left = Expr::BinaryOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        };
        pos = new_pos;
    }

    Ok((left, pos))
}

fn parse_mul_div(tokens: &[Token], pos: usize) -> Result<(Expr, usize), String> {
    let (mut left, mut pos) = parse_unary(tokens, pos)?;

    while pos < tokens.len() {
        let op = match &tokens[pos] {
            Token::Star => Op::Mul,
            Token::Slash => Op::Div,
            _ => break,
        };
        let (right, new_pos) = parse_unary(tokens, pos + 1)?;
        left = Expr::BinaryOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        };
        pos = new_pos;
    }

    Ok((left, pos))
}

// Prefix + and -, right-recursive so `--1` nests
fn parse_unary(tokens: &[Token], pos: usize) -> Result<(Expr, usize), String> {
    let op = match tokens.get(pos) {
        Some(Token::Plus) => UnaryOp::Plus,
        Some(Token::Minus) => UnaryOp::Minus,
        _ => return parse_primary(tokens, pos),
    };
    let (operand, pos) = parse_unary(tokens, pos + 1)?;
    Ok((
        Expr::Unary {
            op,
            operand: Box::new(operand),
        },
        pos,
    ))
}

fn parse_primary(tokens: &[Token], pos: usize) -> Result<(Expr, usize), String> {
    match tokens.get(pos) {
        None => Err("unexpected end of expression".to_string()),
        Some(Token::Number(n)) => Ok((Expr::Number(*n), pos + 1)),
        Some(Token::CellRef(cell)) => Ok((Expr::CellRef(*cell), pos + 1)),
        Some(Token::LParen) => {
            let (expr, pos) = parse_add_sub(tokens, pos + 1)?;
            match tokens.get(pos) {
                Some(Token::RParen) => Ok((expr, pos + 1)),
                _ => Err("expected closing parenthesis".to_string()),
            }
        }
        Some(tok) => Err(format!("unexpected token {:?}", tok)),
    }
}
