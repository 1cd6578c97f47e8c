//! Pratt parser for assertion expressions.
//!
//! Precedence, loosest first: `or`, `and`, `not`,
//! comparisons (chained), `|`, `&`, `+ -`, `* / %`, unary `-`, `**`
//! (right associative), then postfix calls, indexing and `.method(...)`.

use crate::ast::{BinaryOp, CmpOp, Expr, UnaryOp};
use crate::error::{AssertError, Result};
use crate::lexer::{tokenize, Token};

const NOT_PREC: u8 = 25;
const CMP_PREC: u8 = 30;
const NEG_PREC: u8 = 70;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Assoc {
    Left,
    Right,
}

fn binary_op_info(token: &Token) -> Option<(u8, Assoc, BinaryOp)> {
    match token {
        Token::Or => Some((10, Assoc::Left, BinaryOp::Or)),
        Token::And => Some((20, Assoc::Left, BinaryOp::And)),
        Token::Pipe => Some((35, Assoc::Left, BinaryOp::BitOr)),
        Token::Amp => Some((40, Assoc::Left, BinaryOp::BitAnd)),
        Token::Plus => Some((50, Assoc::Left, BinaryOp::Add)),
        Token::Minus => Some((50, Assoc::Left, BinaryOp::Sub)),
        Token::Star => Some((60, Assoc::Left, BinaryOp::Mul)),
        Token::Slash => Some((60, Assoc::Left, BinaryOp::Div)),
        Token::Percent => Some((60, Assoc::Left, BinaryOp::Mod)),
        Token::StarStar => Some((80, Assoc::Right, BinaryOp::Pow)),
        _ => None,
    }
}

fn compare_op(token: &Token) -> Option<CmpOp> {
    match token {
        Token::Lt => Some(CmpOp::Lt),
        Token::LtEq => Some(CmpOp::Le),
        Token::Gt => Some(CmpOp::Gt),
        Token::GtEq => Some(CmpOp::Ge),
        Token::EqEq => Some(CmpOp::Eq),
        Token::BangEq => Some(CmpOp::Ne),
        _ => None,
    }
}

struct TokenStream {
    tokens: Vec<Token>,
    pos: usize,
}

impl TokenStream {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, expected: Token) -> Result<()> {
        match self.advance() {
            Some(t) if t == expected => Ok(()),
            other => Err(unexpected(other, &format!("'{expected}'"))),
        }
    }
}

fn unexpected(found: Option<Token>, expected: &str) -> AssertError {
    let found = found.map_or_else(|| "end of expression".to_string(), |t| format!("'{t}'"));
    AssertError::Parse(format!("expected {expected}, found {found}"))
}

/// Parse an expression. Symbols are left with slot 0.
pub fn parse(source: &str) -> Result<Expr> {
    let mut stream = TokenStream {
        tokens: tokenize(source)?,
        pos: 0,
    };
    let expr = parse_pratt(&mut stream, 0)?;
    match stream.advance() {
        None => Ok(expr),
        other => Err(unexpected(other, "operator or end of expression")),
    }
}

fn parse_pratt(stream: &mut TokenStream, min_prec: u8) -> Result<Expr> {
    let mut left = parse_prefix(stream)?;

    while let Some(token) = stream.peek() {
        if compare_op(token).is_some() {
            if CMP_PREC < min_prec {
                break;
            }
            let mut rest = Vec::new();
            while let Some(op) = stream.peek().and_then(compare_op) {
                stream.advance();
                rest.push((op, parse_pratt(stream, CMP_PREC + 1)?));
            }
            left = Expr::Compare {
                first: Box::new(left),
                rest,
            };
            continue;
        }

        let Some((prec, assoc, op)) = binary_op_info(token) else {
            break;
        };
        if prec < min_prec {
            break;
        }
        stream.advance();
        let next_prec = if assoc == Assoc::Left { prec + 1 } else { prec };
        let right = parse_pratt(stream, next_prec)?;
        left = Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        };
    }

    Ok(left)
}

fn parse_prefix(stream: &mut TokenStream) -> Result<Expr> {
    let (op, prec) = match stream.peek() {
        Some(Token::Minus) => (UnaryOp::Neg, NEG_PREC),
        Some(Token::Not) => (UnaryOp::Not, NOT_PREC),
        Some(Token::Plus) => {
            stream.advance();
            return parse_pratt(stream, NEG_PREC);
        }
        _ => return parse_postfix(stream),
    };
    stream.advance();
    let operand = parse_pratt(stream, prec)?;
    Ok(Expr::Unary {
        op,
        operand: Box::new(operand),
    })
}

fn parse_postfix(stream: &mut TokenStream) -> Result<Expr> {
    let mut expr = parse_atom(stream)?;
    loop {
        match stream.peek() {
            Some(Token::LParen) => {
                let Expr::Symbol { name, .. } = expr else {
                    return Err(AssertError::Parse(
                        "only named functions can be called".into(),
                    ));
                };
                let args = parse_call_args(stream)?;
                expr = Expr::Call { func: name, args };
            }
            Some(Token::LBracket) => {
                stream.advance();
                let index = parse_pratt(stream, 0)?;
                stream.expect(Token::RBracket)?;
                expr = Expr::Index {
                    target: Box::new(expr),
                    index: Box::new(index),
                };
            }
            Some(Token::Dot) => {
                stream.advance();
                let method = match stream.advance() {
                    Some(Token::Ident(name)) => name,
                    other => return Err(unexpected(other, "method name after '.'")),
                };
                let mut args = parse_call_args(stream)?;
                // `np.dot(x, y)` style namespace calls
                if matches!(&expr, Expr::Symbol { name, .. } if name == "np" || name == "math") {
                    expr = Expr::Call { func: method, args };
                } else {
                    args.insert(0, expr);
                    expr = Expr::Call { func: method, args };
                }
            }
            _ => break,
        }
    }
    Ok(expr)
}

fn parse_call_args(stream: &mut TokenStream) -> Result<Vec<Expr>> {
    stream.expect(Token::LParen)?;
    let mut args = Vec::new();
    if stream.peek() == Some(&Token::RParen) {
        stream.advance();
        return Ok(args);
    }
    loop {
        args.push(parse_pratt(stream, 0)?);
        match stream.advance() {
            Some(Token::Comma) => continue,
            Some(Token::RParen) => break,
            other => return Err(unexpected(other, "',' or ')'")),
        }
    }
    Ok(args)
}

fn parse_atom(stream: &mut TokenStream) -> Result<Expr> {
    match stream.advance() {
        Some(Token::Number(n)) => Ok(Expr::Number(n)),
        Some(Token::True) => Ok(Expr::Bool(true)),
        Some(Token::False) => Ok(Expr::Bool(false)),
        Some(Token::Ident(name)) => Ok(Expr::Symbol { name, slot: 0 }),
        Some(Token::LParen) => {
            let inner = parse_pratt(stream, 0)?;
            stream.expect(Token::RParen)?;
            Ok(inner)
        }
        other => Err(unexpected(other, "a value")),
    }
}
