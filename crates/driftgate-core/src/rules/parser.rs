//! Recursive-descent parser for the whitelisted rule grammar.
//!
//! Precedence, loosest to tightest: `or`, `and`, `not`, comparison,
//! additive, multiplicative, unary minus. Comparisons do not chain.

use super::RuleError;
use super::lexer::Tok;

/// Binary arithmetic operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// Boolean connectives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicOp {
    And,
    Or,
}

/// Whitelisted expression tree. There are no other node types.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Num(f64),
    Str(String),
    Var(String),
    Neg(Box<Expr>),
    Not(Box<Expr>),
    Bin {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Cmp {
        op: CmpOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Logic {
        op: LogicOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

struct Parser<'a> {
    tokens: &'a [Tok],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> &Tok {
        self.tokens.get(self.pos).unwrap_or(&Tok::Eof)
    }

    fn bump(&mut self) -> &Tok {
        let tok = self.tokens.get(self.pos).unwrap_or(&Tok::Eof);
        self.pos += 1;
        tok
    }

    fn parse_or(&mut self) -> Result<Expr, RuleError> {
        let mut lhs = self.parse_and()?;
        while *self.peek() == Tok::Or {
            self.pos += 1;
            let rhs = self.parse_and()?;
            lhs = Expr::Logic {
                op: LogicOp::Or,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr, RuleError> {
        let mut lhs = self.parse_not()?;
        while *self.peek() == Tok::And {
            self.pos += 1;
            let rhs = self.parse_not()?;
            lhs = Expr::Logic {
                op: LogicOp::And,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn parse_not(&mut self) -> Result<Expr, RuleError> {
        if *self.peek() == Tok::Not {
            self.pos += 1;
            let operand = self.parse_not()?;
            return Ok(Expr::Not(Box::new(operand)));
        }
        self.parse_comparison()
    }

    fn cmp_op(tok: &Tok) -> Option<CmpOp> {
        match tok {
            Tok::EqEq => Some(CmpOp::Eq),
            Tok::Ne => Some(CmpOp::Ne),
            Tok::Lt => Some(CmpOp::Lt),
            Tok::Le => Some(CmpOp::Le),
            Tok::Gt => Some(CmpOp::Gt),
            Tok::Ge => Some(CmpOp::Ge),
            _ => None,
        }
    }

    fn parse_comparison(&mut self) -> Result<Expr, RuleError> {
        let lhs = self.parse_additive()?;
        let Some(op) = Self::cmp_op(self.peek()) else {
            return Ok(lhs);
        };
        self.pos += 1;
        let rhs = self.parse_additive()?;
        if Self::cmp_op(self.peek()).is_some() {
            return Err(RuleError::Disallowed("chained comparison".into()));
        }
        Ok(Expr::Cmp {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }

    fn parse_additive(&mut self) -> Result<Expr, RuleError> {
        let mut lhs = self.parse_term()?;
        loop {
            let op = match self.peek() {
                Tok::Plus => BinOp::Add,
                Tok::Minus => BinOp::Sub,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.parse_term()?;
            lhs = Expr::Bin {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
    }

    fn parse_term(&mut self) -> Result<Expr, RuleError> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Tok::Star => BinOp::Mul,
                Tok::Slash => BinOp::Div,
                Tok::Percent => BinOp::Mod,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.parse_unary()?;
            lhs = Expr::Bin {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
    }

    fn parse_unary(&mut self) -> Result<Expr, RuleError> {
        if *self.peek() == Tok::Minus {
            self.pos += 1;
            let operand = self.parse_unary()?;
            return Ok(Expr::Neg(Box::new(operand)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr, RuleError> {
        match self.bump().clone() {
            Tok::Num(v) => Ok(Expr::Num(v)),
            Tok::Str(s) => Ok(Expr::Str(s)),
            Tok::Ident(name) => {
                if *self.peek() == Tok::LParen {
                    return Err(RuleError::Disallowed(format!("function call {name:?}")));
                }
                Ok(Expr::Var(name))
            }
            Tok::LParen => {
                let inner = self.parse_or()?;
                if *self.bump() != Tok::RParen {
                    return Err(RuleError::Parse("expected ')'".into()));
                }
                Ok(inner)
            }
            other => Err(RuleError::Parse(format!("unexpected token {other:?}"))),
        }
    }
}

/// Parse a token stream into the whitelisted tree. The whole input must be
/// a single expression.
pub fn parse(tokens: &[Tok]) -> Result<Expr, RuleError> {
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.parse_or()?;
    match parser.peek() {
        Tok::Eof => Ok(expr),
        other => Err(RuleError::Parse(format!("trailing token {other:?}"))),
    }
}
