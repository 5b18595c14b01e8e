//! Parsed formula tree

use std::fmt;

use crate::functions::FormulaFunction;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Plus,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Str(String),
    Bool(bool),
    /// The evaluation date, bound per call
    CurrentDate,
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Conditional {
        condition: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Box<Expr>,
    },
    /// Arity is checked at parse time
    Call {
        function: FormulaFunction,
        args: Vec<Expr>,
    },
}

impl Expr {
    pub fn unary(op: UnaryOp, operand: Expr) -> Self {
        Expr::Unary {
            op,
            operand: Box::new(operand),
        }
    }

    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Functions this expression may call, in source order
    pub fn functions(&self) -> Vec<FormulaFunction> {
        let mut found = Vec::new();
        self.collect_functions(&mut found);
        found
    }

    fn collect_functions(&self, found: &mut Vec<FormulaFunction>) {
        match self {
            Expr::Number(_) | Expr::Str(_) | Expr::Bool(_) | Expr::CurrentDate => {}
            Expr::Unary { operand, .. } => operand.collect_functions(found),
            Expr::Binary { left, right, .. } => {
                left.collect_functions(found);
                right.collect_functions(found);
            }
            Expr::Conditional {
                condition,
                then_branch,
                else_branch,
            } => {
                condition.collect_functions(found);
                then_branch.collect_functions(found);
                else_branch.collect_functions(found);
            }
            Expr::Call { function, args } => {
                found.push(*function);
                for arg in args {
                    arg.collect_functions(found);
                }
            }
        }
    }
}
