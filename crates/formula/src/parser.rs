//! Recursive-descent parser
//!
//! Precedence, lowest first:
//!
//! ```text
//! ?:   ||   &&   == !=   < <= > >=   + -   * / %   unary - + !
//! ```
//!
//! Function names and arities are resolved here, so a parsed [`Expr`] can
//! only call functions from the closed set with the right argument count.

use crate::ast::{BinaryOp, Expr, UnaryOp};
use crate::error::{FormulaError, FormulaResult};
use crate::functions::FormulaFunction;
use crate::lexer::{Lexer, Token, TokenKind};

/// The only variable a formula may reference
pub const CURRENT_DATE: &str = "currentDate";

/// Nesting limit for parenthesized, unary and conditional expressions
pub const MAX_DEPTH: usize = 64;

/// Depth limit for the parsed tree, operator chains included
///
/// Evaluation and drop both recurse once per level.
pub const MAX_TREE_DEPTH: usize = 512;

pub fn parse(input: &str) -> FormulaResult<Expr> {
    let tokens = Lexer::new(input).tokenize()?;
    let mut parser = Parser {
        tokens,
        index: 0,
        depth: 0,
        height: 0,
    };

    if parser.peek() == &TokenKind::Eof {
        return Err(FormulaError::syntax(0, "empty expression"));
    }

    let expr = parser.expression()?;
    let trailing = parser.current();
    if trailing.kind != TokenKind::Eof {
        return Err(FormulaError::syntax(
            trailing.position,
            format!("unexpected {} after expression", trailing.kind.describe()),
        ));
    }
    Ok(expr)
}

struct Parser {
    tokens: Vec<Token>,
    index: usize,
    depth: usize,
    height: usize,
}

impl Parser {
    fn current(&self) -> &Token {
        // tokenize() always ends with Eof, and advance() never moves past it
        &self.tokens[self.index.min(self.tokens.len() - 1)]
    }

    fn peek(&self) -> &TokenKind {
        &self.current().kind
    }

    fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if token.kind != TokenKind::Eof {
            self.index += 1;
        }
        token
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek() == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> FormulaResult<Token> {
        if self.peek() == &kind {
            return Ok(self.advance());
        }
        let found = self.current();
        Err(FormulaError::syntax(
            found.position,
            format!("expected {}, found {}", what, found.kind.describe()),
        ))
    }

    fn enter(&mut self) -> FormulaResult<()> {
        self.depth += 1;
        self.height += 1;
        if self.depth > MAX_DEPTH {
            return Err(FormulaError::syntax(
                self.current().position,
                format!("expression nested deeper than {}", MAX_DEPTH),
            ));
        }
        self.check_height()
    }

    fn leave(&mut self) {
        self.depth -= 1;
        self.height -= 1;
    }

    fn check_height(&self) -> FormulaResult<()> {
        if self.height > MAX_TREE_DEPTH {
            return Err(FormulaError::syntax(
                self.current().position,
                format!("expression tree deeper than {}", MAX_TREE_DEPTH),
            ));
        }
        Ok(())
    }

    fn expression(&mut self) -> FormulaResult<Expr> {
        self.enter()?;
        let expr = self.ternary();
        self.leave();
        expr
    }

    fn ternary(&mut self) -> FormulaResult<Expr> {
        let condition = self.or()?;
        if !self.eat(&TokenKind::Question) {
            return Ok(condition);
        }
        let then_branch = self.expression()?;
        self.expect(TokenKind::Colon, "':'")?;
        let else_branch = self.expression()?;
        Ok(Expr::Conditional {
            condition: Box::new(condition),
            then_branch: Box::new(then_branch),
            else_branch: Box::new(else_branch),
        })
    }

    /// One left-associative precedence level
    ///
    /// Every folded operator deepens the tree by one.
    fn binary_level(
        &mut self,
        operators: &[(TokenKind, BinaryOp)],
        next: fn(&mut Self) -> FormulaResult<Expr>,
    ) -> FormulaResult<Expr> {
        let mut left = next(self)?;
        let mut folds = 0;
        let result = 'level: loop {
            for (kind, op) in operators {
                if self.eat(kind) {
                    folds += 1;
                    self.height += 1;
                    if let Err(e) = self.check_height() {
                        break 'level Err(e);
                    }
                    match next(self) {
                        Ok(right) => left = Expr::binary(*op, left, right),
                        Err(e) => break 'level Err(e),
                    }
                    continue 'level;
                }
            }
            break Ok(left);
        };
        self.height -= folds;
        result
    }

    fn or(&mut self) -> FormulaResult<Expr> {
        self.binary_level(&[(TokenKind::OrOr, BinaryOp::Or)], Self::and)
    }

    fn and(&mut self) -> FormulaResult<Expr> {
        self.binary_level(&[(TokenKind::AndAnd, BinaryOp::And)], Self::equality)
    }

    fn equality(&mut self) -> FormulaResult<Expr> {
        self.binary_level(
            &[
                (TokenKind::EqEq, BinaryOp::Eq),
                (TokenKind::NotEq, BinaryOp::NotEq),
            ],
            Self::comparison,
        )
    }

    fn comparison(&mut self) -> FormulaResult<Expr> {
        self.binary_level(
            &[
                (TokenKind::Lt, BinaryOp::Lt),
                (TokenKind::LtEq, BinaryOp::LtEq),
                (TokenKind::Gt, BinaryOp::Gt),
                (TokenKind::GtEq, BinaryOp::GtEq),
            ],
            Self::additive,
        )
    }

    fn additive(&mut self) -> FormulaResult<Expr> {
        self.binary_level(
            &[
                (TokenKind::Plus, BinaryOp::Add),
                (TokenKind::Minus, BinaryOp::Sub),
            ],
            Self::term,
        )
    }

    fn term(&mut self) -> FormulaResult<Expr> {
        self.binary_level(
            &[
                (TokenKind::Star, BinaryOp::Mul),
                (TokenKind::Slash, BinaryOp::Div),
                (TokenKind::Percent, BinaryOp::Rem),
            ],
            Self::unary,
        )
    }

    fn unary(&mut self) -> FormulaResult<Expr> {
        let op = match self.peek() {
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::Plus => UnaryOp::Plus,
            TokenKind::Bang => UnaryOp::Not,
            _ => return self.primary(),
        };
        self.advance();

        self.enter()?;
        let operand = self.unary();
        self.leave();
        Ok(Expr::unary(op, operand?))
    }

    fn primary(&mut self) -> FormulaResult<Expr> {
        let token = self.advance();
        match token.kind {
            TokenKind::Number(n) => Ok(Expr::Number(n)),
            TokenKind::Str(s) => Ok(Expr::Str(s)),
            TokenKind::LParen => {
                let inner = self.expression()?;
                self.expect(TokenKind::RParen, "')'")?;
                Ok(inner)
            }
            TokenKind::Ident(name) => self.identifier(name, token.position),
            other => Err(FormulaError::syntax(
                token.position,
                format!("unexpected {}", other.describe()),
            )),
        }
    }

    fn identifier(&mut self, name: String, position: usize) -> FormulaResult<Expr> {
        if self.peek() == &TokenKind::LParen {
            let function = FormulaFunction::from_name(&name).ok_or_else(|| {
                FormulaError::syntax(position, format!("unknown function '{}'", name))
            })?;
            let args = self.arguments()?;
            if args.len() != function.arity() {
                return Err(FormulaError::syntax(
                    position,
                    format!(
                        "{} expects {} argument(s), got {}",
                        function,
                        function.arity(),
                        args.len()
                    ),
                ));
            }
            return Ok(Expr::Call { function, args });
        }

        match name.as_str() {
            CURRENT_DATE => Ok(Expr::CurrentDate),
            "true" => Ok(Expr::Bool(true)),
            "false" => Ok(Expr::Bool(false)),
            _ if FormulaFunction::from_name(&name).is_some() => Err(FormulaError::syntax(
                position,
                format!("function '{}' must be called with arguments", name),
            )),
            _ => Err(FormulaError::syntax(
                position,
                format!("unknown variable '{}'", name),
            )),
        }
    }

    fn arguments(&mut self) -> FormulaResult<Vec<Expr>> {
        self.expect(TokenKind::LParen, "'('")?;
        let mut args = Vec::new();
        if self.eat(&TokenKind::RParen) {
            return Ok(args);
        }
        loop {
            args.push(self.expression()?);
            if self.eat(&TokenKind::Comma) {
                continue;
            }
            self.expect(TokenKind::RParen, "',' or ')'")?;
            return Ok(args);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(function: FormulaFunction, args: Vec<Expr>) -> Expr {
        Expr::Call { function, args }
    }

    fn syntax_position(input: &str) -> usize {
        match parse(input) {
            Err(FormulaError::Syntax { position, .. }) => position,
            other => panic!("expected syntax error for {:?}, got {:?}", input, other),
        }
    }

    #[test]
    fn test_parse_metric_call() {
        assert_eq!(
            parse("price(currentDate)").unwrap(),
            call(FormulaFunction::Price, vec![Expr::CurrentDate])
        );
    }

    #[test]
    fn test_precedence() {
        // 1 + 2 * 3 parses as 1 + (2 * 3)
        assert_eq!(
            parse("1 + 2 * 3").unwrap(),
            Expr::binary(
                BinaryOp::Add,
                Expr::Number(1.0),
                Expr::binary(BinaryOp::Mul, Expr::Number(2.0), Expr::Number(3.0)),
            )
        );
        // subtraction is left-associative
        assert_eq!(
            parse("8 - 4 - 2").unwrap(),
            Expr::binary(
                BinaryOp::Sub,
                Expr::binary(BinaryOp::Sub, Expr::Number(8.0), Expr::Number(4.0)),
                Expr::Number(2.0),
            )
        );
    }

    #[test]
    fn test_unary_binds_tighter_than_multiplication() {
        assert_eq!(
            parse("-2 * 3").unwrap(),
            Expr::binary(
                BinaryOp::Mul,
                Expr::unary(UnaryOp::Neg, Expr::Number(2.0)),
                Expr::Number(3.0),
            )
        );
    }

    #[test]
    fn test_ternary_is_right_associative() {
        let expr = parse("true ? 1 : false ? 2 : 3").unwrap();
        let Expr::Conditional { else_branch, .. } = expr else {
            panic!("expected conditional");
        };
        assert!(matches!(*else_branch, Expr::Conditional { .. }));
    }

    #[test]
    fn test_logical_precedence() {
        // a || b && c parses as a || (b && c)
        assert_eq!(
            parse("true || false && false").unwrap(),
            Expr::binary(
                BinaryOp::Or,
                Expr::Bool(true),
                Expr::binary(BinaryOp::And, Expr::Bool(false), Expr::Bool(false)),
            )
        );
    }

    #[test]
    fn test_nested_calls() {
        let expr =
            parse("pricePercentChange(addDate(currentDate, -1, 0, 0), currentDate)").unwrap();
        assert_eq!(
            expr.functions(),
            vec![FormulaFunction::PricePercentChange, FormulaFunction::AddDate]
        );
    }

    #[test]
    fn test_unknown_function() {
        assert_eq!(syntax_position("1 + volume(currentDate)"), 4);
    }

    #[test]
    fn test_wrong_arity() {
        assert_eq!(syntax_position("price(currentDate, currentDate)"), 0);
        assert_eq!(syntax_position("addDate(currentDate, 1)"), 0);
        assert_eq!(syntax_position("nDaysAgo()"), 0);
    }

    #[test]
    fn test_unknown_variable() {
        assert_eq!(syntax_position("price(today)"), 6);
    }

    #[test]
    fn test_function_without_call() {
        assert_eq!(syntax_position("price + 1"), 0);
    }

    #[test]
    fn test_structural_errors() {
        assert_eq!(syntax_position(""), 0);
        assert_eq!(syntax_position("   "), 0);
        assert_eq!(syntax_position("(1 + 2"), 6);
        assert_eq!(syntax_position("1 +"), 3);
        assert_eq!(syntax_position("1 2"), 2);
        assert_eq!(syntax_position("price(currentDate"), 17);
        assert_eq!(syntax_position("true ? 1"), 8);
    }

    #[test]
    fn test_depth_limit() {
        let deep = format!("{}1{}", "(".repeat(MAX_DEPTH + 1), ")".repeat(MAX_DEPTH + 1));
        assert!(parse(&deep).is_err());

        let shallow = format!("{}1{}", "(".repeat(10), ")".repeat(10));
        assert_eq!(parse(&shallow).unwrap(), Expr::Number(1.0));

        let negations = "-".repeat(MAX_DEPTH * 2);
        assert!(parse(&format!("{}1", negations)).is_err());
    }

    #[test]
    fn test_long_operator_chain_is_rejected() {
        let chain = format!("1{}", "+1".repeat(2_000));
        let err = parse(&chain).unwrap_err();
        assert!(matches!(err, FormulaError::Syntax { .. }));
        assert!(err.to_string().contains("deeper than"));

        let mixed = format!("1{}", "*2&&1".repeat(MAX_TREE_DEPTH));
        assert!(matches!(parse(&mixed), Err(FormulaError::Syntax { .. })));
    }

    #[test]
    fn test_operator_chain_within_limit() {
        let chain = format!("1{}", "+1".repeat(200));
        let expr = parse(&chain).unwrap();
        assert!(matches!(expr, Expr::Binary { .. }));
    }
}
