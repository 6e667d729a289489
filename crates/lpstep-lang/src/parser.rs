use lpstep_solver::ConstraintOp;
use thiserror::Error;

use crate::ast::*;
use crate::lexer::{Lexer, Span, Token, TokenKind};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Unexpected token: expected {expected}, found {found} at position {span:?}")]
    UnexpectedToken {
        expected: String,
        found: String,
        span: Span,
    },
    #[error("Unexpected end of line")]
    UnexpectedEnd,
    #[error("Invalid number: {0}")]
    InvalidNumber(String),
    #[error("Unsupported relational operator '{0}' (only <= and >= are accepted)")]
    UnsupportedOperator(String),
    #[error("Missing relational operator")]
    MissingOperator,
    #[error("Unknown variable: {0}")]
    UnknownVariable(String),
    #[error("Constraint mentions no variables")]
    NoVariables,
    #[error("No data block delimited by '=== DATOS PARA GRÁFICA ===' and '=== FIN DATOS ===' found")]
    MissingBlock,
    #[error("Data block has no objective function")]
    MissingObjective,
    #[error("No usable constraints found")]
    MissingConstraints,
    #[error("No 'maximize/minimize z = ...' objective found in free text")]
    NoObjectiveFound,
}

pub type ParseResult<T> = Result<T, ParseError>;

/// Line parser for objective expressions and constraints.
///
/// Grammar (one line):
///
/// ```text
/// constraint := ident (',' ident)+ ('>=' | '>') '0'
///             | expr relation expr
/// expr       := ['+' | '-'] term (('+' | '-') term)*
/// term       := number ident | number '*' ident | number | ident
/// relation   := '<=' | '=<' | '≤' | '<' | '>=' | '=>' | '≥' | '>'
/// ```
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    /// Classify one constraint line
    pub fn parse_constraint(source: &str) -> ParseResult<ConstraintLine> {
        let mut parser = Parser::new(Lexer::tokenize(source));
        parser.constraint_line()
    }

    /// Parse the expression after the first `=` of an objective line
    /// (`Z = 3x1 + 2x2`). A line without `=` is parsed whole.
    pub fn parse_objective(source: &str) -> ParseResult<LinearExpr> {
        let mut parser = Parser::new(Lexer::tokenize(source));
        if let Some(eq) = parser.tokens.iter().position(|t| t.kind == TokenKind::Eq) {
            parser.pos = eq + 1;
        }
        let expr = parser.expression()?;
        parser.expect_end()?;
        Ok(expr)
    }

    /// Objective line to a dense coefficient vector over `variables`
    pub fn parse_objective_coefficients(source: &str, variables: &[String]) -> ParseResult<Vec<f64>> {
        Self::parse_objective(source)?.coefficients(variables)
    }

    pub fn parse_expression(source: &str) -> ParseResult<LinearExpr> {
        let mut parser = Parser::new(Lexer::tokenize(source));
        let expr = parser.expression()?;
        parser.expect_end()?;
        Ok(expr)
    }

    fn current(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self) -> TokenKind {
        self.current().map(|t| t.kind).unwrap_or(TokenKind::Eof)
    }

    fn kind_at(&self, pos: usize) -> TokenKind {
        self.tokens.get(pos).map(|t| t.kind).unwrap_or(TokenKind::Eof)
    }

    fn advance(&mut self) -> Option<&Token> {
        let token = self.tokens.get(self.pos);
        self.pos += 1;
        token
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        match self.current() {
            Some(t) if t.kind != TokenKind::Eof => ParseError::UnexpectedToken {
                expected: expected.to_string(),
                found: format!("'{}'", t.text),
                span: t.span,
            },
            _ => ParseError::UnexpectedEnd,
        }
    }

    fn expect_end(&mut self) -> ParseResult<()> {
        match self.peek_kind() {
            TokenKind::Eof | TokenKind::Newline => Ok(()),
            _ => Err(self.unexpected("end of line")),
        }
    }

    fn number(&mut self) -> ParseResult<f64> {
        let token = self.current().cloned().ok_or(ParseError::UnexpectedEnd)?;
        if token.kind != TokenKind::Number {
            return Err(self.unexpected("number"));
        }
        self.advance();
        token
            .text
            .parse::<f64>()
            .map_err(|_| ParseError::InvalidNumber(token.text.clone()))
    }

    /// Parse a linear expression, stopping at the first token that cannot
    /// continue it
    pub fn expression(&mut self) -> ParseResult<LinearExpr> {
        let mut expr = LinearExpr::default();

        let mut sign = match self.peek_kind() {
            TokenKind::Plus => {
                self.advance();
                1.0
            }
            TokenKind::Minus => {
                self.advance();
                -1.0
            }
            _ => 1.0,
        };

        loop {
            self.term(sign, &mut expr)?;
            sign = match self.peek_kind() {
                TokenKind::Plus => 1.0,
                TokenKind::Minus => -1.0,
                _ => break,
            };
            self.advance();
        }

        Ok(expr)
    }

    fn term(&mut self, sign: f64, expr: &mut LinearExpr) -> ParseResult<()> {
        match self.peek_kind() {
            TokenKind::Number => {
                let end = self.current().map(|t| t.span.end);
                let value = sign * self.number()?;
                let starred = self.peek_kind() == TokenKind::Star;
                if starred {
                    self.advance();
                }
                // `3x1` and `3*x1` are terms; in `6 units` the word is not
                let attached = self.current().map(|t| Some(t.span.start) == end).unwrap_or(false);
                if self.peek_kind() == TokenKind::Ident && (starred || attached) {
                    let name = self.advance().map(|t| t.text.clone()).unwrap_or_default();
                    expr.add_term(&name, value);
                } else if starred {
                    return Err(self.unexpected("variable"));
                } else {
                    expr.constant += value;
                }
                Ok(())
            }
            TokenKind::Ident => {
                let name = self.advance().map(|t| t.text.clone()).unwrap_or_default();
                expr.add_term(&name, sign);
                Ok(())
            }
            _ => Err(self.unexpected("coefficient or variable")),
        }
    }

    fn relation(&mut self) -> ParseResult<ConstraintOp> {
        let token = self.current().cloned().ok_or(ParseError::MissingOperator)?;
        let op = match token.kind {
            TokenKind::Le | TokenKind::Lt => ConstraintOp::Le,
            TokenKind::Ge | TokenKind::Gt => ConstraintOp::Ge,
            TokenKind::Eq => return Err(ParseError::UnsupportedOperator(token.text)),
            TokenKind::Eof | TokenKind::Newline => return Err(ParseError::MissingOperator),
            _ => return Err(self.unexpected("relational operator")),
        };
        self.advance();
        Ok(op)
    }

    /// `x1, x2, ... >= 0`
    fn bound_list(&mut self) -> Option<ConstraintLine> {
        let start = self.pos;
        let mut pos = start;
        let mut variables = Vec::new();

        loop {
            if self.kind_at(pos) != TokenKind::Ident {
                return None;
            }
            variables.push(self.tokens[pos].text.clone());
            pos += 1;
            if self.kind_at(pos) != TokenKind::Comma {
                break;
            }
            pos += 1;
        }

        let is_list = variables.len() > 1;
        let is_ge = matches!(self.kind_at(pos), TokenKind::Ge | TokenKind::Gt);
        let is_zero = self.kind_at(pos + 1) == TokenKind::Number
            && self.tokens[pos + 1].text.parse::<f64>().ok() == Some(0.0);
        let is_end = matches!(self.kind_at(pos + 2), TokenKind::Eof | TokenKind::Newline);

        if is_list && is_ge && is_zero && is_end {
            self.pos = pos + 2;
            Some(ConstraintLine::Bound { variables })
        } else {
            None
        }
    }

    fn constraint_line(&mut self) -> ParseResult<ConstraintLine> {
        if let Some(bound) = self.bound_list() {
            return Ok(bound);
        }

        let lhs = self.expression()?;
        let op = self.relation()?;
        let rhs = self.expression()?;
        self.expect_end()?;

        let constraint = LinearConstraint::canonical(lhs, op, rhs);
        if constraint.expr.terms.is_empty() {
            return Err(ParseError::NoVariables);
        }
        if let Some(name) = constraint.as_bound() {
            return Ok(ConstraintLine::Bound {
                variables: vec![name.to_string()],
            });
        }
        Ok(ConstraintLine::Linear(constraint))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars() -> Vec<String> {
        vec!["x1".to_string(), "x2".to_string()]
    }

    fn linear(source: &str) -> LinearConstraint {
        match Parser::parse_constraint(source).unwrap() {
            ConstraintLine::Linear(c) => c,
            other => panic!("expected linear constraint, got {:?}", other),
        }
    }

    #[test]
    fn test_objective_after_equals() {
        let coeffs = Parser::parse_objective_coefficients("Z = 3x1 + 2x2", &vars()).unwrap();
        assert_eq!(coeffs, vec![3.0, 2.0]);
    }

    #[test]
    fn test_objective_implicit_coefficients() {
        assert_eq!(
            Parser::parse_objective_coefficients("Z = -x1 + x2", &vars()).unwrap(),
            vec![-1.0, 1.0]
        );
        // absent variable means coefficient 0
        assert_eq!(
            Parser::parse_objective_coefficients("Z = 4.5x2", &vars()).unwrap(),
            vec![0.0, 4.5]
        );
        assert_eq!(
            Parser::parse_objective_coefficients("Maximizar Z = 30*x1 + 50 * x2", &vars()).unwrap(),
            vec![30.0, 50.0]
        );
    }

    #[test]
    fn test_two_variable_constraint() {
        let c = linear("1x1 + 3x2 <= 200");
        assert_eq!(c.op, ConstraintOp::Le);
        assert_eq!(c.rhs, 200.0);
        assert_eq!(c.coefficients(&vars()).unwrap(), vec![1.0, 3.0]);
    }

    #[test]
    fn test_single_variable_constraint() {
        let c = linear("x1 >= 20");
        assert_eq!(c.op, ConstraintOp::Ge);
        assert_eq!(c.rhs, 20.0);
        assert_eq!(c.coefficients(&vars()).unwrap(), vec![1.0, 0.0]);
    }

    #[test]
    fn test_variable_comparison_keeps_operator() {
        // x2 >= 2x1 stays a >= row: -2x1 + x2 >= 0
        let c = linear("x2 >= 2x1");
        assert_eq!(c.op, ConstraintOp::Ge);
        assert_eq!(c.rhs, 0.0);
        assert_eq!(c.coefficients(&vars()).unwrap(), vec![-2.0, 1.0]);

        let c = linear("x1 <= 3x2");
        assert_eq!(c.op, ConstraintOp::Le);
        assert_eq!(c.coefficients(&vars()).unwrap(), vec![1.0, -3.0]);
    }

    #[test]
    fn test_unicode_and_strict_relations() {
        assert_eq!(linear("2x1 + x2 ≤ 8").op, ConstraintOp::Le);
        assert_eq!(linear("x1 − x2 ≥ 1").op, ConstraintOp::Ge);
        assert_eq!(linear("x1 < 4").op, ConstraintOp::Le);
        assert_eq!(linear("x1 > 4").op, ConstraintOp::Ge);
    }

    #[test]
    fn test_bounds() {
        assert_eq!(
            Parser::parse_constraint("x1 >= 0").unwrap(),
            ConstraintLine::Bound {
                variables: vec!["x1".to_string()]
            }
        );
        assert_eq!(
            Parser::parse_constraint("x1, x2 ≥ 0").unwrap(),
            ConstraintLine::Bound { variables: vars() }
        );
        // two variables compared against zero are a real constraint
        assert!(matches!(
            Parser::parse_constraint("x1 - x2 >= 0").unwrap(),
            ConstraintLine::Linear(_)
        ));
    }

    #[test]
    fn test_rejections() {
        assert_eq!(
            Parser::parse_constraint("x1 + x2 = 5"),
            Err(ParseError::UnsupportedOperator("=".to_string()))
        );
        assert_eq!(Parser::parse_constraint("x1 + x2"), Err(ParseError::MissingOperator));
        assert_eq!(Parser::parse_constraint("3 <= 5"), Err(ParseError::NoVariables));
        assert!(matches!(
            Parser::parse_constraint("x1 + x2 <= 6 units"),
            Err(ParseError::UnexpectedToken { .. })
        ));
        assert!(matches!(
            Parser::parse_constraint("x1 + <= 6"),
            Err(ParseError::UnexpectedToken { .. })
        ));
    }

    #[test]
    fn test_trailing_unit_word_is_not_a_variable() {
        assert!(matches!(
            Parser::parse_constraint("x1 + x2 <= 6 horas"),
            Err(ParseError::UnexpectedToken { .. })
        ));
        // a detached number and name do not form a term
        assert!(matches!(
            Parser::parse_expression("3 x1"),
            Err(ParseError::UnexpectedToken { .. })
        ));
        assert_eq!(linear("2.5x1 + 1e3x2 <= 1.5e2").rhs, 150.0);
        assert_eq!(linear("2.5x1 + 1e3x2 <= 1.5e2").coefficients(&vars()).unwrap(), vec![2.5, 1000.0]);
    }

    #[test]
    fn test_expression_merges_repeated_variables() {
        let expr = Parser::parse_expression("x1 + 2x1 - x2 + 4").unwrap();
        assert_eq!(expr.coefficient("x1"), 3.0);
        assert_eq!(expr.coefficient("x2"), -1.0);
        assert_eq!(expr.constant, 4.0);
    }
}
