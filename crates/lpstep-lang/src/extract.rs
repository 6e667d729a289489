//! Problem extraction from free text.
//!
//! The structured block is authoritative:
//!
//! ```text
//! === DATOS PARA GRÁFICA ===
//! TIPO: Maximizar
//! FUNCION_OBJETIVO: Z = 3x1 + 2x2
//! RESTRICCIONES:
//! - x1 + x2 <= 6
//! - x1, x2 >= 0
//! VARIABLES: x1, x2
//! === FIN DATOS ===
//! ```
//!
//! Without a block the extractor falls back to a keyword search for
//! `maximizar z = ...` in the prose, and finally to a fixed placeholder
//! problem. Both fallbacks are reported through [`Confidence`].

use log::{debug, info, warn};
use lpstep_solver::{ConstraintOp, LpProblem};

use crate::ast::{ConstraintLine, LinearConstraint, LinearExpr};
use crate::lexer::{Lexer, TokenKind};
use crate::parser::{ParseError, ParseResult, Parser};

pub const START_MARKER: &str = "=== DATOS PARA GRÁFICA ===";
const START_MARKER_ASCII: &str = "=== DATOS PARA GRAFICA ===";
pub const END_MARKER: &str = "=== FIN DATOS ===";

const OBJECTIVE_KEYWORDS: &[&str] = &["maximizar", "maximize", "max", "minimizar", "minimize", "min"];

/// How much the extracted problem can be trusted
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confidence {
    /// Parsed from a delimited data block
    Structured,
    /// Objective and constraints recovered from free text
    Heuristic,
    /// Part or all of the problem is the built-in example
    Placeholder,
}

impl Confidence {
    pub fn label(self) -> &'static str {
        match self {
            Confidence::Structured => "structured",
            Confidence::Heuristic => "heuristic",
            Confidence::Placeholder => "placeholder",
        }
    }
}

/// What to do when the input has no data block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Fallback {
    /// Free-text search, then the placeholder problem
    #[default]
    Placeholder,
    /// Free-text search only
    Heuristic,
    /// A data block is required
    Strict,
}

/// A line that contributed nothing to the problem
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct DroppedLine {
    /// 1-based line number in the full input
    pub line_number: usize,
    pub text: String,
    pub reason: String,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub problem: LpProblem,
    pub confidence: Confidence,
    pub dropped: Vec<DroppedLine>,
}

impl Extraction {
    pub fn is_authoritative(&self) -> bool {
        self.confidence == Confidence::Structured
    }
}

/// Extracts an [`LpProblem`] from text
#[derive(Debug, Clone, Default)]
pub struct Extractor {
    fallback: Fallback,
}

impl Extractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fallback(mut self, fallback: Fallback) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn fallback(&self) -> Fallback {
        self.fallback
    }

    pub fn extract(&self, text: &str) -> ParseResult<Extraction> {
        if let Some(block) = find_block(text) {
            let extraction = parse_block(&block)?;
            info!(
                "extracted {} variables and {} constraints from data block",
                extraction.problem.num_variables(),
                extraction.problem.num_constraints()
            );
            return Ok(extraction);
        }

        match self.fallback {
            Fallback::Strict => Err(ParseError::MissingBlock),
            Fallback::Heuristic => {
                let found = search_free_text(text);
                let (objective, maximize) = found.objective.ok_or(ParseError::NoObjectiveFound)?;
                if found.constraints.is_empty() {
                    return Err(ParseError::MissingConstraints);
                }
                warn!("no data block found; problem recovered from free text");
                assemble(objective, maximize, found.constraints, found.dropped, Confidence::Heuristic)
            }
            Fallback::Placeholder => {
                let found = search_free_text(text);
                let complete = found.objective.is_some() && !found.constraints.is_empty();
                let (objective, maximize) = match found.objective {
                    Some(objective) => objective,
                    None => {
                        warn!("no objective found in text; using placeholder objective 3x1 + 2x2");
                        (placeholder_objective(), true)
                    }
                };
                let constraints = if found.constraints.is_empty() {
                    warn!("no constraints found in text; using placeholder constraints");
                    placeholder_constraints()
                } else {
                    found.constraints
                };
                let confidence = if complete {
                    warn!("no data block found; problem recovered from free text");
                    Confidence::Heuristic
                } else {
                    Confidence::Placeholder
                };
                assemble(objective, maximize, constraints, found.dropped, confidence)
            }
        }
    }
}

/// Lines strictly between the start and end markers, with their 1-based
/// line numbers
fn find_block(text: &str) -> Option<Vec<(usize, &str)>> {
    let mut lines = text.lines().enumerate();
    lines.find(|(_, line)| {
        let line = line.trim();
        line.starts_with(START_MARKER) || line.starts_with(START_MARKER_ASCII)
    })?;

    let mut block = Vec::new();
    for (index, line) in lines {
        if line.trim().starts_with(END_MARKER) {
            return Some(block);
        }
        block.push((index + 1, line));
    }
    None
}

fn dropped(line_number: usize, text: &str, reason: impl ToString) -> DroppedLine {
    let line = DroppedLine {
        line_number,
        text: text.trim().to_string(),
        reason: reason.to_string(),
    };
    warn!("dropped line {}: '{}' ({})", line.line_number, line.text, line.reason);
    line
}

/// Direction named by a word such as `Maximizar` or `min`
fn direction_word(text: &str) -> Option<bool> {
    let lower = text.to_lowercase();
    let word = lower.split(|c: char| !c.is_alphabetic()).find(|w| !w.is_empty())?;
    if word.starts_with("max") {
        Some(true)
    } else if word.starts_with("min") {
        Some(false)
    } else {
        None
    }
}

/// Split `KEY: value` where KEY is an upper-case header word
fn header(line: &str) -> Option<(String, &str)> {
    let (key, value) = line.split_once(':')?;
    let key = key.trim();
    if key.is_empty() || !key.chars().all(|c| c.is_alphabetic() || c == '_') {
        return None;
    }
    Some((key.to_uppercase(), value.trim()))
}

#[derive(PartialEq)]
enum Section {
    Header,
    Constraints,
}

fn parse_block(block: &[(usize, &str)]) -> ParseResult<Extraction> {
    let mut tipo: Option<bool> = None;
    let mut objective_hint: Option<bool> = None;
    let mut objective: Option<LinearExpr> = None;
    let mut declared: Option<Vec<String>> = None;
    let mut lines: Vec<(usize, &str, LinearConstraint)> = Vec::new();
    let mut dropped_lines = Vec::new();
    let mut section = Section::Header;

    for &(line_number, raw) in block {
        let line = raw.trim();
        if line.is_empty() || line.starts_with("===") {
            continue;
        }

        if section == Section::Constraints {
            if let Some(item) = line.strip_prefix('-') {
                match Parser::parse_constraint(item) {
                    Ok(ConstraintLine::Bound { variables }) => {
                        debug!("line {}: non-negativity of {}", line_number, variables.join(", "));
                    }
                    Ok(ConstraintLine::Linear(c)) => lines.push((line_number, line, c)),
                    Err(e) => dropped_lines.push(dropped(line_number, line, e)),
                }
                continue;
            }
        }

        match header(line) {
            Some((key, value)) if key == "TIPO" => match direction_word(value) {
                Some(maximize) => tipo = Some(maximize),
                None => dropped_lines.push(dropped(line_number, line, "unknown optimization type")),
            },
            Some((key, value)) if key == "FUNCION_OBJETIVO" => {
                let before_eq = value.split('=').next().unwrap_or_default();
                objective_hint = direction_word(before_eq);
                objective = Some(Parser::parse_objective(value)?);
            }
            Some((key, _)) if key == "RESTRICCIONES" => section = Section::Constraints,
            Some((key, value)) if key == "VARIABLES" => {
                let names: Vec<String> = value
                    .split(',')
                    .map(|v| v.trim().to_string())
                    .filter(|v| !v.is_empty())
                    .collect();
                if names.is_empty() {
                    dropped_lines.push(dropped(line_number, line, "empty variable list"));
                } else {
                    declared = Some(names);
                }
                section = Section::Header;
            }
            _ => dropped_lines.push(dropped(line_number, line, "unrecognized line")),
        }
    }

    let objective = objective.ok_or(ParseError::MissingObjective)?;
    let maximize = tipo.or(objective_hint).unwrap_or(true);

    let variables = match declared {
        Some(names) => names,
        None => first_appearance(&objective, lines.iter().map(|(_, _, c)| c)),
    };
    let coefficients = objective.coefficients(&variables)?;

    let mut problem = LpProblem::new(variables);
    problem.set_objective(coefficients, maximize);
    for (line_number, text, c) in lines {
        match c.coefficients(&problem.variables) {
            Ok(row) => {
                let name = format!("R{}", problem.num_constraints() + 1);
                problem.add_constraint(name, row, c.op, c.rhs);
            }
            Err(e) => dropped_lines.push(dropped(line_number, text, e)),
        }
    }

    if problem.constraints.is_empty() {
        return Err(ParseError::MissingConstraints);
    }
    dropped_lines.sort_by_key(|d| d.line_number);

    Ok(Extraction {
        problem,
        confidence: Confidence::Structured,
        dropped: dropped_lines,
    })
}

fn first_appearance<'a>(objective: &LinearExpr, constraints: impl Iterator<Item = &'a LinearConstraint>) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    let mut push = |name: &str| {
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    };
    objective.variables().for_each(&mut push);
    for c in constraints {
        c.expr.variables().for_each(&mut push);
    }
    names
}

struct FreeText {
    objective: Option<(LinearExpr, bool)>,
    constraints: Vec<LinearConstraint>,
    dropped: Vec<DroppedLine>,
}

/// `<keyword> z = <expr>` anywhere in the line
fn objective_in_line(line: &str) -> Option<(LinearExpr, bool)> {
    let tokens = Lexer::tokenize(line);
    tokens.windows(3).enumerate().find_map(|(i, w)| {
        let keyword = w[0].text.to_lowercase();
        let is_objective = w[0].kind == TokenKind::Ident
            && OBJECTIVE_KEYWORDS.contains(&keyword.as_str())
            && w[1].kind == TokenKind::Ident
            && w[1].text.eq_ignore_ascii_case("z")
            && w[2].kind == TokenKind::Eq;
        if !is_objective {
            return None;
        }
        let mut parser = Parser::new(tokens[i + 3..].to_vec());
        let expr = parser.expression().ok()?;
        if expr.terms.is_empty() {
            return None;
        }
        Some((expr, keyword.starts_with("max")))
    })
}

fn search_free_text(text: &str) -> FreeText {
    let mut found = FreeText {
        objective: None,
        constraints: Vec::new(),
        dropped: Vec::new(),
    };

    for (index, raw) in text.lines().enumerate() {
        if found.objective.is_none() {
            if let Some(objective) = objective_in_line(raw) {
                found.objective = Some(objective);
                continue;
            }
        }

        // Prose prefixes such as "- " or "sujeto a:" precede the constraint
        let candidate = raw.rsplit(':').next().unwrap_or(raw).trim();
        let candidate = candidate
            .strip_prefix(['-', '•', '*'])
            .filter(|rest| rest.starts_with(char::is_whitespace))
            .unwrap_or(candidate);
        let has_relation = Lexer::tokenize(candidate).iter().any(|t| t.kind.is_relation());
        if !has_relation {
            continue;
        }
        match Parser::parse_constraint(candidate) {
            Ok(ConstraintLine::Linear(c)) => found.constraints.push(c),
            Ok(ConstraintLine::Bound { .. }) => {}
            Err(e) => found.dropped.push(dropped(index + 1, raw, e)),
        }
    }

    found
}

fn placeholder_objective() -> LinearExpr {
    let mut expr = LinearExpr::default();
    expr.add_term("x1", 3.0);
    expr.add_term("x2", 2.0);
    expr
}

fn placeholder_constraints() -> Vec<LinearConstraint> {
    let row = |a: f64, b: f64, rhs: f64| {
        let mut expr = LinearExpr::default();
        expr.add_term("x1", a);
        expr.add_term("x2", b);
        LinearConstraint {
            expr,
            op: ConstraintOp::Le,
            rhs,
        }
    };
    vec![row(1.0, 1.0, 6.0), row(2.0, 1.0, 8.0)]
}

fn assemble(
    objective: LinearExpr,
    maximize: bool,
    constraints: Vec<LinearConstraint>,
    dropped: Vec<DroppedLine>,
    confidence: Confidence,
) -> ParseResult<Extraction> {
    let variables = first_appearance(&objective, constraints.iter());
    let mut problem = LpProblem::new(variables);
    problem.set_objective(objective.coefficients(&problem.variables)?, maximize);
    for c in constraints {
        let name = format!("R{}", problem.num_constraints() + 1);
        let row = c.coefficients(&problem.variables)?;
        problem.add_constraint(name, row, c.op, c.rhs);
    }
    warn!(
        "extraction confidence is {}; the problem may not match the input",
        confidence.label()
    );
    Ok(Extraction {
        problem,
        confidence,
        dropped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    const SCENARIO_A: &str = "\
Analysis of the problem...

=== DATOS PARA GRÁFICA ===
TIPO: Maximizar
FUNCION_OBJETIVO: Z = 3x1 + 2x2
RESTRICCIONES:
- x1 + x2 <= 6
- 2x1 + x2 <= 8
- x1 <= 4
- x1 >= 0
- x2 >= 0
VARIABLES: x1, x2
=== FIN DATOS ===
Trailing commentary x1 + x2 <= 1000";

    #[test]
    fn test_structured_block() {
        init_logger();
        let extraction = Extractor::new().extract(SCENARIO_A).unwrap();
        assert!(extraction.is_authoritative());
        assert!(extraction.dropped.is_empty());

        let problem = &extraction.problem;
        assert_eq!(problem.variables, vec!["x1", "x2"]);
        assert_eq!(problem.objective.coefficients, vec![3.0, 2.0]);
        assert!(problem.objective.maximize);
        // bounds discarded, trailing text outside the block ignored
        assert_eq!(problem.num_constraints(), 3);
        assert_eq!(problem.constraints[2].name, "R3");
        assert_eq!(problem.constraints[2].coefficients, vec![1.0, 0.0]);
        assert_eq!(problem.constraints[2].rhs, 4.0);
    }

    #[test]
    fn test_direction() {
        let text = "=== DATOS PARA GRÁFICA ===\nTIPO: Minimizar\nFUNCION_OBJETIVO: Z = 2x1 + 3x2\nRESTRICCIONES:\n- x1 + x2 >= 4\n=== FIN DATOS ===";
        let problem = Extractor::new().extract(text).unwrap().problem;
        assert!(!problem.objective.maximize);
        assert_eq!(problem.constraints[0].op, ConstraintOp::Ge);

        // objective wording when TIPO is absent
        let text = "=== DATOS PARA GRAFICA ===\nFUNCION_OBJETIVO: Minimizar Z = 2x1 + 3x2\nRESTRICCIONES:\n- x1 + x2 >= 4\n=== FIN DATOS ===";
        assert!(!Extractor::new().extract(text).unwrap().problem.objective.maximize);

        // TIPO wins over the objective wording
        let text = "=== DATOS PARA GRÁFICA ===\nTIPO: Maximizar\nFUNCION_OBJETIVO: Minimizar Z = x1\nRESTRICCIONES:\n- x1 <= 4\n=== FIN DATOS ===";
        assert!(Extractor::new().extract(text).unwrap().problem.objective.maximize);
    }

    #[test]
    fn test_dropped_lines_are_reported() {
        init_logger();
        let text = "\
=== DATOS PARA GRÁFICA ===
FUNCION_OBJETIVO: Z = 3x1 + 2x2
RESTRICCIONES:
- x1 + x2 <= 6
- x1 + x2 = 5
- x1 + x3 <= 2
- 2x1 + x2 <= 8
VARIABLES: x1, x2
=== FIN DATOS ===";
        let extraction = Extractor::new().extract(text).unwrap();
        assert_eq!(extraction.problem.num_constraints(), 2);
        assert_eq!(extraction.problem.constraints[1].name, "R2");
        assert_eq!(extraction.problem.constraints[1].coefficients, vec![2.0, 1.0]);

        let numbers: Vec<_> = extraction.dropped.iter().map(|d| d.line_number).collect();
        assert_eq!(numbers, vec![5, 6]);
        assert!(extraction.dropped[0].reason.contains("Unsupported"));
        assert!(extraction.dropped[1].reason.contains("x3"));
    }

    #[test]
    fn test_variables_in_first_appearance_order() {
        let text = "=== DATOS PARA GRÁFICA ===\nFUNCION_OBJETIVO: Z = 5y\nRESTRICCIONES:\n- x + y <= 10\n- 2z + x <= 4\n=== FIN DATOS ===";
        let problem = Extractor::new().extract(text).unwrap().problem;
        assert_eq!(problem.variables, vec!["y", "x", "z"]);
        assert_eq!(problem.objective.coefficients, vec![5.0, 0.0, 0.0]);
        assert_eq!(problem.constraints[1].coefficients, vec![0.0, 1.0, 2.0]);
    }

    #[test]
    fn test_block_errors() {
        let no_objective = "=== DATOS PARA GRÁFICA ===\nRESTRICCIONES:\n- x1 <= 4\n=== FIN DATOS ===";
        assert_eq!(Extractor::new().extract(no_objective), Err(ParseError::MissingObjective));

        let no_constraints = "=== DATOS PARA GRÁFICA ===\nFUNCION_OBJETIVO: Z = x1\nRESTRICCIONES:\n- x1 >= 0\n=== FIN DATOS ===";
        assert_eq!(Extractor::new().extract(no_constraints), Err(ParseError::MissingConstraints));
    }

    #[test]
    fn test_unterminated_block_is_not_a_block() {
        let text = "=== DATOS PARA GRÁFICA ===\nFUNCION_OBJETIVO: Z = x1\n- x1 <= 4";
        assert_eq!(
            Extractor::new().with_fallback(Fallback::Strict).extract(text),
            Err(ParseError::MissingBlock)
        );
    }

    #[test]
    fn test_heuristic_free_text() {
        init_logger();
        let text = "We want to Maximize Z = 30x1 + 50x2\nsujeto a:\n- x1 + 3x2 <= 200\nRestriccion 2: x1 + x2 <= 100\nx1, x2 >= 0";
        let extraction = Extractor::new().with_fallback(Fallback::Heuristic).extract(text).unwrap();
        assert_eq!(extraction.confidence, Confidence::Heuristic);
        assert!(!extraction.is_authoritative());
        assert_eq!(extraction.problem.objective.coefficients, vec![30.0, 50.0]);
        assert_eq!(extraction.problem.num_constraints(), 2);
        assert_eq!(extraction.problem.constraints[0].coefficients, vec![1.0, 3.0]);
    }

    #[test]
    fn test_unit_words_do_not_become_variables() {
        init_logger();
        let text = "Maximizar Z = 3x1 + 2x2\nsujeto a:\n- x1 + x2 <= 6 horas\n- 2x1 + x2 <= 8 kg";
        let extraction = Extractor::new().extract(text).unwrap();

        assert_eq!(extraction.problem.variables, vec!["x1", "x2"]);
        let numbers: Vec<_> = extraction.dropped.iter().map(|d| d.line_number).collect();
        assert_eq!(numbers, vec![3, 4]);
        assert!(extraction.dropped[0].reason.contains("horas"));
        // nothing usable was left, so the constraints are the placeholder ones
        assert_eq!(extraction.confidence, Confidence::Placeholder);
    }

    #[test]
    fn test_heuristic_minimize_keyword() {
        let text = "min z = 2x1 + 3x2\nx1 + x2 >= 4";
        let extraction = Extractor::new().extract(text).unwrap();
        assert_eq!(extraction.confidence, Confidence::Heuristic);
        assert!(!extraction.problem.objective.maximize);
    }

    #[test]
    fn test_heuristic_only_failures() {
        let extractor = Extractor::new().with_fallback(Fallback::Heuristic);
        assert_eq!(extractor.extract("nothing useful"), Err(ParseError::NoObjectiveFound));
        assert_eq!(extractor.extract("maximizar z = x1 + x2"), Err(ParseError::MissingConstraints));
    }

    #[test]
    fn test_placeholder() {
        init_logger();
        let extraction = Extractor::new().extract("an image with no readable problem").unwrap();
        assert_eq!(extraction.confidence, Confidence::Placeholder);
        let problem = &extraction.problem;
        assert_eq!(problem.variables, vec!["x1", "x2"]);
        assert_eq!(problem.objective.coefficients, vec![3.0, 2.0]);
        assert!(problem.objective.maximize);
        assert_eq!(problem.constraints[0].coefficients, vec![1.0, 1.0]);
        assert_eq!(problem.constraints[1].coefficients, vec![2.0, 1.0]);
        assert_eq!(problem.constraints[1].rhs, 8.0);

        // objective found but constraints missing is still a placeholder
        let extraction = Extractor::new().extract("Maximizar Z = 5x1 + 4x2").unwrap();
        assert_eq!(extraction.confidence, Confidence::Placeholder);
        assert_eq!(extraction.problem.objective.coefficients, vec![5.0, 4.0]);
    }
}
