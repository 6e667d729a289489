pub mod ast;
pub mod extract;
pub mod lexer;
pub mod parser;

pub use ast::*;
pub use extract::{Confidence, DroppedLine, Extraction, Extractor, Fallback};
pub use lexer::{Lexer, Token, TokenKind};
pub use parser::{ParseError, ParseResult, Parser};

use log::warn;
use lpstep_solver::{LpProblem, SolveResult, Solver};

/// Outcome of solving a problem written as text
#[derive(Debug, Clone)]
pub struct TextSolve {
    /// `None` when extraction failed
    pub confidence: Option<Confidence>,
    pub dropped: Vec<DroppedLine>,
    pub problem: Option<LpProblem>,
    pub result: SolveResult,
}

impl TextSolve {
    pub fn is_authoritative(&self) -> bool {
        self.confidence == Some(Confidence::Structured)
    }
}

/// Extract a problem from `text` and solve it. Extraction failures become
/// a result with `status = error`.
pub fn solve_text(text: &str, extractor: &Extractor, solver: &Solver) -> TextSolve {
    match extractor.extract(text) {
        Ok(extraction) => {
            let result = solver.solve(&extraction.problem);
            TextSolve {
                confidence: Some(extraction.confidence),
                dropped: extraction.dropped,
                problem: Some(extraction.problem),
                result,
            }
        }
        Err(e) => {
            warn!("could not extract a problem: {}", e);
            TextSolve {
                confidence: None,
                dropped: Vec::new(),
                problem: None,
                result: SolveResult::error(format!("Parse error: {}", e)),
            }
        }
    }
}
