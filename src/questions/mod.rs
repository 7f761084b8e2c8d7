// Public API
pub use provider::{OpenRouterQuestionProvider, QuestionProvider};

// Internal modules
pub mod fallback;
mod provider;

use serde::{Deserialize, Serialize};

/// Number of questions requested per game. The upstream may return fewer;
/// anything beyond this count is truncated.
pub const QUESTION_COUNT: usize = 50;

/// Topic string baked into every generation request. Not client-configurable.
pub const QUESTION_TOPIC: &str = "различные области знаний, такие как наука, история, география, технологии, кино, музыка, литература, спорт";

/// A single quiz question. Immutable once generated.
///
/// Field names match the upstream JSON contract (`correct_answer` in
/// snake_case), which is also what the fallback set uses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: String,
}

impl QuizQuestion {
    /// Checks the structural contract: non-empty text, exactly 4 distinct
    /// options, and a correct answer that is verbatim one of the options.
    pub fn is_valid(&self) -> bool {
        if self.question.trim().is_empty() || self.options.len() != 4 {
            return false;
        }
        let distinct: std::collections::HashSet<&str> =
            self.options.iter().map(|o| o.as_str()).collect();
        distinct.len() == 4 && self.options.contains(&self.correct_answer)
    }
}
