//! Operator interaction used by the workflows

use crate::error::Result;

/// Prompts and progress output.
///
/// The CLI implements this over stdin/stdout; tests script the answers.
pub trait Console: Send + Sync {
    fn info(&self, message: &str);

    fn warn(&self, message: &str);

    /// Yes/no question. An empty answer picks `default`.
    fn confirm(&self, prompt: &str, default: bool) -> Result<bool>;

    /// Free-text answer, trimmed
    fn input(&self, prompt: &str) -> Result<String>;

    /// Whether someone can answer prompts
    fn interactive(&self) -> bool {
        true
    }
}
