use colored::Colorize;
use std::io::{IsTerminal, Write};
use tfvarenv_core::{Console, Result};

/// Console over stdin/stdout
pub struct TerminalConsole;

impl TerminalConsole {
    fn read_answer(prompt: &str) -> Result<String> {
        print!("{}", prompt);
        std::io::stdout().flush()?;

        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;
        Ok(input.trim().to_string())
    }
}

impl Console for TerminalConsole {
    fn info(&self, message: &str) {
        println!("{}", message);
    }

    fn warn(&self, message: &str) {
        println!("{} {}", "⚠".yellow(), message.yellow());
    }

    fn confirm(&self, prompt: &str, default: bool) -> Result<bool> {
        let hint = if default { "[Y/n]" } else { "[y/N]" };
        let answer = Self::read_answer(&format!("{} {}: ", prompt, hint))?;

        Ok(match answer.to_lowercase().as_str() {
            "" => default,
            "y" | "yes" => true,
            _ => false,
        })
    }

    fn input(&self, prompt: &str) -> Result<String> {
        Self::read_answer(&format!("{}: ", prompt))
    }

    fn interactive(&self) -> bool {
        std::io::stdin().is_terminal()
    }
}
