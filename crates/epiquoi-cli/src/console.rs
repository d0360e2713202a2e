//! Terminal rendering

use colored::*;
use std::io::{self, Write};

/// Label shown before the backend reports any progress
pub const INITIAL_STATUS: &str = "Réflexion";

/// CLI console for formatted output
pub struct Console {
    verbose: bool,
}

impl Console {
    pub const fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Print an info message (verbose mode only)
    pub fn info(&self, message: &str) {
        if self.verbose {
            println!("{} {}", "ℹ".blue().bold(), message);
        }
    }

    /// Print a warning message
    pub fn warn(&self, message: &str) {
        println!("{} {}", "⚠".yellow().bold(), message.yellow());
    }

    pub fn print_banner(&self, backend: &str) {
        println!();
        println!("{}", "EpiQuoi".bold().underline());
        println!(
            "{}",
            format!("Assistant Epitech connecté à {backend}").dimmed()
        );
        println!(
            "{}",
            "Tapez /reset pour recommencer, /quit pour sortir.".dimmed()
        );
        println!();
    }

    /// Print the input prompt without a newline
    pub fn prompt(&self) -> io::Result<()> {
        print!("{} ", ">".cyan().bold());
        io::stdout().flush()
    }

    /// Replace the status line with `label`
    pub fn status(&self, label: &str) {
        let mut stderr = io::stderr();
        let _ = write!(stderr, "\r\x1b[2K{} {}…", "⠿".magenta(), label.dimmed());
        let _ = stderr.flush();
    }

    pub fn clear_status(&self) {
        let mut stderr = io::stderr();
        let _ = write!(stderr, "\r\x1b[2K");
        let _ = stderr.flush();
    }

    /// Print a bot reply
    pub fn bot(&self, text: &str) {
        println!("{} {}", "EpiQuoi".green().bold(), render_markdown(text));
        println!();
    }

    /// Print a bot message that reports a failure
    pub fn bot_error(&self, text: &str) {
        println!("{} {}", "EpiQuoi".red().bold(), render_markdown(text));
        println!();
    }
}

/// Render `**bold**` spans and normalise the backend's ` \n\n ` paragraph breaks
pub fn render_markdown(text: &str) -> String {
    let text = text.replace(" \n\n ", "\n\n");
    text.split("**")
        .enumerate()
        .map(|(i, part)| {
            if i % 2 == 1 {
                part.bold().to_string()
            } else {
                part.to_string()
            }
        })
        .collect()
}
