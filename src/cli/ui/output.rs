use console::{Term, style};

/// Styled terminal output. Status lines go to stdout, errors to stderr.
pub struct Output {
    color: bool,
}

impl Output {
    pub fn new() -> Self {
        Self {
            color: Term::stdout().is_term(),
        }
    }

    pub fn success(&self, message: &str) {
        println!("{} {}", style("✓").green(), message);
    }

    pub fn error(&self, message: &str) {
        eprintln!("{} {}", style("✗").red(), message);
    }

    pub fn warning(&self, message: &str) {
        println!("{} {}", style("⚠").yellow(), message);
    }

    pub fn info(&self, message: &str) {
        println!("{} {}", style("ℹ").blue(), message);
    }

    pub fn header(&self, message: &str) {
        println!("\n{}", style(message).bold().underlined());
    }

    pub fn section(&self, message: &str) {
        println!("\n{}", style(message).bold());
        println!("{}", "─".repeat(40));
    }

    /// Aligned `label: value` line
    pub fn field(&self, label: &str, value: impl std::fmt::Display) {
        println!("  {:<14} {}", style(format!("{}:", label)).dim(), value);
    }

    /// Separator printed between documents when several repositories render
    /// to one stream
    pub fn rule(&self, title: &str) {
        if self.color {
            println!("\n{} {}\n", style("───").dim(), style(title).cyan().bold());
        } else {
            println!("\n<!-- {} -->\n", title);
        }
    }
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}
