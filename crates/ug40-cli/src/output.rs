//! Terminal message helpers

use colored::Colorize;

pub fn header(text: &str) {
    println!("\n{}", text.bold().underline());
}

pub fn info(text: &str) {
    println!("{} {}", "•".blue(), text);
}

pub fn success(text: &str) {
    println!("{} {}", "✓".green().bold(), text);
}

pub fn warning(text: &str) {
    eprintln!("{} {}", "!".yellow().bold(), text.yellow());
}

pub fn error(text: &str) {
    eprintln!("{} {}", "✗".red().bold(), text.red());
}

/// A `label: value` line with the label dimmed
pub fn field(label: &str, value: impl std::fmt::Display) {
    println!("   {:<22} {}", format!("{}:", label).dimmed(), value);
}
