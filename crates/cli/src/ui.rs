//! Terminal UI helpers for consistent colored output.

use std::future::Future;

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;

/// Print a success message with green checkmark.
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print an info message with blue info icon.
pub fn info(msg: &str) {
    eprintln!("{} {}", "ℹ".blue(), msg);
}

/// Print an error message with red X.
fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print a hint/suggestion (dimmed, indented).
pub fn hint(msg: &str) {
    eprintln!("  {} {}", "→".dimmed(), msg.dimmed());
}

/// Format a value as bold (for names, scores, etc.).
pub fn bold(s: &str) -> String {
    s.bold().to_string()
}

/// Format a score the way the leaderboard shows it: no decimals when whole.
pub fn score(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.2}")
    }
}

/// Run an async operation with a spinner showing the given message.
/// Returns the result of the operation.
pub async fn spin<T, F: Future<Output = T>>(msg: &str, fut: F) -> T {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.dim} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(msg.to_string());
    spinner.enable_steady_tick(std::time::Duration::from_millis(80));

    let result = fut.await;

    spinner.finish_and_clear();
    result
}

/// Display an error with contextual hints based on the error message.
pub fn print_error(err: &anyhow::Error) {
    let msg = err.to_string();
    error(&msg);

    // Add contextual hints based on error patterns (more specific checks first)
    if msg.contains("No player name") {
        // Already has suggestion in message
    } else if msg.contains("rate-limit exceeded") || msg.contains("Too Many Requests") {
        hint("Slow down: feeds are limited per minute. Try again shortly.");
    } else if msg.contains("unknown auto-feeder type") {
        hint("See what is for sale: feeder shop");
    } else if msg.contains("connection")
        || msg.contains("Connection")
        || msg.contains("dns")
        || msg.contains("timeout")
        || msg.contains("Timeout")
        || msg.contains("resolve")
    {
        hint("Is the server running? Check FEEDER_API_URL.");
    }
}
