//! Shared colours: `colored` helpers for the headless commands and a
//! ratatui palette for the TUI.

use colored::Colorize;

pub fn print_header(title: &str) {
    let rule = "─".repeat(title.chars().count() + 4);
    println!("{}", rule.cyan());
    println!("  {}", title.bold().bright_cyan());
    println!("{}", rule.cyan());
}

pub fn heading(text: &str) -> String {
    text.bold().bright_white().to_string()
}

pub fn accent(text: &str) -> String {
    text.cyan().to_string()
}

pub fn accent_bright(text: &str) -> String {
    text.bright_cyan().bold().to_string()
}

pub fn muted(text: &str) -> String {
    text.bright_black().to_string()
}

pub fn bold(text: &str) -> String {
    text.bold().to_string()
}

pub fn warn(text: &str) -> String {
    text.yellow().to_string()
}

pub fn error(text: &str) -> String {
    text.red().bold().to_string()
}

pub fn icon_ok(text: &str) -> String {
    format!("{} {}", "✓".green().bold(), text)
}

pub fn icon_warn(text: &str) -> String {
    format!("{} {}", "⚠".yellow().bold(), text)
}

pub fn icon_err(text: &str) -> String {
    format!("{} {}", "✗".red().bold(), text)
}

#[cfg(feature = "tui")]
pub mod tui_palette {
    use ratatui::style::{Color, Modifier, Style};

    pub const ACCENT: Color = Color::Cyan;
    pub const ACCENT_BRIGHT: Color = Color::LightCyan;
    pub const TEXT: Color = Color::White;
    pub const TEXT_DIM: Color = Color::Gray;
    pub const MUTED: Color = Color::DarkGray;
    pub const SUCCESS: Color = Color::LightGreen;
    pub const WARN: Color = Color::Yellow;
    pub const ERROR: Color = Color::LightRed;

    pub fn title_focused() -> Style {
        Style::default()
            .fg(ACCENT_BRIGHT)
            .add_modifier(Modifier::BOLD)
    }

    pub fn focused_border() -> Style {
        Style::default().fg(ACCENT)
    }

    /// Style of the element that currently has focus inside a dialog.
    pub fn selected() -> Style {
        Style::default()
            .fg(Color::Black)
            .bg(ACCENT)
            .add_modifier(Modifier::BOLD)
    }

    pub fn disabled() -> Style {
        Style::default().fg(MUTED)
    }
}
