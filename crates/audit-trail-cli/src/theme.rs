//! CLI theme and styling.

use chrono::{DateTime, Utc};
use colored::Colorize;

/// CLI theme configuration.
pub(crate) struct Theme;

impl Theme {
    /// Format a header.
    pub(crate) fn header(text: &str) -> String {
        format!("{}", text.bold().cyan())
    }

    /// Format a success message.
    pub(crate) fn success(text: &str) -> String {
        format!("{} {}", "✓".green(), text)
    }

    /// Format an error message.
    pub(crate) fn error(text: &str) -> String {
        format!("{} {}", "✗".red(), text.red())
    }

    /// Format a warning message.
    pub(crate) fn warning(text: &str) -> String {
        format!("{} {}", "!".yellow(), text.yellow())
    }

    /// Format an info message.
    pub(crate) fn info(text: &str) -> String {
        format!("{} {}", "i".blue(), text)
    }

    /// Format a dimmed message.
    pub(crate) fn dimmed(text: &str) -> String {
        format!("{}", text.dimmed())
    }

    /// Format a separator line.
    pub(crate) fn separator() -> String {
        "━".repeat(60).dimmed().to_string()
    }

    /// Format a key-value pair.
    pub(crate) fn kv(key: &str, value: &str) -> String {
        format!("{}: {}", key.bold(), value)
    }

    /// Format an event ID.
    pub(crate) fn event_id(id: &str) -> String {
        format!("{}", id.cyan())
    }

    /// Format a hash (shortened).
    pub(crate) fn hash(hash: &str) -> String {
        let short = hash.get(..12).unwrap_or(hash);
        format!("{}", short.dimmed())
    }

    /// Format an optional timestamp.
    pub(crate) fn timestamp(dt: Option<&DateTime<Utc>>) -> String {
        dt.map_or_else(
            || "-".dimmed().to_string(),
            |dt| dt.format("%Y-%m-%d %H:%M:%S").to_string().dimmed().to_string(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_shortened() {
        colored::control::set_override(false);
        assert_eq!(Theme::hash("0123456789abcdef"), "0123456789ab");
        assert_eq!(Theme::hash("abc"), "abc");
    }

    #[test]
    fn test_missing_timestamp() {
        colored::control::set_override(false);
        assert_eq!(Theme::timestamp(None), "-");
    }
}
