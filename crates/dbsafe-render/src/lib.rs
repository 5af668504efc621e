//! Renderers for dbsafe analysis reports.
//!
//! Four views over the same [`AnalysisReport`]: a styled terminal view
//! (default), plain text for logs and pipes, contractual JSON, and
//! Markdown for runbooks.

pub mod markdown;
pub mod plain;
pub mod styles;
pub mod terminal;
pub mod text;

use dbsafe_core::report::AnalysisReport;

/// Output format selector, matching the CLI's `--format` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Styled terminal view.
    #[default]
    Text,
    /// Plain text, no color or icons.
    Plain,
    /// Pretty-printed JSON with the contractual keys.
    Json,
    /// Markdown.
    Markdown,
}

impl OutputFormat {
    /// Parses the CLI spelling.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "text" => Some(Self::Text),
            "plain" => Some(Self::Plain),
            "json" => Some(Self::Json),
            "markdown" => Some(Self::Markdown),
            _ => None,
        }
    }
}

/// Renders a report in the requested format.
pub fn render(report: &AnalysisReport, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => text::render(report),
        OutputFormat::Plain => plain::render(report),
        OutputFormat::Json => {
            serde_json::to_string_pretty(report).unwrap_or_else(|e| {
                // A report is always serializable; this guards the contract.
                format!("{{\"error\":\"failed to serialize report: {}\"}}", e)
            })
        }
        OutputFormat::Markdown => markdown::render(report),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_parsing() {
        assert_eq!(OutputFormat::parse("text"), Some(OutputFormat::Text));
        assert_eq!(OutputFormat::parse("plain"), Some(OutputFormat::Plain));
        assert_eq!(OutputFormat::parse("json"), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::parse("markdown"), Some(OutputFormat::Markdown));
        assert_eq!(OutputFormat::parse("yaml"), None);
    }
}
