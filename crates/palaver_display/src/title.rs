use std::fmt::{self, Display, Formatter};

use colored::Colorize;
use convert_case::{Case, Casing};
use derive_setters::Setters;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Category {
    Action,
    Info,
    Error,
}

/// One status line of the terminal UI: a title in title case, an optional
/// sub title with the details and an optional error.
#[derive(Clone, Setters)]
#[setters(into, strip_option)]
pub struct TitleFormat {
    pub title: String,
    pub sub_title: Option<String>,
    #[setters(skip)]
    pub error: Option<String>,
    #[setters(skip)]
    pub category: Category,
}

impl TitleFormat {
    pub fn new(title: impl Into<String>) -> Self {
        Self::action(title)
    }

    pub fn action(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            sub_title: None,
            error: None,
            category: Category::Action,
        }
    }

    pub fn info(title: impl Into<String>) -> Self {
        Self { category: Category::Info, ..Self::action(title) }
    }

    /// Error line; the message goes in the sub title.
    pub fn error(message: impl Into<String>) -> Self {
        Self { category: Category::Error, ..Self::action("error") }.sub_title(message)
    }

    /// Marks the line as failed with `error`.
    pub fn failure(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn format(&self) -> String {
        let mut buf = String::new();
        let bullet = match self.category {
            Category::Action => "⏺".blue(),
            Category::Info => "⏺".white(),
            Category::Error => "⏺".red(),
        };
        buf.push_str(format!("{bullet} ").as_str());

        let mut title = self.title.to_case(Case::Title).white().bold();
        if self.error.is_some() || self.category == Category::Error {
            title = title.red().bold();
        }

        buf.push_str(&format!("{title}"));

        if let Some(ref sub_title) = self.sub_title {
            buf.push_str(&format!(" {}", sub_title.dimmed()));
        }

        if let Some(ref error) = self.error {
            buf.push_str(&format!(" {}", error.red()));
        }

        buf
    }
}

impl Display for TitleFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn plain(title: &TitleFormat) -> String {
        strip_ansi_escapes::strip_str(title.to_string())
    }

    #[test]
    fn test_title_case() {
        let fixture = TitleFormat::action("web_search").sub_title(r#"{"query":"praias"}"#);
        assert_eq!(plain(&fixture), r#"⏺ Web Search {"query":"praias"}"#);
    }

    #[test]
    fn test_error_line() {
        let fixture = TitleFormat::error("Empty response from the server. Please try again.");
        assert_eq!(
            plain(&fixture),
            "⏺ Error Empty response from the server. Please try again."
        );
        assert_eq!(fixture.category, Category::Error);
    }

    #[test]
    fn test_tool_failure() {
        let fixture = TitleFormat::action("web_search")
            .sub_title("call_1")
            .failure(r#"{"error":"Search failed. Please try again."}"#);
        assert_eq!(
            plain(&fixture),
            r#"⏺ Web Search call_1 {"error":"Search failed. Please try again."}"#
        );
    }
}
