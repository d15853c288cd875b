use derive_setters::Setters;
use regex::Regex;
use termimad::crossterm::style::{Attribute, Color};
use termimad::{CompoundStyle, LineStyle, MadSkin};

/// Renders assistant answers, which are markdown, for the terminal.
#[derive(Clone, Setters, Default)]
#[setters(into, strip_option)]
pub struct MarkdownFormat {
    skin: MadSkin,
    max_consecutive_newlines: usize,
}

impl MarkdownFormat {
    pub fn new() -> Self {
        let mut skin = MadSkin::default();
        let compound_style = CompoundStyle::new(Some(Color::Cyan), None, Attribute::Bold.into());
        skin.inline_code = compound_style;

        let mut codeblock_style = CompoundStyle::new(None, None, Default::default());
        codeblock_style.add_attr(Attribute::Dim);

        skin.code_block = LineStyle::new(codeblock_style, Default::default());

        Self { skin, max_consecutive_newlines: 2 }
    }

    pub fn render(&self, content: impl Into<String>) -> String {
        let content = content.into();
        let content = self.strip_excessive_newlines(content.trim());

        self.skin.term_text(&content).to_string().trim().to_string()
    }

    fn strip_excessive_newlines(&self, content: &str) -> String {
        if content.is_empty() {
            return content.to_string();
        }

        let pattern = format!(r"\n{{{},}}", self.max_consecutive_newlines + 1);
        match Regex::new(&pattern) {
            Ok(re) => {
                let replacement = "\n".repeat(self.max_consecutive_newlines);
                re.replace_all(content, replacement.as_str()).to_string()
            }
            Err(_) => content.to_string(),
        }
    }
}
