use std::collections::HashMap;
use std::io::{self, Write};

use colored::Colorize;
use palaver_display::{MarkdownFormat, TitleFormat};
use palaver_domain::{ChatResponse, ToolCallId, Usage};
use tokio::sync::mpsc::Receiver;
use tracing::warn;

/// Writes the events of the orchestrator to the terminal as they arrive.
pub struct Renderer {
    markdown: MarkdownFormat,
    verbose: bool,
    /// Deltas of the current answer were already printed
    streamed: bool,
    usage: Option<Usage>,
    /// Outputs suggested for the calls that wait for manual input
    suggestions: HashMap<ToolCallId, String>,
}

impl Renderer {
    pub fn new(verbose: bool) -> Self {
        Self {
            markdown: MarkdownFormat::new(),
            verbose,
            streamed: false,
            usage: None,
            suggestions: HashMap::new(),
        }
    }

    pub fn suggested_output(&self, call_id: &ToolCallId) -> Option<&str> {
        self.suggestions.get(call_id).map(String::as_str)
    }

    /// Usage reported for the last request, if the upstream sent any
    pub fn usage(&self) -> Option<&Usage> {
        self.usage.as_ref()
    }

    /// A structured answer is pretty printed, anything else is markdown.
    fn format_answer(&self, text: String) -> String {
        match serde_json::from_str::<serde_json::Value>(text.trim()) {
            Ok(value) if value.is_object() || value.is_array() => {
                serde_json::to_string_pretty(&value).unwrap_or(text)
            }
            _ => self.markdown.render(text),
        }
    }

    /// Drains the channel until every sender is gone.
    pub async fn render(&mut self, mut rx: Receiver<ChatResponse>) {
        while let Some(message) = rx.recv().await {
            if let Err(error) = self.on_response(message) {
                warn!(error = ?error, "Failed to write to the terminal");
            }
        }
    }

    fn on_response(&mut self, message: ChatResponse) -> io::Result<()> {
        let mut stdout = io::stdout();
        match message {
            ChatResponse::Text { text, is_complete: false } => {
                self.streamed = true;
                write!(stdout, "{text}")?;
            }
            ChatResponse::Text { text, is_complete: true } => {
                if self.streamed {
                    writeln!(stdout)?;
                } else if !text.trim().is_empty() {
                    writeln!(stdout, "{}", self.format_answer(text))?;
                }
                self.streamed = false;
            }
            ChatResponse::Reasoning(reasoning) => {
                if self.verbose {
                    writeln!(stdout, "{}", reasoning.dimmed())?;
                }
            }
            ChatResponse::ToolCallStart(call) => {
                writeln!(
                    stdout,
                    "{}",
                    TitleFormat::action(call.name.as_str()).sub_title(call.arguments)
                )?;
            }
            ChatResponse::ToolCallEnd(result) => {
                if result.is_error() {
                    let title = TitleFormat::action(result.name.as_str())
                        .sub_title(result.call_id.as_str())
                        .failure(result.output.content);
                    writeln!(stdout, "{title}")?;
                } else if self.verbose {
                    let title = TitleFormat::info(result.name.as_str())
                        .sub_title(result.output.content);
                    writeln!(stdout, "{title}")?;
                }
            }
            ChatResponse::ToolOutputRequired(calls) => {
                writeln!(
                    stdout,
                    "{}",
                    TitleFormat::info("tool output required")
                        .sub_title(format!("{} pending call(s)", calls.len()))
                )?;
                self.suggestions.clear();
                for manual in calls {
                    if let Some(output) = manual.default_output {
                        self.suggestions.insert(manual.call_id.clone(), output);
                    }
                    let title = TitleFormat::action(manual.call.name.as_str())
                        .sub_title(format!("{} {}", manual.call_id, manual.call.arguments));
                    writeln!(stdout, "{title}")?;
                }
            }
            ChatResponse::Notice(notice) => {
                writeln!(stdout, "{}", TitleFormat::info("notice").sub_title(notice))?;
            }
            ChatResponse::Error(error) => {
                if self.streamed {
                    writeln!(stdout)?;
                    self.streamed = false;
                }
                eprintln!("{}", TitleFormat::error(error));
            }
            ChatResponse::Usage(usage) => {
                self.usage = Some(usage);
            }
        }
        stdout.flush()
    }
}
