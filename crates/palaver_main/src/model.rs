use palaver_domain::{MaxTokens, OutputFormat, ReasoningEffort, Temperature};
use palaver_services::FormatRegistry;

use crate::error::Error;

/// Input typed at the interactive prompt.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Any input that doesn't start with '/' is sent to the model.
    Message(String),
    /// Replace the system instructions. Without text no instructions are sent.
    Instructions(String),
    Effort(Option<ReasoningEffort>),
    Temperature(Temperature),
    MaxTokens(MaxTokens),
    Tools(bool),
    Manual(bool),
    /// Structured answers following a named schema, free text when `None`.
    Format(Option<OutputFormat>),
    Stream(bool),
    /// Open the form for the outputs of the pending tool calls.
    Submit,
    /// Start over with an empty conversation.
    Reset,
    Status,
    Help,
    Exit,
}

impl Command {
    pub fn available_commands() -> Vec<&'static str> {
        vec![
            "/instructions",
            "/effort",
            "/temperature",
            "/max-tokens",
            "/tools",
            "/manual",
            "/format",
            "/stream",
            "/submit",
            "/reset",
            "/status",
            "/help",
            "/exit",
        ]
    }

    pub fn help_text() -> &'static str {
        "Commands:
/instructions [text] - Replace the system instructions, empty to send none
/effort <level>      - Reasoning effort: low, medium, high or off
/temperature <value> - Sampling temperature between 0 and 1
/max-tokens <value>  - Upper bound for the tokens of each answer
/tools <on|off>      - Declare the tools to the model
/manual <on|off>     - Type the output of tool calls instead of running them
/format <name|off>   - Answer in JSON following a schema: calendar_event, contact_list, contact_reason
/stream <on|off>     - Stream answers as they are generated
/submit              - Answer the pending tool calls
/reset               - Start a new conversation
/status              - Show the current settings
/help                - Show this help
/exit                - Quit

Anything else is sent to the model."
    }

    /// Parses a line of the prompt. Blank lines are not commands.
    pub fn parse_line(input: &str) -> Option<anyhow::Result<Self>> {
        (!input.trim().is_empty()).then(|| Self::parse(input))
    }

    pub fn parse(input: &str) -> anyhow::Result<Self> {
        let trimmed = input.trim();
        if !trimmed.starts_with('/') {
            return Ok(Command::Message(trimmed.to_string()));
        }

        let (name, argument) = match trimmed.split_once(char::is_whitespace) {
            Some((name, argument)) => (name, argument.trim()),
            None => (trimmed, ""),
        };

        let required = || {
            Some(argument)
                .filter(|argument| !argument.is_empty())
                .ok_or_else(|| Error::MissingParameter(name.to_string()))
        };
        let invalid = || Error::InvalidParameter {
            command: name.to_string(),
            value: argument.to_string(),
        };

        let command = match name {
            "/instructions" => Command::Instructions(argument.to_string()),
            "/effort" => Command::Effort(ReasoningEffort::parse_opt(required()?)?),
            "/temperature" => {
                let value = required()?.parse::<f32>().map_err(|_| invalid())?;
                Command::Temperature(Temperature::new(value)?)
            }
            "/max-tokens" => {
                let value = required()?.parse::<u32>().map_err(|_| invalid())?;
                Command::MaxTokens(MaxTokens::new(value)?)
            }
            "/tools" => Command::Tools(parse_switch(required()?).ok_or_else(invalid)?),
            "/manual" => Command::Manual(parse_switch(required()?).ok_or_else(invalid)?),
            "/format" => match required()? {
                "off" | "none" => Command::Format(None),
                name => Command::Format(Some(FormatRegistry.find(name).ok_or_else(invalid)?)),
            },
            "/stream" => Command::Stream(parse_switch(required()?).ok_or_else(invalid)?),
            "/submit" => Command::Submit,
            "/reset" | "/new" => Command::Reset,
            "/status" => Command::Status,
            "/help" => Command::Help,
            "/exit" | "/end" => Command::Exit,
            other => return Err(Error::UnknownCommand(other.to_string()).into()),
        };

        Ok(command)
    }
}

fn parse_switch(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "on" | "true" | "yes" | "1" => Some(true),
        "off" | "false" | "no" | "0" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn error(input: &str) -> Error {
        Command::parse(input)
            .unwrap_err()
            .downcast::<Error>()
            .unwrap()
    }

    #[test]
    fn test_message() {
        let actual = Command::parse("  Quais as melhores praias?  ").unwrap();
        assert_eq!(actual, Command::Message("Quais as melhores praias?".to_string()));
    }

    #[test]
    fn test_blank_lines_are_skipped() {
        assert!(Command::parse_line("").is_none());
        assert!(Command::parse_line(" \t ").is_none());

        let actual = Command::parse_line(" /status ").unwrap().unwrap();
        assert_eq!(actual, Command::Status);
    }

    #[test]
    fn test_settings() {
        assert_eq!(
            Command::parse("/effort high").unwrap(),
            Command::Effort(Some(ReasoningEffort::High))
        );
        assert_eq!(Command::parse("/effort off").unwrap(), Command::Effort(None));
        assert_eq!(
            Command::parse("/temperature 0.5").unwrap(),
            Command::Temperature(Temperature::new(0.5).unwrap())
        );
        assert_eq!(
            Command::parse("/max-tokens 4096").unwrap(),
            Command::MaxTokens(MaxTokens::new(4096).unwrap())
        );
        assert_eq!(Command::parse("/tools on").unwrap(), Command::Tools(true));
        assert_eq!(Command::parse("/manual OFF").unwrap(), Command::Manual(false));
        assert_eq!(Command::parse("/stream off").unwrap(), Command::Stream(false));
        assert_eq!(
            Command::parse("/format contact_list").unwrap(),
            Command::Format(FormatRegistry.find("contact_list"))
        );
        assert_eq!(Command::parse("/format off").unwrap(), Command::Format(None));
        assert_eq!(
            Command::parse("/instructions Be brief.  ").unwrap(),
            Command::Instructions("Be brief.".to_string())
        );
        assert_eq!(
            Command::parse("/instructions").unwrap(),
            Command::Instructions(String::new())
        );
    }

    #[test]
    fn test_actions() {
        assert_eq!(Command::parse("/submit").unwrap(), Command::Submit);
        assert_eq!(Command::parse("/reset").unwrap(), Command::Reset);
        assert_eq!(Command::parse("/status").unwrap(), Command::Status);
        assert_eq!(Command::parse("/help").unwrap(), Command::Help);
        assert_eq!(Command::parse("/exit").unwrap(), Command::Exit);
    }

    #[test]
    fn test_errors() {
        assert!(matches!(error("/tools"), Error::MissingParameter(name) if name == "/tools"));
        assert!(matches!(
            error("/tools maybe"),
            Error::InvalidParameter { value, .. } if value == "maybe"
        ));
        assert!(matches!(error("/temperature hot"), Error::InvalidParameter { .. }));
        assert!(matches!(
            error("/format invoice"),
            Error::InvalidParameter { value, .. } if value == "invoice"
        ));
        assert!(matches!(error("/models"), Error::UnknownCommand(name) if name == "/models"));

        assert!(Command::parse("/temperature 1.5").is_err());
        assert!(Command::parse("/max-tokens 0").is_err());
        assert!(Command::parse("/effort extreme").is_err());
    }

    #[test]
    fn test_available_commands_are_parsed() {
        for command in Command::available_commands() {
            let actual = Command::parse(&format!("{command} on"));
            let known = !matches!(
                actual.as_ref().map_err(|error| error.downcast_ref::<Error>()),
                Err(Some(Error::UnknownCommand(_)))
            );
            assert!(known, "{command}");
        }
    }
}
