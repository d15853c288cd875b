use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;
use palaver_domain::{
    ApiShape, MaxTokens, ModelId, OutputFormat, ReasoningEffort, SessionConfig, Temperature,
};
use palaver_services::FormatRegistry;

use crate::error::Error;

#[derive(Parser, Debug)]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Direct prompt to process without entering interactive mode.
    ///
    /// The answer is streamed, followed by the token usage and the elapsed
    /// time.
    #[arg(long, short = 'p')]
    pub prompt: Option<String>,

    /// API shape of the inference service, overrides PALAVER_API.
    #[arg(long)]
    pub api: Option<ApiShape>,

    /// Declare the tools to the model.
    #[arg(long, default_value_t = false)]
    pub tools: bool,

    /// Ask for the output of every tool call instead of executing it.
    #[arg(long, default_value_t = false)]
    pub manual: bool,

    /// Reasoning effort: low, medium, high or off.
    #[arg(long)]
    pub effort: Option<String>,

    /// Sampling temperature between 0 and 1.
    #[arg(long)]
    pub temperature: Option<f32>,

    /// Upper bound for the tokens of each answer.
    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// System instructions. An empty value sends none.
    #[arg(long)]
    pub instructions: Option<String>,

    /// Answer in JSON following a built-in schema: calendar_event,
    /// contact_list or contact_reason.
    #[arg(long, conflicts_with = "schema")]
    pub format: Option<String>,

    /// Answer in JSON following the JSON schema in this file.
    #[arg(long)]
    pub schema: Option<PathBuf>,

    /// Wait for the complete answer instead of streaming it.
    #[arg(long, default_value_t = false)]
    pub no_stream: bool,

    /// Show reasoning and tool outputs.
    #[arg(long, default_value_t = false)]
    pub verbose: bool,
}

impl Cli {
    /// Configuration of the first request, the defaults overridden by flags.
    pub fn session_config(&self, model: ModelId) -> anyhow::Result<SessionConfig> {
        let mut config = SessionConfig::new(model)
            .tools_enabled(self.tools)
            .manual_tool_output(self.manual)
            .stream(!self.no_stream)
            .output_format(self.output_format()?);

        if let Some(ref instructions) = self.instructions {
            config = config.instructions(instructions.as_str());
        }
        if let Some(ref effort) = self.effort {
            config = config.reasoning_effort(ReasoningEffort::parse_opt(effort)?);
        }
        if let Some(temperature) = self.temperature {
            config = config.temperature(Temperature::new(temperature)?);
        }
        if let Some(max_tokens) = self.max_tokens {
            config = config.max_tokens(MaxTokens::new(max_tokens)?);
        }

        Ok(config)
    }

    fn output_format(&self) -> anyhow::Result<Option<OutputFormat>> {
        if let Some(ref name) = self.format {
            let format = FormatRegistry.find(name).ok_or_else(|| Error::InvalidParameter {
                command: "--format".to_string(),
                value: name.to_string(),
            })?;
            return Ok(Some(format));
        }

        let Some(ref path) = self.schema else {
            return Ok(None);
        };
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read the schema: {}", path.display()))?;
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .unwrap_or_else(|| "output".to_string());
        Ok(Some(OutputFormat::from_json(name, &json)?))
    }
}
