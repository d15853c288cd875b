use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use inquire::error::InquireError;
use palaver_display::TitleFormat;
use palaver_domain::{
    DispatchState, Orchestrator, Session, SessionConfig, ToolCallId,
};
use palaver_services::PalaverServices;
use tokio::sync::mpsc;
use tracing::{error, info};

use crate::cli::Cli;
use crate::completer::Completion;
use crate::env::Environment;
use crate::log::{init_tracing, Guard};
use crate::model::Command;
use crate::render::Renderer;

/// What the orchestrator is asked to do on behalf of the user.
enum Action {
    Chat(String),
    Submit(HashMap<ToolCallId, String>),
    ProcessPending,
}

pub struct UI {
    cli: Cli,
    services: Arc<PalaverServices>,
    session: Session,
    renderer: Renderer,
    #[allow(dead_code)] // The guard is kept alive by being held in the struct
    _guard: Guard,
}

impl UI {
    pub fn init(cli: Cli) -> Result<Self> {
        let env = Environment::from_env()?;
        let guard = init_tracing(env.log_path.clone())?;

        let mut provider = env.provider;
        if let Some(api) = cli.api {
            provider.api = api;
        }

        info!(model = %env.model, api = %provider.api, "Starting session");

        let config = cli.session_config(env.model)?;
        Ok(Self {
            services: Arc::new(PalaverServices::new(provider)?),
            session: Session::new(config),
            renderer: Renderer::new(cli.verbose),
            cli,
            _guard: guard,
        })
    }

    fn writeln(&self, content: impl ToString) {
        println!("{}", content.to_string());
    }

    fn config(&self) -> &SessionConfig {
        self.session.config()
    }

    pub async fn run(&mut self) {
        if let Err(error) = self.run_inner().await {
            error!(error = ?error, "Session ended with an error");
            eprintln!("{}", TitleFormat::error(format!("{error:#}")));
        }
    }

    async fn run_inner(&mut self) -> Result<()> {
        if let Some(prompt) = self.cli.prompt.clone() {
            return self.on_prompt(prompt).await;
        }

        self.writeln(
            TitleFormat::info("palaver")
                .sub_title(format!("{} Type /help to see the commands", self.config().model)),
        );

        loop {
            let command = match self.prompt() {
                Ok(Some(command)) => command,
                Ok(None) => return Ok(()),
                Err(error) => {
                    eprintln!("{}", TitleFormat::error(format!("{error:#}")));
                    continue;
                }
            };

            match self.on_command(command).await {
                Ok(true) => return Ok(()),
                Ok(false) => {}
                Err(error) => {
                    error!(error = ?error, "Command failed");
                    eprintln!("{}", TitleFormat::error(format!("{error:#}")));
                }
            }
        }
    }

    /// Reads the next command, skipping blank lines. `None` when the user
    /// closed the prompt.
    fn prompt(&self) -> Result<Option<Command>> {
        loop {
            let text = inquire::Text::new("")
                .with_help_message("Type a message, or /help to see the commands")
                .with_autocomplete(Completion::new(Command::available_commands()))
                .prompt();

            match text {
                Ok(text) => {
                    if let Some(command) = Command::parse_line(&text) {
                        return command.map(Some);
                    }
                }
                Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => {
                    return Ok(None)
                }
                Err(error) => return Err(error.into()),
            }
        }
    }

    /// Returns `true` when the session should end.
    async fn on_command(&mut self, command: Command) -> Result<bool> {
        match command {
            Command::Message(content) => {
                self.execute(Action::Chat(content)).await?;
                self.on_manual_input().await?;
            }
            Command::Instructions(instructions) => {
                self.session
                    .update_config(|config| config.instructions = instructions);
                let sub_title = match self.config().active_instructions() {
                    Some(_) => "updated",
                    None => "none will be sent",
                };
                self.writeln(TitleFormat::info("instructions").sub_title(sub_title));
            }
            Command::Effort(effort) => {
                self.session.update_config(|config| config.reasoning_effort = effort);
                let sub_title = effort.map_or("off".to_string(), |effort| effort.to_string());
                self.writeln(TitleFormat::info("reasoning effort").sub_title(sub_title));
            }
            Command::Temperature(temperature) => {
                self.session.update_config(|config| config.temperature = temperature);
                self.writeln(TitleFormat::info("temperature").sub_title(temperature.to_string()));
            }
            Command::MaxTokens(max_tokens) => {
                self.session.update_config(|config| config.max_tokens = max_tokens);
                self.writeln(TitleFormat::info("max tokens").sub_title(max_tokens.to_string()));
            }
            Command::Tools(enabled) => {
                self.session.update_config(|config| config.tools_enabled = enabled);
                self.writeln(TitleFormat::info("tools").sub_title(switch(enabled)));
                self.on_config_change().await?;
            }
            Command::Manual(enabled) => {
                self.session
                    .update_config(|config| config.manual_tool_output = enabled);
                let mut title = TitleFormat::info("manual tool output").sub_title(switch(enabled));
                if enabled && !self.config().tools_enabled {
                    title = title.sub_title("on, effective once tools are enabled");
                }
                self.writeln(title);
                self.on_config_change().await?;
            }
            Command::Format(format) => {
                let sub_title = format
                    .as_ref()
                    .map_or("off".to_string(), |format| format.name.clone());
                self.session.update_config(|config| config.output_format = format);
                self.writeln(TitleFormat::info("output format").sub_title(sub_title));
            }
            Command::Stream(enabled) => {
                self.session.update_config(|config| config.stream = enabled);
                self.writeln(TitleFormat::info("stream").sub_title(switch(enabled)));
            }
            Command::Submit => {
                if self.session.pending().is_empty() {
                    self.writeln(TitleFormat::info("no tool calls are waiting for output"));
                } else {
                    self.on_manual_input().await?;
                }
            }
            Command::Reset => {
                self.session.reset();
                self.writeln(TitleFormat::info("new conversation"));
            }
            Command::Status => self.on_status(),
            Command::Help => self.writeln(Command::help_text()),
            Command::Exit => return Ok(true),
        }

        Ok(false)
    }

    /// Runs the pending calls when leaving manual mode scheduled it.
    async fn on_config_change(&mut self) -> Result<()> {
        if self.session.is_auto_process_scheduled() {
            self.execute(Action::ProcessPending).await?;
        }
        Ok(())
    }

    fn on_status(&self) {
        let config = self.config();
        let effort = config
            .reasoning_effort
            .map_or("off".to_string(), |effort| effort.to_string());
        let items = [
            ("model", config.model.to_string()),
            ("instructions", config.active_instructions().unwrap_or("none").to_string()),
            ("reasoning effort", effort),
            ("temperature", config.temperature.to_string()),
            ("max tokens", config.max_tokens.to_string()),
            ("tools", switch(config.tools_enabled).to_string()),
            ("manual tool output", switch(config.manual_tool_output).to_string()),
            (
                "output format",
                config
                    .output_format
                    .as_ref()
                    .map_or("off".to_string(), |format| format.name.clone()),
            ),
            ("stream", switch(config.stream).to_string()),
            ("turns", self.session.conversation().len().to_string()),
            ("pending tool calls", self.session.pending().len().to_string()),
            ("state", self.session.state().to_string()),
        ];
        for (title, value) in items {
            self.writeln(TitleFormat::info(title).sub_title(value));
        }
        if let Some(usage) = self.renderer.usage() {
            self.writeln(TitleFormat::info("last usage").sub_title(format_usage(usage)));
        }
    }

    /// Asks for the output of every pending call until the model answered, or
    /// the user gave up on the form.
    async fn on_manual_input(&mut self) -> Result<()> {
        while self.session.state() == DispatchState::AwaitingManualInput
            && self.config().manual_mode()
        {
            let Some(outputs) = self.collect_outputs()? else {
                self.writeln(
                    TitleFormat::info("tool calls still pending")
                        .sub_title("use /submit to answer them, or /manual off to run them"),
                );
                return Ok(());
            };

            if let Err(error) = self.execute(Action::Submit(outputs)).await {
                eprintln!("{}", TitleFormat::error(format!("{error:#}")));
            }
        }
        Ok(())
    }

    /// The form for the pending calls, prefilled with the output each tool
    /// suggested when the calls were suspended. `None` when the user cancelled
    /// it.
    fn collect_outputs(&self) -> Result<Option<HashMap<ToolCallId, String>>> {
        let mut outputs = HashMap::new();

        for pending in self.session.pending() {
            let message = format!("Output for `{}`", pending.call.name);
            let help = format!("{} {}", pending.call_id, pending.call.arguments);
            let mut text = inquire::Text::new(&message).with_help_message(&help);
            if let Some(default) = self
                .renderer
                .suggested_output(&pending.call_id)
                .filter(|default| !default.is_empty())
            {
                text = text.with_default(default);
            }

            match text.prompt() {
                Ok(output) => {
                    outputs.insert(pending.call_id.clone(), output);
                }
                Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => {
                    return Ok(None)
                }
                Err(error) => return Err(error.into()),
            }
        }

        Ok(Some(outputs))
    }

    /// Drives the orchestrator while the renderer consumes its events.
    async fn execute(&mut self, action: Action) -> Result<()> {
        let (tx, rx) = mpsc::channel(128);
        let orch = Orchestrator::new(self.services.clone(), Some(Arc::new(tx)));
        let session = &mut self.session;

        // The sender lives in `orch`, dropping it ends the rendering
        let task = async move {
            match action {
                Action::Chat(content) => orch.chat(session, content).await,
                Action::Submit(outputs) => orch.submit_tool_outputs(session, outputs).await,
                Action::ProcessPending => orch.process_pending(session).await,
            }
        };

        let (result, ()) = tokio::join!(task, self.renderer.render(rx));
        result
    }

    /// One-shot mode: a single message, then the usage and the elapsed time.
    async fn on_prompt(&mut self, prompt: String) -> Result<()> {
        let start = Instant::now();
        self.execute(Action::Chat(prompt)).await?;

        if self.session.state() == DispatchState::AwaitingManualInput {
            self.writeln(
                TitleFormat::info("stopped")
                    .sub_title("the tool calls above need a manual output"),
            );
            return Ok(());
        }

        if let Some(usage) = self.renderer.usage() {
            self.writeln(TitleFormat::info("usage").sub_title(format_usage(usage)));
        }
        self.writeln(
            TitleFormat::info("elapsed")
                .sub_title(format!("{:.2}s", start.elapsed().as_secs_f64())),
        );
        Ok(())
    }
}

fn switch(enabled: bool) -> &'static str {
    if enabled {
        "on"
    } else {
        "off"
    }
}

fn format_usage(usage: &palaver_domain::Usage) -> String {
    format!(
        "prompt {} completion {} total {} tokens",
        usage.prompt_tokens, usage.completion_tokens, usage.total_tokens
    )
}
