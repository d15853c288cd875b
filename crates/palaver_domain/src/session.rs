use derive_more::Display;
use serde::Serialize;
use tracing::info;

use crate::{Conversation, Error, Result, SessionConfig, ToolCallFull, ToolCallId};

/// Where the tool dispatch of the current interaction stands.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Display)]
pub enum DispatchState {
    /// Nothing is pending
    #[default]
    Idle,
    /// The model just produced tool calls
    AwaitingExecution,
    AutoExecuting,
    /// Suspended until a human submits the output of every pending call
    AwaitingManualInput,
    /// Tool results are in the log and the reply of the model is requested
    FollowUpInFlight,
}

/// A tool call that passed validation and waits for its output.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PendingToolCall {
    pub call_id: ToolCallId,
    pub call: ToolCallFull,
}

impl PendingToolCall {
    /// Accepts the batch only when every call carries a non-blank id. A single
    /// call without one rejects the whole batch.
    pub fn validate(calls: &[ToolCallFull]) -> Result<Vec<PendingToolCall>> {
        calls
            .iter()
            .map(|call| {
                call.valid_call_id()
                    .cloned()
                    .map(|call_id| PendingToolCall { call_id, call: call.clone() })
                    .ok_or_else(|| Error::ToolCallMissingId(call.name.clone()))
            })
            .collect()
    }
}

/// State of one chat session: the conversation log, the tool calls waiting for
/// output and the configuration of the next request.
#[derive(Clone, Debug)]
pub struct Session {
    conversation: Conversation,
    pending: Vec<PendingToolCall>,
    config: SessionConfig,
    state: DispatchState,
    auto_process_pending: bool,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            conversation: Conversation::default(),
            pending: vec![],
            config,
            state: DispatchState::Idle,
            auto_process_pending: false,
        }
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn pending(&self) -> &[PendingToolCall] {
        &self.pending
    }

    pub fn state(&self) -> DispatchState {
        self.state
    }

    /// Pending calls will be executed automatically on the next processing
    /// pass
    pub fn is_auto_process_scheduled(&self) -> bool {
        self.auto_process_pending
    }

    /// Applies a configuration change. Leaving manual mode, or disabling tools,
    /// while calls are pending schedules their automatic execution.
    pub fn update_config<T>(&mut self, f: impl FnOnce(&mut SessionConfig) -> T) -> T {
        let was_manual = self.config.manual_mode();
        let value = f(&mut self.config);
        let is_manual = self.config.manual_mode();

        let has_pending = !self.pending.is_empty();
        if has_pending && ((was_manual && !is_manual) || !self.config.tools_enabled) {
            info!(
                pending = self.pending.len(),
                "Scheduling automatic execution of pending tool calls"
            );
            self.auto_process_pending = true;
        }

        value
    }

    /// Starts over with an empty conversation. The configuration is kept.
    pub fn reset(&mut self) {
        self.conversation.reset();
        self.pending.clear();
        self.auto_process_pending = false;
        self.state = DispatchState::Idle;
    }

    pub(crate) fn conversation_mut(&mut self) -> &mut Conversation {
        &mut self.conversation
    }

    pub(crate) fn set_state(&mut self, state: DispatchState) {
        self.state = state;
    }

    pub(crate) fn set_pending(&mut self, pending: Vec<PendingToolCall>) {
        self.pending = pending;
    }

    pub(crate) fn take_pending(&mut self) -> Vec<PendingToolCall> {
        self.auto_process_pending = false;
        std::mem::take(&mut self.pending)
    }

    pub(crate) fn take_auto_process(&mut self) -> bool {
        std::mem::take(&mut self.auto_process_pending)
    }
}
