use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::{
    ChatCompletionMessage, CompletedResponse, FinishReason, ToolCall, ToolCallFull, ToolCallId,
    ToolCallPart, ToolName, Usage,
};

/// Identity of a tool call whose fragments arrive spread over many messages.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ToolCallKey {
    /// Positional index assigned by the upstream
    Index(u64),
    /// Call id assigned by the upstream
    Id(ToolCallId),
    /// Locally generated when a fragment has neither index nor id
    Sequence(usize),
}

type Lookup = fn(&ToolCallPart) -> Option<ToolCallKey>;

/// Resolves the identity of a fragment by trying, in order: the positional
/// index, the call id and finally a fresh local sequence number.
///
/// Every fragment without index and id gets its own sequence number, so such
/// fragments are never merged with each other.
#[derive(Debug, Default)]
pub struct KeyResolver {
    next_sequence: usize,
}

impl KeyResolver {
    const CHAIN: [Lookup; 2] = [Self::by_index, Self::by_id];

    pub fn resolve(&mut self, part: &ToolCallPart) -> ToolCallKey {
        Self::CHAIN
            .iter()
            .find_map(|lookup| lookup(part))
            .unwrap_or_else(|| self.next_sequence())
    }

    fn by_index(part: &ToolCallPart) -> Option<ToolCallKey> {
        part.index.map(ToolCallKey::Index)
    }

    fn by_id(part: &ToolCallPart) -> Option<ToolCallKey> {
        part.call_id
            .as_ref()
            .filter(|id| !id.is_blank())
            .cloned()
            .map(ToolCallKey::Id)
    }

    fn next_sequence(&mut self) -> ToolCallKey {
        let key = ToolCallKey::Sequence(self.next_sequence);
        self.next_sequence += 1;
        key
    }
}

#[derive(Debug, Default)]
struct PartialToolCall {
    call_id: Option<ToolCallId>,
    name: Option<ToolName>,
    arguments: String,
}

impl PartialToolCall {
    fn into_full(self) -> ToolCallFull {
        let name = self.name.unwrap_or_else(|| {
            warn!(call_id = ?self.call_id, "Tool call finished without a name");
            ToolName::new("")
        });
        ToolCallFull { name, call_id: self.call_id, arguments: self.arguments }
    }
}

/// What a model turn produced once its stream is over.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChatCompletionResult {
    pub content: String,
    pub tool_calls: Vec<ToolCallFull>,
    pub usage: Option<Usage>,
    /// Last stop reason reported by the upstream
    pub finish_reason: Option<FinishReason>,
}

impl ChatCompletionResult {
    /// The upstream answered but said nothing
    pub fn is_empty(&self) -> bool {
        self.content.trim().is_empty() && self.tool_calls.is_empty()
    }

    /// Generation stopped at the token limit
    pub fn is_truncated(&self) -> bool {
        self.finish_reason == Some(FinishReason::Length)
    }
}

/// Reassembles the messages of one streamed response into a
/// [`ChatCompletionResult`].
///
/// Text deltas are handed back from [`StreamReconstructor::push`] so they can
/// be displayed right away. Argument fragments are appended, in arrival order,
/// to the call their [`ToolCallKey`] resolves to. When a final response object
/// arrives, its values win over everything accumulated from earlier messages.
#[derive(Debug, Default)]
pub struct StreamReconstructor {
    resolver: KeyResolver,
    text: String,
    full_texts: Vec<String>,
    partial_calls: IndexMap<ToolCallKey, PartialToolCall>,
    full_calls: Vec<ToolCallFull>,
    completed: Option<CompletedResponse>,
    usage: Option<Usage>,
    finish_reason: Option<FinishReason>,
}

impl StreamReconstructor {
    /// Accumulates a message and returns its text delta, if any.
    pub fn push(&mut self, message: ChatCompletionMessage) -> Option<String> {
        if let Some(usage) = message.usage {
            self.usage = Some(usage);
        }
        if let Some(reason) = message.finish_reason {
            self.finish_reason = Some(reason);
        }

        for call in message.tool_calls {
            match call {
                ToolCall::Full(call) => self.full_calls.push(call),
                ToolCall::Part(part) => self.push_part(part),
            }
        }

        if let Some(completed) = message.completed {
            debug!("Received final response");
            self.completed = Some(completed);
        }

        match message.content {
            Some(content) if content.is_part() => {
                if content.is_empty() {
                    None
                } else {
                    self.text.push_str(content.as_str());
                    Some(content.as_str().to_string())
                }
            }
            Some(content) => {
                self.full_texts.push(content.as_str().to_string());
                None
            }
            None => None,
        }
    }

    fn push_part(&mut self, part: ToolCallPart) {
        let key = self.resolver.resolve(&part);
        let call = self.partial_calls.entry(key).or_default();

        if let Some(call_id) = part.call_id.filter(|id| !id.is_blank()) {
            call.call_id = Some(call_id);
        }
        if let Some(name) = part.name.filter(|name| !name.as_str().is_empty()) {
            call.name = Some(name);
        }
        call.arguments.push_str(&part.arguments_part);
    }

    pub fn finish(self) -> ChatCompletionResult {
        // Complete texts (finished items, non-streamed bodies) win over deltas
        let content = if self.full_texts.is_empty() {
            self.text
        } else {
            self.full_texts.concat()
        };

        let tool_calls = self
            .full_calls
            .into_iter()
            .chain(self.partial_calls.into_values().map(PartialToolCall::into_full))
            .collect::<Vec<_>>();

        let (content, tool_calls) = match self.completed {
            Some(completed) => (completed.content.unwrap_or(content), completed.tool_calls),
            None => (content, tool_calls),
        };

        ChatCompletionResult {
            content,
            tool_calls,
            usage: self.usage,
            finish_reason: self.finish_reason,
        }
    }
}
