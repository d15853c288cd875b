use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio_stream::StreamExt;
use tracing::{debug, error, info, warn};

use crate::*;

pub const EMPTY_RESPONSE_MESSAGE: &str = "Empty response from the server. Please try again.";
pub const TRUNCATED_MESSAGE: &str =
    "The answer was cut off at the max tokens limit. Raise it with /max-tokens.";
pub const MISSING_CALL_ID_MESSAGE: &str =
    "The model requested a tool without a call id, so its tool calls were discarded. Please try again.";

type ArcSender = Arc<tokio::sync::mpsc::Sender<ChatResponse>>;

/// Drives one interaction of a [`Session`]: calls the model, reconstructs the
/// streamed answer and dispatches the tool calls it contains.
///
/// Every failure is handled at the turn boundary. Transport failures are
/// reported as [`ChatResponse::Error`] and leave the log as it was; the `Err`
/// returned by the public methods means the request was rejected before
/// anything happened, or that the event channel is gone.
pub struct Orchestrator<Services> {
    services: Arc<Services>,
    sender: Option<ArcSender>,
}

impl<S: Services> Orchestrator<S> {
    pub fn new(services: Arc<S>, sender: Option<ArcSender>) -> Self {
        Self { services, sender }
    }

    async fn send(&self, message: ChatResponse) -> anyhow::Result<()> {
        if let Some(sender) = &self.sender {
            sender.send(message).await?
        }
        Ok(())
    }

    /// Sends a user message. The user turn is committed together with the
    /// answer; when the request fails nothing is appended.
    pub async fn chat(&self, session: &mut Session, content: impl ToString) -> anyhow::Result<()> {
        self.process_pending(session).await?;

        if session.state() == DispatchState::AwaitingManualInput {
            return Err(Error::AwaitingToolOutput.into());
        }

        let user = Turn::user(content);
        let mut turns = session.conversation().turns().to_vec();
        turns.push(user.clone());

        let context = RequestBuilder::default()
            .tools(self.services.tool_service().list())
            .build(session.config(), &turns);

        let Some(result) = self.complete(context).await? else {
            return Ok(());
        };

        session.conversation_mut().append(user);
        self.dispatch(session, result).await
    }

    /// Resolves every pending call with a human supplied output and asks the
    /// model for its reply. Nothing changes unless each pending call has a
    /// non-blank output.
    pub async fn submit_tool_outputs(
        &self,
        session: &mut Session,
        outputs: HashMap<ToolCallId, String>,
    ) -> anyhow::Result<()> {
        if session.pending().is_empty() {
            return Err(Error::NoPendingToolCalls.into());
        }

        let results = session
            .pending()
            .iter()
            .map(|pending| {
                let output = outputs
                    .get(&pending.call_id)
                    .ok_or_else(|| Error::MissingToolOutput(pending.call_id.clone()))?
                    .trim();
                if output.is_empty() {
                    return Err(Error::EmptyToolOutput(pending.call_id.clone()));
                }
                Ok(ToolResult::new(pending.call.name.clone(), pending.call_id.clone()).success(output))
            })
            .collect::<Result<Vec<_>>>()
            .inspect_err(|error| warn!(error = %error, "Rejected tool output submission"))?;

        session.conversation_mut().append_tool_results(results)?;
        let pending = session.take_pending();

        self.follow_up(session, &pending).await
    }

    /// Executes the pending calls when a configuration change scheduled it.
    pub async fn process_pending(&self, session: &mut Session) -> anyhow::Result<()> {
        if !session.take_auto_process() || session.pending().is_empty() {
            return Ok(());
        }

        info!(
            pending = session.pending().len(),
            "Processing pending tool calls automatically"
        );
        self.send(ChatResponse::Notice(
            "Processing pending tool calls automatically".to_string(),
        ))
        .await?;

        let pending = session.pending().to_vec();
        self.auto_execute(session, pending).await
    }

    /// Decides what the finished model turn requires.
    async fn dispatch(
        &self,
        session: &mut Session,
        result: ChatCompletionResult,
    ) -> anyhow::Result<()> {
        if result.tool_calls.is_empty() {
            return if result.is_empty() {
                self.append_error(session, EMPTY_RESPONSE_MESSAGE).await
            } else {
                session
                    .conversation_mut()
                    .append(Turn::assistant(result.content));
                Ok(())
            };
        }

        session.set_state(DispatchState::AwaitingExecution);

        let pending = match PendingToolCall::validate(&result.tool_calls) {
            Ok(pending) => pending,
            Err(err) => {
                error!(error = %err, tool_calls = ?result.tool_calls, "Discarding tool calls");
                // The calls never reach the log, the text of the turn does
                if !result.content.trim().is_empty() {
                    session
                        .conversation_mut()
                        .append(Turn::assistant(result.content));
                }
                session.set_state(DispatchState::Idle);
                return self.append_error(session, MISSING_CALL_ID_MESSAGE).await;
            }
        };

        session
            .conversation_mut()
            .append(Turn::assistant_with_calls(Some(result.content), result.tool_calls));

        if session.config().manual_mode() {
            self.await_manual_input(session, pending).await
        } else {
            self.auto_execute(session, pending).await
        }
    }

    async fn await_manual_input(
        &self,
        session: &mut Session,
        pending: Vec<PendingToolCall>,
    ) -> anyhow::Result<()> {
        debug!(pending = pending.len(), "Waiting for manual tool output");
        let requests = pending
            .iter()
            .map(|pending| ManualToolCall {
                call_id: pending.call_id.clone(),
                call: pending.call.clone(),
                default_output: self.services.tool_service().suggest_output(&pending.call),
            })
            .collect();

        session.set_pending(pending);
        session.set_state(DispatchState::AwaitingManualInput);
        self.send(ChatResponse::ToolOutputRequired(requests)).await
    }

    async fn auto_execute(
        &self,
        session: &mut Session,
        pending: Vec<PendingToolCall>,
    ) -> anyhow::Result<()> {
        session.set_state(DispatchState::AutoExecuting);

        let mut results = Vec::with_capacity(pending.len());
        for PendingToolCall { call_id, call } in &pending {
            self.send(ChatResponse::ToolCallStart(call.clone())).await?;

            let output = self.services.tool_service().call(call).await;
            if output.is_error {
                warn!(
                    tool = %call.name,
                    call_id = %call_id,
                    arguments = %call.arguments,
                    "Tool call failed"
                );
            }
            let result = ToolResult::new(call.name.clone(), call_id.clone()).output(output);

            self.send(ChatResponse::ToolCallEnd(result.clone())).await?;
            results.push(result);
        }

        session.conversation_mut().append_tool_results(results)?;
        session.take_pending();

        self.follow_up(session, &pending).await
    }

    /// Issues the single request that follows the tool results, with tool use
    /// forced off.
    async fn follow_up(
        &self,
        session: &mut Session,
        pending: &[PendingToolCall],
    ) -> anyhow::Result<()> {
        session.set_state(DispatchState::FollowUpInFlight);

        let context = RequestBuilder::default()
            .tools(self.resolve_tools(session.config(), pending))
            .follow_up(true)
            .build(session.config(), session.conversation().turns());

        let result = self.complete(context).await;
        session.set_state(DispatchState::Idle);

        let Some(result) = result? else {
            return Ok(());
        };

        if !result.tool_calls.is_empty() {
            warn!(tool_calls = ?result.tool_calls, "Ignoring tool calls of a follow-up");
        }

        if result.content.trim().is_empty() {
            self.append_error(session, EMPTY_RESPONSE_MESSAGE).await
        } else {
            session
                .conversation_mut()
                .append(Turn::assistant(result.content));
            Ok(())
        }
    }

    /// All declarations while tools are enabled, otherwise only those the
    /// pending calls refer to.
    fn resolve_tools(
        &self,
        config: &SessionConfig,
        pending: &[PendingToolCall],
    ) -> Vec<ToolDefinition> {
        let tools = self.services.tool_service().list();
        if config.tools_enabled {
            return tools;
        }

        let names = pending
            .iter()
            .map(|pending| &pending.call.name)
            .collect::<HashSet<_>>();
        tools
            .into_iter()
            .filter(|tool| names.contains(&tool.name))
            .collect()
    }

    /// Runs a request to completion. Failures are reported and yield `None`.
    async fn complete(&self, context: Context) -> anyhow::Result<Option<ChatCompletionResult>> {
        match self.collect(context).await {
            Ok(result) => Ok(Some(result)),
            Err(err) => {
                error!(error = ?err, "Request failed");
                self.send(ChatResponse::Error(format!("{err:#}"))).await?;
                Ok(None)
            }
        }
    }

    async fn collect(&self, context: Context) -> anyhow::Result<ChatCompletionResult> {
        let mut stream = self.services.provider_service().chat(context).await?;
        let mut reconstructor = StreamReconstructor::default();

        while let Some(message) = stream.next().await {
            let message = message?;

            if let Some(reasoning) = message.reasoning.clone() {
                self.send(ChatResponse::Reasoning(reasoning)).await?;
            }

            if let Some(text) = reconstructor.push(message) {
                self.send(ChatResponse::Text { text, is_complete: false })
                    .await?;
            }
        }

        let result = reconstructor.finish();
        debug!(
            content_len = result.content.len(),
            tool_calls = result.tool_calls.len(),
            "Model turn finished"
        );

        if let Some(usage) = result.usage.clone() {
            self.send(ChatResponse::Usage(usage)).await?;
        }
        self.send(ChatResponse::Text { text: result.content.clone(), is_complete: true })
            .await?;
        if result.is_truncated() {
            warn!("Model turn stopped at the token limit");
            self.send(ChatResponse::Notice(TRUNCATED_MESSAGE.to_string()))
                .await?;
        }

        Ok(result)
    }

    async fn append_error(&self, session: &mut Session, message: &str) -> anyhow::Result<()> {
        error!(message = %message, "Turn failed");
        session.conversation_mut().append(Turn::assistant(message));
        self.send(ChatResponse::Error(message.to_string())).await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use pretty_assertions::assert_eq;
    use tokio::sync::mpsc;

    use super::*;

    const NOT_IMPLEMENTED: &str = r#"{"message":"Function not implemented."}"#;

    enum Reply {
        Messages(Vec<ChatCompletionMessage>),
        /// Stream that fails after yielding the given messages
        Broken(Vec<ChatCompletionMessage>),
        Fail(&'static str),
    }

    #[derive(Default)]
    struct ScriptedProvider {
        replies: Mutex<VecDeque<Reply>>,
        requests: Mutex<Vec<Context>>,
    }

    #[async_trait::async_trait]
    impl ProviderService for ScriptedProvider {
        async fn chat(
            &self,
            context: Context,
        ) -> ResultStream<ChatCompletionMessage, anyhow::Error> {
            self.requests.lock().unwrap().push(context);
            let reply = self.replies.lock().unwrap().pop_front();
            match reply {
                Some(Reply::Messages(messages)) => {
                    Ok(Box::pin(tokio_stream::iter(messages.into_iter().map(Ok))))
                }
                Some(Reply::Broken(messages)) => Ok(Box::pin(tokio_stream::iter(
                    messages
                        .into_iter()
                        .map(Ok)
                        .chain(std::iter::once(Err(anyhow::anyhow!("connection reset")))),
                ))),
                Some(Reply::Fail(message)) => Err(anyhow::anyhow!(message)),
                None => Err(anyhow::anyhow!("unexpected request")),
            }
        }
    }

    #[derive(Default)]
    struct FakeTools {
        calls: Mutex<Vec<ToolCallFull>>,
    }

    #[async_trait::async_trait]
    impl ToolService for FakeTools {
        async fn call(&self, call: &ToolCallFull) -> ToolOutput {
            self.calls.lock().unwrap().push(call.clone());
            match call.name.as_str() {
                "web_search" => match call.parse_arguments::<serde_json::Value>() {
                    Ok(input) => ToolOutput::text(format!("results for {}", input["query"])),
                    Err(_) => ToolOutput::error("Search failed"),
                },
                _ => ToolOutput::text(NOT_IMPLEMENTED),
            }
        }

        fn list(&self) -> Vec<ToolDefinition> {
            vec![
                ToolDefinition::new("web_search"),
                ToolDefinition::new("calculator"),
            ]
        }

        fn suggest_output(&self, call: &ToolCallFull) -> Option<String> {
            (call.name.as_str() == "web_search").then(|| "suggested".to_string())
        }
    }

    #[derive(Default)]
    struct Fixture {
        provider: ScriptedProvider,
        tools: FakeTools,
    }

    impl Services for Fixture {
        type ProviderService = ScriptedProvider;
        type ToolService = FakeTools;

        fn provider_service(&self) -> &Self::ProviderService {
            &self.provider
        }

        fn tool_service(&self) -> &Self::ToolService {
            &self.tools
        }
    }

    struct Harness {
        services: Arc<Fixture>,
        orch: Orchestrator<Fixture>,
        receiver: mpsc::Receiver<ChatResponse>,
    }

    impl Harness {
        fn new(replies: Vec<Reply>) -> Self {
            let services = Arc::new(Fixture::default());
            services.provider.replies.lock().unwrap().extend(replies);
            let (sender, receiver) = mpsc::channel(256);
            let orch = Orchestrator::new(services.clone(), Some(Arc::new(sender)));
            Self { services, orch, receiver }
        }

        fn requests(&self) -> Vec<Context> {
            self.services.provider.requests.lock().unwrap().clone()
        }

        fn executed(&self) -> Vec<ToolCallFull> {
            self.services.tools.calls.lock().unwrap().clone()
        }

        fn events(&mut self) -> Vec<ChatResponse> {
            let mut events = vec![];
            while let Ok(event) = self.receiver.try_recv() {
                events.push(event);
            }
            events
        }
    }

    fn session(tools_enabled: bool, manual: bool) -> Session {
        Session::new(
            SessionConfig::new(ModelId::new("gpt-oss"))
                .tools_enabled(tools_enabled)
                .manual_tool_output(manual),
        )
    }

    fn text(content: &str) -> Reply {
        Reply::Messages(vec![ChatCompletionMessage::default().content_part(content)])
    }

    fn web_search(id: Option<&str>) -> ToolCallFull {
        let call = ToolCallFull::new(ToolName::new("web_search")).arguments(r#"{"query":"praias"}"#);
        match id {
            Some(id) => call.call_id(ToolCallId::new(id)),
            None => call,
        }
    }

    fn tool_calls(calls: Vec<ToolCallFull>) -> Reply {
        Reply::Messages(vec![ChatCompletionMessage::default()
            .tool_calls(calls.into_iter().map(ToolCall::Full).collect::<Vec<_>>())])
    }

    fn roles(session: &Session) -> Vec<Role> {
        session.conversation().turns().iter().map(Turn::role).collect()
    }

    fn errors(events: &[ChatResponse]) -> Vec<String> {
        events
            .iter()
            .filter_map(|event| match event {
                ChatResponse::Error(message) => Some(message.clone()),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_plain_answer() {
        let mut harness = Harness::new(vec![Reply::Messages(vec![
            ChatCompletionMessage::default().content_part("Olá"),
            ChatCompletionMessage::default().content_part(", tudo bem?"),
        ])]);
        let mut session = session(false, false);

        harness.orch.chat(&mut session, "Oi").await.unwrap();

        let expected = vec![Turn::user("Oi"), Turn::assistant("Olá, tudo bem?")];
        assert_eq!(session.conversation().turns(), expected.as_slice());
        assert_eq!(session.state(), DispatchState::Idle);

        let actual = harness.events();
        let expected = vec![
            ChatResponse::Text { text: "Olá".to_string(), is_complete: false },
            ChatResponse::Text { text: ", tudo bem?".to_string(), is_complete: false },
            ChatResponse::Text { text: "Olá, tudo bem?".to_string(), is_complete: true },
        ];
        assert_eq!(actual, expected);
    }

    #[tokio::test]
    async fn test_truncated_answer_is_noticed() {
        let mut harness = Harness::new(vec![Reply::Messages(vec![
            ChatCompletionMessage::default().content_part("Olá, as praias"),
            ChatCompletionMessage::default().finish_reason(FinishReason::Length),
        ])]);
        let mut session = session(false, false);

        harness.orch.chat(&mut session, "Oi").await.unwrap();

        let expected = vec![Turn::user("Oi"), Turn::assistant("Olá, as praias")];
        assert_eq!(session.conversation().turns(), expected.as_slice());

        let actual = harness.events().pop();
        let expected = Some(ChatResponse::Notice(TRUNCATED_MESSAGE.to_string()));
        assert_eq!(actual, expected);
    }

    #[tokio::test]
    async fn test_initial_request_failure_appends_nothing() {
        let mut harness = Harness::new(vec![Reply::Fail("500 Internal Server Error")]);
        let mut session = session(true, false);

        harness.orch.chat(&mut session, "Oi").await.unwrap();

        assert!(session.conversation().is_empty());
        assert_eq!(session.state(), DispatchState::Idle);
        assert_eq!(
            errors(&harness.events()),
            vec!["500 Internal Server Error".to_string()]
        );
    }

    #[tokio::test]
    async fn test_broken_stream_appends_nothing() {
        let mut harness = Harness::new(vec![Reply::Broken(vec![
            ChatCompletionMessage::default().content_part("Olá"),
        ])]);
        let mut session = session(false, false);

        harness.orch.chat(&mut session, "Oi").await.unwrap();

        assert!(session.conversation().is_empty());
        assert_eq!(errors(&harness.events()), vec!["connection reset".to_string()]);
    }

    #[tokio::test]
    async fn test_empty_answer_appends_fixed_message() {
        let mut harness = Harness::new(vec![Reply::Messages(vec![])]);
        let mut session = session(false, false);

        harness.orch.chat(&mut session, "Oi").await.unwrap();

        let expected = vec![Turn::user("Oi"), Turn::assistant(EMPTY_RESPONSE_MESSAGE)];
        assert_eq!(session.conversation().turns(), expected.as_slice());
        assert_eq!(
            errors(&harness.events()),
            vec![EMPTY_RESPONSE_MESSAGE.to_string()]
        );
    }

    #[tokio::test]
    async fn test_auto_mode_executes_and_follows_up() {
        let mut harness = Harness::new(vec![
            tool_calls(vec![web_search(Some("call_1"))]),
            text("Encontrei praias."),
        ]);
        let mut session = session(true, false);

        harness.orch.chat(&mut session, "Praias?").await.unwrap();

        assert_eq!(
            roles(&session),
            vec![Role::User, Role::Assistant, Role::Tool, Role::Assistant]
        );
        let turns = session.conversation().turns();
        assert_eq!(turns[1].tool_calls(), &[web_search(Some("call_1"))]);
        let expected = ToolResult::new(ToolName::new("web_search"), ToolCallId::new("call_1"))
            .success("results for \"praias\"");
        assert_eq!(turns[2], Turn::from(expected));
        assert_eq!(turns[3].content(), Some("Encontrei praias."));

        let requests = harness.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].tool_choice, None);
        assert_eq!(requests[0].tools.len(), 2);
        assert_eq!(requests[1].tool_choice, Some(ToolChoice::None));
        assert_eq!(requests[1].messages, turns[..3].to_vec());
        assert!(session.pending().is_empty());
        assert_eq!(session.state(), DispatchState::Idle);
    }

    #[tokio::test]
    async fn test_unknown_tool_is_a_successful_result() {
        let call = ToolCallFull::new(ToolName::new("weather"))
            .call_id(ToolCallId::new("call_1"))
            .arguments("{}");
        let mut harness = Harness::new(vec![tool_calls(vec![call]), text("Sem previsão.")]);
        let mut session = session(true, false);

        harness.orch.chat(&mut session, "Tempo?").await.unwrap();

        let turns = session.conversation().turns();
        let Turn::ToolResult(result) = &turns[2] else {
            panic!("expected a tool result, got {:?}", turns[2]);
        };
        assert!(!result.is_error());
        assert_eq!(result.output.as_str(), NOT_IMPLEMENTED);
        assert!(errors(&harness.events()).is_empty());
    }

    #[tokio::test]
    async fn test_tool_failure_still_follows_up() {
        let call = ToolCallFull::new(ToolName::new("web_search"))
            .call_id(ToolCallId::new("call_1"))
            .arguments("{\"qu");
        let mut harness = Harness::new(vec![tool_calls(vec![call]), text("A busca falhou.")]);
        let mut session = session(true, false);

        harness.orch.chat(&mut session, "Praias?").await.unwrap();

        let turns = session.conversation().turns();
        let Turn::ToolResult(result) = &turns[2] else {
            panic!("expected a tool result, got {:?}", turns[2]);
        };
        assert!(result.is_error());
        assert_eq!(result.output.as_str(), r#"{"error":"Search failed"}"#);
        assert_eq!(turns[3].content(), Some("A busca falhou."));
        assert_eq!(harness.requests().len(), 2);

        let notified = harness
            .events()
            .into_iter()
            .any(|event| matches!(event, ChatResponse::ToolCallEnd(result) if result.is_error()));
        assert!(notified);
    }

    #[tokio::test]
    async fn test_missing_call_id_discards_batch() {
        let mut harness = Harness::new(vec![Reply::Messages(vec![
            ChatCompletionMessage::default().content_part("Vou buscar."),
            ChatCompletionMessage::default()
                .add_tool_call(web_search(Some("call_1")))
                .add_tool_call(web_search(None)),
        ])]);
        let mut session = session(true, false);

        harness.orch.chat(&mut session, "Praias?").await.unwrap();

        let expected = vec![
            Turn::user("Praias?"),
            Turn::assistant("Vou buscar."),
            Turn::assistant(MISSING_CALL_ID_MESSAGE),
        ];
        assert_eq!(session.conversation().turns(), expected.as_slice());
        assert!(harness.executed().is_empty());
        assert_eq!(harness.requests().len(), 1);
        assert!(session.pending().is_empty());
        assert_eq!(session.state(), DispatchState::Idle);
        assert_eq!(
            errors(&harness.events()),
            vec![MISSING_CALL_ID_MESSAGE.to_string()]
        );
    }

    #[tokio::test]
    async fn test_missing_call_id_in_manual_mode() {
        let mut harness = Harness::new(vec![tool_calls(vec![web_search(None)])]);
        let mut session = session(true, true);

        harness.orch.chat(&mut session, "Praias?").await.unwrap();

        assert_eq!(roles(&session), vec![Role::User, Role::Assistant]);
        assert!(session.pending().is_empty());
        assert_eq!(session.state(), DispatchState::Idle);
    }

    #[tokio::test]
    async fn test_manual_mode_suspends() {
        let mut harness = Harness::new(vec![tool_calls(vec![web_search(Some("call_1"))])]);
        let mut session = session(true, true);

        harness.orch.chat(&mut session, "Praias?").await.unwrap();

        assert_eq!(session.state(), DispatchState::AwaitingManualInput);
        assert_eq!(session.pending().len(), 1);
        assert_eq!(harness.requests().len(), 1);
        assert!(harness.executed().is_empty());

        let required = harness.events().into_iter().find_map(|event| match event {
            ChatResponse::ToolOutputRequired(calls) => Some(calls),
            _ => None,
        });
        let expected = vec![ManualToolCall {
            call_id: ToolCallId::new("call_1"),
            call: web_search(Some("call_1")),
            default_output: Some("suggested".to_string()),
        }];
        assert_eq!(required, Some(expected));
    }

    #[tokio::test]
    async fn test_chat_is_rejected_while_waiting_for_output() {
        let mut harness = Harness::new(vec![tool_calls(vec![web_search(Some("call_1"))])]);
        let mut session = session(true, true);
        harness.orch.chat(&mut session, "Praias?").await.unwrap();

        let actual = harness.orch.chat(&mut session, "Oi?").await.unwrap_err();

        assert!(matches!(
            actual.downcast_ref::<Error>(),
            Some(Error::AwaitingToolOutput)
        ));
        assert_eq!(session.conversation().len(), 2);
        assert_eq!(harness.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_blank_manual_output_is_rejected() {
        let mut harness = Harness::new(vec![tool_calls(vec![web_search(Some("call_1"))])]);
        let mut session = session(true, true);
        harness.orch.chat(&mut session, "Praias?").await.unwrap();
        let before = session.conversation().clone();

        let outputs = HashMap::from([(ToolCallId::new("call_1"), "   ".to_string())]);
        let actual = harness
            .orch
            .submit_tool_outputs(&mut session, outputs)
            .await
            .unwrap_err();

        assert!(matches!(
            actual.downcast_ref::<Error>(),
            Some(Error::EmptyToolOutput(_))
        ));
        assert_eq!(session.conversation(), &before);
        assert_eq!(session.pending().len(), 1);
        assert_eq!(session.state(), DispatchState::AwaitingManualInput);
        assert_eq!(harness.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_manual_output_is_rejected() {
        let mut harness = Harness::new(vec![tool_calls(vec![
            web_search(Some("call_1")),
            web_search(Some("call_2")),
        ])]);
        let mut session = session(true, true);
        harness.orch.chat(&mut session, "Praias?").await.unwrap();

        let outputs = HashMap::from([(ToolCallId::new("call_1"), "ok".to_string())]);
        let actual = harness
            .orch
            .submit_tool_outputs(&mut session, outputs)
            .await
            .unwrap_err();

        assert!(matches!(
            actual.downcast_ref::<Error>(),
            Some(Error::MissingToolOutput(id)) if id == &ToolCallId::new("call_2")
        ));
        assert_eq!(session.conversation().len(), 2);
    }

    #[tokio::test]
    async fn test_submit_without_pending_calls() {
        let harness = Harness::new(vec![]);
        let mut session = session(true, true);

        let actual = harness
            .orch
            .submit_tool_outputs(&mut session, HashMap::new())
            .await
            .unwrap_err();

        assert!(matches!(
            actual.downcast_ref::<Error>(),
            Some(Error::NoPendingToolCalls)
        ));
    }

    #[tokio::test]
    async fn test_manual_output_follows_up() {
        let mut harness = Harness::new(vec![
            tool_calls(vec![web_search(Some("call_1"))]),
            text("Praia do Forte."),
        ]);
        let mut session = session(true, true);
        harness.orch.chat(&mut session, "Praias?").await.unwrap();

        let outputs = HashMap::from([(ToolCallId::new("call_1"), "  Praia do Forte \n".to_string())]);
        harness
            .orch
            .submit_tool_outputs(&mut session, outputs)
            .await
            .unwrap();

        let turns = session.conversation().turns();
        let expected = ToolResult::new(ToolName::new("web_search"), ToolCallId::new("call_1"))
            .success("Praia do Forte");
        assert_eq!(turns[2], Turn::from(expected));
        assert_eq!(turns[3].content(), Some("Praia do Forte."));
        assert!(harness.executed().is_empty());
        assert!(session.pending().is_empty());
        assert_eq!(session.state(), DispatchState::Idle);
        assert_eq!(harness.requests()[1].tool_choice, Some(ToolChoice::None));
    }

    #[tokio::test]
    async fn test_leaving_manual_mode_recovers_pending_calls() {
        let mut harness = Harness::new(vec![
            tool_calls(vec![web_search(Some("call_1"))]),
            text("Encontrei praias."),
        ]);
        let mut session = session(true, true);
        harness.orch.chat(&mut session, "Praias?").await.unwrap();

        session.update_config(|config| config.manual_tool_output = false);
        harness.orch.process_pending(&mut session).await.unwrap();

        assert_eq!(harness.executed(), vec![web_search(Some("call_1"))]);
        assert_eq!(
            roles(&session),
            vec![Role::User, Role::Assistant, Role::Tool, Role::Assistant]
        );
        assert!(session.pending().is_empty());
        assert!(!session.is_auto_process_scheduled());
        assert_eq!(session.state(), DispatchState::Idle);
    }

    #[tokio::test]
    async fn test_disabling_tools_recovers_pending_calls() {
        let mut harness = Harness::new(vec![
            tool_calls(vec![web_search(Some("call_1"))]),
            text("Encontrei praias."),
            text("De nada."),
        ]);
        let mut session = session(true, true);
        harness.orch.chat(&mut session, "Praias?").await.unwrap();

        session.update_config(|config| config.tools_enabled = false);
        // The next message processes the pending calls first
        harness.orch.chat(&mut session, "Obrigado").await.unwrap();

        assert_eq!(harness.executed().len(), 1);
        let requests = harness.requests();
        assert_eq!(requests.len(), 3);
        let follow_up_tools = requests[1]
            .tools
            .iter()
            .map(|tool| tool.name.clone())
            .collect::<Vec<_>>();
        assert_eq!(follow_up_tools, vec![ToolName::new("web_search")]);
        assert!(requests[2].tools.is_empty());
        assert_eq!(session.conversation().len(), 6);
    }

    #[tokio::test]
    async fn test_follow_up_failure_keeps_tool_results() {
        let mut harness = Harness::new(vec![
            tool_calls(vec![web_search(Some("call_1"))]),
            Reply::Fail("timeout"),
        ]);
        let mut session = session(true, false);

        harness.orch.chat(&mut session, "Praias?").await.unwrap();

        assert_eq!(roles(&session), vec![Role::User, Role::Assistant, Role::Tool]);
        assert_eq!(session.state(), DispatchState::Idle);
        assert_eq!(errors(&harness.events()), vec!["timeout".to_string()]);
    }

    #[tokio::test]
    async fn test_follow_up_tool_calls_are_ignored() {
        let mut harness = Harness::new(vec![
            tool_calls(vec![web_search(Some("call_1"))]),
            Reply::Messages(vec![ChatCompletionMessage::default()
                .content_part("Encontrei praias.")
                .add_tool_call(web_search(Some("call_2")))]),
        ]);
        let mut session = session(true, false);

        harness.orch.chat(&mut session, "Praias?").await.unwrap();

        let last = session.conversation().turns().last().cloned().unwrap();
        assert_eq!(last, Turn::assistant("Encontrei praias."));
        assert_eq!(harness.executed().len(), 1);
    }
}
