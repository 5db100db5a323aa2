//! 回合流水线集成测试：脚本化网关 + 固定分类器

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;

    use mirrorbot::config::AppConfig;
    use mirrorbot::core::{DoneReason, TurnOrchestrator};
    use mirrorbot::gates::{FixedToneClassifier, GateError, Moderator, PermissiveModerator, Tone};
    use mirrorbot::llm::{
        EmbeddingProvider, GatewayReply, LlmError, MockEmbedder, MockGateway, ModelGateway,
        TimeoutEmbedder, ToolRequest,
    };
    use mirrorbot::memory::{HistoryStore, InMemoryHistoryStore, Message, Role};
    use mirrorbot::prompts::{EntrySource, DENIAL_STAGE, GATEWAY_APOLOGY, SAFETY_FALLBACK};
    use mirrorbot::tools::{InMemoryReportStore, ToolName, ToolSpec};
    use mirrorbot::OrchestratorBuilder;

    const SYSTEM: &str = "You are a test assistant.";
    const DEFAULT_REPLY: &str = "I'm here with you and I hear how hard this is.";

    /// 一次网关调用的记录：(上下文, 声明的工具数)
    type Call = (Vec<Message>, usize);

    /// 按脚本依次返回；脚本耗尽后返回 DEFAULT_REPLY
    #[derive(Default)]
    struct ScriptedGateway {
        script: Mutex<VecDeque<Result<GatewayReply, LlmError>>>,
        calls: Mutex<Vec<Call>>,
    }

    impl ScriptedGateway {
        fn new(script: Vec<Result<GatewayReply, LlmError>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        /// 带工具声明的调用次数（每回合的首次生成）
        fn tool_enabled_calls(&self) -> usize {
            self.calls().iter().filter(|(_, tools)| *tools > 0).count()
        }
    }

    #[async_trait]
    impl ModelGateway for ScriptedGateway {
        async fn generate(&self, messages: &[Message], tools: &[ToolSpec]) -> Result<GatewayReply, LlmError> {
            self.calls.lock().unwrap().push((messages.to_vec(), tools.len()));
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(GatewayReply::Text(DEFAULT_REPLY.to_string())))
        }
    }

    /// 草稿含 FLAGGED 时标记
    struct MarkerModerator;

    #[async_trait]
    impl Moderator for MarkerModerator {
        async fn is_flagged(&self, text: &str) -> Result<bool, GateError> {
            Ok(text.contains("FLAGGED"))
        }
    }

    /// 含 weather 的文本与其余文本正交，其余文本两两相同
    struct TopicEmbedder;

    #[async_trait]
    impl EmbeddingProvider for TopicEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError> {
            if text.to_lowercase().contains("weather") {
                Ok(vec![0.0, 1.0])
            } else {
                Ok(vec![1.0, 0.0])
            }
        }
    }

    /// 审核服务不可达
    struct DownModerator;

    #[async_trait]
    impl Moderator for DownModerator {
        async fn is_flagged(&self, _: &str) -> Result<bool, GateError> {
            Err(GateError::Classifier("connection refused".into()))
        }
    }

    /// 嵌入服务挂起不返回
    struct StalledEmbedder;

    #[async_trait]
    impl EmbeddingProvider for StalledEmbedder {
        async fn embed(&self, _: &str) -> Result<Vec<f32>, LlmError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(vec![1.0, 0.0])
        }
    }

    fn text(s: &str) -> Result<GatewayReply, LlmError> {
        Ok(GatewayReply::Text(s.to_string()))
    }

    fn tool_call(name: &str, args: &str) -> Result<GatewayReply, LlmError> {
        Ok(GatewayReply::ToolRequest(ToolRequest {
            id: "call_1".to_string(),
            name: name.to_string(),
            arguments: args.to_string(),
        }))
    }

    fn builder(gateway: Arc<ScriptedGateway>, history: Arc<InMemoryHistoryStore>) -> OrchestratorBuilder {
        OrchestratorBuilder::new(AppConfig::default())
            .with_system_prompt(SYSTEM)
            .with_history(history)
            .with_gateway(gateway)
            .with_moderator(Arc::new(MarkerModerator))
            .with_embedder(Arc::new(TopicEmbedder))
            .with_tone_classifier(Arc::new(FixedToneClassifier(Tone::Empathetic)))
    }

    fn pipeline(gateway: Arc<ScriptedGateway>, history: Arc<InMemoryHistoryStore>) -> TurnOrchestrator {
        builder(gateway, history).build().unwrap()
    }

    fn tool_messages(call: &Call) -> Vec<&Message> {
        call.0.iter().filter(|m| m.role == Role::Tool).collect()
    }

    #[tokio::test]
    async fn test_clean_draft_is_returned_and_recorded() {
        let gateway = ScriptedGateway::new(vec![text("That sounds painful. I'm listening.")]);
        let history = Arc::new(InMemoryHistoryStore::new());
        let bot = pipeline(gateway.clone(), history.clone());

        let outcome = bot.process_turn("s1", "He yelled at me last night", None).await;

        assert_eq!(outcome.reply, "That sounds painful. I'm listening.");
        assert_eq!(outcome.reason, DoneReason::AllPassed);
        assert_eq!(outcome.regenerations, 0);
        assert_eq!(outcome.tool, None);
        assert_eq!(gateway.calls().len(), 1);

        let stored = history.get_recent("s1", 20).await.unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].role, Role::User);
        assert_eq!(stored[0].content, "He yelled at me last night");
        assert_eq!(stored[1].role, Role::Assistant);
        assert_eq!(stored[1].content, outcome.reply);
    }

    #[tokio::test]
    async fn test_moderation_short_circuits_to_safety_fallback() {
        let gateway = ScriptedGateway::new(vec![text("FLAGGED content")]);
        let history = Arc::new(InMemoryHistoryStore::new());
        let bot = pipeline(gateway.clone(), history.clone());

        let outcome = bot.process_turn("s1", "I am scared", None).await;

        assert_eq!(outcome.reply, SAFETY_FALLBACK);
        assert_eq!(outcome.reason, DoneReason::ModerationRejected);
        assert_eq!(outcome.regenerations, 0);
        assert_eq!(gateway.calls().len(), 1);
        let stored = history.get_recent("s1", 20).await.unwrap();
        assert_eq!(stored[1].content, SAFETY_FALLBACK);
    }

    #[tokio::test]
    async fn test_moderation_applies_to_regenerated_draft() {
        let gateway = ScriptedGateway::new(vec![text("Hello {name}"), text("FLAGGED again")]);
        let bot = pipeline(gateway.clone(), Arc::new(InMemoryHistoryStore::new()));

        let outcome = bot.process_turn("s1", "I am scared", None).await;

        assert_eq!(outcome.reply, SAFETY_FALLBACK);
        assert_eq!(outcome.regenerations, 1);
        assert_eq!(gateway.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_placeholder_triggers_one_corrective_regeneration() {
        let gateway = ScriptedGateway::new(vec![
            text("Hello {user_name}, I understand."),
            text("I understand, and you deserve to feel safe."),
        ]);
        let bot = pipeline(gateway.clone(), Arc::new(InMemoryHistoryStore::new()));

        let outcome = bot.process_turn("s1", "He took my phone", None).await;

        assert_eq!(outcome.reply, "I understand, and you deserve to feel safe.");
        assert_eq!(outcome.regenerations, 1);
        assert_eq!(outcome.reason, DoneReason::AllPassed);

        let calls = gateway.calls();
        assert_eq!(calls.len(), 2);
        let (retry_context, retry_tools) = &calls[1];
        assert_eq!(*retry_tools, 0);
        let last = retry_context.last().unwrap();
        assert_eq!(last.role, Role::System);
        assert_eq!(last.content, "Remove placeholders and answer clearly.");
    }

    #[tokio::test]
    async fn test_relevance_failure_uses_topic_instruction() {
        let gateway = ScriptedGateway::new(vec![text("The weather is lovely today.")]);
        let bot = pipeline(gateway.clone(), Arc::new(InMemoryHistoryStore::new()));

        let outcome = bot.process_turn("s1", "He checks my messages", None).await;

        assert_eq!(outcome.reply, DEFAULT_REPLY);
        let calls = gateway.calls();
        assert_eq!(
            calls[1].0.last().unwrap().content,
            "Stay on topic: respond to her safety concerns."
        );
    }

    #[tokio::test]
    async fn test_zero_relevance_threshold_accepts_off_topic_draft() {
        let mut cfg = AppConfig::default();
        cfg.pipeline.relevance_threshold = 0.0;
        let gateway = ScriptedGateway::new(vec![text("The weather is lovely today.")]);
        let bot = OrchestratorBuilder::new(cfg)
            .with_system_prompt(SYSTEM)
            .with_history(Arc::new(InMemoryHistoryStore::new()))
            .with_gateway(gateway.clone())
            .with_moderator(Arc::new(MarkerModerator))
            .with_embedder(Arc::new(TopicEmbedder))
            .with_tone_classifier(Arc::new(FixedToneClassifier(Tone::Empathetic)))
            .build()
            .unwrap();

        let outcome = bot.process_turn("s1", "He checks my messages", None).await;

        assert_eq!(outcome.reply, "The weather is lovely today.");
        assert_eq!(outcome.regenerations, 0);
        assert_eq!(outcome.reason, DoneReason::AllPassed);
        assert_eq!(gateway.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_moderation_outage_returns_safety_fallback() {
        let gateway = ScriptedGateway::new(vec![]);
        let history = Arc::new(InMemoryHistoryStore::new());
        let bot = builder(gateway.clone(), history.clone())
            .with_moderator(Arc::new(DownModerator))
            .build()
            .unwrap();

        let outcome = bot.process_turn("s1", "I am scared", None).await;

        assert_eq!(outcome.reply, SAFETY_FALLBACK);
        assert_eq!(outcome.reason, DoneReason::ModerationRejected);
        assert_eq!(gateway.calls().len(), 1);
        let stored = history.get_recent("s1", 20).await.unwrap();
        assert_eq!(stored[1].content, SAFETY_FALLBACK);
    }

    #[tokio::test]
    async fn test_stalled_embeddings_do_not_block_turn() {
        let gateway = ScriptedGateway::new(vec![]);
        let embedder = TimeoutEmbedder::new(Arc::new(StalledEmbedder), Duration::from_millis(50));
        let bot = builder(gateway.clone(), Arc::new(InMemoryHistoryStore::new()))
            .with_embedder(Arc::new(embedder))
            .build()
            .unwrap();

        let outcome = tokio::time::timeout(
            Duration::from_secs(5),
            bot.process_turn("s1", "I am scared", None),
        )
        .await
        .expect("turn should not hang on embeddings");

        assert_eq!(outcome.reply, DEFAULT_REPLY);
        assert_eq!(outcome.reason, DoneReason::AllPassed);
    }

    #[tokio::test]
    async fn test_offline_stack_passes_short_inputs() {
        let bot = OrchestratorBuilder::new(AppConfig::default())
            .with_system_prompt(SYSTEM)
            .with_history(Arc::new(InMemoryHistoryStore::new()))
            .with_gateway(Arc::new(MockGateway))
            .with_moderator(Arc::new(PermissiveModerator))
            .with_embedder(Arc::new(MockEmbedder))
            .with_tone_classifier(Arc::new(FixedToneClassifier(Tone::Empathetic)))
            .build()
            .unwrap();

        for input in ["hi", "I am scared"] {
            let outcome = bot.process_turn("offline", input, None).await;
            assert_eq!(outcome.reason, DoneReason::AllPassed, "{input}");
            assert_eq!(outcome.regenerations, 0, "{input}");
            assert!(outcome.reply.contains(input));
        }
    }

    #[tokio::test]
    async fn test_budget_exhaustion_accepts_last_draft() {
        let gateway = ScriptedGateway::new(vec![
            text("{draft one}"),
            text("{draft two}"),
            text("{draft three}"),
            text("never requested"),
        ]);
        let history = Arc::new(InMemoryHistoryStore::new());
        let bot = pipeline(gateway.clone(), history.clone());

        let outcome = bot.process_turn("s1", "I feel lost", None).await;

        assert_eq!(outcome.reply, "{draft three}");
        assert_eq!(outcome.reason, DoneReason::BudgetExhausted);
        assert_eq!(outcome.regenerations, 2);
        assert_eq!(gateway.calls().len(), 3);
        assert_eq!(history.len("s1").await, 2);
    }

    #[tokio::test]
    async fn test_zero_budget_never_regenerates() {
        let gateway = ScriptedGateway::new(vec![text("undefined")]);
        let mut cfg = AppConfig::default();
        cfg.pipeline.max_regenerations = 0;
        let bot = OrchestratorBuilder::new(cfg)
            .with_system_prompt(SYSTEM)
            .with_history(Arc::new(InMemoryHistoryStore::new()))
            .with_gateway(gateway.clone())
            .with_moderator(Arc::new(MarkerModerator))
            .with_embedder(Arc::new(TopicEmbedder))
            .with_tone_classifier(Arc::new(FixedToneClassifier(Tone::Neutral)))
            .build()
            .unwrap();

        let outcome = bot.process_turn("s1", "hello", None).await;

        assert_eq!(outcome.reply, "undefined");
        assert_eq!(outcome.reason, DoneReason::BudgetExhausted);
        assert_eq!(gateway.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_cold_tone_exhausts_budget() {
        let gateway = ScriptedGateway::new(vec![]);
        let bot = builder(gateway.clone(), Arc::new(InMemoryHistoryStore::new()))
            .with_tone_classifier(Arc::new(FixedToneClassifier(Tone::Cold)))
            .build()
            .unwrap();

        let outcome = bot.process_turn("s1", "I am tired of this", None).await;

        assert_eq!(outcome.regenerations, 2);
        assert_eq!(outcome.reason, DoneReason::BudgetExhausted);
        let calls = gateway.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(
            calls[2].0.last().unwrap().content,
            "Rewrite warmly and validate her feelings."
        );
    }

    #[tokio::test]
    async fn test_jerusalem_resources_turn() {
        let gateway = ScriptedGateway::new(vec![
            tool_call("find_local_resources", r#"{"location":"Jerusalem"}"#),
            text("You can call 02-123-4567 or go to Women’s Center – Yafo 99. You are not alone."),
        ]);
        let history = Arc::new(InMemoryHistoryStore::new());
        let bot = pipeline(gateway.clone(), history.clone());

        let outcome = bot
            .process_turn("s1", "I live in Jerusalem and I'm scared", None)
            .await;

        assert_eq!(outcome.tool, Some(ToolName::FindLocalResources));
        assert_eq!(outcome.reason, DoneReason::AllPassed);
        assert!(outcome.reply.contains("02-123-4567"));
        assert_eq!(gateway.tool_enabled_calls(), 1);

        let calls = gateway.calls();
        assert_eq!(calls.len(), 2);
        let finalize = &calls[1];
        assert_eq!(finalize.1, 0);
        let tools = tool_messages(finalize);
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(tools[0].tool_name.as_deref(), Some("find_local_resources"));
        assert!(tools[0].content.contains("02-123-4567"));

        let stored = history.get_recent("s1", 20).await.unwrap();
        assert_eq!(stored.len(), 2);
        assert!(stored.iter().all(|m| m.role != Role::Tool));
    }

    #[tokio::test]
    async fn test_missing_hotline_falls_back_after_two_retries() {
        let gateway = ScriptedGateway::new(vec![
            tool_call("find_local_resources", r#"{"location":"Jerusalem"}"#),
            text("There are places that can help you."),
            text("Please reach out to a local shelter."),
            text("Help is available near you."),
        ]);
        let history = Arc::new(InMemoryHistoryStore::new());
        let bot = pipeline(gateway.clone(), history.clone());

        let outcome = bot
            .process_turn("s1", "I live in Jerusalem and I'm scared", None)
            .await;

        assert_eq!(outcome.reason, DoneReason::BudgetExhausted);
        assert_eq!(outcome.regenerations, 2);
        assert_eq!(outcome.reply, "Help is available near you.");
        assert_eq!(gateway.tool_enabled_calls(), 1);

        let calls = gateway.calls();
        assert_eq!(calls.len(), 4);
        let retry = &calls[2];
        assert_eq!(tool_messages(retry).len(), 1);
        assert_eq!(
            retry.0.last().unwrap().content,
            "Ensure you share the hotline and shelter exactly as provided."
        );
        assert_eq!(history.len("s1").await, 2);
    }

    #[tokio::test]
    async fn test_missing_location_uses_turn_location() {
        let gateway = ScriptedGateway::new(vec![
            tool_call("find_local_resources", "{}"),
            text("Call 02-123-4567 any time."),
        ]);
        let bot = pipeline(gateway.clone(), Arc::new(InMemoryHistoryStore::new()));

        let outcome = bot.process_turn("s1", "Where can I go?", Some("Jerusalem")).await;

        assert_eq!(outcome.reason, DoneReason::AllPassed);
        let calls = gateway.calls();
        assert!(tool_messages(&calls[1])[0].content.contains("02-123-4567"));
    }

    #[tokio::test]
    async fn test_missing_location_defaults_to_tel_aviv() {
        let gateway = ScriptedGateway::new(vec![
            tool_call("find_local_resources", r#"{"location":""}"#),
            text("Call 118 any time."),
        ]);
        let bot = pipeline(gateway.clone(), Arc::new(InMemoryHistoryStore::new()));

        let outcome = bot.process_turn("s1", "Where can I go?", None).await;

        assert_eq!(outcome.reason, DoneReason::AllPassed);
        let calls = gateway.calls();
        assert!(tool_messages(&calls[1])[0].content.contains("Safe Haven"));
    }

    #[tokio::test]
    async fn test_risk_turn_requires_level_and_score() {
        let gateway = ScriptedGateway::new(vec![
            tool_call("diagnose_risk", r#"{"text":"he hit me and choked me"}"#),
            text("I'm so sorry. This sounds dangerous."),
            text("Your risk looks high (90 out of 100). Your safety matters most."),
        ]);
        let bot = pipeline(gateway.clone(), Arc::new(InMemoryHistoryStore::new()));

        let outcome = bot.process_turn("s1", "he hit me and choked me", None).await;

        assert_eq!(outcome.tool, Some(ToolName::DiagnoseRisk));
        assert_eq!(outcome.regenerations, 1);
        assert_eq!(outcome.reason, DoneReason::AllPassed);
        assert_eq!(
            gateway.calls()[2].0.last().unwrap().content,
            "Ensure you state the risk level correctly."
        );
    }

    #[tokio::test]
    async fn test_unknown_tool_finalizes_without_grounding() {
        let gateway = ScriptedGateway::new(vec![
            tool_call("send_email", r#"{"to":"x"}"#),
            text("I'm here for you."),
        ]);
        let history = Arc::new(InMemoryHistoryStore::new());
        let bot = pipeline(gateway.clone(), history.clone());

        let outcome = bot.process_turn("s1", "Can you email my sister?", None).await;

        assert_eq!(outcome.reply, "I'm here for you.");
        assert_eq!(outcome.tool, None);
        assert_eq!(outcome.reason, DoneReason::AllPassed);
        let calls = gateway.calls();
        assert_eq!(calls.len(), 2);
        assert!(tool_messages(&calls[1]).is_empty());
        assert!(calls[1].0.iter().all(|m| m.tool_call.is_none()));
        assert_eq!(history.len("s1").await, 2);
    }

    #[tokio::test]
    async fn test_bad_tool_arguments_finalize_without_grounding() {
        let gateway = ScriptedGateway::new(vec![
            tool_call("diagnose_risk", "{not json"),
            text("Thank you for sharing that with me."),
        ]);
        let bot = pipeline(gateway.clone(), Arc::new(InMemoryHistoryStore::new()));

        let outcome = bot.process_turn("s1", "He scares me", None).await;

        assert_eq!(outcome.tool, None);
        assert_eq!(outcome.reply, "Thank you for sharing that with me.");
    }

    #[tokio::test]
    async fn test_gateway_failure_apologizes_and_records_turn() {
        let gateway = ScriptedGateway::new(vec![Err(LlmError::Timeout(60))]);
        let history = Arc::new(InMemoryHistoryStore::new());
        let bot = pipeline(gateway.clone(), history.clone());

        let outcome = bot.process_turn("s1", "Are you there?", None).await;

        assert_eq!(outcome.reply, GATEWAY_APOLOGY);
        assert_eq!(outcome.reason, DoneReason::GatewayUnavailable);
        let stored = history.get_recent("s1", 20).await.unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[1].content, GATEWAY_APOLOGY);
    }

    #[tokio::test]
    async fn test_finalize_failure_after_tool_apologizes() {
        let gateway = ScriptedGateway::new(vec![
            tool_call("diagnose_risk", r#"{"text":"he threatened me"}"#),
            Err(LlmError::ApiError("502".into())),
        ]);
        let bot = pipeline(gateway.clone(), Arc::new(InMemoryHistoryStore::new()));

        let outcome = bot.process_turn("s1", "he threatened me", None).await;

        assert_eq!(outcome.reply, GATEWAY_APOLOGY);
        assert_eq!(outcome.reason, DoneReason::GatewayUnavailable);
    }

    #[tokio::test]
    async fn test_regeneration_failure_keeps_last_draft() {
        let gateway = ScriptedGateway::new(vec![
            text("Hello {name}"),
            Err(LlmError::ApiError("503".into())),
        ]);
        let bot = pipeline(gateway.clone(), Arc::new(InMemoryHistoryStore::new()));

        let outcome = bot.process_turn("s1", "hi", None).await;

        assert_eq!(outcome.reply, "Hello {name}");
        assert_eq!(outcome.reason, DoneReason::RegenerationFailed);
        assert_eq!(outcome.regenerations, 1);
    }

    #[tokio::test]
    async fn test_saved_report_ids_are_distinct() {
        let gateway = ScriptedGateway::new(vec![
            tool_call("save_report", r#"{"report":"first incident"}"#),
            text("Your report is saved."),
            text("Saved."),
            text("Saved, you did well."),
            tool_call("save_report", r#"{"report":"second incident"}"#),
            text("Your report is saved."),
        ]);
        let reports = Arc::new(InMemoryReportStore::new());
        let bot = builder(gateway.clone(), Arc::new(InMemoryHistoryStore::new()))
            .with_report_store(reports.clone())
            .build()
            .unwrap();

        let first = bot.process_turn("s1", "Please save this", None).await;
        let second = bot.process_turn("s1", "Save this one too", None).await;

        assert_eq!(first.tool, Some(ToolName::SaveReport));
        assert_eq!(second.tool, Some(ToolName::SaveReport));
        assert_eq!(reports.len().await, 2);

        let ids: Vec<String> = gateway
            .calls()
            .iter()
            .flat_map(|call| tool_messages(call).into_iter().cloned().collect::<Vec<_>>())
            .map(|m| {
                let v: serde_json::Value = serde_json::from_str(&m.content).unwrap();
                v["report_id"].as_str().unwrap().to_string()
            })
            .collect::<std::collections::BTreeSet<_>>()
            .into_iter()
            .collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.iter().all(|id| id.len() == 8));
    }

    #[tokio::test]
    async fn test_denial_marker_injects_stage_prompt() {
        let gateway = ScriptedGateway::new(vec![]);
        let bot = pipeline(gateway.clone(), Arc::new(InMemoryHistoryStore::new()));

        bot.process_turn("s1", "I'm not sure it was that bad", None).await;

        let context = &gateway.calls()[0].0;
        assert_eq!(context.len(), 3);
        assert_eq!(context[0].role, Role::System);
        assert_eq!(context[0].content, SYSTEM);
        assert_eq!(context[1].role, Role::Assistant);
        assert_eq!(context[1].content, DENIAL_STAGE[0]);
        assert_eq!(context[2].role, Role::User);
    }

    #[tokio::test]
    async fn test_context_is_bounded_by_history_limit() {
        let history = Arc::new(InMemoryHistoryStore::new());
        for i in 0..30 {
            history.append("s1", Message::user(format!("old {i}"))).await.unwrap();
        }
        let gateway = ScriptedGateway::new(vec![]);
        let bot = pipeline(gateway.clone(), history.clone());

        bot.process_turn("s1", "new message", None).await;

        let context = &gateway.calls()[0].0;
        assert_eq!(context.len(), 1 + 20 + 1);
        assert_eq!(context[1].content, "old 10");
        assert_eq!(context.last().unwrap().content, "new message");
        assert_eq!(history.len("s1").await, 32);
    }

    #[tokio::test]
    async fn test_open_session_records_greeting_first() {
        let gateway = ScriptedGateway::new(vec![]);
        let history = Arc::new(InMemoryHistoryStore::new());
        let bot = pipeline(gateway.clone(), history.clone());
        let session = TurnOrchestrator::new_session_id();

        let greeting = bot
            .open_session(&session, EntrySource::Ad, Some("He always knows where I am"))
            .await;
        bot.process_turn(&session, "It's true", None).await;

        assert!(greeting.contains("\"He always knows where I am\""));
        let stored = history.get_recent(&session, 20).await.unwrap();
        assert_eq!(stored.len(), 3);
        assert_eq!(stored[0].content, greeting);
        assert_eq!(gateway.calls()[0].0[1].content, greeting);
    }

    #[tokio::test]
    async fn test_concurrent_sessions_are_independent() {
        let gateway = ScriptedGateway::new(vec![]);
        let history = Arc::new(InMemoryHistoryStore::new());
        let bot = Arc::new(pipeline(gateway.clone(), history.clone()));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let bot = bot.clone();
                tokio::spawn(async move {
                    bot.process_turn(&format!("session-{i}"), "I need help", None).await
                })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.await.unwrap().reply, DEFAULT_REPLY);
        }

        assert_eq!(history.session_count().await, 8);
        for i in 0..8 {
            let stored = history.get_recent(&format!("session-{i}"), 20).await.unwrap();
            assert_eq!(stored.len(), 2);
            assert_eq!(stored[0].role, Role::User);
            assert_eq!(stored[1].role, Role::Assistant);
        }
    }
}
