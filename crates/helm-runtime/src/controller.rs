//! Per-session agent controller.
//!
//! One logical thread of control per session: a single in-flight provider
//! call at a time, enforced by the status guard rather than locking.
//! Provider calls are long-lived streams of canonical events; consuming one
//! never blocks other sessions. Cancellation is cooperative — `stop()`
//! signals intent and the flag is checked between stream reads, so no event
//! already taken off the stream is discarded.

use std::sync::Arc;

use futures::StreamExt;
use helm_core::context::{ConversationContext, ToolUseRecord};
use helm_core::events::{CanonicalEvent, ContentBlock};
use helm_core::usage::TokenUsage;
use helm_providers::model_cache::ModelCache;
use helm_providers::provider::{AgentProvider, TurnRequest};
use metrics::counter;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::config::SessionConfig;
use crate::emitter::EventEmitter;
use crate::errors::RuntimeError;

/// Session lifecycle status.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionStatus {
    /// No request in flight.
    Idle,
    /// A provider call is being prepared.
    Starting,
    /// Consuming a provider event stream.
    Running,
    /// The last attempt failed; a retry may follow.
    Error,
    /// Waiting out a backoff delay before the next attempt.
    Retrying,
    /// Terminal: the last run failed non-retryably or was cancelled.
    Stopped,
}

impl SessionStatus {
    fn in_flight(self) -> bool {
        matches!(
            self,
            Self::Starting | Self::Running | Self::Error | Self::Retrying
        )
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Error => "error",
            Self::Retrying => "retrying",
            Self::Stopped => "stopped",
        }
    }
}

/// Per-call options for [`AgentSessionController::start`].
#[derive(Clone, Debug, Default)]
pub struct StartOptions {
    /// Model override for this call only.
    pub model_override: Option<String>,
}

/// Outcome of one completed turn.
#[derive(Clone, Debug, PartialEq)]
pub struct TurnOutcome {
    /// Whether the turn's terminal result reported failure.
    pub is_error: bool,
    /// Result text from the terminal event.
    pub result: Option<String>,
    /// Model that served the turn.
    pub model: String,
}

/// Everything observed while draining one provider stream.
#[derive(Default)]
struct TurnObservation {
    assistant_text: String,
    tool_uses: Vec<ToolUseRecord>,
    turn_usages: Vec<TokenUsage>,
    result: Option<ResultFields>,
}

struct ResultFields {
    is_error: bool,
    result: Option<String>,
    usage: Option<TokenUsage>,
    provider_session_id: Option<String>,
}

/// Per-session state machine wrapping a provider connection.
pub struct AgentSessionController {
    session_id: String,
    provider: Arc<dyn AgentProvider>,
    config: SessionConfig,
    model_cache: Arc<ModelCache>,
    emitter: Arc<EventEmitter>,
    status: Mutex<SessionStatus>,
    context: Mutex<ConversationContext>,
    /// Provider-assigned session id from the preceding turn.
    resume_session_id: Mutex<Option<String>>,
    /// Cancellation handle for the in-flight run, if any.
    active_cancel: Mutex<Option<CancellationToken>>,
}

impl AgentSessionController {
    /// Create a controller for one session.
    pub fn new(
        session_id: impl Into<String>,
        provider: Arc<dyn AgentProvider>,
        config: SessionConfig,
        model_cache: Arc<ModelCache>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            provider,
            config,
            model_cache,
            emitter: Arc::new(EventEmitter::new()),
            status: Mutex::new(SessionStatus::Idle),
            context: Mutex::new(ConversationContext::new()),
            resume_session_id: Mutex::new(None),
            active_cancel: Mutex::new(None),
        }
    }

    /// Session id.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Current status.
    pub fn status(&self) -> SessionStatus {
        *self.status.lock()
    }

    /// The model this session reports as configured. A detected model
    /// never overrides an explicit configuration value here.
    pub fn reported_model(&self) -> String {
        self.config.reported_model(&self.model_cache)
    }

    /// Snapshot of the conversation context.
    pub fn context(&self) -> ConversationContext {
        self.context.lock().clone()
    }

    /// The event emitter for this session.
    pub fn emitter(&self) -> &Arc<EventEmitter> {
        &self.emitter
    }

    /// Signal the in-flight run to stop. Cooperative: the run terminates
    /// at its next suspension point.
    pub fn stop(&self) {
        if let Some(cancel) = self.active_cancel.lock().as_ref() {
            warn!(session_id = %self.session_id, "stop requested");
            cancel.cancel();
        }
    }

    /// Run one turn against the provider.
    ///
    /// Fails immediately with [`RuntimeError::AlreadyRunning`] while a
    /// request is in flight — no state change — and is safe to call again
    /// once the status is back to idle.
    #[instrument(skip(self, prompt), fields(session_id = %self.session_id))]
    pub async fn start(
        &self,
        prompt: &str,
        options: StartOptions,
    ) -> Result<TurnOutcome, RuntimeError> {
        {
            let mut status = self.status.lock();
            if status.in_flight() {
                return Err(RuntimeError::AlreadyRunning(self.session_id.clone()));
            }
            *status = SessionStatus::Starting;
        }
        self.emit_status(SessionStatus::Starting);

        let cancel = CancellationToken::new();
        *self.active_cancel.lock() = Some(cancel.clone());

        self.context
            .lock()
            .push_prompt(prompt, CanonicalEvent::now_millis());

        let model = self
            .config
            .resolve_model(options.model_override.as_deref(), &self.model_cache);
        let outcome = self.run_with_retries(prompt, &model, &cancel).await;

        *self.active_cancel.lock() = None;
        match &outcome {
            Ok(outcome) if !outcome.is_error => self.set_status(SessionStatus::Idle),
            _ => self.set_status(SessionStatus::Stopped),
        }
        outcome
    }

    async fn run_with_retries(
        &self,
        prompt: &str,
        model: &str,
        cancel: &CancellationToken,
    ) -> Result<TurnOutcome, RuntimeError> {
        let retry = self.config.retry;
        let mut last_error = String::new();

        for attempt in 0..=retry.max_retries {
            if attempt > 0 {
                self.set_status(SessionStatus::Retrying);
                self.emit_status(SessionStatus::Retrying);
                counter!("helm_turn_retries_total").increment(1);
                let delay = std::time::Duration::from_millis(retry.delay_ms(attempt));
                debug!(attempt, delay_ms = delay.as_millis() as u64, "backing off before retry");
                tokio::select! {
                    () = cancel.cancelled() => {
                        return Err(RuntimeError::Cancelled(self.session_id.clone()));
                    }
                    () = tokio::time::sleep(delay) => {}
                }
            }

            // The resume token is the preceding turn's provider session id.
            let request = TurnRequest {
                prompt: prompt.to_string(),
                resume_session_id: self.resume_session_id.lock().clone(),
                model: model.to_string(),
            };

            let stream = match self.provider.run_turn(request).await {
                Ok(stream) => stream,
                Err(err) => {
                    warn!(attempt, error = %err, "provider call failed");
                    last_error = err.to_string();
                    self.set_status(SessionStatus::Error);
                    self.emit_status(SessionStatus::Error);
                    continue;
                }
            };

            self.set_status(SessionStatus::Running);
            self.emit_status(SessionStatus::Running);

            let mut observation = self.drain_stream(stream, cancel).await?;
            match observation.result.take() {
                Some(result) => return Ok(self.finish_turn(observation, result, model)),
                None => {
                    // Stream ended without a terminal result: transport-level
                    // failure, eligible for retry.
                    warn!(attempt, "stream ended without a result event");
                    last_error = "stream ended without a result".to_string();
                    self.set_status(SessionStatus::Error);
                    self.emit_status(SessionStatus::Error);
                }
            }
        }

        let attempts = retry.max_retries + 1;
        let _ = self.emitter.emit(
            &self.session_id,
            CanonicalEvent::Error {
                message: format!("provider failed after {attempts} attempt(s): {last_error}"),
                timestamp: Some(CanonicalEvent::now_millis()),
            },
        );
        Err(RuntimeError::TransportExhausted {
            attempts,
            message: last_error,
        })
    }

    /// Consume a provider stream to completion, cancellation, or early end.
    ///
    /// The returned observation carries a `result` iff a terminal `result`
    /// event arrived before the stream ended.
    async fn drain_stream(
        &self,
        mut stream: helm_providers::provider::CanonicalEventStream,
        cancel: &CancellationToken,
    ) -> Result<TurnObservation, RuntimeError> {
        let mut observation = TurnObservation::default();

        loop {
            let event = tokio::select! {
                // The cancel flag is checked between reads, never mid-event.
                () = cancel.cancelled() => {
                    return Err(RuntimeError::Cancelled(self.session_id.clone()));
                }
                event = stream.next() => event,
            };
            let Some(event) = event else {
                break;
            };

            self.observe(&event, &mut observation);
            let _ = self.emitter.emit(&self.session_id, event);

            if observation.result.is_some() {
                break;
            }
        }

        Ok(observation)
    }

    fn observe(&self, event: &CanonicalEvent, observation: &mut TurnObservation) {
        match event {
            CanonicalEvent::Assistant { content, .. } => {
                for block in content {
                    match block {
                        ContentBlock::Text { text } => observation.assistant_text.push_str(text),
                        ContentBlock::Thinking { .. } => {}
                        ContentBlock::ToolUse { id, name, input } => {
                            observation.tool_uses.push(ToolUseRecord {
                                id: id.clone(),
                                name: name.clone(),
                                input: input.clone(),
                            });
                        }
                    }
                }
            }
            CanonicalEvent::ToolUse {
                id, name, input, ..
            } => observation.tool_uses.push(ToolUseRecord {
                id: id.clone(),
                name: name.clone(),
                input: input.clone(),
            }),
            CanonicalEvent::TurnUsage { usage, .. } => observation.turn_usages.push(*usage),
            CanonicalEvent::Status { model, .. } => {
                if let Some(model) = model {
                    self.model_cache.set(model);
                }
            }
            CanonicalEvent::Result {
                is_error,
                result,
                usage,
                provider_session_id,
                model,
                ..
            } => {
                if let Some(model) = model {
                    self.model_cache.set(model);
                }
                observation.result = Some(ResultFields {
                    is_error: *is_error,
                    result: result.clone(),
                    usage: *usage,
                    provider_session_id: provider_session_id.clone(),
                });
            }
            CanonicalEvent::ToolResult { .. } | CanonicalEvent::Error { .. } => {}
        }
    }

    fn finish_turn(
        &self,
        observation: TurnObservation,
        result: ResultFields,
        model: &str,
    ) -> TurnOutcome {
        {
            let mut context = self.context.lock();
            context.push_assistant(observation.assistant_text, CanonicalEvent::now_millis());
            context.merge_tool_uses(observation.tool_uses);
            context.apply_turn_usage(&observation.turn_usages, result.usage.as_ref());
        }

        if let Some(provider_session_id) = result.provider_session_id {
            *self.resume_session_id.lock() = Some(provider_session_id);
        }

        info!(
            session_id = %self.session_id,
            is_error = result.is_error,
            "turn finished"
        );
        TurnOutcome {
            is_error: result.is_error,
            result: result.result,
            model: model.to_string(),
        }
    }

    fn set_status(&self, status: SessionStatus) {
        *self.status.lock() = status;
    }

    fn emit_status(&self, status: SessionStatus) {
        let _ = self.emitter.emit(
            &self.session_id,
            CanonicalEvent::Status {
                status: status.as_str().to_string(),
                model: None,
                timestamp: Some(CanonicalEvent::now_millis()),
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use helm_providers::provider::{CanonicalEventStream, ProviderError, ProviderResult};
    use parking_lot::Mutex as PlMutex;
    use serde_json::json;

    /// Scripted provider: each call pops the next outcome.
    struct ScriptedProvider {
        script: PlMutex<Vec<ProviderResult<Vec<CanonicalEvent>>>>,
        requests: PlMutex<Vec<TurnRequest>>,
    }

    impl ScriptedProvider {
        fn new(script: Vec<ProviderResult<Vec<CanonicalEvent>>>) -> Arc<Self> {
            Arc::new(Self {
                script: PlMutex::new(script),
                requests: PlMutex::new(Vec::new()),
            })
        }

        fn requests(&self) -> Vec<TurnRequest> {
            self.requests.lock().clone()
        }
    }

    #[async_trait]
    impl AgentProvider for ScriptedProvider {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn run_turn(&self, request: TurnRequest) -> ProviderResult<CanonicalEventStream> {
            self.requests.lock().push(request);
            let mut script = self.script.lock();
            if script.is_empty() {
                return Err(ProviderError::Transport {
                    message: "script exhausted".into(),
                });
            }
            script
                .remove(0)
                .map(|events| Box::pin(futures::stream::iter(events)) as CanonicalEventStream)
        }
    }

    fn ok_turn(text: &str, usage: Option<TokenUsage>) -> Vec<CanonicalEvent> {
        vec![
            CanonicalEvent::Assistant {
                content: vec![ContentBlock::Text { text: text.into() }],
                message_id: None,
                timestamp: Some(1),
            },
            CanonicalEvent::Result {
                is_error: false,
                result: Some(text.into()),
                usage,
                provider_session_id: Some("ps_1".into()),
                model: None,
                timestamp: Some(2),
            },
        ]
    }

    fn controller_with(
        provider: Arc<ScriptedProvider>,
        config: SessionConfig,
    ) -> AgentSessionController {
        AgentSessionController::new("s1", provider, config, Arc::new(ModelCache::new()))
    }

    fn fast_retry(max_retries: u32) -> helm_core::retry::RetryConfig {
        helm_core::retry::RetryConfig {
            max_retries,
            initial_delay_ms: 1,
            multiplier: 1.0,
            max_delay_ms: 1,
        }
    }

    #[tokio::test]
    async fn successful_turn_returns_to_idle() {
        let provider = ScriptedProvider::new(vec![Ok(ok_turn("done", None))]);
        let controller = controller_with(Arc::clone(&provider), SessionConfig::default());

        let outcome = controller.start("do the thing", StartOptions::default()).await.unwrap();
        assert!(!outcome.is_error);
        assert_eq!(outcome.result.as_deref(), Some("done"));
        assert_eq!(controller.status(), SessionStatus::Idle);

        let context = controller.context();
        assert_eq!(context.last_prompt.as_deref(), Some("do the thing"));
        assert_eq!(context.turns.len(), 2);
    }

    #[tokio::test]
    async fn prompt_passed_verbatim_and_resume_token_threaded() {
        let provider = ScriptedProvider::new(vec![
            Ok(ok_turn("first", None)),
            Ok(ok_turn("second", None)),
        ]);
        let controller = controller_with(Arc::clone(&provider), SessionConfig::default());

        let _ = controller.start("  first prompt ", StartOptions::default()).await.unwrap();
        let _ = controller.start("second prompt", StartOptions::default()).await.unwrap();

        let requests = provider.requests();
        assert_eq!(requests[0].prompt, "  first prompt ");
        assert_eq!(requests[0].resume_session_id, None);
        // Second call resumes with the first turn's provider session id.
        assert_eq!(requests[1].resume_session_id.as_deref(), Some("ps_1"));
        assert_eq!(requests[1].prompt, "second prompt");
    }

    #[tokio::test]
    async fn start_while_running_rejected_without_state_change() {
        // A provider that never yields, keeping the session running.
        struct HangingProvider;
        #[async_trait]
        impl AgentProvider for HangingProvider {
            fn name(&self) -> &'static str {
                "hanging"
            }
            async fn run_turn(&self, _request: TurnRequest) -> ProviderResult<CanonicalEventStream> {
                Ok(Box::pin(futures::stream::pending()))
            }
        }

        let controller = Arc::new(AgentSessionController::new(
            "s1",
            Arc::new(HangingProvider),
            SessionConfig::default(),
            Arc::new(ModelCache::new()),
        ));

        let bg = Arc::clone(&controller);
        let handle = tokio::spawn(async move { bg.start("p", StartOptions::default()).await });
        // Wait for the background start to reach the stream-consuming state.
        while controller.status() != SessionStatus::Running {
            tokio::task::yield_now().await;
        }

        let err = controller.start("again", StartOptions::default()).await.unwrap_err();
        assert_matches!(err, RuntimeError::AlreadyRunning(_));
        assert_eq!(controller.status(), SessionStatus::Running);

        controller.stop();
        let result = handle.await.unwrap();
        assert_matches!(result, Err(RuntimeError::Cancelled(_)));
        assert_eq!(controller.status(), SessionStatus::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn transport_failure_retried_then_succeeds() {
        let provider = ScriptedProvider::new(vec![
            Err(ProviderError::Transport {
                message: "reset".into(),
            }),
            Ok(ok_turn("recovered", None)),
        ]);
        let config = SessionConfig {
            retry: fast_retry(2),
            ..SessionConfig::default()
        };
        let controller = controller_with(Arc::clone(&provider), config);

        let outcome = controller.start("p", StartOptions::default()).await.unwrap();
        assert_eq!(outcome.result.as_deref(), Some("recovered"));
        assert_eq!(provider.requests().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_attempt_surfaces_error_status_before_retry() {
        let provider = ScriptedProvider::new(vec![
            Err(ProviderError::Transport {
                message: "reset".into(),
            }),
            Ok(ok_turn("recovered", None)),
        ]);
        let config = SessionConfig {
            retry: fast_retry(2),
            ..SessionConfig::default()
        };
        let controller = controller_with(Arc::clone(&provider), config);
        let mut events = controller.emitter().subscribe();

        let _ = controller.start("p", StartOptions::default()).await.unwrap();

        let mut statuses = Vec::new();
        while let Ok(event) = events.try_recv() {
            if let CanonicalEvent::Status { status, .. } = event.event {
                statuses.push(status);
            }
        }
        let error_at = statuses.iter().position(|s| s.as_str() == "error");
        let retrying_at = statuses.iter().position(|s| s.as_str() == "retrying");
        assert!(error_at.is_some());
        assert!(error_at < retrying_at);
        assert_eq!(controller.status(), SessionStatus::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn retry_budget_exhaustion_surfaces_error_event() {
        let provider = ScriptedProvider::new(vec![
            Err(ProviderError::Transport { message: "a".into() }),
            Err(ProviderError::Transport { message: "b".into() }),
        ]);
        let config = SessionConfig {
            retry: fast_retry(1),
            ..SessionConfig::default()
        };
        let controller = controller_with(Arc::clone(&provider), config);
        let mut events = controller.emitter().subscribe();

        let err = controller.start("p", StartOptions::default()).await.unwrap_err();
        assert_matches!(err, RuntimeError::TransportExhausted { attempts: 2, .. });
        assert_eq!(controller.status(), SessionStatus::Stopped);

        let mut saw_error_event = false;
        while let Ok(event) = events.try_recv() {
            if event.event.event_type() == "error" {
                saw_error_event = true;
            }
        }
        assert!(saw_error_event);
    }

    #[tokio::test(start_paused = true)]
    async fn stream_without_result_is_retried() {
        let provider = ScriptedProvider::new(vec![
            // Stream ends with no terminal result.
            Ok(vec![CanonicalEvent::Status {
                status: "init".into(),
                model: None,
                timestamp: None,
            }]),
            Ok(ok_turn("ok", None)),
        ]);
        let config = SessionConfig {
            retry: fast_retry(1),
            ..SessionConfig::default()
        };
        let controller = controller_with(Arc::clone(&provider), config);

        let outcome = controller.start("p", StartOptions::default()).await.unwrap();
        assert!(!outcome.is_error);
        assert_eq!(provider.requests().len(), 2);
    }

    #[tokio::test]
    async fn result_usage_wins_over_turn_usage_events() {
        let events = vec![
            CanonicalEvent::TurnUsage {
                usage: TokenUsage::from_counts(100, 10),
                timestamp: None,
            },
            CanonicalEvent::Result {
                is_error: false,
                result: None,
                usage: Some(TokenUsage::from_counts(500, 50)),
                provider_session_id: None,
                model: None,
                timestamp: None,
            },
        ];
        let provider = ScriptedProvider::new(vec![Ok(events)]);
        let controller = controller_with(provider, SessionConfig::default());

        let _ = controller.start("p", StartOptions::default()).await.unwrap();
        let context = controller.context();
        assert_eq!(context.usage.input_tokens, 500);
        assert_eq!(context.usage.output_tokens, 50);
    }

    #[tokio::test]
    async fn turn_usage_summed_without_result_usage() {
        let events = vec![
            CanonicalEvent::TurnUsage {
                usage: TokenUsage::from_counts(100, 10),
                timestamp: None,
            },
            CanonicalEvent::TurnUsage {
                usage: TokenUsage::from_counts(20, 2),
                timestamp: None,
            },
            CanonicalEvent::Result {
                is_error: false,
                result: None,
                usage: None,
                provider_session_id: None,
                model: None,
                timestamp: None,
            },
        ];
        let provider = ScriptedProvider::new(vec![Ok(events)]);
        let controller = controller_with(provider, SessionConfig::default());

        let _ = controller.start("p", StartOptions::default()).await.unwrap();
        assert_eq!(controller.context().usage.input_tokens, 120);
        assert_eq!(controller.context().usage.total_tokens, 132);
    }

    #[tokio::test]
    async fn duplicate_tool_use_ids_merged_first_wins() {
        let events = vec![
            CanonicalEvent::Assistant {
                content: vec![ContentBlock::ToolUse {
                    id: "tu_1".into(),
                    name: "Bash".into(),
                    input: json!({"command": "ls"}),
                }],
                message_id: None,
                timestamp: None,
            },
            // Lifecycle-item copy of the same tool use.
            CanonicalEvent::ToolUse {
                id: "tu_1".into(),
                name: "Task".into(),
                input: json!({}),
                status: helm_core::events::ToolStatus::Success,
                error: None,
                timestamp: None,
            },
            CanonicalEvent::Result {
                is_error: false,
                result: None,
                usage: None,
                provider_session_id: None,
                model: None,
                timestamp: None,
            },
        ];
        let provider = ScriptedProvider::new(vec![Ok(events)]);
        let controller = controller_with(provider, SessionConfig::default());

        let _ = controller.start("p", StartOptions::default()).await.unwrap();
        let context = controller.context();
        let tool_uses = context.turns[1].tool_uses.as_ref().unwrap();
        assert_eq!(tool_uses.len(), 1);
        assert_eq!(tool_uses[0].name, "Bash");
    }

    #[tokio::test]
    async fn detected_model_updates_cache_not_report() {
        let events = vec![
            CanonicalEvent::Status {
                status: "init".into(),
                model: Some("detected-model".into()),
                timestamp: None,
            },
            CanonicalEvent::Result {
                is_error: false,
                result: None,
                usage: None,
                provider_session_id: None,
                model: None,
                timestamp: None,
            },
        ];
        let provider = ScriptedProvider::new(vec![Ok(events)]);
        let cache = Arc::new(ModelCache::new());
        let config = SessionConfig {
            model: Some("configured-model".into()),
            ..SessionConfig::default()
        };
        let controller =
            AgentSessionController::new("s1", provider, config, Arc::clone(&cache));

        let _ = controller.start("p", StartOptions::default()).await.unwrap();
        assert_eq!(cache.get().as_deref(), Some("detected-model"));
        assert_eq!(controller.reported_model(), "configured-model");
    }

    #[tokio::test]
    async fn per_call_override_reaches_provider() {
        let provider = ScriptedProvider::new(vec![Ok(ok_turn("x", None))]);
        let controller = controller_with(Arc::clone(&provider), SessionConfig::default());

        let options = StartOptions {
            model_override: Some("special".into()),
        };
        let outcome = controller.start("p", options).await.unwrap();
        assert_eq!(outcome.model, "special");
        assert_eq!(provider.requests()[0].model, "special");
    }

    #[tokio::test]
    async fn error_result_leads_to_stopped() {
        let events = vec![CanonicalEvent::Result {
            is_error: true,
            result: Some("provider gave up".into()),
            usage: None,
            provider_session_id: None,
            model: None,
            timestamp: None,
        }];
        let provider = ScriptedProvider::new(vec![Ok(events)]);
        let controller = controller_with(provider, SessionConfig::default());

        let outcome = controller.start("p", StartOptions::default()).await.unwrap();
        assert!(outcome.is_error);
        assert_eq!(controller.status(), SessionStatus::Stopped);

        // A stopped session accepts a new start.
        assert!(!controller.status().in_flight());
    }
}
