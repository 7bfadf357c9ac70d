//! Function-calling orchestrator
//!
//! Drives a bounded loop between the model and the tools:
//! - Sends the prompt together with the declarations of the available tools
//! - Executes the calls the model requests, concurrently
//! - Feeds the results back and asks the model to continue
//! - Stops at a final answer or after `max_iterations` rounds of tool calls
//!
//! Failures never reach the caller. A failed run falls back to plain generation,
//! and if that fails too the caller receives a fixed apology.

mod error;
pub mod prompt;
mod types;

pub use error::OrchestratorError;
pub use types::{ChatRequest, OrchestrationResult, ToolCallRecord};

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::{FutureExt, StreamExt};
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::llm::core::{
    config::GenerationConfig,
    error::LlmError,
    provider::LlmProvider,
    types::{Content, FunctionDeclaration, ModelTurn},
};
use crate::llm::tools::executor::{RegistryToolExecutor, ToolExecutor};
use crate::llm::tools::registry::ToolRegistry;

use prompt::{plain_prompt, tool_prompt, GENERIC_ERROR_MESSAGE, MAX_ITERATIONS_MESSAGE};

/// Steps of a tool-calling run, as they appear in the logs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrchestrationState {
    /// No tools apply; plain generation
    NoToolsFallback,
    /// Waiting for the first model response
    AwaitingModel,
    /// Running the calls the model requested
    ExecutingTools,
    /// Waiting for the model to continue with tool results
    Continuing,
    Complete,
    MaxIterationsReached,
    /// Something failed; retrying without tools
    ErrorFallback,
}

/// Counters that survive a failed run
#[derive(Debug, Default)]
struct RunProgress {
    tool_results: Vec<ToolCallRecord>,
}

/// Orchestrates multi-turn tool calling against an [`LlmProvider`]
///
/// # Example
///
/// ```ignore
/// let orchestrator = FunctionCallingOrchestrator::new(provider, Arc::new(registry))
///     .with_max_iterations(3);
///
/// let context = ToolExecutionContext::new("agent-1", "tenant-1").with_user("user-1");
/// let result = orchestrator
///     .chat_with_tools(ChatRequest::new("What is the refund policy?", context))
///     .await;
///
/// println!("{} ({} tools called)", result.response, result.tools_called);
/// ```
pub struct FunctionCallingOrchestrator {
    /// LLM provider
    provider: Arc<dyn LlmProvider>,

    /// Catalog used to resolve declarations
    registry: Arc<ToolRegistry>,

    /// Runs the requested calls
    executor: Arc<dyn ToolExecutor>,

    /// Generation configuration (temperature, max_tokens, etc.)
    config: GenerationConfig,

    /// Iteration cap when the request sets none (default: 5)
    max_iterations: usize,

    /// Wall-clock limit per model call
    model_timeout: Option<Duration>,
}

impl FunctionCallingOrchestrator {
    /// Create an orchestrator that executes calls against `registry`
    pub fn new(provider: Arc<dyn LlmProvider>, registry: Arc<ToolRegistry>) -> Self {
        let executor = Arc::new(RegistryToolExecutor::new(Arc::clone(&registry)));
        Self {
            provider,
            registry,
            executor,
            config: GenerationConfig::default(),
            max_iterations: crate::config::DEFAULT_MAX_ITERATIONS,
            model_timeout: None,
        }
    }

    /// Create an orchestrator with limits and generation settings from `config`
    pub fn from_config(
        config: &AppConfig,
        provider: Arc<dyn LlmProvider>,
        registry: Arc<ToolRegistry>,
    ) -> Self {
        let mut executor = RegistryToolExecutor::new(Arc::clone(&registry));
        if let Some(limit) = config.tool_timeout {
            executor = executor.with_tool_timeout(limit);
        }

        let orchestrator = Self::new(provider, registry)
            .with_executor(Arc::new(executor))
            .with_generation_config(config.generation_config())
            .with_max_iterations(config.max_iterations);

        match config.model_timeout {
            Some(limit) => orchestrator.with_model_timeout(limit),
            None => orchestrator,
        }
    }

    /// Use a different executor (for example one with a tool timeout)
    pub fn with_executor(mut self, executor: Arc<dyn ToolExecutor>) -> Self {
        self.executor = executor;
        self
    }

    pub fn with_generation_config(mut self, config: GenerationConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the default iteration cap (default: 5)
    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_model_timeout(mut self, timeout: Duration) -> Self {
        self.model_timeout = Some(timeout);
        self
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Answer one message, calling tools as the model requests
    ///
    /// Never fails: errors are logged and turned into a fallback answer.
    pub async fn chat_with_tools(&self, request: ChatRequest) -> OrchestrationResult {
        let run_id = Uuid::new_v4();
        let span = info_span!(
            "chat_with_tools",
            %run_id,
            agent_id = %request.context.agent_id,
            tenant_id = %request.context.tenant_id,
        );
        self.run(&request).instrument(span).await
    }

    async fn run(&self, request: &ChatRequest) -> OrchestrationResult {
        let start = Instant::now();
        let mut progress = RunProgress::default();

        let declarations = self.resolve_declarations(request);
        let outcome = if declarations.is_empty() {
            transition(OrchestrationState::NoToolsFallback);
            self.generate_text(&plain_prompt(request.system_prompt(), &request.message))
                .await
        } else {
            self.tool_loop(request, &declarations, &mut progress).await
        };

        let response = match outcome {
            Ok(text) => text,
            Err(e) => self.fallback(request, e).await,
        };

        let result = OrchestrationResult {
            response,
            tools_called: progress.tool_results.len(),
            execution_time_ms: start.elapsed().as_millis() as u64,
            tool_results: progress.tool_results,
        };
        info!(
            tools_called = result.tools_called,
            elapsed_ms = result.execution_time_ms,
            "Tool-calling run finished"
        );
        result
    }

    /// Declarations offered to the model for this request
    fn resolve_declarations(&self, request: &ChatRequest) -> Vec<FunctionDeclaration> {
        match &request.enabled_tools {
            Some(names) => self.registry.get_function_declarations_for_agent(names),
            None => self.registry.get_enabled_function_declarations(),
        }
    }

    async fn tool_loop(
        &self,
        request: &ChatRequest,
        declarations: &[FunctionDeclaration],
        progress: &mut RunProgress,
    ) -> Result<String, OrchestratorError> {
        let max_iterations = request.max_iterations.unwrap_or(self.max_iterations);
        let prompt = tool_prompt(request.system_prompt(), &request.message);
        let mut transcript = vec![Content::user(prompt.as_str())];

        transition(OrchestrationState::AwaitingModel);
        debug!(tools = declarations.len(), max_iterations, "Requesting model response with tools");
        let mut turn = self
            .call_model(
                "generate_with_tools",
                self.provider
                    .generate_with_tools(&prompt, declarations, &self.config),
            )
            .await?;

        for iteration in 0..max_iterations {
            if !turn.wants_tools() {
                return Ok(complete(turn));
            }

            transition(OrchestrationState::ExecutingTools);
            let calls = turn.function_calls;
            let names: Vec<&str> = calls.iter().map(|c| c.name.as_str()).collect();
            info!(iteration, calls = calls.len(), tools = ?names, "Executing requested tools");

            let responses = self
                .executor
                .execute_function_calls(&calls, &request.context)
                .await;
            progress
                .tool_results
                .extend(responses.iter().map(ToolCallRecord::from));

            transcript.push(Content::function_calls(&calls));
            transcript.push(Content::function_responses(&responses));

            transition(OrchestrationState::Continuing);
            turn = self
                .call_model(
                    "continue_with_results",
                    self.provider.continue_with_results(
                        &transcript,
                        &responses,
                        declarations,
                        &self.config,
                    ),
                )
                .await?;
        }

        if !turn.wants_tools() {
            return Ok(complete(turn));
        }

        transition(OrchestrationState::MaxIterationsReached);
        warn!(max_iterations, "Model kept requesting tools past the iteration cap");
        Ok(MAX_ITERATIONS_MESSAGE.to_string())
    }

    /// Tool-free generation, collected into one string
    async fn generate_text(&self, prompt: &str) -> Result<String, OrchestratorError> {
        let generation = async {
            let mut chunks = self.provider.generate(prompt, &self.config).await?;
            let mut text = String::new();
            while let Some(chunk) = chunks.next().await {
                text.push_str(&chunk?);
            }
            Ok::<_, LlmError>(text)
        };
        self.call_model("generate", generation).await
    }

    async fn fallback(&self, request: &ChatRequest, cause: OrchestratorError) -> String {
        transition(OrchestrationState::ErrorFallback);
        warn!(error = %cause, "Tool-calling run failed, retrying without tools");

        match self
            .generate_text(&plain_prompt(request.system_prompt(), &request.message))
            .await
        {
            Ok(text) => text,
            Err(e) => {
                error!(error = %e, "Fallback generation failed");
                GENERIC_ERROR_MESSAGE.to_string()
            }
        }
    }

    /// Await a model call, bounded by the model timeout when one is set
    ///
    /// A panicking provider is reported as [`OrchestratorError::Panicked`].
    async fn call_model<T, F>(&self, operation: &'static str, call: F) -> Result<T, OrchestratorError>
    where
        F: Future<Output = Result<T, LlmError>>,
    {
        let start = Instant::now();
        let guarded = AssertUnwindSafe(call).catch_unwind();
        let outcome = match self.model_timeout {
            Some(after) => tokio::time::timeout(after, guarded)
                .await
                .map_err(|_| OrchestratorError::Timeout { operation, after }),
            None => Ok(guarded.await),
        };
        let result = match outcome {
            Ok(Ok(result)) => result.map_err(OrchestratorError::from),
            Ok(Err(_panic)) => Err(OrchestratorError::Panicked { operation }),
            Err(timeout) => Err(timeout),
        };

        let elapsed_ms = start.elapsed().as_millis() as u64;
        match &result {
            Ok(_) => debug!(operation, elapsed_ms, "Model call completed"),
            Err(e) => warn!(operation, elapsed_ms, error = %e, "Model call failed"),
        }
        result
    }
}

fn transition(state: OrchestrationState) {
    debug!(state = ?state, "Orchestration state");
}

fn complete(turn: ModelTurn) -> String {
    transition(OrchestrationState::Complete);
    turn.text.unwrap_or_default()
}
