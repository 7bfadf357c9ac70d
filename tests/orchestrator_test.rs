//! End-to-end tests of the tool-calling loop against a scripted model

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use toolchat::llm::orchestrator::prompt::{
    DEFAULT_SYSTEM_PROMPT, GENERIC_ERROR_MESSAGE, MAX_ITERATIONS_MESSAGE, TOOL_INSTRUCTIONS,
};
use toolchat::llm::{
    ChatRequest, Content, FnTool, FunctionCall, FunctionCallingOrchestrator, FunctionDeclaration,
    FunctionResponse, GenerationConfig, LlmError, LlmProvider, ModelTurn, PermissionLevel, Role,
    TextStream, ToolExecutionContext, ToolRegistry,
};

/// What the orchestrator asked the model for
#[derive(Debug, Clone)]
enum Recorded {
    Generate(String),
    WithTools { prompt: String, tools: Vec<String> },
    Continue { transcript: Vec<Content>, responses: Vec<FunctionResponse> },
}

/// Model that replays scripted turns and texts in order
#[derive(Default)]
struct ScriptedProvider {
    turns: Mutex<VecDeque<Result<ModelTurn, LlmError>>>,
    texts: Mutex<VecDeque<Result<String, LlmError>>>,
    /// Returned once `turns` runs out
    always_call: Option<FunctionCall>,
    delay: Option<Duration>,
    /// Panic instead of erroring once the script runs out
    panics: bool,
    log: Mutex<Vec<Recorded>>,
}

impl ScriptedProvider {
    fn new() -> Self {
        Self::default()
    }

    fn turn(self, turn: ModelTurn) -> Self {
        self.turns.lock().unwrap().push_back(Ok(turn));
        self
    }

    fn failing_turn(self, error: LlmError) -> Self {
        self.turns.lock().unwrap().push_back(Err(error));
        self
    }

    fn text(self, text: &str) -> Self {
        self.texts.lock().unwrap().push_back(Ok(text.to_string()));
        self
    }

    fn failing_text(self, error: LlmError) -> Self {
        self.texts.lock().unwrap().push_back(Err(error));
        self
    }

    fn always_calling(mut self, call: FunctionCall) -> Self {
        self.always_call = Some(call);
        self
    }

    fn panicking(mut self) -> Self {
        self.panics = true;
        self
    }

    fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn log(&self) -> Vec<Recorded> {
        self.log.lock().unwrap().clone()
    }

    fn count(&self, matches: fn(&Recorded) -> bool) -> usize {
        self.log().iter().filter(|r| matches(r)).count()
    }

    async fn next_turn(&self) -> Result<ModelTurn, LlmError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let scripted = self.turns.lock().unwrap().pop_front();
        match (scripted, &self.always_call) {
            (Some(turn), _) => turn,
            (None, Some(call)) => Ok(ModelTurn::calls(vec![call.clone()])),
            (None, None) if self.panics => panic!("model backend crashed"),
            (None, None) => Err(LlmError::StreamError("script exhausted".to_string())),
        }
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn generate(
        &self,
        prompt: &str,
        _config: &GenerationConfig,
    ) -> Result<TextStream, LlmError> {
        self.log
            .lock()
            .unwrap()
            .push(Recorded::Generate(prompt.to_string()));

        let scripted = self.texts.lock().unwrap().pop_front();
        if scripted.is_none() && self.panics {
            panic!("model backend crashed");
        }
        let text = scripted
            .unwrap_or_else(|| Err(LlmError::StreamError("no text scripted".to_string())))?;

        // Split into chunks to exercise stream collection
        let middle = text.len() / 2;
        let middle = (middle..=text.len())
            .find(|i| text.is_char_boundary(*i))
            .unwrap_or(text.len());
        let chunks = vec![Ok(text[..middle].to_string()), Ok(text[middle..].to_string())];
        Ok(Box::pin(futures::stream::iter(chunks)))
    }

    async fn generate_with_tools(
        &self,
        prompt: &str,
        declarations: &[FunctionDeclaration],
        _config: &GenerationConfig,
    ) -> Result<ModelTurn, LlmError> {
        self.log.lock().unwrap().push(Recorded::WithTools {
            prompt: prompt.to_string(),
            tools: declarations.iter().map(|d| d.name.clone()).collect(),
        });
        self.next_turn().await
    }

    async fn continue_with_results(
        &self,
        transcript: &[Content],
        responses: &[FunctionResponse],
        _declarations: &[FunctionDeclaration],
        _config: &GenerationConfig,
    ) -> Result<ModelTurn, LlmError> {
        self.log.lock().unwrap().push(Recorded::Continue {
            transcript: transcript.to_vec(),
            responses: responses.to_vec(),
        });
        self.next_turn().await
    }
}

#[derive(Deserialize, JsonSchema)]
struct SearchArgs {
    /// What to look for
    query: String,
}

#[derive(Deserialize, JsonSchema)]
struct NoArgs {}

fn registry() -> Arc<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    registry
        .register_tool(FnTool::new("search", "Search the knowledge base", |args: SearchArgs, _ctx| async move {
            Ok::<_, String>(json!({ "results": [{ "id": "kb-1", "query": args.query }] }))
        }))
        .unwrap();
    registry
        .register_tool(FnTool::new("slow_clock", "Report the time slowly", |_args: NoArgs, _ctx| async move {
            tokio::time::sleep(Duration::from_millis(40)).await;
            Ok::<_, String>(json!({ "time": "noon" }))
        }))
        .unwrap();
    registry
        .register_tool(
            FnTool::new("account", "Read the caller's account", |_args: NoArgs, _ctx| async move {
                Ok::<_, String>(json!({ "plan": "pro" }))
            })
            .with_permission(PermissionLevel::Authenticated),
        )
        .unwrap();
    Arc::new(registry)
}

fn call(name: &str, args: Value) -> FunctionCall {
    let args: Map<String, Value> = args.as_object().cloned().unwrap_or_default();
    FunctionCall::new(name, args)
}

fn context() -> ToolExecutionContext {
    ToolExecutionContext::new("agent-1", "tenant-1")
}

fn orchestrator(provider: &Arc<ScriptedProvider>) -> FunctionCallingOrchestrator {
    FunctionCallingOrchestrator::new(provider.clone(), registry())
}

fn is_generate(r: &Recorded) -> bool {
    matches!(r, Recorded::Generate(_))
}

fn is_with_tools(r: &Recorded) -> bool {
    matches!(r, Recorded::WithTools { .. })
}

fn is_continue(r: &Recorded) -> bool {
    matches!(r, Recorded::Continue { .. })
}

#[tokio::test]
async fn test_no_enabled_tools_uses_plain_generation() {
    let provider = Arc::new(ScriptedProvider::new().text("You asked about refunds."));
    let orchestrator =
        FunctionCallingOrchestrator::new(provider.clone(), Arc::new(ToolRegistry::new()));

    let result = orchestrator
        .chat_with_tools(ChatRequest::new("What did I ask before?", context()))
        .await;

    assert_eq!(result.response, "You asked about refunds.");
    assert_eq!(result.tools_called, 0);
    assert!(result.tool_results.is_empty());
    assert_eq!(provider.count(is_with_tools), 0);

    match &provider.log()[0] {
        Recorded::Generate(prompt) => {
            assert_eq!(
                prompt,
                &format!("{}\n\nUser: What did I ask before?", DEFAULT_SYSTEM_PROMPT)
            );
        }
        other => panic!("Expected plain generation, got {:?}", other),
    }
}

#[tokio::test]
async fn test_allow_list_with_no_usable_tools_uses_plain_generation() {
    let provider = Arc::new(ScriptedProvider::new().text("Plain answer"));

    let result = orchestrator(&provider)
        .chat_with_tools(
            ChatRequest::new("Hello", context()).with_enabled_tools(["missing", "also_missing"]),
        )
        .await;

    assert_eq!(result.response, "Plain answer");
    assert_eq!(result.tools_called, 0);
    assert_eq!(provider.count(is_with_tools), 0);
}

#[tokio::test]
async fn test_single_tool_call_then_answer() {
    let provider = Arc::new(
        ScriptedProvider::new()
            .turn(ModelTurn::calls(vec![call("search", json!({"query": "X"}))]))
            .turn(ModelTurn::answer("X is described in kb-1.")),
    );

    let result = orchestrator(&provider)
        .chat_with_tools(ChatRequest::new("Search for X", context()))
        .await;

    assert_eq!(result.response, "X is described in kb-1.");
    assert_eq!(result.tools_called, 1);
    assert_eq!(result.tool_results.len(), 1);
    assert_eq!(result.tool_results[0].tool_name, "search");
    assert!(result.tool_results[0].success);
    assert_eq!(
        result.tool_results[0].data,
        Some(json!({"results": [{"id": "kb-1", "query": "X"}]}))
    );
    assert_eq!(provider.count(is_continue), 1);
}

#[tokio::test]
async fn test_initial_prompt_and_transcript() {
    let provider = Arc::new(
        ScriptedProvider::new()
            .turn(ModelTurn::calls(vec![call("search", json!({"query": "X"}))]))
            .turn(ModelTurn::answer("done")),
    );

    orchestrator(&provider)
        .chat_with_tools(
            ChatRequest::new("Search for X", context()).with_system_prompt("You are a librarian."),
        )
        .await;

    let log = provider.log();
    match &log[0] {
        Recorded::WithTools { prompt, tools } => {
            assert_eq!(
                prompt,
                &format!("You are a librarian.\n\n{}\n\nUser: Search for X", TOOL_INSTRUCTIONS)
            );
            assert_eq!(tools, &vec!["search", "slow_clock", "account"]);
        }
        other => panic!("Expected tool request, got {:?}", other),
    }
    match &log[1] {
        Recorded::Continue { transcript, responses } => {
            assert_eq!(transcript.len(), 3);
            assert_eq!(transcript[0].role, Role::User);
            assert_eq!(transcript[1].role, Role::Model);
            assert_eq!(transcript[2].role, Role::Function);
            assert_eq!(responses.len(), 1);
            assert_eq!(responses[0].name, "search");
        }
        other => panic!("Expected continuation, got {:?}", other),
    }
}

#[tokio::test]
async fn test_direct_answer_skips_tools() {
    let provider = Arc::new(ScriptedProvider::new().turn(ModelTurn::answer("Hello there!")));

    let result = orchestrator(&provider)
        .chat_with_tools(ChatRequest::new("Hi", context()))
        .await;

    assert_eq!(result.response, "Hello there!");
    assert_eq!(result.tools_called, 0);
    assert_eq!(provider.count(is_continue), 0);
}

#[tokio::test]
async fn test_agent_allow_list_limits_declarations() {
    let provider = Arc::new(ScriptedProvider::new().turn(ModelTurn::answer("ok")));

    orchestrator(&provider)
        .chat_with_tools(
            ChatRequest::new("Hi", context()).with_enabled_tools(["account", "missing", "search"]),
        )
        .await;

    match &provider.log()[0] {
        Recorded::WithTools { tools, .. } => assert_eq!(tools, &vec!["account", "search"]),
        other => panic!("Expected tool request, got {:?}", other),
    }
}

#[tokio::test]
async fn test_max_iterations_reached() {
    let provider = Arc::new(
        ScriptedProvider::new().always_calling(call("search", json!({"query": "again"}))),
    );

    let result = orchestrator(&provider)
        .chat_with_tools(ChatRequest::new("Loop forever", context()).with_max_iterations(3))
        .await;

    assert_eq!(result.response, MAX_ITERATIONS_MESSAGE);
    assert_eq!(result.tools_called, 3);
    assert_eq!(result.tool_results.len(), 3);
    assert_eq!(provider.count(is_continue), 3);
}

#[tokio::test]
async fn test_default_iteration_cap_is_five() {
    let provider = Arc::new(
        ScriptedProvider::new().always_calling(call("search", json!({"query": "again"}))),
    );

    let result = orchestrator(&provider)
        .chat_with_tools(ChatRequest::new("Loop forever", context()))
        .await;

    assert_eq!(result.response, MAX_ITERATIONS_MESSAGE);
    assert_eq!(result.tools_called, 5);
}

#[tokio::test]
async fn test_answer_on_last_iteration_is_returned() {
    let provider = Arc::new(
        ScriptedProvider::new()
            .turn(ModelTurn::calls(vec![call("search", json!({"query": "X"}))]))
            .turn(ModelTurn::answer("Final answer")),
    );

    let result = orchestrator(&provider)
        .chat_with_tools(ChatRequest::new("Search for X", context()).with_max_iterations(1))
        .await;

    assert_eq!(result.response, "Final answer");
    assert_eq!(result.tools_called, 1);
}

#[tokio::test]
async fn test_zero_iterations_runs_no_tools() {
    let provider = Arc::new(
        ScriptedProvider::new().always_calling(call("search", json!({"query": "again"}))),
    );

    let result = orchestrator(&provider)
        .chat_with_tools(ChatRequest::new("Search for X", context()).with_max_iterations(0))
        .await;

    assert_eq!(result.response, MAX_ITERATIONS_MESSAGE);
    assert_eq!(result.tools_called, 0);
    assert!(result.tool_results.is_empty());
    assert_eq!(provider.count(is_with_tools), 1);
    assert_eq!(provider.count(is_continue), 0);
}

#[tokio::test]
async fn test_zero_iterations_still_returns_direct_answer() {
    let provider = Arc::new(ScriptedProvider::new().turn(ModelTurn::answer("No tools needed")));

    let result = orchestrator(&provider)
        .chat_with_tools(ChatRequest::new("Hi", context()).with_max_iterations(0))
        .await;

    assert_eq!(result.response, "No tools needed");
    assert_eq!(result.tools_called, 0);
}

#[tokio::test]
async fn test_several_rounds_then_answer() {
    let provider = Arc::new(
        ScriptedProvider::new()
            .turn(ModelTurn::calls(vec![call("search", json!({"query": "X"}))]))
            .turn(ModelTurn::calls(vec![call("slow_clock", json!({}))]))
            .turn(ModelTurn::answer("kb-1 covers X, and it is noon.")),
    );

    let result = orchestrator(&provider)
        .chat_with_tools(ChatRequest::new("Search for X and tell me the time", context()))
        .await;

    assert_eq!(result.response, "kb-1 covers X, and it is noon.");
    assert_eq!(result.tools_called, 2);
    let names: Vec<&str> = result
        .tool_results
        .iter()
        .map(|r| r.tool_name.as_str())
        .collect();
    assert_eq!(names, vec!["search", "slow_clock"]);
    assert!(result.tool_results.iter().all(|r| r.success));
    assert_eq!(provider.count(is_continue), 2);

    match &provider.log()[2] {
        Recorded::Continue { transcript, responses } => {
            let roles: Vec<Role> = transcript.iter().map(|turn| turn.role).collect();
            assert_eq!(
                roles,
                vec![Role::User, Role::Model, Role::Function, Role::Model, Role::Function]
            );
            assert_eq!(responses.len(), 1);
            assert_eq!(responses[0].name, "slow_clock");
        }
        other => panic!("Expected second continuation, got {:?}", other),
    }
}

#[tokio::test]
async fn test_parallel_calls_keep_order() {
    let provider = Arc::new(
        ScriptedProvider::new()
            .turn(ModelTurn::calls(vec![
                call("slow_clock", json!({})),
                call("search", json!({"query": "Y"})),
                call("account", json!({})),
                call("nonexistent", json!({})),
            ]))
            .turn(ModelTurn::answer("Combined answer")),
    );

    let result = orchestrator(&provider)
        .chat_with_tools(ChatRequest::new("Do several things", context()))
        .await;

    assert_eq!(result.response, "Combined answer");
    assert_eq!(result.tools_called, 4);
    let names: Vec<&str> = result
        .tool_results
        .iter()
        .map(|r| r.tool_name.as_str())
        .collect();
    assert_eq!(names, vec!["slow_clock", "search", "account", "nonexistent"]);
    let successes: Vec<bool> = result.tool_results.iter().map(|r| r.success).collect();
    // `account` needs an authenticated caller; `nonexistent` is not registered
    assert_eq!(successes, vec![true, true, false, false]);

    match &provider.log()[1] {
        Recorded::Continue { responses, .. } => {
            assert!(responses[2]
                .response
                .error
                .as_deref()
                .unwrap()
                .contains("Authentication"));
            assert_eq!(
                responses[3].response.error.as_deref(),
                Some("Tool not found: nonexistent")
            );
        }
        other => panic!("Expected continuation, got {:?}", other),
    }
}

#[tokio::test]
async fn test_authenticated_caller_can_use_protected_tool() {
    let provider = Arc::new(
        ScriptedProvider::new()
            .turn(ModelTurn::calls(vec![call("account", json!({}))]))
            .turn(ModelTurn::answer("You are on the pro plan.")),
    );

    let result = orchestrator(&provider)
        .chat_with_tools(ChatRequest::new("Which plan am I on?", context().with_user("user-1")))
        .await;

    assert_eq!(result.response, "You are on the pro plan.");
    assert!(result.tool_results[0].success);
}

#[tokio::test]
async fn test_model_failure_falls_back_to_plain_generation() {
    let provider = Arc::new(
        ScriptedProvider::new()
            .failing_turn(LlmError::HttpError {
                status: 503,
                body: "unavailable".to_string(),
            })
            .text("Fallback answer"),
    );

    let result = orchestrator(&provider)
        .chat_with_tools(ChatRequest::new("Search for X", context()))
        .await;

    assert_eq!(result.response, "Fallback answer");
    assert_eq!(result.tools_called, 0);
    assert_eq!(provider.count(is_generate), 1);
}

#[tokio::test]
async fn test_continuation_failure_preserves_tool_count() {
    let provider = Arc::new(
        ScriptedProvider::new()
            .turn(ModelTurn::calls(vec![call("search", json!({"query": "X"}))]))
            .failing_turn(LlmError::StreamError("connection reset".to_string()))
            .text("Fallback after tools"),
    );

    let result = orchestrator(&provider)
        .chat_with_tools(ChatRequest::new("Search for X", context()))
        .await;

    assert_eq!(result.response, "Fallback after tools");
    assert_eq!(result.tools_called, 1);
    assert_eq!(result.tool_results.len(), 1);
}

#[tokio::test]
async fn test_fallback_failure_returns_generic_message() {
    let provider = Arc::new(
        ScriptedProvider::new()
            .turn(ModelTurn::calls(vec![call("search", json!({"query": "X"}))]))
            .failing_turn(LlmError::StreamError("connection reset".to_string()))
            .failing_text(LlmError::AuthenticationError("token expired".to_string())),
    );

    let result = orchestrator(&provider)
        .chat_with_tools(ChatRequest::new("Search for X", context()))
        .await;

    assert_eq!(result.response, GENERIC_ERROR_MESSAGE);
    assert_eq!(result.tools_called, 1);
}

#[tokio::test]
async fn test_plain_generation_failure_returns_generic_message() {
    let provider = Arc::new(
        ScriptedProvider::new()
            .failing_text(LlmError::StreamError("down".to_string()))
            .failing_text(LlmError::StreamError("still down".to_string())),
    );
    let orchestrator =
        FunctionCallingOrchestrator::new(provider.clone(), Arc::new(ToolRegistry::new()));

    let result = orchestrator
        .chat_with_tools(ChatRequest::new("Hello", context()))
        .await;

    assert_eq!(result.response, GENERIC_ERROR_MESSAGE);
    assert_eq!(result.tools_called, 0);
}

#[tokio::test]
async fn test_model_panic_falls_back_to_plain_generation() {
    let provider = Arc::new(ScriptedProvider::new().panicking().text("Fallback answer"));

    let result = orchestrator(&provider)
        .chat_with_tools(ChatRequest::new("Search for X", context()))
        .await;

    assert_eq!(result.response, "Fallback answer");
    assert_eq!(result.tools_called, 0);
    assert_eq!(provider.count(is_generate), 1);
}

#[tokio::test]
async fn test_panics_in_continuation_and_fallback_return_generic_message() {
    let provider = Arc::new(
        ScriptedProvider::new()
            .turn(ModelTurn::calls(vec![call("search", json!({"query": "X"}))]))
            .panicking(),
    );

    let result = orchestrator(&provider)
        .chat_with_tools(ChatRequest::new("Search for X", context()))
        .await;

    assert_eq!(result.response, GENERIC_ERROR_MESSAGE);
    assert_eq!(result.tools_called, 1);
    assert_eq!(result.tool_results.len(), 1);
    assert_eq!(provider.count(is_continue), 1);
    assert_eq!(provider.count(is_generate), 1);
}

#[tokio::test]
async fn test_model_timeout_triggers_fallback() {
    let provider = Arc::new(
        ScriptedProvider::new()
            .turn(ModelTurn::answer("too late"))
            .text("Fallback answer")
            .delayed(Duration::from_millis(200)),
    );

    let result = orchestrator(&provider)
        .with_model_timeout(Duration::from_millis(20))
        .chat_with_tools(ChatRequest::new("Hi", context()))
        .await;

    assert_eq!(result.response, "Fallback answer");
    assert_eq!(result.tools_called, 0);
}

#[tokio::test]
async fn test_result_serializes_for_callers() {
    let provider = Arc::new(
        ScriptedProvider::new()
            .turn(ModelTurn::calls(vec![call("search", json!({"query": "X"}))]))
            .turn(ModelTurn::answer("done")),
    );

    let result = orchestrator(&provider)
        .chat_with_tools(ChatRequest::new("Search for X", context()))
        .await;
    let value = serde_json::to_value(&result).unwrap();

    assert_eq!(value["response"], "done");
    assert_eq!(value["toolsCalled"], 1);
    assert_eq!(value["toolResults"][0]["toolName"], "search");
    assert_eq!(value["toolResults"][0]["success"], true);
    assert!(value["executionTimeMs"].is_u64());
}
