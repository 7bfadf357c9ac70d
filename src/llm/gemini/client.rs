//! Gemini client implementation

use std::str::FromStr;
use std::time::Duration;

use async_stream::try_stream;
use async_trait::async_trait;
use futures::stream::Stream;
use futures::StreamExt;
use reqwest::{Client, StatusCode};
use tracing::debug;

use crate::llm::auth::adc::AuthenticationManager;
use crate::llm::core::{
    config::GenerationConfig,
    error::LlmError,
    provider::LlmProvider,
    types::{Content, FunctionDeclaration, FunctionResponse, ModelTurn, Role, TextStream},
};

use super::mapper::{response_text, to_gemini_request, TurnAccumulator};
use super::sse::{parse_sse_stream, ResponseStream};
use super::types::GenerateContentRequest;

/// Gemini model identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeminiModel {
    /// Gemini 2.5 Pro
    Gemini25Pro,
    /// Gemini 2.5 Flash
    Gemini25Flash,
    /// Gemini 2.5 Flash Lite
    Gemini25FlashLite,
}

impl GeminiModel {
    /// Get the model identifier string
    pub fn as_str(&self) -> &str {
        match self {
            GeminiModel::Gemini25Pro => "gemini-2.5-pro",
            GeminiModel::Gemini25Flash => "gemini-2.5-flash",
            GeminiModel::Gemini25FlashLite => "gemini-2.5-flash-lite",
        }
    }
}

impl FromStr for GeminiModel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gemini-2.5-pro" => Ok(GeminiModel::Gemini25Pro),
            "gemini-2.5-flash" => Ok(GeminiModel::Gemini25Flash),
            "gemini-2.5-flash-lite" => Ok(GeminiModel::Gemini25FlashLite),
            other => Err(format!("Unknown Gemini model: {}", other)),
        }
    }
}

/// Client for interacting with Gemini models on Vertex AI
pub struct GeminiClient {
    /// HTTP client for making requests
    http_client: Client,
    /// Authentication manager for ADC tokens
    auth_manager: AuthenticationManager,
    /// GCP project ID
    project_id: String,
    /// GCP location (region)
    location: String,
    /// Model to use
    model: GeminiModel,
}

impl GeminiClient {
    /// Create a new Gemini client
    ///
    /// # Errors
    ///
    /// Returns an error if authentication initialization fails.
    pub async fn new(
        project_id: String,
        location: String,
        model: GeminiModel,
    ) -> Result<Self, LlmError> {
        let http_client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| LlmError::HttpError {
                status: 0,
                body: format!("Failed to create HTTP client: {}", e),
            })?;

        let auth_manager = AuthenticationManager::new().await?;

        Ok(Self {
            http_client,
            auth_manager,
            project_id,
            location,
            model,
        })
    }

    /// Build the endpoint URL for streaming
    fn build_endpoint_url(&self) -> String {
        endpoint_url(&self.project_id, &self.location, self.model)
    }

    /// Send a request and return the decoded SSE response chunks
    async fn stream_responses(
        &self,
        request: &GenerateContentRequest,
    ) -> Result<ResponseStream, LlmError> {
        let token = self.auth_manager.get_token().await?;

        let url = self.build_endpoint_url();
        debug!(model = self.model.as_str(), contents = request.contents.len(), "Sending Gemini request");
        let response = self
            .http_client
            .post(&url)
            .header("Authorization", format!("Bearer {}", token))
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_secs);
            return Err(LlmError::RateLimitExceeded { retry_after });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::HttpError {
                status: status.as_u16(),
                body,
            });
        }

        Ok(parse_sse_stream(Box::pin(response.bytes_stream())))
    }

    /// Send a request and fold the whole response into one turn
    async fn collect_turn(&self, request: &GenerateContentRequest) -> Result<ModelTurn, LlmError> {
        let mut responses = self.stream_responses(request).await?;
        let mut accumulator = TurnAccumulator::new();
        while let Some(response) = responses.next().await {
            accumulator.push(response?);
        }

        let turn = accumulator.finish()?;
        debug!(
            calls = turn.function_calls.len(),
            finish_reason = ?turn.finish_reason,
            usage = ?turn.usage,
            "Gemini turn received"
        );
        Ok(turn)
    }
}

fn endpoint_url(project_id: &str, location: &str, model: GeminiModel) -> String {
    format!(
        "https://{}-aiplatform.googleapis.com/v1/projects/{}/locations/{}/publishers/google/models/{}:streamGenerateContent?alt=sse",
        location, project_id, location, model.as_str()
    )
}

/// Transcript to send when continuing after tool execution
///
/// The caller normally appends the function-result turn itself; when it has not,
/// the responses are appended here so the model always sees them.
fn continuation_contents(transcript: &[Content], responses: &[FunctionResponse]) -> Vec<Content> {
    let mut contents = transcript.to_vec();
    let has_results = matches!(contents.last(), Some(last) if last.role == Role::Function);
    if !has_results && !responses.is_empty() {
        contents.push(Content::function_responses(responses));
    }
    contents
}

/// Text of each response chunk, skipping chunks that carry none
fn text_chunks(mut responses: ResponseStream) -> impl Stream<Item = Result<String, LlmError>> + Send {
    try_stream! {
        while let Some(response) = responses.next().await {
            let text = response_text(&response?);
            if !text.is_empty() {
                yield text;
            }
        }
    }
}

#[async_trait]
impl LlmProvider for GeminiClient {
    async fn generate(
        &self,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<TextStream, LlmError> {
        let request = to_gemini_request(&[Content::user(prompt)], None, config)?;
        let responses = self.stream_responses(&request).await?;
        Ok(Box::pin(text_chunks(responses)))
    }

    async fn generate_with_tools(
        &self,
        prompt: &str,
        declarations: &[FunctionDeclaration],
        config: &GenerationConfig,
    ) -> Result<ModelTurn, LlmError> {
        let request = to_gemini_request(&[Content::user(prompt)], Some(declarations), config)?;
        self.collect_turn(&request).await
    }

    async fn continue_with_results(
        &self,
        transcript: &[Content],
        responses: &[FunctionResponse],
        declarations: &[FunctionDeclaration],
        config: &GenerationConfig,
    ) -> Result<ModelTurn, LlmError> {
        let contents = continuation_contents(transcript, responses);
        let request = to_gemini_request(&contents, Some(declarations), config)?;
        self.collect_turn(&request).await
    }
}
