//! Provider trait for the generative model service

use std::sync::Arc;

use async_trait::async_trait;

use super::{
    config::GenerationConfig,
    error::LlmError,
    types::{Content, FunctionDeclaration, FunctionResponse, ModelTurn, TextStream},
};
use crate::llm::gemini::{GeminiClient, GeminiModel};

/// Interface to an opaque generative model
///
/// The orchestrator only needs these three operations; everything else about the
/// remote service (transport, auth, retries) stays behind the implementation.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate text from a prompt without tools
    ///
    /// Returns a lazy stream of text chunks. Each call starts a fresh generation.
    async fn generate(
        &self,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<TextStream, LlmError>;

    /// Generate a response given a prompt and the callable tool declarations
    ///
    /// The returned turn is either a final answer or a list of requested calls.
    async fn generate_with_tools(
        &self,
        prompt: &str,
        declarations: &[FunctionDeclaration],
        config: &GenerationConfig,
    ) -> Result<ModelTurn, LlmError>;

    /// Continue a tool-augmented conversation after calls were executed
    ///
    /// `transcript` holds every turn so far. `responses` are the results of the most
    /// recent batch, for providers that send them separately from the transcript.
    async fn continue_with_results(
        &self,
        transcript: &[Content],
        responses: &[FunctionResponse],
        declarations: &[FunctionDeclaration],
        config: &GenerationConfig,
    ) -> Result<ModelTurn, LlmError>;
}

/// Create a model provider backed by Gemini on Vertex AI
///
/// # Example
///
/// ```rust,no_run
/// use toolchat::llm::{create_provider, GeminiModel};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let provider = create_provider(
///     GeminiModel::Gemini25Flash,
///     "my-project".to_string(),
///     "us-central1".to_string(),
/// ).await?;
/// # Ok(())
/// # }
/// ```
pub async fn create_provider(
    model: GeminiModel,
    project_id: String,
    location: String,
) -> Result<Arc<dyn LlmProvider>, LlmError> {
    let client = GeminiClient::new(project_id, location, model).await?;
    Ok(Arc::new(client))
}
