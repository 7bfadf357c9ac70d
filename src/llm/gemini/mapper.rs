//! Mapping between abstraction types and Gemini types

use serde_json::{Map, Value};
use tracing::warn;

use crate::llm::core::{
    config::GenerationConfig,
    error::LlmError,
    types::{
        Content, FinishReason, FunctionCall, FunctionDeclaration, ModelTurn, Part, Role,
        UsageMetadata,
    },
};

use super::types::{
    Content as GeminiContent, FunctionCall as GeminiFunctionCall,
    FunctionDeclaration as GeminiFunctionDeclaration,
    FunctionResponse as GeminiFunctionResponse, GeminiGenerationConfig, GenerateContentRequest,
    GenerateContentResponse, Part as GeminiPart, Tool,
};

/// Build a Gemini request from transcript turns and optional tool declarations
pub fn to_gemini_request(
    contents: &[Content],
    declarations: Option<&[FunctionDeclaration]>,
    config: &GenerationConfig,
) -> Result<GenerateContentRequest, LlmError> {
    let tools = match declarations {
        Some(declarations) if !declarations.is_empty() => Some(vec![Tool {
            function_declarations: declarations
                .iter()
                .map(to_gemini_function_declaration)
                .collect::<Result<_, _>>()?,
        }]),
        _ => None,
    };

    Ok(GenerateContentRequest {
        contents: contents
            .iter()
            .map(to_gemini_content)
            .collect::<Result<_, _>>()?,
        tools,
        generation_config: Some(to_gemini_generation_config(config)),
    })
}

/// Convert a transcript turn to Gemini's content format
fn to_gemini_content(content: &Content) -> Result<GeminiContent, LlmError> {
    let role = match content.role {
        Role::User => "user",
        Role::Model => "model",
        // Function results travel in a user turn with functionResponse parts
        Role::Function => "user",
    };

    let parts = content
        .parts
        .iter()
        .map(to_gemini_part)
        .collect::<Result<_, _>>()?;

    Ok(GeminiContent {
        role: role.to_string(),
        parts,
    })
}

/// Convert a transcript part to a Gemini part
fn to_gemini_part(part: &Part) -> Result<GeminiPart, LlmError> {
    Ok(match part {
        Part::Text { text } => GeminiPart::Text { text: text.clone() },
        Part::FunctionCall(call) => GeminiPart::FunctionCall {
            function_call: GeminiFunctionCall {
                name: call.name.clone(),
                args: Value::Object(call.args.clone()),
            },
        },
        Part::FunctionResponse(response) => GeminiPart::FunctionResponse {
            function_response: GeminiFunctionResponse {
                name: response.name.clone(),
                response: serde_json::to_value(&response.response)?,
            },
        },
    })
}

/// Convert a tool declaration to Gemini's function declaration
fn to_gemini_function_declaration(
    declaration: &FunctionDeclaration,
) -> Result<GeminiFunctionDeclaration, LlmError> {
    Ok(GeminiFunctionDeclaration {
        name: declaration.name.clone(),
        description: declaration.description.clone(),
        parameters: serde_json::to_value(&declaration.parameters)?,
    })
}

/// Convert generation config to Gemini's format
fn to_gemini_generation_config(config: &GenerationConfig) -> GeminiGenerationConfig {
    GeminiGenerationConfig {
        max_output_tokens: Some(config.max_tokens),
        temperature: config.temperature,
    }
}

/// Concatenated text of the first candidate in a response chunk
pub fn response_text(response: &GenerateContentResponse) -> String {
    let Some(candidate) = response.candidates.first() else {
        return String::new();
    };

    candidate
        .content
        .parts
        .iter()
        .filter_map(|part| match part {
            GeminiPart::Text { text } => Some(text.as_str()),
            _ => None,
        })
        .collect()
}

/// Folds streamed response chunks into a single [`ModelTurn`]
#[derive(Debug, Default)]
pub struct TurnAccumulator {
    text: String,
    function_calls: Vec<FunctionCall>,
    finish_reason: Option<FinishReason>,
    usage: Option<UsageMetadata>,
    block_reason: Option<String>,
}

impl TurnAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Absorb one streamed chunk
    pub fn push(&mut self, response: GenerateContentResponse) {
        if let Some(reason) = response
            .prompt_feedback
            .and_then(|feedback| feedback.block_reason)
        {
            self.block_reason = Some(reason);
        }

        if let Some(usage) = response.usage_metadata {
            self.usage = Some(UsageMetadata {
                input_tokens: usage.prompt_token_count,
                output_tokens: usage.candidates_token_count,
                total_tokens: usage.total_token_count,
            });
        }

        let Some(candidate) = response.candidates.into_iter().next() else {
            return;
        };

        for part in candidate.content.parts {
            match part {
                GeminiPart::Text { text } => self.text.push_str(&text),
                GeminiPart::FunctionCall { function_call } => {
                    self.function_calls.push(from_gemini_function_call(function_call));
                }
                GeminiPart::FunctionResponse { .. } => {
                    // Function responses are not expected in model output
                }
            }
        }

        if let Some(reason) = candidate.finish_reason {
            self.finish_reason = Some(map_finish_reason(&reason));
        }
    }

    /// Produce the final turn
    ///
    /// A turn is complete when the model requested no calls.
    pub fn finish(self) -> Result<ModelTurn, LlmError> {
        if let Some(reason) = self.block_reason {
            return Err(LlmError::Blocked(reason));
        }

        Ok(ModelTurn {
            is_complete: self.function_calls.is_empty(),
            text: (!self.text.is_empty()).then_some(self.text),
            function_calls: self.function_calls,
            finish_reason: self.finish_reason,
            usage: self.usage,
        })
    }
}

fn from_gemini_function_call(call: GeminiFunctionCall) -> FunctionCall {
    let args = match call.args {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        other => {
            warn!(tool = %call.name, args = %other, "Function call arguments are not an object");
            Map::new()
        }
    };
    FunctionCall::new(call.name, args)
}

/// Map Gemini's finish reason to our abstraction
fn map_finish_reason(reason: &str) -> FinishReason {
    match reason {
        "STOP" => FinishReason::Stop,
        "MAX_TOKENS" => FinishReason::MaxTokens,
        "SAFETY" => FinishReason::Safety,
        other => FinishReason::Other(other.to_string()),
    }
}
