//! Ask a question against a small in-memory knowledge base
//!
//! Requires `GCP_PROJECT_ID` in the environment or `.env`, and Application
//! Default Credentials (`gcloud auth application-default login`).
//!
//! ```sh
//! cargo run --example knowledge_chat -- "How long do refunds take?"
//! ```

use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::info;

use toolchat::config::AppConfig;
use toolchat::llm::tools::builtin::{
    knowledge_tools, InMemoryKnowledgeSource, KnowledgeEntry, KnowledgeScope,
};
use toolchat::llm::{
    create_provider, ChatRequest, FunctionCallingOrchestrator, ToolExecutionContext, ToolRegistry,
};
use toolchat::{register_tools, telemetry, tool};

const TENANT: &str = "acme";
const AGENT: &str = "support-bot";

#[derive(Debug, Deserialize, JsonSchema)]
pub struct OrderStatusArgs {
    /// Order number, for example "A-1001"
    pub order_id: String,
}

#[derive(Debug, Serialize)]
pub struct OrderStatus {
    pub order_id: String,
    pub status: &'static str,
}

#[tool(
    description = "Look up the shipping status of an order",
    category = "data",
    permission = "authenticated"
)]
async fn order_status(args: OrderStatusArgs) -> Result<OrderStatus, String> {
    let status = match args.order_id.as_str() {
        "A-1001" => "shipped",
        "A-1002" => "processing",
        other => return Err(format!("No order with id {}", other)),
    };
    Ok(OrderStatus {
        order_id: args.order_id,
        status,
    })
}

fn knowledge_base() -> InMemoryKnowledgeSource {
    let scope = KnowledgeScope::new(TENANT, AGENT);
    InMemoryKnowledgeSource::new()
        .with_entry(
            scope.clone(),
            KnowledgeEntry::new(
                "kb-1",
                "Refund policy",
                "Refunds are issued to the original payment method within 14 days of approval.",
            )
            .with_category("policy")
            .with_tags(["billing", "refunds"]),
        )
        .with_entry(
            scope.clone(),
            KnowledgeEntry::new(
                "kb-2",
                "Shipping times",
                "Standard orders ship within 2 business days; express orders ship the same day.",
            )
            .with_category("logistics"),
        )
        .with_entry(
            scope,
            KnowledgeEntry::new(
                "kb-3",
                "Support hours",
                "Human support is available Monday to Friday, 9am to 5pm CET.",
            )
            .with_category("support"),
        )
}

fn build_registry() -> Result<ToolRegistry, Box<dyn std::error::Error>> {
    let mut registry = ToolRegistry::new();
    registry.register(knowledge_tools(Arc::new(knowledge_base())))?;
    register_tools!(registry, order_status_tool);
    Ok(registry)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    telemetry::init_tracing("info");

    let question = std::env::args()
        .skip(1)
        .collect::<Vec<_>>()
        .join(" ");
    let question = if question.is_empty() {
        "How long does a refund take, and has order A-1001 shipped?".to_string()
    } else {
        question
    };

    let config = AppConfig::from_env()?;
    info!(model = config.model.as_str(), location = %config.location, "Starting knowledge chat");

    let provider = create_provider(config.model, config.project_id.clone(), config.location.clone()).await?;
    let registry = Arc::new(build_registry()?);
    let orchestrator = FunctionCallingOrchestrator::from_config(&config, provider, registry);

    let context = ToolExecutionContext::new(AGENT, TENANT)
        .with_user("demo-user")
        .with_session(uuid::Uuid::new_v4().to_string());
    let request = ChatRequest::new(question.clone(), context)
        .with_system_prompt("You are a friendly support assistant for Acme.");

    let result = orchestrator.chat_with_tools(request).await;

    println!("Q: {}", question);
    println!("A: {}", result.response);
    println!();
    println!(
        "{} tool call(s) in {}ms",
        result.tools_called, result.execution_time_ms
    );
    for record in &result.tool_results {
        println!(
            "  - {} ({})",
            record.tool_name,
            if record.success { "ok" } else { "failed" }
        );
    }

    Ok(())
}
